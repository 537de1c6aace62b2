//! Packed storage for symmetric matrices.
//!
//! A `dim x dim` symmetric matrix is stored as its lower triangle, row by row:
//! element `(r, c)` with `r >= c` lives at `r * (r + 1) / 2 + c`. For `dim = 3`
//! the order is `(0,0) (1,0) (1,1) (2,0) (2,1) (2,2)`. Both `unpack` and
//! `pack_gradient` use this order.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::{Float, NnetErr, Result};

/// The number of independent entries of a `dim x dim` symmetric matrix.
pub fn packed_dim(dim: usize) -> usize {
    dim * (dim + 1) / 2
}

#[inline]
fn packed_index(r: usize, c: usize) -> usize {
    let (r, c) = if r >= c { (r, c) } else { (c, r) };
    r * (r + 1) / 2 + c
}

/// A symmetric matrix in packed storage.
#[derive(Debug, Clone, PartialEq)]
pub struct SpMatrix {
    dim: usize,
    data: Array1<Float>,
}

impl SpMatrix {
    /// Creates a new `SpMatrix` from its packed entries.
    ///
    /// # Arguments
    /// * `dim` - The number of rows (and columns) of the full matrix.
    /// * `packed` - The lower triangle, row-major.
    ///
    /// # Returns
    /// The matrix, or an error if `packed` does not have `dim * (dim + 1) / 2` entries.
    pub fn from_packed(dim: usize, packed: ArrayView1<Float>) -> Result<Self> {
        let expected = packed_dim(dim);
        if packed.len() != expected {
            return Err(NnetErr::SizeMismatch {
                what: "packed symmetric matrix",
                got: packed.len(),
                expected,
            });
        }

        Ok(Self {
            dim,
            data: packed.to_owned(),
        })
    }

    /// Packs a full matrix, reading only its lower triangle.
    pub fn from_full(full: ArrayView2<Float>) -> Self {
        let dim = full.nrows();
        let mut data = Array1::zeros(packed_dim(dim));
        for r in 0..dim {
            for c in 0..=r {
                data[packed_index(r, c)] = full[[r, c]];
            }
        }

        Self { dim, data }
    }

    /// Packs the derivative of a scalar w.r.t. a full symmetric matrix into the
    /// derivative w.r.t. each packed entry. An off-diagonal packed entry stands
    /// for both `(r, c)` and `(c, r)`, so it receives `grad[r][c] + grad[c][r]`.
    pub fn pack_gradient(grad: ArrayView2<Float>) -> Array1<Float> {
        let dim = grad.nrows();
        let mut packed = Array1::zeros(packed_dim(dim));
        for r in 0..dim {
            packed[packed_index(r, r)] = grad[[r, r]];
            for c in 0..r {
                packed[packed_index(r, c)] = grad[[r, c]] + grad[[c, r]];
            }
        }

        packed
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn packed(&self) -> ArrayView1<'_, Float> {
        self.data.view()
    }

    pub fn get(&self, r: usize, c: usize) -> Float {
        self.data[packed_index(r, c)]
    }

    /// Expands to a full `dim x dim` matrix.
    pub fn unpack(&self) -> Array2<Float> {
        Array2::from_shape_fn((self.dim, self.dim), |(r, c)| self.get(r, c))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn unpack_follows_lower_triangle_row_major_order() {
        let sp = SpMatrix::from_packed(3, array![1., 2., 3., 4., 5., 6.].view()).unwrap();
        let expected = array![[1., 2., 4.], [2., 3., 5.], [4., 5., 6.]];
        assert_eq!(sp.unpack(), expected);
        assert_eq!(SpMatrix::from_full(expected.view()), sp);
    }

    #[test]
    fn identity_packs_as_ones_on_the_diagonal() {
        let sp = SpMatrix::from_full(Array2::<Float>::eye(2).view());
        assert_eq!(sp.packed(), array![1., 0., 1.].view());
    }

    #[test]
    fn from_packed_rejects_wrong_length() {
        let err = SpMatrix::from_packed(3, array![1., 2., 3.].view()).unwrap_err();
        assert_eq!(
            err,
            NnetErr::SizeMismatch {
                what: "packed symmetric matrix",
                got: 3,
                expected: 6
            }
        );
    }

    #[test]
    fn pack_gradient_matches_the_derivative_of_a_linear_function() {
        // f(S) = sum_rc A[r][c] * S[r][c], so df/dS = A and, per packed entry,
        // perturbing entry p by one changes f by the sum of A over the cells p maps to.
        let a = array![[1., 2., 3.], [4., 5., 6.], [7., 8., 9.]];
        let packed = SpMatrix::pack_gradient(a.view());

        for p in 0..packed_dim(3) {
            let mut unit = Array1::zeros(packed_dim(3));
            unit[p] = 1.0;
            let s = SpMatrix::from_packed(3, unit.view()).unwrap().unpack();
            let df = (&a * &s).sum();
            assert_eq!(packed[p], df, "packed entry {p}");
        }
    }
}
