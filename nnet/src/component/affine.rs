use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, linalg};
use ndarray_rand::{RandomExt, rand_distr::StandardNormal};
use rand::Rng;

use crate::Float;

/// A fully connected layer, `y = xW + b`, one frame per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Affine {
    weights: Array2<Float>,
    bias: Array1<Float>,
}

impl Affine {
    /// Creates a new `Affine` with every parameter set to zero.
    ///
    /// # Arguments
    /// * `dim` - The (input, output) dimension of the layer.
    pub fn new(dim: (usize, usize)) -> Self {
        Self {
            weights: Array2::zeros(dim),
            bias: Array1::zeros(dim.1),
        }
    }

    /// Creates a new `Affine` from explicit weights and biases.
    ///
    /// # Panics
    /// If `bias` does not have one entry per column of `weights`.
    pub fn from_params(weights: Array2<Float>, bias: Array1<Float>) -> Self {
        assert_eq!(weights.ncols(), bias.len(), "affine bias/weights mismatch");
        Self { weights, bias }
    }

    pub fn input_dim(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_dim(&self) -> usize {
        self.weights.ncols()
    }

    pub fn num_parameters(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    pub fn weights(&self) -> ArrayView2<'_, Float> {
        self.weights.view()
    }

    pub fn bias(&self) -> ArrayView1<'_, Float> {
        self.bias.view()
    }

    /// Fills the weights with gaussian noise scaled by `1 / sqrt(input_dim)`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let scale = 1.0 / (self.input_dim().max(1) as Float).sqrt();
        self.weights =
            Array2::<Float>::random_using(self.weights.dim(), StandardNormal, rng) * scale;
        self.bias = Array1::<Float>::random_using(self.bias.len(), StandardNormal, rng) * 0.1;
    }

    pub fn forward(&self, x: ArrayView2<Float>) -> Array2<Float> {
        let mut z = Array2::zeros((x.nrows(), self.output_dim()));
        linalg::general_mat_mul(1.0, &x, &self.weights, 0.0, &mut z);
        z += &self.bias;
        z
    }

    /// Propagates `d` back through the layer. When `grad` is given the parameter
    /// derivatives are added to it.
    ///
    /// # Returns
    /// The derivative with respect to the input `x`.
    pub fn backward(
        &self,
        x: ArrayView2<Float>,
        d: ArrayView2<Float>,
        grad: Option<&mut Affine>,
    ) -> Array2<Float> {
        if let Some(grad) = grad {
            linalg::general_mat_mul(1.0, &x.t(), &d, 1.0, &mut grad.weights);
            grad.bias += &d.sum_axis(Axis(0));
        }

        let mut dx = Array2::zeros((d.nrows(), self.input_dim()));
        linalg::general_mat_mul(1.0, &d, &self.weights.t(), 0.0, &mut dx);
        dx
    }

    pub fn set_zero(&mut self) {
        self.weights.fill(0.0);
        self.bias.fill(0.0);
    }

    pub fn dot_product(&self, other: &Affine) -> Float {
        (&self.weights * &other.weights).sum() + self.bias.dot(&other.bias)
    }
}
