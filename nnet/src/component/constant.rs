use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::{RandomExt, rand_distr::StandardNormal};
use rand::Rng;

use crate::Float;

/// A learnable row vector. Whatever the number of input rows, the output is a
/// single row holding the parameters, so a minibatch sees it with batch size 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    params: Array1<Float>,
}

impl Constant {
    pub fn new(dim: usize) -> Self {
        Self {
            params: Array1::zeros(dim),
        }
    }

    pub fn from_params(params: Array1<Float>) -> Self {
        Self { params }
    }

    pub fn output_dim(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> ArrayView1<'_, Float> {
        self.params.view()
    }

    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.params = Array1::<Float>::random_using(self.params.len(), StandardNormal, rng) * 0.1;
    }

    pub fn forward(&self) -> Array2<Float> {
        self.params.view().insert_axis(Axis(0)).to_owned()
    }

    /// Adds the summed rows of `d` to `grad`. The input does not influence the
    /// output so its derivative is zero.
    pub fn backward(
        &self,
        x: ArrayView2<Float>,
        d: ArrayView2<Float>,
        grad: Option<&mut Constant>,
    ) -> Array2<Float> {
        if let Some(grad) = grad {
            grad.params += &d.sum_axis(Axis(0));
        }

        Array2::zeros(x.raw_dim())
    }

    pub fn set_zero(&mut self) {
        self.params.fill(0.0);
    }

    pub fn dot_product(&self, other: &Constant) -> Float {
        self.params.dot(&other.params)
    }
}
