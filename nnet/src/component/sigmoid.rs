use ndarray::{Array2, ArrayView2};

use crate::Float;

/// Element-wise logistic nonlinearity.
#[derive(Debug, Clone, PartialEq)]
pub struct Sigmoid {
    dim: usize,
}

impl Sigmoid {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn forward(&self, z: ArrayView2<Float>) -> Array2<Float> {
        z.mapv(|z| 1. / (1. + (-z).exp()))
    }

    /// `y` is the output of the forward pass.
    pub fn backward(&self, y: ArrayView2<Float>, d: ArrayView2<Float>) -> Array2<Float> {
        let mut dx = d.to_owned();
        dx.zip_mut_with(&y, |d, &a| *d *= a * (1. - a));
        dx
    }
}
