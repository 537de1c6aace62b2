mod affine;
mod constant;
mod sigmoid;

pub use affine::Affine;
pub use constant::Constant;
pub use sigmoid::Sigmoid;

use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;

use crate::{Float, NnetErr, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Affine(Affine),
    Sigmoid(Sigmoid),
    Constant(Constant),
}
use Component::*;

impl Component {
    pub fn affine(dim: (usize, usize)) -> Self {
        Self::Affine(Affine::new(dim))
    }

    pub fn sigmoid(dim: usize) -> Self {
        Self::Sigmoid(Sigmoid::new(dim))
    }

    pub fn constant(dim: usize) -> Self {
        Self::Constant(Constant::new(dim))
    }

    pub fn constant_from(params: Array1<Float>) -> Self {
        Self::Constant(Constant::from_params(params))
    }

    /// The number of columns this component expects, `None` if it accepts any.
    pub fn input_dim(&self) -> Option<usize> {
        match self {
            Affine(c) => Some(c.input_dim()),
            Sigmoid(c) => Some(c.dim()),
            Constant(_) => None,
        }
    }

    pub fn output_dim(&self) -> usize {
        match self {
            Affine(c) => c.output_dim(),
            Sigmoid(c) => c.dim(),
            Constant(c) => c.output_dim(),
        }
    }

    pub fn num_parameters(&self) -> usize {
        match self {
            Affine(c) => c.num_parameters(),
            Sigmoid(_) => 0,
            Constant(c) => c.output_dim(),
        }
    }

    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        match self {
            Affine(c) => c.randomize(rng),
            Sigmoid(_) => {}
            Constant(c) => c.randomize(rng),
        }
    }

    pub fn forward(&self, x: ArrayView2<Float>) -> Array2<Float> {
        match self {
            Affine(c) => c.forward(x),
            Sigmoid(c) => c.forward(x),
            Constant(c) => c.forward(),
        }
    }

    /// Backpropagates `d`, the derivative w.r.t. this component's output `y`.
    ///
    /// # Arguments
    /// * `index` - The component's index, used for error reporting.
    /// * `x` - The input seen in the forward pass.
    /// * `y` - The output produced in the forward pass.
    /// * `d` - The derivative of the objective w.r.t. `y`.
    /// * `grad` - The matching component of the gradient nnet, if any.
    ///
    /// # Returns
    /// The derivative w.r.t. `x`, or an error if `grad` is a different kind of component.
    pub fn backward(
        &self,
        index: usize,
        x: ArrayView2<Float>,
        y: ArrayView2<Float>,
        d: ArrayView2<Float>,
        grad: Option<&mut Component>,
    ) -> Result<Array2<Float>> {
        let dx = match (self, grad) {
            (Affine(c), None) => c.backward(x, d, None),
            (Affine(c), Some(Affine(g))) => c.backward(x, d, Some(g)),
            (Sigmoid(c), None | Some(Sigmoid(_))) => c.backward(y, d),
            (Constant(c), None) => c.backward(x, d, None),
            (Constant(c), Some(Constant(g))) => c.backward(x, d, Some(g)),
            _ => return Err(NnetErr::ComponentMismatch { index }),
        };

        Ok(dx)
    }

    pub fn set_zero(&mut self) {
        match self {
            Affine(c) => c.set_zero(),
            Sigmoid(_) => {}
            Constant(c) => c.set_zero(),
        }
    }

    /// Sum of the element-wise products of both components' parameters, `None`
    /// if they are not the same kind of component.
    pub fn dot_product(&self, other: &Component) -> Option<Float> {
        match (self, other) {
            (Affine(a), Affine(b)) => Some(a.dot_product(b)),
            (Sigmoid(_), Sigmoid(_)) => Some(0.0),
            (Constant(a), Constant(b)) => Some(a.dot_product(b)),
            _ => None,
        }
    }

    /// Whether both components have the same kind and dimensions.
    pub fn same_shape(&self, other: &Component) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
            && self.input_dim() == other.input_dim()
            && self.output_dim() == other.output_dim()
    }
}
