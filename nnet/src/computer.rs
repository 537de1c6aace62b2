use log::debug;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::{Computation, Float, Nnet, NnetErr, NnetIo, NodeKind, Result};

/// Options for running a computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeOptions {
    /// Log the shape of every value produced.
    pub debug: bool,
}

/// Executes a compiled `Computation` over a network.
///
/// The lifecycle of a minibatch is `accept_inputs`, `forward`, any number of
/// `get_output` / `accept_output_deriv` calls, and finally `backward`, which adds
/// the parameter derivatives into the gradient network given at construction.
pub struct NnetComputer<'a> {
    options: ComputeOptions,
    computation: &'a Computation,
    nnet: &'a Nnet,
    deriv_nnet: Option<&'a mut Nnet>,

    values: Vec<Option<Array2<Float>>>,
    derivs: Vec<Option<Array2<Float>>>,
}

impl<'a> NnetComputer<'a> {
    /// Creates a new `NnetComputer`.
    ///
    /// # Arguments
    /// * `options` - The compute options.
    /// * `computation` - The plan to execute.
    /// * `nnet` - The network the plan was compiled for.
    /// * `deriv_nnet` - Where the parameter derivatives are accumulated, if anywhere.
    pub fn new(
        options: ComputeOptions,
        computation: &'a Computation,
        nnet: &'a Nnet,
        deriv_nnet: Option<&'a mut Nnet>,
    ) -> Self {
        let n = nnet.num_nodes();
        Self {
            options,
            computation,
            nnet,
            deriv_nnet,
            values: vec![None; n],
            derivs: vec![None; n],
        }
    }

    /// Stores the example's inputs. Entries naming output nodes (supervision) are
    /// ignored.
    pub fn accept_inputs(&mut self, io: &[NnetIo]) -> Result<()> {
        for io in io {
            let index = self
                .nnet
                .node_index(io.name())
                .ok_or_else(|| NnetErr::UnknownNode(io.name().to_string()))?;

            let NodeKind::Input { dim } = *self.nnet.node(index).kind() else {
                continue;
            };

            if io.features().ncols() != dim {
                return Err(NnetErr::SizeMismatch {
                    what: "input features",
                    got: io.features().ncols(),
                    expected: dim,
                });
            }

            if self.computation.contains(index) {
                self.values[index] = Some(io.features().to_owned());
            }
        }

        Ok(())
    }

    pub fn forward(&mut self) -> Result<()> {
        for &index in self.computation.steps() {
            let node = self.nnet.node(index);
            let value = match *node.kind() {
                NodeKind::Input { .. } => match &self.values[index] {
                    Some(_) => continue,
                    None => return Err(NnetErr::MissingInput(node.name().to_string())),
                },
                NodeKind::Component { component, input } => {
                    let x = self.value(input)?;
                    self.nnet.component(component).forward(x)
                }
                NodeKind::Output { input, .. } => self.value(input)?.to_owned(),
            };

            if self.options.debug {
                debug!(node = node.name(); "forward produced {:?}", value.dim());
            }
            self.values[index] = Some(value);
        }

        Ok(())
    }

    /// Returns the value of the output node called `name`.
    pub fn get_output(&self, name: &str) -> Result<ArrayView2<'_, Float>> {
        let index = self.output_index(name)?;
        self.values[index]
            .as_ref()
            .map(|a| a.view())
            .ok_or_else(|| NnetErr::OutputNotComputed(name.to_string()))
    }

    /// Sets the derivative of the objective w.r.t. the output node called `name`.
    pub fn accept_output_deriv(&mut self, name: &str, deriv: Array2<Float>) -> Result<()> {
        let index = self.output_index(name)?;
        let value = self.values[index]
            .as_ref()
            .ok_or_else(|| NnetErr::OutputNotComputed(name.to_string()))?;

        if value.dim() != deriv.dim() {
            return Err(NnetErr::SizeMismatch {
                what: "output derivative",
                got: deriv.len(),
                expected: value.len(),
            });
        }

        self.derivs[index] = Some(deriv);
        Ok(())
    }

    /// Propagates the accepted output derivatives back to the parameters. Outputs
    /// that were given no derivative contribute nothing.
    pub fn backward(&mut self) -> Result<()> {
        if !self.computation.need_model_derivative() {
            return Err(NnetErr::NoDerivatives);
        }

        for &index in self.computation.steps().iter().rev() {
            let Some(d) = self.derivs[index].take() else {
                continue;
            };

            let node = self.nnet.node(index);
            match *node.kind() {
                NodeKind::Input { .. } => {}
                NodeKind::Output { input, .. } => add_deriv(&mut self.derivs, input, d),
                NodeKind::Component { component, input } => {
                    let x = value_of(&self.values, self.nnet, input)?;
                    let y = value_of(&self.values, self.nnet, index)?;
                    let grad = self
                        .deriv_nnet
                        .as_deref_mut()
                        .map(|nnet| nnet.component_mut(component));

                    let dx = self
                        .nnet
                        .component(component)
                        .backward(component, x, y, d.view(), grad)?;

                    if self.options.debug {
                        debug!(node = node.name(); "backward produced {:?}", dx.dim());
                    }
                    add_deriv(&mut self.derivs, input, dx);
                }
            }
        }

        Ok(())
    }

    fn value(&self, index: usize) -> Result<ArrayView2<'_, Float>> {
        value_of(&self.values, self.nnet, index)
    }

    fn output_index(&self, name: &str) -> Result<usize> {
        let index = self
            .nnet
            .node_index(name)
            .ok_or_else(|| NnetErr::UnknownNode(name.to_string()))?;

        if !self.nnet.is_output_node(index) {
            return Err(NnetErr::NotAnOutputNode(name.to_string()));
        }

        Ok(index)
    }
}

fn value_of<'v>(
    values: &'v [Option<Array2<Float>>],
    nnet: &Nnet,
    index: usize,
) -> Result<ArrayView2<'v, Float>> {
    values[index]
        .as_ref()
        .map(|a| a.view())
        .ok_or_else(|| NnetErr::OutputNotComputed(nnet.node_name(index).to_string()))
}

fn add_deriv(derivs: &mut [Option<Array2<Float>>], index: usize, d: Array2<Float>) {
    match &mut derivs[index] {
        Some(acc) => *acc += &d,
        slot => *slot = Some(d),
    }
}
