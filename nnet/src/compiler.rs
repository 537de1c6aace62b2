use std::{collections::HashMap, rc::Rc};

use log::debug;

use crate::{Nnet, NnetErr, NnetExample, NodeKind, Result};

/// A named input or output of a computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IoSpecification {
    pub name: String,
    pub num_rows: usize,
    pub has_deriv: bool,
}

/// What a computation must consume and produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComputationRequest {
    pub inputs: Vec<IoSpecification>,
    pub outputs: Vec<IoSpecification>,
    pub need_model_derivative: bool,
    pub store_component_stats: bool,
}

impl ComputationRequest {
    /// Builds the request for running `eg` through `nnet`: every input node must be
    /// supplied by the example and every output node is requested.
    ///
    /// # Arguments
    /// * `nnet` - The network.
    /// * `eg` - The minibatch.
    /// * `need_model_derivative` - Whether the plan must support a backward pass.
    /// * `store_component_stats` - Whether components should keep activation stats.
    ///
    /// # Returns
    /// The request, or an error if the example names unknown nodes or misses an input.
    pub fn for_example(
        nnet: &Nnet,
        eg: &NnetExample,
        need_model_derivative: bool,
        store_component_stats: bool,
    ) -> Result<Self> {
        let mut inputs = Vec::new();
        for io in eg.io() {
            let index = nnet
                .node_index(io.name())
                .ok_or_else(|| NnetErr::UnknownNode(io.name().to_string()))?;

            if nnet.is_input_node(index) {
                inputs.push(IoSpecification {
                    name: io.name().to_string(),
                    num_rows: io.num_rows(),
                    has_deriv: false,
                });
            }
        }

        for index in nnet.input_nodes() {
            let name = nnet.node_name(index);
            if !inputs.iter().any(|spec| spec.name == name) {
                return Err(NnetErr::MissingInput(name.to_string()));
            }
        }

        let num_rows = inputs.iter().map(|spec| spec.num_rows).max().unwrap_or(0);
        let outputs = nnet
            .output_nodes()
            .map(|index| IoSpecification {
                name: nnet.node_name(index).to_string(),
                num_rows,
                has_deriv: need_model_derivative,
            })
            .collect();

        Ok(Self {
            inputs,
            outputs,
            need_model_derivative,
            store_component_stats,
        })
    }
}

/// An executable plan: the nodes to evaluate, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Computation {
    steps: Vec<usize>,
    need_model_derivative: bool,
}

impl Computation {
    pub fn steps(&self) -> &[usize] {
        &self.steps
    }

    pub fn need_model_derivative(&self) -> bool {
        self.need_model_derivative
    }

    pub fn contains(&self, node: usize) -> bool {
        self.steps.binary_search(&node).is_ok()
    }
}

/// Turns computation requests into plans.
pub trait Compiler {
    fn compile(&mut self, request: &ComputationRequest) -> Result<Rc<Computation>>;
}

/// A `Compiler` bound to one network that remembers every plan it has produced.
pub struct CachingCompiler<'a> {
    nnet: &'a Nnet,
    cache: HashMap<ComputationRequest, Rc<Computation>>,
}

impl<'a> CachingCompiler<'a> {
    pub fn new(nnet: &'a Nnet) -> Self {
        Self {
            nnet,
            cache: HashMap::new(),
        }
    }

    /// The number of distinct requests compiled so far.
    pub fn num_cached(&self) -> usize {
        self.cache.len()
    }

    fn compile_uncached(&self, request: &ComputationRequest) -> Result<Computation> {
        let nnet = self.nnet;
        let mut needed = vec![false; nnet.num_nodes()];
        let mut stack = Vec::with_capacity(request.outputs.len());

        for spec in &request.outputs {
            let index = nnet
                .node_index(&spec.name)
                .ok_or_else(|| NnetErr::UnknownNode(spec.name.clone()))?;
            if !nnet.is_output_node(index) {
                return Err(NnetErr::NotAnOutputNode(spec.name.clone()));
            }
            stack.push(index);
        }

        while let Some(index) = stack.pop() {
            if needed[index] {
                continue;
            }
            needed[index] = true;

            match nnet.node(index).kind() {
                NodeKind::Input { .. } => {
                    let name = nnet.node_name(index);
                    if !request.inputs.iter().any(|spec| spec.name == name) {
                        return Err(NnetErr::MissingInput(name.to_string()));
                    }
                }
                NodeKind::Component { input, .. } | NodeKind::Output { input, .. } => {
                    stack.push(*input)
                }
            }
        }

        let steps = (0..nnet.num_nodes()).filter(|&i| needed[i]).collect();
        Ok(Computation {
            steps,
            need_model_derivative: request.need_model_derivative,
        })
    }
}

impl Compiler for CachingCompiler<'_> {
    fn compile(&mut self, request: &ComputationRequest) -> Result<Rc<Computation>> {
        if let Some(computation) = self.cache.get(request) {
            return Ok(Rc::clone(computation));
        }

        let computation = Rc::new(self.compile_uncached(request)?);
        debug!(
            steps = computation.steps.len(),
            deriv = request.need_model_derivative;
            "compiled new computation"
        );
        self.cache.insert(request.clone(), Rc::clone(&computation));
        Ok(computation)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::{NnetBuilder, NnetIo, ObjectiveType, component::Component};

    fn nnet() -> Nnet {
        NnetBuilder::new()
            .input("input", 2)
            .and_then(|b| b.component("affine", "input", Component::affine((2, 2))))
            .and_then(|b| b.component("unused", "input", Component::sigmoid(2)))
            .and_then(|b| b.output("output", "affine", ObjectiveType::Linear))
            .unwrap()
            .build()
    }

    fn eg(rows: usize) -> NnetExample {
        NnetExample::new([NnetIo::new("input", Array2::zeros((rows, 2)))])
    }

    #[test]
    fn request_lists_inputs_and_every_output() {
        let nnet = nnet();
        let request = ComputationRequest::for_example(&nnet, &eg(4), true, false).unwrap();

        assert_eq!(request.inputs.len(), 1);
        assert_eq!(request.inputs[0].num_rows, 4);
        assert_eq!(request.outputs.len(), 1);
        assert_eq!(request.outputs[0].name, "output");
        assert!(request.outputs[0].has_deriv);
    }

    #[test]
    fn request_requires_every_input_node() {
        let nnet = nnet();
        let err = ComputationRequest::for_example(&nnet, &NnetExample::new([]), false, false)
            .unwrap_err();
        assert_eq!(err, NnetErr::MissingInput("input".into()));
    }

    #[test]
    fn compiler_skips_unreachable_nodes_and_caches_plans() {
        let nnet = nnet();
        let mut compiler = CachingCompiler::new(&nnet);
        let request = ComputationRequest::for_example(&nnet, &eg(4), false, false).unwrap();

        let first = compiler.compile(&request).unwrap();
        let second = compiler.compile(&request).unwrap();

        assert_eq!(first.steps(), &[0, 1, 3]);
        assert!(!first.contains(2));
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(compiler.num_cached(), 1);

        let other = ComputationRequest::for_example(&nnet, &eg(6), false, false).unwrap();
        compiler.compile(&other).unwrap();
        assert_eq!(compiler.num_cached(), 2);
    }
}
