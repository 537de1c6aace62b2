use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Float, NnetErr, Result, component::Component};

/// How the objective of an output node is interpreted when reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveType {
    /// The output is a log-likelihood.
    Linear,
    Quadratic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Input { dim: usize },
    Component { component: usize, input: usize },
    Output { input: usize, objective: ObjectiveType },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    kind: NodeKind,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
}

/// A computation graph with named nodes. Nodes are kept in topological order:
/// every node reads from a node with a smaller index.
#[derive(Debug, Clone, PartialEq)]
pub struct Nnet {
    nodes: Vec<Node>,
    components: Vec<Component>,
    index: HashMap<String, usize>,
}

impl Nnet {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn node_name(&self, index: usize) -> &str {
        self.nodes[index].name()
    }

    /// Returns the index of the node called `name`, if any.
    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn is_input_node(&self, index: usize) -> bool {
        matches!(self.nodes[index].kind, NodeKind::Input { .. })
    }

    pub fn is_output_node(&self, index: usize) -> bool {
        matches!(self.nodes[index].kind, NodeKind::Output { .. })
    }

    /// Iterates over the indices of the output nodes.
    pub fn output_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(|&i| self.is_output_node(i))
    }

    /// Iterates over the indices of the input nodes.
    pub fn input_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(|&i| self.is_input_node(i))
    }

    /// The objective type of the output node called `name`, `None` if there is
    /// no such output node.
    pub fn objective_type(&self, name: &str) -> Option<ObjectiveType> {
        let index = self.node_index(name)?;
        match self.nodes[index].kind {
            NodeKind::Output { objective, .. } => Some(objective),
            _ => None,
        }
    }

    pub fn component(&self, index: usize) -> &Component {
        &self.components[index]
    }

    pub fn component_mut(&mut self, index: usize) -> &mut Component {
        &mut self.components[index]
    }

    pub fn num_parameters(&self) -> usize {
        self.components.iter().map(Component::num_parameters).sum()
    }

    /// Zeroes every parameter. Applied to a copy of a network this yields an
    /// empty gradient accumulator.
    pub fn set_zero(&mut self) {
        self.components.iter_mut().for_each(Component::set_zero);
    }

    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.components.iter_mut().for_each(|c| c.randomize(rng));
    }

    /// Sum over all parameters of the element-wise product with `other`.
    ///
    /// # Returns
    /// The dot product, or an error if the networks do not share a topology.
    pub fn dot_product(&self, other: &Nnet) -> Result<Float> {
        if self.components.len() != other.components.len() {
            return Err(NnetErr::SizeMismatch {
                what: "components",
                got: other.components.len(),
                expected: self.components.len(),
            });
        }

        self.components
            .iter()
            .zip(&other.components)
            .enumerate()
            .map(|(index, (a, b))| a.dot_product(b).ok_or(NnetErr::ComponentMismatch { index }))
            .sum()
    }

    /// Whether `other` has the same nodes and component shapes, ignoring parameter values.
    pub fn same_topology(&self, other: &Nnet) -> bool {
        self.nodes == other.nodes
            && self.components.len() == other.components.len()
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|(a, b)| a.same_shape(b))
    }
}

/// Builds `Nnet`s node by node, validating names and dimensions as it goes.
#[derive(Debug, Default)]
pub struct NnetBuilder {
    nodes: Vec<Node>,
    components: Vec<Component>,
    index: HashMap<String, usize>,
    dims: Vec<usize>,
}

impl NnetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an input node with `dim` columns.
    pub fn input(self, name: &str, dim: usize) -> Result<Self> {
        self.push(name, NodeKind::Input { dim }, dim)
    }

    /// Adds a component node reading from the node called `input`.
    pub fn component(mut self, name: &str, input: &str, component: Component) -> Result<Self> {
        let input = self.resolve(input)?;
        if let Some(expected) = component.input_dim() {
            if self.dims[input] != expected {
                return Err(NnetErr::SizeMismatch {
                    what: "component input",
                    got: self.dims[input],
                    expected,
                });
            }
        }

        let dim = component.output_dim();
        let kind = NodeKind::Component {
            component: self.components.len(),
            input,
        };
        self.components.push(component);
        self.push(name, kind, dim)
    }

    /// Adds an output node exposing the node called `input`.
    pub fn output(self, name: &str, input: &str, objective: ObjectiveType) -> Result<Self> {
        let input = self.resolve(input)?;
        let dim = self.dims[input];
        self.push(name, NodeKind::Output { input, objective }, dim)
    }

    pub fn build(self) -> Nnet {
        Nnet {
            nodes: self.nodes,
            components: self.components,
            index: self.index,
        }
    }

    fn resolve(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| NnetErr::UnknownNode(name.to_string()))
    }

    fn push(mut self, name: &str, kind: NodeKind, dim: usize) -> Result<Self> {
        if self.index.contains_key(name) {
            return Err(NnetErr::DuplicateNode(name.to_string()));
        }

        self.index.insert(name.to_string(), self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            kind,
        });
        self.dims.push(dim);
        Ok(self)
    }
}
