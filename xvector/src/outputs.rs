use nnet::Nnet;

use crate::{Result, XvecErr};

/// Name of the output holding the packed scoring matrix.
pub const S_NAME: &str = "s";

/// Name of the output holding the bias.
pub const B_NAME: &str = "b";

/// What an output node of an xvector network provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRole {
    PairEmbedding,
    ScoreMatrix,
    Bias,
}

impl OutputRole {
    /// Classifies an output by name: `s` and `b` are fixed, anything else holds
    /// the pair embeddings.
    pub fn of(name: &str) -> Self {
        match name {
            S_NAME => OutputRole::ScoreMatrix,
            B_NAME => OutputRole::Bias,
            _ => OutputRole::PairEmbedding,
        }
    }
}

/// The validated output layout of an xvector network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XvectorOutputs {
    pair_embedding: String,
}

impl XvectorOutputs {
    /// Classifies the output nodes of `nnet`.
    ///
    /// # Returns
    /// The layout, or an error if `s` or `b` is not an output node, or if there is
    /// not exactly one other output node.
    pub fn classify(nnet: &Nnet) -> Result<Self> {
        for name in [S_NAME, B_NAME] {
            let is_output = nnet
                .node_index(name)
                .is_some_and(|index| nnet.is_output_node(index));

            if !is_output {
                return Err(XvecErr::MissingOutputNode { name });
            }
        }

        let mut candidates: Vec<String> = nnet
            .output_nodes()
            .map(|index| nnet.node_name(index))
            .filter(|name| OutputRole::of(name) == OutputRole::PairEmbedding)
            .map(str::to_string)
            .collect();

        match candidates.len() {
            0 => Err(XvecErr::NoPairEmbeddingOutput),
            1 => Ok(Self {
                pair_embedding: candidates.remove(0),
            }),
            _ => Err(XvecErr::AmbiguousOutputs { candidates }),
        }
    }

    pub fn pair_embedding(&self) -> &str {
        &self.pair_embedding
    }

    pub fn s(&self) -> &str {
        S_NAME
    }

    pub fn b(&self) -> &str {
        B_NAME
    }
}
