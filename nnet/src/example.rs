use ndarray::{Array2, ArrayView2};

use crate::Float;

/// A named matrix of features, one frame per row.
#[derive(Debug, Clone, PartialEq)]
pub struct NnetIo {
    name: String,
    features: Array2<Float>,
}

impl NnetIo {
    pub fn new(name: impl Into<String>, features: Array2<Float>) -> Self {
        Self {
            name: name.into(),
            features,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> ArrayView2<'_, Float> {
        self.features.view()
    }

    pub fn num_rows(&self) -> usize {
        self.features.nrows()
    }
}

/// One minibatch: the named inputs of the network plus the weight of each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct NnetExample {
    io: Vec<NnetIo>,
    weight: Float,
}

impl NnetExample {
    /// Creates a new `NnetExample` where every frame weighs `1.0`.
    pub fn new<I>(io: I) -> Self
    where
        I: IntoIterator<Item = NnetIo>,
    {
        Self {
            io: io.into_iter().collect(),
            weight: 1.0,
        }
    }

    /// Sets the per-frame weight.
    pub fn with_weight(mut self, weight: Float) -> Self {
        self.weight = weight;
        self
    }

    pub fn io(&self) -> &[NnetIo] {
        &self.io
    }

    pub fn weight(&self) -> Float {
        self.weight
    }
}
