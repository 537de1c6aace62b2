pub mod compiler;
pub mod component;
pub mod computer;
pub mod error;
pub mod example;
pub mod matrix;
pub mod network;

pub use compiler::{CachingCompiler, Compiler, Computation, ComputationRequest, IoSpecification};
pub use computer::{ComputeOptions, NnetComputer};
pub use error::{NnetErr, Result};
pub use example::{NnetExample, NnetIo};
pub use network::{Nnet, NnetBuilder, Node, NodeKind, ObjectiveType};

/// Scalar type used by every matrix in the network.
pub type Float = f64;
