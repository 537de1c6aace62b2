use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire nnet module.
pub type Result<T> = std::result::Result<T, NnetErr>;

/// The nnet module's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum NnetErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    UnknownNode(String),
    DuplicateNode(String),
    NotAnOutputNode(String),
    MissingInput(String),
    OutputNotComputed(String),
    ComponentMismatch {
        index: usize,
    },
    NoDerivatives,
}

impl Display for NnetErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NnetErr::SizeMismatch { what, got, expected } => {
                write!(f, "size mismatch for {what}: got {got}, expected {expected}")
            }
            NnetErr::UnknownNode(name) => write!(f, "no node named '{name}' in the nnet"),
            NnetErr::DuplicateNode(name) => write!(f, "node '{name}' is defined twice"),
            NnetErr::NotAnOutputNode(name) => write!(f, "node '{name}' is not an output node"),
            NnetErr::MissingInput(name) => {
                write!(f, "the computation needs input '{name}' but it was not supplied")
            }
            NnetErr::OutputNotComputed(name) => {
                write!(f, "output '{name}' has not been computed, run the forward pass first")
            }
            NnetErr::ComponentMismatch { index } => write!(
                f,
                "component {index} of the gradient nnet does not match the nnet it derives"
            ),
            NnetErr::NoDerivatives => write!(
                f,
                "backward pass requested on a computation compiled without derivatives"
            ),
        }
    }
}

impl Error for NnetErr {}
