use std::{error::Error, fmt, io};

use nnet::{Float, NnetErr};

/// The xvector module's result type.
pub type Result<T> = std::result::Result<T, XvecErr>;

/// Failures of the xvector diagnostics.
#[derive(Debug)]
pub enum XvecErr {
    /// The network lacks the `s` or `b` output node.
    MissingOutputNode { name: &'static str },
    /// No output other than `s` and `b` exists.
    NoPairEmbeddingOutput,
    /// More than one output could be the pair-embedding output.
    AmbiguousOutputs { candidates: Vec<String> },
    /// The gradient network was asked for but derivatives were never requested.
    DerivNotRequested,
    /// The network's outputs do not have the shapes the objective needs.
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A frame weight that is negative or not finite.
    InvalidWeight { weight: Float },
    Config(serde_json::Error),
    Io(io::Error),
    Nnet(NnetErr),
}

impl XvecErr {
    /// Whether the error reveals a network/driver mismatch that no amount of
    /// retrying will fix. Callers are expected to stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            XvecErr::MissingOutputNode { .. }
                | XvecErr::NoPairEmbeddingOutput
                | XvecErr::AmbiguousOutputs { .. }
                | XvecErr::DerivNotRequested
                | XvecErr::SizeMismatch { .. }
                | XvecErr::InvalidWeight { .. }
        )
    }
}

impl fmt::Display for XvecErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XvecErr::MissingOutputNode { name } => write!(
                f,
                "the nnet is expected to have two output nodes named s and b, '{name}' is missing"
            ),
            XvecErr::NoPairEmbeddingOutput => {
                write!(f, "the nnet has no output node other than s and b")
            }
            XvecErr::AmbiguousOutputs { candidates } => write!(
                f,
                "expected exactly one output node besides s and b, found {}: {}",
                candidates.len(),
                candidates.join(", ")
            ),
            XvecErr::DerivNotRequested => {
                write!(f, "deriv() called when no derivatives were requested")
            }
            XvecErr::SizeMismatch { what, got, expected } => {
                write!(f, "size mismatch for {what}: got {got}, expected {expected}")
            }
            XvecErr::InvalidWeight { weight } => {
                write!(f, "frame weight must be finite and non-negative, got {weight}")
            }
            XvecErr::Config(e) => write!(f, "invalid config: {e}"),
            XvecErr::Io(e) => write!(f, "io error: {e}"),
            XvecErr::Nnet(e) => write!(f, "nnet error: {e}"),
        }
    }
}

impl Error for XvecErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            XvecErr::Config(e) => Some(e),
            XvecErr::Io(e) => Some(e),
            XvecErr::Nnet(e) => Some(e),
            _ => None,
        }
    }
}

impl From<NnetErr> for XvecErr {
    fn from(value: NnetErr) -> Self {
        Self::Nnet(value)
    }
}

impl From<serde_json::Error> for XvecErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value)
    }
}

impl From<io::Error> for XvecErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
