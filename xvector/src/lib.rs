pub mod config;
pub mod diagnostics;
pub mod error;
pub mod objective;
pub mod outputs;
pub mod stats;

pub use config::NnetComputeProbOptions;
pub use diagnostics::NnetXvectorComputeProb;
pub use error::{Result, XvecErr};
pub use objective::{ObjectiveOutput, XvectorDerivs, XvectorObjective};
pub use outputs::{OutputRole, XvectorOutputs};
pub use stats::{ObjectiveStats, SimpleObjectiveInfo};
