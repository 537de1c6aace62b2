use std::{fs, path::Path};

use nnet::ComputeOptions;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Options of `NnetXvectorComputeProb`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NnetComputeProbOptions {
    /// Backpropagate the objective into a gradient network.
    pub compute_deriv: bool,
    pub compute_config: ComputeOptions,
}

impl NnetComputeProbOptions {
    pub fn new(compute_deriv: bool) -> Self {
        Self {
            compute_deriv,
            ..Default::default()
        }
    }

    /// Reads the options from a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = NnetComputeProbOptions::from_json(r#"{ "compute_deriv": true }"#).unwrap();
        assert!(config.compute_deriv);
        assert!(!config.compute_config.debug);

        let config =
            NnetComputeProbOptions::from_json(r#"{ "compute_config": { "debug": true } }"#)
                .unwrap();
        assert!(!config.compute_deriv);
        assert!(config.compute_config.debug);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = NnetComputeProbOptions::from_json("{ compute_deriv").unwrap_err();
        assert!(matches!(err, crate::XvecErr::Config(_)));
        assert!(!err.is_fatal());
    }
}
