//! Run configuration
//!
//! Read from a JSON file; every field has a default so an empty object (or no
//! file at all) gives the standard run.

use crate::classify::PrecedencePolicy;
use crate::error::Result;
use crate::records::LoadOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Tie-break when full-coverage and base-coverage rules disagree on a key
    #[serde(default)]
    pub precedence: PrecedencePolicy,

    /// Classify keys on the rayon pool (output is still sorted by key)
    #[serde(default)]
    pub parallel: bool,

    /// Reject unrecognised status codes when loading snapshots
    #[serde(default)]
    pub strict_status_codes: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            precedence: PrecedencePolicy::PreferFullCoverage,
            parallel: false,
            strict_status_codes: false,
        }
    }
}

impl RunConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            strict_status_codes: self.strict_status_codes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(RunConfig::from_json_str("{}").unwrap(), RunConfig::default());
    }

    #[test]
    fn test_parse_fields() {
        let config = RunConfig::from_json_str(r#"{"precedence": "error", "parallel": true}"#).unwrap();
        assert_eq!(config.precedence, PrecedencePolicy::Error);
        assert!(config.parallel);
        assert!(!config.strict_status_codes);

        let config = RunConfig::from_json_str(r#"{"precedence": "prefer_base_coverage"}"#).unwrap();
        assert_eq!(config.precedence, PrecedencePolicy::PreferBaseCoverage);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(RunConfig::from_json_str(r#"{"precedence": "coin_flip"}"#).is_err());
    }

    #[test]
    fn test_load_sample_config() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/sample/run.json");
        let config = RunConfig::from_json_path(path).expect("Failed to load sample config");
        assert_eq!(config, RunConfig::default());
    }
}
