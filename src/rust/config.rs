// SPDX-License-Identifier: PMPL-1.0-or-later

//! Engine configuration
//!
//! ```toml
//! check_consistency = true
//!
//! [prover]
//! max_depth = 16
//! timeout_ms = 2000
//!
//! [cache]
//! capacity = 4096
//! path = "/var/lib/tdfol/cache"
//!
//! [[bridge.adapters]]
//! name = "z3"
//! kind = "smt"
//! priority = 5
//! ```
//!
//! Every section is optional and falls back to its defaults. Configuration is
//! always passed explicitly; nothing is read from the environment except the
//! LLM API key variable named in `[llm]`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::bridge::{BridgeConfig, LlmConfig, RateLimitConfig};
use crate::cache::CacheConfig;
use crate::error::{Result, TdfolError};
use crate::parser::ParserConfig;
use crate::prover::ProverBudget;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TdfolConfig {
    /// Reject axiom sets with deontic conflicts before proving
    pub check_consistency: bool,
    pub parser: ParserConfig,
    pub prover: ProverBudget,
    pub cache: CacheConfig,
    pub bridge: BridgeConfig,
    pub llm: LlmConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for TdfolConfig {
    fn default() -> Self {
        TdfolConfig {
            check_consistency: false,
            parser: ParserConfig::default(),
            prover: ProverBudget::default(),
            cache: CacheConfig::default(),
            bridge: BridgeConfig::default(),
            llm: LlmConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl TdfolConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: TdfolConfig =
            toml::from_str(text).map_err(|e| TdfolError::config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TdfolError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TdfolError::config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.parser.validate()?;
        self.prover.validate()?;
        self.cache.validate()?;
        self.bridge.validate()?;
        self.rate_limit.validate()?;
        Ok(())
    }

    /// Native prover only, no external adapters
    pub fn offline() -> Self {
        TdfolConfig {
            bridge: BridgeConfig {
                enabled: false,
                ..BridgeConfig::default()
            },
            ..TdfolConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::AdapterKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(TdfolConfig::from_toml_str("").unwrap(), TdfolConfig::default());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = TdfolConfig::from_toml_str(
            r#"
            check_consistency = true

            [prover]
            max_depth = 16

            [cache]
            capacity = 8
            default_ttl_secs = 60

            [rate_limit]
            capacity = 3
            refill_per_sec = 1.5

            [[bridge.adapters]]
            name = "z3"
            kind = "smt"
            priority = 5
            timeout_ms = 500
            "#,
        )
        .unwrap();
        assert!(config.check_consistency);
        assert_eq!(config.prover.max_depth, 16);
        assert_eq!(config.prover.max_nodes, ProverBudget::default().max_nodes);
        assert_eq!(config.cache.capacity, 8);
        assert_eq!(config.rate_limit.capacity, 3);
        let z3 = &config.bridge.adapters[0];
        assert_eq!(z3.kind, AdapterKind::Smt);
        assert_eq!(z3.priority, Some(5));
        assert!(z3.enabled);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for doc in [
            "[cache]\ncapacity = 0",
            "[prover]\ntimeout_ms = 0",
            "[rate_limit]\nrefill_per_sec = -1.0",
            "[parser]\nmax_depth = 0",
            "check_consistency = \"yes\"",
        ] {
            let err = TdfolConfig::from_toml_str(doc).unwrap_err();
            assert!(err.is_fatal(), "{} should be rejected, got {}", doc, err);
        }
    }

    #[test]
    fn test_duplicate_adapter_names_rejected() {
        let doc = r#"
            [[bridge.adapters]]
            name = "z3"
            kind = "smt"

            [[bridge.adapters]]
            name = "z3"
            kind = "smt"
        "#;
        assert!(matches!(TdfolConfig::from_toml_str(doc), Err(TdfolError::Config(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tdfol.toml");
        let mut config = TdfolConfig::offline();
        config.check_consistency = true;
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(TdfolConfig::from_file(&path).unwrap(), config);
    }
}
