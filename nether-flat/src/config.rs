//! Builder and verifier options
//!
//! Both option sets deserialize from TOML so tools can keep them next to their
//! schemas. Missing keys fall back to the defaults below.
//!
//! ```toml
//! [builder]
//! initial_capacity = 4096
//! force_defaults = false
//!
//! [verifier]
//! max_depth = 64
//! ```

use serde::{Deserialize, Serialize};

/// Options controlling how a [`FlatBuilder`](crate::FlatBuilder) lays out data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderOptions {
    /// Bytes reserved up front (default: 1024)
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
    /// Write scalar fields even when they equal their default (default: false)
    #[serde(default)]
    pub force_defaults: bool,
    /// Share identical vtables between tables (default: true)
    #[serde(default = "default_true")]
    pub dedup_vtables: bool,
}

/// Limits applied by the [`Verifier`](crate::Verifier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierOptions {
    /// Maximum table/vector nesting depth (default: 64)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Maximum number of tables visited (default: 1,000,000)
    #[serde(default = "default_max_tables")]
    pub max_tables: usize,
    /// Maximum accepted buffer size in bytes (default: 1 GiB)
    #[serde(default = "default_max_apparent_size")]
    pub max_apparent_size: usize,
    /// Reject scalars and offsets that are not aligned to their size (default: true)
    #[serde(default = "default_true")]
    pub check_alignment: bool,
}

/// Both option sets as they appear in a TOML document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlatConfig {
    #[serde(default)]
    pub builder: BuilderOptions,
    #[serde(default)]
    pub verifier: VerifierOptions,
}

impl FlatConfig {
    /// Parse options from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

fn default_true() -> bool {
    true
}
fn default_initial_capacity() -> usize {
    1024
}
fn default_max_depth() -> usize {
    64
}
fn default_max_tables() -> usize {
    1_000_000
}
fn default_max_apparent_size() -> usize {
    1 << 30
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            force_defaults: false,
            dedup_vtables: default_true(),
        }
    }
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_tables: default_max_tables(),
            max_apparent_size: default_max_apparent_size(),
            check_alignment: default_true(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = FlatConfig::from_toml_str("").unwrap();
        assert_eq!(config, FlatConfig::default());
        assert_eq!(config.builder.initial_capacity, 1024);
        assert!(config.builder.dedup_vtables);
        assert_eq!(config.verifier.max_depth, 64);
    }

    #[test]
    fn test_partial_override() {
        let config = FlatConfig::from_toml_str(
            r#"
            [builder]
            force_defaults = true

            [verifier]
            max_tables = 10
            check_alignment = false
            "#,
        )
        .unwrap();

        assert!(config.builder.force_defaults);
        assert_eq!(config.builder.initial_capacity, 1024);
        assert_eq!(config.verifier.max_tables, 10);
        assert!(!config.verifier.check_alignment);
        assert_eq!(config.verifier.max_depth, 64);
    }
}
