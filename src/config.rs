//! Configuration handling for dataops

use anyhow::{Context, Result};

use crate::ops::PercentagePolicy;

/// Default row ceiling enforced before any operation runs
pub const DEFAULT_MAX_ROWS: usize = 100_000;
/// Default ceiling for preview limits
pub const DEFAULT_MAX_PREVIEW_ROWS: usize = 10_000;
/// Default preview size when a request does not ask for one
pub const DEFAULT_PREVIEW_LIMIT: usize = 50;

/// Output format for operation results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Terminal,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "terminal" | "table" => Ok(OutputFormat::Terminal),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Configuration consumed by the request boundary.
///
/// The engine never reads this directly; the boundary threads the relevant
/// values into each operation as plain parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Largest table accepted by any operation
    pub max_rows: usize,
    /// Largest preview limit; bigger requests are clamped
    pub max_preview_rows: usize,
    /// Origins allowed to call the service (`*` allows any)
    pub cors_origins: Vec<String>,
    /// How bare numbers are read when converting to percentages
    pub percentage_policy: PercentagePolicy,
    /// Output format
    pub output_format: OutputFormat,
    /// Emit compact instead of pretty JSON
    pub compact: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            max_preview_rows: DEFAULT_MAX_PREVIEW_ROWS,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
            percentage_policy: PercentagePolicy::default(),
            output_format: OutputFormat::default(),
            compact: false,
        }
    }
}

impl Config {
    /// Defaults overlaid with `DATAOPS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("DATAOPS_MAX_ROWS") {
            config.max_rows = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid DATAOPS_MAX_ROWS: {}", raw))?;
        }
        if let Some(raw) = lookup("DATAOPS_MAX_PREVIEW_ROWS") {
            config.max_preview_rows = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid DATAOPS_MAX_PREVIEW_ROWS: {}", raw))?;
        }
        if let Some(raw) = lookup("DATAOPS_CORS_ORIGINS") {
            config.cors_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = lookup("DATAOPS_PERCENTAGE_POLICY") {
            config.percentage_policy = raw
                .trim()
                .parse()
                .map_err(anyhow::Error::msg)
                .context("Invalid DATAOPS_PERCENTAGE_POLICY")?;
        }

        Ok(config)
    }

    /// Set the row ceiling
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Set the preview ceiling
    pub fn with_max_preview_rows(mut self, max_preview_rows: usize) -> Self {
        self.max_preview_rows = max_preview_rows;
        self
    }

    /// Set allowed origins
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Set the percentage normalisation policy
    pub fn with_percentage_policy(mut self, policy: PercentagePolicy) -> Self {
        self.percentage_policy = policy;
        self
    }

    /// Set output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Enable compact JSON output
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Check an origin against the allow list
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.cors_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATAOPS_MAX_ROWS", "500"),
            ("DATAOPS_CORS_ORIGINS", "https://a.example, https://b.example"),
            ("DATAOPS_PERCENTAGE_POLICY", "suffix-only"),
        ]))
        .unwrap();
        assert_eq!(config.max_rows, 500);
        assert_eq!(config.max_preview_rows, DEFAULT_MAX_PREVIEW_ROWS);
        assert_eq!(config.percentage_policy, PercentagePolicy::SuffixOnly);
        assert!(config.is_origin_allowed("https://b.example"));
        assert!(!config.is_origin_allowed("https://c.example"));
    }

    #[test]
    fn test_invalid_env_value() {
        let err = Config::from_lookup(lookup(&[("DATAOPS_MAX_ROWS", "lots")])).unwrap_err();
        assert!(err.to_string().contains("DATAOPS_MAX_ROWS"));
    }

    #[test]
    fn test_wildcard_origin() {
        let config = Config::default().with_cors_origins(vec!["*".to_string()]);
        assert!(config.is_origin_allowed("https://anything.example"));
    }
}
