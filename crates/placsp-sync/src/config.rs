//! Configuration management
//!
//! Settings come from defaults, then the process environment (after loading a
//! `.env` file), then command-line overrides applied by the binary.

use crate::accumulator::{FileDateKeys, SourceChannel, DEFAULT_FULL_DATE_PATTERN, DEFAULT_YEAR_MONTH_PATTERN};
use crate::projection::ProjectionMode;
use crate::status::ArchivalPolicy;
use crate::sync::SyncOptions;
use placsp_common::{PlacspError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default months an incremental feed page is kept in the staging directory.
pub const DEFAULT_RETENTION_MONTHS: u32 = 3;

/// Default directory holding the monthly ZIP archives.
pub const DEFAULT_ARCHIVE_DIR: &str = "./data/zip";

/// Default directory the feed pages are staged into.
pub const DEFAULT_STAGING_DIR: &str = "./data/zip/atom";

/// Default directory for table output and run summaries.
pub const DEFAULT_OUTPUT_DIR: &str = "./data/out";

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub year_month_pattern: String,
    pub full_date_pattern: String,
    pub archive_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub output_dir: PathBuf,
    pub retention_months: u32,
    pub two_tables: bool,
    pub include_own_resource: bool,
    pub include_consultations: bool,
    pub output_name_profiles: String,
    pub output_name_aggregated: String,
    pub archival_policy: ArchivalPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            year_month_pattern: DEFAULT_YEAR_MONTH_PATTERN.to_string(),
            full_date_pattern: DEFAULT_FULL_DATE_PATTERN.to_string(),
            archive_dir: PathBuf::from(DEFAULT_ARCHIVE_DIR),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            retention_months: DEFAULT_RETENTION_MONTHS,
            two_tables: true,
            include_own_resource: false,
            include_consultations: false,
            output_name_profiles: SourceChannel::ContractingProfiles.default_output_name().to_string(),
            output_name_aggregated: SourceChannel::AggregatedPlatforms.default_output_name().to_string(),
            archival_policy: ArchivalPolicy::default(),
        }
    }
}

impl SyncConfig {
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Load `.env`, read the environment and validate
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `PLACSP_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    pub fn merge_env(mut self) -> Result<Self> {
        if let Ok(pattern) = std::env::var("PLACSP_YEAR_MONTH_PATTERN") {
            self.year_month_pattern = pattern;
        }
        if let Ok(pattern) = std::env::var("PLACSP_FULL_DATE_PATTERN") {
            self.full_date_pattern = pattern;
        }
        if let Ok(dir) = std::env::var("PLACSP_ARCHIVE_DIR") {
            self.archive_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("PLACSP_STAGING_DIR") {
            self.staging_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("PLACSP_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(months) = parse_env("PLACSP_RETENTION_MONTHS")? {
            self.retention_months = months;
        }
        if let Some(two_tables) = parse_env("PLACSP_TWO_TABLES")? {
            self.two_tables = two_tables;
        }
        if let Some(include) = parse_env("PLACSP_INCLUDE_OWN_RESOURCE")? {
            self.include_own_resource = include;
        }
        if let Some(include) = parse_env("PLACSP_INCLUDE_CONSULTATIONS")? {
            self.include_consultations = include;
        }
        if let Ok(name) = std::env::var("PLACSP_OUTPUT_NAME_PROFILES") {
            self.output_name_profiles = name;
        }
        if let Ok(name) = std::env::var("PLACSP_OUTPUT_NAME_AGGREGATED") {
            self.output_name_aggregated = name;
        }
        if let Ok(policy) = std::env::var("PLACSP_ARCHIVAL_POLICY") {
            self.archival_policy = policy.parse().map_err(PlacspError::config)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.date_keys()?;

        if self.output_name_profiles.trim().is_empty() || self.output_name_aggregated.trim().is_empty() {
            return Err(PlacspError::config("Output names cannot be empty"));
        }
        if self.output_name_profiles == self.output_name_aggregated {
            return Err(PlacspError::config("Each channel needs its own output name"));
        }

        Ok(())
    }

    pub fn date_keys(&self) -> Result<FileDateKeys> {
        for pattern in [&self.year_month_pattern, &self.full_date_pattern] {
            let compiled = regex::Regex::new(pattern).map_err(|e| PlacspError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            if compiled.captures_len() < 2 {
                return Err(PlacspError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: "pattern needs a capture group for the date".to_string(),
                });
            }
        }

        FileDateKeys::new(&self.year_month_pattern, &self.full_date_pattern).map_err(|e| {
            PlacspError::InvalidPattern {
                pattern: self.year_month_pattern.clone(),
                reason: e.to_string(),
            }
        })
    }

    pub fn output_name(&self, channel: SourceChannel) -> &str {
        match channel {
            SourceChannel::ContractingProfiles => &self.output_name_profiles,
            SourceChannel::AggregatedPlatforms => &self.output_name_aggregated,
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            mode: if self.two_tables {
                ProjectionMode::TwoTables
            } else {
                ProjectionMode::Combined
            },
            include_own_resource: self.include_own_resource,
            include_consultations: self.include_consultations,
            archival_policy: self.archival_policy,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| PlacspError::config(format!("Invalid value for {}: '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}

/// Builder for [`SyncConfig`]
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.archive_dir = dir.into();
        self
    }

    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.staging_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn retention_months(mut self, months: u32) -> Self {
        self.config.retention_months = months;
        self
    }

    pub fn two_tables(mut self, two_tables: bool) -> Self {
        self.config.two_tables = two_tables;
        self
    }

    pub fn include_own_resource(mut self, include: bool) -> Self {
        self.config.include_own_resource = include;
        self
    }

    pub fn include_consultations(mut self, include: bool) -> Self {
        self.config.include_consultations = include;
        self
    }

    pub fn archival_policy(mut self, policy: ArchivalPolicy) -> Self {
        self.config.archival_policy = policy;
        self
    }

    pub fn year_month_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.year_month_pattern = pattern.into();
        self
    }

    pub fn full_date_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.full_date_pattern = pattern.into();
        self
    }

    pub fn build(self) -> SyncConfig {
        self.config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "PLACSP_RETENTION_MONTHS",
        "PLACSP_TWO_TABLES",
        "PLACSP_INCLUDE_CONSULTATIONS",
        "PLACSP_OUTPUT_NAME_PROFILES",
        "PLACSP_ARCHIVAL_POLICY",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();

        assert_eq!(config.retention_months, 3);
        assert!(config.two_tables);
        assert!(!config.include_own_resource);
        assert_eq!(config.output_name(SourceChannel::ContractingProfiles), "licPerfContratPLACSP");
        assert_eq!(config.output_name(SourceChannel::AggregatedPlatforms), "licPlatafAgregadas");
        assert_eq!(config.sync_options().mode, ProjectionMode::TwoTables);
        config.validate().unwrap();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("PLACSP_RETENTION_MONTHS", "6");
        std::env::set_var("PLACSP_TWO_TABLES", "false");
        std::env::set_var("PLACSP_INCLUDE_CONSULTATIONS", "true");
        std::env::set_var("PLACSP_OUTPUT_NAME_PROFILES", "perfiles");
        std::env::set_var("PLACSP_ARCHIVAL_POLICY", "legacy");

        let config = SyncConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.retention_months, 6);
        assert_eq!(config.sync_options().mode, ProjectionMode::Combined);
        assert!(config.include_consultations);
        assert_eq!(config.output_name_profiles, "perfiles");
        assert_eq!(config.archival_policy, ArchivalPolicy::Legacy);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_number() {
        clear_env();
        std::env::set_var("PLACSP_RETENTION_MONTHS", "three");

        let result = SyncConfig::from_env();
        clear_env();

        assert!(matches!(result, Err(PlacspError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_invalid_pattern() {
        let config = SyncConfig::builder().year_month_pattern("_((\\d{6}").build();
        assert!(matches!(config.validate(), Err(PlacspError::InvalidPattern { .. })));

        let config = SyncConfig::builder().full_date_pattern("_\\d{8}_").build();
        assert!(matches!(config.validate(), Err(PlacspError::InvalidPattern { .. })));
    }

    #[test]
    fn test_validate_rejects_empty_output_name() {
        let mut config = SyncConfig::default();
        config.output_name_aggregated = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder() {
        let config = SyncConfig::builder()
            .retention_months(1)
            .two_tables(false)
            .include_own_resource(true)
            .archival_policy(ArchivalPolicy::Legacy)
            .output_dir("/tmp/out")
            .build();

        let options = config.sync_options();
        assert_eq!(options.mode, ProjectionMode::Combined);
        assert!(options.include_own_resource);
        assert_eq!(options.archival_policy, ArchivalPolicy::Legacy);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }
}
