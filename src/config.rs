//! Run configuration for the snapping pipeline.
//!
//! A [`SnapConfig`] is built from compiled-in defaults, optionally overlaid with
//! a TOML file, and finally with command line overrides applied by the binary.
//! The API key is held as a `SecretString` and never appears in `Debug` output.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::error::AppError;
use crate::table::BatchSize;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Credential shipped in sample configs. Detected before any request is sent.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_ORS_API_KEY";

/// OpenRouteService snap endpoint using the `driving-car` profile.
pub const DEFAULT_ENDPOINT: &str = "https://api.openrouteservice.org/v2/snap/driving-car";

pub const DEFAULT_INPUT_PATH: &str = "mock_flood_data.csv";
pub const DEFAULT_OUTPUT_PATH: &str = "mock_flood_data_snapped.csv";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ─────────────────────────────────────────────────────────────────────────────
// ColumnNames
// ─────────────────────────────────────────────────────────────────────────────

/// Names of the columns read from and appended to the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub longitude: String,
    pub latitude: String,
    pub snapped_latitude: String,
    pub snapped_longitude: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            longitude: "Longitude (Dec. Deg)".to_string(),
            latitude: "Latitude (Dec. Deg)".to_string(),
            snapped_latitude: "Snapped Latitude (Road)".to_string(),
            snapped_longitude: "Snapped Longitude (Road)".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SnapConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a pipeline run needs. Passed explicitly into [`crate::pipeline::run`].
#[derive(Clone)]
pub struct SnapConfig {
    /// ORS API key, sent verbatim in the `Authorization` header.
    pub api_key: SecretString,
    /// Absolute URL of the snap endpoint.
    pub endpoint: String,
    pub batch_size: BatchSize,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub columns: ColumnNames,
    /// Optional search radius forwarded to the API as `radius`.
    pub radius_meters: Option<f64>,
    pub timeout: Duration,
}

impl std::fmt::Debug for SnapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapConfig")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("batch_size", &self.batch_size)
            .field("input_path", &self.input_path)
            .field("output_path", &self.output_path)
            .field("columns", &self.columns)
            .field("radius_meters", &self.radius_meters)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::from(PLACEHOLDER_API_KEY.to_string()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            batch_size: BatchSize::default(),
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            columns: ColumnNames::default(),
            radius_meters: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SnapConfig {
    /// Loads a TOML config file and overlays it on the defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` if the file cannot be read, is not
    /// valid TOML, or contains unrecognized keys.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses TOML text and overlays it on the defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| AppError::Configuration(format!("Invalid config file: {}", e)))?;
        let mut config = Self::default();
        file.apply_to(&mut config);
        Ok(config)
    }

    /// Replaces the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = SecretString::from(key.into());
        self
    }

    /// Returns true if the API key is empty or still the shipped placeholder.
    pub fn has_placeholder_key(&self) -> bool {
        let key = self.api_key.expose_secret().trim();
        key.is_empty() || key == PLACEHOLDER_API_KEY
    }

    /// Checks the configuration before any file or network work starts.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` for a placeholder API key, a zero
    /// batch size, an unparseable endpoint, or a non-positive radius/timeout.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.has_placeholder_key() {
            return Err(AppError::Configuration(format!(
                "Please replace '{}' with a real OpenRouteService API key.",
                PLACEHOLDER_API_KEY
            )));
        }

        if self.batch_size.as_usize() == 0 {
            return Err(AppError::Configuration(
                "batch_size must be at least 1".to_string(),
            ));
        }

        let endpoint = Url::parse(&self.endpoint).map_err(|e| {
            AppError::Configuration(format!("Invalid endpoint '{}': {}", self.endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(AppError::Configuration(format!(
                "Endpoint must be an http(s) URL, got scheme '{}'",
                endpoint.scheme()
            )));
        }

        if let Some(radius) = self.radius_meters {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(AppError::Configuration(
                    "radius_meters must be a positive number".to_string(),
                ));
            }
        }

        if self.timeout.is_zero() {
            return Err(AppError::Configuration(
                "timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.columns.snapped_latitude == self.columns.snapped_longitude {
            return Err(AppError::Configuration(format!(
                "snapped_latitude_column and snapped_longitude_column are both '{}'",
                self.columns.snapped_latitude
            )));
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File format
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk TOML layout. Every key is optional; unknown keys are rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_key: Option<String>,
    endpoint: Option<String>,
    batch_size: Option<u32>,
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    longitude_column: Option<String>,
    latitude_column: Option<String>,
    snapped_latitude_column: Option<String>,
    snapped_longitude_column: Option<String>,
    radius_meters: Option<f64>,
    timeout_secs: Option<u64>,
}

impl ConfigFile {
    fn apply_to(self, config: &mut SnapConfig) {
        if let Some(key) = self.api_key {
            config.api_key = SecretString::from(key);
        }
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(n) = self.batch_size {
            config.batch_size = BatchSize::from_count(n);
        }
        if let Some(path) = self.input_path {
            config.input_path = path;
        }
        if let Some(path) = self.output_path {
            config.output_path = path;
        }
        if let Some(name) = self.longitude_column {
            config.columns.longitude = name;
        }
        if let Some(name) = self.latitude_column {
            config.columns.latitude = name;
        }
        if let Some(name) = self.snapped_latitude_column {
            config.columns.snapped_latitude = name;
        }
        if let Some(name) = self.snapped_longitude_column {
            config.columns.snapped_longitude = name;
        }
        if self.radius_meters.is_some() {
            config.radius_meters = self.radius_meters;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_ors_setup() {
        let config = SnapConfig::default();

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.batch_size.as_usize(), 10);
        assert_eq!(config.input_path, PathBuf::from("mock_flood_data.csv"));
        assert_eq!(config.columns.longitude, "Longitude (Dec. Deg)");
        assert_eq!(config.columns.snapped_latitude, "Snapped Latitude (Road)");
        assert!(config.radius_meters.is_none());
        assert!(config.has_placeholder_key());
    }

    #[test]
    fn placeholder_key_fails_validation() {
        let err = SnapConfig::default().validate().unwrap_err();
        match err {
            AppError::Configuration(msg) => assert!(msg.contains(PLACEHOLDER_API_KEY)),
            other => panic!("Expected Configuration, got {:?}", other),
        }
    }

    #[test]
    fn blank_key_is_treated_as_placeholder() {
        let config = SnapConfig::default().with_api_key("   ");
        assert!(config.has_placeholder_key());
        assert!(config.validate().is_err());
    }

    #[test]
    fn real_key_passes_validation() {
        let config = SnapConfig::default().with_api_key("5b3ce3597851110001cf6248");
        assert!(!config.has_placeholder_key());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_batch_size_fails_validation() {
        let mut config = SnapConfig::default().with_api_key("key");
        config.batch_size = BatchSize::Custom(0);

        assert!(matches!(config.validate(), Err(AppError::Configuration(_))));
    }

    #[test]
    fn bad_endpoint_fails_validation() {
        let mut config = SnapConfig::default().with_api_key("key");
        config.endpoint = "not a url".to_string();
        assert!(matches!(config.validate(), Err(AppError::Configuration(_))));

        config.endpoint = "ftp://example.com/snap".to_string();
        assert!(matches!(config.validate(), Err(AppError::Configuration(_))));
    }

    #[test]
    fn non_positive_radius_fails_validation() {
        let mut config = SnapConfig::default().with_api_key("key");
        config.radius_meters = Some(0.0);
        assert!(config.validate().is_err());

        config.radius_meters = Some(350.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn identical_snapped_column_names_fail_validation() {
        let config = SnapConfig::from_toml_str(
            r#"
api_key = "key"
snapped_latitude_column = "snap"
snapped_longitude_column = "snap"
"#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        match err {
            AppError::Configuration(msg) => assert!(msg.contains("'snap'"), "got: {}", msg),
            other => panic!("Expected Configuration, got: {:?}", other),
        }
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = SnapConfig::from_toml_str(
            r#"
            api_key = "abc"
            endpoint = "http://localhost:8080/ors/v2/snap/foot-walking"
            batch_size = 25
            input_path = "in.csv"
            output_path = "out.csv"
            longitude_column = "lon"
            latitude_column = "lat"
            radius_meters = 300.0
            timeout_secs = 5
            "#,
        )
        .expect("config should parse");

        assert!(!config.has_placeholder_key());
        assert_eq!(config.endpoint, "http://localhost:8080/ors/v2/snap/foot-walking");
        assert_eq!(config.batch_size.as_usize(), 25);
        assert_eq!(config.input_path, PathBuf::from("in.csv"));
        assert_eq!(config.output_path, PathBuf::from("out.csv"));
        assert_eq!(config.columns.longitude, "lon");
        assert_eq!(config.columns.latitude, "lat");
        // Unset keys keep their defaults
        assert_eq!(config.columns.snapped_longitude, "Snapped Longitude (Road)");
        assert_eq!(config.radius_meters, Some(300.0));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = SnapConfig::from_toml_str("batch_sise = 10\n");
        match result {
            Err(AppError::Configuration(msg)) => assert!(msg.contains("batch_sise")),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = SnapConfig::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = SnapConfig::default().with_api_key("super_secret_key_12345");
        let debug_output = format!("{:?}", config);

        assert!(!debug_output.contains("super_secret_key_12345"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("driving-car"));
    }
}
