//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! Only a missing default file falls back to built-in defaults; any file that
//! was found or named but does not load is an error.

use crate::services::alert_engine::{AlertConfig, UrgencyBands};
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Config path used when neither `--config` nor `CONFIG_FILE` is given
pub const DEFAULT_CONFIG_PATH: &str = "config/dev.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatterMode {
    /// Deterministic template table only
    Template,
    /// Chat-completions rewrite with template fallback
    Chat,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SiteConfig {
    /// Deployment identifier stamped on egress records
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "ambuclear".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrgencyBandsConfig {
    #[serde(default = "default_band_critical")]
    pub critical: f64,
    #[serde(default = "default_band_high")]
    pub high: f64,
    #[serde(default = "default_band_medium")]
    pub medium: f64,
}

fn default_band_critical() -> f64 {
    100.0
}

fn default_band_high() -> f64 {
    300.0
}

fn default_band_medium() -> f64 {
    500.0
}

impl Default for UrgencyBandsConfig {
    fn default() -> Self {
        Self {
            critical: default_band_critical(),
            high: default_band_high(),
            medium: default_band_medium(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertSection {
    #[serde(default = "default_radius_meters")]
    pub radius_meters: f64,
    #[serde(default = "default_heading_threshold")]
    pub heading_threshold_degrees: f64,
    /// Half-width of the cone in front of the vehicle that counts as "ahead"
    #[serde(default = "default_ahead_cone")]
    pub ahead_cone_degrees: f64,
    /// Whether a vehicle exactly at the radius still alerts
    #[serde(default = "default_radius_inclusive")]
    pub radius_inclusive: bool,
    /// Noun used in bystander messages
    #[serde(default = "default_vehicle_label")]
    pub vehicle_label: String,
    #[serde(default)]
    pub urgency_bands: UrgencyBandsConfig,
}

fn default_radius_meters() -> f64 {
    500.0
}

fn default_heading_threshold() -> f64 {
    30.0
}

fn default_ahead_cone() -> f64 {
    30.0
}

fn default_radius_inclusive() -> bool {
    true
}

fn default_vehicle_label() -> String {
    "Ambulance".to_string()
}

impl Default for AlertSection {
    fn default() -> Self {
        Self {
            radius_meters: default_radius_meters(),
            heading_threshold_degrees: default_heading_threshold(),
            ahead_cone_degrees: default_ahead_cone(),
            radius_inclusive: default_radius_inclusive(),
            vehicle_label: default_vehicle_label(),
            urgency_bands: UrgencyBandsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormatterConfig {
    #[serde(default = "default_formatter_mode")]
    pub mode: FormatterMode,
    /// OpenAI-compatible chat completions endpoint
    #[serde(default = "default_formatter_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_formatter_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_formatter_api_key_env")]
    pub api_key_env: String,
    /// Hard cap on a rewrite round trip; the template message is used past it
    #[serde(default = "default_formatter_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_formatter_mode() -> FormatterMode {
    FormatterMode::Template
}

fn default_formatter_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_formatter_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_formatter_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_formatter_timeout_ms() -> u64 {
    1500
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            mode: default_formatter_mode(),
            endpoint: default_formatter_endpoint(),
            model: default_formatter_model(),
            api_key_env: default_formatter_api_key_env(),
            timeout_ms: default_formatter_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    #[serde(default)]
    pub enabled: bool,
    /// File path for decision egress (JSONL format)
    #[serde(default = "default_egress_file")]
    pub file: String,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self { enabled: false, file: default_egress_file() }
    }
}

fn default_egress_file() -> String {
    "decisions.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    10
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub alert: AlertSection,
    #[serde(default)]
    pub formatter: FormatterConfig,
    #[serde(default)]
    pub egress: EgressConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    alert: AlertConfig,
    vehicle_label: String,
    formatter_mode: FormatterMode,
    formatter_endpoint: String,
    formatter_model: String,
    formatter_api_key_env: String,
    formatter_timeout_ms: u64,
    egress_enabled: bool,
    egress_file: String,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        let alert = &toml_config.alert;
        let bands = &alert.urgency_bands;

        Self {
            site_id: toml_config.site.id,
            alert: AlertConfig {
                radius_meters: alert.radius_meters,
                heading_threshold_degrees: alert.heading_threshold_degrees,
                ahead_cone_degrees: alert.ahead_cone_degrees,
                radius_inclusive: alert.radius_inclusive,
                urgency_bands: UrgencyBands {
                    critical: bands.critical,
                    high: bands.high,
                    medium: bands.medium,
                },
            },
            vehicle_label: toml_config.alert.vehicle_label,
            formatter_mode: toml_config.formatter.mode,
            formatter_endpoint: toml_config.formatter.endpoint,
            formatter_model: toml_config.formatter.model,
            formatter_api_key_env: toml_config.formatter.api_key_env,
            formatter_timeout_ms: toml_config.formatter.timeout_ms,
            egress_enabled: toml_config.egress.enabled,
            egress_file: toml_config.egress.file,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file: config_file.to_string(),
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        DEFAULT_CONFIG_PATH.to_string()
    }

    /// Load configuration from a TOML file
    ///
    /// The alert section is validated here so a bad band ordering fails at
    /// startup rather than on the first evaluation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let config = Self::from_toml(toml_config, &path.display().to_string());
        config
            .alert
            .validate()
            .with_context(|| format!("Invalid [alert] section in {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from a path
    ///
    /// Falls back to defaults only when `path` is the default path and the
    /// file does not exist. Read, parse and validation errors are returned.
    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        if path == DEFAULT_CONFIG_PATH && !Path::new(path).exists() {
            eprintln!("Warning: {path} not found. Using defaults.");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Load configuration from the path resolved from args or environment
    pub fn load(args: &[String]) -> anyhow::Result<Self> {
        Self::load_from_path(&Self::resolve_config_path(args))
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn alert(&self) -> &AlertConfig {
        &self.alert
    }

    pub fn vehicle_label(&self) -> &str {
        &self.vehicle_label
    }

    pub fn formatter_mode(&self) -> &FormatterMode {
        &self.formatter_mode
    }

    pub fn formatter_endpoint(&self) -> &str {
        &self.formatter_endpoint
    }

    pub fn formatter_model(&self) -> &str {
        &self.formatter_model
    }

    pub fn formatter_api_key_env(&self) -> &str {
        &self.formatter_api_key_env
    }

    pub fn formatter_timeout_ms(&self) -> u64 {
        self.formatter_timeout_ms
    }

    pub fn egress_enabled(&self) -> bool {
        self.egress_enabled
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.site_id(), "ambuclear");
        assert_eq!(config.alert().radius_meters, 500.0);
        assert_eq!(config.alert().heading_threshold_degrees, 30.0);
        assert_eq!(config.alert().ahead_cone_degrees, 30.0);
        assert!(config.alert().radius_inclusive);
        assert_eq!(config.alert().urgency_bands.critical, 100.0);
        assert_eq!(config.alert().urgency_bands.high, 300.0);
        assert_eq!(config.alert().urgency_bands.medium, 500.0);
        assert_eq!(config.vehicle_label(), "Ambulance");
        assert_eq!(config.formatter_mode(), &FormatterMode::Template);
        assert_eq!(config.metrics_interval_secs(), 10);
        assert_eq!(config.config_file(), "default");
    }

    #[test]
    fn test_default_matches_engine_default() {
        assert_eq!(Config::default().alert(), &AlertConfig::default());
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        let args: Vec<String> = vec![
            "ambuclear".to_string(),
            "--config".to_string(),
            "config/chennai.toml".to_string(),
        ];
        assert_eq!(Config::resolve_config_path(&args), "config/chennai.toml");
    }

    #[test]
    fn test_resolve_config_path_from_arg_equals() {
        let args: Vec<String> =
            vec!["ambuclear".to_string(), "--config=config/prod.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/prod.toml");
    }

    #[test]
    fn test_egress_default() {
        let egress = EgressConfig::default();
        assert_eq!(egress.file, "decisions.jsonl");
        assert!(!egress.enabled);

        let config = Config::default();
        assert_eq!(config.egress_file(), "decisions.jsonl");
        assert!(!config.egress_enabled());
    }

    #[test]
    fn test_partial_toml_uses_section_defaults() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[alert]
radius_meters = 750.0

[alert.urgency_bands]
critical = 150.0
"#,
        )
        .unwrap();
        let config = Config::from_toml(toml_config, "inline");

        assert_eq!(config.alert().radius_meters, 750.0);
        assert_eq!(config.alert().heading_threshold_degrees, 30.0);
        assert_eq!(config.alert().urgency_bands.critical, 150.0);
        assert_eq!(config.alert().urgency_bands.high, 300.0);
        assert_eq!(config.formatter_timeout_ms(), 1500);
    }
}
