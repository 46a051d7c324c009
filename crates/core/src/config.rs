use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::DisplayPolicy;
use crate::domain::quote::ProductId;

/// Effective application configuration: where the quote service lives, how to
/// log, and the polling tunables of every product vertical. Built from
/// defaults, patched by an optional TOML file, then `PREMIA_*` environment
/// variables, then programmatic overrides.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub logging: LoggingConfig,
    verticals: BTreeMap<ProductVertical, VerticalConfig>,
}

#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub base_url: String,
    pub bearer_token: SecretString,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

/// The six product flows the storefront quotes. Each carries its own polling
/// tunables; the engine itself is vertical-agnostic and consumes the tunables
/// as data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductVertical {
    MotorLiability,
    MotorComprehensive,
    Home,
    Earthquake,
    SupplementaryLiability,
    Health,
}

impl ProductVertical {
    pub const ALL: [Self; 6] = [
        Self::MotorLiability,
        Self::MotorComprehensive,
        Self::Home,
        Self::Earthquake,
        Self::SupplementaryLiability,
        Self::Health,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::MotorLiability => "motor_liability",
            Self::MotorComprehensive => "motor_comprehensive",
            Self::Home => "home",
            Self::Earthquake => "earthquake",
            Self::SupplementaryLiability => "supplementary_liability",
            Self::Health => "health",
        }
    }
}

impl std::str::FromStr for ProductVertical {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|vertical| vertical.key() == normalized)
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "unknown product vertical `{value}` (expected one of motor_liability|\
                     motor_comprehensive|home|earthquake|supplementary_liability|health)"
                ))
            })
    }
}

/// Polling tunables for one product vertical. All durations are data, not
/// code: the same engine serves every vertical.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerticalConfig {
    pub allowed_product_ids: Vec<ProductId>,
    pub poll_interval_secs: u64,
    pub session_timeout_secs: u64,
    /// When set, the first `Active` quote is surfaced immediately and
    /// polling continues silently for at most this long.
    pub fast_path_background_secs: Option<u64>,
    pub coverage_fields: Vec<String>,
    pub display_policy: DisplayPolicy,
}

impl VerticalConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn fast_path_background(&self) -> Option<Duration> {
        self.fast_path_background_secs.map(Duration::from_secs)
    }

    pub fn defaults_for(vertical: ProductVertical) -> Self {
        match vertical {
            ProductVertical::MotorLiability => Self {
                allowed_product_ids: product_ids(&["mtpl"]),
                poll_interval_secs: 3,
                session_timeout_secs: 180,
                fast_path_background_secs: None,
                coverage_fields: field_names(&[
                    "bodily_injury_per_person",
                    "bodily_injury_per_accident",
                    "property_damage_per_accident",
                    "legal_protection",
                ]),
                display_policy: DisplayPolicy::ActiveOnly,
            },
            ProductVertical::MotorComprehensive => Self {
                allowed_product_ids: product_ids(&["casco"]),
                poll_interval_secs: 5,
                session_timeout_secs: 300,
                fast_path_background_secs: Some(30),
                coverage_fields: field_names(&[
                    "vehicle_own_damage",
                    "theft",
                    "natural_perils",
                    "glass",
                    "replacement_vehicle",
                    "roadside_assistance",
                ]),
                display_policy: DisplayPolicy::ActiveWithPlaceholders,
            },
            ProductVertical::Home => Self {
                allowed_product_ids: product_ids(&["home"]),
                poll_interval_secs: 5,
                session_timeout_secs: 300,
                fast_path_background_secs: Some(30),
                coverage_fields: field_names(&[
                    "building",
                    "contents",
                    "theft",
                    "water_damage",
                    "liability_to_neighbours",
                ]),
                display_policy: DisplayPolicy::ActiveOnly,
            },
            ProductVertical::Earthquake => Self {
                allowed_product_ids: product_ids(&["earthquake"]),
                poll_interval_secs: 3,
                session_timeout_secs: 180,
                fast_path_background_secs: None,
                coverage_fields: field_names(&[
                    "building_sum_insured",
                    "contents_sum_insured",
                    "deductible_rate",
                ]),
                display_policy: DisplayPolicy::ActiveOnly,
            },
            ProductVertical::SupplementaryLiability => Self {
                allowed_product_ids: product_ids(&["supplementary_liability"]),
                poll_interval_secs: 5,
                session_timeout_secs: 300,
                fast_path_background_secs: None,
                coverage_fields: field_names(&[
                    "per_event_limit",
                    "annual_aggregate_limit",
                    "legal_defence",
                ]),
                display_policy: DisplayPolicy::ActiveOnly,
            },
            ProductVertical::Health => Self {
                allowed_product_ids: product_ids(&["health"]),
                poll_interval_secs: 5,
                session_timeout_secs: 300,
                fast_path_background_secs: Some(30),
                coverage_fields: field_names(&[
                    "inpatient",
                    "outpatient",
                    "maternity",
                    "dental",
                    "optical",
                ]),
                display_policy: DisplayPolicy::ActiveWithPlaceholders,
            },
        }
    }
}

fn product_ids(ids: &[&str]) -> Vec<ProductId> {
    ids.iter().map(|id| ProductId((*id).to_owned())).collect()
}

fn field_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_owned()).collect()
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub bearer_token: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    source: Option<SourcePatch>,
    logging: Option<LoggingPatch>,
    verticals: Option<BTreeMap<String, VerticalPatch>>,
}

#[derive(Debug, Default, Deserialize)]
struct SourcePatch {
    base_url: Option<String>,
    bearer_token: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct VerticalPatch {
    allowed_product_ids: Option<Vec<String>>,
    poll_interval_secs: Option<u64>,
    session_timeout_secs: Option<u64>,
    fast_path_background_secs: Option<u64>,
    coverage_fields: Option<Vec<String>>,
    display_policy: Option<DisplayPolicy>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                base_url: "https://quote-aggregator.example.com".to_string(),
                bearer_token: String::new().into(),
                request_timeout_secs: 10,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            verticals: ProductVertical::ALL
                .into_iter()
                .map(|vertical| (vertical, VerticalConfig::defaults_for(vertical)))
                .collect(),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("premia.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn vertical(&self, vertical: ProductVertical) -> VerticalConfig {
        self.verticals
            .get(&vertical)
            .cloned()
            .unwrap_or_else(|| VerticalConfig::defaults_for(vertical))
    }

    pub fn verticals(&self) -> impl Iterator<Item = (ProductVertical, &VerticalConfig)> {
        self.verticals.iter().map(|(vertical, config)| (*vertical, config))
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(source) = patch.source {
            if let Some(base_url) = source.base_url {
                self.source.base_url = base_url;
            }
            if let Some(bearer_token_value) = source.bearer_token {
                self.source.bearer_token = bearer_token_value.into();
            }
            if let Some(request_timeout_secs) = source.request_timeout_secs {
                self.source.request_timeout_secs = request_timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(verticals) = patch.verticals {
            for (key, vertical_patch) in verticals {
                let vertical: ProductVertical = key.parse()?;
                let config = self
                    .verticals
                    .entry(vertical)
                    .or_insert_with(|| VerticalConfig::defaults_for(vertical));
                apply_vertical_patch(config, vertical_patch);
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PREMIA_SOURCE_BASE_URL") {
            self.source.base_url = value;
        }
        if let Some(value) = read_env("PREMIA_SOURCE_BEARER_TOKEN") {
            self.source.bearer_token = value.into();
        }
        if let Some(value) = read_env("PREMIA_SOURCE_REQUEST_TIMEOUT_SECS") {
            self.source.request_timeout_secs =
                parse_u64("PREMIA_SOURCE_REQUEST_TIMEOUT_SECS", &value)?;
        }

        let log_level = read_env("PREMIA_LOGGING_LEVEL").or_else(|| read_env("PREMIA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PREMIA_LOGGING_FORMAT").or_else(|| read_env("PREMIA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.source.base_url = base_url;
        }
        if let Some(bearer_token_value) = overrides.bearer_token {
            self.source.bearer_token = bearer_token_value.into();
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.source.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("source.base_url must not be empty".to_owned()));
        }
        if !self.source.base_url.starts_with("http://")
            && !self.source.base_url.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!(
                "source.base_url must be an http(s) URL, got `{}`",
                self.source.base_url
            )));
        }
        if self.source.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "source.request_timeout_secs must be greater than zero".to_owned(),
            ));
        }

        for (vertical, config) in &self.verticals {
            let key = vertical.key();
            if config.allowed_product_ids.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "verticals.{key}.allowed_product_ids must not be empty"
                )));
            }
            if config.poll_interval_secs == 0 {
                return Err(ConfigError::Validation(format!(
                    "verticals.{key}.poll_interval_secs must be greater than zero"
                )));
            }
            if config.session_timeout_secs <= config.poll_interval_secs {
                return Err(ConfigError::Validation(format!(
                    "verticals.{key}.session_timeout_secs must exceed the poll interval"
                )));
            }
            if config.fast_path_background_secs == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "verticals.{key}.fast_path_background_secs must be greater than zero when set"
                )));
            }
            if config.coverage_fields.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "verticals.{key}.coverage_fields must not be empty"
                )));
            }
        }

        Ok(())
    }
}

fn apply_vertical_patch(config: &mut VerticalConfig, patch: VerticalPatch) {
    if let Some(ids) = patch.allowed_product_ids {
        config.allowed_product_ids = ids.into_iter().map(ProductId).collect();
    }
    if let Some(poll_interval_secs) = patch.poll_interval_secs {
        config.poll_interval_secs = poll_interval_secs;
    }
    if let Some(session_timeout_secs) = patch.session_timeout_secs {
        config.session_timeout_secs = session_timeout_secs;
    }
    if let Some(fast_path_background_secs) = patch.fast_path_background_secs {
        config.fast_path_background_secs = Some(fast_path_background_secs);
    }
    if let Some(coverage_fields) = patch.coverage_fields {
        config.coverage_fields = coverage_fields;
    }
    if let Some(display_policy) = patch.display_policy {
        config.display_policy = display_policy;
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    if let Some(env_path) = read_env("PREMIA_CONFIG") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Some(path);
        }
    }
    let default = PathBuf::from("premia.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}
