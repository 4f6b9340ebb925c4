use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_USER_AGENT: &str = concat!("freelancer-cards/", env!("CARGO_PKG_VERSION"));
const DEFAULT_CHAT_MESSAGE: &str = "Hola! Me interesa contratar tus servicios.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read controller config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("visibility threshold must be within 0.0..=1.0, got {0}")]
    Threshold(f64),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub profile_navigation_ms: u64,
    pub skill_navigation_ms: u64,
    pub toast_lifetime_ms: u64,
    pub toast_exit_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            profile_navigation_ms: 150,
            skill_navigation_ms: 200,
            toast_lifetime_ms: 3000,
            toast_exit_ms: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VisibilitySettings {
    pub threshold: f64,
    pub root_margin_px: f64,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            root_margin_px: 50.0,
        }
    }
}

/// Currency rendering for hourly rates. Defaults follow Argentine pesos.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CurrencyFormat {
    pub symbol: String,
    pub grouping: String,
    pub decimal: String,
    pub max_fraction_digits: usize,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            symbol: String::from("AR$"),
            grouping: String::from("."),
            decimal: String::from(","),
            max_fraction_digits: 2,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    base_url: String,
    user_agent: String,
    chat_message: String,
    timings: Timings,
    visibility: VisibilitySettings,
    currency: CurrencyFormat,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chat_message: DEFAULT_CHAT_MESSAGE.to_string(),
            timings: Timings::default(),
            visibility: VisibilitySettings::default(),
            currency: CurrencyFormat::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub base_url: Url,
    pub user_agent: String,
    pub chat_message: String,
    pub timings: Timings,
    pub visibility: VisibilitySettings,
    pub currency: CurrencyFormat,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig::default()).expect("default controller config")
    }
}

impl ControllerConfig {
    /// Loads YAML config from `config_path`; a missing path or file yields defaults.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let raw = match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                serde_yaml::from_str::<RawConfig>(&contents)?
            }
            _ => RawConfig::default(),
        };
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let threshold = raw.visibility.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Threshold(threshold));
        }

        Ok(Self {
            base_url: Url::parse(&raw.base_url)?,
            user_agent: raw.user_agent,
            chat_message: raw.chat_message,
            timings: raw.timings,
            visibility: raw.visibility,
            currency: raw.currency,
        })
    }
}
