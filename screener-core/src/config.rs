//! Screener configuration.
//!
//! Keys keep the names users already write in their config files
//! (`Assets`, `RSI_Period`, `LR_Higher_Timeframe`, ...). Every key is optional;
//! a missing key takes its default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

use crate::alerts::{AlertThresholds, StochAlertMethod};
use crate::domain::Timeframe;
use crate::trend::TrendConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    #[serde(rename = "Timeframe")]
    pub timeframe: Timeframe,
    #[serde(rename = "Assets")]
    pub assets: Vec<String>,

    #[serde(rename = "RSI_Period")]
    pub rsi_period: usize,
    #[serde(rename = "RSI_Overbought")]
    pub rsi_overbought: f64,
    #[serde(rename = "RSI_Oversold")]
    pub rsi_oversold: f64,

    #[serde(rename = "Stoch_K_Period")]
    pub stoch_k_period: usize,
    #[serde(rename = "Stoch_K_Smooth")]
    pub stoch_k_smooth: usize,
    #[serde(rename = "Stoch_D_Smooth")]
    pub stoch_d_smooth: usize,
    #[serde(rename = "Stoch_Overbought")]
    pub stoch_overbought: f64,
    #[serde(rename = "Stoch_Oversold")]
    pub stoch_oversold: f64,
    #[serde(rename = "Stoch_Alert_Method")]
    pub stoch_alert_method: StochAlertMethod,

    #[serde(rename = "EMA_Long_Period")]
    pub ema_long_period: usize,
    #[serde(rename = "EMA_Short_Period")]
    pub ema_short_period: usize,
    #[serde(rename = "EMA_Proximity_ATR_Ratio")]
    pub ema_proximity_atr_ratio: f64,
    #[serde(rename = "ATR_Period")]
    pub atr_period: usize,

    #[serde(rename = "LR_Length")]
    pub lr_length: usize,
    #[serde(rename = "LR_ATR_Length")]
    pub lr_atr_length: usize,
    #[serde(rename = "LR_R2_Threshold")]
    pub lr_r2_threshold: f64,
    #[serde(rename = "LR_Slope_Threshold")]
    pub lr_slope_threshold: f64,
    #[serde(rename = "LR_Sideways_Slope_Threshold")]
    pub lr_sideways_slope_threshold: f64,
    #[serde(rename = "LR_Volatility_MA_Length")]
    pub lr_volatility_ma_length: usize,
    #[serde(rename = "LR_Higher_Timeframe")]
    pub lr_higher_timeframe: Timeframe,

    /// Candles requested per symbol on the base timeframe.
    #[serde(rename = "Candle_Count")]
    pub candle_count: usize,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        let trend = TrendConfig::default();
        let alerts = AlertThresholds::default();
        Self {
            timeframe: Timeframe(15),
            assets: Vec::new(),
            rsi_period: 14,
            rsi_overbought: alerts.rsi_overbought,
            rsi_oversold: alerts.rsi_oversold,
            stoch_k_period: 14,
            stoch_k_smooth: 3,
            stoch_d_smooth: 3,
            stoch_overbought: alerts.stoch_overbought,
            stoch_oversold: alerts.stoch_oversold,
            stoch_alert_method: alerts.stoch_method,
            ema_long_period: alerts.ema_long_period,
            ema_short_period: alerts.ema_short_period,
            ema_proximity_atr_ratio: alerts.proximity_atr_ratio,
            atr_period: 14,
            lr_length: trend.length,
            lr_atr_length: trend.atr_length,
            lr_r2_threshold: trend.r2_threshold,
            lr_slope_threshold: trend.slope_threshold,
            lr_sideways_slope_threshold: trend.sideways_slope_threshold,
            lr_volatility_ma_length: trend.volatility_ma_length,
            lr_higher_timeframe: Timeframe(240),
            candle_count: 250,
        }
    }
}

impl ScreenerConfig {
    /// Configuration handed to a first-time user.
    pub fn starter() -> Self {
        Self {
            assets: vec!["BTC_USDT".to_string(), "ETH_USDT".to_string()],
            ema_proximity_atr_ratio: 0.15,
            ..Self::default()
        }
    }

    /// Load from `path`: TOML for a `.toml` extension, JSON otherwise.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let config: Self = if is_toml(path) {
            toml::from_str(&text).map_err(|e| parse_err(e.to_string()))?
        } else {
            serde_json::from_str(&text).map_err(|e| parse_err(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Serialize in the format matching `path`'s extension.
    pub fn to_string_for(&self, path: &Path) -> Result<String, ConfigError> {
        if is_toml(path) {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
        } else {
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeframe.minutes() == 0 {
            return Err(ConfigError::Invalid("Timeframe must be at least 1 minute".into()));
        }
        if self.lr_higher_timeframe.minutes() == 0 {
            return Err(ConfigError::Invalid(
                "LR_Higher_Timeframe must be at least 1 minute".into(),
            ));
        }
        if self.candle_count == 0 {
            return Err(ConfigError::Invalid("Candle_Count must be positive".into()));
        }
        Ok(())
    }

    pub fn trend_config(&self) -> TrendConfig {
        TrendConfig {
            length: self.lr_length,
            atr_length: self.lr_atr_length,
            r2_threshold: self.lr_r2_threshold,
            slope_threshold: self.lr_slope_threshold,
            sideways_slope_threshold: self.lr_sideways_slope_threshold,
            volatility_ma_length: self.lr_volatility_ma_length,
        }
    }

    pub fn alert_thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            rsi_overbought: self.rsi_overbought,
            rsi_oversold: self.rsi_oversold,
            stoch_overbought: self.stoch_overbought,
            stoch_oversold: self.stoch_oversold,
            stoch_method: self.stoch_alert_method,
            ema_long_period: self.ema_long_period,
            ema_short_period: self.ema_short_period,
            proximity_atr_ratio: self.ema_proximity_atr_ratio,
        }
    }

    /// Whether the higher-timeframe trend needs its own retrieval.
    pub fn needs_higher_timeframe(&self) -> bool {
        self.lr_higher_timeframe != self.timeframe
    }

    /// Candles requested for the higher-timeframe trend.
    pub fn higher_timeframe_count(&self) -> usize {
        self.lr_length + 50
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

/// Where a scheduler gets its configuration each cycle.
pub trait ConfigSource: Send {
    fn load(&self) -> Result<ScreenerConfig, ConfigError>;
}

/// Re-reads a file on every call so edits apply on the next cycle.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<ScreenerConfig, ConfigError> {
        ScreenerConfig::from_file(&self.path)
    }
}

/// Configuration held in memory and replaceable while a scheduler runs.
/// Each session owns one; an empty slot means no configuration was received.
#[derive(Debug, Clone, Default)]
pub struct SharedConfigSource(Arc<Mutex<Option<ScreenerConfig>>>);

impl SharedConfigSource {
    pub fn new(config: Option<ScreenerConfig>) -> Self {
        Self(Arc::new(Mutex::new(config)))
    }

    pub fn set(&self, config: Option<ScreenerConfig>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn get(&self) -> Option<ScreenerConfig> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ConfigSource for SharedConfigSource {
    fn load(&self) -> Result<ScreenerConfig, ConfigError> {
        self.get()
            .ok_or_else(|| ConfigError::Invalid("no config received".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_keys_take_defaults() {
        let config: ScreenerConfig =
            serde_json::from_str(r#"{"Assets": ["BTC_USDT"], "RSI_Period": 7}"#).unwrap();
        assert_eq!(config.assets, vec!["BTC_USDT"]);
        assert_eq!(config.rsi_period, 7);
        assert_eq!(config.timeframe, Timeframe(15));
        assert_eq!(config.ema_proximity_atr_ratio, 0.5);
        assert_eq!(config.lr_higher_timeframe, Timeframe(240));
        assert_eq!(config.stoch_alert_method, StochAlertMethod::Independent);
        assert_eq!(config.candle_count, 250);
    }

    #[test]
    fn capitalized_key_names_round_trip() {
        let json = serde_json::to_value(ScreenerConfig::starter()).unwrap();
        assert_eq!(json["Timeframe"], 15);
        assert_eq!(json["Stoch_Alert_Method"], 1);
        assert_eq!(json["EMA_Proximity_ATR_Ratio"], 0.15);
        assert_eq!(json["LR_Volatility_MA_Length"], 20);
        let back: ScreenerConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, ScreenerConfig::starter());
    }

    #[test]
    fn unknown_stoch_method_is_rejected() {
        let err = serde_json::from_str::<ScreenerConfig>(r#"{"Stoch_Alert_Method": 3}"#);
        assert!(err.is_err());
    }

    #[test]
    fn zero_timeframe_is_invalid() {
        let config = ScreenerConfig {
            timeframe: Timeframe(0),
            ..ScreenerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn loads_json_and_toml_files() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("config.json");
        let mut f = std::fs::File::create(&json_path).unwrap();
        write!(f, r#"{{"Timeframe": 60, "Assets": ["SOL_USDT"]}}"#).unwrap();
        let config = ScreenerConfig::from_file(&json_path).unwrap();
        assert_eq!(config.timeframe, Timeframe(60));
        assert_eq!(config.assets, vec!["SOL_USDT"]);

        let toml_path = dir.path().join("config.toml");
        std::fs::write(
            &toml_path,
            "Timeframe = 5\nAssets = [\"BTC_USDT\"]\nStoch_Alert_Method = 2\n",
        )
        .unwrap();
        let config = ScreenerConfig::from_file(&toml_path).unwrap();
        assert_eq!(config.timeframe, Timeframe(5));
        assert_eq!(config.stoch_alert_method, StochAlertMethod::EmaGated);
    }

    #[test]
    fn missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            ScreenerConfig::from_file(&missing),
            Err(ConfigError::NotFound(_))
        ));

        let corrupt = dir.path().join("bad.json");
        std::fs::write(&corrupt, "{not json").unwrap();
        assert!(matches!(
            ScreenerConfig::from_file(&corrupt),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn starter_writes_in_both_formats() {
        let starter = ScreenerConfig::starter();
        let toml_text = starter.to_string_for(Path::new("c.toml")).unwrap();
        let back: ScreenerConfig = toml::from_str(&toml_text).unwrap();
        assert_eq!(back, starter);
        let json_text = starter.to_string_for(Path::new("c.json")).unwrap();
        assert!(json_text.contains("\"Assets\""));
    }

    #[test]
    fn higher_timeframe_only_when_different() {
        let mut config = ScreenerConfig::default();
        assert!(config.needs_higher_timeframe());
        assert_eq!(config.higher_timeframe_count(), 250);
        config.lr_higher_timeframe = config.timeframe;
        assert!(!config.needs_higher_timeframe());
    }

    #[test]
    fn shared_source_without_config_is_unavailable() {
        let source = SharedConfigSource::new(None);
        assert!(source.load().is_err());

        let clone = source.clone();
        clone.set(Some(ScreenerConfig::starter()));
        assert_eq!(source.load().unwrap().assets.len(), 2);
    }
}
