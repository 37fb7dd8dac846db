//! Settings file support.
//!
//! A `knitshape.toml` can pin the geometry tolerances, the yarn symbol and
//! default gauges for a machine. Every section is optional; missing keys
//! take the built-in defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::dxf::flatten::SPLINE_SAMPLES;
use crate::heal::HEAL_TOLERANCE;

/// Environment variable naming a settings file.
pub const CONFIG_ENV: &str = "KNITSHAPE_CONFIG";

/// Settings file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "knitshape.toml";

/// Root of the settings file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct KnitConfig {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub geometry: GeometrySettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub gauge: GaugeSettings,
}

impl KnitConfig {
    /// Load from an explicit path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: KnitConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Find the settings to use.
    ///
    /// An explicit path wins, then `$KNITSHAPE_CONFIG`, then
    /// `./knitshape.toml`. With none of them, the defaults apply.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            Self::from_file(local)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings that would silently produce garbage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.geometry;
        for (name, value) in [
            ("geometry.heal_tolerance", g.heal_tolerance),
            ("geometry.arc_tolerance", g.arc_tolerance),
            ("geometry.curve_tolerance", g.curve_tolerance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::invalid(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if g.spline_samples < 2 {
            return Err(ConfigError::invalid(format!(
                "geometry.spline_samples must be at least 2, got {}",
                g.spline_samples
            )));
        }
        if !(1..=9).contains(&self.output.yarn_symbol) {
            return Err(ConfigError::invalid(format!(
                "output.yarn_symbol must be a digit from 1 to 9, got {}",
                self.output.yarn_symbol
            )));
        }
        for (name, value) in [("gauge.sts10", self.gauge.sts10), ("gauge.rows10", self.gauge.rows10)] {
            if let Some(v) = value {
                if !(v.is_finite() && v > 0.0) {
                    return Err(ConfigError::invalid(format!(
                        "{name} must be a positive number, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingSettings {
    #[serde(default = "LoggingSettings::default_level")]
    pub level: String,
}

impl LoggingSettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// Tolerances used while recovering outlines.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeometrySettings {
    /// Expand/shrink distance used to weld gaps, in drawing units. Also the
    /// deviation allowed when flattening polyline bulges and hatch curves,
    /// and the endpoint distance for line/arc chaining.
    pub heal_tolerance: f64,
    /// Chord deviation for `ARC` entities before chaining.
    pub arc_tolerance: f64,
    /// Chord deviation for SVG curves, in user units.
    pub curve_tolerance: f64,
    /// Uniform samples per spline.
    pub spline_samples: usize,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            heal_tolerance: HEAL_TOLERANCE,
            arc_tolerance: 0.5,
            curve_tolerance: 0.1,
            spline_samples: SPLINE_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    /// Digit written for every knitted stitch in the YARNS block.
    pub yarn_symbol: u8,
    /// Write an SVG preview next to each single-piece shape file.
    pub write_preview: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            yarn_symbol: 4,
            write_preview: false,
        }
    }
}

/// Default machine gauge; command-line values take precedence.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
pub struct GaugeSettings {
    #[serde(default)]
    pub sts10: Option<f64>,
    #[serde(default)]
    pub rows10: Option<f64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn defaults() {
        let cfg = KnitConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.geometry.heal_tolerance, 0.05);
        assert_eq!(cfg.geometry.arc_tolerance, 0.5);
        assert_eq!(cfg.geometry.spline_samples, 101);
        assert_eq!(cfg.output.yarn_symbol, 4);
        assert!(!cfg.output.write_preview);
        assert!(cfg.gauge.sts10.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_from_temp_file() {
        let file = write_config(
            r#"
            [logging]
            level = "debug"

            [geometry]
            heal_tolerance = 0.1

            [output]
            yarn_symbol = 2
            write_preview = true

            [gauge]
            sts10 = 28.0
            rows10 = 36.5
            "#,
        );

        let cfg = KnitConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.geometry.heal_tolerance, 0.1);
        // Untouched keys keep their defaults
        assert_eq!(cfg.geometry.arc_tolerance, 0.5);
        assert_eq!(cfg.output.yarn_symbol, 2);
        assert!(cfg.output.write_preview);
        assert_eq!(cfg.gauge.sts10, Some(28.0));
        assert_eq!(cfg.gauge.rows10, Some(36.5));
    }

    #[test]
    fn explicit_path_wins_discovery() {
        let file = write_config("[output]\nyarn_symbol = 7\n");
        let cfg = KnitConfig::discover(Some(file.path())).expect("discover");
        assert_eq!(cfg.output.yarn_symbol, 7);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = KnitConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let file = write_config("[geometry\nheal_tolerance = ");
        let err = KnitConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let file = write_config("[output]\nyarn_symbol = 0\n");
        assert!(matches!(
            KnitConfig::from_file(file.path()).unwrap_err(),
            ConfigError::Invalid { .. }
        ));

        let file = write_config("[gauge]\nsts10 = -5\n");
        assert!(KnitConfig::from_file(file.path()).is_err());

        let file = write_config("[geometry]\nheal_tolerance = 0\n");
        assert!(KnitConfig::from_file(file.path()).is_err());
    }
}
