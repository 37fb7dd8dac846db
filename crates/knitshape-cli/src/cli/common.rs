//! Arguments and helpers shared across commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;
use uuid::Uuid;

use knitshape::{ConfigError, ConversionContext, Gauge, KnitConfig, MirrorMode, PieceTransform, Pipeline};

/// Flags that apply to every command.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    pub session: Option<String>,
    pub isolate: bool,
}

/// The drawing and how to read it.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Drawing to read (.dxf or .svg)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Only keep this layer or piece name (repeatable)
    #[arg(long = "layer", value_name = "L")]
    pub layers: Vec<String>,

    /// Millimeters per drawing unit, overriding the file's own units
    #[arg(long, value_name = "S")]
    pub unit_scale: Option<f64>,
}

impl InputArgs {
    pub fn pipeline(&self, config: KnitConfig) -> Pipeline {
        Pipeline::new(config)
            .with_layers(&self.layers)
            .with_unit_scale(self.unit_scale)
    }
}

/// Machine gauge; falls back to the settings file's `[gauge]`.
#[derive(Args, Debug, Clone)]
pub struct GaugeArgs {
    /// Stitches per 10 cm
    #[arg(long, value_name = "N")]
    pub sts10: Option<f64>,

    /// Rows per 10 cm
    #[arg(long, value_name = "N")]
    pub rows10: Option<f64>,
}

impl GaugeArgs {
    pub fn resolve(&self, config: &KnitConfig) -> Result<Gauge> {
        let sts10 = required("sts10", self.sts10.or(config.gauge.sts10))?;
        let rows10 = required("rows10", self.rows10.or(config.gauge.rows10))?;
        Ok(Gauge::new(sts10, rows10)?)
    }
}

fn required(name: &str, value: Option<f64>) -> Result<f64, ConfigError> {
    value.ok_or_else(|| ConfigError::Invalid {
        message: format!("no {name} given (pass --{name} or set gauge.{name})"),
    })
}

/// Which piece, and what to do to it.
#[derive(Args, Debug, Clone)]
pub struct TransformArgs {
    /// 1-based piece number, as shown by `list`
    #[arg(long, value_name = "I")]
    pub index: usize,

    /// Rotation in degrees, counter-clockwise
    #[arg(long, value_name = "DEG", default_value_t = 0.0, allow_negative_numbers = true)]
    pub rotate: f64,

    /// Duplicate the piece mirrored about its left or right edge
    #[arg(long, value_name = "M", default_value_t = MirrorMode::None)]
    pub mirror: MirrorMode,
}

impl TransformArgs {
    pub fn transform(&self) -> Result<PieceTransform> {
        Ok(PieceTransform::new(self.rotate, self.mirror)?)
    }
}

/// Where shape files go.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = "output")]
    pub output: PathBuf,
}

impl OutputArgs {
    /// The output directory, nested under a session folder when asked.
    pub fn context(&self, globals: &Globals) -> ConversionContext {
        let session = match (&globals.session, globals.isolate) {
            (Some(id), _) => Some(id.clone()),
            (None, true) => Some(Uuid::new_v4().to_string()),
            (None, false) => None,
        };
        match session {
            Some(id) => {
                info!(session = %id, "isolating output");
                ConversionContext::for_session(&self.output, &id)
            }
            None => ConversionContext::new(&self.output),
        }
    }
}

/// Print a serializable value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use knitshape::config::GaugeSettings;

    fn gauge_args(sts10: Option<f64>, rows10: Option<f64>) -> GaugeArgs {
        GaugeArgs { sts10, rows10 }
    }

    #[test]
    fn flags_override_config_gauge() {
        let mut config = KnitConfig::default();
        config.gauge = GaugeSettings {
            sts10: Some(28.0),
            rows10: Some(36.0),
        };
        let gauge = gauge_args(Some(30.0), None).resolve(&config).unwrap();
        assert_eq!(gauge.sts10, 30.0);
        assert_eq!(gauge.rows10, 36.0);
    }

    #[test]
    fn missing_gauge_is_config_error() {
        let err = gauge_args(Some(30.0), None)
            .resolve(&KnitConfig::default())
            .unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
        assert!(err.to_string().contains("rows10"));
    }

    #[test]
    fn session_nests_output() {
        let out = OutputArgs {
            output: PathBuf::from("out"),
        };
        assert_eq!(out.context(&Globals::default()).output_dir, PathBuf::from("out"));

        let named = Globals {
            session: Some("abc".into()),
            isolate: false,
        };
        assert_eq!(out.context(&named).output_dir, PathBuf::from("out/abc"));

        let isolated = Globals {
            session: None,
            isolate: true,
        };
        let a = out.context(&isolated).output_dir;
        let b = out.context(&isolated).output_dir;
        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(PathBuf::from("out").as_path()));
    }
}
