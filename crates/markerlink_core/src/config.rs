use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::{fs, path::Path, time::Duration};

use crate::error::{
    Error, FailedToReadConfigSnafu, FailedToSerializeConfigSnafu, FailedToWriteConfigSnafu,
    InvalidAlphaSnafu, InvalidConfigSnafu, InvalidCurveSnafu, InvalidRateSnafu,
    InvalidSyntheticSnafu,
};

/// Number of joints in the linkage
pub const JOINT_COUNT: usize = 3;

macro_rules! def_cfg {
    ($(
        $(# [ $sattr:meta ])*
        $struct_ident:ident {
            $(
            $(# [ $attr:meta ])*
            $ident:ident : $ty:ty ,
            )*
        }
    )*) => {
       $(
           #[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
           $(#[$sattr])*
           pub struct $struct_ident {
               $(
                $(#[$attr])*
                pub $ident: $ty,
               )*
           }
       )*
    };
}

def_cfg! {
    #[serde(default)]
    Config {
        /// Tags JSON output lines when set
        device_name: Option<String>,
        markers: Markers,
        smoothing: Smoothing,
        chain: Chain,
        timing: Timing,
        source: Source,
        output: Output,
    }
    #[serde(default)]
    Markers {
        /// Marker whose pose is the frame everything else is measured in
        reference: u32,
        /// Markers driving joints 0, 1 and 2
        joints: [u32; JOINT_COUNT],
        /// Drop observations older than this many detection frames
        stale_after_frames: Option<u64>,
        /// Reject detections with NaN/inf components instead of letting them through
        reject_non_finite: bool,
    }
    #[serde(default)]
    Smoothing {
        enabled: bool,
        alpha: f64,
    }
    #[serde(default)]
    Chain {
        /// Initial joint offsets, before rotation
        offsets: [[f64; 3]; JOINT_COUNT],
        curves: Vec<Curve>,
    }
    Curve {
        joints: Vec<usize>,
        kind: CurveKind,
        #[serde(default = "default_samples")]
        samples: u32,
    }
    #[serde(default)]
    Timing {
        detection_hz: f64,
        render_hz: f64,
    }
    #[serde(default)]
    Source {
        /// JSON-lines file of detection frames. The synthetic source is used if unset.
        replay: Option<String>,
        synthetic: Synthetic,
    }
    #[serde(default)]
    Synthetic {
        /// Seconds per full sweep
        period_secs: f64,
        /// Sweep amplitude in degrees
        amplitude_deg: f64,
        /// Uniform jitter added to every rotation component, in degrees
        jitter_deg: f64,
        /// Probability that a marker is missing from a frame
        occlusion: f64,
        seed: Option<u64>,
    }
    #[serde(default)]
    Output {
        /// Write every chain solution to stdout as JSON lines
        json: bool,
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    /// Polyline through the joints
    Segment,
    /// Sampled Bézier curve using the joints as control points
    Bezier,
}

fn default_samples() -> u32 {
    16
}

impl Config {
    /// Load the configuration from the specified path
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let buf = fs::read_to_string(path).context(FailedToReadConfigSnafu)?;
        let cfg: Self = toml::from_str(&buf).context(InvalidConfigSnafu)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Save the configuration to the specified path
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let toml_cfg = toml::to_string_pretty(&self).context(FailedToSerializeConfigSnafu)?;
        tokio::fs::write(path, toml_cfg)
            .await
            .context(FailedToWriteConfigSnafu)?;

        Ok(())
    }

    /// Check the values serde can't check for us
    pub fn validate(&self) -> Result<(), Error> {
        let alpha = self.smoothing.alpha;
        ensure!(alpha > 0.0 && alpha <= 1.0, InvalidAlphaSnafu { alpha });

        self.timing.detection_period()?;
        self.timing.render_period()?;

        let synthetic = &self.source.synthetic;
        for (field, value, ok) in [
            (
                "period_secs",
                synthetic.period_secs,
                synthetic.period_secs.is_finite() && synthetic.period_secs > 0.0,
            ),
            (
                "occlusion",
                synthetic.occlusion,
                (0.0..=1.0).contains(&synthetic.occlusion),
            ),
            (
                "amplitude_deg",
                synthetic.amplitude_deg,
                synthetic.amplitude_deg.is_finite(),
            ),
            (
                "jitter_deg",
                synthetic.jitter_deg,
                synthetic.jitter_deg.is_finite() && synthetic.jitter_deg >= 0.0,
            ),
        ] {
            ensure!(ok, InvalidSyntheticSnafu { field, value });
        }

        for (index, curve) in self.chain.curves.iter().enumerate() {
            ensure!(
                curve.joints.len() >= 2,
                InvalidCurveSnafu {
                    index,
                    reason: "a curve needs at least two joints",
                }
            );
            if let Some(joint) = curve.joints.iter().find(|&&j| j >= JOINT_COUNT) {
                return InvalidCurveSnafu {
                    index,
                    reason: format!("joint {joint} does not exist"),
                }
                .fail();
            }
            ensure!(
                curve.kind == CurveKind::Segment || curve.samples > 0,
                InvalidCurveSnafu {
                    index,
                    reason: "a bezier curve needs at least one sample",
                }
            );
        }

        Ok(())
    }
}

impl Timing {
    /// Time between detection ticks
    pub fn detection_period(&self) -> Result<Duration, Error> {
        period("detection", self.detection_hz)
    }

    /// Time between render ticks
    pub fn render_period(&self) -> Result<Duration, Error> {
        period("render", self.render_hz)
    }
}

/// `1 / hz` as a [Duration], which must come out non-zero for `tokio::time::interval`
fn period(what: &'static str, hz: f64) -> Result<Duration, Error> {
    ensure!(hz.is_finite() && hz > 0.0, InvalidRateSnafu { what, hz });
    match Duration::try_from_secs_f64(1.0 / hz) {
        Ok(period) if period != Duration::ZERO => Ok(period),
        _ => InvalidRateSnafu { what, hz }.fail(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: None,
            markers: Markers::default(),
            smoothing: Smoothing::default(),
            chain: Chain::default(),
            timing: Timing::default(),
            source: Source::default(),
            output: Output::default(),
        }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            reference: 3,
            joints: [0, 1, 2],
            stale_after_frames: None,
            reject_non_finite: false,
        }
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Self {
            enabled: true,
            alpha: 0.1,
        }
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self {
            offsets: [[0.0, 10.0, 0.0], [0.0, 0.0, 0.0], [7.0, 0.0, 0.0]],
            curves: vec![
                Curve {
                    joints: vec![0, 1],
                    kind: CurveKind::Segment,
                    samples: default_samples(),
                },
                Curve {
                    joints: vec![0, 1, 2],
                    kind: CurveKind::Bezier,
                    samples: default_samples(),
                },
            ],
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            detection_hz: 30.0,
            render_hz: 60.0,
        }
    }
}

impl Default for Source {
    fn default() -> Self {
        Self {
            replay: None,
            synthetic: Synthetic::default(),
        }
    }
}

impl Default for Synthetic {
    fn default() -> Self {
        Self {
            period_secs: 8.0,
            amplitude_deg: 45.0,
            jitter_deg: 2.0,
            occlusion: 0.05,
            seed: None,
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self { json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn empty_file_gives_defaults() -> Result<()> {
        let cfg: Config = toml::from_str("")?;
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.markers.reference, 3);
        assert_eq!(cfg.smoothing.alpha, 0.1);
        cfg.validate()?;
        Ok(())
    }

    #[test]
    fn partial_sections_keep_other_defaults() -> Result<()> {
        let cfg: Config = toml::from_str(
            r#"
            [smoothing]
            enabled = false

            [markers]
            reference = 7
            "#,
        )?;
        assert!(!cfg.smoothing.enabled);
        assert_eq!(cfg.smoothing.alpha, 0.1);
        assert_eq!(cfg.markers.reference, 7);
        assert_eq!(cfg.markers.joints, [0, 1, 2]);
        Ok(())
    }

    #[test]
    fn curves_parse() -> Result<()> {
        let cfg: Config = toml::from_str(
            r#"
            [[chain.curves]]
            joints = [1, 2]
            kind = "segment"
            "#,
        )?;
        assert_eq!(cfg.chain.curves.len(), 1);
        assert_eq!(cfg.chain.curves[0].kind, CurveKind::Segment);
        assert_eq!(cfg.chain.curves[0].samples, 16);
        Ok(())
    }

    #[test]
    fn example_config_is_valid() -> Result<()> {
        let cfg: Config = toml::from_str(include_str!("../../../markerlink.example.toml"))?;
        cfg.validate()?;
        assert_eq!(cfg.device_name.as_deref(), Some("bench"));
        assert_eq!(cfg.chain, Chain::default());
        Ok(())
    }

    #[test]
    fn rejects_bad_alpha() {
        let mut cfg = Config::default();
        for alpha in [0.0, -0.5, 1.5, f64::NAN] {
            cfg.smoothing.alpha = alpha;
            assert!(matches!(cfg.validate(), Err(Error::InvalidAlpha { .. })));
        }
        cfg.smoothing.alpha = 1.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_bad_rates_and_curves() {
        for hz in [0.0, -30.0, f64::INFINITY, f64::NAN, 1e10] {
            let mut cfg = Config::default();
            cfg.timing.render_hz = hz;
            assert!(
                matches!(cfg.validate(), Err(Error::InvalidRate { what: "render", .. })),
                "render_hz = {hz} was accepted"
            );
        }

        // Period too long to be a Duration
        let mut cfg = Config::default();
        cfg.timing.detection_hz = 1e-30;
        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidRate { what: "detection", .. })
        ));

        // 1 GHz is still a 1 ns period
        let mut cfg = Config::default();
        cfg.timing.render_hz = 1e9;
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.timing.render_period().ok(), Some(Duration::from_nanos(1)));

        let mut cfg = Config::default();
        cfg.chain.curves[0].joints = vec![0, 3];
        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidCurve { index: 0, .. })
        ));

        let mut cfg = Config::default();
        cfg.chain.curves[1].joints = vec![2];
        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidCurve { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_bad_synthetic_settings() {
        let cases: [(&str, fn(&mut Synthetic)); 6] = [
            ("period_secs", |s| s.period_secs = 0.0),
            ("period_secs", |s| s.period_secs = -8.0),
            ("occlusion", |s| s.occlusion = -0.1),
            ("occlusion", |s| s.occlusion = 1.5),
            ("occlusion", |s| s.occlusion = f64::NAN),
            ("jitter_deg", |s| s.jitter_deg = f64::INFINITY),
        ];
        for (expected, tweak) in cases {
            let mut cfg = Config::default();
            tweak(&mut cfg.source.synthetic);
            match cfg.validate() {
                Err(Error::InvalidSynthetic { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected {expected} to be rejected, got {other:?}"),
            }
        }

        // Both ends of the occlusion range are fine
        let mut cfg = Config::default();
        cfg.source.synthetic.occlusion = 1.0;
        assert!(cfg.validate().is_ok());
        cfg.source.synthetic.occlusion = 0.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_reports_missing_file() {
        assert!(matches!(
            Config::load("/definitely/not/here/markerlink.toml"),
            Err(Error::FailedToReadConfig { .. })
        ));
    }

    #[tokio::test]
    async fn save_then_load() -> Result<()> {
        let path = std::env::temp_dir().join(format!("markerlink-{}.toml", std::process::id()));
        let mut cfg = Config::default();
        cfg.device_name = Some("bench".into());
        cfg.smoothing.alpha = 0.25;
        cfg.save(&path).await?;

        let loaded = Config::load(&path)?;
        std::fs::remove_file(&path)?;
        assert_eq!(loaded, cfg);
        Ok(())
    }
}
