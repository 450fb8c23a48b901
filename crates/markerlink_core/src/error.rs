use snafu::prelude::*;

/// markerlink's error type
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to read config"))]
    FailedToReadConfig { source: std::io::Error },
    #[snafu(display("Invalid config: {source}"))]
    InvalidConfig { source: toml::de::Error },
    #[snafu(display("Failed to write config"))]
    FailedToWriteConfig { source: std::io::Error },
    #[snafu(display("Failed to serialize config"))]
    FailedToSerializeConfig { source: toml::ser::Error },

    #[snafu(display("Smoothing factor must be in (0, 1], got {alpha}"))]
    InvalidAlpha { alpha: f64 },
    #[snafu(display("Loop rate for {what} must give a non-zero, representable period, got {hz}"))]
    InvalidRate { what: &'static str, hz: f64 },
    #[snafu(display("Chain curve {index} is invalid: {reason}"))]
    InvalidCurve { index: usize, reason: String },
    #[snafu(display("Synthetic source {field} is out of range, got {value}"))]
    InvalidSynthetic { field: &'static str, value: f64 },

    #[snafu(display("Marker {id} has a non-finite pose"))]
    NonFinitePose { id: u32 },

    #[snafu(display("Failed to open replay file {path}"))]
    ReplayOpen {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to read replay file"))]
    ReplayRead { source: std::io::Error },
    #[snafu(display("Malformed detection frame on replay line {line}"))]
    ReplayParse {
        line: usize,
        source: serde_json::Error,
    },
    #[snafu(display("Failed to read frame: {message}"))]
    FrameRead { message: String },
}
