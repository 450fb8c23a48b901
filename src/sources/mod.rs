//!
//! Where detection frames come from
//!
//! The actual marker detector lives outside this crate. Anything that can hand us
//! a list of [Detection]s per frame can drive the tracker.
//!

use markerlink_core::prelude::*;

use crate::pose::Detection;

mod replay;
mod synthetic;

pub use replay::ReplaySource;
pub use synthetic::SyntheticSource;

/// A producer of detection frames
pub trait DetectionSource {
    /// Get the next frame of detections
    ///
    /// `Ok(None)` means the source is finished for good. An `Err` only affects this cycle.
    async fn next_frame(&mut self) -> Result<Option<Vec<Detection>>, Error>;
}

/// The source picked by the config file
pub enum ConfiguredSource {
    Replay(ReplaySource<tokio::fs::File>),
    Synthetic(SyntheticSource),
}
impl ConfiguredSource {
    pub async fn from_config(cfg: &Config) -> Result<Self, Error> {
        Ok(match &cfg.source.replay {
            Some(path) => {
                info!("replaying detections from '{path}'");
                Self::Replay(ReplaySource::<tokio::fs::File>::open(path).await?)
            }
            None => {
                info!("no replay file configured, using synthetic detections");
                Self::Synthetic(SyntheticSource::new(
                    &cfg.source.synthetic,
                    &cfg.markers,
                    cfg.timing.detection_hz,
                ))
            }
        })
    }
}
impl DetectionSource for ConfiguredSource {
    async fn next_frame(&mut self) -> Result<Option<Vec<Detection>>, Error> {
        match self {
            Self::Replay(src) => src.next_frame().await,
            Self::Synthetic(src) => src.next_frame().await,
        }
    }
}
