use std::collections::HashMap;

use markerlink_core::{Error, error::NonFinitePoseSnafu};
use nalgebra::{Point3, Rotation3, Vector3};
use snafu::ensure;

pub mod relative;

pub use relative::{Axis, EulerXyz, relative_rotation};

/// Fiducial marker identity, as reported by the detector
pub type MarkerId = u32;

/// One marker as reported by the external detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: MarkerId,
    /// Axis-angle rotation, in radians
    pub rvec: [f64; 3],
    /// Camera-frame translation
    pub tvec: [f64; 3],
}
impl Detection {
    pub fn new(id: MarkerId, rvec: [f64; 3], tvec: [f64; 3]) -> Self {
        Self { id, rvec, tvec }
    }

    fn is_finite(&self) -> bool {
        self.rvec.iter().chain(&self.tvec).all(|v| v.is_finite())
    }
}

/// A marker's pose in visualization coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerObservation {
    pub id: MarkerId,
    pub rotation: Rotation3<f64>,
    pub position: Point3<f64>,
    /// Detection frame this came from
    pub frame: u64,
}

/// Converts raw detector output into [MarkerObservation]s
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseExtractor {
    reject_non_finite: bool,
}
impl PoseExtractor {
    pub fn new(reject_non_finite: bool) -> Self {
        Self { reject_non_finite }
    }

    /// Rodrigues the rotation vector and flip the depth axis of the translation
    ///
    /// Non-finite input goes straight through unless the extractor was built to reject it.
    pub fn extract(&self, det: &Detection, frame: u64) -> Result<MarkerObservation, Error> {
        if self.reject_non_finite {
            ensure!(det.is_finite(), NonFinitePoseSnafu { id: det.id });
        }

        let [tx, ty, tz] = det.tvec;

        Ok(MarkerObservation {
            id: det.id,
            rotation: Rotation3::from_scaled_axis(Vector3::from(det.rvec)),
            // Camera z points away from the camera, ours points towards the viewer
            position: Point3::new(tx, ty, -tz),
            frame,
        })
    }
}

/// Latest observation per marker
///
/// A marker that has never been seen (or was evicted) is simply absent.
#[derive(Debug, Clone, Default)]
pub struct MarkerStore {
    markers: HashMap<MarkerId, MarkerObservation>,
}
impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever we had for this marker
    pub fn insert(&mut self, obs: MarkerObservation) {
        self.markers.insert(obs.id, obs);
    }

    pub fn get(&self, id: MarkerId) -> Option<&MarkerObservation> {
        self.markers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Drop observations more than `max_age` frames older than `frame`
    ///
    /// Returns the ids that were dropped.
    pub fn evict_stale(&mut self, frame: u64, max_age: u64) -> Vec<MarkerId> {
        let mut evicted = Vec::new();
        self.markers.retain(|id, obs| {
            let keep = frame.saturating_sub(obs.frame) <= max_age;
            if !keep {
                evicted.push(*id);
            }
            keep
        });
        evicted.sort_unstable();
        evicted
    }
}
