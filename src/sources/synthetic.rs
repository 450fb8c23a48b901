use std::f64::consts::TAU;

use markerlink_core::{config, prelude::*};
use nalgebra::{Rotation3, Vector3};

use super::DetectionSource;
use crate::pose::{Detection, EulerXyz, MarkerId};

/// How the camera sees the reference marker
const REFERENCE_RVEC: [f64; 3] = [0.35, -0.2, 0.05];

/// Makes up detections for the reference and joint markers
///
/// Each joint sweeps back and forth relative to the reference, out of phase with
/// the others. Jitter and occlusion make it look a bit like a real detector.
pub struct SyntheticSource {
    rng: fastrand::Rng,
    settings: config::Synthetic,
    reference: MarkerId,
    joints: [MarkerId; 3],
    frame_secs: f64,
    frame: u64,
}
impl SyntheticSource {
    pub fn new(settings: &config::Synthetic, markers: &config::Markers, detection_hz: f64) -> Self {
        let rng = match settings.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        Self {
            rng,
            settings: settings.clone(),
            reference: markers.reference,
            joints: markers.joints,
            frame_secs: 1.0 / detection_hz,
            frame: 0,
        }
    }

    /// Relative Euler angles (radians) of each joint marker at time `t`, before jitter
    pub fn ideal_angles(&self, t: f64) -> [EulerXyz; 3] {
        let amp = self.settings.amplitude_deg.to_radians();
        let phase = TAU * t / self.settings.period_secs;

        [
            EulerXyz {
                y: amp * phase.sin(),
                ..Default::default()
            },
            EulerXyz {
                y: amp * (phase + TAU / 3.0).sin(),
                ..Default::default()
            },
            EulerXyz {
                x: 0.5 * amp * (phase * 2.0).sin(),
                y: amp * phase.cos(),
                z: 0.0,
            },
        ]
    }

    fn jitter(&mut self) -> f64 {
        (self.rng.f64() * 2.0 - 1.0) * self.settings.jitter_deg.to_radians()
    }

    fn visible(&mut self) -> bool {
        self.rng.f64() >= self.settings.occlusion
    }

    fn generate(&mut self) -> Vec<Detection> {
        let t = self.frame as f64 * self.frame_secs;
        self.frame += 1;

        let reference_rot = Rotation3::from_scaled_axis(Vector3::from(REFERENCE_RVEC));
        let mut dets = Vec::with_capacity(4);

        let angles = self.ideal_angles(t);
        for (i, (id, rel)) in self.joints.into_iter().zip(angles).enumerate() {
            if !self.visible() {
                continue;
            }

            let rel = EulerXyz {
                x: rel.x + self.jitter(),
                y: rel.y + self.jitter(),
                z: rel.z + self.jitter(),
            };
            let rot = reference_rot * rel.to_rotation();

            dets.push(Detection::new(
                id,
                rot.scaled_axis().into(),
                [0.08 * (i as f64 - 1.0), 0.05, 0.6],
            ));
        }

        // Reference goes last so the joints above count this frame
        if self.visible() {
            dets.push(Detection::new(self.reference, REFERENCE_RVEC, [0.0, -0.05, 0.6]));
        }

        dets
    }
}
impl DetectionSource for SyntheticSource {
    async fn next_frame(&mut self) -> Result<Option<Vec<Detection>>, Error> {
        Ok(Some(self.generate()))
    }
}
