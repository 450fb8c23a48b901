use markerlink_core::{
    config::{self, JOINT_COUNT},
    prelude::*,
};

use crate::{
    pose::{Detection, EulerXyz, MarkerId, MarkerStore, PoseExtractor, relative_rotation},
    smoothing::{AngleChannels, Channel, ExpSmoother},
};

/// What happened during one detection cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    /// Detections stored
    pub stored: usize,
    /// Detections thrown away by the extractor
    pub rejected: usize,
    /// Whether a fresh reference marker arrived (and so the channels were updated)
    pub reference_seen: bool,
}

/// Owns the marker store and the angle channels
///
/// Only [Tracker::process_frame] writes either of them.
#[derive(Debug, Clone)]
pub struct Tracker {
    extractor: PoseExtractor,
    smoother: ExpSmoother,
    reference: MarkerId,
    joint_markers: [MarkerId; JOINT_COUNT],
    stale_after: Option<u64>,

    store: MarkerStore,
    channels: AngleChannels,
    frame: u64,
}
impl Tracker {
    pub fn new(markers: &config::Markers, smoothing: &config::Smoothing) -> Self {
        Self {
            extractor: PoseExtractor::new(markers.reject_non_finite),
            smoother: smoothing.clone().into(),
            reference: markers.reference,
            joint_markers: markers.joints,
            stale_after: markers.stale_after_frames,

            store: MarkerStore::new(),
            channels: AngleChannels::new(),
            frame: 0,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(&cfg.markers, &cfg.smoothing)
    }

    pub fn channels(&self) -> &AngleChannels {
        &self.channels
    }

    pub fn store(&self) -> &MarkerStore {
        &self.store
    }

    /// Number of detection frames processed so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Fold one detection frame into the store, in the order the detector reported it
    ///
    /// The channels only move when the reference marker is part of this frame.
    pub fn process_frame(&mut self, detections: &[Detection]) -> FrameReport {
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            ..Default::default()
        };

        if let Some(max_age) = self.stale_after {
            let evicted = self.store.evict_stale(self.frame, max_age);
            if !evicted.is_empty() {
                debug!("markers {evicted:?} went stale");
            }
        }

        for det in detections {
            match self.extractor.extract(det, self.frame) {
                Ok(obs) => {
                    self.store.insert(obs);
                    report.stored += 1;

                    if det.id == self.reference {
                        report.reference_seen = true;
                        self.update_channels();
                    }
                }
                Err(err) => {
                    report.rejected += 1;
                    warn!("dropping detection: {err}");
                }
            }
        }

        report
    }

    /// Measure every present joint marker against the reference and smooth the result in
    fn update_channels(&mut self) {
        let Some(reference) = self.store.get(self.reference) else {
            return;
        };

        let mut angles: [Option<EulerXyz>; JOINT_COUNT] = [None; JOINT_COUNT];
        for (joint, &id) in self.joint_markers.iter().enumerate() {
            if let Some(obs) = self.store.get(id) {
                angles[joint] = Some(EulerXyz::from_rotation(&relative_rotation(
                    &reference.rotation,
                    &obs.rotation,
                )));
            }
        }

        for ch in Channel::ALL {
            if let Some(euler) = angles[ch.joint()] {
                let raw = euler.get(ch.axis()).to_degrees();
                let smoothed = self.channels.update(ch, raw, &self.smoother);
                trace!("{ch}: raw={raw:.3} smoothed={smoothed:.3}");
            }
        }
    }
}
