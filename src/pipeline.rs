//!
//! The detection and render loops
//!
//! Both loops run interleaved on a single task. Only one of them is ever running at a
//! time, so they share the [Tracker] by plain `&mut` with no locking.
//!

use std::{future::Future, time::Duration};

use markerlink_core::prelude::*;
use tokio::time::{MissedTickBehavior, interval};

use crate::{
    kinematics::ChainSolver, sinks::RenderSink, sources::DetectionSource, tracker::Tracker,
};

/// Counters for one [Pipeline::run]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Detection frames fed to the tracker
    pub frames: u64,
    /// Detection cycles that failed
    pub errors: u64,
    /// Chain solutions handed to the sink
    pub renders: u64,
}

pub struct Pipeline<S, K> {
    tracker: Tracker,
    solver: ChainSolver,
    source: S,
    sink: K,
    detection_period: Duration,
    render_period: Duration,
}
impl<S: DetectionSource, K: RenderSink> Pipeline<S, K> {
    /// Both periods must be non-zero
    pub fn new(
        tracker: Tracker,
        solver: ChainSolver,
        source: S,
        sink: K,
        detection_period: Duration,
        render_period: Duration,
    ) -> Self {
        Self {
            tracker,
            solver,
            source,
            sink,
            detection_period,
            render_period,
        }
    }

    /// Build a pipeline from a config, validating it first
    pub fn from_config(cfg: &Config, source: S, sink: K) -> Result<Self, Error> {
        cfg.validate()?;

        Ok(Self::new(
            Tracker::from_config(cfg),
            ChainSolver::new(&cfg.chain),
            source,
            sink,
            cfg.timing.detection_period()?,
            cfg.timing.render_period()?,
        ))
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Run both loops until `shutdown` resolves
    ///
    /// Detection errors are logged and the loop carries on with the next tick. Once the
    /// source runs dry only the render loop keeps going.
    #[instrument(skip_all)]
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> RunStats {
        let mut stats = RunStats::default();

        let mut detect = interval(self.detection_period);
        detect.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut render = interval(self.render_period);
        render.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut source_done = false;
        tokio::pin!(shutdown);

        info!(
            "running: detection every {:?}, render every {:?}",
            self.detection_period, self.render_period
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("shutting down");
                    break;
                }
                _ = detect.tick(), if !source_done => {
                    match self.source.next_frame().await {
                        Ok(Some(dets)) => {
                            let report = self.tracker.process_frame(&dets);
                            trace!(?report, "processed frame");
                            stats.frames += 1;
                        }
                        Ok(None) => {
                            info!("detection source finished after {} frames", stats.frames);
                            source_done = true;
                        }
                        Err(err) => {
                            warn!("detection cycle failed: {err}");
                            stats.errors += 1;
                        }
                    }
                }
                _ = render.tick() => {
                    let solution = self.solver.solve(self.tracker.channels());
                    self.sink.present(&solution);
                    stats.renders += 1;
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pose::Detection,
        sinks::SharedSink,
        smoothing::Channel,
    };
    use approx::assert_relative_eq;
    use markerlink_core::error::FrameReadSnafu;

    /// Fails every third frame, then runs out after `limit`
    struct Flaky {
        n: u32,
        limit: u32,
    }
    impl DetectionSource for Flaky {
        async fn next_frame(&mut self) -> Result<Option<Vec<Detection>>, Error> {
            self.n += 1;
            if self.n > self.limit {
                return Ok(None);
            }
            if self.n % 3 == 0 {
                return FrameReadSnafu { message: "camera unplugged" }.fail();
            }
            Ok(Some(vec![
                Detection::new(0, [0.0, (self.n as f64).to_radians(), 0.0], [0.0; 3]),
                Detection::new(3, [0.0; 3], [0.0; 3]),
            ]))
        }
    }

    fn config() -> Config {
        let mut cfg = Config::default();
        cfg.smoothing.enabled = false;
        cfg.timing.detection_hz = 10.0;
        cfg.timing.render_hz = 20.0;
        cfg
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_going_through_errors() -> anyhow::Result<()> {
        let sink = SharedSink::new();
        let mut pipeline = Pipeline::from_config(&config(), Flaky { n: 0, limit: 9 }, sink.clone())?;

        let stats = pipeline
            .run(tokio::time::sleep(Duration::from_millis(2_000)))
            .await;

        assert_eq!(stats.frames, 6);
        assert_eq!(stats.errors, 3);
        // Rendering carried on after the source ran out
        assert!(stats.renders >= 35, "only {} renders", stats.renders);

        // Frame 9 failed, so the last good one was 8
        let r0y = pipeline.tracker().channels()[Channel::R0y];
        assert_relative_eq!(r0y, 8.0, epsilon = 1e-9);

        let latest = sink.latest().unwrap();
        assert_eq!(latest, ChainSolver::new(&config().chain).solve(pipeline.tracker().channels()));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn renders_without_detections() -> anyhow::Result<()> {
        let sink = SharedSink::new();
        let mut pipeline = Pipeline::from_config(&config(), Flaky { n: 0, limit: 0 }, sink.clone())?;
        let stats = pipeline
            .run(tokio::time::sleep(Duration::from_millis(500)))
            .await;

        assert_eq!(stats.frames, 0);
        assert!(stats.renders > 0);
        let latest = sink.latest().unwrap();
        assert_eq!(latest.joints[0].position, nalgebra::Point3::new(0.0, 10.0, 0.0));
        Ok(())
    }

    #[test]
    fn unusable_rates_are_refused() {
        // Periods that round to zero or overflow a Duration would panic in `interval`
        for (detection_hz, render_hz) in [(1e-30, 60.0), (30.0, 1e10), (0.0, 60.0)] {
            let mut cfg = config();
            cfg.timing.detection_hz = detection_hz;
            cfg.timing.render_hz = render_hz;
            let built = Pipeline::from_config(&cfg, Flaky { n: 0, limit: 0 }, SharedSink::new());
            assert!(
                matches!(built, Err(Error::InvalidRate { .. })),
                "{detection_hz} Hz / {render_hz} Hz was accepted"
            );
        }
    }

    #[test]
    fn bad_curve_joint_is_refused() {
        // The solver would index past the end of the joints
        let mut cfg = config();
        cfg.chain.curves[0].joints = vec![0, 5];
        let built = Pipeline::from_config(&cfg, Flaky { n: 0, limit: 0 }, SharedSink::new());
        assert!(matches!(built, Err(Error::InvalidCurve { index: 0, .. })));
    }
}
