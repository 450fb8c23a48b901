//!
//! Where chain solutions go
//!
//! The renderer lives outside this crate; these sinks hand it the geometry.
//!

use std::{io::Write, sync::Arc};

use markerlink_core::prelude::*;

use crate::kinematics::ChainSolution;

/// A consumer of chain solutions, called once per render tick
///
/// Presenting can't fail from the render loop's point of view; sinks deal with their own errors.
pub trait RenderSink {
    fn present(&mut self, solution: &ChainSolution);
}
impl<S: RenderSink + ?Sized> RenderSink for Box<S> {
    fn present(&mut self, solution: &ChainSolution) {
        (**self).present(solution)
    }
}

/// Logs every solution at debug level
#[derive(Debug, Default)]
pub struct LogSink;
impl RenderSink for LogSink {
    fn present(&mut self, solution: &ChainSolution) {
        for (i, joint) in solution.joints.iter().enumerate() {
            let p = joint.position;
            debug!("joint {i}: ({:.3}, {:.3}, {:.3})", p.x, p.y, p.z);
        }
    }
}

/// A solution tagged with the device that produced it
#[derive(Serialize)]
struct Tagged<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<&'a str>,
    #[serde(flatten)]
    solution: &'a ChainSolution,
}

/// Writes each solution as one line of JSON
pub struct JsonLinesSink<W> {
    out: W,
    device: Option<String>,
    failed: bool,
}
impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            device: None,
            failed: false,
        }
    }

    /// Add a `"device"` field to every line, so output from several rigs can be told apart
    pub fn with_device(mut self, device: Option<String>) -> Self {
        self.device = device;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, solution: &ChainSolution) -> std::io::Result<()> {
        let line = Tagged {
            device: self.device.as_deref(),
            solution,
        };
        serde_json::to_writer(&mut self.out, &line)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}
impl<W: Write> RenderSink for JsonLinesSink<W> {
    fn present(&mut self, solution: &ChainSolution) {
        match self.write(solution) {
            Ok(()) => self.failed = false,
            Err(err) => {
                // Only complain once per run of failures
                if !self.failed {
                    error!("failed to write chain solution: {err}");
                }
                self.failed = true;
            }
        }
    }
}

/// Keeps the latest solution where other code can read it
#[derive(Debug, Clone, Default)]
pub struct SharedSink {
    latest: Arc<RwLock<Option<ChainSolution>>>,
}
impl SharedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the most recent solution, if any has been presented
    pub fn latest(&self) -> Option<ChainSolution> {
        self.latest.read().clone()
    }
}
impl RenderSink for SharedSink {
    fn present(&mut self, solution: &ChainSolution) {
        *self.latest.write() = Some(solution.clone());
    }
}
