//!
//! Per-channel exponential smoothing of joint angles
//!

use std::{fmt, ops::Index};

use markerlink_core::config;

use crate::pose::Axis;

/// Joint angle channels, one per degree of freedom of the linkage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    R0y,
    R1y,
    R2x,
    R2y,
}
impl Channel {
    pub const ALL: [Channel; 4] = [Channel::R0y, Channel::R1y, Channel::R2x, Channel::R2y];

    /// Which joint (and so which joint marker) feeds this channel
    pub const fn joint(self) -> usize {
        match self {
            Channel::R0y => 0,
            Channel::R1y => 1,
            Channel::R2x | Channel::R2y => 2,
        }
    }

    /// Which Euler component of the joint marker's relative rotation feeds this channel
    pub const fn axis(self) -> Axis {
        match self {
            Channel::R2x => Axis::X,
            _ => Axis::Y,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Channel::R0y => "r0y",
            Channel::R1y => "r1y",
            Channel::R2x => "r2x",
            Channel::R2y => "r2y",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}
impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Single-pole low-pass filter settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpSmoother {
    pub enabled: bool,
    pub alpha: f64,
}
impl ExpSmoother {
    pub fn new(enabled: bool, alpha: f64) -> Self {
        Self { enabled, alpha }
    }

    /// A smoother that just hands back the new value
    pub fn passthrough() -> Self {
        Self::new(false, 1.0)
    }

    #[inline]
    pub fn apply(&self, new: f64, old: f64) -> f64 {
        if self.enabled {
            self.alpha * new + (1.0 - self.alpha) * old
        } else {
            new
        }
    }
}
impl Default for ExpSmoother {
    fn default() -> Self {
        config::Smoothing::default().into()
    }
}
impl From<config::Smoothing> for ExpSmoother {
    fn from(cfg: config::Smoothing) -> Self {
        Self::new(cfg.enabled, cfg.alpha)
    }
}

/// Smoothed angle per [Channel], in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleChannels {
    values: [f64; 4],
}
impl AngleChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ch: Channel) -> f64 {
        self.values[ch.index()]
    }

    /// Feed a raw reading through `smoother` into `ch`, returning the new smoothed value
    pub fn update(&mut self, ch: Channel, raw: f64, smoother: &ExpSmoother) -> f64 {
        let slot = &mut self.values[ch.index()];
        *slot = smoother.apply(raw, *slot);
        *slot
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        Channel::ALL.into_iter().map(|ch| (ch, self.get(ch)))
    }
}
impl Index<Channel> for AngleChannels {
    type Output = f64;

    fn index(&self, ch: Channel) -> &f64 {
        &self.values[ch.index()]
    }
}
