//!
//! # markerlink
//!
//! Turns the poses of four tracked fiducial markers into smoothed joint angles and
//! drives a small 3-D linkage with them.
//!
//! One marker is the reference. Every other marker's rotation is measured against it,
//! broken down into Euler angles, run through a low-pass filter and used to pose the
//! joints of the linkage. Detection and rendering are external; see [sources] and [sinks].
//!

#![allow(
    // Sources are only ever polled on a single-threaded runtime, so their futures needn't be Send
    async_fn_in_trait,
)]
#![deny(
    unused_must_use,
    clippy::infinite_iter,
    clippy::unconditional_recursion,
    clippy::while_immutable_condition
)]

#[macro_use]
extern crate serde;

pub mod kinematics;
pub mod pipeline;
pub mod pose;
pub mod sinks;
pub mod smoothing;
pub mod sources;
pub mod tracker;

pub use kinematics::{ChainSolution, ChainSolver};
pub use pipeline::{Pipeline, RunStats};
pub use pose::{Detection, MarkerId};
pub use smoothing::{AngleChannels, Channel};
pub use tracker::Tracker;
