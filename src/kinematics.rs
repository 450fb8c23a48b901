//!
//! The three-joint linkage driven by the smoothed channels
//!
//! Everything in here is recomputed from scratch on every render tick.
//!

use markerlink_core::config::{self, CurveKind, JOINT_COUNT};
use nalgebra::{Point3, Rotation3, Vector3};

use crate::smoothing::{AngleChannels, Channel};

/// How a joint's rotation is built from the channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationRule {
    /// Rotate about Y by one channel
    AboutY(Channel),
    /// `Rx(x) · Ry(y)`: X then Y as intrinsic (object-space) rotations
    ///
    /// Applied to an offset vector the order reads the other way round: the offset is
    /// turned about Y first and the result about X.
    AboutXThenY { x: Channel, y: Channel },
}
impl RotationRule {
    pub fn rotation(&self, channels: &AngleChannels) -> Rotation3<f64> {
        match *self {
            RotationRule::AboutY(ch) => rot_y(channels[ch]),
            RotationRule::AboutXThenY { x, y } => rot_x(channels[x]) * rot_y(channels[y]),
        }
    }
}

fn rot_x(deg: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), deg.to_radians())
}

fn rot_y(deg: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::y_axis(), deg.to_radians())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    /// Position before rotation
    pub offset: Vector3<f64>,
    pub rule: RotationRule,
}

/// Final placement of one joint
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JointPose {
    pub position: Point3<f64>,
    pub orientation: Rotation3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurveDef {
    pub joints: Vec<usize>,
    pub kind: CurveKind,
    pub samples: u32,
}
impl From<config::Curve> for CurveDef {
    fn from(cfg: config::Curve) -> Self {
        Self {
            joints: cfg.joints,
            kind: cfg.kind,
            samples: cfg.samples,
        }
    }
}

/// Control points of one connecting curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectingCurve {
    pub points: Vec<Point3<f64>>,
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainSolution {
    pub joints: [JointPose; JOINT_COUNT],
    pub curves: Vec<ConnectingCurve>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainSolver {
    joints: [Joint; JOINT_COUNT],
    curves: Vec<CurveDef>,
}
impl ChainSolver {
    /// Build a solver from already-validated chain settings
    pub fn new(cfg: &config::Chain) -> Self {
        let [o0, o1, o2] = cfg.offsets.map(Vector3::from);

        Self {
            joints: [
                Joint {
                    offset: o0,
                    rule: RotationRule::AboutY(Channel::R0y),
                },
                Joint {
                    offset: o1,
                    rule: RotationRule::AboutY(Channel::R1y),
                },
                Joint {
                    offset: o2,
                    rule: RotationRule::AboutXThenY {
                        x: Channel::R2x,
                        y: Channel::R2y,
                    },
                },
            ],
            curves: cfg.curves.iter().cloned().map(CurveDef::from).collect(),
        }
    }

    pub fn joints(&self) -> &[Joint; JOINT_COUNT] {
        &self.joints
    }

    pub fn solve(&self, channels: &AngleChannels) -> ChainSolution {
        let joints = self.joints.map(|joint| {
            let orientation = joint.rule.rotation(channels);
            JointPose {
                position: Point3::from(orientation * joint.offset),
                orientation,
            }
        });

        let curves = self
            .curves
            .iter()
            .map(|def| {
                let ctrl: Vec<_> = def.joints.iter().map(|&i| joints[i].position).collect();
                let points = match def.kind {
                    CurveKind::Segment => ctrl,
                    CurveKind::Bezier => sample_bezier(&ctrl, def.samples),
                };
                ConnectingCurve { points }
            })
            .collect();

        ChainSolution { joints, curves }
    }
}
impl Default for ChainSolver {
    fn default() -> Self {
        Self::new(&config::Chain::default())
    }
}

/// `samples + 1` evenly spaced points along the Bézier curve with control points `ctrl`
fn sample_bezier(ctrl: &[Point3<f64>], samples: u32) -> Vec<Point3<f64>> {
    let n = samples.max(1);
    (0..=n)
        .map(|i| de_casteljau(ctrl, i as f64 / n as f64))
        .collect()
}

fn de_casteljau(ctrl: &[Point3<f64>], t: f64) -> Point3<f64> {
    let mut pts = ctrl.to_vec();
    for len in (1..pts.len()).rev() {
        for i in 0..len {
            pts[i] = pts[i].lerp(&pts[i + 1], t);
        }
    }
    pts[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smoothing::ExpSmoother;
    use approx::assert_relative_eq;

    fn channels(r0y: f64, r1y: f64, r2x: f64, r2y: f64) -> AngleChannels {
        let pass = ExpSmoother::passthrough();
        let mut ch = AngleChannels::new();
        ch.update(Channel::R0y, r0y, &pass);
        ch.update(Channel::R1y, r1y, &pass);
        ch.update(Channel::R2x, r2x, &pass);
        ch.update(Channel::R2y, r2y, &pass);
        ch
    }

    #[test]
    fn zero_angles_leave_offsets_alone() {
        let sol = ChainSolver::default().solve(&AngleChannels::new());
        assert_eq!(sol.joints[0].position, Point3::new(0.0, 10.0, 0.0));
        assert_eq!(sol.joints[1].position, Point3::origin());
        assert_eq!(sol.joints[2].position, Point3::new(7.0, 0.0, 0.0));
        for joint in &sol.joints {
            assert_relative_eq!(joint.orientation, Rotation3::identity());
        }
    }

    #[test]
    fn solve_is_deterministic() {
        let solver = ChainSolver::default();
        let ch = channels(12.0, -33.0, 71.5, 8.25);
        assert_eq!(solver.solve(&ch), solver.solve(&ch));
    }

    #[test]
    fn joint2_rotates_y_first_then_x() {
        // AboutXThenY, seen from the offset's side
        let sol = ChainSolver::default().solve(&channels(0.0, 0.0, 90.0, 90.0));
        // Ry(90°) takes +x to -z, then Rx(90°) takes -z to +y
        assert_relative_eq!(sol.joints[2].position, Point3::new(0.0, 7.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn joint0_turns_about_y() {
        let mut cfg = config::Chain::default();
        cfg.offsets[0] = [1.0, 10.0, 0.0];
        let sol = ChainSolver::new(&cfg).solve(&channels(90.0, 0.0, 0.0, 0.0));
        assert_relative_eq!(sol.joints[0].position, Point3::new(0.0, 10.0, -1.0), epsilon = 1e-12);
        assert_relative_eq!(
            sol.joints[0].orientation,
            Rotation3::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2),
            epsilon = 1e-12
        );
    }

    #[test]
    fn default_curves() {
        let sol = ChainSolver::default().solve(&channels(0.0, 0.0, 0.0, 0.0));
        assert_eq!(sol.curves.len(), 2);

        // Straight segment from joint 0 to joint 1
        assert_eq!(
            sol.curves[0].points,
            vec![sol.joints[0].position, sol.joints[1].position]
        );

        // Bézier through all three, pinned at the ends
        let bez = &sol.curves[1].points;
        assert_eq!(bez.len(), 17);
        assert_relative_eq!(bez[0], sol.joints[0].position);
        assert_relative_eq!(bez[16], sol.joints[2].position);
        // Quadratic midpoint is (p0 + 2 p1 + p2) / 4
        assert_relative_eq!(bez[8], Point3::new(1.75, 2.5, 0.0), epsilon = 1e-12);
    }
}
