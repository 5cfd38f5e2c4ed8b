//! Time-parameterized trajectories.

use std::fmt::Write;

use nalgebra::DVector;

use crate::Pose;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One sample of a trajectory: joint values plus a base pose at a time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrajectoryPoint {
    /// Time of this sample, seconds from trajectory start.
    pub time: f64,
    /// Joint values.
    pub q: DVector<f64>,
    /// Base transform.
    pub pose: Pose,
}

/// A time-parameterized sequence of DOF vectors and base transforms.
///
/// Points are kept sorted by time; sampling interpolates joint values
/// linearly and base poses with lerp/slerp.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trajectory {
    points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    /// Build a trajectory from samples, sorting them by time.
    #[must_use]
    pub fn new(mut points: Vec<TrajectoryPoint>) -> Self {
        points.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { points }
    }

    /// Whether the trajectory has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The samples, in time order.
    #[must_use]
    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    /// Width of the DOF vectors, 0 when empty.
    #[must_use]
    pub fn dof(&self) -> usize {
        self.points.first().map_or(0, |p| p.q.len())
    }

    /// Total duration, 0 when empty.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.time)
    }

    /// The final sample, if any.
    #[must_use]
    pub fn last(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }

    /// Sample the trajectory at time `t`, clamping outside the time range.
    ///
    /// Returns `None` for an empty trajectory.
    #[must_use]
    pub fn sample(&self, t: f64) -> Option<TrajectoryPoint> {
        let first = self.points.first()?;
        if t <= first.time {
            return Some(first.clone());
        }
        let last = self.points.last()?;
        if t >= last.time {
            return Some(last.clone());
        }
        let after = self.points.partition_point(|p| p.time <= t);
        let a = &self.points[after - 1];
        let b = &self.points[after];
        let span = b.time - a.time;
        if span <= 0.0 {
            return Some(b.clone());
        }
        let s = (t - a.time) / span;
        Some(TrajectoryPoint {
            time: t,
            q: a.q.lerp(&b.q, s),
            pose: a.pose.interpolate(&b.pose, s),
        })
    }

    /// Write the trajectory as whitespace-separated text, one sample per
    /// line: time, base pose (quaternion then translation), joint values.
    pub fn write_text(&self, out: &mut impl Write) -> std::fmt::Result {
        for p in &self.points {
            let r = p.pose.rotation;
            write!(
                out,
                "{} {} {} {} {} {} {} {}",
                p.time,
                r.w,
                r.i,
                r.j,
                r.k,
                p.pose.position.x,
                p.pose.position.y,
                p.pose.position.z
            )?;
            for v in p.q.iter() {
                write!(out, " {v}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::dvector;

    fn two_point() -> Trajectory {
        Trajectory::new(vec![
            TrajectoryPoint {
                time: 0.0,
                q: dvector![0.0, 1.0],
                pose: Pose::identity(),
            },
            TrajectoryPoint {
                time: 2.0,
                q: dvector![1.0, 3.0],
                pose: Pose::from_position(nalgebra::Point3::new(2.0, 0.0, 0.0)),
            },
        ])
    }

    #[test]
    fn sample_interpolates_and_clamps() {
        let traj = two_point();
        let mid = traj.sample(1.0).unwrap();
        assert_relative_eq!(mid.q[0], 0.5);
        assert_relative_eq!(mid.q[1], 2.0);
        assert_relative_eq!(mid.pose.position.x, 1.0);

        let before = traj.sample(-1.0).unwrap();
        assert_relative_eq!(before.q[0], 0.0);
        let after = traj.sample(5.0).unwrap();
        assert_relative_eq!(after.q[0], 1.0);
    }

    #[test]
    fn points_sorted_on_construction() {
        let traj = Trajectory::new(vec![
            TrajectoryPoint {
                time: 1.0,
                q: dvector![1.0],
                pose: Pose::identity(),
            },
            TrajectoryPoint {
                time: 0.0,
                q: dvector![0.0],
                pose: Pose::identity(),
            },
        ]);
        assert_relative_eq!(traj.points()[0].time, 0.0);
        assert_relative_eq!(traj.duration(), 1.0);
        assert_eq!(traj.dof(), 1);
    }

    #[test]
    fn empty_trajectory_samples_none() {
        let traj = Trajectory::default();
        assert!(traj.sample(0.0).is_none());
        assert!(traj.is_empty());
        assert_relative_eq!(traj.duration(), 0.0);
    }

    #[test]
    fn write_text_one_line_per_sample() {
        let traj = two_point();
        let mut out = String::new();
        traj.write_text(&mut out).unwrap();
        assert_eq!(out.lines().count(), 2);
    }
}
