//! Core value types shared across the grasp-analysis workspace.
//!
//! This crate is the vocabulary of the system: rigid poses, contact points,
//! query rays, triangle meshes, grasp parameters, and time-parameterized
//! trajectories. It carries no behavior beyond what the values themselves
//! need (transforms, sampling, interpolation) and depends only on the math
//! stack, so every other crate in the workspace can use it freely.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod contact;
mod params;
mod pose;
mod trajectory;
mod trimesh;

pub use contact::{Contact, Ray, TaggedContact};
pub use params::{GraspAnalysis, GraspParameters};
pub use pose::Pose;
pub use trajectory::{Trajectory, TrajectoryPoint};
pub use trimesh::TriMesh;

/// Index of a kinematic body within its environment.
pub type BodyId = usize;

/// Index of a link within a kinematic body.
pub type LinkIndex = usize;
