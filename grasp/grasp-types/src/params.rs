//! Grasp request parameters and analysis results.

use nalgebra::{DVector, Point3, Vector3};

use crate::BodyId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters handed to the external grasp planner.
///
/// All fields are externally set by the command parser; the orchestrator
/// only seeds `initial_config` from the robot's current active-DOF values
/// before planning.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GraspParameters {
    /// Target body to grasp, when one is set.
    pub target_body: Option<BodyId>,
    /// Approach direction (unit); in the target frame when a target is set,
    /// otherwise in world coordinates.
    pub target_direction: Vector3<f64>,
    /// Grasp center offset.
    pub target_position: Point3<f64>,
    /// Roll of the hand about the approach direction.
    pub target_roll: f64,
    /// Standoff distance from the target surface.
    pub standoff: f64,
    /// Whether the planner may move the robot base to the approach pose.
    pub transform_robot: bool,
    /// Stop finger closing only on contact with the target.
    pub only_contact_target: bool,
    /// Keep squeezing after first contact for a tight grasp.
    pub tight_grasp: bool,
    /// Magnitude of random noise applied to the grasp pose.
    pub grasping_noise: f64,
    /// Step multiplier for translational planner motion.
    pub translation_step_mult: f64,
    /// Names of links whose geometry the approach must avoid.
    pub avoid_link_geometry: Vec<String>,
    /// Active-DOF configuration the plan starts from.
    pub initial_config: DVector<f64>,
}

impl Default for GraspParameters {
    fn default() -> Self {
        Self {
            target_body: None,
            target_direction: Vector3::z(),
            target_position: Point3::origin(),
            target_roll: 0.0,
            standoff: 0.0,
            transform_robot: true,
            only_contact_target: true,
            tight_grasp: false,
            grasping_noise: 0.0,
            translation_step_mult: 1.0,
            avoid_link_geometry: Vec::new(),
            initial_config: DVector::zeros(0),
        }
    }
}

/// Result of a force-closure analysis.
///
/// `mindist` is positive exactly when the wrench-space origin is strictly
/// interior to the contact-wrench convex hull. The `{0, 0}` default doubles
/// as the sentinel for non-closure or a failed analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GraspAnalysis {
    /// Signed distance from the wrench-space origin to the closest hull
    /// facet; 0 when closure does not hold.
    pub mindist: f64,
    /// Volume of the contact-wrench convex hull.
    pub volume: f64,
}
