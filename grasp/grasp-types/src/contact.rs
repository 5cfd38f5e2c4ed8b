//! Contact points and query rays.

use nalgebra::{Point3, Vector3};

use crate::LinkIndex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single contact point on a surface.
///
/// The orientation of `norm` depends on the producer: collision reports,
/// the grasp contact collector, and the stable-contact filter each document
/// their own convention. `depth` holds penetration depth for collision
/// contacts; the distance-map evaluator repurposes it to hold the measured
/// clearance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Contact {
    /// Contact position in world coordinates.
    pub pos: Point3<f64>,
    /// Contact normal in world coordinates.
    pub norm: Vector3<f64>,
    /// Penetration depth, or clearance for distance-map points.
    pub depth: f64,
}

impl Contact {
    /// Create a contact with zero depth.
    #[must_use]
    pub fn new(pos: Point3<f64>, norm: Vector3<f64>) -> Self {
        Self {
            pos,
            norm,
            depth: 0.0,
        }
    }
}

/// A contact tagged with the robot link that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TaggedContact {
    /// The contact point.
    pub contact: Contact,
    /// Index of the link the contact was found on.
    pub link: LinkIndex,
}

/// A query ray.
///
/// The direction is deliberately not normalized: its magnitude encodes the
/// maximum query distance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ray {
    /// Ray origin in world coordinates.
    pub origin: Point3<f64>,
    /// Ray direction; `|dir|` is the maximum query distance.
    pub dir: Vector3<f64>,
}

impl Ray {
    /// Create a ray from origin and (unnormalized) direction.
    #[must_use]
    pub fn new(origin: Point3<f64>, dir: Vector3<f64>) -> Self {
        Self { origin, dir }
    }
}
