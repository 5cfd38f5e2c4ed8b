//! Collision reports and checker option masks.

use grasp_types::Contact;

/// Bitmask of collision-checker options.
///
/// The mask is global environment state: callers set the mask they need for
/// the duration of a query batch and restore the prior mask afterwards
/// (see [`with_collision_options`](crate::with_collision_options)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionOptions(pub u32);

impl CollisionOptions {
    /// No optional data requested.
    pub const NONE: Self = Self(0);
    /// Request contact points in reports.
    pub const CONTACTS: Self = Self(1);
    /// Request minimum-distance measurement in reports.
    pub const DISTANCE: Self = Self(2);

    /// Whether every bit of `other` is set in `self`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for CollisionOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Result of a collision or ray query.
///
/// For link queries, contact normals follow the first-link convention:
/// when `query_is_first` is true the normals point *away from* the queried
/// link, into the other body. For ray queries the normal is the surface
/// normal at the hit, facing the ray origin.
#[derive(Debug, Clone, Default)]
pub struct CollisionReport {
    /// Contact points, populated when [`CollisionOptions::CONTACTS`] is set.
    pub contacts: Vec<Contact>,
    /// Minimum distance measured by the query, populated when
    /// [`CollisionOptions::DISTANCE`] is set; infinity when nothing was hit.
    pub min_distance: f64,
    /// Whether the queried link is the first body of the report, i.e.
    /// whether `contacts` normals are oriented relative to it.
    pub query_is_first: bool,
}

impl CollisionReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self {
            contacts: Vec::new(),
            min_distance: f64::INFINITY,
            query_is_first: true,
        }
    }

    /// Reset the report for reuse.
    pub fn clear(&mut self) {
        self.contacts.clear();
        self.min_distance = f64::INFINITY;
        self.query_is_first = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_mask_algebra() {
        let both = CollisionOptions::CONTACTS | CollisionOptions::DISTANCE;
        assert!(both.contains(CollisionOptions::CONTACTS));
        assert!(both.contains(CollisionOptions::DISTANCE));
        assert!(!CollisionOptions::CONTACTS.contains(CollisionOptions::DISTANCE));
        assert!(both.contains(CollisionOptions::NONE));
    }

    #[test]
    fn report_clear_resets_distance() {
        let mut report = CollisionReport::new();
        report.min_distance = 0.25;
        report.query_is_first = false;
        report.clear();
        assert!(report.min_distance.is_infinite());
        assert!(report.query_is_first);
        assert!(report.contacts.is_empty());
    }
}
