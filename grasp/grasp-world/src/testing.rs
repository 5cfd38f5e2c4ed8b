//! Analytic fixture environment used by the workspace test suites.
//!
//! Bodies are chains of links connected by hinge or slide joints, with
//! optional sphere or cuboid geometry per link. Collision contacts are
//! analytic sphere-sphere pairs; ray queries support spheres and cuboids.
//! Links can also carry scripted contact reports so filter tests control
//! their inputs exactly.

#![allow(clippy::cast_precision_loss)]

use grasp_types::{BodyId, Contact, LinkIndex, Pose, Ray, Trajectory};
use hashbrown::HashMap;
use nalgebra::{DMatrix, DVector, Point3, UnitQuaternion, Vector3};

use crate::{
    CollisionOptions, CollisionReport, Environment, Manipulator, RobotEnvironment, WorldError,
};

/// Joint connecting a link to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixtureJoint {
    /// Rotation about `axis` through the link frame origin.
    Hinge {
        /// Rotation axis in the link frame.
        axis: Vector3<f64>,
    },
    /// Translation along `axis`.
    Slide {
        /// Translation axis in the link frame.
        axis: Vector3<f64>,
    },
}

/// Collision geometry of a link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixtureShape {
    /// Sphere centered at the link frame origin.
    Sphere {
        /// Sphere radius.
        radius: f64,
    },
    /// Axis-aligned cuboid in the link frame.
    Cuboid {
        /// Half extents along the link frame axes.
        half_extents: Vector3<f64>,
    },
}

/// One link of a fixture body.
#[derive(Debug, Clone)]
pub struct FixtureLink {
    /// Static transform from the parent link frame.
    pub offset: Pose,
    /// Joint to the parent; `None` for the base link.
    pub joint: Option<FixtureJoint>,
    /// Collision geometry, if any.
    pub shape: Option<FixtureShape>,
}

/// Scripted contact report for one link.
#[derive(Debug, Clone)]
pub struct ScriptedContacts {
    /// Contacts returned verbatim by link collision queries.
    pub contacts: Vec<Contact>,
    /// Value of `query_is_first` in the produced report.
    pub query_is_first: bool,
}

/// A body in the fixture world.
#[derive(Debug, Clone)]
pub struct FixtureBody {
    /// Body name, unique within the world.
    pub name: String,
    /// Base pose.
    pub pose: Pose,
    /// Whether the body participates in collision queries.
    pub enabled: bool,
    /// Links; index 0 is the base.
    pub links: Vec<FixtureLink>,
    /// Joint values, one per jointed link, in link order.
    pub dofs: DVector<f64>,
    /// Joint velocities, parallel to `dofs`.
    pub vels: DVector<f64>,
    /// Lower joint limits.
    pub lower: DVector<f64>,
    /// Upper joint limits.
    pub upper: DVector<f64>,
    /// Bumped whenever `lower`/`upper` are replaced.
    pub limits_revision: u64,
    /// Manipulators, for robot bodies.
    pub manipulators: Vec<Manipulator>,
    /// Index into `manipulators` of the active one.
    pub active_manipulator: Option<usize>,
    /// Scripted per-link contact reports.
    pub scripted: HashMap<LinkIndex, ScriptedContacts>,
}

impl FixtureBody {
    /// A body with a single geometry-free base link.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            pose: Pose::identity(),
            enabled: true,
            links: vec![FixtureLink {
                offset: Pose::identity(),
                joint: None,
                shape: None,
            }],
            dofs: DVector::zeros(0),
            vels: DVector::zeros(0),
            lower: DVector::zeros(0),
            upper: DVector::zeros(0),
            limits_revision: 0,
            manipulators: Vec::new(),
            active_manipulator: None,
            scripted: HashMap::new(),
        }
    }

    /// A single-link sphere body.
    #[must_use]
    pub fn sphere(name: &str, center: Point3<f64>, radius: f64) -> Self {
        let mut body = Self::new(name);
        body.pose = Pose::from_position(center);
        body.links[0].shape = Some(FixtureShape::Sphere { radius });
        body
    }

    /// A single-link cuboid body.
    #[must_use]
    pub fn cuboid(name: &str, pose: Pose, half_extents: Vector3<f64>) -> Self {
        let mut body = Self::new(name);
        body.pose = pose;
        body.links[0].shape = Some(FixtureShape::Cuboid { half_extents });
        body
    }

    /// Append a link, growing the DOF vectors when it carries a joint.
    /// Limits default to ±10.
    #[must_use]
    pub fn with_link(mut self, link: FixtureLink) -> Self {
        if link.joint.is_some() {
            let n = self.dofs.len() + 1;
            self.dofs = self.dofs.clone().insert_row(n - 1, 0.0);
            self.vels = self.vels.clone().insert_row(n - 1, 0.0);
            self.lower = self.lower.clone().insert_row(n - 1, -10.0);
            self.upper = self.upper.clone().insert_row(n - 1, 10.0);
        }
        self.links.push(link);
        self
    }
}

/// The fixture environment.
#[derive(Debug, Clone, Default)]
pub struct FixtureWorld {
    bodies: Vec<FixtureBody>,
    options: CollisionOptions,
    checker: String,
    /// Last trajectory handed to [`RobotEnvironment::set_motion`].
    pub last_motion: Option<(BodyId, Trajectory)>,
}

impl FixtureWorld {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bodies: Vec::new(),
            options: CollisionOptions::NONE,
            checker: "fixture".to_owned(),
            last_motion: None,
        }
    }

    /// Add a body, returning its id.
    pub fn add_body(&mut self, body: FixtureBody) -> BodyId {
        self.bodies.push(body);
        self.bodies.len() - 1
    }

    /// Mutable access to a body.
    pub fn body_mut(&mut self, body: BodyId) -> &mut FixtureBody {
        &mut self.bodies[body]
    }

    /// Shared access to a body.
    #[must_use]
    pub fn body(&self, body: BodyId) -> &FixtureBody {
        &self.bodies[body]
    }

    /// World pose of a link, by forward kinematics along the chain.
    #[must_use]
    pub fn link_pose(&self, body: BodyId, link: LinkIndex) -> Pose {
        let b = &self.bodies[body];
        let mut acc = b.pose;
        let mut dof = 0;
        for l in &b.links[..=link] {
            acc = acc.compose(&l.offset);
            if let Some(joint) = &l.joint {
                acc = acc.compose(&joint_pose(joint, b.dofs[dof]));
                dof += 1;
            }
        }
        acc
    }

    fn sphere_of(&self, body: BodyId, link: LinkIndex) -> Option<(Point3<f64>, f64)> {
        match self.bodies[body].links[link].shape {
            Some(FixtureShape::Sphere { radius }) => {
                Some((self.link_pose(body, link).position, radius))
            }
            _ => None,
        }
    }

    /// Candidate bodies for a query from `source`: `target` when given,
    /// otherwise every enabled body other than the source.
    fn candidates(&self, source: Option<BodyId>, target: Option<BodyId>) -> Vec<BodyId> {
        match target {
            Some(t) => {
                if self.bodies[t].enabled {
                    vec![t]
                } else {
                    Vec::new()
                }
            }
            None => (0..self.bodies.len())
                .filter(|&i| Some(i) != source && self.bodies[i].enabled)
                .collect(),
        }
    }
}

fn joint_pose(joint: &FixtureJoint, q: f64) -> Pose {
    match joint {
        FixtureJoint::Hinge { axis } => Pose::from_position_rotation(
            Point3::origin(),
            UnitQuaternion::from_scaled_axis(axis.normalize() * q),
        ),
        FixtureJoint::Slide { axis } => Pose::from_position(Point3::from(axis.normalize() * q)),
    }
}

/// Ray-sphere intersection; quadratic with the near root preferred.
fn raycast_sphere(
    center: Point3<f64>,
    radius: f64,
    origin: Point3<f64>,
    dir: &Vector3<f64>,
    max_distance: f64,
) -> Option<(f64, Point3<f64>, Vector3<f64>)> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.dot(&oc) - radius * radius;
    let discriminant = b * b - c;
    if !(discriminant >= 0.0) {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    // Tolerate origins within rounding error of the surface: a near root
    // of -1e-9 is a grazing hit at 0, not a miss.
    let mut t = -b - sqrt_d;
    if t < -1e-9 {
        t = -b + sqrt_d;
    }
    if t < -1e-9 {
        return None;
    }
    let t = t.max(0.0);
    if t > max_distance {
        return None;
    }
    let point = origin + dir * t;
    let to_point = point - center;
    let dist = to_point.norm();
    let normal = if dist > 1e-10 { to_point / dist } else { *dir };
    Some((t, point, normal))
}

/// Ray-cuboid intersection via the slab method, in the cuboid's frame.
fn raycast_cuboid(
    pose: &Pose,
    half_extents: Vector3<f64>,
    origin: Point3<f64>,
    dir: &Vector3<f64>,
    max_distance: f64,
) -> Option<(f64, Point3<f64>, Vector3<f64>)> {
    let inv = pose.inverse();
    let local_origin = inv.transform_point(&origin);
    let local_dir = inv.transform_vector(dir);

    let mut t_min = 0.0_f64;
    let mut t_max = max_distance;
    let mut hit_normal = Vector3::zeros();

    for i in 0..3 {
        let o = local_origin[i];
        let d = local_dir[i];
        let extent = half_extents[i];
        if d.abs() < 1e-12 {
            if o < -extent || o > extent {
                return None;
            }
        } else {
            let inv_d = 1.0 / d;
            let t1 = (-extent - o) * inv_d;
            let t2 = (extent - o) * inv_d;
            let (t_near, t_far, sign) = if t1 < t2 { (t1, t2, -1.0) } else { (t2, t1, 1.0) };
            if t_near > t_min {
                t_min = t_near;
                hit_normal = Vector3::zeros();
                hit_normal[i] = sign;
            }
            t_max = t_max.min(t_far);
            if t_min > t_max {
                return None;
            }
        }
    }
    if t_min > max_distance {
        return None;
    }
    let point = origin + dir * t_min;
    let world_normal = pose.transform_vector(&hit_normal);
    Some((t_min, point, world_normal))
}

impl Environment for FixtureWorld {
    fn body_id(&self, name: &str) -> Option<BodyId> {
        self.bodies.iter().position(|b| b.name == name)
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body_enabled(&self, body: BodyId) -> bool {
        self.bodies[body].enabled
    }

    fn set_body_enabled(&mut self, body: BodyId, enabled: bool) {
        self.bodies[body].enabled = enabled;
    }

    fn body_pose(&self, body: BodyId) -> Pose {
        self.bodies[body].pose
    }

    fn set_body_pose(&mut self, body: BodyId, pose: &Pose) {
        self.bodies[body].pose = *pose;
    }

    fn dof_values(&self, body: BodyId) -> DVector<f64> {
        self.bodies[body].dofs.clone()
    }

    fn set_dof_values(&mut self, body: BodyId, values: &DVector<f64>) -> Result<(), WorldError> {
        let b = &mut self.bodies[body];
        if values.len() != b.dofs.len() {
            return Err(WorldError::DofMismatch {
                expected: b.dofs.len(),
                got: values.len(),
            });
        }
        b.dofs.copy_from(values);
        Ok(())
    }

    fn dof_velocities(&self, body: BodyId) -> DVector<f64> {
        self.bodies[body].vels.clone()
    }

    fn set_dof_velocities(
        &mut self,
        body: BodyId,
        velocities: &DVector<f64>,
    ) -> Result<(), WorldError> {
        let b = &mut self.bodies[body];
        if velocities.len() != b.vels.len() {
            return Err(WorldError::DofMismatch {
                expected: b.vels.len(),
                got: velocities.len(),
            });
        }
        b.vels.copy_from(velocities);
        Ok(())
    }

    fn dof_limits(&self, body: BodyId) -> (DVector<f64>, DVector<f64>) {
        let b = &self.bodies[body];
        (b.lower.clone(), b.upper.clone())
    }

    fn limits_revision(&self, body: BodyId) -> u64 {
        self.bodies[body].limits_revision
    }

    fn link_count(&self, body: BodyId) -> usize {
        self.bodies[body].links.len()
    }

    fn collision_options(&self) -> CollisionOptions {
        self.options
    }

    fn set_collision_options(&mut self, options: CollisionOptions) {
        self.options = options;
    }

    fn collision_checker(&self) -> String {
        self.checker.clone()
    }

    fn set_collision_checker(&mut self, name: &str) -> Result<(), WorldError> {
        self.checker = name.to_owned();
        Ok(())
    }

    fn check_body_collision(&self, body: BodyId, report: &mut CollisionReport) -> bool {
        report.clear();
        let mut any = false;
        for link in 0..self.bodies[body].links.len() {
            let mut link_report = CollisionReport::new();
            if self.check_link_collision(body, link, None, &mut link_report) {
                any = true;
                report.contacts.append(&mut link_report.contacts);
                report.min_distance = report.min_distance.min(link_report.min_distance);
            }
        }
        any
    }

    fn check_link_collision(
        &self,
        body: BodyId,
        link: LinkIndex,
        target: Option<BodyId>,
        report: &mut CollisionReport,
    ) -> bool {
        report.clear();
        if let Some(scripted) = self.bodies[body].scripted.get(&link) {
            report.query_is_first = scripted.query_is_first;
            if self.options.contains(CollisionOptions::CONTACTS) {
                report.contacts.extend_from_slice(&scripted.contacts);
            }
            if self.options.contains(CollisionOptions::DISTANCE) {
                report.min_distance = 0.0;
            }
            return !scripted.contacts.is_empty();
        }

        let Some((c1, r1)) = self.sphere_of(body, link) else {
            return false;
        };

        let mut hit = false;
        for other in self.candidates(Some(body), target) {
            for other_link in 0..self.bodies[other].links.len() {
                let Some((c2, r2)) = self.sphere_of(other, other_link) else {
                    continue;
                };
                let delta = c2 - c1;
                let d = delta.norm();
                let sum = r1 + r2;
                if self.options.contains(CollisionOptions::DISTANCE) {
                    report.min_distance = report.min_distance.min((d - sum).max(0.0));
                }
                if d < sum {
                    hit = true;
                    if self.options.contains(CollisionOptions::CONTACTS) {
                        // Normal away from the queried link, into the other body.
                        let n = if d > 1e-10 { delta / d } else { Vector3::z() };
                        report.contacts.push(Contact {
                            pos: c2 - n * r2,
                            norm: n,
                            depth: sum - d,
                        });
                    }
                }
            }
        }
        hit
    }

    fn cast_ray(&self, ray: &Ray, target: Option<BodyId>, report: &mut CollisionReport) -> bool {
        report.clear();
        let max_distance = ray.dir.norm();
        if max_distance < 1e-12 {
            return false;
        }
        let dir = ray.dir / max_distance;

        let mut best: Option<(f64, Point3<f64>, Vector3<f64>)> = None;
        for body in self.candidates(None, target) {
            for link in 0..self.bodies[body].links.len() {
                let hit = match self.bodies[body].links[link].shape {
                    Some(FixtureShape::Sphere { radius }) => raycast_sphere(
                        self.link_pose(body, link).position,
                        radius,
                        ray.origin,
                        &dir,
                        max_distance,
                    ),
                    Some(FixtureShape::Cuboid { half_extents }) => raycast_cuboid(
                        &self.link_pose(body, link),
                        half_extents,
                        ray.origin,
                        &dir,
                        max_distance,
                    ),
                    None => None,
                };
                if let Some((t, point, normal)) = hit {
                    if best.as_ref().map_or(true, |(bt, _, _)| t < *bt) {
                        best = Some((t, point, normal));
                    }
                }
            }
        }

        let Some((t, point, normal)) = best else {
            return false;
        };
        if self.options.contains(CollisionOptions::CONTACTS) {
            report.contacts.push(Contact::new(point, normal));
        }
        if self.options.contains(CollisionOptions::DISTANCE) {
            report.min_distance = t;
        }
        true
    }
}

impl RobotEnvironment for FixtureWorld {
    fn active_dof_count(&self, robot: BodyId) -> usize {
        self.bodies[robot].dofs.len()
    }

    fn active_dof_values(&self, robot: BodyId) -> DVector<f64> {
        self.bodies[robot].dofs.clone()
    }

    fn set_active_dof_values(
        &mut self,
        robot: BodyId,
        values: &DVector<f64>,
    ) -> Result<(), WorldError> {
        self.set_dof_values(robot, values)
    }

    fn manipulators(&self, robot: BodyId) -> Vec<Manipulator> {
        self.bodies[robot].manipulators.clone()
    }

    fn active_manipulator(&self, robot: BodyId) -> Option<Manipulator> {
        let b = &self.bodies[robot];
        b.active_manipulator.map(|i| b.manipulators[i].clone())
    }

    fn jacobian_position(
        &self,
        robot: BodyId,
        link: LinkIndex,
        point: &Point3<f64>,
    ) -> DMatrix<f64> {
        let b = &self.bodies[robot];
        let mut jac = DMatrix::zeros(3, b.dofs.len());
        let mut acc = b.pose;
        let mut dof = 0;
        for l in &b.links[..=link] {
            acc = acc.compose(&l.offset);
            if let Some(joint) = &l.joint {
                let anchor = acc.position;
                let column = match joint {
                    FixtureJoint::Hinge { axis } => {
                        let axis_w = acc.transform_vector(&axis.normalize());
                        axis_w.cross(&(point - anchor))
                    }
                    FixtureJoint::Slide { axis } => acc.transform_vector(&axis.normalize()),
                };
                for k in 0..3 {
                    jac[(k, dof)] = column[k];
                }
                acc = acc.compose(&joint_pose(joint, b.dofs[dof]));
                dof += 1;
            }
        }
        jac
    }

    fn set_motion(&mut self, robot: BodyId, trajectory: &Trajectory) {
        self.last_motion = Some((robot, trajectory.clone()));
    }
}
