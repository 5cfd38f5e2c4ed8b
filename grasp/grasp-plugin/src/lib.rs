//! Keyword-command orchestrator for grasp analysis.
//!
//! [`GrasperPlugin`] owns the environment handle and the external planner
//! and exposes the four text commands of the grasp toolchain:
//!
//! - `Grasp` — plan a finger-closing motion, apply its final pose, report
//!   the resulting contacts, and optionally analyze force closure;
//! - `ComputeDistanceMap` — sample a target's surface and measure the
//!   clearance around every sample;
//! - `GetStableContacts` — report the contacts stable under the closing
//!   motion and friction;
//! - `ConvexHull` — expose the hull service over a raw point cloud.
//!
//! Commands take a whitespace-tokenized keyword stream and write
//! whitespace-separated numeric output. Each command acquires the
//! environment for its entire duration, and robot/target state, collision
//! options, and the active collision checker are restored on every exit
//! path.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod command;
mod error;

pub use error::CommandError;

use std::f64::consts::PI;
use std::fmt::Write;
use std::sync::{Arc, Mutex};

use grasp_analysis::{analyze_contacts_3d, box_sample, stable_contacts};
use grasp_types::{BodyId, Contact, GraspAnalysis, GraspParameters, TaggedContact};
use grasp_world::{
    with_collision_options, BodySnapshot, CollisionOptions, CollisionReport, Environment, Planner,
    RobotEnvironment,
};
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use command::Tokens;

/// Default distance-map cone half-angle.
const DEFAULT_CONE_WIDTH: f64 = 0.25 * PI;
/// Default distance-map sample count.
const DEFAULT_MAP_SAMPLES: usize = 60_000;
/// Default distance-map clearance cap.
const DEFAULT_MAP_RANGE: f64 = 2.0;
/// Friction-cone discretization used by the `Grasp` force-closure step.
const FORCE_CLOSURE_CONE_POINTS: usize = 8;

/// Parsed `Grasp` request: planner parameters plus command-local flags.
struct GraspRequest {
    params: GraspParameters,
    friction: f64,
    get_link_collisions: bool,
    execute: bool,
    stable_contacts: bool,
    force_closure: bool,
    output_final: bool,
    write_traj: Option<String>,
    checker: Option<String>,
}

impl Default for GraspRequest {
    fn default() -> Self {
        Self {
            params: GraspParameters::default(),
            friction: 0.0,
            get_link_collisions: false,
            execute: true,
            stable_contacts: false,
            force_closure: false,
            output_final: false,
            write_traj: None,
            checker: None,
        }
    }
}

/// The grasp command orchestrator.
///
/// Process-lifetime owner of the robot and planner handles; everything
/// else is request-scoped.
pub struct GrasperPlugin<E, P> {
    env: Arc<Mutex<E>>,
    robot: BodyId,
    planner: P,
    rng: StdRng,
}

impl<E, P> GrasperPlugin<E, P>
where
    E: RobotEnvironment,
    P: Planner<E>,
{
    /// Create a plugin for `robot` in `env`, planning with `planner`.
    #[must_use]
    pub fn new(env: Arc<Mutex<E>>, robot: BodyId, planner: P) -> Self {
        Self::with_seed(env, robot, planner, rand::random())
    }

    /// Like [`GrasperPlugin::new`] with a fixed sampling seed, for
    /// reproducible runs.
    #[must_use]
    pub fn with_seed(env: Arc<Mutex<E>>, robot: BodyId, planner: P, seed: u64) -> Self {
        Self {
            env,
            robot,
            planner,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `Grasp`: plan the finger closing, apply its final pose, and stream
    /// the contact lines `px py pz nx ny nz [link]`, then optionally the
    /// final base pose and joint vector, then optionally
    /// `mindist volume`.
    ///
    /// A failed force-closure analysis degrades to the `0 0` sentinel; a
    /// failed plan is a command error. All mutated state is restored
    /// before returning.
    ///
    /// # Errors
    ///
    /// Parse failures, planner failures, and output failures.
    pub fn grasp<W: Write>(&mut self, args: &str, out: &mut W) -> Result<(), CommandError> {
        let env_arc = Arc::clone(&self.env);
        let mut guard = env_arc
            .lock()
            .map_err(|_| CommandError::EnvironmentPoisoned)?;
        let env = &mut *guard;

        let mut request = parse_grasp(env, args)?;

        let robot_snapshot = BodySnapshot::capture(env, self.robot);
        let target_snapshot = request
            .params
            .target_body
            .map(|body| BodySnapshot::capture(env, body));
        let prior_checker = match &request.checker {
            Some(name) => {
                let prior = env.collision_checker();
                env.set_collision_checker(name)?;
                Some(prior)
            }
            None => None,
        };

        let result = run_grasp(
            env,
            &mut self.planner,
            self.robot,
            &mut request,
            target_snapshot.as_ref(),
            out,
        );

        if let Some(snapshot) = &target_snapshot {
            snapshot.restore(env);
        }
        robot_snapshot.restore(env);
        if let Some(prior) = prior_checker {
            if let Err(err) = env.set_collision_checker(&prior) {
                warn!("failed to restore collision checker: {err}");
            }
        }
        result
    }

    /// `ComputeDistanceMap`: sample the target surface around a center
    /// and stream one `depth nx ny nz (px-cx) (py-cy) (pz-cz)` line per
    /// sample.
    ///
    /// The robot is disabled for the duration; the target is enabled for
    /// sampling and disabled while clearances are measured, so the map
    /// reports the free space left by the *rest* of the scene.
    ///
    /// # Errors
    ///
    /// Parse failures, a missing target, and output failures.
    pub fn compute_distance_map<W: Write>(
        &mut self,
        args: &str,
        out: &mut W,
    ) -> Result<(), CommandError> {
        let env_arc = Arc::clone(&self.env);
        let mut guard = env_arc
            .lock()
            .map_err(|_| CommandError::EnvironmentPoisoned)?;
        let env = &mut *guard;

        let mut cone_width = DEFAULT_CONE_WIDTH;
        let mut map_samples = DEFAULT_MAP_SAMPLES;
        let mut target = None;
        let mut center = Point3::origin();

        let mut tokens = Tokens::new(args);
        while let Some(keyword) = tokens.next() {
            match keyword.to_ascii_lowercase().as_str() {
                "conewidth" => cone_width = tokens.arg(keyword)?,
                "mapsamples" => map_samples = tokens.arg(keyword)?,
                "target" => {
                    let name: String = tokens.arg(keyword)?;
                    target = env.body_id(&name);
                    if target.is_none() {
                        warn!("failed to find target {name}");
                    }
                }
                "center" => center = tokens.point3(keyword)?,
                other => return Err(CommandError::UnknownKeyword(other.to_owned())),
            }
        }
        let target = target.ok_or(CommandError::MissingTarget)?;

        let robot_snapshot = BodySnapshot::capture(env, self.robot);
        let target_snapshot = BodySnapshot::capture(env, target);

        let robot = self.robot;
        let rng = &mut self.rng;
        let result: Result<(), CommandError> = (|| {
            env.set_body_enabled(robot, false);
            env.set_body_enabled(target, true);
            let mut points = box_sample(env, target, map_samples, center);
            env.set_body_enabled(target, false);
            grasp_analysis::compute_distance_map(
                env,
                &mut points,
                cone_width,
                DEFAULT_MAP_RANGE,
                rng,
            );

            for c in &points {
                writeln!(
                    out,
                    "{} {} {} {} {} {} {}",
                    c.depth,
                    c.norm.x,
                    c.norm.y,
                    c.norm.z,
                    c.pos.x - center.x,
                    c.pos.y - center.y,
                    c.pos.z - center.z
                )?;
            }
            Ok(())
        })();

        target_snapshot.restore(env);
        robot_snapshot.restore(env);
        result
    }

    /// `GetStableContacts`: stream the contacts stable under the closing
    /// motion, in `Grasp` contact-line format.
    ///
    /// # Errors
    ///
    /// Parse failures, a non-positive friction coefficient, and output
    /// failures.
    pub fn get_stable_contacts<W: Write>(
        &mut self,
        args: &str,
        out: &mut W,
    ) -> Result<(), CommandError> {
        let env_arc = Arc::clone(&self.env);
        let mut guard = env_arc
            .lock()
            .map_err(|_| CommandError::EnvironmentPoisoned)?;
        let env = &mut *guard;

        let mut direction = nalgebra::Vector3::zeros();
        let mut friction = 0.0;
        let mut get_link_collisions = false;

        let mut tokens = Tokens::new(args);
        while let Some(keyword) = tokens.next() {
            match keyword.to_ascii_lowercase().as_str() {
                "direction" => direction = tokens.vector3(keyword)?,
                "friction" => friction = tokens.arg(keyword)?,
                "getlinkcollisions" => get_link_collisions = true,
                other => return Err(CommandError::UnknownKeyword(other.to_owned())),
            }
        }

        let contacts = stable_contacts(env, self.robot, &direction, friction)?;
        write_contact_lines(out, &contacts, get_link_collisions)?;
        Ok(())
    }

    /// `ConvexHull`: compute the hull of an inline point cloud and stream
    /// the enabled sections in fixed order: planes, faces, triangles.
    ///
    /// # Errors
    ///
    /// Parse failures, hull failures, triangulation of a non-3-D hull,
    /// and output failures.
    pub fn convex_hull<W: Write>(&mut self, args: &str, out: &mut W) -> Result<(), CommandError> {
        let mut points: Vec<f64> = Vec::new();
        let mut dim = 0usize;
        let mut return_planes = true;
        let mut return_faces = true;
        let mut return_triangles = true;

        let mut tokens = Tokens::new(args);
        while let Some(keyword) = tokens.next() {
            match keyword.to_ascii_lowercase().as_str() {
                "points" => {
                    let count: usize = tokens.arg(keyword)?;
                    dim = tokens.arg(keyword)?;
                    points = Vec::with_capacity(count.saturating_mul(dim));
                    for _ in 0..count * dim {
                        points.push(tokens.arg(keyword)?);
                    }
                }
                "returnplanes" => return_planes = tokens.boolean(keyword)?,
                "returnfaces" => return_faces = tokens.boolean(keyword)?,
                "returntriangles" => return_triangles = tokens.boolean(keyword)?,
                other => return Err(CommandError::UnknownKeyword(other.to_owned())),
            }
        }

        let hull = grasp_hull::convex_hull(&points, dim)?;

        if return_planes {
            write!(out, "{}", hull.faces.len())?;
            for face in &hull.faces {
                for n in &face.normal {
                    write!(out, " {n}")?;
                }
                write!(out, " {}", face.offset)?;
            }
            writeln!(out)?;
        }

        if return_faces {
            write!(out, "{}", hull.faces.len())?;
            for face in &hull.faces {
                write!(out, " {}", face.vertices.len())?;
                for v in &face.vertices {
                    write!(out, " {v}")?;
                }
            }
            writeln!(out)?;
        }

        if return_triangles {
            let triangles = grasp_hull::triangulate_faces(&points, &hull)?;
            write!(out, "{}", triangles.len())?;
            for t in &triangles {
                write!(out, " {} {} {}", t[0], t[1], t[2])?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Parse a `Grasp` keyword stream.
fn parse_grasp<E: Environment + ?Sized>(
    env: &E,
    args: &str,
) -> Result<GraspRequest, CommandError> {
    let mut request = GraspRequest::default();
    let mut tokens = Tokens::new(args);
    while let Some(keyword) = tokens.next() {
        match keyword.to_ascii_lowercase().as_str() {
            "body" | "target" => {
                let name: String = tokens.arg(keyword)?;
                request.params.target_body = env.body_id(&name);
                if request.params.target_body.is_none() {
                    warn!("failed to find target {name}");
                }
            }
            "bodyid" => {
                let id: usize = tokens.arg(keyword)?;
                if id < env.body_count() {
                    request.params.target_body = Some(id);
                } else {
                    warn!("no body with id {id}");
                }
            }
            "direction" => {
                let direction = tokens.vector3(keyword)?;
                if direction.norm() < 1e-12 {
                    return Err(CommandError::InvalidArgument {
                        keyword: keyword.to_owned(),
                        value: "zero direction".to_owned(),
                    });
                }
                request.params.target_direction = direction.normalize();
            }
            "avoidlink" => request
                .params
                .avoid_link_geometry
                .push(tokens.arg(keyword)?),
            "notrans" => request.params.transform_robot = false,
            "transformrobot" => request.params.transform_robot = tokens.boolean(keyword)?,
            "onlycontacttarget" => request.params.only_contact_target = tokens.boolean(keyword)?,
            "tightgrasp" => request.params.tight_grasp = tokens.boolean(keyword)?,
            "execute" => request.execute = tokens.boolean(keyword)?,
            "writetraj" => request.write_traj = Some(tokens.arg(keyword)?),
            "outputfinal" => request.output_final = tokens.boolean(keyword)?,
            "graspingnoise" => request.params.grasping_noise = tokens.arg(keyword)?,
            "roll" => request.params.target_roll = tokens.arg(keyword)?,
            "centeroffset" | "position" => {
                request.params.target_position = tokens.point3(keyword)?;
            }
            "standoff" => request.params.standoff = tokens.arg(keyword)?,
            "friction" => request.friction = tokens.arg(keyword)?,
            "getlinkcollisions" => request.get_link_collisions = true,
            "stablecontacts" => request.stable_contacts = tokens.boolean(keyword)?,
            "forceclosure" => request.force_closure = tokens.boolean(keyword)?,
            "collision" => request.checker = Some(tokens.arg(keyword)?),
            "translationstepmult" => {
                request.params.translation_step_mult = tokens.arg(keyword)?;
            }
            other => return Err(CommandError::UnknownKeyword(other.to_owned())),
        }
    }
    Ok(request)
}

/// The `Grasp` body proper; the caller restores robot/target/checker
/// state around it.
fn run_grasp<E, P, W>(
    env: &mut E,
    planner: &mut P,
    robot: BodyId,
    request: &mut GraspRequest,
    target_snapshot: Option<&BodySnapshot>,
    out: &mut W,
) -> Result<(), CommandError>
where
    E: RobotEnvironment,
    P: Planner<E>,
    W: Write,
{
    env.set_body_enabled(robot, true);
    request.params.initial_config = env.active_dof_values(robot);

    planner.init_plan(env, robot, &request.params)?;
    let trajectory = planner.plan_path(env, robot)?;
    if trajectory.is_empty() {
        return Err(CommandError::EmptyPlan);
    }

    if let Some(path) = &request.write_traj {
        let mut text = String::new();
        trajectory.write_text(&mut text)?;
        std::fs::write(path, text)?;
    }

    // Measure contacts with the target back in its pre-plan state and the
    // robot at the trajectory's final pose.
    if let Some(snapshot) = target_snapshot {
        snapshot.restore(env);
    }
    if let Some(last) = trajectory.last() {
        env.set_body_pose(robot, &last.pose);
        env.set_active_dof_values(robot, &last.q)?;
    }

    let contacts = if request.stable_contacts {
        let direction = match request.params.target_body {
            Some(target) => env
                .body_pose(target)
                .transform_vector(&request.params.target_direction),
            None => request.params.target_direction,
        };
        stable_contacts(env, robot, &direction, request.friction)?
    } else {
        collect_manipulator_contacts(env, robot, request.params.target_body)
    };
    debug!("number of contacts: {}", contacts.len());

    write_contact_lines(out, &contacts, request.get_link_collisions)?;

    if request.output_final {
        if let Some(last) = trajectory.last() {
            let r = last.pose.rotation;
            let p = last.pose.position;
            write!(out, "{} {} {} {} {} {} {}", r.w, r.i, r.j, r.k, p.x, p.y, p.z)?;
            for v in env.dof_values(robot).iter() {
                write!(out, " {v}")?;
            }
            writeln!(out)?;
        }
    }

    if request.force_closure {
        let plain: Vec<Contact> = contacts.iter().map(|tc| tc.contact).collect();
        let analysis =
            match analyze_contacts_3d(&plain, request.friction, FORCE_CLOSURE_CONE_POINTS) {
                Ok(analysis) => analysis,
                Err(err) => {
                    warn!("force-closure analysis failed: {err}");
                    GraspAnalysis::default()
                }
            };
        writeln!(out, "{} {}", analysis.mindist, analysis.volume)?;
    }

    if request.execute {
        env.set_motion(robot, &trajectory);
    }
    Ok(())
}

/// Direct contact collection: every active-manipulator child link against
/// the target, normals reoriented to point into the gripper link.
fn collect_manipulator_contacts<E: RobotEnvironment + ?Sized>(
    env: &mut E,
    robot: BodyId,
    target: Option<BodyId>,
) -> Vec<TaggedContact> {
    let Some(manip) = env.active_manipulator(robot) else {
        warn!("robot {robot} has no active manipulator");
        return Vec::new();
    };

    let mut contacts = Vec::new();
    with_collision_options(env, CollisionOptions::CONTACTS, |env| {
        let mut report = CollisionReport::new();
        for &link in &manip.child_links {
            if !env.check_link_collision(robot, link, target, &mut report) {
                continue;
            }
            for c in &report.contacts {
                let (norm, depth) = if report.query_is_first {
                    (-c.norm, -c.depth)
                } else {
                    (c.norm, c.depth)
                };
                contacts.push(TaggedContact {
                    contact: Contact {
                        pos: c.pos,
                        norm,
                        depth,
                    },
                    link,
                });
            }
        }
    });
    contacts
}

/// Stream `px py pz nx ny nz [link]`, one line per contact.
fn write_contact_lines<W: Write>(
    out: &mut W,
    contacts: &[TaggedContact],
    with_links: bool,
) -> Result<(), CommandError> {
    for tc in contacts {
        let c = &tc.contact;
        write!(
            out,
            "{} {} {} {} {} {}",
            c.pos.x, c.pos.y, c.pos.z, c.norm.x, c.norm.y, c.norm.z
        )?;
        if with_links {
            write!(out, " {}", tc.link)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
