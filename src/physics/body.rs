//! Rigid bodies whose shape, mass and inertia derive from occupancy masks.

use crate::math as m;

use super::{
    clamp_frame_step,
    collision::{self, Collision},
    integrator::{Derivatives, Rk4, StateSlot},
    mask::OccupancyMask,
    SimulationConfig, Velocity,
};

/// Determines how a body's surface responds to contact with the environment.
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug)]
pub struct SurfaceMaterial {
    /// Coefficient of restitution: 0 = fully inelastic, 1 = fully elastic.
    pub restitution_coef: f64,
    /// Coulomb friction coefficient against the static environment.
    pub friction_coef: f64,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        SurfaceMaterial {
            restitution_coef: 0.5,
            friction_coef: 0.01,
        }
    }
}

/// A rigid body shaped by a raster occupancy mask.
///
/// Mass, center of mass, moment of inertia and the broad-phase collision
/// radius are all derived from the mask at construction and whenever the
/// mask is replaced. A body with no solid cells is *empty*: it is inert and
/// skips integration, collision and impulses entirely.
///
/// Each body runs its own RK4 gravity integrator and resolves its own
/// contacts against the configured ground boundary; spring joints only ever
/// touch its velocities.
#[derive(Clone, Debug)]
pub struct Body {
    /// World position of the center of mass.
    pub pos: m::Vec2,
    /// Orientation in radians, wrapped into `(-π, π]` every step.
    pub rotation: f64,
    pub velocity: Velocity,
    pub material: SurfaceMaterial,
    mask: OccupancyMask,
    density: f64,
    config: SimulationConfig,
    mass: f64,
    moment_of_inertia: f64,
    center_of_mass_local: Option<m::Vec2>,
    collision_radius: f64,
    integrator: Rk4<2>,
}

impl Body {
    /// Build a body from a mask and a mass-per-cell density.
    ///
    /// `pos` starts at the center of mass *in mask coordinates*, so a part
    /// cut from a painted canvas keeps its painted world position.
    pub fn new(mask: OccupancyMask, density: f64, config: SimulationConfig) -> Self {
        let mut body = Body {
            pos: m::Vec2::zero(),
            rotation: 0.0,
            velocity: Velocity::default(),
            material: SurfaceMaterial::default(),
            mask,
            density,
            config,
            mass: 0.0,
            moment_of_inertia: 0.0,
            center_of_mass_local: None,
            collision_radius: 0.0,
            integrator: Rk4::new(),
        };
        body.recompute_mass_properties();
        if let Some(com) = body.center_of_mass_local {
            body.pos = com;
        }
        body
    }

    /// Place the body's center of mass at a world position.
    pub fn with_position(mut self, pos: m::Vec2) -> Self {
        self.pos = pos;
        self
    }

    pub fn with_material(mut self, material: SurfaceMaterial) -> Self {
        self.material = material;
        self
    }

    /// Replace the body's shape, e.g. after part of it was shot off.
    /// All derived quantities are recomputed; losing every solid cell
    /// leaves the body empty and inert.
    pub fn set_mask(&mut self, mask: OccupancyMask) {
        self.mask = mask;
        self.recompute_mass_properties();
    }

    /// Mass, center of mass, moment of inertia and collision radius from
    /// the current mask. Radius rides along in the inertia pass since both
    /// need the distance of every cell from the center.
    fn recompute_mass_properties(&mut self) {
        let cell_count = self.mask.solid_count();
        if cell_count == 0 {
            self.mass = 0.0;
            self.moment_of_inertia = 0.0;
            self.center_of_mass_local = None;
            self.collision_radius = 0.0;
            return;
        }

        let mut sum = m::Vec2::zero();
        for (x, y) in self.mask.solid_cells() {
            sum += m::Vec2::new(x as f64, y as f64);
        }
        let com = sum / cell_count as f64;

        let mut dist_sq_sum = 0.0;
        let mut max_dist_sq = 0.0f64;
        for (x, y) in self.mask.solid_cells() {
            let dist_sq = (m::Vec2::new(x as f64, y as f64) - com).mag_sq();
            dist_sq_sum += dist_sq;
            max_dist_sq = max_dist_sq.max(dist_sq);
        }

        self.mass = cell_count as f64 * self.density;
        self.moment_of_inertia = dist_sq_sum / cell_count as f64 * self.mass;
        self.center_of_mass_local = Some(com);
        self.collision_radius = max_dist_sq.sqrt();
    }

    // accessors

    pub fn is_empty(&self) -> bool {
        self.center_of_mass_local.is_none()
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn moment_of_inertia(&self) -> f64 {
        self.moment_of_inertia
    }

    /// Center of mass in mask coordinates, or None for an empty body.
    pub fn center_of_mass_local(&self) -> Option<m::Vec2> {
        self.center_of_mass_local
    }

    /// Distance from the center of mass to the farthest solid cell.
    pub fn collision_radius(&self) -> f64 {
        self.collision_radius
    }

    pub fn mask(&self) -> &OccupancyMask {
        &self.mask
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Velocity of a world point riding on this body.
    pub fn point_velocity(&self, world_point: m::Vec2) -> m::Vec2 {
        self.velocity.point_velocity(world_point - self.pos)
    }

    /// Whether the world point lands on a solid cell, ignoring rotation.
    /// Out-of-bounds points are simply not contained.
    pub fn contains_point(&self, world_point: m::Vec2) -> bool {
        let Some(com) = self.center_of_mass_local else {
            return false;
        };
        let local = world_point - self.pos + com;
        if local.x < 0.0 || local.y < 0.0 {
            return false;
        }
        self.mask.get(local.x as usize, local.y as usize)
    }

    /// Kick the body with an impulse acting at a world point.
    ///
    /// An off-center impulse also spins the body. Calling this every tick
    /// with `force * dt` turns a sustained force into an acceleration.
    pub fn apply_impulse(&mut self, impulse: m::Vec2, world_point: m::Vec2) {
        if self.is_empty() || impulse.mag_sq() == 0.0 {
            return;
        }

        let r = world_point - self.pos;
        // τ = r × J, τ = I·Δω
        self.velocity.angular += m::perp_dot(r, impulse) / self.moment_of_inertia;
        self.velocity.linear += impulse / self.mass;
    }

    /// Advance the body by `dt`: integrate free fall, wrap the rotation,
    /// then detect and resolve contact with the ground boundary.
    pub fn update(&mut self, dt: f64) {
        if self.is_empty() {
            return;
        }
        let dt = clamp_frame_step(dt);

        let mut slots = [
            StateSlot::linear(self.pos, self.velocity.linear),
            StateSlot::scalar(self.rotation, self.velocity.angular),
        ];
        let mut gravity = GravityDerivatives {
            gravity: self.config.gravity,
        };
        self.integrator.integrate(&mut slots, &mut gravity, dt);

        self.pos = slots[0].orders[0];
        self.velocity.linear = slots[0].orders[1];
        self.rotation = m::wrap_angle(slots[1].orders[0].x);
        self.velocity.angular = slots[1].orders[1].x;

        self.handle_collisions();
    }

    fn handle_collisions(&mut self) {
        let ground = self.config.ground;
        if let Some(col) = collision::intersection_check(self, &ground) {
            self.resolve_collision(&col);
        }
    }

    /// Impulse response to a contact: push out of the overlap, cancel the
    /// approach velocity scaled by restitution, and rub off tangential
    /// velocity with clamped Coulomb friction.
    fn resolve_collision(&mut self, col: &Collision) {
        let tangent = m::left_normal(*col.normal);
        let r = col.point - self.pos;
        let point_vel = self.point_velocity(col.point);
        let tangent_vel = point_vel.dot(tangent);

        // positional correction straight out of the overlap
        self.pos += *col.normal * col.overlap;

        let r_cross_n = m::perp_dot(r, *col.normal);
        let impulse_mag = -(1.0 + self.material.restitution_coef) * point_vel.dot(*col.normal)
            / (1.0 / self.mass + r_cross_n * r_cross_n / self.moment_of_inertia);
        let mut impulse = *col.normal * impulse_mag;

        // Coulomb friction: μ·m·g against the direction of sliding
        let mut friction_force =
            -tangent_vel.signum() * self.material.friction_coef * self.mass * self.config.gravity;

        // friction can stop the contact point along the tangent but never
        // push it backwards, so cap at the force that stops it exactly
        let stopping_force = -tangent_vel / (1.0 / self.mass + r.mag_sq() / self.moment_of_inertia);
        if friction_force.abs() > stopping_force.abs() {
            friction_force = stopping_force;
        }

        impulse += tangent * friction_force;
        self.apply_impulse(impulse, col.point);
    }
}

/// Free fall: position integrates velocity, velocity integrates the
/// constant downward pull; rotation integrates angular velocity, which
/// sees no torque.
struct GravityDerivatives {
    gravity: f64,
}

impl Derivatives<2> for GravityDerivatives {
    fn order0(&mut self, slots: &[StateSlot; 2], _t: f64) -> [m::Vec2; 2] {
        [slots[0].orders[1], slots[1].orders[1]]
    }

    fn order1(&mut self, _slots: &[StateSlot; 2], _t: f64) -> [m::Vec2; 2] {
        [m::Vec2::new(0.0, self.gravity), m::Vec2::zero()]
    }
}

//
// tests
//
