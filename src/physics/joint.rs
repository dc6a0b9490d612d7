//! Damped-spring joints holding pairs of bodies together, with breakage.

use crate::math as m;

use super::{
    body::Body,
    clamp_frame_step,
    integrator::{Derivatives, Rk4, StateSlot},
    BodyKey, Velocity,
};

use thunderdome::Arena;

/// Spring tuning for a joint.
///
/// Two stiffness tiers are provided as presets; a joint additionally
/// resists relative rotation when `angular` is present. There is no
/// separate angular joint type.
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug)]
pub struct JointParams {
    /// Spring constant pulling the two attach points together.
    pub spring_coef: f64,
    /// Damping on the relative velocity of the attach points.
    pub damping_coef: f64,
    /// Distance between the attach points beyond which the joint breaks.
    pub stretch_limit: f64,
    pub angular: Option<AngularParams>,
}

/// Tuning for the rotational part of a joint.
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug)]
pub struct AngularParams {
    pub spring_coef: f64,
    pub damping_coef: f64,
    /// Relative-rotation deflection beyond which the joint breaks, radians.
    pub stretch_limit: f64,
}

impl JointParams {
    /// Weak tier, used for the player-placed part-to-part couplings.
    pub const LOOSE: Self = JointParams {
        spring_coef: 300_000.0,
        damping_coef: 10_000.0,
        stretch_limit: 30.0,
        angular: None,
    };

    /// Stiff tier.
    pub const STIFF: Self = JointParams {
        spring_coef: 600_000.0,
        damping_coef: 2_000.0,
        stretch_limit: 35.0,
        angular: None,
    };

    /// Stiff tier that also holds the bodies' relative rotation,
    /// used to bolt engines onto parts.
    pub const ANGULAR: Self = JointParams {
        spring_coef: 600_000.0,
        damping_coef: 2_000.0,
        stretch_limit: 35.0,
        angular: Some(AngularParams {
            spring_coef: 4e9,
            damping_coef: 5e3,
            stretch_limit: std::f64::consts::FRAC_PI_8,
        }),
    };
}

/// Configuration errors surfaced when wiring a joint.
///
/// These are the only failures the joint subsystem knows; everything that
/// can go wrong mid-simulation is a defined physical outcome instead.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum JointAttachError {
    #[error("joint attached to a body that does not exist")]
    BodyNotFound,
    #[error("joint attached to both ends of the same body")]
    SameBody,
    #[error("joint attached to an empty body")]
    EmptyBody,
}

/// A damped spring holding two bodies together at a shared world point,
/// optionally also holding their relative rotation.
///
/// The joint does not own its bodies; it keys into the arena they live in,
/// and several joints may act on the same body. Stretching past the
/// configured limit breaks the joint: a one-way transition after which it
/// stays in the simulation (its attach points keep tracking the two
/// bodies for drawing) but never applies force again.
#[derive(Clone, Debug)]
pub struct Joint {
    params: JointParams,
    body1: BodyKey,
    body2: BodyKey,
    /// Attach offsets from each body's center of mass, fixed at attach time.
    offset1: m::Vec2,
    offset2: m::Vec2,
    /// Relative rotation to hold, captured at attach time. Unused without
    /// angular params.
    target_angle: f64,
    attach1: m::Vec2,
    attach2: m::Vec2,
    broken: bool,
    integrator: Rk4<4>,
}

impl Joint {
    /// Wire a joint between two bodies through a world point.
    ///
    /// The attach offsets are captured once, from each body's pose as it is
    /// right now; the joint will forever try to keep the two points it
    /// marked coincident. Misconfiguration (unknown keys, the same body
    /// twice, an empty body) fails here rather than mid-simulation.
    pub fn attach(
        params: JointParams,
        bodies: &Arena<Body>,
        body1: BodyKey,
        body2: BodyKey,
        attach_point: m::Vec2,
    ) -> Result<Self, JointAttachError> {
        if body1 == body2 {
            return Err(JointAttachError::SameBody);
        }
        let b1 = bodies.get(body1).ok_or(JointAttachError::BodyNotFound)?;
        let b2 = bodies.get(body2).ok_or(JointAttachError::BodyNotFound)?;
        if b1.is_empty() || b2.is_empty() {
            return Err(JointAttachError::EmptyBody);
        }

        Ok(Joint {
            params,
            body1,
            body2,
            offset1: attach_point - b1.pos,
            offset2: attach_point - b2.pos,
            target_angle: b1.rotation - b2.rotation,
            attach1: attach_point,
            attach2: attach_point,
            broken: false,
            integrator: Rk4::new(),
        })
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn params(&self) -> &JointParams {
        &self.params
    }

    pub fn bodies(&self) -> (BodyKey, BodyKey) {
        (self.body1, self.body2)
    }

    /// World positions of the two attach ends. Kept current even after
    /// breaking so the joint can still be drawn.
    pub fn attach_points(&self) -> (m::Vec2, m::Vec2) {
        (self.attach1, self.attach2)
    }

    /// Advance the joint by `dt`.
    ///
    /// While attached this integrates the spring forces over both bodies'
    /// linear and angular states and writes the resulting velocities back;
    /// positions and rotations stay owned by each body's own gravity
    /// integrator. A broken joint only keeps its attach points tracking
    /// the bodies.
    pub fn update(&mut self, bodies: &mut Arena<Body>, dt: f64) {
        let dt = clamp_frame_step(dt);

        let (Some(b1), Some(b2)) = bodies.get2_mut(self.body1, self.body2) else {
            // a destroyed body severs the joint
            self.broken = true;
            return;
        };
        if b1.is_empty() || b2.is_empty() {
            // a part whittled down to nothing severs it too
            self.broken = true;
            return;
        }

        if self.broken {
            self.attach1 = b1.pos + m::rotate(self.offset1, b1.rotation);
            self.attach2 = b2.pos + m::rotate(self.offset2, b2.rotation);
            return;
        }

        let mut slots = [
            StateSlot::linear(b1.pos, b1.velocity.linear),
            StateSlot::linear(b2.pos, b2.velocity.linear),
            StateSlot::scalar(b1.rotation, b1.velocity.angular),
            StateSlot::scalar(b2.rotation, b2.velocity.angular),
        ];
        let mut spring = SpringDerivatives {
            params: self.params,
            target_angle: self.target_angle,
            offsets: [self.offset1, self.offset2],
            masses: [b1.mass(), b2.mass()],
            moments: [b1.moment_of_inertia(), b2.moment_of_inertia()],
            attach_points: [self.attach1, self.attach2],
            broken: false,
        };
        self.integrator.integrate(&mut slots, &mut spring, dt);

        b1.velocity.linear = slots[0].orders[1];
        b2.velocity.linear = slots[1].orders[1];
        b1.velocity.angular = slots[2].orders[1].x;
        b2.velocity.angular = slots[3].orders[1].x;

        self.attach1 = spring.attach_points[0];
        self.attach2 = spring.attach_points[1];
        if spring.broken {
            log::debug!(
                "spring joint broke between bodies at {:?} and {:?}",
                b1.pos,
                b2.pos
            );
            self.broken = true;
        }
    }
}

/// Spring forces between the two bodies, evaluated on in-flight integrator
/// state. Slots 0/1 carry the linear states, 2/3 the angular ones.
struct SpringDerivatives {
    params: JointParams,
    target_angle: f64,
    offsets: [m::Vec2; 2],
    masses: [f64; 2],
    moments: [f64; 2],
    attach_points: [m::Vec2; 2],
    broken: bool,
}

impl Derivatives<4> for SpringDerivatives {
    fn order0(&mut self, slots: &[StateSlot; 4], _t: f64) -> [m::Vec2; 4] {
        [
            slots[0].orders[1],
            slots[1].orders[1],
            slots[2].orders[1],
            slots[3].orders[1],
        ]
    }

    fn order1(&mut self, slots: &[StateSlot; 4], _t: f64) -> [m::Vec2; 4] {
        // once the spring snaps it stops pushing, mid-step included
        if self.broken {
            return [m::Vec2::zero(); 4];
        }

        let center = [slots[0].orders[0], slots[1].orders[0]];
        let vel = [slots[0].orders[1], slots[1].orders[1]];
        let rotation = [slots[2].orders[0].x, slots[3].orders[0].x];
        let angular_vel = [slots[2].orders[1].x, slots[3].orders[1].x];

        self.attach_points = [
            center[0] + m::rotate(self.offsets[0], rotation[0]),
            center[1] + m::rotate(self.offsets[1], rotation[1]),
        ];
        let delta_point = self.attach_points[0] - self.attach_points[1];
        if delta_point.mag() > self.params.stretch_limit {
            self.broken = true;
            return [m::Vec2::zero(); 4];
        }

        let point_vel = [
            Velocity {
                linear: vel[0],
                angular: angular_vel[0],
            }
            .point_velocity(self.attach_points[0] - center[0]),
            Velocity {
                linear: vel[1],
                angular: angular_vel[1],
            }
            .point_velocity(self.attach_points[1] - center[1]),
        ];

        // F = k·Δx + c·Δv, acting on body 2 toward body 1 and negated
        // for body 1
        let force2 = delta_point * self.params.spring_coef
            + (point_vel[0] - point_vel[1]) * self.params.damping_coef;
        let force1 = -force2;

        let accel1 = force1 / self.masses[0];
        let accel2 = force2 / self.masses[1];
        let mut angular_accel1 =
            m::perp_dot(self.attach_points[0] - center[0], force1) / self.moments[0];
        let mut angular_accel2 =
            m::perp_dot(self.attach_points[1] - center[1], force2) / self.moments[1];

        if let Some(angular) = self.params.angular {
            let displacement = self.target_angle - m::wrap_angle(rotation[0] - rotation[1]);
            if displacement.abs() > angular.stretch_limit {
                self.broken = true;
                return [m::Vec2::zero(); 4];
            }
            let relative_angular_vel = angular_vel[0] - angular_vel[1];
            let torque =
                displacement * angular.spring_coef - relative_angular_vel * angular.damping_coef;
            angular_accel1 += torque / self.moments[0];
            angular_accel2 -= torque / self.moments[1];
        }

        [
            accel1,
            accel2,
            m::Vec2::new(angular_accel1, 0.0),
            m::Vec2::new(angular_accel2, 0.0),
        ]
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{mask::OccupancyMask, Rect, SimulationConfig};

    fn block(w: usize, h: usize) -> OccupancyMask {
        OccupancyMask::from_fn(w, h, |_, _| true)
    }

    fn config() -> SimulationConfig {
        SimulationConfig {
            gravity: 400.0,
            // keep the ground out of the way
            ground: Rect::new(-50.0, 100_000.0, 200_000.0, 50.0),
        }
    }

    fn two_bodies(gap: f64) -> (Arena<Body>, BodyKey, BodyKey) {
        let mut bodies = Arena::new();
        let k1 = bodies.insert(
            Body::new(block(10, 10), 1.0, config()).with_position(m::Vec2::new(100.0, 100.0)),
        );
        let k2 = bodies.insert(
            Body::new(block(10, 10), 1.0, config())
                .with_position(m::Vec2::new(100.0 + gap, 100.0)),
        );
        (bodies, k1, k2)
    }

    #[test]
    fn attach_validates_its_configuration() {
        let (mut bodies, k1, k2) = two_bodies(10.0);
        let point = m::Vec2::new(105.0, 100.0);

        assert_eq!(
            Joint::attach(JointParams::LOOSE, &bodies, k1, k1, point).unwrap_err(),
            JointAttachError::SameBody,
        );

        let empty = bodies.insert(Body::new(OccupancyMask::new(4, 4), 1.0, config()));
        assert_eq!(
            Joint::attach(JointParams::LOOSE, &bodies, k1, empty, point).unwrap_err(),
            JointAttachError::EmptyBody,
        );

        let gone = bodies.insert(Body::new(block(4, 4), 1.0, config()));
        bodies.remove(gone);
        assert_eq!(
            Joint::attach(JointParams::LOOSE, &bodies, k1, gone, point).unwrap_err(),
            JointAttachError::BodyNotFound,
        );

        assert!(Joint::attach(JointParams::LOOSE, &bodies, k1, k2, point).is_ok());
    }

    #[test]
    fn spring_pulls_the_bodies_back_together() {
        let (mut bodies, k1, k2) = two_bodies(10.0);
        let point = m::Vec2::new(105.0, 100.0);
        let mut joint = Joint::attach(JointParams::LOOSE, &bodies, k1, k2, point).unwrap();

        // stretch within the limit
        bodies[k2].pos += m::Vec2::new(10.0, 0.0);
        joint.update(&mut bodies, 0.001);

        assert!(!joint.is_broken());
        assert!(bodies[k1].velocity.linear.x > 0.0, "body 1 pulled right");
        assert!(bodies[k2].velocity.linear.x < 0.0, "body 2 pulled left");
        // the joint must not move anyone directly
        assert_eq!(bodies[k1].pos.x, 100.0);
        assert_eq!(bodies[k2].pos.x, 120.0);
    }

    #[test]
    fn breaks_exactly_when_stretched_past_the_limit() {
        let (mut bodies, k1, k2) = two_bodies(10.0);
        let point = m::Vec2::new(105.0, 100.0);
        let mut joint = Joint::attach(JointParams::LOOSE, &bodies, k1, k2, point).unwrap();

        // attach distance just inside the 30px limit: holds
        bodies[k2].pos += m::Vec2::new(29.0, 0.0);
        joint.update(&mut bodies, 0.001);
        assert!(!joint.is_broken());

        // reset velocities, then stretch past the limit: snaps
        bodies[k1].velocity = Default::default();
        bodies[k2].velocity = Default::default();
        bodies[k2].pos += m::Vec2::new(5.0, 0.0);
        joint.update(&mut bodies, 0.001);
        assert!(joint.is_broken());
        // breaking applies no force
        assert_eq!(bodies[k1].velocity.linear.mag(), 0.0);
        assert_eq!(bodies[k2].velocity.linear.mag(), 0.0);

        // broken is forever, even if the bodies come back within range
        bodies[k2].pos = m::Vec2::new(110.0, 100.0);
        joint.update(&mut bodies, 0.001);
        assert!(joint.is_broken());
        assert_eq!(bodies[k1].velocity.linear.mag(), 0.0);
        assert_eq!(bodies[k2].velocity.linear.mag(), 0.0);
    }

    #[test]
    fn angular_joint_resists_relative_rotation() {
        let (mut bodies, k1, k2) = two_bodies(10.0);
        let point = m::Vec2::new(105.0, 100.0);
        let mut joint = Joint::attach(JointParams::ANGULAR, &bodies, k1, k2, point).unwrap();

        // twist body 1 a little; the spring should start turning it back
        bodies[k1].rotation = 0.05;
        joint.update(&mut bodies, 1e-5);

        assert!(!joint.is_broken());
        assert!(
            bodies[k1].velocity.angular < 0.0,
            "restoring torque on body 1"
        );
        assert!(
            bodies[k2].velocity.angular > 0.0,
            "opposite torque on body 2"
        );
    }

    #[test]
    fn angular_joint_breaks_past_the_angle_limit() {
        let (mut bodies, k1, k2) = two_bodies(10.0);
        let point = m::Vec2::new(105.0, 100.0);
        let mut joint = Joint::attach(JointParams::ANGULAR, &bodies, k1, k2, point).unwrap();

        // twisting the attach offset also moves the attach point, so spin
        // body 1 just past the angle limit but well inside the stretch limit
        bodies[k1].rotation = std::f64::consts::FRAC_PI_8 + 0.05;
        joint.update(&mut bodies, 0.001);
        assert!(joint.is_broken());
    }

    #[test]
    fn losing_a_body_severs_the_joint() {
        let (mut bodies, k1, k2) = two_bodies(10.0);
        let point = m::Vec2::new(105.0, 100.0);
        let mut joint = Joint::attach(JointParams::LOOSE, &bodies, k1, k2, point).unwrap();

        bodies.remove(k2);
        joint.update(&mut bodies, 0.01);
        assert!(joint.is_broken());
    }
}
