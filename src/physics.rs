//! The simulation core: RK4 integration, mask-derived rigid bodies,
//! pixel-exact contact against static rectangles, breakable spring joints,
//! and the aircraft assembly that drives them all in order.

use crate::math as m;

//

pub mod assembly;
pub use assembly::{Aircraft, AircraftLayout, AssemblyError, Material, PartKind};

pub mod body;
pub use body::{Body, SurfaceMaterial};

pub mod collision;
pub use collision::{intersection_check, Collision, Rect};

pub mod integrator;
pub use integrator::{Derivatives, Rk4, StateSlot};

pub mod joint;
pub use joint::{AngularParams, Joint, JointAttachError, JointParams};

pub mod mask;
pub use mask::{segment_mask, segment_mask_regions, MaskRegion, OccupancyMask};

//

/// Key identifying a [`Body`] in the arena that owns it.
///
/// Joints and assemblies hold these instead of owning bodies, so several
/// joints can act on the same body.
pub type BodyKey = thunderdome::Index;

/// Longest wall-clock frame step, in seconds, that is integrated as-is.
pub const MAX_FRAME_STEP: f64 = 0.2;

/// Step used in place of anything longer than [`MAX_FRAME_STEP`].
pub const FALLBACK_FRAME_STEP: f64 = 0.01;

/// Guard against stalled frames: a step longer than [`MAX_FRAME_STEP`] is
/// replaced with [`FALLBACK_FRAME_STEP`] instead of being integrated as one
/// big unstable jump. Simulated time falls behind the wall clock whenever
/// this triggers.
pub fn clamp_frame_step(dt: f64) -> f64 {
    if dt > MAX_FRAME_STEP {
        log::debug!("frame step of {dt}s stalled, stepping {FALLBACK_FRAME_STEP}s instead");
        FALLBACK_FRAME_STEP
    } else {
        dt
    }
}

/// Velocity of a body.
#[derive(Clone, Copy, Debug)]
pub struct Velocity {
    /// Linear velocity in pixels per second.
    pub linear: m::Vec2,
    /// Angular velocity in radians per second.
    pub angular: f64,
}

impl Default for Velocity {
    fn default() -> Self {
        Velocity {
            linear: m::Vec2::zero(),
            angular: 0.0,
        }
    }
}

impl Velocity {
    /// Get the linear velocity of a point offset from the center of mass.
    pub fn point_velocity(&self, offset: m::Vec2) -> m::Vec2 {
        self.linear + m::right_normal(offset) * self.angular
    }
}

/// Environment knobs shared by every body in a simulation.
///
/// Passed to bodies at construction time; there are no process-wide
/// gravity or ground statics.
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug)]
pub struct SimulationConfig {
    /// Downward acceleration in pixels per second squared.
    pub gravity: f64,
    /// The static boundary every body collides against.
    pub ground: Rect,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            gravity: 400.0,
            ground: Rect::new(-50.0, 500.0, 100_000.0, 50.0),
        }
    }
}
