//! A 2D rigid-body physics core for a destructible, player-assembled
//! aircraft game.
//!
//! Bodies are shaped by raster occupancy masks: mass, center of mass,
//! moment of inertia and collision bounds all come straight from the
//! painted pixels. Each body integrates free fall with a classical RK4
//! scheme and collides pixel-exactly against static boundary rectangles;
//! breakable damped-spring joints couple bodies into larger machines.
//!
//! Rendering, input and raster decoding live in the embedding application.
//! The core consumes masks, densities and frame times, and exposes numeric
//! state for the application to draw.

pub mod math;
pub use math::{uv, Unit, Vec2};

pub mod physics;
pub use physics::{
    assembly::{Aircraft, AircraftLayout, AssemblyError, Material, PartKind},
    body::{Body, SurfaceMaterial},
    collision::{intersection_check, Collision, Rect, BROADPHASE_MARGIN},
    integrator::{Derivatives, Rk4, StateSlot},
    joint::{AngularParams, Joint, JointAttachError, JointParams},
    mask::{segment_mask, segment_mask_regions, MaskRegion, OccupancyMask},
    clamp_frame_step, BodyKey, SimulationConfig, Velocity, FALLBACK_FRAME_STEP, MAX_FRAME_STEP,
};

// Re-exported so the embedding application's arena type always matches ours.
pub use thunderdome;
