//! Assembling painted parts into a flyable, destructible aircraft.
//!
//! The painting tool hands over occupancy masks and marker positions; this
//! module cuts them into rigid parts, bolts engines on, wires the spring
//! joints, and drives everything in the right order every tick.

use crate::math as m;

use super::{
    body::Body,
    clamp_frame_step,
    joint::{Joint, JointAttachError, JointParams},
    mask::{self, OccupancyMask},
    BodyKey, SimulationConfig,
};

use thunderdome::Arena;

/// The paintable part materials.
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Material {
    Wing,
    Structure,
}

impl Material {
    /// Mass per solid cell.
    pub fn density(self) -> f64 {
        match self {
            Material::Wing => 1.0,
            Material::Structure => 0.2,
        }
    }
}

/// Role of a part within the aircraft.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartKind {
    Wing,
    Structure,
    Engine,
}

/// Mass per cell for engine parts.
const ENGINE_DENSITY: f64 = 2.0;
/// Thrust force of a burning engine.
const ENGINE_FORCE: f64 = 8_000_000.0;
/// Components with at most this many solid cells are discarded as
/// stray paint.
const MIN_PART_CELLS: usize = 50;

/// Painted input for one aircraft, already decoded into occupancy masks by
/// the application. Wing and structure masks share the same canvas
/// coordinates; marker positions are in those coordinates too.
#[derive(Clone, Debug)]
pub struct AircraftLayout {
    pub wings: OccupancyMask,
    pub structures: OccupancyMask,
    /// Shape stamped out for every engine.
    pub engine_shape: OccupancyMask,
    pub engine_positions: Vec<m::Vec2>,
    pub joint_positions: Vec<m::Vec2>,
}

/// Configuration errors surfaced while assembling, before any simulation.
#[derive(thiserror::Error, Debug)]
pub enum AssemblyError {
    #[error("no painted part is big enough to fly")]
    NoParts,
    #[error(transparent)]
    Joint(#[from] JointAttachError),
}

/// A player-built aircraft: parts in an arena, joints between them, and
/// engines that push while thrust is on.
///
/// Per tick the update order is fixed: every body integrates gravity and
/// ground contact first, engines inject their impulses, and the joints run
/// last. Broken joints and emptied parts stay in the lists for the
/// application to draw.
pub struct Aircraft {
    bodies: Arena<Body>,
    parts: Vec<(PartKind, BodyKey)>,
    joints: Vec<Joint>,
    thrusting: bool,
}

impl Aircraft {
    /// Cut the painted masks into parts and wire everything together.
    ///
    /// Tiny paint specks are dropped. Every engine marker stamps an engine
    /// body and bolts it, rotation and all, onto the first part painted
    /// under it. Every joint marker chains a loose spring through each part
    /// overlapping it; markers over fewer than two parts create nothing.
    pub fn assemble(
        layout: AircraftLayout,
        config: SimulationConfig,
    ) -> Result<Self, AssemblyError> {
        let mut bodies = Arena::new();
        let mut parts = Vec::new();

        // wings and structures are the material parts other things grab onto
        let mut material_parts: Vec<BodyKey> = Vec::new();
        for (material, kind, painted) in [
            (Material::Wing, PartKind::Wing, &layout.wings),
            (Material::Structure, PartKind::Structure, &layout.structures),
        ] {
            for region in mask::segment_mask_regions(painted) {
                if region.mask.solid_count() <= MIN_PART_CELLS {
                    continue;
                }
                let mut body = Body::new(region.mask, material.density(), config);
                // back into painted canvas coordinates
                body.pos += m::Vec2::new(region.origin.0 as f64, region.origin.1 as f64);
                let key = bodies.insert(body);
                parts.push((kind, key));
                material_parts.push(key);
            }
        }
        if material_parts.is_empty() {
            return Err(AssemblyError::NoParts);
        }

        let mut joints = Vec::new();

        for &engine_pos in &layout.engine_positions {
            let engine = Body::new(layout.engine_shape.clone(), ENGINE_DENSITY, config)
                .with_position(engine_pos);
            let engine_key = bodies.insert(engine);
            parts.push((PartKind::Engine, engine_key));

            for &part_key in &material_parts {
                if bodies[part_key].contains_point(engine_pos) {
                    joints.push(Joint::attach(
                        JointParams::ANGULAR,
                        &bodies,
                        engine_key,
                        part_key,
                        engine_pos,
                    )?);
                    // one mount per engine: the first part painted under it
                    break;
                }
            }
        }

        for &joint_pos in &layout.joint_positions {
            let mut previous: Option<BodyKey> = None;
            for &part_key in &material_parts {
                if bodies[part_key].contains_point(joint_pos) {
                    if let Some(prev) = previous {
                        joints.push(Joint::attach(
                            JointParams::LOOSE,
                            &bodies,
                            prev,
                            part_key,
                            joint_pos,
                        )?);
                    }
                    previous = Some(part_key);
                }
            }
        }

        Ok(Aircraft {
            bodies,
            parts,
            joints,
            thrusting: false,
        })
    }

    /// Advance the whole assembly one tick: bodies first (gravity and
    /// ground contact), then engine thrust, then the spring joints.
    pub fn update(&mut self, dt: f64) {
        let dt = clamp_frame_step(dt);

        for (_, body) in self.bodies.iter_mut() {
            body.update(dt);
        }

        if self.thrusting {
            for &(kind, key) in &self.parts {
                if kind != PartKind::Engine {
                    continue;
                }
                if let Some(engine) = self.bodies.get_mut(key) {
                    let heading = m::rotate(m::Vec2::unit_x(), engine.rotation);
                    let pos = engine.pos;
                    engine.apply_impulse(heading * ENGINE_FORCE * dt, pos);
                }
            }
        }

        for joint in &mut self.joints {
            joint.update(&mut self.bodies, dt);
        }
    }

    pub fn set_thrusting(&mut self, thrusting: bool) {
        self.thrusting = thrusting;
    }

    pub fn is_thrusting(&self) -> bool {
        self.thrusting
    }

    pub fn bodies(&self) -> &Arena<Body> {
        &self.bodies
    }

    pub fn body(&self, key: BodyKey) -> Option<&Body> {
        self.bodies.get(key)
    }

    pub fn body_mut(&mut self, key: BodyKey) -> Option<&mut Body> {
        self.bodies.get_mut(key)
    }

    pub fn parts(&self) -> impl Iterator<Item = (PartKind, BodyKey)> + '_ {
        self.parts.iter().copied()
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// The camera and scoring follow the first wing.
    pub fn player_position(&self) -> m::Vec2 {
        let (_, key) = self
            .parts
            .iter()
            .find(|(kind, _)| *kind == PartKind::Wing)
            .unwrap_or(&self.parts[0]);
        self.bodies[*key].pos
    }

    /// Rigidly move the whole assembly so the player part lands at `pos`.
    pub fn set_player_position(&mut self, pos: m::Vec2) {
        let delta = pos - self.player_position();
        for (_, body) in self.bodies.iter_mut() {
            body.pos += delta;
        }
    }
}

//
// tests
//
