#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Neuroflight simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative simulation session, and the pure systems. Adapters submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing what changed. Geometry is expressed with `glam` vectors in world
//! units where `+Y` points up and the ground plane sits at `y = 0`.

use std::{sync::Arc, time::Duration};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Safety margin added to every side of a collider when it is created.
pub const COLLIDER_MARGIN: f32 = 0.03;

/// Axis-aligned bounding box expressed in world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Corner with the smallest coordinate on every axis.
    pub min: Vec3,
    /// Corner with the largest coordinate on every axis.
    pub max: Vec3,
}

impl Aabb {
    /// Creates a box from two corners, reordering components so `min <= max`.
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a box centred on `center` that extends `half_extents` along each axis.
    #[must_use]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Reports whether the two boxes intersect on all three axes.
    ///
    /// Touching faces count as an overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Returns the box grown by `margin` on every side.
    #[must_use]
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Geometric centre of the box.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths of the box along each axis.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Smallest box enclosing both inputs.
    #[must_use]
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Eight corners of the box.
    #[must_use]
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// World-space box enclosing this box after a uniform scale, a rotation
    /// about the vertical axis and a translation, applied in that order.
    #[must_use]
    pub fn transformed(&self, scale: f32, rotation_y: f32, translation: Vec3) -> Self {
        let rotation = Quat::from_rotation_y(rotation_y);
        let mut corners = self
            .corners()
            .into_iter()
            .map(|corner| rotation * (corner * scale) + translation);
        let first = corners.next().unwrap_or(translation);
        let (min, max) = corners.fold((first, first), |(min, max), point| {
            (min.min(point), max.max(point))
        });
        Self { min, max }
    }
}

/// Obstacle box used for overlap testing only, never for rendering.
///
/// The safety margin is applied once at creation time. The box cannot be
/// mutated afterwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collider {
    bounds: Aabb,
}

impl Collider {
    /// Creates a collider around `bounds`, grown by `margin` on every side.
    #[must_use]
    pub fn with_margin(bounds: Aabb, margin: f32) -> Self {
        Self {
            bounds: bounds.expanded(margin),
        }
    }

    /// Creates a collider around `bounds` using [`COLLIDER_MARGIN`].
    #[must_use]
    pub fn new(bounds: Aabb) -> Self {
        Self::with_margin(bounds, COLLIDER_MARGIN)
    }

    /// Box tested for overlaps, margin included.
    #[must_use]
    pub const fn bounds(&self) -> &Aabb {
        &self.bounds
    }
}

/// Identifier of an object template within the loaded catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(u32);

impl TemplateId {
    /// Creates a new template identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Placement rules a template follows when the city is generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementCategory {
    /// Fills the lots between roads, one building per lot.
    Building,
    /// Parked along the road centre lines.
    Car,
    /// Sits beside the road intersections.
    Bench,
    /// Scattered inside lots with jitter and rotation.
    Prop,
}

/// Immutable record describing one placed instance of a template.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    /// Template instantiated at this location.
    pub template: TemplateId,
    /// Placement rule that produced the record.
    pub category: PlacementCategory,
    /// World-space position of the normalised template origin.
    pub position: Vec3,
    /// Rotation about the vertical axis in radians.
    pub rotation: f32,
    /// Uniform scale applied to the raw template geometry.
    pub scale: f32,
}

/// The nine directives consumed by the flight controller every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputCommand {
    /// Requests takeoff from the ground.
    pub start: bool,
    /// Climb.
    pub up: bool,
    /// Descend.
    pub down: bool,
    /// Strafe left.
    pub left: bool,
    /// Strafe right.
    pub right: bool,
    /// Accelerate along the heading.
    pub forward: bool,
    /// Accelerate against the heading.
    pub back: bool,
    /// Rotate the heading counter-clockwise.
    pub turn_left: bool,
    /// Rotate the heading clockwise.
    pub turn_right: bool,
}

impl InputCommand {
    /// Command with every directive cleared.
    pub const IDLE: Self = Self {
        start: false,
        up: false,
        down: false,
        left: false,
        right: false,
        forward: false,
        back: false,
        turn_left: false,
        turn_right: false,
    };

    /// Packs the directives into the low nine bits, `start` first.
    #[must_use]
    pub const fn to_bits(&self) -> u16 {
        (self.start as u16)
            | (self.up as u16) << 1
            | (self.down as u16) << 2
            | (self.left as u16) << 3
            | (self.right as u16) << 4
            | (self.forward as u16) << 5
            | (self.back as u16) << 6
            | (self.turn_left as u16) << 7
            | (self.turn_right as u16) << 8
    }

    /// Unpacks directives previously packed with [`InputCommand::to_bits`].
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self {
            start: bits & 1 != 0,
            up: bits & (1 << 1) != 0,
            down: bits & (1 << 2) != 0,
            left: bits & (1 << 3) != 0,
            right: bits & (1 << 4) != 0,
            forward: bits & (1 << 5) != 0,
            back: bits & (1 << 6) != 0,
            turn_left: bits & (1 << 7) != 0,
            turn_right: bits & (1 << 8) != 0,
        }
    }
}

/// Raw key-down state of the keys the simulation reacts to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeyboardState {
    /// `W`: forward.
    pub w: bool,
    /// `A`: strafe left, or turn left while `W` is held.
    pub a: bool,
    /// `S`: backward.
    pub s: bool,
    /// `D`: strafe right, or turn right while `W` is held.
    pub d: bool,
    /// `Space`: climb, and take off while grounded.
    pub space: bool,
    /// Left `Shift`: descend.
    pub shift: bool,
    /// `F`: start the motors.
    pub f: bool,
    /// `G`: cut the motors.
    pub g: bool,
}

/// Which input source currently drives the drone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Discrete keyboard state.
    #[default]
    Keyboard,
    /// Command vector written by an external classifier.
    External,
}

/// Mutually exclusive flight state of the drone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlightPhase {
    /// Motors off, resting at ground-contact height.
    Grounded,
    /// Motors on, climbing toward the takeoff target.
    Lifting,
    /// Motors on and airborne under directive control.
    Flying,
    /// Motors off and above ground contact.
    Falling,
}

/// World axis used when resolving movement one component at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal east-west axis.
    X,
    /// Vertical axis.
    Y,
    /// Horizontal north-south axis.
    Z,
}

impl Axis {
    /// Axes in resolution order.
    pub const ORDER: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Unit vector pointing along the axis.
    #[must_use]
    pub const fn unit(self) -> Vec3 {
        match self {
            Self::X => Vec3::X,
            Self::Y => Vec3::Y,
            Self::Z => Vec3::Z,
        }
    }
}

/// Commands that express all permissible simulation mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided frame time.
    Tick {
        /// Wall-clock time that elapsed since the previous frame.
        dt: Duration,
    },
    /// Replaces the tracked keyboard state.
    SetKeyboard {
        /// Keys currently held down.
        state: KeyboardState,
    },
    /// Selects which input source drives the drone.
    SetInputMode {
        /// Source that becomes active.
        mode: InputMode,
    },
    /// Powers the motors regardless of altitude and begins a takeoff climb.
    StartMotors,
    /// Cuts motor power; an airborne drone starts falling.
    CutMotors,
    /// Replaces the collider list with a fully built one.
    InstallColliders {
        /// Complete collider list produced by world generation.
        colliders: Arc<[Collider]>,
    },
    /// Reports the ground-contact height of the freshly loaded drone model.
    SetGroundContact {
        /// Height at which the model's lowest point touches the ground.
        height: f32,
    },
}

/// Events broadcast by the simulation after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced by fixed ticks.
    TimeAdvanced {
        /// Simulated time covered by the ticks.
        dt: Duration,
        /// Number of fixed ticks that ran.
        ticks: u32,
    },
    /// Announces that the flight state machine changed state.
    FlightPhaseChanged {
        /// State before the transition.
        from: FlightPhase,
        /// State after the transition.
        to: FlightPhase,
    },
    /// Reports that movement along an axis was rejected by a collider.
    AxisBlocked {
        /// Axis whose displacement was discarded.
        axis: Axis,
    },
    /// Reports that a falling drone rebounded off the ground.
    Bounced {
        /// Height above ground contact reached by the rebound.
        height: f32,
    },
    /// Reports that a falling drone came to rest on the ground.
    Settled,
    /// Confirms that a new collider list is active.
    CollidersInstalled {
        /// Number of colliders in the list.
        count: usize,
    },
    /// Confirms that the active input source changed.
    InputModeChanged {
        /// Source that became active.
        mode: InputMode,
    },
    /// Confirms that the ground-contact height changed.
    GroundContactChanged {
        /// New ground-contact height.
        height: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::{Aabb, Collider, InputCommand, InputMode, PlacementCategory, COLLIDER_MARGIN};
    use glam::Vec3;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn overlap_requires_all_three_axes() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let touching = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let above = Aabb::new(Vec3::new(0.5, 1.5, 0.5), Vec3::new(2.0, 3.0, 2.0));

        assert!(a.overlaps(&touching));
        assert!(!a.overlaps(&above));
    }

    #[test]
    fn collider_applies_margin_once() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let collider = Collider::new(bounds);
        assert_eq!(collider.bounds().min, Vec3::splat(-COLLIDER_MARGIN));
        assert_eq!(collider.bounds().max, Vec3::splat(1.0 + COLLIDER_MARGIN));
    }

    #[test]
    fn quarter_turn_swaps_horizontal_extents() {
        let bounds = Aabb::new(Vec3::new(-2.0, 0.0, -0.5), Vec3::new(2.0, 1.0, 0.5));
        let turned = bounds.transformed(1.0, FRAC_PI_2, Vec3::new(10.0, 0.0, 0.0));
        let size = turned.size();

        assert!((size.x - 1.0).abs() < 1e-5);
        assert!((size.z - 4.0).abs() < 1e-5);
        assert!((turned.center().x - 10.0).abs() < 1e-5);
    }

    #[test]
    fn command_bits_preserve_every_directive() {
        let command = InputCommand {
            start: true,
            forward: true,
            turn_right: true,
            ..InputCommand::IDLE
        };
        assert_eq!(InputCommand::from_bits(command.to_bits()), command);
        assert_eq!(InputCommand::from_bits(0), InputCommand::IDLE);
    }

    #[test]
    fn command_round_trips_through_bincode() {
        let bytes = bincode::serialize(&InputCommand {
            up: true,
            ..InputCommand::IDLE
        })
        .expect("serialize");
        let restored: InputCommand = bincode::deserialize(&bytes).expect("deserialize");
        assert!(restored.up);
        assert!(!restored.start);
    }

    #[test]
    fn input_mode_and_category_round_trip_through_bincode() {
        let bytes = bincode::serialize(&(InputMode::External, PlacementCategory::Bench))
            .expect("serialize");
        let restored: (InputMode, PlacementCategory) =
            bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, (InputMode::External, PlacementCategory::Bench));
    }
}
