#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Collider registry answering "would the drone hit something here?".
//!
//! The registry starts empty and permits every move until the generated city
//! installs its collider list. Lists are swapped in wholesale so readers never
//! observe a partially built set.

use std::sync::Arc;

use glam::Vec3;
use neuroflight_core::{Aabb, Axis, Collider};

/// Half extents of the box that approximates the drone body.
pub const DRONE_HALF_EXTENTS: Vec3 = Vec3::new(0.28, 0.18, 0.28);

/// Reports whether `candidate` intersects the collider, touching faces included.
#[must_use]
pub fn overlaps(candidate: &Aabb, collider: &Collider) -> bool {
    candidate.overlaps(collider.bounds())
}

/// Box occupied by the drone when centred on `center`.
#[must_use]
pub fn drone_box(center: Vec3) -> Aabb {
    Aabb::from_center_half_extents(center, DRONE_HALF_EXTENTS)
}

/// Outcome of resolving a displacement one axis at a time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisResolution {
    /// Position after every permitted axis step was applied.
    pub position: Vec3,
    blocked: [bool; 3],
}

impl AxisResolution {
    /// Reports whether displacement along `axis` was discarded.
    #[must_use]
    pub const fn is_blocked(&self, axis: Axis) -> bool {
        self.blocked[axis_index(axis)]
    }

    /// Axes whose displacement was discarded, in resolution order.
    pub fn blocked_axes(&self) -> impl Iterator<Item = Axis> + '_ {
        Axis::ORDER
            .into_iter()
            .filter(move |axis| self.is_blocked(*axis))
    }
}

const fn axis_index(axis: Axis) -> usize {
    match axis {
        Axis::X => 0,
        Axis::Y => 1,
        Axis::Z => 2,
    }
}

/// Shared, append-only list of obstacle boxes.
#[derive(Clone, Debug)]
pub struct CollisionRegistry {
    colliders: Arc<[Collider]>,
    ready: bool,
}

impl Default for CollisionRegistry {
    fn default() -> Self {
        Self {
            colliders: Arc::from(Vec::new()),
            ready: false,
        }
    }
}

impl CollisionRegistry {
    /// Creates an empty registry that permits every move.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the active list with a fully built one.
    pub fn install(&mut self, colliders: Arc<[Collider]>) {
        tracing::debug!(count = colliders.len(), "installing collider list");
        self.colliders = colliders;
        self.ready = true;
    }

    /// Appends colliders by publishing a new list that contains the old one.
    pub fn extend<I>(&mut self, colliders: I)
    where
        I: IntoIterator<Item = Collider>,
    {
        let merged: Vec<Collider> = self
            .colliders
            .iter()
            .copied()
            .chain(colliders)
            .collect();
        self.colliders = Arc::from(merged);
    }

    /// Reports whether a generated collider list has been installed.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Number of colliders in the active list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    /// Reports whether the active list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Active collider list.
    #[must_use]
    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    /// Reports whether the drone box centred on `center` hits any collider.
    #[must_use]
    pub fn would_collide(&self, center: Vec3) -> bool {
        let candidate = drone_box(center);
        self.colliders
            .iter()
            .any(|collider| overlaps(&candidate, collider))
    }

    /// Applies `displacement` to `position` along X, then Y, then Z.
    ///
    /// Each axis step is kept only when the shifted drone box is collision
    /// free; otherwise that component is dropped and reported as blocked.
    #[must_use]
    pub fn resolve_axis_separated(&self, position: Vec3, displacement: Vec3) -> AxisResolution {
        let mut resolved = position;
        let mut blocked = [false; 3];
        for axis in Axis::ORDER {
            let step = displacement * axis.unit();
            if step == Vec3::ZERO {
                continue;
            }
            let candidate = resolved + step;
            if self.would_collide(candidate) {
                blocked[axis_index(axis)] = true;
            } else {
                resolved = candidate;
            }
        }
        AxisResolution {
            position: resolved,
            blocked,
        }
    }
}
