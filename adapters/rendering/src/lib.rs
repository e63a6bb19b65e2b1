#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Neuroflight adapters.

use anyhow::Result as AnyResult;
use glam::{Mat4, Vec3};
use neuroflight_core::{Aabb, FlightPhase, InputMode, KeyboardState, PlacementCategory};
use std::{error::Error, fmt, time::Duration};

/// Vertical field of view of the scene camera, in degrees.
pub const FIELD_OF_VIEW_DEGREES: f32 = 50.0;
/// Distance of the near clipping plane.
pub const NEAR_PLANE: f32 = 0.1;
/// Distance of the far clipping plane.
pub const FAR_PLANE: f32 = 500.0;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns the same color with the provided alpha.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }

    /// Default tint of a placement category.
    #[must_use]
    pub const fn for_category(category: PlacementCategory) -> Self {
        match category {
            PlacementCategory::Building => Self::from_rgb_u8(0x9a, 0xa5, 0xb1),
            PlacementCategory::Car => Self::from_rgb_u8(0xe0, 0xb0, 0x2a),
            PlacementCategory::Bench => Self::from_rgb_u8(0x8b, 0x5a, 0x2b),
            PlacementCategory::Prop => Self::from_rgb_u8(0x5f, 0x8f, 0x4e),
        }
    }
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct FrameInput {
    /// Movement and motor keys currently held.
    pub keyboard: KeyboardState,
    /// Whether the adapter detected an input-source toggle press on this frame.
    pub mode_toggle: bool,
    /// Whether the adapter detected a collider overlay toggle press on this frame.
    pub collider_toggle: bool,
    /// Whether the user asked to close the window.
    pub quit: bool,
}

/// Drawable area in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceSize {
    width: u32,
    height: u32,
}

impl SurfaceSize {
    /// Creates a surface size, rejecting empty surfaces.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderingError> {
        if width == 0 || height == 0 {
            return Err(RenderingError::EmptySurface { width, height });
        }
        Ok(Self { width, height })
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width divided by height.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Perspective projection kept in sync with the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    /// Width divided by height.
    pub aspect: f32,
    /// Near clipping distance.
    pub near: f32,
    /// Far clipping distance.
    pub far: f32,
}

impl Projection {
    /// Projection for a surface of the provided size.
    #[must_use]
    pub fn for_surface(surface: SurfaceSize) -> Self {
        Self {
            fov_y_degrees: FIELD_OF_VIEW_DEGREES,
            aspect: surface.aspect(),
            near: NEAR_PLANE,
            far: FAR_PLANE,
        }
    }

    /// Recomputes the aspect ratio. Returns whether it changed.
    pub fn resize(&mut self, surface: SurfaceSize) -> bool {
        let aspect = surface.aspect();
        if aspect == self.aspect {
            return false;
        }
        self.aspect = aspect;
        true
    }

    /// Right-handed projection matrix with a `[-1, 1]` depth range.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }
}

/// Drone pose and cosmetic state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DronePresentation {
    /// Centre of the drone body.
    pub position: Vec3,
    /// Rotation about the vertical axis.
    pub heading: f32,
    /// Tilt about the X axis.
    pub pitch: f32,
    /// Tilt about the Z axis.
    pub roll: f32,
    /// Accumulated rotor angle; rotors alternate direction.
    pub rotor_angle: f32,
    /// Half extents of the body box.
    pub half_extents: Vec3,
}

/// Where the scene is viewed from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPresentation {
    /// Camera position.
    pub eye: Vec3,
    /// Point the camera looks at.
    pub look_at: Vec3,
}

/// One placed city object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementPresentation {
    /// Placement rule that produced the object.
    pub category: PlacementCategory,
    /// World-space bounds of the object.
    pub bounds: Aabb,
    /// Fill color.
    pub color: Color,
}

/// Ground plane and road grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundPresentation {
    /// Edge length of the square ground plane.
    pub size: f32,
    /// Distance between road centre lines.
    pub road_spacing: f32,
    /// Width of each road.
    pub road_width: f32,
    /// Ground color.
    pub color: Color,
    /// Road color.
    pub road_color: Color,
}

/// Status line contents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HudPresentation {
    /// Active input source.
    pub input_mode: InputMode,
    /// Current flight phase.
    pub phase: FlightPhase,
    /// Whether the city colliders are active.
    pub colliders_ready: bool,
}

/// Scene description combining the city, the drone and the camera.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Ground plane and roads.
    pub ground: GroundPresentation,
    /// City objects.
    pub placements: Vec<PlacementPresentation>,
    /// Collider boxes, drawn only when `show_colliders` is set.
    pub colliders: Vec<Aabb>,
    /// Whether collider boxes are overlaid.
    pub show_colliders: bool,
    /// The drone.
    pub drone: DronePresentation,
    /// The chase camera.
    pub camera: CameraPresentation,
    /// Status line.
    pub hud: HudPresentation,
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Initial window size.
    pub surface: SurfaceSize,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, surface: SurfaceSize, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            surface,
            scene,
        }
    }
}

/// Rendering backend capable of presenting Neuroflight scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the frame delta and the
    /// per-frame input captured by the adapter, and mutates the scene before
    /// it is rendered.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// Surfaces must have a positive area.
    EmptySurface {
        /// Provided width.
        width: u32,
        /// Provided height.
        height: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySurface { width, height } => {
                write!(f, "surface must have a positive area (received {width}x{height})")
            }
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_surfaces_are_rejected() {
        let error = SurfaceSize::new(0, 720).expect_err("zero width");
        assert_eq!(
            error,
            RenderingError::EmptySurface {
                width: 0,
                height: 720
            }
        );
    }

    #[test]
    fn projection_tracks_surface_aspect() {
        let mut projection = Projection::for_surface(SurfaceSize::new(1280, 720).expect("valid"));
        assert!((projection.aspect - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(projection.fov_y_degrees, 50.0);

        assert!(projection.resize(SurfaceSize::new(800, 800).expect("valid")));
        assert_eq!(projection.aspect, 1.0);
        assert!(!projection.resize(SurfaceSize::new(400, 400).expect("valid")));
    }

    #[test]
    fn categories_have_distinct_colors() {
        let colors = [
            Color::for_category(PlacementCategory::Building),
            Color::for_category(PlacementCategory::Car),
            Color::for_category(PlacementCategory::Bench),
            Color::for_category(PlacementCategory::Prop),
        ];
        for (index, color) in colors.iter().enumerate() {
            assert!(colors[index + 1..].iter().all(|other| other != color));
        }
    }
}
