#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for Neuroflight.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, which are unavailable in the containerised CI environment.
//! To keep `cargo test` usable everywhere we depend on macroquad without its
//! default `audio` feature.
//!
//! The city and the drone are drawn with primitive boxes and lines under a
//! perspective camera; the status panel uses Macroquad's immediate-mode UI,
//! kept inside the local `ui` module.

mod ui;

use self::ui::{draw_hud_ui, HudUiContext, HudUiResult};
use anyhow::Result;
use glam::{Quat, Vec3};
use macroquad::{
    camera::{set_camera, set_default_camera, Camera3D},
    input::{is_key_down, is_key_pressed, KeyCode},
    math::{vec2, vec3, Vec3 as MacroquadVec3},
    models::{draw_cube, draw_cube_wires, draw_line_3d, draw_plane},
};
use neuroflight_core::{Aabb, KeyboardState};
use neuroflight_rendering::{
    CameraPresentation, Color, DronePresentation, FrameInput, GroundPresentation, Presentation,
    Projection, RenderingBackend, Scene, SurfaceSize,
};
use std::time::{Duration, Instant};

const HUD_SIZE: (f32, f32) = (260.0, 150.0);
const ROAD_LIFT: f32 = 0.01;

/// Latches clicks on the HUD button so they reach the simulation on the next frame.
#[doc(hidden)]
#[derive(Clone, Copy, Debug, Default)]
pub struct HudInputState {
    mode_toggle_latched: bool,
}

impl HudInputState {
    /// Returns whether the HUD requested an input-source switch and clears the
    /// latch so the switch happens once.
    pub fn take_mode_toggle(&mut self) -> bool {
        let latched = self.mode_toggle_latched;
        self.mode_toggle_latched = false;
        latched
    }

    /// Records that the HUD button was clicked this frame.
    pub fn register_mode_toggle(&mut self) {
        self.mode_toggle_latched = true;
    }
}

/// Edge-triggered shortcuts observed during a single frame.
#[derive(Clone, Copy, Debug, Default)]
struct KeyboardShortcuts {
    /// `Escape` closes the window.
    quit_requested: bool,
    /// `Tab` switches between keyboard and external input.
    toggle_input_mode: bool,
    /// `C` shows or hides collider boxes.
    toggle_colliders: bool,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        Self {
            quit_requested: is_key_pressed(KeyCode::Escape),
            toggle_input_mode: is_key_pressed(KeyCode::Tab),
            toggle_colliders: is_key_pressed(KeyCode::C),
        }
    }
}

fn poll_keyboard() -> KeyboardState {
    KeyboardState {
        w: is_key_down(KeyCode::W),
        a: is_key_down(KeyCode::A),
        s: is_key_down(KeyCode::S),
        d: is_key_down(KeyCode::D),
        space: is_key_down(KeyCode::Space),
        shift: is_key_down(KeyCode::LeftShift),
        f: is_key_down(KeyCode::F),
        g: is_key_down(KeyCode::G),
    }
}

/// Rendering backend implemented on top of macroquad.
#[derive(Debug, Default)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(mut self, enabled: bool) -> Self {
        self.swap_interval = Some(i32::from(enabled));
        self
    }

    /// Configures whether the backend logs frame timing once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
    render: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct FpsMetrics {
    per_second: f32,
    avg_render: Duration,
}

impl FpsCounter {
    /// Records a frame and reports averages once a second has elapsed.
    fn record_frame(&mut self, frame: Duration, render: Duration) -> Option<FpsMetrics> {
        self.elapsed += frame;
        self.frames = self.frames.saturating_add(1);
        self.render += render;

        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let metrics = FpsMetrics {
            per_second: self.frames as f32 / self.elapsed.as_secs_f32(),
            avg_render: self.render / self.frames,
        };
        *self = Self::default();
        Some(metrics)
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
        } = self;

        let Presentation {
            window_title,
            clear_color,
            surface,
            scene,
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: i32::try_from(surface.width()).unwrap_or(i32::MAX),
            window_height: i32::try_from(surface.height()).unwrap_or(i32::MAX),
            window_resizable: true,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        macroquad::Window::from_config(config, async move {
            let mut scene = scene;
            let mut projection = Projection::for_surface(surface);
            let background = to_macroquad_color(clear_color);
            let mut fps_counter = FpsCounter::default();
            let mut hud_input = HudInputState::default();

            loop {
                let shortcuts = KeyboardShortcuts::poll();

                let screen_width = macroquad::window::screen_width();
                let screen_height = macroquad::window::screen_height();
                if let Ok(surface) = SurfaceSize::new(screen_width as u32, screen_height as u32) {
                    if projection.resize(surface) {
                        tracing::debug!(
                            width = surface.width(),
                            height = surface.height(),
                            "surface resized"
                        );
                    }
                }

                let dt_seconds = macroquad::time::get_frame_time();
                let frame_dt = Duration::from_secs_f32(dt_seconds.max(0.0));
                let frame_input = FrameInput {
                    keyboard: poll_keyboard(),
                    mode_toggle: shortcuts.toggle_input_mode || hud_input.take_mode_toggle(),
                    collider_toggle: shortcuts.toggle_colliders,
                    quit: shortcuts.quit_requested,
                };

                update_scene(frame_dt, frame_input, &mut scene);
                if frame_input.quit {
                    break;
                }

                let render_start = Instant::now();
                macroquad::window::clear_background(background);

                set_camera(&camera_for(&scene.camera, &projection));
                draw_ground(&scene.ground);
                for placement in &scene.placements {
                    draw_box(&placement.bounds, placement.color);
                }
                if scene.show_colliders {
                    for collider in &scene.colliders {
                        draw_cube_wires(
                            mq(collider.center()),
                            mq(collider.size()),
                            macroquad::color::RED,
                        );
                    }
                }
                draw_drone(&scene.drone);

                set_default_camera();
                let HudUiResult {
                    mode_toggle_pressed,
                } = draw_hud_ui(
                    &mut macroquad::ui::root_ui(),
                    HudUiContext {
                        origin: vec2(12.0, 12.0),
                        size: vec2(HUD_SIZE.0, HUD_SIZE.1),
                        background: macroquad::color::Color::new(0.1, 0.1, 0.12, 0.85),
                        hud: scene.hud,
                    },
                );
                if mode_toggle_pressed {
                    hud_input.register_mode_toggle();
                }

                let render = render_start.elapsed();
                if let Some(metrics) = fps_counter.record_frame(frame_dt, render) {
                    if show_fps {
                        tracing::info!(
                            fps = metrics.per_second,
                            render_ms = metrics.avg_render.as_secs_f64() * 1_000.0,
                            "frame timing"
                        );
                    }
                }

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

fn camera_for(camera: &CameraPresentation, projection: &Projection) -> Camera3D {
    Camera3D {
        position: mq(camera.eye),
        target: mq(camera.look_at),
        up: vec3(0.0, 1.0, 0.0),
        fovy: projection.fov_y_degrees.to_radians(),
        aspect: Some(projection.aspect),
        ..Camera3D::default()
    }
}

fn draw_ground(ground: &GroundPresentation) {
    draw_plane(
        vec3(0.0, 0.0, 0.0),
        vec2(ground.size / 2.0, ground.size / 2.0),
        None,
        to_macroquad_color(ground.color),
    );

    let road_color = to_macroquad_color(ground.road_color);
    let half_road = ground.road_width / 2.0;
    let half_length = ground.size / 2.0;
    for centre in road_centres(ground) {
        draw_plane(
            vec3(centre, ROAD_LIFT, 0.0),
            vec2(half_road, half_length),
            None,
            road_color,
        );
        draw_plane(
            vec3(0.0, ROAD_LIFT, centre),
            vec2(half_length, half_road),
            None,
            road_color,
        );
    }
}

/// Centre lines of the road grid, covering both edges of the ground.
fn road_centres(ground: &GroundPresentation) -> Vec<f32> {
    if ground.road_spacing <= f32::EPSILON {
        return Vec::new();
    }
    let half = ground.size / 2.0;
    let mut centres = Vec::new();
    let mut centre = -half;
    while centre <= half + f32::EPSILON {
        centres.push(centre);
        centre += ground.road_spacing;
    }
    centres
}

fn draw_box(bounds: &Aabb, color: Color) {
    let fill = to_macroquad_color(color);
    draw_cube(mq(bounds.center()), mq(bounds.size()), None, fill);
    draw_cube_wires(
        mq(bounds.center()),
        mq(bounds.size()),
        to_macroquad_color(color.with_alpha(0.4)),
    );
}

/// World-space drone parts derived from its pose.
#[derive(Clone, Copy, Debug, PartialEq)]
struct DroneGeometry {
    hubs: [Vec3; 4],
    blades: [(Vec3, Vec3); 4],
}

fn drone_geometry(drone: &DronePresentation) -> DroneGeometry {
    let orientation = Quat::from_rotation_y(drone.heading)
        * Quat::from_rotation_x(drone.pitch)
        * Quat::from_rotation_z(drone.roll);
    let arm = drone.half_extents.x.max(drone.half_extents.z);
    let blade = arm * 0.6;
    let lift = Vec3::new(0.0, drone.half_extents.y, 0.0);

    let mut hubs = [Vec3::ZERO; 4];
    let mut blades = [(Vec3::ZERO, Vec3::ZERO); 4];
    for (index, (x, z)) in [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)]
        .into_iter()
        .enumerate()
    {
        let local_hub = Vec3::new(x * arm, 0.0, z * arm) + lift;
        let spin = if index % 2 == 0 {
            drone.rotor_angle
        } else {
            -drone.rotor_angle
        };
        let reach = Vec3::new(spin.cos(), 0.0, spin.sin()) * blade;
        let hub = drone.position + orientation * local_hub;
        hubs[index] = hub;
        blades[index] = (
            drone.position + orientation * (local_hub - reach),
            drone.position + orientation * (local_hub + reach),
        );
    }
    DroneGeometry { hubs, blades }
}

fn draw_drone(drone: &DronePresentation) {
    let body = macroquad::color::Color::new(0.15, 0.15, 0.18, 1.0);
    let rotor = macroquad::color::Color::new(0.85, 0.85, 0.9, 1.0);
    let geometry = drone_geometry(drone);

    draw_cube(
        mq(drone.position),
        mq(drone.half_extents * Vec3::new(0.8, 1.0, 0.8)),
        None,
        body,
    );
    for (hub, (start, end)) in geometry.hubs.iter().zip(geometry.blades) {
        draw_line_3d(mq(drone.position), mq(*hub), body);
        draw_line_3d(mq(start), mq(end), rotor);
    }
    let nose = drone.position + Quat::from_rotation_y(drone.heading) * Vec3::new(0.0, 0.0, -1.0)
        * drone.half_extents.z.max(0.1)
        * 1.5;
    draw_line_3d(mq(drone.position), mq(nose), macroquad::color::ORANGE);
}

fn mq(value: Vec3) -> MacroquadVec3 {
    vec3(value.x, value.y, value.z)
}

fn to_macroquad_color(color: Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground() -> GroundPresentation {
        GroundPresentation {
            size: 80.0,
            road_spacing: 8.0,
            road_width: 2.0,
            color: Color::from_rgb_u8(60, 70, 60),
            road_color: Color::from_rgb_u8(40, 40, 40),
        }
    }

    fn drone(heading: f32, rotor_angle: f32) -> DronePresentation {
        DronePresentation {
            position: Vec3::new(1.0, 2.0, 3.0),
            heading,
            pitch: 0.0,
            roll: 0.0,
            rotor_angle,
            half_extents: Vec3::new(0.3, 0.05, 0.3),
        }
    }

    #[test]
    fn roads_span_the_whole_ground() {
        let centres = road_centres(&ground());
        assert_eq!(centres.len(), 11);
        assert_eq!(centres.first().copied(), Some(-40.0));
        assert!((centres.last().copied().unwrap_or_default() - 40.0).abs() < 1e-4);
    }

    #[test]
    fn degenerate_road_spacing_draws_no_roads() {
        let mut ground = ground();
        ground.road_spacing = 0.0;
        assert!(road_centres(&ground).is_empty());
    }

    #[test]
    fn rotor_hubs_surround_the_body() {
        let geometry = drone_geometry(&drone(0.0, 0.0));
        let centre = geometry.hubs.iter().copied().sum::<Vec3>() / 4.0;
        assert!((centre - Vec3::new(1.0, 2.05, 3.0)).length() < 1e-5);
        for hub in geometry.hubs {
            assert!(((hub - centre).length() - 0.3 * 2f32.sqrt()).abs() < 1e-5);
        }
    }

    #[test]
    fn neighbouring_rotors_spin_in_opposite_directions() {
        let geometry = drone_geometry(&drone(0.0, 0.5));
        let direction = |index: usize| {
            let (start, end) = geometry.blades[index];
            (end - start).normalize()
        };
        assert!((direction(0).z - 0.5f32.sin()).abs() < 1e-5);
        assert!((direction(1).z + 0.5f32.sin()).abs() < 1e-5);
    }

    #[test]
    fn heading_rotates_the_frame() {
        let straight = drone_geometry(&drone(0.0, 0.0));
        let turned = drone_geometry(&drone(std::f32::consts::FRAC_PI_2, 0.0));
        assert_ne!(straight.hubs[0], turned.hubs[0]);
        assert!((straight.hubs[0].y - turned.hubs[0].y).abs() < 1e-5);
    }

    #[test]
    fn fps_counter_reports_once_per_second() {
        let mut counter = FpsCounter::default();
        let frame = Duration::from_millis(250);
        let render = Duration::from_millis(2);
        assert!(counter.record_frame(frame, render).is_none());
        assert!(counter.record_frame(frame, render).is_none());
        assert!(counter.record_frame(frame, render).is_none());

        let metrics = counter
            .record_frame(frame, render)
            .expect("reports after one second");
        assert!((metrics.per_second - 4.0).abs() <= 1e-3);
        assert_eq!(metrics.avg_render, render);
        assert!(counter.record_frame(frame, render).is_none());
    }
}
