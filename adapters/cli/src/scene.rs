//! Copies simulation state into the renderer's scene description.

use neuroflight_core::COLLIDER_MARGIN;
use neuroflight_rendering::{
    CameraPresentation, Color, DronePresentation, GroundPresentation, HudPresentation,
    PlacementPresentation, Scene,
};
use neuroflight_system_collision::DRONE_HALF_EXTENTS;
use neuroflight_system_worldgen::{GeneratedCity, WorldLayout};
use neuroflight_world::{query, Simulation};

/// Sky color behind the city.
pub(crate) const SKY: Color = Color::from_rgb_u8(0x87, 0xb8, 0xe0);

/// Scene with the ground laid out but no city yet.
pub(crate) fn initial_scene(simulation: &Simulation, layout: &WorldLayout) -> Scene {
    Scene {
        ground: GroundPresentation {
            size: layout.world_size,
            road_spacing: layout.grid_spacing,
            road_width: layout.road_width,
            color: Color::from_rgb_u8(0x4c, 0x6b, 0x3c),
            road_color: Color::from_rgb_u8(0x33, 0x33, 0x38),
        },
        placements: Vec::new(),
        colliders: Vec::new(),
        show_colliders: false,
        drone: drone_presentation(simulation),
        camera: camera_presentation(simulation),
        hud: hud_presentation(simulation),
    }
}

/// Replaces the city content with a freshly generated layout.
///
/// Placements are drawn at their true size; the collider overlay keeps the margin.
pub(crate) fn set_city(scene: &mut Scene, city: &GeneratedCity) {
    scene.placements = city
        .placements
        .iter()
        .zip(&city.colliders)
        .map(|(placement, collider)| PlacementPresentation {
            category: placement.category,
            bounds: collider.bounds().expanded(-COLLIDER_MARGIN),
            color: Color::for_category(placement.category),
        })
        .collect();
    scene.colliders = city.colliders.iter().map(|collider| *collider.bounds()).collect();
}

/// Refreshes everything that moves between frames.
pub(crate) fn sync_scene(scene: &mut Scene, simulation: &Simulation) {
    scene.drone = drone_presentation(simulation);
    scene.camera = camera_presentation(simulation);
    scene.hud = hud_presentation(simulation);
}

fn drone_presentation(simulation: &Simulation) -> DronePresentation {
    let drone = query::drone(simulation);
    DronePresentation {
        position: drone.position,
        heading: drone.heading,
        pitch: drone.pitch,
        roll: drone.roll,
        rotor_angle: drone.rotor_angle,
        half_extents: DRONE_HALF_EXTENTS,
    }
}

fn camera_presentation(simulation: &Simulation) -> CameraPresentation {
    let pose = query::camera_pose(simulation);
    CameraPresentation {
        eye: pose.eye,
        look_at: pose.look_at,
    }
}

fn hud_presentation(simulation: &Simulation) -> HudPresentation {
    HudPresentation {
        input_mode: query::input_mode(simulation),
        phase: query::flight_phase(simulation),
        colliders_ready: query::colliders_ready(simulation),
    }
}
