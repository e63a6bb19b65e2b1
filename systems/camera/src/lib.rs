#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Chase camera that trails the drone and looks ahead along its heading.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Tuning of the chase camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Distance behind the drone, measured along the heading.
    pub follow_distance: f32,
    /// Height above the drone.
    pub follow_height: f32,
    /// Exponential follow rate per second.
    pub follow_rate: f32,
    /// Distance ahead of the drone the camera looks at.
    pub look_ahead: f32,
    /// Eye position before the first update.
    pub initial_eye: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            follow_distance: 2.5,
            follow_height: 1.0,
            follow_rate: 10.0,
            look_ahead: 4.0,
            initial_eye: Vec3::new(0.0, 4.0, 8.0),
        }
    }
}

/// Where the camera is and what it looks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    /// Camera position.
    pub eye: Vec3,
    /// Point the camera is oriented toward.
    pub look_at: Vec3,
}

/// Smoothly trailing third-person camera.
#[derive(Clone, Debug)]
pub struct ChaseCamera {
    config: CameraConfig,
    pose: CameraPose,
}

impl ChaseCamera {
    /// Creates a camera at the configured initial eye, looking at the origin.
    #[must_use]
    pub fn new(config: CameraConfig) -> Self {
        let pose = CameraPose {
            eye: config.initial_eye,
            look_at: Vec3::ZERO,
        };
        Self { config, pose }
    }

    /// Current pose.
    #[must_use]
    pub const fn pose(&self) -> CameraPose {
        self.pose
    }

    /// Point the camera trails toward for a drone at `position` facing `heading`.
    #[must_use]
    pub fn target(&self, position: Vec3, heading: f32) -> Vec3 {
        position
            + Vec3::new(
                heading.sin() * self.config.follow_distance,
                self.config.follow_height,
                heading.cos() * self.config.follow_distance,
            )
    }

    /// Moves the eye toward its target and re-aims at the look-ahead point.
    pub fn update(&mut self, position: Vec3, heading: f32, dt: f32) {
        let target = self.target(position, heading);
        let blend = 1.0 - (-self.config.follow_rate * dt).exp();
        self.pose.eye += (target - self.pose.eye) * blend;
        self.pose.look_at = self.look_at(position, heading);
    }

    fn look_at(&self, position: Vec3, heading: f32) -> Vec3 {
        position + Vec3::new(-heading.sin(), 0.0, -heading.cos()) * self.config.look_ahead
    }
}

impl Default for ChaseCamera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_target_shrinks_until_converged() {
        let mut camera = ChaseCamera::default();
        let drone = Vec3::new(5.0, 1.5, -3.0);
        let heading = 0.7;
        let target = camera.target(drone, heading);

        let mut previous = camera.pose().eye.distance(target);
        let mut converged_after = None;
        for tick in 0..200 {
            camera.update(drone, heading, 0.016);
            let distance = camera.pose().eye.distance(target);
            if distance < 1e-3 {
                converged_after = Some(tick);
                break;
            }
            assert!(distance < previous, "tick {tick}: {distance} >= {previous}");
            previous = distance;
        }

        assert!(converged_after.is_some());
    }

    #[test]
    fn looks_ahead_along_the_heading() {
        let mut camera = ChaseCamera::default();
        camera.update(Vec3::new(0.0, 2.0, 0.0), 0.0, 0.016);
        assert_eq!(camera.pose().look_at, Vec3::new(0.0, 2.0, -4.0));
    }

    #[test]
    fn target_sits_behind_and_above_the_drone() {
        let camera = ChaseCamera::default();
        assert_eq!(
            camera.target(Vec3::new(1.0, 1.0, 1.0), 0.0),
            Vec3::new(1.0, 2.0, 3.5)
        );
    }
}
