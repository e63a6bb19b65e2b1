use serde::{Deserialize, Serialize};

/// Tuning of the flight controller.
///
/// Speeds are per second and are converted into per-tick displacements by the
/// tick duration. Velocity itself is stored as a per-tick displacement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Forward and backward acceleration.
    pub move_speed: f32,
    /// Forward acceleration while a lateral or turn directive is also active.
    pub move_speed_turning: f32,
    /// Sideways acceleration.
    pub strafe_speed: f32,
    /// Heading change in radians per second.
    pub turn_speed: f32,
    /// Vertical acceleration.
    pub lift_speed: f32,
    /// Velocity multiplier applied every tick.
    pub drag: f32,
    /// Height gained by the takeoff climb.
    pub start_lift: f32,
    /// Climb rate during takeoff.
    pub lift_anim_speed: f32,
    /// Base fall rate while the motors are off.
    pub sink_speed: f32,
    /// Growth of the fall rate per second of falling.
    pub sink_ramp: f32,
    /// Rebound height as a multiple of the impact fall step.
    pub bounce_factor: f32,
    /// Lower bound of the rebound height.
    pub bounce_min: f32,
    /// Upper bound of the rebound height.
    pub bounce_max: f32,
    /// Horizontal half extent of the flyable area.
    pub bounds_xz: f32,
    /// Highest reachable altitude.
    pub ceiling: f32,
    /// Tolerance above ground contact still counted as grounded.
    pub ground_epsilon: f32,
    /// Tolerance below the takeoff target at which the climb snaps to it.
    pub lift_epsilon: f32,
    /// Ground-contact height used before the drone model reports its own.
    pub default_ground_height: f32,
    /// Smallest accepted ground-contact height.
    pub min_ground_height: f32,
    /// Probability that a bounce leaves the drone resting at a tilt.
    pub landing_tilt_chance: f32,
    /// Full range of the random landing tilt, centred on zero.
    pub landing_tilt_amplitude: f32,
    /// Amplitude of the idle hover wobble.
    pub hover_tilt_amplitude: f32,
    /// Frequency of the hover wobble about the X axis.
    pub hover_tilt_freq_x: f32,
    /// Frequency of the hover wobble about the Z axis.
    pub hover_tilt_freq_z: f32,
    /// L1 velocity magnitude below which the drone counts as hovering.
    pub idle_velocity: f32,
    /// Tilt per unit of heading-relative velocity.
    pub movement_tilt: f32,
    /// Easing factor toward the movement tilt.
    pub tilt_smoothing: f32,
    /// Easing factor toward the hover wobble.
    pub hover_smoothing: f32,
    /// Easing factor toward the resting tilt.
    pub landing_smoothing: f32,
    /// Rotor spin in radians per second at full speed.
    pub propeller_spin_speed: f32,
    /// Rotor speed gained per second while airborne with motors on.
    pub propeller_ramp_up: f32,
    /// Rotor speed lost per second otherwise.
    pub propeller_ramp_down: f32,
    /// Seed of the generator behind landing tilts.
    pub rng_seed: u64,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            move_speed: 1.3,
            move_speed_turning: 0.65,
            strafe_speed: 0.9,
            turn_speed: 1.8,
            lift_speed: 1.5,
            drag: 0.88,
            start_lift: 1.0,
            lift_anim_speed: 1.4,
            sink_speed: 2.5,
            sink_ramp: 0.9,
            bounce_factor: 1.4,
            bounce_min: 0.04,
            bounce_max: 0.22,
            bounds_xz: 38.0,
            ceiling: 28.0,
            ground_epsilon: 0.02,
            lift_epsilon: 0.005,
            default_ground_height: 0.5,
            min_ground_height: 0.05,
            landing_tilt_chance: 0.45,
            landing_tilt_amplitude: 0.25,
            hover_tilt_amplitude: 0.03,
            hover_tilt_freq_x: 1.7,
            hover_tilt_freq_z: 1.4,
            idle_velocity: 0.2,
            movement_tilt: 0.35,
            tilt_smoothing: 0.12,
            hover_smoothing: 0.08,
            landing_smoothing: 0.15,
            propeller_spin_speed: 32.0,
            propeller_ramp_up: 3.2,
            propeller_ramp_down: 2.2,
            rng_seed: 0x6e65_7572_6f66_6c79,
        }
    }
}
