// Message types: operator intent in, velocity command out

use serde::{Deserialize, Serialize};

/// Unscaled directional intent derived from one key press.
/// Each axis is one of -1.0, 0.0, +1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityIntent {
    pub linear: f64,
    pub angular: f64,
}

impl VelocityIntent {
    /// No motion requested
    pub const STOP: Self = Self::new(0.0, 0.0);
    pub const FORWARD: Self = Self::new(1.0, 0.0);
    pub const BACKWARD: Self = Self::new(-1.0, 0.0);
    /// Counter-clockwise
    pub const TURN_LEFT: Self = Self::new(0.0, 1.0);
    pub const TURN_RIGHT: Self = Self::new(0.0, -1.0);

    pub const fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }

    pub fn is_stop(&self) -> bool {
        *self == Self::STOP
    }
}

// 3-axis vector, zero by default
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Velocity command published to the robot.
/// Only `linear.x` (forward) and `angular.z` (yaw) are ever populated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

impl Twist {
    pub fn planar(linear_x: f64, angular_z: f64) -> Self {
        Self {
            linear: Vector3 {
                x: linear_x,
                ..Vector3::default()
            },
            angular: Vector3 {
                z: angular_z,
                ..Vector3::default()
            },
        }
    }
}
