//! Keyboard teleoperation over zenoh.
//!
//! Arrow keys read from a raw-mode console become planar velocity commands
//! (`linear.x`, `angular.z`), published only for key presses that request
//! motion.

pub mod config;
pub mod keys;
pub mod messages;
pub mod publisher;
pub mod teleop;
pub mod terminal;
