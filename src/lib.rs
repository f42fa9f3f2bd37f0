//! Per-actuator feedback controllers for physics simulation loops.
//!
//! Two control laws are provided: a PID with deadband, anti-windup and derivative
//! smoothing ([`control::pid`]), and a cascaded position -> velocity PI with setpoint
//! smoothing and force limits ([`control::cascade`]). A [`registry::ControllerRegistry`]
//! owns the state of every actuator and evaluates them against an [`host::ActuatorHost`].

pub mod control;
pub mod error;
pub mod gains;
pub mod host;
pub mod math;
pub mod registry;
pub mod types;
