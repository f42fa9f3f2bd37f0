//! Named views over the host's fixed size per-actuator gain parameters.
//!
//! Plain PID layout: `0:Kp 1:Ti 2:integral_clamp 3:Td 4:derivative_smoothing 5:error_deadband`
//!
//! Cascaded PI layout: `0:Kp_pos 1:Ti_pos 2:iclamp_pos 3:Kp_vel 4:Ti_vel 5:iclamp_vel
//! 6:ema_smoothing 7:max_velocity`

use serde::{Deserialize, Serialize};

use crate::types::ControllerMode;

/// Number of gain parameters read for a plain PID actuator
pub const PID_PARAM_COUNT: usize = 6;
/// Number of gain parameters read for a cascaded PI actuator
pub const CASCADE_PARAM_COUNT: usize = 8;

/// How many leading gain parameters an actuator in `mode` needs
pub fn param_count(mode: ControllerMode) -> usize {
    match mode {
        ControllerMode::Plain => PID_PARAM_COUNT,
        ControllerMode::Cascaded => CASCADE_PARAM_COUNT,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    /// Overall proportional gain, scales every term
    pub kp: f64,

    /// Integral time constant (s), 0 disables the integral term
    pub ti: f64,

    /// Anti-windup limit on the accumulated integral error
    pub integral_clamp: f64,

    /// Derivative time constant (s)
    pub td: f64,

    /// Weight of the newest derivative sample, in [0, 1]
    pub derivative_smoothing: f64,

    /// Errors smaller than this are treated as zero
    pub error_deadband: f64,
}

impl PidGains {
    /// Reads the plain PID layout, `None` if `params` is too short
    pub fn from_params(params: &[f64]) -> Option<Self> {
        let &[kp, ti, integral_clamp, td, derivative_smoothing, error_deadband, ..] = params else {
            return None;
        };

        Some(PidGains {
            kp,
            ti,
            integral_clamp,
            td,
            derivative_smoothing,
            error_deadband,
        })
    }

    pub fn to_params(&self) -> [f64; PID_PARAM_COUNT] {
        [
            self.kp,
            self.ti,
            self.integral_clamp,
            self.td,
            self.derivative_smoothing,
            self.error_deadband,
        ]
    }

    /// Lists values that are legal to evaluate but almost certainly a tuning mistake
    pub fn lint(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if !(0.0..=1.0).contains(&self.derivative_smoothing) {
            problems.push(format!(
                "derivative_smoothing {} is outside [0, 1]",
                self.derivative_smoothing
            ));
        }
        if self.integral_clamp < 0.0 {
            problems.push(format!("integral_clamp {} is negative", self.integral_clamp));
        }
        if self.error_deadband < 0.0 {
            problems.push(format!("error_deadband {} is negative", self.error_deadband));
        }

        problems
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct CascadeGains {
    /// Position loop proportional gain, 0 passes the setpoint through as a velocity
    pub kp_pos: f64,
    /// Position loop integral time constant (s)
    pub ti_pos: f64,
    /// Position loop anti-windup limit
    pub iclamp_pos: f64,

    /// Velocity loop proportional gain
    pub kp_vel: f64,
    /// Velocity loop integral time constant (s)
    pub ti_vel: f64,
    /// Velocity loop anti-windup limit
    pub iclamp_vel: f64,

    /// Inertia of the velocity setpoint filter, near 1 tracks slowly
    pub ema_smoothing: f64,
    /// Magnitude limit of the velocity setpoint
    pub max_velocity: f64,
}

impl CascadeGains {
    /// Reads the cascaded PI layout, `None` if `params` is too short
    pub fn from_params(params: &[f64]) -> Option<Self> {
        let &[kp_pos, ti_pos, iclamp_pos, kp_vel, ti_vel, iclamp_vel, ema_smoothing, max_velocity, ..] =
            params
        else {
            return None;
        };

        Some(CascadeGains {
            kp_pos,
            ti_pos,
            iclamp_pos,
            kp_vel,
            ti_vel,
            iclamp_vel,
            ema_smoothing,
            max_velocity,
        })
    }

    pub fn to_params(&self) -> [f64; CASCADE_PARAM_COUNT] {
        [
            self.kp_pos,
            self.ti_pos,
            self.iclamp_pos,
            self.kp_vel,
            self.ti_vel,
            self.iclamp_vel,
            self.ema_smoothing,
            self.max_velocity,
        ]
    }

    /// Lists values that are legal to evaluate but almost certainly a tuning mistake
    pub fn lint(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if !(0.0..=1.0).contains(&self.ema_smoothing) {
            problems.push(format!("ema_smoothing {} is outside [0, 1]", self.ema_smoothing));
        }
        if self.iclamp_pos < 0.0 || self.iclamp_vel < 0.0 {
            problems.push(format!(
                "integral clamps ({}, {}) must not be negative",
                self.iclamp_pos, self.iclamp_vel
            ));
        }
        if self.max_velocity < 0.0 {
            problems.push(format!("max_velocity {} is negative", self.max_velocity));
        }

        problems
    }
}
