use serde::{Deserialize, Serialize};

use crate::control::pid::{self, ControllerErrors, ControllerParameters};
use crate::gains::CascadeGains;
use crate::math;
use crate::types::{Force, ForceLimits, Position, UnitsExt, Velocity};

/// Persistent state of a cascaded position -> velocity controller
#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct CascadeState {
    pub position_integral_error: f64,
    pub position_error: f64,
    pub velocity_integral_error: f64,
    pub velocity_error: f64,
    /// Memory of the velocity setpoint filter
    pub smoothed_velocity: f64,
}

impl CascadeState {
    fn position_errors(&self) -> ControllerErrors {
        ControllerErrors {
            error: self.position_error,
            integral_error: self.position_integral_error,
            derivative_error: 0.0,
        }
    }

    fn velocity_errors(&self) -> ControllerErrors {
        ControllerErrors {
            error: self.velocity_error,
            integral_error: self.velocity_integral_error,
            derivative_error: 0.0,
        }
    }
}

/// Per timestep inputs of the cascade
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CascadeInput {
    /// Sampling interval, must be greater than 0
    pub dt_seconds: f64,

    pub position_setpoint: Position,
    pub position_feedback: Position,
    pub velocity_feedback: Velocity,

    pub force_limits: ForceLimits,

    /// Compensation term added after the force limit, e.g. gravity
    pub bias_force: Force,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CascadeOutput {
    pub force: Force,
    /// The filtered velocity command that fed the inner loop
    pub velocity_setpoint: Velocity,
    pub state: CascadeState,
}

/// Evaluates the position loop, velocity setpoint filter and velocity loop once
pub fn evaluate(gains: &CascadeGains, state: &CascadeState, input: &CascadeInput) -> CascadeOutput {
    let dt = input.dt_seconds;
    let mut next = *state;

    // Outer loop, a zero gain means the setpoint already is a velocity
    let desired_velocity = if gains.kp_pos != 0.0 {
        let params = ControllerParameters::proportional_integral(
            gains.kp_pos,
            gains.ti_pos,
            gains.iclamp_pos,
            dt,
            input.position_setpoint.0,
            input.position_feedback.0,
        );
        let errors = pid::evaluate(&params, &state.position_errors()).errors;

        next.position_error = errors.error;
        next.position_integral_error = errors.integral_error;

        gains.kp_pos * (errors.error + errors.integral_error)
    } else {
        input.position_setpoint.0
    };

    let desired_velocity = math::clamp_symmetric(desired_velocity, gains.max_velocity);

    next.smoothed_velocity = math::ema(
        state.smoothed_velocity,
        desired_velocity,
        1.0 - gains.ema_smoothing,
    );

    // Inner loop
    let params = ControllerParameters::proportional_integral(
        gains.kp_vel,
        gains.ti_vel,
        gains.iclamp_vel,
        dt,
        next.smoothed_velocity,
        input.velocity_feedback.0,
    );
    let inner = pid::evaluate(&params, &state.velocity_errors());

    next.velocity_error = inner.errors.error;
    next.velocity_integral_error = inner.errors.integral_error;

    let Force(limited) = input.force_limits.apply(inner.output.force());

    CascadeOutput {
        force: (limited + input.bias_force.0).force(),
        velocity_setpoint: next.smoothed_velocity.vel(),
        state: next,
    }
}
