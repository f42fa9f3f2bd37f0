use serde::{Deserialize, Serialize};

use crate::gains::PidGains;
use crate::math;

/// Everything one PID evaluation reads besides the previous errors
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ControllerParameters {
    /// Sampling interval, must be greater than 0
    pub dt_seconds: f64,

    pub setpoint: f64,
    pub feedback: f64,

    /// how strongly to correct current error
    pub kp: f64,

    /// errors smaller than this are ignored
    pub error_deadband: f64,

    /// limit on the accumulated error
    pub integral_max_clamp: f64,

    /// how quickly to correct long term drift, 0 disables it
    pub integral_time_const: f64,

    /// how much of each new derivative sample to keep
    pub derivative_gain_smoothing: f64,

    /// how strongly to correct to predicted error
    pub derivative_time_const: f64,
}

impl ControllerParameters {
    pub fn new(gains: &PidGains, dt_seconds: f64, setpoint: f64, feedback: f64) -> Self {
        ControllerParameters {
            dt_seconds,
            setpoint,
            feedback,
            kp: gains.kp,
            error_deadband: gains.error_deadband,
            integral_max_clamp: gains.integral_clamp,
            integral_time_const: gains.ti,
            derivative_gain_smoothing: gains.derivative_smoothing,
            derivative_time_const: gains.td,
        }
    }

    /// Proportional plus integral only, as used by both stages of the cascade
    pub fn proportional_integral(
        kp: f64,
        integral_time_const: f64,
        integral_max_clamp: f64,
        dt_seconds: f64,
        setpoint: f64,
        feedback: f64,
    ) -> Self {
        ControllerParameters {
            dt_seconds,
            setpoint,
            feedback,
            kp,
            error_deadband: 0.0,
            integral_max_clamp,
            integral_time_const,
            derivative_gain_smoothing: 0.0,
            derivative_time_const: 0.0,
        }
    }
}

/// The persistent part of a PID loop, carried from one timestep to the next
#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerErrors {
    pub error: f64,
    pub integral_error: f64,
    pub derivative_error: f64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ControllerOutput {
    pub output: f64,
    /// Becomes `prev` for the next evaluation
    pub errors: ControllerErrors,
}

/// Evaluates the PID law once
///
/// Pure: the caller persists `errors` of the result and passes it back next timestep.
pub fn evaluate(params: &ControllerParameters, prev: &ControllerErrors) -> ControllerOutput {
    let dt = params.dt_seconds;
    debug_assert!(dt > 0.0, "dt_seconds must be greater than 0");

    let mut error = params.setpoint - params.feedback;
    if error.abs() < params.error_deadband {
        error = 0.0;
    }

    // Anti-windup, also applies when the clamp is 0
    let integral_error = math::clamp_symmetric(
        prev.integral_error + error * dt,
        params.integral_max_clamp,
    );

    let raw_derivative = (error - prev.error) / dt;
    let derivative_error = math::ema(
        prev.derivative_error,
        raw_derivative,
        params.derivative_gain_smoothing,
    );

    let integral = if params.integral_time_const == 0.0 {
        0.0
    } else {
        integral_error / params.integral_time_const
    };
    let derivative = derivative_error * params.derivative_time_const;

    ControllerOutput {
        output: params.kp * (error + integral + derivative),
        errors: ControllerErrors {
            error,
            integral_error,
            derivative_error,
        },
    }
}

/// Implementation of the PID algorithm that owns its state
///
/// Convenience for callers that drive a single loop outside of a registry.
#[derive(Clone, Debug)]
pub struct PidController {
    gains: PidGains,
    errors: ControllerErrors,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        PidController { gains, errors: ControllerErrors::default() }
    }

    pub fn update(&mut self, setpoint: f64, feedback: f64, dt_seconds: f64) -> f64 {
        let params = ControllerParameters::new(&self.gains, dt_seconds, setpoint, feedback);
        let result = evaluate(&params, &self.errors);

        self.errors = result.errors;
        result.output
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Gains may be retuned between steps, the accumulated errors are kept
    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    pub fn errors(&self) -> &ControllerErrors {
        &self.errors
    }

    pub fn reset(&mut self) {
        self.errors = ControllerErrors::default();
    }
}
