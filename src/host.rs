use crate::gains::CASCADE_PARAM_COUNT;
use crate::types::{Force, ForceLimits, Position, UnitsExt, Velocity};

/// Persistent scalars the host must reserve per actuator
pub const STATE_SLOTS_PER_ACTUATOR: usize = 5;
/// Metadata slots the host must reserve per actuator (the mode flag)
pub const METADATA_SLOTS_PER_ACTUATOR: usize = 1;

/// What the controllers need from the simulation
///
/// Implemented by the host and handed to a
/// [`ControllerRegistry`](crate::registry::ControllerRegistry) explicitly, instead of the
/// registry reaching into global state.
pub trait ActuatorHost {
    /// Number of actuators in the model
    fn actuator_count(&self) -> usize;

    /// Physics timestep in seconds
    fn timestep(&self) -> f64;

    /// Persistent scalars the host reserved for controller state, across all actuators
    fn state_capacity(&self) -> usize;

    /// Metadata slots the host reserved, across all actuators
    fn metadata_capacity(&self) -> usize;

    /// Raw controller mode flag, 0 is plain PID and 1 is cascaded PI
    fn mode_flag(&self, actuator: usize) -> i32;

    /// The control input, a position or (cascade pass-through) a velocity
    fn setpoint(&self, actuator: usize) -> f64;

    /// Measured actuator position
    fn position(&self, actuator: usize) -> Position;

    /// Measured actuator velocity
    fn velocity(&self, actuator: usize) -> Velocity;

    /// The actuator's gain parameters, at least as long as its mode's layout
    fn gain_params(&self, actuator: usize) -> &[f64];

    fn force_limits(&self, actuator: usize) -> ForceLimits;

    /// Compensation force added to the cascade output, e.g. gravity
    fn bias_force(&self, actuator: usize) -> Force;
}

/// Host backed by packed per-actuator arrays
///
/// `gains` holds `gain_stride` scalars per actuator, every other array one entry per actuator.
#[derive(Clone, Debug)]
pub struct ArrayHost {
    pub timestep: f64,

    pub ctrl: Vec<f64>,
    pub qpos: Vec<f64>,
    pub qvel: Vec<f64>,

    pub gains: Vec<f64>,
    pub gain_stride: usize,

    pub force_range: Vec<ForceLimits>,
    pub bias: Vec<f64>,
    pub mode_flags: Vec<i32>,

    pub state_capacity: usize,
    pub metadata_capacity: usize,
}

impl ArrayHost {
    /// Zeroed host with exactly the storage the controllers require
    pub fn new(actuators: usize, timestep: f64) -> Self {
        Self::with_gain_stride(actuators, CASCADE_PARAM_COUNT, timestep)
    }

    pub fn with_gain_stride(actuators: usize, gain_stride: usize, timestep: f64) -> Self {
        ArrayHost {
            timestep,
            ctrl: vec![0.0; actuators],
            qpos: vec![0.0; actuators],
            qvel: vec![0.0; actuators],
            gains: vec![0.0; actuators * gain_stride],
            gain_stride,
            force_range: vec![ForceLimits::UNLIMITED; actuators],
            bias: vec![0.0; actuators],
            mode_flags: vec![0; actuators],
            state_capacity: actuators * STATE_SLOTS_PER_ACTUATOR,
            metadata_capacity: actuators * METADATA_SLOTS_PER_ACTUATOR,
        }
    }

    /// Writes `params` to the start of the actuator's gain block
    pub fn set_gains(&mut self, actuator: usize, params: &[f64]) {
        assert!(
            params.len() <= self.gain_stride,
            "{} gain parameters do not fit a stride of {}",
            params.len(),
            self.gain_stride
        );

        let start = actuator * self.gain_stride;
        self.gains[start..start + params.len()].copy_from_slice(params);
    }
}

impl ActuatorHost for ArrayHost {
    fn actuator_count(&self) -> usize {
        self.ctrl.len()
    }

    fn timestep(&self) -> f64 {
        self.timestep
    }

    fn state_capacity(&self) -> usize {
        self.state_capacity
    }

    fn metadata_capacity(&self) -> usize {
        self.metadata_capacity
    }

    fn mode_flag(&self, actuator: usize) -> i32 {
        self.mode_flags[actuator]
    }

    fn setpoint(&self, actuator: usize) -> f64 {
        self.ctrl[actuator]
    }

    fn position(&self, actuator: usize) -> Position {
        self.qpos[actuator].pos()
    }

    fn velocity(&self, actuator: usize) -> Velocity {
        self.qvel[actuator].vel()
    }

    fn gain_params(&self, actuator: usize) -> &[f64] {
        let start = actuator * self.gain_stride;
        self.gains.get(start..start + self.gain_stride).unwrap_or(&[])
    }

    fn force_limits(&self, actuator: usize) -> ForceLimits {
        self.force_range[actuator]
    }

    fn bias_force(&self, actuator: usize) -> Force {
        self.bias[actuator].force()
    }
}
