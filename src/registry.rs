//! Per-simulation bookkeeping: which control law each actuator uses and its persistent state.

use anyhow::{bail, Context};
use fxhash::FxHashMap as HashMap;
use log::{debug, error, info, trace, warn};

use crate::control::cascade::{self, CascadeInput, CascadeState};
use crate::control::pid::{self, ControllerErrors, ControllerParameters};
use crate::error::{AttachError, Result};
use crate::gains::{param_count, CascadeGains, PidGains, CASCADE_PARAM_COUNT, PID_PARAM_COUNT};
use crate::host::{ActuatorHost, METADATA_SLOTS_PER_ACTUATOR, STATE_SLOTS_PER_ACTUATOR};
use crate::types::{ControllerMode, UnitsExt};

/// State of one actuator, tagged with the law that owns it
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ControllerState {
    Plain(ControllerErrors),
    Cascaded(CascadeState),
}

impl ControllerState {
    pub fn zeroed(mode: ControllerMode) -> Self {
        match mode {
            ControllerMode::Plain => ControllerState::Plain(ControllerErrors::default()),
            ControllerMode::Cascaded => ControllerState::Cascaded(CascadeState::default()),
        }
    }

    pub fn mode(&self) -> ControllerMode {
        match self {
            ControllerState::Plain(_) => ControllerMode::Plain,
            ControllerState::Cascaded(_) => ControllerMode::Cascaded,
        }
    }
}

/// One slot of the registry's arena
///
/// A record is only ever touched through `&mut`, so one evaluation owns it at a time.
#[derive(Clone, Debug)]
pub struct ActuatorRecord {
    actuator: usize,
    state: ControllerState,
}

impl ActuatorRecord {
    pub fn actuator(&self) -> usize {
        self.actuator
    }

    pub fn mode(&self) -> ControllerMode {
        self.state.mode()
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = ControllerState::zeroed(self.mode());
    }

    /// Runs this actuator's control law for one timestep and returns the force
    pub fn bias<H: ActuatorHost + ?Sized>(&mut self, host: &H) -> f64 {
        let actuator = self.actuator;
        let params = host.gain_params(actuator);

        match &mut self.state {
            ControllerState::Plain(errors) => {
                let Some(gains) = PidGains::from_params(params) else {
                    error!(
                        "Actuator {actuator} has {} gain parameters, plain PID needs {}",
                        params.len(),
                        PID_PARAM_COUNT
                    );
                    return 0.0;
                };

                let params = ControllerParameters::new(
                    &gains,
                    host.timestep(),
                    host.setpoint(actuator),
                    host.position(actuator).0,
                );
                let result = pid::evaluate(&params, errors);

                trace!("Actuator {actuator} pid: {result:?}");

                *errors = result.errors;
                result.output
            }
            ControllerState::Cascaded(state) => {
                let Some(gains) = CascadeGains::from_params(params) else {
                    error!(
                        "Actuator {actuator} has {} gain parameters, cascaded PI needs {}",
                        params.len(),
                        CASCADE_PARAM_COUNT
                    );
                    return 0.0;
                };

                let input = CascadeInput {
                    dt_seconds: host.timestep(),
                    position_setpoint: host.setpoint(actuator).pos(),
                    position_feedback: host.position(actuator),
                    velocity_feedback: host.velocity(actuator),
                    force_limits: host.force_limits(actuator),
                    bias_force: host.bias_force(actuator),
                };
                let result = cascade::evaluate(&gains, state, &input);

                trace!("Actuator {actuator} cascade: {result:?}");

                *state = result.state;
                result.force.0
            }
        }
    }
}

/// Arena of per-actuator controllers for one simulation
pub struct ControllerRegistry {
    records: Vec<ActuatorRecord>,
    names: HashMap<String, usize>,
}

impl ControllerRegistry {
    /// Checks the host's storage, resolves every actuator's mode and zeroes all state
    pub fn attach<H: ActuatorHost + ?Sized>(host: &H) -> std::result::Result<Self, AttachError> {
        let count = host.actuator_count();

        let required = count * STATE_SLOTS_PER_ACTUATOR;
        if host.state_capacity() < required {
            return Err(AttachError::StateCapacity {
                required,
                available: host.state_capacity(),
            });
        }

        let required = count * METADATA_SLOTS_PER_ACTUATOR;
        if host.metadata_capacity() < required {
            return Err(AttachError::MetadataCapacity {
                required,
                available: host.metadata_capacity(),
            });
        }

        let mut records = Vec::with_capacity(count);
        for actuator in 0..count {
            let flag = host.mode_flag(actuator);
            let mode = ControllerMode::from_flag(flag)
                .ok_or(AttachError::UnknownMode { actuator, flag })?;

            let params = host.gain_params(actuator);
            let required = param_count(mode);
            if params.len() < required {
                return Err(AttachError::GainLayout {
                    actuator,
                    mode,
                    required,
                    available: params.len(),
                });
            }

            let mut problems = match mode {
                ControllerMode::Plain => PidGains::from_params(params).map(|it| it.lint()),
                ControllerMode::Cascaded => CascadeGains::from_params(params).map(|it| it.lint()),
            }
            .unwrap_or_default();

            let limits = host.force_limits(actuator);
            if limits.low > limits.high {
                problems.push(format!("force limits {limits:?} are inverted"));
            }

            for problem in problems {
                warn!("Actuator {actuator}: {problem}");
            }

            debug!("Actuator {actuator} uses {mode:?} control");

            records.push(ActuatorRecord {
                actuator,
                state: ControllerState::zeroed(mode),
            });
        }

        let cascaded = records
            .iter()
            .filter(|it| it.mode() == ControllerMode::Cascaded)
            .count();
        info!("Attached controllers to {count} actuators ({cascaded} cascaded)");

        Ok(ControllerRegistry {
            records,
            names: HashMap::default(),
        })
    }

    /// Like `attach`, additionally recording a name per actuator for `index_of`
    pub fn attach_named<H, I, S>(host: &H, names: I) -> Result<Self>
    where
        H: ActuatorHost + ?Sized,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::attach(host).context("Attach controllers")?;

        for (actuator, name) in names.into_iter().enumerate() {
            let name = name.into();
            if actuator >= registry.len() {
                bail!("More names than actuators, {name:?} has no actuator");
            }
            if registry.names.insert(name.clone(), actuator).is_some() {
                bail!("Actuator name {name:?} is used twice");
            }
        }

        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    pub fn record(&self, actuator: usize) -> Option<&ActuatorRecord> {
        self.records.get(actuator)
    }

    /// The whole arena, e.g. to split across threads
    pub fn records_mut(&mut self) -> &mut [ActuatorRecord] {
        &mut self.records
    }

    /// Gain callback for the host, always 0 since the whole law is folded into `bias`
    pub fn gain(&self, _actuator: usize) -> f64 {
        0.0
    }

    /// Bias callback for the host, evaluates the actuator for one timestep
    pub fn bias<H: ActuatorHost + ?Sized>(&mut self, host: &H, actuator: usize) -> f64 {
        self.records[actuator].bias(host)
    }

    /// Evaluates every actuator in order, writing forces into `out`
    pub fn bias_all<H: ActuatorHost + ?Sized>(&mut self, host: &H, out: &mut [f64]) {
        assert_eq!(out.len(), self.records.len(), "One output per actuator");

        for (record, force) in self.records.iter_mut().zip(out.iter_mut()) {
            *force = record.bias(host);
        }
    }

    pub fn reset(&mut self, actuator: usize) {
        debug!("Reset actuator {actuator}");
        self.records[actuator].reset();
    }

    pub fn reset_all(&mut self) {
        debug!("Reset all {} actuators", self.records.len());
        for record in &mut self.records {
            record.reset();
        }
    }
}
