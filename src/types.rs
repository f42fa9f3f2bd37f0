use serde::{Deserialize, Serialize};

/// Repersents a joint or actuator position (m or rad)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Position(pub f64);

/// Repersents a joint or actuator velocity (m/s or rad/s)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Velocity(pub f64);

/// Repersents a generalized force (N or Nm)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Force(pub f64);

pub trait UnitsExt {
    /// Converts this value to `Position`
    fn pos(self) -> Position;
    /// Converts this value to `Velocity`
    fn vel(self) -> Velocity;
    /// Converts this value to `Force`
    fn force(self) -> Force;
}

impl UnitsExt for f64 {
    fn pos(self) -> Position {
        Position(self)
    }

    fn vel(self) -> Velocity {
        Velocity(self)
    }

    fn force(self) -> Force {
        Force(self)
    }
}

/// Commanded force range of an actuator
///
/// `(0, 0)` is the "unlimited" sentinel, not a zero width range.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ForceLimits {
    pub low: f64,
    pub high: f64,
}

impl ForceLimits {
    pub const UNLIMITED: ForceLimits = ForceLimits { low: 0.0, high: 0.0 };

    pub fn new(low: f64, high: f64) -> Self {
        ForceLimits { low, high }
    }

    pub fn is_limited(&self) -> bool {
        self.low != 0.0 || self.high != 0.0
    }

    /// Clamps `force` into the range, unless this is the unlimited sentinel
    pub fn apply(&self, Force(force): Force) -> Force {
        if self.is_limited() {
            Force(crate::math::clamp_range(force, self.low, self.high))
        } else {
            Force(force)
        }
    }
}

/// Which control law drives an actuator
///
/// Resolved once from the host's integer flag when the registry attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerMode {
    Plain,
    Cascaded,
}

impl ControllerMode {
    /// Decodes the host's metadata flag, 0 is plain PID and 1 is cascaded PI
    pub fn from_flag(flag: i32) -> Option<Self> {
        match flag {
            0 => Some(ControllerMode::Plain),
            1 => Some(ControllerMode::Cascaded),
            _ => None,
        }
    }

    pub fn flag(self) -> i32 {
        match self {
            ControllerMode::Plain => 0,
            ControllerMode::Cascaded => 1,
        }
    }
}
