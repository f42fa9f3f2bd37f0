use std::thread;

use actuator_pid::control::cascade::{self, CascadeInput, CascadeState};
use actuator_pid::control::pid::{self, ControllerErrors, ControllerParameters};
use actuator_pid::error::AttachError;
use actuator_pid::gains::{CascadeGains, PidGains};
use actuator_pid::host::{ActuatorHost, ArrayHost};
use actuator_pid::registry::{ControllerRegistry, ControllerState};
use actuator_pid::types::{ControllerMode, ForceLimits, UnitsExt};

const TIMESTEP: f64 = 0.002;

fn pid_gains() -> PidGains {
    PidGains {
        kp: 10.0,
        ti: 0.5,
        integral_clamp: 5.0,
        td: 0.05,
        derivative_smoothing: 0.7,
        error_deadband: 0.001,
    }
}

fn cascade_gains() -> CascadeGains {
    CascadeGains {
        kp_pos: 4.0,
        ti_pos: 1.0,
        iclamp_pos: 0.5,
        kp_vel: 30.0,
        ti_vel: 0.2,
        iclamp_vel: 2.0,
        ema_smoothing: 0.3,
        max_velocity: 1.5,
    }
}

/// Actuator 0 is plain PID, actuator 1 is cascaded
fn mixed_host() -> ArrayHost {
    let mut host = ArrayHost::new(2, TIMESTEP);

    host.set_gains(0, &pid_gains().to_params());
    host.set_gains(1, &cascade_gains().to_params());
    host.mode_flags[1] = ControllerMode::Cascaded.flag();

    host.ctrl = vec![1.0, 0.5];
    host.qpos = vec![0.2, -0.1];
    host.qvel = vec![0.0, 0.3];
    host.force_range[1] = ForceLimits::new(-20.0, 20.0);
    host.bias[1] = 1.25;

    host
}

#[test]
fn storage_capacity_is_checked() {
    let mut host = mixed_host();
    host.state_capacity = 9;

    assert_eq!(
        ControllerRegistry::attach(&host).err(),
        Some(AttachError::StateCapacity { required: 10, available: 9 })
    );

    let mut host = mixed_host();
    host.metadata_capacity = 1;

    assert_eq!(
        ControllerRegistry::attach(&host).err(),
        Some(AttachError::MetadataCapacity { required: 2, available: 1 })
    );
}

#[test]
fn bad_metadata_is_rejected() {
    let mut host = mixed_host();
    host.mode_flags[0] = 7;

    assert_eq!(
        ControllerRegistry::attach(&host).err(),
        Some(AttachError::UnknownMode { actuator: 0, flag: 7 })
    );

    // A stride of 6 fits plain PID but not the cascade layout
    let mut host = ArrayHost::with_gain_stride(2, 6, TIMESTEP);
    host.mode_flags[1] = ControllerMode::Cascaded.flag();

    assert_eq!(
        ControllerRegistry::attach(&host).err(),
        Some(AttachError::GainLayout {
            actuator: 1,
            mode: ControllerMode::Cascaded,
            required: 8,
            available: 6
        })
    );
}

#[test]
fn attach_error_message_is_descriptive() {
    let mut host = mixed_host();
    host.state_capacity = 0;

    let err = match ControllerRegistry::attach_named(&host, ["shoulder", "elbow"]) {
        Ok(_) => panic!("attach should fail without storage"),
        Err(err) => err,
    };
    let message = format!("{err:#}");
    assert!(message.contains("Attach controllers"), "{}", message);
    assert!(message.contains("10 scalars required"), "{}", message);
}

#[test]
fn modes_and_state_start_zeroed() {
    let registry = ControllerRegistry::attach(&mixed_host()).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.record(0).unwrap().mode(), ControllerMode::Plain);
    assert_eq!(registry.record(1).unwrap().mode(), ControllerMode::Cascaded);
    assert_eq!(
        *registry.record(0).unwrap().state(),
        ControllerState::Plain(ControllerErrors::default())
    );
    assert_eq!(
        *registry.record(1).unwrap().state(),
        ControllerState::Cascaded(CascadeState::default())
    );
    assert!(registry.record(2).is_none());
}

#[test]
fn gain_is_always_zero() {
    let registry = ControllerRegistry::attach(&mixed_host()).unwrap();
    assert_eq!(registry.gain(0), 0.0);
    assert_eq!(registry.gain(1), 0.0);
}

#[test]
fn bias_matches_control_laws() {
    let mut host = mixed_host();
    let mut registry = ControllerRegistry::attach(&host).unwrap();

    let mut plain = ControllerErrors::default();
    let mut cascaded = CascadeState::default();

    for step in 0..20 {
        host.qpos[0] += 0.01;
        host.qpos[1] += 0.005;
        host.qvel[1] = 0.1 * step as f64;

        let expected_plain = pid::evaluate(
            &ControllerParameters::new(&pid_gains(), TIMESTEP, host.ctrl[0], host.qpos[0]),
            &plain,
        );
        plain = expected_plain.errors;

        let expected_cascaded = cascade::evaluate(
            &cascade_gains(),
            &cascaded,
            &CascadeInput {
                dt_seconds: TIMESTEP,
                position_setpoint: host.setpoint(1).pos(),
                position_feedback: host.position(1),
                velocity_feedback: host.velocity(1),
                force_limits: host.force_limits(1),
                bias_force: host.bias_force(1),
            },
        );
        cascaded = expected_cascaded.state;

        assert_eq!(registry.bias(&host, 0), expected_plain.output);
        assert_eq!(registry.bias(&host, 1), expected_cascaded.force.0);
    }

    assert_eq!(*registry.record(0).unwrap().state(), ControllerState::Plain(plain));
    assert_eq!(*registry.record(1).unwrap().state(), ControllerState::Cascaded(cascaded));
}

#[test]
fn actuators_do_not_share_state() {
    let mut host = ArrayHost::new(2, TIMESTEP);
    host.set_gains(0, &pid_gains().to_params());
    host.set_gains(1, &pid_gains().to_params());
    host.ctrl = vec![1.0, 1.0];

    let mut registry = ControllerRegistry::attach(&host).unwrap();

    for _ in 0..10 {
        registry.bias(&host, 0);
    }

    assert_ne!(
        *registry.record(0).unwrap().state(),
        ControllerState::Plain(ControllerErrors::default())
    );
    assert_eq!(
        *registry.record(1).unwrap().state(),
        ControllerState::Plain(ControllerErrors::default())
    );

    // Identical inputs give identical first outputs regardless of the other actuator's history
    let mut fresh = ControllerRegistry::attach(&host).unwrap();
    assert_eq!(registry.bias(&host, 1), fresh.bias(&host, 0));
}

#[test]
fn reset_zeroes_state() {
    let host = mixed_host();
    let mut registry = ControllerRegistry::attach(&host).unwrap();

    let first = registry.bias(&host, 1);
    registry.bias(&host, 1);
    registry.reset(1);

    assert_eq!(
        *registry.record(1).unwrap().state(),
        ControllerState::Cascaded(CascadeState::default())
    );
    assert_eq!(registry.bias(&host, 1), first);

    registry.bias(&host, 0);
    registry.reset_all();
    assert_eq!(
        *registry.record(0).unwrap().state(),
        ControllerState::Plain(ControllerErrors::default())
    );
}

#[test]
fn named_actuators() {
    let host = mixed_host();
    let registry = ControllerRegistry::attach_named(&host, ["shoulder", "elbow"]).unwrap();

    assert_eq!(registry.index_of("shoulder"), Some(0));
    assert_eq!(registry.index_of("elbow"), Some(1));
    assert_eq!(registry.index_of("wrist"), None);

    assert!(ControllerRegistry::attach_named(&host, ["a", "a"]).is_err());
    assert!(ControllerRegistry::attach_named(&host, ["a", "b", "c"]).is_err());
}

#[test]
fn bias_all_matches_single_calls() {
    let host = mixed_host();
    let mut all = ControllerRegistry::attach(&host).unwrap();
    let mut single = ControllerRegistry::attach(&host).unwrap();

    let mut forces = vec![0.0; 2];
    for _ in 0..5 {
        all.bias_all(&host, &mut forces);
        assert_eq!(forces, vec![single.bias(&host, 0), single.bias(&host, 1)]);
    }
}

#[test]
fn records_can_be_split_across_threads() {
    let mut host = ArrayHost::new(8, TIMESTEP);
    for actuator in 0..8 {
        host.set_gains(actuator, &pid_gains().to_params());
        host.ctrl[actuator] = actuator as f64;
    }

    let mut parallel = ControllerRegistry::attach(&host).unwrap();
    let mut sequential = ControllerRegistry::attach(&host).unwrap();

    let mut expected = vec![0.0; 8];
    let mut forces = vec![0.0; 8];
    for _ in 0..3 {
        sequential.bias_all(&host, &mut expected);

        let host = &host;
        thread::scope(|scope| {
            for (records, out) in parallel.records_mut().chunks_mut(3).zip(forces.chunks_mut(3)) {
                scope.spawn(move || {
                    for (record, force) in records.iter_mut().zip(out.iter_mut()) {
                        *force = record.bias(host);
                    }
                });
            }
        });

        assert_eq!(forces, expected);
    }
}

#[test]
fn short_gain_slice_after_attach_gives_zero_force() {
    let mut host = mixed_host();
    let mut registry = ControllerRegistry::attach(&host).unwrap();

    host.gain_stride = 4;
    host.gains.truncate(8);

    assert_eq!(registry.bias(&host, 0), 0.0);
    assert_eq!(registry.bias(&host, 1), 0.0);
}

#[test]
fn gains_load_from_json() {
    let gains: CascadeGains = serde_json::from_str(
        r#"{
            "kp_pos": 4.0, "ti_pos": 1.0, "iclamp_pos": 0.5,
            "kp_vel": 30.0, "ti_vel": 0.2, "iclamp_vel": 2.0,
            "ema_smoothing": 0.3, "max_velocity": 1.5
        }"#,
    )
    .unwrap();
    assert_eq!(gains, cascade_gains());

    let json = serde_json::to_string(&pid_gains()).unwrap();
    let back: PidGains = serde_json::from_str(&json).unwrap();
    assert_eq!(back, pid_gains());
}
