//! Control façade + interrupt handler integration.
//!
//! Drives the crossing/phase-tick handlers by hand against a mock output
//! bank and checks that commanded state reaches the gates with the right
//! phase timing.

use phasehub::app::ports::ConfigPort;
use phasehub::adapters::nvs::NvsAdapter;
use phasehub::config::{SystemConfig, CHANNEL_COUNT, PHASE_STEPS};
use phasehub::control::ControlService;
use phasehub::isr;
use phasehub::power::PowerOnPolicy;
use phasehub::store::DeviceStore;

use crate::mock_hw::{GateCall, MockOutputBank, SharedSink};

fn seeded_store() -> DeviceStore {
    let store = DeviceStore::new();
    store.seed(&SystemConfig::default(), &Default::default(), 0);
    store
}

/// Run one half-cycle: a crossing followed by every phase tick.
fn run_half_cycle(store: &DeviceStore, pins: &mut MockOutputBank, now_ms: u64) {
    isr::on_zero_cross(store, pins, now_ms);
    for _ in 0..PHASE_STEPS {
        isr::on_phase_tick(store, pins);
    }
}

#[test]
fn dimmer_command_fires_gate_at_phase_delay() {
    let store = seeded_store();
    let config = SystemConfig::default();
    let mut control = ControlService::new(&store, &config);
    let mut pins = MockOutputBank::new();

    // Channel 2 is Dimmable in the default config.
    control.set_device_state(2, true, 75, false, 0).unwrap();

    isr::on_zero_cross(&store, &mut pins, 0);
    for _ in 0..24 {
        isr::on_phase_tick(&store, &mut pins);
    }
    assert!(!pins.levels[2], "gate must stay low before the fire delay");

    isr::on_phase_tick(&store, &mut pins); // tick 25 = 100 - 75
    assert!(pins.levels[2], "gate must fire once the delay elapses");
}

#[test]
fn switch_channel_follows_the_crossing_not_the_ticks() {
    let store = seeded_store();
    let config = SystemConfig::default();
    let mut control = ControlService::new(&store, &config);
    let mut pins = MockOutputBank::new();

    // Channel 0 is a Switch in the default config.
    control.set_device_state(0, true, 100, false, 0).unwrap();

    isr::on_zero_cross(&store, &mut pins, 0);
    assert!(pins.levels[0]);

    let writes_before = pins.history.len();
    for _ in 0..PHASE_STEPS {
        isr::on_phase_tick(&store, &mut pins);
    }
    // Phase ticks never touch a Switch channel.
    let switch_writes = pins.history[writes_before..]
        .iter()
        .filter(|c| matches!(c, GateCall::Set { channel: 0, .. }))
        .count();
    assert_eq!(switch_writes, 0);
}

#[test]
fn turned_off_channel_never_fires() {
    let store = seeded_store();
    let config = SystemConfig::default();
    let mut control = ControlService::new(&store, &config);
    let mut pins = MockOutputBank::new();

    control.set_device_state(3, true, 90, false, 0).unwrap();
    run_half_cycle(&store, &mut pins, 0);
    assert!(pins.levels[3]);

    control.set_device_state(3, false, 0, false, 10).unwrap();
    run_half_cycle(&store, &mut pins, 10);
    assert!(!pins.levels[3]);
}

#[test]
fn change_sink_sees_every_mutation() {
    let store = seeded_store();
    let config = SystemConfig::default();
    let mut control = ControlService::new(&store, &config);
    let sink = SharedSink::new();
    control.register_change_sink(Box::new(sink.clone()));

    control.set_device_state(1, true, 100, false, 0).unwrap();
    control.set_device_state(2, true, 40, false, 5).unwrap();
    control.set_device_state(1, false, 0, false, 10).unwrap();

    let changes = sink.changes();
    assert_eq!(changes.len(), 3);
    assert_eq!(
        (changes[0].id, changes[0].commanded_on, changes[0].brightness),
        (1, true, 100)
    );
    assert_eq!(
        (changes[1].id, changes[1].commanded_on, changes[1].brightness),
        (2, true, 40)
    );
    // Off retains the stored brightness in the notification too.
    assert_eq!(
        (changes[2].id, changes[2].commanded_on, changes[2].brightness),
        (1, false, 100)
    );
}

#[test]
fn rejected_request_reaches_neither_store_nor_sink() {
    let store = seeded_store();
    let config = SystemConfig::default();
    let mut control = ControlService::new(&store, &config);
    let sink = SharedSink::new();
    control.register_change_sink(Box::new(sink.clone()));

    assert!(control.set_device_state(0, true, 200, false, 0).is_err());
    assert!(control.set_device_state(CHANNEL_COUNT, true, 50, false, 0).is_err());

    assert!(sink.changes().is_empty());
    assert!(!store.snapshot(0).unwrap().commanded_on);
}

#[test]
fn persisted_state_survives_a_power_cycle() {
    let nvs = NvsAdapter::new().unwrap();

    let mut config = SystemConfig::default();
    config.devices[2].power_on_policy = PowerOnPolicy::Last;
    config.devices[3].power_on_policy = PowerOnPolicy::Off;

    // First boot: command a state and persist it.
    {
        let store = DeviceStore::new();
        store.seed(&config, &Default::default(), 0);
        let mut control = ControlService::new(&store, &config);
        control.set_device_state(2, true, 65, false, 100).unwrap();
        control.set_device_state(3, true, 90, false, 100).unwrap();

        assert!(control.take_persistable(10_000, config.state_save_debounce_ms));
        nvs.save_state(&store.persistable()).unwrap();
    }

    // Second boot: the Last channel restores, the Off channel does not.
    {
        let store = DeviceStore::new();
        store.seed(&config, &nvs.load_state().unwrap(), 0);

        let d2 = store.snapshot(2).unwrap();
        assert_eq!((d2.commanded_on, d2.brightness), (true, 65));

        let d3 = store.snapshot(3).unwrap();
        assert!(!d3.commanded_on);
    }
}
