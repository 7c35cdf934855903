//! Safety monitor integration: signal loss, recovery, auto-off.

use phasehub::config::{SystemConfig, PHASE_STEPS};
use phasehub::control::ControlService;
use phasehub::error::FaultFlag;
use phasehub::isr;
use phasehub::safety::{SafetyMonitor, WatchdogState};
use phasehub::store::DeviceStore;

use crate::mock_hw::{GateCall, MockOutputBank};

fn setup(store: &DeviceStore) -> (ControlService<'_>, SafetyMonitor, SystemConfig) {
    let config = SystemConfig::default();
    store.seed(&config, &Default::default(), 0);
    (
        ControlService::new(store, &config),
        SafetyMonitor::new(&config),
        config,
    )
}

#[test]
fn signal_loss_kills_active_loads() {
    let store = DeviceStore::new();
    let (mut control, mut safety, _) = setup(&store);
    let mut pins = MockOutputBank::new();

    control.set_device_state(0, true, 100, false, 0).unwrap(); // switch
    control.set_device_state(2, true, 80, false, 0).unwrap(); // dimmer

    // Normal half-cycle: both loads reach the gates.
    isr::on_zero_cross(&store, &mut pins, 0);
    for _ in 0..PHASE_STEPS {
        isr::on_phase_tick(&store, &mut pins);
    }
    assert!(pins.levels[0]);
    assert!(pins.levels[2]);

    // Crossings stop; the watchdog trips past the 100 ms default.
    safety.poll(&store, &mut pins, &mut control, 500);

    assert_eq!(safety.watchdog(), WatchdogState::SignalLost);
    assert!(safety.has_fault(FaultFlag::ZeroCrossSignalLost));
    assert!(!pins.any_high());
    assert!(pins.history.contains(&GateCall::AllLow));
    for dev in store.snapshot_all() {
        assert!(!dev.commanded_on);
    }
}

#[test]
fn recovery_requires_rearm_and_recommand() {
    let store = DeviceStore::new();
    let (mut control, mut safety, _) = setup(&store);
    let mut pins = MockOutputBank::new();

    control.set_device_state(1, true, 100, false, 0).unwrap();
    isr::on_zero_cross(&store, &mut pins, 0);
    safety.poll(&store, &mut pins, &mut control, 500);
    assert_eq!(safety.watchdog(), WatchdogState::SignalLost);

    // Crossings resume on their own: loads stay off, fault stays latched.
    isr::on_zero_cross(&store, &mut pins, 600);
    for _ in 0..PHASE_STEPS {
        isr::on_phase_tick(&store, &mut pins);
    }
    assert!(!pins.any_high());
    safety.poll(&store, &mut pins, &mut control, 650);
    assert!(safety.has_fault(FaultFlag::ZeroCrossSignalLost));

    // Operator re-arms and re-commands; the next crossing restores output.
    safety.rearm();
    control.set_device_state(1, true, 100, false, 700).unwrap();
    isr::on_zero_cross(&store, &mut pins, 710);
    assert!(pins.levels[1]);
    assert_eq!(safety.watchdog(), WatchdogState::Healthy);
}

#[test]
fn auto_off_ramps_the_load_out() {
    let store = DeviceStore::new();
    let (mut control, mut safety, config) = setup(&store);
    let mut pins = MockOutputBank::new();

    store.update(3, |dev| dev.auto_off_enabled = true);
    control.set_device_state(3, true, 100, false, 0).unwrap();

    let late = u64::from(config.auto_off_ms) + 1000;
    isr::on_zero_cross(&store, &mut pins, late - 10);
    safety.poll(&store, &mut pins, &mut control, late);

    assert!(control.fade_active(3));
    let mut now = late;
    while control.fade_active(3) {
        now += 50;
        control.process_fades(now);
    }
    assert_eq!(control.get_device_state(3).unwrap(), (false, 0));

    // The gate no longer fires on subsequent half-cycles.
    isr::on_zero_cross(&store, &mut pins, now);
    for _ in 0..PHASE_STEPS {
        isr::on_phase_tick(&store, &mut pins);
    }
    assert!(!pins.levels[3]);
}
