//! Fade engine integration through the control façade.

use phasehub::config::SystemConfig;
use phasehub::control::ControlService;
use phasehub::isr;
use phasehub::store::DeviceStore;

use crate::mock_hw::{MockOutputBank, SharedSink};

const STEP_MS: u64 = 50; // 1000ms / 20 steps in the default config

fn setup(store: &DeviceStore) -> (ControlService<'_>, SharedSink) {
    let config = SystemConfig::default();
    store.seed(&config, &Default::default(), 0);
    let mut control = ControlService::new(store, &config);
    let sink = SharedSink::new();
    control.register_change_sink(Box::new(sink.clone()));
    (control, sink)
}

#[test]
fn ramp_up_is_monotonic_and_lands_on_target() {
    let store = DeviceStore::new();
    let (mut control, sink) = setup(&store);

    // Park the channel at 0% so the ramp has the full range to cover.
    control.set_device_state(2, true, 0, false, 0).unwrap();
    control.set_device_state(2, true, 100, true, 0).unwrap();

    let mut now = 0;
    while control.fade_active(2) {
        now += STEP_MS;
        control.process_fades(now);
    }

    let changes = sink.changes();
    // One notification per ramp step, plus the two initial writes.
    assert_eq!(changes.len(), 22);
    let brightnesses: Vec<u8> = changes.iter().map(|c| c.brightness).collect();
    assert!(brightnesses.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*brightnesses.last().unwrap(), 100);
    assert_eq!(control.get_device_state(2).unwrap(), (true, 100));
}

#[test]
fn ramp_down_to_off_ends_commanded_off() {
    let store = DeviceStore::new();
    let (mut control, _sink) = setup(&store);

    control.set_device_state(2, true, 80, false, 0).unwrap();
    control.set_device_state(2, false, 0, true, 100).unwrap();

    let mut now = 100;
    while control.fade_active(2) {
        now += STEP_MS;
        control.process_fades(now);
        // Mid-ramp the channel stays on so the gate keeps firing dimmer.
        if control.fade_active(2) {
            assert!(control.get_device_state(2).unwrap().0);
        }
    }

    assert_eq!(control.get_device_state(2).unwrap(), (false, 0));
}

#[test]
fn mid_ramp_brightness_shows_at_the_gate() {
    let store = DeviceStore::new();
    let (mut control, _sink) = setup(&store);
    let mut pins = MockOutputBank::new();

    control.set_device_state(3, true, 0, false, 0).unwrap();
    control.set_device_state(3, true, 100, true, 0).unwrap();

    // Two steps into the ramp: 0 + 100*1/20 = 5, then 5 + 95*2/20 = 14.
    let mut now = 0;
    for _ in 0..2 {
        now += STEP_MS;
        control.process_fades(now);
    }
    let (_, brightness) = control.get_device_state(3).unwrap();
    assert_eq!(brightness, 14);

    isr::on_zero_cross(&store, &mut pins, now);
    for _ in 0..(100 - u32::from(brightness) - 1) {
        isr::on_phase_tick(&store, &mut pins);
    }
    assert!(!pins.levels[3]);
    isr::on_phase_tick(&store, &mut pins);
    assert!(pins.levels[3]);
}

#[test]
fn new_command_mid_ramp_takes_over() {
    let store = DeviceStore::new();
    let (mut control, _sink) = setup(&store);

    control.set_device_state(2, true, 100, true, 0).unwrap();
    control.process_fades(STEP_MS);
    assert!(control.fade_active(2));

    // A later fade request replaces the ramp (last write wins).
    control.set_device_state(2, true, 20, true, STEP_MS + 10).unwrap();
    let mut now = STEP_MS + 10;
    while control.fade_active(2) {
        now += STEP_MS;
        control.process_fades(now);
    }
    assert_eq!(control.get_device_state(2).unwrap(), (true, 20));
}
