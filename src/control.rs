//! Control façade — the single sanctioned entry point for state changes.
//!
//! Every external collaborator (REST/WebSocket layer, automation, voice
//! bridge, wall switches, safety auto-off) goes through
//! [`ControlService::set_device_state`].  The façade owns validation and
//! the change-notification sink; it delegates ramps to the fade engine and
//! immediate writes to the store.
//!
//! Rejections (`InvalidDeviceId`, `Locked`, `InvalidArgument`) happen
//! before any mutation.  The registered change sink is invoked
//! synchronously after each successful mutation, outside the store guard.

use log::debug;

use crate::app::ports::{ChangeSink, DeviceChange};
use crate::config::{SystemConfig, CHANNEL_COUNT};
use crate::error::ControlError;
use crate::fade::FadeEngine;
use crate::store::{DeviceKind, DeviceStore};

pub struct ControlService<'a> {
    store: &'a DeviceStore,
    fades: FadeEngine,
    fade_steps: u16,
    fade_step_interval_ms: u32,
    sink: Option<Box<dyn ChangeSink + Send>>,
    /// Set on every successful mutation; drained by the persistence path.
    dirty: bool,
    last_change_ms: u64,
}

impl<'a> ControlService<'a> {
    pub fn new(store: &'a DeviceStore, config: &SystemConfig) -> Self {
        Self {
            store,
            fades: FadeEngine::new(),
            fade_steps: config.fade_steps,
            fade_step_interval_ms: config.fade_step_interval_ms(),
            sink: None,
            dirty: false,
            last_change_ms: 0,
        }
    }

    /// Register the single change-notification sink.  A second call
    /// replaces the first.
    pub fn register_change_sink(&mut self, sink: Box<dyn ChangeSink + Send>) {
        self.sink = Some(sink);
    }

    /// Request a state change for one channel.
    ///
    /// With `fade` set on a `Dimmable` channel, a ramp towards
    /// `brightness` (or towards 0 when turning off) is started and the
    /// channel is held commanded on until the ramp completes.  Otherwise
    /// the change is applied immediately, cancelling any running ramp.
    pub fn set_device_state(
        &mut self,
        id: usize,
        on: bool,
        brightness: u8,
        fade: bool,
        now_ms: u64,
    ) -> Result<(), ControlError> {
        let device = self
            .store
            .snapshot(id)
            .ok_or(ControlError::InvalidDeviceId)?;
        if device.child_lock {
            return Err(ControlError::Locked);
        }
        if brightness > 100 {
            return Err(ControlError::InvalidArgument);
        }

        debug!(
            "control: set ch{} on={} brightness={} fade={}",
            id, on, brightness, fade
        );

        let written = if fade && device.kind == DeviceKind::Dimmable {
            let target = if on { brightness } else { 0 };
            self.fades
                .begin(id, target, self.fade_steps, self.fade_step_interval_ms, now_ms);
            // Hold the channel on for the whole ramp; the engine snaps the
            // final commanded state on completion.
            self.store.update(id, |dev| {
                if !dev.commanded_on {
                    dev.last_on_ms = now_ms;
                }
                dev.commanded_on = true;
                (dev.commanded_on, dev.brightness)
            })
        } else {
            self.fades.cancel(id);
            self.store
                .apply(id, on, brightness, now_ms)
                .map(|dev| (dev.commanded_on, dev.brightness))
        };

        if let Some((commanded_on, brightness)) = written {
            self.mark_changed(now_ms);
            self.notify(DeviceChange {
                id: id as u8,
                commanded_on,
                brightness,
            });
        }
        Ok(())
    }

    /// Atomic snapshot read of `(commanded_on, brightness)`.
    pub fn get_device_state(&self, id: usize) -> Result<(bool, u8), ControlError> {
        self.store
            .snapshot(id)
            .map(|dev| (dev.commanded_on, dev.brightness))
            .ok_or(ControlError::InvalidDeviceId)
    }

    /// Advance in-progress ramps.  Call from the cooperative loop.
    pub fn process_fades(&mut self, now_ms: u64) {
        let changes = self.fades.poll(self.store, now_ms);
        if !changes.is_empty() {
            self.mark_changed(now_ms);
        }
        for change in changes {
            self.notify(change);
        }
    }

    /// Whether a ramp is running on this channel.
    pub fn fade_active(&self, id: usize) -> bool {
        self.fades.is_active(id)
    }

    /// True (once) when there are unsaved changes and the quiet period has
    /// elapsed.  The caller persists and the dirty flag is cleared.
    pub fn take_persistable(&mut self, now_ms: u64, debounce_ms: u32) -> bool {
        if self.dirty && now_ms.saturating_sub(self.last_change_ms) >= u64::from(debounce_ms) {
            self.dirty = false;
            return true;
        }
        false
    }

    /// True if any change is awaiting persistence (shutdown path).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_changed(&mut self, now_ms: u64) {
        self.dirty = true;
        self.last_change_ms = now_ms;
    }

    fn notify(&mut self, change: DeviceChange) {
        if let Some(sink) = self.sink.as_mut() {
            sink.device_changed(&change);
        }
    }
}
