//! Routes device events through the mode managers and onto the channel.

use std::time::Instant;

use crate::channel::CommandChannel;
use crate::command::Command;
use crate::opacity::{AodOpacity, OpacityTable, StaticAodOpacityManager, LOCKSCREEN_KEYS};
use crate::prefs::Preferences;
use crate::refresh::{RefreshMode, RefreshModeManager};
use crate::temperature::{BrightnessGate, TemperatureMode, TemperatureModeManager};

pub const BLACK_THRESHOLD_KEY: &str = "black_threshold";
pub const WHITE_THRESHOLD_KEY: &str = "white_threshold";
pub const CONTRAST_KEY: &str = "contrast";

/// Owns the command channel, the preference store and the three mode
/// managers. Transport failures are logged and dropped here so they never
/// reach the managers.
pub struct DisplayController<C, P> {
    channel: C,
    prefs: P,
    refresh: RefreshModeManager,
    opacity: StaticAodOpacityManager,
    temperature: TemperatureModeManager,
}

impl<C: CommandChannel, P: Preferences> DisplayController<C, P> {
    pub fn new(channel: C, prefs: P) -> Self {
        Self::with_opacity_table(channel, prefs, OpacityTable::default())
    }

    pub fn with_opacity_table(channel: C, prefs: P, table: OpacityTable) -> Self {
        Self {
            channel,
            prefs,
            refresh: RefreshModeManager::new(),
            opacity: StaticAodOpacityManager::new(table),
            temperature: TemperatureModeManager::new(),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn prefs(&self) -> &P {
        &self.prefs
    }

    pub fn refresh(&self) -> &RefreshModeManager {
        &self.refresh
    }

    pub fn opacity(&self) -> &StaticAodOpacityManager {
        &self.opacity
    }

    pub fn temperature(&self) -> &TemperatureModeManager {
        &self.temperature
    }

    fn dispatch(&mut self, commands: Vec<Command>) {
        if commands.is_empty() {
            return;
        }
        tracing::debug!(
            "Sending {}",
            commands
                .iter()
                .map(Command::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        );
        if let Err(e) = self.channel.send(&commands) {
            tracing::warn!("Command channel failed: {}", e);
        }
    }

    /// A new app came to the foreground.
    pub fn on_app_change(&mut self, package: &str) {
        let mut commands = self.refresh.on_app_change(package, &self.prefs);
        commands.extend(self.opacity.on_app_change(package, &self.prefs));
        self.dispatch(commands);
    }

    pub fn change_refresh_mode(&mut self, mode: RefreshMode) {
        let commands = self.refresh.change_mode(mode, &mut self.prefs);
        self.dispatch(commands);
    }

    pub fn change_opacity(&mut self, opacity: AodOpacity) {
        let commands = self.opacity.change_mode(opacity, &mut self.prefs);
        self.dispatch(commands);
    }

    pub fn set_reader_mode(&mut self, on: bool) {
        let commands = self.opacity.set_reader_mode(on, &mut self.prefs);
        self.dispatch(commands);
    }

    pub fn toggle_reader_mode(&mut self) {
        let commands = self.opacity.toggle_reader_mode(&mut self.prefs);
        self.dispatch(commands);
    }

    pub fn set_temperature_mode(&mut self, mode: TemperatureMode) {
        let commands = self.temperature.set_mode(mode);
        self.dispatch(commands);
    }

    pub fn set_temperature_disabled(&mut self, disabled: bool) {
        let commands = self.temperature.set_disabled(disabled);
        self.dispatch(commands);
    }

    /// Returns whether, and when, the caller must call [`Self::flush_brightness`].
    pub fn set_brightness(&mut self, value: f32, now: Instant) -> BrightnessGate {
        self.temperature.set_brightness(value, now)
    }

    pub fn set_white_to_yellow(&mut self, value: f32, now: Instant) -> BrightnessGate {
        self.temperature.set_white_to_yellow(value, now)
    }

    pub fn flush_brightness(&mut self) {
        let commands = self.temperature.flush_brightness();
        self.dispatch(commands);
    }

    pub fn on_screen_change(&mut self, on: bool) {
        let commands = self.temperature.on_screen_change(on);
        self.dispatch(commands);
    }

    pub fn force_clear(&mut self) {
        tracing::info!("Forcing full panel clear");
        self.dispatch(vec![Command::ForceClear]);
    }

    /// Send the panel threshold and contrast settings that are configured.
    pub fn apply_panel_tuning(&mut self) {
        let mut commands = Vec::new();
        let tuning: [(&str, fn(u32) -> Command); 3] = [
            (BLACK_THRESHOLD_KEY, Command::BlackThreshold),
            (WHITE_THRESHOLD_KEY, Command::WhiteThreshold),
            (CONTRAST_KEY, Command::Contrast),
        ];
        for (key, build) in tuning {
            match self.prefs.get_int(key).map(u32::try_from) {
                Some(Ok(value)) => commands.push(build(value)),
                Some(Err(_)) => tracing::warn!("Ignoring negative {}", key),
                None => {}
            }
        }
        self.dispatch(commands);
    }

    /// React to a preference written from outside the managers.
    pub fn on_preference_changed(&mut self, key: &str) {
        if LOCKSCREEN_KEYS.contains(&key) {
            let command = self.opacity.apply_mode(&self.prefs);
            self.dispatch(command.into_iter().collect());
        } else if [BLACK_THRESHOLD_KEY, WHITE_THRESHOLD_KEY, CONTRAST_KEY].contains(&key) {
            self.apply_panel_tuning();
        }
    }

    pub fn prefs_mut(&mut self) -> &mut P {
        &mut self.prefs
    }

    /// Close the channel and hand it back.
    pub fn shutdown(mut self) -> C {
        if let Err(e) = self.channel.close() {
            tracing::warn!("Failed to close command channel: {}", e);
        }
        self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelCall, RecordingChannel};
    use crate::prefs::MemoryPreferences;

    fn controller(prefs: MemoryPreferences) -> DisplayController<RecordingChannel, MemoryPreferences> {
        DisplayController::new(RecordingChannel::new(), prefs)
    }

    #[test]
    fn test_app_change_batches_both_managers() {
        let prefs = MemoryPreferences::new().with_int("aod_opacity:package:pkg.a", 1);
        let mut controller = controller(prefs);
        controller.on_app_change("pkg.a");

        assert_eq!(
            controller.channel().calls(),
            &[ChannelCall::Send(vec![
                Command::RefreshSpeed(RefreshMode::Smooth),
                Command::StaticLockscreen(1 + 4),
            ])]
        );
    }

    #[test]
    fn test_empty_batches_are_not_sent() {
        let mut controller = controller(MemoryPreferences::new());
        controller.flush_brightness();
        controller.set_temperature_disabled(false);
        assert!(controller.channel().calls().is_empty());
    }

    #[test]
    fn test_failing_channel_does_not_disturb_state() {
        let channel = RecordingChannel::new().failing();
        let mut controller = DisplayController::new(channel, MemoryPreferences::new());
        controller.on_app_change("pkg.a");
        controller.change_refresh_mode(RefreshMode::Clear);

        assert_eq!(controller.refresh().current_mode(), Some(RefreshMode::Clear));
        assert_eq!(controller.prefs().get_int("package:pkg.a"), Some(0));
        assert_eq!(controller.channel().calls().len(), 2);
    }

    #[test]
    fn test_panel_tuning_sends_configured_values_only() {
        let prefs = MemoryPreferences::new()
            .with_int(BLACK_THRESHOLD_KEY, 4)
            .with_int(CONTRAST_KEY, 2)
            .with_int(WHITE_THRESHOLD_KEY, -1);
        let mut controller = controller(prefs);
        controller.apply_panel_tuning();
        assert_eq!(controller.channel().sent_wire(), vec!["stb4", "sco2"]);
    }

    #[test]
    fn test_lockscreen_preference_change_reapplies() {
        let mut controller = controller(MemoryPreferences::new());
        controller
            .prefs_mut()
            .put_string(crate::opacity::LOCKSCREEN_TYPE_KEY, "32")
            .unwrap();
        controller.on_preference_changed(crate::opacity::LOCKSCREEN_TYPE_KEY);
        controller.on_preference_changed("unrelated");
        assert_eq!(controller.channel().sent_wire(), vec!["stl32"]);
    }

    #[test]
    fn test_shutdown_closes_channel() {
        let mut controller = controller(MemoryPreferences::new());
        controller.force_clear();
        let channel = controller.shutdown();
        assert_eq!(
            channel.calls(),
            &[ChannelCall::Send(vec![Command::ForceClear]), ChannelCall::Close]
        );
    }
}
