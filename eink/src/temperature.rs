//! Front light color temperature: white LED, yellow LED or a mix of both.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::command::{Command, MAX_BRIGHTNESS};

/// Minimum spacing between two brightness updates sent to the LEDs.
pub const BRIGHTNESS_GATE: Duration = Duration::from_millis(100);

/// Delay after which an accepted brightness update should be flushed.
pub const BRIGHTNESS_FLUSH_DELAY: Duration = Duration::from_millis(110);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureMode {
    /// White LED at full brightness under system control, yellow off.
    White,
    /// Yellow LED only; the white LED is zeroed and locked.
    Night,
    /// Both LEDs, mixed by the white-to-yellow ratio. The white LED is locked
    /// and driven through the alternate channel.
    Slider,
    /// Nothing chosen yet. Behaves like `White`.
    None,
}

impl TemperatureMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Night => "night",
            Self::Slider => "slider",
            Self::None => "none",
        }
    }

    /// Whether this mode drives the LEDs itself.
    fn drives_leds(self) -> bool {
        matches!(self, Self::Night | Self::Slider)
    }
}

impl fmt::Display for TemperatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TemperatureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "white" => Ok(Self::White),
            "night" => Ok(Self::Night),
            "slider" => Ok(Self::Slider),
            "none" => Ok(Self::None),
            _ => Err(format!("unknown temperature mode: {}", s)),
        }
    }
}

/// What happened to a brightness update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrightnessGate {
    /// Accepted. The caller must call `flush_brightness` once `after` has elapsed.
    Scheduled { after: Duration },
    /// Arrived inside the gate window of the previous update and was dropped.
    Dropped,
    /// Recorded, but the current mode leaves the LEDs to the system.
    Ignored,
}

fn level(fraction: f32) -> u32 {
    (fraction.clamp(0.0, 1.0) * MAX_BRIGHTNESS as f32) as u32
}

/// Command table for entering a mode.
pub fn mode_commands(mode: TemperatureMode, brightness: f32, white_to_yellow: f32) -> Vec<Command> {
    match mode {
        TemperatureMode::White | TemperatureMode::None => vec![
            Command::UnlockWhite,
            Command::yellow(0),
            Command::white(level(brightness)),
        ],
        TemperatureMode::Night => vec![
            Command::white(0),
            Command::LockWhite,
            Command::yellow(level(brightness)),
        ],
        TemperatureMode::Slider => {
            let mut commands = vec![Command::LockWhite];
            commands.extend(brightness_commands(mode, brightness, white_to_yellow));
            commands
        }
    }
}

/// LED levels for the modes that drive the LEDs themselves.
fn brightness_commands(mode: TemperatureMode, brightness: f32, white_to_yellow: f32) -> Vec<Command> {
    let ratio = white_to_yellow.clamp(0.0, 1.0);
    match mode {
        TemperatureMode::Night => vec![Command::yellow(level(brightness))],
        TemperatureMode::Slider => vec![
            Command::alt_white(level(brightness * (1.0 - ratio))),
            Command::yellow(level(brightness * ratio)),
        ],
        TemperatureMode::White | TemperatureMode::None => Vec::new(),
    }
}

fn screen_off_commands(mode: TemperatureMode) -> Vec<Command> {
    match mode {
        TemperatureMode::Night => vec![Command::yellow(0)],
        TemperatureMode::Slider => vec![Command::yellow(0), Command::alt_white(0)],
        TemperatureMode::White | TemperatureMode::None => Vec::new(),
    }
}

/// Front light state machine.
///
/// Brightness updates are time-gated: an update is accepted only once the
/// window opened by the previous accepted update has passed, and the LEDs
/// are written when the caller flushes after [`BRIGHTNESS_FLUSH_DELAY`].
#[derive(Debug)]
pub struct TemperatureModeManager {
    mode: TemperatureMode,
    brightness: f32,
    white_to_yellow: f32,
    disabled: bool,
    screen_on: bool,
    next_update: Option<Instant>,
}

impl Default for TemperatureModeManager {
    fn default() -> Self {
        Self {
            mode: TemperatureMode::None,
            brightness: 0.0,
            white_to_yellow: 0.5,
            disabled: false,
            screen_on: true,
            next_update: None,
        }
    }
}

impl TemperatureModeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> TemperatureMode {
        self.mode
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn white_to_yellow(&self) -> f32 {
        self.white_to_yellow
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_screen_on(&self) -> bool {
        self.screen_on
    }

    /// Switch modes. Does nothing while disabled or when `mode` is current.
    pub fn set_mode(&mut self, mode: TemperatureMode) -> Vec<Command> {
        if self.disabled {
            tracing::debug!("Temperature control disabled, ignoring {}", mode);
            return Vec::new();
        }
        if mode == self.mode {
            return Vec::new();
        }
        tracing::info!("Temperature mode {} -> {}", self.mode, mode);
        self.apply_mode(mode)
    }

    fn apply_mode(&mut self, mode: TemperatureMode) -> Vec<Command> {
        self.mode = mode;
        mode_commands(mode, self.brightness, self.white_to_yellow)
    }

    /// Disabling forces `White`. Enabling again does not bring back the
    /// previous mode; call `set_mode` for that.
    pub fn set_disabled(&mut self, disabled: bool) -> Vec<Command> {
        self.disabled = disabled;
        if disabled && self.mode != TemperatureMode::White {
            tracing::info!("Temperature control disabled, forcing white");
            return self.apply_mode(TemperatureMode::White);
        }
        Vec::new()
    }

    /// Record a new brightness in `[0, 1]`.
    pub fn set_brightness(&mut self, value: f32, now: Instant) -> BrightnessGate {
        self.brightness = value.clamp(0.0, 1.0);
        self.gate(now)
    }

    /// Record a new white-to-yellow ratio in `[0, 1]`. Only `Slider` uses it.
    pub fn set_white_to_yellow(&mut self, value: f32, now: Instant) -> BrightnessGate {
        self.white_to_yellow = value.clamp(0.0, 1.0);
        if self.mode != TemperatureMode::Slider {
            return BrightnessGate::Ignored;
        }
        self.gate(now)
    }

    fn gate(&mut self, now: Instant) -> BrightnessGate {
        if !self.mode.drives_leds() {
            return BrightnessGate::Ignored;
        }
        if self.next_update.is_some_and(|next| now <= next) {
            tracing::trace!("Brightness update inside gate window, dropped");
            return BrightnessGate::Dropped;
        }
        self.next_update = Some(now + BRIGHTNESS_GATE);
        BrightnessGate::Scheduled {
            after: BRIGHTNESS_FLUSH_DELAY,
        }
    }

    /// LED levels for the current brightness. Empty when the screen is off or
    /// the mode leaves the LEDs to the system.
    pub fn flush_brightness(&self) -> Vec<Command> {
        if !self.screen_on {
            return Vec::new();
        }
        brightness_commands(self.mode, self.brightness, self.white_to_yellow)
    }

    /// Zero the LEDs this manager drives when the screen goes off, and restore
    /// them when it comes back.
    pub fn on_screen_change(&mut self, on: bool) -> Vec<Command> {
        self.screen_on = on;
        if on {
            self.flush_brightness()
        } else {
            screen_off_commands(self.mode)
        }
    }
}
