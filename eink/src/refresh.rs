//! Per-app panel refresh speed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::command::Command;
use crate::prefs::Preferences;

/// Classifier shared by every `com.android*` package.
pub const SYSTEM_CLASSIFIER: &str = "android";

/// Preference: when true, one refresh mode is remembered for all apps.
pub const DISABLE_PER_APP_KEY: &str = "disable_perapprefresh";

/// Preference: global default mode code, stored as a string.
pub const DEFAULT_MODE_KEY: &str = "refresh_setting";

const DEFAULT_MODE_CODE: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefreshMode {
    Clear,
    Balanced,
    Smooth,
    Speed,
}

impl RefreshMode {
    pub const ALL: [RefreshMode; 4] = [Self::Clear, Self::Balanced, Self::Smooth, Self::Speed];

    /// Code used in preferences.
    pub fn code(self) -> i32 {
        match self {
            Self::Clear => 0,
            Self::Balanced => 1,
            Self::Smooth => 2,
            Self::Speed => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.code() == code)
    }

    pub fn wire(self) -> &'static str {
        match self {
            Self::Clear => "c",
            Self::Balanced => "b",
            Self::Smooth => "s",
            Self::Speed => "p",
        }
    }

    pub fn from_wire(wire: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.wire() == wire)
    }

    pub fn command(self) -> Command {
        Command::RefreshSpeed(self)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Balanced => "balanced",
            Self::Smooth => "smooth",
            Self::Speed => "speed",
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown refresh mode: {}", s))
    }
}

/// Map a package name to the classifier its refresh mode is stored under.
pub fn classify(package: &str) -> &str {
    if package.starts_with("com.android") {
        SYSTEM_CLASSIFIER
    } else {
        package
    }
}

/// Preference key for a classifier. All apps share `package:None` when
/// per-app memory is off.
pub fn preference_key(classifier: &str, per_app: bool) -> String {
    if !per_app {
        return "package:None".to_string();
    }
    if classifier.starts_with("package:") {
        classifier.to_string()
    } else {
        format!("package:{}", classifier)
    }
}

fn per_app_enabled(prefs: &impl Preferences) -> bool {
    !prefs.get_bool(DISABLE_PER_APP_KEY).unwrap_or(false)
}

fn default_mode_code(prefs: &impl Preferences) -> i32 {
    let Some(raw) = prefs.get_string(DEFAULT_MODE_KEY) else {
        return DEFAULT_MODE_CODE;
    };
    raw.trim().parse().unwrap_or_else(|e| {
        tracing::warn!("Ignoring malformed {} {:?}: {}", DEFAULT_MODE_KEY, raw, e);
        DEFAULT_MODE_CODE
    })
}

/// Tracks the refresh mode of the foreground app.
///
/// No mode is applied until the first app change or explicit mode change.
#[derive(Debug, Default)]
pub struct RefreshModeManager {
    current: Option<RefreshMode>,
    classifier: String,
}

impl RefreshModeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_mode(&self) -> Option<RefreshMode> {
        self.current
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    /// Switch to the mode remembered for `package`, falling back to the
    /// global default. Returns the commands to send, empty when nothing changes.
    pub fn on_app_change(&mut self, package: &str, prefs: &impl Preferences) -> Vec<Command> {
        let classifier = classify(package);
        if classifier == self.classifier {
            return Vec::new();
        }
        self.classifier = classifier.to_string();

        let key = preference_key(classifier, per_app_enabled(prefs));
        let code = prefs
            .get_int(&key)
            .unwrap_or_else(|| default_mode_code(prefs));
        let Some(mode) = RefreshMode::from_code(code) else {
            tracing::warn!("Unknown refresh mode code {} under {}", code, key);
            return Vec::new();
        };

        if self.current == Some(mode) {
            return Vec::new();
        }
        tracing::info!(classifier = %self.classifier, "Refresh mode -> {}", mode);
        self.set_mode(mode)
    }

    /// Apply `mode` and remember it for the current classifier.
    pub fn change_mode(&mut self, mode: RefreshMode, prefs: &mut impl Preferences) -> Vec<Command> {
        if self.current == Some(mode) {
            return Vec::new();
        }
        tracing::info!(classifier = %self.classifier, "Refresh mode changed to {}", mode);
        let commands = self.set_mode(mode);

        let key = preference_key(&self.classifier, per_app_enabled(&*prefs));
        if let Err(e) = prefs.put_int(&key, mode.code()) {
            tracing::warn!("Failed to store refresh mode under {}: {}", key, e);
        }
        commands
    }

    fn set_mode(&mut self, mode: RefreshMode) -> Vec<Command> {
        self.current = Some(mode);
        vec![mode.command()]
    }
}
