//! Static always-on-display opacity and reader overlay, remembered per app.
//!
//! The daemon takes a single `stl<N>` value where N is the sum of four
//! offsets: icon opacity, background opacity, lockscreen type and mix color.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::command::Command;
use crate::prefs::Preferences;

pub const ICON_OPACITY_KEY: &str = "static_lockscreen_opacity";
pub const BACKGROUND_OPACITY_KEY: &str = "static_lockscreen_bg_opacity";
pub const LOCKSCREEN_TYPE_KEY: &str = "static_lockscreen_type";
pub const MIX_COLOR_KEY: &str = "static_lockscreen_mix_color";

/// Preferences feeding [`StaticAodOpacityManager::apply_mode`] directly.
pub const LOCKSCREEN_KEYS: [&str; 4] = [
    ICON_OPACITY_KEY,
    BACKGROUND_OPACITY_KEY,
    LOCKSCREEN_TYPE_KEY,
    MIX_COLOR_KEY,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AodOpacity {
    Opaque,
    SemiOpaque,
    SemiClear,
    Clear,
    /// Use the raw lockscreen preferences instead of a preset.
    NotSet,
}

impl AodOpacity {
    pub const ALL: [AodOpacity; 5] = [
        Self::Opaque,
        Self::SemiOpaque,
        Self::SemiClear,
        Self::Clear,
        Self::NotSet,
    ];

    pub fn code(self) -> i32 {
        match self {
            Self::Opaque => 0,
            Self::SemiOpaque => 1,
            Self::SemiClear => 2,
            Self::Clear => 3,
            Self::NotSet => 4,
        }
    }

    /// Unknown codes read as `Opaque`.
    pub fn from_code(code: i32) -> Self {
        Self::ALL
            .into_iter()
            .find(|opacity| opacity.code() == code)
            .unwrap_or(Self::Opaque)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Opaque => "opaque",
            Self::SemiOpaque => "semiopaque",
            Self::SemiClear => "semiclear",
            Self::Clear => "clear",
            Self::NotSet => "notset",
        }
    }
}

impl fmt::Display for AodOpacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AodOpacity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|opacity| opacity.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown opacity: {}", s))
    }
}

/// Device offsets for each opacity preset, plus the pair used in reader mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpacityTable {
    pub icon: Vec<i32>,
    pub background: Vec<i32>,
    pub reader_icon: i32,
    pub reader_background: i32,
}

impl Default for OpacityTable {
    fn default() -> Self {
        Self {
            icon: vec![0, 1, 2, 3],
            background: vec![0, 4, 8, 12],
            reader_icon: 0,
            reader_background: 12,
        }
    }
}

impl OpacityTable {
    /// Icon and background offsets for a preset. Codes past the end of a
    /// table use its last entry.
    fn offsets(&self, opacity: AodOpacity) -> Option<(i32, i32)> {
        let index = usize::try_from(opacity.code()).ok()?;
        let pick = |table: &[i32]| table.get(index.min(table.len().checked_sub(1)?)).copied();
        Some((pick(&self.icon)?, pick(&self.background)?))
    }
}

fn opacity_key(package: &str) -> String {
    format!("aod_opacity:{}", package_key(package))
}

fn reader_key(package: &str) -> String {
    format!("aod_reader:{}", package_key(package))
}

fn package_key(package: &str) -> String {
    if package.starts_with("package:") {
        package.to_string()
    } else {
        format!("package:{}", package)
    }
}

/// Read an integer that the settings screen stores as a string. A missing
/// key counts as zero.
fn read_offset(prefs: &impl Preferences, key: &str) -> Result<i32, std::num::ParseIntError> {
    match prefs.get_string(key) {
        Some(raw) => raw.trim().parse(),
        None => Ok(0),
    }
}

/// Tracks the always-on-display opacity preset and reader overlay of the
/// foreground app.
#[derive(Debug)]
pub struct StaticAodOpacityManager {
    table: OpacityTable,
    current: AodOpacity,
    reader_mode: bool,
    classifier: String,
}

impl Default for StaticAodOpacityManager {
    fn default() -> Self {
        Self::new(OpacityTable::default())
    }
}

impl StaticAodOpacityManager {
    pub fn new(table: OpacityTable) -> Self {
        Self {
            table,
            current: AodOpacity::NotSet,
            reader_mode: false,
            classifier: String::new(),
        }
    }

    pub fn current_opacity(&self) -> AodOpacity {
        self.current
    }

    pub fn reader_mode(&self) -> bool {
        self.reader_mode
    }

    pub fn table(&self) -> &OpacityTable {
        &self.table
    }

    /// Restore the opacity and reader state remembered for `package`.
    pub fn on_app_change(&mut self, package: &str, prefs: &impl Preferences) -> Vec<Command> {
        if package == self.classifier {
            return Vec::new();
        }
        self.classifier = package.to_string();

        let mut commands = Vec::new();
        let opacity = AodOpacity::from_code(
            prefs
                .get_int(&opacity_key(package))
                .unwrap_or(AodOpacity::NotSet.code()),
        );
        if opacity != self.current {
            tracing::info!(package, "AOD opacity -> {}", opacity);
            commands.extend(self.set_opacity(opacity, prefs));
        }

        let reader = prefs.get_bool(&reader_key(package)).unwrap_or(false);
        if reader != self.reader_mode {
            tracing::info!(package, "Reader mode -> {}", reader);
            commands.extend(self.apply_reader_mode(reader, prefs));
        }
        commands
    }

    /// Apply `opacity` and remember it for the current app.
    pub fn change_mode(&mut self, opacity: AodOpacity, prefs: &mut impl Preferences) -> Vec<Command> {
        if opacity == self.current {
            return Vec::new();
        }
        tracing::info!(package = %self.classifier, "AOD opacity changed to {}", opacity);
        let commands = self.set_opacity(opacity, &*prefs);

        let key = opacity_key(&self.classifier);
        if let Err(e) = prefs.put_int(&key, opacity.code()) {
            tracing::warn!("Failed to store opacity under {}: {}", key, e);
        }
        commands
    }

    /// Turn the reader overlay on or off and remember it for the current app.
    pub fn set_reader_mode(&mut self, on: bool, prefs: &mut impl Preferences) -> Vec<Command> {
        if on == self.reader_mode {
            return Vec::new();
        }
        tracing::info!(package = %self.classifier, "Reader mode changed to {}", on);
        let commands = self.apply_reader_mode(on, &*prefs);

        let key = reader_key(&self.classifier);
        if let Err(e) = prefs.put_bool(&key, on) {
            tracing::warn!("Failed to store reader mode under {}: {}", key, e);
        }
        commands
    }

    pub fn toggle_reader_mode(&mut self, prefs: &mut impl Preferences) -> Vec<Command> {
        let on = !self.reader_mode;
        self.set_reader_mode(on, prefs)
    }

    fn set_opacity(&mut self, opacity: AodOpacity, prefs: &impl Preferences) -> Vec<Command> {
        self.current = opacity;
        self.apply_mode(prefs).into_iter().collect()
    }

    fn apply_reader_mode(&mut self, on: bool, prefs: &impl Preferences) -> Vec<Command> {
        self.reader_mode = on;
        let mut commands = vec![Command::ReaderMode(on)];
        commands.extend(self.apply_mode(prefs));
        commands
    }

    /// The composite `stl` command for the current state, or `None` when a
    /// stored offset is not a number.
    pub fn apply_mode(&self, prefs: &impl Preferences) -> Option<Command> {
        match self.composite(prefs) {
            Ok(value) => Some(Command::StaticLockscreen(value)),
            Err(e) => {
                tracing::warn!("Skipping static lockscreen update: {}", e);
                None
            }
        }
    }

    fn composite(&self, prefs: &impl Preferences) -> Result<i32, String> {
        let read = |key: &str| read_offset(prefs, key).map_err(|e| format!("{}: {}", key, e));

        let (icon, background) = if self.reader_mode {
            (self.table.reader_icon, self.table.reader_background)
        } else if self.current == AodOpacity::NotSet {
            (read(ICON_OPACITY_KEY)?, read(BACKGROUND_OPACITY_KEY)?)
        } else {
            self.table
                .offsets(self.current)
                .ok_or_else(|| "empty opacity table".to_string())?
        };
        let lockscreen_type = read(LOCKSCREEN_TYPE_KEY)?;
        let mix = read(MIX_COLOR_KEY)?;

        Ok(icon + background + lockscreen_type + mix)
    }
}
