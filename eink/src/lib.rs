//! Display mode control for the e-ink panel daemon.
//!
//! Mode managers turn app switches, button presses and preference changes
//! into short text commands, which a [`CommandChannel`] carries to the daemon.

pub mod channel;
pub mod command;
pub mod controller;
pub mod opacity;
pub mod prefs;
pub mod refresh;
pub mod temperature;

pub use channel::{
    ChannelCall, ChannelError, CommandChannel, RecordingChannel, UnixSocketChannel, WriterChannel,
};
pub use command::{Command, CommandParseError, MAX_BRIGHTNESS};
pub use controller::DisplayController;
pub use opacity::{AodOpacity, OpacityTable, StaticAodOpacityManager};
pub use prefs::{JsonPreferences, MemoryPreferences, PreferenceError, Preferences};
pub use refresh::{RefreshMode, RefreshModeManager};
pub use temperature::{BrightnessGate, TemperatureMode, TemperatureModeManager};
