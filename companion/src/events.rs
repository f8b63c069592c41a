//! Line protocol for device events read from stdin.
//!
//! One event per line, a keyword followed by its argument:
//! `app org.koreader`, `refresh speed`, `brightness 0.4`, `quit`.

use eink::opacity::LOCKSCREEN_KEYS;
use eink::refresh::DEFAULT_MODE_KEY;
use eink::{AodOpacity, PreferenceError, Preferences, RefreshMode, TemperatureMode};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Foreground app changed.
    App(String),
    Refresh(RefreshMode),
    Clear,
    Opacity(AodOpacity),
    Reader(ReaderAction),
    Temperature(TemperatureMode),
    Brightness(f32),
    /// White-to-yellow ratio for the slider mode.
    Mix(f32),
    Screen(bool),
    /// Disable or re-enable color temperature control.
    Disable(bool),
    /// Preference written from outside, e.g. a settings screen.
    Pref { key: String, value: String },
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderAction {
    On,
    Off,
    Toggle,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EventError {
    #[error("empty event")]
    Empty,
    #[error("unknown event: {0}")]
    Unknown(String),
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid argument for {event}: {message}")]
    InvalidArgument { event: &'static str, message: String },
}

fn on_off(event: &'static str, value: &str) -> Result<bool, EventError> {
    match value {
        "on" | "1" | "true" => Ok(true),
        "off" | "0" | "false" => Ok(false),
        _ => Err(EventError::InvalidArgument {
            event,
            message: format!("expected on or off, got {}", value),
        }),
    }
}

fn fraction(event: &'static str, value: &str) -> Result<f32, EventError> {
    let parsed: f32 = value.parse().map_err(|_| EventError::InvalidArgument {
        event,
        message: format!("not a number: {}", value),
    })?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err(EventError::InvalidArgument {
            event,
            message: format!("{} is outside 0..1", parsed),
        });
    }
    Ok(parsed)
}

fn invalid(event: &'static str) -> impl FnOnce(String) -> EventError {
    move |message| EventError::InvalidArgument { event, message }
}

/// Parse one event line.
pub fn parse_event(line: &str) -> Result<Event, EventError> {
    let mut parts = line.split_whitespace();
    let keyword = parts.next().ok_or(EventError::Empty)?;
    let mut arg = |event: &'static str| parts.next().ok_or(EventError::MissingArgument(event));

    match keyword {
        "app" => Ok(Event::App(arg("app")?.to_string())),
        "refresh" => Ok(Event::Refresh(arg("refresh")?.parse().map_err(invalid("refresh"))?)),
        "clear" => Ok(Event::Clear),
        "opacity" => Ok(Event::Opacity(arg("opacity")?.parse().map_err(invalid("opacity"))?)),
        "reader" => match arg("reader")? {
            "toggle" => Ok(Event::Reader(ReaderAction::Toggle)),
            value => Ok(Event::Reader(if on_off("reader", value)? {
                ReaderAction::On
            } else {
                ReaderAction::Off
            })),
        },
        "temp" => Ok(Event::Temperature(arg("temp")?.parse().map_err(invalid("temp"))?)),
        "brightness" => Ok(Event::Brightness(fraction("brightness", arg("brightness")?)?)),
        "mix" => Ok(Event::Mix(fraction("mix", arg("mix")?)?)),
        "screen" => Ok(Event::Screen(on_off("screen", arg("screen")?)?)),
        "disable" => Ok(Event::Disable(on_off("disable", arg("disable")?)?)),
        "pref" => {
            let key = arg("pref")?.to_string();
            let value = arg("pref")?.to_string();
            Ok(Event::Pref { key, value })
        }
        "quit" | "exit" => Ok(Event::Quit),
        other => Err(EventError::Unknown(other.to_string())),
    }
}

/// Store a preference given as text, typed the way its readers expect: the
/// lockscreen offsets and the refresh default are strings, everything else
/// is a bool or an int when it parses as one.
pub fn store_preference(
    prefs: &mut impl Preferences,
    key: &str,
    value: &str,
) -> Result<(), PreferenceError> {
    if LOCKSCREEN_KEYS.contains(&key) || key == DEFAULT_MODE_KEY {
        return prefs.put_string(key, value);
    }
    if let Ok(flag) = value.parse::<bool>() {
        return prefs.put_bool(key, flag);
    }
    match value.parse::<i32>() {
        Ok(number) => prefs.put_int(key, number),
        Err(_) => prefs.put_string(key, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eink::MemoryPreferences;

    #[test]
    fn test_parse_events() {
        assert_eq!(
            parse_event("app org.koreader").unwrap(),
            Event::App("org.koreader".to_string())
        );
        assert_eq!(
            parse_event("refresh speed").unwrap(),
            Event::Refresh(RefreshMode::Speed)
        );
        assert_eq!(parse_event("  clear ").unwrap(), Event::Clear);
        assert_eq!(
            parse_event("opacity semiclear").unwrap(),
            Event::Opacity(AodOpacity::SemiClear)
        );
        assert_eq!(
            parse_event("reader toggle").unwrap(),
            Event::Reader(ReaderAction::Toggle)
        );
        assert_eq!(parse_event("reader on").unwrap(), Event::Reader(ReaderAction::On));
        assert_eq!(
            parse_event("temp night").unwrap(),
            Event::Temperature(TemperatureMode::Night)
        );
        assert_eq!(parse_event("brightness 0.5").unwrap(), Event::Brightness(0.5));
        assert_eq!(parse_event("mix 1").unwrap(), Event::Mix(1.0));
        assert_eq!(parse_event("screen off").unwrap(), Event::Screen(false));
        assert_eq!(parse_event("disable on").unwrap(), Event::Disable(true));
        assert_eq!(
            parse_event("pref contrast 3").unwrap(),
            Event::Pref {
                key: "contrast".to_string(),
                value: "3".to_string()
            }
        );
        assert_eq!(parse_event("quit").unwrap(), Event::Quit);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_event("").unwrap_err(), EventError::Empty);
        assert_eq!(
            parse_event("dance").unwrap_err(),
            EventError::Unknown("dance".to_string())
        );
        assert_eq!(
            parse_event("app").unwrap_err(),
            EventError::MissingArgument("app")
        );
        assert!(matches!(
            parse_event("brightness 1.5"),
            Err(EventError::InvalidArgument { event: "brightness", .. })
        ));
        assert!(matches!(
            parse_event("refresh turbo"),
            Err(EventError::InvalidArgument { event: "refresh", .. })
        ));
        assert!(matches!(
            parse_event("screen maybe"),
            Err(EventError::InvalidArgument { event: "screen", .. })
        ));
        assert_eq!(
            parse_event("pref contrast").unwrap_err(),
            EventError::MissingArgument("pref")
        );
    }

    #[test]
    fn test_store_preference_types() {
        let mut prefs = MemoryPreferences::new();
        store_preference(&mut prefs, "static_lockscreen_type", "16").unwrap();
        store_preference(&mut prefs, "refresh_setting", "3").unwrap();
        store_preference(&mut prefs, "disable_perapprefresh", "true").unwrap();
        store_preference(&mut prefs, "contrast", "4").unwrap();
        store_preference(&mut prefs, "note", "hello").unwrap();

        assert_eq!(prefs.get_string("static_lockscreen_type").as_deref(), Some("16"));
        assert_eq!(prefs.get_string("refresh_setting").as_deref(), Some("3"));
        assert_eq!(prefs.get_bool("disable_perapprefresh"), Some(true));
        assert_eq!(prefs.get_int("contrast"), Some(4));
        assert_eq!(prefs.get_string("note").as_deref(), Some("hello"));
    }
}
