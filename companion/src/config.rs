//! Configuration for the HA9 companion runtime.
//!
//! Every tunable has a compile-time default and can be overridden at runtime
//! via a dedicated environment variable. Command line flags take precedence
//! over both.

use std::path::PathBuf;

/// Default game collection asset.
const DEFAULT_GAMES_PATH: &str = "./assets/chessgames.txt";

/// Cache directory below `$HOME` the game asset is re-hosted into.
const DEFAULT_CACHE_DIR: &str = ".cache/ha9-companion";
const DEV_CACHE_DIR: &str = "./cache";

/// Preference file below `$HOME`.
const DEFAULT_PREFS_PATH: &str = ".config/ha9-companion/prefs.json";
const DEV_PREFS_PATH: &str = "./prefs.json";

/// Default interval between two chess moves (in seconds).
const DEFAULT_CHESS_TICK_SECS: u64 = 60;

/// Default time the socket transport keeps retrying its first connect (in seconds).
const DEFAULT_SOCKET_TIMEOUT_SECS: u64 = 5;

/// Default delay between two connect attempts (in milliseconds).
const DEFAULT_SOCKET_POLL_INTERVAL_MS: u64 = 100;

/// Get the path of the game collection asset.
///
/// Priority:
/// 1. `HA9_GAMES_PATH` env variable if set
/// 2. `./assets/chessgames.txt` as fallback
pub fn get_games_path() -> PathBuf {
    if let Ok(path) = std::env::var("HA9_GAMES_PATH") {
        return PathBuf::from(path);
    }

    PathBuf::from(DEFAULT_GAMES_PATH)
}

/// Get the directory the game asset is copied into before sampling.
///
/// Priority:
/// 1. `HA9_CACHE_DIR` env variable if set
/// 2. `$HOME/.cache/ha9-companion` if HOME is set
/// 3. `./cache` as fallback
pub fn get_cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HA9_CACHE_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CACHE_DIR);
    }

    PathBuf::from(DEV_CACHE_DIR)
}

/// Get the JSON preference file.
///
/// Priority:
/// 1. `HA9_PREFS_PATH` env variable if set
/// 2. `$HOME/.config/ha9-companion/prefs.json` if HOME is set
/// 3. `./prefs.json` as fallback
pub fn get_prefs_path() -> PathBuf {
    if let Ok(path) = std::env::var("HA9_PREFS_PATH") {
        return PathBuf::from(path);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_PREFS_PATH);
    }

    PathBuf::from(DEV_PREFS_PATH)
}

/// Get the daemon command socket.
///
/// Returns `None` when `HA9_COMMAND_SOCKET` is unset, in which case commands
/// are written to stdout. A value starting with `@` names an abstract socket.
pub fn get_command_socket() -> Option<PathBuf> {
    std::env::var("HA9_COMMAND_SOCKET").ok().map(PathBuf::from)
}

/// Get the interval between two chess moves in seconds.
///
/// Priority:
/// 1. `HA9_CHESS_TICK_SECS` env variable if set (falls back to default if the
///    value cannot be parsed as a positive `u64`)
/// 2. `60` seconds as fallback
pub fn get_chess_tick_secs() -> u64 {
    if let Ok(secs) = std::env::var("HA9_CHESS_TICK_SECS") {
        return secs
            .parse()
            .ok()
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_CHESS_TICK_SECS);
    }

    DEFAULT_CHESS_TICK_SECS
}

/// Get the directory for daily-rolling log files.
///
/// Returns `None` when `HA9_LOG_DIR` is unset; logs then go to stderr.
pub fn get_log_dir() -> Option<PathBuf> {
    std::env::var("HA9_LOG_DIR").ok().map(PathBuf::from)
}

/// Get how long opening the socket transport keeps retrying, in seconds.
///
/// Priority:
/// 1. `HA9_SOCKET_TIMEOUT_SECS` env variable if set (falls back to default
///    if the value cannot be parsed as a `u64`)
/// 2. `5` seconds as fallback
pub fn get_socket_timeout_secs() -> u64 {
    if let Ok(timeout) = std::env::var("HA9_SOCKET_TIMEOUT_SECS") {
        return timeout.parse().unwrap_or(DEFAULT_SOCKET_TIMEOUT_SECS);
    }

    DEFAULT_SOCKET_TIMEOUT_SECS
}

/// Get the delay between socket connect attempts in milliseconds. Not overridable.
pub fn get_socket_poll_interval_ms() -> u64 {
    DEFAULT_SOCKET_POLL_INTERVAL_MS
}
