//! Platform Bluetooth settings launcher
//!
//! A stack-exhausted scan failure can only be cleared by a manual radio
//! power cycle, and that toggle lives in the platform settings UI.

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
use std::process::Command;

use crate::error::RadioError;

/// Open the system Bluetooth settings page
#[cfg(target_os = "linux")]
pub fn open_bluetooth_settings() -> Result<(), RadioError> {
    let launchers: [(&str, &[&str]); 2] = [
        ("blueman-manager", &[]),
        ("gnome-control-center", &["bluetooth"]),
    ];

    let mut last = String::from("no settings launcher found");
    for (program, args) in launchers {
        match Command::new(program).args(args).spawn() {
            Ok(_) => return Ok(()),
            Err(e) => last = format!("{}: {}", program, e),
        }
    }
    Err(RadioError::SettingsUnavailable(last))
}

/// Open the system Bluetooth settings page
#[cfg(target_os = "macos")]
pub fn open_bluetooth_settings() -> Result<(), RadioError> {
    Command::new("open")
        .arg("x-apple.systempreferences:com.apple.preferences.Bluetooth")
        .spawn()
        .map(|_| ())
        .map_err(|e| RadioError::SettingsUnavailable(e.to_string()))
}

/// Open the system Bluetooth settings page
#[cfg(target_os = "windows")]
pub fn open_bluetooth_settings() -> Result<(), RadioError> {
    Command::new("cmd")
        .args(["/C", "start", "ms-settings:bluetooth"])
        .spawn()
        .map(|_| ())
        .map_err(|e| RadioError::SettingsUnavailable(e.to_string()))
}

/// Open the system Bluetooth settings page
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub fn open_bluetooth_settings() -> Result<(), RadioError> {
    Err(RadioError::SettingsUnavailable(
        "no settings launcher for this platform".to_string(),
    ))
}
