//! Elevation detection.

/// Check if the current process runs with administrator rights.
///
/// On Windows `net session` only succeeds from an elevated token.
#[cfg(windows)]
pub fn is_elevated() -> bool {
    use std::process::{Command, Stdio};

    Command::new("net")
        .arg("session")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Check if we're running as root
#[cfg(unix)]
pub fn is_elevated() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(any(windows, unix)))]
pub fn is_elevated() -> bool {
    false
}
