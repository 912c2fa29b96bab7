//! Home-based storage paths under `~/.echoforge/`:
//! - `config.yaml` - user configuration
//! - `captures/` - recorded SSE responses for replay

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

const ECHOFORGE_DIR: &str = ".echoforge";

thread_local! {
    static HOME_OVERRIDE: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
}

/// Returns `~/.echoforge/`, creating it if needed.
pub fn echoforge_home_dir() -> Result<PathBuf> {
    let home = match HOME_OVERRIDE.with(|cell| cell.borrow().clone()) {
        Some(home) => home,
        None => dirs::home_dir().context("Could not determine home directory")?,
    };
    let dir = home.join(ECHOFORGE_DIR);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create echoforge directory: {}", dir.display()))?;
    Ok(dir)
}

/// `~/.echoforge/config.yaml`; the file itself may not exist.
pub fn config_path() -> Result<PathBuf> {
    Ok(echoforge_home_dir()?.join("config.yaml"))
}

/// Returns `~/.echoforge/captures/`, creating it if needed.
pub fn captures_dir() -> Result<PathBuf> {
    let dir = echoforge_home_dir()?.join("captures");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create captures directory: {}", dir.display()))?;
    Ok(dir)
}

/// Restores the real home directory when dropped.
#[cfg(test)]
pub struct TestHomeGuard;

#[cfg(test)]
impl Drop for TestHomeGuard {
    fn drop(&mut self) {
        HOME_OVERRIDE.with(|cell| *cell.borrow_mut() = None);
    }
}

/// Points this thread's home directory at `home` until the guard drops.
#[cfg(test)]
pub fn set_home_for_test(home: PathBuf) -> TestHomeGuard {
    HOME_OVERRIDE.with(|cell| *cell.borrow_mut() = Some(home));
    TestHomeGuard
}
