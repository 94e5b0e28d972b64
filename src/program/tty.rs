//! Raw mode and window size, through crossterm.

use std::sync::atomic::Ordering;

use crossterm::terminal;
use tracing::debug;

use super::registry::RAW_MODE;
use crate::error::Result;

/// Fallback size when the output is not a terminal.
pub const DEFAULT_SIZE: (u16, u16) = (80, 24);

/// Current `(cols, rows)`, or [`DEFAULT_SIZE`] when it cannot be queried.
pub fn size() -> (u16, u16) {
    match terminal::size() {
        Ok((0, _)) | Ok((_, 0)) | Err(_) => DEFAULT_SIZE,
        Ok(s) => s,
    }
}

/// Put the controlling terminal in raw mode.
pub fn enable_raw_mode() -> Result<()> {
    terminal::enable_raw_mode()?;
    RAW_MODE.store(true, Ordering::SeqCst);
    debug!("raw mode on");
    Ok(())
}

/// Leave raw mode if we entered it.
pub fn disable_raw_mode() -> Result<()> {
    if RAW_MODE.swap(false, Ordering::SeqCst) {
        terminal::disable_raw_mode()?;
        debug!("raw mode off");
    }
    Ok(())
}
