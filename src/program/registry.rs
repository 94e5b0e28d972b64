//! Process-wide registry of live drivers.
//!
//! The first registration installs exit hooks: a chained panic hook, an
//! `atexit` handler, and (on unix) handlers for SIGTERM, SIGHUP and SIGQUIT.
//! Each of them restores every live driver's terminal before the process
//! goes away. The last unregistration removes the hooks again. The first
//! driver to register is the primary one.

use std::panic::{self, PanicHookInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
#[cfg(unix)]
use std::sync::Once;

use parking_lot::{Mutex, const_mutex};
use tracing::debug;

use super::output::{Output, Sink};

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Fixed restore sequence for signal context, where no lock can be taken:
/// mouse and paste modes off, SGR reset, cursor on, main buffer.
///
/// It goes to fd 1 whatever modes were entered. Buffered output of live
/// drivers is not flushed on this path, and a driver writing elsewhere
/// gets no restore from it.
pub const SIGNAL_RESTORE: &[u8] =
    b"\x1b[?1000l\x1b[?1002l\x1b[?1003l\x1b[?1006l\x1b[?1015l\x1b[?2004l\x1b[?1004l\x1b[m\x1b[?25h\x1b[?1049l";

/// Set while some driver holds the terminal in raw mode.
pub(crate) static RAW_MODE: AtomicBool = AtomicBool::new(false);

struct Hooks {
    prev_panic: Arc<PanicHook>,
    #[cfg(unix)]
    prev_signals: Vec<(libc::c_int, libc::sighandler_t)>,
}

struct Registry {
    next_id: u64,
    entries: Vec<(u64, Weak<Mutex<Sink>>)>,
    primary: Option<u64>,
    hooks: Option<Hooks>,
}

static REGISTRY: Mutex<Registry> = const_mutex(Registry {
    next_id: 1,
    entries: Vec::new(),
    primary: None,
    hooks: None,
});

#[cfg(unix)]
static ATEXIT: Once = Once::new();

// =============================================================================
// Public API
// =============================================================================

/// Handle returned by [`register`]; pass it back to [`unregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

/// Add a driver's output sink. Installs exit hooks on the first call.
pub fn register(output: &Output) -> InstanceId {
    let mut reg = REGISTRY.lock();
    let id = reg.next_id;
    reg.next_id += 1;
    reg.entries.push((id, output.downgrade()));
    if reg.primary.is_none() {
        reg.primary = Some(id);
    }
    if reg.hooks.is_none() {
        reg.hooks = Some(install_hooks());
    }
    InstanceId(id)
}

/// Remove a driver. Removes exit hooks once none remain.
pub fn unregister(id: InstanceId) {
    let mut reg = REGISTRY.lock();
    reg.entries.retain(|(i, _)| *i != id.0);
    if reg.primary == Some(id.0) {
        reg.primary = reg.entries.first().map(|(i, _)| *i);
    }
    if reg.entries.is_empty() {
        if let Some(hooks) = reg.hooks.take() {
            remove_hooks(hooks);
        }
    }
}

/// Flush every live driver's pending output.
pub fn flush_all() {
    for sink in live_sinks(false) {
        if let Some(mut s) = sink.try_lock() {
            s.flush();
        }
    }
}

/// Mark every driver exiting and write its restore sequence.
pub fn restore_all() {
    for sink in live_sinks(true) {
        if let Some(mut s) = sink.try_lock() {
            s.restore();
        }
    }
    if RAW_MODE.swap(false, Ordering::SeqCst) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

/// Number of live drivers.
pub fn count() -> usize {
    REGISTRY.lock().entries.len()
}

pub fn is_registered(id: InstanceId) -> bool {
    REGISTRY.lock().entries.iter().any(|(i, _)| *i == id.0)
}

/// The first registered driver still alive.
pub fn primary() -> Option<InstanceId> {
    REGISTRY.lock().primary.map(InstanceId)
}

/// Whether the exit hooks are currently installed.
pub fn hooks_installed() -> bool {
    REGISTRY.lock().hooks.is_some()
}

fn live_sinks(exit_path: bool) -> Vec<Arc<Mutex<Sink>>> {
    // The exit path may run while the registry lock is held by the
    // panicking thread, so it must not block.
    let reg = if exit_path { REGISTRY.try_lock() } else { Some(REGISTRY.lock()) };
    match reg {
        Some(reg) => reg.entries.iter().filter_map(|(_, w)| w.upgrade()).collect(),
        None => Vec::new(),
    }
}

// =============================================================================
// Hooks
// =============================================================================

fn install_hooks() -> Hooks {
    let prev: Arc<PanicHook> = Arc::new(panic::take_hook());
    let chained = Arc::clone(&prev);
    panic::set_hook(Box::new(move |info| {
        restore_all();
        chained(info);
    }));

    #[cfg(unix)]
    ATEXIT.call_once(|| {
        // SAFETY: `on_exit` is a plain extern "C" fn with no captured state.
        unsafe {
            libc::atexit(on_exit);
        }
    });

    debug!("installed terminal restore hooks");
    Hooks {
        prev_panic: prev,
        #[cfg(unix)]
        prev_signals: install_signal_handlers(),
    }
}

fn remove_hooks(hooks: Hooks) {
    // Dropping our hook and re-installing the previous one.
    if !std::thread::panicking() {
        let _ = panic::take_hook();
        let prev = hooks.prev_panic;
        panic::set_hook(Box::new(move |info| prev(info)));
    }
    #[cfg(unix)]
    for (sig, handler) in hooks.prev_signals {
        // SAFETY: restoring a handler value previously returned by signal().
        unsafe {
            libc::signal(sig, handler);
        }
    }
    debug!("removed terminal restore hooks");
}

#[cfg(unix)]
extern "C" fn on_exit() {
    // atexit cannot be unregistered; it is a no-op once every driver is gone.
    restore_all();
}

#[cfg(unix)]
fn install_signal_handlers() -> Vec<(libc::c_int, libc::sighandler_t)> {
    [libc::SIGTERM, libc::SIGHUP, libc::SIGQUIT]
        .into_iter()
        .map(|sig| {
            // SAFETY: on_signal only calls async-signal-safe functions.
            let prev = unsafe { libc::signal(sig, on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t) };
            (sig, prev)
        })
        .collect()
}

#[cfg(unix)]
extern "C" fn on_signal(sig: libc::c_int) {
    // SAFETY: write, signal and raise are async-signal-safe.
    unsafe {
        libc::write(1, SIGNAL_RESTORE.as_ptr().cast(), SIGNAL_RESTORE.len());
        libc::signal(sig, libc::SIG_DFL);
        libc::raise(sig);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::output::Capture;

    // Other tests register drivers concurrently, so only assert on our own ids.
    #[test]
    fn lifecycle_primary_and_flush() {
        let cap_a = Capture::new();
        let a = Output::new(cap_a.clone(), true);
        let id_a = register(&a);
        let cap_b = Capture::new();
        let b = Output::new(cap_b.clone(), true);
        let id_b = register(&b);

        assert!(is_registered(id_a) && is_registered(id_b));
        assert!(count() >= 2);
        assert!(hooks_installed());
        assert!(primary().is_some());

        a.write(b"one");
        b.write(b"two");
        flush_all();
        assert_eq!(cap_a.take(), "one");
        assert_eq!(cap_b.take(), "two");

        unregister(id_a);
        assert!(!is_registered(id_a));
        assert_ne!(primary(), Some(id_a));
        unregister(id_b);
        assert!(!is_registered(id_b));
    }

    #[test]
    fn signal_restore_undoes_every_mode() {
        let seq = std::str::from_utf8(SIGNAL_RESTORE).unwrap();
        for mode in ["1000", "1002", "1003", "1006", "1015", "2004", "1004"] {
            assert!(seq.contains(&format!("\x1b[?{mode}l")), "{mode}");
        }
        assert!(seq.contains("\x1b[?25h"));
        assert!(seq.ends_with("\x1b[?1049l"));
    }

    #[test]
    fn dropped_outputs_are_skipped() {
        let id = register(&Output::new(Capture::new(), true));
        flush_all();
        unregister(id);
    }
}
