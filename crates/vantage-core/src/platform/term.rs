//! Terminal geometry and resize notification.
//!
//! The size comes from `TIOCGWINSZ` on stdout, then the `LINES`/`COLUMNS`
//! environment variables, then 24x80.
//!
//! A `SIGWINCH` handler can't safely talk to the engine, so it only raises a
//! flag. The GDB adapter drains the flag at the next prompt and reapplies the
//! width.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use tracing::debug;

const DEFAULT_SIZE: (u16, u16) = (24, 80);

static RESIZE_PENDING: AtomicBool = AtomicBool::new(false);
static HANDLER_INSTALLED: OnceCell<bool> = OnceCell::new();

/// Current terminal size as `(rows, columns)`.
pub fn window_size() -> (u16, u16)
{
    ioctl_window_size()
        .or_else(|| env_window_size(|key| env::var(key).ok()))
        .unwrap_or(DEFAULT_SIZE)
}

/// Size from `LINES`/`COLUMNS` through an arbitrary lookup.
pub fn env_window_size(lookup: impl Fn(&str) -> Option<String>) -> Option<(u16, u16)>
{
    let rows = lookup("LINES")?.trim().parse::<u16>().ok()?;
    let columns = lookup("COLUMNS")?.trim().parse::<u16>().ok()?;
    (rows > 0 && columns > 0).then_some((rows, columns))
}

#[cfg(unix)]
fn ioctl_window_size() -> Option<(u16, u16)>
{
    // SAFETY: winsize is plain old data; all-zero is a valid value.
    let mut size: libc::winsize = unsafe { std::mem::zeroed() };
    // SAFETY: TIOCGWINSZ writes exactly one winsize into `size`.
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut size as *mut libc::winsize) };
    (result == 0 && size.ws_row > 0 && size.ws_col > 0).then_some((size.ws_row, size.ws_col))
}

#[cfg(not(unix))]
fn ioctl_window_size() -> Option<(u16, u16)>
{
    None
}

#[cfg(unix)]
extern "C" fn on_sigwinch(_signal: libc::c_int)
{
    RESIZE_PENDING.store(true, Ordering::SeqCst);
}

/// Install the `SIGWINCH` handler. Only the first call does anything.
pub fn install_resize_handler() -> bool
{
    *HANDLER_INSTALLED.get_or_init(|| {
        #[cfg(unix)]
        {
            let handler = on_sigwinch as extern "C" fn(libc::c_int);
            // SAFETY: the handler only touches an atomic.
            let previous = unsafe { libc::signal(libc::SIGWINCH, handler as libc::sighandler_t) };
            let installed = previous != libc::SIG_ERR;
            debug!(installed, "Installed SIGWINCH handler");
            installed
        }

        #[cfg(not(unix))]
        {
            false
        }
    })
}

/// Mark a resize as pending, as the signal handler does.
pub fn mark_resized()
{
    RESIZE_PENDING.store(true, Ordering::SeqCst);
}

/// Consume the pending-resize flag.
pub fn take_resize() -> bool
{
    RESIZE_PENDING.swap(false, Ordering::SeqCst)
}
