/*!
This module defines some macros and some global mutable state.

This state is responsible for keeping track of whether we should emit
certain kinds of messages to the user (such as errors) that are distinct
from the standard "debug" or "trace" log messages. This state is set
once during CLI argument parsing and never changed after.

The other state tracked here is whether binfind experienced an error
condition. Aside from errors reported on invalid CLI arguments, binfind
generally does not abort when an error occurs (e.g., if reading one
origin in a directory walk failed). But when an error does occur, it
alters binfind's exit status. Namely, when an error message is emitted
via `err_message`, a global flag is toggled indicating that at least one
error occurred. When binfind exits, this flag is consulted to determine
what the exit status ought to be.
*/

use std::sync::atomic::{AtomicBool, Ordering};

/// When false, "messages" will not be printed.
static MESSAGES: AtomicBool = AtomicBool::new(false);
/// Flipped to true when an error message is printed.
static ERRORED: AtomicBool = AtomicBool::new(false);

/// Like eprintln, but locks stdout to prevent interleaving lines.
///
/// This locks stdout, not stderr, even though this prints to stderr.
/// This avoids the appearance of interleaved output when stdout and
/// stderr both correspond to a tty, since the printers write results to
/// the same stdout lock.
#[macro_export]
macro_rules! eprintln_locked {
    ($($tt:tt)*) => {{
        {
            use std::io::Write;

            let stdout = std::io::stdout().lock();
            let mut stderr = std::io::stderr().lock();
            // We specifically ignore any errors here. One plausible
            // error we can get in some cases is a broken pipe. And when
            // that happens, we should exit gracefully. Otherwise, just
            // abort with an error code because there isn't much else we
            // can do.
            if let Err(err) = write!(stderr, "binfind: ") {
                if err.kind() == std::io::ErrorKind::BrokenPipe {
                    std::process::exit(0);
                } else {
                    std::process::exit(2);
                }
            }
            if let Err(err) = writeln!(stderr, $($tt)*) {
                if err.kind() == std::io::ErrorKind::BrokenPipe {
                    std::process::exit(0);
                } else {
                    std::process::exit(2);
                }
            }
            drop(stdout);
        }
    }}
}

/// Emit a non-fatal error message, unless messages were disabled.
#[macro_export]
macro_rules! message {
    ($($tt:tt)*) => {
        if crate::messages::messages() {
            eprintln_locked!($($tt)*);
        }
    }
}

/// Like message, but sets binfind's "errored" flag, which controls the
/// exit status.
#[macro_export]
macro_rules! err_message {
    ($($tt:tt)*) => {
        crate::messages::set_errored();
        message!($($tt)*);
    }
}

/// Returns true if and only if messages should be shown.
pub(crate) fn messages() -> bool {
    MESSAGES.load(Ordering::Relaxed)
}

/// Set whether messages should be shown or not.
///
/// By default, they are not shown.
pub(crate) fn set_messages(yes: bool) {
    MESSAGES.store(yes, Ordering::Relaxed)
}

/// Returns true if and only if binfind came across a non-fatal error.
pub(crate) fn errored() -> bool {
    ERRORED.load(Ordering::Relaxed)
}

/// Indicate that binfind has come across a non-fatal error.
///
/// Callers should not use this directly. Instead, it is called
/// automatically via the `err_message` macro.
pub(crate) fn set_errored() {
    ERRORED.store(true, Ordering::Relaxed);
}
