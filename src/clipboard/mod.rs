//! Timed clipboard handoff.
//!
//! [`ClipboardSession::copy`] puts a secret on the clipboard right away
//! and arms a background timer that wipes it after a delay.  A session
//! has a single timer slot: arming a new copy cancels the pending timer
//! first (and waits for it to stop), so an old timer can never clear a
//! newer secret.
//!
//! The timer only clears the clipboard if it still holds the secret it
//! put there; anything the user copied in the meantime is left alone.
//! Reading and clearing are two separate clipboard calls, so another
//! program can still slip in between them.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::errors::{PassVaultError, Result};

/// Default delay before a copied secret is cleared.
pub const DEFAULT_CLEAR_AFTER: Duration = Duration::from_secs(30);

/// Minimal clipboard interface used by [`ClipboardSession`].
pub trait ClipboardBackend: Send {
    /// Replace the clipboard contents with `text`.
    fn set_text(&mut self, text: &str) -> Result<()>;

    /// Current text contents, or `None` if the clipboard holds no text.
    fn get_text(&mut self) -> Result<Option<Zeroizing<String>>>;

    /// Empty the clipboard.
    fn clear(&mut self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// The operating system clipboard.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new()
            .map_err(|e| PassVaultError::Clipboard(format!("clipboard unavailable: {e}")))?;
        Ok(Self { inner })
    }
}

impl ClipboardBackend for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        self.inner
            .set_text(text)
            .map_err(|e| PassVaultError::Clipboard(format!("failed to copy: {e}")))
    }

    fn get_text(&mut self) -> Result<Option<Zeroizing<String>>> {
        match self.inner.get_text() {
            Ok(text) => Ok(Some(Zeroizing::new(text))),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(PassVaultError::Clipboard(format!(
                "failed to read clipboard: {e}"
            ))),
        }
    }

    fn clear(&mut self) -> Result<()> {
        self.inner
            .clear()
            .map_err(|e| PassVaultError::Clipboard(format!("failed to clear: {e}")))
    }
}

/// An in-process clipboard.
///
/// Clones share the same contents, so a caller can keep one handle to
/// observe what a session does with another.  Used by tests and by
/// callers running without a display.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    contents: Option<String>,
    clears: usize,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.state().contents.clone()
    }

    /// Number of times the clipboard has been cleared.
    pub fn clear_count(&self) -> usize {
        self.state().clears
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        self.state().contents = Some(text.to_string());
        Ok(())
    }

    fn get_text(&mut self) -> Result<Option<Zeroizing<String>>> {
        Ok(self.state().contents.clone().map(Zeroizing::new))
    }

    fn clear(&mut self) -> Result<()> {
        let mut state = self.state();
        state.contents = None;
        state.clears += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

type SharedBackend = Arc<Mutex<Box<dyn ClipboardBackend>>>;

/// Cancellation flag shared between a session and its timer thread.
type CancelSignal = Arc<(Mutex<bool>, Condvar)>;

/// The single pending clear timer of a session.
struct ArmedClear {
    secret: Arc<Zeroizing<String>>,
    cancel: CancelSignal,
    handle: JoinHandle<()>,
}

/// Hands secrets to a clipboard and clears them after a delay.
pub struct ClipboardSession {
    backend: SharedBackend,
    armed: Option<ArmedClear>,
}

impl ClipboardSession {
    pub fn new(backend: impl ClipboardBackend + 'static) -> Self {
        Self {
            backend: Arc::new(Mutex::new(Box::new(backend))),
            armed: None,
        }
    }

    /// A session on the operating system clipboard.
    pub fn system() -> Result<Self> {
        Ok(Self::new(SystemClipboard::new()?))
    }

    /// Copy `secret` now and clear it after `clear_after`.
    ///
    /// Returns as soon as the clipboard is set.  Any timer armed by an
    /// earlier `copy` is cancelled before the new one starts.
    pub fn copy(&mut self, secret: &str, clear_after: Duration) -> Result<()> {
        let previous = self.disarm();

        // Bound first so the backend guard is released before any cleanup.
        let copied = lock(&self.backend).set_text(secret);
        if let Err(e) = copied {
            // The superseded secret lost its timer; don't leave it behind.
            if let Some(previous) = previous {
                clear_if_unchanged(&self.backend, &previous);
            }
            return Err(e);
        }

        let secret = Arc::new(Zeroizing::new(secret.to_string()));
        let cancel: CancelSignal = Arc::new((Mutex::new(false), Condvar::new()));

        let task_backend = Arc::clone(&self.backend);
        let task_secret = Arc::clone(&secret);
        let task_cancel = Arc::clone(&cancel);
        let handle = thread::Builder::new()
            .name("passvault-clipboard".into())
            .spawn(move || {
                if wait_for_cancel(&task_cancel, clear_after) {
                    debug!("clipboard clear cancelled");
                    return;
                }
                clear_if_unchanged(&task_backend, &task_secret);
            })?;

        debug!("clipboard clear armed for {clear_after:?}");
        self.armed = Some(ArmedClear {
            secret,
            cancel,
            handle,
        });
        Ok(())
    }

    /// Whether a clear timer is still pending.
    pub fn is_armed(&self) -> bool {
        self.armed
            .as_ref()
            .is_some_and(|armed| !armed.handle.is_finished())
    }

    /// Cancel the pending clear, if any, without touching the clipboard.
    pub fn cancel(&mut self) {
        self.disarm();
    }

    /// Block until the pending clear has run.
    pub fn wait(&mut self) {
        if let Some(armed) = self.armed.take() {
            if armed.handle.join().is_err() {
                warn!("clipboard clear task panicked");
            }
        }
    }

    /// Cancel and join the pending timer, returning the secret it guarded.
    fn disarm(&mut self) -> Option<Arc<Zeroizing<String>>> {
        let armed = self.armed.take()?;
        {
            let (flag, condvar) = &*armed.cancel;
            *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
            condvar.notify_all();
        }
        if armed.handle.join().is_err() {
            warn!("clipboard clear task panicked");
        }
        Some(armed.secret)
    }
}

fn lock(backend: &SharedBackend) -> MutexGuard<'_, Box<dyn ClipboardBackend>> {
    backend.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sleep for `timeout` unless cancelled first.  Returns `true` if cancelled.
fn wait_for_cancel(signal: &CancelSignal, timeout: Duration) -> bool {
    let (flag, condvar) = &**signal;
    let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
    let (cancelled, _) = condvar
        .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
        .unwrap_or_else(PoisonError::into_inner);
    *cancelled
}

/// Clear the clipboard if it still holds `secret`.
///
/// Runs on the timer thread, so failures are logged rather than returned.
fn clear_if_unchanged(backend: &SharedBackend, secret: &str) {
    let mut clipboard = lock(backend);
    let unchanged = match clipboard.get_text() {
        Ok(Some(current)) => bool::from(current.as_bytes().ct_eq(secret.as_bytes())),
        Ok(None) => false,
        Err(e) => {
            warn!("could not read clipboard before clearing: {e}");
            return;
        }
    };

    if !unchanged {
        debug!("clipboard changed since copy, leaving it alone");
        return;
    }
    match clipboard.clear() {
        Ok(()) => debug!("clipboard cleared"),
        Err(e) => warn!("could not clear clipboard: {e}"),
    }
}
