//! # RAII Selection Guards
//!
//! GDB evaluates many things relative to the *selected* thread and frame.
//! Operations on a specific handle therefore have to select it first, and
//! must put the user's selection back afterwards, whether or not the
//! operation succeeded.
//!
//! ## Guards
//!
//! - **ThreadSelectionGuard**: switches to a thread, switches back (thread and
//!   frame) on drop
//! - **FrameSelectionGuard**: selects a frame, reselects the previous one on drop
//!
//! Nothing is switched (and nothing restored) when the target is already
//! selected.

use tracing::warn;

use super::engine::{GdbEngine, NativeFrame, NativeThread};
use crate::error::Result;

/// RAII guard that selects a thread and restores the previous thread and
/// frame when dropped.
///
/// Switching threads makes GDB select the innermost frame of the new thread,
/// so the frame the user had selected is saved alongside the thread and
/// reselected after switching back.
pub struct ThreadSelectionGuard<'a>
{
    engine: &'a dyn GdbEngine,
    previous: Option<(NativeThread, Option<NativeFrame>)>,
}

impl<'a> ThreadSelectionGuard<'a>
{
    /// Make `target` the selected thread.
    ///
    /// ## Errors
    ///
    /// Whatever the engine reports when switching fails (e.g. the thread has
    /// exited). Nothing is restored in that case since nothing changed.
    pub fn switch(engine: &'a dyn GdbEngine, target: NativeThread) -> Result<Self>
    {
        let current = engine.selected_thread();
        let previous = match current {
            Some(thread) if thread == target => None,
            _ => {
                let frame = engine.selected_frame().ok();
                engine.switch_thread(target)?;
                current.map(|thread| (thread, frame))
            }
        };
        Ok(Self { engine, previous })
    }

    fn switch_back(engine: &dyn GdbEngine, thread: NativeThread, frame: Option<NativeFrame>) -> Result<()>
    {
        engine.switch_thread(thread)?;
        match frame {
            Some(frame) => engine.select_frame(frame),
            None => Ok(()),
        }
    }

    /// Restore the previous selection now, reporting failure.
    pub fn restore(mut self) -> Result<()>
    {
        match self.previous.take() {
            Some((thread, frame)) => Self::switch_back(self.engine, thread, frame),
            None => Ok(()),
        }
    }
}

impl Drop for ThreadSelectionGuard<'_>
{
    fn drop(&mut self)
    {
        if let Some((thread, frame)) = self.previous.take() {
            // Best effort: the thread may have exited meanwhile
            if let Err(error) = Self::switch_back(self.engine, thread, frame) {
                warn!(thread = thread.0, %error, "Failed to restore selected thread");
            }
        }
    }
}

/// RAII guard that selects a frame and restores the previous selection when
/// dropped.
pub struct FrameSelectionGuard<'a>
{
    engine: &'a dyn GdbEngine,
    previous: Option<NativeFrame>,
}

impl<'a> FrameSelectionGuard<'a>
{
    /// Make `target` the selected frame.
    pub fn select(engine: &'a dyn GdbEngine, target: NativeFrame) -> Result<Self>
    {
        let current = engine.selected_frame().ok();
        let previous = if current == Some(target) {
            None
        } else {
            engine.select_frame(target)?;
            current
        };
        Ok(Self { engine, previous })
    }

    /// Restore the previous selection now, reporting failure.
    pub fn restore(mut self) -> Result<()>
    {
        match self.previous.take() {
            Some(previous) => self.engine.select_frame(previous),
            None => Ok(()),
        }
    }
}

impl Drop for FrameSelectionGuard<'_>
{
    fn drop(&mut self)
    {
        if let Some(previous) = self.previous.take() {
            if let Err(error) = self.engine.select_frame(previous) {
                warn!(frame = previous.0, %error, "Failed to restore selected frame");
            }
        }
    }
}
