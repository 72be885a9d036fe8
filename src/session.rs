//! Borrowed render state for the lifetime of a capture.
//!
//! A [`CaptureSession`] is created by arming a host: it registers the
//! capture's notifications and applies the transient overrides (output
//! size, on-screen presentation, viewport color management). Dropping the
//! session removes the notifications and puts every override back to the
//! value it had before arming, whichever way the capture ended.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::PlayblastError;
use crate::host::{NotificationKey, RenderHost, RenderNotification};

/// Where a capture is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    /// Nothing registered, no overrides applied.
    Idle,
    /// Notifications registered, overrides applied.
    Armed,
    /// Frames are being redrawn.
    Looping,
    /// Notifications are being removed and overrides restored.
    Draining,
}

impl Display for CapturePhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            CapturePhase::Idle => "idle",
            CapturePhase::Armed => "armed",
            CapturePhase::Looping => "looping",
            CapturePhase::Draining => "draining",
        })
    }
}

/// Render state a session overrides, captured before arming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SavedState {
    size_override: Option<(u32, u32)>,
    present_on_screen: bool,
    color_management: bool,
}

/// Overrides a session applies while armed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOverrides {
    /// Output size to force, if any.
    pub size: Option<(u32, u32)>,
    /// Turn viewport color management off.
    pub disable_color_management: bool,
}

/// An armed capture. See the [module documentation](self).
pub struct CaptureSession<'h, H: RenderHost + ?Sized> {
    host: &'h mut H,
    registered: Vec<NotificationKey>,
    saved: SavedState,
    size_applied: bool,
    color_management_applied: bool,
    phase: CapturePhase,
}

impl<'h, H: RenderHost + ?Sized> CaptureSession<'h, H> {
    /// Register `notifications` and apply `overrides`.
    ///
    /// On-screen presentation is always turned off while armed.
    ///
    /// # Errors
    ///
    /// Returns [`PlayblastError::CaptureInProgress`] without touching the
    /// host if any of the keys is already registered. If the host refuses a
    /// registration, the ones that succeeded are removed again before the
    /// error is returned.
    pub fn arm(
        host: &'h mut H,
        notifications: Vec<(NotificationKey, Box<dyn RenderNotification>)>,
        overrides: SessionOverrides,
    ) -> Result<Self, PlayblastError> {
        if let Some((key, _)) = notifications.iter().find(|(key, _)| host.has_notification(key)) {
            return Err(PlayblastError::CaptureInProgress {
                notification: key.name.clone(),
            });
        }

        let saved = SavedState {
            size_override: host.output_size_override(),
            present_on_screen: host.present_on_screen(),
            color_management: host.color_management_enabled(),
        };

        let mut session = Self {
            host,
            registered: Vec::with_capacity(notifications.len()),
            saved,
            size_applied: false,
            color_management_applied: false,
            phase: CapturePhase::Idle,
        };

        for (key, handler) in notifications {
            session.host.add_notification(key.clone(), handler)?;
            log::debug!("Registered notification {key}");
            session.registered.push(key);
        }

        if let Some((width, height)) = overrides.size {
            session.host.set_output_size_override(width, height);
            session.size_applied = true;
            log::debug!("Output size override set to {width}x{height}");
        }

        session.host.set_present_on_screen(false);

        if overrides.disable_color_management {
            session.host.set_color_management_enabled(false);
            session.color_management_applied = true;
        }

        session.transition(CapturePhase::Armed);
        Ok(session)
    }

    /// Mark the start of the frame loop.
    pub fn begin_looping(&mut self) {
        self.transition(CapturePhase::Looping);
    }

    /// Current phase.
    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    /// The armed host.
    pub fn host(&mut self) -> &mut H {
        &mut *self.host
    }

    fn transition(&mut self, phase: CapturePhase) {
        log::debug!("Capture session {} -> {}", self.phase, phase);
        self.phase = phase;
    }
}

impl<H: RenderHost + ?Sized> Drop for CaptureSession<'_, H> {
    fn drop(&mut self) {
        self.transition(CapturePhase::Draining);

        for key in self.registered.drain(..).rev() {
            if !self.host.remove_notification(&key) {
                log::warn!("Notification {key} was already removed");
            }
        }

        if self.size_applied {
            match self.saved.size_override {
                Some((width, height)) => self.host.set_output_size_override(width, height),
                None => self.host.unset_output_size_override(),
            }
        }

        self.host.set_present_on_screen(self.saved.present_on_screen);

        if self.color_management_applied {
            self.host.set_color_management_enabled(self.saved.color_management);
        }

        self.transition(CapturePhase::Idle);
    }
}
