//! Pass tracing.
//!
//! With [`CaptureConfig::with_pass_tracing`](crate::CaptureConfig::with_pass_tracing)
//! a capture also registers a [`PassTracer`] at every pipeline point before
//! the post-render one. Each logs the pass it sees at `debug` level, which is
//! handy when working out which passes a host runs for a viewport.

use crate::error::PlayblastError;
use crate::host::{FrameCaptureContext, NotificationKey, PassSemantic, RenderNotification};

/// Logs the identifier and semantics of every pass it is notified for.
#[derive(Debug, Clone, Copy)]
pub struct PassTracer {
    semantic: PassSemantic,
}

impl PassTracer {
    /// A tracer for one pipeline point.
    pub fn new(semantic: PassSemantic) -> Self {
        Self { semantic }
    }

    /// Tracers for every pipeline point except the post-render one, keyed
    /// under `prefix`.
    pub fn registrations(prefix: &str) -> Vec<(NotificationKey, Box<dyn RenderNotification>)> {
        PassSemantic::PIPELINE
            .into_iter()
            .filter(|semantic| *semantic != PassSemantic::EndRender)
            .map(|semantic| {
                let key = NotificationKey::new(format!("{prefix}_{semantic}"), semantic);
                let tracer: Box<dyn RenderNotification> = Box::new(PassTracer::new(semantic));
                (key, tracer)
            })
            .collect()
    }
}

impl RenderNotification for PassTracer {
    fn on_frame_rendered(&mut self, context: &mut FrameCaptureContext<'_>) -> Result<(), PlayblastError> {
        let pass = context.pass();
        log::debug!(
            "[{}] frame {} pass {:?} semantics [{}]",
            self.semantic,
            context.current_time(),
            pass.identifier,
            pass.semantics.join(", "),
        );
        Ok(())
    }
}
