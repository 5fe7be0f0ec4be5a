use std::fmt::Debug;

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

/// The UI the session runs inside: where notifications show up and where
/// navigation happens. These are the session's only user-visible side effects.
pub trait BrowsingContext: Send + Sync + Debug {
    fn toast(&self, kind: ToastKind, message: &str);
    /// Full navigation away from the current page.
    fn redirect(&self, location: &str);
}

/// Headless context: notifications and navigations go to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBrowsingContext;

impl BrowsingContext for LoggingBrowsingContext {
    fn toast(&self, kind: ToastKind, message: &str) {
        match kind {
            ToastKind::Error => warn!(toast = ?kind, "{}", message),
            _ => info!(toast = ?kind, "{}", message),
        }
    }

    fn redirect(&self, location: &str) {
        warn!(location = %location, "navigating away");
    }
}
