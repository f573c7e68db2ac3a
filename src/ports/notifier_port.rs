//! Outbound notification port.

use crate::domain::error::TraderError;

pub trait Notifier {
    fn notify(&self, message: &str) -> Result<(), TraderError>;
}

/// Send a notification, logging and discarding any failure.
pub fn notify_quietly(notifier: &dyn Notifier, message: &str) {
    if let Err(e) = notifier.notify(message) {
        log::warn!("notification failed: {e}");
    }
}
