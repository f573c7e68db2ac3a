//! Notifier that writes messages through the logging facade.

use crate::domain::error::TraderError;
use crate::ports::notifier_port::Notifier;

#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    prefix: Option<String>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) -> Result<(), TraderError> {
        match &self.prefix {
            Some(prefix) => log::info!(target: "notify", "[{prefix}] {message}"),
            None => log::info!(target: "notify", "{message}"),
        }
        Ok(())
    }
}
