//! Console mail service for development. Logs mail to tracing output.

use async_trait::async_trait;
use cardflow_application::MailService;
use cardflow_core::AppResult;
use tracing::info;

/// Development mail service that logs mail to the console.
#[derive(Clone)]
pub struct ConsoleMailService;

impl ConsoleMailService {
    /// Creates a new console mail service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleMailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailService for ConsoleMailService {
    async fn send_mail(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        info!(
            to = to,
            subject = subject,
            "--- MAIL (console) ---\nTo: {}\nSubject: {}\n\n{}\n--- END MAIL ---",
            to,
            subject,
            body
        );

        Ok(())
    }
}
