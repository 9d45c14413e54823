use std::sync::Arc;

use crate::entities::submission::ProcessedSubmission;
use crate::errors::EmailError;

pub mod sender;
pub mod template;

use sender::{EmailMessage, EmailSender};
use template::EmailTemplates;

/// Renders accepted submissions and hands them to the configured channel.
pub struct Mailer {
    templates: EmailTemplates,
    transport: Arc<dyn EmailSender>,
    from: String,
    to: String,
}

impl Mailer {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        transport: Arc<dyn EmailSender>,
    ) -> Result<Self, EmailError> {
        Ok(Mailer {
            templates: EmailTemplates::new()?,
            transport,
            from: from.into(),
            to: to.into(),
        })
    }

    pub async fn notify(&self, submission: &ProcessedSubmission) -> Result<(), EmailError> {
        let email = self.templates.render(submission)?;

        let message = EmailMessage {
            from: self.from.clone(),
            to: vec![self.to.clone()],
            subject: email.subject,
            html: email.html_body,
            text: email.text_body,
        };

        self.transport.send(&message).await.map_err(|e| {
            tracing::error!(error = %e, hash = %submission.hash, "Error sending email");
            e
        })
    }
}
