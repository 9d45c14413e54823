use std::sync::Arc;

mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;
pub mod background_task;

pub use domain::{clock, entities, fingerprint, normalize, use_cases, validation};
pub use interfaces::{handlers, repositories, routes};
pub use infrastructure::{db, email, utils, web};

use clock::Clock;
use email::{sender::EmailSender, Mailer};
use errors::EmailError;
use repositories::store::RecordStore;
use use_cases::submission::SubmissionHandler;

pub struct AppState {
    pub submission_handler: AppSubmissionHandler,
    pub store: RecordStore,
    pub allowed_origins: Vec<String>,
    pub trust_x_forwarded_for: bool,
}

pub type AppSubmissionHandler = SubmissionHandler<RecordStore>;

impl AppState {
    pub fn new(
        config: &settings::AppConfig,
        store: RecordStore,
        sender: Arc<dyn EmailSender>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EmailError> {
        let mailer = Mailer::new(&config.email_sender, &config.email_recipient, sender)?;
        let submission_handler =
            SubmissionHandler::new(store.clone(), config.policy(), mailer, clock);

        Ok(AppState {
            submission_handler,
            store,
            allowed_origins: config.allowed_origins(),
            trust_x_forwarded_for: config.trust_x_forwarded_for,
        })
    }
}
