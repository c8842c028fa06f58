pub mod mailer;
pub mod outbox_service;
pub mod templates;

pub use mailer::{Email, Mailer};
pub use outbox_service::spawn_outbox_service;
