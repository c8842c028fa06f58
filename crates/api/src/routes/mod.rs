pub mod accounts;
pub mod notifications;
