pub mod email;

pub use email::{EmailError, LogMailer, Mailer, OutgoingEmail, SmtpMailer};
