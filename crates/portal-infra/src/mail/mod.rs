//! Mail transports: SMTP, a logging sink and an in-memory mailbox.

mod log;
mod memory;
#[cfg(feature = "smtp")]
mod smtp;

pub use self::log::LogMailer;
pub use memory::InMemoryMailbox;
#[cfg(feature = "smtp")]
pub use smtp::{SmtpConfig, SmtpMailer, SmtpSecurity};
