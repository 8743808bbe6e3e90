#![forbid(unsafe_code)]
//! mailprobe — SMTP mailbox deliverability verification.
//!
//! Resolves a domain's MX hosts and plays a minimal `EHLO`/`MAIL FROM`/
//! `RCPT TO` dialogue against them to decide whether an address will accept
//! mail, without ever sending a message.

pub mod mx;
pub mod verify;

pub use mx::{Error as MxError, MxRecord, MxStatus, check_mx};
pub use verify::{
    MailboxStatus, SmtpReply, Verifier, VerifyError, VerifyOptions, VerifyReport, verify_mailbox,
    verify_mailbox_with_options,
};
