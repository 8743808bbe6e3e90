//! Mailbox deliverability verification over live SMTP dialogues.
//!
//! The public entry point is [`verify_mailbox`], which resolves the MX
//! hosts of the address's domain, dials them in preference order, and
//! classifies the server's `RCPT TO` reply. Transient outcomes are retried
//! with jittered backoff; definitive ones are returned immediately.

mod classify;
mod error;
mod options;
mod reply;
mod session;
mod types;

pub use error::VerifyError;
pub use options::VerifyOptions;
pub use reply::SmtpReply;
pub use types::{MailboxStatus, VerifyReport};

use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, warn};
use trust_dns_resolver::Resolver;

use crate::mx::{
    Error as MxError, MxStatus,
    resolver::{self, LookupMx},
};

use classify::{Classification, classify};
use error::SessionError;
use session::{SessionVerdict, SmtpSession};

/// `mx_server` value when the domain has no mail route.
const NO_MX_HOST: &str = "No MX";
/// `mx_server` value when no host was ever dialed.
const NO_HOST: &str = "error";

/// Verifies `email` with [`VerifyOptions::default`].
pub fn verify_mailbox(email: &str) -> Result<VerifyReport, VerifyError> {
    verify_mailbox_with_options(email, &VerifyOptions::default())
}

/// Identical to [`verify_mailbox`], but allows tweaking timeouts, the
/// EHLO identity, retry pacing and other probing details.
pub fn verify_mailbox_with_options(
    email: &str,
    options: &VerifyOptions,
) -> Result<VerifyReport, VerifyError> {
    let verifier = Verifier::new(options.clone())?;
    Ok(verifier.verify(email))
}

/// Reusable verifier holding one system resolver. Verifications are
/// independent of each other; a `Verifier` may be shared across threads.
pub struct Verifier {
    options: VerifyOptions,
    resolver: Resolver,
}

impl Verifier {
    /// The only fallible step: reading the system resolver configuration.
    pub fn new(options: VerifyOptions) -> Result<Self, VerifyError> {
        let resolver = Resolver::from_system_conf().map_err(MxError::resolver_init)?;
        Ok(Self { options, resolver })
    }

    /// Total over its input: every outcome, including internal failures,
    /// becomes a [`VerifyReport`].
    pub fn verify(&self, email: &str) -> VerifyReport {
        verify_with_resolver(email, &self.options, &self.resolver)
    }
}

pub(crate) fn verify_with_resolver<R: LookupMx>(
    email: &str,
    options: &VerifyOptions,
    resolver: &R,
) -> VerifyReport {
    let started = Instant::now();
    let max_attempts = options.max_attempts.max(1);

    let Some(domain) = extract_domain(email) else {
        debug!(email, "rejected: not of the form local@domain");
        return VerifyReport {
            email: email.to_string(),
            status: MailboxStatus::Unknown,
            smtp_code: 0,
            mx_server: NO_HOST.to_string(),
            attempts: 1,
            is_catch_all: false,
            is_temporary_error: false,
            reason: "Invalid email format".to_string(),
            time_taken_ms: elapsed_ms(started),
        };
    };

    let records = match resolver::resolve_with(resolver, &domain) {
        MxStatus::Records(records) => records,
        MxStatus::NoRecords => {
            debug!(%domain, "no mail route");
            return VerifyReport {
                email: email.to_string(),
                status: MailboxStatus::Invalid,
                smtp_code: 550,
                mx_server: NO_MX_HOST.to_string(),
                attempts: 1,
                is_catch_all: false,
                is_temporary_error: false,
                reason: "No MX records found".to_string(),
                time_taken_ms: elapsed_ms(started),
            };
        }
    };

    let mut last_report = None;

    for attempt in 1..=max_attempts {
        if options.is_cancelled() {
            return cancelled_report(email, started, attempt);
        }
        if attempt > 1 {
            let delay = jittered_backoff(options, attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off before retry");
            thread::sleep(delay);
        }

        let mut verdict: Option<(SessionVerdict, String)> = None;
        let mut last_failure: Option<(SessionError, String)> = None;
        for record in &records {
            if options.is_cancelled() {
                return cancelled_report(email, started, attempt);
            }
            match SmtpSession::run(&record.exchange, email, options) {
                Ok(outcome) => {
                    verdict = Some((outcome, record.exchange.clone()));
                    break;
                }
                Err(err) => {
                    warn!(host = %record.exchange, attempt, error = %err, "session failed");
                    last_failure = Some((err, record.exchange.clone()));
                }
            }
        }

        let current = match verdict {
            Some((outcome, host)) => {
                let classification = classify(&outcome);
                classified_report(
                    email,
                    classification,
                    outcome.reply.code,
                    &host,
                    attempt,
                    started,
                )
            }
            None => match last_failure {
                // Every host failed with a network error this round.
                Some((err, host)) => VerifyReport {
                    email: email.to_string(),
                    status: MailboxStatus::Unknown,
                    smtp_code: 0,
                    mx_server: host,
                    attempts: attempt,
                    is_catch_all: false,
                    is_temporary_error: true,
                    reason: format!("Network error: {err}"),
                    time_taken_ms: elapsed_ms(started),
                },
                None => break,
            },
        };

        if current.status.is_definitive() {
            debug!(status = %current.status, attempt, "definitive verdict");
            return current;
        }
        debug!(status = %current.status, attempt, "verdict not definitive");
        last_report = Some(current);
    }

    match last_report {
        Some(mut report) => {
            report.attempts = max_attempts;
            report.time_taken_ms = elapsed_ms(started);
            report
        }
        None => VerifyReport {
            email: email.to_string(),
            status: MailboxStatus::Unknown,
            smtp_code: 0,
            mx_server: NO_HOST.to_string(),
            attempts: max_attempts,
            is_catch_all: false,
            is_temporary_error: true,
            reason: "No verification attempt could be completed".to_string(),
            time_taken_ms: elapsed_ms(started),
        },
    }
}

/// Splits `local@domain`, requiring exactly one `@`, and lowercases the
/// domain. Deeper syntax checks belong to the caller.
fn extract_domain(email: &str) -> Option<String> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return None;
    }
    Some(parts[1].to_lowercase())
}

fn classified_report(
    email: &str,
    classification: Classification,
    smtp_code: u16,
    mx_server: &str,
    attempts: u32,
    started: Instant,
) -> VerifyReport {
    VerifyReport {
        email: email.to_string(),
        status: classification.status,
        smtp_code,
        mx_server: mx_server.to_string(),
        attempts,
        is_catch_all: classification.is_catch_all,
        is_temporary_error: classification.is_temporary,
        reason: classification.reason,
        time_taken_ms: elapsed_ms(started),
    }
}

fn cancelled_report(email: &str, started: Instant, attempt: u32) -> VerifyReport {
    VerifyReport {
        email: email.to_string(),
        status: MailboxStatus::Unknown,
        smtp_code: 0,
        mx_server: NO_HOST.to_string(),
        attempts: attempt,
        is_catch_all: false,
        is_temporary_error: false,
        reason: "cancelled".to_string(),
        time_taken_ms: elapsed_ms(started),
    }
}

fn jittered_backoff(options: &VerifyOptions, attempt: u32) -> Duration {
    let base = options.backoff_base(attempt) as f64;
    let jitter = options.jitter_fraction.abs();
    let factor = 1.0 + rand::thread_rng().gen_range(-jitter..=jitter);
    Duration::from_millis((base * factor).max(0.0) as u64)
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
