use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const DEFAULT_HELO: &str = "localhost.localdomain";

/// Controls how [`verify_mailbox`](crate::verify::verify_mailbox)
/// interrogates SMTP servers.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Port dialed on each exchange host. Mail servers listen on 25; tests
    /// point this at a loopback listener.
    pub port: u16,
    /// FQDN announced in `EHLO`/`HELO`. For best acceptance this should be
    /// a real host whose domain matches the envelope sender.
    pub helo_name: Option<String>,
    /// Mailbox used in `MAIL FROM`. `None` derives `verify@<helo>`; an
    /// explicitly empty string selects the null sender `<>`.
    pub envelope_sender: Option<String>,
    /// Per-step I/O deadline, armed before every connect, read and write.
    pub smtp_timeout: Duration,
    /// Upper bound on verification rounds over the MX list.
    pub max_attempts: u32,
    /// Base delays slept before the second and later rounds; rounds past
    /// the end of the list reuse the last entry.
    pub backoff_ms: Vec<u64>,
    /// ± fraction of uniform jitter applied to each backoff delay.
    pub jitter_fraction: f64,
    /// Cooperative cancellation: set the flag to abort between protocol
    /// steps. A cancelled verification reports `unknown` / "cancelled".
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            port: 25,
            helo_name: None,
            envelope_sender: None,
            smtp_timeout: Duration::from_secs(15),
            max_attempts: 3,
            backoff_ms: vec![1_000, 3_000, 10_000],
            jitter_fraction: 0.3,
            cancel_flag: None,
        }
    }
}

impl VerifyOptions {
    pub fn helo_name(&self) -> &str {
        self.helo_name
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_HELO)
    }

    pub fn envelope_sender(&self) -> Cow<'_, str> {
        match &self.envelope_sender {
            Some(sender) => Cow::Borrowed(sender.as_str()),
            None => Cow::Owned(format!("verify@{}", self.helo_name())),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    pub(crate) fn backoff_base(&self, attempt: u32) -> u64 {
        if self.backoff_ms.is_empty() {
            return 0;
        }
        let index = (attempt.saturating_sub(2) as usize).min(self.backoff_ms.len() - 1);
        self.backoff_ms[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helo_defaults_when_unset_or_blank() {
        let options = VerifyOptions::default();
        assert_eq!(options.helo_name(), DEFAULT_HELO);

        let options = VerifyOptions {
            helo_name: Some("  ".to_string()),
            ..VerifyOptions::default()
        };
        assert_eq!(options.helo_name(), DEFAULT_HELO);
    }

    #[test]
    fn envelope_sender_derives_from_helo() {
        let options = VerifyOptions {
            helo_name: Some("probe.example".to_string()),
            ..VerifyOptions::default()
        };
        assert_eq!(options.envelope_sender(), "verify@probe.example");
    }

    #[test]
    fn backoff_reuses_last_entry_when_exhausted() {
        let options = VerifyOptions {
            backoff_ms: vec![1_000, 3_000],
            ..VerifyOptions::default()
        };
        assert_eq!(options.backoff_base(2), 1_000);
        assert_eq!(options.backoff_base(3), 3_000);
        assert_eq!(options.backoff_base(7), 3_000);
    }
}
