use std::fmt;

/// Verdict for a probed mailbox.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxStatus {
    /// The server accepted the recipient (250 or 251).
    Valid,
    /// The mailbox was explicitly rejected, or the domain has no mail route.
    Invalid,
    /// The dialogue produced no usable signal.
    Unknown,
    /// The server accepts any recipient (252 "cannot verify, will accept").
    CatchAll,
    /// Transient refusal (4xx); another attempt later may succeed.
    RetryLater,
    /// The server refused the dialogue before `RCPT TO` could be asked.
    Blocked,
    /// The server greylisted the probe and expects a retry.
    Greylisted,
}

impl MailboxStatus {
    /// Definitive verdicts are never retried: redialing after an explicit
    /// acceptance or rejection changes nothing and risks rate limiting.
    pub fn is_definitive(&self) -> bool {
        matches!(self, Self::Valid | Self::Invalid | Self::CatchAll)
    }
}

impl fmt::Display for MailboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Unknown => "unknown",
            Self::CatchAll => "catch_all",
            Self::RetryLater => "retry_later",
            Self::Blocked => "blocked",
            Self::Greylisted => "greylisted",
        };
        f.write_str(name)
    }
}

/// Final report produced by [`verify_mailbox`](crate::verify::verify_mailbox).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// The input address, echoed back.
    pub email: String,
    pub status: MailboxStatus,
    /// Numeric SMTP code behind the verdict; 0 when no reply was obtained.
    pub smtp_code: u16,
    /// Exchange host that produced the verdict, or `"No MX"` / `"error"`
    /// when no host was reached.
    pub mx_server: String,
    /// Attempt number that produced the verdict (1-based).
    pub attempts: u32,
    pub is_catch_all: bool,
    pub is_temporary_error: bool,
    pub reason: String,
    /// Wall-clock time of the whole verification, in milliseconds.
    pub time_taken_ms: u64,
}
