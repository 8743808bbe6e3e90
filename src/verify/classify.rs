use super::reply::SmtpReply;
use super::session::{SessionStage, SessionVerdict};
use super::types::MailboxStatus;

/// What a server reply means for the probed mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Classification {
    pub status: MailboxStatus,
    pub is_catch_all: bool,
    pub is_temporary: bool,
    pub reason: String,
}

impl Classification {
    fn of(status: MailboxStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            is_catch_all: false,
            is_temporary: false,
            reason: reason.into(),
        }
    }

    fn temporary(status: MailboxStatus, reason: impl Into<String>) -> Self {
        Self {
            is_temporary: true,
            ..Self::of(status, reason)
        }
    }
}

/// Maps the final verdict of one session onto a mailbox classification.
/// A reply before `RCPT TO` always means `blocked`; the `RCPT TO` reply
/// gets the full table.
pub(crate) fn classify(verdict: &SessionVerdict) -> Classification {
    match verdict.stage {
        SessionStage::RcptTo => classify_rcpt(&verdict.reply),
        stage => classify_blocked(stage, &verdict.reply),
    }
}

/// Classification table for the `RCPT TO` reply; the first matching row
/// wins. The enumerated numeric branches run before the greylist keyword
/// check, so 450/451/452/421 stay `retry_later` even when their text
/// mentions greylisting.
fn classify_rcpt(reply: &SmtpReply) -> Classification {
    let message = &reply.message;
    match reply.code {
        250 => Classification::of(MailboxStatus::Valid, "Mailbox exists"),
        251 => Classification::of(MailboxStatus::Valid, "User not local but will forward"),
        252 => Classification {
            status: MailboxStatus::CatchAll,
            is_catch_all: true,
            is_temporary: false,
            reason: "Cannot verify user, but will accept message".to_string(),
        },
        550 | 551 | 552 | 553 | 554 => Classification::of(
            MailboxStatus::Invalid,
            format!("Mailbox rejected: {message}"),
        ),
        450 | 451 | 452 => Classification::temporary(
            MailboxStatus::RetryLater,
            format!("Temporary error: {message}"),
        ),
        421 => Classification::temporary(MailboxStatus::RetryLater, format!("Server busy: {message}")),
        _ if message.to_lowercase().contains("greylist") => Classification::temporary(
            MailboxStatus::Greylisted,
            format!("Greylisted: {message}"),
        ),
        500.. => Classification::of(
            MailboxStatus::Invalid,
            format!("Permanent error: {message}"),
        ),
        400.. => Classification::temporary(
            MailboxStatus::RetryLater,
            format!("Temporary error: {message}"),
        ),
        code => Classification::of(
            MailboxStatus::Unknown,
            format!("Unknown SMTP response: {code} {message}"),
        ),
    }
}

/// A refusal before `RCPT TO`. Transient codes count as temporary except
/// at the greeting, where the refusal is always final — a 554 greeting is
/// `blocked` even though 554 at `RCPT TO` means `invalid`.
fn classify_blocked(stage: SessionStage, reply: &SmtpReply) -> Classification {
    let temporary = stage != SessionStage::Greeting && reply.is_transient_failure();
    Classification {
        status: MailboxStatus::Blocked,
        is_catch_all: false,
        is_temporary: temporary,
        reason: format!("{stage} rejected: {} {}", reply.code, reply.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rcpt(code: u16, message: &str) -> Classification {
        classify_rcpt(&SmtpReply {
            code,
            message: message.to_string(),
        })
    }

    #[test]
    fn acceptance_codes_are_valid() {
        let c = rcpt(250, "2.1.5 Ok");
        assert_eq!(c.status, MailboxStatus::Valid);
        assert_eq!(c.reason, "Mailbox exists");
        assert!(!c.is_temporary && !c.is_catch_all);

        let c = rcpt(251, "forwarding");
        assert_eq!(c.status, MailboxStatus::Valid);
        assert_eq!(c.reason, "User not local but will forward");
    }

    #[test]
    fn code_252_is_catch_all() {
        let c = rcpt(252, "cannot VRFY");
        assert_eq!(c.status, MailboxStatus::CatchAll);
        assert!(c.is_catch_all);
        assert!(!c.is_temporary);
    }

    #[test]
    fn explicit_rejections_are_invalid() {
        for code in [550, 551, 552, 553, 554] {
            let c = rcpt(code, "no such user");
            assert_eq!(c.status, MailboxStatus::Invalid, "code {code}");
            assert_eq!(c.reason, "Mailbox rejected: no such user");
        }
    }

    #[test]
    fn transient_codes_retry_later() {
        for code in [450, 451, 452] {
            let c = rcpt(code, "mailbox busy");
            assert_eq!(c.status, MailboxStatus::RetryLater, "code {code}");
            assert!(c.is_temporary);
        }

        let c = rcpt(421, "shutting down");
        assert_eq!(c.status, MailboxStatus::RetryLater);
        assert_eq!(c.reason, "Server busy: shutting down");
        assert!(c.is_temporary);
    }

    #[test]
    fn enumerated_codes_win_over_greylist_keyword() {
        let c = rcpt(451, "Greylisted, try again later");
        assert_eq!(c.status, MailboxStatus::RetryLater);
    }

    #[test]
    fn greylist_keyword_applies_outside_enumerated_codes() {
        let c = rcpt(455, "GREYLISTING in effect");
        assert_eq!(c.status, MailboxStatus::Greylisted);
        assert!(c.is_temporary);
        assert_eq!(c.reason, "Greylisted: GREYLISTING in effect");
    }

    #[test]
    fn remaining_ranges_fall_through() {
        let c = rcpt(521, "does not accept mail");
        assert_eq!(c.status, MailboxStatus::Invalid);
        assert_eq!(c.reason, "Permanent error: does not accept mail");

        let c = rcpt(430, "try later");
        assert_eq!(c.status, MailboxStatus::RetryLater);
        assert!(c.is_temporary);

        let c = rcpt(302, "odd");
        assert_eq!(c.status, MailboxStatus::Unknown);
        assert_eq!(c.reason, "Unknown SMTP response: 302 odd");
        assert!(!c.is_temporary);
    }

    #[test]
    fn early_refusals_are_blocked() {
        let verdict = SessionVerdict {
            stage: SessionStage::Greeting,
            reply: SmtpReply {
                code: 554,
                message: "no service".to_string(),
            },
        };
        let c = classify(&verdict);
        assert_eq!(c.status, MailboxStatus::Blocked);
        assert!(!c.is_temporary);

        let verdict = SessionVerdict {
            stage: SessionStage::MailFrom,
            reply: SmtpReply {
                code: 451,
                message: "try later".to_string(),
            },
        };
        let c = classify(&verdict);
        assert_eq!(c.status, MailboxStatus::Blocked);
        assert!(c.is_temporary);
        assert_eq!(c.reason, "MAIL FROM rejected: 451 try later");
    }

    #[test]
    fn rcpt_replies_use_the_full_table() {
        let verdict = SessionVerdict {
            stage: SessionStage::RcptTo,
            reply: SmtpReply {
                code: 550,
                message: "unknown".to_string(),
            },
        };
        assert_eq!(classify(&verdict).status, MailboxStatus::Invalid);
    }
}
