use super::error::SessionError;

/// A complete SMTP reply: the three-digit code of the terminating line and
/// the text of every line joined by single spaces.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

/// A reply buffered past this point without terminating is treated as a
/// protocol violation rather than held indefinitely.
const MAX_BUFFER: usize = 64 * 1024;

/// Incremental parser for multi-line SMTP replies.
///
/// Network chunks are appended with [`feed`](Self::feed);
/// [`try_reply`](Self::try_reply) drains exactly one complete reply once
/// its terminating `DDD<SP>` line has arrived, leaving any excess bytes
/// buffered for the next reply. Chunks may split lines, or carry several
/// lines, at any boundary.
#[derive(Debug, Default)]
pub(crate) struct ReplyParser {
    buffer: Vec<u8>,
}

impl ReplyParser {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    pub(crate) fn try_reply(&mut self) -> Result<Option<SmtpReply>, SessionError> {
        let mut cursor = 0;
        let mut texts: Vec<String> = Vec::new();
        let mut terminator: Option<u16> = None;

        while let Some(offset) = self.buffer[cursor..].iter().position(|b| *b == b'\n') {
            let mut line = &self.buffer[cursor..cursor + offset];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            let Some((code, is_final, text)) = split_line(line) else {
                return Err(SessionError::Protocol(format!(
                    "malformed reply line: {:?}",
                    String::from_utf8_lossy(line)
                )));
            };
            texts.push(text);
            cursor += offset + 1;
            if is_final {
                // The terminating line's code is authoritative; continuation
                // codes are not cross-checked.
                terminator = Some(code);
                break;
            }
        }

        match terminator {
            Some(code) => {
                self.buffer.drain(..cursor);
                Ok(Some(SmtpReply {
                    code,
                    message: texts.join(" "),
                }))
            }
            None if self.buffer.len() > MAX_BUFFER => Err(SessionError::Protocol(format!(
                "reply exceeded {MAX_BUFFER} bytes without terminating"
            ))),
            None => Ok(None),
        }
    }
}

/// Splits one reply line into (code, is_final, text). `DDD-text` continues,
/// `DDD text` or a bare `DDD` terminates. Non-UTF-8 text is passed through
/// lossily as opaque content.
fn split_line(line: &[u8]) -> Option<(u16, bool, String)> {
    if line.len() < 3 || !line[..3].iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let code = std::str::from_utf8(&line[..3]).ok()?.parse().ok()?;
    let (is_final, text) = match line.get(3) {
        None => (true, &line[3..]),
        Some(b'-') => (false, &line[4..]),
        Some(b' ') => (true, &line[4..]),
        Some(_) => return None,
    };
    Some((code, is_final, String::from_utf8_lossy(text).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_of(parser: &mut ReplyParser) -> SmtpReply {
        parser
            .try_reply()
            .expect("well-formed reply")
            .expect("complete reply")
    }

    #[test]
    fn parses_single_line_reply() {
        let mut parser = ReplyParser::new();
        parser.feed(b"220 mail.example.com ESMTP\r\n");
        let reply = reply_of(&mut parser);
        assert_eq!(reply.code, 220);
        assert_eq!(reply.message, "mail.example.com ESMTP");
    }

    #[test]
    fn joins_multiline_reply_with_spaces() {
        let mut parser = ReplyParser::new();
        parser.feed(b"250-mail.example.com\r\n250-SIZE 35882577\r\n250 OK\r\n");
        let reply = reply_of(&mut parser);
        assert_eq!(reply.code, 250);
        assert_eq!(reply.message, "mail.example.com SIZE 35882577 OK");
    }

    #[test]
    fn waits_for_terminating_line() {
        let mut parser = ReplyParser::new();
        parser.feed(b"250-mail.example.com\r\n");
        assert!(parser.try_reply().expect("well-formed").is_none());
        parser.feed(b"250 OK\r\n");
        assert_eq!(reply_of(&mut parser).code, 250);
    }

    #[test]
    fn reassembles_lines_split_across_chunks() {
        let mut parser = ReplyParser::new();
        parser.feed(b"250-he");
        assert!(parser.try_reply().expect("well-formed").is_none());
        parser.feed(b"llo\r\n250 wor");
        assert!(parser.try_reply().expect("well-formed").is_none());
        parser.feed(b"ld\r\n");
        let reply = reply_of(&mut parser);
        assert_eq!(reply.code, 250);
        assert_eq!(reply.message, "hello world");
    }

    #[test]
    fn keeps_excess_bytes_for_the_next_reply() {
        let mut parser = ReplyParser::new();
        parser.feed(b"220 ready\r\n250 ok\r\n");
        assert_eq!(reply_of(&mut parser).code, 220);
        assert_eq!(reply_of(&mut parser).code, 250);
        assert!(parser.try_reply().expect("well-formed").is_none());
    }

    #[test]
    fn accepts_bare_code_line_and_lone_lf() {
        let mut parser = ReplyParser::new();
        parser.feed(b"250\n");
        let reply = reply_of(&mut parser);
        assert_eq!(reply.code, 250);
        assert_eq!(reply.message, "");
    }

    #[test]
    fn takes_code_from_terminating_line() {
        let mut parser = ReplyParser::new();
        parser.feed(b"250-first\r\n251 second\r\n");
        assert_eq!(reply_of(&mut parser).code, 251);
    }

    #[test]
    fn rejects_malformed_line() {
        let mut parser = ReplyParser::new();
        parser.feed(b"garbage without a code\r\n");
        assert!(parser.try_reply().is_err());
    }

    #[test]
    fn rejects_runaway_buffer() {
        let mut parser = ReplyParser::new();
        parser.feed(&vec![b'x'; 70 * 1024]);
        assert!(parser.try_reply().is_err());
    }
}
