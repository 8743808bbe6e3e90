use std::fmt;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use tracing::trace;

use super::error::SessionError;
use super::options::VerifyOptions;
use super::reply::{ReplyParser, SmtpReply};

/// Position in the verification dialogue. Labels timeouts and directs the
/// state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Connect,
    Greeting,
    Ehlo,
    Helo,
    MailFrom,
    RcptTo,
    Quit,
}

impl SessionStage {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Ehlo => "EHLO",
            Self::Helo => "HELO",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Quit => "QUIT",
        }
    }
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where one dialogue ended and what the server last said. A verdict at
/// [`SessionStage::RcptTo`] carries the recipient reply; any earlier stage
/// means the server cut the dialogue short.
#[derive(Debug, Clone)]
pub(crate) struct SessionVerdict {
    pub stage: SessionStage,
    pub reply: SmtpReply,
}

/// One TCP conversation with one exchange host. A session never retries:
/// it plays a single dialogue to completion or failure, and the connection
/// is dropped on every exit path.
pub(crate) struct SmtpSession {
    stream: TcpStream,
    parser: ReplyParser,
    stage: SessionStage,
}

impl SmtpSession {
    /// Dials `host` and drives the dialogue
    /// greeting → `EHLO`/`HELO` → `MAIL FROM` → `RCPT TO` → `QUIT`.
    /// No command is written until the previous reply has parsed complete,
    /// and `DATA` is never sent.
    pub(crate) fn run(
        host: &str,
        recipient: &str,
        options: &VerifyOptions,
    ) -> Result<SessionVerdict, SessionError> {
        let session = Self::connect(host, options)?;
        session.dialogue(recipient, options)
    }

    fn connect(host: &str, options: &VerifyOptions) -> Result<Self, SessionError> {
        let connect_err = |source: io::Error| SessionError::Connect {
            host: host.to_string(),
            source,
        };

        let addrs: Vec<SocketAddr> = format!("{host}:{port}", port = options.port)
            .to_socket_addrs()
            .map_err(connect_err)?
            .collect();

        let mut last_err = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, options.smtp_timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(options.smtp_timeout))
                        .map_err(connect_err)?;
                    stream
                        .set_write_timeout(Some(options.smtp_timeout))
                        .map_err(connect_err)?;
                    trace!(%host, %addr, "connected");
                    return Ok(Self {
                        stream,
                        parser: ReplyParser::new(),
                        stage: SessionStage::Connect,
                    });
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(connect_err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "no address for host")
        })))
    }

    fn dialogue(
        mut self,
        recipient: &str,
        options: &VerifyOptions,
    ) -> Result<SessionVerdict, SessionError> {
        let helo = options.helo_name();

        self.stage = SessionStage::Greeting;
        let greeting = self.read_reply()?;
        if greeting.code != 220 {
            // 554 and friends at the door: the host refuses the dialogue.
            return Ok(self.close(SessionStage::Greeting, greeting));
        }

        self.stage = SessionStage::Ehlo;
        self.send(&format!("EHLO {helo}"))?;
        let mut hello = self.read_reply()?;
        if matches!(hello.code, 500 | 502) {
            // Servers that do not speak ESMTP get exactly one HELO retry.
            self.stage = SessionStage::Helo;
            self.send(&format!("HELO {helo}"))?;
            hello = self.read_reply()?;
        }
        if hello.code != 250 {
            let stage = self.stage;
            return Ok(self.close(stage, hello));
        }

        self.stage = SessionStage::MailFrom;
        let sender = options.envelope_sender();
        let envelope = if sender.is_empty() {
            "MAIL FROM:<>".to_string()
        } else {
            format!("MAIL FROM:<{sender}>")
        };
        self.send(&envelope)?;
        let mail = self.read_reply()?;
        if mail.code != 250 {
            return Ok(self.close(SessionStage::MailFrom, mail));
        }

        self.stage = SessionStage::RcptTo;
        self.send(&format!("RCPT TO:<{recipient}>"))?;
        let rcpt = self.read_reply()?;
        Ok(self.close(SessionStage::RcptTo, rcpt))
    }

    /// Ends the dialogue: `QUIT` is sent on a best-effort basis and the
    /// connection is dropped regardless of the outcome.
    fn close(mut self, stage: SessionStage, reply: SmtpReply) -> SessionVerdict {
        self.stage = SessionStage::Quit;
        if self.send("QUIT").is_ok() {
            self.read_reply().ok();
        }
        SessionVerdict { stage, reply }
    }

    fn send(&mut self, command: &str) -> Result<(), SessionError> {
        trace!(stage = %self.stage, command, "send");
        let stage = self.stage;
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.stream
            .write_all(&line)
            .map_err(|err| io_error(stage, err))?;
        self.stream.flush().map_err(|err| io_error(stage, err))
    }

    fn read_reply(&mut self) -> Result<SmtpReply, SessionError> {
        let stage = self.stage;
        loop {
            if let Some(reply) = self.parser.try_reply()? {
                trace!(stage = %stage, code = reply.code, "reply");
                return Ok(reply);
            }
            let mut buf = [0u8; 512];
            let read = self
                .stream
                .read(&mut buf)
                .map_err(|err| io_error(stage, err))?;
            if read == 0 {
                return Err(SessionError::Disconnected { stage });
            }
            self.parser.feed(&buf[..read]);
        }
    }
}

fn io_error(stage: SessionStage, source: io::Error) -> SessionError {
    match source.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => SessionError::Timeout { stage },
        io::ErrorKind::UnexpectedEof => SessionError::Disconnected { stage },
        _ => SessionError::Io { stage, source },
    }
}
