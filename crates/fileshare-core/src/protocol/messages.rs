//! Wire vocabulary shared by the server engine and the client driver.
//!
//! Every control line on the wire is either a [`Command`] (client → server)
//! or a [`ServerLine`] (server → client).  Both types render to the exact
//! text that travels on the wire through [`std::fmt::Display`].
//!
//! # Message catalogue
//!
//! | Direction | Line                                 | Type                        |
//! |-----------|--------------------------------------|-----------------------------|
//! | S→C       | `BUSY <text>`                        | [`ServerLine::Busy`]        |
//! | S→C       | `YOURNAME <id>`                      | [`ServerLine::YourName`]    |
//! | S→C       | `ERR <text>`                         | [`ServerLine::Err`]         |
//! | S→C       | `HELLO <id>. Commands: ...`          | [`ServerLine::Hello`]       |
//! | S→C       | `STATUS-BEGIN` / `STATUS-END`        | [`ServerLine::StatusBegin`] |
//! | S→C       | `FILES a,b` / `FILES (empty)`        | [`ServerLine::Files`]       |
//! | S→C       | `FILESIZE <n>` + payload             | [`ServerLine::FileSize`]    |
//! | S→C       | `FILE-DONE`                          | [`ServerLine::FileDone`]    |
//! | S→C       | `<name> ACK`                         | [`ServerLine::Ack`]         |
//! | S→C       | `BYE`                                | [`ServerLine::Bye`]         |
//! | C→S       | `status` / `list` / `exit` / `<name>`| [`Command`]                 |

use std::fmt;

use thiserror::Error;

/// Text sent with `BUSY` when admission is refused.
pub const BUSY_REASON: &str = "server at capacity; try later";

/// Text sent with `ERR` when the handshake echo does not match.
pub const HANDSHAKE_ERROR: &str = "expected your name; closing";

/// Command summary appended to the greeting.
pub const COMMAND_SUMMARY: &str = "status | list | <filename> | exit";

const EMPTY_LISTING: &str = "(empty)";

/// Errors raised while interpreting a control line.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// A `FILESIZE` line did not carry a non-negative integer.
    #[error("bad FILESIZE header: {0}")]
    MalformedFileSize(String),

    /// A line arrived where a different control line was required.
    #[error("expected {expected}, got {got:?}")]
    UnexpectedLine { expected: &'static str, got: String },
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// One request line sent by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Dump every session the server has seen.
    Status,
    /// List the repository.
    List,
    /// End the session.
    Exit,
    /// Anything else: a repository file name, case preserved.
    Fetch(String),
}

impl Command {
    /// Classifies one input line.
    ///
    /// Surrounding whitespace is trimmed.  The reserved verbs match
    /// case-insensitively; every other line (including the empty line) is a
    /// [`Command::Fetch`] of the trimmed text.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fileshare_core::protocol::messages::Command;
    ///
    /// assert_eq!(Command::parse(" STATUS "), Command::Status);
    /// assert_eq!(Command::parse("Notes.txt"), Command::Fetch("Notes.txt".to_string()));
    /// ```
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("status") {
            Command::Status
        } else if trimmed.eq_ignore_ascii_case("list") {
            Command::List
        } else if trimmed.eq_ignore_ascii_case("exit") {
            Command::Exit
        } else {
            Command::Fetch(trimmed.to_string())
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Status => f.write_str("status"),
            Command::List => f.write_str("list"),
            Command::Exit => f.write_str("exit"),
            Command::Fetch(name) => f.write_str(name),
        }
    }
}

// ── Server lines ──────────────────────────────────────────────────────────────

/// One control line sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    /// Admission refused; the connection closes afterwards.
    Busy(String),
    /// Identity assignment; the client must echo the identity.
    YourName(String),
    /// Handshake failure; the connection closes afterwards.
    Err(String),
    /// Greeting for the given identity.
    Hello(String),
    /// Opens a status report.
    StatusBegin,
    /// Closes a status report.
    StatusEnd,
    /// Repository listing; empty means `FILES (empty)`.
    Files(Vec<String>),
    /// Announces a payload of exactly this many bytes.
    FileSize(u64),
    /// Terminates a payload.
    FileDone,
    /// Generic acknowledgement of an unknown name.
    Ack(String),
    /// Exit acknowledgement.
    Bye,
    /// Any line outside the vocabulary (status rows, free text).
    Other(String),
}

impl ServerLine {
    /// Interprets one received line.
    ///
    /// Lines that fit no known shape become [`ServerLine::Other`]; the caller
    /// decides from context whether that is acceptable.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedFileSize`] when a `FILESIZE` line
    /// carries something other than a non-negative integer.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let parsed = match line {
            "STATUS-BEGIN" => ServerLine::StatusBegin,
            "STATUS-END" => ServerLine::StatusEnd,
            "FILE-DONE" => ServerLine::FileDone,
            "BYE" => ServerLine::Bye,
            "BUSY" => ServerLine::Busy(String::new()),
            "ERR" => ServerLine::Err(String::new()),
            _ => {
                if let Some(rest) = line.strip_prefix("FILESIZE ") {
                    let size = rest
                        .trim()
                        .parse::<u64>()
                        .map_err(|_| ProtocolError::MalformedFileSize(line.to_string()))?;
                    ServerLine::FileSize(size)
                } else if let Some(rest) = line.strip_prefix("FILES ") {
                    ServerLine::Files(parse_listing(rest))
                } else if let Some(rest) = line.strip_prefix("YOURNAME ") {
                    ServerLine::YourName(rest.trim().to_string())
                } else if let Some(rest) = line.strip_prefix("BUSY ") {
                    ServerLine::Busy(rest.to_string())
                } else if let Some(rest) = line.strip_prefix("ERR ") {
                    ServerLine::Err(rest.to_string())
                } else if let Some(rest) = line.strip_prefix("HELLO ") {
                    let identity = rest.split('.').next().unwrap_or_default();
                    ServerLine::Hello(identity.to_string())
                } else if let Some(name) = line.strip_suffix(" ACK") {
                    ServerLine::Ack(name.to_string())
                } else {
                    ServerLine::Other(line.to_string())
                }
            }
        };
        Ok(parsed)
    }
}

fn parse_listing(rest: &str) -> Vec<String> {
    if rest == EMPTY_LISTING {
        return Vec::new();
    }
    rest.split(',').map(str::to_string).collect()
}

impl fmt::Display for ServerLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerLine::Busy(reason) => write!(f, "BUSY {reason}"),
            ServerLine::YourName(identity) => write!(f, "YOURNAME {identity}"),
            ServerLine::Err(reason) => write!(f, "ERR {reason}"),
            ServerLine::Hello(identity) => write!(f, "HELLO {identity}. Commands: {COMMAND_SUMMARY}"),
            ServerLine::StatusBegin => f.write_str("STATUS-BEGIN"),
            ServerLine::StatusEnd => f.write_str("STATUS-END"),
            ServerLine::Files(names) if names.is_empty() => write!(f, "FILES {EMPTY_LISTING}"),
            ServerLine::Files(names) => write!(f, "FILES {}", names.join(",")),
            ServerLine::FileSize(size) => write!(f, "FILESIZE {size}"),
            ServerLine::FileDone => f.write_str("FILE-DONE"),
            ServerLine::Ack(name) => write!(f, "{name} ACK"),
            ServerLine::Bye => f.write_str("BYE"),
            ServerLine::Other(text) => f.write_str(text),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
