//! Line protocol spoken with the provisioning daemon

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

/// The only acknowledgement code meaning success.
pub const OK_CODE: u16 = 250;

/// Step of the exchange, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Connect,
    Greeting,
    Helo,
    Execute,
    Bye,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Helo => "helo",
            Self::Execute => "execute query",
            Self::Bye => "bye",
        })
    }
}

/// Why the daemon could not be notified.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum DispatchError {
    #[error("{stage}: {message}")]
    Io { stage: Stage, message: String },

    #[error("{stage}: timed out after {}s", .after.as_secs())]
    Timeout { stage: Stage, after: Duration },

    #[error("{stage}: connection closed by the daemon")]
    Closed { stage: Stage },

    #[error("{stage}: malformed reply '{line}'")]
    Malformed { stage: Stage, line: String },

    #[error("{stage}: daemon answered {code} {text}")]
    Rejected { stage: Stage, code: u16, text: String },
}

/// One acknowledgement line: `<3-digit code> <free text>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

impl Reply {
    /// Parse a reply line; `None` when it does not start with a 3-digit code.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let digits = line.get(..3)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let rest = &line[3..];
        if !(rest.is_empty() || rest.starts_with(' ')) {
            return None;
        }
        Some(Self {
            code: digits.parse().ok()?,
            text: rest.trim_start().to_string(),
        })
    }
}

/// Run the four-step exchange over an established connection.
///
/// Reads the greeting, then sends `helo <version>`, `execute query` and `bye`,
/// requiring a `250` acknowledgement after each.
pub async fn exchange<R, W>(
    reader: &mut R,
    writer: &mut W,
    version: &str,
    io_timeout: Duration,
) -> Result<(), DispatchError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    expect_ok(reader, Stage::Greeting, io_timeout).await?;

    let helo = format!("helo {version}");
    for (stage, command) in [
        (Stage::Helo, helo.as_str()),
        (Stage::Execute, "execute query"),
        (Stage::Bye, "bye"),
    ] {
        send(writer, stage, command, io_timeout).await?;
        expect_ok(reader, stage, io_timeout).await?;
    }
    Ok(())
}

async fn send<W>(
    writer: &mut W,
    stage: Stage,
    command: &str,
    after: Duration,
) -> Result<(), DispatchError>
where
    W: AsyncWrite + Unpin,
{
    let line = format!("{command}\n");
    let write = async {
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await
    };
    match timeout(after, write).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DispatchError::Io {
            stage,
            message: e.to_string(),
        }),
        Err(_) => Err(DispatchError::Timeout { stage, after }),
    }
}

async fn expect_ok<R>(reader: &mut R, stage: Stage, after: Duration) -> Result<Reply, DispatchError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = match timeout(after, reader.read_line(&mut line)).await {
        Ok(read) => read,
        Err(_) => return Err(DispatchError::Timeout { stage, after }),
    };
    match read {
        Ok(0) => return Err(DispatchError::Closed { stage }),
        Ok(_) => {}
        Err(e) => {
            return Err(DispatchError::Io {
                stage,
                message: e.to_string(),
            })
        }
    }

    let reply = Reply::parse(&line).ok_or_else(|| DispatchError::Malformed {
        stage,
        line: line.trim_end().to_string(),
    })?;
    if reply.code != OK_CODE {
        return Err(DispatchError::Rejected {
            stage,
            code: reply.code,
            text: reply.text,
        });
    }
    log::debug!("[Daemon] {stage}: {} {}", reply.code, reply.text);
    Ok(reply)
}
