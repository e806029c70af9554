use chrono::{DateTime, NaiveDateTime, Utc};
use encoding_rs::Encoding;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{error::Error, protocol::Reply};

/// Decodes bytes received from the server with the session encoding.
/// Undecodable sequences are replaced rather than rejected.
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        debug!("replaced undecodable bytes while decoding as {}", encoding.name());
    }
    text.into_owned()
}

/// Reads one CRLF (or bare LF) terminated line, without the terminator.
pub async fn read_line<S>(stream: &mut S, encoding: &'static Encoding) -> Result<String, Error>
where
    S: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    if stream.read_until(b'\n', &mut buf).await? == 0 {
        return Err(Error::UnexpectedEof);
    }

    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        let _ = buf.pop();
    }

    Ok(decode(&buf, encoding))
}

/// Reads a complete reply, following multi-line replies to their last line.
pub async fn read_reply<S>(stream: &mut S, encoding: &'static Encoding) -> Result<Reply, Error>
where
    S: AsyncBufRead + Unpin,
{
    let first = read_line(stream, encoding).await?;
    let (code, multi_line) = Reply::parse_head(&first)?;
    let mut lines = vec![first];

    if multi_line {
        loop {
            let line = read_line(stream, encoding).await?;
            let last = Reply::is_last_line(code, &line);
            lines.push(line);
            if last {
                break;
            }
        }
    }

    Ok(Reply { code, lines })
}

/// Parses a `modify` fact (`YYYYMMDDHHMMSS[.sss]`, always UTC).
pub fn parse_modify(value: &str) -> Option<DateTime<Utc>> {
    let format = if value.contains('.') {
        "%Y%m%d%H%M%S%.f"
    } else {
        "%Y%m%d%H%M%S"
    };

    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .map(|time| time.and_utc())
}
