use encoding_rs::Encoding;
use std::{
    net::{IpAddr, SocketAddr},
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    time,
};

use super::{
    error::{Error, TransportResult},
    transport::{Sink, Transport},
};
use crate::{
    protocol::{self, parse_epsv, parse_fact_line, parse_pasv, Command, FactMap, Facts, Reply,
        ReplyKind, TransferType},
    utils,
};

const DATA_BUFFER: usize = 32 * 1024;

/// Implements raw work with the control channel in command-reply format.
/// A positive completion reply is returned as `Ok`, negative replies are
/// returned as [`Error::Reply`].
pub struct RawFtpSession {
    stream: BufReader<TcpStream>,
    encoding: &'static Encoding,
    timeout: Duration,
    welcome: String,
    transfer_type: Option<TransferType>,
    epsv_refused: bool,
    broken: bool,
}

impl RawFtpSession {
    /// Opens the control channel and reads the server greeting.
    pub async fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
        encoding: &'static Encoding,
    ) -> TransportResult<Self> {
        let stream = time::timeout(timeout, TcpStream::connect((host, port))).await??;

        let mut session = Self {
            stream: BufReader::new(stream),
            encoding,
            timeout,
            welcome: String::new(),
            transfer_type: None,
            epsv_refused: false,
            broken: false,
        };

        let mut greeting = session.read_reply().await?;
        while greeting.code.kind() == ReplyKind::PositivePreliminary {
            greeting = session.read_reply().await?;
        }

        if greeting.code.0 != protocol::READY {
            return Err(negative_or_unexpected(greeting));
        }

        session.welcome = greeting.message();

        Ok(session)
    }

    /// Set the maximum response time.
    /// Default: 10 seconds
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Authenticates with `USER` and, if the server asks for it, `PASS`.
    pub async fn login(&mut self, username: &str, password: &str) -> TransportResult<()> {
        let reply = self.command(Command::User(username.to_owned())).await?;

        let reply = if reply.code.0 == protocol::NEED_PASSWORD {
            self.command(Command::Pass(password.to_owned())).await?
        } else {
            reply
        };

        match reply.code.kind() {
            ReplyKind::PositiveCompletion => Ok(()),
            _ => Err(negative_or_unexpected(reply)),
        }
    }

    /// Returns `true` once a reply timed out. A late reply could still
    /// arrive and be taken for the answer to the next command, so the
    /// session refuses further commands.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    async fn read_reply(&mut self) -> TransportResult<Reply> {
        let read = time::timeout(
            self.timeout,
            utils::read_reply(&mut self.stream, self.encoding),
        )
        .await;

        let Ok(reply) = read else {
            warn!("no reply within {:?}, control channel abandoned", self.timeout);
            self.broken = true;
            return Err(Error::Timeout);
        };
        let reply = reply?;

        debug!("<- {}", reply);
        Ok(reply)
    }

    /// Sends one command and waits for its reply, whatever the code.
    pub async fn command(&mut self, command: Command) -> TransportResult<Reply> {
        if self.broken {
            return Err(Error::ChannelBroken);
        }

        debug!("-> {}", command);

        self.stream
            .get_mut()
            .write_all(&command.encode(self.encoding))
            .await?;

        self.read_reply().await
    }

    /// Sends one command and requires a positive completion reply.
    pub async fn complete(&mut self, command: Command) -> TransportResult<Reply> {
        let reply = self.command(command).await?;
        match reply.code.kind() {
            ReplyKind::PositiveCompletion => Ok(reply),
            _ => Err(negative_or_unexpected(reply)),
        }
    }

    async fn set_type(&mut self, transfer_type: TransferType) -> TransportResult<()> {
        if self.transfer_type != Some(transfer_type) {
            let _ = self.complete(Command::Type(transfer_type)).await?;
            self.transfer_type = Some(transfer_type);
        }
        Ok(())
    }

    /// Opens a passive data connection, preferring `EPSV` and falling back to
    /// `PASV` once the server refused the extended form.
    async fn open_data(&mut self) -> TransportResult<TcpStream> {
        let address = if self.epsv_refused {
            None
        } else {
            match self.complete(Command::Epsv).await {
                Ok(reply) => {
                    let port = parse_epsv(&reply.message())?;
                    let host: IpAddr = self.stream.get_ref().peer_addr()?.ip();
                    Some(SocketAddr::new(host, port))
                }
                Err(Error::Reply(reply)) => {
                    debug!("EPSV refused ({}), using PASV", reply.code.0);
                    self.epsv_refused = true;
                    None
                }
                Err(error) => return Err(error),
            }
        };

        let address = match address {
            Some(address) => address,
            None => {
                let reply = self.complete(Command::Pasv).await?;
                let advertised = parse_pasv(&reply.message())?;
                let host = self.stream.get_ref().peer_addr()?.ip();
                if IpAddr::V4(*advertised.ip()) != host {
                    debug!("ignoring PASV address {}, using {}", advertised.ip(), host);
                }
                SocketAddr::new(host, advertised.port())
            }
        };

        Ok(time::timeout(self.timeout, TcpStream::connect(address)).await??)
    }

    /// Runs a command that answers on a data connection and copies the data
    /// into `sink`.
    async fn transfer(
        &mut self,
        command: Command,
        transfer_type: TransferType,
        sink: Sink<'_>,
    ) -> TransportResult<u64> {
        self.set_type(transfer_type).await?;
        let mut data = self.open_data().await?;

        let reply = self.command(command).await?;
        if reply.code.kind() != ReplyKind::PositivePreliminary {
            return Err(negative_or_unexpected(reply));
        }

        let copied = copy_data(&mut data, sink, self.timeout).await;
        drop(data);

        let done = self.read_reply().await;
        let written = copied?;
        let done = done?;

        match done.code.kind() {
            ReplyKind::PositiveCompletion => Ok(written),
            _ => Err(negative_or_unexpected(done)),
        }
    }
}

#[async_trait]
impl Transport for RawFtpSession {
    async fn change_directory(&mut self, name: &str) -> TransportResult<()> {
        let command = if name == ".." {
            Command::Cdup
        } else {
            Command::Cwd(name.to_owned())
        };

        self.complete(command).await.map(|_| ())
    }

    async fn list_structured(
        &mut self,
        path: &str,
        facts: Facts,
    ) -> TransportResult<Vec<(String, FactMap)>> {
        if let Err(error) = self.complete(Command::OptsMlst(facts)).await {
            debug!("OPTS MLST not accepted: {}", error);
        }

        let mut raw = Vec::new();
        let _ = self
            .transfer(
                Command::Mlsd(listing_argument(path)),
                TransferType::Ascii,
                &mut raw,
            )
            .await?;

        utils::decode(&raw, self.encoding)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| parse_fact_line(line, facts).map_err(Error::from))
            .collect()
    }

    async fn list_plain_text(&mut self, path: &str) -> TransportResult<String> {
        let mut raw = Vec::new();
        let _ = self
            .transfer(
                Command::List(listing_argument(path)),
                TransferType::Ascii,
                &mut raw,
            )
            .await?;

        Ok(utils::decode(&raw, self.encoding))
    }

    async fn retrieve_binary(&mut self, name: &str, sink: Sink<'_>) -> TransportResult<u64> {
        self.transfer(Command::Retr(name.to_owned()), TransferType::Binary, sink)
            .await
    }

    fn welcome_message(&self) -> &str {
        &self.welcome
    }

    async fn current_directory(&mut self) -> TransportResult<Option<String>> {
        let reply = self.complete(Command::Pwd).await?;
        if reply.code.0 != protocol::PATH_CREATED {
            return Ok(None);
        }

        Ok(quoted_path(&reply.message()))
    }

    async fn quit(&mut self) -> TransportResult<()> {
        if self.broken {
            debug!("closing broken control channel without QUIT");
        } else {
            let reply = self.command(Command::Quit).await?;
            if reply.code.0 != protocol::CLOSING {
                warn!("unexpected reply to QUIT: {}", reply);
            }
        }

        self.stream.get_mut().shutdown().await?;
        Ok(())
    }
}

/// Copies the data connection into `sink` until the server closes it. Every
/// read is bounded by `timeout`, bytes already written stay in `sink`.
async fn copy_data(
    data: &mut TcpStream,
    sink: Sink<'_>,
    timeout: Duration,
) -> TransportResult<u64> {
    let mut buf = vec![0; DATA_BUFFER];
    let mut written = 0;

    loop {
        let read = time::timeout(timeout, data.read(&mut buf)).await??;
        if read == 0 {
            return Ok(written);
        }

        sink.write_all(&buf[..read]).await?;
        written += read as u64;
    }
}

fn listing_argument(path: &str) -> Option<String> {
    match path {
        "" | "." => None,
        path => Some(path.to_owned()),
    }
}

fn negative_or_unexpected(reply: Reply) -> Error {
    if reply.is_positive() {
        Error::UnexpectedReply(reply)
    } else {
        Error::Reply(reply)
    }
}

/// Extracts the path of a `257 "<path>" ...` reply, where embedded quotes
/// are doubled.
fn quoted_path(text: &str) -> Option<String> {
    let mut chars = text[text.find('"')? + 1..].chars().peekable();
    let mut path = String::new();

    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                let _ = chars.next();
            } else {
                return Some(path);
            }
        }
        path.push(c);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pwd_reply_path() {
        assert_eq!(
            quoted_path("\"/pub/incoming\" is the current directory").as_deref(),
            Some("/pub/incoming")
        );
        assert_eq!(
            quoted_path("\"/a \"\"quoted\"\" dir\"").as_deref(),
            Some("/a \"quoted\" dir")
        );
        assert_eq!(quoted_path("no quotes here"), None);
        assert_eq!(quoted_path("\"unterminated"), None);
    }

    #[test]
    fn current_dir_is_implicit() {
        assert_eq!(listing_argument("."), None);
        assert_eq!(listing_argument(""), None);
        assert_eq!(listing_argument("pub").as_deref(), Some("pub"));
    }
}
