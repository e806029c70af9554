use bytes::{BufMut, Bytes, BytesMut};
use encoding_rs::Encoding;
use std::fmt;

use super::Facts;

/// Representation type requested with `TYPE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Ascii,
    Binary,
}

/// Commands sent on the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    User(String),
    Pass(String),
    Cwd(String),
    Cdup,
    Pwd,
    Type(TransferType),
    Epsv,
    Pasv,
    OptsMlst(Facts),
    Mlsd(Option<String>),
    List(Option<String>),
    Retr(String),
    Quit,
}

impl Command {
    fn line(&self) -> String {
        match self {
            Self::User(user) => format!("USER {user}"),
            Self::Pass(pass) => format!("PASS {pass}"),
            Self::Cwd(dir) => format!("CWD {dir}"),
            Self::Cdup => "CDUP".to_owned(),
            Self::Pwd => "PWD".to_owned(),
            Self::Type(TransferType::Ascii) => "TYPE A".to_owned(),
            Self::Type(TransferType::Binary) => "TYPE I".to_owned(),
            Self::Epsv => "EPSV".to_owned(),
            Self::Pasv => "PASV".to_owned(),
            Self::OptsMlst(facts) => format!("OPTS MLST {}", facts.opts_argument()),
            Self::Mlsd(Some(path)) => format!("MLSD {path}"),
            Self::Mlsd(None) => "MLSD".to_owned(),
            Self::List(Some(path)) => format!("LIST {path}"),
            Self::List(None) => "LIST".to_owned(),
            Self::Retr(name) => format!("RETR {name}"),
            Self::Quit => "QUIT".to_owned(),
        }
    }

    /// Encodes the command line with the session text encoding and the
    /// terminating CRLF.
    pub fn encode(&self, encoding: &'static Encoding) -> Bytes {
        let line = self.line();
        let (encoded, _, _) = encoding.encode(&line);

        let mut bytes = BytesMut::with_capacity(encoded.len() + 2);
        bytes.put_slice(&encoded);
        bytes.put_slice(b"\r\n");

        bytes.freeze()
    }
}

/// Log-friendly rendering, the password never leaves the session.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(_) => f.write_str("PASS ****"),
            command => f.write_str(&command.line()),
        }
    }
}
