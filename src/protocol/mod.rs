mod command;
mod facts;
mod passive;
mod reply;

pub use self::{
    command::{Command, TransferType},
    facts::{parse_fact_line, FactMap, Facts},
    passive::{parse_epsv, parse_pasv},
    reply::{Reply, ReplyCode, ReplyKind},
};

/// Default control-channel port
pub const DEFAULT_PORT: u16 = 21;

pub const READY: u16 = 220;
pub const CLOSING: u16 = 221;
pub const NEED_PASSWORD: u16 = 331;
pub const PATH_CREATED: u16 = 257;
