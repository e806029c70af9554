pub mod error;
pub mod fs;
mod mirror;
pub mod rawsession;
mod session;
mod table;
mod transport;

pub use error::{SessionError, SessionResult};
pub use mirror::{MirrorFailure, MirrorReport};
pub use rawsession::RawFtpSession;
pub use session::{FtpSession, LISTING_FACTS};
pub use table::{Column, Order, RemoteTable};
pub use transport::{Sink, Transport};
