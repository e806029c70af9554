#[macro_use]
extern crate log;
#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate async_trait;

/// Client side: transport, session and mirror engine
pub mod client;
pub mod config;
mod error;
/// Control-channel protocol vocabulary
pub mod protocol;
mod utils;

pub use client::{FtpSession, MirrorReport, SessionError};
pub use config::SessionConfig;
pub use error::Error;
