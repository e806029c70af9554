use tokio::io::AsyncWrite;

use super::error::TransportResult;
use crate::protocol::{FactMap, Facts};

/// Destination of a binary retrieval
pub type Sink<'a> = &'a mut (dyn AsyncWrite + Unpin + Send);

/// Capabilities the session requires from one authenticated connection.
///
/// Implementations serve exactly one outstanding command at a time, so every
/// method takes `&mut self`.
#[async_trait]
pub trait Transport: Send {
    /// Changes the server-side working directory. `name` is either a child
    /// directory name or `..` for the parent.
    async fn change_directory(&mut self, name: &str) -> TransportResult<()>;

    /// Machine listing of `path` restricted to `facts`, in server order.
    async fn list_structured(
        &mut self,
        path: &str,
        facts: Facts,
    ) -> TransportResult<Vec<(String, FactMap)>>;

    /// Human-readable listing of `path`, used when structured facts fail.
    async fn list_plain_text(&mut self, path: &str) -> TransportResult<String>;

    /// Streams the bytes of `name` in the current directory into `sink`.
    /// Returns the number of bytes written.
    async fn retrieve_binary(&mut self, name: &str, sink: Sink<'_>) -> TransportResult<u64>;

    /// Greeting the server sent when the connection was established.
    fn welcome_message(&self) -> &str;

    /// Queries the server-side working directory.
    /// Returns [`Ok(None)`] if the transport cannot tell.
    async fn current_directory(&mut self) -> TransportResult<Option<String>> {
        Ok(None)
    }

    /// Ends the session politely.
    async fn quit(&mut self) -> TransportResult<()> {
        Ok(())
    }
}
