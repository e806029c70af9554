//! Remote directory state and listings.
//!
//! [`RemotePath`] is the client-side record of the server working directory,
//! [`Listing`] the structured entries of one directory.

mod dir;
mod path;

pub use dir::{DirectoryEntry, EntryKind, Listing};
pub use path::{is_safe_name, RemotePath, Step, PARENT};
