#![allow(dead_code)]

pub mod ftp_server;

use async_trait::async_trait;
use ftp_mirror::{
    client::{
        error::{Error, TransportResult},
        Sink, Transport,
    },
    protocol::{FactMap, Facts, Reply, ReplyCode},
};
use std::collections::HashSet;
use tokio::io::AsyncWriteExt;

pub const MODIFY: &str = "20240102030405";

/// In-memory remote tree
#[derive(Debug, Clone)]
pub enum Node {
    File(Vec<u8>),
    Dir(Vec<(String, Node)>),
    Other(String),
}

impl Node {
    pub fn file(data: &[u8]) -> Self {
        Self::File(data.to_vec())
    }

    pub fn dir<const N: usize>(children: [(&str, Node); N]) -> Self {
        Self::Dir(
            children
                .into_iter()
                .map(|(name, node)| (name.to_owned(), node))
                .collect(),
        )
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        match self {
            Self::Dir(children) => children.iter().find(|(n, _)| n == name).map(|(_, n)| n),
            _ => None,
        }
    }

    fn at(&self, path: &[String]) -> Option<&Node> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    /// Machine listing lines the way a server formats them
    pub fn facts(&self) -> Vec<(String, FactMap)> {
        let Self::Dir(children) = self else {
            return Vec::new();
        };

        let mut entries = vec![(".".to_owned(), fact_map(&[("type", "cdir")]))];
        entries.extend(children.iter().map(|(name, node)| {
            let facts = match node {
                Self::File(data) => fact_map(&[
                    ("type", "file"),
                    ("size", data.len().to_string().as_str()),
                    ("modify", MODIFY),
                ]),
                Self::Dir(_) => fact_map(&[("type", "dir"), ("modify", MODIFY)]),
                Self::Other(kind) => fact_map(&[("type", kind.as_str())]),
            };
            (name.clone(), facts)
        }));
        entries
    }

    pub fn plain_text(&self) -> String {
        let Self::Dir(children) = self else {
            return String::new();
        };

        children
            .iter()
            .map(|(name, node)| match node {
                Self::File(data) => format!("-rw-r--r-- 1 ftp ftp {} Jan 02 03:04 {name}\r\n", data.len()),
                Self::Dir(_) => format!("drwxr-xr-x 2 ftp ftp 4096 Jan 02 03:04 {name}\r\n"),
                Self::Other(_) => format!("lrwxrwxrwx 1 ftp ftp 1 Jan 02 03:04 {name}\r\n"),
            })
            .collect()
    }
}

pub fn fact_map(pairs: &[(&str, &str)]) -> FactMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

pub fn reply(code: u16, text: &str) -> Reply {
    Reply {
        code: ReplyCode(code),
        lines: vec![format!("{code} {text}")],
    }
}

/// Transport over an in-memory tree with fault injection
pub struct MockTransport {
    root: Node,
    cwd: Vec<String>,
    /// File names whose retrieval breaks after a few bytes
    pub fail_retrieve: HashSet<String>,
    /// Absolute directory paths whose structured listing fails
    pub fail_listing: HashSet<String>,
    /// Directory names the server refuses to enter
    pub fail_cwd: HashSet<String>,
    /// Refuse every ascend
    pub fail_cdup: bool,
    /// Every transport call, in order
    pub calls: Vec<String>,
}

impl MockTransport {
    pub fn new(root: Node) -> Self {
        Self {
            root,
            cwd: Vec::new(),
            fail_retrieve: HashSet::new(),
            fail_listing: HashSet::new(),
            fail_cwd: HashSet::new(),
            fail_cdup: false,
            calls: Vec::new(),
        }
    }

    /// Puts the server-side cursor somewhere below the root
    pub fn starting_in(mut self, path: &[&str]) -> Self {
        self.cwd = path.iter().map(|s| (*s).to_owned()).collect();
        self
    }

    /// Server-side working directory
    pub fn cwd(&self) -> String {
        format!("/{}", self.cwd.join("/"))
    }

    fn here(&self) -> &Node {
        self.root.at(&self.cwd).unwrap_or(&self.root)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn change_directory(&mut self, name: &str) -> TransportResult<()> {
        self.calls.push(format!("cwd {name}"));

        if name == ".." {
            if self.fail_cdup {
                return Err(reply(550, "CDUP refused").into());
            }
            let _ = self.cwd.pop();
            return Ok(());
        }

        if self.fail_cwd.contains(name) {
            return Err(reply(550, "Permission denied").into());
        }

        match self.here().child(name) {
            Some(Node::Dir(_)) => {
                self.cwd.push(name.to_owned());
                Ok(())
            }
            _ => Err(reply(550, "No such directory").into()),
        }
    }

    async fn list_structured(
        &mut self,
        path: &str,
        _facts: Facts,
    ) -> TransportResult<Vec<(String, FactMap)>> {
        self.calls.push(format!("mlsd {path}"));

        if self.fail_listing.contains(&self.cwd()) {
            return Err(reply(500, "MLSD not understood").into());
        }

        Ok(self.here().facts())
    }

    async fn list_plain_text(&mut self, path: &str) -> TransportResult<String> {
        self.calls.push(format!("list {path}"));
        Ok(self.here().plain_text())
    }

    async fn retrieve_binary(&mut self, name: &str, sink: Sink<'_>) -> TransportResult<u64> {
        self.calls.push(format!("retr {name}"));

        let data = match self.here().child(name) {
            Some(Node::File(data)) => data.clone(),
            _ => return Err(reply(550, "No such file").into()),
        };

        if self.fail_retrieve.contains(name) {
            sink.write_all(&data[..data.len().min(2)]).await?;
            return Err(Error::IO("connection reset by peer".to_owned()));
        }

        sink.write_all(&data).await?;
        Ok(data.len() as u64)
    }

    fn welcome_message(&self) -> &str {
        "mock server ready"
    }

    async fn current_directory(&mut self) -> TransportResult<Option<String>> {
        Ok(Some(self.cwd()))
    }
}

/// ```text
/// /
/// ├── readme.txt
/// ├── link            (symlink)
/// └── data/
///     ├── a.txt
///     ├── sub/
///     │   └── b.txt
///     └── z.txt
/// ```
pub fn sample_tree() -> Node {
    Node::dir([
        ("readme.txt", Node::file(b"read me")),
        ("link", Node::Other("os.unix=slink:/data".to_owned())),
        (
            "data",
            Node::dir([
                ("a.txt", Node::file(b"alpha")),
                ("sub", Node::dir([("b.txt", Node::file(b"bravo"))])),
                ("z.txt", Node::file(b"zulu")),
            ]),
        ),
    ])
}
