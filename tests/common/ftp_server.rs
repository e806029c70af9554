//! Loopback control-channel server serving a [`Node`] tree, enough of the
//! protocol for the client under test.

use std::{net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

use super::Node;

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    pub epsv: bool,
    pub mlsd: bool,
    /// Address advertised in `227` replies instead of the loopback one
    pub pasv_host: Option<[u8; 4]>,
    /// File whose data connection stalls after two bytes
    pub stall_retr: Option<&'static str>,
    /// Directory whose `CWD` is answered only after [`SLOW_REPLY`]
    pub slow_cwd: Option<&'static str>,
}

pub const SLOW_REPLY: Duration = Duration::from_secs(2);

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            epsv: true,
            mlsd: true,
            pasv_host: None,
            stall_retr: None,
            slow_cwd: None,
        }
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    /// Commands received, passwords included
    pub handle: JoinHandle<Vec<String>>,
}

/// Serves exactly one control connection.
pub async fn spawn(root: Node, options: ServerOptions) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve(stream, root, options).await
    });

    TestServer { addr, handle }
}

async fn serve(stream: TcpStream, root: Node, options: ServerOptions) -> Vec<String> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    let mut cwd: Vec<String> = Vec::new();
    let mut data: Option<TcpListener> = None;
    let mut received = Vec::new();

    write
        .write_all(b"220-Test server\r\n ready for tests\r\n220 Ready\r\n")
        .await
        .unwrap();

    while let Ok(Some(line)) = lines.next_line().await {
        received.push(line.clone());
        let (verb, arg) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        let here = cwd
            .iter()
            .try_fold(&root, |node, name| node.child(name))
            .unwrap_or(&root);

        let reply = match verb {
            "USER" => "331 Password required".to_owned(),
            "PASS" if arg == "secret" => "230 Logged in".to_owned(),
            "PASS" => "530 Login incorrect".to_owned(),
            "PWD" => format!("257 \"/{}\" is the current directory", cwd.join("/")),
            "CWD" if options.slow_cwd == Some(arg) => {
                tokio::time::sleep(SLOW_REPLY).await;
                "250 Directory changed".to_owned()
            }
            "CWD" => match here.child(arg) {
                Some(Node::Dir(_)) => {
                    cwd.push(arg.to_owned());
                    "250 Directory changed".to_owned()
                }
                _ => "550 No such directory".to_owned(),
            },
            "CDUP" => {
                let _ = cwd.pop();
                "250 Directory changed".to_owned()
            }
            "TYPE" | "OPTS" => "200 OK".to_owned(),
            "EPSV" if options.epsv => {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let port = listener.local_addr().unwrap().port();
                data = Some(listener);
                format!("229 Entering Extended Passive Mode (|||{port}|)")
            }
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let port = listener.local_addr().unwrap().port();
                data = Some(listener);
                let [a, b, c, d] = options.pasv_host.unwrap_or([127, 0, 0, 1]);
                format!(
                    "227 Entering Passive Mode ({a},{b},{c},{d},{},{})",
                    port >> 8,
                    port & 0xff
                )
            }
            "MLSD" if options.mlsd => {
                let body = here
                    .facts()
                    .into_iter()
                    .map(|(name, facts)| {
                        let mut keys = facts.keys().collect::<Vec<_>>();
                        keys.sort();
                        let facts = keys
                            .into_iter()
                            .map(|k| format!("{k}={};", facts[k]))
                            .collect::<String>();
                        format!("{facts} {name}\r\n")
                    })
                    .collect::<String>();
                send_data(&mut write, data.take(), body.as_bytes()).await
            }
            "LIST" => {
                let body = here.plain_text();
                send_data(&mut write, data.take(), body.as_bytes()).await
            }
            "RETR" => match here.child(arg) {
                Some(Node::File(bytes)) if options.stall_retr == Some(arg) => {
                    let head = bytes[..bytes.len().min(2)].to_vec();
                    stall_data(&mut write, data.take(), &head).await
                }
                Some(Node::File(bytes)) => {
                    let bytes = bytes.clone();
                    send_data(&mut write, data.take(), &bytes).await
                }
                _ => {
                    data = None;
                    "550 No such file".to_owned()
                }
            },
            "QUIT" => {
                write.write_all(b"221 Bye\r\n").await.unwrap();
                break;
            }
            _ => "500 Unknown command".to_owned(),
        };

        // the client may already have hung up on a slow reply
        if write.write_all(format!("{reply}\r\n").as_bytes()).await.is_err() {
            break;
        }
    }

    received
}

/// Sends the preliminary reply, pushes `body` over the data connection and
/// returns the completion reply.
async fn send_data(
    write: &mut tokio::net::tcp::OwnedWriteHalf,
    listener: Option<TcpListener>,
    body: &[u8],
) -> String {
    let Some(listener) = listener else {
        return "425 Use PASV or EPSV first".to_owned();
    };

    write
        .write_all(b"150 Opening data connection\r\n")
        .await
        .unwrap();

    let (mut stream, _) = listener.accept().await.unwrap();
    stream.write_all(body).await.unwrap();
    stream.shutdown().await.unwrap();

    "226 Transfer complete".to_owned()
}

/// Sends `head` and then holds the data connection open without sending the
/// rest, until the client closes it.
async fn stall_data(
    write: &mut tokio::net::tcp::OwnedWriteHalf,
    listener: Option<TcpListener>,
    head: &[u8],
) -> String {
    let Some(listener) = listener else {
        return "425 Use PASV or EPSV first".to_owned();
    };

    write
        .write_all(b"150 Opening data connection\r\n")
        .await
        .unwrap();

    let (mut stream, _) = listener.accept().await.unwrap();
    stream.write_all(head).await.unwrap();

    let mut rest = Vec::new();
    let _ = stream.read_to_end(&mut rest).await;

    "426 Connection closed; transfer aborted".to_owned()
}
