use std::path::Path;
use tokio::{fs::File, io::AsyncWriteExt};

use super::{
    error::{SessionError, SessionResult, TransportResult},
    fs::{is_safe_name, Listing, RemotePath, Step},
    transport::Transport,
    RawFtpSession,
};
use crate::{config::SessionConfig, protocol::Facts};

/// Facts requested for every structured listing
pub const LISTING_FACTS: Facts = Facts::TYPE.union(Facts::SIZE).union(Facts::MODIFY);

/// High-level session bound to one remote endpoint.
///
/// Tracks the logical remote working directory, which only moves one
/// directory at a time: into a named child or up to the parent. Every method
/// takes `&mut self`, so a navigate/act/navigate-back sequence can never
/// interleave with another caller on the same connection.
pub struct FtpSession<T = RawFtpSession> {
    config: Option<SessionConfig>,
    transport: T,
    cwd: RemotePath,
}

impl FtpSession<RawFtpSession> {
    /// Connects, logs in and records the server working directory.
    pub async fn connect(config: SessionConfig) -> SessionResult<Self> {
        let encoding = config.encoding()?;
        let timeout = config.timeout()?;
        let mut raw = RawFtpSession::connect(&config.addr, config.port, timeout, encoding).await?;

        let (username, password) = config.credentials();
        raw.login(username, password).await?;

        info!("{} welcome msg: {}", config.addr, raw.welcome_message());

        let mut session = Self::with_transport(raw).await;
        session.config = Some(config);

        Ok(session)
    }

    /// Connects with settings read from a JSON file
    pub async fn from_json<P: AsRef<Path>>(path: P) -> SessionResult<Self> {
        Self::connect(SessionConfig::from_json(path)?).await
    }
}

impl<T: Transport> FtpSession<T> {
    /// Wraps an already authenticated transport, assuming it starts at `/`.
    pub fn new(transport: T) -> Self {
        Self {
            config: None,
            transport,
            cwd: RemotePath::root(),
        }
    }

    /// Wraps an already authenticated transport and asks it for its working
    /// directory, falling back to `/` if it cannot tell.
    pub async fn with_transport(mut transport: T) -> Self {
        let cwd = match transport.current_directory().await {
            Ok(Some(path)) => RemotePath::new(path),
            Ok(None) => RemotePath::root(),
            Err(error) => {
                debug!("cannot query working directory, assuming /: {}", error);
                RemotePath::root()
            }
        };

        Self {
            config: None,
            transport,
            cwd,
        }
    }

    /// Settings the session was connected with, if any
    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    /// Logical remote working directory
    pub fn current_path(&self) -> &RemotePath {
        &self.cwd
    }

    pub fn welcome_message(&self) -> &str {
        self.transport.welcome_message()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Moves one directory down or up.
    ///
    /// The logical path is only updated once the transport accepted the
    /// change, so on error it still matches the transport. Returns whether
    /// the logical path changed, which is `false` when ascending at the root.
    pub async fn navigate(&mut self, step: &Step) -> SessionResult<bool> {
        if let Step::Child(name) = step {
            if !is_safe_name(name) {
                return Err(SessionError::UnsafeName(name.clone()));
            }
        }

        let target = self.cwd.apply(step);

        if let Err(source) = self.transport.change_directory(step.as_transport_arg()).await {
            return Err(SessionError::Navigation {
                step: step.clone(),
                path: self.cwd.clone(),
                source,
            });
        }

        debug!("cwd {} -> {}", self.cwd, target);
        let changed = target != self.cwd;
        self.cwd = target;

        Ok(changed)
    }

    /// Descends into `name` or, for `..`, ascends.
    pub async fn change_dir(&mut self, step: &str) -> SessionResult<bool> {
        self.navigate(&Step::parse(step)?).await
    }

    pub async fn go_parent(&mut self) -> SessionResult<bool> {
        self.navigate(&Step::Parent).await
    }

    /// Jumps to a typed path, absolute or relative to the current directory.
    ///
    /// The jump is carried out as single steps. If one of them fails the
    /// session navigates back to where it started and returns the failure.
    pub async fn change_path(&mut self, target: &str) -> SessionResult<bool> {
        let previous = self.cwd.clone();
        let target = if target.starts_with('/') {
            RemotePath::new(target)
        } else {
            RemotePath::new(format!("{previous}/{target}"))
        };

        for step in previous.steps_to(&target)? {
            if let Err(error) = self.navigate(&step).await {
                warn!("cannot change path to {}: {}", target, error);
                self.restore(&previous).await;
                return Err(error);
            }
        }

        Ok(self.cwd != previous)
    }

    async fn restore(&mut self, previous: &RemotePath) {
        let steps = match self.cwd.steps_to(previous) {
            Ok(steps) => steps,
            Err(error) => {
                error!("cannot restore {}: {}", previous, error);
                return;
            }
        };

        for step in steps {
            if let Err(error) = self.navigate(&step).await {
                error!("cannot restore {}, left at {}: {}", previous, self.cwd, error);
                return;
            }
        }
    }

    /// Structured entries of the current directory
    pub async fn list(&mut self) -> SessionResult<Listing> {
        self.list_path(".").await
    }

    /// Structured entries of `path`, in server order.
    ///
    /// If the server cannot produce structured facts, the plain listing is
    /// logged and handed back inside [`SessionError::ListingUnavailable`].
    pub async fn list_path(&mut self, path: &str) -> SessionResult<Listing> {
        let source = match self.transport.list_structured(path, LISTING_FACTS).await {
            Ok(raw) => return Ok(Listing::from_facts(raw)),
            Err(source) => source,
        };

        warn!("structured listing of {} failed ({}), falling back to LIST", self.cwd, source);

        let fallback = match self.transport.list_plain_text(path).await {
            Ok(text) => {
                info!("listing of {}:\n{}", self.cwd, text);
                Some(text)
            }
            Err(error) => {
                warn!("plain listing failed too: {}", error);
                None
            }
        };

        Err(SessionError::ListingUnavailable {
            path: self.cwd.clone(),
            source,
            fallback,
        })
    }

    /// Downloads `name` from the current remote directory to
    /// `local_dir/name`. Returns the number of bytes written.
    ///
    /// A partially written file is left in place on failure.
    pub async fn retrieve<P: AsRef<Path>>(&mut self, name: &str, local_dir: P) -> SessionResult<u64> {
        let local_dir = local_dir.as_ref();
        if !is_safe_name(name) {
            return Err(SessionError::UnsafeName(name.to_owned()));
        }

        let destination = local_dir.join(name);
        let transport = &mut self.transport;

        let result: TransportResult<u64> = async {
            let mut file = File::create(&destination).await?;
            let written = transport.retrieve_binary(name, &mut file).await;
            file.flush().await?;
            written
        }
        .await;

        match result {
            Ok(written) => {
                debug!("{} -> {} ({} bytes)", name, destination.display(), written);
                Ok(written)
            }
            Err(source) => {
                warn!("cannot download {} into {}: {}", name, local_dir.display(), source);
                Err(SessionError::Retrieval {
                    name: name.to_owned(),
                    destination: local_dir.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Ends the session.
    pub async fn disconnect(mut self) -> SessionResult<()> {
        Ok(self.transport.quit().await?)
    }
}
