use std::{
    future::Future,
    path::{Path, PathBuf},
    pin::Pin,
};
use tokio::fs;
use tokio_util::sync::CancellationToken;

use super::{
    error::{SessionError, SessionResult},
    fs::{is_safe_name, DirectoryEntry, EntryKind, RemotePath, Step},
    session::FtpSession,
    transport::Transport,
};

type MirrorFuture<'a> = Pin<Box<dyn Future<Output = SessionResult<()>> + Send + 'a>>;

/// One isolated failure met while mirroring.
#[derive(Debug)]
pub struct MirrorFailure {
    /// Remote entry the failure belongs to
    pub remote: RemotePath,
    /// Local directory that was being filled
    pub local: PathBuf,
    pub error: SessionError,
}

/// Outcome of a mirror or download run.
#[derive(Debug, Default)]
pub struct MirrorReport {
    /// Local directories created (or found) in visiting order
    pub directories: Vec<PathBuf>,
    /// Local files written with their sizes
    pub files: Vec<(PathBuf, u64)>,
    pub failures: Vec<MirrorFailure>,
    pub cancelled: bool,
}

impl MirrorReport {
    /// Returns `true` if nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Failures whose remote entry is named `name`
    pub fn failures_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MirrorFailure> {
        self.failures
            .iter()
            .filter(move |f| f.remote.segments().last() == Some(name))
    }

    pub fn merge(&mut self, other: Self) {
        self.directories.extend(other.directories);
        self.files.extend(other.files);
        self.failures.extend(other.failures);
        self.cancelled |= other.cancelled;
    }

    fn fail(&mut self, remote: RemotePath, local: &Path, error: SessionError) {
        warn!("{}: {}", remote, error);
        self.failures.push(MirrorFailure {
            remote,
            local: local.to_path_buf(),
            error,
        });
    }

    fn cancel(&mut self, remote: RemotePath, local: &Path) {
        if !self.cancelled {
            self.cancelled = true;
            self.fail(remote, local, SessionError::Cancelled);
        }
    }
}

impl<T: Transport> FtpSession<T> {
    /// Mirrors the remote directory `name` (a child of the current directory)
    /// to `local_root/name`.
    ///
    /// Failures of single files, listings or child directories are collected
    /// in the report and never stop the walk. The session is back in its
    /// starting directory when this returns `Ok`. `Err` means the way back up
    /// was refused and the working directory is no longer known to match.
    pub async fn mirror_directory<P: AsRef<Path>>(
        &mut self,
        name: &str,
        local_root: P,
    ) -> SessionResult<MirrorReport> {
        self.mirror_directory_with_cancel(name, local_root, &CancellationToken::new())
            .await
    }

    /// Same as [`FtpSession::mirror_directory`], stopping before the next
    /// entry once `cancel` fires. Directories already entered are still left
    /// on the way out.
    pub async fn mirror_directory_with_cancel<P: AsRef<Path>>(
        &mut self,
        name: &str,
        local_root: P,
        cancel: &CancellationToken,
    ) -> SessionResult<MirrorReport> {
        let local_root = local_root.as_ref();
        let mut report = MirrorReport::default();

        info!("mirroring {} into {}", self.current_path().join(name), local_root.display());
        self.mirror_tree(name, local_root, cancel, &mut report).await?;
        info!(
            "mirrored {}: {} directories, {} files, {} failures",
            name,
            report.directories.len(),
            report.files.len(),
            report.failure_count()
        );

        Ok(report)
    }

    /// Downloads a selection of entries of the current directory into
    /// `local_root`: files are retrieved, directories mirrored.
    pub async fn download<'e, I, P>(&mut self, selection: I, local_root: P) -> SessionResult<MirrorReport>
    where
        I: IntoIterator<Item = &'e DirectoryEntry>,
        P: AsRef<Path>,
    {
        let local_root = local_root.as_ref();
        let cancel = CancellationToken::new();
        let mut report = MirrorReport::default();

        for entry in selection {
            self.mirror_entry(entry, local_root, &cancel, &mut report)
                .await?;
        }

        Ok(report)
    }

    fn mirror_tree<'a>(
        &'a mut self,
        name: &'a str,
        local_root: &'a Path,
        cancel: &'a CancellationToken,
        report: &'a mut MirrorReport,
    ) -> MirrorFuture<'a> {
        Box::pin(async move {
            let remote = self.current_path().join(name);
            let step = match Step::child(name) {
                Ok(step) => step,
                Err(error) => {
                    report.fail(remote, local_root, error);
                    return Ok(());
                }
            };

            let local = local_root.join(name);
            if let Err(source) = fs::create_dir_all(&local).await {
                let error = SessionError::LocalIo {
                    path: local.clone(),
                    source,
                };
                report.fail(remote, local_root, error);
                return Ok(());
            }
            report.directories.push(local.clone());

            if let Err(error) = self.navigate(&step).await {
                report.fail(remote, &local, error);
                return Ok(());
            }

            let walked = self.mirror_entries(&local, cancel, report).await;

            let ascended = self.navigate(&Step::Parent).await;
            if let Err(error) = &ascended {
                error!("cannot leave {}, mirror aborted: {}", remote, error);
            }

            walked.and(ascended.map(|_| ()))
        })
    }

    async fn mirror_entries(
        &mut self,
        local: &Path,
        cancel: &CancellationToken,
        report: &mut MirrorReport,
    ) -> SessionResult<()> {
        let listing = match self.list().await {
            Ok(listing) => listing,
            Err(error) => {
                report.fail(self.current_path().clone(), local, error);
                return Ok(());
            }
        };

        for entry in &listing {
            self.mirror_entry(entry, local, cancel, report).await?;
        }

        Ok(())
    }

    async fn mirror_entry(
        &mut self,
        entry: &DirectoryEntry,
        local: &Path,
        cancel: &CancellationToken,
        report: &mut MirrorReport,
    ) -> SessionResult<()> {
        let remote = self.current_path().join(&entry.name);

        if cancel.is_cancelled() {
            report.cancel(remote, local);
            return Ok(());
        }

        if !is_safe_name(&entry.name) {
            report.fail(remote, local, SessionError::UnsafeName(entry.name.clone()));
            return Ok(());
        }

        match &entry.kind {
            EntryKind::File => match self.retrieve(&entry.name, local).await {
                Ok(written) => report.files.push((local.join(&entry.name), written)),
                Err(error) => report.fail(remote, local, error),
            },
            EntryKind::Directory => {
                self.mirror_tree(&entry.name, local, cancel, report).await?;
            }
            EntryKind::Other(kind) => {
                let error = SessionError::UnsupportedEntryKind {
                    name: entry.name.clone(),
                    kind: EntryKind::Other(kind.clone()),
                };
                report.fail(remote, local, error);
            }
        }

        Ok(())
    }
}
