//! store
//!
//! The document store: a git working copy of Markdown pages.
//!
//! # Architecture
//!
//! [`Store`] owns the working copy exclusively. Every operation takes one
//! global lock for its full duration, so reads never observe a half-written
//! document and commits are totally ordered. The lock is never handed out;
//! callers only see operation-level methods:
//!
//! - [`Store::bootstrap`] - create or reuse the working copy and reset it
//! - [`Store::read`] - render a page for the editor
//! - [`Store::stage`] - convert, write and commit an edit
//! - [`Store::reconcile`] - pull --rebase then push
//!
//! All methods block. Async callers run them on the blocking pool.
//!
//! # Invariants
//!
//! - Frontmatter already on disk is never changed by an edit
//! - Edits never create documents
//! - A failed stage leaves no uncommitted change behind
//! - A failed pull never leaves a rebase in progress

mod accessor;
mod mutator;

pub use accessor::Page;

use std::path::PathBuf;

use parking_lot::Mutex;
use thiserror::Error;

use crate::core::config::StoreSettings;
use crate::core::paths::StorePaths;
use crate::core::types::{PagePath, TypeError};
use crate::git::{CommitInfo, Git, GitError, GitState};
use crate::markup::{ConvertError, Converter, HtmlConverter, MarkdownRenderer, Renderer};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The page has no document. Edits never create documents.
    #[error("document not found: {path}")]
    DocumentNotFound { path: PagePath },

    /// The requested page path is not valid.
    #[error("invalid page path: {0}")]
    InvalidPath(String),

    /// The edit would leave the document without a body.
    #[error("refusing to save empty document: {path}")]
    EmptyBody { path: PagePath },

    /// The submitted markup could not be converted.
    #[error("conversion failed: {0}")]
    Conversion(#[from] ConvertError),

    /// Filesystem access failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A git operation failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// No repository exists and no remote was given to create one.
    #[error("no repository at {work_dir} and no remote configured")]
    MissingRemote { work_dir: PathBuf },
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        StoreError::InvalidPath(err.to_string())
    }
}

/// Everything guarded by the store lock.
struct Workspace {
    git: Git,
    paths: StorePaths,
    settings: StoreSettings,
}

/// The document store.
pub struct Store {
    workspace: Mutex<Workspace>,
    renderer: Box<dyn Renderer>,
    converter: Box<dyn Converter>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Prepare the working copy and open the store.
    ///
    /// If `settings.work_dir` holds no repository, one is created with
    /// `remote_url` as its remote. An existing repository missing the remote
    /// gets it added when `remote_url` is given. Then, unconditionally:
    /// `reset --hard` (discarding writes a crashed process left behind),
    /// `fetch`, and `checkout` of the configured branch.
    ///
    /// Safe to call repeatedly on the same directory.
    ///
    /// # Errors
    ///
    /// - [`StoreError::MissingRemote`] if a repository must be created but
    ///   `remote_url` is `None`
    /// - [`StoreError::Git`] if any git command fails
    pub fn bootstrap(settings: StoreSettings, remote_url: Option<&str>) -> Result<Self, StoreError> {
        let remote = settings.remote_name.as_str();
        let branch = settings.branch.as_str();

        let git = if Git::exists(&settings.work_dir) {
            let git = Git::open(&settings.work_dir)?.with_identity(settings.committer.clone());
            if git.remote_url(remote)?.is_none() {
                if let Some(url) = remote_url {
                    tracing::info!(%remote, %url, "adding missing remote");
                    git.add_remote(remote, url)?;
                }
            }
            git
        } else {
            let url = remote_url.ok_or_else(|| StoreError::MissingRemote {
                work_dir: settings.work_dir.clone(),
            })?;
            tracing::info!(work_dir = %settings.work_dir.display(), %url, "initializing store");
            let git = Git::init(&settings.work_dir)?.with_identity(settings.committer.clone());
            git.add_remote(remote, url)?;
            git
        };

        git.reset_hard()?;
        git.fetch(remote, branch)?;
        git.checkout(branch)?;

        let paths = StorePaths::new(git.work_dir().to_path_buf());
        let head = git.head_oid()?;
        tracing::info!(
            work_dir = %paths.work_dir().display(),
            %remote,
            %branch,
            head = head.as_ref().map(|oid| oid.short(7)).unwrap_or("none"),
            "store ready"
        );

        Ok(Self {
            workspace: Mutex::new(Workspace {
                git,
                paths,
                settings,
            }),
            renderer: Box::new(MarkdownRenderer::default()),
            converter: Box::new(HtmlConverter),
        })
    }

    /// Replace the Markdown → HTML renderer.
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Replace the HTML → Markdown converter.
    pub fn with_converter(mut self, converter: impl Converter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    /// Pull the remote branch with rebase, then push.
    ///
    /// If the pull stops in a conflicted rebase, the rebase is aborted
    /// before returning so local commits stay intact and staging keeps
    /// working. The pull error is returned either way.
    ///
    /// # Errors
    ///
    /// [`StoreError::Git`] if the pull or the push fails.
    pub fn reconcile(&self) -> Result<(), StoreError> {
        let ws = self.workspace.lock();
        let remote = ws.settings.remote_name.as_str();
        let branch = ws.settings.branch.as_str();

        if let Err(err) = ws.git.pull_rebase(remote, branch) {
            match ws.git.state() {
                GitState::Rebase => {
                    tracing::warn!(%remote, %branch, "pull left a rebase in progress, aborting it");
                    if let Err(abort_err) = ws.git.rebase_abort() {
                        tracing::error!(error = %abort_err, "rebase --abort failed");
                    }
                }
                state if state.is_in_progress() => {
                    tracing::error!(%state, "pull left an operation in progress");
                }
                _ => {}
            }
            return Err(err.into());
        }

        ws.git.push(remote, branch)?;
        tracing::debug!(%remote, %branch, "reconciled with remote");
        Ok(())
    }

    /// The most recent commit, if any.
    pub fn last_commit(&self) -> Result<Option<CommitInfo>, StoreError> {
        let ws = self.workspace.lock();
        Ok(ws.git.recent_commits(1)?.into_iter().next())
    }
}
