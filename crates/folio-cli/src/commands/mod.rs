//! Command handlers

pub mod config;
pub mod content;
pub mod delete;
pub mod draft;
pub mod edit;
pub mod head;
pub mod status;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Args;

use folio_core::commit::{relay, spawn_local_backend};
use folio_core::models::{Image, KnowledgeType};
use folio_core::{
    BackendKind, Category, CommitClient, CommitError, CommitSettings, CommonItem, Config,
    ContentRoot, DraftStore, EditSession, FileStore, IdAllocator, ItemPatch, ModalHost,
};

use crate::interact::{FixedAnswer, OutputNotifier, ReloadSignal, TerminalModal};
use crate::output::Output;

/// Field edits accepted by `new`, `edit` and `draft save`
#[derive(Args, Debug, Default, Clone)]
pub struct EditArgs {
    /// Title (articles, knowledges)
    #[arg(short = 'T', long)]
    pub title: Option<String>,

    /// Tags, replacing the current ones (articles)
    #[arg(short, long)]
    pub tag: Vec<String>,

    /// Image URLs, replacing the current ones (records)
    #[arg(long)]
    pub image: Vec<String>,

    /// Summary (knowledges)
    #[arg(long)]
    pub summary: Option<String>,

    /// Link (knowledges)
    #[arg(long)]
    pub link: Option<String>,

    /// Cover image URL (knowledges)
    #[arg(long)]
    pub cover: Option<String>,

    /// Knowledge type: book, film or game
    #[arg(long = "type")]
    pub kind: Option<KnowledgeType>,

    /// Mark the item encrypted (true/false)
    #[arg(long)]
    pub encrypt: Option<bool>,

    /// Read the markdown body from a file
    #[arg(short, long)]
    pub body_file: Option<PathBuf>,

    /// Start from the saved draft before applying these edits
    #[arg(long)]
    pub from_draft: bool,
}

impl EditArgs {
    /// The field edits as a partial item
    pub fn patch(&self) -> ItemPatch {
        ItemPatch {
            title: self.title.clone(),
            tags: (!self.tag.is_empty()).then(|| self.tag.clone()),
            images: (!self.image.is_empty())
                .then(|| self.image.iter().map(Image::new).collect()),
            summary: self.summary.clone(),
            link: self.link.clone(),
            cover: self.cover.clone(),
            kind: self.kind,
            encrypt: self.encrypt,
            ..Default::default()
        }
    }

    /// The new body, if one was given
    pub fn read_body(&self) -> Result<Option<String>> {
        self.body_file
            .as_ref()
            .map(|path| {
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read body file {:?}", path))
            })
            .transpose()
    }
}

/// Everything a command needs from the environment
pub struct Workspace {
    pub config: Config,
    pub content: ContentRoot,
    pub ids: Arc<IdAllocator>,
}

impl Workspace {
    pub fn new(config: Config) -> Self {
        Self {
            content: ContentRoot::new(&config.content_root),
            config,
            ids: Arc::new(IdAllocator::new()),
        }
    }

    /// Draft store backed by the drafts file
    pub fn drafts(&self, output: &Output) -> DraftStore<FileStore> {
        DraftStore::new(
            FileStore::new(self.config.drafts_path()),
            Arc::new(OutputNotifier::new(output.format)),
        )
    }

    /// Connect to the configured backend
    pub async fn connect(&self, output: &Output) -> Result<(CommitClient, Arc<ReloadSignal>)> {
        let channel = match self.config.backend {
            BackendKind::Local => spawn_local_backend(&self.config.content_root),
            BackendKind::Relay => {
                let url = self.config.relay_url.as_deref().context(
                    "backend is 'relay' but relay_url is not set.\n\
                     Set it with: folio config set relay_url ws://host:port",
                )?;
                relay::connect(url).await?
            }
        };

        let reload = Arc::new(ReloadSignal::default());
        let client = CommitClient::new(
            channel,
            Arc::new(OutputNotifier::new(output.format)),
            reload.clone(),
            CommitSettings::from(&self.config),
        );
        Ok((client, reload))
    }

    /// Fetch the backend head the coming edit is based on
    pub async fn base_head(&self, client: &CommitClient, output: &Output) -> Result<String> {
        with_timeout(self.config.commit_timeout(), client.refresh_head())
            .await?
            .map_err(|e| commit_failed(e, output))
    }

    /// Start a session on an existing item, or a new one when `id` is `None`
    pub fn open_session(
        &self,
        category: Category,
        id: Option<u64>,
        list: &[CommonItem],
    ) -> Result<EditSession> {
        match id {
            Some(id) => {
                let item = list
                    .iter()
                    .find(|item| item.id() == id)
                    .cloned()
                    .with_context(|| format!("No {} item with ID {}", category, id))?;
                let body = self.content.load_body(category, id)?;
                Ok(EditSession::begin_existing(item, body))
            }
            None => Ok(EditSession::begin_new(
                category,
                list,
                self.config.id_length,
            )?),
        }
    }
}

/// How stale-commit questions get answered
pub fn modal_host(output: &Output, yes: bool) -> Box<dyn ModalHost> {
    if yes {
        Box::new(FixedAnswer(true))
    } else if output.should_prompt() {
        Box::new(TerminalModal::default())
    } else {
        // Nobody to ask
        Box::new(FixedAnswer(false))
    }
}

/// Await `fut`, bounded by `limit` when set
pub async fn with_timeout<F: Future>(limit: Option<Duration>, fut: F) -> Result<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            anyhow!(
                "Timed out after {}s waiting for the commit backend",
                limit.as_secs()
            )
        }),
        None => Ok(fut.await),
    }
}

/// Turn a commit error into a reported failure
pub fn commit_failed(err: CommitError, output: &Output) -> anyhow::Error {
    if let Some(suggestion) = err.recovery_suggestion() {
        output.warning(suggestion);
    }
    anyhow::Error::new(err).context("Commit failed")
}
