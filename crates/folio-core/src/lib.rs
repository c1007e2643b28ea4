//! Folio Core Library
//!
//! This crate provides the editing core for Folio, a content manager for a
//! static blog with three kinds of content: articles, records and
//! knowledges.
//!
//! # Architecture
//!
//! - **Listing + body files**: the site's source of truth, one JSON listing
//!   per category and one markdown body per item
//! - **Drafts**: in-progress edits, kept in a local key-value store
//! - **Commits**: batches of file changes sent to a backend, checked against
//!   the head the editor last saw
//!
//! # Quick Start
//!
//! ```text
//! let content = ContentRoot::new(&config.content_root);
//! let list = content.load_listing(Category::Articles)?;
//!
//! let mut session = EditSession::begin_new(Category::Articles, &list, config.id_length)?;
//! session.set_body("# Hello");
//!
//! let client = CommitClient::new(spawn_local_backend(content.path()), notifier, reloader, settings);
//! client.commit_request(session.commit_request(&list)?).await?;
//! ```
//!
//! # Modules
//!
//! - `models`: Item shapes, categories and file layout
//! - `ids`: Random item IDs and session-scoped IDs
//! - `assign`: Copying fields between items
//! - `diff`: Change detection against an origin snapshot
//! - `draft`: Draft save / load
//! - `storage`: Key-value stores and atomic writes
//! - `content`: Reading listings and bodies from disk
//! - `commit`: Commit protocol, local backend and relay transport
//! - `notify`: Notice, modal and reload surfaces
//! - `session`: One item under edit
//! - `config`: Application configuration

pub mod assign;
pub mod commit;
pub mod config;
pub mod content;
pub mod diff;
pub mod draft;
pub mod ids;
pub mod models;
pub mod notify;
pub mod session;
pub mod storage;

pub use assign::{assign_from, assign_item, replace_contents, ItemPatch};
pub use commit::{CommitClient, CommitError, CommitRequest, CommitSettings};
pub use config::{BackendKind, Config};
pub use content::ContentRoot;
pub use diff::{has_modified, relevant_fields, ChangeTracker};
pub use draft::{draft_key, DraftError, DraftStore};
pub use ids::{random_id, random_item_id, IdAllocator, IdError};
pub use models::{create_new_item, Category, CommonItem, FieldKey, ModelError};
pub use notify::{ModalHost, Notice, Notifier, Reload};
pub use session::EditSession;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
