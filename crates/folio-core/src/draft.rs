//! Draft persistence
//!
//! A draft is the in-progress edit of one item: its editable fields plus the
//! body text, stored as a single JSON string in a [`KeyValueStore`]. Drafts
//! live entirely on this machine and never touch the commit backend.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::assign::{assign_item, ItemPatch};
use crate::diff::relevant_fields;
use crate::ids::IdAllocator;
use crate::models::{Category, CommonItem, ModelError};
use crate::notify::{messages, Notice, Notifier};
use crate::storage::{KeyValueStore, StorageError};

/// Errors from draft save and load
#[derive(Error, Debug)]
pub enum DraftError {
    #[error("No draft stored under '{0}'")]
    Missing(String),

    #[error("Draft '{key}' is not valid JSON: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode draft: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Stored shape: `{ "content": ..., ...fields }`
#[derive(Debug, Serialize, Deserialize)]
struct DraftRecord {
    #[serde(default)]
    content: String,
    #[serde(flatten)]
    fields: ItemPatch,
}

/// Storage key for an item's draft; unsaved items use `new`
pub fn draft_key(category: Category, id: u64) -> String {
    if id == 0 {
        format!("{}/new", category)
    } else {
        format!("{}/{}", category, id)
    }
}

/// Saves and restores drafts through a key-value store
pub struct DraftStore<S> {
    store: S,
    notifier: Arc<dyn Notifier>,
}

impl<S: KeyValueStore> DraftStore<S> {
    pub fn new(store: S, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Save the item's editable fields and the body under `key`
    pub fn save(&mut self, key: &str, item: &CommonItem, content: &str) -> Result<(), DraftError> {
        let record = DraftRecord {
            content: content.to_string(),
            fields: ItemPatch::from(item).only(relevant_fields(item.category())),
        };
        let json = serde_json::to_string(&record).map_err(DraftError::Encode)?;
        self.store.set(key, &json)?;

        debug!(key, bytes = json.len(), "Draft saved");
        self.notifier.notify(Notice::new(messages::DRAFT_SAVED));
        Ok(())
    }

    /// Restore the draft under `key` into `item` and return the body
    ///
    /// A missing or unparseable draft is an error; nothing is assigned in
    /// that case.
    pub fn load(
        &self,
        key: &str,
        item: &mut CommonItem,
        ids: &IdAllocator,
    ) -> Result<String, DraftError> {
        let json = self
            .store
            .get(key)?
            .ok_or_else(|| DraftError::Missing(key.to_string()))?;
        let record: DraftRecord =
            serde_json::from_str(&json).map_err(|source| DraftError::Malformed {
                key: key.to_string(),
                source,
            })?;

        assign_item(item, &record.fields, ids)?;

        debug!(key, "Draft loaded");
        self.notifier.notify(Notice::new(messages::DRAFT_LOADED));
        Ok(record.content)
    }

    pub fn exists(&self, key: &str) -> Result<bool, DraftError> {
        Ok(self.store.get(key)?.is_some())
    }

    /// Forget the draft under `key`, typically after a successful commit
    pub fn clear(&mut self, key: &str) -> Result<(), DraftError> {
        self.store.remove(key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{create_new_item, Article, Image, ItemBase, Record};
    use crate::notify::testing::RecordingNotifier;
    use crate::storage::{FileStore, MemoryStore};

    fn store_with_notifier() -> (DraftStore<MemoryStore>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        (
            DraftStore::new(MemoryStore::new(), notifier.clone()),
            notifier,
        )
    }

    fn sample_article() -> CommonItem {
        CommonItem::Article(Article {
            base: ItemBase {
                id: 1234,
                time: 100,
                modify_time: 200,
                encrypt: true,
            },
            title: "Draft title".to_string(),
            len: 11,
            tags: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        })
    }

    #[test]
    fn test_draft_key() {
        assert_eq!(draft_key(Category::Articles, 1234), "articles/1234");
        assert_eq!(draft_key(Category::Records, 0), "records/new");
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (mut drafts, notifier) = store_with_notifier();
        let ids = IdAllocator::new();
        let item = sample_article();

        drafts.save("articles/1234", &item, "# Body\n").unwrap();

        let mut restored = create_new_item(Category::Articles);
        let body = drafts.load("articles/1234", &mut restored, &ids).unwrap();

        assert_eq!(body, "# Body\n");
        match &restored {
            CommonItem::Article(a) => {
                assert_eq!(a.title, "Draft title");
                assert_eq!(a.tags, vec!["a", "b"]);
                assert!(a.base.encrypt);
                // Only editable fields are drafted
                assert_eq!(a.base.id, 0);
                assert_eq!(a.len, 0);
            }
            other => panic!("Expected article, got {:?}", other),
        }
        assert_eq!(notifier.titles(), vec![messages::DRAFT_SAVED, messages::DRAFT_LOADED]);
    }

    #[test]
    fn test_stored_shape() {
        let (mut drafts, _) = store_with_notifier();
        drafts.save("k", &sample_article(), "text").unwrap();

        let raw = drafts.store().get("k").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["content"], "text");
        assert_eq!(value["title"], "Draft title");
        assert_eq!(value["encrypt"], true);
        assert!(value.get("menu").is_none());
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_record_draft_reallocates_image_ids() {
        let (mut drafts, _) = store_with_notifier();
        let ids = IdAllocator::new();
        let item = CommonItem::Record(Record {
            base: ItemBase {
                id: 2001,
                ..Default::default()
            },
            images: vec![
                Image {
                    id: 0,
                    ..Image::new("a.png")
                },
                Image {
                    id: 1,
                    ..Image::new("b.png")
                },
            ],
        });
        drafts.save("records/2001", &item, "").unwrap();

        ids.next_id();
        ids.next_id();
        let mut restored = create_new_item(Category::Records);
        drafts.load("records/2001", &mut restored, &ids).unwrap();

        let restored_ids: Vec<u64> = restored.images().unwrap().iter().map(|i| i.id).collect();
        assert_eq!(restored_ids, vec![2, 3]);
    }

    #[test]
    fn test_missing_draft() {
        let (drafts, notifier) = store_with_notifier();
        let mut item = create_new_item(Category::Articles);
        let err = drafts
            .load("articles/9999", &mut item, &IdAllocator::new())
            .unwrap_err();
        assert!(matches!(err, DraftError::Missing(key) if key == "articles/9999"));
        assert!(notifier.titles().is_empty());
    }

    #[test]
    fn test_malformed_draft_is_surfaced() {
        let mut store = MemoryStore::new();
        store.set("articles/1", "{\"content\": ").unwrap();
        let drafts = DraftStore::new(store, Arc::new(RecordingNotifier::default()));

        let mut item = create_new_item(Category::Articles);
        let err = drafts
            .load("articles/1", &mut item, &IdAllocator::new())
            .unwrap_err();
        assert!(matches!(err, DraftError::Malformed { .. }));
    }

    #[test]
    fn test_draft_for_other_category_is_rejected() {
        let (mut drafts, _) = store_with_notifier();
        drafts.save("x", &sample_article(), "").unwrap();

        let mut record = create_new_item(Category::Records);
        let err = drafts
            .load("x", &mut record, &IdAllocator::new())
            .unwrap_err();
        assert!(matches!(err, DraftError::Model(ModelError::FieldNotApplicable { .. })));
    }

    #[test]
    fn test_clear_and_exists() {
        let (mut drafts, _) = store_with_notifier();
        drafts.save("k", &sample_article(), "").unwrap();
        assert!(drafts.exists("k").unwrap());

        drafts.clear("k").unwrap();
        assert!(!drafts.exists("k").unwrap());
    }

    #[test]
    fn test_file_backed_drafts() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("drafts.json");
        let notifier = Arc::new(RecordingNotifier::default());

        let mut drafts = DraftStore::new(FileStore::new(&path), notifier.clone());
        drafts.save("articles/1234", &sample_article(), "persisted").unwrap();
        drop(drafts);

        let drafts = DraftStore::new(FileStore::new(&path), notifier);
        let mut item = create_new_item(Category::Articles);
        let body = drafts
            .load("articles/1234", &mut item, &IdAllocator::new())
            .unwrap();
        assert_eq!(body, "persisted");
    }
}
