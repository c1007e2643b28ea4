//! Edit sessions
//!
//! An [`EditSession`] is one item being edited: the live item, its body
//! text and the snapshot both are compared against. It knows how to draft
//! itself and how to turn itself into a commit request.

use std::collections::HashSet;

use chrono::Utc;
use tracing::debug;

use crate::assign::{assign_item, ItemPatch};
use crate::commit::{Addition, CommitRequest};
use crate::diff::ChangeTracker;
use crate::draft::{draft_key, DraftError, DraftStore};
use crate::ids::{random_id, IdAllocator, IdError};
use crate::models::{create_new_item, Category, CommonItem, ModelError};
use crate::storage::KeyValueStore;

/// One item under edit
#[derive(Debug, Clone)]
pub struct EditSession {
    item: CommonItem,
    body: String,
    origin_body: String,
    tracker: ChangeTracker,
    is_new: bool,
}

impl EditSession {
    /// Start a new item with an ID not used in `list`
    pub fn begin_new(
        category: Category,
        list: &[CommonItem],
        id_length: usize,
    ) -> Result<Self, IdError> {
        let existing: HashSet<u64> = list.iter().map(|item| item.id()).collect();
        let mut item = create_new_item(category);
        let base = item.base_mut();
        base.id = random_id(&existing, id_length)?;
        base.time = now_millis();
        debug!(%category, id = base.id, "Started new item");

        Ok(Self {
            tracker: ChangeTracker::new(item.clone()),
            item,
            body: String::new(),
            origin_body: String::new(),
            is_new: true,
        })
    }

    /// Start editing an item loaded from the listing
    pub fn begin_existing(item: CommonItem, body: String) -> Self {
        Self {
            tracker: ChangeTracker::new(item.clone()),
            item,
            origin_body: body.clone(),
            body,
            is_new: false,
        }
    }

    pub fn category(&self) -> Category {
        self.item.category()
    }

    pub fn item(&self) -> &CommonItem {
        &self.item
    }

    pub fn item_mut(&mut self) -> &mut CommonItem {
        &mut self.item
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether the item has never been committed
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn origin(&self) -> &CommonItem {
        self.tracker.origin()
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
        self.tracker
            .set_markdown_modified(self.body != self.origin_body);
    }

    /// Apply field edits to the live item
    pub fn apply(&mut self, patch: &ItemPatch, ids: &IdAllocator) -> Result<(), ModelError> {
        assign_item(&mut self.item, patch, ids)
    }

    pub fn is_modified(&self) -> bool {
        self.tracker.is_modified(&self.item)
    }

    /// Draft key; uncommitted items share their category's `new` slot
    pub fn draft_key(&self) -> String {
        let id = if self.is_new { 0 } else { self.item.id() };
        draft_key(self.category(), id)
    }

    pub fn save_draft<S: KeyValueStore>(&self, drafts: &mut DraftStore<S>) -> Result<(), DraftError> {
        drafts.save(&self.draft_key(), &self.item, &self.body)
    }

    /// Restore this item's draft, replacing the edited fields and the body
    pub fn load_draft<S: KeyValueStore>(
        &mut self,
        drafts: &DraftStore<S>,
        ids: &IdAllocator,
    ) -> Result<(), DraftError> {
        let body = drafts.load(&self.draft_key(), &mut self.item, ids)?;
        self.set_body(body);
        Ok(())
    }

    /// Build the commit that saves this item into `list`
    ///
    /// Stamps the modification time (and the creation time if unset), and
    /// for articles the body length in characters. The item replaces its
    /// entry in the listing, or goes first when it is not listed yet.
    pub fn commit_request(&mut self, list: &[CommonItem]) -> Result<CommitRequest, ModelError> {
        let now = now_millis();
        let base = self.item.base_mut();
        base.modify_time = now;
        if base.time == 0 {
            base.time = now;
        }
        if let CommonItem::Article(article) = &mut self.item {
            article.len = self.body.chars().count() as u64;
        }

        let id = self.item.id();
        let mut listing = list.to_vec();
        match listing.iter_mut().find(|item| item.id() == id) {
            Some(slot) => *slot = self.item.clone(),
            None => listing.insert(0, self.item.clone()),
        }

        let category = self.category();
        Ok(CommitRequest::new(
            vec![
                Addition::new(category.listing_path(), CommonItem::listing_json(&listing)?),
                Addition::new(category.body_path(id), self.body.clone()),
            ],
            vec![],
        ))
    }

    /// The current state becomes the new snapshot
    pub fn mark_committed(&mut self) {
        self.tracker.rebase(self.item.clone());
        self.origin_body = self.body.clone();
        self.is_new = false;
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
