//! Change detection
//!
//! Decides whether a live item has diverged from its origin snapshot. Only
//! the fields a user can edit for the item's category are compared, plus
//! `encrypt`. The body text lives outside the item and is reported through
//! a separate flag.

use crate::models::{Category, CommonItem, FieldKey, Image};

/// Fields compared for each category (`encrypt` included)
pub fn relevant_fields(category: Category) -> &'static [FieldKey] {
    use FieldKey::*;
    match category {
        Category::Articles => &[Title, Tags, Encrypt],
        Category::Records => &[Images, Encrypt],
        Category::Knowledges => &[Title, Type, Summary, Link, Cover, Encrypt],
    }
}

/// Whether `item` differs from `origin`
///
/// Image IDs are ignored: two image lists are equal when every image matches
/// in everything but its ID. Other fields compare by structural equality of
/// their JSON values. A field only counts when both items have it.
pub fn has_modified(item: &CommonItem, origin: &CommonItem, markdown_modified: bool) -> bool {
    markdown_modified
        || relevant_fields(item.category())
            .iter()
            .any(|&field| field_differs(item, origin, field))
}

fn field_differs(item: &CommonItem, origin: &CommonItem, field: FieldKey) -> bool {
    if field == FieldKey::Images {
        return match (item.images(), origin.images()) {
            (Some(ours), Some(theirs)) => !same_images(ours, theirs),
            _ => false,
        };
    }

    match (item.field_value(field), origin.field_value(field)) {
        (Some(ours), Some(theirs)) => ours != theirs,
        _ => false,
    }
}

fn same_images(ours: &[Image], theirs: &[Image]) -> bool {
    ours.len() == theirs.len()
        && ours
            .iter()
            .zip(theirs)
            .all(|(a, b)| a.same_content(b))
}

/// Tracks an item against the snapshot taken when editing began
#[derive(Debug, Clone)]
pub struct ChangeTracker {
    origin: CommonItem,
    markdown_modified: bool,
}

impl ChangeTracker {
    pub fn new(origin: CommonItem) -> Self {
        Self {
            origin,
            markdown_modified: false,
        }
    }

    pub fn origin(&self) -> &CommonItem {
        &self.origin
    }

    /// Record whether the body text differs from its origin
    pub fn set_markdown_modified(&mut self, modified: bool) {
        self.markdown_modified = modified;
    }

    pub fn markdown_modified(&self) -> bool {
        self.markdown_modified
    }

    pub fn is_modified(&self, item: &CommonItem) -> bool {
        has_modified(item, &self.origin, self.markdown_modified)
    }

    /// Supersede the snapshot, e.g. after a successful commit
    pub fn rebase(&mut self, origin: CommonItem) {
        self.origin = origin;
        self.markdown_modified = false;
    }
}
