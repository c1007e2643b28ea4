//! Field assignment between items
//!
//! An [`ItemPatch`] is an item with only some of its fields present, such as
//! a draft restored from local storage or an item fetched from the remote
//! listing. [`assign_item`] copies every present field into a live item.

use serde::{Deserialize, Serialize};

use crate::ids::IdAllocator;
use crate::models::{
    Category, CommonItem, FieldKey, Image, KnowledgeType, MenuEntry, ModelError,
};

/// A partial item: `None` means the field is absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modify_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypt: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu: Option<Vec<MenuEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Image>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<KnowledgeType>,
}

impl ItemPatch {
    /// Fields present in this patch
    pub fn present_fields(&self) -> Vec<FieldKey> {
        let mut fields = Vec::new();
        let mut mark = |present: bool, key: FieldKey| {
            if present {
                fields.push(key);
            }
        };
        mark(self.id.is_some(), FieldKey::Id);
        mark(self.time.is_some(), FieldKey::Time);
        mark(self.modify_time.is_some(), FieldKey::ModifyTime);
        mark(self.encrypt.is_some(), FieldKey::Encrypt);
        mark(self.title.is_some(), FieldKey::Title);
        mark(self.menu.is_some(), FieldKey::Menu);
        mark(self.len.is_some(), FieldKey::Len);
        mark(self.tags.is_some(), FieldKey::Tags);
        mark(self.images.is_some(), FieldKey::Images);
        mark(self.summary.is_some(), FieldKey::Summary);
        mark(self.link.is_some(), FieldKey::Link);
        mark(self.cover.is_some(), FieldKey::Cover);
        mark(self.kind.is_some(), FieldKey::Type);
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }

    /// Drop every field not listed in `keep`
    pub fn only(mut self, keep: &[FieldKey]) -> Self {
        let keeps = |key| keep.contains(&key);
        if !keeps(FieldKey::Id) {
            self.id = None;
        }
        if !keeps(FieldKey::Time) {
            self.time = None;
        }
        if !keeps(FieldKey::ModifyTime) {
            self.modify_time = None;
        }
        if !keeps(FieldKey::Encrypt) {
            self.encrypt = None;
        }
        if !keeps(FieldKey::Title) {
            self.title = None;
        }
        if !keeps(FieldKey::Menu) {
            self.menu = None;
        }
        if !keeps(FieldKey::Len) {
            self.len = None;
        }
        if !keeps(FieldKey::Tags) {
            self.tags = None;
        }
        if !keeps(FieldKey::Images) {
            self.images = None;
        }
        if !keeps(FieldKey::Summary) {
            self.summary = None;
        }
        if !keeps(FieldKey::Link) {
            self.link = None;
        }
        if !keeps(FieldKey::Cover) {
            self.cover = None;
        }
        if !keeps(FieldKey::Type) {
            self.kind = None;
        }
        self
    }

    /// First present field that items of `category` do not have
    fn first_foreign_field(&self, category: Category) -> Option<FieldKey> {
        self.present_fields()
            .into_iter()
            .find(|field| !category.has_field(*field))
    }
}

impl From<&CommonItem> for ItemPatch {
    fn from(item: &CommonItem) -> Self {
        let base = item.base();
        let mut patch = ItemPatch {
            id: Some(base.id),
            time: Some(base.time),
            modify_time: Some(base.modify_time),
            encrypt: Some(base.encrypt),
            ..Default::default()
        };
        match item {
            CommonItem::Article(a) => {
                patch.title = Some(a.title.clone());
                patch.menu = Some(a.menu.clone());
                patch.len = Some(a.len);
                patch.tags = Some(a.tags.clone());
            }
            CommonItem::Record(r) => {
                patch.images = Some(r.images.clone());
            }
            CommonItem::Knowledge(k) => {
                patch.title = Some(k.title.clone());
                patch.summary = Some(k.summary.clone());
                patch.link = Some(k.link.clone());
                patch.cover = Some(k.cover.clone());
                patch.kind = Some(k.kind);
            }
        }
        patch
    }
}

/// Replace the contents of a sequence, keeping the container itself
///
/// The vector keeps its allocation, so anything observing the container
/// (rather than a copy of it) sees the new contents in place.
pub fn replace_contents<T>(dest: &mut Vec<T>, items: impl IntoIterator<Item = T>) {
    dest.clear();
    dest.extend(items);
}

/// Copy every field present on `src` into `dest`
///
/// `menu` and `tags` are replaced by clones of the source sequences.
/// `images` are replaced by clones that each get a fresh ID from `ids`, so
/// images copied from a draft or the remote listing never collide with IDs
/// already handed out in this session. Fails without touching `dest` when
/// `src` carries a field the destination's category does not have.
pub fn assign_item(
    dest: &mut CommonItem,
    src: &ItemPatch,
    ids: &IdAllocator,
) -> Result<(), ModelError> {
    let category = dest.category();
    if let Some(field) = src.first_foreign_field(category) {
        return Err(ModelError::FieldNotApplicable { category, field });
    }

    let base = dest.base_mut();
    if let Some(id) = src.id {
        base.id = id;
    }
    if let Some(time) = src.time {
        base.time = time;
    }
    if let Some(modify_time) = src.modify_time {
        base.modify_time = modify_time;
    }
    if let Some(encrypt) = src.encrypt {
        base.encrypt = encrypt;
    }

    match dest {
        CommonItem::Article(article) => {
            if let Some(title) = &src.title {
                article.title = title.clone();
            }
            if let Some(menu) = &src.menu {
                replace_contents(&mut article.menu, menu.iter().cloned());
            }
            if let Some(len) = src.len {
                article.len = len;
            }
            if let Some(tags) = &src.tags {
                replace_contents(&mut article.tags, tags.iter().cloned());
            }
        }
        CommonItem::Record(record) => {
            if let Some(images) = &src.images {
                replace_contents(
                    &mut record.images,
                    images.iter().map(|image| Image {
                        id: ids.next_id(),
                        ..image.clone()
                    }),
                );
            }
        }
        CommonItem::Knowledge(knowledge) => {
            if let Some(title) = &src.title {
                knowledge.title = title.clone();
            }
            if let Some(summary) = &src.summary {
                knowledge.summary = summary.clone();
            }
            if let Some(link) = &src.link {
                knowledge.link = link.clone();
            }
            if let Some(cover) = &src.cover {
                knowledge.cover = cover.clone();
            }
            if let Some(kind) = src.kind {
                knowledge.kind = kind;
            }
        }
    }

    Ok(())
}

/// Copy every field of a full item into `dest`
pub fn assign_from(
    dest: &mut CommonItem,
    src: &CommonItem,
    ids: &IdAllocator,
) -> Result<(), ModelError> {
    assign_item(dest, &ItemPatch::from(src), ids)
}
