//! Data models for Folio
//!
//! Defines the three content shapes (articles, records and knowledges) and
//! the category they belong to. Items are stored in one listing file per
//! category, so the JSON form of an item carries no variant tag; the
//! category decides how a listing is decoded.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Directory (relative to the site root) holding all managed content
pub const CONTENT_DIR: &str = "public/rebuild";

/// Errors from item decoding and assignment
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Field '{field}' does not exist on {category} items")]
    FieldNotApplicable { category: Category, field: FieldKey },

    #[error("Invalid {category} listing: {source}")]
    InvalidListing {
        category: Category,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Content category, one per listing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Articles,
    Records,
    Knowledges,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Articles, Category::Records, Category::Knowledges];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Articles => "articles",
            Category::Records => "records",
            Category::Knowledges => "knowledges",
        }
    }

    /// Repository-relative path of the listing file
    pub fn listing_path(&self) -> String {
        format!("{}/json/{}.json", CONTENT_DIR, self.as_str())
    }

    /// Repository-relative path of an item's body file
    pub fn body_path(&self, id: u64) -> String {
        format!("{}/{}/{}.md", CONTENT_DIR, self.as_str(), id)
    }

    /// Every field an item of this category carries
    pub fn fields(&self) -> &'static [FieldKey] {
        use FieldKey::*;
        match self {
            Category::Articles => &[Id, Time, ModifyTime, Encrypt, Title, Menu, Len, Tags],
            Category::Records => &[Id, Time, ModifyTime, Encrypt, Images],
            Category::Knowledges => &[
                Id, Time, ModifyTime, Encrypt, Title, Summary, Link, Cover, Type,
            ],
        }
    }

    pub fn has_field(&self, field: FieldKey) -> bool {
        self.fields().contains(&field)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('/');
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ModelError::UnknownCategory(s.to_string()))
    }
}

/// Names of item fields, as they appear in the JSON form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Id,
    Time,
    ModifyTime,
    Encrypt,
    Title,
    Menu,
    Len,
    Tags,
    Images,
    Summary,
    Link,
    Cover,
    Type,
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Id => "id",
            FieldKey::Time => "time",
            FieldKey::ModifyTime => "modifyTime",
            FieldKey::Encrypt => "encrypt",
            FieldKey::Title => "title",
            FieldKey::Menu => "menu",
            FieldKey::Len => "len",
            FieldKey::Tags => "tags",
            FieldKey::Images => "images",
            FieldKey::Summary => "summary",
            FieldKey::Link => "link",
            FieldKey::Cover => "cover",
            FieldKey::Type => "type",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by every item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBase {
    /// Unique within the item's listing
    pub id: u64,
    /// Creation time, milliseconds since the epoch
    #[serde(default)]
    pub time: i64,
    /// Last edit time, milliseconds since the epoch
    #[serde(default)]
    pub modify_time: i64,
    /// Whether the body is stored encrypted
    #[serde(default)]
    pub encrypt: bool,
}

/// A section header in an article's table of contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub title: String,
    #[serde(default)]
    pub anchor: String,
    #[serde(default)]
    pub level: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(flatten)]
    pub base: ItemBase,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub menu: Vec<MenuEntry>,
    /// Body length in characters
    #[serde(default)]
    pub len: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// An image attached to a record
///
/// `id` is session-scoped and reallocated whenever the image is copied into
/// an item; it carries no meaning across sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub id: u64,
    pub url: String,
    /// Any other fields, carried through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Image {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: 0,
            url: url.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Equal in everything but `id`
    pub fn same_content(&self, other: &Image) -> bool {
        self.url == other.url && self.extra == other.extra
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(flatten)]
    pub base: ItemBase,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// What a knowledge entry refers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeType {
    #[default]
    Book,
    Film,
    Game,
}

impl FromStr for KnowledgeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "book" => Ok(KnowledgeType::Book),
            "film" => Ok(KnowledgeType::Film),
            "game" => Ok(KnowledgeType::Game),
            other => Err(format!("unknown knowledge type '{}'", other)),
        }
    }
}

impl fmt::Display for KnowledgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeType::Book => f.write_str("book"),
            KnowledgeType::Film => f.write_str("film"),
            KnowledgeType::Game => f.write_str("game"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Knowledge {
    #[serde(flatten)]
    pub base: ItemBase,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub cover: String,
    #[serde(rename = "type", default)]
    pub kind: KnowledgeType,
}

/// Any content item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommonItem {
    Article(Article),
    Record(Record),
    Knowledge(Knowledge),
}

/// Create a zero-valued item of the given category
pub fn create_new_item(category: Category) -> CommonItem {
    match category {
        Category::Articles => CommonItem::Article(Article::default()),
        Category::Records => CommonItem::Record(Record::default()),
        Category::Knowledges => CommonItem::Knowledge(Knowledge::default()),
    }
}

impl CommonItem {
    pub fn category(&self) -> Category {
        match self {
            CommonItem::Article(_) => Category::Articles,
            CommonItem::Record(_) => Category::Records,
            CommonItem::Knowledge(_) => Category::Knowledges,
        }
    }

    pub fn base(&self) -> &ItemBase {
        match self {
            CommonItem::Article(a) => &a.base,
            CommonItem::Record(r) => &r.base,
            CommonItem::Knowledge(k) => &k.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut ItemBase {
        match self {
            CommonItem::Article(a) => &mut a.base,
            CommonItem::Record(r) => &mut r.base,
            CommonItem::Knowledge(k) => &mut k.base,
        }
    }

    pub fn id(&self) -> u64 {
        self.base().id
    }

    /// Title for display; records have none
    pub fn title(&self) -> Option<&str> {
        match self {
            CommonItem::Article(a) => Some(&a.title),
            CommonItem::Record(_) => None,
            CommonItem::Knowledge(k) => Some(&k.title),
        }
    }

    pub fn images(&self) -> Option<&[Image]> {
        match self {
            CommonItem::Record(r) => Some(&r.images),
            _ => None,
        }
    }

    /// JSON value of a single field, `None` if the variant lacks it
    pub fn field_value(&self, field: FieldKey) -> Option<Value> {
        if !self.category().has_field(field) {
            return None;
        }
        let base = self.base();
        let value = match (self, field) {
            (_, FieldKey::Id) => Value::from(base.id),
            (_, FieldKey::Time) => Value::from(base.time),
            (_, FieldKey::ModifyTime) => Value::from(base.modify_time),
            (_, FieldKey::Encrypt) => Value::from(base.encrypt),
            (CommonItem::Article(a), FieldKey::Title) => Value::from(a.title.as_str()),
            (CommonItem::Article(a), FieldKey::Menu) => serde_json::to_value(&a.menu).ok()?,
            (CommonItem::Article(a), FieldKey::Len) => Value::from(a.len),
            (CommonItem::Article(a), FieldKey::Tags) => serde_json::to_value(&a.tags).ok()?,
            (CommonItem::Record(r), FieldKey::Images) => serde_json::to_value(&r.images).ok()?,
            (CommonItem::Knowledge(k), FieldKey::Title) => Value::from(k.title.as_str()),
            (CommonItem::Knowledge(k), FieldKey::Summary) => Value::from(k.summary.as_str()),
            (CommonItem::Knowledge(k), FieldKey::Link) => Value::from(k.link.as_str()),
            (CommonItem::Knowledge(k), FieldKey::Cover) => Value::from(k.cover.as_str()),
            (CommonItem::Knowledge(k), FieldKey::Type) => Value::from(k.kind.to_string()),
            _ => return None,
        };
        Some(value)
    }

    /// Decode one item of a known category
    pub fn from_value(category: Category, value: Value) -> Result<Self, ModelError> {
        let item = match category {
            Category::Articles => CommonItem::Article(serde_json::from_value(value)?),
            Category::Records => CommonItem::Record(serde_json::from_value(value)?),
            Category::Knowledges => CommonItem::Knowledge(serde_json::from_value(value)?),
        };
        Ok(item)
    }

    /// Decode a listing file
    pub fn from_listing_json(category: Category, json: &str) -> Result<Vec<Self>, ModelError> {
        let invalid = |source| ModelError::InvalidListing { category, source };
        match category {
            Category::Articles => serde_json::from_str::<Vec<Article>>(json)
                .map(|items| items.into_iter().map(CommonItem::Article).collect())
                .map_err(invalid),
            Category::Records => serde_json::from_str::<Vec<Record>>(json)
                .map(|items| items.into_iter().map(CommonItem::Record).collect())
                .map_err(invalid),
            Category::Knowledges => serde_json::from_str::<Vec<Knowledge>>(json)
                .map(|items| items.into_iter().map(CommonItem::Knowledge).collect())
                .map_err(invalid),
        }
    }

    /// Encode a listing file (pretty-printed, two-space indent)
    pub fn listing_json(items: &[CommonItem]) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(items)?)
    }
}
