//! Content reader
//!
//! Reads listing and body files from a local checkout of the site. Layout
//! under the site root:
//!
//! - `public/rebuild/json/{category}.json` - pretty-printed listing
//! - `public/rebuild/{category}/{id}.md` - body of one item

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::{Category, CommonItem};

/// A local checkout of the site
#[derive(Debug, Clone)]
pub struct ContentRoot {
    root: PathBuf,
}

impl ContentRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a repository-relative path
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Load a category's listing; a missing listing is empty
    pub fn load_listing(&self, category: Category) -> Result<Vec<CommonItem>> {
        let path = self.resolve(&category.listing_path());
        if !path.exists() {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read listing {:?}", path))?;
        CommonItem::from_listing_json(category, &json)
            .with_context(|| format!("Failed to parse listing {:?}", path))
    }

    /// Load an item's body; a missing body is empty
    pub fn load_body(&self, category: Category, id: u64) -> Result<String> {
        let path = self.resolve(&category.body_path(id));
        if !path.exists() {
            return Ok(String::new());
        }

        fs::read_to_string(&path).with_context(|| format!("Failed to read body {:?}", path))
    }

    /// Find one item in a category's listing
    pub fn find_item(&self, category: Category, id: u64) -> Result<Option<CommonItem>> {
        Ok(self
            .load_listing(category)?
            .into_iter()
            .find(|item| item.id() == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::create_new_item;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_files_are_empty() {
        let temp_dir = TempDir::new().unwrap();
        let content = ContentRoot::new(temp_dir.path());

        assert!(content.load_listing(Category::Articles).unwrap().is_empty());
        assert_eq!(content.load_body(Category::Articles, 1234).unwrap(), "");
        assert!(content.find_item(Category::Articles, 1234).unwrap().is_none());
    }

    #[test]
    fn test_load_listing_and_body() {
        let temp_dir = TempDir::new().unwrap();
        let mut item = create_new_item(Category::Articles);
        item.base_mut().id = 1234;
        let listing = CommonItem::listing_json(&[item.clone()]).unwrap();
        write(temp_dir.path(), &Category::Articles.listing_path(), &listing);
        write(temp_dir.path(), &Category::Articles.body_path(1234), "# Hello\n");

        let content = ContentRoot::new(temp_dir.path());
        assert_eq!(content.load_listing(Category::Articles).unwrap(), vec![item.clone()]);
        assert_eq!(content.load_body(Category::Articles, 1234).unwrap(), "# Hello\n");
        assert_eq!(content.find_item(Category::Articles, 1234).unwrap(), Some(item));
    }

    #[test]
    fn test_corrupt_listing_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), &Category::Records.listing_path(), "[{]");

        let content = ContentRoot::new(temp_dir.path());
        let err = content.load_listing(Category::Records).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse listing"));
    }
}
