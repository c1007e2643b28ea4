//! List / show command handlers

use anyhow::{Context, Result};

use folio_core::Category;

use super::Workspace;
use crate::output::Output;

/// List a category
pub fn list(ws: &Workspace, category: Category, output: &Output) -> Result<()> {
    let items = ws.content.load_listing(category)?;
    output.print_items(category, &items)
}

/// Show one item with its body
pub fn show(ws: &Workspace, category: Category, id: u64, output: &Output) -> Result<()> {
    let item = ws
        .content
        .find_item(category, id)?
        .with_context(|| format!("No {} item with ID {}", category, id))?;
    let body = ws.content.load_body(category, id)?;
    output.print_item(&item, &body)
}
