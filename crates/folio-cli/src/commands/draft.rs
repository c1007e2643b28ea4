//! Draft command handlers

use anyhow::Result;

use folio_core::{draft_key, Category};

use super::edit::prepare;
use super::{EditArgs, Workspace};
use crate::output::Output;

/// Save edits as a draft without committing
pub fn save(
    ws: &Workspace,
    category: Category,
    id: Option<u64>,
    args: EditArgs,
    output: &Output,
) -> Result<()> {
    let list = ws.content.load_listing(category)?;
    let mut session = ws.open_session(category, id, &list)?;
    prepare(ws, &mut session, &args, output)?;

    session.save_draft(&mut ws.drafts(output))?;
    Ok(())
}

/// Show an item with its draft applied
pub fn load(ws: &Workspace, category: Category, id: Option<u64>, output: &Output) -> Result<()> {
    let list = ws.content.load_listing(category)?;
    let mut session = ws.open_session(category, id, &list)?;
    session.load_draft(&ws.drafts(output), &ws.ids)?;

    output.print_item(session.item(), session.body())
}

/// Discard a draft
pub fn clear(ws: &Workspace, category: Category, id: Option<u64>, output: &Output) -> Result<()> {
    let key = draft_key(category, id.unwrap_or(0));
    let mut drafts = ws.drafts(output);

    if !drafts.exists(&key)? {
        output.message(&format!("No draft for {}.", key));
        return Ok(());
    }

    drafts.clear(&key)?;
    output.success(&format!("Draft {} cleared", key));
    Ok(())
}
