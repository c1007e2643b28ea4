//! Delete command handler

use anyhow::{bail, Result};

use folio_core::{Category, CommonItem};

use super::{commit_failed, with_timeout, Workspace};
use crate::interact::prompt_yes_no;
use crate::output::Output;

/// Remove items from a category listing and delete their bodies
pub async fn delete(
    ws: &Workspace,
    category: Category,
    ids: Vec<u64>,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let (client, reload) = ws.connect(output).await?;
    ws.base_head(&client, output).await?;

    let list = ws.content.load_listing(category)?;
    let (to_delete, keep): (Vec<CommonItem>, Vec<CommonItem>) =
        list.into_iter().partition(|item| ids.contains(&item.id()));

    if let Some(missing) = ids
        .iter()
        .find(|id| !to_delete.iter().any(|item| item.id() == **id))
    {
        bail!("No {} item with ID {}", category, missing);
    }

    if !yes && output.should_prompt() {
        let question = format!("Delete {} {} item(s)? [y/N]: ", to_delete.len(), category);
        if !prompt_yes_no(&question)? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    let applied = with_timeout(
        ws.config.commit_timeout(),
        client.delete_list(category, &keep, &to_delete),
    )
    .await?
    .map_err(|e| commit_failed(e, output))?;

    if !applied {
        bail!("Delete was not applied");
    }

    reload.wait().await;
    output.success(&format!("Deleted {} {} item(s)", to_delete.len(), category));
    Ok(())
}
