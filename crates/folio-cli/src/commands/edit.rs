//! New / edit command handlers

use anyhow::{bail, Result};
use tracing::debug;

use folio_core::{Category, CommitClient, CommonItem, EditSession};

use super::{commit_failed, modal_host, with_timeout, EditArgs, Workspace};
use crate::interact::ReloadSignal;
use crate::output::Output;

/// Create a new item and commit it
pub async fn create(
    ws: &Workspace,
    category: Category,
    args: EditArgs,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let (client, reload) = ws.connect(output).await?;
    ws.base_head(&client, output).await?;

    let list = ws.content.load_listing(category)?;
    let mut session = ws.open_session(category, None, &list)?;
    prepare(ws, &mut session, &args, output)?;

    commit_session(ws, &client, &reload, session, &list, yes, output).await
}

/// Edit an existing item and commit the changes
pub async fn edit(
    ws: &Workspace,
    category: Category,
    id: u64,
    args: EditArgs,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let (client, reload) = ws.connect(output).await?;
    ws.base_head(&client, output).await?;

    let list = ws.content.load_listing(category)?;
    let mut session = ws.open_session(category, Some(id), &list)?;
    prepare(ws, &mut session, &args, output)?;

    if !session.is_modified() {
        output.message("No changes to commit.");
        return Ok(());
    }

    commit_session(ws, &client, &reload, session, &list, yes, output).await
}

/// Apply the draft (if asked) and then the command-line edits
pub(crate) fn prepare(
    ws: &Workspace,
    session: &mut EditSession,
    args: &EditArgs,
    output: &Output,
) -> Result<()> {
    if args.from_draft {
        session.load_draft(&ws.drafts(output), &ws.ids)?;
    }
    session.apply(&args.patch(), &ws.ids)?;
    if let Some(body) = args.read_body()? {
        session.set_body(body);
    }
    Ok(())
}

async fn commit_session(
    ws: &Workspace,
    client: &CommitClient,
    reload: &ReloadSignal,
    mut session: EditSession,
    list: &[CommonItem],
    yes: bool,
    output: &Output,
) -> Result<()> {
    let category = session.category();
    let draft_key = session.draft_key();
    let request = session.commit_request(list)?;
    debug!(%category, id = session.item().id(), "Committing item");

    let host = modal_host(output, yes);
    let outcome = match with_timeout(
        ws.config.commit_timeout(),
        client.commit_confirming(request, host.as_ref()),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            session.save_draft(&mut ws.drafts(output))?;
            return Err(err.context(format!("Your edits are kept as a draft ({})", draft_key)));
        }
    };

    match outcome {
        Ok(true) => {
            session.mark_committed();
            ws.drafts(output).clear(&draft_key)?;

            reload.wait().await;
            let reloaded = ws.content.load_listing(category)?;
            output.success(&format!(
                "Saved {} {} ({} listed)",
                category,
                session.item().id(),
                reloaded.len()
            ));
            Ok(())
        }
        Ok(false) => {
            session.save_draft(&mut ws.drafts(output))?;
            bail!(
                "Commit was not applied. Your edits are kept as a draft ({}).",
                draft_key
            );
        }
        Err(err) => {
            session.save_draft(&mut ws.drafts(output))?;
            Err(commit_failed(err, output))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use folio_core::commit::CommitChannel;
    use folio_core::notify::{NoReload, TracingNotifier};
    use folio_core::Config;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn workspace(temp_dir: &TempDir, timeout_secs: u64) -> Workspace {
        Workspace::new(Config {
            data_dir: temp_dir.path().join("data"),
            content_root: temp_dir.path().join("site"),
            commit_timeout_secs: Some(timeout_secs),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_timed_out_commit_keeps_draft() {
        let temp_dir = TempDir::new().unwrap();
        let ws = workspace(&temp_dir, 1);
        let output = Output::new(OutputFormat::Quiet);

        // Backend end stays open but never answers
        let (channel, _backend) = CommitChannel::pair(8);
        let client = CommitClient::new(
            channel,
            Arc::new(TracingNotifier),
            Arc::new(NoReload),
            Default::default(),
        );
        let reload = ReloadSignal::default();

        let mut session = EditSession::begin_new(Category::Articles, &[], 4).unwrap();
        session.set_body("# Unsaved\n");
        let key = session.draft_key();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            commit_session(&ws, &client, &reload, session, &[], false, &output),
        )
        .await
        .unwrap();

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Timed out"));
        assert!(ws.drafts(&output).exists(&key).unwrap());
    }
}
