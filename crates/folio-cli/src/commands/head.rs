//! Head command handler

use anyhow::Result;

use super::Workspace;
use crate::output::{Output, OutputFormat};

/// Print the backend's current head
pub async fn show(ws: &Workspace, output: &Output) -> Result<()> {
    let (client, _reload) = ws.connect(output).await?;
    let head = ws.base_head(&client, output).await?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "backend": ws.config.backend.to_string(),
                    "head": head
                })
            );
        }
        OutputFormat::Quiet => println!("{}", head),
        OutputFormat::Human => {
            println!("Backend: {}", ws.config.backend);
            println!("Head:    {}", head);
        }
    }

    Ok(())
}
