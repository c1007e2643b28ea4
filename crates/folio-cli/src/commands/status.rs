//! Status command handler

use anyhow::Result;

use folio_core::Category;

use super::Workspace;
use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(ws: &Workspace, output: &Output) -> Result<()> {
    let config = &ws.config;
    let mut counts = Vec::new();
    for category in Category::ALL {
        counts.push((category, ws.content.load_listing(category)?.len()));
    }
    let drafts_path = config.drafts_path();
    let content_present = ws.content.path().join(folio_core::models::CONTENT_DIR).exists();

    match output.format {
        OutputFormat::Json => {
            let counts: serde_json::Map<String, serde_json::Value> = counts
                .iter()
                .map(|(category, count)| (category.to_string(), (*count).into()))
                .collect();
            println!(
                "{}",
                serde_json::json!({
                    "content_root": ws.content.path(),
                    "content_present": content_present,
                    "backend": config.backend.to_string(),
                    "relay_url": config.relay_url,
                    "drafts_file": drafts_path,
                    "drafts_file_exists": drafts_path.exists(),
                    "counts": counts
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", ws.content.path().display());
        }
        OutputFormat::Human => {
            println!("Folio Status");
            println!("============");
            println!();
            println!("Content:");
            println!("  Root:    {}", ws.content.path().display());
            if !content_present {
                println!("  (no {} directory yet)", folio_core::models::CONTENT_DIR);
            }
            for (category, count) in &counts {
                println!("  {:<11}{}", format!("{}:", category), count);
            }
            println!();
            println!("Backend:");
            println!("  Kind:    {}", config.backend);
            if let Some(ref url) = config.relay_url {
                println!("  Relay:   {}", url);
            }
            println!();
            println!("Drafts:");
            println!(
                "  File:    {}{}",
                drafts_path.display(),
                if drafts_path.exists() { "" } else { " (none yet)" }
            );
        }
    }

    Ok(())
}
