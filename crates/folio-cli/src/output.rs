//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::Result;
use chrono::{TimeZone, Utc};

use folio_core::{Category, CommonItem};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single item with its body
    pub fn print_item(&self, item: &CommonItem, body: &str) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                let base = item.base();
                println!("ID:        {}", base.id);
                println!("Category:  {}", item.category());
                println!("Title:     {}", label(item));
                match item {
                    CommonItem::Article(article) if !article.tags.is_empty() => {
                        println!("Tags:      {}", article.tags.join(", "));
                    }
                    CommonItem::Record(record) => {
                        for image in &record.images {
                            println!("Image:     {}", image.url);
                        }
                    }
                    CommonItem::Knowledge(knowledge) => {
                        println!("Type:      {}", knowledge.kind);
                        if !knowledge.summary.is_empty() {
                            println!("Summary:   {}", knowledge.summary);
                        }
                        if !knowledge.link.is_empty() {
                            println!("Link:      {}", knowledge.link);
                        }
                    }
                    _ => {}
                }
                if base.encrypt {
                    println!("Encrypted: yes");
                }
                println!("Created:   {}", format_millis(base.time));
                println!("Modified:  {}", format_millis(base.modify_time));

                if !body.is_empty() {
                    println!();
                    println!("{}", body);
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "item": item,
                        "content": body,
                    }))?
                );
            }
            OutputFormat::Quiet => {
                println!("{}", item.id());
            }
        }
        Ok(())
    }

    /// Print a category listing
    pub fn print_items(&self, category: Category, items: &[CommonItem]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if items.is_empty() {
                    println!("No {} found.", category);
                    return Ok(());
                }
                for item in items {
                    let lock = if item.base().encrypt { " [locked]" } else { "" };
                    println!(
                        "{} | {}{} | {}",
                        item.id(),
                        truncate(&label(item), 45),
                        lock,
                        format_millis(item.base().time)
                    );
                }
                println!("\n{} {}", items.len(), category);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(items)?);
            }
            OutputFormat::Quiet => {
                for item in items {
                    println!("{}", item.id());
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warning(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Short human label for an item
fn label(item: &CommonItem) -> String {
    match item {
        CommonItem::Record(record) => format!("{} image(s)", record.images.len()),
        _ => match item.title() {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => "(untitled)".to_string(),
        },
    }
}

/// Millisecond timestamp as a date, `-` when unset
fn format_millis(millis: i64) -> String {
    if millis == 0 {
        return "-".to_string();
    }
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
