//! Terminal implementations of the core's user-facing surfaces

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::debug;

use folio_core::notify::{Modal, ModalId};
use folio_core::{ModalHost, Notice, Notifier, Reload};

use crate::output::{Output, OutputFormat};

/// Prints notices through the output helper
pub struct OutputNotifier {
    format: OutputFormat,
}

impl OutputNotifier {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl Notifier for OutputNotifier {
    fn notify(&self, notice: Notice) {
        let output = Output::new(self.format);
        match notice.description {
            Some(description) => output.success(&format!("{} ({})", notice.title, description)),
            None => output.success(&notice.title),
        }
    }
}

/// Asks on the terminal
#[derive(Default)]
pub struct TerminalModal {
    next: AtomicU64,
}

#[async_trait]
impl ModalHost for TerminalModal {
    fn mount(&self, modal: &Modal) -> ModalId {
        eprintln!();
        eprintln!("⚠ {}", modal.title);
        eprintln!("{}", modal.content);
        ModalId(self.next.fetch_add(1, Ordering::SeqCst))
    }

    async fn wait(&self, _id: ModalId) -> bool {
        match tokio::task::spawn_blocking(|| prompt_yes_no("Proceed? [y/N]: ")).await {
            Ok(Ok(answer)) => answer,
            _ => false,
        }
    }

    fn unmount(&self, id: ModalId) {
        debug!(modal = id.0, "Confirmation closed");
    }
}

/// Gives the same answer without asking (--yes, or no terminal to ask on)
pub struct FixedAnswer(pub bool);

#[async_trait]
impl ModalHost for FixedAnswer {
    fn mount(&self, modal: &Modal) -> ModalId {
        debug!(title = %modal.title, answer = self.0, "Answering confirmation without prompting");
        ModalId(0)
    }

    async fn wait(&self, _id: ModalId) -> bool {
        self.0
    }

    fn unmount(&self, _id: ModalId) {}
}

/// Reload that wakes whoever waits on it
#[derive(Default)]
pub struct ReloadSignal {
    notify: Notify,
}

impl ReloadSignal {
    /// Wait for the next reload request
    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

impl Reload for ReloadSignal {
    fn reload(&self) {
        // Stores a permit when nobody is waiting yet
        self.notify.notify_one();
    }
}

/// Ask a yes/no question on stdin; anything but yes is no
pub fn prompt_yes_no(prompt: &str) -> io::Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(is_yes(&input))
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::notify::confirm_stale_commit;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }

    #[tokio::test]
    async fn test_fixed_answer() {
        assert!(confirm_stale_commit(&FixedAnswer(true)).await);
        assert!(!confirm_stale_commit(&FixedAnswer(false)).await);
    }

    #[tokio::test]
    async fn test_reload_before_wait_is_not_lost() {
        let signal = Arc::new(ReloadSignal::default());
        signal.reload();

        tokio::time::timeout(Duration::from_millis(100), signal.wait())
            .await
            .unwrap();
    }
}
