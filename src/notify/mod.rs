// src/notify/mod.rs
pub mod feishu;

use async_trait::async_trait;

pub use feishu::FeishuNotifier;

/// Outbound channel for finished documents. Delivery is at-least-once at best;
/// failures are logged by the implementation and reported as `false`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str) -> bool;
    fn name(&self) -> &'static str;
}

/// Writes the message to the log instead of sending it. Used when no channel is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, body: &str) -> bool {
        tracing::info!(title, chars = body.chars().count(), "notification (log only)");
        tracing::debug!("{body}");
        true
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Split `text` on line boundaries into chunks of at most `max_len` chars.
/// A single line longer than `max_len` becomes its own oversized chunk.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        if current_len + line_len + 1 > max_len {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(line);
            current_len = line_len;
        } else {
            if !current.is_empty() {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(line);
            current_len += line_len;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
