use chrono::NaiveDateTime;

use crate::config::{SyncConfig, TIMESTAMP_TOKEN};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a message template.
///
/// `{timestamp}` becomes `at` formatted as `%Y-%m-%d %H:%M:%S`, a non-empty
/// `prefix` is prepended with a space, and a non-zero `file_count` appends
/// `(N files changed)`.
pub fn render_message(
    template: &str,
    prefix: &str,
    at: NaiveDateTime,
    file_count: Option<usize>,
) -> String {
    let timestamp = at.format(TIMESTAMP_FORMAT).to_string();
    let mut message = template.replace(TIMESTAMP_TOKEN, &timestamp);

    let prefix = prefix.trim();
    if !prefix.is_empty() {
        message = format!("{prefix} {message}");
    }

    if let Some(count) = file_count.filter(|c| *c > 0) {
        message.push_str(&format!(" ({count} files changed)"));
    }

    message
}

/// Message for a commit of local changes.
pub fn commit_message(config: &SyncConfig, at: NaiveDateTime, file_count: usize) -> String {
    let count = config.include_file_count.then_some(file_count);
    render_message(
        &config.commit_message_template,
        &config.commit_prefix,
        at,
        count,
    )
}

/// Message for a merge commit.
pub fn merge_message(config: &SyncConfig, at: NaiveDateTime) -> String {
    render_message(
        &config.merge_message_template,
        &config.commit_prefix,
        at,
        None,
    )
}
