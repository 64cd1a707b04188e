//! MarkdownV2 escaping and queue-line rendering.

use std::path::Path;
use std::time::Duration;

/// Characters Telegram requires to be backslash-escaped in MarkdownV2 text.
///
/// https://core.telegram.org/bots/api#markdownv2-style
const RESERVED: &str = "_*[]()~`>#+-=|{}.!";

/// Escape a string for MarkdownV2.
///
/// Each reserved character gains exactly one backslash. Applying this to an
/// already escaped string double-escapes it; callers escape exactly once.
pub fn escape_markdown_v2(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if RESERVED.contains(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// One row of the playback queue, reduced to what the listing renders.
#[derive(Debug, Clone, Default)]
pub struct QueueEntry {
    pub artist: String,
    pub title: String,
    pub file: String,
    pub duration: Option<Duration>,
}

impl From<mpd::Song> for QueueEntry {
    fn from(song: mpd::Song) -> Self {
        Self {
            artist: song.artist.unwrap_or_default(),
            title: song.title.unwrap_or_default(),
            file: song.file,
            duration: song.duration,
        }
    }
}

/// Render one queue line: ``NN\. `mm:ss` artist – title``.
///
/// When both artist and title are missing, the filename stem (underscores
/// replaced by spaces, title-cased) stands in and no separator is printed.
/// Rendering is total; a metadata-poor entry falls back instead of being
/// dropped.
pub fn format_queue_entry(pos: usize, entry: &QueueEntry) -> String {
    let secs = entry.duration.unwrap_or(Duration::ZERO).as_secs();

    let mut artist = entry.artist.clone();
    let title = entry.title.clone();
    let sep = if !artist.is_empty() && !title.is_empty() {
        " – "
    } else {
        ""
    };
    if artist.is_empty() && title.is_empty() {
        artist = title_from_file(&entry.file);
    }

    format!(
        "{:0>2}\\. `{:02}:{:02}` {}{}{}",
        pos,
        secs / 60,
        secs % 60,
        escape_markdown_v2(&artist),
        escape_markdown_v2(sep),
        escape_markdown_v2(&title),
    )
}

/// Render a whole queue window, one line per entry.
pub fn render_queue(entries: &[QueueEntry]) -> String {
    if entries.is_empty() {
        return "Queue is empty\\.".to_string();
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| format_queue_entry(i + 1, entry))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Derive a display title from a file path: underscores become spaces, the
/// extension is stripped and each word is title-cased.
fn title_from_file(file: &str) -> String {
    let spaced = file.replace('_', " ");
    let stem = Path::new(&spaced)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    title_case(&stem)
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut boundary = true;
    for ch in s.chars() {
        if ch.is_alphanumeric() {
            if boundary {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            boundary = false;
        } else {
            out.push(ch);
            boundary = true;
        }
    }
    out
}
