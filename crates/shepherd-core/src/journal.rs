//! The follow-up journal: an append-only, ordered list of timestamped notes.
//!
//! Entries are never rewritten or removed. The newline-delimited text form
//! (`[<timestamp>] <text>`) is produced only for display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used when rendering the journal as text.
pub const RENDER_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
  pub timestamp: DateTime<Utc>,
  /// Who wrote the entry, when known.
  pub author:    Option<String>,
  pub text:      String,
}

impl JournalEntry {
  pub fn new(
    timestamp: DateTime<Utc>,
    author: Option<String>,
    text: impl Into<String>,
  ) -> Self {
    Self { timestamp, author, text: text.into() }
  }

  pub fn render(&self) -> String {
    let ts = self.timestamp.format(RENDER_FORMAT);
    match &self.author {
      Some(author) => format!("[{ts}] {} ({author})", self.text),
      None => format!("[{ts}] {}", self.text),
    }
  }
}

/// Entries in the order they were written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FollowUpJournal(Vec<JournalEntry>);

impl FollowUpJournal {
  pub fn entries(&self) -> &[JournalEntry] { &self.0 }

  pub fn latest(&self) -> Option<&JournalEntry> { self.0.last() }

  pub fn append(&mut self, entry: JournalEntry) { self.0.push(entry); }

  /// Append `entry` unless the latest entry already carries the same text.
  /// Returns whether anything was written.
  pub fn append_unless_repeated(&mut self, entry: JournalEntry) -> bool {
    if self.latest().is_some_and(|last| last.text == entry.text) {
      return false;
    }
    self.append(entry);
    true
  }

  /// Newline-delimited text form, oldest entry first.
  pub fn render(&self) -> String {
    self
      .0
      .iter()
      .map(JournalEntry::render)
      .collect::<Vec<_>>()
      .join("\n")
  }
}
