//! SQL schema for the Shepherd SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS visitors (
    visitor_id          TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    phone               TEXT NOT NULL UNIQUE,   -- dedup key
    email               TEXT,
    source              TEXT NOT NULL DEFAULT 'other',
    purpose             TEXT,
    follow_up_status    TEXT NOT NULL DEFAULT 'pending',
    follow_up_date      TEXT,                   -- YYYY-MM-DD
    follow_up_notes     TEXT NOT NULL DEFAULT '[]', -- JSON journal entries
    assigned_to         TEXT,
    visit_count         INTEGER NOT NULL DEFAULT 0, -- cache only
    last_visit_date     TEXT,                       -- cache only
    converted_to_member INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL,          -- RFC 3339 UTC
    updated_at          TEXT NOT NULL
);

-- Check-ins are never updated. No foreign key: history outlives the visitor.
CREATE TABLE IF NOT EXISTS attendance (
    attendance_id TEXT PRIMARY KEY,
    visitor_id    TEXT NOT NULL,
    service_id    TEXT NOT NULL,
    check_in_date TEXT NOT NULL,   -- YYYY-MM-DD
    check_in_time TEXT NOT NULL,   -- HH:MM:SS
    status        TEXT NOT NULL DEFAULT 'visitor',
    UNIQUE (visitor_id, service_id, check_in_date)
);

CREATE INDEX IF NOT EXISTS visitors_status_idx   ON visitors(follow_up_status);
CREATE INDEX IF NOT EXISTS visitors_created_idx  ON visitors(created_at);
CREATE INDEX IF NOT EXISTS attendance_visitor_idx ON attendance(visitor_id);

PRAGMA user_version = 1;
";
