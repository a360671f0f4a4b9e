//! SQL schema for the sample store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per sample. The record is the whole sample document; writes
-- replace it wholesale.
CREATE TABLE IF NOT EXISTS samples (
    key         TEXT PRIMARY KEY,
    record_json TEXT NOT NULL,   -- {\"static\": {..}, \"temporal\": [..], \"event\": [..]}
    updated_at  TEXT NOT NULL    -- RFC 3339 UTC
);

PRAGMA user_version = 1;
";
