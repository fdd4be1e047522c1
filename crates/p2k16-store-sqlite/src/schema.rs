//! SQL schema for the p2k16 SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    name          TEXT,
    phone         TEXT,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS circles (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS circle_members (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    circle_id  INTEGER NOT NULL REFERENCES circles(id),
    account_id INTEGER NOT NULL REFERENCES accounts(id),
    issuer_id  INTEGER NOT NULL REFERENCES accounts(id),
    comment    TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (circle_id, account_id)
);

CREATE TABLE IF NOT EXISTS tools (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    description TEXT,
    circle_id   INTEGER REFERENCES circles(id),
    created_at  TEXT NOT NULL
);

-- Checkouts are append-only apart from the single checkin transition.
-- No DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS tool_checkouts (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    tool_id     INTEGER NOT NULL REFERENCES tools(id),
    account_id  INTEGER NOT NULL REFERENCES accounts(id),
    checkout_at TEXT NOT NULL,
    checkin_at  TEXT,              -- NULL while the tool is out
    CHECK (checkin_at IS NULL OR checkin_at >= checkout_at)
);

-- At most one open checkout per tool.
CREATE UNIQUE INDEX IF NOT EXISTS tool_checkouts_open_idx
    ON tool_checkouts(tool_id) WHERE checkin_at IS NULL;
CREATE INDEX IF NOT EXISTS tool_checkouts_tool_idx ON tool_checkouts(tool_id);

CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,   -- hex SHA-256 of the bearer token
    account_id INTEGER NOT NULL REFERENCES accounts(id),
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_expires_idx ON sessions(expires_at);

-- Audit log; append-only.
CREATE TABLE IF NOT EXISTS events (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    domain     TEXT NOT NULL,
    key        TEXT NOT NULL,
    account_id INTEGER,
    subject_id INTEGER,
    text       TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS badge_descriptions (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    title                   TEXT NOT NULL UNIQUE,
    description             TEXT,
    certification_circle_id INTEGER REFERENCES circles(id),
    slug                    TEXT,
    icon                    TEXT,
    color                   TEXT,
    created_by              INTEGER NOT NULL REFERENCES accounts(id),
    created_at              TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS account_badges (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id           INTEGER NOT NULL REFERENCES accounts(id),
    badge_description_id INTEGER NOT NULL REFERENCES badge_descriptions(id),
    awarded_by_id        INTEGER NOT NULL REFERENCES accounts(id),
    created_at           TEXT NOT NULL,
    UNIQUE (account_id, badge_description_id)
);

-- One row per account; renewals update it in place.
CREATE TABLE IF NOT EXISTS memberships (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id        INTEGER NOT NULL UNIQUE REFERENCES accounts(id),
    first_membership  TEXT NOT NULL,   -- YYYY-MM-DD
    start_membership  TEXT NOT NULL,   -- YYYY-MM-DD
    fee               INTEGER NOT NULL CHECK (fee >= 0),
    membership_number INTEGER,
    updated_at        TEXT NOT NULL
);

PRAGMA user_version = 2;
";
