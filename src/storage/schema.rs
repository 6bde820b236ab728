use rusqlite::Connection;

pub mod tables {
    pub const TRACKS: &str = "tracks";
    pub const TRACK_MOODS: &str = "track_moods";
    pub const TRACK_FEATURES: &str = "track_features";
    pub const IMPORTS: &str = "imports";

    pub const ALL_TABLES: &[&str] = &[TRACKS, TRACK_MOODS, TRACK_FEATURES, IMPORTS];
}

pub mod columns {
    pub const ID: &str = "id";
    pub const STATUS: &str = "status";
    pub const PLAY_COUNT: &str = "play_count";
    pub const TRACK_ID: &str = "track_id";
    pub const MOOD_ID: &str = "mood_id";
    pub const FEATURE: &str = "feature";
    pub const VALUE: &str = "value";
    pub const IMPORTED_AT: &str = "imported_at";
}

pub use columns::*;
pub use tables::*;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tracks (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    play_count INTEGER
);

CREATE INDEX IF NOT EXISTS tracks_status ON tracks (status);

CREATE TABLE IF NOT EXISTS track_moods (
    track_id TEXT NOT NULL REFERENCES tracks (id) ON DELETE CASCADE,
    mood_id TEXT NOT NULL,
    PRIMARY KEY (track_id, mood_id)
);

CREATE INDEX IF NOT EXISTS track_moods_mood ON track_moods (mood_id);

CREATE TABLE IF NOT EXISTS track_features (
    track_id TEXT NOT NULL REFERENCES tracks (id) ON DELETE CASCADE,
    feature TEXT NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (track_id, feature)
);

CREATE TABLE IF NOT EXISTS imports (
    imported_at INTEGER NOT NULL
);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)
}
