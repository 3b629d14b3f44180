//! Initial schema: preference rows and the venue search cache.

use rusqlite::Connection;

pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS prefs (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS venue_search_cache (
            query     TEXT PRIMARY KEY,
            results   TEXT NOT NULL,
            cached_at TEXT NOT NULL
        );",
    )
}
