use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (participants, messages)");
        conn.execute_batch(
            "
            CREATE TABLE participants (
                name        TEXT PRIMARY KEY,
                last_status INTEGER NOT NULL
            );

            CREATE INDEX idx_participants_last_status
                ON participants(last_status);

            -- seq keeps insertion order; id is the public identifier
            CREATE TABLE messages (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT NOT NULL UNIQUE,
                sender      TEXT NOT NULL,
                recipient   TEXT NOT NULL,
                body        TEXT NOT NULL,
                kind        TEXT NOT NULL,
                time        TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
