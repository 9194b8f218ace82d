use sqlx::SqlitePool;

// Schema definitions
pub const PHOTOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    name TEXT
)
"#;

// One row per (photo, voter). `cast_at` is unix seconds and may be NULL for rows
// written before vote timestamps were recorded.
pub const VOTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS votes (
    photo_id INTEGER NOT NULL,
    voter TEXT NOT NULL,
    vote INTEGER NOT NULL,
    cast_at INTEGER,
    UNIQUE (photo_id, voter),
    FOREIGN KEY (photo_id) REFERENCES photos(id) ON DELETE CASCADE
)
"#;

pub const SCHEMA_SQL: &[&str] = &[PHOTOS_TABLE, VOTES_TABLE];

pub async fn initialize_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for sql in SCHEMA_SQL {
        sqlx::query(sql).execute(pool).await?;
    }
    Ok(())
}
