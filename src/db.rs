//! Local durable store: one SQLite row per student, keyed by id. Nested
//! progress and badge collections ride along as JSON columns.

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::models::{Level, StudentRecord};

#[derive(Clone)]
pub struct DurableStore {
    pool: SqlitePool,
}

impl DurableStore {
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        Ok(DurableStore { pool })
    }

    /// Private in-memory database, used by tests. A single connection keeps
    /// every query on the same memory instance.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("failed to open in-memory database")?;
        let store = DurableStore { pool };
        store.init().await?;
        Ok(store)
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                grade INTEGER NOT NULL,
                progress TEXT NOT NULL,
                coins INTEGER NOT NULL,
                badges TEXT NOT NULL,
                level TEXT NOT NULL,
                last_updated INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, student_id: &str) -> anyhow::Result<Option<StudentRecord>> {
        let row = sqlx::query("SELECT * FROM students WHERE id = $1")
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(record_from_row).transpose()
    }

    pub async fn put(&self, record: &StudentRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO students (id, name, grade, progress, coins, badges, level, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET name = excluded.name,
                grade = excluded.grade,
                progress = excluded.progress,
                coins = excluded.coins,
                badges = excluded.badges,
                level = excluded.level,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(record.grade)
        .bind(serde_json::to_string(&record.progress)?)
        .bind(record.coins)
        .bind(serde_json::to_string(&record.badges)?)
        .bind(record.level.to_string())
        .bind(record.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn all(&self) -> anyhow::Result<Vec<StudentRecord>> {
        let rows = sqlx::query("SELECT * FROM students ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(record_from_row).collect()
    }
}

/// Imports student records from a CSV file. Rows without an id get a
/// minted one; existing ids are upserted.
pub async fn import_csv(store: &DurableStore, csv_path: &Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        id: Option<String>,
        name: String,
        grade: i64,
        coins: i64,
        /// Pipe-separated badge names.
        badges: Option<String>,
        level: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let mut record = StudentRecord::fresh(
            &row.id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            &row.name,
            Some(row.grade),
        );
        record.coins = row.coins;
        record.badges = row
            .badges
            .as_deref()
            .unwrap_or_default()
            .split('|')
            .filter(|b| !b.is_empty())
            .map(|b| b.to_string())
            .collect();
        if let Some(level) = row.level.as_deref() {
            record.level = Level::from_str(level)
                .with_context(|| format!("bad level for {}", record.name))?;
        }

        store.put(&record).await?;
        inserted += 1;
    }

    Ok(inserted)
}

fn record_from_row(row: sqlx::sqlite::SqliteRow) -> anyhow::Result<StudentRecord> {
    let progress_json: String = row.get("progress");
    let badges_json: String = row.get("badges");
    let level_text: String = row.get("level");

    Ok(StudentRecord {
        id: row.get("id"),
        name: row.get("name"),
        grade: row.get("grade"),
        progress: serde_json::from_str(&progress_json).context("corrupt progress column")?,
        coins: row.get("coins"),
        badges: serde_json::from_str(&badges_json).context("corrupt badges column")?,
        level: Level::from_str(&level_text)?,
        last_updated: row.get("last_updated"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubjectProgress;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = DurableStore::in_memory().await.unwrap();
        let mut record = StudentRecord::fresh("u1", "Priya", Some(7));
        record.coins = 40;
        record.badges.push("Math Whiz".to_string());
        record.progress.insert(
            "math".to_string(),
            SubjectProgress {
                completed_content: vec!["m1l1".to_string()],
                quiz_scores: Default::default(),
                completion_percentage: 11,
            },
        );

        store.put(&record).await.unwrap();
        let loaded = store.get("u1").await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = DurableStore::in_memory().await.unwrap();
        assert!(store.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn csv_import_upserts_records() {
        let store = DurableStore::in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        std::fs::write(
            &path,
            "id,name,grade,coins,badges,level\n\
             s1,Alice,8,1250,Math Whiz|Science Starter,Silver\n\
             ,Priya,7,0,,\n",
        )
        .unwrap();

        let inserted = import_csv(&store, &path).await.unwrap();
        assert_eq!(inserted, 2);

        let alice = store.get("s1").await.unwrap().unwrap();
        assert_eq!(alice.coins, 1250);
        assert_eq!(alice.badges, vec!["Math Whiz", "Science Starter"]);
        assert_eq!(alice.level, Level::Silver);

        let all = store.all().await.unwrap();
        let priya = all.iter().find(|r| r.name == "Priya").unwrap();
        assert_eq!(priya.level, Level::Bronze);
        assert!(priya.badges.is_empty());
    }

    #[tokio::test]
    async fn put_is_an_upsert() {
        let store = DurableStore::in_memory().await.unwrap();
        let mut record = StudentRecord::fresh("u1", "Priya", None);
        store.put(&record).await.unwrap();

        record.coins = 99;
        record.touch();
        store.put(&record).await.unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].coins, 99);
    }
}
