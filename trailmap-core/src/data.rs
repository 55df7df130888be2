use crate::analytics::AnalyticsResult;
use crate::error::Result;
use crate::session::VisitorSession;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::io;
use std::path::Path;
use trailmap_scanner::SiteNode;

pub struct Database {
    conn: Connection,
}

/// A stored analytics run.
#[derive(Debug, Clone)]
pub struct StoredResult {
    pub id: String,
    pub site_map_id: String,
    pub created_at: i64,
    pub result: AnalyticsResult,
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Database {
    pub fn drop(path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
-- Crawled site hierarchies
CREATE TABLE IF NOT EXISTS site_maps (
    id TEXT PRIMARY KEY,
    website_id TEXT NOT NULL,
    root_url TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    tree TEXT NOT NULL          -- JSON SiteNode
);

CREATE INDEX IF NOT EXISTS idx_site_maps_website ON site_maps(website_id, created_at);

-- Recorded visitor sessions
CREATE TABLE IF NOT EXISTS tracking_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    visitor_id TEXT NOT NULL,
    navigation_path TEXT NOT NULL,  -- JSON array of URLs
    event_type TEXT,
    time_spent_on_page REAL,
    recorded_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tracking_sessions_visitor ON tracking_sessions(visitor_id);

-- Weighted maps with backtracking counts
CREATE TABLE IF NOT EXISTS analytics_results (
    id TEXT PRIMARY KEY,
    site_map_id TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    web_map TEXT NOT NULL,       -- JSON SiteNode with weights
    backtracking TEXT NOT NULL,  -- JSON object of edge -> visitors

    FOREIGN KEY(site_map_id) REFERENCES site_maps(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_analytics_results_map ON analytics_results(site_map_id, created_at);
            ",
        )?;
        Ok(())
    }

    // Site map management
    pub fn store_site_map(&self, website_id: &str, tree: &SiteNode) -> Result<String> {
        let map_id = uuid::Uuid::new_v4().to_string();
        let tree_json = serde_json::to_string(tree)?;

        self.conn.execute(
            "INSERT INTO site_maps (id, website_id, root_url, created_at, tree) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&map_id, website_id, &tree.id, current_timestamp(), tree_json],
        )?;

        Ok(map_id)
    }

    /// Most recently stored site map for a website, with its id.
    pub fn latest_site_map(&self, website_id: &str) -> Result<Option<(String, SiteNode)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, tree FROM site_maps WHERE website_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
        )?;

        let row: Option<(String, String)> = stmt
            .query_row(params![website_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        match row {
            Some((id, tree_json)) => Ok(Some((id, serde_json::from_str(&tree_json)?))),
            None => Ok(None),
        }
    }

    pub fn count_site_maps(&self, website_id: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM site_maps WHERE website_id = ?1",
            params![website_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Session operations
    pub fn insert_session(&self, session: &VisitorSession) -> Result<i64> {
        let path_json = serde_json::to_string(&session.navigation_path)?;
        let recorded_at = session.recorded_at.unwrap_or_else(current_timestamp);

        self.conn.execute(
            "INSERT INTO tracking_sessions (
                visitor_id, navigation_path, event_type, time_spent_on_page, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &session.visitor_id,
                path_json,
                &session.event_type,
                session.time_spent_on_page,
                recorded_at,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Insert a batch in one transaction. Returns the number of rows written.
    pub fn insert_sessions(&mut self, sessions: &[VisitorSession]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tracking_sessions (
                    visitor_id, navigation_path, event_type, time_spent_on_page, recorded_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for session in sessions {
                stmt.execute(params![
                    &session.visitor_id,
                    serde_json::to_string(&session.navigation_path)?,
                    &session.event_type,
                    session.time_spent_on_page,
                    session.recorded_at.unwrap_or_else(current_timestamp),
                ])?;
            }
        }
        tx.commit()?;
        Ok(sessions.len())
    }

    pub fn load_sessions(&self) -> Result<Vec<VisitorSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT visitor_id, navigation_path, event_type, time_spent_on_page, recorded_at
             FROM tracking_sessions ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(
                |(visitor_id, path_json, event_type, time_spent_on_page, recorded_at)| -> Result<VisitorSession> {
                    Ok(VisitorSession {
                        visitor_id,
                        navigation_path: serde_json::from_str(&path_json)?,
                        event_type,
                        time_spent_on_page,
                        recorded_at: Some(recorded_at),
                    })
                },
            )
            .collect()
    }

    // Analytics results
    pub fn store_result(&self, site_map_id: &str, result: &AnalyticsResult) -> Result<String> {
        let result_id = uuid::Uuid::new_v4().to_string();

        self.conn.execute(
            "INSERT INTO analytics_results (id, site_map_id, created_at, web_map, backtracking)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &result_id,
                site_map_id,
                current_timestamp(),
                serde_json::to_string(&result.web_map)?,
                serde_json::to_string(&result.backtracking)?,
            ],
        )?;

        Ok(result_id)
    }

    pub fn latest_result(&self, site_map_id: &str) -> Result<Option<StoredResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, web_map, backtracking FROM analytics_results
             WHERE site_map_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
        )?;

        let row: Option<(String, i64, String, String)> = stmt
            .query_row(params![site_map_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .optional()?;

        let Some((id, created_at, web_map, backtracking)) = row else {
            return Ok(None);
        };

        Ok(Some(StoredResult {
            id,
            site_map_id: site_map_id.to_string(),
            created_at,
            result: AnalyticsResult {
                web_map: serde_json::from_str(&web_map)?,
                backtracking: serde_json::from_str(&backtracking)?,
            },
        }))
    }
}
