//! Archive of previously downloaded account names.

use crate::error::DatabaseError;
use crate::types::{ArchiveListing, Platform};
use crate::{Error, Result};

use super::{ArchiveEntry, Database};

impl Database {
    /// Add account names to a platform's archive
    ///
    /// Names already present are ignored, as are empty names. Returns how many
    /// names were newly inserted.
    pub async fn add_to_archive(&self, platform: Platform, usernames: &[String]) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        let mut inserted = 0;
        for username in usernames.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO archive (platform, username, added_at) VALUES (?, ?, ?)",
            )
            .bind(platform.as_str())
            .bind(username)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to add to archive: {}",
                    e
                )))
            })?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit archive insert: {}",
                e
            )))
        })?;

        Ok(inserted)
    }

    /// List one platform's archive in insertion order
    pub async fn list_archive_entries(&self, platform: Platform) -> Result<Vec<ArchiveEntry>> {
        let rows = sqlx::query_as::<_, ArchiveEntry>(
            "SELECT id, platform, username, added_at FROM archive WHERE platform = ? ORDER BY id ASC",
        )
        .bind(platform.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list archive: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Archived names for every platform
    pub async fn list_archive(&self) -> Result<ArchiveListing> {
        let names = |entries: Vec<ArchiveEntry>| entries.into_iter().map(|e| e.username).collect();
        Ok(ArchiveListing {
            instagram: names(self.list_archive_entries(Platform::Instagram).await?),
            twitter: names(self.list_archive_entries(Platform::Twitter).await?),
        })
    }

    /// Remove every archived name for a platform
    ///
    /// Returns the number of names removed.
    pub async fn clear_archive(&self, platform: Platform) -> Result<u64> {
        let result = sqlx::query("DELETE FROM archive WHERE platform = ?")
            .bind(platform.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to clear archive: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }
}
