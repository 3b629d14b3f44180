//! Venue search result cache.
//!
//! Search results are the one cache with real invalidation: entries older
//! than five minutes are treated as absent and deleted on read.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use flock_shared::constants::SEARCH_CACHE_TTL_SECS;
use flock_shared::protocol::VenueSnapshot;

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Cache the results of a venue search, replacing any previous entry
    /// for the same query.
    pub fn cache_search(
        &self,
        query: &str,
        results: &[VenueSnapshot],
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO venue_search_cache (query, results, cached_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(query) DO UPDATE
                 SET results = excluded.results, cached_at = excluded.cached_at",
            params![
                normalize(query),
                serde_json::to_string(results)?,
                now.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Look up cached results for a query. Entries older than the TTL are
    /// deleted and reported as a miss.
    pub fn cached_search(
        &self,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<VenueSnapshot>>> {
        let key = normalize(query);
        let row: Option<(String, String)> = self
            .conn()
            .query_row(
                "SELECT results, cached_at FROM venue_search_cache WHERE query = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((results, cached_at)) = row else {
            return Ok(None);
        };

        let fresh = DateTime::parse_from_rfc3339(&cached_at)
            .map(|at| now - at.with_timezone(&Utc) < Duration::seconds(SEARCH_CACHE_TTL_SECS))
            .unwrap_or(false);

        if !fresh {
            debug!(query = %key, "search cache entry expired");
            self.conn().execute(
                "DELETE FROM venue_search_cache WHERE query = ?1",
                params![key],
            )?;
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&results)?))
    }

    /// Delete every expired cache entry (housekeeping on startup).
    pub fn purge_expired_searches(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = (now - Duration::seconds(SEARCH_CACHE_TTL_SECS)).to_rfc3339();
        let affected = self.conn().execute(
            "DELETE FROM venue_search_cache WHERE cached_at < ?1",
            params![cutoff],
        )?;
        Ok(affected)
    }
}

fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue(name: &str) -> VenueSnapshot {
        VenueSnapshot {
            name: name.into(),
            venue_id: Some(format!("g:{name}")),
            address: None,
            rating: Some(4.5),
        }
    }

    #[test]
    fn fresh_entries_hit() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();

        db.cache_search("Pubs in Soho", &[venue("The Crown")], now)
            .unwrap();

        let hit = db.cached_search("  pubs in soho ", now).unwrap();
        assert_eq!(hit.unwrap()[0].name, "The Crown");
    }

    #[test]
    fn entries_expire_after_ttl() {
        let db = Database::open_in_memory().unwrap();
        let cached_at = Utc::now();
        let later = cached_at + Duration::seconds(SEARCH_CACHE_TTL_SECS + 1);

        db.cache_search("pubs", &[venue("The Crown")], cached_at)
            .unwrap();

        assert!(db.cached_search("pubs", later).unwrap().is_none());
        // The expired row was deleted, not just skipped.
        assert!(db.cached_search("pubs", cached_at).unwrap().is_none());
    }

    #[test]
    fn recache_replaces_previous_results() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();

        db.cache_search("pubs", &[venue("Old")], now).unwrap();
        db.cache_search("pubs", &[venue("New")], now).unwrap();

        let hit = db.cached_search("pubs", now).unwrap().unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].name, "New");
    }

    #[test]
    fn purge_removes_only_expired_rows() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let old = now - Duration::seconds(SEARCH_CACHE_TTL_SECS + 60);

        db.cache_search("old", &[venue("A")], old).unwrap();
        db.cache_search("fresh", &[venue("B")], now).unwrap();

        assert_eq!(db.purge_expired_searches(now).unwrap(), 1);
        assert!(db.cached_search("fresh", now).unwrap().is_some());
    }
}
