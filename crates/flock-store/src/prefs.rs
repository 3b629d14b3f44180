//! Durable UI preferences.
//!
//! One row per key, mirroring the browser-storage keys the mobile client
//! uses (`flock_map_type`, `flock_pinned`, `flock_order`,
//! `flock_deleted_dms`, `flock_user_lat`/`lng`, `flock_loc_dismissed`,
//! `flockUserMode`, `flockOnboardingComplete`, `flockToken`). List-valued
//! prefs are stored as JSON arrays. These are bounded, non-authoritative
//! caches with no TTL.

use rusqlite::{params, OptionalExtension};

use flock_shared::types::{FlockId, UserId};

use crate::database::Database;
use crate::error::Result;

const KEY_USER_MODE: &str = "flockUserMode";
const KEY_ONBOARDING: &str = "flockOnboardingComplete";
const KEY_MAP_TYPE: &str = "flock_map_type";
const KEY_USER_LAT: &str = "flock_user_lat";
const KEY_USER_LNG: &str = "flock_user_lng";
const KEY_PINNED: &str = "flock_pinned";
const KEY_ORDER: &str = "flock_order";
const KEY_DELETED_DMS: &str = "flock_deleted_dms";
const KEY_LOC_DISMISSED: &str = "flock_loc_dismissed";
const KEY_TOKEN: &str = "flockToken";

impl Database {
    fn set_pref(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO prefs (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn get_pref(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM prefs WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn delete_pref(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM prefs WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    fn set_id_list(&self, key: &str, ids: &[i64]) -> Result<()> {
        self.set_pref(key, &serde_json::to_string(ids)?)
    }

    fn get_id_list(&self, key: &str) -> Result<Vec<i64>> {
        match self.get_pref(key)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    // -- Typed accessors ----------------------------------------------------

    /// User vs. venue-owner mode.
    pub fn set_user_mode(&self, mode: &str) -> Result<()> {
        self.set_pref(KEY_USER_MODE, mode)
    }

    pub fn user_mode(&self) -> Result<Option<String>> {
        self.get_pref(KEY_USER_MODE)
    }

    pub fn set_onboarding_complete(&self, complete: bool) -> Result<()> {
        self.set_pref(KEY_ONBOARDING, if complete { "1" } else { "0" })
    }

    pub fn onboarding_complete(&self) -> Result<bool> {
        Ok(self.get_pref(KEY_ONBOARDING)?.as_deref() == Some("1"))
    }

    /// Map display preference (e.g. `roadmap`, `satellite`).
    pub fn set_map_type(&self, map_type: &str) -> Result<()> {
        self.set_pref(KEY_MAP_TYPE, map_type)
    }

    pub fn map_type(&self) -> Result<Option<String>> {
        self.get_pref(KEY_MAP_TYPE)
    }

    /// Last known geolocation fix, used as the initial map position before
    /// a fresh fix arrives.
    pub fn set_last_fix(&self, lat: f64, lng: f64) -> Result<()> {
        self.set_pref(KEY_USER_LAT, &lat.to_string())?;
        self.set_pref(KEY_USER_LNG, &lng.to_string())
    }

    pub fn last_fix(&self) -> Result<Option<(f64, f64)>> {
        let lat = self.get_pref(KEY_USER_LAT)?.and_then(|s| s.parse().ok());
        let lng = self.get_pref(KEY_USER_LNG)?.and_then(|s| s.parse().ok());
        Ok(lat.zip(lng))
    }

    /// Flocks pinned to the top of the list.
    pub fn set_pinned_flocks(&self, ids: &[FlockId]) -> Result<()> {
        self.set_id_list(KEY_PINNED, &ids.iter().map(|id| id.0).collect::<Vec<_>>())
    }

    pub fn pinned_flocks(&self) -> Result<Vec<FlockId>> {
        Ok(self.get_id_list(KEY_PINNED)?.into_iter().map(FlockId).collect())
    }

    /// User-chosen flock list ordering.
    pub fn set_flock_order(&self, ids: &[FlockId]) -> Result<()> {
        self.set_id_list(KEY_ORDER, &ids.iter().map(|id| id.0).collect::<Vec<_>>())
    }

    pub fn flock_order(&self) -> Result<Vec<FlockId>> {
        Ok(self.get_id_list(KEY_ORDER)?.into_iter().map(FlockId).collect())
    }

    /// DM threads the user has hidden. Receiving a new message from that
    /// user un-hides the thread.
    pub fn add_deleted_dm(&self, user: UserId) -> Result<()> {
        let mut ids = self.get_id_list(KEY_DELETED_DMS)?;
        if !ids.contains(&user.0) {
            ids.push(user.0);
        }
        self.set_id_list(KEY_DELETED_DMS, &ids)
    }

    pub fn remove_deleted_dm(&self, user: UserId) -> Result<()> {
        let mut ids = self.get_id_list(KEY_DELETED_DMS)?;
        ids.retain(|&id| id != user.0);
        self.set_id_list(KEY_DELETED_DMS, &ids)
    }

    pub fn deleted_dms(&self) -> Result<Vec<UserId>> {
        Ok(self
            .get_id_list(KEY_DELETED_DMS)?
            .into_iter()
            .map(UserId)
            .collect())
    }

    /// Whether the location-permission banner was dismissed.
    pub fn set_location_banner_dismissed(&self, dismissed: bool) -> Result<()> {
        self.set_pref(KEY_LOC_DISMISSED, if dismissed { "1" } else { "0" })
    }

    pub fn location_banner_dismissed(&self) -> Result<bool> {
        Ok(self.get_pref(KEY_LOC_DISMISSED)?.as_deref() == Some("1"))
    }

    /// API auth token.
    pub fn set_auth_token(&self, token: &str) -> Result<()> {
        self.set_pref(KEY_TOKEN, token)
    }

    pub fn auth_token(&self) -> Result<Option<String>> {
        self.get_pref(KEY_TOKEN)
    }

    pub fn clear_auth_token(&self) -> Result<bool> {
        self.delete_pref(KEY_TOKEN)
    }
}
