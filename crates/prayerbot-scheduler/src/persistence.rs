//! SQLite schema, versioned migrations and row codecs for the roster database.
//!
//! Layout (user_version 1):
//! - `prayer_groups(name, members)`: lowercase group name -> JSON array of user ids
//! - `group_schedules(group_name, recurrence_weeks, trigger_weekday, trigger_hour, last_triggered_at)`
//!
//! user_version 0 is the legacy layout: `prayer_groups` only, no schedules.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use prayerbot_core::error::{PrayerError, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::schedule::{Schedule, weekday_from_index, weekday_index};

/// Current schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

pub(crate) fn db_err(e: rusqlite::Error) -> PrayerError {
    PrayerError::Store(e.to_string())
}

/// Create tables and bring a legacy database up to date.
/// Returns how many groups received a synthesized default schedule.
pub(crate) fn migrate(conn: &mut Connection, now: DateTime<Utc>) -> Result<usize> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS prayer_groups (
            name TEXT PRIMARY KEY,
            members TEXT NOT NULL DEFAULT '[]'   -- JSON array, insertion order
        );",
    )
    .map_err(db_err)?;

    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(db_err)?;
    if version >= SCHEMA_VERSION {
        return Ok(0);
    }

    let tx = conn.transaction().map_err(db_err)?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS group_schedules (
            group_name TEXT PRIMARY KEY,
            recurrence_weeks INTEGER NOT NULL,
            trigger_weekday INTEGER NOT NULL,   -- Monday=0 .. Sunday=6
            trigger_hour INTEGER NOT NULL,
            last_triggered_at TEXT NOT NULL     -- RFC 3339
        );",
    )
    .map_err(db_err)?;

    let defaults = Schedule::new_default(now);
    let synthesized = tx
        .execute(
            "INSERT OR IGNORE INTO group_schedules
             (group_name, recurrence_weeks, trigger_weekday, trigger_hour, last_triggered_at)
             SELECT name, ?1, ?2, ?3, ?4 FROM prayer_groups",
            params![
                defaults.recurrence_weeks,
                weekday_index(defaults.trigger_weekday),
                defaults.trigger_hour,
                defaults.last_triggered_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)
        .map_err(db_err)?;
    tx.commit().map_err(db_err)?;

    Ok(synthesized)
}

pub(crate) fn schema_version(conn: &Connection) -> Result<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(db_err)
}

// ─── Groups ──────────────────────────────────────

pub(crate) fn load_members(conn: &Connection, group: &str) -> Result<Option<Vec<String>>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT members FROM prayer_groups WHERE name = ?1",
            [group],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;
    raw.map(|json| decode_members(group, &json)).transpose()
}

pub(crate) fn store_members(conn: &Connection, group: &str, members: &[String]) -> Result<()> {
    let json = serde_json::to_string(members)?;
    conn.execute(
        "INSERT INTO prayer_groups (name, members) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET members = excluded.members",
        params![group, json],
    )
    .map_err(db_err)?;
    Ok(())
}

/// All groups and their members, ordered by name.
pub(crate) fn load_all_groups(conn: &Connection) -> Result<Vec<(String, Vec<String>)>> {
    let mut stmt = conn
        .prepare("SELECT name, members FROM prayer_groups ORDER BY name")
        .map_err(db_err)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(db_err)?;

    let mut groups = Vec::new();
    for row in rows {
        let (name, json) = row.map_err(db_err)?;
        let members = decode_members(&name, &json)?;
        groups.push((name, members));
    }
    Ok(groups)
}

pub(crate) fn group_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM prayer_groups ORDER BY name")
        .map_err(db_err)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(names)
}

/// Delete a group and its schedule. Run inside a transaction.
pub(crate) fn delete_group(conn: &Connection, group: &str) -> Result<()> {
    conn.execute("DELETE FROM group_schedules WHERE group_name = ?1", [group])
        .map_err(db_err)?;
    conn.execute("DELETE FROM prayer_groups WHERE name = ?1", [group])
        .map_err(db_err)?;
    Ok(())
}

fn decode_members(group: &str, json: &str) -> Result<Vec<String>> {
    serde_json::from_str(json)
        .map_err(|e| PrayerError::Store(format!("Corrupt member list for group '{group}': {e}")))
}

// ─── Schedules ──────────────────────────────────────

pub(crate) fn load_schedule(conn: &Connection, group: &str) -> Result<Option<Schedule>> {
    let row = conn
        .query_row(
            "SELECT recurrence_weeks, trigger_weekday, trigger_hour, last_triggered_at
             FROM group_schedules WHERE group_name = ?1",
            [group],
            |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()
        .map_err(db_err)?;

    let Some((recurrence_weeks, weekday, trigger_hour, last_str)) = row else {
        return Ok(None);
    };

    let trigger_weekday = weekday_from_index(weekday)
        .map_err(|e| PrayerError::Store(format!("Corrupt schedule for group '{group}': {e}")))?;
    let last_triggered_at = DateTime::parse_from_rfc3339(&last_str)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| PrayerError::Store(format!("Corrupt schedule for group '{group}': {e}")))?;

    Ok(Some(Schedule {
        recurrence_weeks,
        trigger_weekday,
        trigger_hour,
        last_triggered_at,
    }))
}

pub(crate) fn store_schedule(conn: &Connection, group: &str, schedule: &Schedule) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO group_schedules
         (group_name, recurrence_weeks, trigger_weekday, trigger_hour, last_triggered_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            group,
            schedule.recurrence_weeks,
            weekday_index(schedule.trigger_weekday),
            schedule.trigger_hour,
            schedule.last_triggered_at.to_rfc3339(),
        ],
    )
    .map_err(db_err)?;
    Ok(())
}

// ─── Legacy import ──────────────────────────────────────

/// Read a legacy flat export: `{"group": ["U1", "U2"], ...}`.
pub fn load_legacy_json(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
