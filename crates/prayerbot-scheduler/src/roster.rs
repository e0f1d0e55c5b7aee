//! Roster store: prayer group membership and schedules, persisted in SQLite.
//!
//! Every operation runs under one global lock and, when it writes, inside one
//! transaction: a group row and its schedule row are created and deleted
//! together, and readers never see one without the other.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc, Weekday};
use prayerbot_core::error::{PrayerError, Result};
use rusqlite::Connection;

use crate::persistence::{self, db_err};
use crate::schedule::{GroupRecord, Schedule, canonical_group_name};

/// Persistent group -> members + schedule mapping.
pub struct RosterStore {
    conn: Mutex<Connection>,
}

impl RosterStore {
    /// Open or create the roster database, migrating legacy layouts.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        let store = Self::init(conn)?;
        tracing::info!(
            "📖 Loaded roster {} which knows about {} prayer groups",
            path.display(),
            store.list_all_groups()?.len()
        );
        Ok(store)
    }

    /// In-memory store, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "synchronous", "FULL").map_err(db_err)?;
        let synthesized = persistence::migrate(&mut conn, Utc::now())?;
        if synthesized > 0 {
            tracing::info!(
                "🔧 Migrated legacy roster: default schedules created for {synthesized} groups"
            );
        }
        tracing::debug!("Roster schema version {}", persistence::schema_version(&conn)?);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PrayerError::Store(format!("Roster lock poisoned: {e}")))
    }

    // ─── Membership ──────────────────────────────────────

    /// Add `user` to `group`, creating the group with a default schedule if needed.
    /// Returns the resulting member count.
    pub fn add_member(&self, group: &str, user: &str) -> Result<usize> {
        self.add_member_at(group, user, Utc::now())
    }

    /// Like [`add_member`](Self::add_member) with an explicit creation time.
    pub fn add_member_at(&self, group: &str, user: &str, now: DateTime<Utc>) -> Result<usize> {
        let group = canonical_group_name(group)?;
        let user = user.trim();
        if user.is_empty() {
            return Err(PrayerError::Validation("user id must not be empty".into()));
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        let count = match persistence::load_members(&tx, &group)? {
            Some(mut members) => {
                if !members.iter().any(|m| m == user) {
                    members.push(user.to_string());
                    persistence::store_members(&tx, &group, &members)?;
                }
                members.len()
            }
            None => {
                persistence::store_members(&tx, &group, &[user.to_string()])?;
                persistence::store_schedule(&tx, &group, &Schedule::new_default(now))?;
                tracing::info!("🆕 Prayer group '{group}' created");
                1
            }
        };
        tx.commit().map_err(db_err)?;
        Ok(count)
    }

    /// Remove `user` from `group`. Returns the remaining members; empty when the
    /// group is unknown or was deleted because `user` was the last member.
    pub fn remove_member(&self, group: &str, user: &str) -> Result<Vec<String>> {
        let group = canonical_group_name(group)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        let remaining = remove_in(&tx, &group, user)?.unwrap_or_default();
        tx.commit().map_err(db_err)?;
        Ok(remaining)
    }

    /// Remove `user` from every group. Returns the groups they were removed from.
    pub fn remove_member_from_all_groups(&self, user: &str) -> Result<Vec<String>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        let mut removed_from = Vec::new();
        for (group, members) in persistence::load_all_groups(&tx)? {
            if members.iter().any(|m| m == user) {
                remove_in(&tx, &group, user)?;
                removed_from.push(group);
            }
        }
        tx.commit().map_err(db_err)?;
        Ok(removed_from)
    }

    /// Groups containing `user`, ordered by name.
    pub fn list_groups_for(&self, user: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        Ok(persistence::load_all_groups(&conn)?
            .into_iter()
            .filter(|(_, members)| members.iter().any(|m| m == user))
            .map(|(name, _)| name)
            .collect())
    }

    /// Every group name, ordered by name.
    pub fn list_all_groups(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        persistence::group_names(&conn)
    }

    /// Members of `group` in the order they joined.
    pub fn get_members(&self, group: &str) -> Result<Vec<String>> {
        let group = canonical_group_name(group)?;
        let conn = self.lock()?;
        persistence::load_members(&conn, &group)?.ok_or(PrayerError::NotFound(group))
    }

    // ─── Schedules ──────────────────────────────────────

    /// Replace the recurrence rule of `group`. `last_triggered_at` is kept.
    pub fn set_schedule(
        &self,
        group: &str,
        recurrence_weeks: u32,
        weekday: Weekday,
        hour: u32,
    ) -> Result<Schedule> {
        Schedule::validate(recurrence_weeks, hour)?;
        let group = canonical_group_name(group)?;

        let conn = self.lock()?;
        let mut schedule = persistence::load_schedule(&conn, &group)?
            .ok_or_else(|| PrayerError::NotFound(group.clone()))?;
        schedule.recurrence_weeks = recurrence_weeks;
        schedule.trigger_weekday = weekday;
        schedule.trigger_hour = hour;
        persistence::store_schedule(&conn, &group, &schedule)?;

        tracing::info!(
            "🗓️ Schedule for '{group}' set to every {recurrence_weeks} week(s) on {weekday} at {hour:02}:00"
        );
        Ok(schedule)
    }

    pub fn get_schedule(&self, group: &str) -> Result<Schedule> {
        let group = canonical_group_name(group)?;
        let conn = self.lock()?;
        persistence::load_schedule(&conn, &group)?.ok_or(PrayerError::NotFound(group))
    }

    /// Record that `group` was triggered at `at`.
    pub fn mark_triggered(&self, group: &str, at: DateTime<Utc>) -> Result<()> {
        let group = canonical_group_name(group)?;
        let conn = self.lock()?;
        let mut schedule = persistence::load_schedule(&conn, &group)?
            .ok_or_else(|| PrayerError::NotFound(group.clone()))?;
        schedule.last_triggered_at = at;
        persistence::store_schedule(&conn, &group, &schedule)
    }

    // ─── Snapshots ──────────────────────────────────────

    /// Members and schedule of one group, read together.
    pub fn snapshot(&self, group: &str) -> Result<GroupRecord> {
        let group = canonical_group_name(group)?;
        let conn = self.lock()?;
        let members = persistence::load_members(&conn, &group)?
            .ok_or_else(|| PrayerError::NotFound(group.clone()))?;
        let schedule = persistence::load_schedule(&conn, &group)?
            .ok_or_else(|| PrayerError::Store(format!("Group '{group}' has no schedule")))?;
        Ok(GroupRecord {
            name: group,
            members,
            schedule,
        })
    }

    /// Every group with its members and schedule, ordered by name.
    pub fn dump_groups(&self) -> Result<Vec<GroupRecord>> {
        let conn = self.lock()?;
        persistence::load_all_groups(&conn)?
            .into_iter()
            .map(|(name, members)| -> Result<GroupRecord> {
                let schedule = persistence::load_schedule(&conn, &name)?
                    .ok_or_else(|| PrayerError::Store(format!("Group '{name}' has no schedule")))?;
                Ok(GroupRecord {
                    name,
                    members,
                    schedule,
                })
            })
            .collect()
    }

    /// Merge a legacy flat group -> members mapping into the store.
    /// Returns how many memberships were newly added.
    pub fn import_legacy(&self, groups: &BTreeMap<String, Vec<String>>) -> Result<usize> {
        let mut added = 0;
        for (group, members) in groups {
            for user in members {
                let before = self.get_members(group).map(|m| m.len()).unwrap_or(0);
                if self.add_member(group, user)? > before {
                    added += 1;
                }
            }
        }
        tracing::info!("📥 Imported {added} memberships across {} legacy groups", groups.len());
        Ok(added)
    }
}

/// Remove `user` from `group` within an open transaction.
/// `None` when the group does not exist.
fn remove_in(conn: &Connection, group: &str, user: &str) -> Result<Option<Vec<String>>> {
    let Some(mut members) = persistence::load_members(conn, group)? else {
        return Ok(None);
    };
    let before = members.len();
    members.retain(|m| m != user);
    if members.len() == before {
        return Ok(Some(members));
    }

    if members.is_empty() {
        persistence::delete_group(conn, group)?;
        tracing::info!("🗑️ Prayer group '{group}' is empty and was deleted");
    } else {
        persistence::store_members(conn, group, &members)?;
    }
    Ok(Some(members))
}
