//! Trigger engine: pairs up a group's members and opens a conversation per pair.
//!
//! Delivery is best-effort, the schedule advance is not: every trigger that gets
//! past the "too lonely" check calls `mark_triggered` exactly once, no matter how
//! many conversations failed to open.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use prayerbot_core::error::{PrayerError, Result};
use prayerbot_core::traits::MessagingGateway;
use tokio::sync::Mutex;

use crate::clock::ScheduleClock;
use crate::partition::partition;
use crate::roster::RosterStore;
use crate::schedule::canonical_group_name;

/// Outcome of triggering one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerResult {
    /// Fewer than two members; nothing sent, schedule untouched.
    Skipped { members: usize },
    Triggered(TriggerReport),
}

/// Per-group delivery counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerReport {
    pub group: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Subsets whose conversation could not be set up, with the reason.
    pub failures: Vec<SubsetFailure>,
    pub triggered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetFailure {
    pub members: Vec<String>,
    pub reason: String,
}

/// Result of one due-check sweep over all groups.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub checked: usize,
    pub results: Vec<(String, TriggerResult)>,
}

/// Orchestrates roster read -> partition -> gateway -> schedule advance.
pub struct TriggerEngine {
    store: Arc<RosterStore>,
    gateway: Arc<dyn MessagingGateway>,
    clock: ScheduleClock,
    bot_name: String,
    /// Held for the duration of a sweep or manual trigger; sweeps never overlap.
    sweep_lock: Mutex<()>,
}

impl TriggerEngine {
    pub fn new(
        store: Arc<RosterStore>,
        gateway: Arc<dyn MessagingGateway>,
        clock: ScheduleClock,
        bot_name: &str,
    ) -> Self {
        Self {
            store,
            gateway,
            clock,
            bot_name: bot_name.to_string(),
            sweep_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<RosterStore> {
        &self.store
    }

    pub fn clock(&self) -> &ScheduleClock {
        &self.clock
    }

    /// Trigger one group now, waiting for any running sweep to finish first.
    pub async fn trigger_group(&self, group: &str) -> Result<TriggerResult> {
        let _guard = self.sweep_lock.lock().await;
        self.run_trigger(group, Utc::now()).await
    }

    /// Trigger every group. A group vanishing mid-sweep is logged and skipped.
    pub async fn trigger_all(&self) -> Result<Vec<(String, TriggerResult)>> {
        let _guard = self.sweep_lock.lock().await;
        let now = Utc::now();
        let mut results = Vec::new();
        for group in self.store.list_all_groups()? {
            match self.run_trigger(&group, now).await {
                Ok(result) => results.push((group, result)),
                Err(PrayerError::NotFound(name)) => {
                    tracing::warn!("Group '{name}' disappeared before it could be triggered");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(results)
    }

    /// Trigger every group whose schedule is due at `now`.
    /// Returns `None` without doing anything if another sweep is still running.
    pub async fn check_and_trigger_due(&self, now: DateTime<Utc>) -> Result<Option<SweepReport>> {
        let Ok(_guard) = self.sweep_lock.try_lock() else {
            return Ok(None);
        };

        let mut report = SweepReport::default();
        for group in self.store.list_all_groups()? {
            let schedule = match self.store.get_schedule(&group) {
                Ok(schedule) => schedule,
                Err(PrayerError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            report.checked += 1;
            if !self.clock.is_due(&schedule, now) {
                continue;
            }

            tracing::info!("🔔 Prayer group '{group}' is due");
            match self.run_trigger(&group, now).await {
                Ok(result) => report.results.push((group, result)),
                Err(PrayerError::NotFound(name)) => {
                    tracing::warn!("Group '{name}' disappeared before it could be triggered");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Some(report))
    }

    async fn run_trigger(&self, group: &str, now: DateTime<Utc>) -> Result<TriggerResult> {
        let group = canonical_group_name(group)?;
        let members = self.store.get_members(&group)?;

        if members.len() <= 1 {
            tracing::warn!("Group '{group}' is too lonely, not doing anything");
            return Ok(TriggerResult::Skipped {
                members: members.len(),
            });
        }

        let subsets = partition(&members);
        let mut report = TriggerReport {
            group: group.clone(),
            triggered_at: now,
            ..TriggerReport::default()
        };

        for subset in subsets {
            report.attempted += 1;
            match self.open_conversation(&subset, now).await {
                Ok(conversation_id) => {
                    report.succeeded += 1;
                    tracing::debug!("Opened {conversation_id} for {}", subset.join(", "));
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Could not create group chat for {}: {e}",
                        subset.join(", ")
                    );
                    report.failed += 1;
                    report.failures.push(SubsetFailure {
                        members: subset,
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.store.mark_triggered(&group, now)?;
        tracing::info!(
            "✅ Group '{group}' triggered: {}/{} conversations opened",
            report.succeeded,
            report.attempted
        );
        Ok(TriggerResult::Triggered(report))
    }

    /// Open one private conversation, introduce its members, then bow out.
    async fn open_conversation(&self, subset: &[String], now: DateTime<Utc>) -> Result<String> {
        let mut names = Vec::with_capacity(subset.len());
        for user in subset {
            names.push(self.gateway.resolve_display_name(user).await);
        }
        tracing::info!("Creating group chat between {}", names.join(", "));

        let conversation_id = self.gateway.create_private_conversation(subset).await?;
        let week_of = now.with_timezone(&self.clock.offset()).date_naive();
        let text = intro_message(&names, week_of, &self.bot_name);
        self.gateway.post_message(&conversation_id, &text).await?;

        if let Err(e) = self.gateway.leave_conversation(&conversation_id).await {
            tracing::debug!("Could not leave {conversation_id}: {e}");
        }
        Ok(conversation_id)
    }
}

/// The message posted into each new conversation.
pub fn intro_message(names: &[String], week_of: NaiveDate, bot_name: &str) -> String {
    format!(
        "This is a private group message for {} for the week of {}. \
         Feel free to talk and share prayer requests freely here. \
         I will bow out now, if you need me, use `@{bot_name}` to get my attention. \
         Have fun! :simple_smile:",
        join_names(names),
        week_of.format("%m/%d/%Y"),
    )
}

/// `*A*`, `*A* and *B*`, `*A*, *B* and *C*`.
fn join_names(names: &[String]) -> String {
    match names.split_last() {
        None => String::new(),
        Some((last, [])) => format!("*{last}*"),
        Some((last, rest)) => format!("*{}* and *{last}*", rest.join("*, *")),
    }
}
