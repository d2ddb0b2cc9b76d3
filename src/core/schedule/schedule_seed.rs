use crate::core::infrastructure::database_manager::DatabaseManager;
use crate::interface::repository::recurrence_rule::RecurrenceRuleRepository;
use crate::interface::repository::schedule::ScheduleRepository;
use crate::model::config::ScheduleEntry;
use crate::model::error::Error;
use crate::model::log::schedule::ScheduleLog;
use macros::log;
use std::collections::HashSet;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub saved: usize,
    pub removed: usize,
    pub pruned_rules: u64,
}

/// Makes the stored schedules match the `[[Schedule]]` tables. Entries are
/// upserted by their name-derived identity, schedules no longer listed are
/// removed, and rules left without a schedule are pruned.
pub async fn seed_schedules(
    database_manager: &DatabaseManager,
    entries: &[ScheduleEntry],
) -> Result<SeedReport, Error> {
    let mut report = SeedReport::default();
    let mut listed = HashSet::with_capacity(entries.len());
    for entry in entries {
        let schedule = entry.to_schedule()?;
        database_manager.save_schedule(&schedule).await?;
        listed.insert(schedule.uuid);
        report.saved += 1;
    }

    for stored in database_manager.get_all_schedules().await? {
        if !listed.contains(&stored.uuid) {
            database_manager.remove_schedule(stored.uuid).await?;
            log!(ScheduleLog::ScheduleRemoved { uuid: stored.uuid });
            report.removed += 1;
        }
    }
    report.pruned_rules = database_manager.remove_unreferenced_rules().await?;

    log!(ScheduleLog::SchedulesSeeded {
        saved: report.saved,
        removed: report.removed,
        pruned: report.pruned_rules
    });
    Ok(report)
}
