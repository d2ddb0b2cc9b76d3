use crate::model::schedule::recurrence_rule::RecurrenceRule;
use crate::utils::time::normalize_time;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Binds a destination and a start time to an optional recurrence rule.
///
/// Without a rule the schedule is one-shot and fires exactly once at
/// `schedule_time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub uuid: Uuid,
    pub destination: Option<String>,
    schedule_time: DateTime<Utc>,
    pub rule: Option<RecurrenceRule>,
    pub active: bool,
}

impl Schedule {
    pub fn new(
        destination: Option<String>,
        schedule_time: DateTime<Utc>,
        rule: Option<RecurrenceRule>,
    ) -> Self {
        Self::restore(Uuid::new_v4(), destination, schedule_time, rule, true)
    }

    pub fn restore(
        uuid: Uuid,
        destination: Option<String>,
        schedule_time: DateTime<Utc>,
        rule: Option<RecurrenceRule>,
        active: bool,
    ) -> Self {
        Self {
            uuid,
            destination,
            schedule_time: normalize_time(schedule_time),
            rule,
            active,
        }
    }

    pub fn schedule_time(&self) -> DateTime<Utc> {
        self.schedule_time
    }

    pub fn set_schedule_time(&mut self, schedule_time: DateTime<Utc>) {
        self.schedule_time = normalize_time(schedule_time);
    }

    /// Most recent occurrence at or before `at`.
    pub fn last_before(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let at = normalize_time(at);
        match &self.rule {
            Some(rule) => rule.occurrences_before(self.schedule_time, at, true),
            None => (self.schedule_time <= at).then_some(self.schedule_time),
        }
    }

    /// First occurrence strictly after `at`.
    pub fn next_after(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let at = normalize_time(at);
        match &self.rule {
            Some(rule) => rule.occurrences_after(self.schedule_time, at, false),
            None => (self.schedule_time > at).then_some(self.schedule_time),
        }
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_before(Utc::now())
    }

    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.next_after(Utc::now())
    }

    /// Whether a run is due at `at`: true anywhere inside a trigger window.
    pub fn trigger(&self, at: DateTime<Utc>) -> bool {
        self.last_before(at)
            .is_some_and(|last| normalize_time(at) >= last)
    }
}
