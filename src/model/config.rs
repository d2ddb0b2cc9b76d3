use crate::model::context::{OriginContext, ServiceEndpoint};
use crate::model::error::schedule::ScheduleError;
use crate::model::schedule::recurrence_rule::RecurrenceRule;
use crate::model::schedule::schedule::Schedule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ConfigTable {
    #[serde(rename = "Config")]
    pub config: Config,
    #[serde(rename = "Origin")]
    pub origin: OriginContext,
    #[serde(rename = "Server")]
    pub server: ServiceEndpoint,
    #[serde(rename = "Schedule", default)]
    pub schedules: Vec<ScheduleEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub dump_directory: PathBuf,
    pub source_path: PathBuf,
    pub log_directory: PathBuf,
    pub tick_interval: u64,             // second
    pub destination_sync_interval: u64, // second
    pub transfer_timeout: u64,          // second
    pub max_concurrency: usize,         // number
    pub local_retention_days: u32,      // day, 0 keeps local copies forever
}

/// One `[[Schedule]]` table. The name is the operator-facing key and
/// derives the stored identity, so editing an entry updates it in place.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub destination: Option<String>,
    pub time: DateTime<Utc>,
    pub frequency: Option<String>,
    pub params: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ScheduleEntry {
    pub fn uuid(&self) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("schedule:{}", self.name).as_bytes())
    }

    pub fn rule_uuid(&self) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("rule:{}", self.name).as_bytes())
    }

    pub fn to_schedule(&self) -> Result<Schedule, ScheduleError> {
        let rule = match (&self.frequency, &self.params) {
            (Some(frequency), params) => Some(RecurrenceRule::from_record(
                self.rule_uuid(),
                self.name.as_str(),
                self.description.as_str(),
                frequency,
                params.as_deref(),
            )?),
            (None, Some(_)) => return Err(ScheduleError::ParamsWithoutFrequency),
            (None, None) => None,
        };
        Ok(Schedule::restore(
            self.uuid(),
            self.destination.clone(),
            self.time,
            rule,
            self.active,
        ))
    }
}
