use crate::model::schedule::recurrence;
use crate::model::error::schedule::ScheduleError;
use crate::model::log::schedule::ScheduleLog;
use chrono::{DateTime, Utc};
use macros::log;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Yearly,
    Monthly,
    Weekly,
    Daily,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yearly => "YEARLY",
            Self::Monthly => "MONTHLY",
            Self::Weekly => "WEEKLY",
            Self::Daily => "DAILY",
        }
    }
}

impl FromStr for Frequency {
    type Err = ScheduleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "YEARLY" => Ok(Self::Yearly),
            "MONTHLY" => Ok(Self::Monthly),
            "WEEKLY" => Ok(Self::Weekly),
            "DAILY" => Ok(Self::Daily),
            other => Err(ScheduleError::UnknownFrequency(other)),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleParam {
    Count,
    BySetPos,
    ByMonth,
    ByMonthDay,
    ByYearDay,
    ByWeekNo,
    ByWeekday,
    ByHour,
    ByMinute,
    BySecond,
    ByEaster,
}

impl RuleParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::BySetPos => "bysetpos",
            Self::ByMonth => "bymonth",
            Self::ByMonthDay => "bymonthday",
            Self::ByYearDay => "byyearday",
            Self::ByWeekNo => "byweekno",
            Self::ByWeekday => "byweekday",
            Self::ByHour => "byhour",
            Self::ByMinute => "byminute",
            Self::BySecond => "bysecond",
            Self::ByEaster => "byeaster",
        }
    }

    // Signed selectors count from the end of their period and reject zero.
    fn accepts(&self, value: i32) -> bool {
        let (range, signed): (RangeInclusive<i32>, bool) = match self {
            Self::Count => (1..=i32::MAX, false),
            Self::BySetPos => (1..=366, true),
            Self::ByMonth => (1..=12, false),
            Self::ByMonthDay => (1..=31, true),
            Self::ByYearDay => (1..=366, true),
            Self::ByWeekNo => (1..=53, true),
            Self::ByWeekday => (0..=6, false),
            Self::ByHour => (0..=23, false),
            Self::ByMinute => (0..=59, false),
            Self::BySecond => (0..=59, false),
            Self::ByEaster => (-366..=366, false),
        };
        range.contains(&value) || (signed && range.contains(&-value))
    }
}

impl FromStr for RuleParam {
    type Err = ScheduleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "count" => Ok(Self::Count),
            "bysetpos" => Ok(Self::BySetPos),
            "bymonth" => Ok(Self::ByMonth),
            "bymonthday" => Ok(Self::ByMonthDay),
            "byyearday" => Ok(Self::ByYearDay),
            "byweekno" => Ok(Self::ByWeekNo),
            "byweekday" => Ok(Self::ByWeekday),
            "byhour" => Ok(Self::ByHour),
            "byminute" => Ok(Self::ByMinute),
            "bysecond" => Ok(Self::BySecond),
            "byeaster" => Ok(Self::ByEaster),
            other => Err(ScheduleError::UnknownParameter(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(i32),
    List(Vec<i32>),
}

impl ParamValue {
    pub fn values(&self) -> &[i32] {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::List(values) => values,
        }
    }
}

/// Extra recurrence parameters, validated on parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleParams(BTreeMap<RuleParam, ParamValue>);

impl RuleParams {
    pub fn get(&self, param: RuleParam) -> Option<&ParamValue> {
        self.0.get(&param)
    }

    /// Values of `param`, empty when absent.
    pub fn values(&self, param: RuleParam) -> &[i32] {
        self.0.get(&param).map(ParamValue::values).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for RuleParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .0
            .iter()
            .map(|(param, value)| {
                let values: Vec<String> = value.values().iter().map(i32::to_string).collect();
                format!("{}:{}", param.as_str(), values.join(","))
            })
            .collect();
        f.write_str(&entries.join(";"))
    }
}

/// Parses `key:v[,v]*[;key:v[,v]*]*`.
///
/// Entries that do not split into exactly one key and one value list are
/// skipped with a warning. Unknown keys, non-integer values and values out of
/// range are configuration errors. A single value collapses to a scalar.
pub fn parse_params(raw: &str) -> Result<RuleParams, ScheduleError> {
    let mut params = BTreeMap::new();

    for entry in raw.split(';') {
        if entry.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = entry.split(':').collect();
        let [key, values] = parts.as_slice() else {
            log!(ScheduleLog::MalformedParameter {
                entry: entry.to_string()
            });
            continue;
        };

        let key = key.trim();
        let param = key.parse::<RuleParam>()?;

        let cleaned: String = values
            .chars()
            .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
            .collect();
        let mut parsed = Vec::new();
        for value in cleaned.split(',') {
            let value = value
                .trim()
                .parse::<i32>()
                .map_err(|err| ScheduleError::InvalidParameterValue(key, err))?;
            if !param.accepts(value) {
                return Err(ScheduleError::ParameterOutOfRange(key, value));
            }
            parsed.push(value);
        }

        let value = match parsed.as_slice() {
            [single] => ParamValue::Single(*single),
            _ if param == RuleParam::Count => return Err(ScheduleError::ScalarExpected(key)),
            _ => ParamValue::List(parsed),
        };
        params.insert(param, value);
    }

    Ok(RuleParams(params))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub uuid: Uuid,
    pub name: String,
    pub description: String,
    pub frequency: Frequency,
    params: RuleParams,
}

impl RecurrenceRule {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        frequency: &str,
        params: Option<&str>,
    ) -> Result<Self, ScheduleError> {
        Self::from_record(Uuid::new_v4(), name, description, frequency, params)
    }

    pub fn from_record(
        uuid: Uuid,
        name: impl Into<String>,
        description: impl Into<String>,
        frequency: &str,
        params: Option<&str>,
    ) -> Result<Self, ScheduleError> {
        let frequency = frequency.parse::<Frequency>()?;
        let params = match params {
            Some(raw) => parse_params(raw)?,
            None => RuleParams::default(),
        };
        Ok(Self {
            uuid,
            name: name.into(),
            description: description.into(),
            frequency,
            params,
        })
    }

    pub fn params(&self) -> &RuleParams {
        &self.params
    }

    /// Latest occurrence of this rule anchored at `start` that falls before
    /// `at` (or exactly at it when `inclusive`).
    pub fn occurrences_before(
        &self,
        start: DateTime<Utc>,
        at: DateTime<Utc>,
        inclusive: bool,
    ) -> Option<DateTime<Utc>> {
        recurrence::occurrences_before(start, self.frequency, &self.params, at, inclusive)
    }

    /// Earliest occurrence after `at` (or exactly at it when `inclusive`).
    pub fn occurrences_after(
        &self,
        start: DateTime<Utc>,
        at: DateTime<Utc>,
        inclusive: bool,
    ) -> Option<DateTime<Utc>> {
        recurrence::occurrences_after(start, self.frequency, &self.params, at, inclusive)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
