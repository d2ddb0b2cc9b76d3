use chrono::{DateTime, SubsecRound, TimeDelta, Timelike, Utc};

/// Truncates to minute resolution, the granularity schedules are kept at.
pub fn normalize_time(time: DateTime<Utc>) -> DateTime<Utc> {
    let time = time.trunc_subsecs(0);
    time - TimeDelta::seconds(i64::from(time.second()))
}
