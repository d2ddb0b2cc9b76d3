//! Minute-resolution recurrence expansion.
//!
//! A rule is anchored at the schedule time: the first period is the one that
//! contains it, every following period advances by one unit of the rule's
//! frequency, and occurrences earlier than the anchor never count. Within a
//! period, candidate days are filtered by the `by*` day selectors, expanded
//! with the times of day, and finally narrowed with `bysetpos`.

use crate::model::schedule::recurrence_rule::{Frequency, RuleParam, RuleParams};
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

const MAX_YEAR: i32 = 9999;
const SEARCH_HORIZON_YEARS: i32 = 400;

/// Latest occurrence before `at`, or at it when `inclusive`.
pub fn occurrences_before(
    start: DateTime<Utc>,
    frequency: Frequency,
    params: &RuleParams,
    at: DateTime<Utc>,
    inclusive: bool,
) -> Option<DateTime<Utc>> {
    Recurrence::new(start, frequency, params).before(at, inclusive)
}

/// Earliest occurrence after `at`, or at it when `inclusive`.
pub fn occurrences_after(
    start: DateTime<Utc>,
    frequency: Frequency,
    params: &RuleParams,
    at: DateTime<Utc>,
    inclusive: bool,
) -> Option<DateTime<Utc>> {
    Recurrence::new(start, frequency, params).after(at, inclusive)
}

#[derive(Debug, Clone)]
pub struct Recurrence {
    dtstart: NaiveDateTime,
    frequency: Frequency,
    count: Option<usize>,
    bysetpos: Vec<i32>,
    bymonth: Vec<u32>,
    bymonthday: Vec<i32>,
    byyearday: Vec<i32>,
    byweekno: Vec<i32>,
    byweekday: Vec<u32>,
    byeaster: Vec<i64>,
    times: Vec<NaiveTime>,
}

impl Recurrence {
    pub fn new(start: DateTime<Utc>, frequency: Frequency, params: &RuleParams) -> Self {
        let dtstart = start.naive_utc();
        let unsigned = |param: RuleParam| -> Vec<u32> {
            params
                .values(param)
                .iter()
                .filter_map(|value| u32::try_from(*value).ok())
                .collect()
        };
        let signed = |param: RuleParam| -> Vec<i32> { params.values(param).to_vec() };

        let mut bymonth = unsigned(RuleParam::ByMonth);
        let mut bymonthday = signed(RuleParam::ByMonthDay);
        let mut byweekday = unsigned(RuleParam::ByWeekday);
        let byyearday = signed(RuleParam::ByYearDay);
        let byweekno = signed(RuleParam::ByWeekNo);
        let byeaster: Vec<i64> = params
            .values(RuleParam::ByEaster)
            .iter()
            .map(|offset| i64::from(*offset))
            .collect();

        if byweekno.is_empty()
            && byyearday.is_empty()
            && bymonthday.is_empty()
            && byweekday.is_empty()
            && byeaster.is_empty()
        {
            match frequency {
                Frequency::Yearly => {
                    if bymonth.is_empty() {
                        bymonth = vec![dtstart.month()];
                    }
                    bymonthday = vec![dtstart.day() as i32];
                }
                Frequency::Monthly => bymonthday = vec![dtstart.day() as i32],
                Frequency::Weekly => byweekday = vec![dtstart.weekday().num_days_from_monday()],
                Frequency::Daily => {}
            }
        }

        // The schedule's own hour and minute win over any byhour/byminute param.
        let mut seconds = unsigned(RuleParam::BySecond);
        if seconds.is_empty() {
            seconds = vec![dtstart.second()];
        }
        let mut times: Vec<NaiveTime> = seconds
            .iter()
            .filter_map(|second| NaiveTime::from_hms_opt(dtstart.hour(), dtstart.minute(), *second))
            .collect();
        times.sort();
        times.dedup();

        let count = params
            .values(RuleParam::Count)
            .first()
            .and_then(|count| usize::try_from(*count).ok());

        Self {
            dtstart,
            frequency,
            count,
            bysetpos: signed(RuleParam::BySetPos),
            bymonth,
            bymonthday,
            byyearday,
            byweekno,
            byweekday,
            byeaster,
            times,
        }
    }

    pub fn before(&self, at: DateTime<Utc>, inclusive: bool) -> Option<DateTime<Utc>> {
        let at = at.naive_utc();
        let admits = |occurrence: &NaiveDateTime| {
            *occurrence >= self.dtstart && (*occurrence < at || (inclusive && *occurrence == at))
        };

        if self.count.is_some() {
            return self.scan_counted(|occurrence| admits(&occurrence), at);
        }

        // Without a count, walk backwards from the period holding `at`.
        let last_period = self.period_index(at.date())?;
        for index in (0..=last_period).rev() {
            let Some(days) = self.period(index) else {
                continue;
            };
            if let Some(occurrence) = self
                .period_occurrences(&days)
                .into_iter()
                .filter(|occurrence| admits(occurrence))
                .next_back()
            {
                return Some(occurrence.and_utc());
            }
        }
        None
    }

    pub fn after(&self, at: DateTime<Utc>, inclusive: bool) -> Option<DateTime<Utc>> {
        let at = at.naive_utc();
        let horizon = at.year().max(self.dtstart.year()).saturating_add(SEARCH_HORIZON_YEARS);
        let mut remaining = self.count;

        let first_period = match self.count {
            Some(_) => 0,
            None => self.period_index(at.date()).unwrap_or(0),
        };
        for index in first_period.. {
            let days = self.period(index)?;
            if days.first().is_some_and(|first| first.year() > horizon) {
                return None;
            }
            for occurrence in self.period_occurrences(&days) {
                if occurrence < self.dtstart {
                    continue;
                }
                if let Some(left) = remaining.as_mut() {
                    if *left == 0 {
                        return None;
                    }
                    *left -= 1;
                }
                if occurrence > at || (inclusive && occurrence == at) {
                    return Some(occurrence.and_utc());
                }
            }
        }
        None
    }

    // Forward scan honoring `count`; keeps the last admitted occurrence.
    fn scan_counted(
        &self,
        admits: impl Fn(NaiveDateTime) -> bool,
        at: NaiveDateTime,
    ) -> Option<DateTime<Utc>> {
        let mut remaining = self.count.unwrap_or(usize::MAX);
        let mut last = None;
        for index in 0.. {
            let Some(days) = self.period(index) else {
                break;
            };
            if days
                .first()
                .is_some_and(|first| first.and_time(NaiveTime::MIN) > at)
            {
                break;
            }
            for occurrence in self.period_occurrences(&days) {
                if occurrence < self.dtstart {
                    continue;
                }
                if remaining == 0 {
                    return last.map(|occurrence: NaiveDateTime| occurrence.and_utc());
                }
                remaining -= 1;
                if !admits(occurrence) {
                    return last.map(|occurrence: NaiveDateTime| occurrence.and_utc());
                }
                last = Some(occurrence);
            }
        }
        last.map(|occurrence| occurrence.and_utc())
    }

    /// Index of the period containing `date`; `None` before the anchor period.
    fn period_index(&self, date: NaiveDate) -> Option<u32> {
        let start = self.dtstart.date();
        let index = match self.frequency {
            Frequency::Yearly => i64::from(date.year() - start.year()),
            Frequency::Monthly => {
                i64::from(date.year() - start.year()) * 12 + i64::from(date.month())
                    - i64::from(start.month())
            }
            Frequency::Weekly => (week_start(date)? - week_start(start)?).num_days() / 7,
            Frequency::Daily => (date - start).num_days(),
        };
        u32::try_from(index).ok()
    }

    /// Candidate days of the `index`-th period after the anchor.
    fn period(&self, index: u32) -> Option<Vec<NaiveDate>> {
        let start = self.dtstart.date();
        let (first, next) = match self.frequency {
            Frequency::Yearly => {
                let year = start.year().checked_add(i32::try_from(index).ok()?)?;
                (
                    NaiveDate::from_ymd_opt(year, 1, 1)?,
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)?,
                )
            }
            Frequency::Monthly => {
                let first = start.with_day(1)?.checked_add_months(Months::new(index))?;
                (first, first.checked_add_months(Months::new(1))?)
            }
            Frequency::Weekly => {
                let first = week_start(start)?.checked_add_days(Days::new(7 * u64::from(index)))?;
                (first, first.checked_add_days(Days::new(7))?)
            }
            Frequency::Daily => {
                let first = start.checked_add_days(Days::new(u64::from(index)))?;
                (first, first.checked_add_days(Days::new(1))?)
            }
        };
        if first.year() > MAX_YEAR {
            return None;
        }
        Some(first.iter_days().take_while(|day| *day < next).collect())
    }

    fn period_occurrences(&self, days: &[NaiveDate]) -> Vec<NaiveDateTime> {
        let occurrences: Vec<NaiveDateTime> = days
            .iter()
            .filter(|day| self.day_matches(**day))
            .flat_map(|day| self.times.iter().map(move |time| day.and_time(*time)))
            .collect();

        if self.bysetpos.is_empty() {
            return occurrences;
        }

        let len = occurrences.len() as i64;
        let mut selected: Vec<NaiveDateTime> = self
            .bysetpos
            .iter()
            .filter_map(|position| {
                let position = i64::from(*position);
                let index = if position > 0 { position - 1 } else { len + position };
                usize::try_from(index)
                    .ok()
                    .and_then(|index| occurrences.get(index).copied())
            })
            .collect();
        selected.sort();
        selected.dedup();
        selected
    }

    fn day_matches(&self, day: NaiveDate) -> bool {
        if !self.bymonth.is_empty() && !self.bymonth.contains(&day.month()) {
            return false;
        }
        if !self.byweekno.is_empty() {
            let week = day.iso_week();
            let number = week.week() as i32;
            let total = iso_weeks_in_year(week.year());
            if !matches_signed(&self.byweekno, number, total) {
                return false;
            }
        }
        if !self.byweekday.is_empty()
            && !self.byweekday.contains(&day.weekday().num_days_from_monday())
        {
            return false;
        }
        if !self.byeaster.is_empty() {
            let Some(easter) = easter_sunday(day.year()) else {
                return false;
            };
            if !self.byeaster.contains(&(day - easter).num_days()) {
                return false;
            }
        }
        if !self.bymonthday.is_empty()
            && !matches_signed(&self.bymonthday, day.day() as i32, days_in_month(day))
        {
            return false;
        }
        if !self.byyearday.is_empty()
            && !matches_signed(&self.byyearday, day.ordinal() as i32, days_in_year(day.year()))
        {
            return false;
        }
        true
    }
}

// Negative selectors count back from the end: -1 is the last of `total`.
fn matches_signed(selectors: &[i32], value: i32, total: i32) -> bool {
    selectors
        .iter()
        .any(|selector| *selector == value || *selector == value - total - 1)
}

fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
}

fn days_in_month(day: NaiveDate) -> i32 {
    NaiveDate::from_ymd_opt(day.year(), day.month(), 1)
        .and_then(|first| {
            first
                .checked_add_months(Months::new(1))
                .map(|next| (next - first).num_days() as i32)
        })
        .unwrap_or(31)
}

fn days_in_year(year: i32) -> i32 {
    NaiveDate::from_ymd_opt(year, 12, 31)
        .map(|last| last.ordinal() as i32)
        .unwrap_or(365)
}

fn iso_weeks_in_year(year: i32) -> i32 {
    NaiveDate::from_ymd_opt(year, 12, 28)
        .map(|day| day.iso_week().week() as i32)
        .unwrap_or(52)
}

/// Western Easter Sunday (anonymous Gregorian computus).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schedule::recurrence_rule::parse_params;
    use chrono::{TimeDelta, TimeZone};

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
    }

    fn rule(frequency: Frequency, params: &str, start: DateTime<Utc>) -> Recurrence {
        Recurrence::new(start, frequency, &parse_params(params).unwrap())
    }

    #[test]
    fn daily_steps_one_day_at_schedule_time() {
        let start = at(2024, 1, 10, 2, 0);
        let daily = rule(Frequency::Daily, "", start);
        let mut occurrence = daily.after(start, true).unwrap();
        assert_eq!(occurrence, start);
        for _ in 0..400 {
            let next = daily.after(occurrence, false).unwrap();
            assert_eq!(next, occurrence + TimeDelta::days(1));
            occurrence = next;
        }
    }

    #[test]
    fn schedule_time_overrides_byhour_and_byminute() {
        let start = at(2024, 1, 10, 2, 30);
        let daily = rule(Frequency::Daily, "byhour:5;byminute:15", start);
        assert_eq!(daily.after(at(2024, 1, 11, 0, 0), false), Some(at(2024, 1, 11, 2, 30)));
    }

    #[test]
    fn before_respects_inclusive_flag() {
        let start = at(2024, 1, 10, 2, 0);
        let daily = rule(Frequency::Daily, "", start);
        let instant = at(2024, 1, 12, 2, 0);
        assert_eq!(daily.before(instant, true), Some(instant));
        assert_eq!(daily.before(instant, false), Some(at(2024, 1, 11, 2, 0)));
        assert_eq!(daily.before(at(2024, 1, 10, 1, 59), true), None);
    }

    #[test]
    fn after_respects_inclusive_flag() {
        let start = at(2024, 1, 10, 2, 0);
        let daily = rule(Frequency::Daily, "", start);
        let instant = at(2024, 1, 12, 2, 0);
        assert_eq!(daily.after(instant, true), Some(instant));
        assert_eq!(daily.after(instant, false), Some(at(2024, 1, 13, 2, 0)));
        assert_eq!(daily.after(at(2023, 6, 1, 0, 0), false), Some(start));
    }

    #[test]
    fn weekly_defaults_to_anchor_weekday() {
        // 2024-01-10 is a Wednesday.
        let weekly = rule(Frequency::Weekly, "", at(2024, 1, 10, 8, 0));
        assert_eq!(weekly.after(at(2024, 1, 10, 9, 0), false), Some(at(2024, 1, 17, 8, 0)));
        assert_eq!(weekly.before(at(2024, 1, 16, 0, 0), true), Some(at(2024, 1, 10, 8, 0)));
    }

    #[test]
    fn weekly_with_weekdays() {
        let weekdays = rule(Frequency::Weekly, "byweekday:0,4", at(2024, 1, 10, 8, 0));
        // Friday 12th, then Monday 15th.
        assert_eq!(weekdays.after(at(2024, 1, 10, 8, 0), false), Some(at(2024, 1, 12, 8, 0)));
        assert_eq!(weekdays.after(at(2024, 1, 12, 8, 0), false), Some(at(2024, 1, 15, 8, 0)));
    }

    #[test]
    fn monthly_on_the_31st_skips_short_months() {
        let monthly = rule(Frequency::Monthly, "", at(2024, 1, 31, 3, 0));
        assert_eq!(monthly.after(at(2024, 1, 31, 3, 0), false), Some(at(2024, 3, 31, 3, 0)));
        assert_eq!(monthly.before(at(2024, 5, 1, 0, 0), true), Some(at(2024, 3, 31, 3, 0)));
    }

    #[test]
    fn monthly_last_day_from_negative_monthday() {
        let monthly = rule(Frequency::Monthly, "bymonthday:-1", at(2024, 1, 5, 23, 0));
        assert_eq!(monthly.after(at(2024, 1, 31, 23, 0), false), Some(at(2024, 2, 29, 23, 0)));
    }

    #[test]
    fn monthly_last_weekday_with_bysetpos() {
        let monthly = rule(
            Frequency::Monthly,
            "byweekday:0,1,2,3,4;bysetpos:-1",
            at(2024, 1, 1, 18, 0),
        );
        // Last weekday of March 2024 is Friday 29th.
        assert_eq!(monthly.after(at(2024, 3, 1, 0, 0), false), Some(at(2024, 3, 29, 18, 0)));
    }

    #[test]
    fn yearly_defaults_to_anchor_day() {
        let yearly = rule(Frequency::Yearly, "", at(2020, 2, 29, 12, 0));
        assert_eq!(yearly.after(at(2020, 2, 29, 12, 0), false), Some(at(2024, 2, 29, 12, 0)));
    }

    #[test]
    fn yearly_by_year_day_and_week_number() {
        let last_day = rule(Frequency::Yearly, "byyearday:-1", at(2023, 1, 1, 0, 0));
        assert_eq!(last_day.after(at(2024, 1, 1, 0, 0), false), Some(at(2024, 12, 31, 0, 0)));

        // ISO week 1 of 2026 starts Monday 2025-12-29.
        let first_week = rule(Frequency::Yearly, "byweekno:1;byweekday:0", at(2025, 6, 1, 6, 0));
        assert_eq!(first_week.after(at(2025, 6, 1, 6, 0), false), Some(at(2025, 12, 29, 6, 0)));
    }

    #[test]
    fn yearly_easter_offset() {
        assert_eq!(easter_sunday(2024), NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(easter_sunday(2025), NaiveDate::from_ymd_opt(2025, 4, 20));
        let good_friday = rule(Frequency::Yearly, "byeaster:-2", at(2024, 1, 1, 9, 0));
        assert_eq!(good_friday.after(at(2024, 1, 1, 9, 0), false), Some(at(2024, 3, 29, 9, 0)));
        assert_eq!(good_friday.after(at(2024, 3, 29, 9, 0), false), Some(at(2025, 4, 18, 9, 0)));
    }

    #[test]
    fn count_bounds_occurrences() {
        let start = at(2024, 1, 10, 2, 0);
        let daily = rule(Frequency::Daily, "count:3", start);
        assert_eq!(daily.after(at(2024, 1, 11, 2, 0), false), Some(at(2024, 1, 12, 2, 0)));
        assert_eq!(daily.after(at(2024, 1, 12, 2, 0), false), None);
        assert_eq!(daily.before(at(2024, 3, 1, 0, 0), true), Some(at(2024, 1, 12, 2, 0)));
    }

    #[test]
    fn bysecond_expands_times_of_day() {
        let start = at(2024, 1, 10, 2, 0);
        let daily = rule(Frequency::Daily, "bysecond:0,30", start);
        let half = Utc.with_ymd_and_hms(2024, 1, 10, 2, 0, 30).unwrap();
        assert_eq!(daily.after(start, false), Some(half));
    }

    #[test]
    fn impossible_rule_terminates() {
        let never = rule(Frequency::Monthly, "bymonth:2;bymonthday:30", at(2024, 1, 1, 0, 0));
        assert_eq!(never.after(at(2024, 1, 1, 0, 0), false), None);
        assert_eq!(never.before(at(2030, 1, 1, 0, 0), true), None);
    }
}
