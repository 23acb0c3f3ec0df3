//! Instant-with-zone value backing `Value::Time`.
//!
//! The instant is stored in UTC; the zone only affects calendar views
//! (year/month/day accessors, formatting, day arithmetic). The zone is
//! either the process-local zone or a named IANA zone.

use std::fmt;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::{
    DateTime, Datelike, Days, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// The embedding process's local time zone.
    Local,
    Named(Tz),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZonedTime {
    instant: DateTime<Utc>,
    zone: Zone,
}

impl ZonedTime {
    pub fn new(instant: DateTime<Utc>, zone: Zone) -> Self {
        Self { instant, zone }
    }

    pub fn now() -> Self {
        Self {
            instant: Utc::now(),
            zone: Zone::Local,
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Calendar/clock fields as seen in this value's zone.
    fn naive_in_zone(&self) -> NaiveDateTime {
        match self.zone {
            Zone::Local => self.instant.with_timezone(&Local).naive_local(),
            Zone::Named(tz) => self.instant.with_timezone(&tz).naive_local(),
        }
    }

    fn fixed_in_zone(&self) -> DateTime<FixedOffset> {
        match self.zone {
            Zone::Local => self.instant.with_timezone(&Local).fixed_offset(),
            Zone::Named(tz) => self.instant.with_timezone(&tz).fixed_offset(),
        }
    }

    /// Interpret naive wall-clock values in `zone`. Ambiguous local times
    /// resolve to the earlier instant; times inside a DST gap are pushed
    /// forward an hour.
    fn from_naive(naive: NaiveDateTime, zone: Zone) -> Self {
        fn resolve<T: TimeZone>(tz: &T, naive: NaiveDateTime) -> DateTime<Utc> {
            if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
                return dt.with_timezone(&Utc);
            }
            let shifted = naive + Duration::hours(1);
            match tz.from_local_datetime(&shifted).earliest() {
                Some(dt) => dt.with_timezone(&Utc),
                None => Utc.from_utc_datetime(&naive),
            }
        }

        let instant = match zone {
            Zone::Local => resolve(&Local, naive),
            Zone::Named(tz) => resolve(&tz, naive),
        };
        Self { instant, zone }
    }

    /// Midnight-normalized calendar date in `zone`. Out-of-range months and
    /// days roll over (month 13 becomes January of the next year, day 0 the
    /// last day of the previous month).
    pub fn from_ymd(year: i64, month: i64, day: i64, zone: Zone) -> Self {
        let naive = normalized_date(year, month, day).and_time(NaiveTime::MIN);
        Self::from_naive(naive, zone)
    }

    /// Add years/months/days to the calendar date, normalizing overflow the
    /// same way as [`ZonedTime::from_ymd`]. The time of day is preserved.
    pub fn add_date(&self, years: i64, months: i64, days: i64) -> Self {
        let naive = self.naive_in_zone();
        let date = normalized_date(
            i64::from(naive.year()) + years,
            i64::from(naive.month()) + months,
            i64::from(naive.day()) + days,
        );
        Self::from_naive(date.and_time(naive.time()), self.zone)
    }

    /// Start of day in this value's zone.
    pub fn start_of_day(&self) -> Self {
        let naive = self.naive_in_zone();
        Self::from_naive(naive.date().and_time(NaiveTime::MIN), self.zone)
    }

    pub fn year(&self) -> i64 {
        i64::from(self.naive_in_zone().year())
    }

    pub fn month(&self) -> i64 {
        i64::from(self.naive_in_zone().month())
    }

    pub fn day(&self) -> i64 {
        i64::from(self.naive_in_zone().day())
    }

    pub fn hour(&self) -> i64 {
        i64::from(self.naive_in_zone().hour())
    }

    pub fn minute(&self) -> i64 {
        i64::from(self.naive_in_zone().minute())
    }

    pub fn second(&self) -> i64 {
        i64::from(self.naive_in_zone().second())
    }

    /// Unix epoch milliseconds, independent of the zone.
    pub fn timestamp_millis(&self) -> i64 {
        self.instant.timestamp_millis()
    }

    /// Day of week with Sunday = 0.
    pub fn weekday_from_sunday(&self) -> i64 {
        i64::from(self.naive_in_zone().weekday().num_days_from_sunday())
    }

    /// Render with a chrono `strftime` layout. Unknown specifiers are an
    /// error rather than a panic.
    pub fn format(&self, layout: &str) -> Result<String, String> {
        let items: Vec<Item<'_>> = StrftimeItems::new(layout).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(format!("invalid time layout '{layout}'"));
        }
        Ok(self
            .fixed_in_zone()
            .format_with_items(items.into_iter())
            .to_string())
    }

    /// Same instant viewed in a named IANA zone.
    pub fn with_timezone(&self, name: &str) -> Result<Self, String> {
        let tz = Tz::from_str(name).map_err(|_| format!("unknown timezone '{name}'"))?;
        Ok(Self {
            instant: self.instant,
            zone: Zone::Named(tz),
        })
    }
}

/// Roll out-of-range month/day values forward or backward into a valid date.
fn normalized_date(year: i64, month: i64, day: i64) -> NaiveDate {
    let total_months = year * 12 + (month - 1);
    let normalized_year = total_months.div_euclid(12);
    let normalized_month = total_months.rem_euclid(12) + 1;

    let year = normalized_year.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    let first = NaiveDate::from_ymd_opt(year, normalized_month as u32, 1)
        .unwrap_or(NaiveDate::MIN);
    match day - 1 {
        offset if offset >= 0 => first
            .checked_add_days(Days::new(offset as u64))
            .unwrap_or(NaiveDate::MAX),
        offset => first
            .checked_sub_days(Days::new(offset.unsigned_abs()))
            .unwrap_or(NaiveDate::MIN),
    }
}

impl fmt::Display for ZonedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fixed_in_zone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> ZonedTime {
        let naive = NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap();
        ZonedTime::new(Utc.from_utc_datetime(&naive), Zone::Named(Tz::UTC))
    }

    #[test]
    fn ymd_normalizes_month_overflow() {
        let t = ZonedTime::from_ymd(2023, 13, 1, Zone::Named(Tz::UTC));
        assert_eq!((t.year(), t.month(), t.day()), (2024, 1, 1));
    }

    #[test]
    fn ymd_normalizes_day_overflow() {
        let t = ZonedTime::from_ymd(2023, 1, 32, Zone::Named(Tz::UTC));
        assert_eq!((t.year(), t.month(), t.day()), (2023, 2, 1));

        let t = ZonedTime::from_ymd(2023, 3, 0, Zone::Named(Tz::UTC));
        assert_eq!((t.year(), t.month(), t.day()), (2023, 2, 28));
    }

    #[test]
    fn add_date_rolls_like_calendar_arithmetic() {
        let t = utc(2023, 10, 31, 12, 0, 0).add_date(0, 1, 0);
        // October 31 + 1 month normalizes through November 31 to December 1.
        assert_eq!((t.year(), t.month(), t.day()), (2023, 12, 1));
        assert_eq!(t.hour(), 12);
    }

    #[test]
    fn weekday_counts_from_sunday() {
        // 2023-01-01 was a Sunday.
        assert_eq!(utc(2023, 1, 1, 0, 0, 0).weekday_from_sunday(), 0);
        assert_eq!(utc(2023, 1, 2, 0, 0, 0).weekday_from_sunday(), 1);
    }

    #[test]
    fn format_rejects_bad_layout() {
        let t = utc(2023, 5, 6, 7, 8, 9);
        assert_eq!(t.format("%Y-%m-%d").unwrap(), "2023-05-06");
        assert!(t.format("%Q").is_err());
    }

    #[test]
    fn timezone_switch_keeps_the_instant() {
        let t = utc(2023, 6, 1, 0, 30, 0);
        let shanghai = t.with_timezone("Asia/Shanghai").unwrap();
        assert_eq!(shanghai.hour(), 8);
        assert_eq!(shanghai.timestamp_millis(), t.timestamp_millis());
        assert!(t.with_timezone("Not/AZone").is_err());
    }

    #[test]
    fn start_of_day_zeroes_the_clock() {
        let t = utc(2023, 6, 1, 15, 30, 59).start_of_day();
        assert_eq!((t.hour(), t.minute(), t.second()), (0, 0, 0));
        assert_eq!(t.day(), 1);
    }
}
