/// Context detection for recommendations
///
/// Turns the wall clock and today's completion count into a snapshot of the
/// current moment. Pure: the same instant and count always give the same
/// snapshot.

use chrono::{
    DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};

/// Point-in-time summary of the current moment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub at: DateTime<Local>,
    pub hour: u32,
    pub time_of_day: TimeOfDay,
    pub day_of_week: DayOfWeek,
    pub energy_level: EnergyLevel,
    pub completed_today: u32,
    pub work_pattern: WorkPattern,
}

/// Time of day categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,   // 6am - 12pm
    Afternoon, // 12pm - 6pm
    Evening,   // 6pm - 10pm
    Night,     // 10pm - 6am
}

/// Day of week
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Energy available at a given hour, ordered low → high
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

/// How today is going compared to the hour of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkPattern {
    Productive,
    Normal,
    Low,
}

/// Context detector
pub struct ContextDetector;

impl ContextDetector {
    /// Build the snapshot for `now` given how many items were completed today
    pub fn snapshot(now: DateTime<Local>, completed_today: u32) -> ContextSnapshot {
        let hour = now.hour();

        ContextSnapshot {
            at: now,
            hour,
            time_of_day: Self::time_of_day(hour),
            day_of_week: DayOfWeek::from(now.weekday()),
            energy_level: Self::energy_level(hour),
            completed_today,
            work_pattern: Self::work_pattern(hour, completed_today),
        }
    }

    pub fn time_of_day(hour: u32) -> TimeOfDay {
        match hour {
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            18..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    /// Afternoon and evening share one tier, unlike `time_of_day`
    pub fn energy_level(hour: u32) -> EnergyLevel {
        match hour {
            6..=11 => EnergyLevel::High,
            12..=21 => EnergyLevel::Medium,
            _ => EnergyLevel::Low,
        }
    }

    /// Compare today's completions against roughly one item per four hours
    pub fn work_pattern(hour: u32, completed_today: u32) -> WorkPattern {
        let expected = i64::from((hour / 4).max(1));
        let completed = i64::from(completed_today);

        if completed > expected + 2 {
            WorkPattern::Productive
        } else if completed < expected - 1 {
            WorkPattern::Low
        } else {
            WorkPattern::Normal
        }
    }

    /// UTC bounds `[start, end)` of the calendar day containing `now`, in
    /// `now`'s own time zone
    ///
    /// A day is 23 or 25 hours long when the zone changes offset.
    pub fn day_bounds<Tz: TimeZone>(now: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
        let zone = now.timezone();
        let today = now.date_naive();
        let start = Self::midnight(&zone, today);
        let end = today
            .succ_opt()
            .map(|tomorrow| Self::midnight(&zone, tomorrow))
            .unwrap_or_else(|| start + Duration::days(1));
        (start, end)
    }

    /// First instant of `date` in `zone`
    fn midnight<Tz: TimeZone>(zone: &Tz, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        // Some zones skip midnight itself when clocks go forward
        zone.from_local_datetime(&midnight)
            .earliest()
            .or_else(|| zone.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }
}

impl From<chrono::Weekday> for DayOfWeek {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => DayOfWeek::Monday,
            chrono::Weekday::Tue => DayOfWeek::Tuesday,
            chrono::Weekday::Wed => DayOfWeek::Wednesday,
            chrono::Weekday::Thu => DayOfWeek::Thursday,
            chrono::Weekday::Fri => DayOfWeek::Friday,
            chrono::Weekday::Sat => DayOfWeek::Saturday,
            chrono::Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeOfDay::Morning => write!(f, "morning"),
            TimeOfDay::Afternoon => write!(f, "afternoon"),
            TimeOfDay::Evening => write!(f, "evening"),
            TimeOfDay::Night => write!(f, "night"),
        }
    }
}

impl std::fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnergyLevel::High => write!(f, "high"),
            EnergyLevel::Medium => write!(f, "medium"),
            EnergyLevel::Low => write!(f, "low"),
        }
    }
}

impl std::fmt::Display for WorkPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkPattern::Productive => write!(f, "productive"),
            WorkPattern::Normal => write!(f, "normal"),
            WorkPattern::Low => write!(f, "low"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    #[test]
    fn test_every_hour_has_one_bucket() {
        let mut per_bucket = std::collections::HashMap::new();
        for hour in 0..24 {
            *per_bucket.entry(ContextDetector::time_of_day(hour)).or_insert(0) += 1;
        }
        assert_eq!(per_bucket[&TimeOfDay::Morning], 6);
        assert_eq!(per_bucket[&TimeOfDay::Afternoon], 6);
        assert_eq!(per_bucket[&TimeOfDay::Evening], 4);
        assert_eq!(per_bucket[&TimeOfDay::Night], 8);
        assert_eq!(per_bucket.values().sum::<i32>(), 24);
    }

    #[test]
    fn test_energy_buckets() {
        assert_eq!(ContextDetector::energy_level(5), EnergyLevel::Low);
        assert_eq!(ContextDetector::energy_level(6), EnergyLevel::High);
        assert_eq!(ContextDetector::energy_level(11), EnergyLevel::High);
        assert_eq!(ContextDetector::energy_level(12), EnergyLevel::Medium);
        assert_eq!(ContextDetector::energy_level(21), EnergyLevel::Medium);
        assert_eq!(ContextDetector::energy_level(22), EnergyLevel::Low);
    }

    #[test]
    fn test_work_pattern() {
        // hour 10: expected = 2
        assert_eq!(ContextDetector::work_pattern(10, 5), WorkPattern::Productive);
        assert_eq!(ContextDetector::work_pattern(10, 4), WorkPattern::Normal);
        assert_eq!(ContextDetector::work_pattern(10, 1), WorkPattern::Normal);
        assert_eq!(ContextDetector::work_pattern(10, 0), WorkPattern::Low);
        // before 8am expected floors at 1, so zero completions is still normal
        assert_eq!(ContextDetector::work_pattern(2, 0), WorkPattern::Normal);
        // hour 20: expected = 5
        assert_eq!(ContextDetector::work_pattern(20, 3), WorkPattern::Low);
    }

    #[test]
    fn test_snapshot() {
        // 2026-03-09 is a Monday
        let now = Local.with_ymd_and_hms(2026, 3, 9, 10, 15, 0).unwrap();
        let ctx = ContextDetector::snapshot(now, 3);

        assert_eq!(ctx.hour, 10);
        assert_eq!(ctx.time_of_day, TimeOfDay::Morning);
        assert_eq!(ctx.day_of_week, DayOfWeek::Monday);
        assert_eq!(ctx.energy_level, EnergyLevel::High);
        assert_eq!(ctx.work_pattern, WorkPattern::Normal);
    }

    #[test]
    fn test_day_bounds() {
        let now = Local.with_ymd_and_hms(2026, 3, 11, 15, 45, 30).unwrap();
        let (start, end) = ContextDetector::day_bounds(&now);

        let local_start = start.with_timezone(&Local);
        assert_eq!(local_start.date_naive(), now.date_naive());
        assert_eq!(local_start.hour(), 0);
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn test_day_bounds_on_spring_forward() {
        // US clocks jump from 02:00 to 03:00 on 2026-03-08
        let now = New_York.with_ymd_and_hms(2026, 3, 8, 10, 0, 0).unwrap();
        let (start, end) = ContextDetector::day_bounds(&now);

        let local_start = start.with_timezone(&New_York);
        assert_eq!(local_start.date_naive(), now.date_naive());
        assert_eq!(local_start.hour(), 0);
        assert_eq!(end.with_timezone(&New_York).date_naive(), now.date_naive().succ_opt().unwrap());
        assert_eq!(end - start, Duration::hours(23));

        // 23:30 the evening before belongs to the previous day
        let late_yesterday = New_York.with_ymd_and_hms(2026, 3, 7, 23, 30, 0).unwrap();
        assert!(late_yesterday.with_timezone(&Utc) < start);
    }

    #[test]
    fn test_day_bounds_on_fall_back() {
        // US clocks repeat 01:00 to 02:00 on 2026-11-01
        let now = New_York.with_ymd_and_hms(2026, 11, 1, 18, 0, 0).unwrap();
        let (start, end) = ContextDetector::day_bounds(&now);

        assert_eq!(start.with_timezone(&New_York).hour(), 0);
        assert_eq!(end - start, Duration::hours(25));
    }
}
