//! Clock times and journey durations.
//!
//! Timetable documents carry departure and arrival as "HH:MM" strings in a
//! single local zone, with no date attached. Overnight services are detected
//! by their arrival being earlier in the day than their departure.

use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Serialize, Serializer};

/// Minutes in one day.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Error returned when parsing an invalid time or duration string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A wall-clock time of day, stored as minutes since midnight in `[0, 1439]`.
///
/// # Examples
///
/// ```
/// use bus_server::domain::ClockTime;
///
/// let t = ClockTime::parse_hhmm("14:30").unwrap();
/// assert_eq!(t.minutes(), 14 * 60 + 30);
/// assert_eq!(t.to_string(), "14:30");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    /// Midnight.
    pub const MIDNIGHT: ClockTime = ClockTime(0);

    /// Build from minutes since midnight. Returns `None` past 23:59.
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    /// Build from hour and minute components.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self((hour * 60 + minute) as u16))
    }

    /// Truncate a `NaiveTime` to the minute.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }

    /// The current local time, truncated to the minute.
    pub fn now_local() -> Self {
        Self::from_naive_time(chrono::Local::now().time())
    }

    /// Parse a time from "HH:MM" format.
    ///
    /// A single-digit hour ("9:05") is accepted since some documents are
    /// hand-entered; minutes must always be two digits.
    ///
    /// # Examples
    ///
    /// ```
    /// use bus_server::domain::ClockTime;
    ///
    /// assert!(ClockTime::parse_hhmm("00:00").is_ok());
    /// assert!(ClockTime::parse_hhmm("23:59").is_ok());
    /// assert!(ClockTime::parse_hhmm("9:05").is_ok());
    ///
    /// assert!(ClockTime::parse_hhmm("1430").is_err());
    /// assert!(ClockTime::parse_hhmm("14:3").is_err());
    /// assert!(ClockTime::parse_hhmm("25:00").is_err());
    /// ```
    pub fn parse_hhmm(s: &str) -> Result<Self, TimeError> {
        let s = s.trim();
        let (hours, minutes) = s
            .split_once(':')
            .ok_or_else(|| TimeError::new("expected HH:MM format"))?;

        if hours.is_empty() || hours.len() > 2 {
            return Err(TimeError::new("expected one or two hour digits"));
        }
        if minutes.len() != 2 {
            return Err(TimeError::new("expected two minute digits"));
        }

        let hour = parse_digits(hours).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }

        let minute =
            parse_digits(minutes).ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        Ok(Self((hour * 60 + minute) as u16))
    }

    /// Minutes since midnight.
    pub fn minutes(&self) -> u16 {
        self.0
    }

    /// Returns the hour (0-23).
    pub fn hour(&self) -> u16 {
        self.0 / 60
    }

    /// Returns the minute (0-59).
    pub fn minute(&self) -> u16 {
        self.0 % 60
    }

    /// Signed minutes from `other` to `self`, without wrapping at midnight.
    pub fn minutes_since(&self, other: ClockTime) -> i32 {
        self.0 as i32 - other.0 as i32
    }
}

impl fmt::Debug for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClockTime({:02}:{:02})", self.hour(), self.minute())
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse one or two ASCII digits.
fn parse_digits(s: &str) -> Option<u32> {
    s.chars().try_fold(0u32, |acc, c| Some(acc * 10 + c.to_digit(10)?))
}

/// Whether a journey from `departure` to `arrival` crosses midnight.
pub fn is_overnight(departure: ClockTime, arrival: ClockTime) -> bool {
    arrival < departure
}

/// Whether `now` falls inside the journey window `[departure, arrival]`.
///
/// For overnight journeys the window wraps: it covers everything from
/// departure to midnight and from midnight to arrival.
///
/// ```
/// use bus_server::domain::{ClockTime, within_journey};
///
/// let dep = ClockTime::parse_hhmm("23:30").unwrap();
/// let arr = ClockTime::parse_hhmm("05:00").unwrap();
/// assert!(within_journey(dep, arr, ClockTime::parse_hhmm("00:15").unwrap()));
/// assert!(!within_journey(dep, arr, ClockTime::parse_hhmm("12:00").unwrap()));
/// ```
pub fn within_journey(departure: ClockTime, arrival: ClockTime, now: ClockTime) -> bool {
    if is_overnight(departure, arrival) {
        now >= departure || now <= arrival
    } else {
        departure <= now && now <= arrival
    }
}

/// A journey duration in whole minutes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TripDuration(u32);

impl TripDuration {
    /// Build from a number of minutes.
    pub fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    /// Duration between a departure and an arrival, wrapping past midnight.
    ///
    /// ```
    /// use bus_server::domain::{ClockTime, TripDuration};
    ///
    /// let dep = ClockTime::parse_hhmm("22:15").unwrap();
    /// let arr = ClockTime::parse_hhmm("06:45").unwrap();
    /// assert_eq!(TripDuration::between(dep, arr).to_string(), "8h 30m");
    /// ```
    pub fn between(departure: ClockTime, arrival: ClockTime) -> Self {
        let diff = arrival.minutes_since(departure).rem_euclid(MINUTES_PER_DAY as i32);
        Self(diff as u32)
    }

    /// Parse the "Xh Ym" form used by timetable documents.
    ///
    /// Either component may be missing ("7h", "45m"); whitespace is optional.
    ///
    /// ```
    /// use bus_server::domain::TripDuration;
    ///
    /// assert_eq!(TripDuration::parse("8h 30m").unwrap().total_minutes(), 510);
    /// assert_eq!(TripDuration::parse("12h").unwrap().hours(), 12);
    /// assert!(TripDuration::parse("soon").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let mut hours = None;
        let mut minutes = None;
        let mut digits = String::new();

        for c in s.trim().chars() {
            match c {
                '0'..='9' => digits.push(c),
                'h' | 'H' if hours.is_none() && !digits.is_empty() => {
                    hours = digits.parse::<u32>().ok();
                    digits.clear();
                }
                'm' | 'M' if minutes.is_none() && !digits.is_empty() => {
                    minutes = digits.parse::<u32>().ok();
                    digits.clear();
                }
                c if c.is_whitespace() && digits.is_empty() => {}
                _ => return Err(TimeError::new("expected \"Xh Ym\" duration")),
            }
        }

        if !digits.is_empty() || (hours.is_none() && minutes.is_none()) {
            return Err(TimeError::new("expected \"Xh Ym\" duration"));
        }

        let total = hours
            .unwrap_or(0)
            .checked_mul(60)
            .and_then(|h| h.checked_add(minutes.unwrap_or(0)))
            .ok_or_else(|| TimeError::new("duration overflow"))?;
        Ok(Self(total))
    }

    /// Whole hours, discarding the minute component.
    pub fn hours(&self) -> u32 {
        self.0 / 60
    }

    /// Total minutes.
    pub fn total_minutes(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TripDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TripDuration({self})")
    }
}

impl fmt::Display for TripDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m", self.0 / 60, self.0 % 60)
    }
}

/// Serialized in the same "Xh Ym" form documents use.
impl Serialize for TripDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        fn valid_time()(hour in 0u32..24, minute in 0u32..60) -> String {
            format!("{:02}:{:02}", hour, minute)
        }
    }

    proptest! {
        /// Any valid HH:MM string parses successfully
        #[test]
        fn valid_hhmm_parses(time_str in valid_time()) {
            prop_assert!(ClockTime::parse_hhmm(&time_str).is_ok());
        }

        /// Parse then display roundtrips
        #[test]
        fn parse_display_roundtrip(time_str in valid_time()) {
            let parsed = ClockTime::parse_hhmm(&time_str).unwrap();
            prop_assert_eq!(parsed.to_string(), time_str);
        }

        /// Ordering on zero-padded strings agrees with ordering on minutes
        #[test]
        fn lexicographic_order_matches(a in valid_time(), b in valid_time()) {
            let ta = ClockTime::parse_hhmm(&a).unwrap();
            let tb = ClockTime::parse_hhmm(&b).unwrap();
            prop_assert_eq!(a.cmp(&b), ta.cmp(&tb));
        }

        /// Parsed minutes always fall inside one day
        #[test]
        fn minutes_in_range(time_str in valid_time()) {
            let parsed = ClockTime::parse_hhmm(&time_str).unwrap();
            prop_assert!(parsed.minutes() < MINUTES_PER_DAY);
        }

        /// Invalid hour is rejected
        #[test]
        fn invalid_hour_rejected(hour in 24u32..100, minute in 0u32..60) {
            let s = format!("{:02}:{:02}", hour, minute);
            prop_assert!(ClockTime::parse_hhmm(&s).is_err());
        }

        /// Invalid minute is rejected
        #[test]
        fn invalid_minute_rejected(hour in 0u32..24, minute in 60u32..100) {
            let s = format!("{:02}:{:02}", hour, minute);
            prop_assert!(ClockTime::parse_hhmm(&s).is_err());
        }

        /// The departure and arrival minutes are always inside their own window
        #[test]
        fn endpoints_within_window(dep in 0u16..1440, arr in 0u16..1440) {
            let dep = ClockTime::from_minutes(dep).unwrap();
            let arr = ClockTime::from_minutes(arr).unwrap();
            prop_assert!(within_journey(dep, arr, dep));
            prop_assert!(within_journey(dep, arr, arr));
        }

        /// Duration display parses back to the same duration
        #[test]
        fn duration_display_roundtrip(minutes in 0u32..10_000) {
            let d = TripDuration::from_minutes(minutes);
            prop_assert_eq!(TripDuration::parse(&d.to_string()).unwrap(), d);
        }

        /// Duration between never reaches a full day
        #[test]
        fn duration_between_under_a_day(dep in 0u16..1440, arr in 0u16..1440) {
            let dep = ClockTime::from_minutes(dep).unwrap();
            let arr = ClockTime::from_minutes(arr).unwrap();
            prop_assert!(TripDuration::between(dep, arr).total_minutes() < MINUTES_PER_DAY as u32);
        }
    }
}
