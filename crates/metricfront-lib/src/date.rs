//! Resolution of `from`/`until` date expressions to unix seconds.
//!
//! Supported forms, in the order they are tried:
//!
//! - empty string: the caller-supplied default
//! - `-1h`, `+30min`, `-1d12h`: offsets relative to now
//! - `now`, `midnight`, `noon`, `teatime`
//! - plain integers (other than 8 digits): unix seconds
//! - `[time][_| ]date` where date is `YYYYMMDD`, `MM/DD/YY`, `today`,
//!   `yesterday` or `tomorrow` and time is `HH:MM`, `h:MMam`, `midnight`,
//!   `noon` or `teatime`
//!
//! Absolute dates are interpreted in the requested timezone, or the
//! configured default when none (or an unknown one) is given. Anything else
//! falls back to the default value.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::debug;

/// Turns date expressions into unix seconds.
pub trait DateResolver: Send + Sync {
    /// Resolve `expr` in timezone `tz`, returning `default_epoch` when `expr`
    /// is empty or cannot be parsed.
    fn resolve(&self, expr: &str, tz: &str, default_epoch: i64) -> i64;
}

/// Built-in date resolver with a configurable default timezone.
#[derive(Debug, Clone, Copy)]
pub struct DefaultDateResolver {
    default_timezone: FixedOffset,
}

impl Default for DefaultDateResolver {
    fn default() -> Self {
        Self::new(utc_offset())
    }
}

impl DateResolver for DefaultDateResolver {
    fn resolve(&self, expr: &str, tz: &str, default_epoch: i64) -> i64 {
        self.resolve_at(expr, tz, default_epoch, Utc::now())
    }
}

impl DefaultDateResolver {
    pub fn new(default_timezone: FixedOffset) -> Self {
        Self { default_timezone }
    }

    /// Same as [`DateResolver::resolve`] with an explicit notion of "now".
    pub fn resolve_at(&self, expr: &str, tz: &str, default_epoch: i64, now: DateTime<Utc>) -> i64 {
        let expr = expr.trim();
        if expr.is_empty() {
            return default_epoch;
        }

        if let Some(rest) = expr.strip_prefix('-') {
            return match parse_interval(rest).and_then(|secs| now.timestamp().checked_sub(secs)) {
                Some(epoch) => epoch,
                None => self.unparsed(expr, default_epoch),
            };
        }
        if let Some(rest) = expr.strip_prefix('+') {
            return match parse_interval(rest).and_then(|secs| now.timestamp().checked_add(secs)) {
                Some(epoch) => epoch,
                None => self.unparsed(expr, default_epoch),
            };
        }

        if expr == "now" {
            return now.timestamp();
        }

        if expr.len() != 8 {
            if let Ok(epoch) = expr.parse::<i64>() {
                return epoch;
            }
        }

        let tz = self.timezone(tz);
        let normalized = expr.replacen('_', " ", 1);
        let fields: Vec<&str> = normalized.split_whitespace().collect();
        let (time_part, date_part) = match fields.as_slice() {
            [word] if time_of_day_word(word).is_some() => (*word, "today"),
            [date] => ("", *date),
            [time, date] => (*time, *date),
            _ => return self.unparsed(expr, default_epoch),
        };

        let today = now.with_timezone(&tz).date_naive();
        let Some(date) = parse_date(date_part, today) else {
            return self.unparsed(expr, default_epoch);
        };
        let Some(time) = parse_time(time_part) else {
            return self.unparsed(expr, default_epoch);
        };

        tz.from_local_datetime(&date.and_time(time))
            .single()
            .map(|t| t.timestamp())
            .unwrap_or(default_epoch)
    }

    fn timezone(&self, tz: &str) -> FixedOffset {
        if tz.is_empty() {
            return self.default_timezone;
        }
        parse_timezone(tz).unwrap_or_else(|| {
            debug!(tz = %tz, "unknown timezone, using default");
            self.default_timezone
        })
    }

    fn unparsed(&self, expr: &str, default_epoch: i64) -> i64 {
        debug!(expr = %expr, "unparseable date expression, using default");
        default_epoch
    }
}

fn utc_offset() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap_or_else(|| unreachable!("zero offset is always valid"))
}

/// Parse `UTC`/`GMT`/`Z` or a fixed offset such as `+02:00`, `-0530`, `+7`.
pub fn parse_timezone(tz: &str) -> Option<FixedOffset> {
    let tz = tz.trim();
    if matches!(tz.to_ascii_uppercase().as_str(), "UTC" | "GMT" | "Z" | "ETC/UTC") {
        return Some(utc_offset());
    }

    let (sign, rest) = match tz.as_bytes().first()? {
        b'+' => (1, &tz[1..]),
        b'-' => (-1, &tz[1..]),
        _ => return None,
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        3 => (digits[..1].parse::<i32>().ok()?, digits[1..].parse::<i32>().ok()?),
        _ => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parse an interval such as `1h30min` into seconds.
pub fn parse_interval(s: &str) -> Option<i64> {
    let mut total: i64 = 0;
    let mut rest = s.trim();
    if rest.is_empty() {
        return None;
    }

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return None;
        }
        let amount: i64 = rest[..digits_end].parse().ok()?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = unit_seconds(&rest[..unit_end])?;
        rest = &rest[unit_end..];

        total = total.checked_add(amount.checked_mul(unit)?)?;
    }

    Some(total)
}

fn unit_seconds(unit: &str) -> Option<i64> {
    let secs = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hour" | "hours" => 3600,
        "d" | "day" | "days" => 86_400,
        "w" | "week" | "weeks" => 7 * 86_400,
        "mon" | "month" | "months" => 30 * 86_400,
        "y" | "year" | "years" => 365 * 86_400,
        _ => return None,
    };
    Some(secs)
}

fn time_of_day_word(word: &str) -> Option<NaiveTime> {
    match word {
        "midnight" => NaiveTime::from_hms_opt(0, 0, 0),
        "noon" => NaiveTime::from_hms_opt(12, 0, 0),
        "teatime" => NaiveTime::from_hms_opt(16, 0, 0),
        _ => None,
    }
}

fn parse_date(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    match s {
        "today" => Some(today),
        "yesterday" => today.checked_sub_signed(Duration::days(1)),
        "tomorrow" => today.checked_add_signed(Duration::days(1)),
        _ => NaiveDate::parse_from_str(s, "%Y%m%d")
            .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%y"))
            .ok(),
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    if s.is_empty() {
        return NaiveTime::from_hms_opt(0, 0, 0);
    }
    if let Some(time) = time_of_day_word(s) {
        return Some(time);
    }
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%I:%M%p"))
        .ok()
}
