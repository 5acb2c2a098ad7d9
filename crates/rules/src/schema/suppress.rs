//! Recurring time-of-day windows during which a rule must not fire.

use chrono::{NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// A recurring local-time range, optionally restricted to one weekday.
///
/// `day` empty or absent means every day. Ranges where `end <= start`
/// wrap past midnight ("22:00"–"06:00" covers the whole night).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SuppressionWindow {
    /// Lowercase English weekday name ("monday"), empty for every day.
    #[serde(default)]
    pub day: String,
    /// Inclusive start, "HH:MM".
    pub start: String,
    /// Exclusive end, "HH:MM".
    pub end: String,
}

impl SuppressionWindow {
    pub fn validate(&self) -> Result<(), String> {
        self.parsed_start()
            .ok_or_else(|| format!("bad suppression start '{}'", self.start))?;
        self.parsed_end()
            .ok_or_else(|| format!("bad suppression end '{}'", self.end))?;
        if !self.day.is_empty() && parse_weekday(&self.day).is_none() {
            return Err(format!("bad suppression day '{}'", self.day));
        }
        Ok(())
    }

    fn parsed_start(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.start, "%H:%M").ok()
    }

    fn parsed_end(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.end, "%H:%M").ok()
    }

    /// Whether local wall-clock time falls inside this window.
    ///
    /// Unparseable windows are treated as inactive: a broken window must
    /// never silence a rule permanently.
    pub fn contains(&self, local: NaiveDateTime) -> bool {
        let (Some(start), Some(end)) = (self.parsed_start(), self.parsed_end()) else {
            return false;
        };
        if !self.day.is_empty() {
            match parse_weekday(&self.day) {
                Some(day) if day == chrono::Datelike::weekday(&local.date()) => {}
                _ => return false,
            }
        }

        let t = local.time();
        if start < end {
            t >= start && t < end
        } else {
            // Overnight wrap.
            t >= start || t < end
        }
    }
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.to_ascii_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// True when any window in the list is active.
pub(crate) fn any_active(windows: &[SuppressionWindow], local: NaiveDateTime) -> bool {
    windows.iter().any(|w| w.contains(local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn local(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        // June 2025: the 2nd is a Monday.
        NaiveDate::from_ymd_opt(2025, 6, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn overnight() -> SuppressionWindow {
        SuppressionWindow {
            day: String::new(),
            start: "22:00".to_string(),
            end: "06:00".to_string(),
        }
    }

    #[test]
    fn overnight_window_blocks_night_allows_day() {
        let w = overnight();
        assert!(w.contains(local(2, 23, 0)));
        assert!(w.contains(local(2, 2, 30)));
        assert!(!w.contains(local(2, 12, 0)));
    }

    #[test]
    fn window_edges() {
        let w = overnight();
        assert!(w.contains(local(2, 22, 0)), "start is inclusive");
        assert!(!w.contains(local(2, 6, 0)), "end is exclusive");
    }

    #[test]
    fn day_restriction() {
        let w = SuppressionWindow {
            day: "monday".to_string(),
            start: "08:00".to_string(),
            end: "17:00".to_string(),
        };
        assert!(w.contains(local(2, 12, 0))); // Monday
        assert!(!w.contains(local(3, 12, 0))); // Tuesday
    }

    #[test]
    fn unparseable_window_is_inert() {
        let w = SuppressionWindow {
            day: String::new(),
            start: "25:99".to_string(),
            end: "06:00".to_string(),
        };
        assert!(!w.contains(local(2, 23, 0)));
        assert!(w.validate().is_err());
    }

    #[test]
    fn short_day_names_accepted() {
        assert_eq!(parse_weekday("WED"), Some(Weekday::Wed));
        assert_eq!(parse_weekday("sunday"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("someday"), None);
    }
}
