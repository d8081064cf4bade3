//! Status vocabulary
//!
//! Display metadata for each route status. The on-time entry changes
//! meaning near the end of the school day: from five minutes before the
//! configured end time onwards, a bus that is still "on time" for the
//! student is really overdue. Weekends always keep the default wording.
//! The vocabulary is computed once per session.

use crate::link::proto::Status;
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    pub name: String,
    /// Shown in a status column that holds no route.
    pub empty: String,
    /// Shown to a user whose own route has this status.
    pub personal: String,
    pub icon: String,
    pub color: String,
}

impl StatusInfo {
    fn new(name: &str, empty: &str, personal: &str, icon: &str, color: &str) -> StatusInfo {
        StatusInfo {
            name: name.to_string(),
            empty: empty.to_string(),
            personal: personal.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
        }
    }
}

/// Configured end of the school day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EndOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl Default for EndOfDay {
    fn default() -> EndOfDay {
        EndOfDay {
            hour: 15,
            minute: 50,
        }
    }
}

impl EndOfDay {
    pub fn time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
    }

    /// Five minutes before the end of the day. Wraps around midnight.
    pub fn overdue_threshold(&self) -> Option<NaiveTime> {
        self.time()
            .map(|t| t.overflowing_sub_signed(Duration::minutes(5)).0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    arrived: StatusInfo,
    on_time: StatusInfo,
    delayed: StatusInfo,
}

impl Default for Vocabulary {
    fn default() -> Vocabulary {
        Vocabulary::standard()
    }
}

impl Vocabulary {
    /// Wording used when no end-of-day adjustment applies.
    pub fn standard() -> Vocabulary {
        Vocabulary {
            arrived: StatusInfo::new(
                "Arrived",
                "No buses have arrived yet.",
                "Your bus is here!",
                "check-square",
                "green",
            ),
            on_time: StatusInfo::new(
                "On Time",
                "There are no buses on their way.",
                "Your bus is on its way.",
                "clock-o",
                "blue",
            ),
            delayed: StatusInfo::new(
                "Delayed",
                "There are no delayed buses.",
                "Your bus is delayed.",
                "exclamation-triangle",
                "red",
            ),
        }
    }

    /// On-time wording once the end of the day is close.
    pub fn overdue_on_time() -> StatusInfo {
        StatusInfo::new(
            "On Time",
            "There are no buses on their way.",
            "Your bus has not arrived yet.",
            "question-circle",
            "orange",
        )
    }

    /// Vocabulary for a session starting at `now`.
    pub fn for_session(end: &EndOfDay, now: NaiveDateTime) -> Vocabulary {
        let mut vocab = Vocabulary::standard();
        if let Some(threshold) = end.overdue_threshold() {
            if now.time() >= threshold {
                vocab.on_time = Vocabulary::overdue_on_time();
            }
        }
        // Weekend check comes last and wins.
        match now.weekday() {
            Weekday::Sat | Weekday::Sun => {
                vocab.on_time = Vocabulary::standard().on_time;
            }
            _ => {}
        }
        vocab
    }

    pub fn get(&self, status: Status) -> &StatusInfo {
        match status {
            Status::Arrived => &self.arrived,
            Status::OnTime => &self.on_time,
            Status::Delayed => &self.delayed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    const END: EndOfDay = EndOfDay {
        hour: 15,
        minute: 5,
    };

    #[test]
    fn weekday_before_threshold_is_default() {
        // 2024-03-13 is a Wednesday
        let vocab = Vocabulary::for_session(&END, at(2024, 3, 13, 14, 0));
        assert_eq!(vocab.get(Status::OnTime), &Vocabulary::standard().on_time);
    }

    #[test]
    fn weekday_after_threshold_is_overdue() {
        let vocab = Vocabulary::for_session(&END, at(2024, 3, 13, 15, 1));
        let on_time = vocab.get(Status::OnTime);
        assert_eq!(on_time, &Vocabulary::overdue_on_time());
        assert_eq!(on_time.personal, "Your bus has not arrived yet.");
        assert_eq!(on_time.color, "orange");
        // exactly at the threshold counts
        let vocab = Vocabulary::for_session(&END, at(2024, 3, 13, 15, 0));
        assert_eq!(vocab.get(Status::OnTime), &Vocabulary::overdue_on_time());
    }

    #[test]
    fn weekend_keeps_default() {
        // 2024-03-16 is a Saturday, 2024-03-17 a Sunday
        for day in [16, 17] {
            let vocab = Vocabulary::for_session(&END, at(2024, 3, day, 15, 1));
            assert_eq!(vocab.get(Status::OnTime), &Vocabulary::standard().on_time);
        }
    }

    #[test]
    fn other_statuses_never_change() {
        let vocab = Vocabulary::for_session(&END, at(2024, 3, 13, 15, 1));
        assert_eq!(vocab.get(Status::Arrived).name, "Arrived");
        assert_eq!(vocab.get(Status::Delayed).personal, "Your bus is delayed.");
    }

    #[test]
    fn threshold_wraps_midnight() {
        let end = EndOfDay { hour: 0, minute: 2 };
        assert_eq!(
            end.overdue_threshold(),
            NaiveTime::from_hms_opt(23, 57, 0)
        );
        assert_eq!(EndOfDay { hour: 24, minute: 0 }.time(), None);
    }
}
