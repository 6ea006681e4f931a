//!  Slotscout Facility Client
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Availability Response
//!
//! Side-effect free typed view over the backend's availability document.
//! The raw JSON is what callers receive; the typed view is read from it on
//! demand and never written back.
//!
//! Shape read here:
//!
//! ```json
//! { "body": { "details": { "daily_details": [
//!     { "date": "2024-01-15", "times": [ { "start_time": "09:00:00", "end_time": "10:30:00" } ] }
//! ] } } }
//! ```

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilityResponse {
    raw: Value,
}

/// A booked (or free) interval inside one day, local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBookings {
    /// As sent by the backend, normally `YYYY-MM-DD`.
    pub date: String,
    pub booked: Vec<TimeRange>,
}

impl AvailabilityResponse {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Per-date booked ranges in document order.
    ///
    /// Days without a date and ranges with unreadable times are skipped.
    pub fn daily_bookings(&self) -> Vec<DailyBookings> {
        let Some(days) = self
            .raw
            .pointer("/body/details/daily_details")
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        days.iter()
            .filter_map(|day| {
                let date = day.get("date").and_then(Value::as_str).filter(|d| !d.is_empty())?;
                let booked = day
                    .get("times")
                    .and_then(Value::as_array)
                    .map(|times| times.iter().filter_map(parse_range).collect())
                    .unwrap_or_default();
                Some(DailyBookings {
                    date: date.to_string(),
                    booked,
                })
            })
            .collect()
    }
}

impl DailyBookings {
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }

    /// Complement of the booked ranges inside `[open, close)`.
    ///
    /// Overlapping bookings are merged. A booking whose end is not after its
    /// start runs until `close`.
    pub fn free_ranges(&self, open: NaiveTime, close: NaiveTime) -> Vec<TimeRange> {
        if close <= open {
            return Vec::new();
        }

        let mut booked: Vec<TimeRange> = self
            .booked
            .iter()
            .map(|r| TimeRange {
                start: r.start.max(open),
                end: if r.end <= r.start { close } else { r.end.min(close) },
            })
            .filter(|r| r.start < r.end)
            .collect();
        booked.sort();

        let mut free = Vec::new();
        let mut cursor = open;
        for range in booked {
            if range.start > cursor {
                free.push(TimeRange {
                    start: cursor,
                    end: range.start,
                });
            }
            cursor = cursor.max(range.end);
        }
        if cursor < close {
            free.push(TimeRange { start: cursor, end: close });
        }
        free
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

fn parse_range(slot: &Value) -> Option<TimeRange> {
    let start = parse_time(slot.get("start_time")?.as_str()?)?;
    let end = parse_time(slot.get("end_time")?.as_str()?)?;
    Some(TimeRange { start, end })
}

pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}
