// PSPP - a program for statistical analysis.
// Copyright (C) 2025 Free Software Foundation, Inc.
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <http://www.gnu.org/licenses/>.

//! Proleptic Gregorian calendar arithmetic.
//!
//! Dates are counted in days from 14 Oct 1582, the day before the Gregorian
//! calendar took effect, so that 15 Oct 1582 is day 1.  Date and time values
//! are that count of days multiplied by 86400, plus seconds into the day.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error as ThisError;

use crate::format::Settings;

/// Days in 400, 100, 4, and 1 Gregorian years.
const DAYS_PER_400_YEARS: i64 = 146097;
const DAYS_PER_100_YEARS: i64 = 36524;
const DAYS_PER_4_YEARS: i64 = 1461;
const DAYS_PER_YEAR: i64 = 365;

/// Day number of 14 Oct 1582 counting 1 Jan of year 1 as day 1, minus one.
const EPOCH_RATA_DIE: i64 = 577735;

/// Seconds in a day.
pub const SECONDS_PER_DAY: f64 = 60.0 * 60.0 * 24.0;

#[derive(Copy, Clone, Debug, ThisError, PartialEq, Eq)]
pub enum DateError {
    /// Date is too early.
    #[error("Date {y:04}-{m:02}-{d:02} is before the earliest supported date 1582-10-15.")]
    InvalidDate { y: i32, m: i32, d: i32 },

    /// Invalid month.
    #[error("Month {0} is not in the acceptable range of 0 to 13, inclusive.")]
    InvalidMonth(i32),

    /// Invalid day.
    #[error("Day {0} is not in the acceptable range of 0 to 31, inclusive.")]
    InvalidDay(i32),
}

/// A calendar date broken into its components.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Gregorian {
    pub year: i32,

    /// 1 through 12.
    pub month: i32,

    /// 1 through 31.
    pub day: i32,

    /// Day of the year, where January 1 is day 1.
    pub yday: i32,
}

/// Returns the name for a month as a 3-character all-caps string.
pub fn short_month_name(month: u32) -> Option<&'static str> {
    month_name(month).map(|name| &name[..3])
}

/// Returns the name for a month as an all-caps string.
pub fn month_name(month: u32) -> Option<&'static str> {
    static NAMES: [&str; 12] = [
        "JANUARY",
        "FEBRUARY",
        "MARCH",
        "APRIL",
        "MAY",
        "JUNE",
        "JULY",
        "AUGUST",
        "SEPTEMBER",
        "OCTOBER",
        "NOVEMBER",
        "DECEMBER",
    ];
    NAMES.get((month as usize).checked_sub(1)?).copied()
}

/// Returns the name for a weekday, where 1 is Sunday, as an all-caps string.
pub fn weekday_name(wday: u32) -> Option<&'static str> {
    static NAMES: [&str; 7] = [
        "SUNDAY",
        "MONDAY",
        "TUESDAY",
        "WEDNESDAY",
        "THURSDAY",
        "FRIDAY",
        "SATURDAY",
    ];
    NAMES.get((wday as usize).checked_sub(1)?).copied()
}

/// Validates and normalizes `(y,m,d)`:
///
/// - A 2-digit year is expanded according to the epoch in `settings`.
///
/// - Month 0 becomes December of the previous year and month 13 becomes
///   January of the following year.
pub fn calendar_gregorian_adjust(
    y: i32,
    m: i32,
    d: i32,
    settings: &Settings,
) -> Result<(i32, i32, i32), DateError> {
    let y = settings.epoch.apply(y);

    let (y, m) = match m {
        0 => (y - 1, 12),
        1..=12 => (y, m),
        13 => (y + 1, 1),
        _ => return Err(DateError::InvalidMonth(m)),
    };

    if !(0..=31).contains(&d) {
        Err(DateError::InvalidDay(d))
    } else if y < 1582 || (y == 1582 && (m < 10 || (m == 10 && d < 15))) {
        Err(DateError::InvalidDate { y, m, d })
    } else {
        Ok((y, m, d))
    }
}

pub fn is_leap_year(y: i32) -> bool {
    y % 4 == 0 && (y % 100 != 0 || y % 400 == 0)
}

/// Returns the number of days in `month` of `year`.  Months outside 1 to 12
/// are treated as 31-day months.
pub fn days_in_month(year: i32, month: i32) -> i32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn raw_offset(y: i64, m: i64, d: i64) -> i64 {
    let prev = y - 1;
    -EPOCH_RATA_DIE
        + DAYS_PER_YEAR * prev
        + prev.div_euclid(4)
        - prev.div_euclid(100)
        + prev.div_euclid(400)
        + (367 * m - 362) / 12
        + if m <= 2 {
            0
        } else if is_leap_year(y as i32) {
            -1
        } else {
            -2
        }
        + d
}

/// Returns the day offset of `(y,m,d)` without validating or normalizing it.
pub fn calendar_raw_gregorian_to_offset(y: i32, m: i32, d: i32) -> i32 {
    raw_offset(y.into(), m.into(), d.into()) as i32
}

/// Returns the number of days from 14 Oct 1582 to `(y,m,d)` in the Gregorian
/// calendar.  Returns an error for dates before 15 Oct 1582.
pub fn calendar_gregorian_to_offset(
    y: i32,
    m: i32,
    d: i32,
    settings: &Settings,
) -> Result<i32, DateError> {
    let (y, m, d) = calendar_gregorian_adjust(y, m, d, settings)?;
    Ok(calendar_raw_gregorian_to_offset(y, m, d))
}

fn offset_to_year(offset: i64) -> i64 {
    let d0 = offset + EPOCH_RATA_DIE - 1;
    let n400 = d0.div_euclid(DAYS_PER_400_YEARS);
    let d1 = d0.rem_euclid(DAYS_PER_400_YEARS);
    let n100 = d1 / DAYS_PER_100_YEARS;
    let d2 = d1 % DAYS_PER_100_YEARS;
    let n4 = d2 / DAYS_PER_4_YEARS;
    let d3 = d2 % DAYS_PER_4_YEARS;
    let n1 = d3 / DAYS_PER_YEAR;
    let year = 400 * n400 + 100 * n100 + 4 * n4 + n1;

    // The last day of a 4-year or 400-year cycle is day 366 of the final
    // year, not day 1 of the next one.
    if n100 != 4 && n1 != 4 { year + 1 } else { year }
}

/// Returns the year in which day `offset` falls.
pub fn calendar_offset_to_year(offset: i32) -> i32 {
    offset_to_year(offset.into()) as i32
}

/// Breaks day `offset` into a year, month, day, and day of the year.
pub fn calendar_offset_to_gregorian(offset: i32) -> Gregorian {
    let offset = i64::from(offset);
    let year = offset_to_year(offset);
    let january1 = raw_offset(year, 1, 1);
    let yday = offset - january1 + 1;
    let leap = is_leap_year(year as i32);
    let march1 = january1 + if leap { 60 } else { 59 };
    let correction = match (offset < march1, leap) {
        (true, _) => 0,
        (false, true) => 1,
        (false, false) => 2,
    };
    let month = (12 * (yday - 1 + correction) + 373) / 367;
    let day = offset - raw_offset(year, month, 1) + 1;
    Gregorian {
        year: year as i32,
        month: month as i32,
        day: day as i32,
        yday: yday as i32,
    }
}

/// Returns the day of the year for day `offset`, where January 1 is day 1.
pub fn calendar_offset_to_yday(offset: i32) -> i32 {
    calendar_offset_to_gregorian(offset).yday
}

/// Returns the day of the week for day `offset`, where 1 is Sunday and 7 is
/// Saturday.
pub fn calendar_offset_to_wday(offset: i32) -> i32 {
    // 14 Oct 1582 was a Thursday.
    (i64::from(offset) + 4).rem_euclid(7) as i32 + 1
}

pub fn calendar_offset_to_month(offset: i32) -> i32 {
    calendar_offset_to_gregorian(offset).month
}

pub fn calendar_offset_to_mday(offset: i32) -> i32 {
    calendar_offset_to_gregorian(offset).day
}

/// Converts `date` to a day offset.
pub fn date_to_offset(date: NaiveDate) -> i32 {
    calendar_raw_gregorian_to_offset(date.year(), date.month() as i32, date.day() as i32)
}

/// Converts `date_time` to a date and time value in seconds.
pub fn date_time_to_pspp(date_time: NaiveDateTime) -> f64 {
    let time = date_time.time();
    date_to_offset(date_time.date()) as f64 * SECONDS_PER_DAY
        + time.num_seconds_from_midnight() as f64
        + time.nanosecond() as f64 / 1e9
}

/// Converts day `offset` into a [NaiveDate], if it is in the range that
/// [NaiveDate] supports.
pub fn offset_to_date(offset: i32) -> Option<NaiveDate> {
    let Gregorian {
        year, month, day, ..
    } = calendar_offset_to_gregorian(offset);
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}
