//! Parser for one line of a GHCN-Daily `.dly` file.
//!
//! Layout: station id `[0,11)`, year `[11,15)`, month `[15,17)`, element `[17,21)`,
//! then 31 fields of 8 characters each (5 character value, 3 flag characters).
//! Values are stored in tenths of a unit; `-9999` marks a missing day.

use crate::types::element::Element;
use chrono::Month;
use log::trace;

/// Raw value marking a missing observation.
pub const MISSING_VALUE: i32 = -9999;

const ID_END: usize = 11;
const YEAR_RANGE: (usize, usize) = (11, 15);
const MONTH_RANGE: (usize, usize) = (15, 17);
const ELEMENT_RANGE: (usize, usize) = (17, 21);
const VALUES_START: usize = 21;
const FIELD_WIDTH: usize = 8;
const VALUE_WIDTH: usize = 5;
const DAYS_PER_LINE: usize = 31;

/// One parsed `.dly` line for a temperature element.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecordLine<'a> {
    pub station_id: &'a str,
    pub year: i32,
    pub month: Month,
    pub element: Element,
    /// One entry per day field present on the line, in °C. `None` for missing days.
    pub values: Vec<Option<f64>>,
}

impl DailyRecordLine<'_> {
    pub fn present_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().flatten().copied()
    }
}

/// Parses a line, returning `None` for elements other than TMAX/TMIN and for lines
/// whose header is malformed.
pub fn parse_line(line: &str) -> Option<DailyRecordLine<'_>> {
    let element = Element::from_code(field(line, ELEMENT_RANGE)?)?;

    let Some(year) = field(line, YEAR_RANGE).and_then(|y| y.trim().parse::<i32>().ok()) else {
        trace!("Skipping record line with malformed year: {line:?}");
        return None;
    };
    let Some(month) = field(line, MONTH_RANGE)
        .and_then(|m| m.trim().parse::<u8>().ok())
        .and_then(|m| Month::try_from(m).ok())
    else {
        trace!("Skipping record line with malformed month: {line:?}");
        return None;
    };

    let mut values = Vec::with_capacity(DAYS_PER_LINE);
    for day in 0..DAYS_PER_LINE {
        let start = VALUES_START + day * FIELD_WIDTH;
        if start >= line.len() {
            break;
        }
        let end = (start + VALUE_WIDTH).min(line.len());
        values.push(line.get(start..end).and_then(parse_value));
    }

    Some(DailyRecordLine {
        station_id: line.get(..ID_END)?.trim(),
        year,
        month,
        element,
        values,
    })
}

fn field(line: &str, (start, end): (usize, usize)) -> Option<&str> {
    line.get(start..end)
}

fn parse_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i32>() {
        Ok(MISSING_VALUE) => None,
        Ok(value) => Some(f64::from(value) / 10.0),
        Err(_) => {
            trace!("Skipping malformed day value {raw:?}");
            None
        }
    }
}
