use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, FtpResult};

/// One file in a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Name as printed by the server, spaces preserved
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Modification date; the time of day is not retained
    pub modified: NaiveDate,
}

/// Parses the body of a LIST response in the Unix `ls -l` format.
///
/// Entries come back in server order. Blank lines and summary lines
/// like `total 12` are skipped, while lines with unparsable size,
/// month, day or year fields fail the whole listing.
pub fn parse_listing(raw: &str) -> FtpResult<Vec<DirectoryEntry>> {
    parse_listing_at(raw, Local::now().date_naive())
}

pub(crate) fn parse_listing_at(raw: &str, today: NaiveDate) -> FtpResult<Vec<DirectoryEntry>> {
    raw.split("\r\n")
        .filter_map(|line| parse_entry(line, today).transpose())
        .collect()
}

fn parse_entry(line: &str, today: NaiveDate) -> FtpResult<Option<DirectoryEntry>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    // Everything from the ninth column on belongs to the name; lines
    // without a name field carry no entry
    let name = match tokens.get(8..) {
        Some(rest) if !rest.is_empty() => rest.join(" "),
        _ => return Ok(None),
    };

    let size = tokens[4]
        .parse()
        .map_err(|_| bad_field("size", tokens[4], line))?;
    let month = month_number(tokens[5]).ok_or_else(|| bad_field("month", tokens[5], line))?;
    let day = tokens[6]
        .parse()
        .map_err(|_| bad_field("day", tokens[6], line))?;

    // Entries younger than about half a year print `HH:MM` instead of
    // the year, which then has to be inferred relative to today
    let year = if tokens[7].contains(':') {
        infer_year(month, day, today)
    } else {
        tokens[7]
            .parse()
            .map_err(|_| bad_field("year", tokens[7], line))?
    };

    let modified = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::Protocol(format!("impossible date in listing line: {line:?}")))?;

    Ok(Some(DirectoryEntry {
        name,
        size,
        modified,
    }))
}

fn bad_field(field: &str, value: &str, line: &str) -> Error {
    Error::Protocol(format!(
        "bad {field} field {value:?} in listing line: {line:?}"
    ))
}

fn month_number(abbreviation: &str) -> Option<u32> {
    let number = match abbreviation {
        "Jan" => 1,
        "Feb" => 2,
        "Mar" => 3,
        "Apr" => 4,
        "May" => 5,
        "Jun" => 6,
        "Jul" => 7,
        "Aug" => 8,
        "Sep" => 9,
        "Oct" => 10,
        "Nov" => 11,
        "Dec" => 12,
        _ => return None,
    };

    Some(number)
}

/// A month and day strictly before today's belong to the current year,
/// anything else to the previous one. An entry dated like today also
/// falls into the previous year.
fn infer_year(month: u32, day: u32, today: NaiveDate) -> i32 {
    if (today.month(), today.day()) > (month, day) {
        today.year()
    } else {
        today.year() - 1
    }
}
