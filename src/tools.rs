// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::{DateTime, Utc};
use const_format::concatcp;

pub const DEFAULT_USER_AGENT: &str = concatcp!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " github.com/iop-alliance/census-places-scraper"
);

/// Formats a point in time for use within a file name.
///
/// The result has a fixed width,
/// so lexicographic order equals chronological order,
/// and contains no colons.
///
/// ```
/// # use census_places_scraper::tools::file_name_timestamp;
/// # use chrono::{TimeZone, Utc};
/// let time = Utc.with_ymd_and_hms(2024, 7, 31, 15, 27, 4).unwrap();
/// assert_eq!(file_name_timestamp(time), "2024-07-31T15_27_04.000Z");
/// ```
#[must_use]
pub fn file_name_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace(':', "_")
}

/// Views a std path as an async-std path.
#[must_use]
pub fn async_path(path: &std::path::Path) -> &async_std::path::Path {
    async_std::path::Path::new(path.as_os_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_timestamp_sorts_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 7, 31, 9, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 7, 31, 10, 0, 0).unwrap();
        let earlier_str = file_name_timestamp(earlier);
        let later_str = file_name_timestamp(later);
        assert!(earlier_str < later_str);
        assert_eq!(earlier_str.len(), later_str.len());
        assert!(!later_str.contains(':'));
    }
}
