//! Plain-text narrative output files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::CalendarDate;

/// `summary_report_<YYYY-MM-DD>.txt`
pub fn summary_file_name(date: CalendarDate) -> String {
    format!("summary_report_{}.txt", date.format_iso())
}

/// Writes `summary` into `dir`, replacing any report from the same day.
///
/// The directory is created when missing.
pub fn save_summary(dir: &Path, date: CalendarDate, summary: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(summary_file_name(date));
    fs::write(&path, summary)?;
    tracing::info!(path = %path.display(), "saved narrative summary");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_carries_iso_date() {
        let date = CalendarDate::from_ymd(2025, 3, 7).expect("date");
        assert_eq!(summary_file_name(date), "summary_report_2025-03-07.txt");
    }

    #[test]
    fn save_creates_directory_and_overwrites() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = temp.path().join("reports");
        let date = CalendarDate::from_ymd(2025, 3, 7).expect("date");

        let first = save_summary(&dir, date, "first").expect("save");
        let second = save_summary(&dir, date, "second").expect("save");

        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(second).expect("read"), "second");
    }
}
