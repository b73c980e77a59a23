use crate::error::{Result, WatermarkError};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use std::fmt::{self, Write};
use std::path::Path;
use tracing::{debug, trace};

/// EXIF fields that can carry a capture date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExifDateField {
    DateTimeOriginal,
    DateTime,
    DateTimeDigitized,
}

impl ExifDateField {
    /// Consulted in this order, most preferred first.
    pub const PREFERENCE: [ExifDateField; 3] = [
        ExifDateField::DateTimeOriginal,
        ExifDateField::DateTime,
        ExifDateField::DateTimeDigitized,
    ];

    fn tag(self) -> rexif::ExifTag {
        match self {
            ExifDateField::DateTimeOriginal => rexif::ExifTag::DateTimeOriginal,
            ExifDateField::DateTime => rexif::ExifTag::DateTime,
            ExifDateField::DateTimeDigitized => rexif::ExifTag::DateTimeDigitized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    Exif(ExifDateField),
    FileModified,
}

impl TimestampSource {
    pub fn is_exif(&self) -> bool {
        matches!(self, TimestampSource::Exif(_))
    }
}

impl fmt::Display for TimestampSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampSource::Exif(tag) => write!(f, "EXIF {:?}", tag),
            TimestampSource::FileModified => write!(f, "file modification time"),
        }
    }
}

/// A resolved capture time and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTimestamp {
    pub datetime: NaiveDateTime,
    pub source: TimestampSource,
}

impl CaptureTimestamp {
    /// Render with a strftime-style pattern, e.g. `%Y-%m-%d`.
    pub fn format(&self, pattern: &str) -> Result<String> {
        validate_date_format(pattern)?;
        let mut text = String::new();
        write!(text, "{}", self.datetime.format(pattern))
            .map_err(|_| WatermarkError::InvalidDateFormat(pattern.to_string()))?;
        Ok(text)
    }
}

/// Reject patterns chrono cannot render instead of panicking mid-batch.
pub fn validate_date_format(pattern: &str) -> Result<()> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(WatermarkError::InvalidDateFormat(pattern.to_string()));
    }
    Ok(())
}

/// Resolve the capture timestamp for `path`, preferring EXIF over mtime.
///
/// Only fails when the filesystem metadata itself is unreadable.
pub fn resolve_timestamp(path: &Path) -> Result<CaptureTimestamp> {
    if let Some(stamp) = read_exif_timestamp(path) {
        return Ok(stamp);
    }

    let modified = std::fs::metadata(path)?.modified()?;
    let local: DateTime<Local> = modified.into();
    debug!(
        "No EXIF capture date for {}, using modification time {}",
        path.display(),
        local
    );

    Ok(CaptureTimestamp {
        datetime: local.naive_local(),
        source: TimestampSource::FileModified,
    })
}

fn read_exif_timestamp(path: &Path) -> Option<CaptureTimestamp> {
    let exif = match rexif::parse_file(path) {
        Ok(exif) => exif,
        Err(e) => {
            trace!("No EXIF data for {}: {}", path.display(), e);
            return None;
        }
    };

    for field in ExifDateField::PREFERENCE {
        let tag = field.tag();
        if let Some(entry) = exif.entries.iter().find(|e| e.tag == tag) {
            match parse_exif_datetime(&entry.value_more_readable) {
                Some(datetime) => {
                    debug!("Found capture date in {:?}: {}", field, datetime);
                    return Some(CaptureTimestamp {
                        datetime,
                        source: TimestampSource::Exif(field),
                    });
                }
                None => trace!(
                    "Unparsable {:?} value {:?} in {}",
                    field,
                    entry.value_more_readable,
                    path.display()
                ),
            }
        }
    }

    None
}

/// Parse an EXIF datetime such as `2005:07:30 07:22:46`.
///
/// Also accepts date-only values and `-` or `/` separated variants, which
/// some cameras and editors write despite the standard.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim().trim_end_matches('\0').trim();

    const DATETIME_FORMATS: [&str; 3] = [
        "%Y:%m:%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];
    const DATE_FORMATS: [&str; 3] = ["%Y:%m:%d", "%Y-%m-%d", "%Y/%m/%d"];

    for format in &DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime);
        }
    }

    for format in &DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}
