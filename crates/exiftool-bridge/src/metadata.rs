//! Capture metadata extraction using exiftool
//!
//! Reads the timing and exposure tags of a whole session in one exiftool call
//! and turns them into [`PhotoRecord`]s. Photos without a usable capture time
//! fall back to the file's modification time.

use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use burst_selection::{PhotoRecord, DEFAULT_SUB_SECOND};
use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use serde::Deserialize;
use tracing::{debug, warn};
use crate::runner::ExiftoolRunner;

/// Deserialize a value that could be a string or number into Option<String>
fn deserialize_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct StringOrNumber;
    impl<'de> de::Visitor<'de> for StringOrNumber {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}

#[derive(Deserialize)]
struct ExiftoolOutput {
    #[serde(rename = "SourceFile")]
    source_file: String,
    #[serde(rename = "DateTimeOriginal", deserialize_with = "deserialize_string_or_number", default)]
    date_time_original: Option<String>,
    #[serde(rename = "SubSecTimeOriginal", deserialize_with = "deserialize_string_or_number", default)]
    subsec_time_original: Option<String>,
    #[serde(rename = "ISO", deserialize_with = "deserialize_string_or_number", default)]
    iso: Option<String>,
    #[serde(rename = "ShutterSpeed", deserialize_with = "deserialize_string_or_number", default)]
    shutter_speed: Option<String>,
    #[serde(rename = "Aperture", deserialize_with = "deserialize_string_or_number", default)]
    aperture: Option<String>,
}

const METADATA_TAGS: &[&str] = &[
    "-DateTimeOriginal",
    "-SubSecTimeOriginal",
    "-ISO",
    "-ShutterSpeed",
    "-Aperture",
];

impl ExiftoolRunner {
    /// Extract capture metadata for a batch of files.
    ///
    /// Files exiftool cannot read are left out of the result.
    pub fn extract(&mut self, paths: &[PathBuf]) -> Result<Vec<PhotoRecord>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let mut args: Vec<String> = vec!["-json".to_string(), "-fast".to_string()];
        args.extend(METADATA_TAGS.iter().map(|tag| tag.to_string()));
        args.extend(paths.iter().map(|path| path.display().to_string()));

        let json_output = self.execute(&args)?;
        let records = records_from_json(&json_output, file_modified_time)?;

        if records.len() < paths.len() {
            warn!(
                requested = paths.len(),
                extracted = records.len(),
                "exiftool returned metadata for fewer files than requested"
            );
        }
        Ok(records)
    }
}

/// Parse exiftool `-json` output into records.
///
/// `fallback_time` supplies the capture time for files without a parseable
/// `DateTimeOriginal`; files for which it returns `None` are skipped.
pub fn records_from_json<F>(json_output: &str, fallback_time: F) -> Result<Vec<PhotoRecord>>
where
    F: Fn(&Path) -> Option<NaiveDateTime>,
{
    if json_output.trim().is_empty() {
        return Ok(Vec::new());
    }

    let exiftool_data: Vec<ExiftoolOutput> = serde_json::from_str(json_output)
        .with_context(|| {
            let preview = if json_output.len() > 500 {
                let head: String = json_output.chars().take(500).collect();
                format!("{}...(truncated, {} bytes total)", head, json_output.len())
            } else {
                json_output.to_string()
            };
            format!("Failed to parse exiftool JSON output. First bytes: {}", preview)
        })?;

    let mut records = Vec::with_capacity(exiftool_data.len());
    for data in exiftool_data {
        let path = PathBuf::from(&data.source_file);

        let timestamp = match parse_capture_time(data.date_time_original.as_deref()) {
            Some(timestamp) => timestamp,
            None => match fallback_time(&path) {
                Some(modified) => {
                    debug!(file = %path.display(), "No capture time, using file modification time");
                    modified
                }
                None => {
                    warn!(file = %path.display(), "No capture time or modification time, skipping");
                    continue;
                }
            },
        };

        let sub_second = data.subsec_time_original
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SUB_SECOND.to_string());

        let iso = data.iso.as_deref().and_then(|iso| iso.trim().parse().ok());
        let aperture = data.aperture.as_deref().and_then(|a| a.trim().parse().ok());

        records.push(PhotoRecord {
            path,
            timestamp,
            sub_second,
            iso,
            shutter_speed: data.shutter_speed,
            aperture,
        });
    }

    Ok(records)
}

/// Parse an EXIF `YYYY:MM:DD HH:MM:SS` timestamp
pub fn parse_capture_time(date_time_original: Option<&str>) -> Option<NaiveDateTime> {
    let date_str = date_time_original?.trim();
    NaiveDateTime::parse_from_str(date_str, "%Y:%m:%d %H:%M:%S").ok()
}

/// File modification time as local calendar time, truncated to the second
pub fn file_modified_time(path: &Path) -> Option<NaiveDateTime> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let local: DateTime<Local> = modified.into();
    local.naive_local().with_nanosecond(0)
}
