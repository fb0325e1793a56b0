//! Human-readable EXIF summaries.
//!
//! Entries keep the raw tag dump under `media_data["exif_all"]`, a map of
//! tag name (e.g. `EXIF FNumber`) to an object with a `printable` string.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde_json::Value as JsonValue;

static CAMEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid camel-case regex"));

const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

fn exif_all(media_data: Option<&JsonValue>) -> Option<&serde_json::Map<String, JsonValue>> {
    media_data?.get("exif_all")?.as_object()
}

fn printable(tag: &JsonValue) -> Option<String> {
    match tag.get("printable")? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Null => None,
        other => Some(other.to_string()),
    }
}

/// Display label for a raw tag name: `EXIF FNumber` -> `F Number`.
pub fn display_label(key: &str) -> String {
    CAMEL_RE
        .replace_all(key, "${1} ${2}")
        .replace("EXIF", "")
        .replace("Image", "")
        .trim()
        .to_string()
}

/// Every tag with its display label, sorted by raw tag name.
pub fn display_iter(media_data: Option<&JsonValue>) -> Vec<(String, &JsonValue)> {
    match exif_all(media_data) {
        Some(all) => all
            .iter()
            .map(|(key, value)| (display_label(key), value))
            .collect(),
        None => Vec::new(),
    }
}

fn aperture(fnumber: &str) -> Option<String> {
    let parts: Vec<&str> = fnumber.split('/').collect();
    match parts.as_slice() {
        [num, den] => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            Some(format!("f/{:.1}", num / den))
        }
        [single] if *single != "None" => Some(format!("f/{}", single)),
        _ => None,
    }
}

/// Short practical summary: date taken, aperture, camera, exposure, ISO and
/// focal length, each only when present.
pub fn display_data_short(media_data: Option<&JsonValue>) -> Option<Vec<(&'static str, String)>> {
    let all = exif_all(media_data)?;
    let mut short = Vec::new();

    if let Some(taken) = all.get("Image DateTimeOriginal").and_then(printable) {
        match NaiveDateTime::parse_from_str(taken.trim(), EXIF_DATE_FORMAT) {
            Ok(dt) => short.push(("Date Taken", dt.format("%B %d %Y").to_string())),
            Err(e) => tracing::debug!(value = %taken, error = %e, "Unparseable EXIF date"),
        }
    }

    if let Some(ap) = all
        .get("EXIF FNumber")
        .and_then(printable)
        .and_then(|f| aperture(&f))
    {
        short.push(("Aperture", ap));
    }

    let short_keys: [(&'static str, &str, Option<&str>); 4] = [
        ("Camera", "Image Model", None),
        ("Exposure", "EXIF ExposureTime", Some("sec")),
        ("ISO Speed", "EXIF ISOSpeedRatings", None),
        ("Focal Length", "EXIF FocalLength", Some("mm")),
    ];
    for (label, key, unit) in short_keys {
        if let Some(value) = all.get(key).and_then(printable) {
            let value = match unit {
                Some(unit) => format!("{} {}", value, unit),
                None => value,
            };
            short.push((label, value));
        }
    }

    Some(short)
}
