use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const META_SUFFIX: &str = ".meta";
pub const META_DELIMITER: char = '|';
pub const UNKNOWN_LABEL: &str = "Unknown";
pub const DEFAULT_USERNAME: &str = "anonymous";

pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Rendered into the sidecar record and shown in the feed.
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Prefixed to the storage key; sorts chronologically by name.
pub const KEY_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One post as reconstructed from the store: the artifact plus the
/// fields of its sidecar record. `storage_key` doubles as the post's
/// identity; there is no separate primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub storage_key: String,
    pub label: String,
    pub timestamp: String,
    pub username: String,
    pub caption: String,
    /// Only known at submission time; never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip)]
    pub artifact: PathBuf,
}

impl PostRecord {
    pub fn from_meta(storage_key: String, artifact: PathBuf, meta: PostMeta) -> Self {
        Self {
            storage_key,
            label: title_case(&meta.label),
            timestamp: meta.timestamp,
            username: meta.username,
            caption: meta.caption,
            confidence: None,
            artifact,
        }
    }
}

/// The sidecar record: `label|timestamp|username|caption`, one line.
/// Older records may carry a strict prefix of these fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMeta {
    pub label: String,
    pub timestamp: String,
    pub username: String,
    pub caption: String,
}

impl PostMeta {
    pub fn unknown() -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            timestamp: String::new(),
            username: DEFAULT_USERNAME.to_string(),
            caption: String::new(),
        }
    }

    pub fn encode(&self) -> String {
        let d = META_DELIMITER;
        format!(
            "{}{d}{}{d}{}{d}{}",
            self.label, self.timestamp, self.username, self.caption
        )
    }

    /// Never fails: missing trailing fields take their defaults, an empty
    /// label becomes "Unknown".
    pub fn parse(raw: &str) -> Self {
        let line = raw.trim_end_matches(['\r', '\n']);
        let mut fields = line.splitn(4, META_DELIMITER);
        let label = match fields.next() {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => UNKNOWN_LABEL.to_string(),
        };
        let timestamp = fields.next().unwrap_or_default().to_string();
        let username = match fields.next() {
            Some(username) if !username.is_empty() => username.to_string(),
            _ => DEFAULT_USERNAME.to_string(),
        };
        let caption = fields.next().unwrap_or_default().to_string();
        Self {
            label,
            timestamp,
            username,
            caption,
        }
    }

    /// True when the record carries fewer fields than the full schema.
    pub fn is_partial(raw: &str) -> bool {
        raw.trim_end_matches(['\r', '\n'])
            .matches(META_DELIMITER)
            .count()
            < 3
    }
}

pub fn storage_key(at: DateTime<Utc>, original_filename: &str) -> String {
    format!(
        "{}_{}",
        at.format(KEY_TIMESTAMP_FORMAT),
        sanitize_filename(original_filename)
    )
}

static FILENAME_SANITIZER: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[/?*:|<>\\"]"#).unwrap());

/// Strips any path prefix and replaces characters that would break the
/// storage key or the sidecar grammar.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    FILENAME_SANITIZER.replace_all(base, "_").to_string()
}

/// Sidecar field values must not contain the delimiter or line breaks.
pub fn sanitize_field(value: &str) -> String {
    value
        .replace([META_DELIMITER, '\n', '\r'], " ")
        .trim()
        .to_string()
}

pub fn accepted_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ACCEPTED_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(ext)
}

pub fn title_case(label: &str) -> String {
    label
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
