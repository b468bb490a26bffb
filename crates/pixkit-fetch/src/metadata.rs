//! Media information as reported by the extractor.
//!
//! Only combined audio+video formats are offered for selection; the
//! subtitle list always starts with a "None" entry.

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::job::Platform;

/// A selectable download format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOption {
    /// Extractor format id, passed back on download.
    pub id: String,
    /// Human-readable `"{id} - {note} - {ext} - {height}p"`.
    pub label: String,
}

/// A selectable subtitle track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleOption {
    /// Display label.
    pub label: String,
    /// Language key, or `None` for "no subtitles".
    pub lang: Option<String>,
}

impl SubtitleOption {
    /// The leading "no subtitles" entry.
    #[must_use]
    pub fn none() -> Self {
        Self {
            label: "None".to_owned(),
            lang: None,
        }
    }
}

/// What a probe found.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Media title, empty if the extractor gave none.
    pub title: String,
    /// Combined audio+video formats, in extractor order.
    pub formats: Vec<FormatOption>,
    /// Subtitle choices; the first is always [`SubtitleOption::none`].
    pub subtitles: Vec<SubtitleOption>,
}

#[derive(Deserialize)]
struct RawInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
    #[serde(default)]
    subtitles: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct RawFormat {
    format_id: Option<String>,
    format_note: Option<String>,
    ext: Option<String>,
    height: Option<f64>,
    vcodec: Option<String>,
    acodec: Option<String>,
}

impl RawFormat {
    fn is_combined(&self) -> bool {
        self.vcodec.as_deref() != Some("none") && self.acodec.as_deref() != Some("none")
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn label(&self, id: &str) -> String {
        let height = self
            .height
            .map(|h| (h as u32).to_string())
            .unwrap_or_default();
        format!(
            "{id} - {} - {} - {height}p",
            self.format_note.as_deref().unwrap_or_default(),
            self.ext.as_deref().unwrap_or_default(),
        )
    }
}

impl MediaInfo {
    /// Parse the extractor's JSON dump.
    ///
    /// Twitter probes only surface the title; format and subtitle
    /// selection is a YouTube feature.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Metadata`] if the JSON is malformed.
    pub fn from_json(json: &[u8], platform: Platform) -> Result<Self, FetchError> {
        let raw: RawInfo = serde_json::from_slice(json).map_err(FetchError::Metadata)?;
        let title = raw.title.unwrap_or_default();
        let mut subtitles = vec![SubtitleOption::none()];
        if !platform.supports_selection() {
            return Ok(Self {
                title,
                formats: Vec::new(),
                subtitles,
            });
        }

        let formats = raw
            .formats
            .iter()
            .filter(|f| f.is_combined())
            .filter_map(|f| {
                let id = f.format_id.as_deref()?;
                Some(FormatOption {
                    id: id.to_owned(),
                    label: f.label(id),
                })
            })
            .collect();
        subtitles.extend(raw.subtitles.unwrap_or_default().into_iter().map(|(lang, _)| {
            SubtitleOption {
                label: lang.clone(),
                lang: Some(lang),
            }
        }));

        Ok(Self {
            title,
            formats,
            subtitles,
        })
    }

    /// Look up a format by id.
    #[must_use]
    pub fn format(&self, id: &str) -> Option<&FormatOption> {
        self.formats.iter().find(|f| f.id == id)
    }

    /// Returns `true` if `lang` is one of the offered subtitle languages.
    #[must_use]
    pub fn has_subtitle(&self, lang: &str) -> bool {
        self.subtitles
            .iter()
            .any(|s| s.lang.as_deref() == Some(lang))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DUMP: &str = r#"{
        "title": "Clip",
        "formats": [
            {"format_id": "139", "format_note": "low", "ext": "m4a", "vcodec": "none", "acodec": "mp4a"},
            {"format_id": "18", "format_note": "360p", "ext": "mp4", "height": 360, "vcodec": "avc1", "acodec": "mp4a"},
            {"format_id": "137", "format_note": "1080p", "ext": "mp4", "height": 1080, "vcodec": "avc1", "acodec": "none"},
            {"format_id": "22", "ext": "mp4", "height": null, "vcodec": "avc1", "acodec": "mp4a"}
        ],
        "subtitles": {"zh-Hans": [], "en": []}
    }"#;

    #[test]
    fn keeps_only_combined_formats() {
        let info = MediaInfo::from_json(DUMP.as_bytes(), Platform::YouTube).unwrap();
        let ids: Vec<_> = info.formats.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["18", "22"]);
    }

    #[test]
    fn labels_tolerate_missing_fields() {
        let info = MediaInfo::from_json(DUMP.as_bytes(), Platform::YouTube).unwrap();
        assert_eq!(info.formats[0].label, "18 - 360p - mp4 - 360p");
        assert_eq!(info.formats[1].label, "22 -  - mp4 - p");
    }

    #[test]
    fn subtitles_start_with_none_and_keep_order() {
        let info = MediaInfo::from_json(DUMP.as_bytes(), Platform::YouTube).unwrap();
        assert_eq!(info.subtitles[0], SubtitleOption::none());
        let langs: Vec<_> = info.subtitles[1..]
            .iter()
            .map(|s| s.lang.as_deref().unwrap())
            .collect();
        assert_eq!(langs, ["zh-Hans", "en"]);
        assert!(info.has_subtitle("en"));
        assert!(!info.has_subtitle("fr"));
    }

    #[test]
    fn twitter_probe_only_has_title() {
        let info = MediaInfo::from_json(DUMP.as_bytes(), Platform::Twitter).unwrap();
        assert_eq!(info.title, "Clip");
        assert!(info.formats.is_empty());
        assert_eq!(info.subtitles, vec![SubtitleOption::none()]);
    }

    #[test]
    fn missing_sections_are_empty() {
        let info = MediaInfo::from_json(br#"{"subtitles": null}"#, Platform::YouTube).unwrap();
        assert!(info.title.is_empty());
        assert!(info.formats.is_empty());
        assert_eq!(info.subtitles.len(), 1);
    }

    #[test]
    fn malformed_json_is_a_metadata_error() {
        assert!(matches!(
            MediaInfo::from_json(b"not json", Platform::YouTube),
            Err(FetchError::Metadata(_))
        ));
    }
}
