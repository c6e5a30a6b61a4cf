//! Object-storage naming for recorded conversation audio.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization as _;

use crate::constants::DEFAULT_AUDIO_CONTENT_TYPE;
use crate::conversation::Role;

/// Metadata accompanying one uploaded audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioUploadMeta {
    pub participant_id: String,
    pub task_id: String,
    pub session: String,
    pub turn_id: String,
    pub role: Role,
    /// Declared MIME type, if the client sent one.
    pub content_type: Option<String>,
}

impl AudioUploadMeta {
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().filter(|c| !c.is_empty()).unwrap_or(DEFAULT_AUDIO_CONTENT_TYPE)
    }

    /// `<session>/<participant>/<task>/<role>-<turn>.<ext>`
    #[must_use]
    pub fn object_path(&self) -> String {
        format!(
            "{}/{}/{}/{}-{}.{}",
            sanitize_segment(&self.session),
            sanitize_segment(&self.participant_id),
            sanitize_segment(&self.task_id),
            self.role.as_str(),
            sanitize_segment(&self.turn_id),
            extension_for(self.content_type()),
        )
    }
}

/// Stored object location returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAudio {
    pub url: String,
    pub path: String,
}

/// NFKC-normalize, trim and replace anything outside `[A-Za-z0-9._-]` with `_`.
#[must_use]
pub fn sanitize_segment(value: &str) -> String {
    let normalized: String = value.trim().nfkc().collect();
    let cleaned: String = normalized
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "unknown".to_owned() } else { cleaned }
}

/// File extension from a MIME subtype, ignoring parameters (`audio/webm;codecs=opus` -> `webm`).
#[must_use]
pub fn extension_for(content_type: &str) -> String {
    let mime = content_type.split(';').next().unwrap_or_default();
    let subtype = mime.rsplit('/').next().unwrap_or_default();
    let ext = sanitize_segment(subtype.trim());
    if ext == "unknown" { "webm".to_owned() } else { ext }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(content_type: Option<&str>) -> AudioUploadMeta {
        AudioUploadMeta {
            participant_id: "test01@example.com".to_owned(),
            task_id: "BIRTHDAY_GIFT".to_owned(),
            session: "s1".to_owned(),
            turn_id: "3".to_owned(),
            role: Role::Assistant,
            content_type: content_type.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn path_layout() {
        assert_eq!(
            meta(Some("audio/ogg")).object_path(),
            "s1/test01_example.com/BIRTHDAY_GIFT/assistant-3.ogg"
        );
    }

    #[test]
    fn default_content_type_is_webm() {
        let m = meta(None);
        assert_eq!(m.content_type(), "audio/webm");
        assert!(m.object_path().ends_with(".webm"));
    }

    #[test]
    fn codec_parameters_are_dropped() {
        assert_eq!(extension_for("audio/webm;codecs=opus"), "webm");
        assert_eq!(extension_for(""), "webm");
    }

    #[test]
    fn sanitize_normalizes_and_replaces() {
        assert_eq!(sanitize_segment("  ｐ１ "), "p1");
        assert_eq!(sanitize_segment("参加者"), "___");
        assert_eq!(sanitize_segment("   "), "unknown");
        assert_eq!(sanitize_segment("a/b c"), "a_b_c");
    }
}
