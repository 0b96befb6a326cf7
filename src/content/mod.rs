//! Lesson content shapes and the step parser.
//!
//! Stored lesson content arrives in one of three historical formats:
//!
//! - **Steps** (current): `{"version": 2, "steps": [...]}` with typed steps
//! - **Blocks** (legacy): `{"blocks": [...]}` with flat content blocks
//! - **Markup** (oldest): a raw markup string
//!
//! [`parse`] is the single normalization boundary: everything downstream
//! operates on the canonical [`Step`] sequence and never sees the raw
//! shapes. Parsing is pure and total: malformed or empty content yields an
//! empty sequence rather than an error, so one corrupt lesson cannot break
//! navigation for the rest of the course.

use serde::{Deserialize, Serialize};

/// Content format version that carries an explicit step list.
const STEP_FORMAT_VERSION: u32 = 2;

/// Serialized form of the rich-text editor's empty document.
///
/// A text step holding exactly this markup has no content.
const EMPTY_PARAGRAPH: &str = "<p><br></p>";

/// Synthetic step id assigned when normalizing legacy formats.
const LEGACY_STEP_ID: &str = "legacy";

/// The stored content of a lesson, in whichever format it was written.
///
/// Untagged: the variants are distinguished by shape. `Steps` is tried
/// first since it is the only one carrying a `version` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LessonContent {
    /// Current format: explicit version plus a list of typed steps
    Steps(StepsDocument),
    /// Legacy format: a flat list of content blocks
    Blocks(BlocksDocument),
    /// Oldest format: a raw markup string
    Markup(String),
}

/// The current versioned step-list document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepsDocument {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub steps: Vec<RawStep>,
}

/// The legacy block-list document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlocksDocument {
    pub blocks: Vec<RawBlock>,
}

/// One stored step, before normalization. Every field is optional; the
/// parser supplies defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Position within the lesson; missing order sorts as 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,

    /// Step type as stored; missing or unrecognized types normalize to text
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
}

/// One stored legacy block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBlock {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl RawBlock {
    /// Blocks without a type default to text, matching step normalization.
    fn is_text(&self) -> bool {
        match self.kind.as_deref() {
            None | Some("text") => true,
            Some(_) => false,
        }
    }
}

/// Canonical step content, one variant per step type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepContent {
    Text { html: String },
    Video { url: String },
    File { files: Vec<String> },
}

/// One canonical content step, as produced by [`parse`].
///
/// Steps have no persistence identity of their own; they are recomputed
/// from the lesson's stored content on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub order: i64,
    #[serde(flatten)]
    pub content: StepContent,
}

impl Step {
    /// Whether this step carries any learner-visible content.
    ///
    /// Text steps holding only the editor's empty-paragraph sentinel count
    /// as empty.
    pub fn has_content(&self) -> bool {
        match &self.content {
            StepContent::Text { html } => {
                let trimmed = html.trim();
                !trimmed.is_empty() && trimmed != EMPTY_PARAGRAPH
            }
            StepContent::Video { url } => !url.trim().is_empty(),
            StepContent::File { files } => !files.is_empty(),
        }
    }
}

/// Normalize a lesson's stored content into an ordered sequence of steps.
///
/// Version-2 step lists sort ascending by `order` (missing order sorts as
/// 0; ties keep their original array position). Legacy formats collapse
/// into a single synthetic text step. Empty or absent content yields an
/// empty sequence.
///
/// Pure and deterministic: equal input always produces an identical
/// sequence, so callers may cache results by content identity.
pub fn parse(content: Option<&LessonContent>) -> Vec<Step> {
    match content {
        None => Vec::new(),
        Some(LessonContent::Steps(doc)) => parse_step_list(doc),
        Some(LessonContent::Blocks(doc)) => {
            let html: String = doc
                .blocks
                .iter()
                .filter(|b| b.is_text())
                .filter_map(|b| b.html.as_deref())
                .collect();
            legacy_step(html)
        }
        Some(LessonContent::Markup(raw)) => legacy_step(raw.clone()),
    }
}

fn parse_step_list(doc: &StepsDocument) -> Vec<Step> {
    if doc.version != STEP_FORMAT_VERSION {
        return Vec::new();
    }

    let mut steps: Vec<Step> = doc
        .steps
        .iter()
        .enumerate()
        .map(|(position, raw)| normalize_step(raw, position))
        .collect();

    // Stable sort: equal orders keep their original array position.
    steps.sort_by_key(|s| s.order);
    steps
}

fn normalize_step(raw: &RawStep, position: usize) -> Step {
    let id = raw
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("step-{position}"));

    let content = match raw.kind.as_deref() {
        Some("video") => StepContent::Video {
            url: raw.video_url.clone().unwrap_or_default(),
        },
        Some("file") => StepContent::File {
            files: raw.files.clone().unwrap_or_default(),
        },
        // Missing and unrecognized types both normalize to text.
        _ => StepContent::Text {
            html: raw.html.clone().unwrap_or_default(),
        },
    };

    Step {
        id,
        order: raw.order.unwrap_or(0),
        content,
    }
}

/// Wrap legacy markup in a single synthetic text step, or nothing if the
/// markup is empty.
fn legacy_step(html: String) -> Vec<Step> {
    if html.trim().is_empty() {
        return Vec::new();
    }
    vec![Step {
        id: LEGACY_STEP_ID.to_string(),
        order: 0,
        content: StepContent::Text { html },
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(json: &str) -> LessonContent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_absent_content_is_empty() {
        assert!(parse(None).is_empty());
    }

    #[test]
    fn test_v2_steps_sorted_by_order() {
        let c = content(
            r#"{"version":2,"steps":[
                {"id":"b","order":2,"type":"text","html":"<p>two</p>"},
                {"id":"a","order":1,"type":"text","html":"<p>one</p>"}
            ]}"#,
        );
        let steps = parse(Some(&c));
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].id, "a");
        assert_eq!(steps[1].id, "b");
    }

    #[test]
    fn test_v2_order_ties_keep_array_position() {
        let c = content(
            r#"{"version":2,"steps":[
                {"id":"first","order":1},
                {"id":"second","order":1},
                {"id":"zero"}
            ]}"#,
        );
        let steps = parse(Some(&c));
        // Missing order sorts as 0, ahead of the tied pair.
        assert_eq!(steps[0].id, "zero");
        assert_eq!(steps[1].id, "first");
        assert_eq!(steps[2].id, "second");
    }

    #[test]
    fn test_v2_missing_type_defaults_to_text() {
        let c = content(r#"{"version":2,"steps":[{"id":"s","html":"<p>hi</p>"}]}"#);
        let steps = parse(Some(&c));
        assert_eq!(
            steps[0].content,
            StepContent::Text {
                html: "<p>hi</p>".to_string()
            }
        );
    }

    #[test]
    fn test_v2_unrecognized_type_normalizes_to_text() {
        let c = content(r#"{"version":2,"steps":[{"id":"s","type":"quiz","html":"<p>q</p>"}]}"#);
        let steps = parse(Some(&c));
        assert!(matches!(steps[0].content, StepContent::Text { .. }));
    }

    #[test]
    fn test_v2_missing_id_is_positional() {
        let c = content(r#"{"version":2,"steps":[{"order":5},{"order":1}]}"#);
        let steps = parse(Some(&c));
        // Ids come from the original array position, not the sorted one.
        assert_eq!(steps[0].id, "step-1");
        assert_eq!(steps[1].id, "step-0");
    }

    #[test]
    fn test_v2_video_and_file_steps() {
        let c = content(
            r#"{"version":2,"steps":[
                {"id":"v","order":0,"type":"video","video_url":"https://example.com/v"},
                {"id":"f","order":1,"type":"file","files":["notes.pdf"]}
            ]}"#,
        );
        let steps = parse(Some(&c));
        assert_eq!(
            steps[0].content,
            StepContent::Video {
                url: "https://example.com/v".to_string()
            }
        );
        assert_eq!(
            steps[1].content,
            StepContent::File {
                files: vec!["notes.pdf".to_string()]
            }
        );
    }

    #[test]
    fn test_unknown_version_is_empty() {
        let c = content(r#"{"version":3,"steps":[{"id":"s"}]}"#);
        assert!(parse(Some(&c)).is_empty());
    }

    #[test]
    fn test_legacy_blocks_concatenate_text_only() {
        let c = content(
            r#"{"blocks":[
                {"type":"text","html":"<p>a</p>"},
                {"type":"video","html":"ignored"},
                {"html":"<p>b</p>"}
            ]}"#,
        );
        let steps = parse(Some(&c));
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].id, "legacy");
        assert_eq!(steps[0].order, 0);
        assert_eq!(
            steps[0].content,
            StepContent::Text {
                html: "<p>a</p><p>b</p>".to_string()
            }
        );
    }

    #[test]
    fn test_legacy_markup_string() {
        let c = content(r#""<h1>Old lesson</h1>""#);
        let steps = parse(Some(&c));
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].id, "legacy");
        assert!(matches!(steps[0].content, StepContent::Text { .. }));
    }

    #[test]
    fn test_empty_legacy_markup_is_empty() {
        let c = content(r#"""#);
        assert!(parse(Some(&c)).is_empty());
        let c = content(r#"{"blocks":[]}"#);
        assert!(parse(Some(&c)).is_empty());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let c = content(
            r#"{"version":2,"steps":[{"id":"b","order":1},{"id":"a","order":1},{"id":"c"}]}"#,
        );
        let first = parse(Some(&c));
        let second = parse(Some(&c));
        assert_eq!(first, second);
    }

    #[test]
    fn test_has_content_text_sentinel() {
        let step = Step {
            id: "s".to_string(),
            order: 0,
            content: StepContent::Text {
                html: "<p><br></p>".to_string(),
            },
        };
        assert!(!step.has_content());

        let step = Step {
            id: "s".to_string(),
            order: 0,
            content: StepContent::Text {
                html: "<p>real</p>".to_string(),
            },
        };
        assert!(step.has_content());
    }

    #[test]
    fn test_has_content_video_and_file() {
        let empty_video = Step {
            id: "v".to_string(),
            order: 0,
            content: StepContent::Video {
                url: "  ".to_string(),
            },
        };
        assert!(!empty_video.has_content());

        let empty_files = Step {
            id: "f".to_string(),
            order: 0,
            content: StepContent::File { files: vec![] },
        };
        assert!(!empty_files.has_content());

        let full = Step {
            id: "f".to_string(),
            order: 0,
            content: StepContent::File {
                files: vec!["a.pdf".to_string()],
            },
        };
        assert!(full.has_content());
    }
}
