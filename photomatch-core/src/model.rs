//! Typed view of items, reference entries and candidates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;

/// Media kind of an item or reference entry.
///
/// Stored file-type labels are free text upstream; anything that is not
/// recognizably an image or a video is kept verbatim as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum MediaKind {
    Image,
    Video,
    Unknown(String),
}

impl MediaKind {
    /// Parse a stored file-type label (`"Image"`, `"image/jpeg"`, `"Video"`, `"video/mp4"`, ...).
    pub fn from_label(label: &str) -> Self {
        let lower = label.trim().to_ascii_lowercase();
        if lower == "image" || lower.starts_with("image/") {
            MediaKind::Image
        } else if lower == "video" || lower.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Unknown(label.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Unknown(label) => label,
        }
    }
}

impl From<Option<&str>> for MediaKind {
    fn from(label: Option<&str>) -> Self {
        Self::from_label(label.unwrap_or_default())
    }
}

impl From<String> for MediaKind {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<MediaKind> for String {
    fn from(kind: MediaKind) -> Self {
        kind.label().to_string()
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle state of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    #[default]
    Unresolved,
    Matched,
    Skipped,
}

impl MatchState {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchState::Unresolved => "unresolved",
            MatchState::Matched => "matched",
            MatchState::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unresolved" => Some(MatchState::Unresolved),
            "matched" => Some(MatchState::Matched),
            "skipped" => Some(MatchState::Skipped),
            _ => None,
        }
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary-collection record awaiting reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub filename: Option<String>,
    pub media_kind: MediaKind,
    pub content_hash: Option<Fingerprint>,
    /// Static-frame fingerprint (videos).
    pub thumbnail_hash: Option<Fingerprint>,
    pub capture_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub match_state: MatchState,
    pub matched_reference_id: Option<i64>,
    /// Set by an out-of-band batch job; overrides live retrieval when present.
    pub precomputed_candidate_ids: Option<Vec<i64>>,
}

impl Item {
    /// A fresh unresolved item with no fingerprints.
    pub fn new(id: i64, media_kind: MediaKind) -> Self {
        Self {
            id,
            filename: None,
            media_kind,
            content_hash: None,
            thumbnail_hash: None,
            capture_time: None,
            match_state: MatchState::Unresolved,
            matched_reference_id: None,
            precomputed_candidate_ids: None,
        }
    }

    /// `Unresolved` and `Skipped` items never carry a matched reference.
    ///
    /// `Matched` with no reference is the explicit "confirmed no match" state.
    pub fn check_invariants(&self) -> bool {
        match self.match_state {
            MatchState::Matched => true,
            MatchState::Unresolved | MatchState::Skipped => self.matched_reference_id.is_none(),
        }
    }

    pub fn is_confirmed_no_match(&self) -> bool {
        self.match_state == MatchState::Matched && self.matched_reference_id.is_none()
    }
}

/// Entry of a reference collection (primary or partner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub id: i64,
    pub filename: Option<String>,
    pub media_kind: MediaKind,
    pub content_hash: Option<Fingerprint>,
    pub thumbnail_hash: Option<Fingerprint>,
    pub capture_time: Option<DateTime<Utc>>,
    pub camera_name: Option<String>,
    /// Geotag or venue, present only when the source had one.
    pub location: Option<String>,
    pub source_url: Option<String>,
    pub preview_url: Option<String>,
}

impl ReferenceEntry {
    pub fn new(id: i64, media_kind: MediaKind) -> Self {
        Self {
            id,
            filename: None,
            media_kind,
            content_hash: None,
            thumbnail_hash: None,
            capture_time: None,
            camera_name: None,
            location: None,
            source_url: None,
            preview_url: None,
        }
    }

    pub(crate) fn has_camera_name(&self) -> bool {
        self.camera_name.as_deref().is_some_and(|c| !c.is_empty())
    }

    pub(crate) fn has_location(&self) -> bool {
        self.location.as_deref().is_some_and(|l| !l.is_empty())
    }
}

/// A reference entry proposed as a possible duplicate of an item.
///
/// Built fresh by each retrieval call and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(flatten)]
    pub reference: ReferenceEntry,
    /// Distance against the item's thumbnail fingerprint (lower = closer).
    pub thumb_distance: Option<f64>,
    /// Distance between content fingerprints.
    pub hamming_distance: Option<u32>,
}

impl Candidate {
    pub fn id(&self) -> i64 {
        self.reference.id
    }
}

/// Everything a reviewer needs to decide one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchTask {
    /// Unresolved items remaining.
    pub count: u64,
    pub offset: u64,
    pub item: Option<Item>,
    pub candidates: Vec<Candidate>,
    pub partner_candidates: Vec<Candidate>,
    pub auto_select_id: Option<i64>,
}

impl MatchTask {
    pub fn empty(count: u64, offset: u64) -> Self {
        Self {
            count,
            offset,
            item: None,
            candidates: Vec::new(),
            partner_candidates: Vec::new(),
            auto_select_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_labels() {
        assert_eq!(MediaKind::from_label("Image"), MediaKind::Image);
        assert_eq!(MediaKind::from_label("image/jpeg"), MediaKind::Image);
        assert_eq!(MediaKind::from_label("Video"), MediaKind::Video);
        assert_eq!(MediaKind::from_label("video/mp4"), MediaKind::Video);
        assert_eq!(
            MediaKind::from_label("application/pdf"),
            MediaKind::Unknown("application/pdf".into())
        );
        assert_eq!(MediaKind::from(None), MediaKind::Unknown(String::new()));
    }

    #[test]
    fn test_any_image_or_video_mime_is_recognized() {
        assert_eq!(MediaKind::from_label("image/heic"), MediaKind::Image);
        assert_eq!(MediaKind::from_label("IMAGE/PNG"), MediaKind::Image);
        assert_eq!(MediaKind::from_label("video/quicktime"), MediaKind::Video);
        assert!(matches!(MediaKind::from_label("imagery"), MediaKind::Unknown(_)));
    }

    #[test]
    fn test_match_state_roundtrip_labels() {
        for state in [MatchState::Unresolved, MatchState::Matched, MatchState::Skipped] {
            assert_eq!(MatchState::parse(state.as_str()), Some(state));
        }
        assert_eq!(MatchState::parse("processed"), None);
    }

    #[test]
    fn test_item_invariants() {
        let mut item = Item::new(1, MediaKind::Image);
        assert!(item.check_invariants());

        item.matched_reference_id = Some(5);
        assert!(!item.check_invariants());

        item.match_state = MatchState::Matched;
        assert!(item.check_invariants());

        item.matched_reference_id = None;
        assert!(item.check_invariants());
        assert!(item.is_confirmed_no_match());
    }

    #[test]
    fn test_candidate_serializes_flat() {
        let mut reference = ReferenceEntry::new(9, MediaKind::Image);
        reference.camera_name = Some("Canon".into());
        let candidate = Candidate {
            reference,
            thumb_distance: Some(2.0),
            hamming_distance: Some(3),
        };

        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["id"], 9);
        assert_eq!(json["camera_name"], "Canon");
        assert_eq!(json["media_kind"], "image");
        assert_eq!(json["hamming_distance"], 3);
    }

    #[test]
    fn test_empty_metadata_counts_as_missing() {
        let mut reference = ReferenceEntry::new(1, MediaKind::Video);
        reference.location = Some(String::new());
        assert!(!reference.has_location());
        reference.location = Some("Lisbon".into());
        assert!(reference.has_location());
    }
}
