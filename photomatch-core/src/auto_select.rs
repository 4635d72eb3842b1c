//! Deterministic auto-selection over a ranked candidate list.
//!
//! Only auto-confirms when a metadata signal (camera name for images,
//! location for videos) combined with temporal proximity singles out one
//! candidate. Everything else is left to a reviewer.

use chrono::{DateTime, Utc};

use crate::model::{Candidate, Item, MediaKind, ReferenceEntry};

/// Thresholds used by [`auto_select`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoSelectRules {
    /// Pair rule: `item.capture_time - candidate[0].capture_time` must be below this.
    pub pair_window_days: i64,
    /// Shortlist rule: `item.capture_time - candidate.capture_time` must be below this.
    pub shortlist_window_days: i64,
    /// Stand-in for a missing distance; a minimum equal to it never wins.
    pub missing_distance_sentinel: f64,
}

impl Default for AutoSelectRules {
    fn default() -> Self {
        Self {
            pair_window_days: 60,
            shortlist_window_days: 30,
            missing_distance_sentinel: 999.0,
        }
    }
}

/// Auto-select with the default rules.
pub fn auto_select(item: &Item, candidates: &[Candidate]) -> Option<i64> {
    AutoSelectRules::default().select(item, candidates)
}

impl AutoSelectRules {
    /// Pick a reference id, or `None` when a human has to decide.
    ///
    /// Exactly two candidates are judged positionally, in retrieval order.
    /// Larger shortlists are judged on their minimum metric, which makes the
    /// result independent of input order.
    pub fn select(&self, item: &Item, candidates: &[Candidate]) -> Option<i64> {
        match candidates {
            [first, second] => self.select_pair(item, first, second),
            _ if candidates.len() > 2 => self.select_from_shortlist(item, candidates),
            _ => None,
        }
    }

    fn select_pair(&self, item: &Item, first: &Candidate, second: &Candidate) -> Option<i64> {
        let (a, b) = (&first.reference, &second.reference);
        let selected = match item.media_kind {
            MediaKind::Video => a.has_location() && !b.has_location(),
            MediaKind::Image => {
                a.has_camera_name()
                    && !b.has_camera_name()
                    && signed_days(item.capture_time, a.capture_time)
                        .is_some_and(|days| days < self.pair_window_days)
            }
            MediaKind::Unknown(_) => false,
        };
        selected.then_some(a.id)
    }

    fn select_from_shortlist(&self, item: &Item, candidates: &[Candidate]) -> Option<i64> {
        let (has_signal, metric): (fn(&ReferenceEntry) -> bool, fn(&Candidate) -> Option<f64>) =
            match item.media_kind {
                MediaKind::Image => (ReferenceEntry::has_camera_name, |c: &Candidate| {
                    c.hamming_distance.map(f64::from)
                }),
                MediaKind::Video => (ReferenceEntry::has_location, |c: &Candidate| c.thumb_distance),
                MediaKind::Unknown(_) => return None,
            };

        let mut ranked: Vec<(f64, i64)> = candidates
            .iter()
            .filter(|c| has_signal(&c.reference))
            .filter(|c| {
                signed_days(item.capture_time, c.reference.capture_time)
                    .is_some_and(|days| days < self.shortlist_window_days)
            })
            .map(|c| {
                let distance = metric(c).unwrap_or(self.missing_distance_sentinel);
                (distance, c.id())
            })
            .collect();

        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let (best, id) = *ranked.first()?;
        if best >= self.missing_distance_sentinel {
            return None;
        }
        let tied = ranked.iter().filter(|(d, _)| *d == best).count();
        (tied == 1).then_some(id)
    }
}

/// Whole days from `candidate` to `item`, truncated toward zero.
fn signed_days(item: Option<DateTime<Utc>>, candidate: Option<DateTime<Utc>>) -> Option<i64> {
    Some((item? - candidate?).num_days())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap())
    }

    fn image_item() -> Item {
        let mut item = Item::new(1, MediaKind::Image);
        item.capture_time = at(2024, 3, 1);
        item
    }

    fn video_item() -> Item {
        let mut item = Item::new(1, MediaKind::Video);
        item.capture_time = at(2024, 3, 1);
        item
    }

    fn candidate(id: i64, camera: Option<&str>, hamming: Option<u32>) -> Candidate {
        let mut reference = ReferenceEntry::new(id, MediaKind::Image);
        reference.camera_name = camera.map(String::from);
        reference.capture_time = at(2024, 2, 20);
        Candidate {
            reference,
            thumb_distance: None,
            hamming_distance: hamming,
        }
    }

    fn video_candidate(id: i64, location: Option<&str>, thumb: Option<f64>) -> Candidate {
        let mut reference = ReferenceEntry::new(id, MediaKind::Video);
        reference.location = location.map(String::from);
        reference.capture_time = at(2024, 2, 25);
        Candidate {
            reference,
            thumb_distance: thumb,
            hamming_distance: None,
        }
    }

    #[test]
    fn test_camera_name_dominates_raw_distance() {
        let a = candidate(10, Some("Canon"), Some(4));
        let b = candidate(11, None, Some(2));
        assert_eq!(auto_select(&image_item(), &[a, b]), Some(10));
    }

    #[test]
    fn test_pair_rule_requires_known_timestamps() {
        let mut a = candidate(10, Some("Canon"), Some(4));
        a.reference.capture_time = None;
        let b = candidate(11, None, Some(2));
        assert_eq!(auto_select(&image_item(), &[a, b]), None);
    }

    #[test]
    fn test_pair_rule_window_is_signed() {
        let mut old = candidate(10, Some("Canon"), Some(4));
        old.reference.capture_time = at(2023, 12, 1);
        let b = candidate(11, None, Some(2));
        assert_eq!(auto_select(&image_item(), &[old, b.clone()]), None);

        // Candidate taken after the item: negative difference is within the window
        let mut later = candidate(10, Some("Canon"), Some(4));
        later.reference.capture_time = at(2024, 9, 1);
        assert_eq!(auto_select(&image_item(), &[later, b]), Some(10));
    }

    #[test]
    fn test_pair_rule_is_positional() {
        let a = candidate(10, None, Some(4));
        let b = candidate(11, Some("Canon"), Some(2));
        assert_eq!(auto_select(&image_item(), &[a, b]), None);
    }

    #[test]
    fn test_tied_minimum_is_ambiguous() {
        let candidates = [
            candidate(1, Some("Canon"), Some(3)),
            candidate(2, Some("Nikon"), Some(3)),
            candidate(3, Some("Sony"), Some(7)),
        ];
        assert_eq!(auto_select(&image_item(), &candidates), None);
    }

    #[test]
    fn test_unique_minimum_is_selected_regardless_of_order() {
        let mut candidates = vec![
            candidate(1, Some("Canon"), Some(5)),
            candidate(2, Some("Nikon"), Some(2)),
            candidate(3, Some("Sony"), Some(7)),
            candidate(4, None, Some(0)),
        ];
        assert_eq!(auto_select(&image_item(), &candidates), Some(2));
        candidates.reverse();
        assert_eq!(auto_select(&image_item(), &candidates), Some(2));
        candidates.swap(0, 2);
        assert_eq!(auto_select(&image_item(), &candidates), Some(2));
    }

    #[test]
    fn test_shortlist_window_excludes_distant_candidates() {
        let mut far = candidate(2, Some("Nikon"), Some(1));
        far.reference.capture_time = at(2024, 1, 1);
        let candidates = [
            candidate(1, Some("Canon"), Some(5)),
            far,
            candidate(3, Some("Sony"), Some(7)),
        ];
        assert_eq!(auto_select(&image_item(), &candidates), Some(1));
    }

    #[test]
    fn test_shortlist_window_admits_later_candidates() {
        let mut later = candidate(2, Some("Nikon"), Some(1));
        later.reference.capture_time = at(2024, 5, 1);
        let mut first = candidate(1, Some("Canon"), Some(5));
        first.reference.capture_time = at(2024, 2, 25);
        let mut third = candidate(3, Some("Sony"), Some(7));
        third.reference.capture_time = at(2024, 2, 26);

        assert_eq!(auto_select(&image_item(), &[first, later, third]), Some(2));
    }

    #[test]
    fn test_missing_distance_never_wins() {
        let candidates = [
            candidate(1, Some("Canon"), None),
            candidate(2, Some("Nikon"), None),
            candidate(3, None, Some(1)),
        ];
        assert_eq!(auto_select(&image_item(), &candidates), None);

        let candidates = [
            candidate(1, Some("Canon"), None),
            candidate(2, None, Some(0)),
            candidate(3, None, Some(1)),
        ];
        assert_eq!(auto_select(&image_item(), &candidates), None);
    }

    #[test]
    fn test_video_pair_without_location() {
        let candidates = [video_candidate(1, None, Some(1.0)), video_candidate(2, None, Some(2.0))];
        assert_eq!(auto_select(&video_item(), &candidates), None);

        let candidates = [
            video_candidate(1, Some("Porto"), Some(9.0)),
            video_candidate(2, None, Some(2.0)),
        ];
        assert_eq!(auto_select(&video_item(), &candidates), Some(1));
    }

    #[test]
    fn test_video_shortlist_zero_distance_wins() {
        let candidates = [
            video_candidate(1, Some("Porto"), Some(0.0)),
            video_candidate(2, Some("Lisbon"), Some(4.0)),
            video_candidate(3, None, Some(0.0)),
        ];
        assert_eq!(auto_select(&video_item(), &candidates), Some(1));
    }

    #[test]
    fn test_single_or_no_candidate_is_never_selected() {
        assert_eq!(auto_select(&image_item(), &[]), None);
        let one = [candidate(1, Some("Canon"), Some(0))];
        assert_eq!(auto_select(&image_item(), &one), None);
    }

    #[test]
    fn test_custom_rules() {
        let rules = AutoSelectRules {
            shortlist_window_days: 5,
            ..AutoSelectRules::default()
        };
        let candidates = [
            candidate(1, Some("Canon"), Some(1)),
            candidate(2, Some("Nikon"), Some(2)),
            candidate(3, Some("Sony"), Some(3)),
        ];
        // all candidates are 10 days before the item
        assert_eq!(rules.select(&image_item(), &candidates), None);
        assert_eq!(auto_select(&image_item(), &candidates), Some(1));
    }
}
