//! Cross-stage reconciliation of binary and specific detections.

use denar_models::{RawDetection, ReconciledDetection};

use crate::config::ENSEMBLE_MATCH_IOU;
use crate::geometry::detection_iou;

/// Confirm specific detections with overlapping binary detections.
///
/// Each binary detection is matched to the specific detection it overlaps
/// most (IoU above [`ENSEMBLE_MATCH_IOU`], first maximum wins). Matched
/// specific detections carry both confidences; unmatched ones are dropped.
/// When either side is empty, or nothing matched at all, the specific
/// detections are returned unchanged.
pub fn reconcile(binary: &[RawDetection], specific: &[RawDetection]) -> Vec<ReconciledDetection> {
    let passthrough = || specific.iter().cloned().map(ReconciledDetection::from).collect();

    if binary.is_empty() || specific.is_empty() {
        return passthrough();
    }

    let matched: Vec<ReconciledDetection> = binary
        .iter()
        .filter_map(|b| {
            best_match(b, specific).map(|s| ReconciledDetection::confirmed(s.clone(), b))
        })
        .collect();

    if matched.is_empty() {
        passthrough()
    } else {
        matched
    }
}

/// Specific detection with the highest IoU against `binary`, if above the match threshold.
fn best_match<'a>(binary: &RawDetection, specific: &'a [RawDetection]) -> Option<&'a RawDetection> {
    let mut best: Option<(&RawDetection, f32)> = None;
    for candidate in specific {
        let overlap = detection_iou(binary, candidate);
        if overlap > ENSEMBLE_MATCH_IOU && best.map_or(true, |(_, iou)| overlap > iou) {
            best = Some((candidate, overlap));
        }
    }
    best.map(|(det, _)| det)
}
