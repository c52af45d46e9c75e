//! Box overlap and non-maximum suppression.

use denar_models::RawDetection;

/// Intersection over union of two `[x1, y1, x2, y2]` boxes.
///
/// Corner ordering is not validated. Returns 0.0 when the union is empty or
/// negative, so the result is always finite.
pub fn iou(a: [f32; 4], b: [f32; 4]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);

    let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - intersection;

    if union > 0.0 && intersection.is_finite() {
        intersection / union
    } else {
        0.0
    }
}

/// IoU of two detections' boxes.
pub fn detection_iou(a: &RawDetection, b: &RawDetection) -> f32 {
    iou(a.bbox().to_array(), b.bbox().to_array())
}

/// Class-aware non-maximum suppression.
///
/// Detections are sorted by descending confidence; a detection is dropped
/// when a kept one of the same class overlaps it by more than `iou_threshold`.
pub fn non_max_suppression(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    if detections.len() < 2 {
        return detections;
    }

    detections.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));

    let mut keep: Vec<RawDetection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = keep.iter().any(|kept| {
            kept.class_id() == candidate.class_id()
                && detection_iou(kept, &candidate) > iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use denar_models::BoundingBox;

    fn det(bbox: [f32; 4], confidence: f32, class_id: usize) -> RawDetection {
        let bbox = BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]).unwrap();
        RawDetection::new(bbox, confidence, class_id, format!("class_{}", class_id)).unwrap()
    }

    #[test]
    fn test_iou_identical() {
        let a = [0.0, 0.0, 100.0, 50.0];
        assert!((iou(a, a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_symmetric() {
        let a = [0.0, 0.0, 100.0, 50.0];
        let b = [2.0, 2.0, 98.0, 48.0];
        assert_eq!(iou(a, b), iou(b, a));
        assert!(iou(a, b) > 0.8);
    }

    #[test]
    fn test_iou_disjoint() {
        assert_eq!(iou([0.0, 0.0, 10.0, 10.0], [20.0, 20.0, 30.0, 30.0]), 0.0);
        // Touching edges share no area
        assert_eq!(iou([0.0, 0.0, 10.0, 10.0], [10.0, 0.0, 20.0, 10.0]), 0.0);
    }

    #[test]
    fn test_iou_degenerate() {
        let point = [5.0, 5.0, 5.0, 5.0];
        assert_eq!(iou(point, point), 0.0);
        assert_eq!(iou([0.0, 0.0, 0.0, 10.0], [0.0, 0.0, 10.0, 10.0]), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        // Intersection 50, union 150
        let value = iou([0.0, 0.0, 10.0, 10.0], [5.0, 0.0, 15.0, 10.0]);
        assert!((value - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_same_class() {
        let kept = non_max_suppression(
            vec![
                det([0.0, 0.0, 100.0, 100.0], 0.6, 0),
                det([2.0, 2.0, 100.0, 100.0], 0.9, 0),
                det([200.0, 200.0, 300.0, 300.0], 0.5, 0),
            ],
            0.5,
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence(), 0.9);
        assert_eq!(kept[1].confidence(), 0.5);
    }

    #[test]
    fn test_nms_keeps_other_classes() {
        let kept = non_max_suppression(
            vec![
                det([0.0, 0.0, 100.0, 100.0], 0.9, 0),
                det([0.0, 0.0, 100.0, 100.0], 0.8, 1),
            ],
            0.5,
        );
        assert_eq!(kept.len(), 2);
    }
}
