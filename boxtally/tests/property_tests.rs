use boxtally::record::{DetectionRecord, ScaledRecord};
use boxtally::scaler::{scale_bbox, scale_records};
use boxtally::tally::tally_classes;
use boxtally::{ImageDimensions, MismatchPolicy};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

const CLASSES: [&str; 5] = ["wood", "metal", "pet", "hdpe", "cardboard"];

fn detection() -> impl Strategy<Value = ([f64; 4], usize, f64)> {
    (
        prop::array::uniform4(0.0f64..=1.0),
        0..CLASSES.len(),
        0.0f64..=1.0,
    )
}

fn frame() -> impl Strategy<Value = Vec<([f64; 4], usize, f64)>> {
    prop::collection::vec(detection(), 0..6)
}

fn to_record(index: usize, detections: &[([f64; 4], usize, f64)]) -> DetectionRecord {
    let bboxes: Vec<Value> = detections.iter().map(|(b, _, _)| json!(b)).collect();
    let labels: Vec<&str> = detections.iter().map(|(_, c, _)| CLASSES[*c]).collect();
    let confs: Vec<f64> = detections.iter().map(|(_, _, conf)| *conf).collect();

    let mut fields = Map::new();
    fields.insert("image_file".to_string(), json!("frame.png"));
    fields.insert("bboxes".to_string(), Value::Array(bboxes));
    fields.insert("labels".to_string(), json!(labels));
    fields.insert("vals".to_string(), json!({ "confs": confs }));
    DetectionRecord::new(index, index + 1, fields)
}

fn scale(frames: &[Vec<([f64; 4], usize, f64)>], dims: ImageDimensions) -> Vec<ScaledRecord> {
    let records: Vec<DetectionRecord> = frames
        .iter()
        .enumerate()
        .map(|(i, f)| to_record(i, f))
        .collect();
    scale_records(&records, dims, MismatchPolicy::Abort)
        .unwrap()
        .records
}

proptest! {
    #[test]
    fn scaled_coordinates_stay_within_the_frame(
        bbox in prop::array::uniform4(0.0f64..=1.0),
        width in 1u32..5000,
        height in 1u32..5000,
    ) {
        let dims = ImageDimensions { width, height };
        let [x1, y1, x2, y2] = scale_bbox(bbox, dims);

        for x in [x1, x2] {
            prop_assert!((0..=i64::from(width)).contains(&x));
        }
        for y in [y1, y2] {
            prop_assert!((0..=i64::from(height)).contains(&y));
        }
        prop_assert_eq!(x1, (bbox[0] * f64::from(width)).floor() as i64);
        prop_assert_eq!(y2, (bbox[3] * f64::from(height)).floor() as i64);
    }

    #[test]
    fn tally_is_independent_of_record_order(
        frames in prop::collection::vec(frame(), 0..8),
    ) {
        let dims = ImageDimensions { width: 640, height: 480 };
        let forward = tally_classes(&scale(&frames, dims));

        let mut reversed_frames = frames.clone();
        reversed_frames.reverse();
        let reversed = tally_classes(&scale(&reversed_frames, dims));

        prop_assert_eq!(forward, reversed);
    }

    #[test]
    fn tally_total_equals_detection_count(
        frames in prop::collection::vec(frame(), 0..8),
    ) {
        let dims = ImageDimensions { width: 1920, height: 1080 };
        let tally = tally_classes(&scale(&frames, dims));
        let detections: usize = frames.iter().map(Vec::len).sum();
        prop_assert_eq!(tally.total(), detections);
    }

    #[test]
    fn rescaling_gives_identical_output(
        frames in prop::collection::vec(frame(), 0..4),
    ) {
        let dims = ImageDimensions { width: 300, height: 200 };
        prop_assert_eq!(scale(&frames, dims), scale(&frames, dims));
    }
}
