// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// BlazePose body landmark names, in model output order.
pub const BLAZEPOSE_LANDMARKS: [&str; 33] = [
    "nose",
    "left_eye_inner",
    "left_eye",
    "left_eye_outer",
    "right_eye_inner",
    "right_eye",
    "right_eye_outer",
    "left_ear",
    "right_ear",
    "mouth_left",
    "mouth_right",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_pinky",
    "right_pinky",
    "left_index",
    "right_index",
    "left_thumb",
    "right_thumb",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
    "left_heel",
    "right_heel",
    "left_foot_index",
    "right_foot_index",
];

/// BlazePose skeleton (pairs of landmark indices).
pub const BLAZEPOSE_CONNECTIONS: [[usize; 2]; 35] = [
    // face
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 7],
    [0, 4],
    [4, 5],
    [5, 6],
    [6, 8],
    [9, 10],
    // torso and arms
    [11, 12],
    [11, 13],
    [13, 15],
    [15, 17],
    [15, 19],
    [15, 21],
    [17, 19],
    [12, 14],
    [14, 16],
    [16, 18],
    [16, 20],
    [16, 22],
    [18, 20],
    [11, 23],
    [12, 24],
    [23, 24],
    // legs
    [23, 25],
    [24, 26],
    [25, 27],
    [26, 28],
    [27, 29],
    [28, 30],
    [29, 31],
    [30, 32],
    [27, 31],
    [28, 32],
];

/// COCO keypoint names, in model output order.
pub const COCO_KEYPOINTS: [&str; 17] = [
    "nose",
    "left_eye",
    "right_eye",
    "left_ear",
    "right_ear",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
];

/// COCO-Pose dataset skeleton structure (pairs of keypoint indices)
pub const COCO_SKELETON: [[usize; 2]; 19] = [
    [15, 13], // left ankle to left knee
    [13, 11], // left knee to left hip
    [16, 14], // right ankle to right knee
    [14, 12], // right knee to right hip
    [11, 12], // left hip to right hip
    [5, 11],  // left shoulder to left hip
    [6, 12],  // right shoulder to right hip
    [5, 6],   // left shoulder to right shoulder
    [5, 7],   // left shoulder to left elbow
    [6, 8],   // right shoulder to right elbow
    [7, 9],   // left elbow to left wrist
    [8, 10],  // right elbow to right wrist
    [1, 2],   // left eye to right eye
    [0, 1],   // nose to left eye
    [0, 2],   // nose to right eye
    [1, 3],   // left eye to left ear
    [2, 4],   // right eye to right ear
    [3, 5],   // left ear to left shoulder
    [4, 6],   // right ear to right shoulder
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connections_reference_valid_landmarks() {
        for [a, b] in BLAZEPOSE_CONNECTIONS {
            assert!(a < BLAZEPOSE_LANDMARKS.len() && b < BLAZEPOSE_LANDMARKS.len());
        }
        for [a, b] in COCO_SKELETON {
            assert!(a < COCO_KEYPOINTS.len() && b < COCO_KEYPOINTS.len());
        }
    }

    #[test]
    fn test_no_duplicate_blazepose_edges() {
        for (i, [a, b]) in BLAZEPOSE_CONNECTIONS.iter().enumerate() {
            for [c, d] in &BLAZEPOSE_CONNECTIONS[i + 1..] {
                assert!(!((a == c && b == d) || (a == d && b == c)), "duplicate edge {a}-{b}");
            }
        }
    }
}
