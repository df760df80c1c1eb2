//! 関節角度の計算

use serde::{Deserialize, Serialize};

use crate::pose::{FramePose, Landmark, LandmarkIndex};

/// 1フレーム分の肘角度サンプル
///
/// 左右どちらかだけ計算できたフレームでは平均と左右差を出さない。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JointAngleSample {
    pub frame: u32,
    pub timestamp: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_elbow: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_elbow: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_elbow_angle: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elbow_asymmetry: Option<f32>,
}

/// p2を頂点とする3点の挟角（度）
///
/// いずれかのランドマークの可視性が閾値未満ならNone。
/// 正規化座標のまま計算する（縦横比による歪みは許容する割り切り）。
pub fn joint_angle(
    p1: &Landmark,
    p2: &Landmark,
    p3: &Landmark,
    visibility_threshold: f32,
) -> Option<f32> {
    if !p1.is_valid(visibility_threshold)
        || !p2.is_valid(visibility_threshold)
        || !p3.is_valid(visibility_threshold)
    {
        return None;
    }

    let v1 = (p1.x - p2.x, p1.y - p2.y);
    let v2 = (p3.x - p2.x, p3.y - p2.y);

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let norm1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let norm2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();

    // 縮退（ゼロ長ベクトル）でのゼロ除算はεで避ける
    let cos = (dot / (norm1 * norm2 + 1e-6)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// 肩・肘・手首から両肘の角度を計算する
///
/// 両側とも計算できないフレームはNone
pub fn elbow_angles(pose: &FramePose, visibility_threshold: f32) -> Option<JointAngleSample> {
    let left = joint_angle(
        pose.get(LandmarkIndex::LeftShoulder),
        pose.get(LandmarkIndex::LeftElbow),
        pose.get(LandmarkIndex::LeftWrist),
        visibility_threshold,
    );
    let right = joint_angle(
        pose.get(LandmarkIndex::RightShoulder),
        pose.get(LandmarkIndex::RightElbow),
        pose.get(LandmarkIndex::RightWrist),
        visibility_threshold,
    );

    if left.is_none() && right.is_none() {
        return None;
    }

    let (avg, asymmetry) = match (left, right) {
        (Some(l), Some(r)) => (Some((l + r) / 2.0), Some((l - r).abs())),
        _ => (None, None),
    };

    Some(JointAngleSample {
        frame: pose.frame,
        timestamp: pose.timestamp,
        left_elbow: left,
        right_elbow: right,
        avg_elbow_angle: avg,
        elbow_asymmetry: asymmetry,
    })
}
