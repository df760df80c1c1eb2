//! ポーズ推定バックエンドの出力を正準スキームへ変換する
//!
//! 上流サービスは2系統あり、出力するランドマーク集合が異なる。
//! 33ランドマークの正準スキームに正規化してから下流に渡す。

use serde::Deserialize;

use crate::config::SelectionConfig;
use crate::pose::landmark::{FramePose, Landmark, LandmarkIndex};

/// ポーズ推定バックエンドの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseBackend {
    /// 正準スキームと同じ33ランドマークを出力する
    Mediapipe,
    /// COCO 17キーポイントを出力する
    Yolo,
}

/// 上流サービスが記録した生のランドマーク
#[derive(Debug, Clone, Deserialize)]
pub struct RawLandmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    pub visibility: f32,
    #[serde(default)]
    pub name: Option<String>,
}

/// COCO 17キーポイント → 正準スキームの対応表
///
/// 配列位置がCOCO側のインデックス。対応の無い正準スロット
/// （顔の細部・手指・足先など）は可視性0のまま残る。
pub const COCO_TO_CANONICAL: [LandmarkIndex; 17] = [
    LandmarkIndex::Nose,
    LandmarkIndex::LeftEye,
    LandmarkIndex::RightEye,
    LandmarkIndex::LeftEar,
    LandmarkIndex::RightEar,
    LandmarkIndex::LeftShoulder,
    LandmarkIndex::RightShoulder,
    LandmarkIndex::LeftElbow,
    LandmarkIndex::RightElbow,
    LandmarkIndex::LeftWrist,
    LandmarkIndex::RightWrist,
    LandmarkIndex::LeftHip,
    LandmarkIndex::RightHip,
    LandmarkIndex::LeftKnee,
    LandmarkIndex::RightKnee,
    LandmarkIndex::LeftAnkle,
    LandmarkIndex::RightAnkle,
];

/// バックエンド出力を正準ポーズに変換する
///
/// ランドマーク数がバックエンドの期待数に満たない場合は
/// ポーズ無しとして扱う（部分的な出力を推測で埋めない）。
pub fn canonicalize(
    backend: PoseBackend,
    raw: &[RawLandmark],
    frame: u32,
    timestamp: f32,
) -> Option<FramePose> {
    let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];

    match backend {
        PoseBackend::Mediapipe => {
            if raw.len() < LandmarkIndex::COUNT {
                return None;
            }
            for (slot, lm) in landmarks.iter_mut().zip(raw.iter()) {
                *slot = Landmark {
                    x: lm.x,
                    y: lm.y,
                    z: lm.z,
                    visibility: lm.visibility,
                };
            }
        }
        PoseBackend::Yolo => {
            if raw.len() < COCO_TO_CANONICAL.len() {
                return None;
            }
            for (index, lm) in COCO_TO_CANONICAL.iter().zip(raw.iter()) {
                landmarks[*index as usize] = Landmark {
                    x: lm.x,
                    y: lm.y,
                    z: lm.z,
                    visibility: lm.visibility,
                };
            }
        }
    }

    Some(FramePose::new(frame, timestamp, landmarks))
}

/// 1人分の人物検出（セッションファイル内の表現）
#[derive(Debug, Clone, Deserialize)]
pub struct PersonDetection {
    /// 正規化bbox [x1, y1, x2, y2]
    pub bbox: [f32; 4],
    /// 人物検出の信頼度
    pub confidence: f32,
    #[serde(default)]
    pub landmarks: Vec<RawLandmark>,
}

impl PersonDetection {
    pub fn area(&self) -> f32 {
        (self.bbox[2] - self.bbox[0]).max(0.0) * (self.bbox[3] - self.bbox[1]).max(0.0)
    }
}

/// bbox同士のIoU（正規化座標）
pub fn bbox_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - intersection;

    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

/// フレーム内の人物から追跡対象を1人選ぶ
///
/// 対象bboxの指定があればIoU最大の人物（min_iou未満は不一致扱い）、
/// 指定が無ければbbox面積最大の人物を返す。
pub fn select_person<'a>(
    people: &'a [PersonDetection],
    target: Option<&[f32; 4]>,
    config: &SelectionConfig,
) -> Option<&'a PersonDetection> {
    let mut best: Option<&PersonDetection> = None;
    let mut best_score = 0.0f32;

    for person in people {
        if person.confidence < config.min_confidence {
            continue;
        }

        let score = match target {
            Some(t) => {
                let iou = bbox_iou(&person.bbox, t);
                if iou < config.min_iou {
                    continue;
                }
                iou
            }
            None => person.area(),
        };

        if score > best_score {
            best_score = score;
            best = Some(person);
        }
    }

    best
}

/// ポーズ推定に使う追跡ROIを導出する
///
/// 選択bboxがあればpaddingぶん広げて [0,1] にクランプ、
/// 無ければ既定の下側3/4の帯（バーベルと挙上者が映る範囲）。
pub fn tracking_roi(selected: Option<&[f32; 4]>, padding: f32) -> [f32; 4] {
    match selected {
        Some(b) => [
            (b[0] - padding).max(0.0),
            (b[1] - padding).max(0.0),
            (b[2] + padding).min(1.0),
            (b[3] + padding).min(1.0),
        ],
        None => [0.0, 0.25, 1.0, 1.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(x: f32, y: f32, visibility: f32) -> RawLandmark {
        RawLandmark {
            x,
            y,
            z: 0.0,
            visibility,
            name: None,
        }
    }

    #[test]
    fn test_canonicalize_mediapipe_passthrough() {
        let mut landmarks = Vec::new();
        for i in 0..LandmarkIndex::COUNT {
            landmarks.push(raw(i as f32 * 0.01, 0.5, 0.9));
        }
        let pose = canonicalize(PoseBackend::Mediapipe, &landmarks, 3, 0.1).unwrap();
        assert_eq!(pose.frame, 3);
        assert!((pose.get(LandmarkIndex::LeftWrist).x - 0.15).abs() < 1e-6);
        assert_eq!(pose.get(LandmarkIndex::LeftWrist).visibility, 0.9);
    }

    #[test]
    fn test_canonicalize_mediapipe_short_output_is_no_pose() {
        let landmarks = vec![raw(0.5, 0.5, 0.9); 20];
        assert!(canonicalize(PoseBackend::Mediapipe, &landmarks, 0, 0.0).is_none());
    }

    #[test]
    fn test_canonicalize_yolo_scatter() {
        let mut landmarks = Vec::new();
        for i in 0..17 {
            landmarks.push(raw(i as f32 * 0.05, 0.4, 0.8));
        }
        let pose = canonicalize(PoseBackend::Yolo, &landmarks, 0, 0.0).unwrap();

        // COCOの9番（左手首）が正準15番に入る
        assert!((pose.get(LandmarkIndex::LeftWrist).x - 0.45).abs() < 1e-6);
        assert_eq!(pose.get(LandmarkIndex::LeftWrist).visibility, 0.8);
        // 対応の無いスロットは可視性0
        assert_eq!(pose.get(LandmarkIndex::LeftThumb).visibility, 0.0);
        assert_eq!(pose.get(LandmarkIndex::MouthLeft).visibility, 0.0);
    }

    #[test]
    fn test_bbox_iou() {
        let a = [0.0, 0.0, 0.5, 0.5];
        assert!((bbox_iou(&a, &a) - 1.0).abs() < 1e-6);

        let b = [0.25, 0.0, 0.75, 0.5];
        // 交差 0.25*0.5、結合 0.25+0.25-0.125
        assert!((bbox_iou(&a, &b) - 0.125 / 0.375).abs() < 1e-6);

        let c = [0.6, 0.6, 0.9, 0.9];
        assert_eq!(bbox_iou(&a, &c), 0.0);
    }

    fn person(bbox: [f32; 4], confidence: f32) -> PersonDetection {
        PersonDetection {
            bbox,
            confidence,
            landmarks: Vec::new(),
        }
    }

    #[test]
    fn test_select_person_largest_without_target() {
        let people = vec![
            person([0.0, 0.0, 0.2, 0.2], 0.9),
            person([0.3, 0.3, 0.9, 0.9], 0.9),
        ];
        let config = SelectionConfig::default();
        let selected = select_person(&people, None, &config).unwrap();
        assert_eq!(selected.bbox, [0.3, 0.3, 0.9, 0.9]);
    }

    #[test]
    fn test_select_person_by_iou_with_target() {
        let people = vec![
            person([0.0, 0.0, 0.3, 0.3], 0.9),
            person([0.5, 0.5, 0.8, 0.8], 0.9),
        ];
        let config = SelectionConfig::default();
        let target = [0.5, 0.5, 0.8, 0.8];
        let selected = select_person(&people, Some(&target), &config).unwrap();
        assert_eq!(selected.bbox, [0.5, 0.5, 0.8, 0.8]);

        // どの人物ともIoUが閾値未満なら選ばない
        let far = [0.0, 0.9, 0.05, 0.95];
        assert!(select_person(&people, Some(&far), &config).is_none());
    }

    #[test]
    fn test_select_person_skips_low_confidence() {
        let people = vec![
            person([0.0, 0.0, 0.9, 0.9], 0.3),
            person([0.1, 0.1, 0.4, 0.4], 0.8),
        ];
        let config = SelectionConfig::default();
        let selected = select_person(&people, None, &config).unwrap();
        assert_eq!(selected.bbox, [0.1, 0.1, 0.4, 0.4]);
    }

    #[test]
    fn test_tracking_roi() {
        let roi = tracking_roi(None, 0.1);
        assert_eq!(roi, [0.0, 0.25, 1.0, 1.0]);

        let bbox = [0.3, 0.05, 0.6, 0.95];
        let roi = tracking_roi(Some(&bbox), 0.1);
        assert!((roi[0] - 0.2).abs() < 1e-6);
        assert_eq!(roi[1], 0.0);
        assert!((roi[2] - 0.7).abs() < 1e-6);
        assert_eq!(roi[3], 1.0);
    }
}
