//! 前腕延長ヒューリスティックによるバーベル位置の推定

use serde::{Deserialize, Serialize};

use crate::config::TrackingConfig;
use crate::pose::{FramePose, LandmarkIndex};
use crate::tracker::smooth::PointSmoother;

/// バー位置の推定ソース
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarSource {
    /// 両前腕からのグリップ延長推定（最良）
    ForearmExtended,
    /// 手首系フォールバック（片前腕・手首中点・保存オフセットなど）
    WristFallback,
    /// 検出が途切れた間の保持出力
    SmoothedPrediction,
    /// 保持期間を超えてロスト
    Lost,
}

/// 1フレーム分のバー中心推定（ピクセル座標）
#[derive(Debug, Clone, Copy)]
pub struct BarPoint {
    pub x: f32,
    pub y: f32,
    pub frame: u32,
    pub timestamp: f32,
    pub confidence: f32,
    pub source: BarSource,
}

/// 追跡の検出率
#[derive(Debug, Clone, Copy)]
pub struct DetectionStats {
    pub frames_tracked: u32,
    pub frames_with_detection: u32,
    pub detection_rate: f32,
}

/// ポーズからバー中心を推定するトラッカー
///
/// バーは手首より先、手のひらで握られている。肘→手首の前腕ベクトルを
/// 前腕長の一定割合だけ延長した点をグリップ位置とみなし、両グリップの
/// 中点をバー中心とする。前腕が見えないフレームは信頼度を下げながら
/// 手首・肘・保存オフセットで段階的に代替する。
///
/// 1本のビデオにつき1インスタンス。フレームは昇順で与えること。
pub struct BarEstimator {
    visibility_threshold: f32,
    min_visibility: f32,
    extension_factor: f32,
    width: u32,
    height: u32,
    smoother: PointSmoother,
    frames_tracked: u32,
    frames_with_detection: u32,
    // 両前腕が見えたフレームで保存し、片側しか見えないフレームで使う
    left_wrist_offset: Option<(f32, f32)>,
    right_wrist_offset: Option<(f32, f32)>,
    elbow_offset: Option<(f32, f32)>,
}

fn midpoint(a: (f32, f32), b: (f32, f32)) -> (f32, f32) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

impl BarEstimator {
    pub fn new(config: &TrackingConfig, width: u32, height: u32) -> Self {
        Self {
            visibility_threshold: config.visibility_threshold,
            min_visibility: config.min_visibility,
            extension_factor: config.extension_factor,
            width,
            height,
            smoother: PointSmoother::from_config(config),
            frames_tracked: 0,
            frames_with_detection: 0,
            left_wrist_offset: None,
            right_wrist_offset: None,
            elbow_offset: None,
        }
    }

    /// 1フレーム分のポーズを処理し、平滑化済みのバー位置を返す
    ///
    /// ポーズが無い・候補が得られないフレームでも、保持期間内なら
    /// SmoothedPredictionとして前回位置を返す。ロスト中はNone。
    pub fn process(&mut self, frame: u32, timestamp: f32, pose: Option<&FramePose>) -> Option<BarPoint> {
        self.frames_tracked += 1;

        let candidate = pose.and_then(|p| self.raw_candidate(p));

        // 外れ値で保持になったフレームは幾何ソースのまま、
        // 候補が無いフレームの保持はSmoothedPredictionとして出す
        let (raw, confidence, source) = match candidate {
            Some((position, confidence, source)) => (Some(position), confidence, source),
            None => (None, 0.3, BarSource::SmoothedPrediction),
        };

        let (x, y) = self.smoother.update(raw)?;
        self.frames_with_detection += 1;

        Some(BarPoint {
            x,
            y,
            frame,
            timestamp,
            confidence,
            source,
        })
    }

    /// 前腕ベクトルをグリップ位置まで延長する
    fn extend_grip(&self, elbow: (f32, f32), wrist: (f32, f32)) -> (f32, f32) {
        let dx = wrist.0 - elbow.0;
        let dy = wrist.1 - elbow.1;
        (
            wrist.0 + dx * self.extension_factor,
            wrist.1 + dy * self.extension_factor,
        )
    }

    /// ランドマークから生のバー候補を求める（段階的フォールバック）
    ///
    /// 上の段ほど信頼でき、下の段ほど信頼度に減衰係数が掛かる。
    fn raw_candidate(&mut self, pose: &FramePose) -> Option<((f32, f32), f32, BarSource)> {
        let left_wrist = pose.get(LandmarkIndex::LeftWrist);
        let right_wrist = pose.get(LandmarkIndex::RightWrist);
        let left_elbow = pose.get(LandmarkIndex::LeftElbow);
        let right_elbow = pose.get(LandmarkIndex::RightElbow);

        let lw = left_wrist.to_pixel(self.width, self.height);
        let rw = right_wrist.to_pixel(self.width, self.height);
        let le = left_elbow.to_pixel(self.width, self.height);
        let re = right_elbow.to_pixel(self.width, self.height);

        let threshold = self.visibility_threshold;
        let left_forearm = left_wrist.is_valid(threshold) && left_elbow.is_valid(threshold);
        let right_forearm = right_wrist.is_valid(threshold) && right_elbow.is_valid(threshold);

        if left_forearm && right_forearm {
            // 最良ケース: 両グリップの中点
            let left_grip = self.extend_grip(le, lw);
            let right_grip = self.extend_grip(re, rw);
            let center = midpoint(left_grip, right_grip);

            // 片側ロスト時に使う相対オフセットを記憶しておく
            self.left_wrist_offset = Some((center.0 - lw.0, center.1 - lw.1));
            self.right_wrist_offset = Some((center.0 - rw.0, center.1 - rw.1));
            let elbow_mid = midpoint(le, re);
            self.elbow_offset = Some((center.0 - elbow_mid.0, center.1 - elbow_mid.1));

            let confidence = left_wrist
                .visibility
                .min(right_wrist.visibility)
                .min(left_elbow.visibility)
                .min(right_elbow.visibility);
            return Some((center, confidence, BarSource::ForearmExtended));
        }

        if right_forearm {
            let grip = self.extend_grip(re, rw);
            let confidence = right_wrist.visibility.min(right_elbow.visibility) * 0.85;
            return Some((grip, confidence, BarSource::WristFallback));
        }

        if left_forearm {
            let grip = self.extend_grip(le, lw);
            let confidence = left_wrist.visibility.min(left_elbow.visibility) * 0.85;
            return Some((grip, confidence, BarSource::WristFallback));
        }

        // 前腕が組めない場合は可視性の下限だけ満たす手首で代替する
        let min_visibility = self.min_visibility;
        if left_wrist.is_valid(min_visibility) && right_wrist.is_valid(min_visibility) {
            let confidence = left_wrist.visibility.min(right_wrist.visibility) * 0.7;
            return Some((midpoint(lw, rw), confidence, BarSource::WristFallback));
        }

        if right_wrist.is_valid(min_visibility) {
            if let Some(offset) = self.right_wrist_offset {
                let position = (rw.0 + offset.0, rw.1 + offset.1);
                return Some((position, right_wrist.visibility * 0.6, BarSource::WristFallback));
            }
            return Some((rw, right_wrist.visibility * 0.5, BarSource::WristFallback));
        }

        if left_wrist.is_valid(min_visibility) {
            if let Some(offset) = self.left_wrist_offset {
                let position = (lw.0 + offset.0, lw.1 + offset.1);
                return Some((position, left_wrist.visibility * 0.6, BarSource::WristFallback));
            }
            return Some((lw, left_wrist.visibility * 0.5, BarSource::WristFallback));
        }

        if let Some(offset) = self.elbow_offset {
            if left_elbow.is_valid(min_visibility) && right_elbow.is_valid(min_visibility) {
                let elbow_mid = midpoint(le, re);
                let position = (elbow_mid.0 + offset.0, elbow_mid.1 + offset.1);
                let confidence = left_elbow.visibility.min(right_elbow.visibility) * 0.5;
                return Some((position, confidence, BarSource::WristFallback));
            }
        }

        // 最終手段: 可視性を無視した手首座標の中点
        // ランドマーク座標は可視性が低くても位置として使えることが多い
        Some((midpoint(lw, rw), 0.3, BarSource::WristFallback))
    }

    pub fn stats(&self) -> DetectionStats {
        let detection_rate = if self.frames_tracked > 0 {
            self.frames_with_detection as f32 / self.frames_tracked as f32
        } else {
            0.0
        };
        DetectionStats {
            frames_tracked: self.frames_tracked,
            frames_with_detection: self.frames_with_detection,
            detection_rate,
        }
    }

    pub fn reset(&mut self) {
        self.smoother.reset();
        self.frames_tracked = 0;
        self.frames_with_detection = 0;
        self.left_wrist_offset = None;
        self.right_wrist_offset = None;
        self.elbow_offset = None;
    }
}
