//! ビデオ全体のメトリクス集計

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::metrics::reps::count_reps;
use crate::metrics::velocity::VelocitySample;
use crate::tracker::bar::{BarPoint, BarSource};

/// ビデオ全体の速度・変位サマリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityMetrics {
    /// 上昇方向のピーク速度 (px/s)
    pub peak_concentric_velocity: f32,
    /// 下降方向のピーク速度の絶対値 (px/s)
    pub peak_eccentric_velocity: f32,
    /// 全サンプルの速さの平均 (px/s)
    pub average_speed: f32,
    /// Y座標の範囲（ピクセル）
    pub vertical_displacement: f32,
    /// X座標の範囲（ピクセル）
    pub horizontal_deviation: f32,
    /// 1.0に近いほど鉛直な軌道 [0,1]
    pub path_verticality: f32,
    pub estimated_reps: u32,
}

/// 軌跡と速度列からサマリを計算する
///
/// 軌跡が2点未満、または有効な速度サンプルが無ければNone
pub fn summarize(
    trajectory: &[BarPoint],
    velocities: &[VelocitySample],
    config: &AnalysisConfig,
) -> Option<VelocityMetrics> {
    if trajectory.len() < 2 || velocities.is_empty() {
        return None;
    }

    let mut min_x = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for p in trajectory {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    let displacement = max_y - min_y;
    let deviation = max_x - min_x;

    let mut peak_up = f32::NEG_INFINITY;
    let mut peak_down = f32::INFINITY;
    let mut speed_sum = 0.0;
    for v in velocities {
        peak_up = peak_up.max(v.vertical_velocity);
        peak_down = peak_down.min(v.vertical_velocity);
        speed_sum += v.speed;
    }

    let y_positions: Vec<f32> = trajectory.iter().map(|p| p.y).collect();

    Some(VelocityMetrics {
        peak_concentric_velocity: peak_up,
        peak_eccentric_velocity: peak_down.abs(),
        average_speed: speed_sum / velocities.len() as f32,
        vertical_displacement: displacement,
        horizontal_deviation: deviation,
        // 変位ゼロでも発散しないよう分母に+1
        path_verticality: 1.0 - (deviation / (displacement + 1.0)).min(1.0),
        estimated_reps: count_reps(&y_positions, displacement, config),
    })
}

/// 推定ソース別のフレーム数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingStats {
    /// 両前腕ベースで推定できたフレーム
    pub both_wrists: u32,
    /// 手首系フォールバックで推定したフレーム
    pub single_wrist: u32,
    /// 保持出力で埋めたフレーム
    pub fallback: u32,
    /// 出力が無かったフレーム
    pub lost: u32,
}

impl TrackingStats {
    /// 1フレーム分の結果を対応するバケツに足す。Noneはロスト。
    pub fn record(&mut self, source: Option<BarSource>) {
        match source {
            Some(BarSource::ForearmExtended) => self.both_wrists += 1,
            Some(BarSource::WristFallback) => self.single_wrist += 1,
            Some(BarSource::SmoothedPrediction) => self.fallback += 1,
            Some(BarSource::Lost) | None => self.lost += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.both_wrists + self.single_wrist + self.fallback + self.lost
    }

    /// 両前腕ベースで追跡できた割合
    pub fn both_wrists_ratio(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.both_wrists as f32 / total as f32
        }
    }
}
