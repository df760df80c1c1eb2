//! 解析レポートの組み立てと入出力

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::metrics::aggregate::{TrackingStats, VelocityMetrics};
use crate::metrics::angle::JointAngleSample;
use crate::metrics::velocity::VelocitySample;
use crate::pipeline::VideoMeta;
use crate::score::FormScore;
use crate::tracker::bar::{BarPoint, BarSource};

/// レポート内の軌跡点（同フレームの速さをジョイン済み）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarPathPoint {
    pub x: f32,
    pub y: f32,
    pub frame: u32,
    pub timestamp: f32,
    pub confidence: f32,
    pub source: BarSource,
    /// 同フレームの速さ (px/s)。先頭点など対応サンプルが無ければ省略
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

/// 1本のビデオの解析レポート
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub video: VideoMeta,
    pub bar_path: Vec<BarPathPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_metrics: Option<VelocityMetrics>,
    pub joint_angles: Vec<JointAngleSample>,
    pub tracking_stats: TrackingStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_analysis: Option<FormScore>,
    /// レポート生成時刻 (RFC 3339)
    pub generated_at: String,
}

/// 現在時刻のRFC 3339表現
pub fn generated_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// 軌跡点列に同フレームの速度サンプルをジョインする
///
/// どちらもフレーム昇順である前提（パイプラインが保証する）
pub fn build_bar_path(trajectory: &[BarPoint], velocities: &[VelocitySample]) -> Vec<BarPathPoint> {
    let mut vi = 0;
    trajectory
        .iter()
        .map(|p| {
            while vi < velocities.len() && velocities[vi].frame < p.frame {
                vi += 1;
            }
            let speed = velocities
                .get(vi)
                .filter(|v| v.frame == p.frame)
                .map(|v| v.speed);
            BarPathPoint {
                x: p.x,
                y: p.y,
                frame: p.frame,
                timestamp: p.timestamp,
                confidence: p.confidence,
                source: p.source,
                speed,
            }
        })
        .collect()
}

/// レポートをJSONファイルに保存
pub fn save_report<P: AsRef<Path>>(path: P, report: &AnalysisReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}

/// JSONファイルからレポートを読み込み
pub fn load_report<P: AsRef<Path>>(path: P) -> Result<AnalysisReport> {
    let content = fs::read_to_string(path)?;
    let report: AnalysisReport = serde_json::from_str(&content)?;
    Ok(report)
}
