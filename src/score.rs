//! ルールベースのフォーム評価

use serde::{Deserialize, Serialize};

use crate::metrics::aggregate::{TrackingStats, VelocityMetrics};
use crate::metrics::angle::JointAngleSample;

/// フォーム評価の品質帯
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormQuality {
    Excellent,
    Good,
    Fair,
    NeedsWork,
}

impl FormQuality {
    /// スコアから品質帯を決める
    pub fn from_score(score: u32) -> Self {
        if score >= 85 {
            Self::Excellent
        } else if score >= 70 {
            Self::Good
        } else if score >= 55 {
            Self::Fair
        } else {
            Self::NeedsWork
        }
    }
}

/// フォーム評価の結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormScore {
    /// 0〜100
    pub overall_score: u32,
    pub form_quality: FormQuality,
    pub strengths: Vec<String>,
    pub issues: Vec<String>,
}

/// 追跡メトリクスからフォームスコアを計算する
///
/// 基準70点に対して、軌道の鉛直性と肘角度の左右差で加減点する。
/// 追跡品質はスコアを動かさず、strengths/issuesにだけ現れる。
pub fn score_form(
    metrics: &VelocityMetrics,
    joint_angles: &[JointAngleSample],
    stats: &TrackingStats,
) -> FormScore {
    let mut score: i32 = 70;
    let mut strengths = Vec::new();
    let mut issues = Vec::new();

    if metrics.path_verticality > 0.7 {
        score += 10;
        strengths.push("Good bar path control".to_string());
    } else if metrics.path_verticality < 0.4 {
        score -= 10;
        issues.push("Bar path has excessive horizontal movement".to_string());
    }

    let asymmetries: Vec<f32> = joint_angles
        .iter()
        .filter_map(|sample| sample.elbow_asymmetry)
        .collect();
    if !asymmetries.is_empty() {
        let avg = asymmetries.iter().sum::<f32>() / asymmetries.len() as f32;
        if avg < 10.0 {
            score += 5;
            strengths.push("Good elbow symmetry".to_string());
        } else if avg > 20.0 {
            score -= 10;
            issues.push(format!(
                "Elbow asymmetry detected ({:.1}° average difference)",
                avg
            ));
        }
    }

    if stats.total() > 0 {
        let ratio = stats.both_wrists_ratio();
        if ratio > 0.9 {
            strengths.push("Excellent tracking quality".to_string());
        } else if ratio < 0.5 {
            issues.push("Tracking was inconsistent - some data may be unreliable".to_string());
        }
    }

    let overall_score = score.clamp(0, 100) as u32;
    FormScore {
        overall_score,
        form_quality: FormQuality::from_score(overall_score),
        strengths,
        issues,
    }
}
