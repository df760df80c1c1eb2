//! 設定ファイル (config.toml) の読み込み

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// アプリケーション設定
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// バー追跡の設定
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// メトリクス計算の設定
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// 人物選択の設定
    #[serde(default)]
    pub selection: SelectionConfig,
}

/// バー位置推定と平滑化の設定
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// ランドマーク可視性の閾値（前腕ベースの主要推定に使う）
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
    /// フォールバック推定まで含めた可視性の下限
    #[serde(default = "default_min_visibility")]
    pub min_visibility: f32,
    /// 前腕ベクトルをグリップ位置まで延長する割合
    #[serde(default = "default_extension_factor")]
    pub extension_factor: f32,
    /// EMA平滑化係数（大きいほど追従が速い）
    #[serde(default = "default_smoothing_alpha")]
    pub smoothing_alpha: f32,
    /// これを超える1フレームの跳びは外れ値として棄却（ピクセル）
    #[serde(default = "default_max_jump_pixels")]
    pub max_jump_pixels: f32,
    /// 出力に使う移動平均バッファの長さ
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// 検出が途切れてから最後の位置を保持するフレーム数
    #[serde(default = "default_persistence_frames")]
    pub persistence_frames: u32,
}

fn default_visibility_threshold() -> f32 {
    0.3
}

fn default_min_visibility() -> f32 {
    0.01
}

fn default_extension_factor() -> f32 {
    0.18
}

fn default_smoothing_alpha() -> f32 {
    0.5
}

fn default_max_jump_pixels() -> f32 {
    500.0
}

fn default_buffer_size() -> usize {
    3
}

fn default_persistence_frames() -> u32 {
    15
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: default_visibility_threshold(),
            min_visibility: default_min_visibility(),
            extension_factor: default_extension_factor(),
            smoothing_alpha: default_smoothing_alpha(),
            max_jump_pixels: default_max_jump_pixels(),
            buffer_size: default_buffer_size(),
            persistence_frames: default_persistence_frames(),
        }
    }
}

/// レップ検出と進捗ログの設定
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// レップ検出に必要な最小軌跡点数
    #[serde(default = "default_min_rep_points")]
    pub min_rep_points: usize,
    /// レップ検出に必要な最小鉛直変位（ピクセル）
    #[serde(default = "default_min_rep_displacement")]
    pub min_rep_displacement: f32,
    /// クロッシングが無くても1レップとみなす変位（ピクセル）
    #[serde(default = "default_single_rep_displacement")]
    pub single_rep_displacement: f32,
    /// 進捗ログを出すフレーム間隔（0で無効）
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u32,
}

fn default_min_rep_points() -> usize {
    10
}

fn default_min_rep_displacement() -> f32 {
    50.0
}

fn default_single_rep_displacement() -> f32 {
    100.0
}

fn default_progress_interval() -> u32 {
    50
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_rep_points: default_min_rep_points(),
            min_rep_displacement: default_min_rep_displacement(),
            single_rep_displacement: default_single_rep_displacement(),
            progress_interval: default_progress_interval(),
        }
    }
}

/// 複数人フレームでの追跡対象選択の設定
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    /// これ未満の信頼度の人物検出は無視する
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// 指定bboxとのIoUがこれ未満なら同一人物とみなさない
    #[serde(default = "default_min_iou")]
    pub min_iou: f32,
    /// 追跡ROIを選択bboxから広げる量（正規化座標）
    #[serde(default = "default_roi_padding")]
    pub roi_padding: f32,
}

fn default_min_confidence() -> f32 {
    0.5
}

fn default_min_iou() -> f32 {
    0.1
}

fn default_roi_padding() -> f32 {
    0.1
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            min_iou: default_min_iou(),
            roi_padding: default_roi_padding(),
        }
    }
}

impl Config {
    /// TOMLファイルから設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 読み込みに失敗したら警告を出して既定値を使う
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config file: {}. Using defaults.", e);
                Self::default()
            }
        }
    }
}
