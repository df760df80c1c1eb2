//! ライブラリ共通のエラー型

use thiserror::Error;

/// 解析パイプラインのエラー
///
/// 回復可能な条件（データ不足・低可視性・外れ値）はエラーにせず
/// 各計算の内側で処理する。ここに乗るのはビデオ単位で致命的なものだけ。
#[derive(Error, Debug)]
pub enum Error {
    /// 全フレームを処理しても軌跡が1点も得られなかった
    #[error("no person detected in video")]
    NoPersonDetected,

    /// 上流のポーズ推定サービス側の失敗（このコアに代替手段は無い）
    #[error("upstream pose service failure: {0}")]
    UpstreamService(String),

    /// ビデオメタデータが不正
    #[error("invalid video metadata: {0}")]
    InvalidMeta(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
