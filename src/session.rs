//! 上流ポーズ推定サービスが記録したセッションファイルの処理

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::Deserialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::{VideoMeta, VideoPipeline};
use crate::pose::adapter::{canonicalize, select_person, tracking_roi, PersonDetection, PoseBackend};
use crate::report::AnalysisReport;

/// 1本のビデオに対するポーズ推定サービスの記録出力
#[derive(Debug, Clone, Deserialize)]
pub struct SessionFile {
    pub video: VideoMeta,
    pub backend: PoseBackend,
    /// ユーザーが追跡対象に選んだ人物の正規化bbox
    #[serde(default)]
    pub selected_person: Option<[f32; 4]>,
    pub frames: Vec<FrameRecord>,
}

/// 1フレーム分の記録
#[derive(Debug, Clone, Deserialize)]
pub struct FrameRecord {
    pub frame: u32,
    #[serde(default)]
    pub people: Vec<PersonDetection>,
    /// 上流サービスがこのフレームで失敗していた場合のメッセージ
    #[serde(default)]
    pub error: Option<String>,
}

/// セッションファイルをJSONから読み込む
pub fn load_session<P: AsRef<Path>>(path: P) -> Result<SessionFile> {
    let content = fs::read_to_string(path)?;
    let session: SessionFile = serde_json::from_str(&content)?;
    Ok(session)
}

/// セッション記録を先頭から流し込んで解析する
///
/// 上流サービスのエラーが記録されたフレームに当たったら即座に
/// エラーを返す（このコアに代替のポーズ取得手段は無い）。
pub fn process_session(config: &Config, session: &SessionFile) -> Result<AnalysisReport> {
    let mut pipeline = VideoPipeline::new(config, session.video)?;

    let roi = tracking_roi(
        session.selected_person.as_ref(),
        config.selection.roi_padding,
    );
    debug!("Tracking ROI: {:?}", roi);
    if let Some(bbox) = session.selected_person {
        info!("Tracking selected person at {:?}", bbox);
    }

    for record in &session.frames {
        if let Some(message) = &record.error {
            return Err(Error::UpstreamService(message.clone()));
        }

        let selected = select_person(
            &record.people,
            session.selected_person.as_ref(),
            &config.selection,
        );

        let pose = selected.and_then(|person| {
            canonicalize(
                session.backend,
                &person.landmarks,
                record.frame,
                record.frame as f32 / session.video.fps,
            )
        });

        pipeline.push(record.frame, pose.as_ref());
    }

    pipeline.finish()
}
