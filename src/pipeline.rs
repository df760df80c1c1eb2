//! フレーム列を解析レポートへ変換するパイプライン

use std::time::Instant;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{AnalysisConfig, Config, TrackingConfig};
use crate::error::{Error, Result};
use crate::metrics::aggregate::{summarize, TrackingStats, VelocityMetrics};
use crate::metrics::angle::{elbow_angles, JointAngleSample};
use crate::metrics::velocity::compute_velocities;
use crate::pose::FramePose;
use crate::report::{build_bar_path, generated_timestamp, AnalysisReport};
use crate::score::score_form;
use crate::tracker::bar::{BarEstimator, BarPoint};

/// ビデオの基本パラメータ（1本のビデオ内で一定）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VideoMeta {
    pub fps: f32,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u32>,
}

impl VideoMeta {
    pub fn validate(&self) -> Result<()> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(Error::InvalidMeta(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidMeta(format!(
                "frame size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// total_framesが既知ならビデオ長（秒）
    pub fn duration(&self) -> Option<f32> {
        self.total_frames.map(|n| n as f32 / self.fps)
    }
}

/// 1本のビデオの解析パイプライン
///
/// フレームを昇順でpushし、最後にfinishでレポートを得る。
/// 状態はインスタンス内に閉じているので、ビデオごとに別インスタンスを
/// 使えば複数ビデオを並列に処理できる。
pub struct VideoPipeline {
    meta: VideoMeta,
    tracking: TrackingConfig,
    analysis: AnalysisConfig,
    estimator: BarEstimator,
    trajectory: Vec<BarPoint>,
    joint_angles: Vec<JointAngleSample>,
    stats: TrackingStats,
    last_frame: Option<u32>,
    frames_pushed: u32,
    started: Instant,
}

impl VideoPipeline {
    pub fn new(config: &Config, meta: VideoMeta) -> Result<Self> {
        meta.validate()?;
        info!(
            "Video: {}x{} @ {:.1}fps{}",
            meta.width,
            meta.height,
            meta.fps,
            meta.total_frames
                .map(|n| format!(", {} frames", n))
                .unwrap_or_default()
        );
        Ok(Self {
            estimator: BarEstimator::new(&config.tracking, meta.width, meta.height),
            tracking: config.tracking.clone(),
            analysis: config.analysis.clone(),
            meta,
            trajectory: Vec::new(),
            joint_angles: Vec::new(),
            stats: TrackingStats::default(),
            last_frame: None,
            frames_pushed: 0,
            started: Instant::now(),
        })
    }

    /// 1フレーム分の正準ポーズを処理する（検出無しフレームはNone）
    ///
    /// フレーム番号が厳密単調増加でないフレームは警告して捨てる。
    pub fn push(&mut self, frame: u32, pose: Option<&FramePose>) {
        if let Some(last) = self.last_frame {
            if frame <= last {
                warn!("Dropping out-of-order frame {} (last was {})", frame, last);
                return;
            }
        }
        self.last_frame = Some(frame);
        self.frames_pushed += 1;

        let timestamp = frame as f32 / self.meta.fps;
        let point = self.estimator.process(frame, timestamp, pose);
        self.stats.record(point.map(|p| p.source));
        if let Some(point) = point {
            self.trajectory.push(point);
        }

        if let Some(pose) = pose {
            if let Some(sample) = elbow_angles(pose, self.tracking.visibility_threshold) {
                self.joint_angles.push(sample);
            }
        }

        if self.analysis.progress_interval > 0
            && self.frames_pushed % self.analysis.progress_interval == 0
        {
            self.log_progress(frame);
        }
    }

    fn log_progress(&self, frame: u32) {
        let elapsed = self.started.elapsed().as_secs_f32();
        let processing_fps = if elapsed > 0.0 {
            self.frames_pushed as f32 / elapsed
        } else {
            0.0
        };
        let detection = self.estimator.stats();
        match self.meta.total_frames {
            Some(total) if total > 0 => {
                let percent = self.frames_pushed as f32 / total as f32 * 100.0;
                info!(
                    "[{:5.1}%] Frame {}/{} | Bar: {:.0}% | {:.1} fps",
                    percent,
                    frame,
                    total,
                    detection.detection_rate * 100.0,
                    processing_fps
                );
            }
            _ => {
                info!(
                    "Frame {} | Bar: {:.0}% | {:.1} fps",
                    frame,
                    detection.detection_rate * 100.0,
                    processing_fps
                );
            }
        }
    }

    /// 全フレーム処理後にレポートを組み立てる
    ///
    /// 軌跡が1点も無い（人物を一度も検出できなかった）場合はエラー
    pub fn finish(self) -> Result<AnalysisReport> {
        if self.trajectory.is_empty() {
            return Err(Error::NoPersonDetected);
        }

        let velocities = compute_velocities(&self.trajectory, self.meta.fps);
        let metrics = summarize(&self.trajectory, &velocities, &self.analysis);
        let form = metrics
            .as_ref()
            .map(|m| score_form(m, &self.joint_angles, &self.stats));

        self.log_final(metrics.as_ref());

        let bar_path = build_bar_path(&self.trajectory, &velocities);
        Ok(AnalysisReport {
            video: self.meta,
            bar_path,
            velocity_metrics: metrics,
            joint_angles: self.joint_angles,
            tracking_stats: self.stats,
            form_analysis: form,
            generated_at: generated_timestamp(),
        })
    }

    fn log_final(&self, metrics: Option<&VelocityMetrics>) {
        let elapsed = self.started.elapsed().as_secs_f32();
        let processing_fps = if elapsed > 0.0 {
            self.frames_pushed as f32 / elapsed
        } else {
            0.0
        };
        info!(
            "Complete! {} frames in {:.1}s ({:.1} fps)",
            self.frames_pushed, elapsed, processing_fps
        );
        info!(
            "  Sources: both_wrists={} single_wrist={} fallback={} lost={}",
            self.stats.both_wrists, self.stats.single_wrist, self.stats.fallback, self.stats.lost
        );
        if let Some(m) = metrics {
            info!("  Peak velocity: {:.1} px/s", m.peak_concentric_velocity);
            info!("  Displacement: {:.1} px", m.vertical_displacement);
            info!("  Reps: {}", m.estimated_reps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, LandmarkIndex};

    fn meta(total_frames: Option<u32>) -> VideoMeta {
        VideoMeta {
            fps: 30.0,
            width: 1000,
            height: 1000,
            total_frames,
        }
    }

    /// 腕が一直線に伸びたポーズ。wrist_yだけで上下させる
    fn lifting_pose(frame: u32, fps: f32, wrist_y: f32) -> FramePose {
        let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
        for (x, shoulder, elbow, wrist) in [
            (
                0.3,
                LandmarkIndex::LeftShoulder,
                LandmarkIndex::LeftElbow,
                LandmarkIndex::LeftWrist,
            ),
            (
                0.7,
                LandmarkIndex::RightShoulder,
                LandmarkIndex::RightElbow,
                LandmarkIndex::RightWrist,
            ),
        ] {
            landmarks[shoulder as usize] = Landmark::new(x, wrist_y + 0.3, 0.9);
            landmarks[elbow as usize] = Landmark::new(x, wrist_y + 0.1, 0.9);
            landmarks[wrist as usize] = Landmark::new(x, wrist_y, 0.9);
        }
        FramePose::new(frame, frame as f32 / fps, landmarks)
    }

    #[test]
    fn test_meta_duration() {
        assert_eq!(meta(Some(90)).duration(), Some(3.0));
        assert!(meta(None).duration().is_none());
    }

    #[test]
    fn test_invalid_meta_rejected() {
        let config = Config::default();
        let bad_fps = VideoMeta {
            fps: 0.0,
            width: 1000,
            height: 1000,
            total_frames: None,
        };
        assert!(matches!(
            VideoPipeline::new(&config, bad_fps),
            Err(Error::InvalidMeta(_))
        ));

        let bad_size = VideoMeta {
            fps: 30.0,
            width: 0,
            height: 1000,
            total_frames: None,
        };
        assert!(matches!(
            VideoPipeline::new(&config, bad_size),
            Err(Error::InvalidMeta(_))
        ));
    }

    #[test]
    fn test_no_person_at_all_is_an_error() {
        let config = Config::default();
        let mut pipeline = VideoPipeline::new(&config, meta(Some(30))).unwrap();
        for frame in 0..30 {
            pipeline.push(frame, None);
        }
        assert!(matches!(pipeline.finish(), Err(Error::NoPersonDetected)));
    }

    #[test]
    fn test_out_of_order_frames_are_dropped() {
        let config = Config::default();
        let mut pipeline = VideoPipeline::new(&config, meta(None)).unwrap();

        pipeline.push(0, Some(&lifting_pose(0, 30.0, 0.35)));
        pipeline.push(1, Some(&lifting_pose(1, 30.0, 0.35)));
        // 重複と逆行は捨てる
        pipeline.push(1, Some(&lifting_pose(1, 30.0, 0.10)));
        pipeline.push(0, Some(&lifting_pose(0, 30.0, 0.10)));
        pipeline.push(2, Some(&lifting_pose(2, 30.0, 0.35)));

        let report = pipeline.finish().unwrap();
        assert_eq!(report.bar_path.len(), 3);
        assert_eq!(report.tracking_stats.total(), 3);
        // フレーム番号は厳密単調増加のまま
        let frames: Vec<u32> = report.bar_path.iter().map(|p| p.frame).collect();
        assert_eq!(frames, vec![0, 1, 2]);
    }

    #[test]
    fn test_single_rep_video_end_to_end() {
        let config = Config::default();
        let total = 300u32;
        let mut pipeline = VideoPipeline::new(&config, meta(Some(total))).unwrap();

        // 1000pxフレームで150pxぶん上げて下ろす1レップ
        for frame in 0..total {
            let phase = frame as f32 / (total - 1) as f32 * std::f32::consts::PI * 2.0;
            let wrist_y = 0.35 - 0.15 * (1.0 - phase.cos()) / 2.0;
            let pose = lifting_pose(frame, 30.0, wrist_y);
            pipeline.push(frame, Some(&pose));
        }

        let report = pipeline.finish().unwrap();
        assert_eq!(report.bar_path.len(), total as usize);
        assert_eq!(report.tracking_stats.both_wrists, total);
        assert_eq!(report.tracking_stats.lost, 0);

        let metrics = report.velocity_metrics.unwrap();
        // 平滑化の遅れがあるので変位は公称150pxより僅かに縮む
        assert!(
            (metrics.vertical_displacement - 150.0).abs() < 3.0,
            "displacement = {}",
            metrics.vertical_displacement
        );
        assert_eq!(metrics.estimated_reps, 1);
        assert!(metrics.path_verticality > 0.99);
        assert!(metrics.peak_concentric_velocity > 30.0);
        assert!(metrics.peak_concentric_velocity < 60.0);
        assert!(metrics.peak_eccentric_velocity > 30.0);

        // 腕が一直線なので肘角度はほぼ180度で左右差なし
        assert_eq!(report.joint_angles.len(), total as usize);
        let form = report.form_analysis.unwrap();
        assert_eq!(form.overall_score, 85);

        // 速度ジョイン: 先頭以外の点には速さが付く
        assert!(report.bar_path[0].speed.is_none());
        assert!(report.bar_path[1..].iter().all(|p| p.speed.is_some()));
    }

    #[test]
    fn test_detection_gap_uses_persistence_then_lost() {
        let config = Config::default();
        let mut pipeline = VideoPipeline::new(&config, meta(None)).unwrap();

        for frame in 0..10 {
            pipeline.push(frame, Some(&lifting_pose(frame, 30.0, 0.35)));
        }
        // 30フレームの欠落: 15フレームは保持、残りはロスト
        for frame in 10..40 {
            pipeline.push(frame, None);
        }
        for frame in 40..50 {
            pipeline.push(frame, Some(&lifting_pose(frame, 30.0, 0.35)));
        }

        let report = pipeline.finish().unwrap();
        assert_eq!(report.tracking_stats.both_wrists, 20);
        assert_eq!(report.tracking_stats.fallback, 15);
        assert_eq!(report.tracking_stats.lost, 15);
        assert_eq!(report.bar_path.len(), 35);
    }

    #[test]
    fn test_two_videos_in_parallel() {
        let handles: Vec<_> = [0.35f32, 0.30f32]
            .into_iter()
            .map(|base_y| {
                std::thread::spawn(move || {
                    let config = Config::default();
                    let mut pipeline = VideoPipeline::new(&config, meta(Some(60))).unwrap();
                    for frame in 0..60 {
                        let wrist_y = base_y - 0.001 * frame as f32;
                        pipeline.push(frame, Some(&lifting_pose(frame, 30.0, wrist_y)));
                    }
                    pipeline.finish().unwrap()
                })
            })
            .collect();

        for handle in handles {
            let report = handle.join().unwrap();
            assert_eq!(report.bar_path.len(), 60);
            assert_eq!(report.tracking_stats.both_wrists, 60);
        }
    }
}
