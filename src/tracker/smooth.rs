//! バー位置の平滑化

use std::collections::VecDeque;

use crate::config::TrackingConfig;

/// EMAと移動平均を組み合わせた2D位置の平滑化フィルタ
///
/// 生の候補位置に対して次の順で処理する:
/// 1. 前回の平滑化位置から max_jump を超える跳びは外れ値として棄却
/// 2. EMA更新 (smoothed += alpha * (raw - smoothed))
/// 3. 直近 buffer_size 個の平滑化値の平均を出力
///
/// 候補が無いフレームでは最後の出力を persistence_frames まで保持し、
/// それを超えるとロスト（None）になる。
pub struct PointSmoother {
    alpha: f32,
    max_jump: f32,
    buffer_size: usize,
    persistence_frames: u32,
    buffer: VecDeque<(f32, f32)>,
    smoothed: Option<(f32, f32)>,
    last_output: Option<(f32, f32)>,
    velocity: (f32, f32),
    frames_without_input: u32,
}

impl PointSmoother {
    pub fn new(alpha: f32, max_jump: f32, buffer_size: usize, persistence_frames: u32) -> Self {
        Self {
            alpha,
            max_jump,
            buffer_size: buffer_size.max(1),
            persistence_frames,
            buffer: VecDeque::with_capacity(buffer_size.max(1)),
            smoothed: None,
            last_output: None,
            velocity: (0.0, 0.0),
            frames_without_input: 0,
        }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(
            config.smoothing_alpha,
            config.max_jump_pixels,
            config.buffer_size,
            config.persistence_frames,
        )
    }

    /// 1フレーム分の候補位置で更新し、出力位置を返す
    ///
    /// Noneは検出無しフレーム。保持期間内なら前回出力をそのまま返す。
    pub fn update(&mut self, raw: Option<(f32, f32)>) -> Option<(f32, f32)> {
        let (raw_x, raw_y) = match raw {
            Some(p) => p,
            None => {
                self.frames_without_input += 1;
                if self.last_output.is_some()
                    && self.frames_without_input <= self.persistence_frames
                {
                    return self.last_output;
                }
                return None;
            }
        };

        self.frames_without_input = 0;

        let (smooth_x, smooth_y) = match self.smoothed {
            Some(prev) => prev,
            None => {
                // 初回はそのまま通す
                self.smoothed = Some((raw_x, raw_y));
                self.buffer.push_back((raw_x, raw_y));
                self.last_output = Some((raw_x, raw_y));
                return self.last_output;
            }
        };

        // 外れ値は取り込まず前回出力を保持する（平滑化状態も動かさない）
        let dx = raw_x - smooth_x;
        let dy = raw_y - smooth_y;
        if (dx * dx + dy * dy).sqrt() > self.max_jump {
            return self.last_output;
        }

        let smooth_x = smooth_x + self.alpha * dx;
        let smooth_y = smooth_y + self.alpha * dy;
        self.smoothed = Some((smooth_x, smooth_y));

        if self.buffer.len() == self.buffer_size {
            self.buffer.pop_front();
        }
        self.buffer.push_back((smooth_x, smooth_y));

        let n = self.buffer.len() as f32;
        let out_x = self.buffer.iter().map(|p| p.0).sum::<f32>() / n;
        let out_y = self.buffer.iter().map(|p| p.1).sum::<f32>() / n;

        if let Some((last_x, last_y)) = self.last_output {
            self.velocity = (out_x - last_x, out_y - last_y);
        }
        self.last_output = Some((out_x, out_y));
        self.last_output
    }

    /// 直近2出力間の変位（ピクセル/フレーム）
    pub fn velocity(&self) -> (f32, f32) {
        self.velocity
    }

    pub fn speed(&self) -> f32 {
        let (vx, vy) = self.velocity;
        (vx * vx + vy * vy).sqrt()
    }

    /// 現在のEMA内部状態（診断用）
    pub fn smoothed(&self) -> Option<(f32, f32)> {
        self.smoothed
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.smoothed = None;
        self.last_output = None;
        self.velocity = (0.0, 0.0);
        self.frames_without_input = 0;
    }
}
