//! 軌跡からの速度計算

use serde::{Deserialize, Serialize};

use crate::tracker::bar::BarPoint;

/// 隣接する軌跡点ペア1組の速度（ピクセル/秒）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VelocitySample {
    /// ペアの後側のフレーム番号
    pub frame: u32,
    pub timestamp: f32,
    pub vx: f32,
    pub vy: f32,
    /// 移動方向によらない速さ
    pub speed: f32,
    /// 画像Y軸は下向きなので符号を反転してある。正の値が上昇
    pub vertical_velocity: f32,
}

/// 軌跡の隣接ペアごとに速度を計算する
///
/// dt <= 0 のペア（フレーム重複・逆行）は黙ってスキップする。
/// 点が2未満なら空を返す。
pub fn compute_velocities(trajectory: &[BarPoint], fps: f32) -> Vec<VelocitySample> {
    let mut velocities = Vec::new();
    if trajectory.len() < 2 || fps <= 0.0 {
        return velocities;
    }

    for pair in trajectory.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let dt = (curr.frame as f32 - prev.frame as f32) / fps;
        if dt <= 0.0 {
            continue;
        }

        let dx = curr.x - prev.x;
        let dy = curr.y - prev.y;
        velocities.push(VelocitySample {
            frame: curr.frame,
            timestamp: curr.timestamp,
            vx: dx / dt,
            vy: dy / dt,
            speed: (dx * dx + dy * dy).sqrt() / dt,
            vertical_velocity: -dy / dt,
        });
    }

    velocities
}
