//! レップ数の推定

use crate::config::AnalysisConfig;

/// Y軌跡のミッドラインクロッシングでレップ数を数える
///
/// 最小値と最大値の中点をミッドラインとし、下から上への遷移を
/// 1レップと数える。画像Y軸は下向きなので「下」は数値の大きい側。
/// クロッシングが1回も無くても変位が十分大きければ1レップとみなす
/// （トップで止めたまま動画が終わるケースなど）。
///
/// 固定ミッドラインの2状態検出器なので、部分レップや極端に
/// 不均等なテンポでは数え損ないが起きる。
pub fn count_reps(y_positions: &[f32], displacement: f32, config: &AnalysisConfig) -> u32 {
    if y_positions.len() < config.min_rep_points || displacement < config.min_rep_displacement {
        return 0;
    }

    let min_y = y_positions.iter().copied().fold(f32::INFINITY, f32::min);
    let max_y = y_positions.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mid_y = (min_y + max_y) / 2.0;

    let mut was_below = y_positions[0] > mid_y;
    let mut reps = 0u32;

    for &y in &y_positions[1..] {
        let is_below = y > mid_y;
        if was_below && !is_below {
            reps += 1;
        }
        was_below = is_below;
    }

    if reps > 0 {
        reps
    } else if displacement > config.single_rep_displacement {
        1
    } else {
        0
    }
}
