//! 時間軸重新取樣
//!
//! 以最近的前一格（nearest-earlier）取樣模擬放慢或加速：
//! 速度倍率大於 1 時重複影格（播放變慢），小於 1 時抽掉影格（播放變快）。
//! 輸出幀率不變，只改變影格數量。

/// 依速度倍率選出要保留的原始影格索引
///
/// 公式：`count = max(1, round(N * speed))`，
/// `index[i] = min(N - 1, floor(i * N / count))`
#[must_use]
pub fn select_frame_indices(frame_count: usize, speed_factor: f64) -> Vec<usize> {
    if frame_count == 0 {
        return Vec::new();
    }

    if speed_factor == 1.0 || !speed_factor.is_finite() || speed_factor <= 0.0 {
        return (0..frame_count).collect();
    }

    let scaled = (frame_count as f64 * speed_factor).round();
    let new_count = if scaled < 1.0 { 1 } else { scaled as usize };

    (0..new_count)
        .map(|i| (i * frame_count / new_count).min(frame_count - 1))
        .collect()
}
