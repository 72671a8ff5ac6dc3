//! 目標解析度計算
//!
//! 優先順序：縮放倍率 > 自訂寬高 > 預設解析度 > 原始尺寸

use crate::config::{ConversionSettings, ResolutionMode};

/// 依設定計算輸出尺寸，相同輸入永遠得到相同結果
#[must_use]
pub fn resolve_target_size(original: (u32, u32), settings: &ConversionSettings) -> (u32, u32) {
    let (width, height) = original;
    let scale = settings.scale_factor;

    if scale > 0.0 && scale.is_finite() && scale != 1.0 {
        return (scale_dimension(width, scale), scale_dimension(height, scale));
    }

    match &settings.resolution {
        ResolutionMode::Custom {
            width: Some(w),
            height: Some(h),
        } if *w > 0 && *h > 0 => (*w, *h),
        ResolutionMode::Preset(name) => ResolutionMode::preset_size(name).unwrap_or(original),
        _ => original,
    }
}

fn scale_dimension(value: u32, scale: f64) -> u32 {
    let scaled = (f64::from(value) * scale).round();
    // 極小倍率不得產生 0 像素
    if scaled < 1.0 { 1 } else { scaled as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(resolution: ResolutionMode, scale_factor: f64) -> ConversionSettings {
        ConversionSettings {
            resolution,
            scale_factor,
            ..ConversionSettings::default()
        }
    }

    #[test]
    fn test_scale_factor_wins() {
        let settings = settings_with(ResolutionMode::Preset("720p".to_string()), 1.5);
        assert_eq!(resolve_target_size((800, 600), &settings), (1200, 900));
    }

    #[test]
    fn test_scale_factor_downscale_rounds() {
        let settings = settings_with(ResolutionMode::Original, 0.5);
        assert_eq!(resolve_target_size((801, 601), &settings), (401, 301));
    }

    #[test]
    fn test_unit_scale_uses_preset() {
        let settings = settings_with(ResolutionMode::Preset("720p".to_string()), 1.0);
        assert_eq!(resolve_target_size((800, 600), &settings), (1280, 720));
    }

    #[test]
    fn test_preset_case_insensitive() {
        let settings = settings_with(ResolutionMode::Preset("4K".to_string()), 1.0);
        assert_eq!(resolve_target_size((800, 600), &settings), (3840, 2160));
    }

    #[test]
    fn test_custom_resolution() {
        let settings = settings_with(
            ResolutionMode::Custom {
                width: Some(640),
                height: Some(360),
            },
            1.0,
        );
        assert_eq!(resolve_target_size((800, 600), &settings), (640, 360));
    }

    #[test]
    fn test_custom_zero_width_falls_through() {
        let settings = settings_with(
            ResolutionMode::Custom {
                width: Some(0),
                height: Some(360),
            },
            1.0,
        );
        assert_eq!(resolve_target_size((800, 600), &settings), (800, 600));
    }

    #[test]
    fn test_original_and_unknown_preset() {
        let original = settings_with(ResolutionMode::Original, 1.0);
        assert_eq!(resolve_target_size((320, 240), &original), (320, 240));

        let unknown = settings_with(ResolutionMode::Preset("same resolution".to_string()), 1.0);
        assert_eq!(resolve_target_size((320, 240), &unknown), (320, 240));
    }

    #[test]
    fn test_non_positive_scale_ignored() {
        let settings = settings_with(ResolutionMode::Original, 0.0);
        assert_eq!(resolve_target_size((320, 240), &settings), (320, 240));

        let negative = settings_with(ResolutionMode::Original, -2.0);
        assert_eq!(resolve_target_size((320, 240), &negative), (320, 240));
    }

    #[test]
    fn test_tiny_scale_clamps_to_one_pixel() {
        let settings = settings_with(ResolutionMode::Original, 0.001);
        assert_eq!(resolve_target_size((100, 50), &settings), (1, 1));
    }
}
