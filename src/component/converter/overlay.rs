//! 疊圖處理
//!
//! 疊圖在每次執行只載入一次，之後以唯讀方式由所有工作執行緒共用。

use crate::config::{OverlayPosition, OverlaySettings};
use crate::tools::decode_overlay;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::{info, warn};
use std::sync::Arc;

/// 已載入的疊圖
#[derive(Debug, Clone)]
pub struct Overlay {
    image: Arc<RgbaImage>,
    position: OverlayPosition,
}

impl Overlay {
    #[must_use]
    pub fn new(image: RgbaImage, position: OverlayPosition) -> Self {
        Self {
            image: Arc::new(image),
            position,
        }
    }

    /// 載入疊圖；失敗時回傳 `None` 並記錄警告，本次執行不套用疊圖
    #[must_use]
    pub fn load(settings: &OverlaySettings) -> Option<Self> {
        match decode_overlay(&settings.path) {
            Ok(image) => {
                info!(
                    "已載入疊圖 {} ({}x{}, {})",
                    settings.path.display(),
                    image.width(),
                    image.height(),
                    settings.position
                );
                Some(Self::new(image, settings.position))
            }
            Err(e) => {
                warn!("疊圖載入失敗，本次不套用疊圖: {e:#}");
                None
            }
        }
    }

    #[must_use]
    pub const fn position(&self) -> OverlayPosition {
        self.position
    }

    /// 依畫面尺寸取得適用的疊圖，超出畫面時等比例縮小
    #[must_use]
    pub fn fitted_to(&self, frame_size: (u32, u32)) -> Arc<RgbaImage> {
        match fit_within(self.image.dimensions(), frame_size) {
            Some((w, h)) => Arc::new(imageops::resize(
                self.image.as_ref(),
                w,
                h,
                FilterType::Lanczos3,
            )),
            None => Arc::clone(&self.image),
        }
    }
}

/// 疊圖任一邊超出畫面時，計算等比例縮小後的尺寸；不需縮小則回傳 `None`
#[must_use]
pub fn fit_within(overlay: (u32, u32), frame: (u32, u32)) -> Option<(u32, u32)> {
    let (ow, oh) = overlay;
    let (fw, fh) = frame;

    if ow <= fw && oh <= fh {
        return None;
    }

    let ratio = (f64::from(fw) / f64::from(ow)).min(f64::from(fh) / f64::from(oh));
    let width = ((f64::from(ow) * ratio).round() as u32).clamp(1, fw.max(1));
    let height = ((f64::from(oh) * ratio).round() as u32).clamp(1, fh.max(1));
    Some((width, height))
}

/// 計算疊圖左上角座標
#[must_use]
pub fn anchor_offset(position: OverlayPosition, frame: (u32, u32), overlay: (u32, u32)) -> (i64, i64) {
    let (fw, fh) = (i64::from(frame.0), i64::from(frame.1));
    let (ow, oh) = (i64::from(overlay.0), i64::from(overlay.1));

    match position {
        OverlayPosition::Center => ((fw - ow) / 2, (fh - oh) / 2),
        OverlayPosition::TopLeft => (0, 0),
        OverlayPosition::TopRight => (fw - ow, 0),
        OverlayPosition::BottomLeft => (0, fh - oh),
        OverlayPosition::BottomRight => (fw - ow, fh - oh),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::path::PathBuf;

    #[test]
    fn test_fit_within_no_shrink() {
        assert_eq!(fit_within((50, 40), (100, 100)), None);
        assert_eq!(fit_within((100, 100), (100, 100)), None);
    }

    #[test]
    fn test_fit_within_keeps_aspect_ratio() {
        assert_eq!(fit_within((400, 200), (100, 100)), Some((100, 50)));
        assert_eq!(fit_within((100, 300), (200, 150)), Some((50, 150)));
    }

    #[test]
    fn test_fit_within_one_dimension_too_large() {
        assert_eq!(fit_within((120, 10), (60, 60)), Some((60, 5)));
    }

    #[test]
    fn test_anchor_offsets() {
        let frame = (100, 80);
        let overlay = (20, 10);
        assert_eq!(anchor_offset(OverlayPosition::Center, frame, overlay), (40, 35));
        assert_eq!(anchor_offset(OverlayPosition::TopLeft, frame, overlay), (0, 0));
        assert_eq!(anchor_offset(OverlayPosition::TopRight, frame, overlay), (80, 0));
        assert_eq!(anchor_offset(OverlayPosition::BottomLeft, frame, overlay), (0, 70));
        assert_eq!(
            anchor_offset(OverlayPosition::BottomRight, frame, overlay),
            (80, 70)
        );
    }

    #[test]
    fn test_fitted_to_shares_when_small() {
        let overlay = Overlay::new(
            RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])),
            OverlayPosition::Center,
        );
        let fitted = overlay.fitted_to((10, 10));
        assert_eq!(fitted.dimensions(), (4, 4));

        let shrunk = overlay.fitted_to((2, 3));
        assert_eq!(shrunk.dimensions(), (2, 2));
    }

    #[test]
    fn test_load_missing_overlay_disables() {
        let settings = OverlaySettings {
            path: PathBuf::from("/nonexistent/overlay.png"),
            position: OverlayPosition::Center,
        };
        assert!(Overlay::load(&settings).is_none());
    }
}
