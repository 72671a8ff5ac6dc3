//! 單一影格轉換
//!
//! 固定順序：縮放 → 疊圖 → 色彩模式轉換 → 存成無損 PNG

use super::overlay::{Overlay, anchor_offset};
use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::path::Path;
use std::sync::Arc;

/// 同一來源檔案的所有影格共用一個轉換器
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    target_size: (u32, u32),
    overlay: Option<PlacedOverlay>,
    keep_alpha: bool,
}

#[derive(Debug, Clone)]
struct PlacedOverlay {
    image: Arc<RgbaImage>,
    offset: (i64, i64),
}

impl FrameCompositor {
    /// `keep_alpha` 只在輸出 GIF 時為真；影片輸出會去除透明通道
    #[must_use]
    pub fn new(target_size: (u32, u32), overlay: Option<&Overlay>, keep_alpha: bool) -> Self {
        let overlay = overlay.map(|overlay| {
            let image = overlay.fitted_to(target_size);
            let offset = anchor_offset(overlay.position(), target_size, image.dimensions());
            PlacedOverlay { image, offset }
        });

        Self {
            target_size,
            overlay,
            keep_alpha,
        }
    }

    /// 套用縮放與疊圖，回傳目標色彩模式的影像
    #[must_use]
    pub fn compose(&self, frame: &RgbaImage) -> DynamicImage {
        let (width, height) = self.target_size;
        let mut canvas = if frame.dimensions() == self.target_size {
            frame.clone()
        } else {
            imageops::resize(frame, width, height, FilterType::Lanczos3)
        };

        if let Some(overlay) = &self.overlay {
            blend_over(&mut canvas, overlay.image.as_ref(), overlay.offset);
        }

        let composed = DynamicImage::ImageRgba8(canvas);
        if self.keep_alpha {
            composed
        } else {
            DynamicImage::ImageRgb8(composed.to_rgb8())
        }
    }

    /// 轉換並寫入暫存路徑
    pub fn materialize(&self, frame: &RgbaImage, path: &Path) -> Result<()> {
        self.compose(frame)
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("無法寫入影格: {}", path.display()))
    }
}

/// source-over 疊圖，超出畫布的部分略過
fn blend_over(canvas: &mut RgbaImage, overlay: &RgbaImage, offset: (i64, i64)) {
    let (canvas_width, canvas_height) = canvas.dimensions();
    for (ox, oy, src) in overlay.enumerate_pixels() {
        let x = offset.0 + i64::from(ox);
        let y = offset.1 + i64::from(oy);
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            continue;
        };
        if x >= canvas_width || y >= canvas_height {
            continue;
        }
        let dst = canvas.get_pixel_mut(x, y);
        *dst = blend_pixel(*dst, *src);
    }
}

/// 四捨五入混色；底圖不透明時結果必定不透明
fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    match src[3] {
        0 => return dst,
        255 => return src,
        _ => {}
    }

    let src_alpha = f32::from(src[3]) / 255.0;
    let dst_alpha = f32::from(dst[3]) / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
    let to_u8 = |value: f32| value.round().clamp(0.0, 255.0) as u8;
    let channel = |s: u8, d: u8| {
        to_u8((f32::from(s) * src_alpha + f32::from(d) * dst_alpha * (1.0 - src_alpha)) / out_alpha)
    };

    let alpha = if dst[3] == 255 {
        255
    } else {
        to_u8(out_alpha * 255.0).max(dst[3])
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        alpha,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverlayPosition;
    use image::{GenericImageView, Rgba};
    use tempfile::TempDir;

    fn blue_frame(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([0, 0, 255, 255]))
    }

    #[test]
    fn test_resize_up_and_down() {
        let up = FrameCompositor::new((40, 30), None, true);
        assert_eq!(up.compose(&blue_frame(20, 15)).dimensions(), (40, 30));

        let down = FrameCompositor::new((10, 5), None, true);
        assert_eq!(down.compose(&blue_frame(20, 15)).dimensions(), (10, 5));
    }

    #[test]
    fn test_video_output_drops_alpha() {
        let compositor = FrameCompositor::new((4, 4), None, false);
        let composed = compositor.compose(&blue_frame(4, 4));
        assert!(matches!(composed, DynamicImage::ImageRgb8(_)));

        let gif = FrameCompositor::new((4, 4), None, true);
        assert!(matches!(gif.compose(&blue_frame(4, 4)), DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn test_overlay_partial_alpha_blend() {
        let overlay = Overlay::new(
            RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 128])),
            OverlayPosition::TopLeft,
        );
        let compositor = FrameCompositor::new((6, 6), Some(&overlay), true);
        let composed = compositor.compose(&blue_frame(6, 6)).to_rgba8();

        let blended = composed.get_pixel(0, 0);
        assert!((i32::from(blended[0]) - 128).abs() <= 2);
        assert_eq!(blended[1], 0);
        assert!((i32::from(blended[2]) - 127).abs() <= 2);
        assert_eq!(blended[3], 255);

        // 疊圖未覆蓋的區域維持原樣
        assert_eq!(composed.get_pixel(5, 5), &Rgba([0, 0, 255, 255]));
        assert_eq!(composed.get_pixel(2, 0), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_blend_keeps_opaque_destination_opaque() {
        let dst = Rgba([10, 200, 30, 255]);
        for alpha in [1, 64, 127, 128, 200, 254] {
            let blended = blend_pixel(dst, Rgba([250, 0, 90, alpha]));
            assert_eq!(blended[3], 255, "alpha {alpha}");
        }
        assert_eq!(blend_pixel(dst, Rgba([1, 2, 3, 0])), dst);
        assert_eq!(blend_pixel(dst, Rgba([1, 2, 3, 255])), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_blend_over_transparent_destination() {
        let blended = blend_pixel(Rgba([0, 0, 0, 0]), Rgba([200, 100, 50, 128]));
        assert_eq!(blended, Rgba([200, 100, 50, 128]));
    }

    #[test]
    fn test_overlay_partially_outside_canvas_is_clipped() {
        let mut canvas = blue_frame(3, 3);
        let overlay = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));

        blend_over(&mut canvas, &overlay, (-1, 2));

        assert_eq!(canvas.get_pixel(0, 2), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(1, 2), &Rgba([0, 0, 255, 255]));
        assert_eq!(canvas.get_pixel(0, 1), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_overlay_bottom_right_anchor() {
        let overlay = Overlay::new(
            RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255])),
            OverlayPosition::BottomRight,
        );
        let compositor = FrameCompositor::new((6, 4), Some(&overlay), false);
        let composed = compositor.compose(&blue_frame(6, 4)).to_rgb8();

        assert_eq!(composed.get_pixel(5, 3).0, [0, 255, 0]);
        assert_eq!(composed.get_pixel(4, 2).0, [0, 255, 0]);
        assert_eq!(composed.get_pixel(3, 3).0, [0, 0, 255]);
    }

    #[test]
    fn test_oversized_overlay_is_shrunk() {
        let overlay = Overlay::new(
            RgbaImage::from_pixel(20, 10, Rgba([255, 255, 255, 255])),
            OverlayPosition::Center,
        );
        let compositor = FrameCompositor::new((10, 10), Some(&overlay), true);
        let composed = compositor.compose(&blue_frame(10, 10)).to_rgba8();

        // 縮小為 10x5 後置中：第 0 列不被覆蓋，第 5 列被覆蓋
        assert_eq!(composed.get_pixel(5, 0), &Rgba([0, 0, 255, 255]));
        let covered = composed.get_pixel(5, 5);
        assert!(covered[0] >= 250 && covered[1] >= 250 && covered[2] >= 250);
    }

    #[test]
    fn test_materialize_writes_png() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("frame_000000.png");
        let compositor = FrameCompositor::new((8, 8), None, false);

        compositor.materialize(&blue_frame(4, 4), &path).unwrap();

        let saved = image::open(&path).unwrap();
        assert_eq!(saved.dimensions(), (8, 8));
    }

    #[test]
    fn test_materialize_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone/frame_000000.png");
        let compositor = FrameCompositor::new((4, 4), None, false);

        assert!(compositor.materialize(&blue_frame(4, 4), &path).is_err());
    }
}
