//! 動畫圖片解碼
//!
//! 依檔案內容判斷格式，動畫 WebP、GIF、APNG 逐格解碼；
//! 靜態圖片視為只有一格的序列。每一格都是完整畫布。

use anyhow::{Context, Result};
use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat, ImageReader, RgbaImage};
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// 將來源檔案解碼為依序排列的影格
pub fn decode_frames(path: &Path) -> Result<Vec<RgbaImage>> {
    let format = ImageReader::open(path)
        .with_context(|| format!("無法開啟來源檔案: {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("無法判斷檔案格式: {}", path.display()))?
        .format();

    let frames = match format {
        Some(ImageFormat::WebP) => decode_webp(path)?,
        Some(ImageFormat::Gif) => {
            let decoder = GifDecoder::new(open_reader(path)?)
                .with_context(|| format!("無法解碼 GIF: {}", path.display()))?;
            collect_animation(decoder, path)?
        }
        Some(ImageFormat::Png) => decode_png(path)?,
        _ => vec![decode_still(path)?],
    };

    debug!("解碼完成 {}: {} 格", path.display(), frames.len());
    Ok(frames)
}

/// 載入疊圖（保留透明通道）
pub fn decode_overlay(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)
        .with_context(|| format!("無法載入疊圖: {}", path.display()))?
        .to_rgba8())
}

fn open_reader(path: &Path) -> Result<BufReader<File>> {
    let file =
        File::open(path).with_context(|| format!("無法開啟來源檔案: {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn decode_webp(path: &Path) -> Result<Vec<RgbaImage>> {
    let decoder = WebPDecoder::new(open_reader(path)?)
        .with_context(|| format!("無法解碼 WebP: {}", path.display()))?;

    if decoder.has_animation() {
        collect_animation(decoder, path)
    } else {
        let image = DynamicImage::from_decoder(decoder)
            .with_context(|| format!("無法解碼 WebP: {}", path.display()))?;
        Ok(vec![image.to_rgba8()])
    }
}

fn decode_png(path: &Path) -> Result<Vec<RgbaImage>> {
    let decoder = PngDecoder::new(open_reader(path)?)
        .with_context(|| format!("無法解碼 PNG: {}", path.display()))?;

    let is_apng = decoder
        .is_apng()
        .with_context(|| format!("無法解碼 PNG: {}", path.display()))?;

    if is_apng {
        let apng = decoder
            .apng()
            .with_context(|| format!("無法解碼 APNG: {}", path.display()))?;
        collect_animation(apng, path)
    } else {
        let image = DynamicImage::from_decoder(decoder)
            .with_context(|| format!("無法解碼 PNG: {}", path.display()))?;
        Ok(vec![image.to_rgba8()])
    }
}

fn decode_still(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)
        .with_context(|| format!("無法解碼圖片: {}", path.display()))?
        .to_rgba8())
}

fn collect_animation<'a, D: AnimationDecoder<'a>>(decoder: D, path: &Path) -> Result<Vec<RgbaImage>> {
    let frames = decoder
        .into_frames()
        .collect_frames()
        .with_context(|| format!("無法解碼動畫影格: {}", path.display()))?;

    Ok(frames.into_iter().map(image::Frame::into_buffer).collect())
}
