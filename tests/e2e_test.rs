//! E2E Integration Tests
//!
//! 呼叫系統上的 ffmpeg 實際編碼影片；找不到 ffmpeg 時跳過。

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use image::codecs::gif::GifEncoder;
use image::{Delay, Frame, Rgba, RgbaImage};
use tempfile::TempDir;
use webp_video_converter::component::converter::{
    EncodeParams, FfmpegVideoEncoder, FrameEncoder, JobRunner, encode_frames,
};
use webp_video_converter::config::{ConversionSettings, OutputFormat};
use webp_video_converter::tools::{collect_source_files, is_ffmpeg_available};

fn write_animated_gif(path: &Path, count: usize, width: u32, height: u32) {
    let file = File::create(path).unwrap();
    let mut encoder = GifEncoder::new(file);
    let frames = (0..count).map(|i| {
        let buffer = RgbaImage::from_pixel(width, height, Rgba([(i * 25) as u8, 120, 40, 255]));
        Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(60, 1))
    });
    encoder.encode_frames(frames).unwrap();
}

/// 測試 ffmpeg 編碼各種容器，奇數尺寸也能輸出
#[test]
fn test_ffmpeg_encode_containers_e2e() {
    if !is_ffmpeg_available() {
        println!("跳過測試：找不到 ffmpeg");
        return;
    }

    let temp_dir = TempDir::new().unwrap();
    let frames: Vec<PathBuf> = (0..6)
        .map(|i| {
            let path = temp_dir.path().join(format!("frame_{i:06}.png"));
            // 第 4 格尺寸不同，應被縮放為第一格的尺寸
            let size = if i == 3 { (30, 18) } else { (15, 9) };
            RgbaImage::from_pixel(size.0, size.1, Rgba([200, (i * 30) as u8, 50, 255]))
                .save(&path)
                .unwrap();
            path
        })
        .collect();

    for format in [OutputFormat::Mp4, OutputFormat::Mkv] {
        let output = temp_dir.path().join(format!("clip{}", format.extension()));
        let params = EncodeParams {
            fps: 16,
            quality: 22,
            format,
        };

        let produced = encode_frames(&FfmpegVideoEncoder, &frames, &output, &params).unwrap();
        assert!(produced);
        let size = fs::metadata(&output).unwrap().len();
        println!("{format}: {size} bytes");
        assert!(size > 0, "{format} 輸出檔不應為空");
    }

    assert!(FfmpegVideoEncoder.is_available());
}

/// 測試完整流程：資料夾輸入 → mp4 輸出
#[test]
fn test_directory_to_mp4_e2e() {
    if !is_ffmpeg_available() {
        println!("跳過測試：找不到 ffmpeg");
        return;
    }

    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().join("input/nested");
    fs::create_dir_all(&input_dir).unwrap();
    write_animated_gif(&input_dir.join("dance.gif"), 8, 32, 24);
    fs::write(input_dir.join("notes.txt"), "ignored").unwrap();

    let sources = collect_source_files(&[temp_dir.path().join("input")]);
    assert_eq!(sources.len(), 1);

    let settings = ConversionSettings {
        output_dir: temp_dir.path().join("output"),
        scratch_root: Some(temp_dir.path().join("scratch")),
        output_format: OutputFormat::Mp4,
        ..ConversionSettings::default()
    };
    let report = JobRunner::new(settings)
        .run(&sources, &mut |_| {})
        .unwrap();

    println!("輸出: {:?}", report.outputs);
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.outputs.len(), 1);
    assert!(fs::metadata(&report.outputs[0]).unwrap().len() > 0);

    let leftover = fs::read_dir(temp_dir.path().join("scratch")).unwrap().count();
    assert_eq!(leftover, 0, "暫存資料夾應已刪除");
}
