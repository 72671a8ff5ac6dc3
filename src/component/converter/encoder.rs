//! 影格編碼
//!
//! 編碼器以 `FrameEncoder` 抽象：輸入依序排列的影格檔案與參數，輸出單一檔案。
//! 影片交給外部 ffmpeg，GIF 直接以 `gif` crate 在程序內產生。

use super::ffmpeg_command::{FfmpegCommand, VideoCodec};
use crate::config::{ConversionSettings, OutputFormat};
use crate::tools::is_ffmpeg_available;
use anyhow::{Context, Result, anyhow, bail};
use gif::{DisposalMethod, Repeat};
use image::imageops::{self, FilterType};
use image::{RgbImage, RgbaImage};
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{ChildStdin, Command, ExitStatus, Stdio};
use std::thread;

/// GIF 調色盤量化速度（1 最慢最好，30 最快）
const GIF_QUANTIZE_SPEED: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub fps: u32,
    pub quality: u8,
    pub format: OutputFormat,
}

impl EncodeParams {
    #[must_use]
    pub const fn from_settings(settings: &ConversionSettings) -> Self {
        Self {
            fps: settings.fps,
            quality: settings.quality,
            format: settings.output_format,
        }
    }
}

pub trait FrameEncoder: Send + Sync {
    fn name(&self) -> &str;

    /// 外部依賴是否可用；只用於執行前的警告
    fn is_available(&self) -> bool {
        true
    }

    fn encode(&self, frames: &[PathBuf], output: &Path, params: &EncodeParams) -> Result<()>;
}

/// 依輸出格式取得預設編碼器
#[must_use]
pub fn default_encoder_for(format: OutputFormat) -> Box<dyn FrameEncoder> {
    if format.is_gif() {
        Box::new(GifFrameEncoder)
    } else {
        Box::new(FfmpegVideoEncoder)
    }
}

/// 執行一次編碼
///
/// 影格列表為空時不做任何事並回傳 `Ok(false)`。
/// 編碼失敗時會刪除殘留的輸出檔。
pub fn encode_frames(
    encoder: &dyn FrameEncoder,
    frames: &[PathBuf],
    output: &Path,
    params: &EncodeParams,
) -> Result<bool> {
    if frames.is_empty() {
        warn!("沒有可編碼的影格，略過 {}", output.display());
        return Ok(false);
    }

    info!(
        "開始編碼 [{}] {} 格 -> {}",
        encoder.name(),
        frames.len(),
        output.display()
    );

    if let Err(e) = encoder.encode(frames, output, params) {
        remove_partial_output(output);
        return Err(e);
    }

    info!("編碼完成: {}", output.display());
    Ok(true)
}

fn remove_partial_output(output: &Path) {
    if output.exists() {
        match fs::remove_file(output) {
            Ok(()) => debug!("已刪除不完整的輸出檔: {}", output.display()),
            Err(e) => warn!("無法刪除不完整的輸出檔 {}: {e}", output.display()),
        }
    }
}

/// 每格顯示時間（百分之一秒），至少 1
#[must_use]
pub fn gif_delay_centis(fps: u32) -> u16 {
    let millis = 1000 / fps.max(1);
    let centis = (millis + 5) / 10;
    u16::try_from(centis.max(1)).unwrap_or(u16::MAX)
}

fn load_rgba(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)
        .with_context(|| format!("無法讀取影格: {}", path.display()))?
        .to_rgba8())
}

fn load_rgb(path: &Path) -> Result<RgbImage> {
    Ok(image::open(path)
        .with_context(|| format!("無法讀取影格: {}", path.display()))?
        .to_rgb8())
}

/// 子程序的結束狀態與 stderr 內容
struct ProcessOutcome {
    status: ExitStatus,
    stderr: String,
}

/// 啟動子程序並以 `feed` 寫入 stdin
///
/// stderr 由另一個執行緒持續讀取，子程序輸出大量訊息時 stdin 的寫入不會卡住。
/// `feed` 的結果另外回傳，讓呼叫端先檢查結束狀態。
fn run_piped(
    command: &mut Command,
    feed: impl FnOnce(&mut ChildStdin) -> Result<()>,
) -> Result<(ProcessOutcome, Result<()>)> {
    let program = command.get_program().to_string_lossy().into_owned();
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .with_context(|| format!("無法啟動 {program}"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("無法取得 {program} stderr"))?;
    let stderr_reader = thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Err(e) = stderr.read_to_end(&mut buffer) {
            debug!("讀取 stderr 失敗: {e}");
        }
        buffer
    });

    // stdin 在此區塊結束時關閉，子程序才會收到 EOF
    let feed_result = match child.stdin.take() {
        Some(mut stdin) => feed(&mut stdin),
        None => Err(anyhow!("無法取得 {program} stdin")),
    };

    let status = child
        .wait()
        .with_context(|| format!("等待 {program} 結束失敗"))?;
    let stderr = stderr_reader.join().unwrap_or_default();

    Ok((
        ProcessOutcome {
            status,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        },
        feed_result,
    ))
}

/// 透過 stdin 將原始 RGB 影格串流給 ffmpeg
pub struct FfmpegVideoEncoder;

impl FfmpegVideoEncoder {
    fn write_frames(
        stdin: &mut impl Write,
        frames: &[PathBuf],
        first: RgbImage,
        canvas: (u32, u32),
    ) -> Result<()> {
        stdin
            .write_all(first.as_raw())
            .context("無法寫入 ffmpeg stdin")?;

        for path in &frames[1..] {
            let mut frame = load_rgb(path)?;
            if frame.dimensions() != canvas {
                debug!(
                    "影格尺寸 {}x{} 與第一格不同，縮放為 {}x{}",
                    frame.width(),
                    frame.height(),
                    canvas.0,
                    canvas.1
                );
                frame = imageops::resize(&frame, canvas.0, canvas.1, FilterType::Lanczos3);
            }
            stdin
                .write_all(frame.as_raw())
                .context("無法寫入 ffmpeg stdin")?;
        }

        stdin.flush().context("無法寫入 ffmpeg stdin")?;
        Ok(())
    }
}

impl FrameEncoder for FfmpegVideoEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        is_ffmpeg_available()
    }

    fn encode(&self, frames: &[PathBuf], output: &Path, params: &EncodeParams) -> Result<()> {
        let codec = VideoCodec::for_format(params.format)
            .ok_or_else(|| anyhow!("ffmpeg 編碼器不支援此格式: {}", params.format))?;
        let first_path = frames.first().ok_or_else(|| anyhow!("影格列表為空"))?;
        let first = load_rgb(first_path)?;
        let canvas = first.dimensions();

        let ffmpeg = FfmpegCommand::new(
            output,
            canvas,
            params.fps,
            params.quality,
            params.format,
            codec,
        );
        let mut command = ffmpeg.build_command();
        debug!("執行 ffmpeg: {:?}", ffmpeg.build_args());
        let (outcome, write_result) = run_piped(&mut command, |stdin| {
            Self::write_frames(stdin, frames, first, canvas)
        })?;

        if !outcome.status.success() {
            bail!(
                "ffmpeg 編碼失敗 ({}): {}",
                outcome.status,
                outcome.stderr.trim()
            );
        }
        write_result?;

        if !ffmpeg.destination_path().exists() {
            bail!("ffmpeg 未產生輸出檔: {}", output.display());
        }
        Ok(())
    }
}

/// 以 `gif` crate 產生無限循環的動畫 GIF
pub struct GifFrameEncoder;

impl FrameEncoder for GifFrameEncoder {
    fn name(&self) -> &str {
        "gif"
    }

    fn encode(&self, frames: &[PathBuf], output: &Path, params: &EncodeParams) -> Result<()> {
        let first_path = frames.first().ok_or_else(|| anyhow!("影格列表為空"))?;
        let first = load_rgba(first_path)?;
        let (width, height) = first.dimensions();
        let gif_width = u16::try_from(width).context("GIF 寬度超過 65535")?;
        let gif_height = u16::try_from(height).context("GIF 高度超過 65535")?;

        let file = File::create(output)
            .with_context(|| format!("無法建立輸出檔: {}", output.display()))?;
        let mut encoder = gif::Encoder::new(BufWriter::new(file), gif_width, gif_height, &[])
            .context("無法建立 GIF 編碼器")?;
        encoder
            .set_repeat(Repeat::Infinite)
            .context("無法設定 GIF 循環")?;

        let delay = gif_delay_centis(params.fps);
        let mut pending = Some(first);

        for path in frames {
            let mut frame = match pending.take() {
                Some(first) => first,
                None => load_rgba(path)?,
            };
            if frame.dimensions() != (width, height) {
                frame = imageops::resize(&frame, width, height, FilterType::Lanczos3);
            }

            let mut pixels = frame.into_raw();
            let mut gif_frame =
                gif::Frame::from_rgba_speed(gif_width, gif_height, &mut pixels, GIF_QUANTIZE_SPEED);
            gif_frame.delay = delay;
            gif_frame.dispose = DisposalMethod::Background;
            encoder
                .write_frame(&gif_frame)
                .with_context(|| format!("無法寫入 GIF 影格: {}", path.display()))?;
        }

        let mut writer = encoder.into_inner().context("無法完成 GIF 檔案")?;
        writer.flush().context("無法完成 GIF 檔案")?;
        Ok(())
    }
}
