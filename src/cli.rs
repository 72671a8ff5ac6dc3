//! 命令列參數
//!
//! 優先順序：命令列 > 設定檔 > 預設值

use crate::config::{
    ConversionSettings, DEFAULT_SETTINGS_FILE, MAX_QUALITY, MIN_QUALITY, OutputFormat,
    OverlayPosition, OverlaySettings, ResolutionMode,
};
use clap::Parser;
use log::warn;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "webp-video-converter",
    version,
    about = "將動畫 WebP / GIF / APNG 轉換為影片或 GIF"
)]
pub struct Cli {
    /// 來源檔案或資料夾（資料夾會遞迴掃描）
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// 輸出資料夾
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// 輸出格式：mp4、mkv、webm、gif
    #[arg(short, long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    #[arg(long)]
    pub fps: Option<u32>,

    /// 編碼品質，數字越小品質越高
    #[arg(
        long,
        alias = "crf",
        value_parser = clap::value_parser!(u8).range(i64::from(MIN_QUALITY)..=i64::from(MAX_QUALITY))
    )]
    pub quality: Option<u8>,

    /// original、480p、720p、1080p、4k 或 WxH
    #[arg(long)]
    pub resolution: Option<String>,

    /// 縮放倍率，不等於 1 時優先於解析度
    #[arg(long)]
    pub scale: Option<f64>,

    #[arg(long)]
    pub overlay_image: Option<PathBuf>,

    /// center、top-left、top-right、bottom-left、bottom-right
    #[arg(long)]
    pub overlay_position: Option<String>,

    /// 速度倍率：小於 1 加快，大於 1 放慢
    #[arg(long)]
    pub speed: Option<f64>,

    /// 將所有輸入合併為單一影片
    #[arg(long, conflicts_with = "no_combine")]
    pub combine: bool,

    /// 關閉設定檔中啟用的合併模式
    #[arg(long)]
    pub no_combine: bool,

    /// 影格處理執行緒數，0 代表全部核心
    #[arg(long)]
    pub workers: Option<usize>,

    /// 保留暫存影格資料夾
    #[arg(long, conflicts_with = "no_keep_temp")]
    pub keep_temp: bool,

    /// 關閉設定檔中啟用的暫存保留
    #[arg(long)]
    pub no_keep_temp: bool,

    /// 暫存資料夾的上層目錄
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// 設定檔路徑
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,

    /// 將本次生效的設定寫回設定檔
    #[arg(long)]
    pub save_settings: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_format(raw: &str) -> Result<OutputFormat, String> {
    OutputFormat::parse(raw).ok_or_else(|| format!("不支援的輸出格式: {raw}"))
}

/// `--x` / `--no-x` 成對的開關；都沒給時沿用設定檔
const fn switch(on: bool, off: bool) -> Option<bool> {
    if on {
        Some(true)
    } else if off {
        Some(false)
    } else {
        None
    }
}

impl Cli {
    /// 以命令列參數覆寫既有設定
    #[must_use]
    pub fn apply_to(&self, base: ConversionSettings) -> ConversionSettings {
        let mut settings = base;

        if let Some(dir) = &self.output_dir {
            settings.output_dir.clone_from(dir);
        }
        if let Some(format) = self.format {
            settings.output_format = format;
        }
        if let Some(fps) = self.fps {
            settings.fps = fps;
        }
        if let Some(quality) = self.quality {
            settings.quality = quality;
        }
        if let Some(resolution) = &self.resolution {
            settings.resolution = ResolutionMode::parse(resolution);
        }
        if let ResolutionMode::Preset(name) = &settings.resolution {
            if ResolutionMode::preset_size(name).is_none() {
                warn!("未知的解析度預設 {name}，使用原始解析度");
            }
        }
        if let Some(scale) = self.scale {
            settings.scale_factor = scale;
        }
        if let Some(speed) = self.speed {
            settings.speed_factor = speed;
        }
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if let Some(temp_dir) = &self.temp_dir {
            settings.scratch_root = Some(temp_dir.clone());
        }
        if let Some(combine) = switch(self.combine, self.no_combine) {
            settings.combine = combine;
        }
        if let Some(retain) = switch(self.keep_temp, self.no_keep_temp) {
            settings.retain_scratch = retain;
        }

        let position = self
            .overlay_position
            .as_deref()
            .map(OverlayPosition::parse_or_top_left);

        if let Some(path) = &self.overlay_image {
            settings.overlay = Some(OverlaySettings {
                path: path.clone(),
                position: position.unwrap_or_else(|| settings.overlay_position()),
            });
        } else if let (Some(overlay), Some(position)) = (settings.overlay.as_mut(), position) {
            overlay.position = position;
        }

        settings
    }
}
