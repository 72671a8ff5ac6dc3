use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 預設設定檔名稱（與舊版 GUI 共用的扁平 key-value 紀錄）
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

pub const DEFAULT_FPS: u32 = 16;
pub const DEFAULT_QUALITY: u8 = 22;
pub const MIN_QUALITY: u8 = 18;
pub const MAX_QUALITY: u8 = 30;

/// 已知的解析度預設（名稱比對不分大小寫）
pub const RESOLUTION_PRESETS: [(&str, (u32, u32)); 4] = [
    ("480p", (854, 480)),
    ("720p", (1280, 720)),
    ("1080p", (1920, 1080)),
    ("4k", (3840, 2160)),
];

/// 解析度模式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// 維持原始解析度
    #[default]
    Original,
    /// 預設解析度名稱，未知名稱等同原始解析度
    Preset(String),
    /// 自訂寬高，任一值缺少或為 0 視為未設定
    Custom {
        width: Option<u32>,
        height: Option<u32>,
    },
}

impl ResolutionMode {
    /// 解析 `original`、`720p`、`preset:720p`、`1280x720`、`custom:1280x720`
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim();
        let lower = value.to_lowercase();

        if lower.is_empty() || lower == "original" || lower == "same resolution" {
            return Self::Original;
        }

        if let Some(custom) = lower.strip_prefix("custom:") {
            return Self::parse_dimensions(custom).unwrap_or(Self::Custom {
                width: None,
                height: None,
            });
        }

        if let Some(preset) = lower.strip_prefix("preset:") {
            return Self::Preset(preset.trim().to_string());
        }

        if let Some(custom) = Self::parse_dimensions(&lower) {
            return custom;
        }

        Self::Preset(lower)
    }

    fn parse_dimensions(raw: &str) -> Option<Self> {
        let (w, h) = raw.split_once('x')?;
        let width = w.trim().parse::<u32>().ok()?;
        let height = h.trim().parse::<u32>().ok()?;
        Some(Self::Custom {
            width: Some(width),
            height: Some(height),
        })
    }

    /// 預設名稱對應的尺寸
    #[must_use]
    pub fn preset_size(name: &str) -> Option<(u32, u32)> {
        let name = name.to_lowercase();
        RESOLUTION_PRESETS
            .iter()
            .find(|(preset, _)| *preset == name)
            .map(|(_, size)| *size)
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Preset(name) => write!(f, "preset:{name}"),
            Self::Custom { width, height } => write!(
                f,
                "custom:{}x{}",
                width.unwrap_or_default(),
                height.unwrap_or_default()
            ),
        }
    }
}

/// 疊圖位置
///
/// 設定檔中無法辨識的名稱會退回左上角，不會讓整份設定讀取失敗。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPosition {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl OverlayPosition {
    /// 解析位置名稱；無法辨識的值回傳 `None`
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace('_', "-").as_str() {
            "center" => Some(Self::Center),
            "top-left" => Some(Self::TopLeft),
            "top-right" => Some(Self::TopRight),
            "bottom-left" => Some(Self::BottomLeft),
            "bottom-right" => Some(Self::BottomRight),
            _ => None,
        }
    }

    /// 解析位置名稱，無法辨識時警告並退回左上角
    #[must_use]
    pub fn parse_or_top_left(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|| {
            warn!("無法辨識的疊圖位置 {raw}，改用左上角");
            Self::TopLeft
        })
    }
}

impl<'de> Deserialize<'de> for OverlayPosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_or_top_left(&raw))
    }
}

impl fmt::Display for OverlayPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Center => "center",
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        };
        write!(f, "{name}")
    }
}

/// 疊圖設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlaySettings {
    pub path: PathBuf,
    #[serde(default)]
    pub position: OverlayPosition,
}

/// 輸出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Mkv,
    Webm,
    Gif,
}

impl OutputFormat {
    /// 解析格式名稱，接受 `mp4` 或 `.mp4`
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().trim_start_matches('.').to_lowercase().as_str() {
            "mp4" => Some(Self::Mp4),
            "mkv" => Some(Self::Mkv),
            "webm" => Some(Self::Webm),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// 含點號的副檔名
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => ".mp4",
            Self::Mkv => ".mkv",
            Self::Webm => ".webm",
            Self::Gif => ".gif",
        }
    }

    #[must_use]
    pub const fn is_gif(self) -> bool {
        matches!(self, Self::Gif)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension().trim_start_matches('.'))
    }
}

/// 單次轉換的完整設定，執行期間不可變
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    pub resolution: ResolutionMode,
    /// 縮放倍率，不等於 1.0 時優先於解析度模式
    pub scale_factor: f64,
    pub overlay: Option<OverlaySettings>,
    /// 速度倍率：0.5 加快一倍，2.0 放慢一倍
    pub speed_factor: f64,
    pub fps: u32,
    /// 編碼品質（CRF），數字越小品質越高
    pub quality: u8,
    pub output_format: OutputFormat,
    pub combine: bool,
    /// 同時處理影格的執行緒數，0 代表使用全部可用核心
    pub workers: usize,
    pub output_dir: PathBuf,
    /// 保留暫存資料夾（除錯用）
    pub retain_scratch: bool,
    /// 暫存資料夾的上層目錄，未設定時使用系統暫存目錄
    pub scratch_root: Option<PathBuf>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            resolution: ResolutionMode::Original,
            scale_factor: 1.0,
            overlay: None,
            speed_factor: 1.0,
            fps: DEFAULT_FPS,
            quality: DEFAULT_QUALITY,
            output_format: OutputFormat::Mp4,
            combine: false,
            workers: 0,
            output_dir: PathBuf::from("."),
            retain_scratch: false,
            scratch_root: None,
        }
    }
}

impl ConversionSettings {
    /// 實際使用的執行緒數
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
    }

    /// 疊圖位置，未設定疊圖時回傳預設值
    #[must_use]
    pub fn overlay_position(&self) -> OverlayPosition {
        self.overlay
            .as_ref()
            .map(|overlay| overlay.position)
            .unwrap_or_default()
    }
}
