use crate::config::OutputFormat;
use crate::tools::FFMPEG_BINARY;
use std::path::{Path, PathBuf};
use std::process::Command;

/// 影片編碼器，mp4 與 mkv 共用 x264
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    X264,
    Vp9,
}

impl VideoCodec {
    #[must_use]
    pub const fn for_format(format: OutputFormat) -> Option<Self> {
        match format {
            OutputFormat::Mp4 | OutputFormat::Mkv => Some(Self::X264),
            OutputFormat::Webm => Some(Self::Vp9),
            OutputFormat::Gif => None,
        }
    }

    #[must_use]
    pub const fn encoder_name(self) -> &'static str {
        match self {
            Self::X264 => "libx264",
            Self::Vp9 => "libvpx-vp9",
        }
    }
}

/// 由原始 RGB 影格串流（stdin）編碼成影片的 ffmpeg 命令
pub struct FfmpegCommand {
    destination_path: PathBuf,
    width: u32,
    height: u32,
    fps: u32,
    quality: u8,
    format: OutputFormat,
    codec: VideoCodec,
}

impl FfmpegCommand {
    #[must_use]
    pub fn new(
        destination_path: &Path,
        frame_size: (u32, u32),
        fps: u32,
        quality: u8,
        format: OutputFormat,
        codec: VideoCodec,
    ) -> Self {
        Self {
            destination_path: destination_path.to_path_buf(),
            width: frame_size.0,
            height: frame_size.1,
            fps: fps.max(1),
            quality,
            format,
            codec,
        }
    }

    #[must_use]
    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }

    #[must_use]
    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-loglevel", "error",
            "-y",
            "-f", "rawvideo",
            "-pix_fmt", "rgb24",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        args.extend([
            "-s".to_string(),
            format!("{}x{}", self.width, self.height),
            "-r".to_string(),
            self.fps.to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
            "-an".to_string(),
            // yuv420p 需要偶數寬高
            "-vf".to_string(),
            "pad=ceil(iw/2)*2:ceil(ih/2)*2".to_string(),
            "-c:v".to_string(),
            self.codec.encoder_name().to_string(),
        ]);

        match self.codec {
            VideoCodec::X264 => {
                args.extend(["-preset", "medium", "-crf"].map(String::from));
                args.push(self.quality.to_string());
            }
            VideoCodec::Vp9 => {
                args.push("-crf".to_string());
                args.push(self.quality.to_string());
                args.extend(["-b:v", "0"].map(String::from));
            }
        }

        args.extend(["-pix_fmt", "yuv420p"].map(String::from));

        match self.format {
            OutputFormat::Mp4 => args.extend(["-movflags", "+faststart", "-f", "mp4"].map(String::from)),
            OutputFormat::Mkv => args.extend(["-f", "matroska"].map(String::from)),
            OutputFormat::Webm => args.extend(["-f", "webm"].map(String::from)),
            OutputFormat::Gif => {}
        }

        args.push(self.destination_path.to_string_lossy().to_string());
        args
    }

    #[must_use]
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new(FFMPEG_BINARY);
        cmd.args(self.build_args());
        cmd
    }
}
