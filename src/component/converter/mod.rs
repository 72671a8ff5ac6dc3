//! 動畫圖片轉影片元件
//!
//! 每個來源檔案的處理流程：
//! A. 解碼為完整畫布的影格序列
//! B. 依速度倍率重新取樣
//! C. 平行縮放、疊圖並寫入暫存資料夾
//! D. 交給編碼器產生影片或 GIF
//! E. 清理暫存影格
//!
//! 合併模式下所有檔案共用同一個暫存資料夾與連續的影格索引，最後只編碼一次。

mod compositor;
mod encoder;
mod extractor;
mod ffmpeg_command;
mod job_runner;
mod main;
mod overlay;
mod resampler;
mod resolution;
mod scratch_store;

pub use compositor::FrameCompositor;
pub use encoder::{
    EncodeParams, FfmpegVideoEncoder, FrameEncoder, GifFrameEncoder, default_encoder_for,
    encode_frames, gif_delay_centis,
};
pub use extractor::{ExtractionResult, FrameExtractor, FrameResult, FrameTask, create_frame_tasks};
pub use ffmpeg_command::{FfmpegCommand, VideoCodec};
pub use job_runner::{
    COMBINED_STEM, FailureStage, ItemFailure, JobRunner, JobState, ProgressEvent, RunReport,
    output_file_name,
};
pub use main::WebpConverter;
pub use overlay::{Overlay, anchor_offset, fit_within};
pub use resampler::select_frame_indices;
pub use resolution::resolve_target_size;
pub use scratch_store::{ScratchRelease, ScratchStore, frame_file_name};
