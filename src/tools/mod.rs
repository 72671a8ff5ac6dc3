mod ffmpeg_probe;
mod frame_decoder;
mod input_scanner;
mod path_validator;

pub use ffmpeg_probe::{FFMPEG_BINARY, ffmpeg_version, is_ffmpeg_available};
pub use frame_decoder::{decode_frames, decode_overlay};
pub use input_scanner::{SOURCE_EXTENSIONS, collect_source_files, is_source_file, scan_source_files};
pub use path_validator::ensure_directory_exists;
