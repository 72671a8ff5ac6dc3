pub mod load;
pub mod save;
pub mod types;

pub use load::load_settings;
pub use save::save_settings;
pub use types::{
    ConversionSettings, DEFAULT_FPS, DEFAULT_QUALITY, DEFAULT_SETTINGS_FILE, MAX_QUALITY,
    MIN_QUALITY, OutputFormat, OverlayPosition, OverlaySettings, RESOLUTION_PRESETS,
    ResolutionMode,
};
