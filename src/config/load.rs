use crate::config::types::ConversionSettings;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// 讀取保存的設定；檔案不存在時回傳預設值
pub fn load_settings(path: &Path) -> Result<ConversionSettings> {
    if !path.exists() {
        return Ok(ConversionSettings::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse settings from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{OutputFormat, OverlayPosition};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let settings = load_settings(&temp_dir.path().join("missing.json")).unwrap();
        assert_eq!(settings, ConversionSettings::default());
    }

    #[test]
    fn test_load_partial_settings() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, r#"{"combine": true, "output_format": "mkv"}"#).unwrap();

        let settings = load_settings(&path).unwrap();
        assert!(settings.combine);
        assert_eq!(settings.output_format, OutputFormat::Mkv);
    }

    #[test]
    fn test_load_unknown_overlay_position_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"overlay": {"path": "logo.png", "position": "middle"}, "fps": 24}"#,
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();
        let overlay = settings.overlay.unwrap();
        assert_eq!(overlay.path, PathBuf::from("logo.png"));
        assert_eq!(overlay.position, OverlayPosition::TopLeft);
        assert_eq!(settings.fps, 24);
    }

    #[test]
    fn test_load_overlay_position_spellings() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"overlay": {"path": "logo.png", "position": "Bottom_Right"}}"#,
        )
        .unwrap();

        let overlay = load_settings(&path).unwrap().overlay.unwrap();
        assert_eq!(overlay.position, OverlayPosition::BottomRight);
    }

    #[test]
    fn test_load_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        assert!(load_settings(&path).is_err());
    }
}
