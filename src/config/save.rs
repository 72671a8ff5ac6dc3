use crate::config::types::ConversionSettings;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn save_settings(path: &Path, settings: &ConversionSettings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

    fs::write(path, content)
        .with_context(|| format!("Failed to write settings to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load::load_settings;
    use crate::config::types::{OverlayPosition, OverlaySettings, ResolutionMode};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");

        let settings = ConversionSettings {
            resolution: ResolutionMode::Preset("720p".to_string()),
            overlay: Some(OverlaySettings {
                path: PathBuf::from("logo.png"),
                position: OverlayPosition::BottomRight,
            }),
            quality: 28,
            ..ConversionSettings::default()
        };

        save_settings(&path, &settings).unwrap();
        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded, settings);
    }
}
