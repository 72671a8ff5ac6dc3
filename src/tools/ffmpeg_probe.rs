use anyhow::{Context, Result, bail};
use std::process::{Command, Stdio};

pub const FFMPEG_BINARY: &str = "ffmpeg";

/// 檢查 ffmpeg 是否可執行
#[must_use]
pub fn is_ffmpeg_available() -> bool {
    Command::new(FFMPEG_BINARY)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// 取得 ffmpeg 版本字串（`ffmpeg -version` 的第一行）
pub fn ffmpeg_version() -> Result<String> {
    let output = Command::new(FFMPEG_BINARY)
        .arg("-version")
        .output()
        .context("無法執行 ffmpeg")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffmpeg 執行失敗: {stderr}");
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_version_line(&stdout).ok_or_else(|| anyhow::anyhow!("無法解析 ffmpeg 版本"))
}

/// 解析版本行（例如 "ffmpeg version 6.1.1 Copyright ..."）
fn parse_version_line(output: &str) -> Option<String> {
    let line = output.lines().next()?;
    let rest = line.strip_prefix("ffmpeg version ")?;
    rest.split_whitespace().next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_line() {
        let output = "ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023\nbuilt with gcc";
        assert_eq!(
            parse_version_line(output),
            Some("6.1.1-3ubuntu5".to_string())
        );
    }

    #[test]
    fn test_parse_version_line_invalid() {
        assert!(parse_version_line("").is_none());
        assert!(parse_version_line("something else").is_none());
    }
}
