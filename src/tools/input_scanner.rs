use super::path_validator::validate_file_exists;
use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 可作為來源的動畫圖片副檔名
pub const SOURCE_EXTENSIONS: [&str; 4] = ["webp", "gif", "png", "apng"];

#[must_use]
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// 掃描資料夾內的來源檔案，依路徑排序
pub fn scan_source_files(directory: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| is_source_file(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();

    files.sort();
    files
}

/// 展開命令列輸入：檔案保留原順序，資料夾展開為其中的來源檔案
///
/// 不存在的檔案只發出警告並原樣保留，由轉換流程記為解碼失敗，不中斷整批
#[must_use]
pub fn collect_source_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut sources = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let found = scan_source_files(input);
            if found.is_empty() {
                warn!("資料夾內沒有可轉換的檔案: {}", input.display());
            }
            sources.extend(found);
        } else {
            if let Err(e) = validate_file_exists(input) {
                warn!("{e:#}");
            }
            sources.push(input.clone());
        }
    }

    sources
}
