//! 整體執行的致命錯誤
//!
//! 單一影格或單一檔案的失敗不會出現在這裡，而是記錄在 `RunReport` 中。

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("無法將多個檔案合併為 GIF，請改用影片格式或取消合併")]
    InvalidCombination,

    #[error("速度倍率必須是大於 0 的數值: {0}")]
    InvalidSpeed(f64),

    #[error("沒有任何輸入檔案")]
    NoInputFiles,

    #[error("無法建立輸出資料夾 {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("無法建立暫存資料夾: {0}")]
    ScratchStore(#[source] std::io::Error),

    #[error("無法建立工作執行緒池: {0}")]
    WorkerPool(String),
}

impl ConvertError {
    /// 設定錯誤在任何檔案存取前就會被回報
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCombination | Self::InvalidSpeed(_) | Self::NoInputFiles
        )
    }
}
