//! 暫存資料夾生命週期管理
//!
//! 每次執行（合併模式下為整批）擁有一個唯一的暫存資料夾。
//! 明確呼叫 `release` 時刪除或保留；未呼叫就被 drop 時同樣會清理，
//! 因此提前返回或 panic 都不會留下暫存檔。

use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};

const SCRATCH_PREFIX: &str = "frames_";

/// 釋放結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScratchRelease {
    Removed,
    Retained(PathBuf),
}

#[derive(Debug)]
pub struct ScratchStore {
    dir: Option<TempDir>,
    path: PathBuf,
    retain: bool,
}

impl ScratchStore {
    /// 在 `root` 下建立暫存資料夾；`root` 為 `None` 時使用系統暫存目錄
    pub fn create(root: Option<&Path>, retain: bool) -> io::Result<Self> {
        let mut builder = Builder::new();
        builder.prefix(SCRATCH_PREFIX);

        let dir = match root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        let path = dir.path().to_path_buf();
        debug!("建立暫存資料夾: {}", path.display());

        Ok(Self {
            dir: Some(dir),
            path,
            retain,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 影格路徑完全由索引決定，並行寫入時不需要鎖
    #[must_use]
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.path.join(frame_file_name(index))
    }

    /// 刪除一批已編碼完成的影格，缺少的檔案直接略過
    pub fn remove_frames(&self, frames: &[PathBuf]) -> usize {
        let mut removed = 0;
        for frame in frames {
            match fs::remove_file(frame) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("無法刪除暫存影格 {}: {e}", frame.display()),
            }
        }
        debug!("已刪除 {removed} 個暫存影格");
        removed
    }

    /// 釋放暫存資料夾，只會執行一次
    pub fn release(mut self) -> io::Result<ScratchRelease> {
        let Some(dir) = self.dir.take() else {
            return Ok(ScratchRelease::Removed);
        };

        if self.retain {
            let path = dir.keep();
            info!("保留暫存資料夾: {}", path.display());
            return Ok(ScratchRelease::Retained(path));
        }

        dir.close()?;
        debug!("已刪除暫存資料夾: {}", self.path.display());
        Ok(ScratchRelease::Removed)
    }
}

impl Drop for ScratchStore {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if self.retain {
                let path = dir.keep();
                warn!("執行中斷，保留暫存資料夾: {}", path.display());
            } else if let Err(e) = dir.close() {
                warn!("無法刪除暫存資料夾 {}: {e}", self.path.display());
            }
        }
    }
}

/// 補零的影格檔名，字典序即為播放順序
///
/// 補到 10 位，涵蓋整個 `u32` 範圍；合併模式的總格數也不會超出。
#[must_use]
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{index:010}.png")
}
