//! 影格擷取
//!
//! 解碼來源檔案 → 依速度倍率重新取樣 → 在有上限的執行緒池中平行轉換並寫入暫存資料夾。
//! 每格的索引在派送前就已決定，工作完成順序不影響最終排序。

use super::compositor::FrameCompositor;
use super::overlay::Overlay;
use super::resampler::select_frame_indices;
use super::resolution::resolve_target_size;
use super::scratch_store::ScratchStore;
use crate::config::ConversionSettings;
use crate::tools::decode_frames;
use anyhow::Result;
use image::RgbaImage;
use log::{debug, error, info, warn};
use rayon::ThreadPool;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// 單格轉換任務
#[derive(Debug, Clone)]
pub struct FrameTask<'a> {
    pub frame: &'a RgbaImage,
    pub output_path: PathBuf,
    pub index: usize,
}

/// 單格轉換結果
#[derive(Debug)]
pub struct FrameResult {
    pub output_path: PathBuf,
    pub index: usize,
    pub success: bool,
    pub error_message: Option<String>,
}

/// 單一檔案的擷取結果
#[derive(Debug, Default)]
pub struct ExtractionResult {
    /// 實際寫入成功的影格，依播放順序排列
    pub frames: Vec<PathBuf>,
    pub decoded_count: usize,
    pub selected_count: usize,
    pub failed_count: usize,
    pub target_size: Option<(u32, u32)>,
}

pub struct FrameExtractor<'a> {
    settings: &'a ConversionSettings,
    overlay: Option<&'a Overlay>,
    store: &'a ScratchStore,
    pool: &'a ThreadPool,
}

impl<'a> FrameExtractor<'a> {
    #[must_use]
    pub const fn new(
        settings: &'a ConversionSettings,
        overlay: Option<&'a Overlay>,
        store: &'a ScratchStore,
        pool: &'a ThreadPool,
    ) -> Self {
        Self {
            settings,
            overlay,
            store,
            pool,
        }
    }

    /// 擷取單一來源檔案；解碼失敗時回傳錯誤，由呼叫端略過此檔案
    pub fn extract(&self, source: &Path, start_index: usize) -> Result<ExtractionResult> {
        let raw_frames = decode_frames(source)?;
        let result = self.materialize(&raw_frames, start_index);

        info!(
            "擷取完成 {}: 解碼 {} 格，選取 {} 格，寫入 {} 格",
            source.display(),
            result.decoded_count,
            result.selected_count,
            result.frames.len()
        );

        Ok(result)
    }

    /// 將已解碼的影格重新取樣、轉換並寫入暫存資料夾
    ///
    /// 會等待所有派送出去的影格完成才返回。
    #[must_use]
    pub fn materialize(&self, raw_frames: &[RgbaImage], start_index: usize) -> ExtractionResult {
        let indices = select_frame_indices(raw_frames.len(), self.settings.speed_factor);
        let Some(first) = indices.first().map(|&i| &raw_frames[i]) else {
            warn!("來源沒有任何影格");
            return ExtractionResult::default();
        };

        let target_size = resolve_target_size(first.dimensions(), self.settings);
        let compositor = FrameCompositor::new(
            target_size,
            self.overlay,
            self.settings.output_format.is_gif(),
        );

        debug!(
            "影格 {}x{} -> {}x{}，起始索引 {}",
            first.width(),
            first.height(),
            target_size.0,
            target_size.1,
            start_index
        );

        let tasks = create_frame_tasks(raw_frames, &indices, start_index, self.store);
        let results = self.pool.install(|| {
            tasks
                .par_iter()
                .map(|task| run_frame_task(&compositor, task))
                .collect::<Vec<_>>()
        });

        let failed: Vec<&FrameResult> = results.iter().filter(|r| !r.success).collect();
        for result in &failed {
            debug!(
                "略過影格 {}: {}",
                result.index,
                result.error_message.as_deref().unwrap_or_default()
            );
        }
        let failed_count = failed.len();
        if failed_count > 0 {
            warn!("{failed_count} 個影格寫入失敗，將從輸出中略過");
        }

        ExtractionResult {
            frames: results
                .into_iter()
                .filter(|r| r.success)
                .map(|r| r.output_path)
                .collect(),
            decoded_count: raw_frames.len(),
            selected_count: indices.len(),
            failed_count,
            target_size: Some(target_size),
        }
    }
}

/// 建立轉換任務列表，索引從 `start_index` 連續編號
#[must_use]
pub fn create_frame_tasks<'a>(
    raw_frames: &'a [RgbaImage],
    indices: &[usize],
    start_index: usize,
    store: &ScratchStore,
) -> Vec<FrameTask<'a>> {
    indices
        .iter()
        .enumerate()
        .map(|(position, &source_index)| {
            let index = start_index + position;
            FrameTask {
                frame: &raw_frames[source_index],
                output_path: store.frame_path(index),
                index,
            }
        })
        .collect()
}

fn run_frame_task(compositor: &FrameCompositor, task: &FrameTask<'_>) -> FrameResult {
    match compositor.materialize(task.frame, &task.output_path) {
        Ok(()) => FrameResult {
            output_path: task.output_path.clone(),
            index: task.index,
            success: true,
            error_message: None,
        },
        Err(e) => {
            error!("影格寫入失敗 [{}]: {e:#}", task.index);
            FrameResult {
                output_path: task.output_path.clone(),
                index: task.index,
                success: false,
                error_message: Some(format!("{e:#}")),
            }
        }
    }
}
