//! 轉換工作排程
//!
//! 狀態流程：`Idle → Preparing → (Extracting → Encoding)* → Cleaning → Done`，
//! 設定錯誤時在 `Preparing` 直接進入 `Aborted`，此時尚未觸碰任何檔案。
//!
//! 檔案依序處理；單一檔案內的影格在執行緒池中平行轉換。
//! 單格、單檔或單次編碼的失敗都只記錄在 `RunReport`，不會中止整批工作。

use super::encoder::{EncodeParams, FrameEncoder, default_encoder_for, encode_frames};
use super::extractor::FrameExtractor;
use super::overlay::Overlay;
use super::scratch_store::{ScratchRelease, ScratchStore};
use crate::config::ConversionSettings;
use crate::error::ConvertError;
use crate::tools::ensure_directory_exists;
use log::{debug, error, info, warn};
use rayon::ThreadPoolBuilder;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// 合併模式的輸出檔名
pub const COMBINED_STEM: &str = "combined";

const DISAMBIGUATOR_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    Preparing,
    Extracting,
    Encoding,
    Cleaning,
    Done,
    Aborted,
}

/// 進度事件，只用於顯示
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Status(String),
    /// 0.0 ~ 1.0
    Fraction(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Decode,
    NoFrames,
    Encode,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Decode => "解碼失敗",
            Self::NoFrames => "沒有影格",
            Self::Encode => "編碼失敗",
        };
        write!(f, "{label}")
    }
}

/// 單一檔案（或合併批次）的失敗紀錄
#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub source: PathBuf,
    pub stage: FailureStage,
    pub message: String,
}

impl ItemFailure {
    fn new(source: &Path, stage: FailureStage, message: impl Into<String>) -> Self {
        Self {
            source: source.to_path_buf(),
            stage,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub state: JobState,
    pub outputs: Vec<PathBuf>,
    pub failures: Vec<ItemFailure>,
    pub frames_materialized: usize,
    /// 寫入失敗而被略過的影格數
    pub frames_failed: usize,
    pub retained_scratch: Option<PathBuf>,
}

impl RunReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.frames_failed == 0
    }
}

/// 進度計數：每個檔案計兩步（擷取、編碼）
struct ProgressTracker<'a> {
    total_steps: usize,
    current_step: usize,
    sink: &'a mut dyn FnMut(ProgressEvent),
}

impl<'a> ProgressTracker<'a> {
    fn new(file_count: usize, sink: &'a mut dyn FnMut(ProgressEvent)) -> Self {
        Self {
            total_steps: (file_count * 2).max(1),
            current_step: 0,
            sink,
        }
    }

    fn status(&mut self, message: impl Into<String>) {
        (self.sink)(ProgressEvent::Status(message.into()));
    }

    fn complete_step(&mut self) {
        self.current_step = (self.current_step + 1).min(self.total_steps);
        self.emit_fraction();
    }

    fn complete_all(&mut self) {
        self.current_step = self.total_steps;
        self.emit_fraction();
    }

    fn emit_fraction(&mut self) {
        let fraction = self.current_step as f64 / self.total_steps as f64;
        (self.sink)(ProgressEvent::Fraction(fraction));
    }
}

/// `<stem>_<6 碼十六進位><副檔名>`
#[must_use]
pub fn output_file_name(stem: &str, extension: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{stem}_{}{extension}", &id[..DISAMBIGUATOR_LEN])
}

fn source_stem(source: &Path) -> String {
    source
        .file_stem()
        .map_or_else(|| "output".to_string(), |s| s.to_string_lossy().into_owned())
}

fn display_name(source: &Path) -> String {
    source
        .file_name()
        .map_or_else(|| source.display().to_string(), |s| s.to_string_lossy().into_owned())
}

fn enter(state: JobState) {
    debug!("工作狀態: {state:?}");
}

pub struct JobRunner {
    settings: ConversionSettings,
    encoder: Box<dyn FrameEncoder>,
}

impl JobRunner {
    #[must_use]
    pub fn new(settings: ConversionSettings) -> Self {
        let encoder = default_encoder_for(settings.output_format);
        Self { settings, encoder }
    }

    /// 替換編碼器（測試或其他編碼後端）
    #[must_use]
    pub fn with_encoder(mut self, encoder: Box<dyn FrameEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    #[must_use]
    pub const fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    #[must_use]
    pub fn encoder_name(&self) -> &str {
        self.encoder.name()
    }

    /// 檢查設定，不存取任何檔案
    pub fn validate(&self, sources: &[PathBuf]) -> Result<(), ConvertError> {
        if self.settings.combine && self.settings.output_format.is_gif() {
            return Err(ConvertError::InvalidCombination);
        }

        let speed = self.settings.speed_factor;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ConvertError::InvalidSpeed(speed));
        }

        if sources.is_empty() {
            return Err(ConvertError::NoInputFiles);
        }

        Ok(())
    }

    /// 執行整批轉換
    ///
    /// 只有設定錯誤與無法建立輸出／暫存資料夾或執行緒池會回傳 `Err`；
    /// 其餘失敗記錄在 `RunReport::failures`。暫存資料夾在每條路徑上都會被釋放。
    pub fn run(
        &self,
        sources: &[PathBuf],
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<RunReport, ConvertError> {
        enter(JobState::Preparing);
        if let Err(e) = self.validate(sources) {
            enter(JobState::Aborted);
            error!("設定錯誤，工作中止: {e}");
            return Err(e);
        }

        let settings = &self.settings;
        ensure_directory_exists(&settings.output_dir).map_err(|source| {
            ConvertError::OutputDirectory {
                path: settings.output_dir.clone(),
                source,
            }
        })?;

        let store = ScratchStore::create(settings.scratch_root.as_deref(), settings.retain_scratch)
            .map_err(ConvertError::ScratchStore)?;

        let overlay = settings.overlay.as_ref().and_then(Overlay::load);

        if !self.encoder.is_available() {
            warn!("編碼器 [{}] 無法使用，編碼步驟可能會失敗", self.encoder.name());
        }

        let workers = settings.effective_workers();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("frame-worker-{i}"))
            .build()
            .map_err(|e| ConvertError::WorkerPool(e.to_string()))?;

        info!(
            "開始轉換 {} 個檔案，格式 {}，{} 個執行緒，合併: {}",
            sources.len(),
            settings.output_format,
            workers,
            settings.combine
        );

        let extractor = FrameExtractor::new(settings, overlay.as_ref(), &store, &pool);
        let mut tracker = ProgressTracker::new(sources.len(), progress);
        let mut report = RunReport::default();

        if settings.combine {
            self.convert_combined(sources, &extractor, &store, &mut tracker, &mut report);
        } else {
            self.convert_each(sources, &extractor, &store, &mut tracker, &mut report);
        }

        enter(JobState::Cleaning);
        report.state = JobState::Cleaning;
        match store.release() {
            Ok(ScratchRelease::Retained(path)) => report.retained_scratch = Some(path),
            Ok(ScratchRelease::Removed) => {}
            Err(e) => warn!("無法刪除暫存資料夾: {e}"),
        }

        tracker.status(format!(
            "完成：輸出 {} 個檔案，失敗 {} 項",
            report.outputs.len(),
            report.failures.len()
        ));

        enter(JobState::Done);
        report.state = JobState::Done;
        Ok(report)
    }

    fn output_path(&self, stem: &str) -> PathBuf {
        self.settings
            .output_dir
            .join(output_file_name(stem, self.settings.output_format.extension()))
    }

    fn convert_each(
        &self,
        sources: &[PathBuf],
        extractor: &FrameExtractor<'_>,
        store: &ScratchStore,
        tracker: &mut ProgressTracker<'_>,
        report: &mut RunReport,
    ) {
        let params = EncodeParams::from_settings(&self.settings);
        let total = sources.len();

        for (position, source) in sources.iter().enumerate() {
            let name = display_name(source);

            enter(JobState::Extracting);
            tracker.status(format!("擷取影格 ({}/{total}): {name}", position + 1));
            let frames = match extractor.extract(source, 0) {
                Ok(result) => {
                    report.frames_materialized += result.frames.len();
                    report.frames_failed += result.failed_count;
                    Some(result.frames)
                }
                Err(e) => {
                    error!("來源解碼失敗，略過 {}: {e:#}", source.display());
                    report
                        .failures
                        .push(ItemFailure::new(source, FailureStage::Decode, format!("{e:#}")));
                    None
                }
            };
            tracker.complete_step();

            enter(JobState::Encoding);
            tracker.status(format!("編碼 ({}/{total}): {name}", position + 1));
            match frames {
                Some(frames) if !frames.is_empty() => {
                    let output = self.output_path(&source_stem(source));
                    self.encode_unit(source, &frames, &output, &params, report);
                    store.remove_frames(&frames);
                }
                Some(_) => {
                    warn!("沒有擷取到任何影格，略過編碼: {}", source.display());
                    report
                        .failures
                        .push(ItemFailure::new(source, FailureStage::NoFrames, "沒有擷取到任何影格"));
                }
                None => {}
            }
            tracker.complete_step();
        }
    }

    fn convert_combined(
        &self,
        sources: &[PathBuf],
        extractor: &FrameExtractor<'_>,
        store: &ScratchStore,
        tracker: &mut ProgressTracker<'_>,
        report: &mut RunReport,
    ) {
        let total = sources.len();
        let mut all_frames: Vec<PathBuf> = Vec::new();
        let mut next_index = 0;

        for (position, source) in sources.iter().enumerate() {
            enter(JobState::Extracting);
            tracker.status(format!(
                "擷取影格 ({}/{total}): {}",
                position + 1,
                display_name(source)
            ));

            match extractor.extract(source, next_index) {
                Ok(result) => {
                    if result.frames.is_empty() {
                        warn!("沒有擷取到任何影格: {}", source.display());
                        report.failures.push(ItemFailure::new(
                            source,
                            FailureStage::NoFrames,
                            "沒有擷取到任何影格",
                        ));
                    }
                    // 寫入失敗的影格仍佔用索引，後續檔案不會重複使用同一路徑
                    next_index += result.selected_count;
                    report.frames_materialized += result.frames.len();
                    report.frames_failed += result.failed_count;
                    all_frames.extend(result.frames);
                }
                Err(e) => {
                    error!("來源解碼失敗，略過 {}: {e:#}", source.display());
                    report
                        .failures
                        .push(ItemFailure::new(source, FailureStage::Decode, format!("{e:#}")));
                }
            }
            tracker.complete_step();
        }

        enter(JobState::Encoding);
        tracker.status(format!("編碼合併影片: {} 格", all_frames.len()));
        if all_frames.is_empty() {
            warn!("所有來源都沒有影格，略過合併編碼");
        } else {
            let params = EncodeParams::from_settings(&self.settings);
            let output = self.output_path(COMBINED_STEM);
            self.encode_unit(&output, &all_frames, &output, &params, report);
            store.remove_frames(&all_frames);
        }
        tracker.complete_all();
    }

    fn encode_unit(
        &self,
        source: &Path,
        frames: &[PathBuf],
        output: &Path,
        params: &EncodeParams,
        report: &mut RunReport,
    ) {
        match encode_frames(self.encoder.as_ref(), frames, output, params) {
            Ok(true) => report.outputs.push(output.to_path_buf()),
            Ok(false) => {}
            Err(e) => {
                error!("編碼失敗 {}: {e:#}", output.display());
                report
                    .failures
                    .push(ItemFailure::new(source, FailureStage::Encode, format!("{e:#}")));
            }
        }
    }
}
