use super::job_runner::{JobRunner, ProgressEvent, RunReport};
use crate::config::ConversionSettings;
use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;

/// 進度條以千分比呈現分數事件
const PROGRESS_SCALE: u64 = 1000;

/// 命令列轉換介面：進度條與結果摘要
pub struct WebpConverter {
    runner: JobRunner,
}

impl WebpConverter {
    #[must_use]
    pub fn new(settings: ConversionSettings) -> Self {
        Self {
            runner: JobRunner::new(settings),
        }
    }

    #[must_use]
    pub const fn from_runner(runner: JobRunner) -> Self {
        Self { runner }
    }

    pub fn run(&self, sources: &[PathBuf]) -> Result<RunReport> {
        println!("{}", style("=== 動畫圖片轉影片 ===").cyan().bold());
        self.print_settings(sources.len());

        let pb = ProgressBar::new(PROGRESS_SCALE);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );

        let mut on_progress = |event: ProgressEvent| match event {
            ProgressEvent::Status(message) => pb.set_message(message),
            ProgressEvent::Fraction(fraction) => {
                pb.set_position((fraction.clamp(0.0, 1.0) * PROGRESS_SCALE as f64).round() as u64);
            }
        };

        let result = self.runner.run(sources, &mut on_progress);
        match &result {
            Ok(_) => pb.finish_with_message("完成"),
            Err(_) => pb.abandon_with_message("已中止"),
        }

        let report = result?;
        print_summary(&report);
        Ok(report)
    }

    fn print_settings(&self, source_count: usize) {
        let settings = self.runner.settings();
        println!("{}", style(format!("輸入檔案: {source_count} 個")).dim());
        println!(
            "{}",
            style(format!(
                "輸出: {} ({})，{} fps，品質 {}",
                settings.output_dir.display(),
                settings.output_format,
                settings.fps,
                settings.quality
            ))
            .dim()
        );
        if (settings.scale_factor - 1.0).abs() > f64::EPSILON {
            println!("{}", style(format!("縮放: {}x", settings.scale_factor)).dim());
        } else {
            println!("{}", style(format!("解析度: {}", settings.resolution)).dim());
        }
        if (settings.speed_factor - 1.0).abs() > f64::EPSILON {
            println!("{}", style(format!("速度倍率: {}", settings.speed_factor)).dim());
        }
        if let Some(overlay) = &settings.overlay {
            println!(
                "{}",
                style(format!("疊圖: {} ({})", overlay.path.display(), overlay.position)).dim()
            );
        }
        if settings.combine {
            println!("{}", style("合併模式：所有檔案輸出為單一影片").dim());
        }
    }
}

fn print_summary(report: &RunReport) {
    println!();
    println!("{}", style("=== 轉換摘要 ===").cyan().bold());
    println!("  輸出: {} 個檔案", style(report.outputs.len()).green());
    for output in &report.outputs {
        println!("    {}", output.display());
    }
    println!("  影格: {} 格", report.frames_materialized);
    if report.frames_failed > 0 {
        println!("  略過影格: {} 格", style(report.frames_failed).yellow());
    }
    if !report.failures.is_empty() {
        println!("  失敗: {} 項", style(report.failures.len()).red());
        for failure in &report.failures {
            println!(
                "    {} [{}] {}",
                style(failure.source.display()).red(),
                failure.stage,
                failure.message
            );
        }
    }
    if let Some(path) = &report.retained_scratch {
        println!(
            "{}",
            style(format!("暫存資料夾已保留: {}", path.display())).yellow()
        );
    }

    info!(
        "轉換完成 - 輸出: {}, 失敗: {}",
        report.outputs.len(),
        report.failures.len()
    );
}
