use anyhow::Result;
use clap::Parser;
use console::style;
use log::{info, warn};
use std::process::ExitCode;
use webp_video_converter::cli::Cli;
use webp_video_converter::component::WebpConverter;
use webp_video_converter::config::{load_settings, save_settings};
use webp_video_converter::init;
use webp_video_converter::tools::{collect_source_files, ffmpeg_version};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init::init(cli.verbose);

    let settings = cli.apply_to(load_settings(&cli.settings)?);
    if cli.save_settings {
        save_settings(&cli.settings, &settings)?;
        info!("設定已儲存: {}", cli.settings.display());
    }

    if !settings.output_format.is_gif() {
        match ffmpeg_version() {
            Ok(version) => info!("ffmpeg 版本: {version}"),
            Err(e) => warn!("找不到 ffmpeg: {e:#}"),
        }
    }

    let sources = collect_source_files(&cli.inputs);
    let report = match WebpConverter::new(settings).run(&sources) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} {e:#}", style("錯誤:").red().bold());
            return Ok(ExitCode::FAILURE);
        }
    };

    if report.failures.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}
