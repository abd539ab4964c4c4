//! Resume matcher: semantic resume-to-job matching from the command line

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use resume_matcher::cli::{self, Cli, Commands, ConfigAction};
use resume_matcher::input::{FileType, InputManager};
use resume_matcher::output::{formatter_for, OutputFormat};
use resume_matcher::store::OwnerId;
use resume_matcher::{Config, InMemoryStore, MatcherError, MatchingService, Result};
use std::path::{Path, PathBuf};
use std::process;

/// Owner recorded for resumes ingested from the command line
const CLI_OWNER: OwnerId = 0;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, cli.config).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, config: Config, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        Commands::Extract { file, detailed, output } => {
            let format = output_format(&output)?;
            cli::validate_file_extension(&file, &["pdf", "docx", "zip"]).map_err(MatcherError::InvalidInput)?;

            let service = MatchingService::from_config(&config, InMemoryStore::new()).await?;
            let formatter = formatter_for(format, true, detailed);

            let filename = display_name(&file);
            let bytes = std::fs::read(&file)?;

            let rendered = if FileType::from_filename(&filename) == FileType::Zip {
                formatter.format_archive(&service.process_archive(&bytes)?)?
            } else {
                formatter.format_document(&service.process_document(&filename, &bytes)?)?
            };
            println!("{}", rendered);
        }

        Commands::Match { job, resumes, top_n, output } => {
            let format = output_format(&output)?;
            let top_n = top_n.unwrap_or(config.matching.default_top_n);

            let job_text = read_job_description(&job)?;
            let service = MatchingService::from_config(&config, InMemoryStore::new()).await?;
            ingest(&service, &resumes, format).await?;

            let job_record = service.create_job(&display_name(&job), &job_text).await?;
            info!("Ranking candidates for job {} ({})", job_record.id, job_record.title);

            let result = service.rank_candidates(job_record.id, top_n).await?;
            println!("{}", formatter_for(format, true, false).format_match(&result)?);
        }

        Commands::Search { query, resumes, k, output } => {
            let format = output_format(&output)?;
            let k = k.unwrap_or(config.matching.default_search_k);

            let service = MatchingService::from_config(&config, InMemoryStore::new()).await?;
            ingest(&service, &resumes, format).await?;

            let hits = service.search_text(&query, k).await?;
            println!("{}", formatter_for(format, true, false).format_search(&query, &hits)?);
        }

        Commands::Config { action } => {
            let path = config_path.unwrap_or_else(Config::config_path);
            match action {
                Some(ConfigAction::Show) | None => {
                    println!("Configuration file: {}\n", path.display());
                    let rendered = toml::to_string_pretty(&config)
                        .map_err(|e| MatcherError::Configuration(e.to_string()))?;
                    println!("{}", rendered);
                }
                Some(ConfigAction::Reset) => {
                    Config::default().save_to(&path)?;
                    println!("Configuration reset to defaults at {}", path.display());
                }
            }
        }
    }

    Ok(())
}

fn output_format(output: &str) -> Result<OutputFormat> {
    cli::parse_output_format(output).map_err(MatcherError::InvalidInput)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Plain-text job descriptions are read as-is; PDF and DOCX go through extraction
fn read_job_description(path: &Path) -> Result<String> {
    let filename = display_name(path);
    let input = InputManager::new();

    if input.is_supported(&filename) {
        input.extract_text(&filename, &std::fs::read(path)?)
    } else {
        cli::validate_file_extension(path, &["txt", "md"]).map_err(MatcherError::InvalidInput)?;
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Upload every resume file into the service's store, reporting per-file failures
async fn ingest(service: &MatchingService<InMemoryStore>, paths: &[PathBuf], format: OutputFormat) -> Result<()> {
    let progress = if format == OutputFormat::Console {
        ProgressBar::new(paths.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let filename = display_name(path);
        progress.set_message(filename.clone());
        match std::fs::read(path) {
            Ok(bytes) => files.push((filename, bytes)),
            Err(e) => warn!("Cannot read {}: {}", path.display(), e),
        }
        progress.inc(1);
    }

    progress.set_message("redacting and embedding");
    let report = service.upload_batch(CLI_OWNER, files).await;
    progress.finish_and_clear();
    let report = report?;
    for failure in &report.failures {
        warn!("Not ingested: {} ({})", failure.filename, failure.reason);
    }
    info!("Ingested {} resumes", report.stored.len());

    if report.stored.is_empty() {
        return Err(MatcherError::InvalidInput("No resumes could be ingested".to_string()));
    }
    Ok(())
}
