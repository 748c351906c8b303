use anyhow::Context;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use discord_mass_uploader::cli::{Cli, Prompter, RunRequest};
use discord_mass_uploader::config::{self, Config, DEFAULT_ALLOWED_EXTENSIONS};
use discord_mass_uploader::report::FileReport;
use discord_mass_uploader::security::InputValidator;
use discord_mass_uploader::uploader::{DiscordClient, UploadQueue};
use discord_mass_uploader::{logging, scanner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::get_config_path()?,
    };
    let loaded = config::read_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    let mut config = loaded.config.clone();

    // Logging to file is best effort; console logging always works
    let logs_dir = config::get_logs_directory(&config_path).ok();
    match logging::init_logging(&config.log_level, logs_dir.as_deref()) {
        Ok(Some(log_path)) => log::debug!("Logging to {}", log_path.display()),
        Ok(None) => {}
        Err(e) => eprintln!("Failed to initialise logging: {}", e),
    }

    if let Some(warning) = loaded.parse_warning() {
        log::warn!("{}", warning);
    }

    let run_id = Uuid::new_v4();
    log::info!("Starting Discord Mass Uploader (run {})", run_id);

    let request = {
        let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());

        if !config.has_token() {
            loaded.ensure_replaceable()?;
            return first_run_setup(&mut prompter, &config_path, config);
        }
        InputValidator::validate_token(&config.discord_token)?;

        prompter.resolve_run_request(&cli)?
    };

    config.max_batch_size = request.batch_size.bytes();
    let report_path = cli
        .report
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.report_path));

    run_upload(&config, &request, report_path, run_id).await
}

/// Store the token with default extensions, then stop so the user can review the file
fn first_run_setup<R: io::BufRead, W: io::Write>(
    prompter: &mut Prompter<R, W>,
    config_path: &std::path::Path,
    mut config: Config,
) -> anyhow::Result<()> {
    config.discord_token = prompter.ask_token()?;
    config.allowed_file_extensions = DEFAULT_ALLOWED_EXTENSIONS
        .iter()
        .map(|extension| extension.to_string())
        .collect();
    config::save_config(config_path, &config).context("Failed to save configuration")?;

    prompter.say(
        "Configuration has been updated with your Discord token and default allowed file extensions.",
    )?;
    prompter.say(&format!(
        "Please update {} as needed and restart the application.",
        config_path.display()
    ))?;
    Ok(())
}

async fn run_upload(
    config: &Config,
    request: &RunRequest,
    report_path: PathBuf,
    run_id: Uuid,
) -> anyhow::Result<()> {
    let files = scanner::scan_files(&request.directories, &config.allowed_file_extensions);
    log::info!("Total files found after filtering: {}", files.len());

    let client = DiscordClient::new(
        &config.api_base_url,
        &config.discord_token,
        &request.channel_id,
        config.request_timeout(),
    )
    .context("Failed to build HTTP client")?;

    let queue = UploadQueue::new(
        Arc::new(client),
        config.retry_policy(),
        config.pacing_policy(),
    );
    let tally = queue
        .process_upload_queue(files, &config.capacity_limits(), &FileReport::new(report_path))
        .await?;

    log::info!(
        "Process completed (run {}). Success: {}, Fail: {}, Ignored: {}",
        run_id,
        tally.total_succeeded,
        tally.total_failed,
        tally.ignored_file_names.len()
    );
    Ok(())
}
