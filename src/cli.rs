use clap::{Parser, ValueEnum};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::MB;
use crate::errors::AppResult;
use crate::security::InputValidator;

#[derive(Debug, Parser)]
#[command(
    name = "discord-mass-uploader",
    version,
    about = "Upload every file in a set of directories to a Discord channel"
)]
pub struct Cli {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(long, env = "DISCORD_UPLOADER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Target channel ID; prompted for when omitted
    #[arg(long)]
    pub channel: Option<String>,

    /// Directory to scan recursively; repeat for several
    #[arg(long = "dir")]
    pub directories: Vec<PathBuf>,

    /// Maximum batch size; prompted for when omitted
    #[arg(long, value_enum)]
    pub batch_size: Option<BatchSizePreset>,

    /// Where to write the per-batch report (overrides the config)
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BatchSizePreset {
    #[value(name = "10mb")]
    TenMb,
    #[value(name = "50mb")]
    FiftyMb,
    #[value(name = "500mb")]
    FiveHundredMb,
}

impl BatchSizePreset {
    pub fn bytes(self) -> u64 {
        match self {
            BatchSizePreset::TenMb => 10 * MB,
            BatchSizePreset::FiftyMb => 50 * MB,
            BatchSizePreset::FiveHundredMb => 500 * MB,
        }
    }

    /// Anything other than "1" or "2" picks the largest size
    pub fn from_menu_choice(choice: &str) -> Self {
        match choice.trim() {
            "1" => BatchSizePreset::TenMb,
            "2" => BatchSizePreset::FiftyMb,
            _ => BatchSizePreset::FiveHundredMb,
        }
    }
}

/// Everything a run needs that is not stored in the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub channel_id: String,
    pub directories: Vec<PathBuf>,
    pub batch_size: BatchSizePreset,
}

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> AppResult<String> {
        writeln!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    pub fn say(&mut self, message: &str) -> AppResult<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    pub fn ask_token(&mut self) -> AppResult<String> {
        let token = self.ask("Please enter your Discord token:")?;
        InputValidator::validate_token(&token)?;
        Ok(token)
    }

    pub fn ask_channel_id(&mut self) -> AppResult<String> {
        let channel_id = self.ask("Please enter the Channel ID:")?;
        InputValidator::validate_channel_id(&channel_id)?;
        Ok(channel_id)
    }

    pub fn ask_directories(&mut self) -> AppResult<Vec<PathBuf>> {
        let input = self.ask(
            "Please enter directories (nested directories are supported; separate multiple directories with '|'):",
        )?;
        InputValidator::parse_directories(&input)
    }

    pub fn ask_batch_size(&mut self) -> AppResult<BatchSizePreset> {
        let choice = self.ask("Select Max Batch Size for upload:\n1. 10MB\n2. 50MB\n3. 500MB")?;
        Ok(BatchSizePreset::from_menu_choice(&choice))
    }

    /// Fill in whatever the command line left out, in the order a user would be asked
    pub fn resolve_run_request(&mut self, cli: &Cli) -> AppResult<RunRequest> {
        let channel_id = match &cli.channel {
            Some(channel) => {
                InputValidator::validate_channel_id(channel)?;
                channel.trim().to_string()
            }
            None => self.ask_channel_id()?,
        };

        let directories = if cli.directories.is_empty() {
            self.ask_directories()?
        } else {
            cli.directories.clone()
        };

        let batch_size = match cli.batch_size {
            Some(preset) => preset,
            None => self.ask_batch_size()?,
        };

        Ok(RunRequest {
            channel_id,
            directories,
            batch_size,
        })
    }
}
