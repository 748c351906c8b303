use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::errors::{AppError, AppResult};

fn snowflake_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{17,20}$").expect("valid snowflake regex"))
}

fn extension_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\.[a-z0-9]{1,10}$").expect("valid extension regex"))
}

pub struct InputValidator;

impl InputValidator {
    pub fn validate_channel_id(channel_id: &str) -> AppResult<()> {
        let trimmed = channel_id.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("channel_id", "Channel ID cannot be empty"));
        }

        if !snowflake_pattern().is_match(trimmed) {
            return Err(AppError::invalid_channel(trimmed));
        }

        Ok(())
    }

    pub fn validate_token(token: &str) -> AppResult<()> {
        let trimmed = token.trim();

        if trimmed.is_empty() {
            return Err(AppError::invalid_token("token cannot be empty"));
        }

        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(AppError::invalid_token("token contains whitespace"));
        }

        if trimmed.len() > 512 {
            return Err(AppError::invalid_token("token too long"));
        }

        Ok(())
    }

    /// Split a `|`-separated directory list, dropping blanks
    pub fn parse_directories(input: &str) -> AppResult<Vec<PathBuf>> {
        let directories: Vec<PathBuf> = input
            .split('|')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .collect();

        if directories.is_empty() {
            return Err(AppError::validation(
                "directories",
                "At least one directory is required",
            ));
        }

        Ok(directories)
    }

    /// Lowercase an extension and make sure it carries its leading dot
    pub fn normalize_extension(extension: &str) -> AppResult<String> {
        let trimmed = extension.trim().to_lowercase();
        let normalized = if trimmed.starts_with('.') {
            trimmed
        } else {
            format!(".{}", trimmed)
        };

        if !extension_pattern().is_match(&normalized) {
            return Err(AppError::validation(
                "allowed_file_extensions",
                &format!("Invalid extension '{}'", extension),
            ));
        }

        Ok(normalized)
    }

    pub fn normalize_extensions(extensions: &[String]) -> AppResult<Vec<String>> {
        let mut normalized = Vec::with_capacity(extensions.len());
        for extension in extensions {
            let extension = Self::normalize_extension(extension)?;
            if !normalized.contains(&extension) {
                normalized.push(extension);
            }
        }
        Ok(normalized)
    }
}
