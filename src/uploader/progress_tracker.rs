/// Discord rejects message content longer than this
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// How a batch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    Published,
    SlotReservationFailed,
    /// Some transfers failed so nothing was published
    PartialTransferFailure { transferred: usize, failed: usize },
    /// Every file was transferred but the completion message was rejected
    PublishFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub batch_index: usize,
    pub succeeded_files: Vec<String>,
    pub failed_files: Vec<String>,
    pub published: bool,
    pub status: BatchStatus,
}

impl BatchOutcome {
    pub fn published(batch_index: usize, file_names: Vec<String>) -> Self {
        Self {
            batch_index,
            succeeded_files: file_names,
            failed_files: Vec::new(),
            published: true,
            status: BatchStatus::Published,
        }
    }

    /// A batch that was not published; every file in it counts as failed
    pub fn failed(batch_index: usize, file_names: Vec<String>, status: BatchStatus) -> Self {
        Self {
            batch_index,
            succeeded_files: Vec::new(),
            failed_files: file_names,
            published: false,
            status,
        }
    }

    pub fn detail_line(&self) -> String {
        let number = self.batch_index + 1;
        match &self.status {
            BatchStatus::Published => format!(
                "Batch {}: {} files uploaded successfully.",
                number,
                self.succeeded_files.len()
            ),
            BatchStatus::SlotReservationFailed => {
                format!("Batch {}: Failed to get upload URLs.", number)
            }
            BatchStatus::PartialTransferFailure {
                transferred,
                failed,
            } => format!(
                "Batch {}: {} succeeded, {} failed. Message not posted.",
                number, transferred, failed
            ),
            BatchStatus::PublishFailed => format!(
                "Batch {}: All files uploaded but failed to post message.",
                number
            ),
        }
    }
}

/// Run-wide totals, folded one batch at a time by the sequential driver
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTally {
    pub total_succeeded: usize,
    pub total_failed: usize,
    pub failed_file_names: Vec<String>,
    pub ignored_file_names: Vec<String>,
    pub detail_lines: Vec<String>,
}

impl RunTally {
    pub fn new(ignored_file_names: Vec<String>) -> Self {
        Self {
            ignored_file_names,
            ..Self::default()
        }
    }

    pub fn from_outcomes<I>(ignored_file_names: Vec<String>, outcomes: I) -> Self
    where
        I: IntoIterator<Item = BatchOutcome>,
    {
        let mut tally = Self::new(ignored_file_names);
        for outcome in outcomes {
            tally.record(outcome);
        }
        tally
    }

    pub fn record(&mut self, outcome: BatchOutcome) {
        self.detail_lines.push(outcome.detail_line());
        self.total_succeeded += outcome.succeeded_files.len();
        self.total_failed += outcome.failed_files.len();
        self.failed_file_names.extend(outcome.failed_files);
    }

    /// Text posted to the channel once the run is over
    pub fn summary_message(&self) -> String {
        let mut content = format!(
            "✅ **Successful uploads**: {}\n❌ **Failed uploads**: {}\n🚫 **Ignored files**: {}",
            self.total_succeeded,
            self.total_failed,
            self.ignored_file_names.len()
        );

        let sections: Vec<(&str, &[String])> = [
            ("Failed files", self.failed_file_names.as_slice()),
            ("Ignored files", self.ignored_file_names.as_slice()),
        ]
        .into_iter()
        .filter(|(_, names)| !names.is_empty())
        .collect();

        if sections.is_empty() {
            content.push_str("\n\n**No failed or ignored files**");
            return content;
        }

        let mut remaining = MAX_MESSAGE_CHARS.saturating_sub(content.chars().count());
        let mut sections_left = sections.len();
        for (title, names) in sections {
            let section = name_section(title, names, remaining / sections_left);
            remaining = remaining.saturating_sub(section.chars().count());
            sections_left -= 1;
            content.push_str(&section);
        }

        content
    }
}

/// Render a titled name list that fits in `budget` characters
fn name_section(title: &str, names: &[String], budget: usize) -> String {
    let mut section = format!("\n\n**{}:**", title);
    let mut used = section.chars().count();

    for (i, name) in names.iter().enumerate() {
        let line_len = name.chars().count() + 1;
        let remaining_after = names.len() - i - 1;
        let reserve = if remaining_after > 0 {
            more_marker(remaining_after).chars().count()
        } else {
            0
        };

        if used + line_len + reserve > budget {
            section.push_str(&more_marker(names.len() - i));
            return section;
        }

        section.push('\n');
        section.push_str(name);
        used += line_len;
    }

    section
}

fn more_marker(count: usize) -> String {
    format!("\n…and {} more", count)
}
