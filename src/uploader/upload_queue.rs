use futures::future::join_all;
use rand::Rng;
use std::sync::Arc;
use tokio::time::Duration;

use crate::errors::AppResult;
use crate::report::ReportSink;
use crate::scanner::partition_oversized;

use super::batch_planner::{plan_batches, Batch, CandidateFile, CapacityLimits};
use super::gateway::{StorageGateway, UploadSlot};
use super::progress_tracker::{BatchOutcome, BatchStatus, RunTally};
use super::retry::{self, CallOutcome, RetryPolicy, Sleeper, TokioSleeper};

/// Courtesy pause taken after every batch
#[derive(Debug, Clone)]
pub struct PacingPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Source of the random component of the courtesy pause
pub trait DelayJitter: Send + Sync {
    fn pick(&self, min: Duration, max: Duration) -> Duration;
}

pub struct RandomJitter;

impl DelayJitter for RandomJitter {
    fn pick(&self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let millis = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
        Duration::from_millis(millis)
    }
}

/// Drives the reserve → transfer → publish protocol for each batch
pub struct UploadQueue {
    gateway: Arc<dyn StorageGateway>,
    retry_policy: RetryPolicy,
    pacing: PacingPolicy,
    sleeper: Arc<dyn Sleeper>,
    jitter: Arc<dyn DelayJitter>,
}

impl UploadQueue {
    pub fn new(
        gateway: Arc<dyn StorageGateway>,
        retry_policy: RetryPolicy,
        pacing: PacingPolicy,
    ) -> Self {
        Self {
            gateway,
            retry_policy,
            pacing,
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(RandomJitter),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_jitter(mut self, jitter: Arc<dyn DelayJitter>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Upload every file, one batch at a time, then report and post the summary.
    ///
    /// Batch failures never abort the run; they are folded into the returned
    /// tally. Only a request that could not be built is returned as an error.
    pub async fn process_upload_queue(
        &self,
        files: Vec<CandidateFile>,
        limits: &CapacityLimits,
        report: &dyn ReportSink,
    ) -> AppResult<RunTally> {
        let (valid_files, ignored_files) = partition_oversized(files, limits);

        for file in &ignored_files {
            log::warn!(
                "Ignoring {} ({:.2} MB exceeds the batch size limit)",
                file.display_name,
                file.size_mb()
            );
        }

        let mut tally = RunTally::new(
            ignored_files
                .into_iter()
                .map(|f| f.display_name)
                .collect(),
        );

        if valid_files.is_empty() {
            log::warn!("No valid files to upload.");
        }

        let batches = plan_batches(valid_files, limits);
        log::info!("Created {} batch(es).", batches.len());

        let total_batches = batches.len();
        for (batch_index, batch) in batches.iter().enumerate() {
            let outcome = self
                .process_batch(batch, batch_index, total_batches)
                .await?;
            tally.record(outcome);
        }

        log::info!(
            "All batches processed. Success: {}, Fail: {}",
            tally.total_succeeded,
            tally.total_failed
        );

        if let Err(e) = report.write(&tally.detail_lines) {
            log::error!("Failed to write detailed report: {}", e);
        }

        self.send_summary(&tally).await?;

        Ok(tally)
    }

    /// Upload a single batch, then take the courtesy pause whatever the result
    pub async fn process_batch(
        &self,
        batch: &Batch,
        batch_index: usize,
        total_batches: usize,
    ) -> AppResult<BatchOutcome> {
        let outcome = self.upload_batch(batch, batch_index, total_batches).await?;

        let delay = self.jitter.pick(self.pacing.min_delay, self.pacing.max_delay);
        log::debug!("Pausing {:?} before the next batch", delay);
        self.sleeper.sleep(delay).await;

        Ok(outcome)
    }

    async fn upload_batch(
        &self,
        batch: &Batch,
        batch_index: usize,
        total_batches: usize,
    ) -> AppResult<BatchOutcome> {
        let batch_number = batch_index + 1;
        log::info!(
            "Processing Batch {}/{} (Remaining: {})",
            batch_number,
            total_batches,
            total_batches.saturating_sub(batch_number)
        );
        log::info!(
            "Files in this batch: {}, Total size: {:.2} MB",
            batch.len(),
            batch.total_size_mb()
        );

        let gateway = self.gateway.as_ref();
        let policy = &self.retry_policy;
        let sleeper = self.sleeper.as_ref();

        let reservation = retry::execute(
            policy,
            sleeper,
            &format!("Batch {} slot reservation", batch_number),
            move || gateway.reserve_slots(batch),
        )
        .await?;

        let slots = match reservation {
            CallOutcome::Success(slots) => match assign_slots(batch.len(), slots) {
                Some(slots) => slots,
                None => {
                    log::error!(
                        "Batch {}: Discord returned the wrong number of upload URLs.",
                        batch_number
                    );
                    return Ok(reservation_failed(batch, batch_index));
                }
            },
            other => {
                log::error!(
                    "Batch {}: Failed to get upload URLs ({}).",
                    batch_number,
                    other.describe()
                );
                return Ok(reservation_failed(batch, batch_index));
            }
        };

        let transfers = batch.files().iter().zip(slots.iter()).map(move |(file, slot)| {
            let label = format!("Upload of {}", file.display_name);
            async move {
                log::info!(
                    "Uploading file: {} (Size: {:.2} MB)",
                    file.display_name,
                    file.size_mb()
                );
                let outcome =
                    retry::execute(policy, sleeper, &label, move || gateway.transfer(slot, file))
                        .await;
                (file, outcome)
            }
        });

        let mut references = Vec::with_capacity(batch.len());
        let mut failed = 0;
        for (file, outcome) in join_all(transfers).await {
            match outcome? {
                CallOutcome::Success(reference) => references.push(reference),
                other => {
                    log::error!(
                        "Failed to upload file {}: {}",
                        file.display_name,
                        other.describe()
                    );
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            log::warn!(
                "Batch {}: Some files failed to upload. Skipping message creation.",
                batch_number
            );
            return Ok(BatchOutcome::failed(
                batch_index,
                batch.file_names(),
                BatchStatus::PartialTransferFailure {
                    transferred: references.len(),
                    failed,
                },
            ));
        }

        let references = &references;
        let publish = retry::execute(
            policy,
            sleeper,
            &format!("Batch {} message", batch_number),
            move || gateway.publish(batch, references),
        )
        .await?;

        if publish.is_success() {
            log::info!("Batch {}: Message posted successfully.", batch_number);
            Ok(BatchOutcome::published(batch_index, batch.file_names()))
        } else {
            log::error!(
                "Batch {}: Failed to post message ({}).",
                batch_number,
                publish.describe()
            );
            Ok(BatchOutcome::failed(
                batch_index,
                batch.file_names(),
                BatchStatus::PublishFailed,
            ))
        }
    }

    async fn send_summary(&self, tally: &RunTally) -> AppResult<()> {
        let gateway = self.gateway.as_ref();
        let outcome = retry::execute(
            &self.retry_policy,
            self.sleeper.as_ref(),
            "Summary message",
            move || gateway.notify_run_summary(tally),
        )
        .await?;

        if outcome.is_success() {
            log::info!("Summary message sent successfully.");
        } else {
            log::error!("Failed to send summary message: {}", outcome.describe());
        }

        Ok(())
    }
}

fn reservation_failed(batch: &Batch, batch_index: usize) -> BatchOutcome {
    BatchOutcome::failed(
        batch_index,
        batch.file_names(),
        BatchStatus::SlotReservationFailed,
    )
}

/// Order slots by the batch-local index they were requested with.
///
/// Falls back to response order when the ids were not echoed back, and gives
/// up when the slot count does not match the file count.
fn assign_slots(file_count: usize, slots: Vec<UploadSlot>) -> Option<Vec<UploadSlot>> {
    if slots.len() != file_count {
        return None;
    }

    let by_id: Option<Vec<UploadSlot>> = (0..file_count)
        .map(|index| {
            let id = index.to_string();
            slots.iter().find(|slot| slot.id == id).cloned()
        })
        .collect();

    Some(by_id.unwrap_or(slots))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(id: &str) -> UploadSlot {
        UploadSlot {
            id: id.to_string(),
            upload_url: format!("https://uploads.example/{}", id),
            upload_filename: format!("uploads/{}", id),
        }
    }

    #[test]
    fn test_assign_slots_orders_by_id() {
        let slots = vec![slot("1"), slot("0"), slot("2")];

        let assigned = assign_slots(3, slots).unwrap();

        let ids: Vec<&str> = assigned.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_assign_slots_falls_back_to_response_order() {
        let slots = vec![slot("a"), slot("b")];

        let assigned = assign_slots(2, slots.clone()).unwrap();

        assert_eq!(assigned, slots);
    }

    #[test]
    fn test_assign_slots_rejects_count_mismatch() {
        assert!(assign_slots(3, vec![slot("0"), slot("1")]).is_none());
        assert!(assign_slots(1, Vec::new()).is_none());
    }

    #[test]
    fn test_random_jitter_stays_in_range() {
        let min = Duration::from_secs(5);
        let max = Duration::from_secs(10);

        for _ in 0..200 {
            let picked = RandomJitter.pick(min, max);
            assert!(picked >= min && picked <= max);
        }
        assert_eq!(RandomJitter.pick(max, min), max);
    }
}
