use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use super::batch_planner::{Batch, CandidateFile};
use super::progress_tracker::RunTally;
use super::retry::CallOutcome;
use crate::errors::AppResult;

/// Single-use upload target handed out by Discord for one file of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSlot {
    /// Batch-local index echoed back from the reservation request
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    pub upload_url: String,
    pub upload_filename: String,
}

/// Discord echoes attachment ids back as either JSON strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

/// Proof that a file's bytes reached its slot, consumed when publishing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedReference {
    pub id: String,
    pub filename: String,
    pub uploaded_filename: String,
}

/// The remote side of the three-step upload protocol.
///
/// Each method performs exactly one request. Callers wrap them with
/// [`super::retry::execute`]; an `Err` is reserved for requests that could not
/// be constructed at all.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    async fn reserve_slots(&self, batch: &Batch) -> AppResult<CallOutcome<Vec<UploadSlot>>>;

    async fn transfer(
        &self,
        slot: &UploadSlot,
        file: &CandidateFile,
    ) -> AppResult<CallOutcome<UploadedReference>>;

    async fn publish(
        &self,
        batch: &Batch,
        references: &[UploadedReference],
    ) -> AppResult<CallOutcome<()>>;

    async fn notify_run_summary(&self, tally: &RunTally) -> AppResult<CallOutcome<()>>;
}
