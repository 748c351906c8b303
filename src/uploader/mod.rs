// Main uploader module - orchestrates batch uploads to a Discord channel
//
// Files are packed into batches, then each batch goes through
// slot reservation, concurrent transfers and a single publishing message.

pub mod batch_planner;
pub mod discord_client;
pub mod gateway;
pub mod progress_tracker;
pub mod retry;
pub mod upload_queue;

pub use batch_planner::{plan_batches, Batch, CandidateFile, CapacityLimits};
pub use discord_client::DiscordClient;
pub use gateway::{StorageGateway, UploadSlot, UploadedReference};
pub use progress_tracker::{BatchOutcome, BatchStatus, RunTally};
pub use retry::{CallOutcome, RetryPolicy, Sleeper, TokioSleeper};
pub use upload_queue::{DelayJitter, PacingPolicy, RandomJitter, UploadQueue};
