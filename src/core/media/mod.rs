//! Media storage and bulk migration.

pub mod fs_store;
pub mod jobs;
pub mod log;
pub mod migration;
pub mod store;
pub mod transcode;

pub use fs_store::FsObjectStore;
pub use jobs::{JobError, JobState, JobStatus, MigrationJobs, RETAINED_JOBS};
pub use log::{LogEntry, LogLevel, MigrationLog};
pub use migration::{
    target_key, AbortFlag, MediaReferences, MigrationCounts, MigrationError, MigrationOptions, MigrationProgress,
    MigrationRunner, MigrationSummary, MAX_CONCURRENCY,
};
pub use store::{ListPage, MemoryObjectStore, ObjectInfo, ObjectStore, StoreError, StoreResult};
pub use transcode::{default_ffmpeg_args, FfmpegTranscoder, PassthroughTranscoder, TranscodeError, Transcoder};
