//! Pipeline constants: retry budget, delays and progress checkpoints

/// Illustration attempts per page before the page is left without an image
pub const ILLUSTRATION_MAX_ATTEMPTS: u32 = 3;

/// Delay before each retry of a failed illustration attempt
pub const ILLUSTRATION_RETRY_DELAY_MS: u64 = 2_000;

/// Delay before each page after the first, to stay under image-service rate limits
pub const ILLUSTRATION_THROTTLE_DELAY_MS: u64 = 1_000;

/// Pause after reporting 100% so an observer can show the finished state
pub const RESULT_SETTLE_DELAY_MS: u64 = 1_000;

// Progress checkpoints (percent)
pub const PROGRESS_START: u8 = 0;
pub const PROGRESS_STRUCTURE_DONE: u8 = 15;
pub const PROGRESS_ILLUSTRATION_START: u8 = 20;
pub const PROGRESS_ILLUSTRATION_END: u8 = 80;
pub const PROGRESS_COVER: u8 = 85;
pub const PROGRESS_COMPLETE: u8 = 100;

// Phase labels
pub const PHASE_STRUCTURE: &str = "architecting structure";
pub const PHASE_MATERIALIZE: &str = "assembling project";
pub const PHASE_COVER: &str = "designing cover";
pub const PHASE_COMPLETE: &str = "complete";
pub const PHASE_CANCELLED: &str = "cancelled";

/// Materializer defaults
pub const DEFAULT_PROJECT_TITLE: &str = "Untitled Masterpiece";
pub const DEFAULT_CHAPTER_TITLE: &str = "Chapter";

/// Persisted reservations older than this are treated as abandoned runs
pub const STALE_RESERVATION_HOURS: i64 = 12;
