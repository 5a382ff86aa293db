// Worker constants (No magic values)
use std::time::Duration;

/// Default retry base delay (2s)
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

/// Default attempt bound per transfer (0 would mean unlimited)
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;

/// Upper bound on a single backoff wait (60s)
pub const DEFAULT_RETRY_MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Checkpoint after every N items (0 disables checkpointing)
pub const DEFAULT_CHECKPOINT_EVERY: usize = 25;
