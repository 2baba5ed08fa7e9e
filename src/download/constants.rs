//! Constants for the download module (size thresholds, rate limiting).

use std::time::Duration;

/// Minimum size of an acceptable PDF. Smaller downloads are discarded, and an
/// existing file larger than this counts as already downloaded.
pub const MIN_PDF_BYTES: u64 = 1000;

/// Default minimum delay between downloads from the same domain.
pub const DEFAULT_DOWNLOAD_DELAY: Duration = Duration::from_millis(250);

/// Warning threshold for cumulative rate limit delay per domain (30 seconds).
pub const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Maximum Retry-After header value honored (5 minutes).
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

/// Suffix of the in-progress file a body is streamed into before acceptance.
pub const PARTIAL_SUFFIX: &str = ".part";
