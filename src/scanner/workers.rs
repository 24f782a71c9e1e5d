//! Worker sizing policy.
//!
//! An explicit request always wins. In auto mode a core or two is left free
//! so the host stays responsive, and the pool never grows beyond
//! [`MAX_AUTO_WORKERS`].

/// Upper bound on automatically chosen workers.
pub const MAX_AUTO_WORKERS: usize = 32;

/// Pick the number of digesting workers.
///
/// # Arguments
///
/// * `requested` - Explicit worker count, 0 for automatic sizing
/// * `available` - Detected host parallelism (0 is treated as 1)
///
/// # Example
///
/// ```
/// use hashmatch::scanner::decide_worker_count;
///
/// assert_eq!(decide_worker_count(0, 8), 6);
/// assert_eq!(decide_worker_count(0, 64), 32);
/// assert_eq!(decide_worker_count(100, 8), 100);
/// ```
#[must_use]
pub fn decide_worker_count(requested: usize, available: usize) -> usize {
    if requested > 0 {
        return requested;
    }

    let available = available.max(1);
    let reserved = if available <= 4 { 1 } else { 2 };
    available.saturating_sub(reserved).clamp(1, MAX_AUTO_WORKERS)
}

/// Detect how many threads the host can run in parallel.
///
/// Falls back to 1 when the platform cannot tell.
#[must_use]
pub fn available_parallelism() -> usize {
    match std::thread::available_parallelism() {
        Ok(n) => n.get(),
        Err(e) => {
            log::debug!("Could not detect available parallelism, assuming 1: {}", e);
            1
        }
    }
}
