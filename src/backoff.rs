//! Retry pacing: finite backoff schedules and the sleeper used between attempts.
//!
//! A [`BackoffPolicy`] only describes the plan (how many attempts, how long to wait after each).
//! Callers start a fresh [`BackoffSchedule`] per operation, so one policy can be shared by every
//! request a client makes.

// crates.io
use rand::Rng;
// self
use crate::_prelude::*;

/// Plan for a bounded sequence of retry attempts.
pub trait BackoffPolicy
where
	Self: Send + Sync,
{
	/// Total attempts the schedule yields.
	fn attempts(&self) -> u32;

	/// Wait that follows the 1-based `attempt` when it fails.
	fn delay(&self, attempt: u32) -> StdDuration;
}

/// Lazily yields one wait per planned attempt and tracks the attempt counter.
pub struct BackoffSchedule<'a> {
	policy: &'a dyn BackoffPolicy,
	total: u32,
	counter: u32,
}
impl<'a> BackoffSchedule<'a> {
	/// Starts a schedule at attempt zero.
	pub fn new(policy: &'a dyn BackoffPolicy) -> Self {
		Self { policy, total: policy.attempts(), counter: 0 }
	}

	/// Attempts handed out so far (the current attempt once iteration started).
	pub fn counter(&self) -> u32 {
		self.counter
	}

	/// Attempts planned in total.
	pub fn total(&self) -> u32 {
		self.total
	}

	/// True when the current attempt is the final planned one.
	pub fn is_last(&self) -> bool {
		self.counter >= self.total
	}
}
impl Iterator for BackoffSchedule<'_> {
	type Item = StdDuration;

	fn next(&mut self) -> Option<Self::Item> {
		if self.counter >= self.total {
			return None;
		}

		self.counter += 1;

		Some(self.policy.delay(self.counter))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let remaining = self.total.saturating_sub(self.counter) as usize;

		(remaining, Some(remaining))
	}
}
impl Debug for BackoffSchedule<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BackoffSchedule")
			.field("counter", &self.counter)
			.field("total", &self.total)
			.finish()
	}
}

/// Geometric backoff: `initial_delay * multiplier^(attempt - 1)`, capped at `max_delay`, with
/// optional proportional jitter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExponentialBackoff {
	/// Total attempts.
	pub attempts: u32,
	/// Wait after the first failed attempt.
	pub initial_delay: StdDuration,
	/// Growth factor applied per attempt.
	pub multiplier: f64,
	/// Upper bound for any single wait.
	pub max_delay: StdDuration,
	/// Fraction (0.0..=1.0) of each wait added as random jitter.
	pub jitter: f64,
}
impl ExponentialBackoff {
	const DEFAULT_INITIAL_DELAY: StdDuration = StdDuration::from_secs(1);
	const DEFAULT_MAX_DELAY: StdDuration = StdDuration::from_secs(30);
	const DEFAULT_MULTIPLIER: f64 = 2.0;

	/// Creates a policy with `attempts` tries, a one-second first wait doubling up to 30 s.
	pub fn new(attempts: u32) -> Self {
		Self {
			attempts,
			initial_delay: Self::DEFAULT_INITIAL_DELAY,
			multiplier: Self::DEFAULT_MULTIPLIER,
			max_delay: Self::DEFAULT_MAX_DELAY,
			jitter: 0.0,
		}
	}

	/// Overrides the first wait.
	pub fn with_initial_delay(mut self, delay: StdDuration) -> Self {
		self.initial_delay = delay;

		self
	}

	/// Overrides the growth factor; values below 1.0 are clamped to 1.0.
	pub fn with_multiplier(mut self, multiplier: f64) -> Self {
		self.multiplier = if multiplier.is_finite() { multiplier.max(1.0) } else { 1.0 };

		self
	}

	/// Overrides the per-wait cap.
	pub fn with_max_delay(mut self, delay: StdDuration) -> Self {
		self.max_delay = delay;

		self
	}

	/// Adds up to `fraction` of each wait as random jitter (clamped to 0.0..=1.0).
	pub fn with_jitter(mut self, fraction: f64) -> Self {
		self.jitter = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };

		self
	}

	fn base_delay(&self, attempt: u32) -> StdDuration {
		let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
		let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
		let capped = scaled.min(self.max_delay.as_secs_f64());

		StdDuration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
	}
}
impl Default for ExponentialBackoff {
	fn default() -> Self {
		Self::new(5)
	}
}
impl BackoffPolicy for ExponentialBackoff {
	fn attempts(&self) -> u32 {
		self.attempts
	}

	fn delay(&self, attempt: u32) -> StdDuration {
		let base = self.base_delay(attempt);

		if self.jitter <= 0.0 || base.is_zero() {
			return base;
		}

		let extra = base.mul_f64(rand::rng().random_range(0.0..=self.jitter));

		base.saturating_add(extra)
	}
}

/// Blocks the calling thread between attempts.
pub trait Sleeper
where
	Self: Send + Sync,
{
	/// Waits for `duration`.
	fn sleep(&self, duration: StdDuration);
}

/// [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;
impl Sleeper for ThreadSleeper {
	fn sleep(&self, duration: StdDuration) {
		if !duration.is_zero() {
			std::thread::sleep(duration);
		}
	}
}
