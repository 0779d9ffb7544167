use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Count of jobs accepted but not yet holding a gate slot.
///
/// Incremented at acceptance, decremented the instant a job acquires its
/// slot. A single atomic read-modify-write is the whole critical section, so
/// readers never contend with the gate.
pub struct PendingCounter {
	count: AtomicUsize,
}

/// Drop guard for one accepted-but-not-started job.
///
/// Created at acceptance; dropped when the job acquires its gate slot (or
/// when the caller abandons the wait, so the count never leaks).
pub struct PendingGuard<'a> {
	counter: &'a PendingCounter,
}

impl Default for PendingCounter {
	fn default() -> Self {
		Self { count: AtomicUsize::new(0) }
	}
}

impl PendingCounter {
	#[must_use]
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Record one accepted job; returns the new pending count.
	pub fn increment(&self) -> usize {
		self.count.fetch_add(1, Ordering::Relaxed) + 1
	}

	/// Record one job starting execution. Saturates at zero: jobs produced by
	/// other processes land in the shared queue without passing through this
	/// counter.
	pub fn decrement(&self) {
		self.decrement_by(1);
	}

	pub fn decrement_by(&self, n: usize) {
		let _ = self.count.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| Some(current.saturating_sub(n)));
	}

	#[must_use]
	pub fn current(&self) -> usize {
		self.count.load(Ordering::Relaxed)
	}

	/// Increment now, decrement on drop.
	pub fn guard(&self) -> PendingGuard<'_> {
		self.increment();
		PendingGuard { counter: self }
	}
}

impl Drop for PendingGuard<'_> {
	fn drop(&mut self) {
		self.counter.decrement();
	}
}
