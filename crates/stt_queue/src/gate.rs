use crate::error::IntakeError;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting gate bounding concurrent access to the compute backend.
///
/// At most `capacity` holders may be inside the guarded region at once.
/// Permits are granted in FIFO order, so no waiter starves under bounded
/// load. Release is tied to [`GatePermit`] drop, which keeps the
/// acquire/release pairing exact even when the guarded operation errors.
#[derive(Clone)]
pub struct AdmissionGate {
	slots: Arc<Semaphore>,
	capacity: usize,
}

/// Held proof of one gate slot. Dropping it frees the slot.
#[must_use]
pub struct GatePermit {
	_inner: OwnedSemaphorePermit,
}

impl AdmissionGate {
	#[must_use]
	pub fn new(capacity: usize) -> Self {
		Self {
			slots: Arc::new(Semaphore::new(capacity)),
			capacity,
		}
	}

	/// Wait for a free slot.
	///
	/// # Errors
	/// Returns [`IntakeError::NotReady`] once the gate has been closed for
	/// shutdown.
	pub async fn acquire(&self) -> Result<GatePermit, IntakeError> {
		let permit = Arc::clone(&self.slots).acquire_owned().await.map_err(|_| IntakeError::NotReady)?;
		Ok(GatePermit { _inner: permit })
	}

	/// Stop granting slots; waiters and future callers get [`IntakeError::NotReady`].
	pub fn close(&self) {
		self.slots.close();
	}

	/// Slots currently free. Readable without holding the gate.
	#[must_use]
	pub fn available_slots(&self) -> usize {
		self.slots.available_permits()
	}

	#[must_use]
	pub const fn capacity(&self) -> usize {
		self.capacity
	}

	/// Slots currently held.
	#[must_use]
	pub fn active(&self) -> usize {
		self.capacity - self.slots.available_permits()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test]
	async fn test_acquires_up_to_capacity_without_blocking() {
		let gate = AdmissionGate::new(3);
		let mut permits = Vec::new();
		for _ in 0..3 {
			permits.push(gate.acquire().await.unwrap());
		}
		assert_eq!(gate.available_slots(), 0);
		assert_eq!(gate.active(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_extra_acquire_blocks_until_release() {
		let gate = AdmissionGate::new(1);
		let held = gate.acquire().await.unwrap();

		let blocked = tokio::time::timeout(Duration::from_millis(50), gate.acquire()).await;
		assert!(blocked.is_err(), "second acquire should block while the slot is held");

		drop(held);
		let unblocked = tokio::time::timeout(Duration::from_millis(50), gate.acquire()).await;
		assert!(unblocked.is_ok());
	}

	#[tokio::test]
	async fn test_release_restores_available_slots() {
		let gate = AdmissionGate::new(2);
		let permit = gate.acquire().await.unwrap();
		assert_eq!(gate.available_slots(), 1);
		drop(permit);
		assert_eq!(gate.available_slots(), 2);
		assert_eq!(gate.active(), 0);
	}

	#[tokio::test]
	async fn test_closed_gate_rejects_callers() {
		let gate = AdmissionGate::new(1);
		gate.close();
		assert!(matches!(gate.acquire().await, Err(IntakeError::NotReady)));
	}
}
