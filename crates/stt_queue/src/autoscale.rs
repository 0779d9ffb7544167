use crate::error::IntakeError;
use crate::queue::QueueTransport;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Lifecycle handle for the compute backend (a GPU pod, typically).
#[async_trait]
pub trait PodController: Send + Sync {
	/// # Errors
	/// Returns an error when the control plane rejects or drops the call.
	async fn start(&self) -> Result<(), IntakeError>;

	/// # Errors
	/// Returns an error when the control plane rejects or drops the call.
	async fn stop(&self) -> Result<(), IntakeError>;
}

/// What one queue-depth observation asks of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleSignal {
	Hold,
	Up,
	Down,
}

/// Idle-timeout hysteresis over queue-depth samples.
///
/// An empty queue arms a timer; once it has run for the full idle timeout,
/// one scale-down fires and is latched until work reappears. A non-empty
/// queue disarms the timer, clears the latch, and asks for a scale-up while
/// the backend is not marked running. The latch is what prevents
/// scale-down/up oscillation around an empty queue.
#[derive(Debug)]
pub struct IdleTracker {
	idle_timeout: Duration,
	idle_since: Option<Instant>,
	scale_down_sent: bool,
	backend_running: bool,
}

impl IdleTracker {
	#[must_use]
	pub const fn new(idle_timeout: Duration) -> Self {
		Self {
			idle_timeout,
			idle_since: None,
			scale_down_sent: false,
			backend_running: false,
		}
	}

	#[must_use]
	pub const fn with_backend_running(mut self, running: bool) -> Self {
		self.backend_running = running;
		self
	}

	/// Fold one depth sample into the state machine.
	pub fn observe(&mut self, depth: usize, now: Instant) -> ScaleSignal {
		if depth == 0 {
			return match self.idle_since {
				None => {
					self.idle_since = Some(now);
					info!("Queue empty; starting idle timer");
					ScaleSignal::Hold
				}
				Some(since) if now.duration_since(since) >= self.idle_timeout && !self.scale_down_sent => {
					self.scale_down_sent = true;
					ScaleSignal::Down
				}
				Some(_) => ScaleSignal::Hold,
			};
		}

		self.idle_since = None;
		self.scale_down_sent = false;
		if self.backend_running {
			ScaleSignal::Hold
		} else {
			ScaleSignal::Up
		}
	}

	pub fn mark_running(&mut self, running: bool) {
		self.backend_running = running;
	}

	#[must_use]
	pub const fn backend_running(&self) -> bool {
		self.backend_running
	}

	#[must_use]
	pub const fn idle_timer_running(&self) -> bool {
		self.idle_since.is_some()
	}
}

/// Polls queue depth and drives the backend lifecycle.
///
/// Fully decoupled from job processing: a failed control call is logged and
/// the next poll retries; nothing here can stall the intake pipeline.
pub struct AutoscaleMonitor<T: QueueTransport, C: PodController> {
	queue: T,
	controller: C,
	tracker: IdleTracker,
	poll_interval: Duration,
}

impl<T: QueueTransport, C: PodController> AutoscaleMonitor<T, C> {
	pub const fn new(queue: T, controller: C, tracker: IdleTracker, poll_interval: Duration) -> Self {
		Self {
			queue,
			controller,
			tracker,
			poll_interval,
		}
	}

	/// Run until cancelled.
	pub async fn run(mut self, cancel: CancellationToken) {
		info!(poll_interval_secs = self.poll_interval.as_secs(), "Autoscale monitor started");
		loop {
			self.poll_once().await;
			tokio::select! {
				() = cancel.cancelled() => {
					info!("Autoscale monitor cancelled; shutting down");
					break;
				}
				() = sleep(self.poll_interval) => {}
			}
		}
	}

	async fn poll_once(&mut self) {
		let depth = match self.queue.len().await {
			Ok(depth) => depth,
			Err(e) => {
				error!(error = %e, "Failed to read queue length");
				return;
			}
		};

		match self.tracker.observe(depth, Instant::now()) {
			ScaleSignal::Hold => {}
			ScaleSignal::Down => {
				if self.tracker.backend_running() {
					info!("Queue idle threshold reached; stopping compute backend");
					match self.controller.stop().await {
						Ok(()) => {
							self.tracker.mark_running(false);
							info!("Compute backend stopped");
						}
						Err(e) => error!(error = %e, "Failed to stop compute backend"),
					}
				} else {
					info!("Shutdown requested but compute backend is already stopped");
				}
			}
			ScaleSignal::Up => {
				info!(depth, "Queue has pending jobs; starting compute backend");
				match self.controller.start().await {
					Ok(()) => {
						self.tracker.mark_running(true);
						info!("Compute backend running");
					}
					Err(e) => error!(error = %e, "Failed to start compute backend"),
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::queue::test_support::InMemoryQueue;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	const IDLE: Duration = Duration::from_secs(30);

	#[test]
	fn test_scale_down_fires_exactly_once_per_idle_episode() {
		let mut tracker = IdleTracker::new(IDLE).with_backend_running(true);
		let t0 = Instant::now();

		assert_eq!(tracker.observe(0, t0), ScaleSignal::Hold);
		assert!(tracker.idle_timer_running());
		assert_eq!(tracker.observe(0, t0 + Duration::from_secs(10)), ScaleSignal::Hold);
		assert_eq!(tracker.observe(0, t0 + IDLE), ScaleSignal::Down);
		// Latched: continued-zero depth fires nothing further.
		assert_eq!(tracker.observe(0, t0 + IDLE + Duration::from_secs(100)), ScaleSignal::Hold);
	}

	#[test]
	fn test_work_rearms_the_idle_cycle() {
		let mut tracker = IdleTracker::new(IDLE).with_backend_running(true);
		let t0 = Instant::now();

		tracker.observe(0, t0);
		assert_eq!(tracker.observe(0, t0 + IDLE), ScaleSignal::Down);
		tracker.mark_running(false);

		// Work arrives: timer cleared, latch cleared, backend asked up.
		assert_eq!(tracker.observe(5, t0 + IDLE + Duration::from_secs(1)), ScaleSignal::Up);
		assert!(!tracker.idle_timer_running());
		tracker.mark_running(true);

		// A fresh idle episode can fire scale-down again.
		let t1 = t0 + IDLE + Duration::from_secs(2);
		assert_eq!(tracker.observe(0, t1), ScaleSignal::Hold);
		assert_eq!(tracker.observe(0, t1 + IDLE), ScaleSignal::Down);
	}

	#[test]
	fn test_no_scale_up_while_backend_running() {
		let mut tracker = IdleTracker::new(IDLE).with_backend_running(true);
		assert_eq!(tracker.observe(3, Instant::now()), ScaleSignal::Hold);
	}

	#[test]
	fn test_scale_up_retried_until_marked_running() {
		let mut tracker = IdleTracker::new(IDLE);
		let t0 = Instant::now();
		// Controller kept failing, so the backend never got marked running.
		assert_eq!(tracker.observe(2, t0), ScaleSignal::Up);
		assert_eq!(tracker.observe(2, t0 + Duration::from_secs(10)), ScaleSignal::Up);
		tracker.mark_running(true);
		assert_eq!(tracker.observe(2, t0 + Duration::from_secs(20)), ScaleSignal::Hold);
	}

	struct CountingController {
		starts: AtomicU32,
		stops: AtomicU32,
	}

	impl CountingController {
		fn new() -> Arc<Self> {
			Arc::new(Self {
				starts: AtomicU32::new(0),
				stops: AtomicU32::new(0),
			})
		}
	}

	#[async_trait]
	impl PodController for Arc<CountingController> {
		async fn start(&self) -> Result<(), IntakeError> {
			self.starts.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}

		async fn stop(&self) -> Result<(), IntakeError> {
			self.stops.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_monitor_loop_stops_idle_backend_once() {
		let controller = CountingController::new();
		let monitor = AutoscaleMonitor::new(
			InMemoryQueue::new(),
			Arc::clone(&controller),
			IdleTracker::new(IDLE).with_backend_running(true),
			Duration::from_secs(10),
		);

		let cancel = CancellationToken::new();
		let handle = tokio::spawn(monitor.run(cancel.clone()));

		tokio::time::sleep(Duration::from_secs(120)).await;
		cancel.cancel();
		handle.await.unwrap();

		assert_eq!(controller.stops.load(Ordering::SeqCst), 1);
		assert_eq!(controller.starts.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_monitor_loop_starts_backend_when_work_arrives() {
		let queue = InMemoryQueue::new();
		queue.preload(["{}".to_string()]).await;

		let controller = CountingController::new();
		let monitor = AutoscaleMonitor::new(queue, Arc::clone(&controller), IdleTracker::new(IDLE), Duration::from_secs(10));

		let cancel = CancellationToken::new();
		let handle = tokio::spawn(monitor.run(cancel.clone()));

		tokio::time::sleep(Duration::from_secs(25)).await;
		cancel.cancel();
		handle.await.unwrap();

		assert_eq!(controller.starts.load(Ordering::SeqCst), 1);
	}
}
