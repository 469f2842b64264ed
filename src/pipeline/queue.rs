//! Bounded request queue with independent concurrency lanes.
//!
//! Synthesis and reference transcription each get their own
//! [`tokio::sync::Semaphore`], so a long synthesis never blocks a quick
//! transcription. Admission is bounded across both lanes: once `max_size`
//! requests are waiting or running, new ones are rejected with
//! [`QueueError::Full`] instead of piling up.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::QueueConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("The queue is full ({max_size} requests pending). Please try again later.")]
    Full { max_size: usize },

    #[error("The request queue has been shut down")]
    Closed,
}

/// Which concurrency limit a request counts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Synthesis,
    Transcription,
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lane::Synthesis => f.write_str("synthesis"),
            Lane::Transcription => f.write_str("transcription"),
        }
    }
}

pub struct RequestQueue {
    synthesis: Semaphore,
    transcription: Semaphore,
    pending: AtomicUsize,
    max_size: usize,
}

impl RequestQueue {
    /// Concurrency limits below one are raised to one.
    pub fn new(synthesis_concurrency: usize, transcription_concurrency: usize, max_size: usize) -> Self {
        Self {
            synthesis: Semaphore::new(synthesis_concurrency.max(1)),
            transcription: Semaphore::new(transcription_concurrency.max(1)),
            pending: AtomicUsize::new(0),
            max_size: max_size.max(1),
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(
            config.synthesis_concurrency,
            config.transcription_concurrency,
            config.max_size,
        )
    }

    /// Requests currently waiting or running, across both lanes.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Stop accepting work. Requests already running finish; requests still
    /// waiting for a lane, and any submitted later, get [`QueueError::Closed`].
    pub fn close(&self) {
        self.synthesis.close();
        self.transcription.close();
        log::info!("queue: closed with {} request(s) pending", self.pending());
    }

    pub fn is_closed(&self) -> bool {
        self.synthesis.is_closed()
    }

    /// Wait for a slot on `lane`, then drive `task` to completion.
    ///
    /// # Errors
    ///
    /// [`QueueError::Full`] when `max_size` requests are already pending,
    /// [`QueueError::Closed`] after [`close`](Self::close). `task` is dropped
    /// without being polled in both cases.
    pub async fn run<F, T>(&self, lane: Lane, task: F) -> Result<T, QueueError>
    where
        F: Future<Output = T>,
    {
        let _slot = self.admit()?;

        let semaphore = match lane {
            Lane::Synthesis => &self.synthesis,
            Lane::Transcription => &self.transcription,
        };
        let _permit = semaphore.acquire().await.map_err(|_| QueueError::Closed)?;

        log::debug!("queue: running {lane} request ({} pending)", self.pending());
        Ok(task.await)
    }

    fn admit(&self) -> Result<PendingSlot<'_>, QueueError> {
        self.pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_size).then_some(n + 1)
            })
            .map_err(|_| {
                log::warn!("queue: rejecting request, {} already pending", self.max_size);
                QueueError::Full {
                    max_size: self.max_size,
                }
            })?;
        Ok(PendingSlot(&self.pending))
    }
}

/// Releases one admission slot on drop, including when the caller's future
/// is cancelled.
struct PendingSlot<'a>(&'a AtomicUsize);

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;

    async fn wait_for_pending(queue: &RequestQueue, n: usize) {
        while queue.pending() != n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn run_returns_task_output_and_releases_slot() {
        let queue = RequestQueue::new(1, 1, 4);
        let out = queue.run(Lane::Synthesis, async { 7 }).await;
        assert_eq!(out, Ok(7));
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn full_queue_rejects_new_requests() {
        let queue = Arc::new(RequestQueue::new(1, 1, 1));
        let (tx, rx) = oneshot::channel::<()>();

        let q = Arc::clone(&queue);
        let held = tokio::spawn(async move {
            q.run(Lane::Synthesis, async {
                rx.await.ok();
                "done"
            })
            .await
        });
        wait_for_pending(&queue, 1).await;

        let rejected = queue.run(Lane::Transcription, async { "never" }).await;
        assert_eq!(rejected, Err(QueueError::Full { max_size: 1 }));

        tx.send(()).unwrap();
        assert_eq!(held.await.unwrap(), Ok("done"));
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn lane_concurrency_limit_serializes_requests() {
        let queue = Arc::new(RequestQueue::new(1, 1, 10));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                queue
                    .run(Lane::Synthesis, async {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lanes_do_not_block_each_other() {
        let queue = Arc::new(RequestQueue::new(1, 1, 10));
        let (tx, rx) = oneshot::channel::<()>();

        let q = Arc::clone(&queue);
        let synthesis = tokio::spawn(async move {
            q.run(Lane::Synthesis, async {
                rx.await.ok();
            })
            .await
        });
        wait_for_pending(&queue, 1).await;

        // Synthesis lane is occupied; transcription still goes through.
        let text = queue.run(Lane::Transcription, async { "transcript" }).await;
        assert_eq!(text, Ok("transcript"));

        tx.send(()).unwrap();
        synthesis.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn closed_queue_rejects_waiting_and_new_requests() {
        let queue = Arc::new(RequestQueue::new(1, 1, 10));
        let (tx, rx) = oneshot::channel::<()>();

        let q = Arc::clone(&queue);
        let running = tokio::spawn(async move {
            q.run(Lane::Synthesis, async {
                rx.await.ok();
                "finished"
            })
            .await
        });
        wait_for_pending(&queue, 1).await;

        let q = Arc::clone(&queue);
        let waiting = tokio::spawn(async move { q.run(Lane::Synthesis, async { "queued" }).await });
        wait_for_pending(&queue, 2).await;

        queue.close();
        assert!(queue.is_closed());

        assert_eq!(waiting.await.unwrap(), Err(QueueError::Closed));
        assert_eq!(
            queue.run(Lane::Transcription, async { "late" }).await,
            Err(QueueError::Closed)
        );

        // The request that already held a permit runs to completion.
        tx.send(()).unwrap();
        assert_eq!(running.await.unwrap(), Ok("finished"));
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn from_config_raises_zero_limits() {
        let queue = RequestQueue::from_config(&QueueConfig {
            synthesis_concurrency: 0,
            transcription_concurrency: 0,
            max_size: 0,
        });
        assert_eq!(queue.max_size(), 1);
        assert_eq!(queue.synthesis.available_permits(), 1);
        assert_eq!(queue.transcription.available_permits(), 1);
    }

    #[test]
    fn full_error_message_is_user_facing() {
        let msg = QueueError::Full { max_size: 40 }.to_string();
        assert!(msg.contains("40"));
        assert!(msg.contains("try again"));
    }
}
