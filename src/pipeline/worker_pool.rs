//! Bounded async worker pool driving the pipeline's "queued" submission
//! mode -- the in-process analogue of the source's Celery worker fleet
//! pulling `process_ticket_task` jobs off a broker queue. There's no
//! broker here, just a `tokio::sync::mpsc` channel and a fixed set of
//! tasks draining it, each one running `Pipeline::process_sync` per job
//! with the same per-ticket deadline as the synchronous path, so sync
//! and async submission converge on identical final ticket state.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::Pipeline;

struct Job {
    ticket_id: Uuid,
    skip_routing: bool,
}

pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    cancel: CancellationToken,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(pipeline: Arc<Pipeline>, worker_count: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let cancel = CancellationToken::new();

        let workers = (0..worker_count.max(1))
            .map(|id| {
                let pipeline = Arc::clone(&pipeline);
                let receiver = Arc::clone(&receiver);
                let cancel = cancel.clone();
                tokio::spawn(async move { Self::run_worker(id, pipeline, receiver, cancel).await })
            })
            .collect();

        Self { sender, cancel, workers }
    }

    /// Enqueues a ticket for background processing. Returns immediately;
    /// the caller reports `status = queued` without waiting on the result.
    pub async fn submit(&self, ticket_id: Uuid, skip_routing: bool) -> Result<(), Uuid> {
        self.sender.send(Job { ticket_id, skip_routing }).await.map_err(|_| ticket_id)
    }

    /// Stops accepting new work and waits for in-flight jobs to finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        self.cancel.cancel();
        for worker in self.workers {
            let _ = worker.await;
        }
    }

    async fn run_worker(
        id: usize,
        pipeline: Arc<Pipeline>,
        receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
        cancel: CancellationToken,
    ) {
        loop {
            let job = {
                let mut receiver = receiver.lock().await;
                tokio::select! {
                    job = receiver.recv() => job,
                    _ = cancel.cancelled() => None,
                }
            };

            let Some(job) = job else { break };

            match pipeline.process_sync(job.ticket_id, job.skip_routing).await {
                Ok(outcome) => {
                    tracing::debug!(worker = id, ticket_id = %job.ticket_id, status = ?outcome.status, "processed queued ticket");
                }
                Err(err) => {
                    tracing::error!(worker = id, ticket_id = %job.ticket_id, error = %err, "queued ticket processing failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ClassifierCache;
    use crate::classifier::Classifier;
    use crate::domain::Ticket;
    use crate::priority::PriorityScorer;
    use crate::repository::memory::{InMemoryAgentRepository, InMemoryRuleRepository, InMemoryTicketRepository};
    use crate::repository::TicketRepository;
    use crate::router::TicketRouter;
    use crate::sentiment::SentimentAnalyzer;
    use std::time::Duration;

    #[tokio::test]
    async fn queued_ticket_gets_processed_by_a_worker() {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let agents = Arc::new(InMemoryAgentRepository::new(Arc::clone(&tickets)));

        let mut ticket = Ticket::new("a question about billing", "email");
        ticket.language = "en".to_string();
        let ticket_id = ticket.id;
        tickets.create(ticket).await.unwrap();

        let cache = ClassifierCache::new(3600, 1000);
        let pipeline = Arc::new(Pipeline::new(
            Arc::new(Classifier::new(crate::classifier::DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(), Some(cache), None)),
            Arc::new(SentimentAnalyzer::new(None)),
            Arc::new(PriorityScorer::new(Vec::new())),
            Arc::new(TicketRouter::new()),
            None,
            tickets.clone(),
            agents,
            Arc::new(InMemoryRuleRepository::seeded()),
            Duration::from_secs(5),
            3,
        ));

        let pool = WorkerPool::spawn(pipeline, 2, 16);
        pool.submit(ticket_id, false).await.unwrap();
        pool.shutdown().await;

        let processed = tickets.get(ticket_id).await.unwrap();
        assert!(processed.is_processed);
    }
}
