//! Background maintenance loops: SLA breach scanning and the daily
//! per-agent counter reset.
//!
//! Ported from `original_source/src/workers/tasks.py`'s
//! `check_sla_breaches_task` (every 5 minutes via Celery Beat) and
//! `reset_daily_stats_task` (midnight via Celery Beat). Celery Beat's
//! cron-expression scheduling becomes `cron::Schedule` here, driving a
//! plain `tokio::spawn` loop rather than a separate worker process --
//! there's no broker in this crate's design, so the loop lives in-process
//! next to the pipeline workers.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use cron::Schedule;
use tokio_util::sync::CancellationToken;

use crate::domain::TicketStatus;
use crate::repository::{AgentRepository, TicketRepository};

pub struct Scheduler {
    tickets: Arc<dyn TicketRepository>,
    agents: Arc<dyn AgentRepository>,
    sla_scan_cron: String,
    daily_reset_cron: String,
}

impl Scheduler {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        agents: Arc<dyn AgentRepository>,
        sla_scan_cron: impl Into<String>,
        daily_reset_cron: impl Into<String>,
    ) -> Self {
        Self {
            tickets,
            agents,
            sla_scan_cron: sla_scan_cron.into(),
            daily_reset_cron: daily_reset_cron.into(),
        }
    }

    /// Spawns the SLA scan and daily reset loops, returning their join
    /// handles. Both loops exit once `cancel` is triggered.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
        let sla_loop = {
            let this = Arc::clone(&self);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                this.run_schedule(&this.sla_scan_cron, &cancel, || this.scan_sla_breaches()).await
            })
        };
        let reset_loop = {
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                this.run_schedule(&this.daily_reset_cron, &cancel, || this.reset_daily_counters()).await
            })
        };
        vec![sla_loop, reset_loop]
    }

    async fn run_schedule<'a, F, Fut>(&'a self, expr: &str, cancel: &CancellationToken, mut fire: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ()> + 'a,
    {
        let schedule = match Schedule::from_str(expr) {
            Ok(schedule) => schedule,
            Err(err) => {
                tracing::error!(expr, error = %err, "invalid cron expression, scheduler loop disabled");
                return;
            }
        };

        loop {
            let now = Utc::now();
            let Some(next) = schedule.after(&now).next() else {
                tracing::warn!(expr, "cron schedule produced no further fire times");
                return;
            };
            let wait = (next - now).to_std().unwrap_or(std::time::Duration::from_secs(1));

            tokio::select! {
                _ = tokio::time::sleep(wait) => fire().await,
                _ = cancel.cancelled() => return,
            }
        }
    }

    async fn scan_sla_breaches(&self) {
        let now = Utc::now();
        let candidates = match self.tickets.find_sla_candidates(now).await {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::error!(error = %err, "SLA scan failed to load candidates");
                return;
            }
        };

        let mut breached = 0u32;
        for mut ticket in candidates {
            ticket.sla_breached = true;
            ticket.priority = (ticket.priority + 1).min(5);
            if ticket.status == TicketStatus::New {
                ticket.status = TicketStatus::Open;
            }
            if let Err(err) = self.tickets.update(ticket).await {
                tracing::error!(error = %err, "failed to mark ticket SLA-breached");
                continue;
            }
            breached += 1;
        }

        if breached > 0 {
            tracing::warn!(count = breached, "marked tickets as SLA breached");
        }
    }

    async fn reset_daily_counters(&self) {
        match self.agents.reset_daily_counters().await {
            Ok(()) => tracing::info!("reset daily agent counters"),
            Err(err) => tracing::error!(error = %err, "failed to reset daily agent counters"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Ticket;
    use crate::repository::memory::{InMemoryAgentRepository, InMemoryTicketRepository};
    use std::time::Duration;

    #[tokio::test]
    async fn sla_scan_marks_overdue_tickets_and_boosts_priority() {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let agents = Arc::new(InMemoryAgentRepository::new(Arc::clone(&tickets)));

        let mut ticket = Ticket::new("overdue", "email");
        ticket.status = TicketStatus::Open;
        ticket.priority = 3;
        ticket.sla_due_at = Some(Utc::now() - chrono::Duration::hours(1));
        let ticket_id = ticket.id;
        tickets.create(ticket).await.unwrap();

        let scheduler = Scheduler::new(tickets.clone(), agents, "0 */5 * * * *", "0 0 0 * * *");
        scheduler.scan_sla_breaches().await;

        let updated = tickets.get(ticket_id).await.unwrap();
        assert!(updated.sla_breached);
        assert_eq!(updated.priority, 4);
    }

    #[tokio::test]
    async fn cron_loop_exits_promptly_on_cancellation() {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let agents = Arc::new(InMemoryAgentRepository::new(Arc::clone(&tickets)));
        let scheduler = Arc::new(Scheduler::new(tickets, agents, "0 0 0 1 1 * 2999", "0 0 0 1 1 * 2999"));

        let cancel = CancellationToken::new();
        let handles = Arc::clone(&scheduler).spawn(cancel.clone());
        cancel.cancel();

        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        }
    }
}
