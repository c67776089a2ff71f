/*
 * barrier.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Counting barrier between the document and project phases.
 */

//! The barrier between the two build phases.
//!
//! A [`BuildBarrier`] has a fixed number of participants, one per input
//! file. Each worker holds a [`BarrierTicket`] and arrives exactly once,
//! with its document on success or with a failure status. A ticket dropped
//! without arriving (a panicking worker, an aborted task) arrives as
//! failed, so the barrier cannot wait forever on a participant that will
//! never report. [`BuildBarrier::wait`] resolves when every participant
//! has arrived and hands back the arrivals in participant order.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::document::Document;

/// How a participant finished its document phase.
#[derive(Debug)]
pub enum Arrival {
    /// All document passes ran
    Completed(Box<Document>),
    /// A pass failed; the document, if it was loaded, is kept for its
    /// diagnostics
    Failed {
        path: String,
        document: Option<Box<Document>>,
        reason: String,
    },
    /// Stopped by cancellation
    Cancelled {
        path: String,
        document: Option<Box<Document>>,
    },
}

impl Arrival {
    pub fn path(&self) -> &str {
        match self {
            Arrival::Completed(doc) => &doc.path,
            Arrival::Failed { path, .. } | Arrival::Cancelled { path, .. } => path,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Arrival::Completed(_))
    }
}

struct Slots {
    paths: Vec<String>,
    arrivals: Vec<Option<Arrival>>,
}

/// Fixed-size barrier that collects one [`Arrival`] per participant.
pub struct BuildBarrier {
    slots: Arc<Mutex<Slots>>,
    arrived: Arc<watch::Sender<usize>>,
    participants: usize,
}

impl BuildBarrier {
    /// A barrier for the given participants, identified by path.
    pub fn new(paths: Vec<String>) -> Self {
        let participants = paths.len();
        let (arrived, _) = watch::channel(0);
        BuildBarrier {
            slots: Arc::new(Mutex::new(Slots {
                arrivals: (0..participants).map(|_| None).collect(),
                paths,
            })),
            arrived: Arc::new(arrived),
            participants,
        }
    }

    pub fn participants(&self) -> usize {
        self.participants
    }

    /// The ticket for participant `index`.
    pub fn ticket(&self, index: usize) -> BarrierTicket {
        BarrierTicket {
            index,
            slots: self.slots.clone(),
            arrived: self.arrived.clone(),
            done: false,
        }
    }

    /// Number of participants that have arrived so far.
    pub fn arrived(&self) -> usize {
        *self.arrived.borrow()
    }

    /// Wait for every participant, then take the arrivals in order.
    pub async fn wait(&self) -> Vec<Arrival> {
        let mut receiver = self.arrived.subscribe();
        // the sender lives in `self`, so the channel cannot close here
        let _ = receiver.wait_for(|n| *n >= self.participants).await;
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let paths = slots.paths.clone();
        slots
            .arrivals
            .iter_mut()
            .zip(paths)
            .map(|(slot, path)| {
                slot.take().unwrap_or_else(|| Arrival::Failed {
                    path,
                    document: None,
                    reason: "participant did not report".into(),
                })
            })
            .collect()
    }
}

/// One participant's right to arrive at the barrier.
pub struct BarrierTicket {
    index: usize,
    slots: Arc<Mutex<Slots>>,
    arrived: Arc<watch::Sender<usize>>,
    done: bool,
}

impl BarrierTicket {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Arrive with `arrival`. Consumes the ticket.
    pub fn arrive(mut self, arrival: Arrival) {
        self.record(arrival);
    }

    fn record(&mut self, arrival: Arrival) {
        if self.done {
            return;
        }
        self.done = true;
        {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.arrivals[self.index] = Some(arrival);
        }
        self.arrived.send_modify(|n| *n += 1);
    }
}

impl Drop for BarrierTicket {
    fn drop(&mut self) {
        if !self.done {
            let path = {
                let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
                slots.paths[self.index].clone()
            };
            self.record(Arrival::Failed {
                path,
                document: None,
                reason: "worker stopped without reporting".into(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn paths(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}.md")).collect()
    }

    #[tokio::test]
    async fn test_wait_returns_in_participant_order() {
        let barrier = BuildBarrier::new(paths(3));
        let tickets: Vec<_> = (0..3).map(|i| barrier.ticket(i)).collect();
        for ticket in tickets.into_iter().rev() {
            let index = ticket.index();
            ticket.arrive(Arrival::Completed(Box::new(Document::new(
                index,
                format!("f{index}.md"),
                "",
            ))));
        }
        let arrivals = barrier.wait().await;
        let order: Vec<&str> = arrivals.iter().map(Arrival::path).collect();
        assert_eq!(order, vec!["f0.md", "f1.md", "f2.md"]);
    }

    #[tokio::test]
    async fn test_dropped_ticket_counts_as_failed() {
        let barrier = BuildBarrier::new(paths(2));
        barrier.ticket(0).arrive(Arrival::Cancelled {
            path: "f0.md".into(),
            document: None,
        });
        drop(barrier.ticket(1));
        let arrivals = barrier.wait().await;
        assert!(matches!(arrivals[0], Arrival::Cancelled { .. }));
        assert!(matches!(&arrivals[1], Arrival::Failed { path, .. } if path == "f1.md"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wait_blocks_until_all_arrive() {
        let barrier = Arc::new(BuildBarrier::new(paths(2)));
        barrier.ticket(0).arrive(Arrival::Failed {
            path: "f0.md".into(),
            document: None,
            reason: "boom".into(),
        });
        assert_eq!(barrier.arrived(), 1);

        let waiter = {
            let barrier = barrier.clone();
            tokio::spawn(async move { barrier.wait().await.len() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        barrier
            .ticket(1)
            .arrive(Arrival::Completed(Box::new(Document::new(1, "f1.md", ""))));
        assert_eq!(waiter.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_panicking_worker_still_arrives() {
        let barrier = BuildBarrier::new(paths(1));
        let ticket = barrier.ticket(0);
        let handle = tokio::spawn(async move {
            let _ticket = ticket;
            panic!("worker blew up");
        });
        assert!(handle.await.is_err());
        let arrivals = barrier.wait().await;
        assert!(!arrivals[0].is_completed());
    }

    #[tokio::test]
    async fn test_empty_barrier_is_open() {
        let barrier = BuildBarrier::new(Vec::new());
        assert!(barrier.wait().await.is_empty());
    }
}
