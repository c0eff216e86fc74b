use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

const IDLE: u8 = 0;
const STREAMING: u8 = 1;
const RECONCILING: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Streaming,
    Reconciling,
}

/// Single-slot lock shared by the stream driver and the poll reconciler.
///
/// A streaming turn waits for the slot; a reconciliation only ever tries it and
/// skips its tick when the slot is taken. The slot is released when the
/// returned permit drops.
#[derive(Debug, Clone)]
pub struct TurnGate {
    slot: Arc<Semaphore>,
    phase: Arc<AtomicU8>,
}

impl Default for TurnGate {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnGate {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
            phase: Arc::new(AtomicU8::new(IDLE)),
        }
    }

    pub fn phase(&self) -> TurnPhase {
        match self.phase.load(Ordering::Acquire) {
            STREAMING => TurnPhase::Streaming,
            RECONCILING => TurnPhase::Reconciling,
            _ => TurnPhase::Idle,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.phase() == TurnPhase::Streaming
    }

    pub async fn begin_stream(&self) -> Result<TurnPermit> {
        let permit = Arc::clone(&self.slot)
            .acquire_owned()
            .await
            .context("turn gate closed")?;
        Ok(self.enter(permit, STREAMING))
    }

    pub fn try_begin_reconcile(&self) -> Option<TurnPermit> {
        let permit = Arc::clone(&self.slot).try_acquire_owned().ok()?;
        Some(self.enter(permit, RECONCILING))
    }

    fn enter(&self, permit: OwnedSemaphorePermit, phase: u8) -> TurnPermit {
        self.phase.store(phase, Ordering::Release);
        TurnPermit {
            _permit: permit,
            phase: Arc::clone(&self.phase),
        }
    }
}

#[derive(Debug)]
pub struct TurnPermit {
    _permit: OwnedSemaphorePermit,
    phase: Arc<AtomicU8>,
}

impl Drop for TurnPermit {
    fn drop(&mut self) {
        // Reset before the semaphore permit field drops, so the next holder's
        // phase is never overwritten.
        self.phase.store(IDLE, Ordering::Release);
    }
}
