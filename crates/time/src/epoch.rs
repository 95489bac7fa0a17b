// src/epoch.rs
//
// Epoch clocks. The engine only ever reads `current_epoch()`; the thawing
// mechanism records deadlines against it and never waits on it.

use curation_types::Epoch;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EpochClockError {
    #[error("epoch length must be greater than zero")]
    ZeroEpochLength,
    #[error("epoch length is already {0}")]
    UnchangedEpochLength(u64),
}

/// Source of the protocol's discrete time
pub trait EpochClock: Send + Sync {
    /// Current epoch. Never decreases.
    fn current_epoch(&self) -> Epoch;

    /// Wall-clock seconds used to stamp events
    fn timestamp(&self) -> u64 {
        system_time_now_secs()
    }
}

fn system_time_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

// ==== MANUAL CLOCK ====

/// Epoch counter advanced explicitly by the caller
#[derive(Debug, Default)]
pub struct ManualEpochClock {
    epoch: AtomicU64,
}

impl ManualEpochClock {
    pub fn new(start: Epoch) -> Self {
        Self {
            epoch: AtomicU64::new(start),
        }
    }

    /// Move the clock forward by `epochs`, returning the new epoch
    pub fn advance(&self, epochs: u64) -> Epoch {
        let previous = self
            .epoch
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |epoch| {
                Some(epoch.saturating_add(epochs))
            })
            .unwrap_or_else(|epoch| epoch);
        let now = previous.saturating_add(epochs);
        debug!(target: "epoch", "Advanced manual clock {} -> {}", previous, now);
        now
    }

    /// Jump to `epoch`. Regressions are ignored and reported as `false`.
    pub fn set_epoch(&self, epoch: Epoch) -> bool {
        let previous = self.epoch.fetch_max(epoch, Ordering::SeqCst);
        if epoch < previous {
            warn!(
                target: "epoch",
                "Ignoring epoch regression: requested {}, current {}",
                epoch,
                previous
            );
            return false;
        }
        true
    }
}

impl EpochClock for ManualEpochClock {
    fn current_epoch(&self) -> Epoch {
        self.epoch.load(Ordering::SeqCst)
    }
}

// ==== BLOCK-DRIVEN CLOCK ====

/// Snapshot of the block clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSnapshot {
    pub block: u64,
    pub epoch_length: u64,
    pub last_length_update_block: u64,
    pub last_length_update_epoch: Epoch,
}

impl EpochSnapshot {
    fn epochs_since_update(&self) -> u64 {
        (self.block - self.last_length_update_block) / self.epoch_length
    }

    fn current_epoch(&self) -> Epoch {
        self.last_length_update_epoch + self.epochs_since_update()
    }

    fn current_epoch_block(&self) -> u64 {
        self.block - (self.block - self.last_length_update_block) % self.epoch_length
    }
}

/// Epochs derived from block progression.
///
/// An epoch spans `epoch_length` blocks counted from the block at which the
/// length was last changed, so adjusting the length never renumbers epochs
/// that already elapsed.
#[derive(Debug)]
pub struct BlockEpochClock {
    state: RwLock<EpochSnapshot>,
}

impl BlockEpochClock {
    pub fn new(epoch_length: u64) -> Result<Self, EpochClockError> {
        if epoch_length == 0 {
            return Err(EpochClockError::ZeroEpochLength);
        }
        Ok(Self {
            state: RwLock::new(EpochSnapshot {
                block: 0,
                epoch_length,
                last_length_update_block: 0,
                last_length_update_epoch: 0,
            }),
        })
    }

    /// Record `blocks` new blocks, returning the resulting epoch
    pub fn advance_blocks(&self, blocks: u64) -> Epoch {
        let mut state = self.state.write();
        state.block = state.block.saturating_add(blocks);
        state.current_epoch()
    }

    /// Jump to block height `block`. Regressions are ignored.
    pub fn set_block(&self, block: u64) -> bool {
        let mut state = self.state.write();
        if block < state.block {
            warn!(
                target: "epoch",
                "Ignoring block regression: requested {}, current {}",
                block,
                state.block
            );
            return false;
        }
        state.block = block;
        true
    }

    /// Change the number of blocks per epoch starting at the current epoch
    pub fn set_epoch_length(&self, epoch_length: u64) -> Result<(), EpochClockError> {
        if epoch_length == 0 {
            return Err(EpochClockError::ZeroEpochLength);
        }
        let mut state = self.state.write();
        if epoch_length == state.epoch_length {
            return Err(EpochClockError::UnchangedEpochLength(epoch_length));
        }

        state.last_length_update_epoch = state.current_epoch();
        state.last_length_update_block = state.current_epoch_block();
        state.epoch_length = epoch_length;

        info!(
            target: "epoch",
            "Epoch length set to {} blocks from epoch {} (block {})",
            epoch_length,
            state.last_length_update_epoch,
            state.last_length_update_block
        );
        Ok(())
    }

    pub fn block(&self) -> u64 {
        self.state.read().block
    }

    pub fn epoch_length(&self) -> u64 {
        self.state.read().epoch_length
    }

    /// First block of the current epoch
    pub fn current_epoch_block(&self) -> u64 {
        self.state.read().current_epoch_block()
    }

    /// Blocks elapsed inside the current epoch
    pub fn current_epoch_blocks_since_start(&self) -> u64 {
        let state = self.state.read();
        state.block - state.current_epoch_block()
    }

    pub fn snapshot(&self) -> EpochSnapshot {
        *self.state.read()
    }
}

impl EpochClock for BlockEpochClock {
    fn current_epoch(&self) -> Epoch {
        self.state.read().current_epoch()
    }
}
