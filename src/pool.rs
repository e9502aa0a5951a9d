//! Thread-based worker pool and reaper.
//!
//! Each worker thread owns a disjoint `CompressionInfo` until it sends it
//! back over its own channel; the pool's `reap_one` is the single reader,
//! and the channel send/receive supplies the happens-before edge a
//! process-and-shared-memory design would get from `waitpid` on a
//! `MAP_SHARED` region.

use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;

use crate::device::Device;
use crate::error::{EstimatorError, Result};
use crate::pattern::SamplePattern;
use crate::worker::{run_exhaustive, run_random, CompressionInfo};

struct WorkerHandle {
    join: JoinHandle<()>,
    rx: Receiver<Result<CompressionInfo>>,
}

/// Owns up to `num_procs` concurrently-running workers plus the long-lived
/// aggregate slot they report into once reaped.
pub struct WorkerPool {
    slots: Vec<Option<WorkerHandle>>,
    pub aggregate: CompressionInfo,
}

impl WorkerPool {
    pub fn new(num_procs: usize) -> Self {
        WorkerPool {
            slots: (0..num_procs).map(|_| None).collect(),
            aggregate: CompressionInfo::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn first_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.is_none())
    }

    /// Spawns a worker thread on a disjoint slot. `device` must be cheaply
    /// cloneable (a fresh file handle per worker); `exhaustive` picks which
    /// sampling strategy the thread runs.
    pub fn spawn(&mut self, device: &Device, pattern: SamplePattern, exhaustive: bool, seed_fn: impl FnOnce() -> u64 + Send + 'static) -> Result<()> {
        let index = self
            .first_empty_slot()
            .expect("spawn called while pool is saturated");

        let worker_device = device.try_clone().map_err(EstimatorError::Io)?;
        let (tx, rx) = mpsc::channel();

        let join = std::thread::Builder::new()
            .spawn(move || {
                let result = if exhaustive {
                    run_exhaustive(&worker_device, &pattern)
                } else {
                    let mut seed = seed_fn();
                    run_random(&worker_device, &pattern, &mut move || {
                        // xorshift64*, deterministic per worker given its seed
                        seed ^= seed << 13;
                        seed ^= seed >> 7;
                        seed ^= seed << 17;
                        seed
                    })
                };
                // the receiver outliving the pool is the only way send can fail,
                // and that only happens if the pool itself has already been
                // dropped, in which case there is nothing left to report to.
                let _ = tx.send(result);
            })
            .map_err(EstimatorError::Spawn)?;

        self.slots[index] = Some(WorkerHandle { join, rx });
        Ok(())
    }

    /// Blocks until any one active worker finishes, merges its result into
    /// the aggregate slot, and frees its slot. Returns an error (without
    /// touching the aggregate) if that worker's sampling loop failed.
    pub fn reap_one(&mut self) -> Result<()> {
        let index = self
            .slots
            .iter()
            .position(|s| s.is_some())
            .expect("reap_one called with no active workers");

        let handle = self.slots[index].take().unwrap();
        let result = handle
            .rx
            .recv()
            .map_err(|_| EstimatorError::WorkerPanicked)?;
        handle.join.join().map_err(|_| EstimatorError::WorkerPanicked)?;

        let info = result?;
        self.aggregate.merge(&info);
        Ok(())
    }

    /// Reaps every still-active worker, draining the pool. Used both at
    /// normal end-of-run and during signal-driven shutdown.
    pub fn drain(&mut self) -> Result<()> {
        while self.active_count() > 0 {
            self.reap_one()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_device(size: usize) -> Device {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&vec![0u8; size]).unwrap();
        tmp.flush().unwrap();
        let (_file, path) = tmp.keep().unwrap();
        Device::open(&path).unwrap()
    }

    #[test]
    fn spawn_and_reap_merges_counters() {
        let device = make_device(crate::pattern::INBLOCK_SIZE * 4);
        let mut pool = WorkerPool::new(2);

        pool.spawn(
            &device,
            SamplePattern { offsets: vec![0, crate::pattern::INBLOCK_SIZE as u64] },
            false,
            || 1,
        )
        .unwrap();
        pool.spawn(
            &device,
            SamplePattern { offsets: vec![2 * crate::pattern::INBLOCK_SIZE as u64] },
            false,
            || 2,
        )
        .unwrap();

        assert_eq!(pool.active_count(), 2);
        pool.drain().unwrap();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.aggregate.num_zero_blocks, 3);
        assert_eq!(pool.aggregate.total_blocks_read, 3);
    }

    #[test]
    fn capacity_reports_configured_size() {
        let pool = WorkerPool::new(8);
        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.active_count(), 0);
    }
}
