//! Sample pattern generation: which block offsets a worker should probe next,
//! in either random or exhaustive-sequential mode, plus the stopping rule
//! that tells the driver when enough samples have been collected.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::worker::CompressionInfo;

pub const INBLOCK_SIZE: usize = 2048;
pub const ZLIB_BLOCK_SIZE: usize = 16384;
pub const OUTBLOCK_SIZE: usize = 2048;
pub const COMP_UNIT_SIZE: u64 = 134_217_728; // 128 MiB
pub const BLOCKS_PER_PROC: usize = 50;
pub const MAX_NUM_PROCS: usize = 128;
pub const MAX_NUM_SAMPLE: u64 = 2000;
pub const ZERO_BLOCK_FACTOR: u64 = 10;

/// Block offsets (byte positions, multiples of `INBLOCK_SIZE`) a single
/// worker should read and fold into its own `CompressionInfo`.
#[derive(Debug, Clone)]
pub struct SamplePattern {
    pub offsets: Vec<u64>,
}

impl SamplePattern {
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Returns true once the aggregate slot has collected enough samples to stop
/// issuing new random-mode work.
pub fn stopping_rule_satisfied(aggregate: &CompressionInfo) -> bool {
    aggregate.num_non_zero_blocks >= MAX_NUM_SAMPLE
        || aggregate.num_zero_blocks >= MAX_NUM_SAMPLE * ZERO_BLOCK_FACTOR
}

/// Generates random and exhaustive sample patterns.
///
/// Random-mode offsets are drawn from a per-generator PRNG seeded
/// deterministically from the run seed and a caller-supplied index, so that a
/// fixed seed and fixed worker count reproduce identical patterns.
pub struct PatternGenerator {
    rng: StdRng,
    exhaustive: bool,
    num_chunks: u64,
    num_procs: usize,
    cur_chunk: u64,
}

impl PatternGenerator {
    pub fn new(seed: u64, index: u64, exhaustive: bool, num_chunks: u64, num_procs: usize) -> Self {
        PatternGenerator {
            rng: StdRng::seed_from_u64(seed.wrapping_add(index.wrapping_mul(0x9E37_79B9_7F4A_7C15))),
            exhaustive,
            num_chunks,
            num_procs,
            cur_chunk: 0,
        }
    }

    /// Produces the next pattern, or an empty pattern when no more work
    /// should be issued (stopping rule satisfied, or device exhausted).
    pub fn next_pattern(&mut self, active_procs: usize, aggregate: &CompressionInfo) -> SamplePattern {
        if self.exhaustive {
            self.next_exhaustive_pattern()
        } else {
            self.next_random_pattern(active_procs, aggregate)
        }
    }

    fn next_random_pattern(&mut self, active_procs: usize, aggregate: &CompressionInfo) -> SamplePattern {
        if stopping_rule_satisfied(aggregate) {
            return SamplePattern { offsets: Vec::new() };
        }

        let ramped = ((active_procs + 1) as f64 / self.num_procs as f64 * BLOCKS_PER_PROC as f64)
            .floor() as usize;
        let batch_size = ramped.min(BLOCKS_PER_PROC).max(1);

        let offsets = (0..batch_size)
            .map(|_| self.rng.gen_range(0..self.num_chunks) * INBLOCK_SIZE as u64)
            .collect();
        SamplePattern { offsets }
    }

    fn next_exhaustive_pattern(&mut self) -> SamplePattern {
        if self.cur_chunk >= self.num_chunks {
            return SamplePattern { offsets: Vec::new() };
        }
        let max_blocks = COMP_UNIT_SIZE / INBLOCK_SIZE as u64;
        let remaining = self.num_chunks - self.cur_chunk;
        let count = max_blocks.min(remaining);
        let offsets = (0..count)
            .map(|i| (self.cur_chunk + i) * INBLOCK_SIZE as u64)
            .collect();
        self.cur_chunk += count;
        SamplePattern { offsets }
    }
}
