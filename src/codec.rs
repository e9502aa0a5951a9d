//! Streaming deflate adapter used to estimate compressibility of a sampled
//! run of blocks without ever materializing a full compressed artifact.

use flate2::{Compress, Compression, FlushCompress, Status};

use crate::error::{EstimatorError, Result};
use crate::pattern::OUTBLOCK_SIZE;

/// Wraps `flate2::Compress` (raw deflate, no zlib header) with the small
/// feed/flush/reset contract the sampling workers need: push bytes in,
/// force a sync flush, and track cumulative input/output byte counts the
/// way the zlib `z_stream.total_in`/`total_out` fields do.
pub struct StreamingCompressor {
    inner: Compress,
    outbuf: Vec<u8>,
}

impl StreamingCompressor {
    pub fn new() -> Self {
        StreamingCompressor {
            inner: Compress::new(Compression::new(1), false),
            outbuf: vec![0u8; OUTBLOCK_SIZE],
        }
    }

    /// Resets the codec to take a fresh stream without reallocating buffers.
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn total_in(&self) -> u64 {
        self.inner.total_in()
    }

    pub fn total_out(&self) -> u64 {
        self.inner.total_out()
    }

    /// Feeds `input` through the compressor with `SYNC_FLUSH`, mirroring
    /// Z_SYNC_FLUSH: all pending output is emitted without ending the stream.
    /// Returns `true` once the output budget for this session (`OUTBLOCK_SIZE`
    /// bytes, cumulative since `new()`/`reset()`) has been exhausted.
    ///
    /// This mirrors zlib's `avail_out`, which is set once before a run of
    /// `deflate()` calls and only ever drawn down, never replenished per
    /// call: the output slice handed to the codec shrinks by what earlier
    /// calls in this session already produced, so once the budget is spent
    /// further calls get a zero-length output buffer and cannot produce
    /// anything more.
    pub fn feed_sync_flush(&mut self, input: &[u8]) -> Result<bool> {
        let produced_so_far = self.inner.total_out() as usize;
        if produced_so_far >= self.outbuf.len() {
            return Ok(true);
        }
        let remaining_capacity = self.outbuf.len() - produced_so_far;

        let status = self
            .inner
            .compress(input, &mut self.outbuf[..remaining_capacity], FlushCompress::Sync)
            .map_err(|e| EstimatorError::Codec(e.to_string()))?;

        match status {
            Status::Ok | Status::BufError | Status::StreamEnd => {}
        }

        Ok(self.inner.total_out() as usize >= self.outbuf.len())
    }
}

impl Default for StreamingCompressor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressing_repetitive_data_shrinks_it() {
        let mut codec = StreamingCompressor::new();
        let input = vec![b'A'; 16384];
        codec.feed_sync_flush(&input).unwrap();
        assert!(codec.total_out() < codec.total_in());
        assert!(codec.total_in() > 0);
    }

    #[test]
    fn reset_zeroes_counters() {
        let mut codec = StreamingCompressor::new();
        codec.feed_sync_flush(&[1, 2, 3, 4]).unwrap();
        assert!(codec.total_in() > 0);
        codec.reset();
        assert_eq!(codec.total_in(), 0);
        assert_eq!(codec.total_out(), 0);
    }

    #[test]
    fn feeding_empty_input_is_a_no_op() {
        let mut codec = StreamingCompressor::new();
        let full = codec.feed_sync_flush(&[]).unwrap();
        assert!(!full);
        assert_eq!(codec.total_in(), 0);
    }

    #[test]
    fn output_budget_is_cumulative_across_calls_not_reset_per_call() {
        // Highly compressible input: no single 16 KiB chunk alone produces
        // anywhere near OUTBLOCK_SIZE (2048) bytes of output, so "filled"
        // must only fire once several calls' output has accumulated to
        // 2048 bytes total, not on any individual call.
        let mut codec = StreamingCompressor::new();
        let chunk = vec![b'A'; 16384];

        let mut filled = false;
        let mut calls = 0;
        while !filled && calls < 64 {
            filled = codec.feed_sync_flush(&chunk).unwrap();
            calls += 1;
        }

        assert!(filled, "budget should eventually fill from repeated small calls");
        assert!(calls > 1, "a single call's own output should never reach OUTBLOCK_SIZE for compressible data");
        assert_eq!(codec.total_out() as usize, OUTBLOCK_SIZE, "the shrinking output slice should cap cumulative output at exactly the budget");
    }
}
