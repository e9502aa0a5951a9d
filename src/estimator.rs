//! Converts an aggregate `CompressionInfo` slot into user-facing percentages,
//! sizes, and Hoeffding confidence bounds.

use crate::worker::CompressionInfo;

/// ln(2/delta) for delta = 1e-7, per the Hoeffding bound this tool reports:
/// err <= sqrt(ln(2/delta) / (2 * sample_size)).
const HOEFFDING_LN_TERM: f64 = 16.82;

/// A fully-computed snapshot of the estimate, ready to hand to the reporting layer.
#[derive(Debug, Clone, Copy)]
pub struct Estimate {
    pub total_samples: u64,
    pub num_non_zero_blocks: u64,
    pub total_blocks_read: u64,
    pub sum_compression_ratio: f64,
    pub dev_size_mb: f64,
    pub after_zero_mb: f64,
    pub after_zero_pct: f64,
    pub after_rtc_mb: f64,
    pub after_rtc_pct: f64,
    pub conf_zeros: f64,
    pub conf_comp: f64,
    pub estimated_variance: f64,
    pub error_mb: f64,
}

/// Computes a full `Estimate` from the aggregate slot and the device size.
///
/// When no non-zero samples have been observed yet, every ratio-derived
/// field (`after_rtc_*`, `conf_comp`, `estimated_variance`) is defined as
/// `0.0` rather than propagating NaN/Inf from a zero denominator.
pub fn estimate(aggregate: &CompressionInfo, dev_size_bytes: u64) -> Estimate {
    let total_samples = aggregate.num_zero_blocks + aggregate.num_non_zero_blocks;
    let dev_size_mb = dev_size_bytes as f64 / 1_048_576.0;

    if total_samples == 0 {
        return Estimate {
            total_samples: 0,
            num_non_zero_blocks: 0,
            total_blocks_read: aggregate.total_blocks_read,
            sum_compression_ratio: 0.0,
            dev_size_mb,
            after_zero_mb: 0.0,
            after_zero_pct: 0.0,
            after_rtc_mb: 0.0,
            after_rtc_pct: 0.0,
            conf_zeros: 0.0,
            conf_comp: 0.0,
            estimated_variance: 0.0,
            error_mb: 0.0,
        };
    }

    let after_zero_pct = aggregate.num_non_zero_blocks as f64 / total_samples as f64 * 100.0;
    let after_zero_mb = aggregate.num_non_zero_blocks as f64 / total_samples as f64 * dev_size_mb;
    let conf_zeros = (HOEFFDING_LN_TERM / (2.0 * total_samples as f64)).sqrt();

    let (after_rtc_mb, after_rtc_pct, conf_comp, estimated_variance) = if aggregate.num_non_zero_blocks == 0 {
        (0.0, 0.0, 0.0, 0.0)
    } else {
        let n = aggregate.num_non_zero_blocks as f64;
        let mean_ratio = aggregate.compression_ratio / n;
        let after_rtc_mb = aggregate.compression_ratio * after_zero_mb / n;
        let after_rtc_pct = aggregate.compression_ratio * 100.0 / n;
        let conf_comp = (HOEFFDING_LN_TERM / (2.0 * n)).sqrt();
        let variance = aggregate.c_squared / n - mean_ratio * mean_ratio;
        (after_rtc_mb, after_rtc_pct, conf_comp, variance)
    };

    let error_mb = after_zero_mb * conf_zeros;

    Estimate {
        total_samples,
        num_non_zero_blocks: aggregate.num_non_zero_blocks,
        total_blocks_read: aggregate.total_blocks_read,
        sum_compression_ratio: aggregate.compression_ratio,
        dev_size_mb,
        after_zero_mb,
        after_zero_pct,
        after_rtc_mb,
        after_rtc_pct,
        conf_zeros,
        conf_comp,
        estimated_variance,
        error_mb,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_samples_yields_all_zero_estimate() {
        let agg = CompressionInfo::default();
        let est = estimate(&agg, 1_048_576);
        assert_eq!(est.total_samples, 0);
        assert_eq!(est.after_zero_pct, 0.0);
        assert_eq!(est.conf_comp, 0.0);
    }

    #[test]
    fn all_zero_device_reports_zero_ratio_without_nan() {
        let agg = CompressionInfo {
            num_zero_blocks: 20_000,
            num_non_zero_blocks: 0,
            total_blocks_read: 20_000,
            compression_ratio: 0.0,
            c_squared: 0.0,
        };
        let est = estimate(&agg, 128 * 1_048_576);
        assert_eq!(est.after_zero_pct, 0.0);
        assert_eq!(est.after_rtc_mb, 0.0);
        assert_eq!(est.after_rtc_pct, 0.0);
        assert_eq!(est.conf_comp, 0.0);
        assert!(!est.after_rtc_mb.is_nan());
    }

    #[test]
    fn conf_zeros_shrinks_as_total_samples_grows() {
        let small = CompressionInfo {
            num_zero_blocks: 50,
            num_non_zero_blocks: 50,
            total_blocks_read: 100,
            compression_ratio: 50.0,
            c_squared: 50.0,
        };
        let big = CompressionInfo {
            num_zero_blocks: 5000,
            num_non_zero_blocks: 5000,
            total_blocks_read: 10_000,
            compression_ratio: 5000.0,
            c_squared: 5000.0,
        };
        let est_small = estimate(&small, 1 << 30);
        let est_big = estimate(&big, 1 << 30);
        assert!(est_big.conf_zeros < est_small.conf_zeros);
        assert!(est_big.conf_comp < est_small.conf_comp);
    }

    #[test]
    fn fully_non_zero_device_has_full_after_zero_percentage() {
        let agg = CompressionInfo {
            num_zero_blocks: 0,
            num_non_zero_blocks: 2000,
            total_blocks_read: 2000,
            compression_ratio: 1000.0,
            c_squared: 600.0,
        };
        let est = estimate(&agg, 1000 * 1_048_576);
        assert!((est.after_zero_pct - 100.0).abs() < 1e-9);
        assert!((est.sum_compression_ratio - 1000.0).abs() < 1e-9);
    }
}
