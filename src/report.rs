//! Intermediate/final CSV rows, console progress lines, and the final
//! pretty-printed summary table.
//!
//! Row layout and console wording are grounded in `comprestimator.c`'s
//! `print_status`/`init_log_files`; the final table is grounded in this
//! codebase's own `benchmark_utils::print_benchmark_results` idiom of
//! building a `prettytable::Table` and calling `printstd()`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use prettytable::{row, Table};

use crate::estimator::Estimate;

/// Formats the twelve numeric columns shared by the intermediate and final
/// CSV rows, matching `print_status`'s `snprintf` column order exactly:
/// `num_zero, num_non_zero, total_read, sum_ratio, conf_comp, dev_size_MB,
/// after_zero_MB, after_zero_%, conf_zeros, after_rtc_MB, after_rtc_%, error_MB`.
pub fn format_csv_row(est: &Estimate) -> String {
    format!(
        "{}, {}, {}, {:.3}, {:.3}, {:.3}, {:.3}, {:.3}, {:.3}, {:.3}, {:.3}, {:.3}",
        est.total_samples - est.num_non_zero_blocks,
        est.num_non_zero_blocks,
        est.total_blocks_read,
        est.sum_compression_ratio,
        est.conf_comp,
        est.dev_size_mb,
        est.after_zero_mb,
        est.after_zero_pct,
        est.conf_zeros,
        est.after_rtc_mb,
        est.after_rtc_pct,
        est.error_mb,
    )
}

/// Start-of-run header line written to the CSV/result files: timestamp,
/// device name, device size, worker count, and the exhaustive flag, followed
/// by the run duration at final-report time (appended separately, since the
/// duration isn't known until the run ends).
pub fn format_header(device: &Path, dev_size_mb: f64, num_procs: usize, exhaustive: bool) -> String {
    format!(
        "{}, {}, {:.1}, {}, {}",
        humantime_now(),
        device.display(),
        dev_size_mb,
        num_procs,
        if exhaustive { "yes" } else { "no" }
    )
}

fn humantime_now() -> String {
    // Plain local-time-free timestamp (seconds since epoch) — avoids pulling
    // in a timezone-aware datetime crate for a single log line.
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("t+{secs}s")
}

/// A human-readable progress line, mirroring the two `fprintf(stderr, ...)`
/// lines `print_status` emits for a non-final report.
pub fn console_progress_line(est: &Estimate) -> String {
    format!(
        "Based on {} samples, {} non-zero\n\
         {:.2}% Non-zero percent (+- {:.2}%) - Volume after migration (w/o RTC): {:.1} MB\n\
         {:.2}% Compression rate (+- {:.2}%) - Volume after migration (with RTC): {:.1} MB",
        est.total_samples,
        est.num_non_zero_blocks,
        est.after_zero_pct,
        est.conf_zeros * 100.0,
        est.after_zero_mb,
        est.after_rtc_pct,
        est.conf_comp * 100.0,
        est.after_rtc_mb,
    )
}

/// Prints the final pretty-printed summary table to stdout, in the same
/// `prettytable` idiom as `benchmark_utils::print_benchmark_results`.
pub fn print_summary_table(est: &Estimate, run_duration_secs: f64) {
    let mut table = Table::new();
    table.add_row(row!["Metric", "Value"]);
    table.add_row(row!["Device size (MB)", format!("{:.1}", est.dev_size_mb)]);
    table.add_row(row!["Samples (total / non-zero)", format!("{} / {}", est.total_samples, est.num_non_zero_blocks)]);
    table.add_row(row!["Non-zero %", format!("{:.2}% (+- {:.2}%)", est.after_zero_pct, est.conf_zeros * 100.0)]);
    table.add_row(row!["After zero-elimination (MB)", format!("{:.1}", est.after_zero_mb)]);
    table.add_row(row!["Compression rate %", format!("{:.2}% (+- {:.2}%)", est.after_rtc_pct, est.conf_comp * 100.0)]);
    table.add_row(row!["After RTC (MB)", format!("{:.1}", est.after_rtc_mb)]);
    table.add_row(row!["Estimated error (MB)", format!("{:.3}", est.error_mb)]);
    table.add_row(row!["Estimated variance (diagnostic)", format!("{:.4}", est.estimated_variance)]);
    table.add_row(row!["Run duration (s)", format!("{:.2}", run_duration_secs)]);
    table.printstd();
}

/// Owns the optional output destinations this tool can be pointed at. `None`
/// fields mean "don't write this file", matching the original tool's
/// conditional `fopen`/`fprintf(csv_file, ...)` guards.
pub struct ReportSinks {
    log_file: Option<File>,
    csv_file: Option<File>,
    res_file: Option<File>,
}

impl ReportSinks {
    pub fn open(log: Option<&Path>, csv: Option<&Path>, res: Option<&Path>) -> io::Result<Self> {
        let open_append = |p: &Path| OpenOptions::new().create(true).append(true).open(p);
        Ok(ReportSinks {
            log_file: log.map(open_append).transpose()?,
            csv_file: csv.map(open_append).transpose()?,
            res_file: res.map(open_append).transpose()?,
        })
    }

    pub fn has_res_file(&self) -> bool {
        self.res_file.is_some()
    }

    /// Writes a line to the text log if configured, else to stderr —
    /// mirroring the original's `dup2(log_file, stderr)` by just choosing
    /// the destination directly instead of redirecting the fd.
    pub fn log_line(&mut self, line: &str) {
        match &mut self.log_file {
            Some(f) => {
                let _ = writeln!(f, "{line}");
                let _ = f.flush();
            }
            None => eprintln!("{line}"),
        }
    }

    /// Appends one intermediate CSV row, if `-c` was given.
    pub fn write_intermediate_row(&mut self, est: &Estimate) -> io::Result<()> {
        if let Some(f) = &mut self.csv_file {
            writeln!(f, "{}", format_csv_row(est))?;
            f.flush()?;
        }
        Ok(())
    }

    /// Appends the final CSV row (prefixed with run duration), if `-r` was given.
    pub fn write_final_row(&mut self, est: &Estimate, run_duration_secs: f64) -> io::Result<()> {
        if let Some(f) = &mut self.res_file {
            writeln!(f, ", {run_duration_secs:.2}, {}", format_csv_row(est))?;
            f.flush()?;
        }
        Ok(())
    }

    pub fn write_header(&mut self, device: &Path, dev_size_mb: f64, num_procs: usize, exhaustive: bool) -> io::Result<()> {
        let header = format_header(device, dev_size_mb, num_procs, exhaustive);
        if let Some(f) = &mut self.csv_file {
            writeln!(f, "{header}")?;
            f.flush()?;
        }
        if let Some(f) = &mut self.res_file {
            write!(f, "{header}")?;
            f.flush()?;
        }
        Ok(())
    }
}
