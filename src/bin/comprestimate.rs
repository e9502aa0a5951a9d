//! CLI entry point and driver loop.
//!
//! Mirrors `comprestimator.c`'s `main()`: parse options, open the device,
//! install signal handlers, then alternately request a sample pattern, reap
//! a finished worker if the pool is saturated, and spawn a worker on the new
//! pattern — until the pattern generator signals stop or a shutdown signal
//! lands. Ends by draining the pool and emitting a final report.

use std::time::Instant;

use comprestimate::cli;
use comprestimate::device::Device;
use comprestimate::error::{EstimatorError, Result};
use comprestimate::estimator;
use comprestimate::pattern::PatternGenerator;
use comprestimate::pool::WorkerPool;
use comprestimate::report::{self, ReportSinks};
use comprestimate::signal;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    match run(&args) {
        Ok(code) => std::process::exit(code),
        Err(EstimatorError::Config(msg)) => {
            eprint!("{msg}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}

fn run(args: &[String]) -> Result<i32> {
    let prog = args.first().map(String::as_str).unwrap_or("comprestimate");
    let cfg = match cli::parse(args)? {
        Some(cfg) => cfg,
        None => {
            print!("{}", cli::usage(prog));
            return Ok(0);
        }
    };

    signal::install();

    let device = Device::open(&cfg.device).map_err(EstimatorError::Io)?;
    let num_chunks = device.num_chunks();
    if num_chunks < 1 {
        return Err(EstimatorError::Config("Error: device size is too small\n".to_string()));
    }

    let mut sinks = ReportSinks::open(cfg.log_file.as_deref(), cfg.csv_file.as_deref(), cfg.res_file.as_deref())
        .map_err(EstimatorError::Io)?;
    let dev_size_mb = device.size() as f64 / 1_048_576.0;
    sinks
        .write_header(&cfg.device, dev_size_mb, cfg.num_procs, cfg.exhaustive)
        .map_err(EstimatorError::Io)?;
    sinks.log_line(&format!(
        "Device name: {}\nDevice size: {:.1} MB\nNumber of processes: {}\nExhaustive: {}\n",
        cfg.device.display(),
        dev_size_mb,
        cfg.num_procs,
        if cfg.exhaustive { "yes" } else { "no" }
    ));

    let start = Instant::now();
    let mut pool = WorkerPool::new(cfg.num_procs);
    // A single shared generator, exactly like the original's one global
    // `cur_chunk`/`random()` state — not one per worker slot, so exhaustive
    // mode's device walk is never split or duplicated across workers.
    let mut generator = PatternGenerator::new(cfg.seed, 0, cfg.exhaustive, num_chunks, cfg.num_procs.max(1));
    let mut worker_counter: u64 = 0;
    let mut signalled_exit: Option<i32> = None;

    if cfg.num_procs > 0 {
        loop {
            if let Some(sig) = signal::caught() {
                signalled_exit = Some(sig);
                break;
            }

            let pattern = generator.next_pattern(pool.active_count(), &pool.aggregate);
            if pattern.is_empty() {
                break;
            }

            if pool.active_count() >= pool.capacity() {
                pool.reap_one()?;
                let est = estimator::estimate(&pool.aggregate, device.size());
                sinks.write_intermediate_row(&est).map_err(EstimatorError::Io)?;
                sinks.log_line(&report::console_progress_line(&est));
            }

            worker_counter += 1;
            let run_seed = cfg.seed;
            let ordinal = worker_counter;
            let seed_fn = move || {
                let mut s = run_seed ^ ordinal.wrapping_mul(0x9E37_79B9_7F4A_7C15);
                if s == 0 {
                    s = 0xdead_beef;
                }
                s
            };

            pool.spawn(&device, pattern, cfg.exhaustive, seed_fn)?;
        }
    }

    pool.drain()?;

    let duration = start.elapsed().as_secs_f64();
    let est = estimator::estimate(&pool.aggregate, device.size());
    sinks.write_final_row(&est, duration).map_err(EstimatorError::Io)?;
    sinks.log_line(&format!("Total run time: {duration:.0} seconds"));
    sinks.log_line(&report::console_progress_line(&est));
    report::print_summary_table(&est, duration);

    match signalled_exit {
        Some(sig) => Ok(signal::exit_status(sig)),
        None => Ok(0),
    }
}
