//! Command-line argument parsing.
//!
//! A small hand-rolled option scanner over `env::args()`, in the style of
//! this codebase's other single-purpose binaries (e.g. `bin/estimate_individual.rs`)
//! rather than pulling in an argument-parsing framework — this mirrors the
//! original tool's `getopt("d:p:l:c:r:s:eh")` option set one for one.

use std::path::PathBuf;

use crate::error::{EstimatorError, Result};
use crate::pattern::MAX_NUM_PROCS;

/// Parsed and validated invocation parameters.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub device: PathBuf,
    pub num_procs: usize,
    pub log_file: Option<PathBuf>,
    pub csv_file: Option<PathBuf>,
    pub res_file: Option<PathBuf>,
    pub seed: u64,
    pub exhaustive: bool,
}

pub fn usage(prog: &str) -> String {
    format!(
        "usage: {prog} -d <dev_name> [-p <num_procs> -l <log_file> -c <csv_file> -r <res_file> -s <seed> -e -h]\n\
         \x20      -d: path to device to process\n\
         \x20      -p: number of processes (default 1)\n\
         \x20      -l: log file for intermediate results, errors, debug messages (text format)\n\
         \x20      -c: log file for intermediate results (csv format)\n\
         \x20      -r: file for final results (csv format)\n\
         \x20      -s: seed to use for PRNG (uses time if not specified - useful for testing)\n\
         \x20      -e: run exhaustive search (for testing only)\n\
         \x20      -h: print this help and exit\n"
    )
}

/// Parses `args` (including `args[0]` as the program name, matching `env::args()`).
///
/// Returns `Ok(None)` when `-h` was given (caller should print usage and exit 0).
pub fn parse(args: &[String]) -> Result<Option<RunConfig>> {
    let prog = args.first().map(String::as_str).unwrap_or("comprestimate");

    let mut device: Option<PathBuf> = None;
    let mut num_procs: usize = 1;
    let mut log_file = None;
    let mut csv_file = None;
    let mut res_file = None;
    let mut seed: Option<u64> = None;
    let mut exhaustive = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut take_value = |flag: &str| -> Result<String> {
            iter.next()
                .cloned()
                .ok_or_else(|| EstimatorError::Config(format!("option `{flag}' requires an argument\n{}", usage(prog))))
        };

        match arg.as_str() {
            "-d" => device = Some(PathBuf::from(take_value("-d")?)),
            "-p" => {
                let raw = take_value("-p")?;
                num_procs = raw
                    .parse::<usize>()
                    .map_err(|_| EstimatorError::Config(format!("invalid process count `{raw}'\n{}", usage(prog))))?;
            }
            "-l" => log_file = Some(PathBuf::from(take_value("-l")?)),
            "-c" => csv_file = Some(PathBuf::from(take_value("-c")?)),
            "-r" => res_file = Some(PathBuf::from(take_value("-r")?)),
            "-s" => {
                let raw = take_value("-s")?;
                seed = Some(
                    raw.parse::<u64>()
                        .map_err(|_| EstimatorError::Config(format!("invalid seed `{raw}'\n{}", usage(prog))))?,
                );
            }
            "-e" => exhaustive = true,
            "-h" => return Ok(None),
            other => {
                return Err(EstimatorError::Config(format!("Unknown option `{other}'.\n{}", usage(prog))));
            }
        }
    }

    let device = device.ok_or_else(|| EstimatorError::Config(usage(prog)))?;

    if num_procs > MAX_NUM_PROCS {
        return Err(EstimatorError::Config(format!(
            "Number of processes should be between 0 and {MAX_NUM_PROCS}.\n{}",
            usage(prog)
        )));
    }

    let seed = seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    });

    Ok(Some(RunConfig {
        device,
        num_procs,
        log_file,
        csv_file,
        res_file,
        seed,
        exhaustive,
    }))
}
