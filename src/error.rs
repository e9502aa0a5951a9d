use std::fmt;
use std::io;

/// Errors surfaced by the estimator, coarse enough that the driver can pick
/// an exit code class from the variant alone.
#[derive(Debug)]
pub enum EstimatorError {
    /// Bad CLI invocation: missing/invalid argument, out-of-range process count.
    Config(String),
    /// Failure opening or sizing the device / log files.
    Io(io::Error),
    /// A worker hit an I/O error mid-sample and reported it back instead of panicking.
    WorkerIo(io::Error),
    /// The compressor returned a status other than Ok/BufError/StreamEnd.
    Codec(String),
    /// A worker thread could not be spawned.
    Spawn(io::Error),
    /// A worker thread panicked; its result could never be reaped.
    WorkerPanicked,
}

impl fmt::Display for EstimatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorError::Config(msg) => write!(f, "{msg}"),
            EstimatorError::Io(e) => write!(f, "I/O error: {e}"),
            EstimatorError::WorkerIo(e) => write!(f, "worker I/O error: {e}"),
            EstimatorError::Codec(msg) => write!(f, "compressor error: {msg}"),
            EstimatorError::Spawn(e) => write!(f, "failed to spawn worker thread: {e}"),
            EstimatorError::WorkerPanicked => write!(f, "worker thread exited abnormally"),
        }
    }
}

impl std::error::Error for EstimatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EstimatorError::Io(e) | EstimatorError::WorkerIo(e) | EstimatorError::Spawn(e) => {
                Some(e)
            }
            _ => None,
        }
    }
}

impl EstimatorError {
    /// Process exit code for this error class, mirroring the coarse
    /// "usage error vs. I/O failure" split of the CLI this is based on.
    pub fn exit_code(&self) -> i32 {
        match self {
            EstimatorError::Config(_) => 1,
            EstimatorError::Io(_) | EstimatorError::WorkerIo(_) | EstimatorError::Codec(_) => 2,
            EstimatorError::Spawn(_) | EstimatorError::WorkerPanicked => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EstimatorError>;
