//! Error types for the banded Game of Life engine.
//!
//! Every variant is fatal to the run as a whole: a rank that hits one of
//! these stops and its peers observe the failure through the transport.

use thiserror::Error;

/// Crate result type alias.
pub type Result<T> = std::result::Result<T, LifeError>;

/// Engine error type.
#[derive(Error, Debug)]
pub enum LifeError {
    /// Invalid partitioning or run parameters. Raised before any buffer is
    /// allocated or any message is sent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure in halo exchange, scatter, gather or broadcast.
    #[error("Communication error on rank {rank}: {reason}")]
    Communication {
        /// Rank that observed the failure.
        rank: usize,
        /// What went wrong.
        reason: String,
    },

    /// A rank saw a generation counter or continue flag that does not match
    /// its own view of the run.
    #[error("Termination protocol violation on rank {rank}: {reason}")]
    TerminationProtocolViolation {
        /// Rank that observed the violation.
        rank: usize,
        /// What was inconsistent.
        reason: String,
    },

    /// Malformed pattern or input file contents.
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// IO error while reading input or writing snapshots.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LifeError {
    /// Shorthand for a [`LifeError::Communication`].
    pub fn communication(rank: usize, reason: impl Into<String>) -> Self {
        LifeError::Communication {
            rank,
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`LifeError::TerminationProtocolViolation`].
    pub fn protocol(rank: usize, reason: impl Into<String>) -> Self {
        LifeError::TerminationProtocolViolation {
            rank,
            reason: reason.into(),
        }
    }

    /// Process exit code used by the binary for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            LifeError::Configuration(_) | LifeError::Pattern(_) => 2,
            LifeError::Communication { .. } => 3,
            LifeError::TerminationProtocolViolation { .. } => 4,
            LifeError::Io(_) => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_rank() {
        let err = LifeError::communication(3, "peer 2 hung up");
        assert_eq!(err.to_string(), "Communication error on rank 3: peer 2 hung up");

        let err = LifeError::protocol(0, "generation 4 != 5");
        assert!(err.to_string().contains("rank 0"));
    }

    #[test]
    fn test_exit_codes_are_distinct_per_kind() {
        let codes = [
            LifeError::Configuration("x".into()).exit_code(),
            LifeError::communication(0, "x").exit_code(),
            LifeError::protocol(0, "x").exit_code(),
            LifeError::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")).exit_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
