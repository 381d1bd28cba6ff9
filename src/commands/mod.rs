//! Command boundary: each procedure catches its errors once here and turns
//! them into an [`Outcome`] that decides the process exit code.

pub mod build;
pub mod fetch;

/// How a procedure ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Required capabilities were missing; the operator should fix and re-run
    MissingDependencies,
    /// The procedure failed. `signal` decides whether the exit code says so.
    Failed { signal: bool },
}

impl Outcome {
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Completed | Self::MissingDependencies | Self::Failed { signal: false } => 0,
            Self::Failed { signal: true } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::Completed.exit_code(), 0);
        assert_eq!(Outcome::MissingDependencies.exit_code(), 0);
        assert_eq!(Outcome::Failed { signal: true }.exit_code(), 1);
        assert_eq!(Outcome::Failed { signal: false }.exit_code(), 0);
    }
}
