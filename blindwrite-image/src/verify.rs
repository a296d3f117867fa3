use std::fmt;

/// Checks the integrity of one raw sector.
pub trait SectorChecker: Send + Sync {
    /// Returns `Some(true)` if the sector is intact, `Some(false)` if it is
    /// corrupt and `None` if it carries nothing that can be checked.
    fn check(&self, sector: &[u8]) -> Option<bool>;
}

/// Result of verifying one or more sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifyStatus {
    Pass,
    Fail,
    /// At least one sector could not be checked.
    Indeterminate,
}

impl From<Option<bool>> for VerifyStatus {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Pass,
            Some(false) => Self::Fail,
            None => Self::Indeterminate,
        }
    }
}

impl fmt::Display for VerifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Indeterminate => "indeterminate",
        })
    }
}

/// Outcome of [`Disc::verify_sectors()`](crate::Disc::verify_sectors()).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerifyReport {
    /// Absolute addresses of sectors that failed.
    pub failing: Vec<u64>,
    /// Absolute addresses of sectors that could not be checked.
    pub unknown: Vec<u64>,
}

impl VerifyReport {
    pub(crate) fn record(&mut self, address: u64, status: VerifyStatus) {
        match status {
            VerifyStatus::Pass => {}
            VerifyStatus::Fail => self.failing.push(address),
            VerifyStatus::Indeterminate => self.unknown.push(address),
        }
    }

    /// Merges another report, keeping addresses in order.
    pub fn merge(&mut self, other: Self) {
        self.failing.extend(other.failing);
        self.unknown.extend(other.unknown);
        self.failing.sort_unstable();
        self.unknown.sort_unstable();
    }

    /// Returns the aggregate status.
    ///
    /// Any unchecked sector makes the whole range indeterminate, even if every
    /// other sector passed or failed.
    #[must_use]
    pub fn status(&self) -> VerifyStatus {
        if !self.unknown.is_empty() {
            VerifyStatus::Indeterminate
        } else if !self.failing.is_empty() {
            VerifyStatus::Fail
        } else {
            VerifyStatus::Pass
        }
    }
}
