//! # Region Codes
//!
//! The regulatory authorities a sequence can target. The set is closed:
//! adding a region forces every `match` in the workspace to handle it, and
//! parsing an unknown code is a `NotFound` error rather than a region with
//! no requirements.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EctdError;

/// A regulatory region served by a submission profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegionCode {
    /// US Food and Drug Administration.
    Fda,
    /// European Medicines Agency.
    Ema,
    /// Japan Pharmaceuticals and Medical Devices Agency.
    Pmda,
    /// Health Canada.
    Hc,
}

impl RegionCode {
    /// All regions, in declaration order.
    pub const ALL: [RegionCode; 4] = [Self::Fda, Self::Ema, Self::Pmda, Self::Hc];

    /// The canonical upper-case code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fda => "FDA",
            Self::Ema => "EMA",
            Self::Pmda => "PMDA",
            Self::Hc => "HC",
        }
    }
}

impl FromStr for RegionCode {
    type Err = EctdError;

    /// Parse a region code, ignoring ASCII case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(code))
            .ok_or_else(|| EctdError::NotFound(format!("unknown region code {s:?}")))
    }
}

impl std::fmt::Display for RegionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
