//! Supported oscilloscope families and what each of them can do.

use crate::error::{ScopeError, ScopeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of horizontal grid divisions on every supported model.
pub const GRID_NUMBER: u32 = 14;

/// Oscilloscope family. Selects the descriptor table and capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeModel {
    /// LeCroy T3DSO1204.
    #[default]
    T3dso1204,
    /// Teledyne HDO6xxx, T3DSO1204 command set plus channel auto-setup.
    Hdo6xxx,
    /// MAUI-family Teledyne scopes.
    Maui,
}

/// Optional features that differ between models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// `HMAG` / `HPOS` zoom window.
    ZoomTimebase,
    /// Acquisition type, average, status, sampling rate and sample size.
    Acquisition,
    /// Channel invert.
    ChannelInvert,
    /// Channel-to-channel skew.
    ChannelSkew,
    /// Channel trace unit.
    ChannelUnit,
    /// Lower trigger level for runt/slope triggers.
    SecondaryTriggerLevel,
    /// Per-channel `AUTO_SETUP FIND`.
    ChannelAutoSetup,
    /// Bandwidth limits are read back for all channels in one reply.
    CombinedBandwidthReadback,
    /// `window` trigger slope.
    WindowTriggerSlope,
    /// `200MHZ` bandwidth limit.
    Bandwidth200Mhz,
    /// Memory depth restricted to the 7K..14M table.
    DiscreteMemorySize,
}

impl ScopeModel {
    /// Human readable instrument name.
    pub fn name(self) -> &'static str {
        match self {
            ScopeModel::T3dso1204 => "LeCroy T3DSO1204 Oscilloscope",
            ScopeModel::Hdo6xxx => "Teledyne HDO6xxx Oscilloscope",
            ScopeModel::Maui => "Teledyne MAUI Oscilloscope",
        }
    }

    /// Whether the model offers `capability`.
    pub fn supports(self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            ScopeModel::T3dso1204 => !matches!(
                capability,
                ChannelAutoSetup | CombinedBandwidthReadback | Bandwidth200Mhz
            ),
            ScopeModel::Hdo6xxx => {
                !matches!(capability, CombinedBandwidthReadback | Bandwidth200Mhz)
            }
            ScopeModel::Maui => matches!(
                capability,
                ChannelAutoSetup | CombinedBandwidthReadback | Bandwidth200Mhz
            ),
        }
    }

    /// Fail with [`ScopeError::NotSupported`] naming `property` when the
    /// capability is missing.
    pub fn require(self, capability: Capability, property: &str) -> ScopeResult<()> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(ScopeError::NotSupported(property.to_string()))
        }
    }

    /// Horizontal grid divisions.
    pub fn grid_number(self) -> u32 {
        GRID_NUMBER
    }
}

impl fmt::Display for ScopeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScopeModel::T3dso1204 => "t3dso1204",
            ScopeModel::Hdo6xxx => "hdo6xxx",
            ScopeModel::Maui => "maui",
        })
    }
}

impl FromStr for ScopeModel {
    type Err = ScopeError;

    fn from_str(s: &str) -> ScopeResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "t3dso1204" => Ok(ScopeModel::T3dso1204),
            "hdo6xxx" => Ok(ScopeModel::Hdo6xxx),
            "maui" => Ok(ScopeModel::Maui),
            other => Err(ScopeError::invalid(format!(
                "unknown model '{other}' (expected t3dso1204, hdo6xxx or maui)"
            ))),
        }
    }
}
