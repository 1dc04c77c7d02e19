//! Teledyne LeCroy oscilloscope drivers.
//!
//! One [`TeledyneOscilloscope`] type serves every supported family; the
//! [`ScopeModel`] picks the descriptor variants and gates the properties a
//! family lacks with [`crate::ScopeError::NotSupported`].
//!
//! ## Layout
//!
//! - `commands`: immutable [`crate::command::CommandDescriptor`] tables
//! - `types`: typed tokens (`Coupling`, `WaveformSource`, ...) and snapshots
//! - `channel`: per-channel properties (`C1`..`C4`)
//! - `oscilloscope`: instrument-wide properties and actions
//! - `preamble`: waveform preamble assembly

pub mod channel;
pub(crate) mod commands;
pub mod model;
pub mod oscilloscope;
pub mod preamble;
pub mod types;

pub use channel::Channel;
pub use model::{Capability, ScopeModel, GRID_NUMBER};
pub use oscilloscope::TeledyneOscilloscope;
pub use preamble::WaveformPreamble;
pub use types::{
    AcquisitionStatus, AcquisitionType, BandwidthLimit, ChannelConfiguration, ChannelId,
    ChannelUnit, Coupling, MathExpression, MathOperator, Timebase, TimebaseSetup,
    TriggerCoupling, TriggerMode, TriggerSlope, WaveformSource,
};
