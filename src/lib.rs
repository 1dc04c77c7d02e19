//! Typed bindings for Teledyne LeCroy oscilloscopes.
//!
//! This library turns the instruments' ASCII command set into validated,
//! typed properties. Every property is described once by an immutable
//! [`command::CommandDescriptor`]; a single generic accessor formats,
//! validates, transmits and decodes it. All traffic goes through one
//! rate-limited [`ScpiSession`] per instrument.
//!
//! Supported families: LeCroy T3DSO1204, Teledyne HDO6xxx and MAUI-based
//! scopes. The transport is pluggable through [`adapters::ScpiAdapter`];
//! [`MockAdapter`] simulates an instrument for tests and [`VisaAdapter`]
//! (feature `instrument_visa`) talks to real hardware.

pub mod adapters;
pub mod command;
pub mod config;
pub mod error;
pub mod instrument;
pub mod logging;
pub mod session;
pub mod throttle;
pub mod validators;
pub mod value;

pub use adapters::{MockAdapter, VisaAdapter};
pub use config::ScopeConfig;
pub use error::{ScopeError, ScopeResult};
pub use instrument::{
    Channel, ScopeModel, TeledyneOscilloscope, WaveformPreamble, WaveformSource,
};
pub use session::ScpiSession;
pub use value::Value;
