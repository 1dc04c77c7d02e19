//! VISA adapter for GPIB/USB/Ethernet oscilloscopes
//!
//! Provides the [`ScpiAdapter`] implementation for the VISA communication
//! protocol. Blocking VISA calls run on Tokio's blocking thread pool so the
//! async caller is never stalled.

use super::ScpiAdapter;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;

#[cfg(feature = "instrument_visa")]
use anyhow::Context;
#[cfg(feature = "instrument_visa")]
use std::sync::Arc;
#[cfg(feature = "instrument_visa")]
use tokio::sync::Mutex;
#[cfg(feature = "instrument_visa")]
use tracing::debug;

#[cfg(feature = "instrument_visa")]
use visa_rs::prelude::*;

const DEFAULT_VISA_TIMEOUT: Duration = Duration::from_secs(5);
#[cfg(feature = "instrument_visa")]
const READ_CHUNK: usize = 4096;

/// VISA adapter for instrument communication
///
/// Supports resource strings like:
/// - "GPIB0::1::INSTR" (GPIB interface)
/// - "USB0::0x05FF::0x1023::SERIAL::INSTR" (USB)
/// - "TCPIP0::192.168.1.100::INSTR" (Ethernet/LXI)
pub struct VisaAdapter {
    /// VISA resource string (e.g., "TCPIP0::192.168.1.100::INSTR")
    pub(crate) resource_string: String,

    /// Open timeout
    pub(crate) timeout: Duration,

    /// Line terminator appended to commands and stripped from replies
    pub(crate) line_terminator: String,

    /// The open VISA session (behind Arc<Mutex> for the blocking pool)
    #[cfg(feature = "instrument_visa")]
    instrument: Option<Arc<Mutex<Instrument>>>,
}

impl VisaAdapter {
    /// Create a new, unconnected VISA adapter with default settings
    ///
    /// # Arguments
    /// * `resource_string` - VISA resource identifier (e.g., "GPIB0::1::INSTR")
    pub fn new(resource_string: impl Into<String>) -> Self {
        Self {
            resource_string: resource_string.into(),
            timeout: DEFAULT_VISA_TIMEOUT,
            line_terminator: "\n".to_string(),
            #[cfg(feature = "instrument_visa")]
            instrument: None,
        }
    }

    /// Set open timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set line terminator for commands
    pub fn with_line_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.line_terminator = terminator.into();
        self
    }

    /// Open the VISA resource.
    #[cfg(feature = "instrument_visa")]
    pub async fn connect(&mut self) -> Result<()> {
        let resource = self.resource_string.clone();
        let timeout = self.timeout;

        let instrument = tokio::task::spawn_blocking(move || {
            let rm = DefaultRM::new().context("Failed to create VISA resource manager")?;
            let name: VisaString = std::ffi::CString::new(resource.clone())
                .context("VISA resource string contains a NUL byte")?
                .into();
            let instr = rm
                .open(&name, AccessMode::NO_LOCK, timeout)
                .with_context(|| format!("Failed to open VISA resource: {}", resource))?;
            Ok::<Instrument, anyhow::Error>(instr)
        })
        .await
        .context("VISA open task panicked")??;

        self.instrument = Some(Arc::new(Mutex::new(instrument)));
        debug!(
            "VISA resource '{}' opened with {}ms timeout",
            self.resource_string,
            self.timeout.as_millis()
        );
        Ok(())
    }

    /// Open the VISA resource.
    #[cfg(not(feature = "instrument_visa"))]
    pub async fn connect(&mut self) -> Result<()> {
        Err(visa_disabled())
    }

    /// True once [`VisaAdapter::connect`] has succeeded.
    pub fn is_connected(&self) -> bool {
        #[cfg(feature = "instrument_visa")]
        {
            self.instrument.is_some()
        }

        #[cfg(not(feature = "instrument_visa"))]
        {
            false
        }
    }

    #[cfg(feature = "instrument_visa")]
    fn session(&self) -> Result<Arc<Mutex<Instrument>>> {
        self.instrument
            .clone()
            .ok_or_else(|| anyhow!("VISA instrument '{}' not connected", self.resource_string))
    }
}

#[cfg(not(feature = "instrument_visa"))]
fn visa_disabled() -> anyhow::Error {
    anyhow!("VISA support not enabled. Rebuild with --features instrument_visa")
}

#[async_trait]
impl ScpiAdapter for VisaAdapter {
    #[cfg(feature = "instrument_visa")]
    async fn write(&mut self, command: &str) -> Result<()> {
        use std::io::Write;

        let session = self.session()?;
        let payload = format!("{}{}", command, self.line_terminator);
        let command = command.to_string();

        tokio::task::spawn_blocking(move || {
            let mut instr = session.blocking_lock();
            instr
                .write_all(payload.as_bytes())
                .with_context(|| format!("VISA write failed for: {}", command))?;
            debug!("VISA write sent: {}", command);
            Ok(())
        })
        .await
        .context("VISA write task panicked")?
    }

    #[cfg(feature = "instrument_visa")]
    async fn read(&mut self) -> Result<String> {
        use std::io::Read;

        let session = self.session()?;
        let terminator = self.line_terminator.clone();

        tokio::task::spawn_blocking(move || {
            let mut instr = session.blocking_lock();
            let mut reply = Vec::new();
            let mut chunk = [0u8; READ_CHUNK];
            loop {
                let n = instr.read(&mut chunk).context("VISA read failed")?;
                reply.extend_from_slice(&chunk[..n]);
                if n < READ_CHUNK || reply.ends_with(terminator.as_bytes()) {
                    break;
                }
            }
            let reply = String::from_utf8_lossy(&reply)
                .trim_end_matches('\0')
                .trim_end_matches(terminator.as_str())
                .trim()
                .to_string();
            debug!("VISA read -> '{}'", reply);
            Ok(reply)
        })
        .await
        .context("VISA read task panicked")?
    }

    #[cfg(not(feature = "instrument_visa"))]
    async fn write(&mut self, _command: &str) -> Result<()> {
        Err(visa_disabled())
    }

    #[cfg(not(feature = "instrument_visa"))]
    async fn read(&mut self) -> Result<String> {
        Err(visa_disabled())
    }

    fn info(&self) -> String {
        format!(
            "VisaAdapter({} @ {}ms timeout)",
            self.resource_string,
            self.timeout.as_millis()
        )
    }
}
