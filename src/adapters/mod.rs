//! Transport adapters
//!
//! This module contains implementations of the [`ScpiAdapter`] trait,
//! providing the low-level request/response exchange with an instrument.
//! Connection setup, addressing and byte framing live entirely in the
//! adapter; the rest of the crate only sees command strings and replies.

pub mod mock;
pub mod visa_adapter;

pub use mock::MockAdapter;
pub use visa_adapter::VisaAdapter;

use anyhow::Result;
use async_trait::async_trait;

/// Narrow request/response contract consumed by [`crate::session::ScpiSession`].
///
/// Errors are the transport's own and are propagated unmodified.
#[async_trait]
pub trait ScpiAdapter: Send {
    /// Send one command string (without terminator).
    async fn write(&mut self, command: &str) -> Result<()>;

    /// Read one reply (terminator removed).
    async fn read(&mut self) -> Result<String>;

    /// Send a command and read its reply.
    async fn query(&mut self, command: &str) -> Result<String> {
        self.write(command).await?;
        self.read().await
    }

    /// Short human readable description, used in logs.
    fn info(&self) -> String;
}
