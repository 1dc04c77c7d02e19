//! One communication session with one instrument.
//!
//! `ScpiSession` owns the transport adapter and the write throttle. All
//! commands go through a single `tokio::sync::Mutex`, so they are transmitted
//! strictly in order even when several channel handles share the session.

use crate::adapters::ScpiAdapter;
use crate::error::ScopeResult;
use crate::throttle::WriteThrottle;
use crate::value::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

struct SessionInner {
    adapter: Box<dyn ScpiAdapter>,
    throttle: WriteThrottle,
}

/// Ordered, rate-limited command channel to an instrument.
pub struct ScpiSession {
    inner: Mutex<SessionInner>,
    description: String,
}

impl ScpiSession {
    /// Wrap an adapter with the default write interval.
    pub fn new(adapter: impl ScpiAdapter + 'static) -> Self {
        Self::with_throttle(adapter, WriteThrottle::default())
    }

    /// Wrap an adapter with an explicit throttle.
    pub fn with_throttle(adapter: impl ScpiAdapter + 'static, throttle: WriteThrottle) -> Self {
        let description = adapter.info();
        Self {
            inner: Mutex::new(SessionInner {
                adapter: Box::new(adapter),
                throttle,
            }),
            description,
        }
    }

    /// Adapter description captured when the session was created.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Minimum time between two transmitted commands.
    pub async fn write_interval(&self) -> Duration {
        self.inner.lock().await.throttle.interval()
    }

    /// Change the minimum time between two transmitted commands.
    pub async fn set_write_interval(&self, interval: Duration) {
        self.inner.lock().await.throttle.set_interval(interval);
    }

    /// Transmit a command that has no reply.
    pub async fn write(&self, command: &str) -> ScopeResult<()> {
        let mut inner = self.inner.lock().await;
        inner.transmit(command).await
    }

    /// Transmit a query and return the raw reply.
    pub async fn ask(&self, command: &str) -> ScopeResult<String> {
        let mut inner = self.inner.lock().await;
        inner.transmit(command).await?;
        let reply = inner.adapter.read().await?;
        debug!(command, reply = %reply, "SCPI reply");
        Ok(reply)
    }

    /// Transmit a query and split the reply into typed tokens.
    pub async fn values(&self, command: &str) -> ScopeResult<Vec<Value>> {
        let reply = self.ask(command).await?;
        Ok(Value::from_reply(&reply).into_list())
    }
}

impl SessionInner {
    async fn transmit(&mut self, command: &str) -> ScopeResult<()> {
        self.throttle.wait().await;
        debug!(command, "SCPI write");
        let result = self.adapter.write(command).await;
        self.throttle.mark();
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;
    use crate::error::ScopeError;
    use tracing_test::traced_test;

    #[tokio::test(start_paused = true)]
    async fn test_ask_returns_reply() {
        let mock = MockAdapter::new().with_register("*IDN", "LECROY,T3DSO1204,SN001,1.0");
        let session = ScpiSession::new(mock);
        let reply = session.ask("*IDN?").await.unwrap();
        assert!(reply.starts_with("LECROY"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_values_splits_tokens() {
        let mock = MockAdapter::new().with_register("WFSU", "SP,4,NP,1000,FP,0");
        let session = ScpiSession::new(mock);
        let values = session.values("WFSU?").await.unwrap();
        assert_eq!(values.len(), 6);
        assert_eq!(values[3], Value::Number(1000.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_commands_are_spaced() {
        let mock = MockAdapter::new();
        let session = ScpiSession::with_throttle(
            mock.clone(),
            WriteThrottle::new(Duration::from_millis(25)),
        );
        session.write("ASET").await.unwrap();
        session.write("STOP").await.unwrap();

        let log = mock.transmissions();
        assert_eq!(log.len(), 2);
        assert!(log[1].at.duration_since(log[0].at) >= Duration::from_millis(25));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_is_configurable() {
        let session = ScpiSession::new(MockAdapter::new());
        assert_eq!(session.write_interval().await, Duration::from_millis(10));
        session.set_write_interval(Duration::from_millis(500)).await;
        assert_eq!(session.write_interval().await, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_propagates() {
        let mock = MockAdapter::new();
        mock.inject_next_failure();
        let session = ScpiSession::new(mock);
        let err = session.write("ASET").await.unwrap_err();
        assert!(matches!(err, ScopeError::Transport(_)));
        assert_eq!(err.to_string(), "Injected failure");
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_commands_are_logged() {
        let session = ScpiSession::new(MockAdapter::new());
        session.write("C1:VDIV 5.00E-02V").await.unwrap();
        assert!(logs_contain("C1:VDIV 5.00E-02V"));
    }
}
