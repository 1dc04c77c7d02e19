//! Mock transport adapter for testing
//!
//! Simulates an instrument without requiring hardware. It provides:
//! - Register echo: a write `HDR args` stores `args`, a query `HDR?` returns it
//! - Marker-list merging (`WFSU NP,100` only updates the `NP` field)
//! - Controllable failure injection and simulated latency
//! - A transmission log with monotonic timestamps for test verification

use super::ScpiAdapter;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// One command as seen by the mock instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    /// When the command reached the adapter.
    pub at: Instant,
    /// The command string.
    pub command: String,
}

#[derive(Default)]
struct MockState {
    registers: HashMap<String, String>,
    pending: VecDeque<std::result::Result<String, String>>,
    transmissions: Vec<Transmission>,
    fail_next: bool,
}

/// Simulated instrument
///
/// Clones share state, so a test can keep one handle while the session owns
/// the other.
///
/// # Example
///
/// ```
/// use teledyne_scope::adapters::{MockAdapter, ScpiAdapter};
///
/// # async fn example() -> anyhow::Result<()> {
/// let mut adapter = MockAdapter::new().with_register("TDIV", "1.00E-03S");
/// assert_eq!(adapter.query("TDIV?").await?, "1.00E-03S");
///
/// adapter.write("TDIV 5.00E-04S").await?;
/// assert_eq!(adapter.query("TDIV?").await?, "5.00E-04S");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockAdapter {
    state: Arc<Mutex<MockState>>,
    latency: Duration,
}

impl MockAdapter {
    /// Create an empty simulated instrument.
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset a register (`key` is a header such as `C1:VDIV` or `SANU C1`).
    pub fn with_register(self, key: &str, value: &str) -> Self {
        self.set_register(key, value);
        self
    }

    /// Set simulated latency for every command
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set a register after construction.
    pub fn set_register(&self, key: &str, value: &str) {
        self.lock()
            .registers
            .insert(normalize(key), value.trim().to_string());
    }

    /// Current content of a register.
    pub fn register(&self, key: &str) -> Option<String> {
        self.lock().registers.get(&normalize(key)).cloned()
    }

    /// Make the next write fail with a transport error.
    pub fn inject_next_failure(&self) {
        self.lock().fail_next = true;
    }

    /// Every command received so far, with timestamps.
    pub fn transmissions(&self) -> Vec<Transmission> {
        self.lock().transmissions.clone()
    }

    /// Every command received so far.
    pub fn commands(&self) -> Vec<String> {
        self.lock()
            .transmissions
            .iter()
            .map(|t| t.command.clone())
            .collect()
    }

    /// Forget the transmission log.
    pub fn clear_log(&self) {
        self.lock().transmissions.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ScpiAdapter for MockAdapter {
    async fn write(&mut self, command: &str) -> Result<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut state = self.lock();
        state.transmissions.push(Transmission {
            at: Instant::now(),
            command: command.to_string(),
        });

        if std::mem::take(&mut state.fail_next) {
            bail!("Injected failure");
        }

        if command.contains('?') {
            let key = query_key(command);
            let header = key.split_whitespace().next().unwrap_or_default().to_string();
            let reply = state
                .registers
                .get(&key)
                .or_else(|| state.registers.get(&header))
                .cloned()
                .ok_or_else(|| format!("mock instrument has no value for '{command}'"));
            state.pending.push_back(reply);
        } else if let Some((header, args)) = command.trim().split_once(' ') {
            let header = normalize(header);
            let merged = match state.registers.get(&header) {
                Some(existing) => merge_marker_list(existing, args.trim()),
                None => args.trim().to_string(),
            };
            state.registers.insert(header, merged);
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<String> {
        match self.lock().pending.pop_front() {
            Some(reply) => reply.map_err(|e| anyhow!(e)),
            None => bail!("read with no reply pending"),
        }
    }

    fn info(&self) -> String {
        format!("MockAdapter({} registers)", self.lock().registers.len())
    }
}

fn normalize(key: &str) -> String {
    key.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `SANU? C1` -> `SANU C1`, `C1:VDIV?` -> `C1:VDIV`.
fn query_key(command: &str) -> String {
    normalize(&command.replacen('?', " ", 1))
}

/// Pairs of `MARKER,value`, e.g. `SP,1,NP,0,FP,0`.
fn marker_pairs(list: &str) -> Option<Vec<(String, String)>> {
    let tokens: Vec<&str> = list.split(',').map(str::trim).collect();
    if tokens.len() % 2 != 0 {
        return None;
    }
    tokens
        .chunks(2)
        .map(|pair| {
            let marker = pair[0];
            let is_marker = !marker.is_empty()
                && marker.chars().all(|c| c.is_ascii_alphabetic())
                && marker.parse::<f64>().is_err();
            is_marker.then(|| (marker.to_string(), pair[1].to_string()))
        })
        .collect()
}

fn merge_marker_list(existing: &str, update: &str) -> String {
    match (marker_pairs(existing), marker_pairs(update)) {
        (Some(mut current), Some(changes)) => {
            for (marker, value) in changes {
                match current.iter_mut().find(|(m, _)| *m == marker) {
                    Some(slot) => slot.1 = value,
                    None => current.push((marker, value)),
                }
            }
            current
                .into_iter()
                .map(|(m, v)| format!("{m},{v}"))
                .collect::<Vec<_>>()
                .join(",")
        }
        _ => update.to_string(),
    }
}
