//! # Synchronous Client API
//!
//! Purpose: Expose typed, blocking command groups over an asynchronous store
//! driver, with optional pipelining.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `KVClient` hides the driver, the reply futures and
//!    the synchronization strategy behind command groups.
//! 2. **Borrow-Friendly API**: Accept `&[u8]` to avoid unnecessary copies.
//! 3. **Fail Fast**: Invalid arguments and configuration surface immediately.
//! 4. **Pluggable Pieces**: Any `AsyncCommands` driver and any `Synchronizer`
//!    can be combined; TCP with pipelining is the default.

use std::time::Duration;

use hkv_common::{ClientError, ClientResult};
use serde::Deserialize;

use crate::commands::geo::GeoCommands;
use crate::commands::zset::ZSetCommands;
use crate::driver::{AsyncCommands, DriverConfig, TcpDriver};
use crate::invoker::Invoker;
use crate::synchronizer::{translate, PipeliningSynchronizer, Synchronizer};

/// Configuration for the TCP-backed client.
///
/// Every field is optional when loaded from JSON:
///
/// ```rust
/// use hkv_client::ClientConfig;
///
/// let config = ClientConfig::from_json_str(r#"{"addr": "10.0.0.5:6379"}"#).unwrap();
/// assert_eq!(config.addr, "10.0.0.5:6379");
/// assert_eq!(config.command_timeout_ms, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Optional TCP connect timeout, in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Optional per-command reply timeout, in milliseconds.
    pub command_timeout_ms: Option<u64>,
    /// Initial capacity of the receive buffer.
    pub read_buffer_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:6379".to_string(),
            connect_timeout_ms: None,
            command_timeout_ms: None,
            read_buffer_bytes: 4096,
        }
    }
}

impl ClientConfig {
    /// Parses a JSON configuration document.
    pub fn from_json_str(json: &str) -> ClientResult<Self> {
        serde_json::from_str(json).map_err(|err| ClientError::Config(err.to_string()))
    }

    fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            addr: self.addr.clone(),
            connect_timeout: self.connect_timeout_ms.map(Duration::from_millis),
            command_timeout: self.command_timeout_ms.map(Duration::from_millis),
            read_buffer_bytes: self.read_buffer_bytes,
        }
    }
}

/// Synchronous client over a store driver.
///
/// Command groups borrow the client; the same client can be shared across
/// threads when its driver and synchronizer allow it.
///
/// The default [`TcpDriver`] blocks while connecting and on every ready
/// reply, so connect and call from synchronous code. Dropping the client is
/// allowed anywhere, including inside a tokio runtime.
pub struct KVClient<D = TcpDriver, S = PipeliningSynchronizer> {
    driver: D,
    synchronizer: S,
}

impl KVClient {
    /// Connects to `addr` with default configuration.
    pub fn connect(addr: impl Into<String>) -> ClientResult<Self> {
        let config = ClientConfig {
            addr: addr.into(),
            ..ClientConfig::default()
        };
        Self::with_config(config)
    }

    /// Connects with a custom configuration.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        let driver = TcpDriver::connect(&config.driver_config()).map_err(translate)?;
        Ok(KVClient::with_driver(driver))
    }
}

impl<D: AsyncCommands> KVClient<D, PipeliningSynchronizer> {
    /// Wraps an existing driver with the pipelining synchronizer.
    pub fn with_driver(driver: D) -> Self {
        KVClient::with_synchronizer(driver, PipeliningSynchronizer::new())
    }

    /// Queues replies of subsequent calls until [`close_pipeline`](Self::close_pipeline).
    pub fn open_pipeline(&self) -> ClientResult<()> {
        self.synchronizer.open_pipeline()
    }

    /// Resolves every queued reply in call order.
    pub fn close_pipeline(&self) -> ClientResult<usize> {
        self.synchronizer.close_pipeline()
    }

    /// Drops every queued reply; their handles read `PipelineDiscarded`.
    pub fn discard_pipeline(&self) -> usize {
        self.synchronizer.discard_pipeline()
    }

    pub fn is_pipelined(&self) -> bool {
        self.synchronizer.is_pipelined()
    }
}

impl<D: AsyncCommands, S: Synchronizer> KVClient<D, S> {
    /// Combines a driver with a specific synchronizer.
    pub fn with_synchronizer(driver: D, synchronizer: S) -> Self {
        KVClient {
            driver,
            synchronizer,
        }
    }

    /// Entry point of the invocation bridge, for commands without a façade.
    pub fn invoke(&self) -> Invoker<'_, D, S> {
        Invoker::new(&self.driver, &self.synchronizer)
    }

    pub fn geo(&self) -> GeoCommands<'_, D, S> {
        GeoCommands::new(self)
    }

    pub fn zset(&self) -> ZSetCommands<'_, D, S> {
        ZSetCommands::new(self)
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn synchronizer(&self) -> &S {
        &self.synchronizer
    }
}
