//! # HybridKV Sync Client
//!
//! Purpose: Provide a synchronous, typed command façade over an asynchronous
//! Redis-compatible driver, with geo commands as the first command group.
//!
//! ## Design Principles
//! 1. **Bridge, Not Rewrite**: Commands run on the async driver; the
//!    invocation bridge decides when to wait through a `Synchronizer`.
//! 2. **Zero-Cost Abstractions**: Synchronizers and drivers are generic
//!    parameters, so calls stay monomorphic.
//! 3. **Minimal Allocation**: Reuse buffers for RESP framing and parsing.
//! 4. **Protocol Clarity**: Encode/parse RESP2 explicitly for correctness.
//!
//! ## Example
//!
//! ```rust
//! use hkv_client::{KVClient, RespValue, ScriptedDriver};
//! use hkv_common::{Distance, Metric, NullableResult};
//!
//! let client = KVClient::with_driver(ScriptedDriver::new());
//! client.driver().reply(RespValue::bulk("1000.0"));
//!
//! let dist = client
//!     .geo()
//!     .geo_dist_in(b"places", b"a", b"b", Metric::Kilometers)
//!     .unwrap()
//!     .into_value()
//!     .unwrap();
//! assert_eq!(dist, NullableResult::of(Some(Distance::new(1.0, Metric::Kilometers))));
//! ```

mod client;
pub mod commands;
pub mod convert;
pub mod driver;
pub mod invoker;
mod reply;
mod resp;
pub mod synchronizer;

pub use client::{ClientConfig, KVClient};
pub use driver::{AsyncCommands, CommandArgs, CommandFuture, DriverError, DriverResult, ScriptedDriver, TcpDriver};
pub use hkv_common::{ClientError, ClientResult};
pub use invoker::{Invoker, ManyInvocation, SingleInvocation};
pub use reply::{Deferred, Reply};
pub use resp::RespValue;
pub use synchronizer::{BlockingSynchronizer, PipeliningSynchronizer, Synchronizer};
