//! # Driver Boundary
//!
//! Purpose: Describe the asynchronous store driver the façade is built on:
//! submit a command, get back a [`CommandFuture`] for its reply.
//!
//! ## Design Principles
//! 1. **One Required Operation**: Implementors only provide `dispatch`; the
//!    typed command methods are built on top of it.
//! 2. **Driver-Native Shapes**: Typed methods decode replies into the driver's
//!    own types (`GeoCoordinates`, `GeoWithin`), never into façade types.
//! 3. **Owned Requests**: Arguments are copied into the command on dispatch so
//!    futures never borrow from the caller.
//!
//! ## Implementations
//!
//! - [`TcpDriver`]: RESP2 over one multiplexed TCP connection.
//! - [`ScriptedDriver`]: canned replies for tests of façade code.

pub mod decode;
mod future;
mod scripted;
mod tcp;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::resp::RespValue;

pub use future::{CommandFuture, ReplySender};
pub use scripted::ScriptedDriver;
pub use tcp::{DriverConfig, TcpDriver};

/// Result type used inside the driver layer.
pub type DriverResult<T> = Result<T, DriverError>;

/// Driver-native failures. The synchronizer translates these into
/// `ClientError::DataAccess` before they reach façade callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(String),
    /// No reply arrived within the command timeout.
    #[error("command timed out after {0:?}")]
    Timeout(Duration),
    /// The connection closed before the reply arrived.
    #[error("connection closed")]
    Closed,
    /// RESP2 framing or parse error.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Server returned an error reply.
    #[error("server error: {0}")]
    Server(String),
    /// Reply type did not match the command's expected reply.
    #[error("unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        expected: &'static str,
        actual: &'static str,
    },
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::Io(err.to_string())
    }
}

/// One wire argument before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Bytes(Vec<u8>),
    Double(f64),
    Integer(i64),
}

impl Arg {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            Arg::Bytes(bytes) => bytes,
            Arg::Double(value) => value.to_string().into_bytes(),
            Arg::Integer(value) => value.to_string().into_bytes(),
        }
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Double(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Integer(value)
    }
}

impl From<Vec<u8>> for Arg {
    fn from(value: Vec<u8>) -> Self {
        Arg::Bytes(value)
    }
}

impl From<&[u8]> for Arg {
    fn from(value: &[u8]) -> Self {
        Arg::Bytes(value.to_vec())
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Bytes(value.as_bytes().to_vec())
    }
}

/// A command name plus its encoded arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgs {
    parts: Vec<Vec<u8>>,
}

impl CommandArgs {
    pub fn new(name: &str) -> Self {
        CommandArgs {
            parts: vec![name.as_bytes().to_vec()],
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.push(arg);
        self
    }

    /// Appends one argument in place.
    pub fn push(&mut self, arg: impl Into<Arg>) {
        self.parts.push(arg.into().into_bytes());
    }

    /// Appends every argument of `args`, in order.
    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        for arg in args {
            self.push(arg);
        }
        self
    }

    /// Command name as sent on the wire.
    pub fn name(&self) -> &[u8] {
        &self.parts[0]
    }

    /// Name followed by all arguments.
    pub fn parts(&self) -> &[Vec<u8>] {
        &self.parts
    }

    /// Arguments without the command name.
    pub fn arguments(&self) -> &[Vec<u8>] {
        &self.parts[1..]
    }
}

impl fmt::Display for CommandArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, part) in self.parts.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&String::from_utf8_lossy(part))?;
        }
        Ok(())
    }
}

/// Unit token for distance-bearing geo commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeoUnit {
    Meters,
    Kilometers,
    Miles,
    Feet,
}

impl GeoUnit {
    pub const fn token(&self) -> &'static str {
        match self {
            GeoUnit::Meters => "m",
            GeoUnit::Kilometers => "km",
            GeoUnit::Miles => "mi",
            GeoUnit::Feet => "ft",
        }
    }
}

/// Sort order token for radius queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeoSort {
    Asc,
    Desc,
}

/// Driver-native radius query options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeoArgs {
    pub with_distance: bool,
    pub with_coordinates: bool,
    pub with_hash: bool,
    pub count: Option<usize>,
    pub sort: Option<GeoSort>,
}

impl GeoArgs {
    /// Returns true when replies are nested arrays rather than bare members.
    pub fn has_extras(&self) -> bool {
        self.with_distance || self.with_coordinates || self.with_hash
    }

    fn append_to(&self, command: &mut CommandArgs) {
        if self.with_distance {
            command.push("WITHDIST");
        }
        if self.with_hash {
            command.push("WITHHASH");
        }
        if self.with_coordinates {
            command.push("WITHCOORD");
        }
        if let Some(count) = self.count {
            command.push("COUNT");
            command.push(count as i64);
        }
        match self.sort {
            Some(GeoSort::Asc) => command.push("ASC"),
            Some(GeoSort::Desc) => command.push("DESC"),
            None => {}
        }
    }
}

/// Longitude/latitude pair as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoordinates {
    pub x: f64,
    pub y: f64,
}

/// One radius query match with the extras that were requested.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoWithin<V> {
    pub member: V,
    pub distance: Option<f64>,
    pub geohash: Option<i64>,
    pub coordinates: Option<GeoCoordinates>,
}

/// Asynchronous command interface of a store driver.
///
/// Only [`dispatch`](AsyncCommands::dispatch) is required. Every method
/// dispatches immediately; calling one twice sends the command twice.
pub trait AsyncCommands: Send + Sync {
    /// Sends a raw command and returns a handle for its reply.
    ///
    /// Error replies must complete the handle with `DriverError::Server`.
    fn dispatch(&self, command: CommandArgs) -> CommandFuture<RespValue>;

    /// `GEOADD key longitude latitude member`
    fn geoadd(&self, key: &[u8], longitude: f64, latitude: f64, member: &[u8]) -> CommandFuture<i64> {
        let command = CommandArgs::new("GEOADD")
            .arg(key)
            .arg(longitude)
            .arg(latitude)
            .arg(member);
        self.dispatch(command).and_then(decode::integer)
    }

    /// `GEOADD key` followed by a flat `longitude latitude member ...` list.
    fn geoadd_values(&self, key: &[u8], values: Vec<Arg>) -> CommandFuture<i64> {
        let command = CommandArgs::new("GEOADD").arg(key).args(values);
        self.dispatch(command).and_then(decode::integer)
    }

    /// `GEODIST key member1 member2 unit`; `None` when a member is missing.
    fn geodist(&self, key: &[u8], from: &[u8], to: &[u8], unit: GeoUnit) -> CommandFuture<Option<f64>> {
        let command = CommandArgs::new("GEODIST")
            .arg(key)
            .arg(from)
            .arg(to)
            .arg(unit.token());
        self.dispatch(command).and_then(decode::optional_double)
    }

    /// `GEOHASH key member...`; one entry per member, `None` when missing.
    fn geohash(&self, key: &[u8], members: &[&[u8]]) -> CommandFuture<Vec<Option<String>>> {
        let command = CommandArgs::new("GEOHASH").arg(key).args(members.iter().copied());
        self.dispatch(command).and_then(decode::optional_strings)
    }

    /// `GEOPOS key member...`; one entry per member, `None` when missing.
    fn geopos(&self, key: &[u8], members: &[&[u8]]) -> CommandFuture<Vec<Option<GeoCoordinates>>> {
        let command = CommandArgs::new("GEOPOS").arg(key).args(members.iter().copied());
        self.dispatch(command).and_then(decode::optional_coordinates)
    }

    /// `GEORADIUS key longitude latitude radius unit`
    fn georadius(
        &self,
        key: &[u8],
        longitude: f64,
        latitude: f64,
        radius: f64,
        unit: GeoUnit,
    ) -> CommandFuture<Vec<Vec<u8>>> {
        let command = CommandArgs::new("GEORADIUS")
            .arg(key)
            .arg(longitude)
            .arg(latitude)
            .arg(radius)
            .arg(unit.token());
        self.dispatch(command).and_then(decode::members)
    }

    /// `GEORADIUS key longitude latitude radius unit [options]`
    fn georadius_with(
        &self,
        key: &[u8],
        longitude: f64,
        latitude: f64,
        radius: f64,
        unit: GeoUnit,
        args: &GeoArgs,
    ) -> CommandFuture<Vec<GeoWithin<Vec<u8>>>> {
        let mut command = CommandArgs::new("GEORADIUS")
            .arg(key)
            .arg(longitude)
            .arg(latitude)
            .arg(radius)
            .arg(unit.token());
        args.append_to(&mut command);
        let args = *args;
        self.dispatch(command)
            .and_then(move |reply| decode::geo_within(reply, &args))
    }

    /// `GEORADIUSBYMEMBER key member radius unit`
    fn georadiusbymember(&self, key: &[u8], member: &[u8], radius: f64, unit: GeoUnit) -> CommandFuture<Vec<Vec<u8>>> {
        let command = CommandArgs::new("GEORADIUSBYMEMBER")
            .arg(key)
            .arg(member)
            .arg(radius)
            .arg(unit.token());
        self.dispatch(command).and_then(decode::members)
    }

    /// `GEORADIUSBYMEMBER key member radius unit [options]`
    fn georadiusbymember_with(
        &self,
        key: &[u8],
        member: &[u8],
        radius: f64,
        unit: GeoUnit,
        args: &GeoArgs,
    ) -> CommandFuture<Vec<GeoWithin<Vec<u8>>>> {
        let mut command = CommandArgs::new("GEORADIUSBYMEMBER")
            .arg(key)
            .arg(member)
            .arg(radius)
            .arg(unit.token());
        args.append_to(&mut command);
        let args = *args;
        self.dispatch(command)
            .and_then(move |reply| decode::geo_within(reply, &args))
    }

    /// `ZREM key member...`; number of members removed.
    fn zrem(&self, key: &[u8], members: &[&[u8]]) -> CommandFuture<i64> {
        let command = CommandArgs::new("ZREM").arg(key).args(members.iter().copied());
        self.dispatch(command).and_then(decode::integer)
    }
}
