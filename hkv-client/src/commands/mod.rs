//! # Command Façades
//!
//! Purpose: Typed, synchronous command groups built on the invocation bridge.
//!
//! ## Design Principles
//! 1. **Validate First**: Every argument is checked before anything is
//!    dispatched; a rejected call never reaches the driver or the pipeline.
//! 2. **One Driver Call per Operation**: Compound inputs are flattened into a
//!    single command.
//! 3. **Domain Types Out**: Callers only see `hkv_common` types.

pub mod geo;
pub mod zset;

use hkv_common::{ClientError, ClientResult, Distance, Point};

use crate::convert::to_wire_distance;

pub(crate) fn require_key(key: &[u8]) -> ClientResult<()> {
    if key.is_empty() {
        return Err(ClientError::invalid_argument("key must not be empty"));
    }
    Ok(())
}

pub(crate) fn require_member(member: &[u8]) -> ClientResult<()> {
    if member.is_empty() {
        return Err(ClientError::invalid_argument("member must not be empty"));
    }
    Ok(())
}

/// Checks a member list and borrows it as raw byte slices.
pub(crate) fn require_members<M: AsRef<[u8]>>(members: &[M]) -> ClientResult<Vec<&[u8]>> {
    if members.is_empty() {
        return Err(ClientError::invalid_argument("member list must not be empty"));
    }
    members
        .iter()
        .map(|member| {
            let member = member.as_ref();
            require_member(member)?;
            Ok(member)
        })
        .collect()
}

pub(crate) fn require_point(point: &Point) -> ClientResult<()> {
    if !point.is_valid_coordinate() {
        return Err(ClientError::invalid_argument(format!(
            "coordinates out of range: {point}"
        )));
    }
    Ok(())
}

/// Checks a search radius and returns it in meters.
pub(crate) fn require_radius(radius: Distance) -> ClientResult<f64> {
    let meters = to_wire_distance(radius);
    if !meters.is_finite() || meters < 0.0 {
        return Err(ClientError::invalid_argument(format!(
            "radius must be a finite, non-negative distance: {radius}"
        )));
    }
    Ok(meters)
}

pub(crate) fn require_limit(limit: Option<usize>) -> ClientResult<()> {
    if limit == Some(0) {
        return Err(ClientError::invalid_argument("result limit must be positive"));
    }
    Ok(())
}
