//! Reply decoders shared by the typed command methods.
//!
//! Each decoder maps one RESP reply into a driver-native shape. Error replies
//! never reach these functions; drivers turn them into
//! `DriverError::Server` before completing the future.

use crate::driver::{DriverError, DriverResult, GeoArgs, GeoCoordinates, GeoWithin};
use crate::resp::RespValue;

/// `:n` reply.
pub fn integer(reply: RespValue) -> DriverResult<i64> {
    match reply {
        RespValue::Integer(value) => Ok(value),
        other => Err(unexpected("integer", &other)),
    }
}

/// Bulk string holding a floating point number, or null.
pub fn optional_double(reply: RespValue) -> DriverResult<Option<f64>> {
    match reply {
        RespValue::Bulk(Some(data)) => parse_double(&data).map(Some),
        RespValue::Bulk(None) => Ok(None),
        other => Err(unexpected("bulk string", &other)),
    }
}

/// Array reply, with `None` for a null array.
pub fn optional_array(reply: RespValue) -> DriverResult<Option<Vec<RespValue>>> {
    match reply {
        RespValue::Array(items) => Ok(items),
        other => Err(unexpected("array", &other)),
    }
}

/// Array of bulk strings or nulls, decoded as UTF-8 text.
pub fn optional_strings(reply: RespValue) -> DriverResult<Vec<Option<String>>> {
    elements(reply)?
        .into_iter()
        .map(|item| match item {
            RespValue::Bulk(Some(data)) => String::from_utf8(data)
                .map(Some)
                .map_err(|_| DriverError::Protocol("bulk string is not valid utf-8".into())),
            RespValue::Bulk(None) => Ok(None),
            other => Err(unexpected("bulk string", &other)),
        })
        .collect()
}

/// Array of `[longitude, latitude]` pairs or nulls.
pub fn optional_coordinates(reply: RespValue) -> DriverResult<Vec<Option<GeoCoordinates>>> {
    elements(reply)?
        .into_iter()
        .map(|item| match item {
            RespValue::Array(Some(pair)) => coordinates(pair).map(Some),
            RespValue::Array(None) | RespValue::Bulk(None) => Ok(None),
            other => Err(unexpected("coordinate pair", &other)),
        })
        .collect()
}

/// Array of bulk member names. A null array decodes as empty.
pub fn members(reply: RespValue) -> DriverResult<Vec<Vec<u8>>> {
    elements(reply)?.into_iter().map(member).collect()
}

/// Radius query reply, shaped by the `WITH*` flags in `args`.
///
/// With no flags every entry is a bare member; otherwise an entry is
/// `[member, distance?, hash?, [lon, lat]?]` in that order.
pub fn geo_within(reply: RespValue, args: &GeoArgs) -> DriverResult<Vec<GeoWithin<Vec<u8>>>> {
    let items = elements(reply)?;
    let mut results = Vec::with_capacity(items.len());

    for item in items {
        if !args.has_extras() {
            results.push(GeoWithin {
                member: member(item)?,
                distance: None,
                geohash: None,
                coordinates: None,
            });
            continue;
        }

        let mut parts = match item {
            RespValue::Array(Some(parts)) => parts.into_iter(),
            other => return Err(unexpected("array", &other)),
        };
        let name = member(next_part(&mut parts)?)?;
        let distance = if args.with_distance {
            match next_part(&mut parts)? {
                RespValue::Bulk(Some(data)) => Some(parse_double(&data)?),
                other => return Err(unexpected("bulk string", &other)),
            }
        } else {
            None
        };
        let geohash = if args.with_hash {
            Some(integer(next_part(&mut parts)?)?)
        } else {
            None
        };
        let coordinates = if args.with_coordinates {
            match next_part(&mut parts)? {
                RespValue::Array(Some(pair)) => Some(coordinates(pair)?),
                other => return Err(unexpected("coordinate pair", &other)),
            }
        } else {
            None
        };

        results.push(GeoWithin {
            member: name,
            distance,
            geohash,
            coordinates,
        });
    }

    Ok(results)
}

fn elements(reply: RespValue) -> DriverResult<Vec<RespValue>> {
    Ok(optional_array(reply)?.unwrap_or_default())
}

fn member(item: RespValue) -> DriverResult<Vec<u8>> {
    match item {
        RespValue::Bulk(Some(data)) => Ok(data),
        other => Err(unexpected("bulk string", &other)),
    }
}

fn coordinates(pair: Vec<RespValue>) -> DriverResult<GeoCoordinates> {
    let mut pair = pair.into_iter();
    let x = match next_part(&mut pair)? {
        RespValue::Bulk(Some(data)) => parse_double(&data)?,
        other => return Err(unexpected("bulk string", &other)),
    };
    let y = match next_part(&mut pair)? {
        RespValue::Bulk(Some(data)) => parse_double(&data)?,
        other => return Err(unexpected("bulk string", &other)),
    };
    Ok(GeoCoordinates { x, y })
}

fn next_part(parts: &mut std::vec::IntoIter<RespValue>) -> DriverResult<RespValue> {
    parts
        .next()
        .ok_or_else(|| DriverError::Protocol("reply entry is shorter than requested".into()))
}

fn parse_double(data: &[u8]) -> DriverResult<f64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.trim().parse::<f64>().ok())
        .ok_or_else(|| {
            DriverError::Protocol(format!(
                "invalid double {:?}",
                String::from_utf8_lossy(data)
            ))
        })
}

fn unexpected(expected: &'static str, actual: &RespValue) -> DriverError {
    DriverError::UnexpectedResponse {
        expected,
        actual: actual.kind(),
    }
}
