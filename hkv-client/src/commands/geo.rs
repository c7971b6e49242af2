//! # Geo Commands
//!
//! Purpose: Store and query members by longitude/latitude with unit-aware
//! distances.
//!
//! ## Design Principles
//! 1. **Meters on the Wire**: Radii are converted to meters before dispatch
//!    and distances come back in meters; results are re-expressed in the
//!    metric the caller used.
//! 2. **Flattened Adds**: Map and location adds send one `GEOADD` with every
//!    `longitude latitude member` triple.
//! 3. **Removal via Sorted Sets**: Geo members live in a sorted set, so removal
//!    delegates to [`ZSetCommands::z_rem`](crate::commands::zset::ZSetCommands::z_rem).

use std::collections::HashMap;

use hkv_common::{
    identity, ClientError, ClientResult, Circle, Distance, GeoLocation, GeoRadiusArgs, GeoResults,
    Metric, NullableResult, Point,
};

use crate::client::KVClient;
use crate::commands::{
    require_key, require_limit, require_member, require_members, require_point, require_radius,
};
use crate::convert::{
    coordinates_to_point, distance_converter, geo_within_to_geo_results, members_to_geo_results,
    to_geo_args, WIRE_UNIT,
};
use crate::driver::{Arg, AsyncCommands, GeoCoordinates};
use crate::reply::Reply;
use crate::synchronizer::Synchronizer;

/// Radius query results keyed by raw member names.
pub type GeoSearchResults = GeoResults<GeoLocation<Vec<u8>>>;

/// Geo command group, obtained from [`KVClient::geo`].
///
/// Radii and distances always go over the wire in meters (`m`); each result
/// is converted back into the [`Metric`] the caller asked for.
pub struct GeoCommands<'a, D, S> {
    client: &'a KVClient<D, S>,
}

impl<'a, D, S> GeoCommands<'a, D, S>
where
    D: AsyncCommands,
    S: Synchronizer,
{
    pub(crate) fn new(client: &'a KVClient<D, S>) -> Self {
        GeoCommands { client }
    }

    /// Adds `member` at `point`. Returns the number of new members.
    pub fn geo_add(&self, key: &[u8], point: Point, member: &[u8]) -> ClientResult<Reply<i64>> {
        require_key(key)?;
        require_point(&point)?;
        require_member(member)?;
        self.client
            .invoke()
            .just(|driver| driver.geoadd(key, point.x(), point.y(), member))
    }

    /// Adds every member of `members` at its point with one command.
    pub fn geo_add_map<M: AsRef<[u8]>>(
        &self,
        key: &[u8],
        members: &HashMap<M, Point>,
    ) -> ClientResult<Reply<i64>> {
        require_key(key)?;
        if members.is_empty() {
            return Err(ClientError::invalid_argument("member map must not be empty"));
        }
        let mut values = Vec::with_capacity(members.len() * 3);
        for (member, point) in members {
            push_location(&mut values, member.as_ref(), point)?;
        }
        self.client
            .invoke()
            .just(move |driver| driver.geoadd_values(key, values))
    }

    /// Adds every location with one command. Each location needs a point.
    pub fn geo_add_locations<M: AsRef<[u8]>>(
        &self,
        key: &[u8],
        locations: &[GeoLocation<M>],
    ) -> ClientResult<Reply<i64>> {
        require_key(key)?;
        if locations.is_empty() {
            return Err(ClientError::invalid_argument("location list must not be empty"));
        }
        let mut values = Vec::with_capacity(locations.len() * 3);
        for location in locations {
            let point = location.point().ok_or_else(|| {
                ClientError::invalid_argument("location must have a point to be added")
            })?;
            push_location(&mut values, location.name().as_ref(), &point)?;
        }
        self.client
            .invoke()
            .just(move |driver| driver.geoadd_values(key, values))
    }

    /// Distance between two members, in meters.
    ///
    /// Empty when either member is missing.
    pub fn geo_dist(
        &self,
        key: &[u8],
        from: &[u8],
        to: &[u8],
    ) -> ClientResult<Reply<NullableResult<Distance>>> {
        self.geo_dist_in(key, from, to, Metric::Meters)
    }

    /// Distance between two members, in `metric`.
    pub fn geo_dist_in(
        &self,
        key: &[u8],
        from: &[u8],
        to: &[u8],
        metric: Metric,
    ) -> ClientResult<Reply<NullableResult<Distance>>> {
        require_key(key)?;
        require_member(from)?;
        require_member(to)?;
        let convert = distance_converter(metric);
        self.client
            .invoke()
            .from(|driver: &D| driver.geodist(key, from, to, WIRE_UNIT))
            .get(move |raw| NullableResult::of(raw).convert(&convert))
    }

    /// Geohash strings of `members`, `None` for missing members.
    pub fn geo_hash<M: AsRef<[u8]>>(
        &self,
        key: &[u8],
        members: &[M],
    ) -> ClientResult<Reply<Vec<Option<String>>>> {
        require_key(key)?;
        let members = require_members(members)?;
        self.client
            .invoke()
            .from_many(|driver: &D| driver.geohash(key, &members))
            .to_list(identity)
    }

    /// Positions of `members`, `None` for missing members.
    pub fn geo_pos<M: AsRef<[u8]>>(
        &self,
        key: &[u8],
        members: &[M],
    ) -> ClientResult<Reply<Vec<Option<Point>>>> {
        require_key(key)?;
        let members = require_members(members)?;
        self.client
            .invoke()
            .from_many(|driver: &D| driver.geopos(key, &members))
            .to_list(|coordinates: Option<GeoCoordinates>| Ok(coordinates.map(coordinates_to_point)))
    }

    /// Members inside `within`.
    pub fn geo_radius(&self, key: &[u8], within: &Circle) -> ClientResult<Reply<GeoSearchResults>> {
        require_key(key)?;
        let center = within.center();
        require_point(&center)?;
        let radius = require_radius(within.radius())?;
        self.client
            .invoke()
            .from(|driver: &D| driver.georadius(key, center.x(), center.y(), radius, WIRE_UNIT))
            .get(members_to_geo_results(within.radius().metric()))
    }

    /// Members inside `within`, shaped by `args`.
    ///
    /// Distances are reported in the radius' metric.
    pub fn geo_radius_with(
        &self,
        key: &[u8],
        within: &Circle,
        args: &GeoRadiusArgs,
    ) -> ClientResult<Reply<GeoSearchResults>> {
        require_key(key)?;
        let center = within.center();
        require_point(&center)?;
        let radius = require_radius(within.radius())?;
        require_limit(args.limit_count())?;
        let geo_args = to_geo_args(args);
        self.client
            .invoke()
            .from(|driver: &D| {
                driver.georadius_with(key, center.x(), center.y(), radius, WIRE_UNIT, &geo_args)
            })
            .get(geo_within_to_geo_results(within.radius().metric()))
    }

    /// Members within `radius` meters of `member`.
    pub fn geo_radius_by_member(
        &self,
        key: &[u8],
        member: &[u8],
        radius: f64,
    ) -> ClientResult<Reply<GeoSearchResults>> {
        self.geo_radius_by_member_distance(key, member, Distance::meters(radius))
    }

    /// Members within `radius` of `member`.
    pub fn geo_radius_by_member_distance(
        &self,
        key: &[u8],
        member: &[u8],
        radius: Distance,
    ) -> ClientResult<Reply<GeoSearchResults>> {
        require_key(key)?;
        require_member(member)?;
        let meters = require_radius(radius)?;
        self.client
            .invoke()
            .from(|driver: &D| driver.georadiusbymember(key, member, meters, WIRE_UNIT))
            .get(members_to_geo_results(radius.metric()))
    }

    /// Members within `radius` of `member`, shaped by `args`.
    pub fn geo_radius_by_member_with(
        &self,
        key: &[u8],
        member: &[u8],
        radius: Distance,
        args: &GeoRadiusArgs,
    ) -> ClientResult<Reply<GeoSearchResults>> {
        require_key(key)?;
        require_member(member)?;
        let meters = require_radius(radius)?;
        require_limit(args.limit_count())?;
        let geo_args = to_geo_args(args);
        self.client
            .invoke()
            .from(|driver: &D| {
                driver.georadiusbymember_with(key, member, meters, WIRE_UNIT, &geo_args)
            })
            .get(geo_within_to_geo_results(radius.metric()))
    }

    /// Removes `members`. Returns the number of members removed.
    pub fn geo_remove<M: AsRef<[u8]>>(&self, key: &[u8], members: &[M]) -> ClientResult<Reply<i64>> {
        self.client.zset().z_rem(key, members)
    }
}

fn push_location(values: &mut Vec<Arg>, member: &[u8], point: &Point) -> ClientResult<()> {
    require_member(member)?;
    require_point(point)?;
    values.push(Arg::from(point.x()));
    values.push(Arg::from(point.y()));
    values.push(Arg::from(member));
    Ok(())
}
