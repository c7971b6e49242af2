//! Converters from driver-native geo values to domain types.
//!
//! Distances always travel in meters on the wire ([`WIRE_UNIT`]); these
//! converters re-express them in the metric the caller asked for.

use hkv_common::{
    ConversionResult, Distance, GeoLocation, GeoRadiusArgs, GeoResult, GeoResults, Metric, Point,
    SortDirection,
};

use crate::driver::{GeoArgs, GeoCoordinates, GeoSort, GeoUnit, GeoWithin};

/// Unit token sent with every distance-bearing command.
pub const WIRE_UNIT: GeoUnit = GeoUnit::Meters;

/// Expresses `distance` in the wire unit.
pub fn to_wire_distance(distance: Distance) -> f64 {
    distance.in_meters()
}

/// Converter from a raw wire distance to a [`Distance`] in `metric`.
pub fn distance_converter(metric: Metric) -> impl Fn(f64) -> ConversionResult<Distance> + Send + 'static {
    move |raw| Ok(Distance::meters(raw).in_metric(metric))
}

/// Driver coordinates as a domain [`Point`].
pub fn coordinates_to_point(coordinates: GeoCoordinates) -> Point {
    Point::new(coordinates.x, coordinates.y)
}

/// Bare radius query members, each at zero distance in `metric`.
pub fn members_to_geo_results(metric: Metric) -> impl Fn(Vec<Vec<u8>>) -> ConversionResult<GeoResults<GeoLocation<Vec<u8>>>> + Send + 'static {
    move |members| {
        let results = members
            .into_iter()
            .map(|member| GeoResult::new(GeoLocation::new(member, None), Distance::new(0.0, metric)))
            .collect();
        Ok(GeoResults::new(results, metric))
    }
}

/// Radius query matches with extras, distances re-expressed in `metric`.
pub fn geo_within_to_geo_results(
    metric: Metric,
) -> impl Fn(Vec<GeoWithin<Vec<u8>>>) -> ConversionResult<GeoResults<GeoLocation<Vec<u8>>>> + Send + 'static {
    move |matches| {
        let results = matches
            .into_iter()
            .map(|within| {
                let distance = match within.distance {
                    Some(raw) => Distance::meters(raw).in_metric(metric),
                    None => Distance::new(0.0, metric),
                };
                let point = within.coordinates.map(coordinates_to_point);
                GeoResult::new(GeoLocation::new(within.member, point), distance)
            })
            .collect();
        Ok(GeoResults::new(results, metric))
    }
}

/// Maps façade radius options onto the driver's option set.
pub fn to_geo_args(args: &GeoRadiusArgs) -> GeoArgs {
    GeoArgs {
        with_distance: args.includes_distance(),
        with_coordinates: args.includes_coordinates(),
        with_hash: false,
        count: args.limit_count(),
        sort: args.sort_direction().map(|direction| match direction {
            SortDirection::Ascending => GeoSort::Asc,
            SortDirection::Descending => GeoSort::Desc,
        }),
    }
}
