//! # Geo Domain Types
//!
//! Domain-level values exchanged with façade callers: coordinates, distances
//! with a unit, search circles and search results.
//!
//! ## Design Principles
//!
//! 1. **Unit-Carrying Distances**: A `Distance` always knows its `Metric`, so
//!    callers never guess whether a number is meters or miles.
//!
//! 2. **Meters as Pivot**: Every conversion goes through meters, using the
//!    same factors as the store (1 km = 1000 m, 1 mi = 1609.34 m,
//!    1 ft = 0.3048 m).
//!
//! 3. **Store Coordinate Limits**: Longitudes are valid in [-180, 180] and
//!    latitudes in [-85.05112878, 85.05112878], the range the store can index.
//!
//! ## Result Shape Example
//!
//! ```text
//! GeoResults
//!   ├── results: Vec<GeoResult>
//!   │     └── GeoResult { content: GeoLocation { name, point? }, distance }
//!   └── average_distance: Distance (same metric as every result)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Smallest longitude the store accepts.
pub const MIN_LONGITUDE: f64 = -180.0;

/// Largest longitude the store accepts.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Smallest latitude the store accepts (Web Mercator limit).
pub const MIN_LATITUDE: f64 = -85.051_128_78;

/// Largest latitude the store accepts (Web Mercator limit).
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// A coordinate pair: `x` is the longitude, `y` the latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    /// Creates a point from longitude (`x`) and latitude (`y`).
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    #[inline]
    pub const fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Returns true when both coordinates are finite and inside the range the
    /// store can index.
    pub fn is_valid_coordinate(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&self.x)
            && (MIN_LATITUDE..=MAX_LATITUDE).contains(&self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point [x={}, y={}]", self.x, self.y)
    }
}

/// Distance unit understood by the façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Meters,
    Kilometers,
    Miles,
    Feet,
}

impl Metric {
    /// Number of meters in one unit of this metric.
    #[inline]
    pub const fn meters_per_unit(&self) -> f64 {
        match self {
            Metric::Meters => 1.0,
            Metric::Kilometers => 1000.0,
            Metric::Miles => 1609.34,
            Metric::Feet => 0.3048,
        }
    }

    /// Short unit label, e.g. `km`.
    #[inline]
    pub const fn abbreviation(&self) -> &'static str {
        match self {
            Metric::Meters => "m",
            Metric::Kilometers => "km",
            Metric::Miles => "mi",
            Metric::Feet => "ft",
        }
    }
}

/// A numeric distance tagged with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    value: f64,
    metric: Metric,
}

impl Distance {
    #[inline]
    pub const fn new(value: f64, metric: Metric) -> Self {
        Distance { value, metric }
    }

    /// Creates a distance in meters.
    #[inline]
    pub const fn meters(value: f64) -> Self {
        Distance::new(value, Metric::Meters)
    }

    #[inline]
    pub const fn value(&self) -> f64 {
        self.value
    }

    #[inline]
    pub const fn metric(&self) -> Metric {
        self.metric
    }

    /// Returns the distance expressed in meters.
    #[inline]
    pub fn in_meters(&self) -> f64 {
        self.value * self.metric.meters_per_unit()
    }

    /// Re-expresses this distance in `metric`.
    pub fn in_metric(&self, metric: Metric) -> Distance {
        if metric == self.metric {
            return *self;
        }
        Distance::new(self.in_meters() / metric.meters_per_unit(), metric)
    }
}

impl Default for Distance {
    fn default() -> Self {
        Distance::meters(0.0)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.metric.abbreviation())
    }
}

/// A search area: a center point and a radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    center: Point,
    radius: Distance,
}

impl Circle {
    #[inline]
    pub const fn new(center: Point, radius: Distance) -> Self {
        Circle { center, radius }
    }

    #[inline]
    pub const fn center(&self) -> Point {
        self.center
    }

    #[inline]
    pub const fn radius(&self) -> Distance {
        self.radius
    }
}

/// A named member with an optional position.
///
/// Positions are absent in search results that did not request coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation<T> {
    name: T,
    point: Option<Point>,
}

impl<T> GeoLocation<T> {
    #[inline]
    pub fn new(name: T, point: Option<Point>) -> Self {
        GeoLocation { name, point }
    }

    /// Creates a location with a known position.
    #[inline]
    pub fn at(name: T, point: Point) -> Self {
        GeoLocation::new(name, Some(point))
    }

    #[inline]
    pub fn name(&self) -> &T {
        &self.name
    }

    #[inline]
    pub fn point(&self) -> Option<Point> {
        self.point
    }

    #[inline]
    pub fn into_name(self) -> T {
        self.name
    }
}

/// One entry of a geo search together with its distance from the center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoResult<T> {
    content: T,
    distance: Distance,
}

impl<T> GeoResult<T> {
    #[inline]
    pub fn new(content: T, distance: Distance) -> Self {
        GeoResult { content, distance }
    }

    #[inline]
    pub fn content(&self) -> &T {
        &self.content
    }

    #[inline]
    pub fn distance(&self) -> Distance {
        self.distance
    }

    #[inline]
    pub fn into_content(self) -> T {
        self.content
    }
}

/// Ordered geo search results with the average distance across them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoResults<T> {
    results: Vec<GeoResult<T>>,
    average_distance: Distance,
}

impl<T> GeoResults<T> {
    /// Builds results and computes their average distance in `metric`.
    ///
    /// An empty result set averages to zero in `metric`.
    pub fn new(results: Vec<GeoResult<T>>, metric: Metric) -> Self {
        let average = if results.is_empty() {
            0.0
        } else {
            let total: f64 = results
                .iter()
                .map(|result| result.distance.in_metric(metric).value())
                .sum();
            total / results.len() as f64
        };

        GeoResults {
            results,
            average_distance: Distance::new(average, metric),
        }
    }

    /// Returns an empty result set in `metric`.
    pub fn empty(metric: Metric) -> Self {
        GeoResults::new(Vec::new(), metric)
    }

    #[inline]
    pub fn content(&self) -> &[GeoResult<T>] {
        &self.results
    }

    #[inline]
    pub fn average_distance(&self) -> Distance {
        self.average_distance
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeoResult<T>> {
        self.results.iter()
    }
}

impl<T> IntoIterator for GeoResults<T> {
    type Item = GeoResult<T>;
    type IntoIter = std::vec::IntoIter<GeoResult<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// Sort order for radius queries, by distance from the center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Optional flags for radius queries.
///
/// Built with chained calls:
///
/// ```rust
/// use hkv_common::GeoRadiusArgs;
///
/// let args = GeoRadiusArgs::new().include_distance().limit(5).sort_ascending();
/// assert!(args.includes_distance());
/// assert_eq!(args.limit_count(), Some(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeoRadiusArgs {
    include_distance: bool,
    include_coordinates: bool,
    limit: Option<usize>,
    sort: Option<SortDirection>,
}

impl GeoRadiusArgs {
    pub fn new() -> Self {
        GeoRadiusArgs::default()
    }

    /// Requests the distance of every result from the center.
    pub fn include_distance(mut self) -> Self {
        self.include_distance = true;
        self
    }

    /// Requests the position of every result.
    pub fn include_coordinates(mut self) -> Self {
        self.include_coordinates = true;
        self
    }

    /// Caps the number of results.
    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    pub fn sort_ascending(mut self) -> Self {
        self.sort = Some(SortDirection::Ascending);
        self
    }

    pub fn sort_descending(mut self) -> Self {
        self.sort = Some(SortDirection::Descending);
        self
    }

    #[inline]
    pub fn includes_distance(&self) -> bool {
        self.include_distance
    }

    #[inline]
    pub fn includes_coordinates(&self) -> bool {
        self.include_coordinates
    }

    #[inline]
    pub fn limit_count(&self) -> Option<usize> {
        self.limit
    }

    #[inline]
    pub fn sort_direction(&self) -> Option<SortDirection> {
        self.sort
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_validity() {
        assert!(Point::new(13.361389, 38.115556).is_valid_coordinate());
        assert!(Point::new(MAX_LONGITUDE, MIN_LATITUDE).is_valid_coordinate());
        assert!(!Point::new(180.5, 0.0).is_valid_coordinate());
        assert!(!Point::new(0.0, 86.0).is_valid_coordinate());
        assert!(!Point::new(f64::NAN, 0.0).is_valid_coordinate());
    }

    #[test]
    fn test_distance_conversion() {
        let distance = Distance::meters(1000.0);
        assert_eq!(distance.in_metric(Metric::Kilometers), Distance::new(1.0, Metric::Kilometers));

        let miles = Distance::new(2.0, Metric::Miles);
        assert!((miles.in_meters() - 3218.68).abs() < 1e-9);

        // Same metric is returned untouched.
        assert_eq!(miles.in_metric(Metric::Miles), miles);
    }

    #[test]
    fn test_distance_display() {
        assert_eq!(Distance::new(1.5, Metric::Kilometers).to_string(), "1.5 km");
        assert_eq!(Distance::default().to_string(), "0 m");
    }

    #[test]
    fn test_geo_results_average() {
        let results = GeoResults::new(
            vec![
                GeoResult::new("a", Distance::meters(1000.0)),
                GeoResult::new("b", Distance::new(3.0, Metric::Kilometers)),
            ],
            Metric::Kilometers,
        );
        assert_eq!(results.len(), 2);
        assert_eq!(results.average_distance(), Distance::new(2.0, Metric::Kilometers));
    }

    #[test]
    fn test_empty_geo_results() {
        let results = GeoResults::<&str>::empty(Metric::Miles);
        assert!(results.is_empty());
        assert_eq!(results.average_distance(), Distance::new(0.0, Metric::Miles));
    }

    #[test]
    fn test_radius_args_builder() {
        let args = GeoRadiusArgs::new()
            .include_coordinates()
            .limit(3)
            .sort_descending();
        assert!(!args.includes_distance());
        assert!(args.includes_coordinates());
        assert_eq!(args.limit_count(), Some(3));
        assert_eq!(args.sort_direction(), Some(SortDirection::Descending));
    }
}
