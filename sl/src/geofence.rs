//! Disaster zone containment
//!
//! A survivor is inside a zone when the great-circle distance between their
//! location and the zone center is within the zone's radius.

use sessionstore::{DisasterZone, GeoPoint};
use tracing::debug;

/// Mean Earth radius (IUGG) in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance between two points in kilometres
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Containment rule shared by every zone evaluation
#[derive(Debug, Clone, Copy)]
pub struct Geofence {
    /// Radius for zones that do not carry their own
    pub default_radius_km: f64,
}

impl Geofence {
    pub fn new(default_radius_km: f64) -> Self {
        Self { default_radius_km }
    }

    /// Effective radius of a zone
    pub fn radius_of(&self, zone: &DisasterZone) -> f64 {
        zone.radius_km.unwrap_or(self.default_radius_km)
    }

    /// Whether the point lies inside this particular zone
    pub fn zone_contains(&self, zone: &DisasterZone, point: GeoPoint) -> bool {
        haversine_km(point, zone.center) <= self.radius_of(zone)
    }

    /// Whether the point lies inside any zone; no zones means no danger
    pub fn contains(&self, point: GeoPoint, zones: &[DisasterZone]) -> bool {
        debug!(%point, zone_count = zones.len(), "contains: called");
        match zones.iter().find(|zone| self.zone_contains(zone, point)) {
            Some(zone) => {
                debug!(zone = %zone.name, "contains: inside zone");
                true
            }
            None => {
                debug!("contains: outside all zones");
                false
            }
        }
    }

    /// Closest zone center and its distance in kilometres
    pub fn nearest<'a>(&self, point: GeoPoint, zones: &'a [DisasterZone]) -> Option<(&'a DisasterZone, f64)> {
        zones
            .iter()
            .map(|zone| (zone, haversine_km(point, zone.center)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn springfield() -> GeoPoint {
        GeoPoint::from_lon_lat(-89.6501, 39.7817)
    }

    fn chicago() -> GeoPoint {
        GeoPoint::from_lon_lat(-87.6298, 41.8781)
    }

    #[test]
    fn test_haversine_known_distance() {
        let d = haversine_km(springfield(), chicago());
        assert!((d - 288.48).abs() < 0.5, "distance was {d}");
        assert_eq!(haversine_km(springfield(), springfield()), 0.0);
    }

    #[test]
    fn test_haversine_antipodal_on_equator() {
        let d = haversine_km(GeoPoint::from_lon_lat(0.0, 0.0), GeoPoint::from_lon_lat(180.0, 0.0));
        assert!((d - 20015.11).abs() < 0.1, "distance was {d}");
    }

    #[test]
    fn test_empty_zone_list_is_outside() {
        let fence = Geofence::new(10.0);
        assert!(!fence.contains(springfield(), &[]));
    }

    #[test]
    fn test_inside_default_radius() {
        let fence = Geofence::new(10.0);
        // ~5.56 km north of Springfield
        let zone = DisasterZone::new("flood", GeoPoint::from_lon_lat(-89.6501, 39.8317), None);
        assert!(fence.contains(springfield(), &[zone.clone()]));
        assert!(!Geofence::new(5.0).contains(springfield(), &[zone]));
    }

    #[test]
    fn test_zone_radius_overrides_default() {
        let fence = Geofence::new(1.0);
        let zone = DisasterZone::new("tornado", GeoPoint::from_lon_lat(-89.6501, 39.8317), Some(6.0));
        assert!(fence.contains(springfield(), &[zone]));
    }

    #[test]
    fn test_radius_boundary_is_inclusive() {
        let center = GeoPoint::from_lon_lat(-89.6501, 39.8317);
        let d = haversine_km(springfield(), center);
        assert!((d - 5.56).abs() < 0.01);

        let fence = Geofence::new(1.0);
        assert!(fence.contains(springfield(), &[DisasterZone::new("edge", center, Some(d))]));
        assert!(fence.contains(springfield(), &[DisasterZone::new("edge", center, Some(5.56))]));
        assert!(!fence.contains(springfield(), &[DisasterZone::new("edge", center, Some(d - 1e-6))]));
        assert!(Geofence::new(d).contains(springfield(), &[DisasterZone::new("edge", center, None)]));
    }

    #[test]
    fn test_any_zone_matches() {
        let fence = Geofence::new(10.0);
        let far = DisasterZone::new("lakefront", chicago(), None);
        let near = DisasterZone::new("downtown", springfield(), None);
        assert!(!fence.contains(springfield(), std::slice::from_ref(&far)));
        assert!(fence.contains(springfield(), &[far, near]));
    }

    #[test]
    fn test_swapped_coordinates_do_not_match() {
        // lat/lat point that a swapped construction would produce
        let fence = Geofence::new(10.0);
        let zone = DisasterZone::new("downtown", springfield(), None);
        let wrong = GeoPoint::from_lon_lat(springfield().latitude, springfield().latitude);
        assert!(!fence.contains(wrong, &[zone]));
    }

    #[test]
    fn test_nearest_zone() {
        let fence = Geofence::new(10.0);
        let zones = vec![
            DisasterZone::new("lakefront", chicago(), None),
            DisasterZone::new("downtown", GeoPoint::from_lon_lat(-89.6501, 39.8317), None),
        ];
        let (zone, distance) = fence.nearest(springfield(), &zones).unwrap();
        assert_eq!(zone.name, "downtown");
        assert!((distance - 5.56).abs() < 0.05);
        assert!(fence.nearest(springfield(), &[]).is_none());
    }

    fn zone_strategy() -> impl Strategy<Value = DisasterZone> {
        (-180.0..180.0f64, -90.0..90.0f64, proptest::option::of(0.1..2000.0f64))
            .prop_map(|(lon, lat, radius)| DisasterZone::new("z", GeoPoint::from_lon_lat(lon, lat), radius))
    }

    proptest! {
        #[test]
        fn prop_containment_is_order_independent(
            lon in -180.0..180.0f64,
            lat in -90.0..90.0f64,
            zones in prop::collection::vec(zone_strategy(), 0..8),
            rotation in 0usize..8,
        ) {
            let fence = Geofence::new(250.0);
            let point = GeoPoint::from_lon_lat(lon, lat);

            let mut reversed = zones.clone();
            reversed.reverse();
            let mut rotated = zones.clone();
            if !rotated.is_empty() {
                let by = rotation % rotated.len();
                rotated.rotate_left(by);
            }

            let expected = fence.contains(point, &zones);
            prop_assert_eq!(fence.contains(point, &reversed), expected);
            prop_assert_eq!(fence.contains(point, &rotated), expected);
        }

        #[test]
        fn prop_containment_matches_per_zone_disjunction(
            lon in -180.0..180.0f64,
            lat in -90.0..90.0f64,
            zones in prop::collection::vec(zone_strategy(), 0..8),
        ) {
            let fence = Geofence::new(250.0);
            let point = GeoPoint::from_lon_lat(lon, lat);
            let any = zones.iter().any(|z| haversine_km(point, z.center) <= fence.radius_of(z));
            prop_assert_eq!(fence.contains(point, &zones), any);
        }
    }
}
