//! Great-circle geometry helpers.

/// Mean Earth radius in nautical miles.
const EARTH_RADIUS_NM: f64 = 3440.065;

/// Great-circle distance between two points in nautical miles (haversine).
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_NM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance() {
        assert!(haversine_nm(51.47, -0.45, 51.47, -0.45) < 1e-9);
    }

    #[test]
    fn one_degree_of_latitude_is_sixty_nm() {
        let d = haversine_nm(50.0, 8.0, 51.0, 8.0);
        assert!((d - 60.0).abs() < 0.2, "got {}", d);
    }

    #[test]
    fn heathrow_to_cdg() {
        // LHR (51.470, -0.454) to CDG (49.010, 2.548) is roughly 188 nm.
        let d = haversine_nm(51.470, -0.454, 49.010, 2.548);
        assert!((d - 188.0).abs() < 5.0, "got {}", d);
    }

    #[test]
    fn longitude_shrinks_with_latitude() {
        let equator = haversine_nm(0.0, 0.0, 0.0, 1.0);
        let high = haversine_nm(60.0, 0.0, 60.0, 1.0);
        assert!(high < equator * 0.6);
    }
}
