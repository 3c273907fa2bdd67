use serde::{Deserialize, Serialize};

use super::errors::DeliveryError;

/// Mean Earth radius used for great-circle distances
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Build a point, rejecting coordinates outside the WGS84 ranges
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DeliveryError> {
        let point = Self { latitude, longitude };
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<(), DeliveryError> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);

        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(DeliveryError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }

    /// Haversine distance in kilometres
    pub fn great_circle_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let p = GeoPoint::new(40.7128, -74.0060).unwrap();
        assert!(p.great_circle_km(&p).abs() < 1e-9);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(1.0, 0.0).unwrap();
        let d = a.great_circle_km(&b);
        assert!((d - 111.19).abs() < 0.05, "got {d}");
    }

    #[test]
    fn test_out_of_range_coordinates_are_rejected() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }
}
