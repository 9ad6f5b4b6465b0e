use crate::firestore::error::FirestoreResult;
use crate::firestore::validation::{validate_number, NumberOptions};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> FirestoreResult<Self> {
        validate_number("latitude", Some(latitude), NumberOptions::range(-90.0, 90.0))?;
        validate_number("longitude", Some(longitude), NumberOptions::range(-180.0, 180.0))?;
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}
