//! Dead-reckoning / trajectory prediction engine (C2).
//!
//! Ported from the ammonia-carrier/SMR prediction notebook's
//! `predict_position` routine: great-circle propagation plus a wind/current
//! drift correction and a closed-form error-growth model.

use serde::{Deserialize, Serialize};

use crate::geo::{self, LatLon};

/// AIS class-A position sensor accuracy, metres.
pub const AIS_SENSOR_ACCURACY_M: f64 = 10.0;

const KNOTS_TO_MPS: f64 = 0.514444;
const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Ambient forcing applied on top of a vessel's own course/speed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AmbientForcing {
    /// Wind speed, knots.
    pub wind_speed_kn: f64,
    /// Wind direction the wind is blowing *from*, degrees true.
    pub wind_direction_deg: f64,
    /// Current speed, knots.
    pub current_speed_kn: f64,
    /// Current direction the current is flowing *toward*, degrees true.
    pub current_direction_deg: f64,
}

/// A single dead-reckoning prediction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Prediction {
    pub position: LatLon,
    /// 50% confidence radius (CEP), metres.
    pub error_radius_50: f64,
    /// 95% confidence radius, metres.
    pub error_radius_95: f64,
    pub time_since_last_fix_s: f64,
    /// `exp(-0.1 * minutes)`, decays toward zero as the fix ages.
    pub confidence: f64,
    /// Eastward drift contribution, metres.
    pub drift_east_m: f64,
    /// Northward drift contribution, metres.
    pub drift_north_m: f64,
}

/// Tunable coefficients for the dead-reckoning model. Defaults match the
/// source notebook's defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeadReckoningEngine {
    /// Course-uncertainty standard deviation, degrees.
    pub course_uncertainty_deg: f64,
    /// Speed-uncertainty standard deviation, knots.
    pub speed_uncertainty_kn: f64,
    /// Wind drift coefficient (fraction of wind speed contributing to drift).
    pub wind_drift_coefficient: f64,
    /// Current drift coefficient (fraction of current speed contributing).
    pub current_drift_coefficient: f64,
}

impl Default for DeadReckoningEngine {
    fn default() -> Self {
        Self {
            course_uncertainty_deg: 2.0,
            speed_uncertainty_kn: 0.1,
            wind_drift_coefficient: 0.03,
            current_drift_coefficient: 1.0,
        }
    }
}

impl DeadReckoningEngine {
    pub fn new(
        course_uncertainty_deg: f64,
        speed_uncertainty_kn: f64,
        wind_drift_coefficient: f64,
        current_drift_coefficient: f64,
    ) -> Self {
        Self {
            course_uncertainty_deg,
            speed_uncertainty_kn,
            wind_drift_coefficient,
            current_drift_coefficient,
        }
    }

    /// Predict position `elapsed_s` seconds after a fix at `last_fix` with
    /// course `course_deg` and speed `speed_kn`, under optional ambient
    /// forcing.
    pub fn predict_position(
        &self,
        last_fix: LatLon,
        course_deg: f64,
        speed_kn: f64,
        elapsed_s: f64,
        ambient: AmbientForcing,
    ) -> Prediction {
        let speed_mps = speed_kn * KNOTS_TO_MPS;
        let distance_traveled_m = speed_mps * elapsed_s;

        let baseline = geo::forward(last_fix, course_deg, distance_traveled_m);

        let (drift_east_m, drift_north_m) = self.drift_components(&ambient, elapsed_s);
        let lat_rad = baseline.lat.to_radians();
        let lat_offset_deg = (drift_north_m / geo::EARTH_RADIUS_M) / DEG_TO_RAD;
        let lon_offset_deg = if lat_rad.cos().abs() > 1e-9 {
            (drift_east_m / (geo::EARTH_RADIUS_M * lat_rad.cos())) / DEG_TO_RAD
        } else {
            0.0
        };

        let drifted = LatLon::new(
            baseline.lat + lat_offset_deg,
            geo::normalize_lon(baseline.lon + lon_offset_deg),
        );

        let (r50, r95) = self.error_radii(distance_traveled_m, speed_kn, elapsed_s);

        let elapsed_minutes = elapsed_s / 60.0;
        let confidence = (-0.1 * elapsed_minutes).exp();

        Prediction {
            position: drifted,
            error_radius_50: r50,
            error_radius_95: r95,
            time_since_last_fix_s: elapsed_s,
            confidence,
            drift_east_m,
            drift_north_m,
        }
    }

    fn drift_components(&self, ambient: &AmbientForcing, elapsed_s: f64) -> (f64, f64) {
        // Wind drift uses the meteorological convention: "from" direction,
        // so the push is toward direction + 180.
        let wind_push_mps = self.wind_drift_coefficient * ambient.wind_speed_kn * KNOTS_TO_MPS;
        let wind_push_dir_rad = (ambient.wind_direction_deg + 180.0).to_radians();
        let wind_east = wind_push_mps * wind_push_dir_rad.sin();
        let wind_north = wind_push_mps * wind_push_dir_rad.cos();

        let current_push_mps =
            self.current_drift_coefficient * ambient.current_speed_kn * KNOTS_TO_MPS;
        let current_dir_rad = ambient.current_direction_deg.to_radians();
        let current_east = current_push_mps * current_dir_rad.sin();
        let current_north = current_push_mps * current_dir_rad.cos();

        (
            (wind_east + current_east) * elapsed_s,
            (wind_north + current_north) * elapsed_s,
        )
    }

    fn error_radii(&self, distance_traveled_m: f64, speed_kn: f64, elapsed_s: f64) -> (f64, f64) {
        let sigma_sensor = AIS_SENSOR_ACCURACY_M;
        let sigma_course = distance_traveled_m * self.course_uncertainty_deg.to_radians().sin();
        let _ = speed_kn; // speed itself does not enter sigma_speed directly
        let sigma_speed = self.speed_uncertainty_kn * KNOTS_TO_MPS * elapsed_s;

        let sigma_total =
            (sigma_sensor * sigma_sensor + sigma_course * sigma_course + sigma_speed * sigma_speed)
                .sqrt();

        (0.67 * sigma_total, 2.45 * sigma_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_drift_ten_minutes() {
        let engine = DeadReckoningEngine::default();
        let start = LatLon::new(25.0, 55.0);
        let pred = engine.predict_position(start, 45.0, 20.0, 600.0, AmbientForcing::default());

        assert!((pred.position.lat - 25.019).abs() < 0.001, "lat = {}", pred.position.lat);
        assert!((pred.position.lon - 55.021).abs() < 0.001, "lon = {}", pred.position.lon);
        assert!(pred.error_radius_95 >= 100.0 && pred.error_radius_95 <= 1_000.0);
    }

    #[test]
    fn drift_injection_signs() {
        let engine = DeadReckoningEngine::default();
        let start = LatLon::new(25.0, 55.0);
        let ambient = AmbientForcing {
            wind_speed_kn: 25.0,
            wind_direction_deg: 270.0,
            current_speed_kn: 2.0,
            current_direction_deg: 180.0,
        };
        let pred = engine.predict_position(start, 45.0, 20.0, 600.0, ambient);

        assert!(pred.drift_east_m >= 100.0, "east drift = {}", pred.drift_east_m);
        assert!(pred.drift_north_m < 0.0, "north drift = {}", pred.drift_north_m);
    }

    #[test]
    fn error_radii_ordering_holds() {
        let engine = DeadReckoningEngine::default();
        let start = LatLon::new(1.0, 1.0);
        let pred = engine.predict_position(start, 90.0, 12.0, 120.0, AmbientForcing::default());
        assert!(pred.error_radius_95 >= pred.error_radius_50);
        assert!(pred.error_radius_50 >= AIS_SENSOR_ACCURACY_M * 0.67 - 1e-9);
    }

    #[test]
    fn confidence_decays_with_time() {
        let engine = DeadReckoningEngine::default();
        let start = LatLon::new(1.0, 1.0);
        let soon = engine.predict_position(start, 0.0, 10.0, 60.0, AmbientForcing::default());
        let later = engine.predict_position(start, 0.0, 10.0, 600.0, AmbientForcing::default());
        assert!(later.confidence < soon.confidence);
    }
}
