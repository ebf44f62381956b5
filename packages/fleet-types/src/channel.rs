//! Channel profile data: latency/loss parameters per transport kind, and the
//! sea-state latency bias table (C7's configuration input).

use serde::{Deserialize, Serialize};

/// Physical transport the channel simulator is modelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelKind {
    TerrestrialAis,
    Geostationary,
    Leo,
}

/// Sea-state bucket; each adds a latency bias proportional to the profile's
/// mean latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeaState {
    Calm,
    Smooth,
    Slight,
    Moderate,
    Rough,
    VeryRough,
    High,
}

impl SeaState {
    /// Latency-bias factor, multiplied by the profile's mean latency.
    pub fn latency_factor(self) -> f64 {
        match self {
            SeaState::Calm => 0.00,
            SeaState::Smooth => 0.05,
            SeaState::Slight => 0.10,
            SeaState::Moderate => 0.20,
            SeaState::Rough => 0.40,
            SeaState::VeryRough => 0.70,
            SeaState::High => 1.20,
        }
    }
}

/// Per-transport channel parameters driving the Gilbert-Elliott model and
/// latency distribution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelProfile {
    pub kind: ChannelKind,
    pub latency_mean_ms: f64,
    pub latency_std_ms: f64,
    pub loss_good: f64,
    pub loss_bad: f64,
    /// Good -> Bad transition probability.
    pub p_gb: f64,
    /// Bad -> Good transition probability.
    pub p_bg: f64,
    pub interval_normal_s: f64,
    pub interval_degraded_s: f64,
    pub interval_critical_s: f64,
}

impl ChannelProfile {
    /// Terrestrial AIS VHF: high latency, high loss variance.
    pub fn terrestrial_ais() -> Self {
        Self {
            kind: ChannelKind::TerrestrialAis,
            latency_mean_ms: 2000.0,
            latency_std_ms: 500.0,
            loss_good: 0.01,
            loss_bad: 0.30,
            p_gb: 0.05,
            p_bg: 0.15,
            interval_normal_s: 10.0,
            interval_degraded_s: 30.0,
            interval_critical_s: 120.0,
        }
    }

    /// VSAT geostationary satellite link.
    pub fn geostationary() -> Self {
        Self {
            kind: ChannelKind::Geostationary,
            latency_mean_ms: 500.0,
            latency_std_ms: 100.0,
            loss_good: 0.0015,
            loss_bad: 0.35,
            p_gb: 0.004,
            p_bg: 0.25,
            interval_normal_s: 5.0,
            interval_degraded_s: 20.0,
            interval_critical_s: 60.0,
        }
    }

    /// LEO satellite constellation link.
    pub fn leo() -> Self {
        Self {
            kind: ChannelKind::Leo,
            latency_mean_ms: 30.0,
            latency_std_ms: 10.0,
            loss_good: 0.002,
            loss_bad: 0.15,
            p_gb: 0.02,
            p_bg: 0.30,
            interval_normal_s: 2.0,
            interval_degraded_s: 10.0,
            interval_critical_s: 30.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factories_match_fixture_values() {
        let geo = ChannelProfile::geostationary();
        assert_eq!(geo.latency_mean_ms, 500.0);
        assert_eq!(geo.latency_std_ms, 100.0);
    }

    #[test]
    fn sea_state_factors_increase_monotonically() {
        let states = [
            SeaState::Calm,
            SeaState::Smooth,
            SeaState::Slight,
            SeaState::Moderate,
            SeaState::Rough,
            SeaState::VeryRough,
            SeaState::High,
        ];
        for w in states.windows(2) {
            assert!(w[0].latency_factor() < w[1].latency_factor());
        }
    }
}
