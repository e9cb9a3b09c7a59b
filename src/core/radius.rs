use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SLIDER_MIN: f64 = 0.0;
pub const SLIDER_MAX: f64 = 100.0;

/// 搜尋畫面預設半徑：10 公尺
pub const DEFAULT_RADIUS_KM: f64 = 0.01;

/// Mapping between a 0-100 slider position and a search radius in kilometers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadiusScale {
    /// 1 km - 5 km, evenly spaced
    Linear,
    /// 10 m - 5 km, finer control at short distances
    #[default]
    Logarithmic,
}

impl RadiusScale {
    pub fn min_km(&self) -> f64 {
        match self {
            RadiusScale::Linear => 1.0,
            RadiusScale::Logarithmic => 0.01,
        }
    }

    pub fn max_km(&self) -> f64 {
        5.0
    }

    pub fn radius_from_slider(&self, position: f64) -> f64 {
        let position = clamp_position(position);
        match self {
            RadiusScale::Linear => 1.0 + (position / SLIDER_MAX) * 4.0,
            RadiusScale::Logarithmic => {
                let (min_log, max_log) = self.log_bounds();
                (min_log + position * (max_log - min_log) / SLIDER_MAX).exp()
            }
        }
    }

    pub fn slider_from_radius(&self, radius_km: f64) -> f64 {
        let radius_km = if radius_km.is_nan() {
            self.min_km()
        } else {
            radius_km.clamp(self.min_km(), self.max_km())
        };
        let position = match self {
            RadiusScale::Linear => ((radius_km - 1.0) / 4.0) * SLIDER_MAX,
            RadiusScale::Logarithmic => {
                let (min_log, max_log) = self.log_bounds();
                (radius_km.ln() - min_log) * SLIDER_MAX / (max_log - min_log)
            }
        };
        // ln 的捨入誤差可能超出滑桿範圍
        clamp_position(position)
    }

    /// Tick labels shown under the slider.
    pub fn tick_labels(&self) -> Vec<String> {
        match self {
            RadiusScale::Linear => (1..=5).map(|km| format!("{}km", km)).collect(),
            RadiusScale::Logarithmic => [0.0, 25.0, 50.0, 75.0, 100.0]
                .iter()
                .map(|p| format_radius(self.radius_from_slider(*p)))
                .collect(),
        }
    }

    fn log_bounds(&self) -> (f64, f64) {
        (self.min_km().ln(), self.max_km().ln())
    }
}

impl fmt::Display for RadiusScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadiusScale::Linear => write!(f, "linear"),
            RadiusScale::Logarithmic => write!(f, "logarithmic"),
        }
    }
}

impl FromStr for RadiusScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(RadiusScale::Linear),
            "log" | "logarithmic" => Ok(RadiusScale::Logarithmic),
            other => Err(format!("unknown radius scale: {}", other)),
        }
    }
}

fn clamp_position(position: f64) -> f64 {
    if position.is_nan() {
        return SLIDER_MIN;
    }
    position.clamp(SLIDER_MIN, SLIDER_MAX)
}

/// 小於 1 公里顯示公尺（四捨五入），否則顯示一位小數的公里
pub fn format_radius(radius_km: f64) -> String {
    if radius_km < 1.0 {
        format!("{}m", (radius_km * 1000.0).round() as i64)
    } else {
        format!("{:.1}km", radius_km)
    }
}
