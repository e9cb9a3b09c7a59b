use crate::domain::model::{Coordinate, Located};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers (Haversine).
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    // 浮點誤差可能讓 a 稍微超過 1
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// 與參考點的距離；缺少任一座標分量時回傳 `None`
pub fn distance_from<T: Located + ?Sized>(origin: &Coordinate, candidate: &T) -> Option<f64> {
    let lat = candidate.latitude()?;
    let lng = candidate.longitude()?;
    Some(haversine_km(origin.lat, origin.lng, lat, lng))
}

pub fn is_within_radius<T: Located + ?Sized>(origin: &Coordinate, candidate: &T, radius_km: f64) -> bool {
    // radius <= 0 或 NaN 一律不符合
    if !(radius_km > 0.0) {
        return false;
    }
    match distance_from(origin, candidate) {
        Some(distance) => distance <= radius_km,
        None => false,
    }
}

/// Stable filter: keeps the candidates within `radius_km` of `origin`, in input order.
pub fn filter_within_radius<T: Located>(
    origin: &Coordinate,
    radius_km: f64,
    candidates: impl IntoIterator<Item = T>,
) -> Vec<T> {
    if !(radius_km > 0.0) {
        return Vec::new();
    }
    candidates
        .into_iter()
        .filter(|candidate| is_within_radius(origin, candidate, radius_km))
        .collect()
}
