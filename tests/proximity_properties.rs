use proptest::prelude::*;
use proptest::test_runner::Config;
use proxilink::core::proximity::{filter_within_radius, haversine_km};
use proxilink::core::radius::RadiusScale;
use proxilink::domain::model::Coordinate;

fn scale() -> impl Strategy<Value = RadiusScale> {
    prop_oneof![Just(RadiusScale::Linear), Just(RadiusScale::Logarithmic)]
}

proptest! {
    #![proptest_config(Config::with_cases(128))]
    #[test]
    fn haversine_is_symmetric_and_bounded(
        lat1 in -90.0_f64..=90.0,
        lng1 in -180.0_f64..=180.0,
        lat2 in -90.0_f64..=90.0,
        lng2 in -180.0_f64..=180.0,
    ) {
        let there = haversine_km(lat1, lng1, lat2, lng2);
        let back = haversine_km(lat2, lng2, lat1, lng1);
        prop_assert!((there - back).abs() < 1e-6);
        prop_assert!(there >= 0.0);
        // 地球半周長
        prop_assert!(there <= 6371.0 * std::f64::consts::PI + 1e-6);
    }

    #[test]
    fn haversine_identity_is_zero(lat in -90.0_f64..=90.0, lng in -180.0_f64..=180.0) {
        prop_assert!(haversine_km(lat, lng, lat, lng).abs() < 1e-9);
    }

    #[test]
    fn slider_round_trip(scale in scale(), position in 0.0_f64..=100.0) {
        let radius = scale.radius_from_slider(position);
        prop_assert!(radius >= scale.min_km() - 1e-9);
        prop_assert!(radius <= scale.max_km() + 1e-9);
        prop_assert!((scale.slider_from_radius(radius) - position).abs() < 1e-2);
    }

    #[test]
    fn radius_grows_with_slider(scale in scale(), a in 0.0_f64..=100.0, b in 0.0_f64..=100.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(scale.radius_from_slider(low) <= scale.radius_from_slider(high));
    }

    #[test]
    fn filter_keeps_only_points_inside(
        points in prop::collection::vec((-1.0_f64..1.0, -1.0_f64..1.0), 0..40),
        radius in 0.1_f64..200.0,
    ) {
        let origin = Coordinate::new(0.0, 0.0);
        let candidates: Vec<Coordinate> =
            points.iter().map(|(lat, lng)| Coordinate::new(*lat, *lng)).collect();

        let kept = filter_within_radius(&origin, radius, candidates.clone());

        prop_assert!(kept.iter().all(|c| haversine_km(0.0, 0.0, c.lat, c.lng) <= radius));
        let expected = candidates
            .iter()
            .filter(|c| haversine_km(0.0, 0.0, c.lat, c.lng) <= radius)
            .count();
        prop_assert_eq!(kept.len(), expected);
    }
}
