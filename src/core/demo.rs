use crate::domain::model::Vendor;
use rand::Rng;
use std::f64::consts::PI;

pub const DEFAULT_DEMO_VENDOR_COUNT: usize = 12;

const CATEGORIES: [&str; 10] = [
    "grocery",
    "food",
    "health",
    "electronics",
    "tailoring",
    "mechanic",
    "transport",
    "education",
    "plumbing",
    "construction",
];

const NAMES: [&str; 12] = [
    "Fresh Foods Market",
    "Quick Bites Cafe",
    "Health Plus Clinic",
    "Tech Solutions",
    "Style Tailors",
    "Auto Repair Shop",
    "Swift Transport",
    "Learning Center",
    "Fix-It Plumbing",
    "Build Right Construction",
    "Green Grocery",
    "Spice Kitchen",
];

/// 沒有使用者位置時顯示的固定示範商家
pub fn default_demo_vendors() -> Vec<Vendor> {
    [
        ("dv-1", "Nairobi Fresh Foods", "grocery", -1.2921, 36.8219),
        ("dv-2", "Mombasa Seafood Grill", "food", -4.0435, 39.6682),
        ("dv-3", "Kigali Health Clinic", "health", -1.9706, 30.1044),
        ("dv-4", "Lagos Electronics Hub", "electronics", 6.5244, 3.3792),
        ("dv-5", "Accra Tailors & Co", "tailoring", 5.6037, -0.1870),
        ("dv-6", "Cape Town Mechanics", "mechanic", -33.9249, 18.4241),
        ("dv-7", "Dar Delivery Services", "transport", -6.7924, 39.2083),
        ("dv-8", "Kampala Community Grocer", "grocery", 0.3476, 32.5825),
    ]
    .into_iter()
    .map(|(id, name, category, lat, lng)| Vendor {
        id: id.to_string(),
        business_name: name.to_string(),
        category: Some(category.to_string()),
        location_lat: Some(lat),
        location_lng: Some(lng),
    })
    .collect()
}

/// Scatters `count` demo vendors around the user, 0.01-0.045 degrees away
/// (roughly 1-5 km), spread evenly by angle with a little jitter.
pub fn generate_nearby_demo_vendors(user_lat: f64, user_lng: f64, count: usize) -> Vec<Vendor> {
    generate_nearby_demo_vendors_with(&mut rand::thread_rng(), user_lat, user_lng, count)
}

pub fn generate_nearby_demo_vendors_with<R: Rng + ?Sized>(
    rng: &mut R,
    user_lat: f64,
    user_lng: f64,
    count: usize,
) -> Vec<Vendor> {
    (0..count)
        .map(|i| {
            let angle = (PI * 2.0 * i as f64) / count as f64 + (rng.gen::<f64>() - 0.5) * 0.5;
            let distance = 0.01 + rng.gen::<f64>() * 0.035;
            let name = NAMES[i % NAMES.len()];

            Vendor {
                id: format!("demo-vendor-{}", i + 1),
                business_name: name.to_string(),
                category: Some(CATEGORIES[i % CATEGORIES.len()].to_string()),
                location_lat: Some(user_lat + angle.sin() * distance),
                location_lng: Some(user_lng + angle.cos() * distance),
            }
        })
        .collect()
}
