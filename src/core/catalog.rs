use crate::core::demo::{default_demo_vendors, generate_nearby_demo_vendors};
use crate::core::proximity::filter_within_radius;
use crate::core::radius::DEFAULT_RADIUS_KM;
use crate::domain::model::{Coordinate, ServiceRecord};
use crate::domain::ports::ServiceSource;

/// 服務列表的篩選條件，依序套用：關鍵字、分類、距離
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceQuery {
    pub search: String,
    pub category: Option<String>,
    pub radius_km: f64,
    pub origin: Option<Coordinate>,
}

impl Default for ServiceQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: None,
            radius_km: DEFAULT_RADIUS_KM,
            origin: None,
        }
    }
}

impl ServiceQuery {
    pub fn apply(&self, services: &[ServiceRecord]) -> Vec<ServiceRecord> {
        let query = self.search.trim().to_lowercase();

        let matched = services
            .iter()
            .filter(|s| query.is_empty() || matches_text(s, &query))
            .filter(|s| match self.category.as_deref() {
                Some(category) if !category.is_empty() => s.category.as_deref() == Some(category),
                _ => true,
            })
            .cloned();

        match self.origin {
            // 沒有位置時不做距離篩選
            Some(origin) if self.radius_km > 0.0 => {
                filter_within_radius(&origin, self.radius_km, matched)
            }
            _ => matched.collect(),
        }
    }
}

fn matches_text(service: &ServiceRecord, query: &str) -> bool {
    [&service.title, &service.description, &service.category]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(query))
}

/// Distinct non-empty categories, in first-seen order.
pub fn categories(services: &[ServiceRecord]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for category in services.iter().filter_map(|s| s.category.as_deref()) {
        if !category.is_empty() && !seen.iter().any(|c| c == category) {
            seen.push(category.to_string());
        }
    }
    seen
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrigin {
    Backend,
    Demo,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub services: Vec<ServiceRecord>,
    pub origin: CatalogOrigin,
}

/// Loads services from the backend, falling back to demo data when the
/// backend fails or has no rows.
pub struct CatalogLoader<S: ServiceSource> {
    source: S,
    demo_enabled: bool,
    demo_vendor_count: usize,
}

impl<S: ServiceSource> CatalogLoader<S> {
    pub fn new(source: S, demo_enabled: bool, demo_vendor_count: usize) -> Self {
        Self {
            source,
            demo_enabled,
            demo_vendor_count,
        }
    }

    pub async fn load(&self, user_location: Option<&Coordinate>) -> Catalog {
        let services = match self.source.fetch_services().await {
            Ok(services) => {
                tracing::info!("📥 Fetched {} services from backend", services.len());
                services
            }
            Err(e) => {
                tracing::warn!("⚠️ Error fetching services: {}", e);
                Vec::new()
            }
        };

        if !services.is_empty() || !self.demo_enabled {
            return Catalog {
                services,
                origin: CatalogOrigin::Backend,
            };
        }

        tracing::warn!("No services from backend, using demo data");
        let vendors = match user_location {
            Some(location) => {
                generate_nearby_demo_vendors(location.lat, location.lng, self.demo_vendor_count)
            }
            None => default_demo_vendors(),
        };

        Catalog {
            services: vendors.into_iter().map(ServiceRecord::from).collect(),
            origin: CatalogOrigin::Demo,
        }
    }
}
