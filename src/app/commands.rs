use crate::adapters::backend::BackendClient;
use crate::adapters::clock::SystemClock;
use crate::adapters::location::FixedLocationProvider;
use crate::adapters::push_http::WebPushTransport;
use crate::adapters::storage::FileStore;
use crate::config::cli::{
    LocateArgs, NearbyArgs, NotificationsArgs, OutputFormat, PositionArgs, PushArgs, RadiusArgs,
};
use crate::config::toml_config::AppConfig;
use crate::core::catalog::{categories, CatalogLoader, CatalogOrigin, ServiceQuery};
use crate::core::geolocation::Geolocator;
use crate::core::notifications::{next_demo_delay, FeedOrigin, NotificationFeed};
use crate::core::proximity::distance_from;
use crate::core::push::{DispatchOutcome, PushDispatcher, PushResponse};
use crate::core::radius::{format_radius, RadiusScale};
use crate::core::webpush::{generate_vapid_keys, VapidSigner};
use crate::domain::model::{Coordinate, NotificationRow, PushRequest, ServiceRecord};
use crate::domain::ports::{NotificationSource, ServiceSource};
use crate::utils::error::Result;
use crate::utils::validation::validate_required_field;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

pub type CliGeolocator = Geolocator<FileStore, SystemClock, FixedLocationProvider>;

/// 以設定檔的快取目錄建立定位器；命令列座標充當平台定位來源
pub fn geolocator(config: &AppConfig, position: &PositionArgs) -> CliGeolocator {
    Geolocator::with_settings(
        FileStore::new(&config.location.cache_dir),
        SystemClock,
        FixedLocationProvider::new(position.coordinate()),
        config.location.cache_duration_ms(),
        config.location.watch_interval(),
    )
}

/// 有座標（或要求刷新）就重新定位並寫入快取，否則走啟動流程讀快取
pub async fn resolve_location(geolocator: &CliGeolocator, fresh: bool) -> Option<Coordinate> {
    if fresh {
        geolocator.request_location(false).await.ok()
    } else {
        geolocator.initialize().await
    }
}

/// One output line of `nearby`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyRow {
    pub id: String,
    pub title: String,
    pub category: String,
    pub price: Option<f64>,
    pub distance_km: Option<f64>,
}

impl NearbyRow {
    pub fn new(service: &ServiceRecord, origin: Option<&Coordinate>) -> Self {
        Self {
            id: service.id.clone().unwrap_or_default(),
            title: service.title.clone().unwrap_or_default(),
            category: service.category.clone().unwrap_or_default(),
            price: service.price,
            distance_km: origin
                .and_then(|o| distance_from(o, service))
                .map(|d| (d * 1000.0).round() / 1000.0),
        }
    }
}

/// 沒有設定後端時使用，讓目錄與通知直接落到示範資料
struct OfflineSource;

#[async_trait]
impl ServiceSource for OfflineSource {
    async fn fetch_services(&self) -> Result<Vec<ServiceRecord>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl NotificationSource for OfflineSource {
    async fn latest_notifications(
        &self,
        _user_id: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<NotificationRow>> {
        Ok(Vec::new())
    }

    async fn mark_read(&self, _ids: &[String]) -> Result<()> {
        Ok(())
    }
}

pub async fn nearby<W: Write>(config: &AppConfig, args: &NearbyArgs, out: &mut W) -> Result<()> {
    let geolocator = geolocator(config, &args.position);
    let origin = resolve_location(&geolocator, args.position.coordinate().is_some()).await;
    if origin.is_none() {
        tracing::warn!("⚠️ No location available, distance filter disabled");
    }

    let scale = args.scale.unwrap_or(config.search.scale);
    let radius_km = match (args.radius, args.slider) {
        (Some(radius), _) => radius,
        (None, Some(slider)) => scale.radius_from_slider(slider),
        (None, None) => config.search.default_radius_km,
    };

    let catalog = match (&config.backend, args.demo) {
        (Some(backend), false) => {
            let client = BackendClient::new(&backend.url, &backend.api_key, backend.timeout())?;
            CatalogLoader::new(client, config.demo.enabled, config.demo.vendor_count)
                .load(origin.as_ref())
                .await
        }
        // --demo 強制使用示範資料；沒有後端時依設定檔決定
        (_, demo) => {
            CatalogLoader::new(OfflineSource, demo || config.demo.enabled, config.demo.vendor_count)
                .load(origin.as_ref())
                .await
        }
    };

    tracing::debug!("Categories: {}", categories(&catalog.services).join(", "));

    let query = ServiceQuery {
        search: args.search.clone(),
        category: args.category.clone(),
        radius_km,
        origin,
    };
    let rows: Vec<NearbyRow> = query
        .apply(&catalog.services)
        .iter()
        .map(|service| NearbyRow::new(service, origin.as_ref()))
        .collect();

    tracing::info!(
        "🔎 {} of {} services within {} ({})",
        rows.len(),
        catalog.services.len(),
        format_radius(radius_km),
        match catalog.origin {
            CatalogOrigin::Backend => "backend",
            CatalogOrigin::Demo => "demo data",
        }
    );

    write_rows(&rows, args.format, out)
}

pub fn write_rows<W: Write>(rows: &[NearbyRow], format: OutputFormat, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, rows)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(&mut *out);
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        OutputFormat::Table => {
            if rows.is_empty() {
                writeln!(out, "No services found nearby")?;
            }
            for row in rows {
                let distance = row
                    .distance_km
                    .map(format_radius)
                    .unwrap_or_else(|| "-".to_string());
                let price = row
                    .price
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    out,
                    "{:<12} {:<32} {:<16} {:>10} {:>8}",
                    row.id, row.title, row.category, price, distance
                )?;
            }
        }
    }
    Ok(())
}

pub async fn locate<W: Write>(config: &AppConfig, args: &LocateArgs, out: &mut W) -> Result<()> {
    let geolocator = geolocator(config, &args.position);
    let fresh = args.refresh || args.position.coordinate().is_some();

    match resolve_location(&geolocator, fresh).await {
        Some(location) => writeln!(out, "📍 {:.6}, {:.6}", location.lat, location.lng)?,
        None => {
            let message = geolocator
                .state()
                .error
                .unwrap_or_else(|| "No cached location. Pass --lat and --lng.".to_string());
            writeln!(out, "❌ {}", message)?;
        }
    }

    let Some(seconds) = args.watch else {
        return Ok(());
    };

    let handle = geolocator.start_watching()?;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);
    while tokio::time::Instant::now() < deadline && handle.is_active() {
        tokio::time::sleep(config.location.watch_interval()).await;
        let state = geolocator.state();
        match (state.location, state.error) {
            (_, Some(error)) => writeln!(out, "❌ {}", error)?,
            (Some(location), None) => {
                writeln!(out, "👀 {:.6}, {:.6}", location.lat, location.lng)?
            }
            (None, None) => {}
        }
    }
    handle.stop();
    Ok(())
}

pub fn radius<W: Write>(config: &AppConfig, args: &RadiusArgs, out: &mut W) -> Result<()> {
    let scale: RadiusScale = args.scale.unwrap_or(config.search.scale);

    if let Some(slider) = args.slider {
        let km = scale.radius_from_slider(slider);
        writeln!(out, "slider {} -> {} ({} km, {})", slider, format_radius(km), km, scale)?;
    }
    if let Some(km) = args.km {
        let slider = scale.slider_from_radius(km);
        writeln!(out, "{} -> slider {:.2} ({})", format_radius(km), slider, scale)?;
    }
    writeln!(out, "ticks: {}", scale.tick_labels().join(" | "))?;
    Ok(())
}

pub async fn push<W: Write>(config: &AppConfig, args: &PushArgs, out: &mut W) -> Result<()> {
    let backend = validate_required_field("backend", &config.backend)?;
    let push = validate_required_field("push", &config.push)?;

    let data = args
        .data
        .as_deref()
        .map(|raw| serde_json::from_str::<serde_json::Value>(raw))
        .transpose()?;
    let request = PushRequest {
        user_id: args.user_id.clone(),
        title: args.title.clone(),
        body: args.body.clone(),
        data,
    };

    let signer = VapidSigner::from_base64(&push.vapid_public_key, &push.vapid_private_key, &push.subject)?;
    let transport = WebPushTransport::new(signer, push.ttl_seconds, backend.timeout())?;
    let store = BackendClient::new(&backend.url, &backend.api_key, backend.timeout())?;

    let outcome = PushDispatcher::new(store, transport).dispatch(&request).await?;
    if let DispatchOutcome::Sent(summary) = &outcome {
        tracing::info!("📬 Sent {}/{} notifications", summary.sent, summary.total);
    }

    let response = PushResponse::from_result(Ok(outcome));
    serde_json::to_writer_pretty(&mut *out, &response.body)?;
    writeln!(out)?;
    Ok(())
}

pub async fn notifications<W: Write>(
    config: &AppConfig,
    args: &NotificationsArgs,
    out: &mut W,
) -> Result<()> {
    match (&config.backend, args.demo) {
        (Some(backend), false) => {
            let client = BackendClient::new(&backend.url, &backend.api_key, backend.timeout())?;
            show_notifications(NotificationFeed::new(client), args, out).await
        }
        _ => show_notifications(NotificationFeed::new(OfflineSource), args, out).await,
    }
}

async fn show_notifications<S: NotificationSource, W: Write>(
    feed: NotificationFeed<S>,
    args: &NotificationsArgs,
    out: &mut W,
) -> Result<()> {
    let origin = feed
        .load(args.user_id.as_deref(), Utc::now().timestamp_millis())
        .await;
    if origin == FeedOrigin::Demo {
        tracing::warn!("No notifications from backend, using demo data");
    }

    for id in &args.mark_read {
        feed.mark_as_read(id).await?;
    }
    if args.mark_all_read {
        let updated = feed.mark_all_read().await?;
        tracing::info!("✅ Marked {} notifications read", updated);
    }

    write_notifications(&feed.notifications(), feed.unread_count(), args.format, out)?;

    let Some(seconds) = args.follow else {
        return Ok(());
    };
    let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);
    loop {
        let delay = next_demo_delay();
        if tokio::time::Instant::now() + delay > deadline {
            break;
        }
        tokio::time::sleep(delay).await;
        let incoming = feed.receive_demo(Utc::now().timestamp_millis());
        writeln!(out, "🔔 {}: {}", incoming.title, incoming.content)?;
    }
    Ok(())
}

pub fn write_notifications<W: Write>(
    notifications: &[NotificationRow],
    unread: usize,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, notifications)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(&mut *out);
            for notification in notifications {
                writer.serialize(notification)?;
            }
            writer.flush()?;
        }
        OutputFormat::Table => {
            for n in notifications {
                let marker = if n.is_read() { " " } else { "●" };
                writeln!(out, "{} {:<24} {:<28} {}", marker, n.id, n.title, n.content)?;
            }
            writeln!(out, "{} unread", unread)?;
        }
    }
    Ok(())
}

pub fn vapid_keys<W: Write>(out: &mut W) -> Result<()> {
    let (public_key, private_key) = generate_vapid_keys();
    writeln!(out, "vapid_public_key = \"{}\"", public_key)?;
    writeln!(out, "vapid_private_key = \"{}\"", private_key)?;
    Ok(())
}
