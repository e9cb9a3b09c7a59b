use anyhow::Result;
use httpmock::prelude::*;
use proxilink::core::catalog::{CatalogLoader, CatalogOrigin, ServiceQuery};
use proxilink::core::notifications::{FeedOrigin, NotificationFeed};
use proxilink::domain::model::Coordinate;
use proxilink::domain::ports::{NotificationSource, ServiceSource, SubscriptionStore};
use proxilink::{BackendClient, ProxiError};
use serde_json::json;
use std::time::Duration;

fn client(server: &MockServer) -> Result<BackendClient> {
    Ok(BackendClient::new(
        &server.base_url(),
        "service-key",
        Duration::from_secs(5),
    )?)
}

#[tokio::test]
async fn test_fetch_services_sends_auth_headers() -> Result<()> {
    let server = MockServer::start();
    let services_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/services")
            .query_param("select", "*")
            .header("apikey", "service-key")
            .header("authorization", "Bearer service-key");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!([
                {
                    "id": "s1",
                    "title": "Bike repair",
                    "category": "Repairs",
                    "price": 15.0,
                    "location_lat": 0.0,
                    "location_lng": 0.009,
                    "vendor_id": "v1"
                },
                { "id": "s2", "title": "Remote tutoring", "location_lat": null }
            ]));
    });

    let services = client(&server)?.fetch_services().await?;

    services_mock.assert();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0].title.as_deref(), Some("Bike repair"));
    assert_eq!(services[1].location_lat, None);
    Ok(())
}

#[tokio::test]
async fn test_backend_error_status_is_reported() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/rest/v1/services");
        then.status(401).body("invalid api key");
    });

    let result = client(&server)?.fetch_services().await;

    match result {
        Err(ProxiError::BackendError { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid api key");
        }
        other => panic!("expected backend error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_active_subscriptions_query() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/push_subscriptions")
            .query_param("user_id", "eq.user-1")
            .query_param("is_active", "eq.true")
            .query_param("select", "*");
        then.status(200).json_body(json!([
            {
                "id": "sub-1",
                "user_id": "user-1",
                "is_active": true,
                "subscription": {
                    "endpoint": "https://fcm.googleapis.com/fcm/send/abc",
                    "keys": { "p256dh": "BPk", "auth": "c2VjcmV0" }
                },
                "created_at": "2025-01-01T00:00:00Z"
            }
        ]));
    });

    let subscriptions = client(&server)?.active_subscriptions("user-1").await?;

    mock.assert();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].id, "sub-1");
    assert_eq!(
        subscriptions[0].subscription.endpoint,
        "https://fcm.googleapis.com/fcm/send/abc"
    );
    Ok(())
}

#[tokio::test]
async fn test_deactivate_patches_subscription() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::PATCH)
            .path("/rest/v1/push_subscriptions")
            .query_param("id", "eq.sub-9")
            .header("prefer", "return=minimal")
            .json_body(json!({ "is_active": false }));
        then.status(204);
    });

    client(&server)?.deactivate("sub-9").await?;

    mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_catalog_from_backend_then_filtered() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/rest/v1/services");
        then.status(200).json_body(json!([
            { "id": "near", "title": "Plumbing", "category": "Home", "location_lat": 0.0, "location_lng": 0.009 },
            { "id": "far", "title": "Plumbing", "category": "Home", "location_lat": 1.0, "location_lng": 1.0 },
            { "id": "nowhere", "title": "Plumbing", "category": "Home" }
        ]));
    });

    let catalog = CatalogLoader::new(client(&server)?, true, 12)
        .load(None)
        .await;
    assert_eq!(catalog.origin, CatalogOrigin::Backend);

    let query = ServiceQuery {
        search: "plumb".to_string(),
        category: Some("Home".to_string()),
        radius_km: 5.0,
        origin: Some(Coordinate::new(0.0, 0.0)),
    };
    let ids: Vec<_> = query
        .apply(&catalog.services)
        .into_iter()
        .filter_map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["near".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_catalog_falls_back_to_demo_when_backend_fails() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/rest/v1/services");
        then.status(500);
    });

    let user = Coordinate::new(51.5074, -0.1278);
    let catalog = CatalogLoader::new(client(&server)?, true, 6)
        .load(Some(&user))
        .await;

    assert_eq!(catalog.origin, CatalogOrigin::Demo);
    assert_eq!(catalog.services.len(), 6);
    Ok(())
}

#[tokio::test]
async fn test_latest_notifications_query() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/notifications")
            .query_param("select", "*")
            .query_param("order", "created_at.desc")
            .query_param("limit", "50")
            .query_param("user_id", "eq.user-1");
        then.status(200).json_body(json!([
            {
                "id": "n1",
                "user_id": "user-1",
                "title": "Booking confirmed",
                "content": "See you tomorrow",
                "notification_type": "booking",
                "is_read": false,
                "created_at": "2025-01-02T00:00:00Z"
            }
        ]));
    });

    let rows = client(&server)?
        .latest_notifications(Some("user-1"), 50)
        .await?;

    mock.assert();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].related_id, None);
    assert!(!rows[0].is_read());
    Ok(())
}

#[tokio::test]
async fn test_mark_all_read_patches_backend_ids_only() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/rest/v1/notifications");
        then.status(200).json_body(json!([
            { "id": "n1", "user_id": "u", "title": "a", "content": "a", "notification_type": "x", "is_read": false },
            { "id": "n2", "user_id": "u", "title": "b", "content": "b", "notification_type": "x", "is_read": true },
            { "id": "n3", "user_id": "u", "title": "c", "content": "c", "notification_type": "x" }
        ]));
    });
    let patch = server.mock(|when, then| {
        when.method(httpmock::Method::PATCH)
            .path("/rest/v1/notifications")
            .query_param("id", "in.(n1,n3)")
            .json_body(json!({ "is_read": true }));
        then.status(204);
    });

    let feed = NotificationFeed::new(client(&server)?);
    assert_eq!(feed.load(Some("u"), 0).await, FeedOrigin::Backend);
    feed.receive_demo(1_700_000_000_000);
    assert_eq!(feed.unread_count(), 3);

    assert_eq!(feed.mark_all_read().await?, 2);

    patch.assert();
    assert_eq!(feed.unread_count(), 0);
    Ok(())
}
