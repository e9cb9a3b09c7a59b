//! Last-known-location cache around a [`LocationProvider`].
//!
//! The cached coordinate and the permission flag live in a [`KeyValueStore`]
//! under the same keys the web client uses, so a coordinate captured by one
//! run is reused by the next one while it is fresher than five minutes.

use crate::domain::model::{Coordinate, PermissionState, PositionOptions};
use crate::domain::ports::{Clock, KeyValueStore, LocationProvider};
use crate::utils::error::{GeolocationError, ProxiError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

pub const LOCATION_CACHE_KEY: &str = "proxilink_last_location";
pub const PERMISSION_CACHE_KEY: &str = "proxilink_location_permission";
pub const CACHE_DURATION_MS: i64 = 5 * 60 * 1000;
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeolocationState {
    pub location: Option<Coordinate>,
    pub loading: bool,
    pub error: Option<String>,
    pub is_watching: bool,
    pub permission_granted: bool,
}

type SharedState = Arc<Mutex<GeolocationState>>;

fn lock(state: &Mutex<GeolocationState>) -> MutexGuard<'_, GeolocationState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 目前有效的 watch；generation 每次啟動或停止都會遞增
#[derive(Debug, Default)]
struct WatchSlot {
    generation: AtomicU64,
    cancel: Mutex<Option<Arc<Notify>>>,
}

impl WatchSlot {
    fn begin(&self, notify: Arc<Notify>) -> u64 {
        self.cancel_current();
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.cancel_slot() = Some(notify);
        id
    }

    fn is_current(&self, id: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == id
    }

    fn cancel_current(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(notify) = self.cancel_slot().take() {
            notify.notify_one();
        }
    }

    /// 只在 `id` 仍是目前的 watch 時取消，回傳是否真的取消
    fn cancel_if(&self, id: u64) -> bool {
        if self
            .generation
            .compare_exchange(id, id + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            if let Some(notify) = self.cancel_slot().take() {
                notify.notify_one();
            }
            true
        } else {
            false
        }
    }

    fn cancel_slot(&self) -> MutexGuard<'_, Option<Arc<Notify>>> {
        self.cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cancels continuous tracking when stopped or dropped.
#[derive(Debug)]
pub struct WatchHandle {
    id: u64,
    slot: Arc<WatchSlot>,
    state: SharedState,
    notify: Arc<Notify>,
}

impl WatchHandle {
    pub fn is_active(&self) -> bool {
        self.slot.is_current(self.id)
    }

    pub fn stop(self) {
        // Drop 負責實際的取消
    }

    fn cancel(&self) {
        if self.slot.cancel_if(self.id) {
            lock(&self.state).is_watching = false;
        }
        self.notify.notify_one();
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct Inner<S, C, L> {
    store: S,
    clock: C,
    provider: L,
    cache_duration_ms: i64,
    watch_interval: Duration,
    state: SharedState,
    watch: Arc<WatchSlot>,
    auto_requested: AtomicBool,
}

pub struct Geolocator<S, C, L> {
    inner: Arc<Inner<S, C, L>>,
}

impl<S, C, L> Clone for Geolocator<S, C, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, C, L> Geolocator<S, C, L>
where
    S: KeyValueStore + 'static,
    C: Clock + 'static,
    L: LocationProvider + 'static,
{
    pub fn new(store: S, clock: C, provider: L) -> Self {
        Self::with_settings(store, clock, provider, CACHE_DURATION_MS, DEFAULT_WATCH_INTERVAL)
    }

    pub fn with_settings(
        store: S,
        clock: C,
        provider: L,
        cache_duration_ms: i64,
        watch_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                clock,
                provider,
                cache_duration_ms,
                watch_interval,
                state: Arc::new(Mutex::new(GeolocationState::default())),
                watch: Arc::new(WatchSlot::default()),
                auto_requested: AtomicBool::new(false),
            }),
        }
    }

    pub fn state(&self) -> GeolocationState {
        lock(&self.inner.state).clone()
    }

    pub fn location(&self) -> Option<Coordinate> {
        lock(&self.inner.state).location
    }

    pub fn clear_error(&self) {
        lock(&self.inner.state).error = None;
    }

    /// Adopts the stored coordinate if it is fresher than the cache window,
    /// otherwise discards it.
    pub fn load_cached(&self) -> Option<Coordinate> {
        let raw = match self.inner.store.get(LOCATION_CACHE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("⚠️ Could not read cached location: {}", e);
                return None;
            }
        };

        let cached: Coordinate = match serde_json::from_str(&raw) {
            Ok(coordinate) => coordinate,
            Err(e) => {
                tracing::warn!("⚠️ Ignoring malformed cached location: {}", e);
                return None;
            }
        };

        let age = self.inner.clock.now_millis() - cached.timestamp.unwrap_or(0);
        if age < self.inner.cache_duration_ms {
            tracing::debug!("📍 Loaded cached location ({} ms old)", age);
            lock(&self.inner.state).location = Some(cached);
            Some(cached)
        } else {
            tracing::debug!("📍 Cached location expired ({} ms old)", age);
            if let Err(e) = self.inner.store.remove(LOCATION_CACHE_KEY) {
                tracing::warn!("⚠️ Could not remove expired location: {}", e);
            }
            None
        }
    }

    /// 先看快取的權限旗標，沒有的話才詢問平台並記錄結果
    pub async fn check_permission(&self) -> bool {
        match self.inner.store.get(PERMISSION_CACHE_KEY) {
            Ok(Some(flag)) => match PermissionState::parse(&flag) {
                PermissionState::Granted => {
                    lock(&self.inner.state).permission_granted = true;
                    return true;
                }
                PermissionState::Denied => {
                    lock(&self.inner.state).permission_granted = false;
                    return false;
                }
                PermissionState::Unknown => {}
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("⚠️ Could not read cached permission: {}", e),
        }

        let Some(permission) = self.inner.provider.permission().await else {
            tracing::debug!("Permission query not available");
            return false;
        };

        let granted = permission == PermissionState::Granted;
        let flag = if granted {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        };
        self.persist_permission(flag);
        lock(&self.inner.state).permission_granted = granted;
        granted
    }

    /// One-shot location read. In silent mode a failure does not surface an
    /// error message in the state; the error is still returned.
    pub async fn request_location(
        &self,
        silent: bool,
    ) -> std::result::Result<Coordinate, GeolocationError> {
        if !self.inner.provider.is_supported() {
            tracing::error!("❌ Geolocation not supported");
            lock(&self.inner.state).error =
                Some(GeolocationError::Unsupported.user_message().to_string());
            return Err(GeolocationError::Unsupported);
        }

        tracing::debug!("📡 Requesting location");
        {
            let mut state = lock(&self.inner.state);
            state.loading = true;
            state.error = None;
        }

        match self
            .inner
            .provider
            .current_position(PositionOptions::ONE_SHOT)
            .await
        {
            Ok(position) => {
                let coordinate = Coordinate {
                    timestamp: Some(self.inner.clock.now_millis()),
                    ..position
                };
                tracing::info!(
                    "📍 Location obtained: ({:.5}, {:.5})",
                    coordinate.lat,
                    coordinate.lng
                );
                self.persist_location(&coordinate);
                self.persist_permission(PermissionState::Granted);

                let mut state = lock(&self.inner.state);
                state.location = Some(coordinate);
                state.loading = false;
                state.error = None;
                state.permission_granted = true;
                Ok(coordinate)
            }
            Err(error) => {
                tracing::warn!("⚠️ Geolocation error: {}", error);
                if error == GeolocationError::PermissionDenied {
                    self.persist_permission(PermissionState::Denied);
                }

                let mut state = lock(&self.inner.state);
                if error == GeolocationError::PermissionDenied {
                    state.permission_granted = false;
                }
                state.loading = false;
                if !silent {
                    state.error = Some(error.user_message().to_string());
                }
                Err(error)
            }
        }
    }

    /// Starts continuous tracking on the tokio runtime. Any previous watch is
    /// replaced. Tracking stops on the first error.
    pub fn start_watching(&self) -> std::result::Result<WatchHandle, GeolocationError> {
        if !self.inner.provider.is_supported() {
            lock(&self.inner.state).error =
                Some(GeolocationError::Unsupported.user_message().to_string());
            return Err(GeolocationError::Unsupported);
        }

        let notify = Arc::new(Notify::new());
        let id = self.inner.watch.begin(Arc::clone(&notify));
        tracing::debug!("👀 Starting location watch #{}", id);

        let inner = Arc::clone(&self.inner);
        let cancelled = Arc::clone(&notify);
        tokio::spawn(async move {
            loop {
                let reading = tokio::select! {
                    _ = cancelled.notified() => break,
                    reading = inner.provider.current_position(PositionOptions::WATCH) => reading,
                };

                {
                    let mut state = lock(&inner.state);
                    // 檢查與寫入在同一把鎖內，避免已取消的 watch 覆寫狀態
                    if !inner.watch.is_current(id) {
                        break;
                    }
                    match reading {
                        Ok(position) => {
                            state.location = Some(Coordinate {
                                timestamp: Some(inner.clock.now_millis()),
                                ..position
                            });
                            state.error = None;
                            state.is_watching = true;
                        }
                        Err(error) => {
                            tracing::warn!("⚠️ Location watch #{} failed: {}", id, error);
                            state.error = Some(error.watch_message().to_string());
                            state.is_watching = false;
                            drop(state);
                            inner.watch.cancel_if(id);
                            break;
                        }
                    }
                }

                tokio::select! {
                    _ = cancelled.notified() => break,
                    _ = tokio::time::sleep(inner.watch_interval) => {}
                }
            }
            tracing::debug!("👀 Location watch #{} finished", id);
        });

        Ok(WatchHandle {
            id,
            slot: Arc::clone(&self.inner.watch),
            state: Arc::clone(&self.inner.state),
            notify,
        })
    }

    pub fn stop_watching(&self) {
        self.inner.watch.cancel_current();
        lock(&self.inner.state).is_watching = false;
    }

    /// Startup sequence: reuse a fresh cached coordinate, otherwise request a
    /// new one silently when permission was granted before. Runs once.
    pub async fn initialize(&self) -> Option<Coordinate> {
        if self.inner.auto_requested.swap(true, Ordering::SeqCst) {
            return self.location();
        }

        let cached = self.load_cached();
        let has_permission = self.check_permission().await;

        if has_permission && cached.is_none() {
            tracing::debug!("📡 Auto-requesting location (permission granted)");
            // 靜默模式：錯誤已記錄在 log
            let _ = self.request_location(true).await;
        } else if cached.is_some() {
            tracing::debug!("📍 Using cached location, skipping auto-request");
        }

        self.location()
    }

    fn persist_location(&self, coordinate: &Coordinate) {
        let result = serde_json::to_string(coordinate)
            .map_err(ProxiError::from)
            .and_then(|json| self.inner.store.set(LOCATION_CACHE_KEY, &json));
        if let Err(e) = result {
            tracing::error!("❌ Error caching location: {}", e);
        }
    }

    fn persist_permission(&self, permission: PermissionState) {
        if let Err(e) = self
            .inner
            .store
            .set(PERMISSION_CACHE_KEY, permission.as_str())
        {
            tracing::error!("❌ Error caching permission: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::location::ScriptedLocationProvider;
    use crate::adapters::storage::MemoryStore;

    const NOW: i64 = 1_700_000_000_000;

    fn nairobi() -> Coordinate {
        Coordinate::new(-1.2921, 36.8219).with_accuracy(12.0)
    }

    fn geolocator(
        provider: ScriptedLocationProvider,
    ) -> (
        Geolocator<Arc<MemoryStore>, Arc<ManualClock>, Arc<ScriptedLocationProvider>>,
        Arc<MemoryStore>,
        Arc<ManualClock>,
        Arc<ScriptedLocationProvider>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let provider = Arc::new(provider);
        let geo = Geolocator::with_settings(
            Arc::clone(&store),
            Arc::clone(&clock),
            Arc::clone(&provider),
            CACHE_DURATION_MS,
            Duration::from_millis(10),
        );
        (geo, store, clock, provider)
    }

    fn store_location(store: &MemoryStore, timestamp: i64) {
        let json = serde_json::to_string(&nairobi().with_timestamp(timestamp)).unwrap();
        store.set(LOCATION_CACHE_KEY, &json).unwrap();
    }

    #[test]
    fn test_cached_location_four_minutes_old_is_reused() {
        let (geo, store, _, _) = geolocator(ScriptedLocationProvider::new(Ok(nairobi())));
        store_location(&store, NOW - 4 * 60 * 1000);

        let cached = geo.load_cached().expect("fresh cache");
        assert_eq!(cached.lat, -1.2921);
        assert_eq!(geo.location(), Some(cached));
    }

    #[test]
    fn test_cached_location_six_minutes_old_is_discarded() {
        let (geo, store, _, _) = geolocator(ScriptedLocationProvider::new(Ok(nairobi())));
        store_location(&store, NOW - 6 * 60 * 1000);

        assert!(geo.load_cached().is_none());
        assert!(geo.location().is_none());
        assert_eq!(store.get(LOCATION_CACHE_KEY).unwrap(), None);
    }

    #[test]
    fn test_malformed_cache_is_ignored() {
        let (geo, store, _, _) = geolocator(ScriptedLocationProvider::new(Ok(nairobi())));
        store.set(LOCATION_CACHE_KEY, "not-json").unwrap();

        assert!(geo.load_cached().is_none());
    }

    #[tokio::test]
    async fn test_request_location_caches_with_fresh_timestamp() {
        let (geo, store, clock, provider) =
            geolocator(ScriptedLocationProvider::new(Ok(nairobi().with_timestamp(1))));
        clock.set(NOW + 42);

        let coordinate = geo.request_location(false).await.unwrap();

        assert_eq!(coordinate.timestamp, Some(NOW + 42));
        assert_eq!(coordinate.accuracy, Some(12.0));
        assert_eq!(provider.last_options(), Some(PositionOptions::ONE_SHOT));
        assert_eq!(
            store.get(PERMISSION_CACHE_KEY).unwrap(),
            Some("granted".to_string())
        );
        let stored: Coordinate =
            serde_json::from_str(&store.get(LOCATION_CACHE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, coordinate);

        let state = geo.state();
        assert!(state.permission_granted);
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_permission_denied_surfaces_message_and_persists_flag() {
        let (geo, store, _, _) = geolocator(ScriptedLocationProvider::new(Err(
            GeolocationError::PermissionDenied,
        )));

        let result = geo.request_location(false).await;

        assert_eq!(result, Err(GeolocationError::PermissionDenied));
        assert_eq!(
            store.get(PERMISSION_CACHE_KEY).unwrap(),
            Some("denied".to_string())
        );
        assert_eq!(
            geo.state().error.as_deref(),
            Some("Permission denied. Please enable location access in your browser settings.")
        );

        geo.clear_error();
        assert!(geo.state().error.is_none());
    }

    #[tokio::test]
    async fn test_silent_request_absorbs_error() {
        let (geo, _, _, _) =
            geolocator(ScriptedLocationProvider::new(Err(GeolocationError::Timeout)));

        assert_eq!(
            geo.request_location(true).await,
            Err(GeolocationError::Timeout)
        );
        let state = geo.state();
        assert!(state.error.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_unsupported_platform() {
        let (geo, _, _, provider) =
            geolocator(ScriptedLocationProvider::new(Ok(nairobi())).unsupported());

        assert_eq!(
            geo.request_location(false).await,
            Err(GeolocationError::Unsupported)
        );
        assert!(geo.start_watching().is_err());
        assert_eq!(provider.calls(), 0);
        assert_eq!(
            geo.state().error.as_deref(),
            Some("Geolocation is not supported by this browser")
        );
    }

    #[tokio::test]
    async fn test_check_permission_prefers_cached_flag() {
        let (geo, store, _, _) = geolocator(
            ScriptedLocationProvider::new(Ok(nairobi())).with_permission(PermissionState::Granted),
        );
        store.set(PERMISSION_CACHE_KEY, "denied").unwrap();

        assert!(!geo.check_permission().await);
    }

    #[tokio::test]
    async fn test_check_permission_queries_provider_and_persists() {
        let (geo, store, _, _) = geolocator(
            ScriptedLocationProvider::new(Ok(nairobi())).with_permission(PermissionState::Unknown),
        );

        assert!(!geo.check_permission().await);
        assert_eq!(
            store.get(PERMISSION_CACHE_KEY).unwrap(),
            Some("denied".to_string())
        );
    }

    #[tokio::test]
    async fn test_initialize_requests_silently_when_granted_without_cache() {
        let (geo, store, _, provider) = geolocator(ScriptedLocationProvider::new(Ok(nairobi())));
        store.set(PERMISSION_CACHE_KEY, "granted").unwrap();

        let location = geo.initialize().await;

        assert!(location.is_some());
        assert_eq!(provider.calls(), 1);

        // 第二次呼叫不會再觸發定位
        geo.initialize().await;
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_initialize_uses_fresh_cache_without_request() {
        let (geo, store, _, provider) = geolocator(ScriptedLocationProvider::new(Ok(nairobi())));
        store.set(PERMISSION_CACHE_KEY, "granted").unwrap();
        store_location(&store, NOW - 60 * 1000);

        assert!(geo.initialize().await.is_some());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_initialize_without_permission_does_not_request() {
        let (geo, _, _, provider) = geolocator(ScriptedLocationProvider::new(Ok(nairobi())));

        assert!(geo.initialize().await.is_none());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_watch_updates_and_stops() {
        let (geo, _, _, provider) = geolocator(ScriptedLocationProvider::new(Ok(nairobi())));

        let handle = geo.start_watching().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(geo.state().is_watching);
        assert_eq!(provider.last_options(), Some(PositionOptions::WATCH));
        assert!(handle.is_active());

        handle.stop();
        assert!(!geo.state().is_watching);

        let calls_after_stop = provider.calls();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(provider.calls() <= calls_after_stop + 1);
    }

    #[tokio::test]
    async fn test_watch_error_stops_tracking() {
        let (geo, _, _, _) = geolocator(
            ScriptedLocationProvider::new(Ok(nairobi()))
                .with_responses([Ok(nairobi()), Err(GeolocationError::PositionUnavailable)]),
        );

        let handle = geo.start_watching().unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        let state = geo.state();
        assert!(!state.is_watching);
        assert_eq!(
            state.error.as_deref(),
            Some("Location information is unavailable.")
        );
        assert!(!handle.is_active());
    }

    #[tokio::test]
    async fn test_second_watch_replaces_first() {
        let (geo, _, _, _) = geolocator(ScriptedLocationProvider::new(Ok(nairobi())));

        let first = geo.start_watching().unwrap();
        let second = geo.start_watching().unwrap();

        assert!(!first.is_active());
        assert!(second.is_active());

        // 停掉舊的 handle 不影響新的 watch
        first.stop();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(second.is_active());
        assert!(geo.state().is_watching);

        geo.stop_watching();
        assert!(!second.is_active());
        assert!(!geo.state().is_watching);
    }
}
