use crate::domain::model::{Coordinate, PermissionState, PositionOptions};
use crate::domain::ports::LocationProvider;
use crate::utils::error::GeolocationError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 以固定座標回應的定位來源（CLI 以 --lat/--lng 傳入）。
/// 沒有座標時表現為不支援定位的平台。
#[derive(Debug, Clone, Default)]
pub struct FixedLocationProvider {
    coordinate: Option<Coordinate>,
}

impl FixedLocationProvider {
    pub fn new(coordinate: Option<Coordinate>) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    fn is_supported(&self) -> bool {
        self.coordinate.is_some()
    }

    async fn permission(&self) -> Option<PermissionState> {
        Some(if self.coordinate.is_some() {
            PermissionState::Granted
        } else {
            PermissionState::Unknown
        })
    }

    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> std::result::Result<Coordinate, GeolocationError> {
        self.coordinate.ok_or(GeolocationError::Unsupported)
    }
}

/// 依序回放預先排好的讀數；用完之後重複 `fallback`
#[derive(Debug)]
pub struct ScriptedLocationProvider {
    responses: Mutex<VecDeque<std::result::Result<Coordinate, GeolocationError>>>,
    fallback: std::result::Result<Coordinate, GeolocationError>,
    permission: Option<PermissionState>,
    supported: bool,
    calls: AtomicUsize,
    last_options: Mutex<Option<PositionOptions>>,
}

impl ScriptedLocationProvider {
    pub fn new(fallback: std::result::Result<Coordinate, GeolocationError>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback,
            permission: None,
            supported: true,
            calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        }
    }

    pub fn with_responses(
        self,
        responses: impl IntoIterator<Item = std::result::Result<Coordinate, GeolocationError>>,
    ) -> Self {
        {
            let mut queue = self
                .responses
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            queue.extend(responses);
        }
        self
    }

    pub fn with_permission(mut self, permission: PermissionState) -> Self {
        self.permission = Some(permission);
        self
    }

    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<PositionOptions> {
        *self
            .last_options
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LocationProvider for ScriptedLocationProvider {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn permission(&self) -> Option<PermissionState> {
        self.permission
    }

    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> std::result::Result<Coordinate, GeolocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_options
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(options);
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or(self.fallback)
    }
}

#[async_trait]
impl<L: LocationProvider + ?Sized> LocationProvider for Arc<L> {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    async fn permission(&self) -> Option<PermissionState> {
        (**self).permission().await
    }

    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> std::result::Result<Coordinate, GeolocationError> {
        (**self).current_position(options).await
    }
}
