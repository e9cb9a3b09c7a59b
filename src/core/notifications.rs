use crate::domain::model::NotificationRow;
use crate::domain::ports::NotificationSource;
use crate::utils::error::Result;
use chrono::DateTime;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub const NOTIFICATION_LIMIT: usize = 50;

/// 示範通知的 id 前綴；這些通知不寫回後端
pub const DEMO_ID_PREFIX: &str = "demo";

const DEMO_USER_ID: &str = "demo-user";

const INCOMING_DEMO: [(&str, &str, &str); 4] = [
    (
        "New service nearby",
        "Spice Kitchen started delivering in your area.",
        "vendor",
    ),
    (
        "Booking reminder",
        "Your appointment at Health Plus Clinic is in one hour.",
        "booking",
    ),
    (
        "Message from vendor",
        "Style Tailors replied to your request.",
        "message",
    ),
    (
        "Weekend offer",
        "Green Grocery has 20% off fresh produce this weekend.",
        "promotion",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrigin {
    Backend,
    Demo,
}

pub fn is_demo_id(id: &str) -> bool {
    id.starts_with(DEMO_ID_PREFIX)
}

fn timestamp(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(|t| t.to_rfc3339())
}

/// 後端沒有資料（或讀取失敗）時顯示的通知
pub fn demo_notifications(now_millis: i64) -> Vec<NotificationRow> {
    [
        (
            "demo-1",
            "New vendor nearby",
            "Fresh Foods Market just opened 1.2km from you.",
            "vendor",
            false,
            5,
        ),
        (
            "demo-2",
            "Booking confirmed",
            "Fix-It Plumbing confirmed your visit for tomorrow morning.",
            "booking",
            false,
            60,
        ),
        (
            "demo-3",
            "Price drop",
            "Quick Bites Cafe lowered prices on lunch specials.",
            "promotion",
            true,
            180,
        ),
        (
            "demo-4",
            "Welcome to ProxiLink",
            "Turn on location to see services around you.",
            "system",
            true,
            24 * 60,
        ),
    ]
    .into_iter()
    .map(|(id, title, content, kind, read, age_minutes)| NotificationRow {
        id: id.to_string(),
        user_id: DEMO_USER_ID.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        related_id: None,
        notification_type: kind.to_string(),
        is_read: Some(read),
        created_at: timestamp(now_millis - age_minutes * 60_000),
    })
    .collect()
}

/// 依序輪流產生的「新進」示範通知
pub fn incoming_demo_notification(index: usize, now_millis: i64) -> NotificationRow {
    let (title, content, kind) = INCOMING_DEMO[index % INCOMING_DEMO.len()];
    NotificationRow {
        id: format!("demo-incoming-{}", now_millis),
        user_id: DEMO_USER_ID.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        related_id: None,
        notification_type: kind.to_string(),
        is_read: Some(false),
        created_at: timestamp(now_millis),
    }
}

/// 30-60 秒的隨機間隔
pub fn next_demo_delay() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(30_000..60_000))
}

/// In-app notification list for one user. Read flags are updated locally
/// first and then written back; demo notifications stay local.
pub struct NotificationFeed<S: NotificationSource> {
    source: S,
    notifications: Mutex<Vec<NotificationRow>>,
    incoming: AtomicUsize,
}

impl<S: NotificationSource> NotificationFeed<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            notifications: Mutex::new(Vec::new()),
            incoming: AtomicUsize::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<NotificationRow>> {
        self.notifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn load(&self, user_id: Option<&str>, now_millis: i64) -> FeedOrigin {
        let rows = match self
            .source
            .latest_notifications(user_id, NOTIFICATION_LIMIT)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("❌ Failed to fetch notifications: {}", e);
                Vec::new()
            }
        };

        let (rows, origin) = if rows.is_empty() {
            (demo_notifications(now_millis), FeedOrigin::Demo)
        } else {
            (rows, FeedOrigin::Backend)
        };
        tracing::info!("🔔 Loaded {} notifications ({:?})", rows.len(), origin);
        *self.entries() = rows;
        origin
    }

    pub fn notifications(&self) -> Vec<NotificationRow> {
        self.entries().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.entries().iter().filter(|n| !n.is_read()).count()
    }

    /// 新通知排在最前面
    pub fn receive(&self, notification: NotificationRow) {
        self.entries().insert(0, notification);
    }

    pub fn receive_demo(&self, now_millis: i64) -> NotificationRow {
        let index = self.incoming.fetch_add(1, Ordering::Relaxed);
        let notification = incoming_demo_notification(index, now_millis);
        self.receive(notification.clone());
        notification
    }

    pub async fn mark_as_read(&self, id: &str) -> Result<()> {
        {
            let mut entries = self.entries();
            for notification in entries.iter_mut().filter(|n| n.id == id) {
                notification.is_read = Some(true);
            }
        }
        if is_demo_id(id) {
            return Ok(());
        }

        if let Err(e) = self.source.mark_read(&[id.to_string()]).await {
            tracing::error!("❌ Failed to mark notification read: {}", e);
            return Err(e);
        }
        Ok(())
    }

    /// 全部標成已讀；回傳寫回後端的筆數
    pub async fn mark_all_read(&self) -> Result<usize> {
        let unread_ids: Vec<String> = {
            let mut entries = self.entries();
            let ids = entries
                .iter()
                .filter(|n| !n.is_read() && !is_demo_id(&n.id))
                .map(|n| n.id.clone())
                .collect();
            for notification in entries.iter_mut() {
                notification.is_read = Some(true);
            }
            ids
        };
        if unread_ids.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.source.mark_read(&unread_ids).await {
            tracing::error!("❌ Failed to mark all read: {}", e);
            return Err(e);
        }
        Ok(unread_ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ProxiError;
    use async_trait::async_trait;

    const NOW: i64 = 1_700_000_000_000;

    #[derive(Default)]
    struct RecordingSource {
        rows: Vec<NotificationRow>,
        fail_fetch: bool,
        marked: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl NotificationSource for RecordingSource {
        async fn latest_notifications(
            &self,
            _user_id: Option<&str>,
            limit: usize,
        ) -> Result<Vec<NotificationRow>> {
            if self.fail_fetch {
                return Err(ProxiError::BackendError {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            Ok(self.rows.iter().take(limit).cloned().collect())
        }

        async fn mark_read(&self, ids: &[String]) -> Result<()> {
            self.marked.lock().unwrap().push(ids.to_vec());
            Ok(())
        }
    }

    fn row(id: &str, read: Option<bool>) -> NotificationRow {
        NotificationRow {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: format!("title {}", id),
            content: "content".to_string(),
            related_id: None,
            notification_type: "booking".to_string(),
            is_read: read,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_load_prefers_backend_rows() {
        let feed = NotificationFeed::new(RecordingSource {
            rows: vec![row("n1", Some(false)), row("n2", None), row("n3", Some(true))],
            ..Default::default()
        });

        assert_eq!(feed.load(Some("u1"), NOW).await, FeedOrigin::Backend);
        assert_eq!(feed.notifications().len(), 3);
        assert_eq!(feed.unread_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_or_failed_fetch_falls_back_to_demo() {
        let empty = NotificationFeed::new(RecordingSource::default());
        assert_eq!(empty.load(None, NOW).await, FeedOrigin::Demo);
        assert_eq!(empty.unread_count(), 2);

        let failing = NotificationFeed::new(RecordingSource {
            fail_fetch: true,
            ..Default::default()
        });
        assert_eq!(failing.load(None, NOW).await, FeedOrigin::Demo);
        assert!(failing.notifications().iter().all(|n| is_demo_id(&n.id)));
    }

    #[tokio::test]
    async fn test_mark_as_read_skips_backend_for_demo_ids() {
        let feed = NotificationFeed::new(RecordingSource {
            rows: vec![row("n1", Some(false))],
            ..Default::default()
        });
        feed.load(Some("u1"), NOW).await;
        feed.receive(row("demo-incoming-1", Some(false)));

        feed.mark_as_read("demo-incoming-1").await.unwrap();
        assert!(feed.source.marked.lock().unwrap().is_empty());

        feed.mark_as_read("n1").await.unwrap();
        assert_eq!(
            *feed.source.marked.lock().unwrap(),
            vec![vec!["n1".to_string()]]
        );
        assert_eq!(feed.unread_count(), 0);
    }

    #[tokio::test]
    async fn test_mark_all_read_sends_only_unread_backend_ids() {
        let feed = NotificationFeed::new(RecordingSource {
            rows: vec![row("n1", Some(false)), row("n2", Some(true)), row("n3", None)],
            ..Default::default()
        });
        feed.load(Some("u1"), NOW).await;
        feed.receive_demo(NOW);

        assert_eq!(feed.mark_all_read().await.unwrap(), 2);
        assert_eq!(
            *feed.source.marked.lock().unwrap(),
            vec![vec!["n1".to_string(), "n3".to_string()]]
        );
        assert_eq!(feed.unread_count(), 0);

        // 已經沒有未讀，不再呼叫後端
        assert_eq!(feed.mark_all_read().await.unwrap(), 0);
        assert_eq!(feed.source.marked.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_incoming_demo_notifications_are_prepended_in_rotation() {
        let feed = NotificationFeed::new(RecordingSource::default());
        feed.load(None, NOW).await;

        let first = feed.receive_demo(NOW);
        let second = feed.receive_demo(NOW + 1);
        assert_eq!(first.title, INCOMING_DEMO[0].0);
        assert_eq!(second.title, INCOMING_DEMO[1].0);
        assert_eq!(second.id, format!("demo-incoming-{}", NOW + 1));

        let ids: Vec<String> = feed.notifications().into_iter().map(|n| n.id).collect();
        assert_eq!(ids[0], second.id);
        assert_eq!(ids[1], first.id);
        assert_eq!(
            incoming_demo_notification(INCOMING_DEMO.len(), NOW).title,
            INCOMING_DEMO[0].0
        );
    }

    #[test]
    fn test_demo_delay_range() {
        for _ in 0..20 {
            let delay = next_demo_delay();
            assert!(delay >= Duration::from_secs(30));
            assert!(delay < Duration::from_secs(60));
        }
    }
}
