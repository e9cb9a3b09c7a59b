pub mod catalog;
pub mod demo;
pub mod geolocation;
pub mod notifications;
pub mod proximity;
pub mod push;
pub mod radius;
pub mod webpush;

pub use crate::domain::model::{Coordinate, Located, ServiceRecord, Vendor};
pub use crate::domain::ports::{
    Clock, KeyValueStore, LocationProvider, NotificationSource, PushTransport, ServiceSource,
    SubscriptionStore,
};
pub use crate::utils::error::Result;
