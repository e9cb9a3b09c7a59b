// Adapters layer: concrete implementations of the domain ports (http, storage, clock, location).

pub mod backend;
pub mod clock;
pub mod location;
pub mod push_http;
pub mod storage;
