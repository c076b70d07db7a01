pub mod client;
pub mod config;
pub mod event_stream;
pub mod price_feed;
