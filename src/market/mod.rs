pub mod oracle_source;
pub mod price_book;
pub mod projection;
pub mod snapshot_ring;
