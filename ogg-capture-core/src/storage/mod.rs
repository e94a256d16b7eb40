pub mod metadata;
pub mod page_sink;
