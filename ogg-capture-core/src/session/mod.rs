pub mod manager;
pub mod recording;
