pub mod clip_buffer;
pub mod ring_tracker;
pub mod sample_window;
