pub mod data;
pub mod event_time;
