pub mod calendar_sink;
pub mod completion_service;
pub mod date_context;
pub mod event_extractor;
pub mod guest_directory;
pub mod reply_text;
pub mod transport;
