pub mod anthropic_client;
pub mod google_calendar_client;
pub mod telegram_client;
