pub mod event;
pub mod update;
