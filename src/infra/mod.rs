pub mod app;
pub mod app_store_client;
pub mod config;
pub mod google_play_client;
pub mod setup;
