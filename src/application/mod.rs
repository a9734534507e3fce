pub mod app_error;
pub mod ports;
pub mod token_codec;
pub mod use_cases;
