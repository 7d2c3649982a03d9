pub mod config;
pub mod voice_adapter;
