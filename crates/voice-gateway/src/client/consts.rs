pub const VOICE_API_KEY: &str = "VOICE_API_KEY";
pub const VOICE_GATEWAY_URL: &str = "VOICE_GATEWAY_URL";

pub const DEFAULT_URL: &str = "ws://127.0.0.1:8787/v1/calls";
pub const DEFAULT_CAPACITY: usize = 256;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
