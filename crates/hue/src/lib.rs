pub mod api;
pub mod error;
pub mod legacy_api;

/// Header carrying the application key on every CLIP v2 request
pub const HUE_APPLICATION_KEY_HEADER: &str = "hue-application-key";

/// Path prefix of all CLIP v2 resource endpoints
pub const CLIP_V2_RESOURCE_PATH: &str = "clip/v2/resource";

/// Path of the legacy (v1) api, used for registering new application keys
pub const LEGACY_API_PATH: &str = "api";
