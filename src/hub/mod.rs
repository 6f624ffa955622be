pub mod client;

use async_trait::async_trait;

use hue::api::EntertainmentConfiguration;

use crate::error::ApiResult;

pub use self::client::HubClient;

/// The slice of the hub api that the cleaner needs.
#[async_trait]
pub trait EntertainmentApi: Send + Sync {
    /// Host name or address of the hub, used in logs and repair requests
    fn host(&self) -> &str;

    /// List all entertainment areas, in the order reported by the hub
    async fn list_areas(&self) -> ApiResult<Vec<EntertainmentConfiguration>>;

    /// Delete a single entertainment area. Never fails, but reports whether
    /// the hub accepted the request.
    async fn delete_area(&self, id: &str) -> bool;
}

#[async_trait]
impl EntertainmentApi for HubClient {
    fn host(&self) -> &str {
        self.host()
    }

    async fn list_areas(&self) -> ApiResult<Vec<EntertainmentConfiguration>> {
        self.list_entertainment_configurations().await
    }

    async fn delete_area(&self, id: &str) -> bool {
        self.delete_entertainment_configuration(id).await
    }
}
