//! Feed health checks.

use tracing::{debug, error};

use crate::client::FeedClient;

/// Check that the feed answers.
pub async fn check_connection(client: &dyn FeedClient) -> bool {
    if client.ping().await {
        debug!("Feed connection healthy");
        true
    } else {
        error!("Feed health check failed");
        false
    }
}
