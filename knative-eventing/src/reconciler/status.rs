use super::source::EventSource;
use super::store::{Store, StoreError};
use tracing::debug;

/// Persist the status of `desired` unless it equals the status of `persisted`.
///
/// Returns whether a write happened.
pub async fn sync_status<S: EventSource, St: Store>(
    store: &St,
    persisted: &S,
    desired: &S,
) -> Result<bool, StoreError> {
    if persisted.source_status() == desired.source_status() {
        debug!("status is up to date");
        return Ok(false);
    }
    store.update_status(desired).await?;
    Ok(true)
}
