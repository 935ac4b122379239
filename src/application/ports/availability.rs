use async_trait::async_trait;

/// Installed-and-reachable check for an external source.
///
/// Must be fast and must not touch the source's data.
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    async fn is_available(&self) -> bool;

    /// Shown to the user when [`is_available`](Self::is_available) returns false.
    fn unavailable_message(&self) -> String;
}
