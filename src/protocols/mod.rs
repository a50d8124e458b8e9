use color_eyre::Result;

pub mod mqtt;

#[cfg(test)]
pub mod mock;

/// Publish/subscribe operations the coordinators need from the broker
/// connection. Both calls queue the request and return without waiting for
/// the broker.
pub trait Transport: Send + Sync {
    fn subscribe(&self, topic: &str) -> Result<()>;

    /// Releases one `subscribe` of `topic`. Topics shared by several channels
    /// stay subscribed until every channel let go of them.
    fn unsubscribe(&self, topic: &str) -> Result<()>;

    fn publish(&self, topic: &str, payload: String) -> Result<()>;
}
