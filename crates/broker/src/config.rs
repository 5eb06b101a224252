use serde::{Deserialize, Serialize};

/// Messages drained from the bus per dispatch invocation unless a
/// `SetBatchSize` command overrides it.
pub const DEFAULT_BATCH_SIZE: u32 = 5;

/// Process-level broker settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Prefix for the derived channel object names.
    pub channel_prefix: String,
    /// Initial dispatch batch size.
    pub batch_size: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            channel_prefix: "/tmp/switchyard_".to_owned(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}
