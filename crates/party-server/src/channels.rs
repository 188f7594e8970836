//! Renet channel configuration.
//!
//! Channel 0: ReliableOrdered - Party packets (order matters for the roster)
//! Channel 1: ReliableUnordered - Chat notices

use std::time::Duration;

use renet::ChannelConfig;

/// Channel IDs for different message types
pub mod channel_id {
    /// Party requests and party view updates - must arrive in order
    pub const PARTY: u8 = 0;
    /// Chat notices - reliable but order less critical
    pub const NOTICE: u8 = 1;
}

/// Maximum bytes per channel
const MAX_CHANNEL_MEMORY: usize = 5 * 1024 * 1024; // 5 MB

/// Create channel configurations for the server
pub fn create_channel_configs() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig {
            channel_id: channel_id::PARTY,
            max_memory_usage_bytes: MAX_CHANNEL_MEMORY,
            send_type: renet::SendType::ReliableOrdered {
                resend_time: Duration::from_millis(300),
            },
        },
        ChannelConfig {
            channel_id: channel_id::NOTICE,
            max_memory_usage_bytes: MAX_CHANNEL_MEMORY / 2,
            send_type: renet::SendType::ReliableUnordered {
                resend_time: Duration::from_millis(300),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_configs_are_valid() {
        let configs = create_channel_configs();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].channel_id, channel_id::PARTY);
        assert_eq!(configs[1].channel_id, channel_id::NOTICE);
    }
}
