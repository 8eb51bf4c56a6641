mod relay;

pub use relay::{DeliveryOutcome, NotificationRelay, RelayStats, RelayStatsSnapshot};
