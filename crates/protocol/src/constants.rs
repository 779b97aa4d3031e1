use std::time::Duration;

/// Literal sent to the Wi-Fi module to rouse a sleeping inverter.
pub const WAKEUP_PAYLOAD: &[u8] = b"WIFIKIT-214028-READ";

/// Administrative port of the inverter's Wi-Fi module.
pub const WAKEUP_PORT: u16 = 48899;

/// Communication address used for the wake-up request.
pub const WAKEUP_COMM_ADDR: u8 = 1;

/// The wake-up request waits this long for any response.
pub const WAKEUP_TIMEOUT: Duration = Duration::from_secs(1);

/// Wake-up requests are single shot.
pub const WAKEUP_RETRIES: u8 = 0;

/// Period of the repeating wake-up timer.
pub const WAKEUP_PERIOD: Duration = Duration::from_secs(10 * 60);

/// Consecutive failed reads tolerated before the device is reported
/// unavailable.
///
/// UDP drops are routine on most home networks, so a streak below this many
/// failures is served from the last known snapshot.
pub const FAILURE_STREAK_THRESHOLD: u32 = 3;

/// Default UDP port for runtime data queries.
pub const DEFAULT_PORT: u16 = 8899;

/// Default communication address for runtime data queries.
pub const DEFAULT_COMM_ADDR: u8 = 0xF7;

/// Default interval between polling cycles.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);

/// Default per-attempt timeout for runtime data queries.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Default number of retries for runtime data queries.
pub const DEFAULT_RETRIES: u8 = 3;

/// Largest datagram accepted from the device.
pub const MAX_DATAGRAM_SIZE: usize = 4096;
