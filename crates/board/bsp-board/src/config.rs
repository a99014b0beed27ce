//! Build-time configuration constants.

/// Interval between hold/release polls while a button is down, and
/// between idle scans of polling-only buttons.
pub const BUTTON_POLL_INTERVAL_MS: u64 = 100;

/// Number of logical button slots.
pub const MAX_BUTTONS: usize = 8;

/// Number of external interrupt lines on the largest supported SoC.
pub const MAX_EXT_IRQ_LINES: usize = 8;

/// Number of MoCA chip instances a board may carry.
pub const MAX_MOCA_DEVICES: usize = 2;

/// Longest callback name kept by the dying-gasp and watchdog lists
/// (network interface name length minus the terminator).
pub const CALLBACK_NAME_MAX: usize = 15;

/// Hardware watchdog timeout armed by the dying-gasp handler.
pub const DYING_GASP_RESET_TIMEOUT_US: u32 = 1_000_000;

/// How long a SES button event stays visible to userspace pollers.
pub const SES_EVENT_WINDOW_MS: u64 = 1000;

/// Watchdog period used until userspace configures one.
pub const WATCHDOG_DEFAULT_TIMER_US: u32 = 5_000_000;

/// User-mode miss threshold, in service interrupts, until configured.
pub const WATCHDOG_DEFAULT_USER_THRESHOLD: u32 = 8;

/// The watchdog raises its service interrupt at half its period, so one
/// userspace-visible period spans this many service interrupts.
pub const WATCHDOG_SERVICES_PER_PERIOD: u32 = 2;

/// Longest accepted watchdog control write; longer input is truncated.
pub const WATCHDOG_CONTROL_MAX: usize = 64;
