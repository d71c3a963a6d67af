//! Runtime settings and the fixed tables backing the tray menus.
//!
//! Settings live for the process only; nothing is persisted across runs.

/// Interval options offered in the Tempo submenu, label to seconds.
pub const INTERVALS: &[(&str, u64)] = &[
    ("5s", 5),
    ("30s", 30),
    ("55s", 55),
    ("4m", 240),
    ("9m", 540),
    ("14m", 840),
    ("29m", 1740),
    ("59m", 3540),
];

/// Movement range options offered in the Range submenu, label to pixels.
pub const MOVE_RANGES: &[(&str, u32)] = &[
    ("Tiny (1 pixel)", 1),
    ("Small (2 pixels)", 2),
    ("Medium (5 pixels)", 5),
    ("Large (10 pixels)", 10),
    ("Extra Large (20 pixels)", 20),
];

/// Sentinel range: no cursor movement, hold a sleep inhibitor instead.
pub const INHIBIT_RANGE: u32 = 0;

/// Menu label for the sentinel range entry.
pub const INHIBIT_LABEL: &str = "Stay Awake";

/// Movement distance used when the sentinel range is selected but no
/// inhibitor is usable this cycle.
pub const FALLBACK_RANGE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub interval_secs: u64,
    pub range_px: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_secs: 240,
            range_px: 5,
        }
    }
}

/// Whether `secs` is one of the menu interval options. The CLI accepts any
/// positive interval; menu intents are checked against this before they
/// reach the scheduler.
pub fn is_supported_interval(secs: u64) -> bool {
    INTERVALS.iter().any(|(_, s)| *s == secs)
}

/// Whether `px` is a valid menu range choice. The sentinel counts only when
/// the platform actually has an inhibitor to offer.
pub fn is_supported_range(px: u32, inhibitor_available: bool) -> bool {
    if px == INHIBIT_RANGE {
        return inhibitor_available;
    }
    MOVE_RANGES.iter().any(|(_, p)| *p == px)
}

/// Format a remaining-seconds count the way the status line shows it.
pub fn format_remaining(secs: u64) -> String {
    let minutes = secs / 60;
    let seconds = secs % 60;
    if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_intervals_match_menu_table() {
        for (_, secs) in INTERVALS {
            assert!(is_supported_interval(*secs));
        }
        assert!(!is_supported_interval(0));
        assert!(!is_supported_interval(60));
        assert!(!is_supported_interval(241));
    }

    #[test]
    fn test_supported_ranges_match_menu_table() {
        for (_, px) in MOVE_RANGES {
            assert!(is_supported_range(*px, false));
            assert!(is_supported_range(*px, true));
        }
        assert!(!is_supported_range(3, true));
        assert!(!is_supported_range(100, true));
    }

    #[test]
    fn test_sentinel_range_requires_inhibitor() {
        assert!(is_supported_range(INHIBIT_RANGE, true));
        assert!(!is_supported_range(INHIBIT_RANGE, false));
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(0), "0s");
        assert_eq!(format_remaining(45), "45s");
        assert_eq!(format_remaining(60), "1m0s");
        assert_eq!(format_remaining(200), "3m20s");
        assert_eq!(format_remaining(3540), "59m0s");
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.interval_secs, 240);
        assert_eq!(settings.range_px, 5);
        assert!(is_supported_interval(settings.interval_secs));
        assert!(is_supported_range(settings.range_px, false));
    }
}
