//! Read-only projections handed to the presentation layer and the setup
//! request it sends back.

pub mod notice;
pub mod phase;
pub mod setup;
pub mod snapshot;
pub mod validation;

/// Render a countdown as `mm:ss`.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::format_clock;

    #[test]
    fn clock_pads_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(45), "00:45");
        assert_eq!(format_clock(90), "01:30");
        assert_eq!(format_clock(600), "10:00");
    }
}
