//! Notification text
//!
//! Builds the alert title and body for detected changes and for operational
//! errors, and enforces the notifier length limits.

use chrono::{DateTime, Utc};

use crate::detect::Change;

/// Title of the change alert
pub const CHANGE_TITLE: &str = "DNS Change Alert";

/// Title of the error alert
pub const ERROR_TITLE: &str = "DNS Monitor Error";

/// Longest title a notifier is handed, in characters
pub const TITLE_MAX_CHARS: usize = 250;

/// Longest message body a notifier is handed, in characters
pub const MESSAGE_MAX_CHARS: usize = 1024;

const ELLIPSIS: &str = "...";

/// A title and body ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub message: String,
}

impl Report {
    /// Clamp title and message to the notifier limits
    pub fn truncated(self) -> Self {
        Self {
            title: truncate_with_ellipsis(&self.title, TITLE_MAX_CHARS),
            message: truncate_with_ellipsis(&self.message, MESSAGE_MAX_CHARS),
        }
    }
}

/// Timestamp format used in reports (`Mon, 02 Jan 2006 15:04:05 UTC`)
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S UTC").to_string()
}

/// Alert for a non-empty change list
pub fn change_report(domain: &str, changes: &[Change], at: DateTime<Utc>) -> Report {
    let mut message = format!("⚠️ DNS CHANGES DETECTED for {domain} ⚠️\n\n");
    for (i, change) in changes.iter().enumerate() {
        message.push_str(&format!("{}. {}\n", i + 1, change));
    }
    message.push_str(&format!("\nDetected at: {}", format_timestamp(at)));

    Report {
        title: CHANGE_TITLE.to_string(),
        message,
    }
}

/// Alert for an operational failure
pub fn error_report(subject: &str, error: &dyn std::fmt::Display, at: DateTime<Utc>) -> Report {
    Report {
        title: ERROR_TITLE.to_string(),
        message: format!(
            "{ERROR_TITLE}: {subject}\n\nError details: {error}\n\nTime: {}",
            format_timestamp(at)
        ),
    }
}

/// Cut `text` to at most `max_chars` characters, ending in `...` when cut
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(&ELLIPSIS[..max_chars.min(ELLIPSIS.len())]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ChangeTag;
    use crate::record::RecordKind;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn timestamp_is_rfc1123_style() {
        assert_eq!(format_timestamp(at()), "Tue, 05 Mar 2024 14:07:09 UTC");
    }

    #[test]
    fn change_report_numbers_each_change() {
        let changes = vec![
            Change {
                tag: ChangeTag::Added,
                kind: RecordKind::Mx,
                name: "example.com.".to_string(),
                value: "20 mail2.example.com.".to_string(),
            },
            Change {
                tag: ChangeTag::Removed,
                kind: RecordKind::Mx,
                name: "example.com.".to_string(),
                value: "10 mail.example.com.".to_string(),
            },
        ];

        let report = change_report("example.com", &changes, at());
        assert_eq!(report.title, "DNS Change Alert");
        assert_eq!(
            report.message,
            "⚠️ DNS CHANGES DETECTED for example.com ⚠️\n\n\
             1. ADDED: MX example.com. -> 20 mail2.example.com.\n\
             2. REMOVED: MX example.com. -> 10 mail.example.com.\n\
             \nDetected at: Tue, 05 Mar 2024 14:07:09 UTC"
        );
    }

    #[test]
    fn error_report_layout() {
        let report = error_report("Failed to save state", &"disk full", at());
        assert_eq!(report.title, "DNS Monitor Error");
        assert_eq!(
            report.message,
            "DNS Monitor Error: Failed to save state\n\nError details: disk full\n\nTime: Tue, 05 Mar 2024 14:07:09 UTC"
        );
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("0123456789", 10), "0123456789");
    }

    #[test]
    fn long_text_ends_with_ellipsis_within_limit() {
        let long = "x".repeat(2000);
        let cut = truncate_with_ellipsis(&long, MESSAGE_MAX_CHARS);
        assert_eq!(cut.chars().count(), MESSAGE_MAX_CHARS);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "⚠️".repeat(300);
        let cut = truncate_with_ellipsis(&text, TITLE_MAX_CHARS);
        assert_eq!(cut.chars().count(), TITLE_MAX_CHARS);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn report_truncation_applies_both_limits() {
        let report = Report {
            title: "t".repeat(400),
            message: "m".repeat(4000),
        }
        .truncated();
        assert_eq!(report.title.chars().count(), TITLE_MAX_CHARS);
        assert_eq!(report.message.chars().count(), MESSAGE_MAX_CHARS);
    }
}
