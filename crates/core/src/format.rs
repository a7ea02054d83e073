//! Display helpers for learner-facing text.

/// First name from an LMS-style `"Last, First"` name. Names without a comma are returned whole.
#[must_use]
pub fn first_name(full_name: &str) -> &str {
    let mut parts = full_name.split(',').map(str::trim);
    let last = parts.next().unwrap_or_default();
    parts.next().unwrap_or(last)
}

/// Chronometer rendering: `H:MM:SS`, `M:SS`, or bare seconds.
#[must_use]
pub fn chrono_label(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let rest = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{rest:02}")
    } else if minutes > 0 {
        format!("{minutes}:{rest:02}")
    } else {
        seconds.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_name() {
        assert_eq!(first_name("Student, Joe"), "Joe");
        assert_eq!(first_name("Ana"), "Ana");
        assert_eq!(first_name("  Ruiz ,  María "), "María");
        assert_eq!(first_name(""), "");
    }

    #[test]
    fn renders_chronometer() {
        assert_eq!(chrono_label(7), "7");
        assert_eq!(chrono_label(65), "1:05");
        assert_eq!(chrono_label(3_725), "1:02:05");
    }
}
