//! Yes/no reply parsing

use tracing::{debug, warn};

/// A parsed yes/no reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    /// The answer; unrecognized replies count as "no"
    pub value: bool,

    /// Whether the reply was literally yes or no
    pub recognized: bool,
}

/// Parse a survivor's yes/no reply
///
/// Only a trimmed, case-insensitive "yes" or "no" is recognized. Anything
/// else is treated as "no" so the conversation keeps moving.
pub fn parse_confirmation(text: &str) -> Confirmation {
    debug!(%text, "parse_confirmation: called");
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("yes") {
        Confirmation {
            value: true,
            recognized: true,
        }
    } else if trimmed.eq_ignore_ascii_case("no") {
        Confirmation {
            value: false,
            recognized: true,
        }
    } else {
        warn!(response = %text, "Unrecognized confirmation response");
        Confirmation {
            value: false,
            recognized: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_variants() {
        assert_eq!(
            parse_confirmation("Yes"),
            Confirmation {
                value: true,
                recognized: true
            }
        );
        assert!(parse_confirmation(" YES ").value);
        assert!(parse_confirmation("yes\n").value);
    }

    #[test]
    fn test_no_variants() {
        let parsed = parse_confirmation("no");
        assert!(!parsed.value);
        assert!(parsed.recognized);
        assert!(!parse_confirmation("\tNO").value);
    }

    #[test]
    fn test_unrecognized_defaults_to_no() {
        for text in ["maybe", "yes please", "y", "", "nope"] {
            let parsed = parse_confirmation(text);
            assert!(!parsed.value, "{text}");
            assert!(!parsed.recognized, "{text}");
        }
    }
}
