//! TwiML rendering for SMS replies

use crate::conversation::TurnOutcome;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Escape text for use inside an XML element
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Messaging response carrying the turn's reply and optional media link
pub fn render(outcome: &TurnOutcome) -> String {
    let media = outcome
        .media
        .as_deref()
        .map(|uri| format!("<Media>{}</Media>", escape(uri)))
        .unwrap_or_default();

    format!(
        "{}<Response><Message><Body>{}</Body>{}</Message></Response>",
        XML_DECLARATION,
        escape(&outcome.reply),
        media
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a & b <c> "d" 'e'"#), "a &amp; b &lt;c&gt; &quot;d&quot; &apos;e&apos;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_render_without_media() {
        let xml = render(&TurnOutcome::text("Stay safe"));
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Message><Body>Stay safe</Body></Message></Response>"#
        );
        assert!(!xml.contains("<Media>"));
    }

    #[test]
    fn test_render_with_media_escapes_query() {
        let outcome = TurnOutcome::text("Is this right? [1 Main St]")
            .with_media(Some("https://maps.test/map?center=1+Main&zoom=16".to_string()));
        let xml = render(&outcome);
        assert!(xml.contains("<Body>Is this right? [1 Main St]</Body>"));
        assert!(xml.contains("<Media>https://maps.test/map?center=1+Main&amp;zoom=16</Media>"));
    }
}
