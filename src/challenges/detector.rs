//! Interactive-challenge detection.
//!
//! Checks a rendered document against a fixed set of structural signatures:
//! known challenge iframes, verification widgets, and challenge-form
//! markers. A single positive match is enough. Matching is a structural
//! query over the parsed tree, so cost is bounded by node count rather than
//! text volume; false negatives simply let the attempt fail downstream.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

/// Structural signatures of known interactive challenges.
static CHALLENGE_SIGNATURES: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"iframe[src*="captcha"]"#,
        r#"iframe[src*="recaptcha"]"#,
        r#"iframe[title*="reCAPTCHA"]"#,
        "#cf-challenge-running",
        ".g-recaptcha",
        "#challenge-form",
        r#"[name="cf-turnstile-response"]"#,
        ".cf-turnstile",
    ]
    .iter()
    .map(|raw| {
        Selector::parse(raw)
            .unwrap_or_else(|err| panic!("invalid challenge selector `{raw}`: {err:?}"))
    })
    .collect()
});

/// Signature-based detector over rendered documents.
#[derive(Debug, Clone, Default)]
pub struct ChallengeDetector;

impl ChallengeDetector {
    pub fn new() -> Self {
        Self
    }

    /// True when any known challenge marker is present in the document.
    pub fn detect(&self, document: &Html) -> bool {
        CHALLENGE_SIGNATURES
            .iter()
            .any(|signature| document.select(signature).next().is_some())
    }

    /// Parse raw HTML and run detection in one step.
    pub fn detect_html(&self, html: &str) -> bool {
        self.detect(&Html::parse_document(html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_challenge_iframe_marker() {
        let html = r#"
            <html><body>
                <iframe src="https://www.google.com/recaptcha/api2/anchor"></iframe>
            </body></html>
        "#;
        assert!(ChallengeDetector::new().detect_html(html));
    }

    #[test]
    fn detects_turnstile_response_field() {
        let html = r#"
            <html><body>
                <form id="challenge-form">
                    <input type="hidden" name="cf-turnstile-response" value="">
                </form>
            </body></html>
        "#;
        assert!(ChallengeDetector::new().detect_html(html));
    }

    #[test]
    fn detects_widget_container() {
        let html = r#"<div class="g-recaptcha" data-sitekey="abc123"></div>"#;
        assert!(ChallengeDetector::new().detect_html(html));
    }

    #[test]
    fn plain_documents_do_not_match() {
        let html = r#"
            <html><head><title>Store hours</title></head>
            <body><p>Open 9-5 weekdays.</p><iframe src="/map"></iframe></body></html>
        "#;
        assert!(!ChallengeDetector::new().detect_html(html));
    }

    #[test]
    fn detection_ignores_marker_text_outside_structure() {
        // The words alone must not trigger; only the structural markers do.
        let html = "<html><body><p>talking about recaptcha and challenge-form</p></body></html>";
        assert!(!ChallengeDetector::new().detect_html(html));
    }
}
