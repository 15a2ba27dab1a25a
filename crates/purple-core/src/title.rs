#![forbid(unsafe_code)]

//! Document title rewriting.
//!
//! Two rules, applied in order, each replacing its first match only:
//! a trailing `" / X"` site suffix becomes `" / Twitter"`, then the first
//! standalone `X` token becomes `Twitter`. Matching is case-insensitive.

use std::sync::OnceLock;

use regex_lite::Regex;

const SITE_NAME: &str = "Twitter";

fn suffix_rule() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s*/\s*X\b").expect("title suffix regex"))
}

fn token_rule() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bX\b").expect("title token regex"))
}

/// Rewrite `title`, returning `None` when nothing would change.
#[must_use]
pub fn rewrite_title(title: &str) -> Option<String> {
    if title.is_empty() {
        return None;
    }
    let suffixed = suffix_rule().replace(title, format!(" / {SITE_NAME}").as_str());
    let renamed = token_rule().replace(&suffixed, SITE_NAME);
    (renamed != title).then(|| renamed.into_owned())
}
