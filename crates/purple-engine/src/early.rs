#![forbid(unsafe_code)]

//! Early startup, run before the page has rendered.
//!
//! Only touches `<head>`: favicons and the splash-screen fragment. Safe to
//! run against a document whose `<head>` has not been parsed yet.

use purple_core::Palette;
use purple_dom::{AssetResolver, Dom, DomError};
use tracing::debug;

use crate::head::ensure_head;
use crate::identity::upsert_favicons;
use crate::rules::{Injection, RuleBook, inject};

const SPLASH_FRAGMENT: &str = "purple-splash";

/// What early startup did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarlyReport {
    pub favicons_changed: usize,
    pub splash: Injection,
}

/// Ensure `<head>`, upsert favicons and inject the splash fragment.
pub fn run<D: Dom>(
    dom: &mut D,
    palette: &Palette,
    assets: &dyn AssetResolver,
) -> Result<EarlyReport, DomError> {
    ensure_head(dom)?;
    let favicons_changed = upsert_favicons(dom, assets)?;
    let book = RuleBook::standard();
    let fragment = book.get(SPLASH_FRAGMENT).ok_or(DomError::MissingNode)?;
    let splash = inject(dom, fragment, palette, assets)?;
    debug!(favicons_changed, ?splash, "early startup complete");
    Ok(EarlyReport {
        favicons_changed,
        splash,
    })
}
