#![forbid(unsafe_code)]

//! [`Engine`]: the theme, rule book and asset resolver bundled with the
//! document operations a pass performs. Every operation swallows backend
//! errors after logging them.

use std::fmt;

use purple_core::ThemeConfig;
use purple_dom::{AssetResolver, Dom};
use tracing::debug;

use crate::active::paint_active;
use crate::identity::{LogoOutcome, apply_title, replace_logo, upsert_favicons};
use crate::painter::Painter;
use crate::rules::RuleBook;
use crate::scrubber::Scrubber;
use crate::theme::{Theme, matches_any};

pub struct Engine {
    theme: Theme,
    rules: RuleBook,
    assets: Box<dyn AssetResolver>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("theme", &self.theme)
            .field("rules", &self.rules.fragments().len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(config: &ThemeConfig, assets: impl AssetResolver + 'static) -> Self {
        Self {
            theme: Theme::new(config),
            rules: RuleBook::standard(),
            assets: Box::new(assets),
        }
    }

    #[must_use]
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    #[must_use]
    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    #[must_use]
    pub fn assets(&self) -> &dyn AssetResolver {
        self.assets.as_ref()
    }

    #[must_use]
    pub fn painter(&self) -> Painter<'_> {
        Painter::new(&self.theme)
    }

    #[must_use]
    pub fn scrubber(&self) -> Scrubber<'_> {
        Scrubber::new(&self.theme)
    }

    pub fn ensure_rules<D: Dom>(&self, dom: &mut D) -> usize {
        self.rules
            .ensure_all(dom, &self.theme.palette, self.assets.as_ref())
    }

    pub fn refresh_rules<D: Dom>(&self, dom: &mut D) -> usize {
        self.rules
            .refresh_volatile(dom, &self.theme.palette, self.assets.as_ref())
    }

    pub fn replace_logo<D: Dom>(&self, dom: &mut D) -> Option<LogoOutcome> {
        replace_logo(dom, &self.theme.logo_candidates, &self.theme.palette)
            .inspect_err(|err| debug!(%err, "logo replacement failed"))
            .ok()
    }

    pub fn upsert_favicons<D: Dom>(&self, dom: &mut D) -> usize {
        upsert_favicons(dom, self.assets.as_ref())
            .inspect_err(|err| debug!(%err, "favicon upsert failed"))
            .unwrap_or(0)
    }

    pub fn rewrite_title<D: Dom>(&self, dom: &mut D) -> bool {
        apply_title(dom)
            .inspect_err(|err| debug!(%err, "title rewrite failed"))
            .unwrap_or(false)
    }

    pub fn paint_active<D: Dom>(&self, dom: &mut D) -> usize {
        paint_active(dom, &self.theme)
    }

    /// Whether `node` is, or contains, part of the identity region.
    pub fn touches_identity<D: Dom>(&self, dom: &D, node: &D::Node) -> bool {
        let selector = self.theme.identity.as_str();
        matches_any(dom, node, selector)
            || (!selector.is_empty() && dom.query_selector(Some(node), selector).is_some())
    }
}
