#![forbid(unsafe_code)]

//! Static Rule Injector.
//!
//! Each [`Fragment`] is one `<style id=…>` element in `<head>`. Fragments
//! are rendered from the palette at injection time and appended in
//! [`RuleBook`] order, general rules first, so later (more specific)
//! fragments win ties in source order. All declarations are `!important`.
//!
//! Injection is idempotent per id: a present [`Refresh::Once`] fragment is
//! left alone, a [`Refresh::Always`] fragment is removed and re-appended so
//! it moves to the tail of the cascade.

use purple_core::Palette;
use purple_dom::{AssetResolver, Dom, DomError};
use tracing::debug;

use crate::head::ensure_head;

/// Asset shown in place of the splash-screen graphic.
pub const SPLASH_ASSET: &str = "assets/purple-bird-64.png";

/// How a fragment behaves when it is already in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Inserted once; later injections are no-ops.
    Once,
    /// Re-inserted at the tail of `<head>` on every refresh.
    Always,
}

/// Result of one [`inject`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    Inserted,
    AlreadyPresent,
    Refreshed,
}

/// A named stylesheet fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub id: &'static str,
    pub refresh: Refresh,
    template: &'static str,
}

impl Fragment {
    #[must_use]
    pub const fn new(id: &'static str, refresh: Refresh, template: &'static str) -> Self {
        Self {
            id,
            refresh,
            template,
        }
    }

    /// Render the fragment's CSS for `palette`.
    #[must_use]
    pub fn css(&self, palette: &Palette, assets: &dyn AssetResolver) -> String {
        let mut css = self
            .template
            .replace("$accent", &palette.accent)
            .replace("$hover", &palette.accent_hover)
            .replace("$muted", &palette.accent_disabled)
            .replace("$neutral", &palette.neutral)
            .replace("$ink", &palette.on_accent);
        if css.contains("$splash_url") {
            css = css.replace("$splash_url", &assets.resolve(SPLASH_ASSET));
        }
        css
    }
}

/// Insert `fragment` into `<head>` unless it is already present.
pub fn inject<D: Dom>(
    dom: &mut D,
    fragment: &Fragment,
    palette: &Palette,
    assets: &dyn AssetResolver,
) -> Result<Injection, DomError> {
    let existing = dom.element_by_id(fragment.id);
    if let Some(existing) = &existing {
        match fragment.refresh {
            Refresh::Once => return Ok(Injection::AlreadyPresent),
            Refresh::Always => dom.remove(existing)?,
        }
    }
    let head = ensure_head(dom)?;
    let style = dom.create_element("style")?;
    dom.set_attribute(&style, "id", fragment.id)?;
    dom.set_text_content(&style, &fragment.css(palette, assets))?;
    dom.append_child(&head, &style)?;
    Ok(if existing.is_some() {
        Injection::Refreshed
    } else {
        Injection::Inserted
    })
}

/// Ordered set of fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBook {
    fragments: Vec<Fragment>,
}

impl RuleBook {
    /// The fragments the engine ships, in cascade order.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            fragments: vec![
                Fragment::new("purple-active-nav", Refresh::Always, ACTIVE_NAV),
                Fragment::new("purple-tab-indicator", Refresh::Once, TAB_INDICATOR),
                Fragment::new("purple-composer-toolbar", Refresh::Once, COMPOSER_TOOLBAR),
                Fragment::new("purple-action-bar-reset", Refresh::Once, ACTION_BAR_RESET),
                Fragment::new("purple-action-buttons", Refresh::Once, ACTION_BUTTONS),
                Fragment::new("purple-post-button", Refresh::Once, POST_BUTTON),
                Fragment::new("purple-reply-chip", Refresh::Once, REPLY_CHIP),
                Fragment::new("purple-splash", Refresh::Once, SPLASH),
                Fragment::new("purple-header-reset", Refresh::Once, HEADER_RESET),
                Fragment::new("purple-sidebar-hover", Refresh::Once, SIDEBAR_HOVER),
                Fragment::new("purple-hover-leak", Refresh::Once, HOVER_LEAK),
            ],
        }
    }

    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.id == id)
    }

    /// Insert every fragment that is missing. Returns how many were inserted.
    pub fn ensure_all<D: Dom>(
        &self,
        dom: &mut D,
        palette: &Palette,
        assets: &dyn AssetResolver,
    ) -> usize {
        let mut inserted = 0;
        for fragment in &self.fragments {
            if dom.element_by_id(fragment.id).is_some() {
                continue;
            }
            match inject(dom, fragment, palette, assets) {
                Ok(Injection::Inserted) => inserted += 1,
                Ok(_) => {}
                Err(err) => debug!(%err, id = fragment.id, "fragment injection failed"),
            }
        }
        inserted
    }

    /// Re-append every [`Refresh::Always`] fragment at the tail of `<head>`.
    pub fn refresh_volatile<D: Dom>(
        &self,
        dom: &mut D,
        palette: &Palette,
        assets: &dyn AssetResolver,
    ) -> usize {
        let mut refreshed = 0;
        for fragment in self.fragments.iter().filter(|f| f.refresh == Refresh::Always) {
            match inject(dom, fragment, palette, assets) {
                Ok(_) => refreshed += 1,
                Err(err) => debug!(%err, id = fragment.id, "fragment refresh failed"),
            }
        }
        refreshed
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::standard()
    }
}

const ACTIVE_NAV: &str = r#"
nav a[role="link"][aria-current="page"],
nav a[role="link"][aria-selected="true"],
nav [data-testid^="AppTabBar_"][aria-current="page"],
nav [data-testid^="AppTabBar_"][aria-selected="true"],
[role="tab"][aria-selected="true"],
[data-selected="true"] {
  color: $accent !important;
  -webkit-text-fill-color: $accent !important;
  font-weight: 700 !important;
}
nav a[role="link"][aria-current="page"] *,
nav a[role="link"][aria-selected="true"] *,
nav [data-testid^="AppTabBar_"][aria-current="page"] *,
nav [data-testid^="AppTabBar_"][aria-selected="true"] *,
[role="tab"][aria-selected="true"] *,
[data-selected="true"] * {
  color: $accent !important;
  fill: $accent !important;
  stroke: $accent !important;
  -webkit-text-fill-color: $accent !important;
  border-color: $accent !important;
}
"#;

const TAB_INDICATOR: &str = r#"
[role="tablist"] [role="tab"][aria-selected="true"] div > div:last-child:empty {
  background-color: $accent !important;
}
"#;

const COMPOSER_TOOLBAR: &str = r#"
[data-testid="toolBar"] [role="button"] svg,
[data-testid="toolBar"] [role="button"] svg * {
  color: $accent !important;
  fill: $accent !important;
}
[data-testid="toolBar"] [role="button"]:hover {
  background-color: $hover !important;
}
[data-testid="toolBar"] [role="button"][aria-disabled="true"] svg,
[data-testid="toolBar"] [role="button"][aria-disabled="true"] svg * {
  color: $muted !important;
  fill: $muted !important;
}
"#;

const ACTION_BAR_RESET: &str = r#"
article [role="group"] [role="button"],
article [role="group"] [role="button"] *,
article [role="group"] a,
article [role="group"] a * {
  color: $neutral !important;
  -webkit-text-fill-color: $neutral !important;
  border-color: transparent !important;
  filter: none !important;
  text-shadow: none !important;
}
article [role="group"] [role="button"] div,
article [role="group"] a div {
  background-color: transparent !important;
}
"#;

const ACTION_BUTTONS: &str = r#"
article [role="group"] [data-testid="reply"]:hover,
article [role="group"] [data-testid="reply"]:hover *,
article [role="group"] [data-testid="bookmark"]:hover,
article [role="group"] [data-testid="bookmark"]:hover *,
article [role="group"] [data-testid="removeBookmark"],
article [role="group"] [data-testid="removeBookmark"] *,
article [role="group"] [aria-label="Share post"]:hover,
article [role="group"] [aria-label="Share post"]:hover *,
article [role="group"] a[href$="/analytics"]:hover,
article [role="group"] a[href$="/analytics"]:hover * {
  color: $accent !important;
  -webkit-text-fill-color: $accent !important;
}
article [role="group"] [data-testid="reply"]:hover div,
article [role="group"] [data-testid="bookmark"]:hover div,
article [role="group"] [aria-label="Share post"]:hover div,
article [role="group"] a[href$="/analytics"]:hover div {
  background-color: $hover !important;
}
article [role="group"] [data-testid="retweet"]:hover,
article [role="group"] [data-testid="retweet"]:hover *,
article [role="group"] [data-testid="unretweet"],
article [role="group"] [data-testid="unretweet"] * {
  color: rgb(0, 186, 124) !important;
  -webkit-text-fill-color: rgb(0, 186, 124) !important;
}
article [role="group"] [data-testid="retweet"]:hover div {
  background-color: rgba(0, 186, 124, 0.1) !important;
}
article [role="group"] [data-testid="like"]:hover,
article [role="group"] [data-testid="like"]:hover *,
article [role="group"] [data-testid="unlike"],
article [role="group"] [data-testid="unlike"] * {
  color: rgb(249, 24, 128) !important;
  -webkit-text-fill-color: rgb(249, 24, 128) !important;
}
article [role="group"] [data-testid="like"]:hover div {
  background-color: rgba(249, 24, 128, 0.1) !important;
}
"#;

const POST_BUTTON: &str = r#"
[data-testid="tweetButtonInline"],
[data-testid="tweetButton"],
[data-testid="SideNav_NewTweet_Button"] {
  background-color: $accent !important;
  border-color: $accent !important;
}
[data-testid="tweetButtonInline"] *,
[data-testid="tweetButton"] *,
[data-testid="SideNav_NewTweet_Button"] * {
  color: $ink !important;
  -webkit-text-fill-color: $ink !important;
}
[data-testid="tweetButtonInline"][aria-disabled="true"],
[data-testid="tweetButton"][aria-disabled="true"] {
  background-color: $muted !important;
  border-color: transparent !important;
}
[data-testid="tweetButtonInline"]:hover:not([aria-disabled="true"]),
[data-testid="tweetButton"]:hover:not([aria-disabled="true"]),
[data-testid="SideNav_NewTweet_Button"]:hover {
  filter: brightness(0.92) !important;
}
"#;

const REPLY_CHIP: &str = r#"
[data-testid="tweetText"] a,
[data-testid="tweetText"] a *,
[aria-label^="Replying to"] a,
[aria-label^="Replying to"] a *,
[data-testid="inline_reply_offscreen"] a {
  color: $accent !important;
  -webkit-text-fill-color: $accent !important;
}
"#;

const SPLASH: &str = r#"
[data-testid="SplashScreen"] svg {
  display: none !important;
}
[data-testid="SplashScreen"] {
  position: relative !important;
}
[data-testid="SplashScreen"]::after {
  content: "" !important;
  position: absolute !important;
  inset: 0 !important;
  margin: auto !important;
  width: 64px !important;
  height: 64px !important;
  background: url("$splash_url") center / contain no-repeat !important;
  pointer-events: none !important;
  display: block !important;
}
"#;

const HEADER_RESET: &str = r#"
article [data-testid="caret"],
article [data-testid="caret"] * {
  color: $neutral !important;
  -webkit-text-fill-color: $neutral !important;
  background-color: transparent !important;
  filter: none !important;
}
article [data-testid="caret"]:hover svg,
article [data-testid="caret"]:hover svg * {
  color: $accent !important;
}
article [data-testid="caret"]:hover > div {
  background-color: $hover !important;
}
"#;

const SIDEBAR_HOVER: &str = r#"
[data-testid="sidebarColumn"] [data-testid="trend"]:hover,
[data-testid="sidebarColumn"] [role="link"]:hover {
  background-color: $hover !important;
}
[data-testid="sidebarColumn"] a[href^="/i/trends"] span,
[data-testid="sidebarColumn"] a[href="/explore/tabs/for-you"] span {
  color: $accent !important;
}
"#;

const HOVER_LEAK: &str = r#"
[role="button"]:hover:not([data-testid="tweetButtonInline"]):not([data-testid="tweetButton"]):not([data-testid="SideNav_NewTweet_Button"]):not([data-testid="caret"]):not(article [role="group"] *):not([data-testid="sidebarColumn"] *):not([data-testid="toolBar"] *) {
  background-color: $hover !important;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use purple_dom::{MemoryDom, PrefixResolver};

    fn book() -> (RuleBook, Palette, PrefixResolver) {
        (
            RuleBook::standard(),
            Palette::default(),
            PrefixResolver::new("chrome-extension://abc"),
        )
    }

    fn head_ids(dom: &MemoryDom) -> Vec<String> {
        let head = dom.head().unwrap();
        dom.children(head)
            .into_iter()
            .filter_map(|n| dom.attribute(&n, "id"))
            .collect()
    }

    #[test]
    fn standard_book_is_ordered_and_unique() {
        let (book, _, _) = book();
        let ids: Vec<&str> = book.fragments().iter().map(|f| f.id).collect();
        assert_eq!(ids.len(), 11);
        let reset = ids.iter().position(|i| *i == "purple-action-bar-reset").unwrap();
        let buttons = ids.iter().position(|i| *i == "purple-action-buttons").unwrap();
        assert!(reset < buttons);
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
        assert_eq!(book.get("purple-active-nav").unwrap().refresh, Refresh::Always);
    }

    #[test]
    fn every_declaration_is_important() {
        let (book, palette, assets) = book();
        for fragment in book.fragments() {
            let css = fragment.css(&palette, &assets);
            // `$=` is a legitimate attribute operator; only named tokens count.
            for token in ["$accent", "$hover", "$muted", "$neutral", "$ink", "$splash_url"] {
                assert!(!css.contains(token), "{} left {token}", fragment.id);
            }
            for block in css.split('}') {
                let Some((_, body)) = block.split_once('{') else {
                    continue;
                };
                for decl in body.split(';').map(str::trim).filter(|d| !d.is_empty()) {
                    assert!(decl.ends_with("!important"), "{}: {decl}", fragment.id);
                }
            }
        }
    }

    #[test]
    fn css_uses_palette_and_assets() {
        let (book, palette, assets) = book();
        let nav = book.get("purple-active-nav").unwrap().css(&palette, &assets);
        assert!(nav.contains("color: #8B5CF6 !important"));
        let splash = book.get("purple-splash").unwrap().css(&palette, &assets);
        assert!(splash.contains("url(\"chrome-extension://abc/assets/purple-bird-64.png\")"));
        let post = book.get("purple-post-button").unwrap().css(&palette, &assets);
        assert!(post.contains("rgba(139, 92, 246, 0.5)"));
    }

    #[test]
    fn inject_is_idempotent() {
        let (book, palette, assets) = book();
        let mut dom = MemoryDom::new();
        let fragment = book.get("purple-splash").unwrap();
        assert_eq!(inject(&mut dom, fragment, &palette, &assets).unwrap(), Injection::Inserted);
        assert_eq!(
            inject(&mut dom, fragment, &palette, &assets).unwrap(),
            Injection::AlreadyPresent
        );
        assert_eq!(head_ids(&dom), vec!["purple-splash"]);
    }

    #[test]
    fn ensure_all_then_refresh_keeps_one_of_each() {
        let (book, palette, assets) = book();
        let mut dom = MemoryDom::new();
        assert_eq!(book.ensure_all(&mut dom, &palette, &assets), 11);
        assert_eq!(book.ensure_all(&mut dom, &palette, &assets), 0);
        assert_eq!(book.refresh_volatile(&mut dom, &palette, &assets), 1);
        assert_eq!(book.refresh_volatile(&mut dom, &palette, &assets), 1);

        let ids = head_ids(&dom);
        assert_eq!(ids.len(), 11);
        assert_eq!(ids.last().map(String::as_str), Some("purple-active-nav"));
        assert_eq!(ids[0], "purple-tab-indicator");
    }

    #[test]
    fn refreshed_fragment_reports_refreshed() {
        let (book, palette, assets) = book();
        let mut dom = MemoryDom::new();
        let nav = book.get("purple-active-nav").unwrap();
        assert_eq!(inject(&mut dom, nav, &palette, &assets).unwrap(), Injection::Inserted);
        assert_eq!(inject(&mut dom, nav, &palette, &assets).unwrap(), Injection::Refreshed);
    }

    #[test]
    fn dropped_fragment_heals() {
        let (book, palette, assets) = book();
        let mut dom = MemoryDom::new();
        book.ensure_all(&mut dom, &palette, &assets);
        let gone = dom.element_by_id("purple-post-button").unwrap();
        dom.remove(&gone).unwrap();
        assert_eq!(book.ensure_all(&mut dom, &palette, &assets), 1);
        assert!(dom.element_by_id("purple-post-button").is_some());
    }

    #[test]
    fn injection_creates_missing_head() {
        let (book, palette, assets) = book();
        let mut dom = MemoryDom::bare();
        inject(&mut dom, book.get("purple-splash").unwrap(), &palette, &assets).unwrap();
        assert!(dom.head().is_some());
    }
}
