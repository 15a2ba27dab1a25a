#![forbid(unsafe_code)]

//! Identity Replacer: logo, favicons and document title.
//!
//! All three operations are idempotent. The replaced logo carries a
//! [`LOGO_MARKER`] attribute so later passes recognise it; favicons are
//! matched by `(rel, sizes)` and updated in place.

use purple_core::{Palette, rewrite_title};
use purple_dom::{AssetResolver, Dom, DomError, Priority};

use crate::head::ensure_head;

/// Attribute carried by the injected logo.
pub const LOGO_MARKER: &str = "data-purple-logo";

/// Logo template; `{{accent}}` is replaced with the palette accent.
pub const LOGO_TEMPLATE: &str = include_str!("../assets/purple-bird.svg");

/// Used for either dimension when the original graphic is not laid out.
pub const DEFAULT_LOGO_SIZE: f64 = 24.0;

/// One `<link>` the favicon upsert maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconLink {
    pub rel: &'static str,
    pub sizes: Option<&'static str>,
    pub asset: &'static str,
    pub mime: &'static str,
}

impl IconLink {
    const fn png(rel: &'static str, sizes: Option<&'static str>, asset: &'static str) -> Self {
        Self {
            rel,
            sizes,
            asset,
            mime: "image/png",
        }
    }
}

/// Icon links in insertion order.
pub const ICON_LINKS: [IconLink; 5] = [
    IconLink::png("icon", Some("16x16"), "assets/purple-bird-16.png"),
    IconLink::png("icon", Some("32x32"), "assets/purple-bird-32.png"),
    IconLink::png("icon", Some("64x64"), "assets/purple-bird-64.png"),
    IconLink::png("shortcut icon", None, "assets/purple-bird-32.png"),
    IconLink::png("apple-touch-icon", Some("180x180"), "assets/purple-bird-180.png"),
];

/// Where the page's logo lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoSite<N> {
    /// The graphic matched by a candidate selector.
    pub graphic: N,
    /// Its parent, whose contents are replaced.
    pub container: N,
}

/// Outcome of [`replace_logo`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogoOutcome {
    /// The logo was swapped and sized to `size` pixels square.
    Replaced { size: f64 },
    AlreadyReplaced,
    NotFound,
}

/// Render the logo template for `palette`.
#[must_use]
pub fn logo_markup(palette: &Palette) -> String {
    LOGO_TEMPLATE.trim().replace("{{accent}}", &palette.accent)
}

/// First candidate whose match has a parent, in candidate order.
pub fn locate_logo<D: Dom>(dom: &D, candidates: &[String]) -> Option<LogoSite<D::Node>> {
    candidates.iter().find_map(|selector| {
        let graphic = dom.query_selector(None, selector)?;
        let container = dom.parent(&graphic)?;
        Some(LogoSite { graphic, container })
    })
}

fn laid_out(dimension: f64) -> f64 {
    if dimension > 0.0 {
        dimension
    } else {
        DEFAULT_LOGO_SIZE
    }
}

/// Swap the page logo for the template.
pub fn replace_logo<D: Dom>(
    dom: &mut D,
    candidates: &[String],
    palette: &Palette,
) -> Result<LogoOutcome, DomError> {
    let Some(site) = locate_logo(dom, candidates) else {
        return Ok(LogoOutcome::NotFound);
    };
    if dom.attribute(&site.graphic, LOGO_MARKER).is_some() {
        return Ok(LogoOutcome::AlreadyReplaced);
    }
    let (width, height) = dom.client_size(&site.graphic);
    let size = laid_out(width).max(laid_out(height));

    dom.set_inner_html(&site.container, &logo_markup(palette))?;
    let svg = dom
        .query_selector(Some(&site.container), "svg")
        .ok_or(DomError::MissingNode)?;
    let px = format!("{size}px");
    dom.set_style(&svg, "width", &px, Priority::Normal)?;
    dom.set_style(&svg, "height", &px, Priority::Normal)?;
    dom.set_style(&svg, "display", "block", Priority::Normal)?;
    Ok(LogoOutcome::Replaced { size })
}

fn set_if_changed<D: Dom>(
    dom: &mut D,
    node: &D::Node,
    name: &str,
    value: &str,
) -> Result<bool, DomError> {
    if dom.attribute(node, name).as_deref() == Some(value) {
        return Ok(false);
    }
    dom.set_attribute(node, name, value)?;
    Ok(true)
}

/// Create or update the `<link>` described by `link`. Returns `true` when
/// anything changed.
pub fn upsert_icon<D: Dom>(
    dom: &mut D,
    link: &IconLink,
    assets: &dyn AssetResolver,
) -> Result<bool, DomError> {
    let head = ensure_head(dom)?;
    let existing = dom
        .query_selector_all(Some(&head), "link")
        .into_iter()
        .find(|node| {
            dom.attribute(node, "rel").as_deref() == Some(link.rel)
                && link
                    .sizes
                    .is_none_or(|sizes| dom.attribute(node, "sizes").as_deref() == Some(sizes))
        });
    let (node, mut changed) = match existing {
        Some(node) => (node, false),
        None => {
            let node = dom.create_element("link")?;
            dom.set_attribute(&node, "rel", link.rel)?;
            dom.append_child(&head, &node)?;
            (node, true)
        }
    };
    changed |= set_if_changed(dom, &node, "href", &assets.resolve(link.asset))?;
    if let Some(sizes) = link.sizes {
        changed |= set_if_changed(dom, &node, "sizes", sizes)?;
    }
    changed |= set_if_changed(dom, &node, "type", link.mime)?;
    Ok(changed)
}

/// Upsert every entry of [`ICON_LINKS`]. Returns how many links changed.
pub fn upsert_favicons<D: Dom>(dom: &mut D, assets: &dyn AssetResolver) -> Result<usize, DomError> {
    let mut changed = 0;
    for link in &ICON_LINKS {
        if upsert_icon(dom, link, assets)? {
            changed += 1;
        }
    }
    Ok(changed)
}

/// Apply the title rewrite. Returns `true` when the title changed.
pub fn apply_title<D: Dom>(dom: &mut D) -> Result<bool, DomError> {
    match rewrite_title(&dom.title()) {
        Some(title) => {
            dom.set_title(&title)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
