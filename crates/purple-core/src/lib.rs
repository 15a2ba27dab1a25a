#![forbid(unsafe_code)]

//! Shared vocabulary for the purple re-theming engine.
//!
//! # This crate provides
//! - [`color`]: CSS color parsing and the blueish / whiteish classifier.
//! - [`config`]: [`ThemeConfig`], the palette and the page region selectors.
//! - [`title`]: the document title rewrite rules.
//!
//! Nothing here touches a document; `purple-engine` combines these pieces
//! with a `purple-dom` backend.

pub mod color;
pub mod config;
pub mod title;

pub use color::{Category, Hsv, Rgb, classify, classify_opt, is_blueish, is_whiteish, parse_css_color};
pub use config::{ConfigError, DEFAULT_ACCENT, Palette, RegionSelectors, ThemeConfig, selector_list};
pub use title::rewrite_title;
