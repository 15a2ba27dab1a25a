#![forbid(unsafe_code)]

//! Self-stabilizing re-theming engine.
//!
//! Recolors blue-branded UI to the palette accent, swaps the logo and
//! favicons, and keeps doing so while the page re-renders underneath it.
//! Everything is generic over [`purple_dom::Dom`]; the browser host lives in
//! `purple-web`.
//!
//! # Pieces
//!
//! - [`mutator::Mutator`] writes and removes inline overrides.
//! - [`painter::Painter`] forces the accent onto blueish computed colors.
//! - [`rules::RuleBook`] owns the injected stylesheet fragments.
//! - [`scrubber::Scrubber`] hands stylesheet-owned regions back to the rules.
//! - [`identity`] replaces logo, favicons and title.
//! - [`coordinator::Coordinator`] turns the change stream into coalesced,
//!   suppressed passes.
//!
//! # Example
//!
//! ```
//! use purple_core::ThemeConfig;
//! use purple_dom::{Dom, MemoryDom, PrefixResolver};
//! use purple_engine::{Coordinator, Wakeup};
//!
//! let mut dom = MemoryDom::new();
//! let mut engine = Coordinator::new(&ThemeConfig::default(), PrefixResolver::default());
//! engine.start(&mut dom);
//!
//! let body = dom.body().unwrap();
//! let added = dom.append_markup(body, "<div/>").unwrap();
//! dom.set_computed(added[0], "background-color", "rgb(29, 155, 240)").unwrap();
//! let changes = dom.take_changes();
//! engine.observe_all(&dom, changes);
//! assert_eq!(engine.take_wakeups(), vec![Wakeup::AnimationFrame]);
//!
//! engine.flush(&mut dom);
//! assert_eq!(
//!     dom.inline_style(&added[0], "background-color").unwrap().value,
//!     "#8B5CF6"
//! );
//! ```

pub mod active;
pub mod coordinator;
pub mod early;
pub mod engine;
pub mod head;
pub mod identity;
pub mod mutator;
pub mod painter;
pub mod pending;
pub mod rules;
pub mod scrubber;
pub mod suppress;
pub mod theme;

pub use coordinator::{Coordinator, PassReport, PassStats, PointerKind, Task, TickReport, Wakeup};
pub use engine::Engine;
pub use identity::{ICON_LINKS, LOGO_MARKER, LogoOutcome};
pub use mutator::{Mutator, SvgPaint};
pub use painter::{PaintReport, Painter};
pub use rules::{Fragment, Injection, Refresh, RuleBook};
pub use scrubber::{SCRUBBED_PROPERTIES, Scrubber, scrub_region};
pub use suppress::{SuppressionGuard, Suppressor};
pub use theme::Theme;
