pub mod bounds;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod interaction;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod overrides;
pub mod render;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutSettings, load_config};
pub use error::{Error, Result};
pub use interaction::{InteractionManager, LayoutCallbacks};
pub use ir::{PrintDocument, parse_document, read_document};
pub use layout::LayoutEngine;
pub use overrides::PositionOverrides;
pub use render::{Scene, compute_scene, render_svg};
