//! glide: a server-side bridge between a declarative page description and
//! client-rendered slider widgets.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use glide_core::prelude::*;
//!
//! # async fn demo() -> Result<(), AppError> {
//! Application::new()
//!     .title("Slides")
//!     .layout_markup(r#"
//!         Div {
//!             DashSwiper { id: "my-swiper" loop: true }
//!             P "Slide 1" { id: "active-label" }
//!         }
//!     "#)
//!     .callback(
//!         [Target::new("my-swiper", "activeIndex")],
//!         [Target::new("active-label", "text")],
//!         handler::from_fn1(|index| {
//!             Ok(Output::one(format!("Slide {}", index.as_u64().unwrap_or(0) + 1)))
//!         }),
//!     )
//!     .run()
//!     .await
//! # }
//! ```
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`schema`] | `PropKind`, `PropertySpec`, `WidgetDefinition` |
//! | [`builtin`] | `DashSwiper`, `DashCarousel`, shader catalogue |
//! | [`registry`] | `WidgetRegistry` |
//! | [`component`] | `ComponentInstance`, `ValidationError` |
//! | [`layout`] | `Layout`, `LayoutNode`, `Container`, `Leaf` |
//! | [`markup`] | `.glide` markup to layout tree |
//! | [`callback`] | `CallbackBridge`, handlers, `AttributeStore` |
//! | [`protocol`] | JSON request/response types |
//! | [`server`] | axum routes |
//! | [`app`] | `Application` builder |

pub mod app;
pub mod assets;
pub mod builtin;
pub mod callback;
pub mod component;
pub mod config;
pub mod layout;
pub mod logging;
pub mod markup;
pub mod protocol;
pub mod registry;
pub mod schema;
pub mod server;

pub use app::{App, AppError, Application};

/// The types most applications need.
pub mod prelude {
    pub use crate::app::{App, AppError, Application};
    pub use crate::assets::AssetResolver;
    pub use crate::callback::handler;
    pub use crate::callback::{CallbackBridge, InvocationPolicy, Outcome, Output, Target};
    pub use crate::component::{ComponentInstance, Fields};
    pub use crate::config::AppConfig;
    pub use crate::layout::{Container, Layout, LayoutNode, Leaf};
    pub use crate::logging::{LoggingConfig, init_logging};
    pub use crate::registry::WidgetRegistry;
}
