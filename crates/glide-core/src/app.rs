use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use glide_markup::error::ParseError;
use thiserror::Error;

use crate::assets::AssetResolver;
use crate::callback::{CallbackBridge, CallbackError, Handler, Target};
use crate::config::{AppConfig, ConfigError};
use crate::layout::{Layout, LayoutError, LayoutNode};
use crate::markup::{BuildError, MarkupLoader};
use crate::registry::{RegistryError, WidgetRegistry};
use crate::schema::WidgetDefinition;
use crate::server;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("component `{alias}`: {source}")]
    Component {
        alias: String,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Markup(#[from] BuildError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("callback #{index}: {source}")]
    Callback {
        index: usize,
        #[source]
        source: CallbackError,
    },
    #[error("no layout was given")]
    NoLayout,
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

enum LayoutSource {
    Node(LayoutNode),
    Markup(String),
}

struct PendingCallback {
    sources: Vec<Target>,
    destinations: Vec<Target>,
    handler: Box<dyn Handler>,
}

// ── Application ───────────────────────────────────────────────────────────

/// Top-level application builder.
///
/// Describe the page and its callbacks, then either [`build`] an [`App`]
/// (for tests or embedding) or [`run`] the HTTP service.
///
/// ```rust,ignore
/// Application::new()
///     .title("Slides")
///     .layout_markup(include_str!("../ui/page.glide"))
///     .callback(
///         [Target::new("my-swiper", "activeIndex")],
///         [Target::new("active-label", "text")],
///         handler::from_fn1(|i| Ok(Output::one(format!("Slide {}", i.as_u64().unwrap_or(0) + 1)))),
///     )
///     .run()
///     .await?;
/// ```
///
/// [`build`]: Application::build
/// [`run`]: Application::run
pub struct Application {
    config: AppConfig,
    widgets: Vec<WidgetDefinition>,
    components: Vec<(String, String)>,
    layout: Option<LayoutSource>,
    callbacks: Vec<PendingCallback>,
}

impl Application {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            widgets: Vec::new(),
            components: Vec::new(),
            layout: None,
            callbacks: Vec::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn title(mut self, t: impl Into<String>) -> Self {
        self.config.title = t.into();
        self
    }

    /// Serve files from `dir` under the configured asset URL path.
    pub fn assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.assets_dir = Some(dir.into());
        self
    }

    /// Register a widget next to the built-in ones.
    pub fn widget(mut self, definition: WidgetDefinition) -> Self {
        self.widgets.push(definition);
        self
    }

    /// Register a markup source under `alias` so layout markup can
    /// `import "..." as Alias` it.
    pub fn component(mut self, alias: impl Into<String>, src: impl Into<String>) -> Self {
        self.components.push((alias.into(), src.into()));
        self
    }

    /// Use a tree built with the Rust API.
    pub fn layout(mut self, root: impl Into<LayoutNode>) -> Self {
        self.layout = Some(LayoutSource::Node(root.into()));
        self
    }

    /// Use a tree described in `.glide` markup.
    pub fn layout_markup(mut self, src: impl Into<String>) -> Self {
        self.layout = Some(LayoutSource::Markup(src.into()));
        self
    }

    pub fn callback<H: Handler>(
        mut self,
        sources: impl IntoIterator<Item = Target>,
        destinations: impl IntoIterator<Item = Target>,
        handler: H,
    ) -> Self {
        self.callbacks.push(PendingCallback {
            sources: sources.into_iter().collect(),
            destinations: destinations.into_iter().collect(),
            handler: Box::new(handler),
        });
        self
    }

    /// Assemble the layout and register every callback. The first problem
    /// found is returned.
    pub fn build(self) -> Result<App, AppError> {
        let mut registry = WidgetRegistry::with_builtins()?;
        for definition in self.widgets {
            registry.register(definition)?;
        }

        let root = match self.layout {
            Some(LayoutSource::Node(node)) => node,
            Some(LayoutSource::Markup(src)) => {
                let mut loader = MarkupLoader::new(AssetResolver::new(&self.config.assets_url_path));
                for (alias, src) in &self.components {
                    loader
                        .parse_and_register(alias.as_str(), src)
                        .map_err(|source| AppError::Component { alias: alias.clone(), source })?;
                }
                loader.load(&src, &registry)?
            }
            None => return Err(AppError::NoLayout),
        };
        let layout = Arc::new(Layout::assemble(root)?);

        let mut bridge = CallbackBridge::new(layout, self.config.invocation_policy);
        for (index, cb) in self.callbacks.into_iter().enumerate() {
            bridge
                .register(cb.sources, cb.destinations, cb.handler)
                .map_err(|source| AppError::Callback { index, source })?;
        }
        log::info!(
            "{}: {} layout nodes, {} callbacks",
            self.config.title,
            bridge.layout().walk().len(),
            bridge.len()
        );

        Ok(App { config: self.config, bridge: Arc::new(bridge) })
    }

    /// Build, then serve until the process is stopped.
    pub async fn run(self) -> Result<(), AppError> {
        self.build()?.serve().await
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

// ── App ───────────────────────────────────────────────────────────────────

/// A built application: assembled layout plus live callback bridge.
pub struct App {
    config: AppConfig,
    bridge: Arc<CallbackBridge>,
}

impl App {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        self.bridge.layout()
    }

    pub fn bridge(&self) -> &Arc<CallbackBridge> {
        &self.bridge
    }

    pub fn router(&self) -> Router {
        let router = server::router(Arc::clone(&self.bridge));
        match &self.config.assets_dir {
            Some(dir) => server::with_assets(router, &self.config.assets_url_path, dir),
            None => router,
        }
    }

    pub async fn serve(self) -> Result<(), AppError> {
        let addr = self.config.bind_address();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        log::info!("{} listening on http://{addr}", self.config.title);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}
