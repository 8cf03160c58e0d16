//! Callback bridge: binds renderer-written attributes to handlers whose
//! results are written to other attributes.
//!
//! Every attribute has exactly one writer role. Attributes named as a
//! callback destination are written only by that callback; everything else
//! is written only by the renderer (through [`CallbackBridge::trigger`] or
//! [`CallbackBridge::handle`]).
//!
//! # Ordering
//!
//! Each trigger takes a ticket per bound callback while holding the
//! bridge's sequencer lock, together with the write of the triggering value
//! and the snapshot of the handler's arguments. Invocations then run on
//! their own tasks.
//!
//! * [`InvocationPolicy::LatestWins`]: handlers may overlap. A result is
//!   applied only if its ticket is still the newest one for that callback
//!   when the store's write lock is taken; otherwise it is reported as
//!   [`Outcome::Superseded`] and dropped.
//! * [`InvocationPolicy::Sequential`]: ticket `n + 1` starts only after
//!   ticket `n` has finished, and every result is applied.

pub mod handler;
mod store;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

use crate::component::ValidationError;
use crate::layout::{Layout, LayoutNode};
use crate::protocol::{CallbackRequest, DependencyDescriptor};

pub use handler::{Handler, Output};
pub use store::AttributeStore;

// ── Addresses ─────────────────────────────────────────────────────────────

/// One attribute of one identified layout node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub attribute: String,
}

impl Target {
    pub fn new(id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self { id: id.into(), attribute: attribute.into() }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.id, self.attribute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(pub usize);

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callback#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationPolicy {
    #[default]
    LatestWins,
    Sequential,
}

// ── Errors and outcomes ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallbackError {
    #[error("no node `{id}` with attribute `{attribute}` in the layout")]
    UnknownTarget { id: String, attribute: String },
    #[error("handler takes {arity} argument(s) but {sources} source(s) are declared")]
    ArityMismatch { sources: usize, arity: usize },
    #[error("a callback needs at least one source")]
    NoSources,
    #[error("a callback needs at least one destination")]
    NoDestinations,
    #[error("`{0}` already has a callback writer")]
    DuplicateDestination(Target),
    #[error("`{0}` is both a source and a destination of the same callback")]
    WriterConflict(Target),
    #[error("`{target}` would be written by {writer} and read by {reader}; callback writes do not trigger callbacks")]
    ChainedTarget { target: Target, writer: CallbackId, reader: CallbackId },
    #[error("`{target}` is written by {owner}, not by the renderer")]
    NotRendererOwned { target: Target, owner: CallbackId },
    #[error("invalid value for `{target}`: {source}")]
    InvalidValue {
        target: Target,
        #[source]
        source: ValidationError,
    },
    #[error("no callback declares outputs [{}]", join(.0))]
    UnknownCallback(Vec<Target>),
    #[error("`{target}` is not a source of {callback}")]
    NotASource { target: Target, callback: CallbackId },
}

/// Result of one callback invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Destinations written, in destination order.
    Applied(Vec<(Target, Value)>),
    /// The handler returned [`Output::NoUpdate`]; nothing was written.
    Suppressed,
    /// A newer trigger of the same callback took over; the result was dropped.
    Superseded,
    /// The handler failed or returned an unusable result; nothing was written.
    Failed(String),
}

fn join(targets: &[Target]) -> String {
    targets.iter().map(Target::to_string).collect::<Vec<_>>().join(", ")
}

// ── Registered callbacks ──────────────────────────────────────────────────

struct Callback {
    id: CallbackId,
    sources: Vec<Target>,
    destinations: Vec<Target>,
    handler: Box<dyn Handler>,
    /// Newest ticket handed out.
    issued: AtomicU64,
    /// Highest ticket that has finished (sequential policy).
    done: watch::Sender<u64>,
}

impl Callback {
    fn is_current(&self, ticket: u64) -> bool {
        self.issued.load(Ordering::Acquire) == ticket
    }

    async fn wait_turn(&self, ticket: u64) -> Turn<'_> {
        let mut done = self.done.subscribe();
        // Cannot fail: the sender lives in `self`.
        let _ = done.wait_for(|&finished| finished + 1 >= ticket).await;
        Turn { callback: self, ticket }
    }
}

/// Marks a ticket finished when dropped.
struct Turn<'a> {
    callback: &'a Callback,
    ticket: u64,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        let ticket = self.ticket;
        self.callback.done.send_modify(|finished| *finished = (*finished).max(ticket));
    }
}

/// A scheduled invocation, ready to run on its own task.
struct Invocation {
    callback: Arc<Callback>,
    store: Arc<AttributeStore>,
    layout: Arc<Layout>,
    policy: InvocationPolicy,
    ticket: u64,
    args: Vec<Value>,
}

impl Invocation {
    async fn run(self) -> Outcome {
        let Invocation { callback, store, layout, policy, ticket, args } = self;
        let _turn = match policy {
            InvocationPolicy::Sequential => Some(callback.wait_turn(ticket).await),
            InvocationPolicy::LatestWins => None,
        };

        log::debug!("{} invoked (ticket {ticket})", callback.id);
        let writes = match callback.handler.call(args).await {
            Ok(Output::NoUpdate) => None,
            Ok(Output::Update(values)) => Some(prepare_writes(&layout, &callback.destinations, values)),
            Err(e) => Some(Err(format!("{e:#}"))),
        };

        let stale = || policy == InvocationPolicy::LatestWins && !callback.is_current(ticket);
        let outcome = match writes {
            None if stale() => Outcome::Superseded,
            None => Outcome::Suppressed,
            Some(Err(_)) if stale() => Outcome::Superseded,
            Some(Err(message)) => {
                log::warn!("{} failed: {message}", callback.id);
                Outcome::Failed(message)
            }
            Some(Ok(writes)) => {
                let applied = match policy {
                    InvocationPolicy::LatestWins => store.apply_if(&writes, || callback.is_current(ticket)),
                    InvocationPolicy::Sequential => {
                        store.apply(&writes);
                        true
                    }
                };
                if applied { Outcome::Applied(writes) } else { Outcome::Superseded }
            }
        };
        if outcome == Outcome::Superseded {
            log::debug!("{} ticket {ticket} superseded, result dropped", callback.id);
        }
        outcome
    }
}

fn prepare_writes(
    layout: &Layout,
    destinations: &[Target],
    values: Vec<Value>,
) -> Result<Vec<(Target, Value)>, String> {
    if values.len() != destinations.len() {
        return Err(format!(
            "handler returned {} value(s) for {} destination(s)",
            values.len(),
            destinations.len()
        ));
    }
    let writes: Vec<_> = destinations.iter().cloned().zip(values).collect();
    for (target, value) in &writes {
        check_value(layout, target, value).map_err(|e| e.to_string())?;
    }
    Ok(writes)
}

/// Component attributes are checked against the widget schema; container
/// and leaf attributes take any value.
fn check_value(layout: &Layout, target: &Target, value: &Value) -> Result<(), CallbackError> {
    match layout.find(&target.id) {
        Some(LayoutNode::Component(component)) => component
            .validate_update(&target.attribute, value)
            .map_err(|source| CallbackError::InvalidValue { target: target.clone(), source }),
        _ => Ok(()),
    }
}

// ── Bridge ────────────────────────────────────────────────────────────────

pub struct CallbackBridge {
    layout: Arc<Layout>,
    policy: InvocationPolicy,
    store: Arc<AttributeStore>,
    callbacks: Vec<Arc<Callback>>,
    by_source: HashMap<Target, Vec<CallbackId>>,
    writers: HashMap<Target, CallbackId>,
    sequencer: Mutex<()>,
}

impl fmt::Debug for CallbackBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackBridge")
            .field("policy", &self.policy)
            .field("callbacks", &self.callbacks.len())
            .finish_non_exhaustive()
    }
}

impl CallbackBridge {
    pub fn new(layout: Arc<Layout>, policy: InvocationPolicy) -> Self {
        let store = Arc::new(AttributeStore::from_layout(&layout));
        Self {
            layout,
            policy,
            store,
            callbacks: Vec::new(),
            by_source: HashMap::new(),
            writers: HashMap::new(),
            sequencer: Mutex::new(()),
        }
    }

    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    pub fn policy(&self) -> InvocationPolicy {
        self.policy
    }

    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    /// Current value of `target`, if it has one.
    pub fn value(&self, target: &Target) -> Option<Value> {
        self.store.get(target)
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Bind `handler` to `sources` and `destinations`. Every address must
    /// exist in the layout and no destination may already have a writer.
    pub fn register<H: Handler>(
        &mut self,
        sources: impl IntoIterator<Item = Target>,
        destinations: impl IntoIterator<Item = Target>,
        handler: H,
    ) -> Result<CallbackId, CallbackError> {
        let sources: Vec<Target> = sources.into_iter().collect();
        let destinations: Vec<Target> = destinations.into_iter().collect();

        if sources.is_empty() {
            return Err(CallbackError::NoSources);
        }
        if destinations.is_empty() {
            return Err(CallbackError::NoDestinations);
        }
        for target in sources.iter().chain(&destinations) {
            if !self.layout.has_attribute(&target.id, &target.attribute) {
                return Err(CallbackError::UnknownTarget {
                    id: target.id.clone(),
                    attribute: target.attribute.clone(),
                });
            }
        }
        if let Some(arity) = handler.arity() {
            if arity != sources.len() {
                return Err(CallbackError::ArityMismatch { sources: sources.len(), arity });
            }
        }
        for (i, target) in destinations.iter().enumerate() {
            if destinations[..i].contains(target) || self.writers.contains_key(target) {
                return Err(CallbackError::DuplicateDestination(target.clone()));
            }
            if sources.contains(target) {
                return Err(CallbackError::WriterConflict(target.clone()));
            }
        }

        // Sources must stay renderer-written, in either registration order.
        let id = CallbackId(self.callbacks.len());
        for target in &sources {
            if let Some(&writer) = self.writers.get(target) {
                return Err(CallbackError::ChainedTarget { target: target.clone(), writer, reader: id });
            }
        }
        for target in &destinations {
            if let Some(&reader) = self.by_source.get(target).and_then(|ids| ids.first()) {
                return Err(CallbackError::ChainedTarget { target: target.clone(), writer: id, reader });
            }
        }

        log::info!("registered {id}: [{}] -> [{}]", join(&sources), join(&destinations));
        for target in &destinations {
            self.writers.insert(target.clone(), id);
        }
        for target in &sources {
            self.by_source.entry(target.clone()).or_default().push(id);
        }
        self.callbacks.push(Arc::new(Callback {
            id,
            sources,
            destinations,
            handler: Box::new(handler),
            issued: AtomicU64::new(0),
            done: watch::channel(0).0,
        }));
        Ok(id)
    }

    /// The renderer changed `source` to `value`: store it and invoke every
    /// callback bound to it. Outcomes are returned in registration order.
    pub async fn trigger(
        &self,
        source: Target,
        value: Value,
    ) -> Result<Vec<(CallbackId, Outcome)>, CallbackError> {
        self.check_renderer_write(&source, &value)?;
        let bound: Vec<Arc<Callback>> = self
            .by_source
            .get(&source)
            .into_iter()
            .flatten()
            .map(|id| Arc::clone(&self.callbacks[id.0]))
            .collect();

        let pending = {
            let _order = self.sequencer.lock().unwrap_or_else(PoisonError::into_inner);
            log::debug!("trigger {source} = {value}");
            self.store.set(source, value);
            bound.into_iter().map(|cb| self.schedule(cb)).collect::<Vec<_>>()
        };
        Ok(self.dispatch(pending).await)
    }

    /// Invoke the callback whose destinations are exactly `request.outputs`.
    pub async fn handle(&self, request: CallbackRequest) -> Result<Outcome, CallbackError> {
        let callback = self
            .callbacks
            .iter()
            .find(|cb| cb.destinations == request.outputs)
            .ok_or_else(|| CallbackError::UnknownCallback(request.outputs.clone()))?;

        let source = Target::new(request.trigger.id, request.trigger.attribute);
        if !callback.sources.contains(&source) {
            return Err(CallbackError::NotASource { target: source, callback: callback.id });
        }
        let value = request.trigger.value;
        self.check_renderer_write(&source, &value)?;

        let pending = {
            let _order = self.sequencer.lock().unwrap_or_else(PoisonError::into_inner);
            self.store.set(source, value);
            self.schedule(Arc::clone(callback))
        };
        let mut outcomes = self.dispatch(vec![pending]).await;
        Ok(outcomes.pop().map(|(_, o)| o).unwrap_or(Outcome::Superseded))
    }

    /// Callback descriptors for renderer discovery.
    pub fn dependencies(&self) -> Vec<DependencyDescriptor> {
        self.callbacks
            .iter()
            .map(|cb| DependencyDescriptor {
                id: cb.id,
                inputs: cb.sources.clone(),
                outputs: cb.destinations.clone(),
            })
            .collect()
    }

    fn check_renderer_write(&self, source: &Target, value: &Value) -> Result<(), CallbackError> {
        if !self.layout.has_attribute(&source.id, &source.attribute) {
            return Err(CallbackError::UnknownTarget {
                id: source.id.clone(),
                attribute: source.attribute.clone(),
            });
        }
        if let Some(&owner) = self.writers.get(source) {
            return Err(CallbackError::NotRendererOwned { target: source.clone(), owner });
        }
        check_value(&self.layout, source, value)
    }

    /// Must be called with the sequencer held.
    fn schedule(&self, callback: Arc<Callback>) -> Invocation {
        let ticket = callback.issued.fetch_add(1, Ordering::AcqRel) + 1;
        let args = self.store.gather(&callback.sources);
        Invocation {
            callback,
            store: Arc::clone(&self.store),
            layout: Arc::clone(&self.layout),
            policy: self.policy,
            ticket,
            args,
        }
    }

    async fn dispatch(&self, pending: Vec<Invocation>) -> Vec<(CallbackId, Outcome)> {
        let tasks: Vec<_> = pending
            .into_iter()
            .map(|invocation| (invocation.callback.id, tokio::spawn(invocation.run())))
            .collect();

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (id, task) in tasks {
            let outcome = task.await.unwrap_or_else(|e| {
                log::error!("{id} task failed: {e}");
                Outcome::Failed(format!("handler task failed: {e}"))
            });
            outcomes.push((id, outcome));
        }
        outcomes
    }
}
