//! Order registry and dispatcher.
//!
//! Holds every compiled order in a snapshot that is replaced wholesale on
//! reload, so a dispatch in flight always sees one consistent set of orders
//! and directive settings.

use crate::config::{Config, DirectiveConfig};
use crate::error::{DispatchError, Result};
use crate::order::{compile, CommandSpec, CompileOptions, CompiledHeaderSet, MatchOutcome};
use arc_swap::ArcSwap;
use serde::Serialize;
use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// An order that compiled successfully.
#[derive(Debug)]
pub struct RegisteredOrder {
    pub spec: CommandSpec,
    /// Disabled orders stay registered but are skipped by dispatch.
    pub enabled: bool,
    pub compiled: CompiledHeaderSet,
}

/// An order rejected at load time.
#[derive(Debug, Clone)]
pub struct DisabledOrder {
    pub name: String,
    pub error: DispatchError,
}

/// Outcome of dispatching one input across all orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Dispatch {
    /// An order matched with valid arguments.
    Invoked {
        command: String,
        header: String,
        arguments: Vec<String>,
    },
    /// An order's header was recognized but its arguments were not.
    BadArguments {
        command: String,
        header: String,
        remainder: String,
        usage: String,
    },
    /// No order recognized the input.
    Unrecognized,
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invoked {
                command,
                header,
                arguments,
            } => write!(f, "{command} ({header}) {arguments:?}"),
            Self::BadArguments {
                command,
                header,
                usage,
                ..
            } => write!(f, "Invalid parameters for {command} ({header})\nUsage: {usage}"),
            Self::Unrecognized => write!(f, "No order matched"),
        }
    }
}

#[derive(Debug)]
struct Snapshot {
    directive: DirectiveConfig,
    /// Compiled orders sorted by descending priority.
    orders: Vec<Arc<RegisteredOrder>>,
    disabled: Vec<DisabledOrder>,
    /// Declared orders, kept for recompiling on directive changes.
    sources: Vec<(CommandSpec, bool)>,
}

impl Snapshot {
    fn build(sources: Vec<(CommandSpec, bool)>, directive: DirectiveConfig) -> Self {
        let options = CompileOptions::from_directive(&directive);
        let mut orders = Vec::with_capacity(sources.len());
        let mut disabled = Vec::new();

        for (spec, enabled) in &sources {
            if spec.headers.is_empty() {
                warn!(order = %spec.name, "Order has no headers and will never match");
            }
            match compile(spec, &options) {
                Ok(compiled) => orders.push(Arc::new(RegisteredOrder {
                    spec: spec.clone(),
                    enabled: *enabled,
                    compiled,
                })),
                Err(error) => {
                    warn!(order = %spec.name, %error, "Order rejected");
                    disabled.push(DisabledOrder {
                        name: spec.name.clone(),
                        error,
                    });
                }
            }
        }

        // stable: equal priorities keep declaration order
        orders.sort_by_key(|o| Reverse(o.spec.priority));

        Self {
            directive,
            orders,
            disabled,
            sources,
        }
    }

    fn active(&self) -> impl Iterator<Item = &Arc<RegisteredOrder>> {
        self.orders.iter().filter(|o| o.enabled)
    }
}

/// Registry of compiled orders.
pub struct OrderRegistry {
    snap: ArcSwap<Snapshot>,
}

impl OrderRegistry {
    /// Compiles every order in the config.
    pub fn new(config: &Config) -> Self {
        let snap = Self::snapshot_from(config);
        Self {
            snap: ArcSwap::from_pointee(snap),
        }
    }

    fn snapshot_from(config: &Config) -> Snapshot {
        let sources = config
            .orders
            .iter()
            .map(|o| (CommandSpec::from(o), o.enable))
            .collect();
        let snap = Snapshot::build(sources, config.directive.clone());
        info!(
            orders = snap.orders.len(),
            rejected = snap.disabled.len(),
            "Loaded orders"
        );
        snap
    }

    /// Recompiles everything from a new config and publishes it atomically.
    pub fn reload(&self, config: &Config) {
        self.snap.store(Arc::new(Self::snapshot_from(config)));
    }

    /// Replaces the directive settings.
    ///
    /// Toggle-only changes reuse the compiled orders; a prefix change
    /// recompiles them.
    ///
    /// The new snapshot is derived from whichever snapshot it replaces, so a
    /// concurrent [`OrderRegistry::reload`] is never overwritten with stale
    /// orders.
    pub fn set_directive(&self, directive: DirectiveConfig) {
        self.snap.rcu(|current| {
            if current.directive.requires_recompile(&directive) {
                info!(prefix = %directive.header, "Directive changed, recompiling orders");
                Snapshot::build(current.sources.clone(), directive.clone())
            } else {
                Snapshot {
                    directive: directive.clone(),
                    orders: current.orders.clone(),
                    disabled: current.disabled.clone(),
                    sources: current.sources.clone(),
                }
            }
        });
    }

    /// Returns the directive settings currently in effect.
    pub fn directive(&self) -> DirectiveConfig {
        self.snap.load().directive.clone()
    }

    /// Names of compiled orders, in evaluation order.
    pub fn order_names(&self) -> Vec<String> {
        self.snap
            .load()
            .orders
            .iter()
            .map(|o| o.spec.name.clone())
            .collect()
    }

    /// Looks up a compiled order by name.
    pub fn get(&self, name: &str) -> Option<Arc<RegisteredOrder>> {
        self.snap
            .load()
            .orders
            .iter()
            .find(|o| o.spec.name == name)
            .cloned()
    }

    /// Orders rejected by the last load.
    pub fn disabled(&self) -> Vec<DisabledOrder> {
        self.snap.load().disabled.clone()
    }

    /// Help lines for every enabled order, in evaluation order.
    pub fn help_text(&self, header_limit: Option<usize>) -> String {
        let snap = self.snap.load();
        snap.active()
            .map(|o| {
                o.compiled
                    .describe_usage(header_limit, snap.directive.help_message_style)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Dispatches `input` to the enabled orders in priority order.
    pub fn dispatch(&self, input: &str) -> Dispatch {
        let snap = self.snap.load();
        let outcomes = snap
            .active()
            .map(|order| (&**order, order.compiled.match_input(input, &snap.directive)));
        resolve(outcomes, &snap.directive)
    }

    /// Evaluates every enabled order on the blocking pool.
    ///
    /// Returns the same result as [`OrderRegistry::dispatch`].
    pub async fn dispatch_concurrent(&self, input: &str) -> Result<Dispatch> {
        let snap = self.snap.load_full();
        let active: Vec<Arc<RegisteredOrder>> = snap.active().cloned().collect();
        let input: Arc<str> = Arc::from(input);

        let mut tasks = JoinSet::new();
        for (idx, order) in active.iter().enumerate() {
            let order = Arc::clone(order);
            let input = Arc::clone(&input);
            let snap = Arc::clone(&snap);
            tasks.spawn_blocking(move || (idx, order.compiled.match_input(&input, &snap.directive)));
        }

        let mut outcomes: Vec<Option<MatchOutcome>> = vec![None; active.len()];
        while let Some(joined) = tasks.join_next().await {
            let (idx, outcome) = joined
                .map_err(|e| DispatchError::internal(format!("Match task failed: {e}")))?;
            outcomes[idx] = Some(outcome);
        }

        let ordered = active
            .iter()
            .zip(outcomes)
            .map(|(order, outcome)| (&**order, outcome.unwrap_or(MatchOutcome::NoMatch)));
        Ok(resolve(ordered, &snap.directive))
    }
}

/// Picks the surfaced result from outcomes given in priority order.
///
/// The first `Matched` wins outright; otherwise the first `HeaderOnly`.
fn resolve<'a, I>(outcomes: I, directive: &DirectiveConfig) -> Dispatch
where
    I: IntoIterator<Item = (&'a RegisteredOrder, MatchOutcome)>,
{
    let mut bad_arguments = None;

    for (order, outcome) in outcomes {
        match outcome {
            MatchOutcome::Matched { header, arguments } => {
                debug!(order = %order.spec.name, %header, "Order invoked");
                return Dispatch::Invoked {
                    command: order.spec.name.clone(),
                    header,
                    arguments,
                };
            }
            MatchOutcome::HeaderOnly {
                header,
                raw_remainder,
                ..
            } if bad_arguments.is_none() => {
                bad_arguments = Some(Dispatch::BadArguments {
                    command: order.spec.name.clone(),
                    header,
                    remainder: raw_remainder,
                    usage: order
                        .compiled
                        .describe_usage(None, directive.help_message_style),
                });
            }
            _ => {}
        }
    }

    bad_arguments.unwrap_or(Dispatch::Unrecognized)
}
