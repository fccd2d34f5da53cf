//! Navigation controller.
//!
//! [`Router`] ties the route table, a history adapter and the reactive route
//! state together. Every navigation goes through the same pipeline:
//!
//! 1. Normalize the target into a concrete location (named targets are built
//!    with [`build_path`]).
//! 2. Resolve it against the table, follow a record-level redirect, then run
//!    the guards one after another in registration order.
//! 3. A guard redirect restarts the pipeline with the new target, up to
//!    [`RouterConfig::max_redirects`] times. A cancel (or guard error) ends
//!    the navigation without touching the route state.
//! 4. Commit: write the history entry, update the state, notify subscribers.
//!
//! Navigations are identified by increasing ids and the newest one wins: a
//! navigation that finds a newer one started while one of its guards was
//! pending stops with [`NavigationOutcome::Superseded`].
//!
//! Back/forward traversals reach the router as [`PopEvent`]s once
//! [`Router::listen`] has been called. The stack has already moved by then,
//! so a pop that does not commit is undone with a silent `go` back to the
//! index of the last commit.
//!
//! Hosts may apply traversals asynchronously (`history.go` in a browser), so
//! the router awaits [`History::settled`] before compensating and before
//! writing a new entry.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::{LocalSpawn, LocalSpawnExt};

use crate::config::{RouterConfig, RoutesConfig};
use crate::error::{NavigationError, TableError};
use crate::guard::{GuardContext, GuardDecision, GuardId, NavigationGuard, NavigationTrigger};
use crate::history::{History, ListenerId, MemoryHistory, NavigationEntry, PopEvent};
use crate::location::Location;
use crate::matcher::{build_path, resolve_location};
use crate::route::{CurrentRoute, ResolvedRoute};
use crate::state::RouteState;
use crate::table::{RouteDefinition, RouteTable};
use crate::target::{NavigationTarget, RouteLocation};

/// Where the controller is in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationPhase {
	/// No navigation in flight.
	#[default]
	Idle,
	/// Resolving the target and running guards.
	Resolving,
	/// Writing history and route state.
	Committing,
}

/// How a navigation ended, when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
	/// The route was committed and subscribers were notified.
	Committed(CurrentRoute),
	/// A guard cancelled (or failed); nothing changed.
	Cancelled,
	/// A newer navigation started before this one could commit.
	Superseded,
}

impl NavigationOutcome {
	/// Returns whether the navigation committed.
	pub fn is_committed(&self) -> bool {
		matches!(self, Self::Committed(_))
	}

	/// Returns the committed route.
	pub fn route(&self) -> Option<&CurrentRoute> {
		match self {
			Self::Committed(route) => Some(route),
			_ => None,
		}
	}
}

/// Future returned by the navigation methods.
pub type NavigationFuture = LocalBoxFuture<'static, Result<NavigationOutcome, NavigationError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitMode {
	Push,
	Replace,
	// The history stack already moved (pop event).
	Traversed,
}

struct RouterInner {
	table: RouteTable,
	history: Rc<dyn History>,
	state: RouteState,
	config: RouterConfig,
	guards: RefCell<Vec<(GuardId, Rc<dyn NavigationGuard>)>>,
	next_guard_id: Cell<u64>,
	latest_navigation: Cell<u64>,
	committed_index: Cell<usize>,
	phase: Cell<NavigationPhase>,
	pop_listener: Cell<Option<ListenerId>>,
}

impl Drop for RouterInner {
	fn drop(&mut self) {
		if let Some(id) = self.pop_listener.take() {
			self.history.unsubscribe(id);
		}
	}
}

/// The navigation controller.
///
/// Cloning yields another handle to the same router.
///
/// # Example
///
/// ```ignore
/// let table = RouteTable::build(vec![
///     RouteDefinition::new("/", ComponentRef::named("FirstPage")).name("FirstPage"),
///     RouteDefinition::new("/chat/:roomId", ComponentRef::named("ChatPage")).name("ChatPage"),
/// ])?;
/// let router = Router::with_memory_history(table, RouterConfig::default());
///
/// let outcome = router
///     .navigate(NavigationTarget::named("ChatPage", [("roomId", "7")]))
///     .await?;
/// assert_eq!(router.current().full_path(), "/chat/7");
/// ```
#[derive(Clone)]
pub struct Router {
	inner: Rc<RouterInner>,
}

impl Router {
	/// Creates a router over `history`.
	///
	/// The history's current entry is resolved immediately, without running
	/// guards and without notifying subscribers. Call [`Router::start`] to
	/// run it through the guards once they are registered.
	pub fn new<H>(table: RouteTable, history: Rc<H>, config: RouterConfig) -> Self
	where
		H: History + 'static,
	{
		let history: Rc<dyn History> = history;
		let initial = resolve_current(&table, Location::parse(&history.current_path()));
		tracing::debug!(
			path = %initial.full_path(),
			matched = initial.is_matched(),
			"router created"
		);

		Self {
			inner: Rc::new(RouterInner {
				committed_index: Cell::new(history.current_index()),
				table,
				history,
				state: RouteState::new(initial),
				config,
				guards: RefCell::new(Vec::new()),
				next_guard_id: Cell::new(0),
				latest_navigation: Cell::new(0),
				phase: Cell::new(NavigationPhase::Idle),
				pop_listener: Cell::new(None),
			}),
		}
	}

	/// Creates a router over a fresh [`MemoryHistory`] starting at
	/// [`RouterConfig::initial_path`].
	pub fn with_memory_history(table: RouteTable, config: RouterConfig) -> Self {
		let history = Rc::new(MemoryHistory::new(config.initial_path.clone()));
		Self::new(table, history, config)
	}

	/// Builds the table from definitions and creates a router over `history`.
	pub fn from_definitions<H, I>(definitions: I, history: Rc<H>, config: RouterConfig) -> Result<Self, TableError>
	where
		H: History + 'static,
		I: IntoIterator<Item = RouteDefinition>,
	{
		Ok(Self::new(RouteTable::build(definitions)?, history, config))
	}

	/// Creates a router from a loaded configuration.
	pub fn from_config<H>(config: RoutesConfig, history: Rc<H>) -> Result<Self, TableError>
	where
		H: History + 'static,
	{
		let (table, config) = config.into_table()?;
		Ok(Self::new(table, history, config))
	}

	/// Navigates to `target` with a push, unless the target asks to replace.
	pub fn navigate(&self, target: impl Into<NavigationTarget>) -> NavigationFuture {
		let target = target.into();
		let mode = if target.is_replace() {
			CommitMode::Replace
		} else {
			CommitMode::Push
		};
		Rc::clone(&self.inner)
			.run(target, NavigationTrigger::Navigate, mode)
			.boxed_local()
	}

	/// Navigates to `path` with a push.
	pub fn push(&self, path: &str) -> NavigationFuture {
		self.navigate(NavigationTarget::path(path))
	}

	/// Navigates to `path`, replacing the current history entry.
	pub fn replace(&self, path: &str) -> NavigationFuture {
		self.navigate(NavigationTarget::path(path).replacing())
	}

	/// Runs the current history entry through the guard pipeline.
	///
	/// Commits with a replace, so the stack does not grow.
	pub fn start(&self) -> NavigationFuture {
		let entry = self.current_entry();
		Rc::clone(&self.inner)
			.run(entry, NavigationTrigger::Initial, CommitMode::Replace)
			.boxed_local()
	}

	/// Handles a back/forward traversal that already moved the stack.
	///
	/// [`Router::listen`] calls this for every [`PopEvent`]; hosts that
	/// deliver events themselves may call it directly.
	pub fn handle_pop(&self, event: PopEvent) -> NavigationFuture {
		tracing::debug!(
			from_index = event.from_index,
			to_index = event.to_index,
			delta = event.delta,
			"history traversal"
		);
		let target = NavigationTarget::path(event.entry.full_path).with_state(event.entry.state);
		Rc::clone(&self.inner)
			.run(target, NavigationTrigger::Pop { delta: event.delta }, CommitMode::Traversed)
			.boxed_local()
	}

	/// Moves `n` entries back. The resulting pop event is handled
	/// asynchronously once [`Router::listen`] is active.
	pub fn back(&self, n: usize) -> Result<(), NavigationError> {
		Ok(self.inner.history.back(n)?)
	}

	/// Moves `n` entries forward.
	pub fn forward(&self, n: usize) -> Result<(), NavigationError> {
		Ok(self.inner.history.forward(n)?)
	}

	/// Subscribes to the history's pop events, handling each one on
	/// `spawner`. Replaces a previous subscription.
	pub fn listen<S>(&self, spawner: S)
	where
		S: LocalSpawn + 'static,
	{
		self.unlisten();

		let weak: Weak<RouterInner> = Rc::downgrade(&self.inner);
		let id = self.inner.history.subscribe(Rc::new(move |event: &PopEvent| {
			let Some(inner) = weak.upgrade() else {
				return;
			};
			let router = Router { inner };
			let navigation = router.handle_pop(event.clone()).map(|result| {
				if let Err(err) = result {
					tracing::warn!(error = %err, "history traversal failed");
				}
			});
			if let Err(err) = spawner.spawn_local(navigation) {
				tracing::warn!(error = %err, "failed to spawn history traversal");
			}
		}));
		self.inner.pop_listener.set(Some(id));
	}

	/// Stops handling pop events.
	pub fn unlisten(&self) {
		if let Some(id) = self.inner.pop_listener.take() {
			self.inner.history.unsubscribe(id);
		}
	}

	/// Registers a guard. Guards run in registration order.
	pub fn register_guard<G>(&self, guard: G) -> GuardId
	where
		G: NavigationGuard + 'static,
	{
		let id = GuardId(self.inner.next_guard_id.get());
		self.inner.next_guard_id.set(id.0 + 1);
		self.inner.guards.borrow_mut().push((id, Rc::new(guard)));
		id
	}

	/// Removes a guard. Returns whether it was registered.
	///
	/// Navigations already running keep the guard list they started with.
	pub fn remove_guard(&self, id: GuardId) -> bool {
		let mut guards = self.inner.guards.borrow_mut();
		let before = guards.len();
		guards.retain(|(existing, _)| *existing != id);
		guards.len() != before
	}

	/// Resolves `target` without navigating and without running guards.
	pub fn resolve(&self, target: impl Into<NavigationTarget>) -> Result<CurrentRoute, NavigationError> {
		let location = self.inner.normalize(&target.into())?;
		Ok(resolve_current(&self.inner.table, location))
	}

	/// Returns the URL for `target`, including the configured base path.
	pub fn href(&self, target: impl Into<NavigationTarget>) -> Result<String, NavigationError> {
		let full_path = self.resolve(target)?.full_path();
		let base = self.inner.config.base.trim_end_matches('/');
		Ok(format!("{}{}", base, full_path))
	}

	/// Returns the current pipeline phase.
	pub fn phase(&self) -> NavigationPhase {
		self.inner.phase.get()
	}

	/// Returns a copy of the current route.
	pub fn current(&self) -> CurrentRoute {
		self.inner.state.current()
	}

	/// Returns the reactive route state.
	pub fn state(&self) -> &RouteState {
		&self.inner.state
	}

	/// Returns the route table.
	pub fn table(&self) -> &RouteTable {
		&self.inner.table
	}

	/// Returns the history adapter.
	pub fn history(&self) -> &Rc<dyn History> {
		&self.inner.history
	}

	/// Returns the router settings.
	pub fn config(&self) -> &RouterConfig {
		&self.inner.config
	}

	fn current_entry(&self) -> NavigationTarget {
		let path = self.inner.history.current_path();
		let state = self
			.inner
			.history
			.entries()
			.get(self.inner.history.current_index())
			.map(|entry| entry.state.clone())
			.unwrap_or_default();
		NavigationTarget::path(path).with_state(state)
	}
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("current", &self.inner.state.current().full_path())
			.field("phase", &self.inner.phase.get())
			.field("routes", &self.inner.table.len())
			.field("guards", &self.inner.guards.borrow().len())
			.finish()
	}
}

impl RouterInner {
	fn is_latest(&self, id: u64) -> bool {
		self.latest_navigation.get() == id
	}

	async fn run(
		self: Rc<Self>,
		target: NavigationTarget,
		trigger: NavigationTrigger,
		mode: CommitMode,
	) -> Result<NavigationOutcome, NavigationError> {
		let id = self.latest_navigation.get() + 1;
		self.latest_navigation.set(id);
		self.phase.set(NavigationPhase::Resolving);
		tracing::debug!(navigation_id = id, to = %target, ?trigger, "navigation started");

		let result = self.pipeline(id, target, trigger, mode).await;

		if self.is_latest(id) {
			if !matches!(result, Ok(NavigationOutcome::Committed(_))) {
				self.restore_committed_index(id).await;
			}
			if self.is_latest(id) {
				self.phase.set(NavigationPhase::Idle);
			}
		}
		if let Err(err) = &result {
			tracing::warn!(navigation_id = id, error = %err, "navigation failed");
		}
		result
	}

	async fn pipeline(
		&self,
		id: u64,
		mut target: NavigationTarget,
		mut trigger: NavigationTrigger,
		mut mode: CommitMode,
	) -> Result<NavigationOutcome, NavigationError> {
		let limit = self.config.max_redirects;
		let mut chain: Vec<String> = Vec::new();
		let mut redirected_from: Option<String> = None;

		loop {
			let location = self.normalize(&target)?;
			let full_path = location.full_path();
			chain.push(full_path.clone());
			let to = resolve_current(&self.table, location);
			tracing::debug!(
				navigation_id = id,
				to = %full_path,
				route = to.name().unwrap_or_default(),
				matched = to.is_matched(),
				"target resolved"
			);

			let record_redirect = to
				.resolved()
				.and_then(ResolvedRoute::record)
				.and_then(|record| record.redirect().map(str::to_string));
			let decision = match record_redirect {
				Some(redirect) => GuardDecision::redirect(redirect),
				None => match self.run_guards(id, &to, trigger, redirected_from.clone()).await {
					Some(decision) => decision,
					None => {
						tracing::debug!(navigation_id = id, "navigation superseded");
						return Ok(NavigationOutcome::Superseded);
					}
				},
			};

			match decision {
				GuardDecision::Allow => {
					if mode != CommitMode::Traversed {
						self.history.settled().await;
						if !self.is_latest(id) {
							tracing::debug!(navigation_id = id, "navigation superseded");
							return Ok(NavigationOutcome::Superseded);
						}
					}
					return self.commit(id, to, mode, &target);
				}
				GuardDecision::Cancel => {
					tracing::debug!(navigation_id = id, to = %full_path, "navigation cancelled");
					return Ok(NavigationOutcome::Cancelled);
				}
				GuardDecision::Redirect(next) => {
					if chain.len() > limit {
						chain.push(next.to_string());
						return Err(NavigationError::RedirectLoop { limit, chain });
					}
					tracing::debug!(navigation_id = id, from = %full_path, to = %next, "navigation redirected");

					if mode == CommitMode::Traversed {
						self.restore_committed_index(id).await;
						if !self.is_latest(id) {
							return Ok(NavigationOutcome::Superseded);
						}
						mode = CommitMode::Push;
						trigger = NavigationTrigger::Navigate;
					}
					if next.is_replace() {
						mode = CommitMode::Replace;
					}
					redirected_from = Some(full_path);
					target = next;
				}
			}
		}
	}

	/// Runs every guard in order. Returns `None` when a newer navigation
	/// started while a guard was pending.
	async fn run_guards(
		&self,
		id: u64,
		to: &CurrentRoute,
		trigger: NavigationTrigger,
		redirected_from: Option<String>,
	) -> Option<GuardDecision> {
		let guards: Vec<(GuardId, Rc<dyn NavigationGuard>)> = self
			.guards
			.borrow()
			.iter()
			.map(|(guard_id, guard)| (*guard_id, Rc::clone(guard)))
			.collect();
		let from = self.state.current();

		for (guard_id, guard) in guards {
			let context = GuardContext::new(to.clone(), from.clone(), id, trigger, redirected_from.clone());
			let result = guard.check(context).await;
			if !self.is_latest(id) {
				return None;
			}
			match result {
				Ok(GuardDecision::Allow) => {}
				Ok(decision) => return Some(decision),
				Err(err) => {
					tracing::warn!(
						navigation_id = id,
						guard = guard_id.0,
						error = %err,
						"guard failed, cancelling navigation"
					);
					return Some(GuardDecision::Cancel);
				}
			}
		}
		Some(GuardDecision::Allow)
	}

	fn commit(
		&self,
		id: u64,
		route: CurrentRoute,
		mode: CommitMode,
		target: &NavigationTarget,
	) -> Result<NavigationOutcome, NavigationError> {
		self.phase.set(NavigationPhase::Committing);

		let entry = NavigationEntry::new(route.full_path()).with_state(target.state().clone());
		match mode {
			CommitMode::Push => self.history.push(entry)?,
			CommitMode::Replace => self.history.replace(entry)?,
			CommitMode::Traversed => {}
		}
		self.committed_index.set(self.history.current_index());
		self.state.commit(route.clone());

		tracing::info!(
			navigation_id = id,
			path = %route.full_path(),
			route = route.name().unwrap_or_default(),
			matched = route.is_matched(),
			"navigation committed"
		);
		Ok(NavigationOutcome::Committed(route))
	}

	fn normalize(&self, target: &NavigationTarget) -> Result<Location, NavigationError> {
		let mut location = match target.location() {
			RouteLocation::Path(path) => Location::parse(path),
			RouteLocation::Named { name, params } => {
				let record = self
					.table
					.lookup_by_name(name)
					.ok_or_else(|| NavigationError::UnknownRouteName(name.clone()))?;
				Location::parse(&build_path(record, params)?)
			}
		};
		location.query_mut().extend(target.query());
		if let Some(hash) = target.hash() {
			location.set_hash(Some(hash.to_string()));
		}
		Ok(location)
	}

	/// Moves the stack back to the index of the last commit, without
	/// emitting a pop event. Pending traversals land first, so the delta is
	/// computed from where the stack really is.
	async fn restore_committed_index(&self, id: u64) {
		self.history.settled().await;
		if !self.is_latest(id) {
			return;
		}
		let committed = self.committed_index.get();
		let current = self.history.current_index();
		if committed == current {
			return;
		}
		tracing::warn!(
			navigation_id = id,
			from_index = current,
			to_index = committed,
			"restoring history position"
		);
		let delta = committed as isize - current as isize;
		if let Err(err) = self.history.go(delta, false) {
			tracing::warn!(navigation_id = id, error = %err, "failed to restore history position");
		}
	}
}

fn resolve_current(table: &RouteTable, location: Location) -> CurrentRoute {
	match resolve_location(table, location.clone()) {
		Some(route) => CurrentRoute::Matched(route),
		None => CurrentRoute::Unmatched(location),
	}
}
