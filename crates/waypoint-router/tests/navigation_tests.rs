//! Integration tests for the navigation controller
//!
//! These tests verify:
//! 1. Commits push exactly one history entry and notify exactly once
//! 2. Guard cancellation, errors and redirects
//! 3. Pop events and compensation of rejected traversals
//! 4. Newest-navigation-wins under concurrent requests
//! 5. Hosts that apply traversals asynchronously

use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::executor::{LocalPool, block_on};
use futures::future::{self, FutureExt, LocalBoxFuture};
use futures::task::LocalSpawnExt;
use rstest::{fixture, rstest};
use waypoint_router::{
	ComponentRef, GuardContext, GuardDecision, GuardError, History, HistoryError, ListenerId,
	MemoryHistory, NavigationEntry, NavigationError, NavigationOutcome, NavigationPhase,
	NavigationTarget, NavigationTrigger, PopListener, RouteDefinition, RouteTable, Router,
	RouterConfig, Subscription, sync_guard,
};

struct Harness {
	router: Router,
	history: Rc<MemoryHistory>,
	notifications: Rc<RefCell<Vec<String>>>,
	_subscription: Subscription,
}

impl Harness {
	fn notified(&self) -> Vec<String> {
		self.notifications.borrow().clone()
	}

	fn stack(&self) -> Vec<String> {
		self.history.entries().into_iter().map(|e| e.full_path).collect()
	}
}

fn chat_table() -> RouteTable {
	RouteTable::build(vec![
		RouteDefinition::new("/", ComponentRef::named("FirstPage")).name("FirstPage"),
		RouteDefinition::new("/chat/:roomId", ComponentRef::named("ChatPage")).name("ChatPage"),
		RouteDefinition::new("/login", ComponentRef::named("Login")).name("login"),
		RouteDefinition::new("/admin", ComponentRef::named("Admin"))
			.name("admin")
			.meta("requiresAuth", true),
	])
	.unwrap()
}

fn harness_with(config: RouterConfig) -> Harness {
	let history = Rc::new(MemoryHistory::default());
	let router = Router::new(chat_table(), Rc::clone(&history), config);
	let notifications = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&notifications);
	let subscription = router
		.state()
		.subscribe(move |route| sink.borrow_mut().push(route.full_path()));
	Harness {
		router,
		history,
		notifications,
		_subscription: subscription,
	}
}

#[fixture]
fn harness() -> Harness {
	harness_with(RouterConfig::default())
}

fn is_pop(ctx: &GuardContext) -> bool {
	matches!(ctx.trigger(), NavigationTrigger::Pop { .. })
}

// ============================================================================
// Committing
// ============================================================================

#[rstest]
fn test_named_navigation_pushes_one_entry_and_notifies_once(harness: Harness) {
	// Act
	let outcome = block_on(
		harness
			.router
			.navigate(NavigationTarget::named("ChatPage", [("roomId", "7")])),
	)
	.unwrap();

	// Assert
	let route = outcome.route().unwrap();
	assert_eq!(route.full_path(), "/chat/7");
	assert_eq!(route.name(), Some("ChatPage"));
	assert_eq!(harness.stack(), vec!["/", "/chat/7"]);
	assert_eq!(harness.notified(), vec!["/chat/7"]);
	assert_eq!(harness.router.state().version(), 1);
	assert_eq!(harness.router.phase(), NavigationPhase::Idle);
}

#[rstest]
fn test_subscribers_observe_updated_history(harness: Harness) {
	// Arrange
	let consistent = Rc::new(RefCell::new(Vec::new()));
	let history = Rc::clone(&harness.history);
	let sink = Rc::clone(&consistent);
	let _check = harness.router.state().subscribe(move |route| {
		sink.borrow_mut().push(history.current_path() == route.full_path());
	});

	// Act
	block_on(harness.router.push("/chat/1")).unwrap();
	block_on(harness.router.replace("/chat/2")).unwrap();

	// Assert
	assert_eq!(*consistent.borrow(), vec![true, true]);
	assert_eq!(harness.stack(), vec!["/", "/chat/2"]);
}

#[rstest]
fn test_unmatched_path_commits_sentinel(harness: Harness) {
	let outcome = block_on(harness.router.push("/nowhere?from=link")).unwrap();

	let route = outcome.route().unwrap();
	assert!(!route.is_matched());
	assert_eq!(route.path(), "/nowhere");
	assert_eq!(route.query().get("from"), Some("link"));
	assert!(route.params().is_empty());
	assert_eq!(harness.notified(), vec!["/nowhere?from=link"]);
	assert_eq!(harness.history.len(), 2);
}

#[rstest]
fn test_entry_state_is_stored_in_history(harness: Harness) {
	let target = NavigationTarget::path("/chat/3").with_state(serde_json::json!({ "scroll": 120 }));

	block_on(harness.router.navigate(target)).unwrap();

	let entry = harness.history.current_entry().unwrap();
	assert_eq!(entry.state["scroll"], 120);
}

#[rstest]
fn test_missing_param_leaves_state_untouched(harness: Harness) {
	// Act
	let err = block_on(
		harness
			.router
			.navigate(NavigationTarget::named("ChatPage", Vec::<(String, String)>::new())),
	)
	.unwrap_err();

	// Assert
	assert!(matches!(err, NavigationError::MissingParam(_)));
	assert_eq!(harness.router.current().full_path(), "/");
	assert_eq!(harness.history.len(), 1);
	assert!(harness.notified().is_empty());
	assert_eq!(harness.router.phase(), NavigationPhase::Idle);
}

// ============================================================================
// Guards
// ============================================================================

#[rstest]
fn test_cancelling_guard_keeps_current_route(harness: Harness) {
	// Arrange
	harness.router.register_guard(sync_guard(|ctx| {
		Ok((!ctx.to().path().starts_with("/chat")).into())
	}));

	// Act
	let outcome = block_on(harness.router.push("/chat/7")).unwrap();

	// Assert
	assert_eq!(outcome, NavigationOutcome::Cancelled);
	assert_eq!(harness.router.current().full_path(), "/");
	assert_eq!(harness.history.len(), 1);
	assert!(harness.notified().is_empty());
	assert_eq!(harness.router.phase(), NavigationPhase::Idle);
}

#[rstest]
fn test_guards_run_in_registration_order_until_cancel(harness: Harness) {
	// Arrange
	let calls = Rc::new(RefCell::new(Vec::new()));
	for (label, decision) in [
		("first", GuardDecision::Allow),
		("second", GuardDecision::Cancel),
		("third", GuardDecision::Allow),
	] {
		let calls = Rc::clone(&calls);
		harness.router.register_guard(sync_guard(move |_| {
			calls.borrow_mut().push(label);
			Ok(decision.clone())
		}));
	}

	// Act
	let outcome = block_on(harness.router.push("/chat/1")).unwrap();

	// Assert
	assert_eq!(outcome, NavigationOutcome::Cancelled);
	assert_eq!(*calls.borrow(), vec!["first", "second"]);
}

#[rstest]
fn test_guard_error_is_an_implicit_cancel(harness: Harness) {
	harness
		.router
		.register_guard(|_ctx: GuardContext| async { Err::<GuardDecision, _>(GuardError::new("permission service down")) });

	let outcome = block_on(harness.router.push("/chat/1")).unwrap();

	assert_eq!(outcome, NavigationOutcome::Cancelled);
	assert_eq!(harness.router.current().full_path(), "/");
	assert_eq!(harness.history.len(), 1);
}

#[rstest]
fn test_guard_sees_from_route_and_meta(harness: Harness) {
	// Arrange
	let seen = Rc::new(RefCell::new(None));
	let sink = Rc::clone(&seen);
	harness.router.register_guard(sync_guard(move |ctx| {
		let requires_auth = ctx
			.to()
			.resolved()
			.is_some_and(|r| r.meta().get("requiresAuth") == Some(&serde_json::Value::Bool(true)));
		*sink.borrow_mut() = Some((ctx.from().full_path(), requires_auth));
		Ok(GuardDecision::Allow)
	}));

	// Act
	block_on(harness.router.push("/admin")).unwrap();

	// Assert
	assert_eq!(*seen.borrow(), Some(("/".to_string(), true)));
}

#[rstest]
fn test_redirect_restarts_with_new_target(harness: Harness) {
	// Arrange
	let redirected_from = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&redirected_from);
	harness.router.register_guard(sync_guard(move |ctx| {
		sink.borrow_mut().push(ctx.redirected_from().map(str::to_string));
		if ctx.to().name() == Some("admin") {
			Ok(GuardDecision::redirect("/login"))
		} else {
			Ok(GuardDecision::Allow)
		}
	}));

	// Act
	let outcome = block_on(harness.router.push("/admin")).unwrap();

	// Assert
	assert_eq!(outcome.route().and_then(|r| r.name().map(str::to_string)), Some("login".to_string()));
	assert_eq!(harness.stack(), vec!["/", "/login"]);
	assert_eq!(harness.notified(), vec!["/login"]);
	assert_eq!(*redirected_from.borrow(), vec![None, Some("/admin".to_string())]);
}

#[rstest]
fn test_redirect_target_may_request_replace(harness: Harness) {
	harness.router.register_guard(sync_guard(|ctx| {
		Ok(if ctx.to().path() == "/admin" {
			GuardDecision::Redirect(NavigationTarget::path("/login").replacing())
		} else {
			GuardDecision::Allow
		})
	}));

	block_on(harness.router.push("/admin")).unwrap();

	assert_eq!(harness.stack(), vec!["/login"]);
}

#[rstest]
fn test_redirect_loop_fails_with_chain() {
	// Arrange
	let harness = harness_with(RouterConfig::default().with_max_redirects(3));
	harness.router.register_guard(sync_guard(|ctx| {
		Ok(match ctx.to().path() {
			"/chat/a" => GuardDecision::redirect("/chat/b"),
			"/chat/b" => GuardDecision::redirect("/chat/a"),
			_ => GuardDecision::Allow,
		})
	}));

	// Act
	let err = block_on(harness.router.push("/chat/a")).unwrap_err();

	// Assert
	assert_eq!(
		err,
		NavigationError::RedirectLoop {
			limit: 3,
			chain: ["/chat/a", "/chat/b", "/chat/a", "/chat/b", "/chat/a"]
				.map(String::from)
				.to_vec(),
		}
	);
	assert_eq!(harness.router.current().full_path(), "/");
	assert_eq!(harness.history.len(), 1);
	assert!(harness.notified().is_empty());
	assert_eq!(harness.router.phase(), NavigationPhase::Idle);
}

#[rstest]
fn test_start_runs_guards_for_initial_location() {
	// Arrange
	let history = Rc::new(MemoryHistory::new("/admin"));
	let router = Router::new(chat_table(), Rc::clone(&history), RouterConfig::default());
	router.register_guard(sync_guard(|ctx| {
		Ok(match (ctx.trigger(), ctx.to().path()) {
			(NavigationTrigger::Initial, "/admin") => GuardDecision::redirect("/login"),
			_ => GuardDecision::Allow,
		})
	}));
	assert_eq!(router.current().name(), Some("admin"));

	// Act
	block_on(router.start()).unwrap();

	// Assert
	assert_eq!(router.current().name(), Some("login"));
	assert_eq!(history.len(), 1);
	assert_eq!(history.current_path(), "/login");
}

// ============================================================================
// Pop events
// ============================================================================

fn visit_two_rooms(harness: &Harness) {
	block_on(harness.router.push("/chat/1")).unwrap();
	block_on(harness.router.push("/chat/2")).unwrap();
	harness.notifications.borrow_mut().clear();
}

#[rstest]
fn test_allowed_pop_commits_without_pushing(harness: Harness) {
	// Arrange
	let mut pool = LocalPool::new();
	harness.router.listen(pool.spawner());
	visit_two_rooms(&harness);

	// Act
	harness.router.back(1).unwrap();
	pool.run_until_stalled();

	// Assert
	assert_eq!(harness.router.current().full_path(), "/chat/1");
	assert_eq!(harness.history.current_index(), 1);
	assert_eq!(harness.stack(), vec!["/", "/chat/1", "/chat/2"]);
	assert_eq!(harness.notified(), vec!["/chat/1"]);
}

#[rstest]
fn test_cancelled_pop_is_compensated(harness: Harness) {
	// Arrange
	let mut pool = LocalPool::new();
	harness.router.listen(pool.spawner());
	visit_two_rooms(&harness);
	harness
		.router
		.register_guard(sync_guard(|ctx| Ok((!is_pop(ctx)).into())));

	// Act
	harness.router.back(1).unwrap();
	assert_eq!(harness.history.current_index(), 1);
	pool.run_until_stalled();

	// Assert
	assert_eq!(harness.history.current_index(), 2);
	assert_eq!(harness.router.current().full_path(), "/chat/2");
	assert!(harness.notified().is_empty());
	assert_eq!(harness.router.phase(), NavigationPhase::Idle);
}

#[rstest]
fn test_pop_guard_error_is_compensated(harness: Harness) {
	let mut pool = LocalPool::new();
	harness.router.listen(pool.spawner());
	visit_two_rooms(&harness);
	harness.router.register_guard(sync_guard(|ctx| {
		if is_pop(ctx) {
			Err(GuardError::new("unsaved changes"))
		} else {
			Ok(GuardDecision::Allow)
		}
	}));

	harness.router.back(2).unwrap();
	pool.run_until_stalled();

	assert_eq!(harness.history.current_index(), 2);
	assert_eq!(harness.router.current().full_path(), "/chat/2");
}

#[rstest]
fn test_redirected_pop_compensates_then_pushes(harness: Harness) {
	// Arrange
	let mut pool = LocalPool::new();
	harness.router.listen(pool.spawner());
	visit_two_rooms(&harness);
	harness.router.register_guard(sync_guard(|ctx| {
		Ok(if is_pop(ctx) {
			GuardDecision::redirect("/login")
		} else {
			GuardDecision::Allow
		})
	}));

	// Act
	harness.router.back(1).unwrap();
	pool.run_until_stalled();

	// Assert
	assert_eq!(harness.stack(), vec!["/", "/chat/1", "/chat/2", "/login"]);
	assert_eq!(harness.history.current_index(), 3);
	assert_eq!(harness.notified(), vec!["/login"]);
}

#[rstest]
fn test_huge_back_stops_at_first_entry(harness: Harness) {
	// Arrange
	let mut pool = LocalPool::new();
	harness.router.listen(pool.spawner());
	visit_two_rooms(&harness);

	// Act
	harness.router.back(usize::MAX).unwrap();
	pool.run_until_stalled();

	// Assert
	assert_eq!(harness.history.current_index(), 0);
	assert_eq!(harness.router.current().full_path(), "/");
	assert_eq!(harness.notified(), vec!["/"]);
}

#[rstest]
fn test_unlisten_ignores_pop_events(harness: Harness) {
	let mut pool = LocalPool::new();
	harness.router.listen(pool.spawner());
	visit_two_rooms(&harness);
	harness.router.unlisten();

	harness.router.back(1).unwrap();
	pool.run_until_stalled();

	assert_eq!(harness.history.current_index(), 1);
	assert_eq!(harness.router.current().full_path(), "/chat/2");
	assert_eq!(harness.history.listener_count(), 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[rstest]
fn test_newest_navigation_wins(harness: Harness) {
	// Arrange
	let (release, gate) = oneshot::channel::<()>();
	let gate = Rc::new(RefCell::new(Some(gate)));
	harness.router.register_guard(move |ctx: GuardContext| {
		let wait = if ctx.to().path() == "/chat/slow" {
			gate.borrow_mut().take()
		} else {
			None
		};
		async move {
			if let Some(wait) = wait {
				let _ = wait.await;
			}
			Ok::<_, GuardError>(GuardDecision::Allow)
		}
	});

	let mut pool = LocalPool::new();
	let slow_outcome = Rc::new(RefCell::new(None));
	let slot = Rc::clone(&slow_outcome);
	let slow = harness.router.push("/chat/slow");
	pool.spawner()
		.spawn_local(async move {
			*slot.borrow_mut() = Some(slow.await);
		})
		.unwrap();
	pool.run_until_stalled();
	assert_eq!(harness.router.phase(), NavigationPhase::Resolving);

	// Act
	let fast = pool.run_until(harness.router.push("/chat/fast")).unwrap();
	release.send(()).unwrap();
	pool.run_until_stalled();

	// Assert
	assert!(fast.is_committed());
	assert_eq!(*slow_outcome.borrow(), Some(Ok(NavigationOutcome::Superseded)));
	assert_eq!(harness.router.current().full_path(), "/chat/fast");
	assert_eq!(harness.stack(), vec!["/", "/chat/fast"]);
	assert_eq!(harness.notified(), vec!["/chat/fast"]);
	assert_eq!(harness.router.phase(), NavigationPhase::Idle);
}

#[rstest]
fn test_superseded_pop_does_not_compensate(harness: Harness) {
	// Arrange
	visit_two_rooms(&harness);
	let (release_pop, pop_gate) = oneshot::channel::<()>();
	let (release_push, push_gate) = oneshot::channel::<()>();
	let gates = Rc::new(RefCell::new(vec![("/chat/1", pop_gate), ("/chat/3", push_gate)]));
	harness.router.register_guard(move |ctx: GuardContext| {
		let wait = {
			let mut gates = gates.borrow_mut();
			let position = gates.iter().position(|(path, _)| *path == ctx.to().path());
			position.map(|position| gates.remove(position).1)
		};
		async move {
			if let Some(wait) = wait {
				let _ = wait.await;
			}
			Ok::<_, GuardError>(GuardDecision::Allow)
		}
	});
	let mut pool = LocalPool::new();
	harness.router.listen(pool.spawner());

	harness.router.back(1).unwrap();
	pool.run_until_stalled();
	let push = harness.router.push("/chat/3");
	pool.spawner()
		.spawn_local(async move {
			let _ = push.await;
		})
		.unwrap();
	pool.run_until_stalled();

	// Act
	release_pop.send(()).unwrap();
	pool.run_until_stalled();

	// Assert
	assert_eq!(harness.history.current_index(), 1);
	assert_eq!(harness.stack(), vec!["/", "/chat/1", "/chat/2"]);

	// Act
	release_push.send(()).unwrap();
	pool.run_until_stalled();

	// Assert
	assert_eq!(harness.stack(), vec!["/", "/chat/1", "/chat/3"]);
	assert_eq!(harness.router.current().full_path(), "/chat/3");
	assert_eq!(harness.notified(), vec!["/chat/3"]);
	assert_eq!(harness.router.phase(), NavigationPhase::Idle);
}

// ============================================================================
// Deferred traversals
// ============================================================================

/// Memory stack whose traversals only land when [`DeferredHistory::flush`]
/// runs, the way `history.go` behaves in a browser.
#[derive(Default)]
struct DeferredHistory {
	stack: MemoryHistory,
	queued: RefCell<Vec<(isize, bool)>>,
	waiters: RefCell<Vec<oneshot::Sender<()>>>,
}

impl DeferredHistory {
	fn flush(&self) {
		let queued: Vec<(isize, bool)> = self.queued.borrow_mut().drain(..).collect();
		for (delta, notify) in queued {
			self.stack.go(delta, notify).unwrap();
		}
		for waiter in self.waiters.borrow_mut().drain(..) {
			let _ = waiter.send(());
		}
	}

	fn paths(&self) -> Vec<String> {
		self.stack.entries().into_iter().map(|e| e.full_path).collect()
	}
}

impl History for DeferredHistory {
	fn push(&self, entry: NavigationEntry) -> Result<(), HistoryError> {
		self.stack.push(entry)
	}

	fn replace(&self, entry: NavigationEntry) -> Result<(), HistoryError> {
		self.stack.replace(entry)
	}

	fn go(&self, delta: isize, notify: bool) -> Result<(), HistoryError> {
		self.queued.borrow_mut().push((delta, notify));
		Ok(())
	}

	fn settled(&self) -> LocalBoxFuture<'static, ()> {
		if self.queued.borrow().is_empty() {
			return future::ready(()).boxed_local();
		}
		let (sender, receiver) = oneshot::channel();
		self.waiters.borrow_mut().push(sender);
		receiver.map(|_| ()).boxed_local()
	}

	fn current_path(&self) -> String {
		self.stack.current_path()
	}

	fn current_index(&self) -> usize {
		self.stack.current_index()
	}

	fn len(&self) -> usize {
		self.stack.len()
	}

	fn entries(&self) -> Vec<NavigationEntry> {
		self.stack.entries()
	}

	fn subscribe(&self, listener: PopListener) -> ListenerId {
		self.stack.subscribe(listener)
	}

	fn unsubscribe(&self, id: ListenerId) {
		self.stack.unsubscribe(id);
	}
}

#[rstest]
fn test_redirected_pop_waits_for_compensation_before_pushing() {
	// Arrange
	let history = Rc::new(DeferredHistory::default());
	let router = Router::new(chat_table(), Rc::clone(&history), RouterConfig::default());
	block_on(router.push("/chat/1")).unwrap();
	block_on(router.push("/chat/2")).unwrap();
	router.register_guard(sync_guard(|ctx| {
		Ok(if is_pop(ctx) {
			GuardDecision::redirect("/login")
		} else {
			GuardDecision::Allow
		})
	}));
	let mut pool = LocalPool::new();
	router.listen(pool.spawner());

	// Act
	router.back(1).unwrap();
	history.flush();
	pool.run_until_stalled();

	// Assert
	assert_eq!(history.paths(), vec!["/", "/chat/1", "/chat/2"]);
	assert_eq!(history.current_index(), 1);
	assert_eq!(router.current().full_path(), "/chat/2");

	// Act
	history.flush();
	pool.run_until_stalled();

	// Assert
	assert_eq!(history.paths(), vec!["/", "/chat/1", "/chat/2", "/login"]);
	assert_eq!(history.current_index(), 3);
	assert_eq!(router.current().full_path(), "/login");
	assert_eq!(router.phase(), NavigationPhase::Idle);
}
