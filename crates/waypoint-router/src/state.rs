//! Reactive route state.
//!
//! [`RouteState`] is the single source of truth for the current route. Only
//! the router writes to it, once per committed navigation and always after
//! the history stack has been updated, so subscribers observe a state that
//! is consistent with the stack.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::route::CurrentRoute;

type Listener = Rc<dyn Fn(&CurrentRoute)>;

struct StateInner {
	current: RefCell<CurrentRoute>,
	version: Cell<u64>,
	next_id: Cell<u64>,
	listeners: RefCell<Vec<(u64, Listener)>>,
}

/// Observable cell holding the current route.
///
/// Cloning yields another handle to the same state.
///
/// # Example
///
/// ```ignore
/// let subscription = router.state().subscribe(|route| {
///     render(route.name(), route.params());
/// });
/// // Dropping `subscription` stops notifications.
/// ```
#[derive(Clone)]
pub struct RouteState {
	inner: Rc<StateInner>,
}

impl RouteState {
	pub(crate) fn new(initial: CurrentRoute) -> Self {
		Self {
			inner: Rc::new(StateInner {
				current: RefCell::new(initial),
				version: Cell::new(0),
				next_id: Cell::new(0),
				listeners: RefCell::new(Vec::new()),
			}),
		}
	}

	/// Returns a copy of the current route.
	pub fn current(&self) -> CurrentRoute {
		self.inner.current.borrow().clone()
	}

	/// Runs `f` with a reference to the current route.
	pub fn with_current<R>(&self, f: impl FnOnce(&CurrentRoute) -> R) -> R {
		f(&self.inner.current.borrow())
	}

	/// Returns how many navigations have been committed.
	pub fn version(&self) -> u64 {
		self.inner.version.get()
	}

	/// Registers a listener called after every committed navigation.
	///
	/// The listener stays registered until the returned [`Subscription`] is
	/// dropped or [`Subscription::unsubscribe`] is called.
	#[must_use = "dropping the subscription unsubscribes the listener"]
	pub fn subscribe<F>(&self, listener: F) -> Subscription
	where
		F: Fn(&CurrentRoute) + 'static,
	{
		let id = self.inner.next_id.get();
		self.inner.next_id.set(id + 1);
		self.inner
			.listeners
			.borrow_mut()
			.push((id, Rc::new(listener)));
		Subscription {
			state: Rc::downgrade(&self.inner),
			id: Some(id),
		}
	}

	/// Returns the number of registered listeners.
	pub fn listener_count(&self) -> usize {
		self.inner.listeners.borrow().len()
	}

	/// Replaces the current route and notifies every listener once.
	pub(crate) fn commit(&self, route: CurrentRoute) {
		*self.inner.current.borrow_mut() = route.clone();
		self.inner.version.set(self.inner.version.get() + 1);

		let snapshot: Vec<Listener> = self
			.inner
			.listeners
			.borrow()
			.iter()
			.map(|(_, listener)| Rc::clone(listener))
			.collect();
		for listener in snapshot {
			listener(&route);
		}
	}
}

impl fmt::Debug for RouteState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteState")
			.field("current", &self.inner.current.borrow().full_path())
			.field("version", &self.version())
			.field("listeners", &self.listener_count())
			.finish()
	}
}

/// Handle to a [`RouteState`] listener.
#[derive(Debug)]
pub struct Subscription {
	state: Weak<StateInner>,
	id: Option<u64>,
}

impl Subscription {
	/// Removes the listener.
	pub fn unsubscribe(mut self) {
		self.remove();
	}

	/// Keeps the listener registered for as long as the state lives.
	pub fn detach(mut self) {
		self.id = None;
	}

	fn remove(&mut self) {
		if let (Some(id), Some(state)) = (self.id.take(), self.state.upgrade()) {
			state.listeners.borrow_mut().retain(|(existing, _)| *existing != id);
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.remove();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::location::Location;
	use rstest::rstest;

	fn unmatched(path: &str) -> CurrentRoute {
		CurrentRoute::Unmatched(Location::parse(path))
	}

	#[rstest]
	fn test_commit_notifies_once_with_new_route() {
		// Arrange
		let state = RouteState::new(unmatched("/"));
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = Rc::clone(&seen);
		let _subscription = state.subscribe(move |route| sink.borrow_mut().push(route.full_path()));

		// Act
		state.commit(unmatched("/chat/7"));

		// Assert
		assert_eq!(*seen.borrow(), vec!["/chat/7".to_string()]);
		assert_eq!(state.version(), 1);
		assert_eq!(state.current().path(), "/chat/7");
	}

	#[rstest]
	fn test_dropping_subscription_unsubscribes() {
		let state = RouteState::new(unmatched("/"));
		let calls = Rc::new(Cell::new(0));
		let counter = Rc::clone(&calls);

		let subscription = state.subscribe(move |_| counter.set(counter.get() + 1));
		state.commit(unmatched("/a"));
		drop(subscription);
		state.commit(unmatched("/b"));

		assert_eq!(calls.get(), 1);
		assert_eq!(state.listener_count(), 0);
	}

	#[rstest]
	fn test_detached_subscription_stays_registered() {
		let state = RouteState::new(unmatched("/"));
		state.subscribe(|_| {}).detach();
		assert_eq!(state.listener_count(), 1);
	}

	#[rstest]
	fn test_listener_may_read_and_subscribe_during_notification() {
		// Arrange
		let state = RouteState::new(unmatched("/"));
		let nested = Rc::new(RefCell::new(Vec::new()));
		let handle = state.clone();
		let store = Rc::clone(&nested);
		let _outer = state.subscribe(move |route| {
			assert_eq!(handle.current().full_path(), route.full_path());
			store.borrow_mut().push(handle.subscribe(|_| {}));
		});

		// Act
		state.commit(unmatched("/a"));

		// Assert
		assert_eq!(state.listener_count(), 2);
		nested.borrow_mut().clear();
		assert_eq!(state.listener_count(), 1);
	}
}
