//! History adapter backed by `window.history`.
//!
//! The stack is kept in process as well. Every entry written to the browser
//! carries `{ "session": .., "index": n, "state": ... }` as its history state,
//! serialized to a JSON string, so a `popstate` can be mapped back to a stack
//! position. The session id is unique per adapter: indices written by an
//! earlier page load (or another adapter) are never trusted.
//!
//! Entries the adapter did not write are unknown. When a traversal lands on
//! one, the stack is re-anchored on it: it becomes the only entry, at index 0,
//! rebuilt from `window.location`.
//!
//! `history.go` is asynchronous in the browser. Traversals are queued until
//! their `popstate` arrives and [`History::settled`] resolves once the queue
//! is empty.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{PopStateEvent, Window};

use super::{History, ListenerId, NavigationEntry, PopEvent, PopListener, PopListeners, clamp_target};
use crate::error::HistoryError;
use crate::location::normalize_path;

#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
	session: String,
	index: usize,
	#[serde(default)]
	state: serde_json::Value,
}

/// A `go` issued but not yet confirmed by a `popstate`.
#[derive(Debug, Clone, Copy)]
struct Traversal {
	target: usize,
	silent: bool,
}

struct Inner {
	window: Window,
	base: String,
	session: String,
	entries: RefCell<Vec<NavigationEntry>>,
	index: Cell<usize>,
	pending: RefCell<VecDeque<Traversal>>,
	settle_waiters: RefCell<Vec<oneshot::Sender<()>>>,
	listeners: PopListeners,
}

impl Inner {
	fn host(&self) -> Result<web_sys::History, HistoryError> {
		self.window.history().map_err(js_error)
	}

	fn url_for(&self, full_path: &str) -> String {
		if self.base.is_empty() {
			full_path.to_string()
		} else if full_path == "/" {
			self.base.clone()
		} else {
			format!("{}{}", self.base, full_path)
		}
	}

	fn write(&self, entry: &NavigationEntry, index: usize, replace: bool) -> Result<(), HistoryError> {
		let stored = StoredState {
			session: self.session.clone(),
			index,
			state: entry.state.clone(),
		};
		let json = serde_json::to_string(&stored).map_err(|e| HistoryError::State(e.to_string()))?;
		let url = self.url_for(&entry.full_path);
		let host = self.host()?;
		let result = if replace {
			host.replace_state_with_url(&JsValue::from_str(&json), "", Some(&url))
		} else {
			host.push_state_with_url(&JsValue::from_str(&json), "", Some(&url))
		};
		result.map_err(js_error)
	}

	/// Returns the stack position stored in `event`, if this adapter wrote it.
	fn own_index(&self, event: &PopStateEvent) -> Option<usize> {
		let stored = event
			.state()
			.as_string()
			.and_then(|json| serde_json::from_str::<StoredState>(&json).ok())?;
		(stored.session == self.session && stored.index < self.entries.borrow().len())
			.then_some(stored.index)
	}

	fn on_popstate(&self, event: &PopStateEvent) {
		let from_index = self.index.get();
		let Some(to_index) = self.own_index(event) else {
			self.pending.borrow_mut().clear();
			self.reanchor(from_index);
			self.wake_settled();
			return;
		};

		self.index.set(to_index);
		let traversal = self.pending.borrow_mut().pop_front();
		if self.pending.borrow().is_empty() {
			self.wake_settled();
		}
		if traversal.is_some_and(|t| t.silent && t.target == to_index) || to_index == from_index {
			return;
		}

		let Some(entry) = self.entries.borrow().get(to_index).cloned() else {
			return;
		};
		self.listeners.emit(&PopEvent {
			from_index,
			to_index,
			delta: to_index as isize - from_index as isize,
			entry,
		});
	}

	/// Rebuilds the stack around the entry the browser is showing.
	fn reanchor(&self, from_index: usize) {
		let entry = match location_entry(&self.window, &self.base) {
			Ok(entry) => entry,
			Err(err) => {
				tracing::warn!(error = %err, "failed to read location after popstate");
				return;
			}
		};
		tracing::debug!(path = %entry.full_path, "popstate reached an unknown entry, re-anchoring history");

		*self.entries.borrow_mut() = vec![entry.clone()];
		self.index.set(0);
		if let Err(err) = self.write(&entry, 0, true) {
			tracing::warn!(error = %err, "failed to tag re-anchored entry");
		}
		self.listeners.emit(&PopEvent {
			from_index,
			to_index: 0,
			delta: -(from_index as isize),
			entry,
		});
	}

	fn wake_settled(&self) {
		let waiters: Vec<oneshot::Sender<()>> = self.settle_waiters.borrow_mut().drain(..).collect();
		for waiter in waiters {
			let _ = waiter.send(());
		}
	}
}

/// History adapter that mirrors the stack into the browser.
pub struct BrowserHistory {
	inner: Rc<Inner>,
	on_popstate: Closure<dyn FnMut(PopStateEvent)>,
}

impl BrowserHistory {
	/// Creates an adapter for the current page without a base path.
	pub fn new() -> Result<Self, HistoryError> {
		Self::with_base("")
	}

	/// Creates an adapter serving the application under `base`
	/// (for example `/app`).
	///
	/// # Errors
	///
	/// Returns [`HistoryError::Unavailable`] outside a browser window and
	/// [`HistoryError::Host`] when the browser rejects the initial write.
	pub fn with_base(base: &str) -> Result<Self, HistoryError> {
		let window = web_sys::window()
			.ok_or_else(|| HistoryError::Unavailable("no global `window`".to_string()))?;
		let base = match normalize_path(base).as_str() {
			"/" => String::new(),
			normalized => normalized.to_string(),
		};
		let initial = location_entry(&window, &base)?;

		let inner = Rc::new(Inner {
			window,
			base,
			session: session_id(),
			entries: RefCell::new(vec![initial.clone()]),
			index: Cell::new(0),
			pending: RefCell::new(VecDeque::new()),
			settle_waiters: RefCell::new(Vec::new()),
			listeners: PopListeners::default(),
		});
		inner.write(&initial, 0, true)?;

		let weak: Weak<Inner> = Rc::downgrade(&inner);
		let on_popstate = Closure::wrap(Box::new(move |event: PopStateEvent| {
			if let Some(inner) = weak.upgrade() {
				inner.on_popstate(&event);
			}
		}) as Box<dyn FnMut(PopStateEvent)>);
		inner
			.window
			.add_event_listener_with_callback("popstate", on_popstate.as_ref().unchecked_ref())
			.map_err(js_error)?;

		tracing::debug!(base = %inner.base, path = %initial.full_path, "browser history attached");
		Ok(Self { inner, on_popstate })
	}

	/// Returns the base path prefix.
	pub fn base(&self) -> &str {
		&self.inner.base
	}
}

impl Drop for BrowserHistory {
	fn drop(&mut self) {
		let _ = self.inner.window.remove_event_listener_with_callback(
			"popstate",
			self.on_popstate.as_ref().unchecked_ref(),
		);
		self.inner.wake_settled();
	}
}

impl fmt::Debug for BrowserHistory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BrowserHistory")
			.field("base", &self.inner.base)
			.field("session", &self.inner.session)
			.field("len", &self.inner.entries.borrow().len())
			.field("index", &self.inner.index.get())
			.field("pending", &self.inner.pending.borrow().len())
			.finish()
	}
}

impl History for BrowserHistory {
	fn push(&self, entry: NavigationEntry) -> Result<(), HistoryError> {
		let index = self.inner.index.get() + 1;
		self.inner.write(&entry, index, false)?;
		let mut entries = self.inner.entries.borrow_mut();
		entries.truncate(index);
		entries.push(entry);
		self.inner.index.set(index);
		Ok(())
	}

	fn replace(&self, entry: NavigationEntry) -> Result<(), HistoryError> {
		let index = self.inner.index.get();
		self.inner.write(&entry, index, true)?;
		if let Some(current) = self.inner.entries.borrow_mut().get_mut(index) {
			*current = entry;
		}
		Ok(())
	}

	fn go(&self, delta: isize, notify: bool) -> Result<(), HistoryError> {
		// Queued traversals have not landed yet; count from where they end.
		let from_index = self
			.inner
			.pending
			.borrow()
			.back()
			.map_or(self.inner.index.get(), |t| t.target);
		let to_index = clamp_target(from_index, delta, self.inner.entries.borrow().len());
		if to_index == from_index {
			return Ok(());
		}

		let steps = i32::try_from(to_index as isize - from_index as isize)
			.map_err(|_| HistoryError::Host(format!("cannot traverse {} entries", delta)))?;
		self.inner.host()?.go_with_delta(steps).map_err(js_error)?;
		self.inner.pending.borrow_mut().push_back(Traversal {
			target: to_index,
			silent: !notify,
		});
		Ok(())
	}

	fn settled(&self) -> LocalBoxFuture<'static, ()> {
		if self.inner.pending.borrow().is_empty() {
			return future::ready(()).boxed_local();
		}
		let (sender, receiver) = oneshot::channel();
		self.inner.settle_waiters.borrow_mut().push(sender);
		receiver.map(|_| ()).boxed_local()
	}

	fn current_path(&self) -> String {
		self.inner
			.entries
			.borrow()
			.get(self.inner.index.get())
			.map(|entry| entry.full_path.clone())
			.unwrap_or_else(|| "/".to_string())
	}

	fn current_index(&self) -> usize {
		self.inner.index.get()
	}

	fn len(&self) -> usize {
		self.inner.entries.borrow().len()
	}

	fn entries(&self) -> Vec<NavigationEntry> {
		self.inner.entries.borrow().clone()
	}

	fn subscribe(&self, listener: PopListener) -> ListenerId {
		self.inner.listeners.add(listener)
	}

	fn unsubscribe(&self, id: ListenerId) {
		self.inner.listeners.remove(id);
	}
}

/// Builds an entry from `window.location`, with `base` stripped.
fn location_entry(window: &Window, base: &str) -> Result<NavigationEntry, HistoryError> {
	let location = window.location();
	let pathname = location.pathname().map_err(js_error)?;
	let search = location.search().map_err(js_error)?;
	let hash = location.hash().map_err(js_error)?;
	let path = pathname
		.strip_prefix(base)
		.filter(|rest| rest.is_empty() || rest.starts_with('/'))
		.unwrap_or(&pathname);
	Ok(NavigationEntry::new(format!("{}{}{}", normalize_path(path), search, hash)))
}

fn session_id() -> String {
	let random = (js_sys::Math::random() * f64::from(u32::MAX)) as u32;
	format!("{:x}-{:08x}", js_sys::Date::now() as u64, random)
}

fn js_error(value: JsValue) -> HistoryError {
	HistoryError::Host(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
}
