//! History adapters.
//!
//! A history adapter owns the ordered stack of [`NavigationEntry`] values
//! and the index of the current one. The router drives it with `push`,
//! `replace` and `go`; traversals started from outside (the browser's
//! back button, or [`History::back`]) are reported to subscribers as
//! [`PopEvent`]s.
//!
//! Two adapters are provided:
//!
//! - [`MemoryHistory`] keeps the stack in process and delivers pop events
//!   synchronously. It is the adapter for tests and headless hosts.
//! - `BrowserHistory` (only on `wasm32`) mirrors the stack into
//!   `window.history` and translates `popstate` events.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;

pub mod memory;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use memory::MemoryHistory;

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserHistory;

/// One item of the history stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationEntry {
	/// Concrete path including query and hash.
	pub full_path: String,
	/// App-opaque state stored alongside the entry.
	#[serde(default)]
	pub state: serde_json::Value,
}

impl NavigationEntry {
	/// Creates an entry without state.
	pub fn new(full_path: impl Into<String>) -> Self {
		Self {
			full_path: full_path.into(),
			state: serde_json::Value::Null,
		}
	}

	/// Attaches state to the entry.
	pub fn with_state(mut self, state: serde_json::Value) -> Self {
		self.state = state;
		self
	}
}

/// Notification that the stack moved because of a back/forward traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct PopEvent {
	/// Index before the traversal.
	pub from_index: usize,
	/// Index after the traversal.
	pub to_index: usize,
	/// Signed number of entries traversed.
	pub delta: isize,
	/// The entry that is now current.
	pub entry: NavigationEntry,
}

/// Handle identifying a pop listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback invoked on every [`PopEvent`].
pub type PopListener = Rc<dyn Fn(&PopEvent)>;

/// Capability set shared by every history adapter.
///
/// Methods take `&self`; adapters use interior mutability so the router and
/// the host can share one instance behind an `Rc`.
pub trait History {
	/// Truncates forward history, then appends `entry` and makes it current.
	fn push(&self, entry: NavigationEntry) -> Result<(), HistoryError>;

	/// Overwrites the current entry.
	fn replace(&self, entry: NavigationEntry) -> Result<(), HistoryError>;

	/// Moves `delta` entries, clamped to the stack bounds.
	///
	/// Moving zero entries is a no-op. With `notify == false` the move is
	/// not reported to listeners; the router uses this to undo a pop it
	/// rejected.
	fn go(&self, delta: isize, notify: bool) -> Result<(), HistoryError>;

	/// Moves `n` entries back and notifies listeners.
	fn back(&self, n: usize) -> Result<(), HistoryError> {
		self.go(steps(n).saturating_neg(), true)
	}

	/// Moves `n` entries forward and notifies listeners.
	fn forward(&self, n: usize) -> Result<(), HistoryError> {
		self.go(steps(n), true)
	}

	/// Resolves once every traversal started with [`go`](Self::go) has
	/// landed.
	///
	/// Adapters whose traversals are applied synchronously resolve
	/// immediately. The router awaits this before writing a new entry, so a
	/// pending traversal cannot be discarded by a `push`.
	fn settled(&self) -> LocalBoxFuture<'static, ()> {
		future::ready(()).boxed_local()
	}

	/// Returns the full path of the current entry.
	fn current_path(&self) -> String;

	/// Returns the index of the current entry.
	fn current_index(&self) -> usize;

	/// Returns the number of entries.
	fn len(&self) -> usize;

	/// Returns whether the stack is empty.
	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns a copy of the whole stack.
	fn entries(&self) -> Vec<NavigationEntry>;

	/// Registers a pop listener.
	fn subscribe(&self, listener: PopListener) -> ListenerId;

	/// Removes a pop listener. Unknown ids are ignored.
	fn unsubscribe(&self, id: ListenerId);
}

/// Listener registry shared by the adapters.
#[derive(Default)]
pub(crate) struct PopListeners {
	next_id: Cell<u64>,
	listeners: RefCell<Vec<(ListenerId, PopListener)>>,
}

impl PopListeners {
	pub(crate) fn add(&self, listener: PopListener) -> ListenerId {
		let id = ListenerId(self.next_id.get());
		self.next_id.set(id.0 + 1);
		self.listeners.borrow_mut().push((id, listener));
		id
	}

	pub(crate) fn remove(&self, id: ListenerId) {
		self.listeners.borrow_mut().retain(|(existing, _)| *existing != id);
	}

	/// Delivers `event` to a snapshot of the listeners, so listeners may
	/// (un)subscribe while being notified.
	pub(crate) fn emit(&self, event: &PopEvent) {
		let snapshot: Vec<PopListener> = self
			.listeners
			.borrow()
			.iter()
			.map(|(_, listener)| Rc::clone(listener))
			.collect();
		for listener in snapshot {
			listener(event);
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.listeners.borrow().len()
	}
}

/// Converts an entry count into a signed step count, saturating at `isize::MAX`.
fn steps(n: usize) -> isize {
	isize::try_from(n).unwrap_or(isize::MAX)
}

/// Clamps `index + delta` into `0..len`.
pub(crate) fn clamp_target(index: usize, delta: isize, len: usize) -> usize {
	let last = steps(len.saturating_sub(1));
	steps(index).saturating_add(delta).clamp(0, last) as usize
}
