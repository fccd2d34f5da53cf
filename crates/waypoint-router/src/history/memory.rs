//! In-memory history stack.

use std::cell::{Cell, RefCell};
use std::fmt;

use super::{History, ListenerId, NavigationEntry, PopEvent, PopListener, PopListeners, clamp_target};
use crate::error::HistoryError;

/// History adapter that keeps the stack in process.
///
/// Pop events are delivered synchronously from inside [`History::go`].
pub struct MemoryHistory {
	entries: RefCell<Vec<NavigationEntry>>,
	index: Cell<usize>,
	listeners: PopListeners,
}

impl MemoryHistory {
	/// Creates a stack holding one entry for `initial_path`.
	pub fn new(initial_path: impl Into<String>) -> Self {
		Self {
			entries: RefCell::new(vec![NavigationEntry::new(initial_path)]),
			index: Cell::new(0),
			listeners: PopListeners::default(),
		}
	}

	/// Returns the current entry.
	pub fn current_entry(&self) -> Option<NavigationEntry> {
		self.entries.borrow().get(self.index.get()).cloned()
	}

	/// Returns the number of registered pop listeners.
	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}
}

impl Default for MemoryHistory {
	fn default() -> Self {
		Self::new("/")
	}
}

impl fmt::Debug for MemoryHistory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryHistory")
			.field("entries", &self.entries.borrow())
			.field("index", &self.index.get())
			.finish()
	}
}

impl History for MemoryHistory {
	fn push(&self, entry: NavigationEntry) -> Result<(), HistoryError> {
		let mut entries = self.entries.borrow_mut();
		entries.truncate(self.index.get() + 1);
		entries.push(entry);
		self.index.set(entries.len() - 1);
		Ok(())
	}

	fn replace(&self, entry: NavigationEntry) -> Result<(), HistoryError> {
		let mut entries = self.entries.borrow_mut();
		match entries.get_mut(self.index.get()) {
			Some(current) => *current = entry,
			None => entries.push(entry),
		}
		Ok(())
	}

	fn go(&self, delta: isize, notify: bool) -> Result<(), HistoryError> {
		let from_index = self.index.get();
		let (to_index, entry) = {
			let entries = self.entries.borrow();
			let to_index = clamp_target(from_index, delta, entries.len());
			(to_index, entries.get(to_index).cloned())
		};
		if to_index == from_index {
			return Ok(());
		}
		self.index.set(to_index);

		if notify {
			if let Some(entry) = entry {
				let event = PopEvent {
					from_index,
					to_index,
					delta: to_index as isize - from_index as isize,
					entry,
				};
				self.listeners.emit(&event);
			}
		}
		Ok(())
	}

	fn current_path(&self) -> String {
		self.current_entry()
			.map(|entry| entry.full_path)
			.unwrap_or_else(|| "/".to_string())
	}

	fn current_index(&self) -> usize {
		self.index.get()
	}

	fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	fn entries(&self) -> Vec<NavigationEntry> {
		self.entries.borrow().clone()
	}

	fn subscribe(&self, listener: PopListener) -> ListenerId {
		self.listeners.add(listener)
	}

	fn unsubscribe(&self, id: ListenerId) {
		self.listeners.remove(id);
	}
}
