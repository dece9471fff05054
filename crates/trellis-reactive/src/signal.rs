//! Signal - Fine-grained Reactive Primitive
//!
//! `Signal<T>` is the core reactive primitive that holds a value and automatically
//! tracks dependencies when accessed.
//!
//! ## Key Features
//!
//! - **Automatic Dependency Tracking**: When `get()` is called inside an Effect or Memo,
//!   the dependency is automatically recorded.
//! - **Change Notification**: `set()` stores a different value and schedules every
//!   dependent; an equal value is ignored. `update()` always notifies.
//! - **Lightweight**: Clones share the value via `Rc<RefCell<T>>`.
//!
//! ## Example
//!
//! ```ignore
//! use trellis_reactive::{Runtime, Signal};
//!
//! let rt = Runtime::new();
//! let count = Signal::new(&rt, 0);
//!
//! assert_eq!(count.get(), 0);
//! count.set(42);
//! count.update(|n| *n += 1);
//! assert_eq!(count.get(), 43);
//! ```

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

use crate::runtime::{NodeId, Runtime, WeakRuntime};

/// A reactive signal that holds a value and tracks dependencies
///
/// ## Cloning
///
/// `Signal<T>` implements `Clone` and shares the value via `Rc<RefCell<T>>`.
/// All clones of the same Signal share the same underlying value. When the
/// last clone is dropped, the signal leaves the dependency graph.
pub struct Signal<T: 'static> {
	/// Unique identifier for this signal
	id: NodeId,
	/// The actual value, shared via reference counting
	value: Rc<RefCell<T>>,
	runtime: WeakRuntime,
}

impl<T: 'static> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			value: self.value.clone(),
			runtime: self.runtime.clone(),
		}
	}
}

impl<T: 'static> Signal<T> {
	/// Create a new Signal with the given initial value
	pub fn new(rt: &Runtime, value: T) -> Self {
		Self {
			id: NodeId::new(),
			value: Rc::new(RefCell::new(value)),
			runtime: rt.downgrade(),
		}
	}

	/// Get the current value and register it as a dependency of the running observer
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.track();
		self.value.borrow().clone()
	}

	/// Get the current value without tracking
	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.value.borrow().clone()
	}

	/// Borrow the value, tracking the read.
	///
	/// Writing to the same signal from inside `f` panics.
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		self.track();
		f(&self.value.borrow())
	}

	pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&self.value.borrow())
	}

	/// Replace the value, notifying dependents only if it changed.
	pub fn set(&self, value: T)
	where
		T: PartialEq,
	{
		{
			let mut slot = self.value.borrow_mut();
			if *slot == value {
				return;
			}
			*slot = value;
		}
		self.notify();
	}

	/// Mutate the value in place and notify dependents.
	pub fn update<F>(&self, f: F)
	where
		F: FnOnce(&mut T),
	{
		f(&mut self.value.borrow_mut());
		self.notify();
	}

	/// Get the unique ID of this signal
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Read-only view sharing this signal's value
	pub fn read_only(&self) -> ReadSignal<T> {
		ReadSignal(self.clone())
	}

	/// Write-only view sharing this signal's value
	pub fn write_only(&self) -> WriteSignal<T> {
		WriteSignal(self.clone())
	}

	fn track(&self) {
		if let Some(rt) = self.runtime.upgrade() {
			rt.track_dependency(self.id);
		}
	}

	fn notify(&self) {
		if let Some(rt) = self.runtime.upgrade() {
			rt.notify_signal_change(self.id);
		}
	}
}

impl<T: 'static> Drop for Signal<T> {
	fn drop(&mut self) {
		// Only the last clone removes the node
		if Rc::strong_count(&self.value) == 1 {
			if let Some(rt) = self.runtime.upgrade() {
				rt.remove_node(self.id);
			}
		}
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signal")
			.field("id", &self.id)
			.field("value", &*self.value.borrow())
			.finish()
	}
}

/// Read half of a signal
pub struct ReadSignal<T: 'static>(Signal<T>);

impl<T: 'static> Clone for ReadSignal<T> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<T: 'static> ReadSignal<T> {
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.0.get()
	}

	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.0.get_untracked()
	}

	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		self.0.with(f)
	}

	pub fn id(&self) -> NodeId {
		self.0.id()
	}
}

/// Write half of a signal
pub struct WriteSignal<T: 'static>(Signal<T>);

impl<T: 'static> Clone for WriteSignal<T> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<T: 'static> WriteSignal<T> {
	pub fn set(&self, value: T)
	where
		T: PartialEq,
	{
		self.0.set(value);
	}

	pub fn update(&self, f: impl FnOnce(&mut T)) {
		self.0.update(f);
	}

	pub fn id(&self) -> NodeId {
		self.0.id()
	}
}

/// Create a signal and split it into its read and write halves.
///
/// # Example
///
/// ```ignore
/// let (count, set_count) = create_signal(&rt, 0);
/// set_count.set(1);
/// assert_eq!(count.get(), 1);
/// ```
pub fn create_signal<T: 'static>(rt: &Runtime, value: T) -> (ReadSignal<T>, WriteSignal<T>) {
	let signal = Signal::new(rt, value);
	(signal.read_only(), signal.write_only())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Effect;
	use core::cell::Cell;
	use rstest::rstest;

	#[rstest]
	fn test_signal_creation() {
		let rt = Runtime::new();
		let signal = Signal::new(&rt, 42);
		assert_eq!(signal.get_untracked(), 42);
	}

	#[rstest]
	fn test_signal_set_and_update() {
		let rt = Runtime::new();
		let signal = Signal::new(&rt, 0);

		signal.set(10);
		assert_eq!(signal.get(), 10);

		signal.update(|n| *n += 5);
		assert_eq!(signal.get(), 15);
	}

	#[rstest]
	fn test_signal_clone_shares_value() {
		let rt = Runtime::new();
		let a = Signal::new(&rt, "a".to_string());
		let b = a.clone();

		b.set("b".to_string());

		assert_eq!(a.get(), "b");
		assert_eq!(a.id(), b.id());
	}

	#[rstest]
	fn test_set_equal_value_does_not_notify() {
		let rt = Runtime::new();
		let signal = Signal::new(&rt, 1);
		let runs = Rc::new(Cell::new(0));

		let (s, r) = (signal.clone(), runs.clone());
		Effect::new(&rt, move || {
			s.get();
			r.set(r.get() + 1);
		});

		signal.set(1);
		assert!(!rt.has_pending());

		signal.update(|_| {});
		assert!(rt.has_pending());
		rt.flush();
		assert_eq!(runs.get(), 2);
	}

	#[rstest]
	fn test_untracked_reads_do_not_subscribe() {
		let rt = Runtime::new();
		let signal = Signal::new(&rt, 0);

		let s = signal.clone();
		Effect::new(&rt, move || {
			s.get_untracked();
			s.with_untracked(|_| ());
		});

		assert_eq!(rt.subscriber_count(signal.id()), 0);
	}

	#[rstest]
	fn test_repeated_reads_register_once() {
		let rt = Runtime::new();
		let signal = Signal::new(&rt, 0);

		let s = signal.clone();
		let effect = Effect::new(&rt, move || {
			for _ in 0..10 {
				s.get();
				s.with(|_| ());
			}
		});

		assert_eq!(rt.subscriber_count(signal.id()), 1);
		assert_eq!(rt.dependency_count(effect.id()), 1);
	}

	#[rstest]
	fn test_split_signal() {
		let rt = Runtime::new();
		let (read, write) = create_signal(&rt, vec![1]);

		write.update(|v| v.push(2));

		assert_eq!(read.get(), vec![1, 2]);
		assert_eq!(read.id(), write.id());
	}

	#[rstest]
	fn test_drop_last_clone_removes_node() {
		let rt = Runtime::new();
		let signal = Signal::new(&rt, 0);
		let id = signal.id();

		let s = signal.clone();
		Effect::new(&rt, move || {
			s.get();
		});
		assert!(rt.has_node(id));

		drop(signal);
		// the effect still holds a clone
		assert!(rt.has_node(id));
	}
}
