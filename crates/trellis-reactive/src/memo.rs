//! Memo - Derived Reactive Values
//!
//! A `Memo<T>` is a read-only cell whose value is computed from other signals.
//! An internal effect recomputes it when a dependency changes, and dependents
//! of the memo are only notified when the recomputed value differs.
//!
//! ## Example
//!
//! ```ignore
//! let count = Signal::new(&rt, 2);
//! let c = count.clone();
//! let doubled = Memo::new(&rt, move || c.get() * 2);
//!
//! assert_eq!(doubled.get(), 4);
//! count.set(5);
//! rt.run_until_idle();
//! assert_eq!(doubled.get(), 10);
//! ```

use crate::effect::Effect;
use crate::runtime::{NodeId, Runtime};
use crate::signal::Signal;

/// A derived, read-only reactive value
pub struct Memo<T: 'static> {
	signal: Signal<T>,
	effect: Effect,
}

impl<T: 'static> Clone for Memo<T> {
	fn clone(&self) -> Self {
		Self {
			signal: self.signal.clone(),
			effect: self.effect.clone(),
		}
	}
}

impl<T: Clone + PartialEq + 'static> Memo<T> {
	/// Create a memo computing its value with `f`.
	///
	/// `f` runs once immediately, then again whenever a signal it read changes.
	pub fn new<F>(rt: &Runtime, f: F) -> Self
	where
		F: Fn() -> T + 'static,
	{
		let id = NodeId::new();
		let initial = rt.with_observer(id, &f);
		let signal = Signal::new(rt, initial);

		let writer = signal.clone();
		let effect = Effect::register(rt, id, move || {
			writer.set(f());
			None
		});

		Self { signal, effect }
	}
}

impl<T: 'static> Memo<T> {
	/// Get the current value and track it
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.signal.get()
	}

	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.signal.get_untracked()
	}

	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		self.signal.with(f)
	}

	/// ID of the cell dependents subscribe to
	pub fn id(&self) -> NodeId {
		self.signal.id()
	}

	/// Stop recomputing; the last value stays readable.
	pub fn dispose(&self) {
		self.effect.dispose();
	}
}

impl<T: core::fmt::Debug + 'static> core::fmt::Debug for Memo<T> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Memo").field("signal", &self.signal).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use core::cell::Cell;
	use rstest::rstest;
	use std::rc::Rc;

	#[rstest]
	fn test_memo_initial_value() {
		let rt = Runtime::new();
		let count = Signal::new(&rt, 3);

		let c = count.clone();
		let doubled = Memo::new(&rt, move || c.get() * 2);

		assert_eq!(doubled.get(), 6);
		assert_eq!(rt.subscriber_count(count.id()), 1);
	}

	#[rstest]
	fn test_memo_recomputes_after_flush() {
		let rt = Runtime::new();
		let count = Signal::new(&rt, 1);

		let c = count.clone();
		let doubled = Memo::new(&rt, move || c.get() * 2);
		count.set(4);
		rt.flush();

		assert_eq!(doubled.get(), 8);
	}

	#[rstest]
	fn test_memo_skips_dependents_when_value_unchanged() {
		let rt = Runtime::new();
		let count = Signal::new(&rt, 2);
		let runs = Rc::new(Cell::new(0));

		let c = count.clone();
		let parity = Memo::new(&rt, move || c.get() % 2);
		let (p, r) = (parity.clone(), runs.clone());
		Effect::new(&rt, move || {
			p.get();
			r.set(r.get() + 1);
		});

		count.set(4);
		rt.run_until_idle();
		assert_eq!(runs.get(), 1);

		count.set(5);
		rt.run_until_idle();
		assert_eq!(runs.get(), 2);
		assert_eq!(parity.get(), 1);
	}

	#[rstest]
	fn test_disposed_memo_keeps_last_value() {
		let rt = Runtime::new();
		let count = Signal::new(&rt, 1);

		let c = count.clone();
		let memo = Memo::new(&rt, move || c.get() + 1);
		memo.dispose();
		count.set(10);
		rt.run_until_idle();

		assert_eq!(memo.get(), 2);
		assert_eq!(rt.subscriber_count(count.id()), 0);
	}
}
