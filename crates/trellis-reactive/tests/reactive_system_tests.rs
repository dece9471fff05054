//! Integration tests for the reactive system
//!
//! Covers:
//! 1. Batching: many writes, one run per affected effect per flush
//! 2. First-scheduled execution order
//! 3. Panic during flush keeps unrelated updates queued
//! 4. Ownership trees and context propagation across flushes

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use proptest::prelude::*;
use rstest::rstest;
use trellis_reactive::{Effect, FlushTask, Memo, Runtime, RuntimeOptions, Scope, Signal};

fn counting_effect(rt: &Runtime, deps: Vec<Signal<i32>>, log: Rc<RefCell<Vec<usize>>>, tag: usize) -> Effect {
	Effect::new(rt, move || {
		for dep in &deps {
			dep.get();
		}
		log.borrow_mut().push(tag);
	})
}

#[rstest]
fn test_writes_are_batched_until_flush() {
	let rt = Runtime::new();
	let count = Signal::new(&rt, 0);
	let seen = Rc::new(RefCell::new(Vec::new()));

	let (c, s) = (count.clone(), seen.clone());
	Effect::new(&rt, move || s.borrow_mut().push(c.get()));

	for n in 1..=5 {
		count.set(n);
	}
	assert_eq!(*seen.borrow(), vec![0]);
	assert_eq!(rt.pending_count(), 1);

	assert_eq!(rt.flush(), 1);
	assert_eq!(*seen.borrow(), vec![0, 5]);
}

#[rstest]
fn test_effects_run_in_first_scheduled_order() {
	let rt = Runtime::new();
	let a = Signal::new(&rt, 0);
	let b = Signal::new(&rt, 0);
	let log = Rc::new(RefCell::new(Vec::new()));

	counting_effect(&rt, vec![a.clone()], log.clone(), 1);
	counting_effect(&rt, vec![b.clone()], log.clone(), 2);
	log.borrow_mut().clear();

	b.set(1);
	a.set(1);
	b.set(2);
	rt.flush();

	assert_eq!(*log.borrow(), vec![2, 1]);
}

#[rstest]
fn test_writes_during_flush_start_a_new_batch() {
	let rt = Runtime::new();
	let source = Signal::new(&rt, 0);
	let mirror = Signal::new(&rt, 0);
	let seen = Rc::new(RefCell::new(Vec::new()));

	let (s, m) = (source.clone(), mirror.clone());
	Effect::new(&rt, move || m.set(s.get()));
	let (m, log) = (mirror.clone(), seen.clone());
	Effect::new(&rt, move || log.borrow_mut().push(m.get()));

	source.set(3);
	assert_eq!(rt.flush(), 1);
	assert!(rt.has_pending());
	assert_eq!(rt.flush(), 1);

	assert_eq!(*seen.borrow(), vec![0, 3]);
}

#[rstest]
fn test_panicking_effect_requeues_rest_of_batch() {
	let rt = Runtime::new();
	let host_queue: Rc<RefCell<Vec<FlushTask>>> = Rc::default();
	let q = host_queue.clone();
	rt.set_flush_hook(move |task| q.borrow_mut().push(task));
	let trigger = Signal::new(&rt, 0);
	let healthy_runs = Rc::new(Cell::new(0));

	let t = trigger.clone();
	Effect::new(&rt, move || {
		if t.get() == 1 {
			panic!("boom");
		}
	});
	let (t, runs) = (trigger.clone(), healthy_runs.clone());
	Effect::new(&rt, move || {
		t.get();
		runs.set(runs.get() + 1);
	});

	trigger.set(1);
	let task = host_queue.borrow_mut().pop().unwrap();
	let result = catch_unwind(AssertUnwindSafe(task));
	assert!(result.is_err());
	assert_eq!(healthy_runs.get(), 1);
	assert_eq!(rt.pending_count(), 1);

	// the re-queued tail asked the host for its own flush
	let tasks: Vec<FlushTask> = host_queue.borrow_mut().drain(..).collect();
	assert_eq!(tasks.len(), 1);
	for task in tasks {
		task();
	}
	assert_eq!(healthy_runs.get(), 2);
	assert_eq!(rt.pending_count(), 0);
}

#[rstest]
fn test_run_until_idle_stops_at_round_limit() {
	let rt = Runtime::with_options(RuntimeOptions::new().max_flush_rounds(4));
	let counter = Signal::new(&rt, 0);

	// Feeds itself on every run
	let c = counter.clone();
	Effect::new(&rt, move || {
		let next = c.get() + 1;
		c.set(next);
	});

	rt.run_until_idle();

	assert!(rt.has_pending());
	assert_eq!(counter.get_untracked(), 5);
}

#[rstest]
fn test_memo_chain_settles() {
	let rt = Runtime::new();
	let base = Signal::new(&rt, 1);

	let b = base.clone();
	let doubled = Memo::new(&rt, move || b.get() * 2);
	let d = doubled.clone();
	let quadrupled = Memo::new(&rt, move || d.get() * 2);

	base.set(3);
	rt.run_until_idle();

	assert_eq!(quadrupled.get(), 12);
}

#[rstest]
fn test_scope_tears_down_effect_tree() {
	let rt = Runtime::new();
	let signal = Signal::new(&rt, 0);
	let scope = Scope::new(&rt);

	let (s, runtime) = (signal.clone(), rt.clone());
	scope.run(|| {
		Effect::new(&rt, move || {
			let s = s.clone();
			Effect::new(&runtime, move || {
				s.get();
			});
		});
	});
	assert_eq!(rt.effect_count(), 2);

	scope.dispose();

	assert_eq!(rt.effect_count(), 0);
	assert_eq!(rt.subscriber_count(signal.id()), 0);
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(50))]

	/// Property: after any sequence of writes, one flush runs every affected
	/// effect exactly once, in the order it was first scheduled.
	#[test]
	fn test_batching_property(
		subscriptions in prop::collection::vec(prop::collection::vec(0usize..4, 1..4), 1..6),
		writes in prop::collection::vec((0usize..4, any::<i32>()), 0..20),
	) {
		let rt = Runtime::new();
		let cells: Vec<Signal<i32>> = (0..4).map(|_| Signal::new(&rt, 0)).collect();
		let log = Rc::new(RefCell::new(Vec::new()));

		for (tag, deps) in subscriptions.iter().enumerate() {
			let deps = deps.iter().map(|&i| cells[i].clone()).collect();
			counting_effect(&rt, deps, log.clone(), tag);
		}
		log.borrow_mut().clear();

		let mut values = [0i32; 4];
		let mut expected: Vec<usize> = Vec::new();
		for &(cell, value) in &writes {
			if values[cell] == value {
				continue;
			}
			values[cell] = value;
			cells[cell].set(value);
			for (tag, deps) in subscriptions.iter().enumerate() {
				if deps.contains(&cell) && !expected.contains(&tag) {
					expected.push(tag);
				}
			}
		}

		rt.flush();

		prop_assert_eq!(log.borrow().clone(), expected);
		prop_assert!(!rt.has_pending());
	}
}
