//! Render metadata attached to live nodes.

use core::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_reactive::{Effect, Scope, Signal};

use crate::directive::BoundDirective;
use crate::dom::EventHandler;
use crate::error::RenderError;
use crate::expand::Chain;
use crate::view::{DynamicChild, FallbackFn, Key, Repeat, View};

/// What a slot wrapper holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotKind {
	Dynamic,
	Chain,
	Repeat,
	Boundary,
	Fragment,
}

impl SlotKind {
	pub(crate) fn as_str(self) -> &'static str {
		match self {
			Self::Dynamic => "dyn",
			Self::Chain => "if",
			Self::Repeat => "for",
			Self::Boundary => "boundary",
			Self::Fragment => "fragment",
		}
	}
}

/// Error state of a boundary slot.
#[derive(Clone)]
pub(crate) struct BoundaryState {
	/// Set by descendants failing after construction
	pub(crate) failure: Signal<Option<RenderError>>,
	pub(crate) fallback: Rc<RefCell<FallbackFn>>,
	/// The slot currently holds the fallback
	pub(crate) showing: Rc<Cell<bool>>,
}

/// Description feeding a slot's content.
#[derive(Clone)]
pub(crate) enum SlotSource {
	Dynamic(DynamicChild),
	Chain(Chain),
	Repeat(Repeat),
	/// Fragment returned by a component
	Fragment(View),
	Boundary(BoundaryState),
}

pub(crate) struct SlotState {
	pub(crate) kind: SlotKind,
	pub(crate) source: SlotSource,
	/// Keeps the content up to date; `None` for content filled once
	pub(crate) effect: Option<Effect>,
	/// Branch of a conditional chain currently materialized
	pub(crate) active_branch: Option<usize>,
}

impl SlotState {
	pub(crate) fn new(kind: SlotKind, source: SlotSource) -> Self {
		Self {
			kind,
			source,
			effect: None,
			active_branch: None,
		}
	}
}

#[derive(Default)]
pub(crate) struct NodeMeta {
	pub(crate) key: Option<Key>,
	/// Descriptions this node was built from, outermost first: every
	/// component layer, then the element/text/fragment it rendered.
	pub(crate) lineage: Vec<View>,
	/// Built under `t-once`; patches leave it alone
	pub(crate) frozen: bool,
	pub(crate) slot: Option<SlotState>,
	/// Owns what the component bodies in the lineage created
	pub(crate) scope: Option<Scope>,
	/// Attribute, visibility, model and content effects
	pub(crate) bindings: Vec<Effect>,
	/// Listeners installed from event attributes and `t-model`
	pub(crate) listeners: Vec<(String, EventHandler)>,
	/// Last state `t-show` applied, `None` without `t-show`
	pub(crate) visible: Option<bool>,
	pub(crate) directives: Vec<BoundDirective>,
	pub(crate) unmount: Vec<Box<dyn FnOnce()>>,
}

impl NodeMeta {
	/// Take every effect bound to the node itself, slot effect included.
	pub(crate) fn take_effects(&mut self) -> Vec<Effect> {
		let mut effects = core::mem::take(&mut self.bindings);
		if let Some(effect) = self.slot.as_mut().and_then(|slot| slot.effect.take()) {
			effects.push(effect);
		}
		effects
	}

	pub(crate) fn slot_kind(&self) -> Option<SlotKind> {
		self.slot.as_ref().map(|slot| slot.kind)
	}
}
