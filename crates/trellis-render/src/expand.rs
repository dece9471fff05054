//! Child expansion shared by construction and serialization.
//!
//! Children are flattened into [`Item`]s, each of which occupies exactly one
//! live node: fragments are spliced into their parent, `t-if`/`t-else-if`/
//! `t-else` runs are grouped into one [`Chain`], dynamic children and
//! fragment-hosted `t-for` lists get a slot of their own.

use crate::directive::{Builtin, builtin, has_builtin};
use crate::view::{AttrValue, Child, DynamicChild, Key, Kind, Repeat, View};

/// One unit of a sibling list.
#[derive(Clone, Debug)]
pub(crate) enum Item {
	/// Element, text or component
	View(View),
	Dynamic(DynamicChild),
	Chain(Chain),
	/// Fragment hosting a `t-for` list
	Repeat(View),
	/// Fragment returned by a component
	Fragment(View),
}

impl Item {
	pub(crate) fn key(&self) -> Option<&Key> {
		match self {
			Item::View(view) | Item::Repeat(view) | Item::Fragment(view) => view.key(),
			Item::Dynamic(_) | Item::Chain(_) => None,
		}
	}

	pub(crate) fn is_text(&self) -> bool {
		matches!(self, Item::View(view) if matches!(view.kind(), Kind::Text(_)))
	}

	/// Short description used in logs and hydration errors.
	pub(crate) fn describe(&self) -> String {
		match self {
			Item::View(view) => match view.kind() {
				Kind::Element(tag) => format!("<{tag}>"),
				Kind::Text(_) => "#text".to_string(),
				Kind::Component(component) if component.is_boundary() => "<t-slot data-slot=\"boundary\">".to_string(),
				Kind::Component(component) => format!("component {}", component.name()),
				Kind::Fragment => "fragment".to_string(),
			},
			Item::Dynamic(_) => "<t-slot data-slot=\"dyn\">".to_string(),
			Item::Chain(_) => "<t-slot data-slot=\"if\">".to_string(),
			Item::Repeat(_) => "<t-slot data-slot=\"for\">".to_string(),
			Item::Fragment(_) => "<t-slot data-slot=\"fragment\">".to_string(),
		}
	}
}

#[derive(Clone, Debug)]
pub(crate) struct Branch {
	/// `None` for `t-else`
	pub(crate) guard: Option<AttrValue>,
	pub(crate) view: View,
}

/// A `t-if` group: at most one branch is live.
#[derive(Clone, Debug)]
pub(crate) struct Chain {
	pub(crate) branches: Vec<Branch>,
	/// Ended by `t-else`
	closed: bool,
}

impl Chain {
	fn new(guard: AttrValue, view: View) -> Self {
		Self {
			branches: vec![Branch {
				guard: Some(guard),
				view,
			}],
			closed: false,
		}
	}

	/// First branch whose guard holds, in source order.
	///
	/// Guards are read in the caller's tracking context, so a consumer
	/// selecting a branch re-runs when one of them changes.
	pub(crate) fn select(&self) -> Option<(usize, &View)> {
		self.branches
			.iter()
			.enumerate()
			.find(|(_, branch)| match &branch.guard {
				None => true,
				Some(guard) => match guard.current() {
					Some(value) => value.is_truthy(),
					None => {
						tracing::debug!(guard = ?guard, "conditional guard is not a value; treated as false");
						false
					}
				},
			})
			.map(|(index, branch)| (index, &branch.view))
	}

	pub(crate) fn is_reactive(&self) -> bool {
		self.branches
			.iter()
			.any(|branch| branch.guard.as_ref().is_some_and(AttrValue::is_reactive))
	}
}

enum Conditional {
	If(AttrValue),
	ElseIf(AttrValue),
	Else,
}

fn conditional(view: &View) -> Option<Conditional> {
	let attributes = view.attributes();
	if let Some((guard, _)) = builtin(attributes, Builtin::If) {
		return Some(Conditional::If(guard.clone()));
	}
	if let Some((guard, _)) = builtin(attributes, Builtin::ElseIf) {
		return Some(Conditional::ElseIf(guard.clone()));
	}
	has_builtin(attributes, Builtin::Else).then_some(Conditional::Else)
}

fn is_repeat_host(view: &View) -> bool {
	matches!(view.kind(), Kind::Fragment) && has_builtin(view.attributes(), Builtin::For)
}

/// The `t-for` source of a view, if it has a well-formed one.
pub(crate) fn repeat_of(view: &View) -> Option<Repeat> {
	match builtin(view.attributes(), Builtin::For) {
		Some((AttrValue::Repeat(repeat), _)) => Some(repeat.clone()),
		Some((other, _)) => {
			tracing::debug!(value = ?other, "t-for value is not a list source; rendering nothing");
			None
		}
		None => None,
	}
}

/// Expand a sibling list.
pub(crate) fn expand_children(children: &[Child]) -> Vec<Item> {
	let mut items = Vec::with_capacity(children.len());
	let mut open: Option<Chain> = None;
	expand_into(children, &mut items, &mut open);
	if let Some(chain) = open.take() {
		items.push(Item::Chain(chain));
	}
	items
}

fn expand_into(children: &[Child], items: &mut Vec<Item>, open: &mut Option<Chain>) {
	for child in children {
		let view = match child {
			Child::Dynamic(dynamic) => {
				close(items, open);
				items.push(Item::Dynamic(dynamic.clone()));
				continue;
			}
			Child::View(view) => view,
		};

		match conditional(view) {
			Some(Conditional::If(guard)) => {
				close(items, open);
				*open = Some(Chain::new(guard, view.clone()));
			}
			Some(Conditional::ElseIf(guard)) => match open.as_mut() {
				Some(chain) if !chain.closed => chain.branches.push(Branch {
					guard: Some(guard),
					view: view.clone(),
				}),
				_ => tracing::debug!("t-else-if without a preceding t-if; branch dropped"),
			},
			Some(Conditional::Else) => match open.take() {
				Some(mut chain) if !chain.closed => {
					chain.branches.push(Branch {
						guard: None,
						view: view.clone(),
					});
					chain.closed = true;
					items.push(Item::Chain(chain));
				}
				other => {
					*open = other;
					tracing::debug!("t-else without a preceding t-if; branch dropped");
				}
			},
			None => {
				close(items, open);
				if matches!(view.kind(), Kind::Fragment) && !is_repeat_host(view) {
					expand_into(view.children(), items, open);
				} else {
					items.push(single(view));
				}
			}
		}
	}
}

fn close(items: &mut Vec<Item>, open: &mut Option<Chain>) {
	if let Some(chain) = open.take() {
		items.push(Item::Chain(chain));
	}
}

fn single(view: &View) -> Item {
	if is_repeat_host(view) {
		Item::Repeat(view.clone())
	} else {
		Item::View(view.clone())
	}
}

/// Expand the content of a chosen conditional branch.
pub(crate) fn expand_branch(view: &View) -> Vec<Item> {
	if matches!(view.kind(), Kind::Fragment) && !is_repeat_host(view) {
		expand_children(view.children())
	} else {
		vec![single(view)]
	}
}

/// The item a component's output occupies.
pub(crate) fn expand_output(view: View) -> Item {
	match conditional(&view) {
		Some(Conditional::If(guard) | Conditional::ElseIf(guard)) => Item::Chain(Chain::new(guard, view)),
		_ if is_repeat_host(&view) => Item::Repeat(view),
		_ if matches!(view.kind(), Kind::Fragment) => Item::Fragment(view),
		_ => Item::View(view),
	}
}

/// Expand the items of a `t-for` source.
pub(crate) fn expand_views(views: Vec<View>) -> Vec<Item> {
	let children: Vec<Child> = views.into_iter().map(Child::View).collect();
	expand_children(&children)
}

/// A whole tree produced by a root render function.
#[derive(Clone, Debug)]
pub(crate) enum Expanded {
	Single(View),
	List(Vec<Item>),
}

pub(crate) fn expand_root(view: View) -> Expanded {
	if matches!(view.kind(), Kind::Fragment) && !is_repeat_host(&view) && conditional(&view).is_none() {
		Expanded::List(expand_children(view.children()))
	} else {
		Expanded::Single(view)
	}
}

impl Expanded {
	pub(crate) fn items(&self) -> Vec<Item> {
		match self {
			Expanded::Single(view) => vec![expand_output(view.clone())],
			Expanded::List(items) => items.clone(),
		}
	}

	/// Number of nodes the tree occupies in its container.
	pub(crate) fn len(&self) -> usize {
		match self {
			Expanded::Single(_) => 1,
			Expanded::List(items) => items.len(),
		}
	}

	pub(crate) fn same_shape(&self, other: &Expanded) -> bool {
		matches!(
			(self, other),
			(Expanded::Single(_), Expanded::Single(_)) | (Expanded::List(_), Expanded::List(_))
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::view::{IntoView, Value};
	use rstest::rstest;

	fn kinds(items: &[Item]) -> Vec<String> {
		items.iter().map(Item::describe).collect()
	}

	#[rstest]
	fn test_fragments_are_flattened() {
		let children = vec![
			Child::from("a"),
			Child::View(View::fragment(["b", "c"])),
			Child::View(View::element("p").into_view()),
		];

		let items = expand_children(&children);

		assert_eq!(kinds(&items), vec!["#text", "#text", "#text", "<p>"]);
	}

	#[rstest]
	fn test_if_else_run_is_one_chain() {
		let children = vec![
			Child::View(View::element("a").when(|| false).into_view()),
			Child::View(View::element("b").else_when(|| true).into_view()),
			Child::View(View::element("c").otherwise().into_view()),
			Child::View(View::element("d").into_view()),
		];

		let items = expand_children(&children);

		assert_eq!(items.len(), 2);
		let Item::Chain(chain) = &items[0] else {
			panic!("expected a chain, got {:?}", items[0]);
		};
		assert_eq!(chain.branches.len(), 3);
		assert_eq!(chain.select().map(|(i, _)| i), Some(1));
		assert!(chain.is_reactive());
	}

	#[rstest]
	fn test_first_true_guard_wins() {
		let children = vec![
			Child::View(View::element("a").bind("t-if", Value::Bool(true)).into_view()),
			Child::View(View::element("b").bind("tElseIf", Value::Bool(true)).into_view()),
		];

		let items = expand_children(&children);
		let Item::Chain(chain) = &items[0] else {
			panic!("expected a chain");
		};

		assert_eq!(chain.select().and_then(|(_, view)| view.tag()), Some("a"));
		assert!(!chain.is_reactive());
	}

	#[rstest]
	fn test_orphan_else_is_dropped() {
		let children = vec![
			Child::View(View::element("a").otherwise().into_view()),
			Child::View(View::element("b").into_view()),
		];

		let items = expand_children(&children);

		assert_eq!(kinds(&items), vec!["<b>"]);
	}

	#[rstest]
	fn test_two_ifs_make_two_chains() {
		let children = vec![
			Child::View(View::element("a").when(|| true).into_view()),
			Child::View(View::element("b").when(|| true).into_view()),
		];

		assert_eq!(expand_children(&children).len(), 2);
	}

	#[rstest]
	fn test_repeat_host_keeps_its_slot() {
		let host = View::each(Repeat::eager(vec![View::text("x")]));
		let items = expand_children(&[Child::View(host)]);

		assert_eq!(kinds(&items), vec!["<t-slot data-slot=\"for\">"]);
	}

	#[rstest]
	fn test_expand_root_shapes() {
		assert!(matches!(expand_root(View::fragment(["a", "b"])), Expanded::List(items) if items.len() == 2));
		assert!(matches!(expand_root(View::text("a")), Expanded::Single(_)));
	}
}
