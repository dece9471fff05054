//! Hydration of server-rendered markup.
//!
//! Walks the existing children of a container alongside the expanded
//! description, adopting every node that fits and attaching bindings,
//! listeners and directives to it. Text runs split by the `<!---->`
//! separator come back as separate text nodes; the separator comments are
//! dropped along the way.
//!
//! On a mismatch the rest of that sibling list is rebuilt from scratch and a
//! warning is logged, or, with [`HydrationOptions::strict`](crate::HydrationOptions),
//! hydration fails with [`RenderError::HydrationMismatch`].

use tracing::instrument;

use crate::build::{Flags, build_item};
use crate::dom::Node;
use crate::engine::Engine;
use crate::error::{RenderError, RenderResult};
use crate::expand::Item;
use crate::patch::{check_keys, teardown};
use crate::root::{self, Mode, Root};
use crate::view::IntoRender;

/// Adopt the markup in `container` as the output of `build_fn`.
#[instrument(skip_all)]
pub fn hydrate<F, R>(engine: &Engine, container: &Node, build_fn: F) -> RenderResult<Root>
where
	F: Fn() -> R + 'static,
	R: IntoRender,
{
	root::mount(engine, container, build_fn, Mode::Hydrate)
}

pub(crate) fn hydrate_children(engine: &Engine, parent: &Node, items: &[Item], flags: Flags) -> RenderResult<()> {
	check_keys(items)?;
	let strict = engine.options().hydration.strict;
	let mut cursor = 0;
	let mut reusing = true;

	for item in items {
		if reusing {
			drop_comments(parent, cursor);
			if let Some(candidate) = parent.child(cursor) {
				if item.is_text() && !candidate.is_text() {
					// an empty text node serializes to nothing
					let built = build_item(engine, item, flags, None)?;
					parent.insert_before(&built.node, Some(&candidate));
					cursor += 1;
					continue;
				}
				let built = build_item(engine, item, flags, Some(&candidate))?;
				if built.reused {
					cursor += 1;
					continue;
				}

				let path = path_of(parent, cursor);
				let found = describe(&candidate);
				if strict {
					teardown(&built.node);
					return Err(RenderError::HydrationMismatch {
						path,
						expected: item.describe(),
						found,
					});
				}
				tracing::warn!(%path, expected = %item.describe(), %found, "hydration mismatch; rebuilding the rest of the sibling list");
				truncate(parent, cursor);
				parent.append_child(&built.node);
				reusing = false;
				continue;
			}
			reusing = false;
		}
		let built = build_item(engine, item, flags, None)?;
		parent.append_child(&built.node);
	}

	if reusing {
		drop_comments(parent, cursor);
		if let Some(extra) = parent.child(cursor) {
			let path = path_of(parent, cursor);
			if strict {
				return Err(RenderError::HydrationMismatch {
					path,
					expected: "end of children".to_string(),
					found: describe(&extra),
				});
			}
			tracing::warn!(%path, found = %describe(&extra), "hydration found extra nodes; removing them");
			truncate(parent, cursor);
		}
	}
	Ok(())
}

fn drop_comments(parent: &Node, cursor: usize) {
	while let Some(node) = parent.child(cursor) {
		if !node.is_comment() {
			break;
		}
		parent.remove_child(&node);
	}
}

fn truncate(parent: &Node, len: usize) {
	while let Some(node) = parent.child(len) {
		parent.remove_child(&node);
	}
}

/// Child index path from the outermost ancestor, e.g. `0/2/1`.
fn path_of(parent: &Node, index: usize) -> String {
	let mut segments = vec![index.to_string()];
	let mut node = parent.clone();
	while let Some(up) = node.parent() {
		if let Some(position) = up.index_of(&node) {
			segments.push(position.to_string());
		}
		node = up;
	}
	segments.reverse();
	segments.join("/")
}

fn describe(node: &Node) -> String {
	if node.is_text() {
		return "#text".to_string();
	}
	if node.is_comment() {
		return "#comment".to_string();
	}
	match (node.tag_name(), node.attribute(crate::html::SLOT_ATTR)) {
		(Some(tag), Some(kind)) if node.is_slot() => format!("<{tag} data-slot=\"{kind}\">"),
		(Some(tag), _) => format!("<{tag}>"),
		(None, _) => "#node".to_string(),
	}
}
