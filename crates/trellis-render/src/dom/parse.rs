//! HTML fragment parsing.
//!
//! Markup goes through html5ever (via `scraper`) with the same error
//! recovery a browser applies, then the parsed tree is copied into live
//! [`Node`]s. Comments are kept so `<!---->` text separators survive until
//! hydration drops them.

use scraper::Html;

use super::{Namespace, Node};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Parse `markup` into a list of sibling nodes.
pub fn parse_html(markup: &str) -> Vec<Node> {
	parse_fragment(markup, Namespace::Html)
}

/// Parse `markup` as the content of an element whose children live in `namespace`.
pub(super) fn parse_fragment(markup: &str, namespace: Namespace) -> Vec<Node> {
	let fragment = match namespace {
		Namespace::Html => Html::parse_fragment(markup),
		Namespace::Svg => Html::parse_fragment(&format!("<svg>{markup}</svg>")),
	};
	for error in &fragment.errors {
		tracing::trace!(%error, "recovered from malformed markup");
	}

	let mut host = *fragment.root_element();
	if namespace == Namespace::Svg {
		match host.first_child() {
			Some(svg) => host = svg,
			None => return Vec::new(),
		}
	}

	let mut roots = Vec::new();
	let mut stack: Vec<_> = host.children().rev().map(|child| (child, None::<Node>)).collect();
	while let Some((source, parent)) = stack.pop() {
		let Some(node) = convert(source.value()) else {
			continue;
		};
		match &parent {
			Some(parent) => parent.append_child(&node),
			None => roots.push(node.clone()),
		}
		stack.extend(source.children().rev().map(|child| (child, Some(node.clone()))));
	}
	roots
}

fn convert(source: &scraper::Node) -> Option<Node> {
	match source {
		scraper::Node::Text(text) => Some(Node::text(&**text)),
		scraper::Node::Comment(comment) => Some(Node::comment(&**comment)),
		scraper::Node::Element(element) => {
			let namespace = if &*element.name.ns == SVG_NAMESPACE {
				Namespace::Svg
			} else {
				Namespace::Html
			};
			let node = Node::element_ns(element.name(), namespace);
			for (name, value) in element.attrs() {
				node.set_attribute(name, value);
			}
			Some(node)
		}
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_parse_nested_elements() {
		let nodes = parse_html("<div id=\"a\"><span>x</span>y</div>");

		assert_eq!(nodes.len(), 1);
		let div = &nodes[0];
		assert_eq!(div.tag_name().as_deref(), Some("div"));
		assert_eq!(div.attribute("id").as_deref(), Some("a"));
		assert_eq!(div.child_count(), 2);
		assert_eq!(div.text_content(), "xy");
	}

	#[rstest]
	fn test_parse_attributes_variants() {
		let nodes = parse_html("<input type=checkbox checked value='a &amp; b'>");
		let input = &nodes[0];

		assert_eq!(input.attribute("type").as_deref(), Some("checkbox"));
		assert_eq!(input.attribute("checked").as_deref(), Some(""));
		assert_eq!(input.attribute("value").as_deref(), Some("a & b"));
		assert_eq!(input.child_count(), 0);
	}

	#[rstest]
	fn test_parse_comment_separates_text() {
		let nodes = parse_html("a<!---->b");

		assert_eq!(nodes.len(), 3);
		assert!(nodes[0].is_text());
		assert!(nodes[1].is_comment());
		assert_eq!(nodes[2].text_data().as_deref(), Some("b"));
	}

	#[rstest]
	fn test_parse_named_entities() {
		let nodes = parse_html("&copy; 2024 &mdash; <b title=\"&hellip;\">x</b>");

		assert_eq!(nodes[0].text_data().as_deref(), Some("© 2024 — "));
		assert_eq!(nodes[1].attribute("title").as_deref(), Some("…"));
	}

	#[rstest]
	fn test_parse_svg_namespace() {
		let nodes = parse_html("<svg><g></g><foreignObject><p></p></foreignObject></svg>");
		let svg = &nodes[0];
		let g = svg.child(0).unwrap();
		let foreign = svg.child(1).unwrap();
		let p = foreign.child(0).unwrap();

		assert_eq!(svg.namespace(), Some(Namespace::Svg));
		assert_eq!(g.namespace(), Some(Namespace::Svg));
		assert_eq!(foreign.tag_name().as_deref(), Some("foreignObject"));
		assert_eq!(p.namespace(), Some(Namespace::Html));
	}

	#[rstest]
	fn test_parse_inside_svg_parent() {
		let nodes = parse_fragment("<circle r=\"1\"></circle>", Namespace::Svg);

		assert_eq!(nodes.len(), 1);
		assert_eq!(nodes[0].tag_name().as_deref(), Some("circle"));
		assert_eq!(nodes[0].namespace(), Some(Namespace::Svg));
	}

	#[rstest]
	fn test_parse_raw_text() {
		let nodes = parse_html("<script>if (a < b) {}</script>");

		assert_eq!(nodes[0].text_content(), "if (a < b) {}");
	}

	#[rstest]
	fn test_lone_angle_bracket_is_text() {
		let nodes = parse_html("1 < 2");

		assert_eq!(nodes.len(), 1);
		assert_eq!(nodes[0].text_data().as_deref(), Some("1 < 2"));
	}

	#[rstest]
	#[case("<!-- open", "<!-- open-->")]
	#[case("<div class=\"x", "")]
	#[case("<ul><li>a<li>b", "<ul><li>a</li><li>b</li></ul>")]
	#[case("<p>a</span>b</p>", "<p>ab</p>")]
	fn test_malformed_markup_is_recovered(#[case] markup: &str, #[case] expected: &str) {
		let html: String = parse_html(markup).iter().map(Node::outer_html).collect();

		assert_eq!(html, expected);
	}
}
