//! HTML text helpers shared by the live tree serializer and the SSR renderer.

use std::borrow::Cow;

/// Tag of the placeholder element wrapping dynamic content.
pub const SLOT_TAG: &str = "t-slot";
/// Attribute naming what a slot wrapper holds.
pub const SLOT_ATTR: &str = "data-slot";
/// Emitted between adjacent text nodes so a parser keeps them apart.
pub const TEXT_SEPARATOR: &str = "<!---->";

const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
	"track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Whether `tag` never has children or a closing tag.
pub fn is_void_element(tag: &str) -> bool {
	VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

/// Whether the content of `tag` is raw text (no markup, no entities).
pub(crate) fn is_raw_text_element(tag: &str) -> bool {
	RAW_TEXT_ELEMENTS
		.iter()
		.any(|raw| raw.eq_ignore_ascii_case(tag))
}

/// Simple HTML escape function, used for text content and attribute values.
pub fn html_escape(s: &str) -> Cow<'_, str> {
	if !s.contains(['&', '<', '>', '"', '\'']) {
		return Cow::Borrowed(s);
	}
	let mut escaped = String::with_capacity(s.len() + 8);
	for c in s.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#x27;"),
			c => escaped.push(c),
		}
	}
	Cow::Owned(escaped)
}

/// Decode character references, named or numeric. Unknown entities are
/// kept as written.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
	html_escape::decode_html_entities(s)
}

/// Write ` name="value"` pairs in order.
pub(crate) fn write_attributes<'a>(out: &mut String, attributes: impl IntoIterator<Item = (&'a str, &'a str)>) {
	for (name, value) in attributes {
		out.push(' ');
		out.push_str(name);
		out.push_str("=\"");
		out.push_str(&html_escape(value));
		out.push('"');
	}
}

/// Add or remove the `display: none` declaration of a style attribute value.
///
/// Returns `None` when nothing is left of the style.
pub(crate) fn toggle_display_none(style: Option<&str>, visible: bool) -> Option<String> {
	let mut declarations: Vec<&str> = style
		.unwrap_or_default()
		.split(';')
		.map(str::trim)
		.filter(|decl| !decl.is_empty())
		.filter(|decl| {
			let compact: String = decl.chars().filter(|c| !c.is_whitespace()).collect();
			compact != "display:none"
		})
		.collect();
	if !visible {
		declarations.push("display: none");
	}
	if declarations.is_empty() {
		None
	} else {
		Some(declarations.join("; "))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_html_escape() {
		assert_eq!(
			html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
			"&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
		);
		assert!(matches!(html_escape("plain"), Cow::Borrowed(_)));
	}

	#[rstest]
	#[case("&lt;b&gt;", "<b>")]
	#[case("a &amp; b", "a & b")]
	#[case("&#x27;&#39;&quot;", "''\"")]
	#[case("&unknown; &", "&unknown; &")]
	#[case("&nbsp;", "\u{a0}")]
	#[case("&copy; 2024 &mdash; x", "© 2024 — x")]
	fn test_decode_entities(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(decode_entities(input), expected);
	}

	#[rstest]
	fn test_escape_then_decode_is_identity() {
		let text = r#"if a < b && c > "d" then 'e'"#;
		assert_eq!(decode_entities(&html_escape(text)), text);
	}

	#[rstest]
	#[case(None, false, Some("display: none"))]
	#[case(Some("color: red"), false, Some("color: red; display: none"))]
	#[case(Some("color: red; display: none"), true, Some("color: red"))]
	#[case(Some("display:none"), true, None)]
	#[case(Some("display: none"), false, Some("display: none"))]
	fn test_toggle_display_none(#[case] style: Option<&str>, #[case] visible: bool, #[case] expected: Option<&str>) {
		assert_eq!(toggle_display_none(style, visible).as_deref(), expected);
	}

	#[rstest]
	fn test_void_elements() {
		assert!(is_void_element("br"));
		assert!(is_void_element("INPUT"));
		assert!(!is_void_element("div"));
	}
}
