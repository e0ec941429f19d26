use regex::Regex;

lazy_static! {
	static ref STRIP: Regex = Regex::new(r"[^\w\s-]").expect("valid strip pattern");
	static ref HYPHENATE: Regex = Regex::new(r"[-\s]+").expect("valid hyphenate pattern");
}

/// Turn a title into something usable as a url segment.
///
/// Text is transliterated to ASCII, anything that is not a word character,
/// whitespace or a hyphen is dropped, and runs of whitespace and hyphens
/// collapse into a single hyphen.
pub fn slugify(value: &str) -> String {
	let ascii = deunicode::deunicode(value);
	let stripped = STRIP.replace_all(&ascii, "");
	let lowered = stripped.trim().to_lowercase();
	HYPHENATE.replace_all(&lowered, "-").into_owned()
}
