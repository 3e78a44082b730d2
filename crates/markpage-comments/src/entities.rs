//! Named HTML entity expansion.
//!
//! Storage-format bodies routinely carry named HTML entities (`&nbsp;`,
//! `&mdash;`, ...) that a strict XML parser rejects. Before parsing, every
//! recognized name outside the XML base five is replaced with its literal
//! character. The base five (`amp lt gt quot apos`) stay untouched for the
//! parser, and unrecognized names are left as-is since they may already be
//! valid in the target format.

use std::sync::LazyLock;

use regex::Regex;

static ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9]*);").expect("invalid entity regex"));

/// Named entity to literal character, sorted by name for binary search.
/// The XML base five are deliberately absent.
static NAMED_ENTITIES: &[(&str, &str)] = &[
    ("Dagger", "\u{2021}"),
    ("acute", "\u{00b4}"),
    ("bull", "\u{2022}"),
    ("cedil", "\u{00b8}"),
    ("cent", "\u{00a2}"),
    ("copy", "\u{00a9}"),
    ("dagger", "\u{2020}"),
    ("darr", "\u{2193}"),
    ("deg", "\u{00b0}"),
    ("divide", "\u{00f7}"),
    ("euro", "\u{20ac}"),
    ("frac12", "\u{00bd}"),
    ("frac14", "\u{00bc}"),
    ("frac34", "\u{00be}"),
    ("ge", "\u{2265}"),
    ("harr", "\u{2194}"),
    ("hellip", "\u{2026}"),
    ("iexcl", "\u{00a1}"),
    ("iquest", "\u{00bf}"),
    ("laquo", "\u{00ab}"),
    ("larr", "\u{2190}"),
    ("ldquo", "\u{201c}"),
    ("le", "\u{2264}"),
    ("lsquo", "\u{2018}"),
    ("mdash", "\u{2014}"),
    ("micro", "\u{00b5}"),
    ("middot", "\u{00b7}"),
    ("minus", "\u{2212}"),
    ("nbsp", "\u{00a0}"),
    ("ndash", "\u{2013}"),
    ("ne", "\u{2260}"),
    ("ordf", "\u{00aa}"),
    ("ordm", "\u{00ba}"),
    ("para", "\u{00b6}"),
    ("plusmn", "\u{00b1}"),
    ("pound", "\u{00a3}"),
    ("raquo", "\u{00bb}"),
    ("rarr", "\u{2192}"),
    ("rdquo", "\u{201d}"),
    ("reg", "\u{00ae}"),
    ("rsquo", "\u{2019}"),
    ("sect", "\u{00a7}"),
    ("shy", "\u{00ad}"),
    ("sup1", "\u{00b9}"),
    ("sup2", "\u{00b2}"),
    ("sup3", "\u{00b3}"),
    ("times", "\u{00d7}"),
    ("trade", "\u{2122}"),
    ("uarr", "\u{2191}"),
    ("yen", "\u{00a5}"),
];

/// Replace recognized named entities with their literal characters.
pub fn expand_entities(html: &str) -> String {
    ENTITY_PATTERN
        .replace_all(html, |caps: &regex::Captures| {
            lookup(&caps[1]).map_or_else(|| caps[0].to_owned(), ToOwned::to_owned)
        })
        .into_owned()
}

fn lookup(name: &str) -> Option<&'static str> {
    NAMED_ENTITIES
        .binary_search_by_key(&name, |&(entity, _)| entity)
        .ok()
        .map(|idx| NAMED_ENTITIES[idx].1)
}
