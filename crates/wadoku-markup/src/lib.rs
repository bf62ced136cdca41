//! Strip Wadoku translation markup down to display text.
//!
//! Translations in the dump embed a small semantic markup vocabulary
//! (`<token>`, `<emph>`, `<topic>`, …). [`strip_markup`] removes it with a
//! fixed, ordered table of rules:
//!
//! 1. For each tag in [`TAG_RULES`], replace every opening tag (with any
//!    attributes) by the rule's `open` text, then every closing tag by its
//!    `close` text. `<bracket>` becomes `"("`/`") "`; every other tag is
//!    dropped and its closing tag becomes a single space.
//! 2. Trim the result, collapse double spaces once, and tighten `" )"` to
//!    `")"`.
//!
//! The transform is total: unknown or unmatched markup is left in place.
//!
//! # Example
//! ```rust
//! use wadoku_markup::strip_markup;
//!
//! assert_eq!(strip_markup("a<bracket>b</bracket>c"), "a(b) c");
//! assert_eq!(strip_markup(r#"<token type="N">Hund</token>"#), "Hund");
//! ```
//!
//! For a runnable demo, see `cargo run -p wadoku-markup --example strip -- <text>`.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

/// One inline tag and what its opening and closing tags turn into.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TagRule {
    pub name: &'static str,
    pub open: &'static str,
    pub close: &'static str,
}

const fn dropped(name: &'static str) -> TagRule {
    TagRule {
        name,
        open: "",
        close: " ",
    }
}

/// Rules in application order. The order is part of the output format.
pub const TAG_RULES: [TagRule; 20] = [
    TagRule {
        name: "bracket",
        open: "(",
        close: ") ",
    },
    dropped("def"),
    dropped("token"),
    dropped("text"),
    dropped("expl"),
    dropped("literal"),
    dropped("famn"),
    dropped("emph"),
    dropped("transl"),
    dropped("specchar"),
    dropped("iron"),
    dropped("topic"),
    dropped("foreign"),
    dropped("deu_gr"),
    dropped("descr"),
    dropped("birthdeath"),
    dropped("title"),
    dropped("date"),
    dropped("jap"),
    dropped("transcr"),
];

struct CompiledRule {
    open_tag: Regex,
    close_tag: String,
    rule: TagRule,
}

static COMPILED_RULES: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| {
    TAG_RULES
        .iter()
        .map(|rule| CompiledRule {
            // Any run of non-'>' after the name, so attributes and `/>` match too.
            open_tag: Regex::new(&format!("<{}[^>]*>", regex::escape(rule.name)))
                .expect("tag pattern is a valid regex"),
            close_tag: format!("</{}>", rule.name),
            rule: *rule,
        })
        .collect()
});

/// Remove inline markup from a translation fragment.
pub fn strip_markup(input: &str) -> String {
    let mut text = input.to_string();
    for compiled in COMPILED_RULES.iter() {
        text = compiled
            .open_tag
            .replace_all(&text, NoExpand(compiled.rule.open))
            .into_owned();
        text = text.replace(&compiled.close_tag, compiled.rule.close);
    }
    tidy_spacing(&text)
}

// Single passes only: a triple space survives as a double space.
fn tidy_spacing(text: &str) -> String {
    text.trim().replace("  ", " ").replace(" )", ")")
}
