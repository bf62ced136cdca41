use unicode_normalization::UnicodeNormalization;
use wadoku_markup::strip_markup;
use wadoku_types::{OutputEntry, ParsedEntry, Reading, Sense};

const FRAGMENT_SEPARATOR: &str = "; ";

/// Build the persisted document for one parsed entry.
///
/// Midashigo forms are dropped: they duplicate another form and often carry
/// non-searchable marks such as `△`.
pub fn reshape(entry: &ParsedEntry) -> OutputEntry {
    let orthography = entry
        .orthography
        .iter()
        .filter(|o| !o.midashigo)
        .map(|o| nfkc(&o.text))
        .collect();

    let reading = entry
        .readings
        .iter()
        .map(|r| Reading {
            hiragana: nfkc(&r.hiragana),
            hatsuon: nfkc(&r.hatsuon),
        })
        .collect();

    let translation = entry.senses.iter().map(join_translations).collect();

    OutputEntry {
        id: entry.id,
        category: entry.markers.resolve(),
        orthography,
        reading,
        translation,
    }
}

/// Strip each fragment and join them; a sense without fragments yields "".
fn join_translations(sense: &Sense) -> String {
    sense
        .translations
        .iter()
        .map(|t| strip_markup(t))
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR)
}

fn nfkc(text: &str) -> String {
    text.nfkc().collect()
}
