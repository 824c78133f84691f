use once_cell::sync::Lazy;
use regex::Regex;

// ── Lazy static regexes ──────────────────────────────────────────────────────

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]*>").unwrap());

// Tags that end a line or block; these become a space, inline tags vanish.
static BREAK_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*/?\s*(?:br|p|div|li|ul|ol|h[1-6]|tr|td|blockquote)\b[^<>]*>").unwrap()
});

static COVER_SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(?:coversum|cover150|cover200)/").unwrap());

const HIGH_RES_SEGMENT: &str = "/cover500/";

/// Entities the catalog actually emits in titles and descriptions. `&amp;`
/// goes last so `&amp;lt;` decodes once, to `&lt;`.
const ENTITIES: &[(&str, &str)] = &[
    ("&quot;", "\""),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
];

// ── Text cleaning ────────────────────────────────────────────────────────────

/// Strip markup, decode the common named entities and collapse whitespace.
///
/// Tags are stripped before entities are decoded, so escaped markup in the
/// source survives as literal text. A second pass over such output treats
/// it as markup; the function is idempotent only on text without `<...>`.
pub fn clean_text(raw: &str) -> String {
    let spaced = BREAK_TAG_RE.replace_all(raw, " ");
    let stripped = TAG_RE.replace_all(&spaced, "");
    let decoded = ENTITIES
        .iter()
        .fold(stripped.into_owned(), |acc, (entity, ch)| acc.replace(entity, ch));
    normalize_text(&decoded)
}

/// Collapse whitespace and trim.
fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Cover images ─────────────────────────────────────────────────────────────

/// Swap the thumbnail size segment of a catalog cover URL for the 500px one.
pub fn upgrade_cover_url(url: &str) -> String {
    COVER_SIZE_RE.replace(url, HIGH_RES_SEGMENT).into_owned()
}

// ── Length limits ────────────────────────────────────────────────────────────

/// Truncate to at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
