use std::sync::LazyLock;

use regex::Regex;

/// Anything that looks like a markup tag.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// A "Question:" / "Answer:" label the model likes to put in front of its output.
static LEADING_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)\s*(question|answer)\s*:\s*").expect("label pattern is valid")
});

/// Card-side markers removed wherever they appear.
const LABEL_MARKERS: [&str; 6] = [
    "** front **",
    "**Front**",
    "(back front)",
    "** back **",
    "Front:",
    "Back:",
];

/// Turns generated text into plain text that is safe to display and to compare.
///
/// Unescapes HTML entities, removes tags and any stray angle brackets, drops the
/// card label markers and trims. The transform is repeated until the text stops
/// changing, so `sanitize(sanitize(x)) == sanitize(x)` and already-clean text
/// comes back untouched.
///
/// This is the only normalization routine: test options are displayed through it
/// and answers are scored through it.
pub fn sanitize(text: &str) -> String {
    // Every pass that changes the text also shortens it, so this terminates.
    let mut current = text.to_string();
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(text: &str) -> String {
    let unescaped = html_escape::decode_html_entities(text);
    let untagged = TAG_RE.replace_all(&unescaped, "");
    let mut out = untagged.replace(['<', '>'], "");
    for marker in LABEL_MARKERS {
        out = out.replace(marker, "");
    }
    let out = LEADING_LABEL_RE.replace(&out, "");
    out.trim().to_string()
}
