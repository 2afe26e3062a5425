use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::bytes::{Regex as BytesRegex, RegexBuilder};
use regex::Regex;

/// Characters a replacement value may consist of. Anything else (angle
/// brackets, quotes, whitespace) could smuggle markup into the document.
pub const VALIDATION_PATTERN: &str = r"^[A-Za-z0-9°%.,\-_#]*$";

// Compiled once per process, shared read-only by every request.
static SAFE_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(VALIDATION_PATTERN).expect("validation pattern is a valid regex")
});

pub fn is_safe_value(value: &str) -> bool {
    SAFE_VALUE.is_match(value)
}

/// Removes every apostrophe from the document. Other bytes pass through
/// untouched, whatever the document's encoding.
pub fn strip_apostrophes(document: &[u8]) -> Vec<u8> {
    document.iter().copied().filter(|&b| b != b'\'').collect()
}

/// Replaces every occurrence of each placeholder whose value passes the
/// whitelist. Unsafe values are skipped without failing the render.
///
/// All placeholders are matched in one pass over the original document, so a
/// value that happens to contain another placeholder is never substituted a
/// second time. Where placeholders overlap at the same position the longest
/// one wins. An empty placeholder matches at every character boundary that
/// does not fall inside another placeholder's match.
pub fn apply_replacements(document: &[u8], replace: &HashMap<String, String>) -> Vec<u8> {
    let mut accepted: HashMap<&[u8], &[u8]> = HashMap::new();
    let mut at_boundaries: Option<&[u8]> = None;
    for (placeholder, value) in replace {
        if !is_safe_value(value) {
            tracing::debug!(placeholder = %placeholder, "skipping replacement with disallowed characters");
            continue;
        }
        if placeholder.is_empty() {
            at_boundaries = Some(value.as_bytes());
        } else {
            accepted.insert(placeholder.as_bytes(), value.as_bytes());
        }
    }

    if accepted.is_empty() && at_boundaries.is_none() {
        return document.to_vec();
    }

    let matcher = if accepted.is_empty() {
        None
    } else {
        match placeholder_matcher(accepted.keys().copied()) {
            Ok(matcher) => Some(matcher),
            Err(e) => {
                // Only reachable for mappings too large for the regex size limit.
                tracing::warn!("falling back to sequential replacement: {}", e);
                return replace_sequentially(document, &accepted, at_boundaries);
            }
        }
    };

    let mut out = Vec::with_capacity(document.len());
    let mut last = 0;
    if let Some(matcher) = &matcher {
        for m in matcher.find_iter(document) {
            push_segment(&mut out, &document[last..m.start()], at_boundaries);
            if let Some(value) = at_boundaries {
                out.extend_from_slice(value);
            }
            out.extend_from_slice(accepted[m.as_bytes()]);
            last = m.end();
        }
    }
    push_segment(&mut out, &document[last..], at_boundaries);
    if let Some(value) = at_boundaries {
        out.extend_from_slice(value);
    }
    out
}

fn placeholder_matcher<'a>(
    placeholders: impl Iterator<Item = &'a [u8]>,
) -> Result<BytesRegex, regex::Error> {
    let mut placeholders: Vec<&[u8]> = placeholders.collect();
    // Alternation is leftmost-first, so longer keys must come first.
    placeholders.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let pattern = placeholders
        .iter()
        // Keys come from JSON strings, so they are always valid UTF-8.
        .map(|p| regex::escape(&String::from_utf8_lossy(p)))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern).build()
}

/// Copies `segment` to `out`, inserting `value` before every character.
/// Invalid UTF-8 counts as one character per byte.
fn push_segment(out: &mut Vec<u8>, segment: &[u8], value: Option<&[u8]>) {
    let Some(value) = value else {
        out.extend_from_slice(segment);
        return;
    };
    for chunk in segment.utf8_chunks() {
        for c in chunk.valid().chars() {
            out.extend_from_slice(value);
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
        for &b in chunk.invalid() {
            out.extend_from_slice(value);
            out.push(b);
        }
    }
}

fn replace_sequentially(
    document: &[u8],
    accepted: &HashMap<&[u8], &[u8]>,
    at_boundaries: Option<&[u8]>,
) -> Vec<u8> {
    let mut placeholders: Vec<&[u8]> = accepted.keys().copied().collect();
    placeholders.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let replaced = placeholders
        .into_iter()
        .fold(document.to_vec(), |doc, placeholder| {
            replace_literal(&doc, placeholder, accepted[placeholder])
        });

    let mut out = Vec::with_capacity(replaced.len());
    push_segment(&mut out, &replaced, at_boundaries);
    if let Some(value) = at_boundaries {
        out.extend_from_slice(value);
    }
    out
}

fn replace_literal(haystack: &[u8], needle: &[u8], with: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(needle) {
            out.extend_from_slice(with);
            i += needle.len();
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out
}
