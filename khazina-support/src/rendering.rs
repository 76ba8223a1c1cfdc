//! Text rendering utilities for human-friendly error messages.
//!
//! Provides helpers to format resolution chains, service identifiers,
//! and "did you mean?" suggestions in error output.

/// Renders a resolution chain as a readable string.
///
/// # Examples
/// ```
/// use khazina_support::rendering::render_chain;
///
/// let chain = vec!["mailer", "transport", "mailer"];
/// assert_eq!(render_chain(&chain), "mailer → transport → mailer");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Shortens a fully qualified identifier for display.
///
/// Service identifiers derived from Rust types carry their module path;
/// plain string identifiers pass through untouched.
///
/// ```
/// use khazina_support::rendering::shorten_identifier;
///
/// assert_eq!(shorten_identifier("my_app::mail::Mailer"), "Mailer");
/// assert_eq!(shorten_identifier("alloc::sync::Arc<my_app::Db>"), "Arc<Db>");
/// assert_eq!(shorten_identifier("config"), "config");
/// ```
pub fn shorten_identifier(full: &str) -> String {
    let mut result = String::with_capacity(full.len());
    let mut segment = String::new();
    let mut chars = full.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}

/// Levenshtein distance between two strings, counted in chars.
///
/// ```
/// use khazina_support::rendering::edit_distance;
///
/// assert_eq!(edit_distance("mailer", "mailer"), 0);
/// assert_eq!(edit_distance("mailer", "mialer"), 2);
/// assert_eq!(edit_distance("", "abc"), 3);
/// ```
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Picks the registered identifiers closest to `requested`.
///
/// Substring matches rank first, then short-name matches, then anything
/// within an edit distance of a third of the requested length.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_short = shorten_identifier(requested).to_lowercase();
    let tolerance = (requested_short.chars().count() / 3).max(1);

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter(|&&name| name != requested)
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            let name_short = shorten_identifier(name).to_lowercase();

            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 0));
            }
            if name_short == requested_short {
                return Some((name, 1));
            }

            let distance = edit_distance(&name_short, &requested_short);
            (distance <= tolerance).then_some((name, distance + 1))
        })
        .collect();

    scored.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}
