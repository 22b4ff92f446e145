//! Text helpers for diagnostics and export names.
//!
//! Provides helpers to format requirement chains, export names,
//! type names and "did you mean" suggestions in error output.

/// Joins a requirement chain with arrows.
///
/// ```
/// use require_support::rendering::render_chain;
///
/// let chain = ["handler", "service", "database", "handler"];
/// assert_eq!(render_chain(&chain), "handler → service → database → handler");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    let mut rendered = String::new();
    for (idx, name) in chain.iter().enumerate() {
        if idx > 0 {
            rendered.push_str(" → ");
        }
        rendered.push_str(name.as_ref());
    }
    rendered
}

/// Strips module paths from every path inside a type name.
///
/// ```
/// use require_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("alloc::string::String"), "String");
/// assert_eq!(
///     shorten_type_name("require_container::export::Extension<alloc::string::String>"),
///     "Extension<String>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let is_delimiter =
        |c: char| matches!(c, '<' | '>' | ',' | ' ' | '&' | '(' | ')' | '[' | ']' | ';');

    let mut short = String::with_capacity(full_name.len());
    let mut start = 0;
    for (idx, delimiter) in full_name.char_indices().filter(|&(_, c)| is_delimiter(c)) {
        short.push_str(last_segment(&full_name[start..idx]));
        short.push(delimiter);
        start = idx + delimiter.len_utf8();
    }
    short.push_str(last_segment(&full_name[start..]));
    short
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Turns a Rust item path into a qualified export name.
///
/// The last path separator becomes a single colon, so the module path
/// and the item name stay distinguishable:
///
/// ```
/// use require_support::rendering::qualified_name;
///
/// assert_eq!(qualified_name("my_app::db::connect"), "my_app::db:connect");
/// assert_eq!(qualified_name("connect"), "connect");
/// assert_eq!(
///     qualified_name("my_app::db::connect<my_app::db::Pool>"),
///     "my_app::db:connect<my_app::db::Pool>"
/// );
/// ```
pub fn qualified_name(path: &str) -> String {
    // Separators inside generic arguments, and turbofish `::<`, are not
    // item separators.
    let bytes = path.as_bytes();
    let mut depth = 0usize;
    let mut split = None;
    for (idx, &b) in bytes.iter().enumerate() {
        match b {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0
                && bytes.get(idx + 1) == Some(&b':')
                && bytes.get(idx + 2) != Some(&b'<') =>
            {
                split = Some(idx)
            }
            _ => {}
        }
    }

    match split {
        Some(idx) => format!("{}:{}", &path[..idx], &path[idx + 2..]),
        None => path.to_string(),
    }
}

/// Returns the item part of a qualified export name.
///
/// ```
/// use require_support::rendering::short_export_name;
///
/// assert_eq!(short_export_name("my_app::db:connect"), "connect");
/// assert_eq!(short_export_name("database"), "database");
/// ```
pub fn short_export_name(name: &str) -> &str {
    // A single colon splits module path from item; `::` belongs to the path.
    let bytes = name.as_bytes();
    let mut split = None;
    for (idx, &b) in bytes.iter().enumerate() {
        if b != b':' {
            continue;
        }
        let prev_colon = idx > 0 && bytes[idx - 1] == b':';
        let next_colon = bytes.get(idx + 1) == Some(&b':');
        if !prev_colon && !next_colon {
            split = Some(idx);
        }
    }

    match split {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Suggests registered names similar to a requested one, best first.
///
/// A full name containing the other scores highest, then a match on the
/// item part of qualified names, then a common prefix of at least three
/// characters. Ties are ordered by name.
pub fn suggest_similar(requested: &str, available: &[&str], max_suggestions: usize) -> Vec<String> {
    let mut scored: Vec<(usize, &str)> = available
        .iter()
        .filter_map(|&name| similarity(requested, name).map(|score| (score, name)))
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.truncate(max_suggestions);
    scored.into_iter().map(|(_, name)| name.to_string()).collect()
}

fn similarity(requested: &str, name: &str) -> Option<usize> {
    let overlaps = |a: &str, b: &str| a.contains(b) || b.contains(a);

    let (requested_full, name_full) = (requested.to_lowercase(), name.to_lowercase());
    if overlaps(&requested_full, &name_full) {
        return Some(100);
    }

    let requested_item = short_export_name(&requested_full);
    let name_item = short_export_name(&name_full);
    if overlaps(requested_item, name_item) {
        return Some(80);
    }

    let prefix = requested_item
        .chars()
        .zip(name_item.chars())
        .take_while(|(a, b)| a == b)
        .count();
    (prefix >= 3).then_some(prefix * 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_of_owned_names() {
        let chain = vec![String::from("a"), String::from("a")];
        assert_eq!(render_chain(&chain), "a → a");
        let empty: [&str; 0] = [];
        assert_eq!(render_chain(&empty), "");
    }

    #[test]
    fn shorten_nested_and_borrowed_types() {
        assert_eq!(
            shorten_type_name("alloc::sync::Arc<dyn app::greeting::Greeting>"),
            "Arc<dyn Greeting>"
        );
        assert_eq!(shorten_type_name("&str"), "&str");
        assert_eq!(
            shorten_type_name("(u8, alloc::vec::Vec<[u8; 4]>)"),
            "(u8, Vec<[u8; 4]>)"
        );
    }

    #[test]
    fn qualified_name_skips_generic_arguments() {
        assert_eq!(
            qualified_name("app::f<app::T, alloc::vec::Vec<app::U>>"),
            "app:f<app::T, alloc::vec::Vec<app::U>>"
        );
        assert_eq!(qualified_name("app::m::f::<app::T>"), "app::m:f::<app::T>");
    }

    #[test]
    fn qualified_name_of_nested_path() {
        assert_eq!(
            qualified_name("app::services::tests::exported"),
            "app::services::tests:exported"
        );
    }

    #[test]
    fn short_name_ignores_path_separators() {
        assert_eq!(short_export_name("a::b::c"), "a::b::c");
        assert_eq!(short_export_name("a::b:c"), "c");
    }

    #[test]
    fn suggest_close_names() {
        let available = vec!["database", "database_pool", "logger", "app::mail:mailer"];

        let suggestions = suggest_similar("databse", &available, 3);
        assert!(!suggestions.is_empty());
        assert!(suggestions[0].starts_with("data"));

        let suggestions = suggest_similar("mailer", &available, 3);
        assert_eq!(suggestions, vec!["app::mail:mailer".to_string()]);
    }

    #[test]
    fn unrelated_names_are_not_suggested() {
        let available = vec!["database"];
        assert!(suggest_similar("xyz", &available, 3).is_empty());
    }
}
