//! Text-level edits to package.json
//!
//! Versions are replaced in the raw text so that key order, indentation and
//! the range operator of each entry survive an update.

use regex::Regex;
use std::sync::LazyLock;

/// Range operators kept in front of a rewritten version
static RANGE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\^|~|>=|<=|>|<|=)?\s*(.*)$").unwrap());

/// Split a declared version into its range operator and bare version
pub fn split_range(spec: &str) -> (&str, &str) {
    match RANGE_PREFIX_RE.captures(spec.trim()) {
        Some(caps) => (
            caps.get(1).map(|m| m.as_str()).unwrap_or(""),
            caps.get(2).map(|m| m.as_str()).unwrap_or(""),
        ),
        None => ("", spec),
    }
}

/// Replace the version of `package` inside the `section` object of `content`.
///
/// Returns `None` when the section or the entry cannot be found.
pub fn replace_version(
    content: &str,
    section: &str,
    package: &str,
    new_version: &str,
) -> Option<String> {
    replace_entry(content, section, package, |old| {
        let (operator, _) = split_range(old);
        format!("{}{}", operator, new_version)
    })
}

/// Replace the whole declared spec of `package`, range operator included
pub fn replace_spec(content: &str, section: &str, package: &str, new_spec: &str) -> Option<String> {
    replace_entry(content, section, package, |_| new_spec.to_string())
}

fn replace_entry<F>(content: &str, section: &str, package: &str, rewrite: F) -> Option<String>
where
    F: FnOnce(&str) -> String,
{
    let (start, end) = section_span(content, section)?;
    let body = &content[start..end];

    let pattern = format!(r#"("{}"\s*:\s*)"([^"]*)""#, regex::escape(package));
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(body)?;
    let whole = caps.get(0)?;

    let replacement = format!(r#"{}"{}""#, &caps[1], rewrite(&caps[2]));

    let mut updated = String::with_capacity(content.len() + replacement.len());
    updated.push_str(&content[..start + whole.start()]);
    updated.push_str(&replacement);
    updated.push_str(&content[start + whole.end()..]);
    Some(updated)
}

/// Byte range of the body of `"section": { ... }`.
///
/// Dependency maps hold only string values, so the first closing brace after
/// the opening one ends the section.
fn section_span(content: &str, section: &str) -> Option<(usize, usize)> {
    let pattern = format!(r#""{}"\s*:\s*\{{"#, regex::escape(section));
    let re = Regex::new(&pattern).ok()?;
    let open = re.find(content)?;
    let start = open.end();
    let close = content[start..].find('}')?;
    Some((start, start + close))
}
