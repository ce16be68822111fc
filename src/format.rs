//! Failure report rendering.

use crate::evaluate::Failure;

/// Render failure entries as a nested HTML unordered list.
///
/// Each entry becomes a list item holding its message. An entry with
/// children gets a `</br>` and the nested list before its item closes.
///
/// # Examples
///
/// ```rust
/// use swse_rules::{format_failures, Failure};
///
/// let failures = vec![
///     Failure::hard("Dodge"),
///     Failure::group("all of:", true, vec![Failure::hard("BAB +5"), Failure::hard("Level 6")]),
/// ];
///
/// assert_eq!(
///     format_failures(&failures),
///     "<ul><li>Dodge</li><li>all of:</br><ul><li>BAB +5</li><li>Level 6</li></ul></li></ul>"
/// );
/// ```
pub fn format_failures(failures: &[Failure]) -> String {
    let mut out = String::new();
    write_list(&mut out, failures);
    out
}

fn write_list(out: &mut String, failures: &[Failure]) {
    out.push_str("<ul>");
    for failure in failures {
        out.push_str("<li>");
        out.push_str(&failure.message);
        if !failure.children.is_empty() {
            out.push_str("</br>");
            write_list(out, &failure.children);
        }
        out.push_str("</li>");
    }
    out.push_str("</ul>");
}
