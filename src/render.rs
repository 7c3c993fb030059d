//! Per-recipient message templating.
//!
//! Substitution is deliberately lenient: a template that references an
//! unknown field is returned untouched rather than failing the task, so
//! a typo in one cell never blocks an otherwise valid batch.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex"));

pub type Fields<'a> = HashMap<&'a str, &'a str>;

/// Substitute `{field}` tokens into the template.
///
/// Returns `None` when there is no template (the task has no text step).
/// If any referenced field is missing, the template text is returned
/// unchanged.
pub fn render(template: Option<&str>, fields: &Fields<'_>) -> Option<String> {
    let template = template?;

    let all_known = PLACEHOLDER
        .captures_iter(template)
        .all(|cap| fields.contains_key(&cap[1]));
    if !all_known {
        return Some(template.to_string());
    }

    let rendered = PLACEHOLDER.replace_all(template, |cap: &regex::Captures<'_>| {
        fields[&cap[1]].to_string()
    });
    Some(rendered.into_owned())
}
