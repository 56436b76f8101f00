//! `{{name}}` placeholder substitution.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::errors::{Result, SealVaultError};

/// Placeholder syntax: `{{name}}`, names made of letters, digits, `_`, `-`, `.`.
fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{([A-Za-z0-9_.\-]+)\}\}").expect("placeholder pattern is a valid regex")
    })
}

/// Placeholder names in order of first appearance, without duplicates.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in placeholder_regex().captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Replace every placeholder in `template` with its value.
///
/// Substituted values are inserted literally and never re-scanned. If any
/// placeholder has no value, nothing is returned and the error names all
/// of them, so one run shows the whole gap.
pub fn substitute(template: &str, values: &BTreeMap<String, String>) -> Result<String> {
    let missing: Vec<String> = placeholders(template)
        .into_iter()
        .filter(|name| !values.contains_key(name))
        .collect();
    if !missing.is_empty() {
        return Err(SealVaultError::MissingTemplateVariable(missing));
    }

    let rendered = placeholder_regex().replace_all(template, |caps: &Captures<'_>| {
        values.get(&caps[1]).cloned().unwrap_or_default()
    });
    Ok(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn substitutes_all_placeholders() {
        let out = substitute("{{a}}-{{b}}", &vars(&[("a", "x"), ("b", "y")])).unwrap();
        assert_eq!(out, "x-y");
    }

    #[test]
    fn reports_missing_variable_by_name() {
        let err = substitute("{{a}}-{{b}}", &vars(&[("a", "x")])).unwrap_err();
        match err {
            SealVaultError::MissingTemplateVariable(names) => assert_eq!(names, vec!["b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reports_every_missing_variable_once() {
        let err = substitute("{{c}}{{a}}{{c}}{{d}}", &vars(&[("a", "1")])).unwrap_err();
        match err {
            SealVaultError::MissingTemplateVariable(names) => assert_eq!(names, vec!["c", "d"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn repeated_placeholder_is_replaced_everywhere() {
        let out = substitute("{{x}}/{{x}}", &vars(&[("x", "v")])).unwrap();
        assert_eq!(out, "v/v");
    }

    #[test]
    fn values_are_not_rescanned() {
        let out = substitute("{{a}}", &vars(&[("a", "{{b}}")])).unwrap();
        assert_eq!(out, "{{b}}");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let out = substitute("plain text", &BTreeMap::new()).unwrap();
        assert_eq!(out, "plain text");
    }

    #[test]
    fn unused_values_are_ignored() {
        let out = substitute("{{a}}", &vars(&[("a", "1"), ("unused", "2")])).unwrap();
        assert_eq!(out, "1");
    }

    #[test]
    fn placeholders_in_first_appearance_order() {
        assert_eq!(
            placeholders("{{user}}:{{password}}@{{host}}/{{user}}"),
            vec!["user", "password", "host"]
        );
    }
}
