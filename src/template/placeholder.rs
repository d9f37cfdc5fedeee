//! Literal `{{KEY}}` token substitution.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

pub type Bindings = BTreeMap<String, String>;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("valid placeholder regex"));

/// Replace every `{{KEY}}` whose key is bound, in a single pass.
///
/// Keys match exactly: `{{ KEY }}` and `{{key}}` are distinct from `{{KEY}}`.
/// Unbound tokens are left verbatim, and substituted values are never
/// rescanned for further tokens.
pub fn substitute(content: &str, bindings: &Bindings) -> String {
    if bindings.is_empty() {
        return content.to_string();
    }

    TOKEN_RE
        .replace_all(content, |caps: &Captures<'_>| match bindings.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
