use crate::template::Bindings;

pub const PROJECT_NAME: &str = "PROJECT_NAME";
pub const PROJECT_NAME_SLUG: &str = "PROJECT_NAME_SLUG";
pub const PROJECT_NAME_CAMEL: &str = "PROJECT_NAME_CAMEL";
pub const YEAR: &str = "YEAR";

/// `"My Cool App"` → `"my-cool-app"`.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// `"My Cool App"` → `"myCoolApp"`.
///
/// Only the first letter of each word changes case.
pub fn camelize(name: &str) -> String {
    name.split_whitespace()
        .enumerate()
        .map(|(index, word)| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) if index == 0 => first.to_lowercase().chain(chars).collect(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

/// Collected answers plus the derived slug, camel-case and year bindings.
pub fn project_bindings(answers: &Bindings, year: i32) -> Bindings {
    let mut bindings = answers.clone();

    if let Some(name) = answers.get(PROJECT_NAME) {
        bindings.insert(PROJECT_NAME_SLUG.to_string(), slugify(name));
        bindings.insert(PROJECT_NAME_CAMEL.to_string(), camelize(name));
    }
    bindings.insert(YEAR.to_string(), format!("{year:04}"));

    bindings
}
