//! Load action names derived from slice names.

use serde::{Deserialize, Serialize};

/// Prefix used by [`ActionStyle::Namespaced`] action types.
pub const NAMESPACE_PREFIX: &str = "@ReduxPM/";

/// How default load action types are spelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStyle {
    /// `data.adminAuth` becomes `LOAD_DATA_ADMIN_AUTH`.
    #[default]
    Screaming,
    /// `data.adminAuth` becomes `@ReduxPM/LoadDataAdminAuth`.
    Namespaced,
}

/// Build the load action type for the slice called `name`.
pub fn build_action(name: &str, style: ActionStyle) -> String {
    let words = words(name);
    match style {
        ActionStyle::Screaming => {
            let mut action = String::from("LOAD");
            for word in &words {
                action.push('_');
                action.push_str(&word.to_uppercase());
            }
            action
        }
        ActionStyle::Namespaced => {
            let mut action = format!("{NAMESPACE_PREFIX}Load");
            for word in &words {
                action.push_str(&upper_first(word));
            }
            action
        }
    }
}

/// The namespaced load action type for `name`.
///
/// ```
/// assert_eq!(
///     persist_machine::persist_action("data.adminAuth"),
///     "@ReduxPM/LoadDataAdminAuth"
/// );
/// ```
pub fn persist_action(name: &str) -> String {
    build_action(name, ActionStyle::Namespaced)
}

/// Split an identifier into start-case words.
///
/// Breaks on any non-alphanumeric character, on lower-to-upper camel humps,
/// before the last capital of an acronym that runs into a word
/// (`XMLHttp` is `XML` + `Http`), and between letters and digits.
pub(crate) fn words(input: &str) -> Vec<String> {
    let mut words = Vec::new();

    for chunk in input.split(|c: char| !c.is_alphanumeric()) {
        let chars: Vec<char> = chunk.chars().collect();
        let mut current = String::new();

        for (i, &c) in chars.iter().enumerate() {
            if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
                let next = chars.get(i + 1).copied();
                let boundary = (prev.is_lowercase() && c.is_uppercase())
                    || (prev.is_alphabetic() && c.is_numeric())
                    || (prev.is_numeric() && c.is_alphabetic())
                    || (prev.is_uppercase()
                        && c.is_uppercase()
                        && next.is_some_and(char::is_lowercase));
                if boundary && !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            current.push(c);
        }

        if !current.is_empty() {
            words.push(current);
        }
    }

    words
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
