use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fs, path::Path};

use crate::{Error, STYLE_ID};

/// Declarations applied to every target so lingering chrome is hidden before
/// the DOM pass removes it.
pub const HIDE_DECLARATIONS: [&str; 4] = [
    "display: none !important",
    "visibility: hidden !important",
    "opacity: 0 !important",
    "pointer-events: none !important",
];

/// Provider profile: what to suppress inside one embedded map provider's page.
///
/// `selectors` and the selector lists in `css_rules` describe the same
/// target set. The css hides immediately, the selectors drive removal.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CleanupConfig {
    pub selectors: Vec<String>,
    #[serde(alias = "cssRules")]
    pub css_rules: String,
    #[serde(alias = "useMutationObserver")]
    #[serde(default = "CleanupConfig::default_use_mutation_observer")]
    pub use_mutation_observer: bool,
    #[serde(alias = "debounceMs")]
    #[serde(default = "CleanupConfig::default_debounce_ms")]
    pub debounce_ms: u64,
    /// Observer teardown ceiling, `0` keeps the observer alive.
    #[serde(alias = "observerTimeoutMs")]
    #[serde(default = "CleanupConfig::default_observer_timeout_ms")]
    pub observer_timeout_ms: u64,
    /// Id of the injected `<style>` node. Repeat injections find it and skip.
    #[serde(alias = "styleId")]
    #[serde(default = "CleanupConfig::default_style_id")]
    pub style_id: String,
}

impl CleanupConfig {
    pub fn default_use_mutation_observer() -> bool {
        true
    }

    pub fn default_debounce_ms() -> u64 {
        100
    }

    pub fn default_observer_timeout_ms() -> u64 {
        30_000
    }

    pub fn default_style_id() -> String {
        STYLE_ID.to_string()
    }

    /// Builds a profile whose stylesheet is derived from the selector list,
    /// one rule covering every selector.
    pub fn from_selectors<S: AsRef<str>>(selectors: &[S], declarations: &[&str]) -> Self {
        let selectors: Vec<String> = selectors
            .iter()
            .map(|selector| selector.as_ref().to_string())
            .collect();

        let mut css_rules = selectors.join(",\n");
        css_rules.push_str(" {\n");
        for declaration in declarations {
            css_rules.push_str("  ");
            css_rules.push_str(declaration);
            css_rules.push_str(";\n");
        }
        css_rules.push_str("}\n");

        Self {
            selectors,
            css_rules,
            use_mutation_observer: Self::default_use_mutation_observer(),
            debounce_ms: Self::default_debounce_ms(),
            observer_timeout_ms: Self::default_observer_timeout_ms(),
            style_id: Self::default_style_id(),
        }
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_mutation_observer(mut self, use_mutation_observer: bool) -> Self {
        self.use_mutation_observer = use_mutation_observer;
        self
    }

    pub fn with_observer_timeout_ms(mut self, observer_timeout_ms: u64) -> Self {
        self.observer_timeout_ms = observer_timeout_ms;
        self
    }

    pub fn with_style_id(mut self, style_id: impl Into<String>) -> Self {
        self.style_id = style_id.into();
        self
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let json = fs::read_to_string(path).map_err(Error::ReadFile)?;
        Self::from_json(&json)
    }

    /// Selectors named by the rule preludes of `css_rules`, in order.
    pub fn css_selectors(&self) -> Vec<String> {
        let without_comments = css_comment_regex().replace_all(&self.css_rules, "");
        css_rule_regex()
            .captures_iter(&without_comments)
            .flat_map(|captures| split_selector_list(&captures[1]))
            .collect()
    }

    /// Whether `selectors` and `css_rules` target the same set.
    pub fn is_consistent(&self) -> bool {
        let from_selectors: BTreeSet<String> = self
            .selectors
            .iter()
            .map(|selector| normalize_selector(selector))
            .filter(|selector| !selector.is_empty())
            .collect();
        let from_css: BTreeSet<String> = self
            .css_selectors()
            .iter()
            .map(|selector| normalize_selector(selector))
            .collect();
        from_selectors == from_css
    }
}

fn css_comment_regex() -> &'static Regex {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
    }
    &*RE
}

fn css_rule_regex() -> &'static Regex {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"([^{}]+)\{[^}]*\}").unwrap();
    }
    &*RE
}

fn normalize_selector(selector: &str) -> String {
    selector.split_whitespace().collect::<Vec<_>>().join(" ")
}

// commas inside attribute values or :is(...) do not separate selectors
fn split_selector_list(prelude: &str) -> Vec<String> {
    let mut selectors = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in prelude.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '[') | (None, '(') => depth += 1,
            (None, ']') | (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                selectors.push(normalize_selector(&current));
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    selectors.push(normalize_selector(&current));

    selectors.retain(|selector| !selector.is_empty());
    selectors
}
