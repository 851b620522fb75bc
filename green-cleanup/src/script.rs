use serde_json::Value;

use crate::CleanupConfig;

/// Default id of the injected `<style>` node.
pub const STYLE_ID: &str = "webview-cleanup-styles";

/// Renders a self-contained script that hides and removes the profile's
/// targets inside a foreign document.
///
/// The script, in order: inserts the stylesheet once, defines a reentrancy
/// guarded cleanup pass that removes every match independently, runs it
/// immediately, optionally watches child-list mutations (debounced, torn
/// down after `observer_timeout_ms`), and re-runs the debounced pass when the
/// document becomes visible again. Nothing inside it throws to the host.
///
/// Output depends only on `config`.
pub fn create_cleanup_js(config: &CleanupConfig) -> String {
    let mut script = String::new();

    script.push_str("(function() {\n");
    script.push_str("  var isCleaning = false;\n");
    script.push_str("  var timeoutId = null;\n");
    script.push_str(&format!("  var selectors = {};\n", js_string_array(&config.selectors)));
    script.push('\n');

    script.push_str(&style_block(&config.style_id, &config.css_rules));
    script.push_str(CLEANUP_BLOCK);
    script.push_str(&debounce_block(config.debounce_ms));
    script.push_str("  cleanup();\n\n");

    if config.use_mutation_observer {
        script.push_str(&observer_block(config.observer_timeout_ms));
    }
    script.push_str(VISIBILITY_BLOCK);

    script.push_str("  return true;\n");
    script.push_str("})();\n");

    script
}

fn style_block(style_id: &str, css_rules: &str) -> String {
    let style_id = js_string(style_id);
    format!(
        "  try {{
    if (!document.getElementById({style_id})) {{
      var style = document.createElement('style');
      style.id = {style_id};
      style.textContent = {css};
      (document.head || document.documentElement).appendChild(style);
    }}
  }} catch (e) {{}}

",
        style_id = style_id,
        css = js_string(css_rules),
    )
}

const CLEANUP_BLOCK: &str = "  function cleanup() {
    if (isCleaning) return;
    isCleaning = true;

    try {
      var elementsToRemove = [];
      for (var i = 0; i < selectors.length; i++) {
        try {
          var matched = document.querySelectorAll(selectors[i]);
          for (var j = 0; j < matched.length; j++) {
            elementsToRemove.push(matched[j]);
          }
        } catch (e) {}
      }

      for (var k = 0; k < elementsToRemove.length; k++) {
        try {
          elementsToRemove[k].remove();
        } catch (e) {}
      }
    } finally {
      isCleaning = false;
    }
  }

";

fn debounce_block(debounce_ms: u64) -> String {
    format!(
        "  function debouncedCleanup() {{
    if (timeoutId) clearTimeout(timeoutId);
    timeoutId = setTimeout(cleanup, {debounce_ms});
  }}

",
        debounce_ms = debounce_ms,
    )
}

fn observer_block(observer_timeout_ms: u64) -> String {
    let teardown = if observer_timeout_ms > 0 {
        format!(
            "\n    setTimeout(function() {{ observer.disconnect(); }}, {});\n",
            observer_timeout_ms
        )
    } else {
        String::new()
    };

    format!(
        "  if (typeof MutationObserver !== 'undefined') {{
    var observer = new MutationObserver(debouncedCleanup);
    observer.observe(document.documentElement, {{
      childList: true,
      subtree: true,
      attributes: false,
      characterData: false
    }});
{teardown}  }}

",
        teardown = teardown,
    )
}

const VISIBILITY_BLOCK: &str = "  if (typeof document !== 'undefined' && 'visibilityState' in document) {
    document.addEventListener('visibilitychange', function() {
      if (document.visibilityState === 'visible') {
        debouncedCleanup();
      }
    });
  }

";

// JSON string literals are valid JS literals once the two line separators
// JSON allows raw are escaped.
fn js_string(value: &str) -> String {
    escape_line_separators(Value::from(value).to_string())
}

fn js_string_array(values: &[String]) -> String {
    escape_line_separators(Value::from(values.to_vec()).to_string())
}

fn escape_line_separators(json: String) -> String {
    json.replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HIDE_DECLARATIONS;
    use boa_engine::{Context, Source};
    use serde_json::json;

    fn config() -> CleanupConfig {
        CleanupConfig::from_selectors(&["#search", "span[data-plugin=\"embed-ui\"]"], &HIDE_DECLARATIONS)
            .with_debounce_ms(150)
    }

    fn position(script: &str, needle: &str) -> usize {
        script
            .find(needle)
            .unwrap_or_else(|| panic!("missing {:?} in script:\n{}", needle, script))
    }

    // brace/paren balance outside of string literals
    fn is_balanced(script: &str) -> bool {
        let mut stack = Vec::new();
        let mut quote: Option<char> = None;
        let mut escaped = false;
        for ch in script.chars() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
                continue;
            }
            match ch {
                '"' | '\'' | '`' => quote = Some(ch),
                '{' | '(' | '[' => stack.push(ch),
                '}' => {
                    if stack.pop() != Some('{') {
                        return false;
                    }
                }
                ')' => {
                    if stack.pop() != Some('(') {
                        return false;
                    }
                }
                ']' => {
                    if stack.pop() != Some('[') {
                        return false;
                    }
                }
                _ => {}
            }
        }
        stack.is_empty() && quote.is_none()
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(create_cleanup_js(&config()), create_cleanup_js(&config()));
    }

    #[test]
    fn test_step_order() {
        let script = create_cleanup_js(&config());

        let style = position(&script, "document.createElement('style')");
        let cleanup = position(&script, "function cleanup()");
        let immediate = position(&script, "  cleanup();\n");
        let observer = position(&script, "new MutationObserver(debouncedCleanup)");
        let visibility = position(&script, "'visibilitychange'");
        let done = position(&script, "return true;");

        assert!(style < cleanup);
        assert!(cleanup < immediate);
        assert!(immediate < observer);
        assert!(observer < visibility);
        assert!(visibility < done);
        assert!(script.starts_with("(function() {\n"));
        assert!(script.ends_with("})();\n"));
        assert!(is_balanced(&script));
    }

    #[test]
    fn test_embeds_selectors_and_css() {
        let config = config();
        let script = create_cleanup_js(&config);

        assert!(script.contains(r##"var selectors = ["#search","span[data-plugin=\"embed-ui\"]"];"##));
        assert!(script.contains(&format!("style.textContent = {};", js_string(&config.css_rules))));
        assert!(script.contains(r#"document.getElementById("webview-cleanup-styles")"#));
        assert!(script.contains(r#"style.id = "webview-cleanup-styles";"#));
    }

    #[test]
    fn test_configured_style_id() {
        let script = create_cleanup_js(&config().with_style_id("windy-cleanup"));

        assert!(script.contains(r#"document.getElementById("windy-cleanup")"#));
        assert!(script.contains(r#"style.id = "windy-cleanup";"#));
        assert!(!script.contains(STYLE_ID));
    }

    #[test]
    fn test_reentrancy_guard_and_per_element_catch() {
        let script = create_cleanup_js(&config());

        assert!(script.contains("if (isCleaning) return;"));
        assert!(script.contains("isCleaning = true;"));
        assert!(script.contains("} finally {\n      isCleaning = false;"));
        assert!(script.contains("try {\n          elementsToRemove[k].remove();\n        } catch (e) {}"));
        // a bad selector does not stop the other queries
        assert!(script.contains("try {\n          var matched = document.querySelectorAll(selectors[i]);"));
    }

    #[test]
    fn test_debounce() {
        let script = create_cleanup_js(&config());

        assert!(script.contains("if (timeoutId) clearTimeout(timeoutId);"));
        assert!(script.contains("timeoutId = setTimeout(cleanup, 150);"));
    }

    #[test]
    fn test_observer_options_and_teardown() {
        let script = create_cleanup_js(&config());

        assert!(script.contains("childList: true,"));
        assert!(script.contains("subtree: true,"));
        assert!(script.contains("attributes: false,"));
        assert!(script.contains("characterData: false"));
        assert!(script.contains("setTimeout(function() { observer.disconnect(); }, 30000);"));
    }

    #[test]
    fn test_configurable_teardown() {
        let script = create_cleanup_js(&config().with_observer_timeout_ms(90_000));
        assert!(script.contains("observer.disconnect(); }, 90000);"));

        let script = create_cleanup_js(&config().with_observer_timeout_ms(0));
        assert!(script.contains("new MutationObserver(debouncedCleanup)"));
        assert!(!script.contains("observer.disconnect()"));
        assert!(is_balanced(&script));
    }

    #[test]
    fn test_without_observer() {
        let script = create_cleanup_js(&config().with_mutation_observer(false));

        assert!(!script.contains("MutationObserver"));
        // visibility listener is unconditional
        assert!(script.contains("debouncedCleanup();"));
        assert!(script.contains("'visibilitychange'"));
        assert!(is_balanced(&script));
    }

    #[test]
    fn test_css_cannot_break_out() {
        let config = CleanupConfig {
            selectors: vec!["#a".to_string()],
            css_rules: "#a { content: \"`${alert(1)}`\"; }\n/* '); evil(); (' */\u{2028}".to_string(),
            use_mutation_observer: true,
            debounce_ms: 100,
            observer_timeout_ms: 30_000,
            style_id: STYLE_ID.to_string(),
        };
        let script = create_cleanup_js(&config);

        assert!(script.contains(
            r##"style.textContent = "#a { content: \"`${alert(1)}`\"; }\n/* '); evil(); (' */\u2028";"##
        ));
        assert!(!script.contains('\u{2028}'));
        assert!(is_balanced(&script));
    }

    #[test]
    fn test_empty_profile() {
        let config = CleanupConfig {
            selectors: vec![],
            css_rules: String::new(),
            use_mutation_observer: false,
            debounce_ms: 0,
            observer_timeout_ms: 0,
            style_id: STYLE_ID.to_string(),
        };
        let script = create_cleanup_js(&config);

        assert!(script.contains("var selectors = [];"));
        assert!(script.contains(r#"style.textContent = "";"#));
        assert!(is_balanced(&script));
    }

    // a minimal document, virtual timers and a MutationObserver that fires on `mutate()`
    const DOM_STUB: &str = r#"
var clock = 0;
var timers = [];
var nextTimer = 1;
function setTimeout(fn, ms) {
  var id = nextTimer++;
  timers.push({ id: id, at: clock + ms, fn: fn });
  return id;
}
function clearTimeout(id) {
  timers = timers.filter(function(t) { return t.id !== id; });
}
function advance(ms) {
  var until = clock + ms;
  while (true) {
    var due = timers
      .filter(function(t) { return t.at <= until; })
      .sort(function(a, b) { return a.at - b.at; });
    if (due.length === 0) break;
    var next = due[0];
    timers = timers.filter(function(t) { return t !== next; });
    clock = next.at;
    next.fn();
  }
  clock = until;
}

var observers = [];
function MutationObserver(callback) {
  this.callback = callback;
  this.connected = false;
  observers.push(this);
}
MutationObserver.prototype.observe = function(target, options) {
  this.connected = true;
  this.options = options;
};
MutationObserver.prototype.disconnect = function() {
  this.connected = false;
};
function mutate() {
  observers.forEach(function(o) { if (o.connected) o.callback([]); });
}

var removed = [];
var passes = 0;
var styles = [];
var listeners = {};
var matches = {};
function node(selector, id, throws) {
  var element = {
    id: id,
    remove: function() {
      if (throws) throw new Error('detached');
      matches[selector] = matches[selector].filter(function(e) { return e !== element; });
      removed.push(id);
    }
  };
  return element;
}
matches['.ad'] = [];
matches['.ad'].push(node('.ad', 'a1', false), node('.ad', 'stuck', true), node('.ad', 'a2', false));

var document = {
  visibilityState: 'visible',
  head: { appendChild: function(el) { styles.push(el); } },
  documentElement: {},
  getElementById: function(id) {
    return styles.filter(function(s) { return s.id === id; })[0] || null;
  },
  createElement: function(tag) { return { tagName: tag }; },
  querySelectorAll: function(selector) {
    if (selector === '.ad') passes++;
    if (selector.indexOf(':::') === 0) throw new Error('SyntaxError: ' + selector);
    return (matches[selector] || []).slice();
  },
  addEventListener: function(type, fn) { listeners[type] = fn; }
};
"#;

    fn dom_config() -> CleanupConfig {
        CleanupConfig::from_selectors(&[":::bad", ".ad"], &HIDE_DECLARATIONS)
    }

    // runs the stub, then `steps`, whose last expression must be a JSON string
    fn run_in_dom(steps: &str) -> serde_json::Value {
        let mut context = Context::default();
        let value = context
            .eval(Source::from_bytes(&format!("{}\n{}", DOM_STUB, steps)))
            .unwrap_or_else(|err| panic!("script failed: {}", err));
        let json = value
            .as_string()
            .map(|json| json.to_std_string_escaped())
            .unwrap_or_else(|| panic!("expected a JSON string, got {:?}", value));
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_cleanup_survives_bad_selector_and_throwing_element() {
        let config = dom_config();
        let script = create_cleanup_js(&config);
        let result = run_in_dom(&format!(
            "var first = {script}\nvar second = {script}\n\
             JSON.stringify({{ first: first, second: second, removed: removed, passes: passes, \
             styles: styles.map(function(s) {{ return {{ id: s.id, css: s.textContent }}; }}) }})",
            script = script
        ));

        assert_eq!(result["first"], true);
        assert_eq!(result["second"], true);
        assert_eq!(result["removed"], json!(["a1", "a2"]));
        assert_eq!(result["passes"], 2);
        assert_eq!(
            result["styles"],
            json!([{ "id": "webview-cleanup-styles", "css": config.css_rules }])
        );
    }

    #[test]
    fn test_mutation_bursts_collapse_into_one_pass() {
        let script = create_cleanup_js(&dom_config().with_debounce_ms(100));
        let result = run_in_dom(&format!(
            "{script}\nvar initial = passes;\n\
             for (var i = 0; i < 5; i++) {{ mutate(); advance(10); }}\n\
             var beforeSettle = passes;\n\
             advance(100);\n\
             var afterSettle = passes;\n\
             var options = observers[0].options;\n\
             var connected = observers[0].connected;\n\
             advance(30000);\n\
             JSON.stringify({{ initial: initial, beforeSettle: beforeSettle, afterSettle: afterSettle, \
             connected: connected, disconnected: !observers[0].connected, \
             childList: options.childList, subtree: options.subtree, attributes: options.attributes }})",
            script = script
        ));

        assert_eq!(result["initial"], 1);
        assert_eq!(result["beforeSettle"], 1);
        assert_eq!(result["afterSettle"], 2);
        assert_eq!(result["connected"], true);
        assert_eq!(result["disconnected"], true);
        assert_eq!(result["childList"], true);
        assert_eq!(result["subtree"], true);
        assert_eq!(result["attributes"], false);
    }

    #[test]
    fn test_observer_kept_alive_without_teardown() {
        let script = create_cleanup_js(&dom_config().with_observer_timeout_ms(0));
        let result = run_in_dom(&format!(
            "{script}\nadvance(60000);\nmutate();\nadvance(100);\n\
             JSON.stringify({{ connected: observers[0].connected, passes: passes }})",
            script = script
        ));

        assert_eq!(result["connected"], true);
        assert_eq!(result["passes"], 2);
    }

    #[test]
    fn test_visibility_reruns_cleanup() {
        let script = create_cleanup_js(&dom_config().with_mutation_observer(false));
        let result = run_in_dom(&format!(
            "{script}\nlisteners['visibilitychange']();\nadvance(100);\n\
             JSON.stringify({{ observers: observers.length, passes: passes }})",
            script = script
        ));

        assert_eq!(result["observers"], 0);
        assert_eq!(result["passes"], 2);
    }
}
