use crate::{CleanupConfig, HIDE_DECLARATIONS};

const WINDY_SELECTORS: [&str; 9] = [
    "div.rhpane.hide-on-picker-drag.top-border.right-border.mobiletablethide",
    "#search",
    "#logo-wrapper",
    "#open-in-app",
    "section.mobile-calendar.fg-white.svelte-1hd22x0",
    "section#bottom-wrapper",
    r#"span[data-plugin="embed-ui"]"#,
    r#"span[data-plugin="bottom-right"]"#,
    r#"span[data-plugin="plugins"]"#,
];

const GREEN_MAP_SELECTORS: [&str; 4] = [
    r#"div[data-name="0.0.0"][data-col-name="0.0.0"][data-type="slot"][data-editor="slot"].page-col.page-col-0-0-0.sticky"#,
    "div.map-search-bis",
    "div.toaster-list",
    "div.map-inner-container.left.bottom.right",
];

/// Windy re-renders its side pane and calendar on every forecast change.
pub fn windy() -> CleanupConfig {
    CleanupConfig::from_selectors(&WINDY_SELECTORS, &HIDE_DECLARATIONS).with_debounce_ms(150)
}

pub fn green_map() -> CleanupConfig {
    CleanupConfig::from_selectors(&GREEN_MAP_SELECTORS, &HIDE_DECLARATIONS).with_debounce_ms(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_cleanup_js;

    #[test]
    fn test_profiles_are_consistent() {
        for profile in [windy(), green_map()] {
            assert!(profile.is_consistent());
            assert!(profile.use_mutation_observer);
            assert_eq!(profile.observer_timeout_ms, 30_000);
        }
    }

    #[test]
    fn test_windy() {
        let profile = windy();
        assert_eq!(profile.selectors.len(), 9);
        assert_eq!(profile.debounce_ms, 150);
        assert!(create_cleanup_js(&profile).contains("setTimeout(cleanup, 150)"));
    }

    #[test]
    fn test_green_map() {
        let profile = green_map();
        assert_eq!(profile.selectors.len(), 4);
        assert_eq!(profile.debounce_ms, 100);
        assert_eq!(profile.css_selectors()[0], GREEN_MAP_SELECTORS[0]);
    }
}
