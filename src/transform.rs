use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PRIMARY_COLOR: &str = "#3B82F6";
pub const DEFAULT_FONT_FAMILY: &str = "Inter";

/// Families offered in the structured font picker. Free-form names are
/// accepted everywhere a family is taken; this list is advisory.
pub const KNOWN_FONTS: &[&str] = &[
    "Inter",
    "Roboto",
    "Open Sans",
    "Lato",
    "Montserrat",
    "Poppins",
    "Source Sans Pro",
    "Raleway",
    "PT Sans",
    "Nunito",
    "Ubuntu",
    "Playfair Display",
];

pub const MIN_CARD_COUNT: u32 = 1;
pub const MAX_CARD_COUNT: u32 = 12;

pub const COLOR_OVERRIDES_ID: &str = "custom-overrides";
pub const HEADER_FOOTER_OVERRIDES_ID: &str = "custom-header-footer-overrides";
pub const DARK_OVERRIDES_ID: &str = "custom-dark-overrides";
pub const COMPACT_OVERRIDES_ID: &str = "custom-compact-overrides";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomizationState {
    pub primary_color: String,
    pub font_family: String,
    pub header_background: Option<String>,
    pub footer_background: Option<String>,
    pub dark_mode: bool,
    pub compact_layout: bool,
    pub card_count: u32,
    pub inline_editing_enabled: bool,
}

impl Default for CustomizationState {
    fn default() -> Self {
        Self {
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            header_background: None,
            footer_background: None,
            dark_mode: false,
            compact_layout: false,
            card_count: 3,
            inline_editing_enabled: false,
        }
    }
}

impl CustomizationState {
    pub fn clamped_card_count(&self) -> u32 {
        self.card_count.clamp(MIN_CARD_COUNT, MAX_CARD_COUNT)
    }
}

/// Applies the full customization pipeline to a base document.
///
/// Pure and total: unmatched anchor points (a document without `<head>`)
/// degrade to no-ops for the affected step, and re-applying the same state
/// on top of an already-transformed document is byte-for-byte stable. Each
/// injected override lives in a single `<style id="...">` block that is
/// replaced in place, never duplicated.
pub fn transform(base_html: &str, state: &CustomizationState, edit_mode_active: bool) -> String {
    let html = apply_primary_color(base_html, &state.primary_color);
    let html = apply_font(&html, &state.font_family, edit_mode_active);
    let html = apply_header_footer(
        &html,
        state.header_background.as_deref(),
        state.footer_background.as_deref(),
    );
    let html = apply_dark_mode(&html, state.dark_mode);
    apply_compact_layout(&html, state.compact_layout)
}

/// First declared font family in the document, if any. Used to sync the
/// structured font selection after manual edits.
pub fn detect_font_family(html: &str) -> Option<String> {
    lazy_static! {
        static ref FIRST_FAMILY_RE: Regex =
            Regex::new(r#"(?i)font-family:\s*['"]?([A-Za-z0-9 \-]+)['"]?\s*,"#).unwrap();
    }

    FIRST_FAMILY_RE
        .captures(html)
        .map(|caps| caps[1].trim().to_string())
        .filter(|family| !family.is_empty())
}

fn apply_primary_color(html: &str, color: &str) -> String {
    let color = color.trim();
    if color.is_empty() {
        return html.to_string();
    }

    // Generated documents are inconsistent about how they spell the accent
    // color, so literal substitution is paired with a capstone override
    // block keyed by id.
    lazy_static! {
        static ref HEX_ACCENT_RE: Regex =
            Regex::new(r"(?i)#3B82F6|#2563EB|#1D4ED8|#60A5FA|#93C5FD").unwrap();
        static ref RGB_ACCENT_RE: Regex = Regex::new(r"(?i)rgb\(59,\s*130,\s*246\)").unwrap();
    }

    let replaced = HEX_ACCENT_RE.replace_all(html, NoExpand(color));
    let replaced = RGB_ACCENT_RE.replace_all(&replaced, NoExpand(color));

    let css = format!(
        "\n  :root {{ --accent: {color}; }}\
         \n  a, .link {{ color: var(--accent) !important; }}\
         \n  .btn, button, .cta {{ background-color: var(--accent) !important; border-color: var(--accent) !important; color: #ffffff !important; }}\
         \n  .badge, .pill {{ background-color: var(--accent) !important; }}\
         \n  .accent-border {{ border-color: var(--accent) !important; }}\n"
    );
    set_keyed_style(&replaced, COLOR_OVERRIDES_ID, &css)
}

fn apply_font(html: &str, family: &str, edit_mode_active: bool) -> String {
    if edit_mode_active {
        // Manual edits own the font declarations. Only make sure an import
        // exists for whatever family the document currently declares; a
        // document with no declaration left gets no override at all.
        return match detect_font_family(html) {
            Some(declared) => ensure_font_import(html, &declared),
            None => html.to_string(),
        };
    }

    let family = family.trim();
    if family.is_empty() {
        return html.to_string();
    }

    // The value match stops at declaration and markup boundaries; a
    // trailing quote belongs to the surrounding style attribute and is
    // carried over unchanged.
    lazy_static! {
        static ref FAMILY_DECL_RE: Regex = Regex::new(r"(?i)font-family:\s*[^;<>{}\n]+").unwrap();
    }

    let declaration = format!("font-family: '{family}', sans-serif");
    let rewritten = FAMILY_DECL_RE
        .replace_all(html, |caps: &regex::Captures| {
            let matched = caps.get(0).unwrap().as_str();
            let suffix = if matched.ends_with('"') && matched.matches('"').count() % 2 == 1 {
                "\""
            } else if matched.ends_with('\'') && matched.matches('\'').count() % 2 == 1 {
                "'"
            } else {
                ""
            };
            format!("{declaration}{suffix}")
        })
        .to_string();
    ensure_font_import(&rewritten, family)
}

fn ensure_font_import(html: &str, family: &str) -> String {
    // Presence of the provider domain is the dedup check, so a document
    // that already imports any Google font is left alone.
    if html.contains("fonts.googleapis.com") {
        return html.to_string();
    }

    let link = format!(
        "\n  <link href=\"https://fonts.googleapis.com/css2?family={}:wght@300;400;500;600;700&display=swap\" rel=\"stylesheet\">",
        family.replace(' ', "+")
    );
    insert_after_head(html, &link)
}

fn apply_header_footer(html: &str, header: Option<&str>, footer: Option<&str>) -> String {
    let header = header.map(str::trim).filter(|color| !color.is_empty());
    let footer = footer.map(str::trim).filter(|color| !color.is_empty());

    if header.is_none() && footer.is_none() {
        return remove_keyed_style(html, HEADER_FOOTER_OVERRIDES_ID);
    }

    let mut css = String::new();
    if let Some(color) = header {
        css.push_str(&format!(
            "\n  header, .site-header, .navbar, .topbar, .app-header {{ background-color: {color} !important; }}"
        ));
    }
    if let Some(color) = footer {
        css.push_str(&format!(
            "\n  footer, .site-footer, .app-footer {{ background-color: {color} !important; }}"
        ));
    }
    css.push('\n');
    set_keyed_style(html, HEADER_FOOTER_OVERRIDES_ID, &css)
}

fn apply_dark_mode(html: &str, enabled: bool) -> String {
    if !enabled {
        return remove_keyed_style(html, DARK_OVERRIDES_ID);
    }

    const DARK_CSS: &str = "\n  body { background-color: #0f172a !important; color: #e5e7eb !important; }\
        \n  header, footer, section, main, .card, .panel { background-color: #111827 !important; color: #e5e7eb !important; }\
        \n  hr, .divider { border-color: #374151 !important; }\
        \n  input, textarea, select { background-color: #1f2937 !important; color: #e5e7eb !important; border-color: #374151 !important; }\n";
    set_keyed_style(html, DARK_OVERRIDES_ID, DARK_CSS)
}

fn apply_compact_layout(html: &str, enabled: bool) -> String {
    if !enabled {
        return remove_keyed_style(html, COMPACT_OVERRIDES_ID);
    }

    const COMPACT_CSS: &str = "\n  :root { --space: 0.75rem; }\
        \n  body { line-height: 1.4; }\
        \n  section, .section, .container { padding-top: var(--space) !important; padding-bottom: var(--space) !important; }\
        \n  h1 { margin-bottom: 0.5rem !important; }\
        \n  h2, h3, h4 { margin-top: 0.75rem !important; margin-bottom: 0.5rem !important; }\
        \n  p { margin-bottom: 0.5rem !important; }\
        \n  .grid { gap: 0.75rem !important; }\
        \n  .btn, button, .cta { padding: 0.5rem 0.875rem !important; }\n";
    set_keyed_style(html, COMPACT_OVERRIDES_ID, COMPACT_CSS)
}

pub(crate) fn set_keyed_style(html: &str, id: &str, css: &str) -> String {
    let block = format!("<style id=\"{id}\">{css}</style>");
    match keyed_style_bounds(html, id) {
        Some((start, end)) => format!("{}{}{}", &html[..start], block, &html[end..]),
        None => insert_after_head(html, &block),
    }
}

pub(crate) fn remove_keyed_style(html: &str, id: &str) -> String {
    match keyed_style_bounds(html, id) {
        Some((start, end)) => format!("{}{}", &html[..start], &html[end..]),
        None => html.to_string(),
    }
}

fn keyed_style_bounds(html: &str, id: &str) -> Option<(usize, usize)> {
    lazy_static! {
        static ref KEYED_STYLE_RE: Regex =
            Regex::new(r#"(?s)<style id="([A-Za-z0-9_-]+)">.*?</style>"#).unwrap();
    }

    KEYED_STYLE_RE
        .captures_iter(html)
        .find(|caps| &caps[1] == id)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            (whole.start(), whole.end())
        })
}

pub(crate) fn set_keyed_script(html: &str, id: &str, source: &str) -> String {
    let block = format!("<script id=\"{id}\">{source}</script>");
    match keyed_script_bounds(html, id) {
        Some((start, end)) => format!("{}{}{}", &html[..start], block, &html[end..]),
        None => insert_before_body_end(html, &block),
    }
}

pub(crate) fn remove_keyed_script(html: &str, id: &str) -> String {
    match keyed_script_bounds(html, id) {
        Some((start, end)) => format!("{}{}", &html[..start], &html[end..]),
        None => html.to_string(),
    }
}

fn keyed_script_bounds(html: &str, id: &str) -> Option<(usize, usize)> {
    lazy_static! {
        static ref KEYED_SCRIPT_RE: Regex =
            Regex::new(r#"(?s)<script id="([A-Za-z0-9_-]+)">.*?</script>"#).unwrap();
    }

    KEYED_SCRIPT_RE
        .captures_iter(html)
        .find(|caps| &caps[1] == id)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            (whole.start(), whole.end())
        })
}

fn insert_after_head(html: &str, block: &str) -> String {
    match html.find("<head>") {
        Some(at) => {
            let insert_at = at + "<head>".len();
            format!("{}{}{}", &html[..insert_at], block, &html[insert_at..])
        }
        None => html.to_string(),
    }
}

fn insert_before_body_end(html: &str, block: &str) -> String {
    match html.find("</body>") {
        Some(at) => format!("{}{}{}", &html[..at], block, &html[at..]),
        None => html.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> String {
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Portfolio</title>\n\
         <style>\nbody { font-family: 'Inter', sans-serif; color: #3B82F6; }\n\
         .hero { background: #2563EB; }\na { color: rgb(59, 130, 246); }\n</style>\n</head>\n\
         <body>\n<header>Hi</header>\n<main><p style=\"font-family: Georgia, serif\">Text</p></main>\n\
         <footer>Bye</footer>\n</body>\n</html>"
            .to_string()
    }

    fn busy_state() -> CustomizationState {
        CustomizationState {
            primary_color: "#FF0000".to_string(),
            font_family: "Poppins".to_string(),
            header_background: Some("#222222".to_string()),
            footer_background: Some("#333333".to_string()),
            dark_mode: true,
            compact_layout: true,
            card_count: 5,
            inline_editing_enabled: false,
        }
    }

    #[test]
    fn transform_is_idempotent() {
        let html = sample_document();
        let state = busy_state();

        let once = transform(&html, &state, false);
        let twice = transform(&once, &state, false);

        assert_eq!(once, twice, "re-applying identical state must be a no-op");
    }

    #[test]
    fn primary_color_replaces_every_default_literal() {
        let html = sample_document();
        let state = CustomizationState {
            primary_color: "#FF0000".to_string(),
            ..CustomizationState::default()
        };

        let out = transform(&html, &state, false);

        assert!(!out.to_ascii_uppercase().contains("#3B82F6"));
        assert!(!out.to_ascii_uppercase().contains("#2563EB"));
        assert!(!out.contains("rgb(59, 130, 246)"));
        assert!(
            out.contains("--accent: #FF0000;"),
            "override block should carry the chosen color, got: {out}"
        );
    }

    #[test]
    fn dark_mode_toggle_is_reversible() {
        let html = sample_document();
        let mut state = CustomizationState {
            dark_mode: true,
            ..CustomizationState::default()
        };

        let on = transform(&html, &state, false);
        assert!(on.contains(DARK_OVERRIDES_ID));

        state.dark_mode = false;
        let off = transform(&on, &state, false);
        assert!(
            !off.contains(DARK_OVERRIDES_ID),
            "turning dark mode off must remove the injected block"
        );
        assert_eq!(off, transform(&html, &state, false));
    }

    #[test]
    fn header_footer_override_is_removed_when_cleared() {
        let html = sample_document();
        let mut state = CustomizationState {
            header_background: Some("#101010".to_string()),
            footer_background: Some("#202020".to_string()),
            ..CustomizationState::default()
        };

        let on = transform(&html, &state, false);
        assert!(on.contains(HEADER_FOOTER_OVERRIDES_ID));
        assert!(on.contains("background-color: #101010 !important"));
        assert!(on.contains("background-color: #202020 !important"));

        state.header_background = None;
        state.footer_background = None;
        let off = transform(&on, &state, false);
        assert!(!off.contains(HEADER_FOOTER_OVERRIDES_ID));
    }

    #[test]
    fn repeated_state_changes_never_accumulate_blocks() {
        let html = sample_document();
        let mut out = html.clone();
        let mut state = busy_state();

        for round in 0..6 {
            state.dark_mode = round % 2 == 0;
            state.compact_layout = round % 3 == 0;
            state.primary_color = if round % 2 == 0 {
                "#FF0000".to_string()
            } else {
                "#00FF00".to_string()
            };
            out = transform(&out, &state, false);
        }

        for id in [
            COLOR_OVERRIDES_ID,
            HEADER_FOOTER_OVERRIDES_ID,
            DARK_OVERRIDES_ID,
            COMPACT_OVERRIDES_ID,
        ] {
            let marker = format!("<style id=\"{id}\">");
            let occurrences = out.matches(&marker).count();
            assert!(
                occurrences <= 1,
                "expected at most one {id} block, found {occurrences}"
            );
        }
    }

    #[test]
    fn font_rewrite_touches_every_declaration_and_imports_once() {
        let html = sample_document();
        let state = CustomizationState {
            font_family: "Playfair Display".to_string(),
            ..CustomizationState::default()
        };

        let out = transform(&html, &state, false);

        assert!(!out.contains("Georgia"));
        assert!(out.contains("font-family: 'Playfair Display', sans-serif"));
        assert_eq!(
            out.matches("fonts.googleapis.com").count(),
            1,
            "exactly one font import expected"
        );
        assert!(out.contains("family=Playfair+Display"));
    }

    #[test]
    fn edit_mode_preserves_manual_font_declarations() {
        let html = sample_document();
        let state = CustomizationState {
            font_family: "Poppins".to_string(),
            ..CustomizationState::default()
        };

        let out = transform(&html, &state, true);

        assert!(
            out.contains("font-family: 'Inter', sans-serif"),
            "author's declaration must survive edit mode"
        );
        assert!(
            out.contains("family=Inter"),
            "import should follow the declared family, not the selection"
        );
    }

    #[test]
    fn edit_mode_without_declarations_adds_no_font_override() {
        let html = "<html><head><title>t</title></head><body><p>plain</p></body></html>";
        let state = CustomizationState::default();

        let out = transform(html, &state, true);

        assert!(!out.contains("fonts.googleapis.com"));
    }

    #[test]
    fn missing_head_degrades_to_literal_substitution_only() {
        let fragment = "<div style=\"color: #3B82F6\">standalone</div>";
        let state = CustomizationState {
            primary_color: "#FF0000".to_string(),
            ..CustomizationState::default()
        };

        let out = transform(fragment, &state, false);

        assert!(out.contains("#FF0000"), "literal substitution still applies");
        assert!(
            !out.contains("<style id="),
            "no injection point means no injected blocks"
        );
    }

    #[test]
    fn detects_first_declared_family() {
        let html = "<style>body { font-family: \"Open Sans\", sans-serif; } h1 { font-family: Lato, serif; }</style>";
        assert_eq!(detect_font_family(html).as_deref(), Some("Open Sans"));
        assert_eq!(detect_font_family("<p>no styles</p>"), None);
    }

    #[test]
    fn card_count_is_clamped_to_bounds() {
        let mut state = CustomizationState {
            card_count: 40,
            ..CustomizationState::default()
        };
        assert_eq!(state.clamped_card_count(), MAX_CARD_COUNT);
        state.card_count = 0;
        assert_eq!(state.clamped_card_count(), MIN_CARD_COUNT);
    }
}
