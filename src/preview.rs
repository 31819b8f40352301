use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use crate::transform::{
    remove_keyed_script, set_keyed_script, CustomizationState, MAX_CARD_COUNT, MIN_CARD_COUNT,
};

const INLINE_EDIT_SCRIPT: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/inline-edit.js"));
const LINK_GUARD_SCRIPT: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/link-guard.js"));

pub const INLINE_EDIT_ID: &str = "preview-inline-edit";
pub const LINK_GUARD_ID: &str = "preview-link-guard";

/// Ordered matching conventions for the repeated "card" group. The first
/// convention that matches anything wins; when none matches the document
/// is returned unchanged (best effort, by contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSelector {
    ProjectCardClass,
    CardClass,
    ProjectClass,
    SectionGridChild,
    MainGridChild,
}

impl CardSelector {
    pub const ORDER: [CardSelector; 5] = [
        CardSelector::ProjectCardClass,
        CardSelector::CardClass,
        CardSelector::ProjectClass,
        CardSelector::SectionGridChild,
        CardSelector::MainGridChild,
    ];

    fn find_group(&self, html: &str) -> Option<Vec<Range<usize>>> {
        match self {
            CardSelector::ProjectCardClass => class_group(html, "project-card"),
            CardSelector::CardClass => class_group(html, "card"),
            CardSelector::ProjectClass => class_group(html, "project"),
            CardSelector::SectionGridChild => grid_child_group(html, "section"),
            CardSelector::MainGridChild => grid_child_group(html, "main"),
        }
    }
}

/// Builds the document shown in the sandboxed preview surface: the card
/// group is normalized to the configured count and the preview wiring
/// scripts are injected as keyed blocks. Export never sees this output.
pub fn prepare(html: &str, state: &CustomizationState) -> String {
    let html = normalize_card_count(html, state.card_count);
    let html = if state.inline_editing_enabled {
        set_keyed_script(&html, INLINE_EDIT_ID, INLINE_EDIT_SCRIPT)
    } else {
        remove_keyed_script(&html, INLINE_EDIT_ID)
    };
    set_keyed_script(&html, LINK_GUARD_ID, LINK_GUARD_SCRIPT)
}

/// Rebuilds the first matched card group to exactly `count` siblings, each
/// a clone of the group's first element. Pure: returns a new document.
pub fn normalize_card_count(html: &str, count: u32) -> String {
    let count = count.clamp(MIN_CARD_COUNT, MAX_CARD_COUNT) as usize;

    for selector in CardSelector::ORDER {
        if let Some(members) = selector.find_group(html) {
            return rebuild_group(html, &members, count);
        }
    }
    html.to_string()
}

fn rebuild_group(html: &str, members: &[Range<usize>], count: usize) -> String {
    let template = &html[members[0].clone()];
    let separator = if members.len() > 1 {
        html[members[0].end..members[1].start].to_string()
    } else {
        "\n".to_string()
    };

    let mut rebuilt = String::new();
    for index in 0..count {
        if index > 0 {
            rebuilt.push_str(&separator);
        }
        rebuilt.push_str(template);
    }

    let start = members[0].start;
    let end = members.last().expect("group is non-empty").end;
    format!("{}{}{}", &html[..start], rebuilt, &html[end..])
}

/// First element carrying `token` as a whole class word, plus the run of
/// immediately following siblings with the same class.
fn class_group(html: &str, token: &str) -> Option<Vec<Range<usize>>> {
    let mut pos = 0;
    let first = loop {
        let at = next_element_start(html, pos, html.len())?;
        let tag_end = opening_tag_end(html, at)?;
        if opening_tag_has_class(&html[at..tag_end], token) {
            let span = element_span(html, at)?;
            break at..span.end;
        }
        // Step inside the element so nested matches are found too.
        pos = at + 1;
    };

    let mut members = vec![first];
    loop {
        let last_end = members.last().expect("at least one member").end;
        let Some(at) = next_element_start(html, last_end, html.len()) else {
            break;
        };
        if !html[last_end..at].trim().is_empty() {
            break;
        }
        let Some(tag_end) = opening_tag_end(html, at) else {
            break;
        };
        if !opening_tag_has_class(&html[at..tag_end], token) {
            break;
        }
        let Some(span) = element_span(html, at) else {
            break;
        };
        members.push(at..span.end);
    }

    Some(members)
}

/// Direct `<div>` children of a `.grid` container inside a
/// `<section>`/`<main>` element. Scopes are tried in document order; the
/// first one holding a grid with div children wins, so a leading hero
/// section without cards does not mask a grid further down.
fn grid_child_group(html: &str, scope_tag: &str) -> Option<Vec<Range<usize>>> {
    let mut scope_pos = 0;
    while let Some(scope_start) = find_tag_from(html, scope_tag, scope_pos) {
        let scope = element_span(html, scope_start)?;
        if let Some(children) = grid_children_within(html, &scope) {
            return Some(children);
        }
        scope_pos = scope.end;
    }
    None
}

fn grid_children_within(html: &str, scope: &ElementSpan) -> Option<Vec<Range<usize>>> {
    let mut pos = scope.open_end;
    let grid = loop {
        let at = next_element_start(html, pos, scope.close_start)?;
        let tag_end = opening_tag_end(html, at)?;
        if opening_tag_has_class(&html[at..tag_end], "grid") {
            break element_span(html, at)?;
        }
        pos = at + 1;
    };

    let mut children = Vec::new();
    let mut pos = grid.open_end;
    while let Some(at) = next_element_start(html, pos, grid.close_start) {
        let span = element_span(html, at)?;
        let name = tag_name(html, at)?;
        if name.eq_ignore_ascii_case("div") {
            children.push(at..span.end);
        } else if !children.is_empty() {
            // Only the contiguous run starting at the first div is treated
            // as the card group.
            break;
        }
        pos = span.end;
    }

    if children.is_empty() {
        None
    } else {
        Some(children)
    }
}

struct ElementSpan {
    open_end: usize,
    close_start: usize,
    end: usize,
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn find_tag_from(html: &str, wanted: &str, mut pos: usize) -> Option<usize> {
    loop {
        let at = next_element_start(html, pos, html.len())?;
        if let Some(name) = tag_name(html, at) {
            if name.eq_ignore_ascii_case(wanted) {
                return Some(at);
            }
        }
        pos = at + 1;
    }
}

/// Position of the next opening-tag `<` between `pos` and `limit`,
/// skipping comments, closing tags, doctypes and processing instructions.
fn next_element_start(html: &str, mut pos: usize, limit: usize) -> Option<usize> {
    while pos < limit {
        let rel = html[pos..limit].find('<')?;
        let at = pos + rel;
        let rest = &html[at..limit];
        if rest.starts_with("<!--") {
            let close = html[at..limit].find("-->")?;
            pos = at + close + 3;
            continue;
        }
        if rest.starts_with("</") || rest.starts_with("<!") || rest.starts_with("<?") {
            pos = at + 1;
            continue;
        }
        if rest[1..]
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic())
            .unwrap_or(false)
        {
            return Some(at);
        }
        pos = at + 1;
    }
    None
}

fn tag_name(html: &str, start: usize) -> Option<&str> {
    let rest = &html[start + 1..];
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(rest.len());
    if end == 0 {
        None
    } else {
        Some(&rest[..end])
    }
}

fn opening_tag_end(html: &str, start: usize) -> Option<usize> {
    html[start..].find('>').map(|rel| start + rel + 1)
}

fn opening_tag_has_class(tag: &str, token: &str) -> bool {
    lazy_static! {
        static ref CLASS_ATTR_RE: Regex =
            Regex::new(r#"(?i)\bclass\s*=\s*["']([^"']*)["']"#).unwrap();
    }

    CLASS_ATTR_RE
        .captures(tag)
        .map(|caps| {
            caps[1]
                .split_ascii_whitespace()
                .any(|class| class.eq_ignore_ascii_case(token))
        })
        .unwrap_or(false)
}

/// Full extent of the element whose opening tag starts at `start`,
/// balancing nested same-name tags. Void and self-closing elements end at
/// their opening tag.
fn element_span(html: &str, start: usize) -> Option<ElementSpan> {
    let name = tag_name(html, start)?.to_ascii_lowercase();
    let open_end = opening_tag_end(html, start)?;
    if html[start..open_end].ends_with("/>") || VOID_TAGS.contains(&name.as_str()) {
        return Some(ElementSpan {
            open_end,
            close_start: open_end,
            end: open_end,
        });
    }

    let mut depth = 1usize;
    let mut pos = open_end;
    loop {
        let rel = html[pos..].find('<')?;
        let at = pos + rel;
        let rest = &html[at..];
        if rest.starts_with("<!--") {
            let close = html[at..].find("-->")?;
            pos = at + close + 3;
            continue;
        }
        if let Some(after_slash) = rest.strip_prefix("</") {
            if closing_tag_matches(after_slash, &name) {
                depth -= 1;
                let close_end = at + html[at..].find('>')? + 1;
                if depth == 0 {
                    return Some(ElementSpan {
                        open_end,
                        close_start: at,
                        end: close_end,
                    });
                }
                pos = close_end;
            } else {
                pos = at + 2;
            }
            continue;
        }
        if let Some(inner) = tag_name(html, at) {
            let inner_end = opening_tag_end(html, at)?;
            if inner.eq_ignore_ascii_case(&name) && !html[at..inner_end].ends_with("/>") {
                depth += 1;
            }
            pos = inner_end;
            continue;
        }
        pos = at + 1;
    }
}

fn closing_tag_matches(after_slash: &str, lower_name: &str) -> bool {
    after_slash.len() >= lower_name.len()
        && after_slash[..lower_name.len()].eq_ignore_ascii_case(lower_name)
        && after_slash[lower_name.len()..]
            .chars()
            .next()
            .map(|c| c == '>' || c.is_ascii_whitespace())
            .unwrap_or(false)
}
