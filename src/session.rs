use crate::preview;
use crate::transform::{self, CustomizationState, MAX_CARD_COUNT, MIN_CARD_COUNT};

/// The document baseline customizations are layered on. The two modes are
/// a single tagged union, so "structured" and "raw edit" can never be
/// active at the same time; `RawEdit` keeps the generated text around so
/// discarding an edit restores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    Generated { html: String },
    RawEdit { html: String, edited: String },
}

/// Per-session customization store: current baseline, structured settings
/// and a version counter bumped on every mutation so a preview surface can
/// force a re-render.
#[derive(Debug, Clone)]
pub struct EditSession {
    baseline: Baseline,
    state: CustomizationState,
    version: u64,
}

impl EditSession {
    pub fn new(raw_document: String) -> Self {
        Self {
            baseline: Baseline::Generated { html: raw_document },
            state: CustomizationState::default(),
            version: 0,
        }
    }

    pub fn state(&self) -> &CustomizationState {
        &self.state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_raw_editing(&self) -> bool {
        matches!(self.baseline, Baseline::RawEdit { .. })
    }

    /// Text the transform pipeline currently runs on.
    pub fn active_text(&self) -> &str {
        match &self.baseline {
            Baseline::Generated { html } => html,
            Baseline::RawEdit { edited, .. } => edited,
        }
    }

    /// A fresh generation replaces the whole baseline; pending raw edits
    /// are dropped with it.
    pub fn replace_document(&mut self, html: String) {
        self.baseline = Baseline::Generated { html };
        self.bump();
    }

    /// Snapshot the current transformed output as editable text and switch
    /// to raw-edit mode. No-op when already editing.
    pub fn begin_raw_edit(&mut self) {
        if let Baseline::Generated { html } = &self.baseline {
            let html = html.clone();
            let edited = self.current_html();
            self.baseline = Baseline::RawEdit { html, edited };
            self.bump();
        }
    }

    pub fn update_raw_text(&mut self, text: String) {
        if let Baseline::RawEdit { edited, .. } = &mut self.baseline {
            *edited = text;
            self.bump();
        }
    }

    /// Raw edits become the new generated baseline; the structured font
    /// selection follows whatever the edited document declares.
    pub fn save_raw_edits(&mut self) {
        if let Baseline::RawEdit { edited, .. } = &self.baseline {
            let edited = edited.clone();
            if let Some(family) = transform::detect_font_family(&edited) {
                self.state.font_family = family;
            }
            self.baseline = Baseline::Generated { html: edited };
            self.bump();
        }
    }

    pub fn discard_raw_edits(&mut self) {
        if let Baseline::RawEdit { html, .. } = &self.baseline {
            let html = html.clone();
            self.baseline = Baseline::Generated { html };
            self.bump();
        }
    }

    /// Serialized markup coming back from the editable preview surface.
    /// Puts the session into raw-edit mode with the generated baseline
    /// preserved for discard.
    pub fn adopt_inline_edit(&mut self, serialized: String) {
        self.baseline = match std::mem::replace(
            &mut self.baseline,
            Baseline::Generated { html: String::new() },
        ) {
            Baseline::Generated { html } | Baseline::RawEdit { html, .. } => Baseline::RawEdit {
                html,
                edited: serialized,
            },
        };
        self.bump();
    }

    pub fn set_primary_color(&mut self, color: String) {
        self.state.primary_color = color;
        self.bump();
    }

    pub fn set_font_family(&mut self, family: String) {
        self.state.font_family = family;
        self.bump();
    }

    pub fn set_header_background(&mut self, color: Option<String>) {
        self.state.header_background = color;
        self.bump();
    }

    pub fn set_footer_background(&mut self, color: Option<String>) {
        self.state.footer_background = color;
        self.bump();
    }

    pub fn set_dark_mode(&mut self, enabled: bool) {
        self.state.dark_mode = enabled;
        self.bump();
    }

    pub fn set_compact_layout(&mut self, enabled: bool) {
        self.state.compact_layout = enabled;
        self.bump();
    }

    pub fn set_card_count(&mut self, count: u32) {
        self.state.card_count = count.clamp(MIN_CARD_COUNT, MAX_CARD_COUNT);
        self.bump();
    }

    pub fn set_inline_editing(&mut self, enabled: bool) {
        self.state.inline_editing_enabled = enabled;
        self.bump();
    }

    /// The transformed document for the current baseline and settings.
    pub fn current_html(&self) -> String {
        transform::transform(self.active_text(), &self.state, self.is_raw_editing())
    }

    /// The preview document: transformed output plus card normalization
    /// and preview wiring.
    pub fn preview_html(&self) -> String {
        preview::prepare(&self.current_html(), &self.state)
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = "<html><head><title>t</title>\
        <style>body { font-family: 'Inter', sans-serif; }</style>\
        </head><body><p>hi</p></body></html>";

    #[test]
    fn modes_are_mutually_exclusive_by_construction() {
        let mut session = EditSession::new(DOCUMENT.to_string());
        assert!(!session.is_raw_editing());

        session.begin_raw_edit();
        assert!(session.is_raw_editing());

        session.discard_raw_edits();
        assert!(!session.is_raw_editing());
        assert_eq!(session.active_text(), DOCUMENT);
    }

    #[test]
    fn saving_raw_edits_becomes_the_new_baseline() {
        let mut session = EditSession::new(DOCUMENT.to_string());
        session.begin_raw_edit();
        session.update_raw_text(
            "<html><head></head><body><style>p { font-family: \"Lato\", serif; }</style></body></html>"
                .to_string(),
        );
        session.save_raw_edits();

        assert!(!session.is_raw_editing());
        assert!(session.active_text().contains("Lato"));
        assert_eq!(
            session.state().font_family,
            "Lato",
            "font selection syncs from the saved document"
        );
    }

    #[test]
    fn every_mutation_bumps_the_version() {
        let mut session = EditSession::new(DOCUMENT.to_string());
        let start = session.version();

        session.set_dark_mode(true);
        session.set_primary_color("#FF0000".to_string());
        session.set_card_count(7);

        assert_eq!(session.version(), start + 3);
    }

    #[test]
    fn card_count_setter_clamps_to_bounds() {
        let mut session = EditSession::new(DOCUMENT.to_string());
        session.set_card_count(99);
        assert_eq!(session.state().card_count, MAX_CARD_COUNT);
        session.set_card_count(0);
        assert_eq!(session.state().card_count, MIN_CARD_COUNT);
    }

    #[test]
    fn structured_customizations_layer_on_the_saved_baseline() {
        let mut session = EditSession::new(DOCUMENT.to_string());
        session.begin_raw_edit();
        session.update_raw_text(DOCUMENT.replace("<p>hi</p>", "<p>edited</p>"));
        session.save_raw_edits();

        session.set_dark_mode(true);
        let html = session.current_html();
        assert!(html.contains("<p>edited</p>"));
        assert!(html.contains(transform::DARK_OVERRIDES_ID));
    }

    #[test]
    fn raw_edit_mode_respects_manual_fonts() {
        let mut session = EditSession::new(DOCUMENT.to_string());
        session.set_font_family("Poppins".to_string());
        session.begin_raw_edit();

        // The snapshot taken on entry already carries Poppins; once the
        // user pastes back the original text, edit mode must not rewrite
        // its declarations again.
        session.update_raw_text(DOCUMENT.to_string());
        let html = session.current_html();
        assert!(html.contains("font-family: 'Inter', sans-serif"));
    }

    #[test]
    fn inline_edits_arrive_as_raw_edit_mode() {
        let mut session = EditSession::new(DOCUMENT.to_string());
        session.adopt_inline_edit(DOCUMENT.replace("hi", "edited inline"));

        assert!(session.is_raw_editing());
        assert!(session.active_text().contains("edited inline"));

        session.discard_raw_edits();
        assert_eq!(session.active_text(), DOCUMENT);
    }

    #[test]
    fn preview_html_carries_wiring_only_when_enabled() {
        let mut session = EditSession::new(DOCUMENT.to_string());
        session.set_inline_editing(true);
        assert!(session.preview_html().contains(preview::INLINE_EDIT_ID));

        session.set_inline_editing(false);
        assert!(!session.preview_html().contains(preview::INLINE_EDIT_ID));
        assert!(session.preview_html().contains(preview::LINK_GUARD_ID));
    }
}
