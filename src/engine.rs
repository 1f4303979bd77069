//! Transform/restore engine and the toggle state machine.
//!
//! The engine has two states. Going INACTIVE → ACTIVE walks the document,
//! replaces every eligible text node with an emphasis run and applies the
//! companion styles; going back restores every recorded node and removes
//! the styles. Every operation runs to completion under `&mut self`, so a
//! toggle can never start while another is in progress.
//!
//! ```
//! use fovea::{Config, Engine, MemoryBackend};
//! use fovea::dom::{parse_html, to_html};
//!
//! let mut doc = parse_html("<p>accessibility testing here</p>");
//! let mut engine = Engine::new(Config::default(), MemoryBackend::new()).unwrap();
//! engine.initialize(&mut doc);
//! let original = to_html(&doc);
//!
//! engine.toggle(&mut doc);
//! let p = doc.find_by_tag("p").unwrap();
//! assert!(fovea::dom::inner_html(&doc, p).contains("<b class=\"fovea-emph\">acces</b>sibility"));
//!
//! engine.toggle(&mut doc);
//! assert_eq!(to_html(&doc), original);
//! ```

use crate::config::Config;
use crate::control;
use crate::dom::{Attribute, Document, NodeId};
use crate::emphasis::Segment;
use crate::error::Result;
use crate::persist::{ActivationState, MemoryBackend, StateBackend};
use crate::presentation::{self, DeferredFonts, EMPHASIS_CLASS, FontLoader};
use crate::store::StateStore;
use crate::walk::{EligibilityPolicy, MARKER_ATTR, TextWalker};

/// What one engine operation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    /// Activation state after the operation.
    pub active: bool,
    /// Text nodes replaced by emphasis runs.
    pub transformed: usize,
    /// Text nodes put back from the state store.
    pub restored: usize,
    /// Records dropped because their node was gone or detached.
    pub skipped: usize,
    /// The activation flag reached storage (or nothing needed writing).
    pub persisted: bool,
    /// The custom font was unavailable and the fallback was used.
    pub font_degraded: bool,
}

/// Result of restoring a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The original text is back in place.
    Restored,
    /// The node had left the document; its record was dropped.
    Dropped,
    /// The node was never recorded.
    Unknown,
}

/// The reversible bionic-reading engine.
pub struct Engine<B: StateBackend = MemoryBackend> {
    config: Config,
    policy: EligibilityPolicy,
    store: StateStore,
    state: ActivationState,
    backend: B,
    fonts: Box<dyn FontLoader>,
    control: Option<NodeId>,
}

impl<B: StateBackend> Engine<B> {
    /// Build an engine. Fails only on invalid configuration.
    pub fn new(config: Config, backend: B) -> Result<Self> {
        config.validate()?;
        let policy = EligibilityPolicy::from_config(&config.policy)?;
        let state = ActivationState::new(&config.storage.namespace);
        Ok(Self {
            config,
            policy,
            store: StateStore::new(),
            state,
            backend,
            fonts: Box::new(DeferredFonts),
            control: None,
        })
    }

    /// Replace the font loader (browsers defer, the CLI checks local files).
    pub fn with_font_loader(mut self, loader: impl FontLoader + 'static) -> Self {
        self.fonts = Box::new(loader);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Page-ready hook: load the persisted flag, install the control and, if
    /// the flag is set, activate without waiting for a click.
    pub fn initialize(&mut self, doc: &mut Document) -> Report {
        if let Err(e) = self.state.load(&self.backend) {
            log::warn!("could not read {}: {e}; starting inactive", self.state.key());
            self.state.set(false);
        }
        let active = self.state.is_active();
        log::info!("initializing, persisted state is {}", state_name(active));

        if self.config.control.enabled {
            self.control = control::install(doc, &self.config.control, active);
        }

        let mut report = Report {
            persisted: true,
            ..Report::default()
        };
        self.converge(doc, &mut report);
        report
    }

    /// User click: flip the state, apply it, persist it.
    pub fn toggle(&mut self, doc: &mut Document) -> Report {
        self.state.flip();
        self.commit(doc)
    }

    /// Move to a given state. Requesting the current state saves nothing and
    /// only brings stray nodes in line, so repeated activation never
    /// emphasizes twice.
    pub fn set_active(&mut self, doc: &mut Document, active: bool) -> Report {
        if self.state.is_active() == active {
            // Nodes activated by hand may still be out of line with the flag.
            let mut report = Report {
                persisted: true,
                ..Report::default()
            };
            self.converge(doc, &mut report);
            return report;
        }
        self.state.set(active);
        self.commit(doc)
    }

    fn commit(&mut self, doc: &mut Document) -> Report {
        let mut report = Report::default();
        self.converge(doc, &mut report);
        report.persisted = match self.state.save(&mut self.backend) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("could not persist {}: {e}", self.state.key());
                false
            }
        };
        report
    }

    /// Make the document match the in-memory flag.
    fn converge(&mut self, doc: &mut Document, report: &mut Report) {
        let active = self.state.is_active();
        if active {
            if self.store.scope().is_none() {
                self.apply_presentation(doc, report);
            }
            report.transformed += self.activate_new(doc);
        } else if !self.store.is_empty() {
            self.restore_all(doc, report);
        }
        if let Some(control) = self.control.filter(|&c| doc.contains(c)) {
            control::sync(doc, control, &self.config.control, active);
        }
        report.active = active;
        log::info!(
            "now {}: {} transformed, {} restored, {} skipped",
            state_name(active),
            report.transformed,
            report.restored,
            report.skipped
        );
    }

    fn apply_presentation(&mut self, doc: &mut Document, report: &mut Report) {
        let font = presentation::resolve_font(&self.config.presentation, self.fonts.as_ref());
        report.font_degraded = font.degraded;
        if let Some(scope) = presentation::apply(doc, &self.config.presentation, &font) {
            self.store.set_scope(scope);
        }
    }

    /// Transform every eligible text node not already inside a run.
    fn activate_new(&mut self, doc: &mut Document) -> usize {
        let mut walker = TextWalker::new(doc.root());
        let mut transformed = 0;
        while let Some(text) = walker.next(doc, &self.policy) {
            if self.activate(doc, text).is_some() {
                transformed += 1;
            }
        }
        transformed
    }

    fn restore_all(&mut self, doc: &mut Document, report: &mut Report) {
        for node in self.store.nodes() {
            match self.restore(doc, node) {
                RestoreOutcome::Restored => report.restored += 1,
                RestoreOutcome::Dropped => report.skipped += 1,
                RestoreOutcome::Unknown => {}
            }
        }
        if let Some(scope) = self.store.take_scope() {
            presentation::remove(doc, scope);
        }
        self.store.clear();
    }

    /// Replace one eligible text node with an emphasis run.
    ///
    /// Returns the run's id, which is the key of the node's record. Returns
    /// `None`, leaving the document untouched, if the node is not eligible
    /// (already transformed, excluded, blank or gone).
    pub fn activate(&mut self, doc: &mut Document, text: NodeId) -> Option<NodeId> {
        if !self.policy.is_eligible(doc, text) {
            return None;
        }
        let original = doc.text_content(text)?.to_string();

        let run = doc.create_html_element("span", vec![Attribute::new(MARKER_ATTR, "run")]);
        self.store.record(run, original.clone());

        for segment in self.config.emphasis.segments(&original) {
            match segment {
                Segment::Strong(s) => {
                    let class = Attribute::new("class", EMPHASIS_CLASS);
                    let b = doc.create_html_element("b", vec![class]);
                    let t = doc.create_text(s);
                    doc.append(b, t);
                    doc.append(run, b);
                }
                Segment::Plain(s) => {
                    let t = doc.create_text(s);
                    doc.append(run, t);
                }
            }
        }

        doc.replace(text, run);
        doc.remove(text);
        self.store.mark_applied(run);
        Some(run)
    }

    /// Put a recorded node's original text back and forget the record.
    pub fn restore(&mut self, doc: &mut Document, run: NodeId) -> RestoreOutcome {
        let Some(record) = self.store.take(run) else {
            return RestoreOutcome::Unknown;
        };
        if !record.applied || !doc.is_attached(run) {
            // Left alone: the host page may still own a detached run.
            log::debug!("{run:?} is no longer in the document, dropping its record");
            return RestoreOutcome::Dropped;
        }

        let text = doc.create_text(record.original);
        doc.replace(run, text);
        doc.remove(run);
        RestoreOutcome::Restored
    }

    /// Best-effort catch-up after the host page mutated the document while
    /// active: forget runs that left the document, re-apply companion styles
    /// if their scope was replaced, and transform newly added text.
    pub fn reconcile(&mut self, doc: &mut Document) -> Report {
        let mut report = Report {
            active: self.state.is_active(),
            persisted: true,
            ..Report::default()
        };
        if !report.active {
            return report;
        }

        report.skipped = self.store.prune(doc);

        let scope_lost = self
            .store
            .scope()
            .is_none_or(|scope| !doc.is_attached(scope.scope));
        if scope_lost {
            if let Some(stale) = self.store.take_scope()
                && let Some(sheet) = stale.stylesheet
            {
                doc.remove(sheet);
            }
            self.apply_presentation(doc, &mut report);
        }

        report.transformed = self.activate_new(doc);
        if self.control.is_some_and(|c| !doc.is_attached(c)) && self.config.control.enabled {
            self.control = control::install(doc, &self.config.control, true);
        }
        log::debug!(
            "reconciled: {} new, {} dropped",
            report.transformed,
            report.skipped
        );
        report
    }
}

fn state_name(active: bool) -> &'static str {
    if active { "active" } else { "inactive" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{inner_html, parse_html, to_html};
    use crate::error::Error;
    use crate::presentation::FontStatus;

    struct ReadOnly(Option<bool>);

    impl StateBackend for ReadOnly {
        fn load(&self, _key: &str) -> Result<Option<bool>> {
            Ok(self.0)
        }

        fn save(&mut self, key: &str, _value: bool) -> Result<()> {
            Err(Error::Storage(format!("{key} is read-only")))
        }
    }

    struct Unreadable;

    impl StateBackend for Unreadable {
        fn load(&self, key: &str) -> Result<Option<bool>> {
            Err(Error::Storage(format!("{key} is unreadable")))
        }

        fn save(&mut self, _key: &str, _value: bool) -> Result<()> {
            Ok(())
        }
    }

    fn engine() -> Engine {
        Engine::new(Config::default(), MemoryBackend::new()).unwrap()
    }

    fn body_html(doc: &Document) -> String {
        inner_html(doc, doc.find_by_tag("body").unwrap())
    }

    #[test]
    fn test_activate_single_node() {
        let mut doc = parse_html("<body><p>accessibility testing here</p></body>");
        let mut engine = engine();
        let p = doc.find_by_tag("p").unwrap();
        let text = doc.children(p).next().unwrap();

        let run = engine.activate(&mut doc, text).unwrap();
        assert!(!doc.contains(text));
        assert_eq!(
            inner_html(&doc, p),
            "<span data-fovea=\"run\"><b class=\"fovea-emph\">acces</b>sibility \
             <b class=\"fovea-emph\">tes</b>ting <b class=\"fovea-emph\">he</b>re</span>"
        );
        let record = engine.store().get(run).unwrap();
        assert_eq!(record.original, "accessibility testing here");
        assert!(record.applied);
        assert_eq!(doc.text_of(p), "accessibility testing here");
    }

    #[test]
    fn test_restore_single_node() {
        let mut doc = parse_html("<body><p>one <i>two</i> three</p></body>");
        let before = to_html(&doc);
        let mut engine = engine();
        let p = doc.find_by_tag("p").unwrap();
        let first = doc.children(p).next().unwrap();

        let run = engine.activate(&mut doc, first).unwrap();
        assert_eq!(engine.restore(&mut doc, run), RestoreOutcome::Restored);
        assert_eq!(to_html(&doc), before);
        assert!(engine.store().is_empty());
        assert_eq!(engine.restore(&mut doc, run), RestoreOutcome::Unknown);
    }

    #[test]
    fn test_activate_rejects_ineligible_nodes() {
        let mut doc = parse_html("<body><code>const x = 1;</code><p>  </p></body>");
        let mut engine = engine();
        let code = doc.find_by_tag("code").unwrap();
        let p = doc.find_by_tag("p").unwrap();
        let code_text = doc.children(code).next().unwrap();
        let blank = doc.children(p).next().unwrap();

        assert_eq!(engine.activate(&mut doc, code_text), None);
        assert_eq!(engine.activate(&mut doc, blank), None);
        assert_eq!(engine.activate(&mut doc, p), None);
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_toggle_round_trip() {
        let html = r#"<!DOCTYPE html><html><head><title>Lesson</title></head><body class="lesson">
            <h1>Photosynthesis basics</h1>
            <p>Plants convert <em>light energy</em> into chemical energy.</p>
            <pre>not   touched</pre>
        </body></html>"#;
        let mut doc = parse_html(html);
        let mut engine = Engine::new(
            Config {
                control: crate::config::ControlConfig {
                    enabled: false,
                    ..Default::default()
                },
                ..Default::default()
            },
            MemoryBackend::new(),
        )
        .unwrap();
        engine.initialize(&mut doc);
        let before = to_html(&doc);

        let on = engine.toggle(&mut doc);
        assert!(on.active);
        assert_eq!(on.transformed, 4);
        assert!(on.persisted);
        assert_eq!(engine.store().len(), 4);
        assert_ne!(to_html(&doc), before);

        let off = engine.toggle(&mut doc);
        assert!(!off.active);
        assert_eq!(off.restored, 4);
        assert!(engine.store().is_empty());
        assert_eq!(to_html(&doc), before);
    }

    #[test]
    fn test_set_active_twice_does_not_double_emphasize() {
        let mut doc = parse_html("<body><p>reading faster</p></body>");
        let mut engine = engine();
        engine.initialize(&mut doc);

        engine.set_active(&mut doc, true);
        let once = body_html(&doc);
        let again = engine.set_active(&mut doc, true);
        assert_eq!(again.transformed, 0);
        assert_eq!(body_html(&doc), once);
        assert_eq!(once.matches("fovea-emph\"").count(), 2);
    }

    #[test]
    fn test_toggle_after_manual_activate_completes_the_page() {
        let mut doc = parse_html("<body><p>alpha words</p><p>beta words</p></body>");
        let mut engine = engine();
        let first = doc.find_by_tag("p").unwrap();
        let text = doc.children(first).next().unwrap();
        engine.activate(&mut doc, text).unwrap();

        let report = engine.toggle(&mut doc);
        assert!(report.active);
        assert_eq!(report.transformed, 1);
        assert_eq!(engine.store().len(), 2);
        assert!(engine.store().scope().is_some());
        assert_eq!(body_html(&doc).matches("data-fovea=\"run\"").count(), 2);
        let body = doc.find_by_tag("body").unwrap();
        assert_eq!(doc.get_attr(body, "class"), Some("fovea-active"));
    }

    #[test]
    fn test_set_inactive_undoes_manual_activate() {
        let mut doc = parse_html("<body><p>alpha words</p></body>");
        let before = to_html(&doc);
        let mut engine = engine();
        let p = doc.find_by_tag("p").unwrap();
        let text = doc.children(p).next().unwrap();
        engine.activate(&mut doc, text).unwrap();

        let report = engine.set_active(&mut doc, false);
        assert!(!report.active);
        assert_eq!(report.restored, 1);
        assert!(engine.store().is_empty());
        assert_eq!(to_html(&doc), before);
    }

    #[test]
    fn test_runs_are_never_re_entered() {
        let mut doc = parse_html("<body><p>reading faster</p></body>");
        let mut engine = engine();
        engine.toggle(&mut doc);
        let once = body_html(&doc);

        // Walking again finds nothing new: every run is marked.
        assert_eq!(engine.activate_new(&mut doc), 0);
        assert_eq!(body_html(&doc), once);
    }

    #[test]
    fn test_initialize_applies_persisted_active_state() {
        let mut doc = parse_html("<body><p>persisted activation</p></body>");
        let mut engine =
            Engine::new(Config::default(), MemoryBackend::with("fovea:enabled", true)).unwrap();

        let report = engine.initialize(&mut doc);
        assert!(report.active);
        assert_eq!(report.transformed, 1);
        assert!(body_html(&doc).contains("<b class=\"fovea-emph\">pers</b>isted"));

        let control = control::find(&doc).unwrap();
        assert_eq!(doc.get_attr(control, "aria-pressed"), Some("true"));
    }

    #[test]
    fn test_unreadable_state_starts_inactive() {
        let mut doc = parse_html("<body><p>text here</p></body>");
        let mut engine = Engine::new(Config::default(), Unreadable).unwrap();
        let report = engine.initialize(&mut doc);
        assert!(!report.active);
        assert_eq!(report.transformed, 0);
    }

    #[test]
    fn test_storage_failure_is_not_fatal() {
        let mut doc = parse_html("<body><p>text here</p></body>");
        let mut engine = Engine::new(Config::default(), ReadOnly(None)).unwrap();
        engine.initialize(&mut doc);

        let report = engine.toggle(&mut doc);
        assert!(report.active);
        assert!(!report.persisted);
        assert_eq!(report.transformed, 1);
    }

    #[test]
    fn test_toggle_persists_every_flip() {
        let mut doc = parse_html("<body><p>text here</p></body>");
        let mut engine = engine();
        engine.initialize(&mut doc);

        engine.toggle(&mut doc);
        assert_eq!(engine.backend().load("fovea:enabled").unwrap(), Some(true));
        engine.toggle(&mut doc);
        assert_eq!(engine.backend().load("fovea:enabled").unwrap(), Some(false));
    }

    #[test]
    fn test_font_failure_degrades_without_blocking() {
        let mut doc = parse_html("<body><p>fallback fonts still work</p></body>");
        let mut engine = engine().with_font_loader(|_: &str| FontStatus::Failed);
        engine.initialize(&mut doc);
        let before = to_html(&doc);

        let report = engine.toggle(&mut doc);
        assert!(report.font_degraded);
        assert_eq!(report.transformed, 1);
        let body = doc.find_by_tag("body").unwrap();
        assert!(doc
            .get_attr(body, "style")
            .unwrap()
            .starts_with("font-family: Verdana, Arial, sans-serif;"));

        engine.toggle(&mut doc);
        assert_eq!(to_html(&doc), before);
    }

    #[test]
    fn test_restore_skips_nodes_removed_by_host() {
        let mut doc = parse_html("<body><p>first paragraph</p><p>second paragraph</p></body>");
        let mut engine = engine();
        engine.initialize(&mut doc);
        engine.toggle(&mut doc);
        assert_eq!(engine.store().len(), 2);

        // The host page drops the first paragraph while active.
        let first = doc.find_by_tag("p").unwrap();
        doc.remove(first);

        let report = engine.toggle(&mut doc);
        assert_eq!(report.restored, 1);
        assert_eq!(report.skipped, 1);
        assert!(engine.store().is_empty());
        assert_eq!(body_html(&doc).matches("data-fovea=\"run\"").count(), 0);
    }

    #[test]
    fn test_restore_leaves_detached_runs_alone() {
        let mut doc = parse_html("<body><p>detached later</p></body>");
        let mut engine = engine();
        engine.toggle(&mut doc);
        let run = engine.store().nodes()[0];

        doc.detach(run);
        assert_eq!(engine.restore(&mut doc, run), RestoreOutcome::Dropped);
        assert!(doc.contains(run));
    }

    #[test]
    fn test_reconcile_picks_up_new_content() {
        let mut doc = parse_html("<body><div id=\"app\"><p>initial content</p></div></body>");
        let mut engine = engine();
        engine.toggle(&mut doc);

        // Single-page app re-render: old view replaced with a fresh one.
        let app = doc.find_by_tag("div").unwrap();
        let old = doc.children(app).next().unwrap();
        doc.remove(old);
        let p = doc.create_html_element("p", vec![]);
        let t = doc.create_text("rendered again");
        doc.append(p, t);
        doc.append(app, p);

        let report = engine.reconcile(&mut doc);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.transformed, 1);
        assert_eq!(engine.store().len(), 1);
        assert!(inner_html(&doc, p).contains("<b class=\"fovea-emph\">ren</b>dered"));

        let off = engine.toggle(&mut doc);
        assert_eq!(off.restored, 1);
        assert_eq!(inner_html(&doc, p), "rendered again");
    }

    #[test]
    fn test_reconcile_is_noop_while_inactive() {
        let mut doc = parse_html("<body><p>left alone</p></body>");
        let before = to_html(&doc);
        let mut engine = engine();
        let report = engine.reconcile(&mut doc);
        assert!(!report.active);
        assert_eq!(report.transformed, 0);
        assert_eq!(to_html(&doc), before);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.policy.excluded_selectors.push("p[[".to_string());
        assert!(Engine::new(config, MemoryBackend::new()).is_err());
    }
}
