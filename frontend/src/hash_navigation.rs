use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use log::debug;
use wasm_bindgen::JsValue;
use web_sys::{window, ScrollBehavior, ScrollToOptions};
use yew::Callback;

use crate::config;
use crate::frames::{AnimationFrames, FrameSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashHistoryMode {
    Push,
    Replace,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashNavigationRequest {
    pub section_id: String,
    pub mode: HashHistoryMode,
}

impl HashNavigationRequest {
    pub fn apply(self, history: &impl HashHistory) {
        update_hash_history(history, &self.section_id, self.mode);
    }
}

/// The bits of `location` / `history` the hash sync needs.
pub trait HashHistory {
    fn current_hash(&self) -> String;
    fn push_hash(&self, hash: &str);
    fn replace_hash(&self, hash: &str);
}

#[derive(Clone, Copy, Default)]
pub struct BrowserHistory;

impl HashHistory for BrowserHistory {
    fn current_hash(&self) -> String {
        window()
            .and_then(|w| w.location().hash().ok())
            .unwrap_or_default()
    }

    fn push_hash(&self, hash: &str) {
        if let Some(history) = window().and_then(|w| w.history().ok()) {
            let _ = history.push_state_with_url(&JsValue::NULL, "", Some(hash));
        }
    }

    fn replace_hash(&self, hash: &str) {
        if let Some(history) = window().and_then(|w| w.history().ok()) {
            let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(hash));
        }
    }
}

/// Points the URL fragment at `section_id` through the history API, so the
/// browser neither reloads nor jumps. Pushing the hash that is already current
/// is skipped; replacing always goes through.
pub fn update_hash_history(history: &impl HashHistory, section_id: &str, mode: HashHistoryMode) {
    let next = format!("#{}", section_id);
    let unchanged = history.current_hash() == next;
    match mode {
        HashHistoryMode::Push if unchanged => {}
        HashHistoryMode::Push => history.push_hash(&next),
        HashHistoryMode::Replace => history.replace_hash(&next),
    }
}

/// Height kept clear for the fixed nav plus the support page's sticky TOC.
pub fn compute_sticky_offset(nav_height: Option<f64>, toc_height: Option<f64>) -> f64 {
    let nav = nav_height
        .filter(|h| *h > 0.0)
        .unwrap_or(config::DEFAULT_NAV_HEIGHT);
    // Before layout settles the TOC can report a sliver of its real height.
    let toc = toc_height
        .filter(|h| *h > config::MIN_TOC_HEIGHT)
        .unwrap_or(config::DEFAULT_TOC_HEIGHT);
    (nav + toc + config::STICKY_MARGIN).max(config::MIN_STICKY_OFFSET)
}

pub fn resolve_sticky_offset() -> f64 {
    let document = window().and_then(|w| w.document());
    let nav = document
        .as_ref()
        .and_then(|doc| doc.query_selector("nav").ok().flatten())
        .map(|el| el.get_bounding_client_rect().height());
    let toc = document
        .as_ref()
        .and_then(|doc| doc.get_element_by_id(config::SUPPORT_TOC_ID))
        .map(|el| el.get_bounding_client_rect().height());
    compute_sticky_offset(nav, toc)
}

fn scroll_to_element(section_id: &str, behavior: ScrollBehavior) {
    let Some(window) = window() else {
        return;
    };
    let Some(element) = window.document().and_then(|doc| doc.get_element_by_id(section_id)) else {
        return;
    };
    let top = element.get_bounding_client_rect().top() + window.scroll_y().unwrap_or(0.0);
    let options = ScrollToOptions::new();
    options.set_top(top - resolve_sticky_offset());
    options.set_behavior(behavior);
    window.scroll_to_with_scroll_to_options(&options);
}

fn section_exists(section_id: &str) -> bool {
    window()
        .and_then(|w| w.document())
        .and_then(|doc| doc.get_element_by_id(section_id))
        .is_some()
}

/// Scrolls so `section_id` sits just below the sticky headers, then snaps once
/// more after images and late content have reflowed, and records the hash.
pub fn scroll_to_section(
    section_id: &str,
    behavior: ScrollBehavior,
    history_mode: HashHistoryMode,
    on_active: Option<&Callback<String>>,
) {
    if !section_exists(section_id) {
        debug!("no section #{} on this page", section_id);
        return;
    }
    if let Some(on_active) = on_active {
        on_active.emit(section_id.to_string());
    }

    scroll_to_element(section_id, behavior);
    let id = section_id.to_string();
    Timeout::new(config::CORRECTION_SCROLL_DELAY_MS, move || {
        scroll_to_element(&id, ScrollBehavior::Auto);
    })
    .forget();

    HashNavigationRequest { section_id: section_id.to_string(), mode: history_mode }.apply(&BrowserHistory);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollPhase {
    Idle,
    Resolving { attempt: u32 },
    Scrolling,
    Settled,
}

/// Tracks one attempt to reach a section that may not be rendered yet.
#[derive(Clone, Debug)]
pub struct SectionLookup {
    phase: ScrollPhase,
    max_attempts: u32,
}

impl SectionLookup {
    pub fn new(max_attempts: u32) -> Self {
        Self { phase: ScrollPhase::Idle, max_attempts: max_attempts.max(1) }
    }

    #[cfg(test)]
    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    /// Starts (or restarts) a lookup.
    pub fn begin(&mut self) -> ScrollPhase {
        self.phase = ScrollPhase::Resolving { attempt: 0 };
        self.phase
    }

    /// Feeds the outcome of one look for the element. An exhausted budget settles
    /// without scrolling.
    pub fn step(&mut self, found: bool) -> ScrollPhase {
        self.phase = match self.phase {
            ScrollPhase::Resolving { .. } if found => ScrollPhase::Scrolling,
            ScrollPhase::Resolving { attempt } if attempt + 1 >= self.max_attempts => ScrollPhase::Settled,
            ScrollPhase::Resolving { attempt } => ScrollPhase::Resolving { attempt: attempt + 1 },
            other => other,
        };
        self.phase
    }

    pub fn settle(&mut self) -> ScrollPhase {
        self.phase = ScrollPhase::Settled;
        self.phase
    }
}

#[derive(Clone)]
pub struct ScrollOptions {
    pub behavior: ScrollBehavior,
    pub history_mode: HashHistoryMode,
    pub max_attempts: u32,
    pub on_active: Option<Callback<String>>,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            behavior: ScrollBehavior::Smooth,
            history_mode: HashHistoryMode::Replace,
            max_attempts: config::HASH_RETRY_ATTEMPTS,
            on_active: None,
        }
    }
}

/// `"#Getting%20started"` -> `"Getting started"`.
pub fn section_id_from_hash(hash: &str) -> Option<String> {
    let raw = hash.trim_start_matches('#');
    if raw.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(raw)
        .map(|id| id.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    Some(decoded)
}

/// Scrolls to the section named by `hash` once it exists, checking once per
/// animation frame. Gives up quietly when the budget runs out.
pub fn scroll_to_hash_with_retry(hash: &str, options: ScrollOptions) {
    let Some(section_id) = section_id_from_hash(hash) else {
        return;
    };
    let mut lookup = SectionLookup::new(options.max_attempts);
    lookup.begin();
    attempt_scroll(Rc::new(section_id), Rc::new(options), Rc::new(RefCell::new(lookup)));
}

fn attempt_scroll(section_id: Rc<String>, options: Rc<ScrollOptions>, lookup: Rc<RefCell<SectionLookup>>) {
    let phase = lookup.borrow_mut().step(section_exists(&section_id));
    match phase {
        ScrollPhase::Scrolling => {
            scroll_to_section(
                &section_id,
                options.behavior,
                options.history_mode,
                options.on_active.as_ref(),
            );
            lookup.borrow_mut().settle();
        }
        ScrollPhase::Resolving { .. } => {
            let next = Box::new(move || attempt_scroll(section_id, options, lookup));
            if AnimationFrames.request(next).is_none() {
                debug!("no animation frames available, giving up on hash scroll");
            }
        }
        ScrollPhase::Settled => debug!("section #{} never appeared", section_id),
        ScrollPhase::Idle => {}
    }
}
