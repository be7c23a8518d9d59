use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, info};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::js_sys::{Function, Reflect};
use web_sys::{window, Element, Event, HtmlAnchorElement, MutationObserver, MutationObserverInit};

use super::navigation::{AffiliateNavigation, BrowserNavigation};
use super::tracker::AffiliateTracker;
use crate::frames::{AnimationFrames, CoalescingScheduler, FrameSource};

const CLICK_EVENTS: [&str; 2] = ["click", "auxclick"];

/// A link whose destination can be read and replaced.
pub trait AnchorLink {
    fn href(&self) -> Option<String>;
    fn set_href(&self, href: &str);
}

impl AnchorLink for HtmlAnchorElement {
    fn href(&self) -> Option<String> {
        Some(HtmlAnchorElement::href(self)).filter(|href| !href.is_empty())
    }

    fn set_href(&self, href: &str) {
        HtmlAnchorElement::set_href(self, href);
    }
}

/// Rewrites every partner-bound link in `anchors` and returns how many changed.
/// Links that already carry the id are left alone and not counted.
pub fn rewrite_anchors<'a, A, I>(tracker: &AffiliateTracker, anchors: I, query: Option<&str>) -> usize
where
    A: AnchorLink + 'a,
    I: IntoIterator<Item = &'a A>,
{
    let params = tracker.resolve(query);
    let Some(id) = params.effective() else {
        return 0;
    };
    anchors
        .into_iter()
        .filter_map(|anchor| {
            let href = anchor.href()?;
            let next = tracker.rewrite_partner_href_with(&href, id)?;
            anchor.set_href(&next);
            Some(())
        })
        .count()
}

fn anchors_in(root: &Element) -> Vec<HtmlAnchorElement> {
    let Ok(nodes) = root.query_selector_all("a[href]") else {
        return Vec::new();
    };
    (0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .filter_map(|node| node.dyn_into::<HtmlAnchorElement>().ok())
        .collect()
}

pub fn rewrite_anchors_in_scope(tracker: &AffiliateTracker, root: &Element, query: Option<&str>) -> usize {
    rewrite_anchors(tracker, anchors_in(root).iter(), query)
}

fn rewrite_document(tracker: &AffiliateTracker, query: Option<&str>) -> usize {
    window()
        .and_then(|w| w.document())
        .and_then(|doc| doc.document_element())
        .map(|root| rewrite_anchors_in_scope(tracker, &root, query))
        .unwrap_or(0)
}

/// A navigation function the rewriter wraps while installed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    WindowOpen,
    LocationAssign,
    LocationReplace,
}

impl Primitive {
    pub const ALL: [Primitive; 3] = [Self::WindowOpen, Self::LocationAssign, Self::LocationReplace];

    fn owner_and_name(self) -> Option<(JsValue, &'static str)> {
        let window = window()?;
        Some(match self {
            Self::WindowOpen => (window.into(), "open"),
            Self::LocationAssign => (window.location().into(), "assign"),
            Self::LocationReplace => (window.location().into(), "replace"),
        })
    }
}

/// The page hooks `LinkRewriter` attaches to. Every `start_*`/`patch` reports
/// whether it took effect, and only those get undone.
pub trait RewriterHost {
    type Frames: FrameSource;

    fn frames(&self) -> Self::Frames;
    /// Rewrites the links currently on the page, returning how many changed.
    fn rewrite_all(&self, tracker: &AffiliateTracker, query: Option<&str>) -> usize;
    fn start_observing(&self, on_change: Rc<dyn Fn()>) -> bool;
    fn stop_observing(&self);
    /// `on_click` gets the link being followed, never the event, so the click's
    /// default action always goes ahead.
    fn start_click_capture(&self, on_click: Rc<dyn Fn(&dyn AnchorLink)>) -> bool;
    fn stop_click_capture(&self);
    fn patch(&self, primitive: Primitive, rewrite: Rc<dyn Fn(&str) -> String>) -> bool;
    fn restore(&self, primitive: Primitive);
}

/// A global function swapped for a wrapper, remembered so it can be put back.
struct PrimitivePatch {
    owner: JsValue,
    name: &'static str,
    original: JsValue,
    _wrapper: Closure<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>,
}

impl PrimitivePatch {
    /// Replaces `owner[name]` with a version that runs the URL argument through
    /// `rewrite` first. Returns `None` when the property is missing or read-only.
    fn install(owner: JsValue, name: &'static str, rewrite: Rc<dyn Fn(&str) -> String>) -> Option<Self> {
        let key = JsValue::from_str(name);
        let original = Reflect::get(&owner, &key).ok()?;
        let original_fn: Function = original.clone().dyn_into().ok()?;

        let this = owner.clone();
        let wrapper = Closure::wrap(Box::new(move |url: JsValue, a: JsValue, b: JsValue| {
            let url = match url.as_string() {
                Some(url) => JsValue::from_str(&rewrite(&url)),
                None => url,
            };
            original_fn.call3(&this, &url, &a, &b).unwrap_or(JsValue::UNDEFINED)
        }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);

        // Unforgeable properties (location.assign in most browsers) refuse the write.
        let stored = Reflect::set(&owner, &key, wrapper.as_ref()).unwrap_or(false);
        let installed = Reflect::get(&owner, &key)
            .map(|current| current == *wrapper.as_ref())
            .unwrap_or(false);
        if !stored || !installed {
            debug!("{} is read-only, leaving it unpatched", name);
            return None;
        }

        Some(Self { owner, name, original, _wrapper: wrapper })
    }

    fn restore(self) {
        let _ = Reflect::set(&self.owner, &JsValue::from_str(self.name), &self.original);
    }
}

/// The live document.
#[derive(Default)]
pub struct BrowserPage {
    observer: RefCell<Option<(MutationObserver, Closure<dyn FnMut(JsValue, JsValue)>)>>,
    on_click: RefCell<Option<Closure<dyn FnMut(Event)>>>,
    patches: RefCell<Vec<(Primitive, PrimitivePatch)>>,
}

impl RewriterHost for BrowserPage {
    type Frames = AnimationFrames;

    fn frames(&self) -> AnimationFrames {
        AnimationFrames
    }

    fn rewrite_all(&self, tracker: &AffiliateTracker, query: Option<&str>) -> usize {
        rewrite_document(tracker, query)
    }

    fn start_observing(&self, on_change: Rc<dyn Fn()>) -> bool {
        let Some(root) = window()
            .and_then(|w| w.document())
            .and_then(|doc| doc.document_element())
        else {
            return false;
        };
        let on_mutation = Closure::wrap(Box::new(move |_records: JsValue, _observer: JsValue| {
            on_change();
        }) as Box<dyn FnMut(JsValue, JsValue)>);

        let Ok(observer) = MutationObserver::new(on_mutation.as_ref().unchecked_ref()) else {
            return false;
        };
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        if observer.observe_with_options(&root, &options).is_err() {
            return false;
        }
        *self.observer.borrow_mut() = Some((observer, on_mutation));
        true
    }

    fn stop_observing(&self) {
        if let Some((observer, _on_mutation)) = self.observer.borrow_mut().take() {
            observer.disconnect();
        }
    }

    fn start_click_capture(&self, on_click: Rc<dyn Fn(&dyn AnchorLink)>) -> bool {
        let Some(document) = window().and_then(|w| w.document()) else {
            return false;
        };
        let listener = Closure::wrap(Box::new(move |event: Event| {
            let anchor = event
                .target()
                .and_then(|target| target.dyn_into::<Element>().ok())
                .and_then(|element| element.closest("a[href]").ok().flatten())
                .and_then(|element| element.dyn_into::<HtmlAnchorElement>().ok());
            if let Some(anchor) = anchor {
                on_click(&anchor as &dyn AnchorLink);
            }
        }) as Box<dyn FnMut(Event)>);

        for name in CLICK_EVENTS {
            let _ = document.add_event_listener_with_callback_and_bool(
                name,
                listener.as_ref().unchecked_ref(),
                true,
            );
        }
        *self.on_click.borrow_mut() = Some(listener);
        true
    }

    fn stop_click_capture(&self) {
        let Some(listener) = self.on_click.borrow_mut().take() else {
            return;
        };
        if let Some(document) = window().and_then(|w| w.document()) {
            for name in CLICK_EVENTS {
                let _ = document.remove_event_listener_with_callback_and_bool(
                    name,
                    listener.as_ref().unchecked_ref(),
                    true,
                );
            }
        }
    }

    fn patch(&self, primitive: Primitive, rewrite: Rc<dyn Fn(&str) -> String>) -> bool {
        let Some((owner, name)) = primitive.owner_and_name() else {
            return false;
        };
        match PrimitivePatch::install(owner, name, rewrite) {
            Some(patch) => {
                self.patches.borrow_mut().push((primitive, patch));
                true
            }
            None => false,
        }
    }

    fn restore(&self, primitive: Primitive) {
        let mut patches = self.patches.borrow_mut();
        if let Some(index) = patches.iter().position(|(p, _)| *p == primitive) {
            let (_, patch) = patches.remove(index);
            patch.restore();
        }
    }
}

/// Keeps partner links on the page carrying the affiliate id until torn down.
pub struct LinkRewriter<H: RewriterHost = BrowserPage> {
    host: Rc<H>,
    scheduler: Rc<CoalescingScheduler<H::Frames>>,
    observing: bool,
    capturing: bool,
    patched: RefCell<Vec<Primitive>>,
    torn_down: Cell<bool>,
}

impl LinkRewriter<BrowserPage> {
    pub fn install(tracker: AffiliateTracker, query: Option<String>) -> Self {
        let rewriter = Self::install_on(BrowserPage::default(), tracker, query);
        info!("Affiliate link rewriter installed");
        rewriter
    }
}

impl<H: RewriterHost + 'static> LinkRewriter<H> {
    /// Rewrites the page now, re-scans after DOM changes (at most once per frame),
    /// fixes links right before they are followed, and wraps the navigation
    /// functions. Each step that can't be set up is skipped.
    pub fn install_on(host: H, tracker: AffiliateTracker, query: Option<String>) -> Self {
        let host = Rc::new(host);

        let changed = host.rewrite_all(&tracker, query.as_deref());
        debug!("initial pass rewrote {} partner links", changed);

        let scheduler = {
            let frames = host.frames();
            let host: Weak<H> = Rc::downgrade(&host);
            let tracker = tracker.clone();
            let query = query.clone();
            Rc::new(CoalescingScheduler::new(frames, move || {
                if let Some(host) = host.upgrade() {
                    host.rewrite_all(&tracker, query.as_deref());
                }
            }))
        };

        let observing = {
            let pending = scheduler.clone();
            host.start_observing(Rc::new(move || {
                pending.schedule();
            }))
        };

        let capturing = {
            let tracker = tracker.clone();
            let query = query.clone();
            host.start_click_capture(Rc::new(move |anchor: &dyn AnchorLink| {
                let next = anchor
                    .href()
                    .and_then(|href| tracker.rewrite_partner_href(&href, query.as_deref()));
                if let Some(next) = next {
                    anchor.set_href(&next);
                }
            }))
        };

        let navigation = AffiliateNavigation::new(BrowserNavigation, tracker, query);
        let rewrite: Rc<dyn Fn(&str) -> String> = Rc::new(move |url: &str| navigation.rewrite(url));
        let patched = Primitive::ALL
            .into_iter()
            .filter(|primitive| host.patch(*primitive, rewrite.clone()))
            .collect();

        Self {
            host,
            scheduler,
            observing,
            capturing,
            patched: RefCell::new(patched),
            torn_down: Cell::new(false),
        }
    }

    /// Undoes everything `install` set up. Calling it again does nothing.
    pub fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }

        if self.observing {
            self.host.stop_observing();
        }
        if self.scheduler.is_pending() {
            debug!("dropping queued link re-scan");
        }
        self.scheduler.cancel();
        if self.capturing {
            self.host.stop_click_capture();
        }
        for primitive in self.patched.borrow_mut().drain(..) {
            self.host.restore(primitive);
        }
        debug!("Affiliate link rewriter removed");
    }
}
