use log::debug;
use web_sys::window;

use super::tracker::AffiliateTracker;

/// The three ways the app leaves the current page programmatically.
pub trait Navigation {
    fn open(&self, url: &str, target: Option<&str>);
    fn assign(&self, url: &str);
    fn replace(&self, url: &str);
}

/// Straight to `window.open` / `location.assign` / `location.replace`.
#[derive(Clone, Copy, Default)]
pub struct BrowserNavigation;

impl Navigation for BrowserNavigation {
    fn open(&self, url: &str, target: Option<&str>) {
        if let Some(window) = window() {
            let _ = window.open_with_url_and_target(url, target.unwrap_or("_blank"));
        }
    }

    fn assign(&self, url: &str) {
        if let Some(window) = window() {
            if window.location().assign(url).is_err() {
                debug!("location.assign({}) failed", url);
            }
        }
    }

    fn replace(&self, url: &str) {
        if let Some(window) = window() {
            if window.location().replace(url).is_err() {
                debug!("location.replace({}) failed", url);
            }
        }
    }
}

/// Wraps another `Navigation` and stamps the affiliate id onto partner-bound URLs
/// before handing them on. Everything else passes through untouched.
#[derive(Clone)]
pub struct AffiliateNavigation<N: Navigation> {
    inner: N,
    tracker: AffiliateTracker,
    query: Option<String>,
}

impl<N: Navigation> AffiliateNavigation<N> {
    pub fn new(inner: N, tracker: AffiliateTracker, query: Option<String>) -> Self {
        Self { inner, tracker, query }
    }

    pub fn rewrite(&self, url: &str) -> String {
        self.tracker
            .rewrite_partner_href(url, self.query.as_deref())
            .unwrap_or_else(|| url.to_string())
    }
}

impl AffiliateNavigation<BrowserNavigation> {
    pub fn browser() -> Self {
        Self::new(BrowserNavigation, AffiliateTracker::browser(), None)
    }
}

impl<N: Navigation> Navigation for AffiliateNavigation<N> {
    fn open(&self, url: &str, target: Option<&str>) {
        self.inner.open(&self.rewrite(url), target);
    }

    fn assign(&self, url: &str) {
        self.inner.assign(&self.rewrite(url));
    }

    fn replace(&self, url: &str) {
        self.inner.replace(&self.rewrite(url));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affiliate::storage::testing::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(&'static str, String)>>,
    }

    impl Navigation for Rc<Recorder> {
        fn open(&self, url: &str, _target: Option<&str>) {
            self.calls.borrow_mut().push(("open", url.to_string()));
        }

        fn assign(&self, url: &str) {
            self.calls.borrow_mut().push(("assign", url.to_string()));
        }

        fn replace(&self, url: &str) {
            self.calls.borrow_mut().push(("replace", url.to_string()));
        }
    }

    fn navigation(page: &'static str) -> (AffiliateNavigation<Rc<Recorder>>, Rc<Recorder>) {
        let recorder = Rc::new(Recorder::default());
        let tracker = AffiliateTracker::new(
            Rc::new(MemoryStore::default()),
            "madnesstools.com",
            move || Some(page.to_string()),
            || 0,
        );
        (AffiliateNavigation::new(recorder.clone(), tracker, None), recorder)
    }

    #[test]
    fn test_partner_calls_are_parameterized() {
        let (nav, recorder) = navigation("https://site.test/?via=alpha");

        nav.open("https://madnesstools.com/pricing", None);
        nav.assign("https://app.madnesstools.com/");
        nav.replace("https://madnesstools.com/?via=partner");

        assert_eq!(
            recorder.calls.borrow().as_slice(),
            &[
                ("open", "https://madnesstools.com/pricing?via=alpha".to_string()),
                ("assign", "https://app.madnesstools.com/?via=alpha".to_string()),
                ("replace", "https://madnesstools.com/?via=partner".to_string()),
            ]
        );
    }

    #[test]
    fn test_other_destinations_pass_through() {
        let (nav, recorder) = navigation("https://site.test/?via=alpha");

        nav.assign("/support#billing");
        nav.open("https://example.org", Some("_self"));

        assert_eq!(
            recorder.calls.borrow().as_slice(),
            &[
                ("assign", "/support#billing".to_string()),
                ("open", "https://example.org".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_affiliate_context_passes_through() {
        let (nav, recorder) = navigation("https://site.test/");
        nav.assign("https://madnesstools.com");
        assert_eq!(recorder.calls.borrow()[0].1, "https://madnesstools.com");
    }
}
