use std::rc::Rc;

use log::debug;
use thiserror::Error;
use url::Url;
use web_sys::window;

use super::storage::{BrowserStorage, KeyValueStore};
use crate::config;

pub const VIA_PARAM: &str = "via";
pub const REFERRAL_PARAM: &str = "referral";

// Base for resolving relative paths when the page URL can't be read.
const FALLBACK_BASE: &str = "http://localhost/";

#[derive(Debug, Error, PartialEq)]
pub enum AffiliateError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("relative url `{0}` has nothing to resolve against")]
    MissingBase(String),
    #[error("unsupported scheme `{0}`")]
    UnsupportedScheme(String),
    #[error("`{0}` is not on the partner domain")]
    ForeignHost(String),
}

/// Affiliate ids known for this visit. Empty query values count as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AffiliateParams {
    pub via: Option<String>,
    pub referral: Option<String>,
}

impl AffiliateParams {
    /// Reads `via` and `referral` from a query string, with or without the leading `?`.
    /// The first occurrence of each name wins.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match &*key {
                VIA_PARAM => &mut params.via,
                REFERRAL_PARAM => &mut params.referral,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    pub fn is_empty(&self) -> bool {
        self.via.is_none() && self.referral.is_none()
    }

    /// The single id to propagate: `via` beats `referral`.
    pub fn effective(&self) -> Option<&str> {
        self.via.as_deref().or(self.referral.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedAffiliateRecord {
    pub via: Option<String>,
    pub referral: Option<String>,
    pub captured_at_epoch_millis: i64,
}

impl PersistedAffiliateRecord {
    /// Past the TTL, or stamped later than `now_millis`, which only a corrupt
    /// store produces.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        if self.captured_at_epoch_millis > now_millis {
            return true;
        }
        now_millis.saturating_sub(self.captured_at_epoch_millis) >= config::AFFILIATE_TTL_MILLIS
    }

    fn load(store: &dyn KeyValueStore) -> Option<Self> {
        let via = store.get(config::VIA_KEY).filter(|v| !v.is_empty());
        let referral = store.get(config::REFERRAL_KEY).filter(|v| !v.is_empty());
        if via.is_none() && referral.is_none() {
            return None;
        }
        // A record without a readable timestamp can't be aged, so it is treated as stale.
        let captured_at_epoch_millis = store
            .get(config::CAPTURED_AT_KEY)
            .and_then(|ts| ts.trim().parse::<i64>().ok())
            .unwrap_or(i64::MIN / 2);
        Some(Self { via, referral, captured_at_epoch_millis })
    }

    fn save(&self, store: &dyn KeyValueStore) {
        write_or_remove(store, config::VIA_KEY, self.via.as_deref());
        write_or_remove(store, config::REFERRAL_KEY, self.referral.as_deref());
        store.set(config::CAPTURED_AT_KEY, &self.captured_at_epoch_millis.to_string());
    }

    fn clear(store: &dyn KeyValueStore) {
        store.remove(config::VIA_KEY);
        store.remove(config::REFERRAL_KEY);
        store.remove(config::CAPTURED_AT_KEY);
    }

    fn params(&self) -> AffiliateParams {
        AffiliateParams { via: self.via.clone(), referral: self.referral.clone() }
    }
}

fn write_or_remove(store: &dyn KeyValueStore, key: &str, value: Option<&str>) {
    match value {
        Some(value) => store.set(key, value),
        None => store.remove(key),
    }
}

/// Resolves the affiliate id for the current visit and stamps it onto links.
///
/// Cloning is cheap; clones share the same store and accessors.
#[derive(Clone)]
pub struct AffiliateTracker {
    store: Rc<dyn KeyValueStore>,
    partner_domain: Rc<str>,
    current_url: Rc<dyn Fn() -> Option<String>>,
    clock: Rc<dyn Fn() -> i64>,
}

impl AffiliateTracker {
    pub fn new(
        store: Rc<dyn KeyValueStore>,
        partner_domain: &str,
        current_url: impl Fn() -> Option<String> + 'static,
        clock: impl Fn() -> i64 + 'static,
    ) -> Self {
        Self {
            store,
            partner_domain: Rc::from(partner_domain.trim_end_matches('.').to_ascii_lowercase()),
            current_url: Rc::new(current_url),
            clock: Rc::new(clock),
        }
    }

    /// Tracker backed by localStorage, the window's location and the system clock.
    pub fn browser() -> Self {
        Self::new(
            Rc::new(BrowserStorage::local()),
            config::get_partner_domain(),
            || window().and_then(|w| w.location().href().ok()),
            || chrono::Utc::now().timestamp_millis(),
        )
    }

    fn current_query(&self) -> String {
        (self.current_url)()
            .and_then(|href| Url::parse(&href).ok())
            .and_then(|url| url.query().map(str::to_string))
            .unwrap_or_default()
    }

    fn base_url(&self) -> Result<Url, AffiliateError> {
        match (self.current_url)().and_then(|href| Url::parse(&href).ok()) {
            Some(url) => Ok(url),
            None => Ok(Url::parse(FALLBACK_BASE)?),
        }
    }

    /// Affiliate ids from `query` (or the page's own query string).
    ///
    /// Ids in the query always win and are written through to storage, clearing
    /// whichever of the two is missing. With no ids in the query the stored record
    /// is used, unless it has outlived the TTL, in which case it is deleted.
    pub fn resolve(&self, query: Option<&str>) -> AffiliateParams {
        let params = match query {
            Some(query) => AffiliateParams::from_query(query),
            None => AffiliateParams::from_query(&self.current_query()),
        };

        let now = (self.clock)();
        if !params.is_empty() {
            PersistedAffiliateRecord {
                via: params.via.clone(),
                referral: params.referral.clone(),
                captured_at_epoch_millis: now,
            }
            .save(self.store.as_ref());
            return params;
        }

        match PersistedAffiliateRecord::load(self.store.as_ref()) {
            Some(record) if record.is_expired(now) => {
                debug!("stored affiliate id expired, clearing");
                PersistedAffiliateRecord::clear(self.store.as_ref());
                AffiliateParams::default()
            }
            Some(record) => record.params(),
            None => AffiliateParams::default(),
        }
    }

    /// Sets `via` on an absolute URL unless it already carries one.
    /// Anything that does not parse comes back untouched.
    pub fn append_to_absolute_url(&self, url: &str, query: Option<&str>) -> String {
        let params = self.resolve(query);
        let Some(id) = params.effective() else {
            return url.to_string();
        };
        match append_via(url, id) {
            Ok(next) => next,
            Err(err) => {
                debug!("leaving {} as is: {}", url, err);
                url.to_string()
            }
        }
    }

    /// Adds `via` and `referral` to an in-app path, each only if the path lacks it,
    /// and returns path, query and fragment without the origin.
    pub fn append_to_path(&self, path: &str, query: Option<&str>) -> String {
        let params = self.resolve(query);
        if params.is_empty() {
            return path.to_string();
        }
        match self
            .base_url()
            .and_then(|base| append_params_to_path(&base, path, &params))
        {
            Ok(next) => next,
            Err(err) => {
                debug!("leaving {} as is: {}", path, err);
                path.to_string()
            }
        }
    }

    /// Absolute form of `href` if it points at the partner domain over http(s).
    pub fn partner_url(&self, href: &str) -> Result<Url, AffiliateError> {
        let url = match Url::parse(href) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = (self.current_url)()
                    .and_then(|current| Url::parse(&current).ok())
                    .ok_or_else(|| AffiliateError::MissingBase(href.to_string()))?;
                base.join(href)?
            }
            Err(err) => return Err(err.into()),
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Err(AffiliateError::UnsupportedScheme(url.scheme().to_string()));
        }
        let host = url.host_str().unwrap_or_default().trim_end_matches('.');
        let domain = self.partner_domain.as_ref();
        let on_partner = host == domain
            || (host.len() > domain.len()
                && host.ends_with(domain)
                && host[..host.len() - domain.len()].ends_with('.'));
        if on_partner {
            Ok(url)
        } else {
            Err(AffiliateError::ForeignHost(host.to_string()))
        }
    }

    pub fn is_target_domain(&self, href: &str) -> bool {
        self.partner_url(href).is_ok()
    }

    /// The parameterized form of a partner-bound `href`, or `None` when there is
    /// nothing to change.
    pub fn rewrite_partner_href(&self, href: &str, query: Option<&str>) -> Option<String> {
        if !self.is_target_domain(href) {
            return None;
        }
        let params = self.resolve(query);
        self.rewrite_partner_href_with(href, params.effective()?)
    }

    /// Same as `rewrite_partner_href` with an id resolved up front, so a batch of
    /// links only touches storage once.
    pub fn rewrite_partner_href_with(&self, href: &str, id: &str) -> Option<String> {
        let absolute = self.partner_url(href).ok()?;
        let next = append_via(absolute.as_str(), id).ok()?;
        (next != absolute.as_str()).then_some(next)
    }
}

/// Sets `via=id` on `url`. A non-empty `via` already on the URL is kept and the
/// input returned as is; an empty one is replaced.
pub fn append_via(url: &str, id: &str) -> Result<String, AffiliateError> {
    let mut destination = Url::parse(url)?;
    let existing = destination
        .query_pairs()
        .find(|(key, _)| key == VIA_PARAM)
        .map(|(_, value)| value.into_owned());

    match existing {
        Some(value) if !value.is_empty() => return Ok(url.to_string()),
        Some(_) => {
            // Drop the empty pair from the raw text so the others keep their encoding.
            let kept = destination
                .query()
                .unwrap_or_default()
                .split('&')
                .filter(|segment| !segment.is_empty() && !is_via_segment(segment))
                .collect::<Vec<_>>()
                .join("&");
            destination.set_query(Some(kept.as_str()).filter(|q| !q.is_empty()));
            destination.query_pairs_mut().append_pair(VIA_PARAM, id);
        }
        None => {
            destination.query_pairs_mut().append_pair(VIA_PARAM, id);
        }
    }
    Ok(destination.to_string())
}

fn is_via_segment(segment: &str) -> bool {
    url::form_urlencoded::parse(segment.as_bytes())
        .next()
        .map_or(false, |(key, _)| key == VIA_PARAM)
}

fn append_params_to_path(
    base: &Url,
    path: &str,
    params: &AffiliateParams,
) -> Result<String, AffiliateError> {
    // The fragment is carried over byte for byte; only the part before it is parsed.
    let (path, fragment) = match path.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (path, None),
    };
    let mut target = base.join(path)?;
    let has = |name: &str| target.query_pairs().any(|(key, _)| key == name);
    let missing: Vec<(&str, &str)> = [(VIA_PARAM, &params.via), (REFERRAL_PARAM, &params.referral)]
        .into_iter()
        .filter_map(|(name, value)| Some((name, value.as_deref()?)))
        .filter(|(name, _)| !has(name))
        .collect();

    if !missing.is_empty() {
        let mut pairs = target.query_pairs_mut();
        for (name, value) in missing {
            pairs.append_pair(name, value);
        }
    }

    let mut out = target.path().to_string();
    if let Some(query) = target.query().filter(|q| !q.is_empty()) {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affiliate::storage::testing::MemoryStore;
    use std::cell::{Cell, RefCell};

    const DAY: i64 = 24 * 60 * 60 * 1000;
    const NOW: i64 = 1_760_000_000_000;

    struct Fixture {
        store: Rc<MemoryStore>,
        page: Rc<RefCell<String>>,
        now: Rc<Cell<i64>>,
        tracker: AffiliateTracker,
    }

    fn fixture(page: &str) -> Fixture {
        let store = Rc::new(MemoryStore::default());
        let page = Rc::new(RefCell::new(page.to_string()));
        let now = Rc::new(Cell::new(NOW));
        let tracker = AffiliateTracker::new(
            store.clone(),
            "madnesstools.com",
            {
                let page = page.clone();
                move || Some(page.borrow().clone())
            },
            {
                let now = now.clone();
                move || now.get()
            },
        );
        Fixture { store, page, now, tracker }
    }

    fn stored(fx: &Fixture, via: Option<&str>, referral: Option<&str>, captured_at: i64) {
        if let Some(via) = via {
            fx.store.set(config::VIA_KEY, via);
        }
        if let Some(referral) = referral {
            fx.store.set(config::REFERRAL_KEY, referral);
        }
        fx.store.set(config::CAPTURED_AT_KEY, &captured_at.to_string());
    }

    #[test]
    fn test_via_only_is_returned_and_persisted() {
        let fx = fixture("https://site.test/");
        fx.store.set(config::REFERRAL_KEY, "old");

        let params = fx.tracker.resolve(Some("?via=alpha"));

        assert_eq!(params, AffiliateParams { via: Some("alpha".into()), referral: None });
        assert_eq!(fx.store.get(config::VIA_KEY).as_deref(), Some("alpha"));
        assert!(!fx.store.contains(config::REFERRAL_KEY));
        assert_eq!(fx.store.get(config::CAPTURED_AT_KEY), Some(NOW.to_string()));
    }

    #[test]
    fn test_referral_only_clears_stored_via() {
        let fx = fixture("https://site.test/");
        stored(&fx, Some("old"), None, NOW - DAY);

        let params = fx.tracker.resolve(Some("referral=beta"));

        assert_eq!(params.effective(), Some("beta"));
        assert!(!fx.store.contains(config::VIA_KEY));
        assert_eq!(fx.store.get(config::REFERRAL_KEY).as_deref(), Some("beta"));
    }

    #[test]
    fn test_resolve_reads_page_query_when_none_given() {
        let fx = fixture("https://site.test/pricing?utm_source=x&via=alpha&referral=beta");
        let params = fx.tracker.resolve(None);
        assert_eq!(params.via.as_deref(), Some("alpha"));
        assert_eq!(params.referral.as_deref(), Some("beta"));
    }

    #[test]
    fn test_query_beats_storage() {
        let fx = fixture("https://site.test/?via=fresh");
        stored(&fx, Some("storedvia"), None, NOW);
        assert_eq!(fx.tracker.resolve(None).effective(), Some("fresh"));
    }

    #[test]
    fn test_empty_values_are_absent() {
        let fx = fixture("https://site.test/");
        let params = fx.tracker.resolve(Some("via=&referral=beta"));
        assert_eq!(params, AffiliateParams { via: None, referral: Some("beta".into()) });
    }

    #[test]
    fn test_nothing_anywhere_is_empty() {
        let fx = fixture("https://site.test/");
        assert!(fx.tracker.resolve(None).is_empty());
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_ttl_boundary() {
        let fx = fixture("https://site.test/");
        let ttl = config::AFFILIATE_TTL_MILLIS;

        stored(&fx, Some("storedvia"), None, NOW - ttl + 1);
        assert_eq!(fx.tracker.resolve(None).effective(), Some("storedvia"));

        fx.now.set(NOW + 1);
        assert!(fx.tracker.resolve(None).is_empty());
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_expired_record_is_cleared() {
        let fx = fixture("https://site.test/");
        stored(&fx, Some("expiredvia"), Some("expiredref"), NOW - 90 * DAY);

        assert_eq!(fx.tracker.append_to_path("/support", None), "/support");
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_corrupt_timestamps_are_stale() {
        let fx = fixture("https://site.test/");

        stored(&fx, Some("stale"), None, i64::MIN);
        assert!(fx.tracker.resolve(None).is_empty());
        assert!(fx.store.is_empty());

        stored(&fx, Some("stale"), None, i64::MAX);
        assert!(fx.tracker.resolve(None).is_empty());
        assert!(fx.store.is_empty());

        stored(&fx, Some("early"), None, NOW + DAY);
        assert!(fx.tracker.resolve(None).is_empty());
    }

    #[test]
    fn test_far_past_now_does_not_overflow() {
        let record = PersistedAffiliateRecord {
            via: Some("alpha".into()),
            referral: None,
            captured_at_epoch_millis: i64::MIN,
        };
        assert!(record.is_expired(i64::MAX));
        assert!(record.is_expired(0));
    }

    #[test]
    fn test_record_without_timestamp_is_stale() {
        let fx = fixture("https://site.test/");
        fx.store.set(config::VIA_KEY, "orphan");
        assert!(fx.tracker.resolve(None).is_empty());
        assert!(!fx.store.contains(config::VIA_KEY));
    }

    #[test]
    fn test_absolute_url_prefers_via() {
        let fx = fixture("https://site.test/?via=alpha&referral=beta");
        assert_eq!(
            fx.tracker.append_to_absolute_url("https://example.com", None),
            "https://example.com/?via=alpha"
        );
    }

    #[test]
    fn test_absolute_url_falls_back_to_referral() {
        let fx = fixture("https://site.test/?referral=beta");
        assert_eq!(
            fx.tracker.append_to_absolute_url("https://example.com", None),
            "https://example.com/?via=beta"
        );
    }

    #[test]
    fn test_absolute_url_uses_stored_id() {
        let fx = fixture("https://site.test/");
        stored(&fx, Some("storedvia"), None, NOW);
        assert_eq!(
            fx.tracker.append_to_absolute_url("https://example.com", None),
            "https://example.com/?via=storedvia"
        );
    }

    #[test]
    fn test_absolute_url_keeps_existing_via() {
        let fx = fixture("https://site.test/?via=alpha");
        let url = "https://example.com/?via=existing";
        assert_eq!(fx.tracker.append_to_absolute_url(url, None), url);
    }

    #[test]
    fn test_absolute_url_replaces_empty_via() {
        let fx = fixture("https://site.test/?via=alpha");
        assert_eq!(
            fx.tracker.append_to_absolute_url("https://example.com/?plan=pro&via=", None),
            "https://example.com/?plan=pro&via=alpha"
        );
    }

    #[test]
    fn test_replacing_empty_via_keeps_other_encoding() {
        let fx = fixture("https://site.test/?via=alpha");
        assert_eq!(
            fx.tracker.append_to_absolute_url("https://example.com/?q=a%20b&via=&tag=x+y", None),
            "https://example.com/?q=a%20b&tag=x+y&via=alpha"
        );
    }

    #[test]
    fn test_absolute_url_is_idempotent() {
        let fx = fixture("https://site.test/?via=alpha");
        let once = fx.tracker.append_to_absolute_url("https://example.com/buy?plan=pro#top", None);
        let twice = fx.tracker.append_to_absolute_url(&once, None);
        assert_eq!(once, "https://example.com/buy?plan=pro&via=alpha#top");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_malformed_url_fails_closed() {
        let fx = fixture("https://site.test/?via=alpha");
        assert_eq!(fx.tracker.append_to_absolute_url("not a url", None), "not a url");
        assert_eq!(fx.tracker.append_to_absolute_url("/relative", None), "/relative");
        assert_eq!(fx.tracker.append_to_absolute_url("http://[::1", None), "http://[::1");
    }

    #[test]
    fn test_no_context_leaves_url_alone() {
        let fx = fixture("https://site.test/");
        assert_eq!(fx.tracker.append_to_absolute_url("https://example.com", None), "https://example.com");
    }

    #[test]
    fn test_path_without_context_is_unchanged() {
        let fx = fixture("https://site.test/");
        assert_eq!(fx.tracker.append_to_path("/support", None), "/support");
    }

    #[test]
    fn test_path_gets_via() {
        let fx = fixture("https://site.test/?via=alpha");
        assert_eq!(fx.tracker.append_to_path("/support", None), "/support?via=alpha");
    }

    #[test]
    fn test_path_gets_referral() {
        let fx = fixture("https://site.test/?referral=beta");
        assert_eq!(fx.tracker.append_to_path("/support", None), "/support?referral=beta");
    }

    #[test]
    fn test_path_keeps_fragment_after_query() {
        let fx = fixture("https://site.test/?via=alpha&referral=beta");
        assert_eq!(
            fx.tracker.append_to_path("/#features", None),
            "/?via=alpha&referral=beta#features"
        );
    }

    #[test]
    fn test_path_fragment_is_kept_verbatim() {
        let fx = fixture("https://site.test/");
        assert_eq!(
            fx.tracker.append_to_path("/support#Getting started", Some("via=alpha")),
            "/support?via=alpha#Getting started"
        );
        assert_eq!(
            fx.tracker.append_to_path("/support?lang=es#Cómo empezar", Some("via=alpha")),
            "/support?lang=es&via=alpha#Cómo empezar"
        );
        assert_eq!(
            fx.tracker.append_to_path("/#a#b%20c", Some("via=alpha")),
            "/?via=alpha#a#b%20c"
        );
    }

    #[test]
    fn test_path_keeps_explicit_param_and_adds_other() {
        let fx = fixture("https://site.test/?via=alpha&referral=beta");
        assert_eq!(
            fx.tracker.append_to_path("/support?via=existing", None),
            "/support?via=existing&referral=beta"
        );
    }

    #[test]
    fn test_path_leaves_unrelated_params() {
        let fx = fixture("https://site.test/");
        assert_eq!(
            fx.tracker.append_to_path("/support?lang=de&q=a+b", Some("via=alpha")),
            "/support?lang=de&q=a+b&via=alpha"
        );
    }

    #[test]
    fn test_relative_path_resolves_against_page() {
        let fx = fixture("https://site.test/docs/intro?via=alpha");
        assert_eq!(fx.tracker.append_to_path("setup", None), "/docs/setup?via=alpha");
    }

    #[test]
    fn test_target_domain_classification() {
        let fx = fixture("https://site.test/support");
        let tracker = &fx.tracker;
        assert!(tracker.is_target_domain("https://madnesstools.com"));
        assert!(tracker.is_target_domain("http://app.madnesstools.com/login"));
        assert!(tracker.is_target_domain("https://MadnessTools.com/"));
        assert!(!tracker.is_target_domain("https://notmadnesstools.com/"));
        assert!(!tracker.is_target_domain("https://madnesstools.com.evil.io/"));
        assert!(!tracker.is_target_domain("mailto:sales@madnesstools.com"));
        assert!(!tracker.is_target_domain("ftp://madnesstools.com/file"));
        assert!(!tracker.is_target_domain("/pricing"));
        assert!(!tracker.is_target_domain("http://[::1"));
    }

    #[test]
    fn test_relative_href_on_partner_site() {
        let fx = fixture("https://madnesstools.com/landing");
        assert!(fx.tracker.is_target_domain("/pricing"));
        *fx.page.borrow_mut() = "https://site.test/".to_string();
        assert!(!fx.tracker.is_target_domain("/pricing"));
    }

    #[test]
    fn test_partner_url_errors() {
        let fx = fixture("https://site.test/");
        assert_eq!(
            fx.tracker.partner_url("https://example.org/").unwrap_err(),
            AffiliateError::ForeignHost("example.org".into())
        );
        assert_eq!(
            fx.tracker.partner_url("ftp://madnesstools.com/").unwrap_err(),
            AffiliateError::UnsupportedScheme("ftp".into())
        );
    }

    #[test]
    fn test_rewrite_partner_href() {
        let fx = fixture("https://site.test/?via=alpha");
        assert_eq!(
            fx.tracker.rewrite_partner_href("https://madnesstools.com", None).as_deref(),
            Some("https://madnesstools.com/?via=alpha")
        );
        assert_eq!(fx.tracker.rewrite_partner_href("https://madnesstools.com/?via=alpha", None), None);
        assert_eq!(fx.tracker.rewrite_partner_href("https://example.org/", None), None);
    }
}
