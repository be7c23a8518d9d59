// Site-wide settings. Everything the affiliate tracker and the support page
// scroll logic need to agree on lives here.

pub const VIA_KEY: &str = "rewardful_via";
pub const REFERRAL_KEY: &str = "rewardful_referral";
pub const CAPTURED_AT_KEY: &str = "rewardful_referral_ts";

/// How long a captured affiliate id stays valid: 60 days.
pub const AFFILIATE_TTL_MILLIS: i64 = 60 * 24 * 60 * 60 * 1000;

pub const DEFAULT_NAV_HEIGHT: f64 = 64.0;
pub const DEFAULT_TOC_HEIGHT: f64 = 68.0;
pub const MIN_TOC_HEIGHT: f64 = 60.0;
pub const STICKY_MARGIN: f64 = 20.0;
pub const MIN_STICKY_OFFSET: f64 = 160.0;

pub const SUPPORT_TOC_ID: &str = "support-toc";
pub const CORRECTION_SCROLL_DELAY_MS: u32 = 350;
pub const HASH_RETRY_ATTEMPTS: u32 = 30;

pub const GOOGLE_ADS_ID: &str = "AW-17788348941";
pub const AFFILIATE_SIGNUP_URL: &str = "https://anansi-portia-inc.getrewardful.com/signup";

pub fn get_partner_domain() -> &'static str {
    option_env!("PARTNER_DOMAIN").unwrap_or("madnesstools.com")
}

pub fn get_partner_url() -> String {
    format!("https://{}", get_partner_domain())
}

#[cfg(debug_assertions)]
pub fn analytics_debug() -> bool {
    true  // Log skipped conversions while developing
}

#[cfg(not(debug_assertions))]
pub fn analytics_debug() -> bool {
    false
}

// Conversion labels from Google Ads, the part after the slash in `send_to`.
// Empty means the conversion action hasn't been created yet.
pub const SIGN_UP_LABEL: &str = "OYU7CPyrvM4bEI3UkqJC";
pub const PURCHASE_DIY_LABEL: &str = "";
pub const PURCHASE_PRO_LABEL: &str = "OYU7CPyrvM4bEI3UkqJC";
pub const LEAD_ENTERPRISE_LABEL: &str = "";
