use log::debug;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::js_sys::{Function, Object, Reflect};
use web_sys::window;

use crate::config;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionEvent {
    SignUp,
    PurchaseDiy,
    PurchasePro,
    LeadEnterprise,
}

impl ConversionEvent {
    pub fn name(self) -> &'static str {
        match self {
            ConversionEvent::SignUp => "signUp",
            ConversionEvent::PurchaseDiy => "purchaseDiy",
            ConversionEvent::PurchasePro => "purchasePro",
            ConversionEvent::LeadEnterprise => "leadEnterprise",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConversionEvent::SignUp => config::SIGN_UP_LABEL,
            ConversionEvent::PurchaseDiy => config::PURCHASE_DIY_LABEL,
            ConversionEvent::PurchasePro => config::PURCHASE_PRO_LABEL,
            ConversionEvent::LeadEnterprise => config::LEAD_ENTERPRISE_LABEL,
        }
    }

    pub fn is_configured(self) -> bool {
        !self.label().is_empty()
    }

    /// `AW-.../label`, the target gtag expects.
    pub fn send_to(self) -> Option<String> {
        self.is_configured()
            .then(|| format!("{}/{}", config::GOOGLE_ADS_ID, self.label()))
    }
}

fn gtag() -> Option<Function> {
    let window = window()?;
    Reflect::get(&window, &JsValue::from_str("gtag"))
        .ok()?
        .dyn_into::<Function>()
        .ok()
}

/// Fires a conversion and forgets about it. Returns whether anything was sent;
/// an unconfigured label or a blocked gtag just means `false`.
pub fn track(event: ConversionEvent) -> bool {
    let Some(send_to) = event.send_to() else {
        if config::analytics_debug() {
            debug!("conversion {} skipped: no label configured", event.name());
        }
        return false;
    };
    let Some(gtag) = gtag() else {
        if config::analytics_debug() {
            debug!("gtag not available, {} not sent", event.name());
        }
        return false;
    };

    let payload = Object::new();
    if Reflect::set(&payload, &JsValue::from_str("send_to"), &JsValue::from_str(&send_to)).is_err() {
        return false;
    }
    let sent = gtag
        .call3(
            &JsValue::NULL,
            &JsValue::from_str("event"),
            &JsValue::from_str("conversion"),
            &payload,
        )
        .is_ok();
    if sent {
        debug!("conversion tracked: {} -> {}", event.name(), send_to);
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_events_have_send_to() {
        assert_eq!(
            ConversionEvent::SignUp.send_to().as_deref(),
            Some("AW-17788348941/OYU7CPyrvM4bEI3UkqJC")
        );
        assert!(ConversionEvent::PurchasePro.is_configured());
    }

    #[test]
    fn test_unconfigured_events_are_skipped() {
        assert!(!ConversionEvent::PurchaseDiy.is_configured());
        assert_eq!(ConversionEvent::LeadEnterprise.send_to(), None);
        // Returns before touching the browser.
        assert!(!track(ConversionEvent::PurchaseDiy));
    }
}
