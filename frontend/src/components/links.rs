use yew::prelude::*;
use yew_router::prelude::*;
use web_sys::MouseEvent;

use crate::affiliate::tracker::{AffiliateTracker, REFERRAL_PARAM, VIA_PARAM};
use crate::analytics::{self, ConversionEvent};
use crate::config;
use crate::Route;

#[derive(Properties, PartialEq)]
pub struct AffiliateLinkProps {
    pub to: Route,
    #[prop_or_default]
    pub classes: Classes,
    pub children: Children,
}

/// In-app link that keeps `via`/`referral` in the address bar.
///
/// The href carries the ids so new tabs get them too; plain clicks go through
/// the router instead of reloading.
#[function_component(AffiliateLink)]
pub fn affiliate_link(props: &AffiliateLinkProps) -> Html {
    let navigator = use_navigator();
    let href = AffiliateTracker::browser().append_to_path(&props.to.to_path(), None);

    let onclick = {
        let to = props.to.clone();
        Callback::from(move |e: MouseEvent| {
            if e.button() != 0 || e.ctrl_key() || e.meta_key() || e.shift_key() || e.alt_key() {
                return;
            }
            let Some(navigator) = navigator.clone() else {
                return;
            };
            e.prevent_default();

            let params = AffiliateTracker::browser().resolve(None);
            let query: Vec<(&str, &str)> = [
                (VIA_PARAM, params.via.as_deref()),
                (REFERRAL_PARAM, params.referral.as_deref()),
            ]
            .into_iter()
            .filter_map(|(name, value)| Some((name, value?)))
            .collect();

            if query.is_empty() {
                navigator.push(&to);
            } else {
                let _ = navigator.push_with_query(&to, &query);
            }
        })
    };

    html! {
        <a href={href} class={props.classes.clone()} {onclick}>
            { for props.children.iter() }
        </a>
    }
}

#[derive(Properties, PartialEq)]
pub struct PartnerLinkProps {
    #[prop_or_default]
    pub path: AttrValue,
    #[prop_or_default]
    pub event: Option<ConversionEvent>,
    #[prop_or_default]
    pub classes: Classes,
    pub children: Children,
}

/// Outbound link to the main product site, tagged with the affiliate id at render
/// time. The link rewriter catches anything rendered without it.
#[function_component(PartnerLink)]
pub fn partner_link(props: &PartnerLinkProps) -> Html {
    let url = format!("{}{}", config::get_partner_url(), props.path);
    let href = AffiliateTracker::browser().append_to_absolute_url(&url, None);

    let onclick = {
        let event = props.event;
        Callback::from(move |_: MouseEvent| {
            if let Some(event) = event {
                analytics::track(event);
            }
        })
    };

    html! {
        <a href={href} class={props.classes.clone()} target="_blank" rel="noopener noreferrer" {onclick}>
            { for props.children.iter() }
        </a>
    }
}
