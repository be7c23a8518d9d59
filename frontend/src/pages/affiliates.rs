use yew::prelude::*;

use crate::components::links::AffiliateLink;
use crate::config;
use crate::hash_navigation::{scroll_to_section, HashHistoryMode};
use crate::Route;
use gloo_timers::callback::Timeout;
use log::warn;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::js_sys::{Function, Reflect};
use web_sys::{window, ScrollBehavior};

const PROGRAM_DETAILS_ID: &str = "program-details";
const COPIED_RESET_MS: u32 = 2_000;

const PROGRAM_TERMS: &[(&str, &str)] = &[
    ("30% recurring", "Earn on every payment for the first 12 months of each customer you send."),
    ("60-day window", "Visitors you refer stay credited to you for 60 days, even if they leave and come back."),
    ("Monthly payouts", "Paid out via PayPal or bank transfer once you pass $50."),
];

const AUDIENCES: &[(&str, &str, &str)] = &[
    (
        "Tool truck partners",
        "Offer Madness Tools to the shops on your route.",
        "mailto:partners@madnesstools.com?subject=Tool%20Truck%20Partner%20Program",
    ),
    (
        "Influencers",
        "Show your build videos with your gear actually accounted for.",
        "mailto:partners@madnesstools.com?subject=Influencer%20Program%20Application",
    ),
    (
        "Trade schools",
        "Free classroom accounts for instructors and students.",
        "mailto:partners@madnesstools.com?subject=Trade%20School%20Program",
    ),
];

/// Snippet partners paste into their own pages.
pub fn sample_link_snippet(partner_url: &str) -> String {
    format!(
        "<a href=\"{}?via=YOUR_AFFILIATE_ID\" target=\"_blank\" rel=\"noopener\">\n  Try Madness Tools\n</a>",
        partner_url
    )
}

fn copy_label(copied: bool) -> &'static str {
    if copied {
        "Copied!"
    } else {
        "Copy"
    }
}

/// Hands `text` to `navigator.clipboard.writeText`. False when the page has no
/// clipboard access (insecure origin, old browser).
fn copy_to_clipboard(text: &str) -> bool {
    let Some(window) = window() else {
        return false;
    };
    let navigator: JsValue = window.navigator().into();
    let Ok(clipboard) = Reflect::get(&navigator, &JsValue::from_str("clipboard")) else {
        return false;
    };
    let write_text = Reflect::get(&clipboard, &JsValue::from_str("writeText"))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok());
    match write_text {
        Some(write_text) => write_text.call1(&clipboard, &JsValue::from_str(text)).is_ok(),
        None => false,
    }
}

#[function_component(Affiliates)]
pub fn affiliates() -> Html {
    let copied = use_state(|| false);
    let show_details = Callback::from(|e: MouseEvent| {
        e.prevent_default();
        scroll_to_section(PROGRAM_DETAILS_ID, ScrollBehavior::Smooth, HashHistoryMode::Push, None);
    });
    let snippet = sample_link_snippet(&config::get_partner_url());

    let copy_snippet = {
        let copied = copied.clone();
        let snippet = snippet.clone();
        Callback::from(move |_: MouseEvent| {
            if !copy_to_clipboard(&snippet) {
                warn!("Clipboard not available, snippet left for manual copy");
                return;
            }
            copied.set(true);
            let copied = copied.clone();
            Timeout::new(COPIED_RESET_MS, move || copied.set(false)).forget();
        })
    };

    html! {
        <div class="affiliates-page">
            <section class="affiliates-hero">
                <AffiliateLink to={Route::Home} classes="back-link">
                    {"← Back to home"}
                </AffiliateLink>
                <h1>{"Partner program"}</h1>
                <p>{"Recommend the tool tracker your audience already needs and get paid for it."}</p>
                <div class="hero-actions">
                    <a href={config::AFFILIATE_SIGNUP_URL} class="cta-button" target="_blank" rel="noopener noreferrer">
                        {"Become a partner"}
                    </a>
                    <a href={format!("#{}", PROGRAM_DETAILS_ID)} class="secondary-button" onclick={show_details}>
                        {"How it works"}
                    </a>
                </div>
            </section>

            <section id={PROGRAM_DETAILS_ID} class="program-details">
                <h2>{"How it works"}</h2>
                <div class="terms-grid">
                    { for PROGRAM_TERMS.iter().map(|(title, text)| html! {
                        <div class="term-card">
                            <h3>{*title}</h3>
                            <p>{*text}</p>
                        </div>
                    }) }
                </div>

                <h3>{"Your link"}</h3>
                <p>{"Any link to the site with your id in the "}<code>{"via"}</code>{" parameter counts:"}</p>
                <div class="snippet-box">
                    <pre class="snippet">{snippet}</pre>
                    <button class={classes!("copy-button", (*copied).then(|| "copied"))} onclick={copy_snippet}>
                        {copy_label(*copied)}
                    </button>
                </div>
            </section>

            <section class="audiences">
                <h2>{"Special programs"}</h2>
                <div class="terms-grid">
                    { for AUDIENCES.iter().map(|(title, text, mailto)| html! {
                        <div class="term-card">
                            <h3>{*title}</h3>
                            <p>{*text}</p>
                            <a href={*mailto} class="secondary-button">{"Get in touch"}</a>
                        </div>
                    }) }
                </div>
            </section>

            <style>
                {r#"
                .affiliates-page {
                    padding-top: 74px;
                    color: #ffffff;
                    background: #0a0a0f;
                    min-height: 100vh;
                }

                .affiliates-hero, .program-details, .audiences {
                    max-width: 1000px;
                    margin: 0 auto;
                    padding: 3rem 2rem;
                }

                .affiliates-hero h1 {
                    font-size: 3rem;
                }

                .terms-grid {
                    display: grid;
                    grid-template-columns: repeat(auto-fit, minmax(240px, 1fr));
                    gap: 1.5rem;
                    margin-bottom: 2rem;
                }

                .term-card {
                    padding: 1.5rem;
                    border-radius: 12px;
                    background: rgba(30, 30, 30, 0.7);
                }

                .snippet-box {
                    position: relative;
                }

                .copy-button {
                    position: absolute;
                    top: 0.5rem;
                    right: 0.5rem;
                    padding: 0.3rem 0.8rem;
                    border: none;
                    border-radius: 6px;
                    background: #ff4d00;
                    color: #fff;
                    cursor: pointer;
                }

                .copy-button.copied {
                    background: #2e7d32;
                }

                .snippet {
                    padding: 1rem;
                    border-radius: 8px;
                    background: #16161d;
                    overflow-x: auto;
                    color: #ffb38f;
                }
                "#}
            </style>
        </div>
    }
}
