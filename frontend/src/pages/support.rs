use std::collections::HashMap;

use log::warn;
use serde::Deserialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{window, Element, HtmlAnchorElement, MouseEvent, ScrollBehavior};
use yew::prelude::*;

use crate::components::links::AffiliateLink;
use crate::config;
use crate::hash_navigation::{
    scroll_to_hash_with_retry, scroll_to_section, section_id_from_hash, BrowserHistory, HashHistory,
    HashHistoryMode, ScrollOptions,
};
use crate::Route;

const SUPPORT_CONTENT: &str = include_str!("support_content.json");
const DEFAULT_LANGUAGE: &str = "en";

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SupportSection {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub related: Vec<String>,
}

/// Sections for `language`, or the English ones when there's no translation.
pub fn load_sections(language: &str) -> Vec<SupportSection> {
    let catalog: HashMap<String, Vec<SupportSection>> = match serde_json::from_str(SUPPORT_CONTENT) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!("support content is malformed: {}", e);
            return Vec::new();
        }
    };
    catalog
        .get(language)
        .or_else(|| catalog.get(DEFAULT_LANGUAGE))
        .cloned()
        .unwrap_or_default()
}

fn browser_language() -> String {
    window()
        .and_then(|w| w.navigator().language())
        .and_then(|lang| lang.split('-').next().map(str::to_lowercase))
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

fn render_section(section: &SupportSection, titles: &HashMap<String, String>) -> Html {
    html! {
        <article id={section.id.clone()} class="support-card">
            <h2>{&section.title}</h2>
            { for section.content.split("\n\n").map(|paragraph| html! { <p>{paragraph}</p> }) }
            {
                if section.related.is_empty() {
                    html! {}
                } else {
                    html! {
                        <p class="related">
                            {"See also: "}
                            { for section.related.iter().filter_map(|id| {
                                let title = titles.get(id)?;
                                Some(html! { <a href={format!("#{}", id)}>{title}</a> })
                            }) }
                        </p>
                    }
                }
            }
        </article>
    }
}

#[function_component(Support)]
pub fn support() -> Html {
    let sections = use_memo(|_| load_sections(&browser_language()), ());
    let active_section = {
        let sections = sections.clone();
        use_state(move || sections.first().map(|s| s.id.clone()).unwrap_or_default())
    };
    let on_active = {
        let active_section = active_section.clone();
        Callback::from(move |id: String| active_section.set(id))
    };

    // Deep link on first render. Replace rather than push so the entry we landed
    // on is normalised instead of duplicated.
    {
        let on_active = on_active.clone();
        use_effect_with_deps(
            move |_| {
                let hash = BrowserHistory.current_hash();
                if !hash.is_empty() {
                    scroll_to_hash_with_retry(
                        &hash,
                        ScrollOptions { on_active: Some(on_active), ..ScrollOptions::default() },
                    );
                }
                || ()
            },
            (),
        );
    }

    // Back / forward between sections.
    {
        let on_active = on_active.clone();
        use_effect_with_deps(
            move |_| {
                let window = window();
                let on_popstate = Closure::wrap(Box::new(move || {
                    let hash = BrowserHistory.current_hash();
                    scroll_to_hash_with_retry(
                        &hash,
                        ScrollOptions {
                            behavior: ScrollBehavior::Auto,
                            on_active: Some(on_active.clone()),
                            ..ScrollOptions::default()
                        },
                    );
                }) as Box<dyn FnMut()>);

                if let Some(window) = &window {
                    let _ = window.add_event_listener_with_callback(
                        "popstate",
                        on_popstate.as_ref().unchecked_ref(),
                    );
                }

                move || {
                    if let Some(window) = window {
                        let _ = window.remove_event_listener_with_callback(
                            "popstate",
                            on_popstate.as_ref().unchecked_ref(),
                        );
                    }
                }
            },
            (),
        );
    }

    // `#id` links inside the content scroll under the sticky headers instead of
    // letting the browser jump.
    let on_content_click = {
        let sections = sections.clone();
        let on_active = on_active.clone();
        Callback::from(move |e: MouseEvent| {
            let anchor = e
                .target()
                .and_then(|target| target.dyn_into::<Element>().ok())
                .and_then(|element| element.closest("a").ok().flatten())
                .and_then(|element| element.dyn_into::<HtmlAnchorElement>().ok());
            let Some(section_id) = anchor.and_then(|a| section_id_from_hash(&a.hash())) else {
                return;
            };
            if sections.iter().any(|s| s.id == section_id) {
                e.prevent_default();
                scroll_to_section(&section_id, ScrollBehavior::Smooth, HashHistoryMode::Push, Some(&on_active));
            }
        })
    };

    let titles: HashMap<String, String> = sections
        .iter()
        .map(|s| (s.id.clone(), s.title.clone()))
        .collect();

    html! {
        <div class="support-page">
            <section class="support-hero">
                <AffiliateLink to={Route::Home} classes="back-link">
                    {"← Back to home"}
                </AffiliateLink>
                <h1>{"Support"}</h1>
                <p>{"Answers to the questions we hear most."}</p>
            </section>

            <section id={config::SUPPORT_TOC_ID} class="support-toc">
                <div class="toc-items">
                    { for sections.iter().map(|section| {
                        let id = section.id.clone();
                        let on_active = on_active.clone();
                        let onclick = Callback::from(move |_: MouseEvent| {
                            scroll_to_section(&id, ScrollBehavior::Smooth, HashHistoryMode::Push, Some(&on_active));
                        });
                        html! {
                            <button
                                class={classes!("toc-item", (*active_section == section.id).then(|| "active"))}
                                {onclick}
                            >
                                {&section.title}
                            </button>
                        }
                    }) }
                </div>
            </section>

            <section class="support-content" onclick={on_content_click}>
                { for sections.iter().map(|section| render_section(section, &titles)) }
            </section>

            <style>
                {r#"
                .support-page {
                    padding-top: 64px;
                    min-height: 100vh;
                    color: #ffffff;
                    background: #0a0a0f;
                }

                .support-hero {
                    padding: 3rem 2rem;
                    max-width: 900px;
                    margin: 0 auto;
                }

                .back-link {
                    color: #999;
                    text-decoration: none;
                }

                .support-toc {
                    position: sticky;
                    top: 64px;
                    z-index: 40;
                    background: rgba(10, 10, 15, 0.95);
                    backdrop-filter: blur(5px);
                    border-bottom: 1px solid rgba(255, 255, 255, 0.08);
                    padding: 1rem 0;
                }

                .toc-items {
                    display: flex;
                    gap: 0.5rem;
                    overflow-x: auto;
                    max-width: 900px;
                    margin: 0 auto;
                    padding: 0 2rem 0.5rem;
                }

                .toc-item {
                    white-space: nowrap;
                    padding: 0.5rem 1rem;
                    border-radius: 6px;
                    border: 1px solid rgba(255, 255, 255, 0.15);
                    background: transparent;
                    color: #ccc;
                    cursor: pointer;
                }

                .toc-item.active {
                    background: #ff4d00;
                    border-color: #ff4d00;
                    color: #fff;
                }

                .support-content {
                    max-width: 900px;
                    margin: 0 auto;
                    padding: 2rem;
                }

                .support-card {
                    padding: 1.5rem;
                    margin-bottom: 1.5rem;
                    border-radius: 12px;
                    background: rgba(30, 30, 30, 0.7);
                    scroll-margin-top: 8rem;
                }

                .support-card p {
                    color: #bbb;
                    line-height: 1.6;
                }

                .related a {
                    color: #ff4d00;
                    margin-right: 0.75rem;
                }
                "#}
            </style>
        </div>
    }
}
