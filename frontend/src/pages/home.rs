use yew::prelude::*;
use web_sys::{window, ScrollBehavior};

use crate::analytics::{self, ConversionEvent};
use crate::components::links::{AffiliateLink, PartnerLink};
use crate::hash_navigation::{scroll_to_hash_with_retry, scroll_to_section, HashHistoryMode, ScrollOptions};
use crate::Route;

struct PricingPlan {
    name: &'static str,
    price: &'static str,
    blurb: &'static str,
    features: &'static [&'static str],
    event: ConversionEvent,
    highlighted: bool,
}

const PLANS: &[PricingPlan] = &[
    PricingPlan {
        name: "DIY",
        price: "$29/mo",
        blurb: "For the solo workshop.",
        features: &["One location", "Unlimited tools", "Check-in / check-out log", "Email support"],
        event: ConversionEvent::PurchaseDiy,
        highlighted: false,
    },
    PricingPlan {
        name: "Pro",
        price: "$99/mo",
        blurb: "For crews that share gear.",
        features: &["Up to 5 locations", "Team seats", "Maintenance reminders", "Priority support"],
        event: ConversionEvent::PurchasePro,
        highlighted: true,
    },
];

const FEATURES: &[(&str, &str)] = &[
    ("Know where everything is", "Every tool gets a home, a history and a last-seen location."),
    ("Stop losing gear on jobs", "Check tools out to people and sites, get nudged when they don't come back."),
    ("Maintenance on schedule", "Blade changes, calibrations and inspections land on the calendar by themselves."),
    ("Works on the shop floor", "Scan a label with any phone. No app store detour."),
];

#[function_component(Home)]
pub fn home() -> Html {
    // `/#pricing` from another page: the section may render a few frames late.
    use_effect_with_deps(
        move |_| {
            if let Some(hash) = window()
                .and_then(|w| w.location().hash().ok())
                .filter(|hash| !hash.is_empty())
            {
                scroll_to_hash_with_retry(&hash, ScrollOptions::default());
            }
            || ()
        },
        (),
    );

    let see_features = Callback::from(|e: MouseEvent| {
        e.prevent_default();
        scroll_to_section("features", ScrollBehavior::Smooth, HashHistoryMode::Push, None);
    });

    let on_enterprise = Callback::from(|_: MouseEvent| {
        analytics::track(ConversionEvent::LeadEnterprise);
    });

    html! {
        <div class="home-page">
            <section class="hero">
                <h1>{"Your tools, accounted for."}</h1>
                <p class="hero-subtitle">
                    {"Madness Tools keeps track of every drill, saw and meter across your shop and job sites."}
                </p>
                <div class="hero-actions">
                    <PartnerLink event={ConversionEvent::SignUp} classes="cta-button">
                        {"Start free trial"}
                    </PartnerLink>
                    <a href="#features" class="secondary-button" onclick={see_features}>{"See features"}</a>
                </div>
            </section>

            <section id="features" class="features">
                <h2>{"Built for busy shops"}</h2>
                <div class="feature-grid">
                    { for FEATURES.iter().map(|(title, text)| html! {
                        <div class="feature-card">
                            <h3>{*title}</h3>
                            <p>{*text}</p>
                        </div>
                    }) }
                </div>
            </section>

            <section id="pricing" class="pricing">
                <h2>{"Pricing"}</h2>
                <div class="pricing-grid">
                    { for PLANS.iter().map(|plan| html! {
                        <div class={classes!("pricing-card", plan.highlighted.then(|| "highlighted"))}>
                            <h3>{plan.name}</h3>
                            <div class="price">{plan.price}</div>
                            <p>{plan.blurb}</p>
                            <ul>
                                { for plan.features.iter().map(|f| html! { <li>{*f}</li> }) }
                            </ul>
                            <PartnerLink event={plan.event} classes="cta-button">
                                {"Choose "}{plan.name}
                            </PartnerLink>
                        </div>
                    }) }
                    <div class="pricing-card">
                        <h3>{"Enterprise"}</h3>
                        <div class="price">{"Let's talk"}</div>
                        <p>{"Fleets, unions and rental yards."}</p>
                        <ul>
                            <li>{"Unlimited locations"}</li>
                            <li>{"SSO and audit exports"}</li>
                            <li>{"Dedicated onboarding"}</li>
                        </ul>
                        <a href="mailto:sales@madnesstools.com" class="cta-button" onclick={on_enterprise}>
                            {"Contact sales"}
                        </a>
                    </div>
                </div>
            </section>

            <section class="final-cta">
                <h2>{"Ready to stop hunting for tools?"}</h2>
                <PartnerLink event={ConversionEvent::SignUp} classes="cta-button">
                    {"Get started"}
                </PartnerLink>
                <p class="affiliate-note">
                    {"Run a channel or a trade school? "}
                    <AffiliateLink to={Route::Affiliates}>{"Join the partner program"}</AffiliateLink>
                </p>
            </section>

            <style>
                {r#"
                .home-page {
                    padding-top: 74px;
                    color: #ffffff;
                    background: #0a0a0f;
                }

                .hero {
                    text-align: center;
                    padding: 6rem 2rem 4rem;
                    background: linear-gradient(to bottom, rgba(255, 77, 0, 0.06), transparent);
                }

                .hero h1 {
                    font-size: 3.5rem;
                    margin-bottom: 1.5rem;
                }

                .hero-subtitle {
                    font-size: 1.2rem;
                    color: #999;
                    max-width: 640px;
                    margin: 0 auto 2rem;
                }

                .hero-actions {
                    display: flex;
                    gap: 1rem;
                    justify-content: center;
                }

                .cta-button {
                    display: inline-block;
                    padding: 0.9rem 1.8rem;
                    border-radius: 8px;
                    background: #ff4d00;
                    color: #fff;
                    text-decoration: none;
                    font-weight: 600;
                }

                .secondary-button {
                    display: inline-block;
                    padding: 0.9rem 1.8rem;
                    border-radius: 8px;
                    border: 1px solid rgba(255, 255, 255, 0.2);
                    color: #fff;
                    text-decoration: none;
                }

                .features, .pricing, .final-cta {
                    max-width: 1100px;
                    margin: 0 auto;
                    padding: 4rem 2rem;
                }

                .feature-grid, .pricing-grid {
                    display: grid;
                    grid-template-columns: repeat(auto-fit, minmax(240px, 1fr));
                    gap: 1.5rem;
                }

                .feature-card, .pricing-card {
                    padding: 1.5rem;
                    border-radius: 12px;
                    background: rgba(30, 30, 30, 0.7);
                    border: 1px solid rgba(255, 77, 0, 0.1);
                }

                .pricing-card.highlighted {
                    border-color: #ff4d00;
                }

                .price {
                    font-size: 2rem;
                    font-weight: 700;
                    margin: 0.5rem 0;
                }

                .final-cta {
                    text-align: center;
                }

                .affiliate-note {
                    margin-top: 2rem;
                    color: #999;
                }

                .affiliate-note a {
                    color: #ff4d00;
                }

                @media (max-width: 768px) {
                    .hero h1 {
                        font-size: 2.4rem;
                    }

                    .hero-actions {
                        flex-direction: column;
                    }
                }
                "#}
            </style>
        </div>
    }
}
