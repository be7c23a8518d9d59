use yew::prelude::*;

use crate::analytics::ConversionEvent;
use crate::components::links::{AffiliateLink, PartnerLink};
use crate::Route;

#[function_component(Footer)]
pub fn footer() -> Html {
    html! {
        <footer class="site-footer">
            <div class="footer-grid">
                <div>
                    <h3 class="footer-brand">{"Madness Tools"}</h3>
                    <p>{"Tool tracking for shops, crews and job sites."}</p>
                </div>
                <div>
                    <h4>{"Quick links"}</h4>
                    <ul>
                        <li><AffiliateLink to={Route::Home}>{"Home"}</AffiliateLink></li>
                        <li><AffiliateLink to={Route::Support}>{"Support"}</AffiliateLink></li>
                        <li><AffiliateLink to={Route::Affiliates}>{"Partner program"}</AffiliateLink></li>
                        <li><PartnerLink>{"Try Madness Tools"}</PartnerLink></li>
                    </ul>
                </div>
                <div>
                    <h4>{"Get started"}</h4>
                    <p>{"Set up your first location in a few minutes."}</p>
                    <PartnerLink event={ConversionEvent::SignUp} classes="footer-cta">
                        {"Start free trial"}
                    </PartnerLink>
                </div>
            </div>
            <p class="footer-copyright">{"© Madness Tools. All rights reserved."}</p>

            <style>
                {r#"
                .site-footer {
                    padding: 3rem 2rem;
                    background: #0d0d12;
                    border-top: 1px solid rgba(255, 255, 255, 0.08);
                    color: #999;
                }

                .footer-grid {
                    max-width: 1100px;
                    margin: 0 auto;
                    display: grid;
                    grid-template-columns: repeat(auto-fit, minmax(220px, 1fr));
                    gap: 2rem;
                }

                .site-footer ul {
                    list-style: none;
                    padding: 0;
                }

                .site-footer a {
                    color: #ccc;
                    text-decoration: none;
                }

                .footer-brand {
                    color: #ff4d00;
                }

                .footer-cta {
                    display: inline-block;
                    padding: 0.5rem 1.5rem;
                    border-radius: 8px;
                    background: #ff4d00;
                    color: #fff !important;
                }

                .footer-copyright {
                    text-align: center;
                    margin-top: 2rem;
                    font-size: 0.85rem;
                }
                "#}
            </style>
        </footer>
    }
}
