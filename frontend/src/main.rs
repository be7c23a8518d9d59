use yew::prelude::*;
use yew_router::prelude::*;
use log::{info, Level};
use web_sys::{window, MouseEvent, ScrollBehavior};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

mod config;
mod analytics;
mod frames;
mod hash_navigation;
mod affiliate {
    pub mod storage;
    pub mod tracker;
    pub mod navigation;
    pub mod rewriter;
}
mod components {
    pub mod links;
    pub mod footer;
}
mod pages {
    pub mod home;
    pub mod support;
    pub mod affiliates;
}

use affiliate::{
    navigation::{AffiliateNavigation, Navigation},
    rewriter::LinkRewriter,
    tracker::AffiliateTracker,
};
use components::links::{AffiliateLink, PartnerLink};
use components::footer::Footer;
use hash_navigation::{scroll_to_section, HashHistoryMode};
use pages::{
    home::Home,
    support::Support,
    affiliates::Affiliates,
};
use analytics::ConversionEvent;


#[derive(Clone, Routable, PartialEq)]
pub enum Route {
    #[at("/")]
    Home,
    #[at("/support")]
    Support,
    #[at("/affiliates")]
    Affiliates,
    #[not_found]
    #[at("/404")]
    NotFound,
}


fn switch(routes: Route) -> Html {
    match routes {
        Route::Home => {
            info!("Rendering Home page");
            html! { <Home /> }
        },
        Route::Support => {
            info!("Rendering Support page");
            html! { <Support /> }
        },
        Route::Affiliates => {
            info!("Rendering Affiliates page");
            html! { <Affiliates /> }
        },
        Route::NotFound => {
            info!("Rendering NotFound page");
            html! {
                <div class="not-found">
                    <h1>{"Page not found"}</h1>
                    <AffiliateLink to={Route::Home}>{"Back to home"}</AffiliateLink>
                </div>
            }
        },
    }
}


#[function_component(Nav)]
pub fn nav() -> Html {
    let menu_open = use_state(|| false);
    let is_scrolled = use_state(|| false);
    let route = use_route::<Route>();

    {
        let is_scrolled = is_scrolled.clone();
        use_effect_with_deps(move |_| {
            let window = window();
            let scroll_callback = {
                let window = window.clone();
                Closure::wrap(Box::new(move || {
                    let scroll_y = window.as_ref().and_then(|w| w.scroll_y().ok()).unwrap_or(0.0);
                    is_scrolled.set(scroll_y > 10.0);
                }) as Box<dyn FnMut()>)
            };

            if let Some(window) = &window {
                let _ = window.add_event_listener_with_callback("scroll", scroll_callback.as_ref().unchecked_ref());
            }

            move || {
                if let Some(window) = window {
                    let _ = window.remove_event_listener_with_callback("scroll", scroll_callback.as_ref().unchecked_ref());
                }
            }
        }, ());
    }

    let toggle_menu = {
        let menu_open = menu_open.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            menu_open.set(!*menu_open);
        })
    };

    // Sections live on the home page. Elsewhere we load `/#section` with the
    // affiliate ids carried along.
    let go_to_section = |section_id: &'static str| {
        let menu_open = menu_open.clone();
        let on_home = route == Some(Route::Home);
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            menu_open.set(false);
            if on_home {
                scroll_to_section(section_id, ScrollBehavior::Smooth, HashHistoryMode::Push, None);
            } else {
                let tracker = AffiliateTracker::browser();
                let target = tracker.append_to_path(&format!("/#{}", section_id), None);
                AffiliateNavigation::browser().assign(&target);
            }
        })
    };

    let menu_class = if *menu_open {
        "nav-right mobile-menu-open"
    } else {
        "nav-right"
    };

    html! {
        <nav class={classes!("top-nav", (*is_scrolled).then(|| "scrolled"))}>
            <div class="nav-content">
                <AffiliateLink to={Route::Home} classes="nav-logo">
                    {"Madness Tools"}
                </AffiliateLink>

                <button class="burger-menu" onclick={toggle_menu}>
                    <span></span>
                    <span></span>
                    <span></span>
                </button>
                <div class={menu_class}>
                    <a href="/#features" class="nav-link" onclick={go_to_section("features")}>
                        {"Features"}
                    </a>
                    <a href="/#pricing" class="nav-link" onclick={go_to_section("pricing")}>
                        {"Pricing"}
                    </a>
                    <AffiliateLink to={Route::Support} classes="nav-link">
                        {"Support"}
                    </AffiliateLink>
                    <AffiliateLink to={Route::Affiliates} classes="nav-link">
                        {"Partners"}
                    </AffiliateLink>
                    <PartnerLink event={ConversionEvent::SignUp} classes="nav-login-button">
                        {"Get started"}
                    </PartnerLink>
                </div>
            </div>
        </nav>
    }
}


/// Jumps back to the top on route changes, unless the new URL points at a section.
#[function_component(ScrollToTop)]
fn scroll_to_top() -> Html {
    let route = use_route::<Route>();

    use_effect_with_deps(move |_| {
        if let Some(window) = window() {
            let hash = window.location().hash().unwrap_or_default();
            if hash.is_empty() {
                window.scroll_to_with_x_and_y(0.0, 0.0);
            }
        }
        || ()
    }, route);

    html! {}
}


#[function_component]
fn App() -> Html {
    use_effect_with_deps(move |_| {
        let rewriter = LinkRewriter::install(AffiliateTracker::browser(), None);
        move || rewriter.teardown()
    }, ());

    html! {
        <BrowserRouter>
            <Nav />
            <ScrollToTop />
            <Switch<Route> render={switch} />
            <Footer />
        </BrowserRouter>
    }
}


fn main() {
    // Initialize console error panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging
    console_log::init_with_level(Level::Info).expect("error initializing log");

    // Capture ?via= / ?referral= before anything renders so storage is current.
    let params = AffiliateTracker::browser().resolve(None);
    if let Some(id) = params.effective() {
        info!("Visit attributed to affiliate {}", id);
    }

    info!("Starting application");
    yew::Renderer::<App>::new().render();
}
