mod api;
mod components;
mod coords;
mod pages;

use dioxus::prelude::*;

#[derive(Routable, Clone, PartialEq)]
enum Route {
    #[route("/")]
    Home {},
    #[route("/at/:postcode")]
    Located { postcode: String },
}

#[component]
fn Home() -> Element {
    rsx! {
        pages::editor::Editor { postcode: None::<String> }
    }
}

#[component]
fn Located(postcode: String) -> Element {
    // Keyed so a new postcode remounts the map instead of reusing it
    rsx! {
        pages::editor::Editor { key: "{postcode}", postcode: Some(postcode.clone()) }
    }
}

const CSS: Asset = asset!("/assets/main.css");
const FAVICON: Asset = asset!("/assets/favicon.svg");

#[allow(non_snake_case)]
fn App() -> Element {
    rsx! {
        document::Link { rel: "icon", r#type: "image/svg+xml", href: FAVICON }
        document::Stylesheet { href: CSS }
        Router::<Route> {}
    }
}

fn main() {
    launch(App);
}
