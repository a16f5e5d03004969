use dioxus::prelude::*;
use siteplan_editor::host::{self, CapabilityLoader, ResizeListener, SurfaceFactory};
use siteplan_editor::overlay::OverlayTicket;
use siteplan_editor::surface::Capabilities;
use siteplan_editor::{EditorConfig, EditorSession, Notice, SceneSurface};
use siteplan_shared::models::{GeoPoint, Vocabulary};
use siteplan_shared::viewport::Viewport;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use crate::api::{self, PostcodesGeocoder};
use crate::components::attribute_form::AttributeForm;
use crate::components::export_panel::ExportPanel;
use crate::components::map_canvas::{MapCanvas, MAP_CONTAINER_ID};
use crate::components::notices::NoticeList;
use crate::components::toolbar::Toolbar;
use crate::coords;

type Session = Signal<EditorSession<SceneSurface>>;

/// Size used when the map container has not been laid out yet.
const FALLBACK_SIZE: (f64, f64) = (800.0, 600.0);

fn container_size() -> (f64, f64) {
    coords::container_rect(MAP_CONTAINER_ID)
        .map(|r| (r.width(), r.height()))
        .filter(|&(w, h)| w > 0.0 && h > 0.0)
        .unwrap_or(FALLBACK_SIZE)
}

/// Builds the retained scene the map canvas renders.
struct SceneFactory;

impl SurfaceFactory for SceneFactory {
    type Surface = SceneSurface;

    async fn create(&self, center: GeoPoint, zoom: f64) -> Result<SceneSurface, String> {
        if !center.is_finite() {
            return Err("invalid map center".to_string());
        }
        let (width, height) = container_size();
        Ok(SceneSurface::new(Viewport::new(center, zoom, width, height)))
    }
}

/// The browser scene implements every plugin natively.
struct BrowserCapabilities;

impl CapabilityLoader for BrowserCapabilities {
    async fn load(&self) -> Result<Capabilities, String> {
        Ok(Capabilities::full())
    }
}

/// `resize` listener on the window; removed on unmount.
struct WindowResize {
    callback: Option<Closure<dyn FnMut()>>,
}

impl WindowResize {
    fn install(session: Session) -> Option<Self> {
        let mut session = session;
        let callback = Closure::<dyn FnMut()>::new(move || {
            let (width, height) = container_size();
            if let Ok(mut s) = session.try_write() {
                s.handle_resize(width, height);
            }
        });
        web_sys::window()?
            .add_event_listener_with_callback("resize", callback.as_ref().unchecked_ref())
            .ok()?;
        Some(Self {
            callback: Some(callback),
        })
    }
}

impl ResizeListener for WindowResize {
    fn remove(&mut self) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        if let Some(window) = web_sys::window() {
            let _ = window
                .remove_event_listener_with_callback("resize", callback.as_ref().unchecked_ref());
        }
    }
}

/// Load `url` off-screen, then report its size and outcome under `ticket`.
fn preload_image(session: Session, ticket: OverlayTicket, url: &str) {
    let Ok(img) = web_sys::HtmlImageElement::new() else {
        tracing::warn!("Image element unavailable");
        return;
    };
    let mut on_load_session = session;
    let loaded = img.clone();
    let onload = Closure::once_into_js(move || {
        let (width, height) = (loaded.natural_width() as f64, loaded.natural_height() as f64);
        if let Ok(mut s) = on_load_session.try_write() {
            s.image_measured(ticket, width, height);
            s.image_loaded(ticket);
        }
    });
    let mut on_error_session = session;
    let onerror = Closure::once_into_js(move || {
        if let Ok(mut s) = on_error_session.try_write() {
            s.image_failed(ticket);
        }
    });
    img.set_onload(Some(onload.unchecked_ref::<js_sys::Function>()));
    img.set_onerror(Some(onerror.unchecked_ref::<js_sys::Function>()));
    img.set_src(url);
}

/// Editing page for one site. `postcode` centers the map when it resolves.
#[component]
pub fn Editor(postcode: Option<String>) -> Element {
    let mut session: Session =
        use_signal(|| EditorSession::new(EditorConfig::default(), Vocabulary::default()));
    let vocabulary = use_resource(|| api::fetch_vocabulary());
    let mut search = use_signal(|| postcode.clone().unwrap_or_default());
    let nav = navigator();

    use_effect(move || match &*vocabulary.read() {
        Some(Ok(vocab)) => session.write().set_vocabulary(vocab.clone()),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Vocabulary unavailable");
            session
                .write()
                .notify(Notice::warning("Type tags could not be loaded."));
        }
        None => {}
    });

    use_hook(move || {
        let postcode = postcode.clone();
        spawn(async move {
            let (config, cancel) = {
                let s = session.peek();
                (s.config().clone(), s.cancel_token())
            };
            let mounted = host::mount(
                &PostcodesGeocoder,
                &SceneFactory,
                &BrowserCapabilities,
                postcode.as_deref(),
                &config,
                &cancel,
            )
            .await;
            let handle = session;
            let Ok(mut s) = session.try_write() else {
                return;
            };
            match mounted {
                Ok(mounted) => {
                    s.on_mounted(mounted);
                    if let Some(listener) = WindowResize::install(handle) {
                        s.set_resize_listener(Box::new(listener));
                    }
                    // An image picked while the map was loading
                    let pending = s
                        .overlay()
                        .filter(|o| !o.loaded)
                        .map(|o| o.url.clone())
                        .zip(s.overlay_ticket());
                    drop(s);
                    if let Some((url, ticket)) = pending {
                        preload_image(handle, ticket, &url);
                    }
                }
                Err(e) => s.on_mount_failed(e),
            }
        });
    });

    use_drop(move || {
        if let Ok(mut s) = session.try_write() {
            s.unmount();
        }
    });

    let on_image = move |url: String| {
        let ticket = session.write().set_image(&url, 1.0);
        if let Some(ticket) = ticket {
            preload_image(session, ticket, &url);
        }
    };

    rsx! {
        div { class: "app-layout",
            header { class: "app-header",
                h1 { "Site Plan Annotator" }
                form {
                    class: "postcode-search",
                    onsubmit: move |evt: Event<FormData>| {
                        evt.prevent_default();
                        let postcode = search.read().trim().to_string();
                        if !postcode.is_empty() {
                            nav.push(crate::Route::Located { postcode });
                        }
                    },
                    input {
                        r#type: "text",
                        placeholder: "Postcode",
                        value: "{search}",
                        oninput: move |evt: Event<FormData>| search.set(evt.value()),
                    }
                    button { r#type: "submit", "Go" }
                }
            }
            div { class: "app-body",
                aside { class: "sidebar",
                    Toolbar { session, on_image }
                    ExportPanel { session }
                }
                main { class: "map-panel",
                    MapCanvas { session }
                }
            }
            AttributeForm { session }
            NoticeList { session }
        }
    }
}

