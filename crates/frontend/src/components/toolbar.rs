use dioxus::prelude::*;
use siteplan_editor::{EditorMode, EditorSession, SceneSurface};
use siteplan_shared::models::ShapeKind;
use wasm_bindgen::JsCast;

const FILE_INPUT_ID: &str = "overlay-file";

/// Object URL for the file picked in the overlay file input.
fn picked_file_url() -> Option<String> {
    let input = web_sys::window()?
        .document()?
        .get_element_by_id(FILE_INPUT_ID)?
        .dyn_into::<web_sys::HtmlInputElement>()
        .ok()?;
    let file = input.files()?.get(0)?;
    web_sys::Url::create_object_url_with_blob(&file).ok()
}

/// Accept only absolute http(s) URLs or object URLs from the file picker.
fn valid_image_url(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("https://") || url.starts_with("http://") || url.starts_with("blob:")
}

fn tool_hint(tool: Option<ShapeKind>) -> &'static str {
    match tool {
        None => "Drag to pan the map.",
        Some(ShapeKind::Marker) => "Click to place a marker.",
        Some(ShapeKind::Polyline) => "Click to add points, double-click or Enter to finish.",
        Some(ShapeKind::Polygon) => "Click to add corners, double-click or Enter to close.",
        Some(ShapeKind::Rectangle) => "Click two opposite corners.",
        Some(ShapeKind::Circle) => "Click the center, then a point on the rim.",
    }
}

#[component]
pub fn Toolbar(session: Signal<EditorSession<SceneSurface>>, on_image: EventHandler<String>) -> Element {
    let mut session = session;
    let mut url_input = use_signal(String::new);

    let s = session.read();
    let mode = s.mode();
    let ready = s.is_ready();
    let draw_tools = !ready || s.capabilities().draw_tools;
    let palette = s.palette().clone();
    let draft_points = s.draft().map(|d| d.points().len());
    let opacity = s.overlay().map(|o| o.opacity);
    let overlay_static = s.overlay().is_some_and(|o| o.is_static);
    drop(s);

    let url_ok = valid_image_url(&url_input.read());

    rsx! {
        div { class: "panel",
            h3 { "Mode" }
            div { class: "mode-toggle",
                for target in [EditorMode::Transform, EditorMode::Annotate] {
                    button {
                        class: if mode == target { "active" } else { "" },
                        onclick: move |_| {
                            let result = session.write().set_mode(target);
                            if let Err(e) = result {
                                session.write().report(&e);
                            }
                        },
                        "{target}"
                    }
                }
            }
            if overlay_static && mode == EditorMode::Transform {
                p { class: "note", "This image cannot be moved or distorted." }
            }
        }

        if mode == EditorMode::Annotate {
            div { class: "panel",
                h3 { "Draw" }
                if !draw_tools {
                    p { class: "note", "Drawing tools are unavailable. The map can only be panned." }
                } else {
                    div { class: "tool-grid",
                        button {
                            class: if palette.active_tool.is_none() { "active" } else { "" },
                            onclick: move |_| session.write().select_tool(None),
                            "Pan"
                        }
                        for tool in palette.tools.iter().copied() {
                            button {
                                class: if palette.active_tool == Some(tool) { "active" } else { "" },
                                onclick: move |_| session.write().select_tool(Some(tool)),
                                "{tool}"
                            }
                        }
                    }
                    p { class: "hint", {tool_hint(palette.active_tool)} }
                    label { class: "checkbox",
                        input {
                            r#type: "checkbox",
                            checked: palette.edit_enabled,
                            onchange: move |evt: Event<FormData>| {
                                session.write().set_edit_enabled(evt.checked());
                            },
                        }
                        "Edit existing shapes"
                    }
                    if let Some(count) = draft_points {
                        div { class: "draft-actions",
                            span { "{count} point(s)" }
                            button {
                                onclick: move |_| {
                                    let result = session.write().finish_drawing();
                                    if let Err(e) = result {
                                        session.write().report(&e);
                                    }
                                },
                                "Finish"
                            }
                            button {
                                class: "secondary",
                                onclick: move |_| {
                                    session.write().undo_point();
                                },
                                "Undo point"
                            }
                            button {
                                class: "secondary",
                                onclick: move |_| session.write().cancel_drawing(),
                                "Cancel"
                            }
                        }
                    }
                }
            }
        }

        div { class: "panel",
            h3 { "Plan image" }
            input {
                id: FILE_INPUT_ID,
                r#type: "file",
                accept: "image/*",
                onchange: move |_| {
                    match picked_file_url() {
                        Some(url) => on_image.call(url),
                        None => tracing::warn!("No readable file selected"),
                    }
                },
            }
            div { class: "url-row",
                input {
                    r#type: "text",
                    placeholder: "https://example.com/plan.png",
                    value: "{url_input}",
                    oninput: move |evt: Event<FormData>| url_input.set(evt.value()),
                }
                button {
                    disabled: !url_ok,
                    onclick: move |_| {
                        let url = url_input.read().trim().to_string();
                        on_image.call(url);
                    },
                    "Place"
                }
            }
            if let Some(value) = opacity {
                label { r#for: "overlay-opacity", "Opacity" }
                input {
                    id: "overlay-opacity",
                    r#type: "range",
                    min: "0.1",
                    max: "1",
                    step: "0.05",
                    value: "{value}",
                    oninput: move |evt: Event<FormData>| {
                        if let Ok(v) = evt.value().parse::<f64>() {
                            let result = session.write().set_overlay_opacity(v);
                            if let Err(e) = result {
                                session.write().report(&e);
                            }
                        }
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_image_url() {
        assert!(valid_image_url("https://example.com/plan.png"));
        assert!(valid_image_url(" blob:http://localhost/1234 "));
        assert!(!valid_image_url(""));
        assert!(!valid_image_url("javascript:alert(1)"));
        assert!(!valid_image_url("plan.png"));
    }

    #[test]
    fn test_every_tool_has_a_hint() {
        assert!(!tool_hint(None).is_empty());
        for kind in ShapeKind::ALL {
            assert!(!tool_hint(Some(kind)).is_empty());
        }
    }
}
