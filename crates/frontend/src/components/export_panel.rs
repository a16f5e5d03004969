use dioxus::prelude::*;
use siteplan_editor::{EditorError, EditorSession, ExportSink, Notice, SceneSurface};
use siteplan_shared::interchange::FeatureCollection;

use crate::api;

/// Keeps the last exported document.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub document: Option<FeatureCollection>,
}

impl ExportSink for CollectingSink {
    fn export(&mut self, document: &FeatureCollection) -> Result<(), EditorError> {
        self.document = Some(document.clone());
        Ok(())
    }
}

/// Export, share and re-import annotations.
#[component]
pub fn ExportPanel(session: Signal<EditorSession<SceneSurface>>) -> Element {
    let mut session = session;
    let mut plan_name = use_signal(String::new);
    let mut exported = use_signal(|| None::<FeatureCollection>);
    let mut status = use_signal(|| None::<String>);
    let mut import_text = use_signal(String::new);

    let can_export = session.read().has_annotated_shapes();
    let json = exported
        .read()
        .as_ref()
        .and_then(|doc| doc.to_json().ok())
        .unwrap_or_default();

    rsx! {
        div { class: "panel",
            h3 { "Export" }
            input {
                r#type: "text",
                placeholder: "Plan name...",
                value: "{plan_name}",
                oninput: move |evt: Event<FormData>| plan_name.set(evt.value()),
            }
            div { style: "margin-top: 8px;",
                button {
                    disabled: !can_export,
                    title: if can_export { "" } else { "Name or tag a shape first" },
                    onclick: move |_| {
                        let mut sink = CollectingSink::default();
                        let result = session.write().export_annotations(&mut sink);
                        let Some(document) = sink.document.filter(|_| result.is_ok()) else {
                            if let Err(e) = result {
                                session.write().report(&e);
                            }
                            return;
                        };
                        exported.set(Some(document.clone()));
                        status.set(Some("Saving...".to_string()));
                        let name = plan_name.read().clone();
                        spawn(async move {
                            match api::save_annotations(&name, &document).await {
                                Ok(saved) => {
                                    status.set(Some(format!(
                                        "Saved \"{}\" ({} features) as {}",
                                        saved.name, saved.feature_count, saved.id
                                    )));
                                }
                                Err(e) => {
                                    status.set(None);
                                    session
                                        .write()
                                        .notify(Notice::warning(format!("Could not save annotations: {e}")));
                                }
                            }
                        });
                    },
                    "Export annotations"
                }
            }
            if let Some(text) = &*status.read() {
                p { class: "status", "{text}" }
            }
            if !json.is_empty() {
                div { class: "export-output",
                    textarea { readonly: true, rows: "8", value: "{json}" }
                    button {
                        class: "secondary",
                        onclick: {
                            let json = json.clone();
                            move |_| {
                                let json = json.clone();
                                wasm_bindgen_futures::spawn_local(async move {
                                    if let Some(window) = web_sys::window() {
                                        let clipboard = window.navigator().clipboard();
                                        let _ = wasm_bindgen_futures::JsFuture::from(
                                            clipboard.write_text(&json)
                                        ).await;
                                    }
                                });
                            }
                        },
                        "Copy"
                    }
                }
            }
        }

        div { class: "panel",
            h3 { "Import" }
            textarea {
                rows: "4",
                placeholder: "Paste an exported GeoJSON document",
                value: "{import_text}",
                oninput: move |evt: Event<FormData>| import_text.set(evt.value()),
            }
            button {
                class: "secondary",
                disabled: import_text.read().trim().is_empty(),
                onclick: move |_| {
                    let text = import_text.read().clone();
                    let result = session.write().load_document(&text);
                    match result {
                        Ok(ids) => {
                            import_text.set(String::new());
                            session
                                .write()
                                .notify(Notice::info(format!("Imported {} shape(s)", ids.len())));
                        }
                        Err(e) => session.write().report(&e),
                    }
                },
                "Load"
            }
        }
    }
}
