use dioxus::prelude::*;
use siteplan_editor::attributes::{FormField, FormOrigin};
use siteplan_editor::{EditorError, EditorSession, SceneSurface};

/// Message shown under a field that failed validation.
fn field_error(field: FormField) -> &'static str {
    match field {
        FormField::Name => "A name is required.",
        FormField::Type => "Choose a type first.",
        FormField::SubType => "Choose a valid sub-type.",
        FormField::AreaOverride => "Enter the area as a non-negative number of square meters.",
    }
}

fn blank_to_none(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.is_empty())
}

/// Modal bound to the shape whose attributes are being entered.
#[component]
pub fn AttributeForm(session: Signal<EditorSession<SceneSurface>>) -> Element {
    let mut session = session;
    let s = session.read();
    let Some(form) = s.form().cloned() else {
        return rsx! {};
    };
    let kind = s.store().get(form.target).map(|shape| shape.kind);
    let types: Vec<String> = s.vocabulary().type_tags().map(str::to_string).collect();
    let sub_types = s.sub_type_options().to_vec();
    let sub_type_enabled = s.sub_type_enabled();
    drop(s);

    let kind_label = kind
        .map(|k| k.to_string().to_lowercase())
        .unwrap_or_else(|| "shape".to_string());
    let heading = match form.origin {
        FormOrigin::Create => format!("New {kind_label}"),
        FormOrigin::Edit => format!("Edit {kind_label}"),
    };
    let show_area = kind.is_some_and(|k| k.is_areal());
    let computed = form.computed_area.map(|a| format!("Computed: {a:.2} m²"));
    let invalid = form.invalid;
    let values = form.values;
    let current_type = values.type_tag.clone().unwrap_or_default();
    let current_sub_type = values.sub_type_tag.clone().unwrap_or_default();

    let mut apply = move |result: Result<(), EditorError>| {
        if let Err(e) = result {
            session.write().report(&e);
        }
    };

    rsx! {
        div { class: "modal-backdrop",
            div { class: "modal", role: "dialog",
                h3 { "{heading}" }

                label { r#for: "shape-name", "Name" }
                input {
                    id: "shape-name",
                    r#type: "text",
                    class: if invalid == Some(FormField::Name) { "invalid" } else { "" },
                    placeholder: "e.g. Kitchen extension",
                    value: "{values.name}",
                    autofocus: true,
                    oninput: move |evt: Event<FormData>| {
                        let result = session.write().set_form_name(&evt.value());
                        apply(result);
                    },
                }
                if invalid == Some(FormField::Name) {
                    div { class: "field-error", {field_error(FormField::Name)} }
                }

                label { r#for: "shape-type", "Type" }
                select {
                    id: "shape-type",
                    value: "{current_type}",
                    onchange: move |evt: Event<FormData>| {
                        let value = evt.value();
                        let result = session.write().set_form_type(blank_to_none(&value));
                        apply(result);
                    },
                    option { value: "", selected: current_type.is_empty(), "(none)" }
                    for t in types {
                        option {
                            value: "{t}",
                            selected: t == current_type,
                            "{t}"
                        }
                    }
                }

                label { r#for: "shape-sub-type", "Sub-type" }
                select {
                    id: "shape-sub-type",
                    disabled: !sub_type_enabled,
                    value: "{current_sub_type}",
                    onchange: move |evt: Event<FormData>| {
                        let value = evt.value();
                        let result = session.write().set_form_sub_type(blank_to_none(&value));
                        apply(result);
                    },
                    option { value: "", selected: current_sub_type.is_empty(), "(none)" }
                    for sub in sub_types {
                        option {
                            value: "{sub}",
                            selected: sub == current_sub_type,
                            "{sub}"
                        }
                    }
                }

                if show_area {
                    label { r#for: "shape-area", "Area (m²)" }
                    input {
                        id: "shape-area",
                        r#type: "text",
                        inputmode: "decimal",
                        class: if invalid == Some(FormField::AreaOverride) { "invalid" } else { "" },
                        value: "{values.area}",
                        oninput: move |evt: Event<FormData>| {
                            let result = session.write().set_form_area(&evt.value());
                            apply(result);
                        },
                    }
                    if let Some(text) = computed {
                        div { class: "field-hint", "{text}" }
                    }
                    if invalid == Some(FormField::AreaOverride) {
                        div { class: "field-error", {field_error(FormField::AreaOverride)} }
                    }
                }

                div { class: "modal-actions",
                    button {
                        onclick: move |_| {
                            let result = session.write().save_form();
                            match result {
                                // Field stays highlighted; the form remains open
                                Ok(_) | Err(EditorError::Validation { .. }) => {}
                                Err(e) => session.write().report(&e),
                            }
                        },
                        "Save"
                    }
                    button {
                        class: "secondary",
                        onclick: move |_| session.write().cancel_form(),
                        "Cancel"
                    }
                }
            }
        }
    }
}
