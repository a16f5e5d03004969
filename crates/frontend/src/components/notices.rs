use dioxus::prelude::*;
use gloo_timers::future::TimeoutFuture;
use siteplan_editor::{EditorSession, Notice, NoticeLevel, SceneSurface};

const NOTICE_TIMEOUT_MS: u32 = 4000;

fn level_class(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "notice info",
        NoticeLevel::Warning => "notice warning",
        NoticeLevel::Error => "notice error",
    }
}

/// Toasts for notices raised by the session. Each one disappears on its own.
#[component]
pub fn NoticeList(session: Signal<EditorSession<SceneSurface>>) -> Element {
    let mut session = session;
    let mut visible = use_signal(Vec::<(u64, Notice)>::new);
    let mut next_id = use_signal(|| 0u64);

    use_effect(move || {
        if session.read().notices().is_empty() {
            return;
        }
        let drained = session.write().take_notices();
        for notice in drained {
            let id = *next_id.peek();
            next_id.set(id + 1);
            visible.write().push((id, notice));
            spawn(async move {
                TimeoutFuture::new(NOTICE_TIMEOUT_MS).await;
                visible.write().retain(|(n, _)| *n != id);
            });
        }
    });

    rsx! {
        div { class: "notices",
            for (id, notice) in visible.read().iter().cloned() {
                div { key: "{id}", class: level_class(notice.level),
                    span { "{notice.message}" }
                    button {
                        class: "dismiss",
                        onclick: move |_| visible.write().retain(|(n, _)| *n != id),
                        "×"
                    }
                }
            }
        }
    }
}
