//! Selected files with thumbnails, sizes and remove buttons.

use leptos::*;

use crate::workflow::{FileEntry, FileId};

#[component]
pub fn FileList(
    files: Memo<Vec<FileEntry>>,
    #[prop(into)] on_remove: Callback<FileId>,
) -> impl IntoView {
    view! {
        <div class="file-list">
            <Show
                when=move || !files.get().is_empty()
                fallback=|| view! { <div class="file-list-empty">"No files selected"</div> }
            >
                <For
                    each=move || files.get()
                    key=|entry| entry.id
                    children=move |entry| {
                        let id = entry.id;
                        let thumbnail = match (&entry.preview_url, entry.is_image) {
                            (Some(url), true) => view! {
                                <img class="file-thumb" src=url.clone() alt=entry.name.clone()/>
                            }.into_view(),
                            _ => view! { <span class="file-icon">"📄"</span> }.into_view(),
                        };
                        view! {
                            <div class="file-item">
                                {thumbnail}
                                <span class="file-name" title=entry.name.clone()>{entry.name.clone()}</span>
                                <span class="file-size">{entry.size_label()}</span>
                                <button
                                    class="file-remove"
                                    title="Remove file"
                                    on:click=move |_| on_remove.call(id)
                                >
                                    "✕"
                                </button>
                            </div>
                        }
                    }
                />
            </Show>
        </div>
    }
}
