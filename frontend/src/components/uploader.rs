//! Waybill upload section: model choice, drag & drop, file list,
//! process and download buttons.
//!
//! All state lives in the [`BrowserController`]; this component only
//! renders it. The controller's change notification bumps a revision
//! signal that the memos below depend on.

use leptos::*;
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, Event, HtmlInputElement};

use super::FileList;
use crate::services::{files_from_list, BrowserController};
use crate::workflow::FileId;
use crate::{ModelId, WorkflowStatus};

const FILE_INPUT_ID: &str = "waybillInput";
const ACCEPT: &str = "image/*,.jpeg,.jpg,.png,.pdf";

#[component]
pub fn UploadSection(controller: BrowserController) -> impl IntoView {
    let controller = store_value(controller);
    let (revision, set_revision) = create_signal(0u64);
    let (drag_active, set_drag_active) = create_signal(false);

    controller.with_value(|c| {
        c.subscribe(move || set_revision.update(|r| *r = r.wrapping_add(1)));
    });

    // Model listing runs once, at mount
    spawn_local({
        let c = controller.get_value();
        async move {
            let _ = c.load_models().await;
        }
    });

    on_cleanup(move || controller.with_value(|c| c.teardown()));

    let status = create_memo(move |_| {
        let _ = revision.get();
        controller.with_value(|c| c.status())
    });
    let files = create_memo(move |_| {
        let _ = revision.get();
        controller.with_value(|c| c.files())
    });
    let models = create_memo(move |_| {
        let _ = revision.get();
        controller.with_value(|c| c.models())
    });
    let selected_model = create_memo(move |_| {
        let _ = revision.get();
        controller.with_value(|c| c.selected_model())
    });
    let is_busy = move || status.get().is_busy();

    // Handlers

    let add_from_list = move |list: Option<web_sys::FileList>| {
        if let Some(list) = list {
            let selected = files_from_list(&list);
            if !selected.is_empty() {
                controller.with_value(|c| c.add_files(selected));
            }
        }
    };

    let on_file_change = move |ev: Event| {
        let input: HtmlInputElement = event_target(&ev);
        add_from_list(input.files());
        // Allow picking the same file again
        input.set_value("");
    };

    let on_drop = move |ev: DragEvent| {
        ev.prevent_default();
        set_drag_active.set(false);
        add_from_list(ev.data_transfer().and_then(|dt| dt.files()));
    };

    let on_drag_over = move |ev: DragEvent| {
        ev.prevent_default();
        set_drag_active.set(true);
    };

    let trigger_file_input = move |_| {
        if let Some(window) = web_sys::window() {
            if let Some(document) = window.document() {
                if let Some(input) = document.get_element_by_id(FILE_INPUT_ID) {
                    if let Some(html_input) = input.dyn_ref::<HtmlInputElement>() {
                        html_input.click();
                    }
                }
            }
        }
    };

    let on_model_change = move |ev: Event| {
        let value = event_target_value(&ev);
        controller.with_value(|c| c.select_model(Some(ModelId::new(value))));
    };

    let on_remove = move |id: FileId| {
        controller.with_value(|c| c.remove_file(id));
    };

    let on_submit = move |_| {
        let c = controller.get_value();
        spawn_local(async move {
            if let Err(e) = c.submit().await {
                log::debug!("Submit ended with error: {}", e);
            }
        });
    };

    let on_download = move |_| {
        let c = controller.get_value();
        spawn_local(async move {
            if let Err(e) = c.download().await {
                log::debug!("Download ended with error: {}", e);
            }
        });
    };

    let on_dismiss = move |_| controller.with_value(|c| c.dismiss());

    view! {
        <div class="uploader">
            <div class="uploader-grid">
                <div class="uploader-column">
                    <h3 class="step-title">"1. Select Extraction Model"</h3>
                    <select
                        class="model-select"
                        on:change=on_model_change
                        prop:value=move || {
                            selected_model.get().map(|id| id.to_string()).unwrap_or_default()
                        }
                    >
                        <Show
                            when=move || models.get().is_empty()
                            fallback=|| view! { }
                        >
                            <option value="" disabled=true>
                                {move || if status.get() == WorkflowStatus::Fetching {
                                    "Loading models..."
                                } else {
                                    "No extraction models available"
                                }}
                            </option>
                        </Show>
                        <For
                            each=move || models.get()
                            key=|model| model.id.clone()
                            children=move |model| {
                                let id = model.id.clone();
                                view! {
                                    <option
                                        value=model.id.to_string()
                                        selected=move || selected_model.get().as_ref() == Some(&id)
                                        title=model.description.clone().unwrap_or_default()
                                    >
                                        {model.name}
                                    </option>
                                }
                            }
                        />
                    </select>

                    <h3 class="step-title">"2. Upload Waybill Images"</h3>
                    <div
                        class="upload-section"
                        class:drag-active=move || drag_active.get()
                        on:click=trigger_file_input
                        on:dragover=on_drag_over
                        on:dragleave=move |_| set_drag_active.set(false)
                        on:drop=on_drop
                    >
                        <div class="upload-icon">"☁️"</div>
                        <div class="upload-text">
                            {move || if drag_active.get() {
                                "Drop files here"
                            } else {
                                "Drag and drop waybill images here"
                            }}
                        </div>
                        <div class="upload-hint">"or click to select files (JPEG, PNG, PDF)"</div>
                        <input
                            type="file"
                            id=FILE_INPUT_ID
                            accept=ACCEPT
                            multiple=true
                            style="display:none"
                            on:change=on_file_change
                            on:click=|ev| ev.stop_propagation()
                        />
                    </div>
                </div>

                <div class="uploader-column">
                    <h3 class="step-title">"3. Selected Files"</h3>
                    <FileList files=files on_remove=on_remove/>
                </div>
            </div>

            <Show
                when=move || status.get().error().is_some()
                fallback=|| view! { }
            >
                <div class=move || format!("notice {}", status.get().css_class())>
                    <span>{move || status.get().error().unwrap_or_default().to_string()}</span>
                    <button class="notice-close" on:click=on_dismiss>"✕"</button>
                </div>
            </Show>

            <Show
                when=move || status.get() == WorkflowStatus::Succeeded
                fallback=|| view! { }
            >
                <div class=move || format!("notice {}", status.get().css_class())>
                    <span>"Files uploaded successfully! You can now download the extracted data."</span>
                    <button class="notice-close" on:click=on_dismiss>"✕"</button>
                </div>
            </Show>

            <h3 class="step-title">"4. Process & Download"</h3>
            <div class="actions">
                <button
                    class="upload-button"
                    on:click=on_submit
                    disabled=move || files.get().is_empty() || is_busy()
                >
                    {move || if status.get() == WorkflowStatus::Submitting {
                        "⏳ Uploading..."
                    } else {
                        "Upload & Process Files"
                    }}
                </button>
                <button
                    class="download-button"
                    on:click=on_download
                    disabled=is_busy
                >
                    {move || if status.get() == WorkflowStatus::Downloading {
                        "⏳ Downloading..."
                    } else {
                        "Download Excel"
                    }}
                </button>
            </div>
        </div>
    }
}
