//! UI overlays using bevy_egui

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use smartplace_core::model::preset_models;
use smartplace_core::{ModelSource, StreamStatus};
use smartplace_scene::{
    AppMode, ArSession, ArSettings, ErrorBanner, SnapshotInProgress, TransformCommand,
};

use crate::app::{show_message, ModelSelection, NO_MODEL_SELECTED};
use crate::file_picker::{trigger_model_upload, PendingFileResults};
use crate::network::{submit_prompt, PendingSearchResults, PromptState};
use crate::video::{CameraDialog, PendingDeviceList};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<UiLayout>()
            // UI layout updates run in Update
            .add_systems(Update, update_ui_layout)
            // UI systems run in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
            .add_systems(
                EguiPrimaryContextPass,
                (
                    selection_ui.run_if(in_state(AppMode::Selecting)),
                    ar_controls_ui.run_if(in_state(AppMode::Ar)),
                    error_banner_ui,
                )
                    .chain()
                    .run_if(overlay_visible),
            );
    }
}

/// UI layout settings for responsive design
#[derive(Debug, Clone, Resource)]
pub struct UiLayout {
    /// Current screen width
    pub screen_width: f32,
    /// Current screen height
    pub screen_height: f32,
    /// Whether we're on a small screen (mobile/tablet)
    pub is_mobile: bool,
    /// Scale factor for UI elements on mobile
    pub ui_scale: f32,
}

impl Default for UiLayout {
    fn default() -> Self {
        Self {
            screen_width: 1920.0,
            screen_height: 1080.0,
            is_mobile: false,
            ui_scale: 1.0,
        }
    }
}

impl UiLayout {
    /// Update layout based on screen dimensions
    pub fn update_for_screen(&mut self, width: f32, height: f32) {
        self.screen_width = width;
        self.screen_height = height;

        // Consider mobile if width < 800 or if it's a portrait orientation with width < 600
        self.is_mobile = width < 800.0 || (width < height && width < 600.0);

        // Scale up UI elements on mobile for better touch targets
        self.ui_scale = if self.is_mobile { 1.3 } else { 1.0 };
    }

    /// Width of the model selector panel
    pub fn panel_width(&self) -> f32 {
        if self.is_mobile {
            (self.screen_width * 0.9).min(420.0)
        } else {
            380.0
        }
    }
}

/// Update layout based on window size
fn update_ui_layout(windows: Query<&Window>, mut ui_layout: ResMut<UiLayout>) {
    if let Ok(window) = windows.single() {
        let width = window.width();
        let height = window.height();

        // Only update if dimensions changed significantly
        if (ui_layout.screen_width - width).abs() > 1.0
            || (ui_layout.screen_height - height).abs() > 1.0
        {
            ui_layout.update_for_screen(width, height);
        }
    }
}

/// Overlays are left out of frames captured by a snapshot
pub fn overlay_visible(snapshot: Option<Res<SnapshotInProgress>>) -> bool {
    snapshot.is_none()
}

/// Handle "Enter AR Mode": open the camera selector, or explain why not
pub fn request_ar_entry(
    selection: &ModelSelection,
    banner: &mut ErrorBanner,
    dialog: &mut CameraDialog,
    pending_devices: &PendingDeviceList,
) -> bool {
    banner.clear();
    if selection.selected.is_none() {
        show_message(banner, NO_MODEL_SELECTED);
        return false;
    }
    dialog.show(pending_devices);
    true
}

fn source_label(source: ModelSource) -> &'static str {
    match source {
        ModelSource::Preset => "Preset",
        ModelSource::Upload => "Uploaded file",
        ModelSource::Prompt => "Generated from prompt",
    }
}

fn selection_ui(
    mut commands: Commands,
    mut contexts: EguiContexts,
    mut selection: ResMut<ModelSelection>,
    mut prompt_state: ResMut<PromptState>,
    mut banner: ResMut<ErrorBanner>,
    mut camera_dialog: ResMut<CameraDialog>,
    mut next_state: ResMut<NextState<AppMode>>,
    settings: Res<ArSettings>,
    pending_search: Res<PendingSearchResults>,
    pending_files: Res<PendingFileResults>,
    pending_devices: Res<PendingDeviceList>,
    ui_layout: Res<UiLayout>,
) {
    let ui_scale = ui_layout.ui_scale;
    let panel_width = ui_layout.panel_width();

    // Get the egui context - early return if not available
    let Ok(ctx) = contexts.ctx_mut() else { return };

    egui::Window::new("SmartPlace3D")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            ui.set_width(panel_width);
            ui.label("Place 3D models in your room through the camera.");
            ui.add_space(8.0);

            // Presets
            ui.heading(egui::RichText::new("Choose a model").size(16.0 * ui_scale));
            ui.horizontal_wrapped(|ui| {
                for preset in preset_models() {
                    let selected = selection.is_selected(&preset.url);
                    let text = egui::RichText::new(format!("{} {}", preset.thumbnail, preset.name))
                        .size(14.0 * ui_scale);
                    if ui.selectable_label(selected, text).clicked() {
                        banner.clear();
                        selection.select(preset.to_resource());
                    }
                }
            });

            ui.add_space(8.0);
            ui.separator();

            // Prompt search
            ui.label(egui::RichText::new("Or describe one").size(14.0 * ui_scale));
            let response = ui.add_enabled(
                !prompt_state.searching,
                egui::TextEdit::singleline(&mut prompt_state.text)
                    .hint_text("e.g., wooden chair")
                    .desired_width(panel_width - 20.0),
            );
            ui.horizontal(|ui| {
                let submit_pressed =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                let can_submit = prompt_state.submittable().is_some();
                let clicked = ui
                    .add_enabled(
                        can_submit,
                        egui::Button::new(egui::RichText::new("Generate").size(14.0 * ui_scale)),
                    )
                    .clicked();
                if clicked || submit_pressed {
                    submit_prompt(&mut prompt_state, &settings, &pending_search, &mut banner);
                }
                if prompt_state.searching {
                    ui.spinner();
                    ui.label("Searching for a model...");
                }
            });

            ui.add_space(8.0);
            ui.separator();

            // Upload
            if ui
                .button(egui::RichText::new("Upload .glb / .gltf").size(14.0 * ui_scale))
                .clicked()
            {
                banner.clear();
                trigger_model_upload(&pending_files);
            }

            ui.add_space(8.0);
            ui.separator();

            // Selected model info
            match &selection.selected {
                Some(model) => {
                    ui.label(egui::RichText::new(format!("Selected: {}", model.display_name())).strong());
                    ui.label(
                        egui::RichText::new(source_label(model.source))
                            .size(11.0 * ui_scale)
                            .color(egui::Color32::GRAY),
                    );
                }
                None => {
                    ui.label(egui::RichText::new("No model selected").color(egui::Color32::GRAY));
                }
            }

            ui.add_space(12.0);
            let enter = ui.add_sized(
                [panel_width - 20.0, 32.0 * ui_scale],
                egui::Button::new(egui::RichText::new("Enter AR Mode").size(16.0 * ui_scale)),
            );
            if enter.clicked() {
                request_ar_entry(&selection, &mut banner, &mut camera_dialog, &pending_devices);
            }
        });

    // Camera selection modal
    if camera_dialog.open {
        egui::Window::new("Select Camera")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.set_min_width(300.0);

                if camera_dialog.loading {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Looking for cameras...");
                    });
                } else if camera_dialog.devices.is_empty() {
                    ui.colored_label(egui::Color32::YELLOW, "No cameras found");
                } else {
                    let devices = camera_dialog.devices.clone();
                    for (index, device) in devices.iter().enumerate() {
                        let selected = camera_dialog.selected.as_deref() == Some(device.id.as_str());
                        if ui
                            .radio(selected, device.display_label(index))
                            .clicked()
                        {
                            camera_dialog.selected = Some(device.id.clone());
                        }
                    }
                    if let Some(device) = camera_dialog.selected_device() {
                        ui.label(
                            egui::RichText::new(device.hint())
                                .size(11.0 * ui_scale)
                                .color(egui::Color32::GRAY),
                        );
                    }
                }

                ui.add_space(12.0);

                ui.horizontal(|ui| {
                    let can_start = !camera_dialog.loading && !camera_dialog.devices.is_empty();
                    if ui.add_enabled(can_start, egui::Button::new("Start AR")).clicked() {
                        match selection.session_request(camera_dialog.selected.clone()) {
                            Ok(request) => {
                                commands.insert_resource(request);
                                next_state.set(AppMode::Ar);
                            }
                            Err(message) => show_message(&mut banner, message),
                        }
                        camera_dialog.close();
                    }

                    if ui.button("Cancel").clicked() {
                        camera_dialog.close();
                    }
                });
            });
    }
}

fn ar_controls_ui(
    mut contexts: EguiContexts,
    session: Option<Res<ArSession>>,
    settings: Res<ArSettings>,
    ui_layout: Res<UiLayout>,
    mut transform_commands: MessageWriter<TransformCommand>,
    mut next_state: ResMut<NextState<AppMode>>,
) {
    let ui_scale = ui_layout.ui_scale;
    let Ok(ctx) = contexts.ctx_mut() else { return };
    let Some(session) = session else { return };
    let placed = session.is_placed();
    let scale_step = settings.0.transform.scale_step;

    // Status hints over the camera feed
    let status = if session.info.stream == StreamStatus::Requesting {
        Some(("Starting camera...", true))
    } else if !session.is_model_ready() {
        Some(("Loading model...", true))
    } else if !placed {
        Some(("Tap on the floor to place the model", false))
    } else {
        None
    };
    if let Some((text, busy)) = status {
        egui::Area::new(egui::Id::new("ar_status"))
            .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 24.0))
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        if busy {
                            ui.spinner();
                        }
                        ui.label(egui::RichText::new(text).size(15.0 * ui_scale));
                    });
                });
            });
    }

    egui::TopBottomPanel::bottom("ar_controls").show(ctx, |ui| {
        ui.add_space(4.0);
        ui.horizontal_wrapped(|ui| {
            let button = |label: &str| control_button(label, ui_scale);

            if ui.add_enabled(placed, button("⟳ Rotate")).clicked() {
                transform_commands.write(TransformCommand::Rotate);
            }
            if ui.add_enabled(placed, button("+ Scale")).clicked() {
                transform_commands.write(TransformCommand::Scale(scale_step));
            }
            if ui.add_enabled(placed, button("- Scale")).clicked() {
                transform_commands.write(TransformCommand::Scale(-scale_step));
            }
            if ui.add_enabled(placed, button("✕ Delete")).clicked() {
                transform_commands.write(TransformCommand::Delete);
            }
            if ui.add(button("Snapshot")).clicked() {
                transform_commands.write(TransformCommand::Snapshot);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.add(button("Exit AR")).clicked() {
                    next_state.set(AppMode::Selecting);
                }
            });
        });
        ui.add_space(4.0);
    });
}

fn control_button(label: &str, ui_scale: f32) -> egui::Button<'static> {
    egui::Button::new(egui::RichText::new(label).size(16.0 * ui_scale))
}

fn error_banner_ui(mut contexts: EguiContexts, mut banner: ResMut<ErrorBanner>) {
    let Some(message) = banner.0.clone() else { return };
    let Ok(ctx) = contexts.ctx_mut() else { return };

    egui::Area::new(egui::Id::new("error_banner"))
        .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 72.0))
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style())
                .fill(egui::Color32::from_rgb(120, 20, 20))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.colored_label(egui::Color32::WHITE, message);
                        if ui.small_button("✕").clicked() {
                            banner.clear();
                        }
                    });
                });
        });
}
