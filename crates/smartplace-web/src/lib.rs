//! SmartPlace3D Web - browser AR frontend
//!
//! Runs the AR scene in a canvas on top of the device camera, with an egui
//! overlay for model selection and transform controls.

mod app;
mod file_picker;
mod network;
mod ui;
mod video;

use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    // Set panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging with filtering to reduce wgpu noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build()
    );

    // Run the Bevy app
    app::run();
}
