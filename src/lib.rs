// ==================== Imports ====================
use wasm_bindgen::prelude::*;

#[macro_use]
mod browser;
pub mod command_line;
pub mod engine;
pub mod font;
pub mod game;
pub mod sprite;

use engine::GameLoop;
use game::Adventure;

// ==================== Main Functions ====================
/// Main entry for Webassembly module
/// - installs the panic hook
/// - loads the scene
/// - starts the frame loop, or logs why it could not
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();

    browser::spawn_local(async move {
        if let Err(err) = GameLoop::start(Adventure::new()).await {
            error!("Could not start game : {:#?}", err);
        }
    });

    Ok(())
}
