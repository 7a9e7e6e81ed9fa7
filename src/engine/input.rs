use crate::browser;
use anyhow::{anyhow, Result};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlCanvasElement, KeyboardEvent};

// DOM event names we listen on the canvas for
mod dom {
    pub const KEY_TYPED: &str = "keypress";
    pub const KEY_PRESSED: &str = "keydown";
    pub const FOCUS_IN: &str = "focusin";
    pub const FOCUS_OUT: &str = "focusout";
}

/// Everything the browser can tell the game between two frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// a character producing key, not yet filtered
    Typed(char),
    /// a control key, see `KeyCommand`
    Pressed(KeyCommand),
    FocusGained,
    FocusLost,
}

/// Control keys the command line understands
///
/// ┌────────────┬─────────────────────────────┐
/// │ DOM key    │ command line operation      │
/// ├────────────┼─────────────────────────────┤
/// │ Backspace  │ backspace()                 │
/// │ Enter      │ submit + clear()            │
/// │ End        │ set_cursor(capacity - 1)    │
/// │ Home       │ set_cursor(0)               │
/// │ ArrowLeft  │ shift_cursor(-1)            │
/// │ ArrowRight │ shift_cursor(1)             │
/// │ Delete     │ delete_character()          │
/// └────────────┴─────────────────────────────┘
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Backspace,
    Enter,
    End,
    Home,
    Left,
    Right,
    Delete,
}

impl KeyCommand {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "Backspace" => Some(KeyCommand::Backspace),
            "Enter" => Some(KeyCommand::Enter),
            "End" => Some(KeyCommand::End),
            "Home" => Some(KeyCommand::Home),
            "ArrowLeft" | "Left" => Some(KeyCommand::Left),
            "ArrowRight" | "Right" => Some(KeyCommand::Right),
            "Delete" | "Del" => Some(KeyCommand::Delete),
            _ => None,
        }
    }

    /// Keys whose browser default would interfere with typing
    /// - Backspace navigates back in some browsers, unloading the page
    pub fn suppresses_default(&self) -> bool {
        matches!(self, KeyCommand::Backspace)
    }
}

/// A keypress `key` value is a single character for printable keys and a
/// name ("Enter", "Shift") otherwise
pub fn typed_character(key: &str) -> Option<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(ch),
        _ => None,
    }
}

/// Wire keyboard and focus listeners on the canvas
/// - events are queued, the game loop drains them at the start of a tick
pub fn prepare_input(canvas: &HtmlCanvasElement) -> Result<UnboundedReceiver<InputEvent>> {
    let (sender, receiver) = unbounded::<InputEvent>();

    let typed_sender = sender.clone();
    let on_typed = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
        if let Some(ch) = typed_character(&event.key()) {
            send(&typed_sender, InputEvent::Typed(ch));
        }
    }) as Box<dyn FnMut(KeyboardEvent)>);

    let pressed_sender = sender.clone();
    let on_pressed = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
        if let Some(command) = KeyCommand::from_key(&event.key()) {
            if command.suppresses_default() {
                event.prevent_default();
            }
            send(&pressed_sender, InputEvent::Pressed(command));
        }
    }) as Box<dyn FnMut(KeyboardEvent)>);

    let focus_sender = sender.clone();
    let on_focus_in = browser::closure_wrap(Box::new(move |_event: web_sys::FocusEvent| {
        send(&focus_sender, InputEvent::FocusGained);
    }) as Box<dyn FnMut(web_sys::FocusEvent)>);

    let on_focus_out = browser::closure_wrap(Box::new(move |_event: web_sys::FocusEvent| {
        send(&sender, InputEvent::FocusLost);
    }) as Box<dyn FnMut(web_sys::FocusEvent)>);

    let listeners: [(&str, &JsValue); 4] = [
        (dom::KEY_TYPED, on_typed.as_ref()),
        (dom::KEY_PRESSED, on_pressed.as_ref()),
        (dom::FOCUS_IN, on_focus_in.as_ref()),
        (dom::FOCUS_OUT, on_focus_out.as_ref()),
    ];
    for (name, callback) in listeners {
        canvas
            .add_event_listener_with_callback(name, callback.unchecked_ref())
            .map_err(|err| anyhow!("Could not listen for '{}' : {:#?}", name, err))?;
    }

    // listeners live as long as the page
    on_typed.forget();
    on_pressed.forget();
    on_focus_in.forget();
    on_focus_out.forget();

    Ok(receiver)
}

fn send(sender: &UnboundedSender<InputEvent>, event: InputEvent) {
    if let Err(err) = sender.unbounded_send(event) {
        error!("Dropped input event : {:#?}", err);
    }
}

/// Take everything queued since the last frame, in arrival order
pub fn drain(receiver: &mut UnboundedReceiver<InputEvent>) -> Vec<InputEvent> {
    let mut events = Vec::new();
    // Err : nothing queued right now, or every sender is gone
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

/// Queue that never yields, for a canvas whose listeners could not be wired
pub fn disconnected() -> UnboundedReceiver<InputEvent> {
    unbounded().1
}
