use crate::browser;
use crate::command_line::{is_accepted, LineBuffer};
use crate::engine::clock::{cursor_visible, FlickerPolicy};
use crate::engine::input::{InputEvent, KeyCommand};
use crate::engine::{self, Game, Image, Point, Rect, Renderer, Size, Sound};
use crate::font::{self, BitmapFont, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::sprite::{Sheet, SpritePlacement, SpriteSheet};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::join;
use serde::{Deserialize, Serialize};
use web_sys::HtmlImageElement;

/// ┌───────────────────────── Frame Overview ────────────────────────────────┐
/// │                                                                         │
/// │  keypress / keydown / focusin / focusout                                │
/// │        │                                                                │
/// │        ▼                                                                │
/// │  ┌────────────┐  handle_input  ┌─────────────┐  handle  ┌────────────┐  │
/// │  │ GameLoop   ├───────────────►│ Adventure   ├─────────►│ Session    │  │
/// │  │ (engine)   │  update(delta) │ (Loaded)    │          │ LineBuffer │  │
/// │  │            ├───────────────►│             │          │ focus      │  │
/// │  │            │  draw          │             │◄─────────┤ blink time │  │
/// │  └────────────┘                └─────────────┘   read   └────────────┘  │
/// │                                                                         │
/// │  Draw order, back to front :                                            │
/// │    background -> sprites -> menu bar -> command box -> focus alert      │
/// └─────────────────────────────────────────────────────────────────────────┘
pub enum Adventure {
    /// Assets and scene config still loading
    Loading,

    /// Everything loaded, session running
    Loaded(Scene),
}

// Paths are relative to the page hosting the wasm module
mod assets {
    pub const SCENE: &str = "scene.json";
    pub const BACKGROUND: &str = "Cloak-Skeleton.png";
    pub const FOCUS_INDICATOR: &str = "Focus-Indicator.png";
    pub const SPRITES: &str = "sprites.png";
    pub const FONT: &str = "font.png";
    pub const MUSIC: &str = "theme.ogg";
}

mod layout {
    pub const MENU_HEIGHT: i16 = 16;
    pub const MENU_BUTTON_X: i16 = 190;
    pub const MENU_BUTTON_SPACING: i16 = 9;
    pub const INDICATOR_SIZE: i16 = 9;
    pub const INDICATOR_MARGIN: i16 = 3;
    pub const COMMAND_BOX_X: i16 = 16;
    pub const COMMAND_BOX_BOTTOM: i16 = 16;
    pub const ALERT_PADDING: i16 = 8;

    pub const MENU_COLOR: &str = "rgb(191, 191, 191)";
    pub const CURSOR_COLOR: &str = "rgb(255, 255, 255)";
    pub const ALERT_COLOR: &str = "rgb(0, 0, 0)";
    pub const ALERT_BORDER_COLOR: &str = "rgb(191, 191, 191)";

    pub const PROMPT: &str = ">";
    pub const FOCUS_MESSAGE: &str = "CLICK TO FOCUS";
}

/// Scene description fetched at startup, every field optional
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneConfig {
    pub title: String,
    pub menu: Vec<String>,
    pub command_capacity: usize,
    pub flicker: FlickerPolicy,
    pub scale: u8,
    pub sprites: Vec<SpritePlacement>,
    pub sheet: Sheet,
}

impl SceneConfig {
    /// `command_capacity` cut down to the widest line whose cells can still
    /// be laid out in pixels
    pub fn line_capacity(&self) -> usize {
        self.command_capacity.min(font::MAX_CELLS)
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            title: "Hello and Welcome!".to_string(),
            menu: vec!["HELP".into(), "SAVE".into(), "RESTORE".into()],
            command_capacity: 60,
            flicker: FlickerPolicy::Always,
            scale: 1,
            sprites: Vec::new(),
            sheet: Sheet::default(),
        }
    }
}

/// Where submitted command lines go
/// - the adventure itself (parser, world) plugs in here
pub trait CommandSink {
    fn submit_command(&mut self, text: &str);
}

/// No interpreter yet, submitted lines only reach the console
pub struct ConsoleCommands;

impl CommandSink for ConsoleCommands {
    fn submit_command(&mut self, text: &str) {
        log!("> {}", text);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    Gained,
    Lost,
}

/// All mutable state of one play session
/// - written only by `handle`, read by the draw step
pub struct Session {
    line: LineBuffer,
    focused: bool,
    flicker_time: f64,
    policy: FlickerPolicy,
    commands: Box<dyn CommandSink>,
}

impl Session {
    pub fn new(capacity: usize, policy: FlickerPolicy, commands: Box<dyn CommandSink>) -> Self {
        Session {
            line: LineBuffer::new(capacity),
            focused: false,
            flicker_time: 0.0,
            policy,
            commands,
        }
    }

    pub fn line(&self) -> &LineBuffer {
        &self.line
    }

    pub fn focused(&self) -> bool {
        self.focused
    }

    pub fn flicker_time(&self) -> f64 {
        self.flicker_time
    }

    /// Apply one input event, reports focus transitions only
    pub fn handle(&mut self, event: InputEvent) -> Option<FocusChange> {
        match event {
            InputEvent::Typed(ch) => {
                if is_accepted(ch) {
                    self.line.insert_character(ch);
                }
                None
            }
            InputEvent::Pressed(key) => {
                self.press(key);
                None
            }
            InputEvent::FocusGained => self.set_focused(true).then_some(FocusChange::Gained),
            InputEvent::FocusLost => self.set_focused(false).then_some(FocusChange::Lost),
        }
    }

    fn press(&mut self, key: KeyCommand) {
        match key {
            KeyCommand::Backspace => self.line.backspace(),
            KeyCommand::Enter => self.submit(),
            KeyCommand::End => self.line.set_cursor(self.line.capacity() as i64 - 1),
            KeyCommand::Home => self.line.set_cursor(0),
            KeyCommand::Left => self.line.shift_cursor(-1),
            KeyCommand::Right => self.line.shift_cursor(1),
            KeyCommand::Delete => self.line.delete_character(),
        }
    }

    fn submit(&mut self) {
        let text = self.line.text();
        let command = text.trim_end();
        if !command.is_empty() {
            self.commands.submit_command(command);
        }
        self.line.clear();
    }

    /// true when the flag actually flipped
    fn set_focused(&mut self, focused: bool) -> bool {
        let changed = self.focused != focused;
        self.focused = focused;
        changed
    }

    pub fn update(&mut self, delta: f64) {
        if self.policy.advances(self.focused) {
            self.flicker_time += delta;
        }
    }

    pub fn cursor_visible(&self) -> bool {
        cursor_visible(self.flicker_time)
    }
}

/// Left edge of every menu label, labels are separated by one empty cell
pub fn menu_positions(labels: &[String]) -> Vec<i16> {
    labels
        .iter()
        .scan(layout::MENU_BUTTON_X, |x, label| {
            let position = *x;
            let cells = i16::try_from(label.chars().count() + 1).unwrap_or(i16::MAX);
            *x = x.saturating_add(cells.saturating_mul(layout::MENU_BUTTON_SPACING));
            Some(position)
        })
        .collect()
}

/// Top left of the command text for a drawing surface of `size`
pub fn command_origin(size: Size) -> Point {
    Point {
        x: layout::COMMAND_BOX_X,
        y: size.height - layout::COMMAND_BOX_BOTTOM - GLYPH_HEIGHT,
    }
}

/// Cell the blinking cursor covers
pub fn cursor_rect(origin: Point, cursor: usize) -> Rect {
    Rect::new(
        Point {
            x: origin.x.saturating_add(font::cell_offset(cursor)),
            y: origin.y,
        },
        font::glyph_size(),
    )
}

/// Everything drawn in a frame, listed back to front
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Background,
    Sprites,
    Menu,
    CommandBox,
    /// only while the canvas is unfocused, always on top
    FocusAlert,
}

/// Loaded scene, assets that failed to load are simply not drawn
pub struct Scene {
    session: Session,
    config: SceneConfig,
    background: Option<Image>,
    focus_indicator: Option<HtmlImageElement>,
    sprites: Option<SpriteSheet>,
    font: Option<BitmapFont>,
    music: Option<Sound>,
}

impl Adventure {
    pub fn new() -> Self {
        Adventure::Loading
    }

    /// A missing or broken scene file falls back to the defaults
    async fn load_config() -> SceneConfig {
        match browser::fetch_json::<SceneConfig>(assets::SCENE)
            .await
            .with_context(|| format!("Failed to load scene from : {}", assets::SCENE))
        {
            Ok(config) => config,
            Err(err) => {
                error!("{:#}, using the default scene", err);
                SceneConfig::default()
            }
        }
    }

    async fn load_optional_image(path: &str) -> Option<HtmlImageElement> {
        match engine::load_image(path)
            .await
            .with_context(|| format!("Failed to load image resource from : {}", path))
        {
            Ok(image) => Some(image),
            Err(err) => {
                error!("{:#}", err);
                None
            }
        }
    }

    fn load_music() -> Option<Sound> {
        match Sound::new(assets::MUSIC) {
            Ok(sound) => Some(sound),
            Err(err) => {
                error!("{:#}", err);
                None
            }
        }
    }
}

impl Default for Adventure {
    fn default() -> Self {
        Adventure::new()
    }
}

#[async_trait(?Send)]
impl Game for Adventure {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            // independent resources load side by side, total time is the
            // slowest one
            Adventure::Loading => {
                let (config, background, focus_indicator, sprites, font) = join!(
                    Self::load_config(),
                    Self::load_optional_image(assets::BACKGROUND),
                    Self::load_optional_image(assets::FOCUS_INDICATOR),
                    Self::load_optional_image(assets::SPRITES),
                    Self::load_optional_image(assets::FONT),
                );
                let mut scene = Scene::new(config, Box::new(ConsoleCommands));
                scene.background = background.map(|image| {
                    Image::new(
                        image,
                        Point {
                            x: 0,
                            y: layout::MENU_HEIGHT,
                        },
                    )
                });
                scene.focus_indicator = focus_indicator;
                scene.sprites =
                    sprites.map(|image| SpriteSheet::new(scene.config.sheet.clone(), image));
                scene.font = font.map(BitmapFont::new);
                scene.music = Self::load_music();
                Ok(Box::new(Adventure::Loaded(scene)))
            }
            Adventure::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn handle_input(&mut self, event: InputEvent) {
        if let Adventure::Loaded(scene) = self {
            if let Some(change) = scene.session.handle(event) {
                scene.on_focus(change);
            }
        }
    }

    fn update(&mut self, delta: f64) {
        if let Adventure::Loaded(scene) = self {
            scene.session.update(delta);
        }
    }

    fn draw(&self, renderer: &Renderer) {
        if let Adventure::Loaded(scene) = self {
            renderer.clear();
            for layer in scene.layers() {
                scene.draw_layer(renderer, layer);
            }
        }
    }

    fn scale(&self) -> u8 {
        match self {
            Adventure::Loaded(scene) => scene.config.scale,
            Adventure::Loading => 1,
        }
    }
}

impl Scene {
    /// A scene with no assets yet, only the parts drawn with plain rects show
    pub fn new(config: SceneConfig, commands: Box<dyn CommandSink>) -> Self {
        Scene {
            session: Session::new(config.line_capacity(), config.flicker, commands),
            config,
            background: None,
            focus_indicator: None,
            sprites: None,
            font: None,
            music: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn layers(&self) -> Vec<Layer> {
        let mut layers = vec![
            Layer::Background,
            Layer::Sprites,
            Layer::Menu,
            Layer::CommandBox,
        ];
        if !self.session.focused() {
            layers.push(Layer::FocusAlert);
        }
        layers
    }

    fn draw_layer(&self, renderer: &Renderer, layer: Layer) {
        match layer {
            Layer::Background => self.draw_background(renderer),
            Layer::Sprites => self.draw_sprites(renderer),
            Layer::Menu => self.draw_menu(renderer),
            Layer::CommandBox => self.draw_command_box(renderer),
            Layer::FocusAlert => self.draw_focus_alert(renderer),
        }
    }

    fn on_focus(&self, change: FocusChange) {
        log!("canvas focus {:?}", change);
        if let Some(music) = &self.music {
            match change {
                FocusChange::Gained => music.play(),
                FocusChange::Lost => music.pause(),
            }
        }
    }

    fn draw_text(&self, renderer: &Renderer, text: &str, position: Point) {
        if let Some(font) = &self.font {
            font.draw_text(renderer, text, position);
        }
    }

    fn draw_background(&self, renderer: &Renderer) {
        if let Some(background) = &self.background {
            background.draw(renderer);
        }
    }

    fn draw_sprites(&self, renderer: &Renderer) {
        if let Some(sheet) = &self.sprites {
            for placement in &self.config.sprites {
                sheet.draw(renderer, placement);
            }
        }
    }

    fn draw_menu(&self, renderer: &Renderer) {
        let width = renderer.size().width;
        renderer.fill_rect(
            &Rect::new_from_x_y(0, 0, width, layout::MENU_HEIGHT),
            layout::MENU_COLOR,
        );
        self.draw_text(renderer, &self.config.title, Point::default());
        for (label, x) in self
            .config
            .menu
            .iter()
            .zip(menu_positions(&self.config.menu))
        {
            self.draw_text(renderer, label, Point { x, y: 0 });
        }

        // left half of the indicator image is "unfocused", right half "focused"
        if let Some(indicator) = &self.focus_indicator {
            let size = layout::INDICATOR_SIZE;
            let clip_x = if self.session.focused() { size } else { 0 };
            renderer.draw_image(
                indicator,
                &Rect::new_from_x_y(clip_x, 0, size, size),
                &Rect::new_from_x_y(
                    width - size - layout::INDICATOR_MARGIN,
                    layout::INDICATOR_MARGIN,
                    size,
                    size,
                ),
            );
        }
    }

    fn draw_command_box(&self, renderer: &Renderer) {
        let origin = command_origin(renderer.size());
        let line = self.session.line();
        self.draw_text(
            renderer,
            layout::PROMPT,
            Point {
                x: origin.x - GLYPH_WIDTH,
                y: origin.y,
            },
        );
        self.draw_text(renderer, &line.text(), origin);

        if self.session.cursor_visible() {
            renderer.fill_rect(&cursor_rect(origin, line.cursor()), layout::CURSOR_COLOR);
        }
    }

    fn draw_focus_alert(&self, renderer: &Renderer) {
        let screen = Rect::new(Point::default(), renderer.size());
        let padding = layout::ALERT_PADDING;
        let alert = screen.centered(Size {
            width: font::text_width(layout::FOCUS_MESSAGE) + padding * 4,
            height: GLYPH_HEIGHT + padding * 2,
        });
        renderer.fill_rect(&alert, layout::ALERT_COLOR);
        renderer.stroke_rect(&alert, layout::ALERT_BORDER_COLOR);
        self.draw_text(
            renderer,
            layout::FOCUS_MESSAGE,
            Point {
                x: alert.position.x + padding * 2,
                y: alert.position.y + padding,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorded(Rc<RefCell<Vec<String>>>);

    impl CommandSink for Recorded {
        fn submit_command(&mut self, text: &str) {
            self.0.borrow_mut().push(text.to_string());
        }
    }

    fn session(capacity: usize, policy: FlickerPolicy) -> (Session, Recorded) {
        let recorded = Recorded::default();
        (
            Session::new(capacity, policy, Box::new(recorded.clone())),
            recorded,
        )
    }

    fn type_text(session: &mut Session, text: &str) {
        text.chars()
            .for_each(|ch| assert_eq!(session.handle(InputEvent::Typed(ch)), None));
    }

    #[test]
    fn new_session_is_blank_and_unfocused() {
        let (session, _) = session(52, FlickerPolicy::Always);
        assert_eq!(session.line().text(), " ".repeat(52));
        assert_eq!(session.line().cursor(), 0);
        assert!(!session.focused());
        assert_eq!(session.flicker_time(), 0.0);
    }

    #[test]
    fn typing_filters_through_allowlist() {
        let (mut session, _) = session(20, FlickerPolicy::Always);
        type_text(&mut session, "take #lamp\t!");
        assert_eq!(session.line().text().trim_end(), "take lamp!");
    }

    #[test]
    fn key_table_scenario() {
        let (mut session, _) = session(10, FlickerPolicy::Always);
        type_text(&mut session, "hi");
        assert_eq!(session.line().text(), "hi        ");
        assert_eq!(session.line().cursor(), 2);

        session.handle(InputEvent::Pressed(KeyCommand::Home));
        assert_eq!(session.line().cursor(), 0);

        session.handle(InputEvent::Pressed(KeyCommand::Delete));
        assert_eq!(session.line().text(), "i         ");
        assert_eq!(session.line().cursor(), 0);

        session.handle(InputEvent::Pressed(KeyCommand::End));
        assert_eq!(session.line().cursor(), 9);
    }

    #[test]
    fn arrows_and_backspace() {
        let (mut session, _) = session(10, FlickerPolicy::Always);
        type_text(&mut session, "nrth");
        session.handle(InputEvent::Pressed(KeyCommand::Left));
        session.handle(InputEvent::Pressed(KeyCommand::Left));
        session.handle(InputEvent::Pressed(KeyCommand::Left));
        type_text(&mut session, "o");
        assert_eq!(session.line().text().trim_end(), "north");

        session.handle(InputEvent::Pressed(KeyCommand::Right));
        session.handle(InputEvent::Pressed(KeyCommand::Backspace));
        assert_eq!(session.line().text().trim_end(), "noth");
        assert_eq!(session.line().cursor(), 2);
    }

    #[test]
    fn enter_submits_trimmed_line_and_clears() {
        let (mut session, recorded) = session(16, FlickerPolicy::Always);
        type_text(&mut session, "open gate");
        session.handle(InputEvent::Pressed(KeyCommand::Enter));
        assert_eq!(*recorded.0.borrow(), vec!["open gate".to_string()]);
        assert_eq!(session.line().text(), " ".repeat(16));
        assert_eq!(session.line().cursor(), 0);
    }

    #[test]
    fn enter_on_blank_line_submits_nothing() {
        let (mut session, recorded) = session(8, FlickerPolicy::Always);
        type_text(&mut session, "   ");
        session.handle(InputEvent::Pressed(KeyCommand::Enter));
        assert!(recorded.0.borrow().is_empty());
        assert_eq!(session.line().cursor(), 0);
    }

    #[test]
    fn focus_events_report_only_changes() {
        let (mut session, _) = session(8, FlickerPolicy::Always);
        assert_eq!(session.handle(InputEvent::FocusLost), None);
        assert_eq!(
            session.handle(InputEvent::FocusGained),
            Some(FocusChange::Gained)
        );
        assert!(session.focused());
        assert_eq!(session.handle(InputEvent::FocusGained), None);
        assert_eq!(session.handle(InputEvent::FocusLost), Some(FocusChange::Lost));
        assert!(!session.focused());
    }

    #[test]
    fn always_policy_blinks_while_unfocused() {
        let (mut session, _) = session(8, FlickerPolicy::Always);
        assert!(session.cursor_visible());
        session.update(600.0);
        assert!(!session.cursor_visible());
        session.update(400.0);
        assert!(session.cursor_visible());
        assert_eq!(session.flicker_time(), 1000.0);
    }

    #[test]
    fn focused_policy_pauses_while_unfocused() {
        let (mut session, _) = session(8, FlickerPolicy::WhileFocused);
        session.update(600.0);
        assert_eq!(session.flicker_time(), 0.0);
        assert!(session.cursor_visible());

        session.handle(InputEvent::FocusGained);
        session.update(600.0);
        assert_eq!(session.flicker_time(), 600.0);
        assert!(!session.cursor_visible());

        session.handle(InputEvent::FocusLost);
        session.update(600.0);
        assert_eq!(session.flicker_time(), 600.0);
    }

    #[test]
    fn menu_labels_advance_by_length() {
        let labels = SceneConfig::default().menu;
        // HELP = 5 cells, SAVE = 5 cells, 9px each
        assert_eq!(menu_positions(&labels), vec![190, 235, 280]);
        assert!(menu_positions(&[]).is_empty());

        let long = vec!["X".repeat(5000), "HELP".to_string()];
        assert_eq!(menu_positions(&long), vec![190, i16::MAX]);
    }

    #[test]
    fn command_box_sits_above_bottom_margin() {
        let origin = command_origin(Size {
            width: 640,
            height: 480,
        });
        assert_eq!(origin, Point { x: 16, y: 448 });
        assert_eq!(cursor_rect(origin, 0), Rect::new_from_x_y(16, 448, 8, 16));
        assert_eq!(cursor_rect(origin, 3), Rect::new_from_x_y(40, 448, 8, 16));
    }

    #[test]
    fn focus_alert_is_the_last_layer_only_while_unfocused() {
        let mut scene = Scene::new(SceneConfig::default(), Box::new(Recorded::default()));
        assert_eq!(
            scene.layers(),
            vec![
                Layer::Background,
                Layer::Sprites,
                Layer::Menu,
                Layer::CommandBox,
                Layer::FocusAlert,
            ]
        );

        scene.session.handle(InputEvent::FocusGained);
        assert_eq!(scene.layers().last(), Some(&Layer::CommandBox));
        assert!(!scene.layers().contains(&Layer::FocusAlert));

        scene.session.handle(InputEvent::FocusLost);
        assert_eq!(scene.layers().last(), Some(&Layer::FocusAlert));
    }

    #[test]
    fn oversized_capacity_is_cut_to_what_fits() {
        let config = SceneConfig {
            command_capacity: 5000,
            ..SceneConfig::default()
        };
        assert_eq!(config.line_capacity(), font::MAX_CELLS);
        let scene = Scene::new(config, Box::new(Recorded::default()));
        assert_eq!(scene.session().line().capacity(), font::MAX_CELLS);
        assert_eq!(SceneConfig::default().line_capacity(), 60);
    }

    #[test]
    fn cursor_far_right_does_not_overflow() {
        let (mut session, _) = session(5000, FlickerPolicy::Always);
        session.handle(InputEvent::Pressed(KeyCommand::End));
        assert_eq!(session.line().cursor(), 4999);

        let origin = command_origin(Size {
            width: 640,
            height: 480,
        });
        let rect = cursor_rect(origin, session.line().cursor());
        assert_eq!(rect.position.x, i16::MAX);
        assert_eq!(rect.position.y, 448);
    }

    #[test]
    fn scene_config_fills_missing_fields() {
        let config: SceneConfig = serde_json::from_str(
            r#"{"command_capacity": 52, "flicker": "while_focused",
                "sprites": [{"frame": "skeleton", "x": 10.5, "y": 20}]}"#,
        )
        .unwrap();
        assert_eq!(config.command_capacity, 52);
        assert_eq!(config.flicker, FlickerPolicy::WhileFocused);
        assert_eq!(config.menu, SceneConfig::default().menu);
        assert_eq!(config.scale, 1);
        assert_eq!(config.sprites[0].frame, "skeleton");

        let empty: SceneConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, SceneConfig::default());
    }
}
