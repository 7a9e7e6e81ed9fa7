use crate::browser;
use anyhow::{anyhow, Error, Result};
// web assembly is single threaded, so Rc RefCell > Mutex
use async_trait::async_trait;
use futures::channel::oneshot::channel;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{
    // unchecked_ref casts the closure to a js Function, we built the closure
    // with the signature the browser expects
    JsCast,
    JsValue,
};
use web_sys::{CanvasRenderingContext2d, HtmlAudioElement, HtmlImageElement};

pub mod clock;
pub mod input;

use self::clock::FrameClock;
use self::input::InputEvent;
use futures::channel::mpsc::UnboundedReceiver;

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    /// Called for every queued event before the frame's update
    fn handle_input(&mut self, event: InputEvent);
    /// `delta` is milliseconds since the previous frame
    fn update(&mut self, delta: f64);
    fn draw(&self, renderer: &Renderer);
    /// Integer upscale applied to the canvas once the game is initialized
    fn scale(&self) -> u8 {
        1
    }
}

/// ┌──────────────────── one requestAnimationFrame tick ───────────────────┐
/// │ drain input -> clock.tick -> update(delta) -> draw -> reschedule      │
/// │                  (first tick has no delta, update is skipped)         │
/// └───────────────────────────────────────────────────────────────────────┘
pub struct GameLoop {
    clock: FrameClock,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

impl GameLoop {
    /// Runs until the page goes away, there is no stop
    /// - a missing canvas or 2d context is the only way the loop never starts
    pub async fn start(game: impl Game + 'static) -> Result<()> {
        let canvas = browser::canvas()?;
        let mut renderer = Renderer::new(
            browser::context()?,
            Size {
                width: canvas.width() as i16,
                height: canvas.height() as i16,
            },
        );
        // without focus or listeners the scene still draws, it just can't be
        // typed into
        if let Err(err) = browser::make_focusable(&canvas) {
            error!("GameLoop: {:#}", err);
        }
        let mut events = input::prepare_input(&canvas).unwrap_or_else(|err| {
            error!("GameLoop: no keyboard input : {:#}", err);
            input::disconnected()
        });

        let mut game = game.initialize().await?;
        renderer.set_scale(game.scale());
        let mut game_loop = GameLoop::default();

        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            game_loop.frame(&mut *game, &mut events, perf, |game| {
                game.draw(&renderer)
            });
            if let Some(callback) = f.borrow().as_ref() {
                if let Err(err) = browser::request_animation_frame(callback) {
                    error!("GameLoop: could not schedule next frame : {:#?}", err);
                }
            }
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        Ok(())
    }

    /// One tick minus the rescheduling
    /// - events land between frames, so the editor is never read half way
    ///   through a shift
    pub fn frame(
        &mut self,
        game: &mut dyn Game,
        events: &mut UnboundedReceiver<InputEvent>,
        timestamp: f64,
        draw: impl FnOnce(&dyn Game),
    ) {
        for event in input::drain(events) {
            game.handle_input(event);
        }
        if let Some(delta) = self.clock.tick(timestamp) {
            game.update(delta);
        }
        draw(&*game);
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        GameLoop {
            clock: FrameClock::new(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

impl Point {
    /// Snap a fractional position down to whole pixels, sub pixel blits blur
    pub fn floored(x: f64, y: f64) -> Self {
        Point {
            x: x.floor() as i16,
            y: y.floor() as i16,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: i16,
    pub height: i16,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    pub fn new_from_x_y(x: i16, y: i16, width: i16, height: i16) -> Self {
        Rect::new(Point { x, y }, Size { width, height })
    }

    /// Rect of `size` centred inside self
    pub fn centered(&self, size: Size) -> Rect {
        Rect::new(
            Point {
                x: self.position.x + (self.size.width - size.width) / 2,
                y: self.position.y + (self.size.height - size.height) / 2,
            },
            size,
        )
    }
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
    size: Size,
}

impl Renderer {
    /// Pixel art gets nearest neighbour filtering so upscaling stays crisp
    pub fn new(context: CanvasRenderingContext2d, size: Size) -> Self {
        context.set_image_smoothing_enabled(false);
        Renderer { context, size }
    }

    /// Logical drawing size, the canvas size divided by `scale`
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn set_scale(&mut self, scale: u8) {
        let scale = scale.max(1);
        if let Err(err) = self.context.scale(scale.into(), scale.into()) {
            error!("Renderer: could not scale context : {:#?}", err);
            return;
        }
        self.size = Size {
            width: self.size.width / scale as i16,
            height: self.size.height / scale as i16,
        };
    }

    pub fn clear(&self) {
        self.context.clear_rect(
            0.0,
            0.0,
            self.size.width.into(),
            self.size.height.into(),
        );
    }

    pub fn fill_rect(&self, rect: &Rect, color: &str) {
        self.context.set_fill_style_str(color);
        self.context.fill_rect(
            rect.position.x.into(),
            rect.position.y.into(),
            rect.size.width.into(),
            rect.size.height.into(),
        );
    }

    pub fn stroke_rect(&self, rect: &Rect, color: &str) {
        self.context.set_stroke_style_str(color);
        self.context.stroke_rect(
            rect.position.x.into(),
            rect.position.y.into(),
            rect.size.width.into(),
            rect.size.height.into(),
        );
    }

    /// Blit the `frame` region of `image` into `destination`
    /// - a failed draw is logged, the frame goes on
    pub fn draw_image(&self, image: &HtmlImageElement, frame: &Rect, destination: &Rect) {
        if let Err(err) = self
            .context
            .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                image,
                frame.position.x.into(),
                frame.position.y.into(),
                frame.size.width.into(),
                frame.size.height.into(),
                destination.position.x.into(),
                destination.position.y.into(),
                destination.size.width.into(),
                destination.size.height.into(),
            )
        {
            error!("Renderer: could not draw image : {:#?}", err);
        }
    }

    pub fn draw_entire_image(&self, image: &HtmlImageElement, position: &Point) {
        if let Err(err) = self
            .context
            .draw_image_with_html_image_element(image, position.x.into(), position.y.into())
        {
            error!("Renderer: could not draw image : {:#?}", err);
        }
    }
}

/// A whole image pinned to one spot on screen
pub struct Image {
    element: HtmlImageElement,
    position: Point,
}

impl Image {
    pub fn new(element: HtmlImageElement, position: Point) -> Self {
        Image { element, position }
    }

    pub fn draw(&self, renderer: &Renderer) {
        renderer.draw_entire_image(&self.element, &self.position);
    }
}

/// Looping background track, toggled with canvas focus
pub struct Sound {
    element: HtmlAudioElement,
}

impl Sound {
    pub fn new(source: &str) -> Result<Self> {
        Ok(Sound {
            element: browser::new_looping_audio(source)?,
        })
    }

    pub fn play(&self) {
        // rejected promises (autoplay policy, unsupported format) are left
        // to the browser console
        if let Err(err) = self.element.play() {
            error!("Sound: could not start playback : {:#?}", err);
        }
    }

    pub fn pause(&self) {
        if let Err(err) = self.element.pause() {
            error!("Sound: could not pause playback : {:#?}", err);
        }
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    // each sender is taken once, so a repeated event is a no-op
    let success_callback = browser::closure_wrap(Box::new(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    }) as Box<dyn FnMut()>);

    let source_name = source.to_string();
    let error_callback = browser::closure_wrap(Box::new(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "[engine::load_image] Error loading image {} : {:#?}",
                source_name,
                err
            )));
        }
    }) as Box<dyn FnMut(JsValue)>);

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callback alive until image is loaded or errors
    success_callback.forget();
    error_callback.forget();

    // ?? - Result<Result<(), Error>, oneshot::Canceled>
    // - first ? : the channel itself
    // - second ? : the load outcome
    rx.await??;

    Ok(image)
}
