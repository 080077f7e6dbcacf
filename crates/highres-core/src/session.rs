//! The capture session state machine.
//!
//! A session owns the renderer, scene and camera. [`CaptureSession::capture`]
//! accepts at most one request at a time: while a capture is in flight any
//! further request resolves immediately with `Ok(None)`. Accepted requests
//! always return the renderer to its pre-capture state before the returned
//! future completes, so a follow-up capture started from the result sees an
//! idle session.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use crate::assemble::assemble;
use crate::depth::render_depth;
use crate::encode::encode_png;
use crate::error::{CaptureError, PersistError, Result};
use crate::observer::CaptureObserver;
use crate::options::CaptureOptions;
use crate::readback::{render_color, ActiveTargets, PixelBuffer};
use crate::renderer::{CaptureCamera, CaptureRenderer, Viewport};
use crate::request::{CaptureMode, CaptureRequest};
use crate::sink::ImageSink;
use crate::sizing::{compute_dimensions, max_factor, CaptureDimensions};

/// Whether a capture is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Busy,
}

/// A finished capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// PNG bytes.
    pub bytes: Vec<u8>,
    /// Generated file name, `hr-{width}x{height}-{unix millis}.png`.
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub mode: CaptureMode,
    /// Time from acceptance of the request until the image was handed off.
    pub elapsed: Duration,
}

/// File name for a capture of `dims` taken at `timestamp_millis`.
pub fn capture_filename(dims: &CaptureDimensions, timestamp_millis: i64) -> String {
    format!("hr-{}x{}-{}.png", dims.width, dims.height, timestamp_millis)
}

/// Renderer state saved on entry to `Busy`.
#[derive(Debug, Clone, Copy)]
struct RendererSnapshot {
    viewport: Viewport,
    aspect: f32,
}

/// Future that returns `Pending` once so other tasks get polled first.
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Single-flight capture coordinator.
pub struct CaptureSession<R: CaptureRenderer, S, O = ()> {
    renderer: RefCell<R>,
    scene: RefCell<R::Scene>,
    camera: RefCell<R::Camera>,
    targets: RefCell<ActiveTargets<R::Target>>,
    sink: S,
    observer: O,
    options: CaptureOptions,
    max_texture_size: u32,
    max_factor: u32,
    state: Cell<SessionState>,
}

impl<R, S> CaptureSession<R, S, ()>
where
    R: CaptureRenderer,
    S: ImageSink,
{
    /// Creates a session without lifecycle hooks.
    pub fn new(
        renderer: R,
        scene: R::Scene,
        camera: R::Camera,
        sink: S,
        options: CaptureOptions,
    ) -> Result<Self> {
        Self::with_observer(renderer, scene, camera, sink, (), options)
    }
}

impl<R, S, O> CaptureSession<R, S, O>
where
    R: CaptureRenderer,
    S: ImageSink,
    O: CaptureObserver,
{
    /// Creates a session that reports lifecycle events to `observer`.
    pub fn with_observer(
        renderer: R,
        scene: R::Scene,
        camera: R::Camera,
        sink: S,
        observer: O,
        options: CaptureOptions,
    ) -> Result<Self> {
        options.validate()?;
        let max_texture_size = renderer.max_texture_size();
        let max_factor = max_factor(max_texture_size, options.base_tile);
        log::info!(
            "Capture session ready: max texture {max_texture_size}, scale factors 0..={max_factor}"
        );

        Ok(Self {
            renderer: RefCell::new(renderer),
            scene: RefCell::new(scene),
            camera: RefCell::new(camera),
            targets: RefCell::new(ActiveTargets::new()),
            sink,
            observer,
            options,
            max_texture_size,
            max_factor,
            state: Cell::new(SessionState::Idle),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn is_busy(&self) -> bool {
        self.state.get() == SessionState::Busy
    }

    /// Largest accepted scale factor.
    pub fn max_factor(&self) -> u32 {
        self.max_factor
    }

    pub fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Runs `f` on the scene, or returns `None` while a capture is in flight.
    pub fn with_scene<T>(&self, f: impl FnOnce(&mut R::Scene) -> T) -> Option<T> {
        if self.is_busy() {
            return None;
        }
        Some(f(&mut self.scene.borrow_mut()))
    }

    /// Runs `f` on the camera, or returns `None` while a capture is in flight.
    pub fn with_camera<T>(&self, f: impl FnOnce(&mut R::Camera) -> T) -> Option<T> {
        if self.is_busy() {
            return None;
        }
        Some(f(&mut self.camera.borrow_mut()))
    }

    /// Runs `f` on the renderer, or returns `None` while a capture is in flight.
    pub fn with_renderer<T>(&self, f: impl FnOnce(&mut R) -> T) -> Option<T> {
        if self.is_busy() {
            return None;
        }
        Some(f(&mut self.renderer.borrow_mut()))
    }

    /// Captures the scene as described by `request`.
    ///
    /// Resolves to `Ok(None)` without side effects when another capture is in
    /// flight. Rejects factors above [`max_factor`](Self::max_factor) with
    /// [`CaptureError::InvalidRequest`] before touching the renderer.
    pub async fn capture(&self, request: CaptureRequest) -> Result<Option<EncodedImage>> {
        if self.is_busy() {
            log::warn!("Capture already in progress, ignoring request");
            return Ok(None);
        }
        if request.scale_factor() > self.max_factor {
            return Err(CaptureError::InvalidRequest {
                requested: request.scale_factor(),
                max: self.max_factor,
            });
        }

        let started = Instant::now();
        let snapshot = RendererSnapshot {
            viewport: self.renderer.borrow().viewport(),
            aspect: self.camera.borrow().aspect(),
        };
        let dims = compute_dimensions(
            &request,
            (snapshot.viewport.width, snapshot.viewport.height),
            self.options.base_tile,
            self.max_texture_size,
        );

        self.state.set(SessionState::Busy);
        let in_flight = InFlight {
            session: self,
            snapshot: Some(snapshot),
        };
        self.observer.on_before_render(&request, &dims);
        let (inches_w, inches_h) = dims.print_size(self.options.print_dpi);
        log::info!(
            "Highres {} capture ({}x{}, {}x{} inches at {} dpi) started",
            request.mode().name(),
            dims.width,
            dims.height,
            inches_w,
            inches_h,
            self.options.print_dpi
        );

        let result = self.run(&request, &dims, started).await;
        drop(in_flight);

        match &result {
            Ok(image) => log::info!(
                "Highres capture complete: {} in {:.2} seconds",
                image.filename,
                image.elapsed.as_secs_f64()
            ),
            Err(err) => log::error!("Highres capture failed: {err}"),
        }
        result.map(Some)
    }

    async fn run(
        &self,
        request: &CaptureRequest,
        dims: &CaptureDimensions,
        started: Instant,
    ) -> Result<EncodedImage> {
        if self.options.yield_before_render {
            yield_now().await;
        }

        let buffer = self.render(request, dims)?;
        let image = assemble(buffer);
        let bytes = encode_png(&image, self.options.png_compression).map_err(PersistError::from)?;

        let mut encoded = EncodedImage {
            bytes,
            filename: capture_filename(dims, chrono::Utc::now().timestamp_millis()),
            width: image.width(),
            height: image.height(),
            mode: request.mode(),
            elapsed: started.elapsed(),
        };
        self.sink.persist(&encoded).await?;
        encoded.elapsed = started.elapsed();
        Ok(encoded)
    }

    /// Reconfigures the renderer for `dims` and draws the requested pass.
    fn render(&self, request: &CaptureRequest, dims: &CaptureDimensions) -> Result<PixelBuffer> {
        let mut renderer = self.renderer.borrow_mut();
        let scene = self.scene.borrow();
        let mut camera = self.camera.borrow_mut();
        let mut targets = self.targets.borrow_mut();

        let (width, height) = dims.logical_size();
        renderer.set_viewport(width, height);
        renderer.set_pixel_ratio(dims.factor as f32);
        camera.set_aspect(width as f32 / height as f32);

        match request.mode() {
            CaptureMode::Color => {
                render_color(&mut *renderer, &*scene, &*camera, dims, &mut *targets)
            }
            CaptureMode::Depth => {
                render_depth(&mut *renderer, &*scene, &*camera, dims, &mut *targets)
            }
        }
    }

    /// Disposes capture targets, restores the renderer and camera, and returns to idle.
    fn finish(&self, snapshot: RendererSnapshot) {
        match self.renderer.try_borrow_mut() {
            Ok(mut renderer) => {
                self.targets.borrow_mut().dispose_all(&mut *renderer);
                renderer.set_viewport(snapshot.viewport.width, snapshot.viewport.height);
                renderer.set_pixel_ratio(snapshot.viewport.pixel_ratio);
            }
            Err(_) => log::error!("Renderer still borrowed, cannot restore pre-capture state"),
        }
        if let Ok(mut camera) = self.camera.try_borrow_mut() {
            camera.set_aspect(snapshot.aspect);
        }
        self.state.set(SessionState::Idle);
        self.observer.on_after_render();
        log::debug!("Capture session idle");
    }
}

/// Restores the session when the capture in flight ends, including when its
/// future is dropped before completion.
struct InFlight<'a, R: CaptureRenderer, S: ImageSink, O: CaptureObserver> {
    session: &'a CaptureSession<R, S, O>,
    snapshot: Option<RendererSnapshot>,
}

impl<R: CaptureRenderer, S: ImageSink, O: CaptureObserver> Drop for InFlight<'_, R, S, O> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.session.finish(snapshot);
        }
    }
}
