//! Capture flows through the facade, on the CPU reference renderer.

use std::cell::Cell;

use highres::*;
use pollster::FutureExt;

const BACKGROUND: [u8; 4] = [20, 20, 20, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn scene() -> SoftwareScene {
    SoftwareScene::new(BACKGROUND).with_layer([0.25, 0.25, 0.75, 0.75], 4.0, BLUE)
}

fn small_options() -> CaptureOptions {
    CaptureOptions::new()
        .with_base_tile(32, 32)
        .with_png_compression(PngCompression::Fast)
}

fn highres<'a>(sink: &'a MemorySink) -> Highres<SoftwareRenderer, &'a MemorySink> {
    let session = CaptureSession::new(
        SoftwareRenderer::new(100, 50, 128),
        scene(),
        SoftwareCamera::default(),
        sink,
        small_options(),
    )
    .unwrap();
    Highres::new(session)
}

/// Test: digit keys capture only while armed.
#[test]
fn test_digit_ignored_until_activated() {
    init_logging();
    let sink = MemorySink::new();
    let highres = highres(&sink);

    let outcome = highres.handle_key(TriggerKey::Digit(2)).block_on().unwrap();
    assert_eq!(outcome, KeyOutcome::Ignored);
    assert!(sink.is_empty());

    let outcome = highres.handle_key(TriggerKey::Plus).block_on().unwrap();
    assert_eq!(outcome, KeyOutcome::Activated(CaptureMode::Color));

    let outcome = highres.handle_key(TriggerKey::Digit(2)).block_on().unwrap();
    let KeyOutcome::Captured(image) = outcome else {
        panic!("expected a capture, got {outcome:?}");
    };
    assert_eq!((image.width, image.height), (64, 64));
    assert_eq!(image.mode, CaptureMode::Color);

    // A finished capture disarms the surface.
    assert!(!highres.controls().is_active());
    let outcome = highres.handle_key(TriggerKey::Digit(1)).block_on().unwrap();
    assert_eq!(outcome, KeyOutcome::Ignored);
    assert_eq!(sink.len(), 1);
}

/// Test: digits above the GPU limit are clamped instead of rejected.
#[test]
fn test_digit_clamped_to_max_factor() {
    let sink = MemorySink::new();
    let highres = highres(&sink);
    assert_eq!(highres.session().max_factor(), 4);

    highres.handle_key(TriggerKey::Minus).block_on().unwrap();
    let outcome = highres.handle_key(TriggerKey::Digit(9)).block_on().unwrap();
    let KeyOutcome::Captured(image) = outcome else {
        panic!("expected a capture, got {outcome:?}");
    };
    assert_eq!((image.width, image.height), (128, 128));
    assert_eq!(image.mode, CaptureMode::Depth);
}

/// Test: digit 0 captures at viewport size.
#[test]
fn test_digit_zero_captures_viewport() {
    let sink = MemorySink::new();
    let highres = highres(&sink);

    highres.handle_key(TriggerKey::Plus).block_on().unwrap();
    let outcome = highres.handle_key(TriggerKey::Digit(0)).block_on().unwrap();
    let KeyOutcome::Captured(image) = outcome else {
        panic!("expected a capture, got {outcome:?}");
    };
    assert_eq!((image.width, image.height), (100, 50));
    assert!(image.filename.starts_with("hr-100x50-"));
}

/// Test: Escape disarms without capturing.
#[test]
fn test_escape_deactivates() {
    let sink = MemorySink::new();
    let highres = highres(&sink);

    assert_eq!(
        highres.handle_key(TriggerKey::Escape).block_on().unwrap(),
        KeyOutcome::Ignored
    );
    highres.handle_key(TriggerKey::Minus).block_on().unwrap();
    assert_eq!(
        highres.handle_key(TriggerKey::Escape).block_on().unwrap(),
        KeyOutcome::Deactivated
    );
    assert_eq!(
        highres.handle_key(TriggerKey::Digit(1)).block_on().unwrap(),
        KeyOutcome::Ignored
    );
    assert!(sink.is_empty());
}

/// Test: keys are ignored while a capture is in flight.
#[test]
fn test_keys_ignored_while_busy() {
    let sink = MemorySink::new();
    let highres = highres(&sink);
    highres.handle_key(TriggerKey::Plus).block_on().unwrap();

    let (first, during) = futures::future::join(
        highres.handle_key(TriggerKey::Digit(1)),
        async {
            (
                highres.handle_key(TriggerKey::Minus).await.unwrap(),
                highres.handle_key(TriggerKey::Digit(3)).await.unwrap(),
            )
        },
    )
    .block_on();

    assert!(matches!(first.unwrap(), KeyOutcome::Captured(_)));
    assert_eq!(during, (KeyOutcome::Ignored, KeyOutcome::Ignored));
    assert_eq!(sink.len(), 1);
    assert!(!highres.controls().is_active());
}

/// Test: a failed capture still disarms and surfaces the error.
#[test]
fn test_capture_error_disarms() {
    let sink = MemorySink::new();
    let highres = highres(&sink);
    sink.reject_next();

    highres.handle_key(TriggerKey::Plus).block_on().unwrap();
    let err = highres
        .handle_key(TriggerKey::Digit(1))
        .block_on()
        .unwrap_err();
    assert!(matches!(
        err,
        HighresError::Capture(CaptureError::PersistenceFailure(_))
    ));
    assert!(!highres.controls().is_active());
    assert_eq!(highres.session().state(), SessionState::Idle);
}

#[derive(Default)]
struct LifecycleLog {
    starts: Cell<usize>,
    exits: Cell<usize>,
    renders: Cell<usize>,
}

impl CaptureObserver for LifecycleLog {
    fn on_start(&self, _mode: CaptureMode) {
        self.starts.set(self.starts.get() + 1);
    }

    fn on_after_render(&self) {
        self.renders.set(self.renders.get() + 1);
    }

    fn on_exit(&self) {
        self.exits.set(self.exits.get() + 1);
    }
}

/// Test: observer hooks fire for activation, capture and exit.
#[test]
fn test_observer_lifecycle() {
    let sink = MemorySink::new();
    let session = CaptureSession::with_observer(
        SoftwareRenderer::new(100, 50, 128),
        scene(),
        SoftwareCamera::default(),
        &sink,
        LifecycleLog::default(),
        small_options(),
    )
    .unwrap();
    let highres = Highres::new(session);

    highres.handle_key(TriggerKey::Plus).block_on().unwrap();
    highres.handle_key(TriggerKey::Digit(1)).block_on().unwrap();
    highres.handle_key(TriggerKey::Minus).block_on().unwrap();
    highres.handle_key(TriggerKey::Escape).block_on().unwrap();

    let log = highres.session().observer();
    assert_eq!(log.starts.get(), 2);
    assert_eq!(log.exits.get(), 2);
    assert_eq!(log.renders.get(), 1);
}

/// Test: Escape reports an exit even when the surface is not armed.
#[test]
fn test_escape_while_inactive_reports_exit() {
    let sink = MemorySink::new();
    let session = CaptureSession::with_observer(
        SoftwareRenderer::new(100, 50, 128),
        scene(),
        SoftwareCamera::default(),
        &sink,
        LifecycleLog::default(),
        small_options(),
    )
    .unwrap();
    let highres = Highres::new(session);

    let outcome = highres.handle_key(TriggerKey::Escape).block_on().unwrap();
    assert_eq!(outcome, KeyOutcome::Ignored);
    assert_eq!(highres.session().observer().exits.get(), 1);

    highres.handle_key(TriggerKey::Escape).block_on().unwrap();
    assert_eq!(highres.session().observer().exits.get(), 2);
    assert_eq!(highres.session().observer().starts.get(), 0);
}

/// Test: the file sink writes a decodable PNG under the generated name.
#[test]
fn test_file_sink_writes_png() {
    let dir = std::env::temp_dir().join(format!(
        "highres-file-sink-{}-{}",
        std::process::id(),
        unique_suffix()
    ));
    let sink = FileSink::new(&dir);
    let session = CaptureSession::new(
        SoftwareRenderer::new(100, 50, 128),
        scene(),
        SoftwareCamera::default(),
        sink,
        small_options(),
    )
    .unwrap();

    let image = session
        .capture(CaptureRequest::color(1))
        .block_on()
        .unwrap()
        .unwrap();
    let path = session.sink().path_for(&image.filename);
    let decoded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (32, 32));
    assert_eq!(decoded.get_pixel(16, 16).0, BLUE);
    assert_eq!(decoded.get_pixel(0, 0).0, BACKGROUND);

    std::fs::remove_dir_all(&dir).unwrap();
}

fn unique_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}
