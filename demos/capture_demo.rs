//! Captures a small scene in color and depth on a headless GPU.
//!
//! Run with `cargo run --example capture_demo -- [factor]`. Images are written
//! to `captures/`.

use highres::*;

fn main() -> Result<()> {
    init_logging();

    let factor = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<u32>().ok())
        .unwrap_or(2);

    let mut scene = Scene::new(Vec4::new(0.05, 0.05, 0.08, 1.0));
    // Floor
    scene.add_quad(
        [
            Vec3::new(-20.0, -1.0, 20.0),
            Vec3::new(20.0, -1.0, 20.0),
            Vec3::new(20.0, -1.0, -60.0),
            Vec3::new(-20.0, -1.0, -60.0),
        ],
        Vec4::new(0.3, 0.3, 0.35, 1.0),
    );
    // A row of panels receding from the camera
    for i in 0..6 {
        let z = -4.0 * i as f32;
        let x = if i % 2 == 0 { -1.5 } else { 1.5 };
        let shade = 1.0 - i as f32 / 8.0;
        scene.add_quad(
            [
                Vec3::new(x - 1.0, -1.0, z),
                Vec3::new(x + 1.0, -1.0, z),
                Vec3::new(x + 1.0, 1.5, z),
                Vec3::new(x - 1.0, 1.5, z),
            ],
            Vec4::new(0.9 * shade, 0.4 * shade, 0.2, 1.0),
        );
    }

    let camera = Camera::new(1280.0 / 720.0)
        .looking_at(Vec3::new(0.0, 1.0, 6.0), Vec3::new(0.0, 0.0, -10.0))
        .with_clip_planes(0.5, 60.0);

    let session = headless_session(
        1280,
        720,
        scene,
        camera,
        FileSink::new("captures"),
        CaptureOptions::default(),
    )?;
    let factor = factor.min(session.max_factor());
    log::info!("Capturing at factor {factor} (max {})", session.max_factor());

    for request in [CaptureRequest::color(factor), CaptureRequest::depth(factor)] {
        if let Some(image) = pollster::block_on(session.capture(request))? {
            println!(
                "{} capture: {} ({}x{}) in {:.2}s",
                image.mode.name(),
                session.sink().path_for(&image.filename).display(),
                image.width,
                image.height,
                image.elapsed.as_secs_f64()
            );
        }
    }

    Ok(())
}
