use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use region_caption_core::geometry::{DisplayRect, Point};
use region_caption_core::{AppError, CaptionFormat, Config, LoadOutcome, Session, Status};

const GRAY: Rgba<u8> = Rgba([128, 128, 128, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

fn gray_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, GRAY))
}

fn decode(png: &[u8]) -> RgbaImage {
    image::load_from_memory_with_format(png, ImageFormat::Png)
        .unwrap()
        .to_rgba8()
}

fn session() -> Session {
    Session::new(&Config::builder().build().unwrap())
}

#[test]
fn test_drag_on_scaled_display_marks_buffer_region() {
    let mut session = session();
    session.set_image(&gray_image(1800, 1200)).unwrap();
    let geometry = session.geometry().unwrap();
    assert_eq!((geometry.width, geometry.height), (900, 600));

    // Shown at half size, so every display pixel covers two buffer pixels.
    let display = DisplayRect::new(0.0, 0.0, 450.0, 300.0);
    assert!(session.pointer_down(Point::new(5.0, 5.0), display));
    assert!(session.pointer_move(Point::new(55.0, 30.0), display));
    assert!(session.pointer_up());

    let rect = session.selection().selection().unwrap();
    assert_eq!((rect.x, rect.y, rect.width, rect.height), (10.0, 10.0, 100.0, 50.0));

    let composite = decode(&session.composite_png().unwrap().unwrap());
    assert_eq!(composite.dimensions(), (900, 600));
    // Left edge band spans columns 7..=12 at 6px.
    for x in 7..=12 {
        assert_eq!(*composite.get_pixel(x, 35), RED, "column {}", x);
    }
    assert_ne!(*composite.get_pixel(6, 35), RED);
    assert_ne!(*composite.get_pixel(13, 35), RED);
    assert_ne!(*composite.get_pixel(60, 35), RED);
}

#[test]
fn test_composite_without_selection_is_base_image() {
    let mut session = session();
    session.set_image(&gray_image(40, 30)).unwrap();
    let composite = decode(&session.composite_png().unwrap().unwrap());
    assert!(composite.pixels().all(|p| *p == GRAY));
}

#[test]
fn test_click_without_drag_leaves_composite_unchanged() {
    let mut session = session();
    session.set_image(&gray_image(100, 80)).unwrap();
    let display = DisplayRect::new(0.0, 0.0, 100.0, 80.0);
    assert!(session.pointer_down(Point::new(40.0, 40.0), display));
    assert!(session.pointer_up());
    assert!(session.selection().has_selection());

    let composite = decode(&session.composite_png().unwrap().unwrap());
    assert!(composite.pixels().all(|p| *p == GRAY));
    let overlay = session.overlay_surface().unwrap();
    assert!(overlay.pixels().all(|p| p.0[3] == 0));
}

#[test]
fn test_cleared_selection_is_not_submitted() {
    let mut session = session();
    session.set_image(&gray_image(200, 100)).unwrap();
    let display = DisplayRect::new(0.0, 0.0, 200.0, 100.0);
    session.pointer_down(Point::new(20.0, 20.0), display);
    session.pointer_move(Point::new(80.0, 60.0), display);
    session.pointer_up();
    session.clear_selection();

    assert!(!session.selection().has_selection());
    let composite = decode(&session.composite_png().unwrap().unwrap());
    assert!(composite.pixels().all(|p| *p == GRAY));
}

#[test]
fn test_submission_round_trip_formats_captions() {
    let config = Config::builder()
        .with_caption_format(CaptionFormat::dash_to_comma())
        .build()
        .unwrap();
    let mut session = Session::new(&config);
    session.set_image(&gray_image(64, 48)).unwrap();

    let data_uri = session.begin_submission().unwrap();
    assert!(data_uri.starts_with("data:image/png;base64,"));
    assert!(session.is_busy());
    assert_eq!(*session.status(), Status::Processing);
    assert!(session.begin_submission().is_none());

    session.finish_submission(Ok(vec![
        "A boat - red".to_string(),
        "Water".to_string(),
    ]));
    assert!(!session.is_busy());
    assert_eq!(session.captions().primary.as_deref(), Some("A boat, red"));
    assert_eq!(session.captions().alternates, vec!["Water".to_string()]);
}

#[test]
fn test_service_error_is_shown_and_captions_cleared() {
    let mut session = session();
    session.set_image(&gray_image(64, 48)).unwrap();
    session.begin_submission().unwrap();
    session.finish_submission(Err(AppError::CaptionService("model unavailable".to_string())));

    assert!(session.captions().is_empty());
    assert_eq!(session.status().to_string(), "Error: model unavailable");
    assert!(session.can_submit());
}

#[test]
fn test_stale_load_does_not_replace_newer_image() {
    let mut session = session();
    let first = session.issue_load();
    let second = session.issue_load();

    assert_eq!(
        session.complete_load(second, Ok(gray_image(300, 200))),
        LoadOutcome::Applied
    );
    assert_eq!(
        session.complete_load(first, Ok(gray_image(1000, 1000))),
        LoadOutcome::Stale
    );
    assert_eq!(session.natural_size(), Some((300, 200)));
}

#[test]
fn test_failed_load_keeps_previous_image_and_selection() {
    let mut session = session();
    session.set_image(&gray_image(300, 200)).unwrap();
    let display = DisplayRect::new(0.0, 0.0, 300.0, 200.0);
    session.pointer_down(Point::new(10.0, 10.0), display);
    session.pointer_move(Point::new(50.0, 50.0), display);
    session.pointer_up();

    let ticket = session.issue_load();
    let outcome = session.complete_load(ticket, Err(AppError::load("Failed to load image from URL (404 Not Found)")));
    assert_eq!(outcome, LoadOutcome::Failed);
    assert!(session.status().is_error());
    assert_eq!(session.natural_size(), Some((300, 200)));
    assert!(session.selection().has_selection());
}
