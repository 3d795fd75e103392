//! Main caption tool application.
//!
//! This module contains the `CaptionTool` struct which implements the
//! `eframe::App` trait: a source panel on the left, the image with its
//! selection overlay in the middle, and submission controls plus captions at
//! the bottom.

use super::rendering::{color_image, image_rect, status_label, SurfaceTextures};
use super::selection::{process_pointer, SelectionEvent};
use super::settings::Settings;
use super::state::{ActiveSource, BackgroundEvent};
use crate::caption::CaptionClient;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::image_processing::ImageProcessor;
use crate::session::{LoadOutcome, Session};
use crate::source::{ImageLoader, ImageSource};
use eframe::egui;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use tracing::{info, warn};
use url::Url;

/// Longest side of a gallery preview, in pixels.
const THUMBNAIL_SIZE: u32 = 96;

/// The interactive caption application.
pub struct CaptionTool {
    session: Session,
    textures: SurfaceTextures,

    // Effective configuration (environment + settings)
    base_config: Config,
    config: Config,

    // Background work
    rx: Receiver<BackgroundEvent>,
    tx: Sender<BackgroundEvent>,

    // Source panel state
    url_input: String,
    active_source: ActiveSource,
    pending_source: ActiveSource,
    thumbnails: Vec<Option<egui::TextureHandle>>,
    thumbnails_requested: bool,

    // Settings
    settings: Settings,
    show_settings: bool,
}

impl CaptionTool {
    /// Creates a new caption tool.
    ///
    /// # Arguments
    /// * `config` - Application configuration; persisted settings are layered on top
    pub fn new(config: Config) -> Self {
        let (tx, rx) = channel();
        let settings = Settings::load();
        let effective = settings.apply_to(&config).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring invalid saved settings");
            config.clone()
        });

        Self {
            session: Session::new(&effective),
            textures: SurfaceTextures::default(),
            base_config: config,
            config: effective,
            rx,
            tx,
            url_input: settings.last_url.clone(),
            active_source: ActiveSource::None,
            pending_source: ActiveSource::None,
            thumbnails: Vec::new(),
            thumbnails_requested: false,
            settings,
            show_settings: false,
        }
    }

    /// Starts loading an image in the background.
    pub(crate) fn start_load(&mut self, ctx: &egui::Context, source: ImageSource, active: ActiveSource) {
        let ticket = self.session.issue_load();
        self.pending_source = active;
        let config = self.config.clone();

        let task = async move {
            let result = match ImageLoader::new(&config) {
                Ok(loader) => loader.load(&source).await,
                Err(e) => Err(e),
            };
            BackgroundEvent::ImageLoaded { ticket, result }
        };
        spawn_task(self.tx.clone(), ctx.clone(), task, move |e| {
            BackgroundEvent::ImageLoaded {
                ticket,
                result: Err(e),
            }
        });
    }

    /// Fetches a preview of every gallery item, once per window.
    fn request_thumbnails(&mut self, ctx: &egui::Context) {
        if self.thumbnails_requested {
            return;
        }
        self.thumbnails_requested = true;
        self.thumbnails = vec![None; self.config.gallery.len()];

        for index in 0..self.config.gallery.len() {
            let config = self.config.clone();
            let task = async move {
                let result = match ImageLoader::new(&config) {
                    Ok(loader) => loader
                        .load(&ImageSource::Gallery(index))
                        .await
                        .map(|image| ImageProcessor::thumbnail(&image, THUMBNAIL_SIZE)),
                    Err(e) => Err(e),
                };
                BackgroundEvent::Thumbnail { index, result }
            };
            spawn_task(self.tx.clone(), ctx.clone(), task, move |e| {
                BackgroundEvent::Thumbnail {
                    index,
                    result: Err(e),
                }
            });
        }
    }

    /// Composes the current image and selection and submits it.
    fn submit(&mut self, ctx: &egui::Context) {
        let Some(image_data) = self.session.begin_submission() else {
            return;
        };
        let config = self.config.clone();

        let task = async move {
            let result = match CaptionClient::new(&config) {
                Ok(client) => client.caption(&image_data).await,
                Err(e) => Err(e),
            };
            BackgroundEvent::Captions(result)
        };
        spawn_task(self.tx.clone(), ctx.clone(), task, |e| {
            BackgroundEvent::Captions(Err(e))
        });
    }

    /// Processes events from background threads.
    fn process_background_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                BackgroundEvent::ImageLoaded { ticket, result } => {
                    if self.session.complete_load(ticket, result) == LoadOutcome::Applied {
                        self.active_source = self.pending_source;
                    }
                }
                BackgroundEvent::Captions(result) => {
                    self.session.finish_submission(result);
                }
                BackgroundEvent::Thumbnail { index, result } => match result {
                    Ok(thumb) => {
                        if let Some(slot) = self.thumbnails.get_mut(index) {
                            *slot = Some(ctx.load_texture(
                                format!("gallery-{}", index),
                                color_image(&thumb),
                                egui::TextureOptions::LINEAR,
                            ));
                        }
                    }
                    // The text label stays in place of the preview.
                    Err(e) => warn!(index, error = %e, "gallery preview unavailable"),
                },
            }
        }
    }

    /// Picks up files dropped onto the window.
    fn process_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if let Some(path) = dropped.into_iter().next() {
            self.start_load(ctx, ImageSource::File(path), ActiveSource::File);
        }
    }

    /// Re-derives the effective configuration after a settings change.
    fn apply_settings(&mut self) {
        match self.settings.apply_to(&self.base_config) {
            Ok(config) => {
                self.session.set_caption_format(config.caption_format.clone());
                self.config = config;
                info!(endpoint = %self.config.endpoint, "settings applied");
            }
            Err(e) => warn!(error = %e, "invalid settings, keeping previous configuration"),
        }
        if let Err(e) = self.settings.save() {
            warn!(error = %e, "failed to save settings");
        }
    }

    /// Renders the source panel (file, URL, gallery).
    fn render_sources_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.heading("Image");

        let file_selected = self.active_source == ActiveSource::File;
        if ui.selectable_label(file_selected, "📂 Open file…").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("Images", &["png", "jpg", "jpeg"])
                .pick_file()
            {
                self.start_load(ctx, ImageSource::File(path), ActiveSource::File);
            }
        }

        ui.add_space(8.0);
        ui.label("Image URL:");
        let response = ui.add(
            egui::TextEdit::singleline(&mut self.url_input)
                .hint_text("https://…/image.png")
                .desired_width(f32::INFINITY),
        );
        let enter_pressed = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if ui.button("Load URL").clicked() || enter_pressed {
            self.load_typed_url(ctx);
        }

        ui.separator();
        ui.heading("Gallery");
        let gallery: Vec<Url> = self.config.gallery.clone();
        ui.label(format!("Loaded {} gallery items.", gallery.len()));
        egui::ScrollArea::vertical().id_salt("gallery_scroll").show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                for (index, url) in gallery.iter().enumerate() {
                    let selected = self.active_source == ActiveSource::Gallery(index);
                    let label = format!("Gallery image {}", index + 1);
                    let response = match self.thumbnails.get(index).and_then(Option::as_ref) {
                        Some(texture) => {
                            let side = THUMBNAIL_SIZE as f32;
                            let image = egui::Image::from_texture(egui::load::SizedTexture::from_handle(texture))
                                .max_size(egui::vec2(side, side));
                            ui.add(egui::Button::image(image).selected(selected))
                        }
                        None => ui.selectable_label(selected, label.as_str()),
                    };
                    if response.on_hover_text(format!("{}\n{}", label, url)).clicked() {
                        self.start_load(ctx, ImageSource::Gallery(index), ActiveSource::Gallery(index));
                    }
                }
            });
        });
    }

    fn load_typed_url(&mut self, ctx: &egui::Context) {
        let raw = self.url_input.trim().to_string();
        if raw.is_empty() {
            return;
        }
        match Url::parse(&raw) {
            Ok(url) => {
                self.settings.last_url = raw;
                if let Err(e) = self.settings.save() {
                    warn!(error = %e, "failed to save settings");
                }
                self.start_load(ctx, ImageSource::Url(url), ActiveSource::Url);
            }
            Err(e) => {
                let ticket = self.session.issue_load();
                self.session
                    .complete_load(ticket, Err(AppError::load(format!("Invalid URL: {}", e))));
            }
        }
    }

    /// Renders submission controls, status and captions.
    fn render_captions_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            let submit = ui.add_enabled(self.session.can_submit(), egui::Button::new("Generate captions"));
            if submit.clicked() {
                self.submit(ctx);
            }

            let selection = self.session.selection();
            let can_clear = selection.has_selection() && !selection.is_dragging();
            if ui.add_enabled(can_clear, egui::Button::new("Clear box")).clicked() {
                self.session.clear_selection();
            }

            if ui.button("⚙").clicked() {
                self.show_settings = !self.show_settings;
            }

            if self.session.is_busy() {
                ui.spinner();
            }
            let status = self.session.status();
            status_label(ui, &status.to_string(), status.is_error());
        });

        if self.show_settings {
            self.render_settings_ui(ui);
        }

        let captions = self.session.captions().clone();
        if let Some(primary) = &captions.primary {
            ui.separator();
            ui.horizontal(|ui| {
                ui.heading(primary);
                if ui.button("Copy").clicked() {
                    match arboard::Clipboard::new() {
                        Ok(mut clipboard) => {
                            if let Err(e) = clipboard.set_text(primary.clone()) {
                                warn!(error = %e, "failed to copy caption");
                            }
                        }
                        Err(e) => warn!(error = %e, "clipboard unavailable"),
                    }
                }
            });
            ui.label(egui::RichText::new("Other captions").strong());
            egui::ScrollArea::vertical()
                .id_salt("captions_scroll")
                .max_height(140.0)
                .show(ui, |ui| {
                    for (i, caption) in captions.alternates.iter().enumerate() {
                        ui.label(format!("{}. {}", i + 1, caption));
                    }
                });
        }
        ui.add_space(6.0);
    }

    /// Renders the settings panel.
    fn render_settings_ui(&mut self, ui: &mut egui::Ui) {
        ui.separator();
        ui.label("Settings");

        ui.horizontal(|ui| {
            ui.label("Caption endpoint:");
            ui.add(
                egui::TextEdit::singleline(&mut self.settings.endpoint)
                    .hint_text(self.base_config.endpoint.as_str())
                    .desired_width(320.0),
            );
        });
        ui.checkbox(&mut self.settings.dash_to_comma, "Replace \" - \" with \", \"");

        ui.horizontal(|ui| {
            let mut limited = self.settings.max_words.is_some();
            ui.checkbox(&mut limited, "Limit words");
            if limited {
                let words = self.settings.max_words.get_or_insert(6);
                ui.add(egui::DragValue::new(words).range(1..=50));
            } else {
                self.settings.max_words = None;
            }
        });

        if ui.button("Apply").clicked() {
            self.apply_settings();
        }
    }

    /// Renders the image view and feeds pointer input to the session.
    fn render_image_ui(&mut self, ui: &mut egui::Ui) {
        let Some(geometry) = self.session.geometry() else {
            ui.centered_and_justified(|ui| {
                ui.label("Open an image, paste a URL, or pick a gallery item.");
            });
            return;
        };

        let rect = image_rect(ui.available_rect_before_wrap(), geometry.buffer_size());
        let _response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        self.textures.paint(ui.painter(), rect);

        // Selection is frozen while a composite is being captioned.
        if !self.session.is_busy() {
            let event = process_pointer(ui, rect, &mut self.session);
            if event != SelectionEvent::None {
                ui.ctx().request_repaint();
            }
        }
    }
}

impl eframe::App for CaptionTool {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_background_events(ctx);
        self.process_dropped_files(ctx);
        self.request_thumbnails(ctx);
        self.textures.sync(ctx, &self.session);

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.session.clear_selection();
        }

        egui::SidePanel::left("sources")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| self.render_sources_ui(ui, ctx));

        egui::TopBottomPanel::bottom("captions")
            .resizable(false)
            .show(ctx, |ui| self.render_captions_ui(ui, ctx));

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_image_ui(ui);
        });

        // Input handled this frame may have redrawn the overlay.
        if self.textures.sync(ctx, &self.session) {
            ctx.request_repaint();
        }
        if self.session.is_busy() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

/// Runs `task` on a fresh thread with its own current-thread runtime and
/// sends the resulting event back to the UI.
fn spawn_task<Fut, F>(tx: Sender<BackgroundEvent>, ctx: egui::Context, task: Fut, on_runtime_error: F)
where
    Fut: Future<Output = BackgroundEvent> + Send + 'static,
    F: FnOnce(AppError) -> BackgroundEvent + Send + 'static,
{
    thread::spawn(move || {
        let event = match build_runtime() {
            Ok(rt) => rt.block_on(task),
            Err(e) => on_runtime_error(e),
        };
        let _ = tx.send(event);
        ctx.request_repaint();
    });
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::ui(format!("Failed to create async runtime: {}", e)))
}
