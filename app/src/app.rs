use std::path::Path;
use std::sync::Arc;

use brewvine::image::DynamicImage;
use brewvine::{classify, decode, load_model, preprocess, Model, Prediction, CATEGORIES};
use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions};
use eframe::{App, Frame};

use crate::ui;

/// File extensions the upload control accepts.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// The three bundled convenience inputs offered by the radio selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleImage {
    Beer,
    Wine,
    Unknown,
}

impl ExampleImage {
    pub const ALL: [ExampleImage; 3] =
        [ExampleImage::Beer, ExampleImage::Wine, ExampleImage::Unknown];

    pub fn path(self) -> &'static str {
        match self {
            ExampleImage::Beer => "assets/Beer.jpg",
            ExampleImage::Wine => "assets/Wine.jpg",
            ExampleImage::Unknown => "assets/Unknown.jpg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExampleImage::Beer => "Beer.jpg",
            ExampleImage::Wine => "Wine.jpg",
            ExampleImage::Unknown => "Unknown.jpg",
        }
    }
}

/// Per-session mutable state, owned by one running app instance and passed
/// explicitly to the rendering code.
///
/// Exactly one prediction is "current" at a time; a new classification
/// overwrites it. A failed request reports its error but leaves the prior
/// current result in place.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<Prediction>,
    last_error: Option<String>,
}

impl Session {
    pub fn current(&self) -> Option<&Prediction> {
        self.current.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn record_success(&mut self, prediction: Prediction) {
        self.current = Some(prediction);
        self.last_error = None;
    }

    pub fn record_failure(&mut self, message: String) {
        self.last_error = Some(message);
    }
}

/// The main application struct: the loaded model handle plus this session's
/// state and input selection.
pub struct ClassifierApp {
    /// The memoized process-wide model handle; `None` when loading failed.
    model: Option<Arc<Model>>,
    /// The loader failure message, shown as a blocking error screen.
    pub load_error: Option<String>,
    pub session: Session,
    pub selected_example: Option<ExampleImage>,
    /// Contents of the path entry field of the upload control.
    pub path_input: String,
    /// The currently displayed input image, with its caption.
    pub input_texture: Option<(String, TextureHandle)>,
}

impl ClassifierApp {
    /// Creates the application, triggering the one-time model load.
    pub fn new() -> Self {
        let (model, load_error) = match load_model() {
            Ok(model) => (Some(model), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            model,
            load_error,
            session: Session::default(),
            selected_example: None,
            path_input: String::new(),
            input_texture: None,
        }
    }

    /// Runs the full pipeline on raw uploaded bytes: decode, display,
    /// preprocess, classify, store the result in session state.
    pub fn classify_bytes(&mut self, ctx: &egui::Context, caption: &str, bytes: &[u8]) {
        let Some(model) = self.model.clone() else {
            return;
        };
        let raw = match decode(bytes) {
            Ok(raw) => raw,
            Err(e) => {
                self.session.record_failure(e.to_string());
                return;
            }
        };
        self.input_texture = Some((caption.to_string(), load_texture(ctx, &raw)));
        let normalized = preprocess(&raw);
        match classify(&normalized, model.as_ref(), CATEGORIES) {
            Ok(prediction) => self.session.record_success(prediction),
            Err(e) => self.session.record_failure(e.to_string()),
        }
    }

    /// Classifies an image file from disk, rejecting unsupported extensions.
    pub fn classify_file(&mut self, ctx: &egui::Context, path: &Path) {
        if !has_allowed_extension(path) {
            self.session.record_failure(format!(
                "{} is not a supported image file (expected jpg, jpeg or png)",
                path.display()
            ));
            return;
        }
        let caption = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match std::fs::read(path) {
            Ok(bytes) => self.classify_bytes(ctx, &caption, &bytes),
            Err(e) => self
                .session
                .record_failure(format!("could not read {}: {}", path.display(), e)),
        }
    }

    pub fn select_example(&mut self, ctx: &egui::Context, example: ExampleImage) {
        self.selected_example = Some(example);
        self.classify_file(ctx, Path::new(example.path()));
    }

    /// Classifies files dragged onto the window, most recent drop last.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            if let Some(path) = file.path {
                self.classify_file(ctx, &path);
            } else if let Some(bytes) = file.bytes {
                self.classify_bytes(ctx, &file.name, &bytes);
            }
        }
    }
}

impl App for ClassifierApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        if self.load_error.is_some() {
            // Loader failure blocks all further interaction.
            ui::draw_load_failure(self, ctx);
            return;
        }
        self.handle_dropped_files(ctx);
        ui::draw_input_panel(self, ctx);
        ui::draw_chart_panel(self, ctx);
    }
}

pub fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn load_texture(ctx: &egui::Context, raw: &DynamicImage) -> TextureHandle {
    let rgb = raw.to_rgb8();
    let size = [rgb.width() as usize, rgb.height() as usize];
    let color_image = ColorImage::from_rgb(size, rgb.as_raw());
    ctx.load_texture("input-image", color_image, TextureOptions::LINEAR)
}
