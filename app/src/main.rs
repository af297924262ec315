mod app;
mod ui;

use app::ClassifierApp;

fn main() -> eframe::Result<()> {
    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Image Classification: Beer or Wine",
        native_options,
        Box::new(|_cc| Ok(Box::new(ClassifierApp::new()))),
    )
}
