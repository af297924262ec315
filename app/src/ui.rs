use std::path::Path;

use eframe::egui::{
    self, Align2, Color32, CornerRadius, FontId, Pos2, Rect, Sense, Stroke, Ui,
};

use brewvine::Prediction;

use crate::app::{ClassifierApp, ExampleImage};

/// Bar colors, one per category, matching the classic chart palette.
fn bar_colors() -> [Color32; 2] {
    [egui::hex_color!("#FF9999"), egui::hex_color!("#66B3FF")]
}

/// Blocking screen shown when the model artifact could not be loaded.
pub fn draw_load_failure(app: &ClassifierApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.heading("Image Classification: Beer or Wine");
        ui.separator();
        let message = app
            .load_error
            .as_deref()
            .unwrap_or("the model could not be loaded");
        ui.colored_label(
            ui.visuals().error_fg_color,
            format!("An error occurred while loading the model: {message}"),
        );
        ui.label("Classification is unavailable until the model artifact is in place.");
    });
}

/// Left column: upload control, example selector, input image and the raw
/// probability mapping.
pub fn draw_input_panel(app: &mut ClassifierApp, ctx: &egui::Context) {
    egui::SidePanel::left("input_panel")
        .default_width(380.0)
        .show(ctx, |ui| {
            ui.heading("Image Classification: Beer or Wine");
            ui.separator();

            draw_upload_control(app, ctx, ui);
            ui.separator();
            draw_example_selector(app, ctx, ui);
            ui.separator();

            if let Some(error) = app.session.last_error() {
                ui.colored_label(ui.visuals().error_fg_color, format!("An error occurred: {error}"));
                ui.separator();
            }

            draw_input_image(app, ui);
            draw_prediction_mapping(app, ui);
        });
}

fn draw_upload_control(app: &mut ClassifierApp, ctx: &egui::Context, ui: &mut Ui) {
    ui.label("Choose an image... (jpg, jpeg, png)");
    ui.label("Drag and drop a file onto the window, or enter a path:");
    ui.horizontal(|ui| {
        ui.text_edit_singleline(&mut app.path_input);
        if ui.button("Classify").clicked() && !app.path_input.trim().is_empty() {
            let path = app.path_input.trim().to_string();
            app.classify_file(ctx, Path::new(&path));
        }
    });
}

fn draw_example_selector(app: &mut ClassifierApp, ctx: &egui::Context, ui: &mut Ui) {
    ui.heading("Example Images");
    ui.label("Click to see predictions:");
    for example in ExampleImage::ALL {
        if ui
            .radio(app.selected_example == Some(example), example.label())
            .clicked()
        {
            app.select_example(ctx, example);
        }
    }
}

fn draw_input_image(app: &ClassifierApp, ui: &mut Ui) {
    if let Some((caption, texture)) = &app.input_texture {
        ui.add(egui::Image::new(texture).max_width(ui.available_width()));
        ui.small(caption.as_str());
        ui.separator();
    }
}

fn draw_prediction_mapping(app: &ClassifierApp, ui: &mut Ui) {
    if let Some(prediction) = app.session.current() {
        for (label, probability) in prediction.scores() {
            ui.monospace(format!("{label}: {probability:.4}"));
        }
    }
}

/// Right column: the bar chart of the session's current result.
pub fn draw_chart_panel(app: &ClassifierApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.heading("Predictions");
        ui.separator();
        match app.session.current() {
            Some(prediction) => draw_bar_chart(ui, prediction),
            None => {
                ui.label("No prediction yet. Upload an image or pick an example.");
            }
        }
    });
}

/// Draws one bar per category, x-axis = category label, y-axis = probability
/// in [0, 1].
fn draw_bar_chart(ui: &mut Ui, prediction: &Prediction) {
    let desired = egui::vec2(ui.available_width(), ui.available_height().min(420.0));
    let (response, painter) = ui.allocate_painter(desired, Sense::hover());
    // Margins leave room for the axis tick labels and the bar captions.
    let plot = Rect::from_min_max(
        Pos2::new(response.rect.left() + 48.0, response.rect.top() + 16.0),
        Pos2::new(response.rect.right() - 16.0, response.rect.bottom() - 32.0),
    );

    let grid_color = ui.visuals().weak_text_color();
    let text_color = ui.visuals().text_color();

    for step in 0..=4 {
        let fraction = step as f32 / 4.0;
        let y = plot.bottom() - fraction * plot.height();
        painter.line_segment(
            [Pos2::new(plot.left(), y), Pos2::new(plot.right(), y)],
            Stroke::new(1.0, grid_color.linear_multiply(0.4)),
        );
        painter.text(
            Pos2::new(plot.left() - 8.0, y),
            Align2::RIGHT_CENTER,
            format!("{fraction:.2}"),
            FontId::proportional(12.0),
            grid_color,
        );
    }

    let colors = bar_colors();
    let slot = plot.width() / prediction.scores().len() as f32;
    for (i, (label, probability)) in prediction.scores().iter().enumerate() {
        let center_x = plot.left() + slot * (i as f32 + 0.5);
        let half_width = slot * 0.3;
        let top = plot.bottom() - probability.clamp(0.0, 1.0) * plot.height();
        let bar = Rect::from_min_max(
            Pos2::new(center_x - half_width, top),
            Pos2::new(center_x + half_width, plot.bottom()),
        );
        painter.rect_filled(bar, CornerRadius::ZERO, colors[i % colors.len()]);
        painter.text(
            Pos2::new(center_x, top - 4.0),
            Align2::CENTER_BOTTOM,
            format!("{probability:.2}"),
            FontId::proportional(12.0),
            text_color,
        );
        painter.text(
            Pos2::new(center_x, plot.bottom() + 6.0),
            Align2::CENTER_TOP,
            label,
            FontId::default(),
            text_color,
        );
    }

    painter.line_segment(
        [
            Pos2::new(plot.left(), plot.bottom()),
            Pos2::new(plot.right(), plot.bottom()),
        ],
        Stroke::new(1.5, text_color),
    );
}
