use egui::{RichText, Ui};
use timeline_dep_graph::Timeline;

use crate::demo::chart::EguiCanvas;

/// Render the toolbar above the chart.
pub fn show_toolbar(timeline: &mut Timeline<EguiCanvas>, ui: &mut Ui) {
    ui.horizontal(|ui| {
        if ui.button("  Zoom In  ").clicked() {
            timeline.zoom_in();
        }
        if ui.button("  Zoom Out  ").clicked() {
            timeline.zoom_out();
        }
        ui.separator();
        if ui.button("  ◀  ").on_hover_text("Earlier").clicked() {
            timeline.move_left();
        }
        if ui.button("  ▶  ").on_hover_text("Later").clicked() {
            timeline.move_right();
        }
        ui.separator();
        if ui.button("  Fit  ").clicked() {
            timeline.fit();
        }

        let mut grouped = timeline.is_grouped();
        if ui.toggle_value(&mut grouped, "Group by status").changed() {
            timeline.toggle_grouping();
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(
                RichText::new(format!(
                    "{} items · {} arrows",
                    timeline.items().len(),
                    timeline.arrows().len()
                ))
                .size(11.0)
                .weak(),
            );
        });
    });
}
