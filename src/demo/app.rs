use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, Utc};
use egui::RichText;
use timeline_dep_graph::model::{Status, Task, TaskId};
use timeline_dep_graph::view::ShapeId;
use timeline_dep_graph::{Timeline, TimelineConfig, TimelineEvent};
use tracing::{info, warn};

use crate::demo::chart::{ChartInteraction, EguiCanvas};
use crate::demo::{theme, toolbar};

const TICK_EVERY: StdDuration = StdDuration::from_secs(1);

/// Main application state.
pub struct TimelineApp {
    pub timeline: Timeline<EguiCanvas>,
    last_tick: Instant,

    // Side panel state
    pub tasks_json: String,
    pub focus_id: String,
    pub selected: Option<TaskId>,
    pub hovered: Option<TaskId>,
    pub status_message: String,

    // Hover tracking, so leaving an item or container can be reported
    hovered_item: Option<TaskId>,
    hovered_container: Option<ShapeId>,
}

impl TimelineApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: TimelineConfig) -> Self {
        theme::apply_theme(&cc.egui_ctx);

        let now = Utc::now();
        let tasks = sample_tasks(now);
        let tasks_json = serde_json::to_string_pretty(&tasks).unwrap_or_default();
        let canvas = EguiCanvas::new(config.palette);
        let mut timeline = Timeline::new(canvas, config);
        let status_message = match timeline.set_tasks(tasks, now) {
            Ok(()) => "Ready".to_string(),
            Err(err) => format!("Sample rejected: {err}"),
        };

        Self {
            timeline,
            last_tick: Instant::now(),
            tasks_json,
            focus_id: String::new(),
            selected: None,
            hovered: None,
            status_message,
            hovered_item: None,
            hovered_container: None,
        }
    }

    pub fn apply_tasks_json(&mut self) {
        let tasks: Vec<Task> = match serde_json::from_str(&self.tasks_json) {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(%err, "could not parse tasks");
                self.status_message = format!("Invalid JSON: {err}");
                return;
            }
        };
        self.status_message = match self.timeline.set_tasks(tasks, Utc::now()) {
            Ok(()) => "Tasks updated".to_string(),
            Err(err) => format!("Rejected: {err}"),
        };
    }

    pub fn apply_focus(&mut self) {
        let id = self.focus_id.trim();
        if id.is_empty() {
            self.timeline.focus(None);
        } else {
            self.timeline.focus(Some(&TaskId::from(id)));
        }
    }

    fn dispatch(&mut self, interaction: ChartInteraction) {
        if let Some((id, click)) = interaction.item_clicked {
            self.timeline.on_item_clicked(&id, click);
        }

        match (self.hovered_item.clone(), interaction.item_hovered) {
            (Some(previous), Some((id, _))) if previous != id => {
                self.timeline.on_item_unhovered(&previous);
                self.hovered_item = None;
            }
            (Some(previous), None) => {
                self.timeline.on_item_unhovered(&previous);
                self.hovered_item = None;
            }
            _ => {}
        }
        if let Some((id, pointer)) = interaction.item_hovered {
            self.timeline.on_item_hovered(&id, pointer);
            self.hovered_item = Some(id);
        }

        if interaction.container_hovered != self.hovered_container {
            if let Some(previous) = self.hovered_container.take() {
                self.timeline.on_container_unhovered(previous);
            }
            if let Some(shape) = interaction.container_hovered {
                self.timeline.on_container_hovered(shape);
                self.hovered_container = Some(shape);
            }
        }
        if let Some(shape) = interaction.label_clicked {
            self.timeline.on_label_clicked(shape);
        } else if let Some(shape) = interaction.container_clicked {
            self.timeline.on_container_clicked(shape);
        }

        for event in self.timeline.take_events() {
            match event {
                TimelineEvent::TaskSelected(id) => {
                    info!(task = %id, "selected");
                    self.selected = Some(id);
                }
                TimelineEvent::TaskHovered(id) => self.hovered = Some(id),
                TimelineEvent::TaskUnhovered(id) => {
                    if self.hovered.as_ref() == Some(&id) {
                        self.hovered = None;
                    }
                }
                TimelineEvent::GroupingChanged(grouped) => {
                    self.status_message = if grouped {
                        "Grouped by status".to_string()
                    } else {
                        "Ungrouped".to_string()
                    };
                }
            }
        }
    }

    fn show_side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("tasks_panel")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                ui.heading("Tasks");
                ui.label(RichText::new("Snapshot as JSON").small().weak());
                egui::ScrollArea::vertical()
                    .max_height((ui.available_height() - 160.0).max(120.0))
                    .show(ui, |ui| {
                        ui.add(
                            egui::TextEdit::multiline(&mut self.tasks_json)
                                .code_editor()
                                .desired_width(f32::INFINITY),
                        );
                    });
                if ui.button("Update tasks").clicked() {
                    self.apply_tasks_json();
                }
                ui.separator();

                ui.horizontal(|ui| {
                    ui.label("Focus");
                    ui.text_edit_singleline(&mut self.focus_id);
                    if ui.button("Go").clicked() {
                        self.apply_focus();
                    }
                });
                ui.separator();

                let describe =
                    |id: &Option<TaskId>| id.as_ref().map(ToString::to_string).unwrap_or_default();
                ui.label(format!("Selected: {}", describe(&self.selected)));
                ui.label(format!("Hovered: {}", describe(&self.hovered)));
            });
    }
}

impl eframe::App for TimelineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.last_tick.elapsed() >= TICK_EVERY {
            self.timeline.tick(Utc::now());
            self.last_tick = Instant::now();
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            toolbar::show_toolbar(&mut self.timeline, ui);
        });
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(RichText::new(&self.status_message).small());
        });
        self.show_side_panel(ctx);

        let interaction = egui::CentralPanel::default()
            .show(ctx, |ui| self.timeline.vis_mut().show(ui))
            .inner;
        if self.timeline.vis_mut().take_layout_changed() {
            self.timeline.on_layout_changed();
        }
        self.dispatch(interaction);

        ctx.request_repaint_after(TICK_EVERY);
    }
}

/// A small pipeline with two expandable stages, relative to `now`.
pub fn sample_tasks(now: DateTime<Utc>) -> Vec<Task> {
    let ago = |minutes: i64| Some(now - Duration::minutes(minutes));

    let task2 = Task::new("2", "Task 2", Status::Running)
        .with_times(ago(25), None)
        .with_sub_tasks(vec![
            Task::new("2A", "Task 2A", Status::Success)
                .with_times(ago(25), ago(5))
                .with_dependents(["2B"]),
            Task::new("2B", "Task 2B", Status::Running).with_times(ago(4), None),
        ]);
    let task3 = Task::new("3", "Task 3", Status::Failed)
        .with_times(ago(27), Some(now))
        .with_sub_tasks(vec![
            Task::new("3A", "Task 3A", Status::Success)
                .with_times(ago(27), ago(15))
                .with_dependents(["3B", "3C"]),
            Task::new("3B", "Task 3B", Status::Success)
                .with_times(ago(14), ago(7))
                .with_dependents(["3D"]),
            Task::new("3C", "Task 3C", Status::Success)
                .with_times(ago(14), ago(8))
                .with_dependents(["3D"]),
            Task::new("3D", "Task 3D", Status::Failed).with_times(ago(5), Some(now)),
        ]);

    vec![
        Task::new("0", "Task 0", Status::Success)
            .with_times(ago(120), ago(80))
            .with_dependents(["1", "4"]),
        Task::new("1", "Task 1", Status::Success)
            .with_times(ago(76), ago(30))
            .with_dependents(["2", "3"]),
        task2,
        task3,
        Task::new("4", "Task 4", Status::Running).with_times(ago(76), None),
    ]
}
