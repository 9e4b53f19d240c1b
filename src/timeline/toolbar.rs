use tracing::debug;

use super::Timeline;
use crate::model::TimelineWindow;
use crate::view::Visualization;

/// Window and grouping controls, as offered by the toolbar above the chart.
impl<V: Visualization> Timeline<V> {
    pub fn zoom_in(&mut self) {
        let ratio = self.config.toolbar.zoom_ratio;
        self.change_window(|w| w.zoom_in(ratio));
    }

    pub fn zoom_out(&mut self) {
        let ratio = self.config.toolbar.zoom_ratio;
        self.change_window(|w| w.zoom_out(ratio));
    }

    /// Show earlier times.
    pub fn move_left(&mut self) {
        let ratio = self.config.toolbar.motion_ratio;
        self.change_window(|w| w.shift(ratio));
    }

    /// Show later times.
    pub fn move_right(&mut self) {
        let ratio = self.config.toolbar.motion_ratio;
        self.change_window(|w| w.shift(-ratio));
    }

    pub fn fit(&mut self) {
        self.vis.fit();
    }

    pub fn toggle_grouping(&mut self) {
        let grouped = !self.grouping.is_grouped();
        self.set_grouped(grouped);
    }

    fn change_window(&mut self, change: impl FnOnce(&TimelineWindow) -> TimelineWindow) {
        let Some(window) = self.vis.window() else {
            return;
        };
        let next = change(&window);
        debug!(start = %next.start, end = %next.end, "window changed");
        self.vis.set_window(next);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::config::TimelineConfig;
    use crate::model::{Status, Task, TimelineWindow};
    use crate::timeline::{Timeline, TimelineEvent};
    use crate::view::memory::MemoryCanvas;
    use crate::view::{LaneKind, WindowControl};

    fn timeline() -> Timeline<MemoryCanvas> {
        let start = Utc.with_ymd_and_hms(2020, 10, 1, 0, 0, 0).unwrap();
        let mut timeline =
            Timeline::new(MemoryCanvas::new(800.0, 600.0), TimelineConfig::default());
        timeline
            .set_tasks(
                vec![Task::new("a", "a", Status::Running)
                    .with_times(Some(start), Some(start + Duration::seconds(100)))],
                start + Duration::hours(1),
            )
            .unwrap();
        timeline
    }

    fn window(timeline: &Timeline<MemoryCanvas>) -> TimelineWindow {
        timeline.vis().window().unwrap()
    }

    #[test]
    fn zoom_and_move_by_a_fifth() {
        let mut timeline = timeline();
        let fitted = window(&timeline);
        assert_eq!(fitted.length(), Duration::seconds(100));

        timeline.zoom_in();
        assert_eq!(window(&timeline).length(), Duration::seconds(80));
        timeline.zoom_out();
        assert_eq!(window(&timeline).length(), Duration::seconds(96));

        let before = window(&timeline);
        timeline.move_left();
        let after = window(&timeline);
        assert_eq!(before.start - after.start, Duration::milliseconds(19_200));
        timeline.move_right();
        assert_eq!(window(&timeline), before);

        timeline.fit();
        assert_eq!(window(&timeline), fitted);
        assert_eq!(timeline.vis().fit_count(), 2);
    }

    #[test]
    fn toggle_grouping_switches_lanes() {
        let mut timeline = timeline();
        timeline.toggle_grouping();
        assert!(timeline.is_grouped());
        assert_eq!(timeline.vis().lanes()[1].id, "running");
        assert_eq!(timeline.vis().item("a").unwrap().group, "running");

        timeline.toggle_grouping();
        assert_eq!(timeline.vis().lanes()[1].id, "unGrouped");
        assert_eq!(timeline.vis().lanes()[0].kind, LaneKind::Padding);
        assert_eq!(
            timeline.take_events(),
            vec![
                TimelineEvent::GroupingChanged(true),
                TimelineEvent::GroupingChanged(false)
            ]
        );
    }
}
