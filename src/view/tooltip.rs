use chrono::{DateTime, SecondsFormat, Utc};
use egui::Pos2;

use super::position::to_absolute;
use super::{LayoutSource, Overlay};
use crate::model::{ItemData, TaskId};

/// A timestamp shown above one edge of a hovered item, plus the instant the
/// time marker is drawn at.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipView {
    pub task_id: TaskId,
    pub text: String,
    pub anchor: Pos2,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Start,
    Finish,
}

/// Shows the start or finish time of the hovered item, whichever edge the
/// pointer is closer to.
#[derive(Debug, Default)]
pub struct TimeTooltip {
    hovered: Option<(TaskId, Edge)>,
}

impl TimeTooltip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hovered(&self) -> Option<&TaskId> {
        self.hovered.as_ref().map(|(id, _)| id)
    }

    pub fn show<V>(&mut self, vis: &mut V, item: &ItemData, pointer: DateTime<Utc>)
    where
        V: LayoutSource + Overlay + ?Sized,
    {
        let edge = match (item.start, item.end) {
            (Some(start), Some(end)) => {
                if (pointer - start).abs() <= (end - pointer).abs() {
                    Edge::Start
                } else {
                    Edge::Finish
                }
            }
            (Some(_), None) => Edge::Start,
            (None, Some(_)) => Edge::Finish,
            (None, None) => return,
        };
        self.hovered = Some((item.id.clone(), edge));
        self.refresh(vis, Some(item));
    }

    pub fn hide<V: Overlay + ?Sized>(&mut self, vis: &mut V) {
        if self.hovered.take().is_some() {
            vis.hide_tooltip();
        }
    }

    /// Re-anchor after a layout change; `item` is the current version of the
    /// hovered item, `None` if it is gone.
    pub fn refresh<V>(&mut self, vis: &mut V, item: Option<&ItemData>)
    where
        V: LayoutSource + Overlay + ?Sized,
    {
        let Some((id, edge)) = self.hovered.clone() else {
            return;
        };
        match item.filter(|item| item.id == id).and_then(|item| view_for(&*vis, item, edge)) {
            Some(view) => vis.show_tooltip(&view),
            None => self.hide(vis),
        }
    }
}

fn view_for<V: LayoutSource + ?Sized>(vis: &V, item: &ItemData, edge: Edge) -> Option<TooltipView> {
    let time = match edge {
        Edge::Start => item.start?,
        Edge::Finish => item.end?,
    };
    let relative = vis.item_position(&item.id)?;
    let position = to_absolute(&relative, vis.frame_height(), vis.container_height());
    let x = match edge {
        Edge::Start => position.left,
        Edge::Finish => position.right,
    };
    Some(TooltipView {
        task_id: item.id.clone(),
        text: time.to_rfc3339_opts(SecondsFormat::Secs, true),
        anchor: Pos2::new(x, position.top - position.height / 2.0),
        time,
    })
}
