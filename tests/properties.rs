use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use timeline_dep_graph::model::task::{patch_and_filter, validate};
use timeline_dep_graph::model::{diff, ItemData, Status, Task, TaskId};
use timeline_dep_graph::view::memory::MemoryCanvas;
use timeline_dep_graph::{Timeline, TimelineConfig};

fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 10, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
}

#[derive(Debug, Clone)]
struct Shape {
    status: usize,
    start: Option<i64>,
    length: Option<i64>,
    sub_tasks: usize,
    edges: Vec<u8>,
    sub_edges: Vec<u8>,
}

fn shape() -> impl Strategy<Value = Shape> {
    (
        0usize..Status::ALL.len(),
        prop::option::of(-60i64..60),
        prop::option::of(0i64..60),
        0usize..4,
        prop::collection::vec(any::<u8>(), 0..3),
        prop::collection::vec(any::<u8>(), 0..4),
    )
        .prop_map(|(status, start, length, sub_tasks, edges, sub_edges)| Shape {
            status,
            start,
            length,
            sub_tasks,
            edges,
            sub_edges,
        })
}

/// Picks dependents among `later`, the tasks that come after the source in
/// the flattened order.
fn pick<'a>(later: &'a [String], edges: impl IntoIterator<Item = &'a u8>) -> BTreeSet<&'a str> {
    if later.is_empty() {
        return BTreeSet::new();
    }
    edges
        .into_iter()
        .map(|e| later[usize::from(*e) % later.len()].as_str())
        .collect()
}

/// Top-level ids are `t<n>`, sub-task ids `t<n>.<k>`. Edges only point to
/// tasks later in the flattened order (`t0, t0.0, t0.1, t1, ...`), so every
/// generated snapshot is acyclic. They may cross the hierarchy in both
/// directions: into another task's sub-forest and out of one.
fn build(shapes: BTreeMap<u8, Shape>) -> Vec<Task> {
    let mut flat = Vec::new();
    let mut offsets = Vec::new();
    for (n, shape) in &shapes {
        offsets.push(flat.len());
        flat.push(format!("t{n}"));
        flat.extend((0..shape.sub_tasks).map(|k| format!("t{n}.{k}")));
    }

    shapes
        .values()
        .zip(offsets)
        .enumerate()
        .map(|(i, (shape, at_flat))| {
            let id = &flat[at_flat];
            let status = Status::ALL[shape.status];
            let start = shape.start.map(at);
            let finish = shape.start.zip(shape.length).map(|(s, l)| at(s + l));
            let past_own_subs = &flat[at_flat + 1 + shape.sub_tasks..];
            let sub_tasks = (0..shape.sub_tasks)
                .map(|k| {
                    let mut dependents = pick(
                        &flat[at_flat + 2 + k..],
                        shape.sub_edges.iter().skip(k).step_by(shape.sub_tasks),
                    );
                    if k + 1 < shape.sub_tasks {
                        dependents.insert(flat[at_flat + 2 + k].as_str());
                    }
                    Task::new(flat[at_flat + 1 + k].as_str(), format!("sub {k}"), status)
                        .with_times(start, finish)
                        .with_dependents(dependents)
                })
                .collect();
            Task::new(id.as_str(), format!("task {i}"), status)
                .with_times(start, finish)
                .with_dependents(pick(past_own_subs, &shape.edges))
                .with_sub_tasks(sub_tasks)
        })
        .collect()
}

fn snapshot() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::btree_map(0u8..24, shape(), 0..10).prop_map(build)
}

fn top_level_ids<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> BTreeSet<String> {
    tasks
        .into_iter()
        .map(|t| t.id.to_string())
        .filter(|id| !id.contains('.'))
        .collect()
}

fn timeline() -> Timeline<MemoryCanvas> {
    Timeline::new(MemoryCanvas::new(1000.0, 800.0), TimelineConfig::default())
}

fn items(timeline: &Timeline<MemoryCanvas>) -> BTreeMap<String, ItemData> {
    timeline
        .vis()
        .items()
        .iter()
        .map(|(id, item)| (id.to_string(), item.clone()))
        .collect()
}

fn arrows(timeline: &Timeline<MemoryCanvas>) -> BTreeSet<(String, String)> {
    timeline
        .arrows()
        .pairs()
        .map(|(s, t)| (s.to_string(), t.to_string()))
        .collect()
}

/// Arrows whose endpoints are both rendered.
fn drawn_arrows(timeline: &Timeline<MemoryCanvas>) -> BTreeSet<(String, String)> {
    arrows(timeline)
        .into_iter()
        .filter(|(s, t)| {
            timeline.items().contains_key(s.as_str()) && timeline.items().contains_key(t.as_str())
        })
        .collect()
}

proptest! {
    #[test]
    fn generated_snapshots_are_valid(tasks in snapshot()) {
        prop_assert!(validate(&tasks).is_ok());
    }

    #[test]
    fn diff_against_itself_is_empty(tasks in snapshot()) {
        prop_assert!(diff(&tasks, &tasks).is_empty());
    }

    #[test]
    fn top_level_adds_and_removes_are_the_set_difference(a in snapshot(), b in snapshot()) {
        let changes = diff(&a, &b);
        let before = top_level_ids(&a);
        let after = top_level_ids(&b);

        prop_assert_eq!(
            top_level_ids(&changes.add),
            after.difference(&before).cloned().collect::<BTreeSet<_>>()
        );
        prop_assert_eq!(
            top_level_ids(&changes.remove),
            before.difference(&after).cloned().collect::<BTreeSet<_>>()
        );

        let mut seen = BTreeSet::new();
        for task in changes.add.iter().chain(&changes.remove).chain(&changes.update) {
            prop_assert!(seen.insert(task.id.to_string()), "{} listed twice", task.id);
        }
    }

    #[test]
    fn filtering_is_idempotent(tasks in snapshot(), now in -60i64..120) {
        let once = patch_and_filter(&tasks, at(now));
        let twice = patch_and_filter(&once, at(now));
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.iter().all(|t| t.finish_time.is_some()));
    }

    #[test]
    fn incremental_rendering_matches_a_fresh_one(a in snapshot(), b in snapshot()) {
        let mut incremental = timeline();
        incremental.set_tasks(a, at(0)).unwrap();
        incremental.set_tasks(b.clone(), at(0)).unwrap();

        let mut fresh = timeline();
        fresh.set_tasks(b, at(0)).unwrap();

        prop_assert_eq!(items(&incremental), items(&fresh));
        prop_assert_eq!(drawn_arrows(&incremental), drawn_arrows(&fresh));
        // removing a task also drops the arrows that pointed at it
        prop_assert!(arrows(&incremental).is_subset(&arrows(&fresh)));
    }

    #[test]
    fn compress_undoes_expand(tasks in snapshot()) {
        let mut timeline = timeline();
        timeline.set_tasks(tasks, at(0)).unwrap();
        let expandable: Vec<TaskId> = timeline
            .forest()
            .tasks()
            .iter()
            .filter(|t| t.is_expandable())
            .map(|t| t.id.clone())
            .collect();

        for id in expandable {
            let arrows_before = arrows(&timeline);
            let items_before = items(&timeline);

            timeline.expand(&id);
            prop_assert!(timeline.is_expanded(&id));
            prop_assert!(!timeline.items().contains_key(&id));

            timeline.compress(&id);
            prop_assert!(!timeline.is_expanded(&id));
            prop_assert_eq!(arrows(&timeline), arrows_before);
            prop_assert_eq!(items(&timeline), items_before);
        }
    }
}
