//! Performance benchmarks for the note index and query engine
//!
//! These benchmarks build a synthetic tree and measure:
//! - Initial load from change events
//! - Attribute queries that walk inherited and templated attributes
//! - Full-text queries over titles and content
//! - Ordered queries
//!
//! Run with: cargo bench

use becca_core::{
    becca::Becca,
    config::BeccaConfig,
    event::{ChangeEvent, EntityChange},
    properties::{Attribute, Branch, Note},
    query::SearchOptions,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const FOLDERS: usize = 50;
const NOTES_PER_FOLDER: usize = 200;

/// `FOLDERS` folders under the root, each with an inheritable `#folder` label, holding
/// `NOTES_PER_FOLDER` notes. Every tenth note uses a template carrying `#reviewed`.
fn synthetic_events() -> Vec<ChangeEvent> {
    let mut changes = vec![
        EntityChange::NoteUpserted(Note::new("root", "root")),
        EntityChange::NoteUpserted(Note::new("tpl", "Review template")),
        EntityChange::BranchUpserted(Branch::new("root_tpl", "tpl", "root", 0)),
        EntityChange::AttributeUpserted(Attribute::label("tpl_marker", "tpl", "template", "")),
        EntityChange::AttributeUpserted(Attribute::label("tpl_reviewed", "tpl", "reviewed", "")),
    ];
    for folder in 0..FOLDERS {
        let folder_id = format!("folder{folder}");
        changes.push(EntityChange::NoteUpserted(Note::new(
            &folder_id,
            format!("Folder {folder}"),
        )));
        changes.push(EntityChange::BranchUpserted(Branch::new(
            format!("root_{folder_id}"),
            &folder_id,
            "root",
            (folder as i64 + 1) * 10,
        )));
        changes.push(EntityChange::AttributeUpserted(
            Attribute::label(
                format!("{folder_id}_label"),
                &folder_id,
                "folder",
                folder.to_string(),
            )
            .inheritable(),
        ));
        for idx in 0..NOTES_PER_FOLDER {
            let note_id = format!("{folder_id}_note{idx}");
            changes.push(EntityChange::NoteUpserted(
                Note::new(&note_id, format!("Note {idx} of folder {folder}"))
                    .with_content(format!("Body text number {idx} mentioning topic{}", idx % 17)),
            ));
            changes.push(EntityChange::BranchUpserted(Branch::new(
                format!("{folder_id}_{note_id}"),
                &note_id,
                &folder_id,
                idx as i64 * 10,
            )));
            changes.push(EntityChange::AttributeUpserted(Attribute::label(
                format!("{note_id}_priority"),
                &note_id,
                "priority",
                (idx % 5).to_string(),
            )));
            if idx % 10 == 0 {
                changes.push(EntityChange::AttributeUpserted(Attribute::relation(
                    format!("{note_id}_template"),
                    &note_id,
                    "template",
                    "tpl",
                )));
            }
        }
    }
    changes.into_iter().map(ChangeEvent::remote).collect()
}

fn bench_load(c: &mut Criterion) {
    let events = synthetic_events();
    c.bench_function("load_events", |b| {
        b.iter(|| Becca::from_events(BeccaConfig::default(), black_box(events.clone())))
    });
}

fn bench_queries(c: &mut Criterion) {
    let becca = Becca::from_events(BeccaConfig::default(), synthetic_events());
    let options = SearchOptions::default();
    let fast = SearchOptions {
        fast_search: true,
        ..Default::default()
    };

    // Warm the effective attribute cache.
    becca.search("#folder", &options).unwrap();

    let mut group = c.benchmark_group("search");
    group.bench_function("inherited_label_comparison", |b| {
        b.iter(|| becca.search(black_box("#folder = 7 and #priority >= 3"), &options))
    });
    group.bench_function("templated_label", |b| {
        b.iter(|| becca.search(black_box("#reviewed"), &options))
    });
    group.bench_function("fulltext_content", |b| {
        b.iter(|| becca.search(black_box("topic3 body"), &options))
    });
    group.bench_function("fulltext_fast", |b| {
        b.iter(|| becca.search(black_box("folder 12"), &fast))
    });
    group.bench_function("ordered_with_limit", |b| {
        b.iter(|| {
            becca.search(
                black_box("#priority orderby #priority desc, note.title limit 20"),
                &options,
            )
        })
    });
    group.bench_function("ancestor_subtree", |b| {
        let scoped = SearchOptions::default().with_ancestor("folder3");
        b.iter(|| becca.search(black_box("#priority = 2"), &scoped))
    });
    group.finish();
}

criterion_group!(benches, bench_load, bench_queries);
criterion_main!(benches);
