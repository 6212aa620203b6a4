use super::*;
use crate::{
    error::BeccaError,
    event::{ChangeEvent, EntityChange, EventOrigin},
    properties::{Attribute, AttributeType, Branch, Note},
    tests::helpers::*,
};
use test_log::test;
use tokio::sync::mpsc::unbounded_channel;

fn small_tree() -> Becca {
    becca_with([
        note("root", "root"),
        note("a", "Alpha"),
        note("b", "Beta"),
        note("c", "Gamma"),
        branch("b", "root", 20),
        branch("a", "root", 10),
        branch("c", "a", 10),
        label("a_tag", "a", "tag", "one"),
        relation("c_link", "c", "link", "b"),
    ])
}

#[test]
fn repeated_upserts_leave_state_unchanged() {
    let mut becca = small_tree();
    let event = ChangeEvent::remote(note("a", "Alpha"));
    assert!(!becca.process_event(&event));
    assert!(becca.process_event(&ChangeEvent::remote(note("a", "Alpha prime"))));
    assert_eq!(becca.get_note("a").map(|n| n.title.as_str()), Some("Alpha prime"));
    assert_eq!(becca.note_count(), 4);
    assert_eq!(becca.branch_count(), 3);
    assert_eq!(becca.attribute_count(), 2);
}

#[test]
fn attribute_indices_follow_upserts() {
    let mut becca = small_tree();
    assert_eq!(becca.find_attributes(AttributeType::Label, "TAG").len(), 1);
    assert_eq!(becca.get_target_relations("b").len(), 1);

    apply_all(&mut becca, [relation("c_link", "c", "link", "a")]);
    assert!(becca.get_target_relations("b").is_empty());
    assert_eq!(becca.get_target_relations("a")[0].attribute_id, "c_link");

    apply_all(&mut becca, [label("a_tag", "a", "Topic", "one")]);
    assert!(becca.find_attributes(AttributeType::Label, "tag").is_empty());
    assert_eq!(becca.find_attributes(AttributeType::Label, "topic").len(), 1);
}

#[test]
fn tombstoned_and_erased_attributes() {
    let mut becca = small_tree();
    let mut deleted = Attribute::relation("c_link", "c", "link", "b");
    deleted.is_deleted = true;
    apply_all(&mut becca, [EntityChange::AttributeUpserted(deleted)]);

    assert!(becca.get_attribute("c_link").is_some_and(|attr| attr.is_deleted));
    assert!(becca.get_owned_attributes("c").is_empty());
    assert!(becca.get_target_relations("b").is_empty());
    assert_eq!(becca.attribute_count(), 1);

    apply_all(
        &mut becca,
        [EntityChange::AttributeErased {
            attribute_id: "c_link".to_string(),
        }],
    );
    assert!(becca.get_attribute("c_link").is_none());
    assert!(!becca.process_event(&ChangeEvent::remote(EntityChange::AttributeErased {
        attribute_id: "c_link".to_string(),
    })));
}

#[test]
fn owned_attributes_are_ordered_by_position() {
    let mut first = Attribute::label("z", "a", "first", "");
    first.position = 10;
    let mut second = Attribute::label("y", "a", "second", "");
    second.position = 20;
    let becca = becca_with([
        note("root", "root"),
        note("a", "Alpha"),
        branch("a", "root", 10),
        EntityChange::AttributeUpserted(second),
        EntityChange::AttributeUpserted(first),
    ]);
    let names: Vec<&str> = becca
        .get_owned_attributes("a")
        .iter()
        .map(|attr| attr.name.as_str())
        .collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn dangling_branches_keep_their_child() {
    let mut becca = becca_with([
        note("root", "root"),
        note("orphan", "Orphan"),
        branch("orphan", "ghost", 10),
    ]);
    assert!(becca.is_live("orphan"));
    assert_eq!(becca.get_ancestors("orphan"), vec!["ghost"]);
    assert_eq!(*becca.all_note_ids(), vec!["root", "orphan"]);

    apply_all(&mut becca, [note("ghost", "Ghost"), branch("ghost", "root", 10)]);
    assert_eq!(*becca.all_note_ids(), vec!["root", "ghost", "orphan"]);
    assert_eq!(becca.get_ancestors("orphan"), vec!["ghost", "root"]);
}

#[test]
fn cycle_closing_branches_are_stored_without_an_edge() {
    let mut becca = small_tree();
    apply_all(
        &mut becca,
        [EntityChange::BranchUpserted(Branch::new("loop", "a", "c", 10))],
    );
    assert!(becca.get_branch("loop").is_some());
    assert!(becca.get_branch_from_child_and_parent("a", "c").is_none());
    assert_eq!(becca.parent_note_ids("a"), vec!["root"]);
    assert_eq!(*becca.all_note_ids(), vec!["root", "a", "b", "c"]);
}

#[test]
fn losing_the_last_branch_deletes_the_note() {
    let mut becca = small_tree();
    apply_all(&mut becca, [branch("c", "b", 10)]);

    let mut first = Branch::new("a_c", "c", "a", 10);
    first.is_deleted = true;
    apply_all(&mut becca, [EntityChange::BranchUpserted(first)]);
    assert!(becca.is_live("c"));
    assert_eq!(becca.parent_note_ids("c"), vec!["b"]);

    apply_all(
        &mut becca,
        [EntityChange::BranchErased {
            branch_id: "b_c".to_string(),
        }],
    );
    assert!(!becca.is_live("c"));
    assert!(becca.get_note("c").is_some_and(|note| !note.is_deleted));
    assert_eq!(becca.note_count(), 3);
    assert_eq!(*becca.all_note_ids(), vec!["root", "a", "b"]);
    assert!(search(&becca, "gamma").is_empty());
}

#[test]
fn moves_survive_the_old_branch_arriving_first() {
    let mut becca = small_tree();
    assert_eq!(effective(&becca, "c"), vec!["~link=b"]);

    let mut old = Branch::new("a_c", "c", "a", 10);
    old.is_deleted = true;
    apply_all(&mut becca, [EntityChange::BranchUpserted(old)]);
    assert!(!becca.is_live("c"));
    assert!(search(&becca, "gamma").is_empty());

    apply_all(&mut becca, [branch("c", "b", 10)]);
    assert!(becca.is_live("c"));
    assert_eq!(becca.parent_note_ids("c"), vec!["b"]);
    assert_eq!(becca.child_note_ids("b"), vec!["c"]);
    assert_eq!(*becca.all_note_ids(), vec!["root", "a", "b", "c"]);
    assert_eq!(search(&becca, "gamma"), vec!["c"]);
    assert_eq!(becca.note_count(), 4);
}

#[test]
fn root_survives_without_branches() {
    let mut becca = small_tree();
    apply_all(&mut becca, [branch("root", "none", 0)]);
    apply_all(
        &mut becca,
        [EntityChange::BranchErased {
            branch_id: "none_root".to_string(),
        }],
    );
    assert!(becca.is_live("root"));
}

#[test]
fn tombstoned_notes_drop_out_of_traversals() {
    let mut becca = small_tree();
    let mut deleted = Note::new("a", "Alpha");
    deleted.is_deleted = true;
    apply_all(&mut becca, [EntityChange::NoteUpserted(deleted)]);

    assert!(becca.get_live_note("a").is_none());
    assert_eq!(*becca.all_note_ids(), vec!["root", "b", "c"]);
    assert!(becca.get_ancestors("c").is_empty());
    assert!(becca.get_descendants("root").iter().all(|(id, _)| id != "a"));

    apply_all(&mut becca, [EntityChange::NoteErased { note_id: "a".to_string() }]);
    assert!(becca.get_note("a").is_none());
}

#[test]
fn universe_orders_siblings_by_position() {
    let becca = becca_with([
        note("root", "root"),
        note("late", "Late"),
        note("early", "Early"),
        note("leaf", "Leaf"),
        note("loose", "Loose"),
        branch("late", "root", 30),
        branch("early", "root", 10),
        branch("leaf", "early", 10),
    ]);
    assert_eq!(
        *becca.all_note_ids(),
        vec!["root", "early", "late", "leaf", "loose"]
    );
    assert_eq!(
        becca.get_descendants("root"),
        vec![
            ("early".to_string(), 1),
            ("late".to_string(), 1),
            ("leaf".to_string(), 2)
        ]
    );
}

#[test]
fn branch_lookup_by_child_and_parent() {
    let becca = sample_becca();
    let branch = becca
        .get_branch_from_child_and_parent("prague", "czechia")
        .expect("branch exists");
    assert_eq!(branch.branch_id, "czechia_prague");
    assert!(becca.get_branch_from_child_and_parent("czechia", "prague").is_none());
    assert_eq!(becca.template_users("tpl_city"), vec!["prague".to_string()]);
    assert!(becca.template_users("prague").is_empty());
}

#[test]
fn local_events_are_skipped() {
    let mut becca = small_tree();
    let event = ChangeEvent::local(note("d", "Delta"));
    assert!(!becca.process_event(&event));
    assert!(becca.get_note("d").is_none());
    assert!(becca.process_event(&event.with_origin(EventOrigin::Remote)));
    assert!(becca.get_note("d").is_some());
}

#[test]
fn mutation_helpers_apply_and_emit_local_events() {
    let (tx, mut rx) = unbounded_channel();
    let mut becca = small_tree();
    becca.set_emitter(Some(tx));

    let attr = becca.add_label("b", "status", "draft", true).unwrap();
    assert_eq!(attr.position, 10);
    assert!(becca.has_label("b", "status"));

    let event = rx.try_recv().unwrap();
    assert_eq!(event.origin, EventOrigin::Local);
    assert_eq!(event.change, EntityChange::AttributeUpserted(attr.clone()));
    assert!(!becca.process_event(&event));

    let second = becca.add_relation("b", "link", "c", false).unwrap();
    assert_eq!(second.position, 20);
    assert_eq!(becca.get_target_relations("c").len(), 1);
    assert!(rx.try_recv().is_ok());

    let updated = becca.set_attribute_value(&attr.attribute_id, "final").unwrap();
    assert_eq!(updated.value, "final");
    assert!(matches!(
        rx.try_recv().unwrap().change,
        EntityChange::AttributeUpserted(ref changed) if changed.value == "final"
    ));

    becca.remove_attribute(&attr.attribute_id).unwrap();
    assert!(!becca.has_label("b", "status"));
    assert!(rx.try_recv().is_ok());

    becca.set_note_title("b", "Beta prime").unwrap();
    assert!(matches!(
        rx.try_recv().unwrap().change,
        EntityChange::NoteUpserted(ref note) if note.title == "Beta prime"
    ));
    assert!(rx.try_recv().is_err());
}

#[test]
fn mutation_helpers_reject_missing_entities() {
    let (tx, mut rx) = unbounded_channel();
    let mut becca = small_tree().with_emitter(tx);
    assert!(matches!(
        becca.add_label("missing", "x", "", false),
        Err(BeccaError::NotFound(_))
    ));
    assert!(matches!(
        becca.set_attribute_value("missing", "x"),
        Err(BeccaError::NotFound(_))
    ));
    assert!(matches!(
        becca.set_note_title("missing", "x"),
        Err(BeccaError::NotFound(_))
    ));
    assert!(rx.try_recv().is_err());
}

#[test]
fn closed_emitters_report_but_keep_the_change() {
    let (tx, rx) = unbounded_channel();
    drop(rx);
    let mut becca = small_tree().with_emitter(tx);
    assert!(matches!(
        becca.add_label("b", "status", "", false),
        Err(BeccaError::Channel(_))
    ));
    assert!(becca.has_label("b", "status"));
}

#[test(tokio::test)]
async fn shared_becca_listens_for_changes() {
    let shared = SharedBecca::new(small_tree());
    let (tx, rx) = unbounded_channel();
    tx.send(ChangeEvent::remote(note("d", "Delta"))).unwrap();
    tx.send(ChangeEvent::remote(branch("d", "b", 10))).unwrap();
    tx.send(ChangeEvent::remote(note("d", "Delta"))).unwrap();
    tx.send(ChangeEvent::local(note("e", "Epsilon"))).unwrap();
    drop(tx);

    assert_eq!(shared.listen(rx).await, 2);
    let found = shared
        .search("delta", &crate::query::SearchOptions::default())
        .unwrap();
    assert_eq!(found, vec!["d".to_string()]);
    assert!(shared.read().get_note("e").is_none());
}
