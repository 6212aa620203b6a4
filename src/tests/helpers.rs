//! Shared test utilities for note index and search testing

use crate::{
    becca::Becca,
    config::BeccaConfig,
    event::{ChangeEvent, EntityChange},
    properties::{Attribute, Branch, Note},
    query::SearchOptions,
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn note(note_id: &str, title: &str) -> EntityChange {
    EntityChange::NoteUpserted(Note::new(note_id, title))
}

pub fn note_with_content(note_id: &str, title: &str, content: &str) -> EntityChange {
    EntityChange::NoteUpserted(Note::new(note_id, title).with_content(content))
}

/// Branch placing `note_id` under `parent`, with id `<parent>_<note_id>`.
pub fn branch(note_id: &str, parent: &str, position: i64) -> EntityChange {
    EntityChange::BranchUpserted(Branch::new(
        format!("{parent}_{note_id}"),
        note_id,
        parent,
        position,
    ))
}

pub fn label(attribute_id: &str, note_id: &str, name: &str, value: &str) -> EntityChange {
    EntityChange::AttributeUpserted(Attribute::label(attribute_id, note_id, name, value))
}

pub fn inheritable_label(attribute_id: &str, note_id: &str, name: &str, value: &str) -> EntityChange {
    EntityChange::AttributeUpserted(
        Attribute::label(attribute_id, note_id, name, value).inheritable(),
    )
}

pub fn relation(attribute_id: &str, note_id: &str, name: &str, target: &str) -> EntityChange {
    EntityChange::AttributeUpserted(Attribute::relation(attribute_id, note_id, name, target))
}

pub fn inheritable_relation(
    attribute_id: &str,
    note_id: &str,
    name: &str,
    target: &str,
) -> EntityChange {
    EntityChange::AttributeUpserted(
        Attribute::relation(attribute_id, note_id, name, target).inheritable(),
    )
}

pub fn apply_all<I: IntoIterator<Item = EntityChange>>(becca: &mut Becca, changes: I) {
    for change in changes {
        becca.process_event(&ChangeEvent::remote(change));
    }
}

pub fn becca_with<I: IntoIterator<Item = EntityChange>>(changes: I) -> Becca {
    init_logging();
    Becca::from_events(
        BeccaConfig::default(),
        changes.into_iter().map(ChangeEvent::remote),
    )
}

/// Effective attributes of `note_id` rendered as `#name=value` / `~name=target` strings.
pub fn effective(becca: &Becca, note_id: &str) -> Vec<String> {
    becca
        .effective_attributes(note_id)
        .iter()
        .map(|attr| {
            let mut rendered = attr.to_string();
            if let Some(stripped) = rendered.strip_suffix("(inheritable)") {
                rendered = stripped.to_string();
            }
            rendered
        })
        .collect()
}

/// Search with default options, panicking on errors.
pub fn search(becca: &Becca, query: &str) -> Vec<String> {
    search_with(becca, query, &SearchOptions::default())
}

pub fn search_with(becca: &Becca, query: &str, options: &SearchOptions) -> Vec<String> {
    becca
        .search(query, options)
        .unwrap_or_else(|err| panic!("search {query:?} failed: {err}"))
}

/// The fixture most search tests run against:
///
/// ```text
/// root
/// ├── europe     #continent=europe (inheritable)
/// │   ├── czechia    #country #capital=Prague #population=10500000
/// │   │   └── prague     #city ~template=tpl_city
/// │   └── germany    #country #capital=Berlin #population=83000000
/// │       └── berlin     #city
/// ├── books      #genre=fiction (inheritable)
/// │   ├── dune       #year=1965 ~author=herbert, content mentions spice
/// │   ├── emma       #year=1815 #archived ~author=austen
/// │   └── lotr       #year=1954 ~author=tolkien
/// ├── people
/// │   ├── herbert, austen, tolkien
/// ├── templates
/// │   └── tpl_city   #template #mayor (inheritable) #tourism=high
/// └── _hidden
///     └── hidden_note "Hidden Prague notes"
/// ```
pub fn sample_becca() -> Becca {
    becca_with([
        note("root", "root"),
        note("europe", "Europe"),
        note("czechia", "Czechia"),
        note_with_content("prague", "Prague", "The hundred-spired city on the Vltava"),
        note("germany", "Germany"),
        note("berlin", "Berlin"),
        note("books", "Books"),
        note_with_content(
            "dune",
            "Dune",
            "The spice must flow. A desert planet and its sandworms.",
        ),
        note_with_content("emma", "Emma", "A novel about youthful hubris"),
        note("lotr", "The Lord of the Rings"),
        note("people", "People"),
        note("herbert", "Frank Herbert"),
        note("austen", "Jane Austen"),
        note("tolkien", "J. R. R. Tolkien"),
        note("templates", "Templates"),
        note("tpl_city", "City template"),
        note("_hidden", "Hidden"),
        note("hidden_note", "Hidden Prague notes"),
        branch("europe", "root", 10),
        branch("books", "root", 20),
        branch("people", "root", 30),
        branch("templates", "root", 40),
        branch("_hidden", "root", 50),
        branch("czechia", "europe", 10),
        branch("germany", "europe", 20),
        branch("prague", "czechia", 10),
        branch("berlin", "germany", 10),
        branch("dune", "books", 10),
        branch("emma", "books", 20),
        branch("lotr", "books", 30),
        branch("herbert", "people", 10),
        branch("austen", "people", 20),
        branch("tolkien", "people", 30),
        branch("tpl_city", "templates", 10),
        branch("hidden_note", "_hidden", 10),
        inheritable_label("continent", "europe", "continent", "europe"),
        label("cz_country", "czechia", "country", ""),
        label("cz_capital", "czechia", "capital", "Prague"),
        label("cz_population", "czechia", "population", "10500000"),
        label("de_country", "germany", "country", ""),
        label("de_capital", "germany", "capital", "Berlin"),
        label("de_population", "germany", "population", "83000000"),
        label("prague_city", "prague", "city", ""),
        relation("prague_template", "prague", "template", "tpl_city"),
        label("berlin_city", "berlin", "city", ""),
        inheritable_label("genre", "books", "genre", "fiction"),
        label("dune_year", "dune", "year", "1965"),
        relation("dune_author", "dune", "author", "herbert"),
        label("emma_year", "emma", "year", "1815"),
        label("emma_archived", "emma", "archived", ""),
        relation("emma_author", "emma", "author", "austen"),
        label("lotr_year", "lotr", "year", "1954"),
        relation("lotr_author", "lotr", "author", "tolkien"),
        label("tpl_marker", "tpl_city", "template", ""),
        inheritable_label("tpl_mayor", "tpl_city", "mayor", ""),
        label("tpl_tourism", "tpl_city", "tourism", "high"),
    ])
}
