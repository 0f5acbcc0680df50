//! Integration tests for schema transactions.

use quiverdb::{AbstractTransaction, BackendConfig, Graph, SchemaTransaction};
use quiverdb_core::id::IdConfig;
use quiverdb_core::schema::{EdgeLabel, IndexLabel, PropertyKey, VertexLabel};
use quiverdb_core::ElementType;

fn define_person(schema: &mut SchemaTransaction) {
    for name in ["name", "age", "city"] {
        schema.add_property_key(PropertyKey::builder(name).build()).expect("failed to add key");
    }
    schema
        .add_vertex_label(
            VertexLabel::builder("person")
                .properties(["name", "age", "city"])
                .primary_keys(["name"])
                .build(),
        )
        .expect("failed to add person");
}

fn person_index(name: &str, fields: &[&str]) -> IndexLabel {
    IndexLabel::builder(name).on(ElementType::VertexLabel, "person").by(fields.iter().copied()).build()
}

fn index_names(schema: &mut SchemaTransaction) -> Vec<String> {
    schema.get_vertex_label("person").expect("failed to read person").expect("person exists").index_names
}

// ============================================================================
// Index Prefix Supersession
// ============================================================================

fn check_prefix_supersession(graph: &Graph) {
    let mut schema = graph.schema();
    define_person(&mut schema);

    schema.create_index_label(person_index("byAge", &["age"])).expect("failed to create byAge");
    schema
        .create_index_label(IndexLabel::builder("searchAge").on(ElementType::VertexLabel, "person").by(["age"]).search().build())
        .expect("failed to create searchAge");
    schema
        .create_index_label(person_index("byAgeCity", &["age", "city"]))
        .expect("failed to create byAgeCity");
    schema.commit().expect("failed to commit");

    assert!(schema.get_index_label("byAge").expect("failed to read").is_none());
    assert!(schema.get_index_label("searchAge").expect("failed to read").is_some());
    assert!(schema.get_index_label("byAgeCity").expect("failed to read").is_some());
    assert_eq!(index_names(&mut schema), vec!["byAgeCity".to_owned(), "searchAge".to_owned()]);

    let mut remaining: Vec<String> = schema
        .index_labels_of(ElementType::VertexLabel, "person")
        .expect("failed to list indexes")
        .into_iter()
        .map(|i| i.name)
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec!["byAgeCity".to_owned(), "searchAge".to_owned()]);
}

#[test]
fn test_prefix_supersession_in_memory() {
    let graph = Graph::in_memory().expect("failed to create graph");
    check_prefix_supersession(&graph);
}

#[test]
fn test_prefix_supersession_on_redb() {
    let graph = Graph::builder().backend(BackendConfig::RedbInMemory).open().expect("failed to open");
    check_prefix_supersession(&graph);
}

#[test]
fn test_prefix_supersession_with_snowflake_ids() {
    let graph = Graph::builder().id(IdConfig::snowflake(2, 0)).open().expect("failed to open");
    check_prefix_supersession(&graph);
}

#[test]
fn test_redundant_prefix_is_rejected() {
    let graph = Graph::in_memory().expect("failed to create graph");
    let mut schema = graph.schema();
    define_person(&mut schema);
    schema
        .create_index_label(person_index("byAgeCity", &["age", "city"]))
        .expect("failed to create byAgeCity");

    let err = schema.create_index_label(person_index("byAge", &["age"])).unwrap_err();
    assert!(err.is_invalid_argument());

    // A search index on the prefix field is independent.
    schema
        .create_index_label(IndexLabel::builder("searchAge").on(ElementType::VertexLabel, "person").by(["age"]).search().build())
        .expect("failed to create searchAge");
    assert_eq!(index_names(&mut schema), vec!["byAgeCity".to_owned(), "searchAge".to_owned()]);
}

#[test]
fn test_failed_create_leaves_earlier_indexes_in_place() {
    let graph = Graph::builder().backend(BackendConfig::RedbInMemory).open().expect("failed to open");
    let mut schema = graph.schema();
    define_person(&mut schema);
    schema.create_index_label(person_index("byAge", &["age"])).expect("failed to create byAge");
    schema.commit().expect("failed to commit");

    let err = schema.create_index_label(person_index("by\u{1}AgeCity", &["age", "city"])).unwrap_err();
    assert!(err.is_invalid_argument());
    schema.commit().expect("failed to commit");

    assert!(schema.get_index_label("byAge").expect("failed to read").is_some());
    assert_eq!(index_names(&mut schema), vec!["byAge".to_owned()]);
}

// ============================================================================
// Schema Lifecycle
// ============================================================================

#[test]
fn test_schema_survives_reopen() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("schema.redb");
    {
        let graph = Graph::open_path(&path).expect("failed to open graph");
        let mut schema = graph.schema();
        define_person(&mut schema);
        schema.create_index_label(person_index("byCity", &["city"])).expect("failed to create index");
        schema.commit().expect("failed to commit");
    }

    let graph = Graph::open_path(&path).expect("failed to reopen graph");
    let mut schema = graph.schema();
    assert_eq!(schema.property_keys().expect("failed to list keys").len(), 3);
    assert_eq!(index_names(&mut schema), vec!["byCity".to_owned()]);
    let index = schema.get_index_label("byCity").expect("failed to read").expect("byCity exists");
    assert_eq!(index.fields, vec!["city".to_owned()]);
}

#[test]
fn test_lookup_by_name_with_snowflake_ids() {
    let graph = Graph::builder().id(IdConfig::snowflake(4, 2)).open().expect("failed to open");
    let mut schema = graph.schema();
    define_person(&mut schema);
    schema.commit().expect("failed to commit");

    let age = schema.get_property_key("age").expect("failed to read").expect("age exists");
    assert!(age.id.as_ref().expect("age has an id").is_numeric());

    let keys = schema
        .get_property_keys(&["city".to_owned(), "missing".to_owned(), "name".to_owned()])
        .expect("failed to read keys");
    let mut names: Vec<String> = keys.into_iter().map(|k| k.name).collect();
    names.sort();
    assert_eq!(names, vec!["city".to_owned(), "name".to_owned()]);
    assert!(schema.get_property_keys(&[]).expect("failed to read keys").is_empty());

    // Re-adding by name keeps the stored id.
    let again = schema.add_property_key(PropertyKey::builder("age").build()).expect("failed to add");
    assert_eq!(again.id, age.id);
}

#[test]
fn test_update_schema_element_needs_an_owner() {
    let graph = Graph::in_memory().expect("failed to create graph");
    let mut schema = graph.schema();
    define_person(&mut schema);

    schema
        .update_schema_element(ElementType::VertexLabel, "person", "external")
        .expect("failed to update person");
    schema.commit().expect("failed to commit");
    assert_eq!(index_names(&mut schema), vec!["external".to_owned()]);

    let err = schema.update_schema_element(ElementType::VertexLabel, "robot", "external").unwrap_err();
    assert!(err.is_not_found());
    let err = schema.update_schema_element(ElementType::Vertex, "person", "external").unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn test_removing_a_label_removes_its_indexes() {
    let graph = Graph::in_memory().expect("failed to create graph");
    let mut schema = graph.schema();
    define_person(&mut schema);
    schema.create_index_label(person_index("byCity", &["city"])).expect("failed to create index");
    schema.commit().expect("failed to commit");

    schema.remove_vertex_label("person").expect("failed to remove person");
    schema.commit().expect("failed to commit");

    assert!(schema.get_vertex_label("person").expect("failed to read").is_none());
    assert!(schema.get_index_label("byCity").expect("failed to read").is_none());
    assert!(schema.remove_vertex_label("person").unwrap_err().is_not_found());

    // With no label using them, the keys can go.
    schema.remove_property_key("city").expect("failed to remove city");
    assert!(schema.get_property_key("city").expect("failed to read").is_none());
}

#[test]
fn test_linked_vertex_label_cannot_be_removed() {
    let graph = Graph::in_memory().expect("failed to create graph");
    let mut schema = graph.schema();
    define_person(&mut schema);
    schema
        .add_edge_label(EdgeLabel::builder("knows").link("person", "person").build())
        .expect("failed to add knows");

    assert!(schema.remove_vertex_label("person").unwrap_err().is_invalid_argument());

    schema.remove_edge_label("knows").expect("failed to remove knows");
    schema.remove_vertex_label("person").expect("failed to remove person");
}

#[test]
fn test_auto_commit_schema_writes_are_visible_to_new_transactions() {
    let graph = Graph::builder().auto_commit(true).open().expect("failed to open");
    let mut writer = graph.schema();
    define_person(&mut writer);
    assert!(!writer.has_updates());

    let mut reader = graph.schema();
    assert_eq!(reader.vertex_labels().expect("failed to list labels").len(), 1);
}
