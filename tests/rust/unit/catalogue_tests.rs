use graphcypher::CompiledSchema;
use graphcypher::schema_builder::RootKind;
use test_case::test_case;

const LIBRARY: &str = r#"
    interface Publication {
        title: String!
        year: Int
        authors: [Author!]! @declareRelationship
    }
    type Book implements Publication {
        id: ID! @id
        title: String!
        year: Int
        pages: Int
        authors: [Author!]! @relationship(type: "WROTE", direction: IN, properties: "Wrote")
    }
    type Article implements Publication {
        title: String!
        year: Int
        journal: String
        authors: [Author!]! @relationship(type: "WROTE", direction: IN, properties: "Wrote")
    }
    type Author {
        name: String!
        works: [Publication!]! @relationship(type: "WROTE", direction: OUT, properties: "Wrote")
        favourite: Shelfable @relationship(type: "FAVOURITE", direction: OUT)
    }
    union Shelfable = Book | Article
    type Wrote @relationshipProperties {
        position: Int
    }
"#;

fn schema() -> CompiledSchema {
    CompiledSchema::from_sdl(LIBRARY).expect("library schema compiles")
}

fn input_names(schema: &CompiledSchema, type_name: &str) -> Vec<String> {
    schema
        .catalogue
        .get(type_name)
        .unwrap_or_else(|| panic!("{} not generated", type_name))
        .input_fields()
        .iter()
        .map(|f| f.name.clone())
        .collect()
}

#[test]
fn test_interface_where_filters_apply_to_every_implementer() {
    let schema = schema();
    let interface_where = input_names(&schema, "PublicationWhere");
    assert!(interface_where.contains(&"title_STARTS_WITH".to_string()));
    assert!(interface_where.contains(&"year_GTE".to_string()));

    for implementer in ["Book", "Article"] {
        let implementer_where = input_names(&schema, &format!("{}Where", implementer));
        for field in interface_where
            .iter()
            .filter(|f| !["_on", "typename_IN"].contains(&f.as_str()))
        {
            assert!(
                implementer_where.contains(field),
                "{} missing on {}Where",
                field,
                implementer
            );
        }
        // implementer-only fields stay reachable through the interface
        let on = schema
            .catalogue
            .input_field("PublicationImplementationsWhere", implementer)
            .expect("implementer key under _on");
        assert_eq!(on.ty.to_string(), format!("{}Where", implementer));
    }
    assert!(!interface_where.contains(&"pages".to_string()));
    assert!(!interface_where.contains(&"journal".to_string()));
}

#[test]
fn test_shared_properties_keep_the_concrete_edge_type() {
    let schema = schema();
    let edge = schema
        .catalogue
        .input_field("BookAuthorsConnectFieldInput", "edge")
        .expect("edge input on connect");
    assert_eq!(edge.ty.base_name(), "WroteCreateInput");
    assert!(input_names(&schema, "PublicationAuthorsConnectionWhere").contains(&"edge".to_string()));
}

#[test]
fn test_union_inputs_are_keyed_by_member() {
    let schema = schema();
    let connect = input_names(&schema, "AuthorFavouriteConnectInput");
    assert_eq!(connect.len(), 2);
    assert!(connect.contains(&"Book".to_string()) && connect.contains(&"Article".to_string()));
    let create = input_names(&schema, "AuthorFavouriteCreateInput");
    assert!(create.contains(&"Book".to_string()) && create.contains(&"Article".to_string()));
}

#[test]
fn test_generated_ids_are_not_creatable() {
    let schema = schema();
    let create = input_names(&schema, "BookCreateInput");
    assert!(!create.contains(&"id".to_string()));
    assert!(create.contains(&"title".to_string()));
}

#[test_case("books", RootKind::Read, "Book")]
#[test_case("booksConnection", RootKind::Connection, "Book")]
#[test_case("publicationsAggregate", RootKind::Aggregate, "Publication")]
#[test_case("createAuthors", RootKind::Create, "Author")]
#[test_case("updateArticles", RootKind::Update, "Article")]
#[test_case("deleteBooks", RootKind::Delete, "Book")]
fn test_root_fields(name: &str, kind: RootKind, entity: &str) {
    let schema = schema();
    let root = schema.root_field(name).unwrap_or_else(|| panic!("{} missing", name));
    assert_eq!(root.kind, kind);
    assert_eq!(root.entity, entity);
}

#[test]
fn test_interfaces_have_no_mutation_roots() {
    let schema = schema();
    assert!(schema.root_field("createPublications").is_none());
    assert!(schema.root_field("deletePublications").is_none());
}

#[test]
fn test_printed_schema_declares_roots() {
    let sdl = schema().print_sdl();
    assert!(sdl.contains("type Query {"));
    assert!(sdl.contains("type Mutation {"));
    assert!(sdl.contains("input PublicationWhere {"));
    assert!(sdl.contains("union Shelfable = Book | Article"));
}

#[test]
fn test_narrowed_relationship_inputs_use_the_narrowed_target() {
    let schema = CompiledSchema::from_sdl(
        r#"
        interface Person { name: String! }
        type Actor implements Person { name: String! }
        type Director implements Person { name: String! }
        interface Production {
            title: String!
            people: [Person!]! @declareRelationship
        }
        type Movie implements Production {
            title: String!
            people: [Actor!]! @relationship(type: "WORKED_ON", direction: IN)
        }
        "#,
    )
    .expect("narrowing to an implementer compiles");

    let movie_create = schema
        .catalogue
        .input_field("MoviePeopleCreateFieldInput", "node")
        .expect("Movie create input has a node");
    assert_eq!(movie_create.ty.to_string(), "ActorCreateInput!");

    let interface_connect = schema
        .catalogue
        .input_field("ProductionPeopleConnectFieldInput", "where")
        .expect("Production connect input has a where");
    assert_eq!(interface_connect.ty.to_string(), "PersonConnectWhere");
}
