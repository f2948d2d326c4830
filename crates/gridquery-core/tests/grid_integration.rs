//! Integration tests for grid requests end to end.

use gridquery_core::catalog::{Catalog, EntityDef, FieldDef, RelationDef, ScalarType, SchemaBundle};
use gridquery_core::{
    Error, ExtraPredicate, GridConfig, GridService, JoinKind, MemoryDataset, MemoryEngine,
    Predicate,
};
use gridquery_proto::{ColumnSpec, ProtocolVersion, RequestModel, SortDirection, Value};
use serde_json::json;

struct TestContext {
    catalog: Catalog,
    engine: MemoryEngine,
    _catalog_db: sled::Db,
}

impl TestContext {
    fn new() -> Self {
        let catalog_db = sled::Config::new().temporary(true).open().unwrap();
        let catalog = Catalog::open(&catalog_db).unwrap();
        catalog.apply_schema(shop_schema()).unwrap();

        let schema = catalog.current_schema().unwrap();
        let engine = MemoryEngine::new(schema, shop_data());

        Self {
            catalog,
            engine,
            _catalog_db: catalog_db,
        }
    }

    fn service(&self, config: GridConfig) -> GridService<&Catalog, &MemoryEngine> {
        GridService::new(&self.catalog, &self.engine, config)
    }
}

fn shop_schema() -> SchemaBundle {
    let location = EntityDef::new("Location", "id")
        .with_field(FieldDef::new("id", ScalarType::Int64))
        .with_field(FieldDef::new("address", ScalarType::String));

    let customer = EntityDef::new("Customer", "id")
        .with_field(FieldDef::new("id", ScalarType::Int64))
        .with_field(FieldDef::new("name", ScalarType::String))
        .with_field(FieldDef::new("email", ScalarType::String))
        .with_field(FieldDef::optional("location_id", ScalarType::Int64));

    let order = EntityDef::new("Order", "id")
        .with_table("orders")
        .with_field(FieldDef::new("id", ScalarType::Int64))
        .with_field(FieldDef::new("name", ScalarType::String))
        .with_field(FieldDef::optional("customer_id", ScalarType::Int64))
        .with_field(FieldDef::optional("parent_id", ScalarType::Int64));

    let line = EntityDef::new("OrderLine", "id")
        .with_field(FieldDef::new("id", ScalarType::Int64))
        .with_field(FieldDef::new("order_id", ScalarType::Int64))
        .with_field(FieldDef::new("sku", ScalarType::String));

    SchemaBundle::new(1)
        .with_entity(location)
        .with_entity(customer)
        .with_entity(order)
        .with_entity(line)
        .with_relation(RelationDef::one_to_one(
            "location",
            "Customer",
            "location_id",
            "Location",
            "id",
        ))
        .with_relation(RelationDef::many_to_one(
            "customer",
            "Order",
            "customer_id",
            "Customer",
            "id",
        ))
        .with_relation(RelationDef::one_to_many("lines", "Order", "id", "OrderLine", "order_id"))
        .with_relation(RelationDef::many_to_one("parent", "Order", "parent_id", "Order", "id"))
}

fn order(id: i64, name: &str, customer: Option<i64>, parent: Option<i64>) -> Vec<(&'static str, Value)> {
    vec![
        ("id", Value::Int64(id)),
        ("name", Value::from(name)),
        ("customer_id", Value::from(customer)),
        ("parent_id", Value::from(parent)),
    ]
}

fn line(id: i64, order_id: i64, sku: &str) -> Vec<(&'static str, Value)> {
    vec![
        ("id", Value::Int64(id)),
        ("order_id", Value::Int64(order_id)),
        ("sku", Value::from(sku)),
    ]
}

fn shop_data() -> MemoryDataset {
    MemoryDataset::new()
        .with_row("Location", [("id", Value::Int64(1)), ("address", Value::from("1 Main St"))])
        .with_row(
            "Customer",
            [
                ("id", Value::Int64(1)),
                ("name", Value::from("Ann")),
                ("email", Value::from("jo@example.com")),
                ("location_id", Value::Int64(1)),
            ],
        )
        .with_row(
            "Customer",
            [
                ("id", Value::Int64(2)),
                ("name", Value::from("Mary")),
                ("email", Value::from("mary@example.com")),
                ("location_id", Value::Null),
            ],
        )
        .with_row("Order", order(1, "Joist delivery", Some(2), None))
        .with_row("Order", order(2, "Chairs", Some(1), None))
        .with_row("Order", order(3, "Tables", Some(2), Some(1)))
        .with_row("Order", order(4, "Benches", None, None))
        .with_row("OrderLine", line(10, 1, "beam-a"))
        .with_row("OrderLine", line(11, 1, "beam-b"))
        .with_row("OrderLine", line(12, 2, "chair"))
}

fn columns(request: RequestModel, paths: &[&str]) -> RequestModel {
    paths
        .iter()
        .fold(request, |r, path| r.with_column(ColumnSpec::new(*path)))
}

// ============== Tests ==============

#[test]
fn test_search_across_joined_column() {
    let ctx = TestContext::new();
    let service = ctx.service(GridConfig::default());
    let request = columns(
        RequestModel::new().with_draw(7).with_page(0, 2).with_search("jo"),
        &["name", "customer.email"],
    )
    .with_order(0, SortDirection::Asc);

    let response = service.handle("Order", &request, &[]).unwrap();

    assert_eq!(response.draw, 7);
    assert_eq!(response.data.len(), 2);
    assert_eq!(response.total_records, 4);
    assert_eq!(response.display_records, 2);
    assert_eq!(
        response.data[0]["customer"],
        json!({"id": 1, "email": "jo@example.com"})
    );
    assert_eq!(response.data[1]["name"], json!("Joist delivery"));
}

#[test]
fn test_fan_out_counts_distinct_roots() {
    let ctx = TestContext::new();
    let service = ctx.service(GridConfig::default());
    let request = columns(RequestModel::new().with_search("beam"), &["name", "lines.sku"]);

    let response = service.handle("Order", &request, &[]).unwrap();

    assert_eq!(response.display_records, 1);
    assert_eq!(response.data.len(), 1);
    assert_eq!(
        response.data[0]["lines"],
        json!({"id": [10, 11], "sku": ["beam-a", "beam-b"]})
    );
}

#[test]
fn test_collection_without_children_flattens_to_empty_mapping() {
    let ctx = TestContext::new();
    let service = ctx.service(GridConfig::default());
    let request = columns(
        RequestModel::new().with_order(0, SortDirection::Asc),
        &["name", "lines.sku"],
    );

    let response = service.handle("Order", &request, &[]).unwrap();
    let benches = &response.data[0];

    assert_eq!(benches["name"], json!("Benches"));
    assert_eq!(benches["lines"], json!({}));
    assert_eq!(response.data[1]["lines"], json!({"id": 12, "sku": "chair"}));
}

#[test]
fn test_nested_to_one_path() {
    let ctx = TestContext::new();
    let service = ctx.service(GridConfig::default());
    let request = columns(
        RequestModel::new().with_order(0, SortDirection::Asc),
        &["name", "customer.location.address"],
    );

    let planned = service.plan("Order", &request, &[]).unwrap();
    assert_eq!(planned.plan.joins.len(), 2);
    assert!(planned.plan.projection("customer").is_none());

    let response = service.handle("Order", &request, &[]).unwrap();
    let chairs = response
        .data
        .iter()
        .find(|r| r["name"] == json!("Chairs"))
        .unwrap();
    assert_eq!(chairs["customer"], json!({"location": {"id": 1, "address": "1 Main St"}}));

    let tables = response
        .data
        .iter()
        .find(|r| r["name"] == json!("Tables"))
        .unwrap();
    assert_eq!(tables["customer"], json!({"location": null}));
}

#[test]
fn test_inner_join_override() {
    let ctx = TestContext::new();
    let config = GridConfig::default().with_join_override("customer.name", JoinKind::Inner);
    let service = ctx.service(config);
    let request = columns(RequestModel::new(), &["name", "customer.name"]);

    let response = service.handle("Order", &request, &[]).unwrap();

    assert_eq!(response.total_records, 4);
    assert_eq!(response.display_records, 3);
    assert!(response.data.iter().all(|r| !r["customer"].is_null()));
}

#[test]
fn test_order_falls_forward_to_next_bound_column() {
    let ctx = TestContext::new();
    let service = ctx.service(GridConfig::default());
    let request = RequestModel::new()
        .with_column(ColumnSpec::new("").orderable(false))
        .with_column(ColumnSpec::new("1"))
        .with_column(ColumnSpec::new("name"))
        .with_order(1, SortDirection::Desc);

    let response = service.handle("Order", &request, &[]).unwrap();
    let names: Vec<_> = response.data.iter().map(|r| r["name"].clone()).collect();

    assert_eq!(
        names,
        vec![json!("Tables"), json!("Joist delivery"), json!("Chairs"), json!("Benches")]
    );
}

#[test]
fn test_all_records_sentinel_ignores_start() {
    let ctx = TestContext::new();
    let service = ctx.service(GridConfig::default());
    let request = columns(RequestModel::new().with_page(3, -1), &["name"]);

    let response = service.handle("Order", &request, &[]).unwrap();
    assert_eq!(response.data.len(), 4);

    let paged = columns(RequestModel::new().with_page(3, 10), &["name"]);
    assert_eq!(service.handle("Order", &paged, &[]).unwrap().data.len(), 1);
}

#[test]
fn test_self_reference_gets_own_alias() {
    let ctx = TestContext::new();
    let service = ctx.service(GridConfig::default());
    let request = columns(RequestModel::new().with_search("tables"), &["name", "parent.name"]);

    let planned = service.plan("Order", &request, &[]).unwrap();
    assert_eq!(planned.plan.joins[0].alias, "orders_parent");
    assert_ne!(planned.plan.joins[0].alias, planned.plan.root_alias);

    let response = service.handle("Order", &request, &[]).unwrap();
    assert_eq!(response.data.len(), 1);
    assert_eq!(response.data[0]["parent"], json!({"id": 1, "name": "Joist delivery"}));
}

#[test]
fn test_unknown_field_names_entity_and_field() {
    let ctx = TestContext::new();
    let service = ctx.service(GridConfig::default());
    let request = columns(RequestModel::new(), &["name", "customer.unknown_field"]);

    match service.handle("Order", &request, &[]) {
        Err(Error::UnknownField { entity, field, path }) => {
            assert_eq!(entity, "Customer");
            assert_eq!(field, "unknown_field");
            assert_eq!(path, "customer.unknown_field");
        }
        other => panic!("expected UnknownField, got {:?}", other),
    }
}

#[test]
fn test_caller_predicates_and_totals() {
    let ctx = TestContext::new();
    let service = ctx.service(GridConfig::default());
    let request = columns(RequestModel::new(), &["name", "customer.email"]);
    let extra = [
        ExtraPredicate::new(|ctx| Some(Predicate::ne(ctx.root_field("name"), "Benches")))
            .include_in_total(),
        ExtraPredicate::new(|ctx| {
            ctx.field("customer.email")
                .map(|f| Predicate::contains(f, "mary"))
        }),
    ];

    let response = service.handle("Order", &request, &extra).unwrap();

    assert_eq!(response.total_records, 3);
    assert_eq!(response.display_records, 2);
}

#[test]
fn test_legacy_envelope_with_row_decoration() {
    let ctx = TestContext::new();
    let service = ctx.service(GridConfig::default().with_row_id().with_row_class("order-row"));
    let request = columns(RequestModel::new().with_draw(3).with_search("chairs"), &["name"]);

    let response = service.handle("Order", &request, &[]).unwrap();
    let envelope = response.to_envelope(ProtocolVersion::Legacy);

    assert_eq!(
        envelope,
        json!({
            "sEcho": 3,
            "iTotalRecords": 4,
            "iTotalDisplayRecords": 1,
            "aaData": [
                {"id": 2, "name": "Chairs", "DT_RowId": "2", "DT_RowClass": "order-row"}
            ]
        })
    );
}

#[test]
fn test_catalog_schema_changes_apply_to_later_requests() {
    let ctx = TestContext::new();
    let request = columns(RequestModel::new(), &["name", "customer.email"]);
    assert!(ctx.service(GridConfig::default()).handle("Order", &request, &[]).is_ok());

    let without_customer = SchemaBundle {
        relations: shop_schema()
            .relations
            .into_iter()
            .filter(|r| r.name != "customer")
            .collect(),
        ..shop_schema()
    };
    ctx.catalog.apply_schema(without_customer).unwrap();

    let err = ctx
        .service(GridConfig::default())
        .handle("Order", &request, &[])
        .unwrap_err();
    assert!(matches!(err, Error::UnknownAssociation { ref segment, .. } if segment == "customer"));
    assert_eq!(err.status_code(), 404);
}
