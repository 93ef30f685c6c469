//! NoSqlTable contract step definitions.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use cloud_testkit::capability::{item, AttrValue, CapabilityError, Item, NoSqlTable};
use cucumber::{given, then, when, World};

use crate::backend::{CloudBackend, CloudContext};

/// Test context for NoSqlTable scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct NoSqlTableWorld {
    backend: CloudBackend,
    context: Option<CloudContext>,
    last_error: Option<CapabilityError>,
}

impl NoSqlTableWorld {
    fn new() -> Self {
        Self {
            backend: CloudBackend::from_env(),
            context: None,
            last_error: None,
        }
    }

    fn context(&self) -> &CloudContext {
        self.context.as_ref().expect("Cloud context not initialized")
    }

    fn tables(&self) -> Arc<dyn NoSqlTable> {
        self.context().no_sql_table()
    }

    fn table(&self, logical: &str) -> String {
        self.context().name(logical)
    }

    fn record(&mut self, result: Result<(), CapabilityError>) {
        if let Err(e) = result {
            self.last_error = Some(e);
        }
    }

    async fn get(&self, table: &str, partition: &str, sort: Option<&str>) -> Option<Item> {
        let table = self.table(table);
        self.tables()
            .get_item(&table, partition, sort)
            .await
            .expect("Failed to get item")
    }
}

/// Item holding one attribute of every supported value type.
fn every_type_item(id: &str) -> Item {
    let nested: BTreeMap<String, AttrValue> =
        item([("city", AttrValue::from("Paris")), ("zip", AttrValue::from(75001))]);
    item([
        ("id", AttrValue::from(id)),
        ("text", AttrValue::from("hello")),
        ("int", AttrValue::from(42)),
        ("long", AttrValue::from(9_000_000_000i64)),
        ("float", AttrValue::from(2.75)),
        ("flag", AttrValue::from(true)),
        ("bytes", AttrValue::from(vec![0u8, 1, 2, 255])),
        ("nothing", AttrValue::Null),
        ("address", AttrValue::from(nested)),
        (
            "tags",
            AttrValue::from(vec![AttrValue::from("a"), AttrValue::from(7)]),
        ),
    ])
}

// --- Background ---

#[given("a NoSqlTable backend")]
async fn given_table_backend(world: &mut NoSqlTableWorld) {
    println!("Using backend: {}", world.backend.name());
    world.context = Some(CloudContext::new(world.backend));
}

// --- Given steps ---

#[given(expr = "table {string} with partition key {string}")]
async fn given_table(world: &mut NoSqlTableWorld, table: String, partition: String) {
    let table = world.table(&table);
    world
        .tables()
        .ensure_table(&table, &partition, None)
        .await
        .expect("Failed to ensure table");
}

#[given(expr = "table {string} with partition key {string} and sort key {string}")]
async fn given_composite_table(
    world: &mut NoSqlTableWorld,
    table: String,
    partition: String,
    sort: String,
) {
    let table = world.table(&table);
    world
        .tables()
        .ensure_table(&table, &partition, Some(&sort))
        .await
        .expect("Failed to ensure table");
}

// --- When steps ---

#[when(expr = "I put user {string} named {string} aged {int} into table {string}")]
async fn when_put_user(world: &mut NoSqlTableWorld, id: String, name: String, age: i32, table: String) {
    let table = world.table(&table);
    let user = item([
        ("id", AttrValue::from(id)),
        ("name", AttrValue::from(name)),
        ("age", AttrValue::from(age)),
    ]);
    world
        .tables()
        .put_item(&table, &user)
        .await
        .expect("Failed to put user");
}

#[when(expr = "I put an item {string} with every value type into table {string}")]
async fn when_put_every_type(world: &mut NoSqlTableWorld, id: String, table: String) {
    let table = world.table(&table);
    world
        .tables()
        .put_item(&table, &every_type_item(&id))
        .await
        .expect("Failed to put item");
}

#[when(expr = "I delete item {string} from table {string}")]
async fn when_delete_item(world: &mut NoSqlTableWorld, id: String, table: String) {
    let table = world.table(&table);
    let result = world.tables().delete_item(&table, &id, None).await;
    world.record(result);
}

#[when(expr = "I put order {string} at {string} into table {string}")]
async fn when_put_order(world: &mut NoSqlTableWorld, customer: String, ts: String, table: String) {
    let table = world.table(&table);
    let order = item([
        ("customer", AttrValue::from(customer)),
        ("ts", AttrValue::from(ts)),
        ("total", AttrValue::from(12.5)),
    ]);
    world
        .tables()
        .put_item(&table, &order)
        .await
        .expect("Failed to put order");
}

#[when(expr = "I put {int} items of {int} kilobytes into table {string}")]
async fn when_put_bulk(world: &mut NoSqlTableWorld, count: usize, kilobytes: usize, table: String) {
    let table = world.table(&table);
    let tables = world.tables();
    let payload = "x".repeat(kilobytes * 1024);
    for i in 0..count {
        let row = item([
            ("id", AttrValue::from(format!("item-{i:04}"))),
            ("payload", AttrValue::from(payload.as_str())),
        ]);
        tables.put_item(&table, &row).await.expect("Failed to put item");
    }
}

#[when(expr = "I ensure table {string} with partition key {string} twice")]
async fn when_ensure_twice(world: &mut NoSqlTableWorld, table: String, partition: String) {
    let table = world.table(&table);
    let tables = world.tables();
    for _ in 0..2 {
        let result = tables.ensure_table(&table, &partition, None).await;
        world.record(result);
    }
}

#[when(expr = "I delete table {string} twice")]
async fn when_delete_table_twice(world: &mut NoSqlTableWorld, table: String) {
    let table = world.table(&table);
    let tables = world.tables();
    for _ in 0..2 {
        let result = tables.delete_table(&table).await;
        world.record(result);
    }
}

// --- Then steps ---

#[then("no error occurred")]
async fn then_no_error(world: &mut NoSqlTableWorld) {
    assert!(
        world.last_error.is_none(),
        "Unexpected error: {:?}",
        world.last_error
    );
}

#[then(expr = "item {string} in table {string} has name {string} and integer age {int}")]
async fn then_user(world: &mut NoSqlTableWorld, id: String, table: String, name: String, age: i32) {
    let user = world.get(&table, &id, None).await.expect("User not found");
    assert_eq!(user.get("name").and_then(AttrValue::as_str), Some(name.as_str()));
    assert_eq!(user.get("age"), Some(&AttrValue::Int(age)));
}

#[then(expr = "item {string} in table {string} equals the item with every value type")]
async fn then_every_type(world: &mut NoSqlTableWorld, id: String, table: String) {
    let stored = world.get(&table, &id, None).await.expect("Item not found");
    assert_eq!(stored, every_type_item(&id));
}

#[then(expr = "item {string} in table {string} is absent")]
async fn then_item_absent(world: &mut NoSqlTableWorld, id: String, table: String) {
    assert!(world.get(&table, &id, None).await.is_none());
}

#[then(expr = "scanning table {string} returns {int} items")]
async fn then_scan_count(world: &mut NoSqlTableWorld, table: String, count: usize) {
    let table = world.table(&table);
    let items = world.tables().scan(&table).await.expect("Failed to scan");
    assert_eq!(items.len(), count);
}

#[then(expr = "scanning table {string} returns {int} distinct items")]
async fn then_scan_distinct(world: &mut NoSqlTableWorld, table: String, count: usize) {
    let table = world.table(&table);
    let items = world.tables().scan(&table).await.expect("Failed to scan");
    let ids: HashSet<String> = items
        .iter()
        .filter_map(|i| i.get("id").and_then(AttrValue::as_str).map(str::to_string))
        .collect();
    assert_eq!(items.len(), count);
    assert_eq!(ids.len(), count);
}

#[then(expr = "querying table {string} for {string} returns {int} items")]
async fn then_query_count(world: &mut NoSqlTableWorld, table: String, partition: String, count: usize) {
    let table = world.table(&table);
    let items = world
        .tables()
        .query(&table, &partition)
        .await
        .expect("Failed to query");
    assert_eq!(items.len(), count);
    assert!(items
        .iter()
        .all(|i| i.get("customer").and_then(AttrValue::as_str) == Some(partition.as_str())));
}

#[then(expr = "order {string} at {string} in table {string} is present")]
async fn then_order_present(world: &mut NoSqlTableWorld, customer: String, ts: String, table: String) {
    let order = world
        .get(&table, &customer, Some(&ts))
        .await
        .expect("Order not found");
    assert_eq!(order.get("ts").and_then(AttrValue::as_str), Some(ts.as_str()));
}
