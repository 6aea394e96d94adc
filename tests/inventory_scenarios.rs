use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use stockroom::config::InventoryConfig;
use stockroom::{
    Change, ChangeKind, Column, Error, FieldSet, Filter, Inventory, QueryArgs, ResourceTarget,
    SortOrder, Value,
};

fn book(name: &str, price: i64, quantity: i64) -> FieldSet {
    FieldSet::new()
        .with_text(Column::Name, name)
        .with_integer(Column::Price, price)
        .with_integer(Column::Quantity, quantity)
}

fn file_inventory(dir: &tempfile::TempDir) -> Inventory {
    let config = InventoryConfig {
        database: Some("books.db".to_string()),
        authority: Some("com.example.books".to_string()),
        read_connections: Some(3),
    };
    Inventory::open_in(&config, dir.path()).unwrap()
}

#[test]
fn test_example_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let inventory = file_inventory(&dir);
    let books = "content://com.example.books/books";

    let fields = book("Dune", 15, 3)
        .with_text(Column::SupplierName, "Ace")
        .with_text(Column::SupplierPhone, "555-0100");
    let uri = inventory.insert(books, &fields).unwrap();
    assert_eq!(uri.to_string(), "content://com.example.books/books/1");

    let item = uri.to_string();
    let dune = inventory.query(&item, QueryArgs::default()).unwrap().into_books().unwrap();
    assert_eq!(dune.len(), 1);
    assert_eq!(dune[0].to_fields(), fields);

    let update = FieldSet::new().with_integer(Column::Quantity, 2);
    assert_eq!(inventory.update(&item, &update, None).unwrap(), 1);
    let dune = inventory.query(&item, QueryArgs::default()).unwrap().into_books().unwrap();
    assert_eq!(dune[0].quantity, 2);
    assert_eq!(dune[0].name, "Dune");
    assert_eq!(dune[0].supplier_phone.as_deref(), Some("555-0100"));

    assert_eq!(inventory.delete(&item, None).unwrap(), 1);
    assert!(matches!(
        inventory.query(&item, QueryArgs::default()),
        Err(Error::NotFound(_))
    ));

    // Ids are never handed out twice
    let next = inventory.insert(books, &book("Emma", 5, 1)).unwrap();
    assert_eq!(next.id(), Some(2));
}

#[test]
fn test_reopen_keeps_records() {
    let dir = tempfile::tempdir().unwrap();
    {
        let inventory = file_inventory(&dir);
        for (name, price) in [("Dune", 15), ("Emma", 9), ("Beloved", 12)] {
            inventory
                .insert("com.example.books/books", &book(name, price, 1))
                .unwrap();
        }
    }

    let inventory = file_inventory(&dir);
    let cursor = inventory
        .query(
            "com.example.books/books",
            QueryArgs::new().sort_order(SortOrder::desc(Column::Price)),
        )
        .unwrap();
    let prices: Vec<_> = cursor.map(|r| r.get_i64(Column::Price)).collect();
    assert_eq!(prices, vec![Some(15), Some(12), Some(9)]);
}

#[test]
fn test_partial_update_rejects_negative_quantity() {
    let inventory = Inventory::in_memory().unwrap();
    let books = inventory.collection_uri().to_string();
    inventory.insert(&books, &book("Dune", 15, 3)).unwrap();
    inventory.insert(&books, &book("Emma", 9, 4)).unwrap();

    let err = inventory
        .update(
            &books,
            &FieldSet::new()
                .with_text(Column::Name, "Renamed")
                .with_integer(Column::Quantity, -1),
            None,
        )
        .unwrap_err();
    assert_eq!(err.field(), Some("quantity"));

    let names: Vec<_> = inventory
        .query(&books, QueryArgs::default())
        .unwrap()
        .into_books()
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["Dune".to_string(), "Emma".to_string()]);
}

#[test]
fn test_filtered_collection_mutations() {
    let inventory = Inventory::in_memory().unwrap();
    let books = inventory.collection_uri().to_string();
    inventory.insert(&books, &book("Dune", 15, 0)).unwrap();
    inventory.insert(&books, &book("Emma", 9, 4)).unwrap();
    inventory.insert(&books, &book("Ulysses", 20, 0)).unwrap();

    let sold_out = Filter::new("quantity = ?", [Value::Integer(0)]);
    assert_eq!(inventory.delete(&books, Some(sold_out)).unwrap(), 2);

    let remaining = inventory.query(&books, QueryArgs::default()).unwrap();
    assert_eq!(remaining.len(), 1);

    // Malformed caller filters are validation errors
    let err = inventory
        .delete(&books, Some(Filter::raw("quantity >")))
        .unwrap_err();
    assert_eq!(err.field(), Some("filter"));
}

#[test]
fn test_item_uri_mutations_stay_on_their_item() {
    let inventory = Inventory::in_memory().unwrap();
    let books = inventory.collection_uri().to_string();
    for name in ["A", "B", "C"] {
        inventory.insert(&books, &book(name, 10, 1)).unwrap();
    }
    let first = inventory.item_uri(1).to_string();

    let err = inventory
        .delete(&first, Some(Filter::raw("1) OR (1")))
        .unwrap_err();
    assert_eq!(err.field(), Some("filter"));
    let err = inventory
        .update(
            &first,
            &FieldSet::new().with_integer(Column::Quantity, 9),
            Some(Filter::raw("1) OR (1")),
        )
        .unwrap_err();
    assert_eq!(err.field(), Some("filter"));

    // A well-formed filter still only reaches the addressed book
    let any = Filter::raw("(1) OR (1)");
    assert_eq!(inventory.delete(&first, Some(any)).unwrap(), 1);
    assert_eq!(inventory.stats().unwrap().books, 2);
}

#[test]
fn test_item_and_collection_topics() {
    let inventory = Inventory::in_memory().unwrap();
    let books = inventory.collection_uri().to_string();
    let (_, collection) = inventory.notifier().subscribe_channel(ResourceTarget::Collection);
    let (_, item) = inventory.notifier().subscribe_channel(ResourceTarget::Item(2));

    inventory.insert(&books, &book("Dune", 15, 3)).unwrap();
    inventory.insert(&books, &book("Emma", 9, 4)).unwrap();
    let restock = FieldSet::new().with_integer(Column::Quantity, 10);
    inventory
        .update(&inventory.item_uri(2).to_string(), &restock, None)
        .unwrap();

    let all: Vec<Change> = collection.try_iter().collect();
    assert_eq!(all.len(), 3);
    let for_item: Vec<ChangeKind> = item.try_iter().map(|c| c.kind).collect();
    assert_eq!(for_item, vec![ChangeKind::Inserted, ChangeKind::Updated]);
}

#[test]
fn test_concurrent_readers_and_writers() {
    let dir = tempfile::tempdir().unwrap();
    let inventory = Arc::new(file_inventory(&dir));
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    inventory
        .notifier()
        .subscribe(ResourceTarget::Collection, move |_: &Change| -> anyhow::Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

    let mut handles = Vec::new();
    for w in 0..4 {
        let inventory = Arc::clone(&inventory);
        handles.push(thread::spawn(move || {
            let books = inventory.collection_uri().to_string();
            for i in 0..20 {
                inventory
                    .insert(&books, &book(&format!("w{}-{}", w, i), i, 1))
                    .unwrap();
            }
        }));
    }
    for _ in 0..4 {
        let inventory = Arc::clone(&inventory);
        handles.push(thread::spawn(move || {
            let books = inventory.collection_uri().to_string();
            for _ in 0..20 {
                let cursor = inventory.query(&books, QueryArgs::default()).unwrap();
                assert!(cursor.len() <= 80);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(inventory.stats().unwrap().books, 80);
    assert_eq!(notified.load(Ordering::SeqCst), 80);
}

#[test]
fn test_cursor_consumed_on_another_thread() {
    let inventory = Inventory::in_memory().unwrap();
    let books = inventory.collection_uri().to_string();
    inventory.insert(&books, &book("Dune", 15, 3)).unwrap();

    let cursor = inventory.query(&books, QueryArgs::default()).unwrap();
    // Writes after the query are not visible to the cursor
    inventory.insert(&books, &book("Emma", 9, 4)).unwrap();

    let names = thread::spawn(move || {
        cursor
            .map(|r| r.get_str(Column::Name).map(str::to_string))
            .collect::<Vec<_>>()
    })
    .join()
    .unwrap();
    assert_eq!(names, vec![Some("Dune".to_string())]);
}
