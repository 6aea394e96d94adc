use crate::{emit_success, OutputMode};
use crossbeam::channel::Receiver;
use std::path::Path;
use stockroom::config::{self, InventoryConfig};
use stockroom::ui::{self, Icons};
use stockroom::{
    Change, Column, FieldSet, Filter, Inventory, Projection, QueryArgs, ResourceTarget,
    ResourceUri, Row, SortOrder, Value,
};

/// Book fields as given on the command line. `None` leaves a field out.
#[derive(Debug, Default)]
pub struct BookFields {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub quantity: Option<i64>,
    pub supplier_name: Option<String>,
    pub supplier_phone: Option<String>,
}

impl BookFields {
    fn into_field_set(self) -> FieldSet {
        let mut fields = FieldSet::new();
        if let Some(name) = self.name {
            fields.set(Column::Name, name);
        }
        if let Some(price) = self.price {
            fields.set(Column::Price, price);
        }
        if let Some(quantity) = self.quantity {
            fields.set(Column::Quantity, quantity);
        }
        if let Some(supplier) = self.supplier_name {
            fields.set(Column::SupplierName, supplier);
        }
        if let Some(phone) = self.supplier_phone {
            fields.set(Column::SupplierPhone, phone);
        }
        fields
    }
}

/// Subscribe a logger and a collector to the collection topic
fn watch_changes(inventory: &Inventory) -> Receiver<Change> {
    inventory
        .notifier()
        .subscribe(ResourceTarget::Collection, |change: &Change| -> anyhow::Result<()> {
            tracing::debug!("Change notified: {:?} {} ({} rows)", change.kind, change.uri, change.rows);
            Ok(())
        });
    let (_, rx) = inventory.notifier().subscribe_channel(ResourceTarget::Collection);
    rx
}

fn drain_changes(rx: &Receiver<Change>, output_mode: OutputMode) -> Vec<Change> {
    let changes: Vec<Change> = rx.try_iter().collect();
    if output_mode.shows_notices() {
        for change in &changes {
            ui::notice(change);
        }
    }
    changes
}

/// Filter arguments that parse as integers bind as integers
fn filter_arg(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::Integer)
        .unwrap_or_else(|_| Value::Text(raw.to_string()))
}

pub fn run_init(path: &Path, settings: InventoryConfig, force: bool, output_mode: OutputMode) -> anyhow::Result<()> {
    let database = settings
        .database
        .clone()
        .unwrap_or_else(|| config::default_database_path_in(Path::new("")).display().to_string());
    let settings = InventoryConfig {
        database: Some(database),
        authority: Some(settings.authority().to_string()),
        read_connections: Some(settings.read_connections()),
    };

    config::write_config(path, &settings, force)?;
    let inventory = Inventory::open(&settings)?;
    let stats = inventory.stats()?;

    if output_mode.is_human() {
        ui::banner("Stockroom", &format!("Version {}", env!("CARGO_PKG_VERSION")));
        ui::config_written(&path.display().to_string());
        ui::setting("Database", &stats.location);
        ui::setting("Authority", &stats.authority);
    } else {
        let data = serde_json::json!({
            "config": path.display().to_string(),
            "stats": stats,
        });
        emit_success(output_mode, "init", data)?;
    }
    Ok(())
}

pub fn run_list(
    inventory: &Inventory,
    sort: Option<String>,
    filter: Option<String>,
    args: Vec<String>,
    columns: Option<String>,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let mut query = QueryArgs::new();
    if let Some(columns) = columns {
        query = query.projection(Projection::parse(&columns)?);
    }
    if let Some(sort) = sort {
        query = query.sort_order(SortOrder::parse(&sort)?);
    }
    if let Some(clause) = filter {
        query = query.filter(Filter::new(clause, args.iter().map(|a| filter_arg(a))));
    }

    let cursor = inventory.query(&inventory.collection_uri().to_string(), query)?;
    let columns = cursor.columns().to_vec();
    let rows: Vec<Row> = cursor.collect();

    if output_mode.is_human() {
        if rows.is_empty() {
            println!("{} No books found.", Icons::PACKAGE);
            return Ok(());
        }
        ui::heading(Icons::BOOKS, &format!("{} book(s)", rows.len()));
        println!("{}", ui::books_table(&columns, &rows));
        ui::stock_summary(&rows);
    } else {
        let data = serde_json::json!({
            "count": rows.len(),
            "books": rows,
        });
        emit_success(output_mode, "list", data)?;
    }
    Ok(())
}

pub fn run_show(inventory: &Inventory, id: i64, output_mode: OutputMode) -> anyhow::Result<()> {
    let uri = inventory.item_uri(id).to_string();
    let books = inventory.query(&uri, QueryArgs::default())?.into_books()?;
    let Some(book) = books.into_iter().next() else {
        anyhow::bail!("no book at {}", uri);
    };

    if output_mode.is_human() {
        ui::book_card(&book, &uri);
    } else {
        emit_success(output_mode, "show", serde_json::to_value(&book)?)?;
    }
    Ok(())
}

fn insert_book(
    inventory: &Inventory,
    fields: FieldSet,
    command: &str,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let rx = watch_changes(inventory);
    let uri = inventory.insert(&inventory.collection_uri().to_string(), &fields)?;
    let name = fields.get(Column::Name).map(ToString::to_string).unwrap_or_default();

    if output_mode.is_human() {
        ui::book_added(&uri.to_string(), &name);
        drain_changes(&rx, output_mode);
    } else {
        let data = serde_json::json!({
            "uri": uri,
            "id": uri.id(),
            "changes": drain_changes(&rx, output_mode),
        });
        emit_success(output_mode, command, data)?;
    }
    Ok(())
}

pub fn run_add(inventory: &Inventory, fields: BookFields, output_mode: OutputMode) -> anyhow::Result<()> {
    insert_book(inventory, fields.into_field_set(), "add", output_mode)
}

/// The sample record offered by the inventory app's debug menu
pub fn run_seed(inventory: &Inventory, output_mode: OutputMode) -> anyhow::Result<()> {
    let fields = BookFields {
        name: Some("The Lord of The Ring".to_string()),
        price: Some(58),
        quantity: Some(1),
        supplier_name: Some("Wizard Editorial".to_string()),
        supplier_phone: Some("254-200-5555".to_string()),
    };
    insert_book(inventory, fields.into_field_set(), "seed", output_mode)
}

pub fn run_edit(inventory: &Inventory, id: i64, fields: BookFields, output_mode: OutputMode) -> anyhow::Result<()> {
    let fields = fields.into_field_set();
    let uri = inventory.item_uri(id).to_string();
    let rx = watch_changes(inventory);
    let rows = inventory.update(&uri, &fields, None)?;

    if output_mode.is_human() {
        if fields.is_empty() {
            ui::warn("Nothing to change");
        } else if rows == 0 {
            ui::warn(&format!("No book with id {}", id));
        } else {
            ui::book_updated(&uri, rows);
            drain_changes(&rx, output_mode);
        }
    } else {
        let data = serde_json::json!({
            "uri": uri,
            "rows": rows,
            "changes": drain_changes(&rx, output_mode),
        });
        emit_success(output_mode, "edit", data)?;
    }
    Ok(())
}

/// Delete one book, or every book when `id` is `None`
pub fn run_delete(inventory: &Inventory, id: Option<i64>, output_mode: OutputMode) -> anyhow::Result<()> {
    let (uri, command) = match id {
        Some(id) => (inventory.item_uri(id), "delete"),
        None => (inventory.collection_uri(), "delete-all"),
    };
    let uri = uri.to_string();
    let rx = watch_changes(inventory);
    let rows = inventory.delete(&uri, None)?;

    if output_mode.is_human() {
        if rows == 0 {
            ui::warn("Nothing deleted");
        } else {
            ui::book_deleted(&uri, rows);
            drain_changes(&rx, output_mode);
        }
    } else {
        let data = serde_json::json!({
            "uri": uri,
            "rows": rows,
            "changes": drain_changes(&rx, output_mode),
        });
        emit_success(output_mode, command, data)?;
    }
    Ok(())
}

pub fn run_stats(inventory: &Inventory, output_mode: OutputMode) -> anyhow::Result<()> {
    let stats = inventory.stats()?;

    if output_mode.is_human() {
        ui::heading(Icons::STATS, "Stockroom Statistics");
        let books = stats.books.to_string();
        let version = stats.schema_version.to_string();
        println!(
            "{}",
            ui::stats_table(&[
                ("Books", books.as_str()),
                ("Database", stats.location.as_str()),
                ("Authority", stats.authority.as_str()),
                ("Schema version", version.as_str()),
            ])
        );
    } else {
        emit_success(output_mode, "stats", serde_json::to_value(&stats)?)?;
    }
    Ok(())
}

/// Resolve a URI against the configured authority. Touches no storage.
pub fn run_type(authority: &str, uri: &str, output_mode: OutputMode) -> anyhow::Result<()> {
    let kind = ResourceUri::parse(uri, authority)?.kind();
    let mime = kind.mime_type(authority);

    if output_mode.is_human() {
        ui::setting("Kind", kind.as_str());
        ui::setting("Content type", &mime);
        println!("  {} {}", Icons::LINK, ui::faint(uri));
    } else {
        let data = serde_json::json!({
            "uri": uri,
            "kind": kind,
            "mimeType": mime,
        });
        emit_success(output_mode, "type", data)?;
    }
    Ok(())
}
