use crate::book::Book;
use crate::notify::{Change, ChangeKind};
use crate::storage::schema::Column;
use crate::storage::Row;
use crate::ui::theme::{theme, StockLevel};
use crate::ui::Icons;
use owo_colors::OwoColorize;

pub fn faint(text: &str) -> String {
    text.style(theme().faint.clone()).to_string()
}

pub fn heading(icon: &str, text: &str) {
    println!("{} {}", icon, text.style(theme().title.clone()));
}

pub fn banner(title: &str, subtitle: &str) {
    println!();
    println!("  {} {}", Icons::BOOKS, title.style(theme().title.clone()));
    println!("  {}", faint(subtitle));
    println!();
}

/// `label: value` line for settings and resource metadata
pub fn setting(label: &str, value: &str) {
    println!("{} {}: {}", Icons::INFO, faint(label), value);
}

pub fn config_written(path: &str) {
    println!("{} Wrote {}", Icons::CHECK, path.style(theme().added.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().caution.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().failure.clone()));
}

fn stock_text(quantity: i64) -> String {
    let level = StockLevel::of(quantity);
    format!("{} ({})", quantity, level.label())
        .style(theme().stock(level))
        .to_string()
}

/// Every field of one book, followed by its URI
pub fn book_card(book: &Book, uri: &str) {
    println!();
    println!("━{}━", book.name.style(theme().title.clone()));
    let rows = [
        ("Id", book.id.to_string()),
        ("Price", book.price.to_string()),
        ("Quantity", stock_text(book.quantity)),
        ("Supplier", book.supplier_name.clone().unwrap_or_default()),
        ("Phone", book.supplier_phone.clone().unwrap_or_default()),
    ];
    for (label, value) in rows {
        println!("  {} {}", faint(label), value);
    }
    println!("  {}", faint(uri));
}

/// In-stock and sold-out counts, when quantity was projected
pub fn stock_counts(rows: &[Row]) -> Option<(usize, usize)> {
    let quantities: Vec<i64> = rows
        .iter()
        .map(|row| row.get_i64(Column::Quantity))
        .collect::<Option<_>>()?;
    let sold_out = quantities
        .iter()
        .filter(|&&q| StockLevel::of(q) == StockLevel::SoldOut)
        .count();
    Some((quantities.len() - sold_out, sold_out))
}

pub fn stock_summary(rows: &[Row]) {
    if let Some((in_stock, sold_out)) = stock_counts(rows) {
        println!(
            "{} {}, {} {}",
            in_stock.to_string().style(theme().in_stock.clone()),
            StockLevel::InStock.label(),
            sold_out.to_string().style(theme().sold_out.clone()),
            StockLevel::SoldOut.label()
        );
    }
}

pub fn book_added(uri: &str, name: &str) {
    println!(
        "{} {} {}",
        Icons::NEW,
        name.style(theme().added.clone()),
        faint(uri)
    );
}

pub fn book_updated(uri: &str, rows: usize) {
    println!("{} {} ({} updated)", Icons::MOD, uri.style(theme().changed.clone()), rows);
}

pub fn book_deleted(uri: &str, rows: usize) {
    println!("{} {} ({} deleted)", Icons::DEL, uri.style(theme().removed.clone()), rows);
}

/// One line per delivered change notification
pub fn notice(change: &Change) {
    let verb = match change.kind {
        ChangeKind::Inserted => "inserted",
        ChangeKind::Updated => "updated",
        ChangeKind::Deleted => "deleted",
    };
    let line = format!("{} {} ({} rows)", change.uri, verb, change.rows);
    println!("{} {}", Icons::BELL, line.style(theme().notice.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Value;

    fn row(quantity: Option<i64>) -> Row {
        let mut cells = vec![(Column::Name, Value::from("Dune"))];
        if let Some(q) = quantity {
            cells.push((Column::Quantity, Value::Integer(q)));
        }
        Row::new(cells)
    }

    #[test]
    fn test_stock_counts_split_on_zero() {
        let rows = [row(Some(3)), row(Some(0)), row(Some(1))];
        assert_eq!(stock_counts(&rows), Some((2, 1)));
        assert_eq!(stock_counts(&[]), Some((0, 0)));
    }

    #[test]
    fn test_stock_counts_need_quantity() {
        assert_eq!(stock_counts(&[row(Some(2)), row(None)]), None);
    }
}
