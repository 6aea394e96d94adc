pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    banner, book_added, book_card, book_deleted, book_updated, config_written, error, faint,
    heading, notice, setting, stock_counts, stock_summary, warn,
};
pub use table::{books_table, stats_table, TableBuilder};
pub use theme::{theme, StockLevel, Theme};
