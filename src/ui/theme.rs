use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Whether a quantity leaves anything on the shelf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    InStock,
    SoldOut,
}

impl StockLevel {
    pub fn of(quantity: i64) -> Self {
        if quantity > 0 {
            StockLevel::InStock
        } else {
            StockLevel::SoldOut
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StockLevel::InStock => "in stock",
            StockLevel::SoldOut => "sold out",
        }
    }
}

/// Terminal styles, one per role a piece of inventory output plays
#[derive(Debug, Clone)]
pub struct Theme {
    /// Book names and listing headings
    pub title: Style,
    pub in_stock: Style,
    pub sold_out: Style,
    pub added: Style,
    pub changed: Style,
    pub removed: Style,
    /// Delivered change notifications
    pub notice: Style,
    /// Field labels and URIs
    pub faint: Style,
    pub caution: Style,
    pub failure: Style,
}

impl Theme {
    /// Colors only on a terminal, and not under `CLICOLOR=0`
    pub fn detect() -> Self {
        let term = console::Term::stdout();
        if term.is_term() && console::colors_enabled() {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn colored() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            in_stock: Style::new().green(),
            sold_out: Style::new().red().bold(),
            added: Style::new().green().bold(),
            changed: Style::new().yellow(),
            removed: Style::new().red(),
            notice: Style::new().magenta(),
            faint: Style::new().bright_black(),
            caution: Style::new().yellow().bold(),
            failure: Style::new().red().bold(),
        }
    }

    pub fn plain() -> Self {
        Self {
            title: Style::new(),
            in_stock: Style::new(),
            sold_out: Style::new(),
            added: Style::new(),
            changed: Style::new(),
            removed: Style::new(),
            notice: Style::new(),
            faint: Style::new(),
            caution: Style::new(),
            failure: Style::new(),
        }
    }

    pub fn stock(&self, level: StockLevel) -> Style {
        match level {
            StockLevel::InStock => self.in_stock.clone(),
            StockLevel::SoldOut => self.sold_out.clone(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
