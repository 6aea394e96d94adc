//! Query shaping: projections, filters and sort orders
//!
//! Column names in projections and sort orders are checked against the
//! schema before any SQL is built, so they are safe to interpolate.
//! Filters are caller-supplied boolean expressions whose values travel
//! separately as bound `?` parameters.

use super::schema::Column;
use crate::book::Value;
use crate::{Error, Result};
use std::fmt;

/// The columns a query returns. Empty means every column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    columns: Vec<Column>,
}

impl Projection {
    /// Every column, in table order
    pub fn all() -> Self {
        Self::default()
    }

    /// Repeated columns keep their first position.
    pub fn new(columns: impl IntoIterator<Item = Column>) -> Self {
        let mut unique = Vec::new();
        for column in columns {
            if !unique.contains(&column) {
                unique.push(column);
            }
        }
        Self { columns: unique }
    }

    /// Parse a comma-separated column list, e.g. `"_id, name, price"`.
    pub fn parse(input: &str) -> Result<Self> {
        let columns = input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<Column>())
            .collect::<Result<Vec<_>>>()
            .map_err(|e| Error::validation("projection", e.to_string()))?;
        Ok(Self::new(columns))
    }

    pub fn is_all(&self) -> bool {
        self.columns.is_empty()
    }

    /// Resolved column list
    pub fn columns(&self) -> Vec<Column> {
        if self.columns.is_empty() {
            Column::ALL.to_vec()
        } else {
            self.columns.clone()
        }
    }

    pub(crate) fn to_sql(&self) -> String {
        self.columns()
            .iter()
            .map(|c| c.sql_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<Vec<Column>> for Projection {
    fn from(columns: Vec<Column>) -> Self {
        Self::new(columns)
    }
}

/// A parameterized boolean predicate, e.g. `quantity > ?` with `[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    clause: String,
    args: Vec<Value>,
}

impl Filter {
    pub fn new(clause: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            clause: clause.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Filter without bound arguments
    pub fn raw(clause: impl Into<String>) -> Self {
        Self::new(clause, [])
    }

    /// `_id = ?`
    pub fn by_id(id: i64) -> Self {
        Self::eq(Column::Id, Value::Integer(id))
    }

    /// `<column> = ?`
    pub fn eq(column: Column, value: impl Into<Value>) -> Self {
        Self::new(format!("{} = ?", column.sql_name()), [value.into()])
    }

    /// Conjunction of two filters. Arguments keep their order.
    ///
    /// Validate caller-supplied sides before combining them.
    pub fn and(self, other: Filter) -> Filter {
        let mut args = self.args;
        args.extend(other.args);
        Filter {
            clause: format!("({}) AND ({})", self.clause, other.clause),
            args,
        }
    }

    /// Conjunction with an optional caller filter.
    pub fn and_then(self, other: Option<Filter>) -> Filter {
        match other {
            Some(other) => self.and(other),
            None => self,
        }
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Checks the clause is a single self-contained expression that binds
    /// exactly as many parameters as it has arguments.
    ///
    /// Parentheses must balance so that `and` can never be escaped, and
    /// statement separators or comments are refused outright.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.clause.trim().is_empty() {
            return Err(Error::validation("filter", "clause must not be empty"));
        }
        let parameters = count_parameters(&self.clause)?;
        if parameters != self.args.len() {
            return Err(Error::validation(
                "filter",
                format!(
                    "clause binds {} parameter(s) but {} argument(s) were given",
                    parameters,
                    self.args.len()
                ),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.clause)
    }
}

/// Scan a clause outside quoted literals and identifiers and return the
/// number of parameters SQLite will expect for it.
///
/// A bare `?` takes the index after the highest seen so far and `?N`
/// takes `N`, so `?1` may repeat. Named parameters are not accepted.
fn count_parameters(clause: &str) -> Result<usize> {
    let invalid = |reason: &str| Error::validation("filter", reason);

    let mut chars = clause.chars().peekable();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut highest = 0usize;
    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| invalid("unbalanced parentheses"))?;
            }
            ';' => return Err(invalid("must be a single expression")),
            '-' if chars.peek() == Some(&'-') => return Err(invalid("comments are not allowed")),
            '/' if chars.peek() == Some(&'*') => return Err(invalid("comments are not allowed")),
            ':' | '@' | '$' => return Err(invalid("named parameters are not supported")),
            '?' => {
                let mut digits = String::new();
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    digits.push(d);
                }
                if digits.is_empty() {
                    highest += 1;
                } else {
                    let index = digits
                        .parse::<usize>()
                        .ok()
                        .filter(|&n| n > 0)
                        .ok_or_else(|| invalid("parameter index out of range"))?;
                    highest = highest.max(index);
                }
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Err(invalid("unterminated quote"));
    }
    if depth != 0 {
        return Err(invalid("unbalanced parentheses"));
    }
    Ok(highest)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One or more `column [ASC|DESC]` terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    terms: Vec<(Column, Direction)>,
}

impl SortOrder {
    pub fn asc(column: Column) -> Self {
        Self {
            terms: vec![(column, Direction::Asc)],
        }
    }

    pub fn desc(column: Column) -> Self {
        Self {
            terms: vec![(column, Direction::Desc)],
        }
    }

    /// Adds a tie-breaking term.
    pub fn then(mut self, column: Column, direction: Direction) -> Self {
        self.terms.push((column, direction));
        self
    }

    /// Parse e.g. `"price DESC, product_name"`.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: String| Error::validation("sortOrder", reason);

        let mut terms = Vec::new();
        for term in input.split(',').map(str::trim) {
            if term.is_empty() {
                return Err(invalid(format!("empty term in '{}'", input)));
            }
            let mut parts = term.split_whitespace();
            let column = parts
                .next()
                .ok_or_else(|| invalid(format!("empty term in '{}'", input)))?
                .parse::<Column>()
                .map_err(|e| invalid(e.to_string()))?;
            let direction = match parts.next() {
                None => Direction::Asc,
                Some(d) if d.eq_ignore_ascii_case("asc") => Direction::Asc,
                Some(d) if d.eq_ignore_ascii_case("desc") => Direction::Desc,
                Some(d) => return Err(invalid(format!("unknown direction: {}", d))),
            };
            if let Some(extra) = parts.next() {
                return Err(invalid(format!("unexpected token: {}", extra)));
            }
            terms.push((column, direction));
        }
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[(Column, Direction)] {
        &self.terms
    }

    pub(crate) fn to_sql(&self) -> String {
        self.terms
            .iter()
            .map(|(c, d)| format!("{} {}", c.sql_name(), d.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_defaults_to_all_columns() {
        let projection = Projection::all();
        assert!(projection.is_all());
        assert_eq!(projection.columns(), Column::ALL.to_vec());
        assert!(projection.to_sql().starts_with("_id, product_name"));
    }

    #[test]
    fn test_projection_parse() {
        let projection = Projection::parse("name, price,name").unwrap();
        assert_eq!(projection.columns(), vec![Column::Name, Column::Price]);
        assert_eq!(projection.to_sql(), "product_name, price");

        let err = Projection::parse("name, isbn").unwrap_err();
        assert_eq!(err.field(), Some("projection"));
    }

    #[test]
    fn test_filter_and_keeps_argument_order() {
        let filter = Filter::by_id(4).and(Filter::new("quantity > ?", [Value::Integer(1)]));
        assert_eq!(filter.clause(), "(_id = ?) AND (quantity > ?)");
        assert_eq!(filter.args(), &[Value::Integer(4), Value::Integer(1)]);
        assert!(filter.validate().is_ok());

        let same = Filter::by_id(4).and_then(None);
        assert_eq!(same, Filter::by_id(4));
    }

    #[test]
    fn test_filter_placeholder_count_must_match() {
        assert!(Filter::raw("quantity > ?").validate().is_err());
        assert!(Filter::new("price = 1", [Value::Integer(1)]).validate().is_err());
        assert!(Filter::raw("  ").validate().is_err());
        // `?` inside a literal is not a placeholder
        assert!(Filter::raw("product_name = 'who?'").validate().is_ok());
    }

    #[test]
    fn test_filter_must_be_single_expression() {
        let err = Filter::raw("1; DELETE FROM books").validate().unwrap_err();
        assert_eq!(err.field(), Some("filter"));
        assert!(Filter::raw("supplier_name = 'a;b'").validate().is_ok());
    }

    #[test]
    fn test_filter_cannot_escape_its_parentheses() {
        for bad in ["1) OR (1", "quantity > 0)", "(price = 1", "1 -- x", "1 /* x */"] {
            let err = Filter::raw(bad).validate().unwrap_err();
            assert_eq!(err.field(), Some("filter"), "input: {bad}");
        }
        // Once combined the clause balances again, so each side is checked first
        assert!(Filter::by_id(1).and(Filter::raw("1) OR (1")).validate().is_ok());
        assert!(Filter::raw("(price > 1) OR (quantity = 0)").validate().is_ok());
        assert!(Filter::raw("product_name = 'a) OR (b'").validate().is_ok());
        assert!(Filter::raw("product_name = 'unclosed").validate().is_err());
    }

    #[test]
    fn test_filter_parameter_forms() {
        let price = [Value::Integer(5)];
        assert!(Filter::new("price = ?1 OR quantity = ?1", price.clone()).validate().is_ok());
        assert!(Filter::new("price = ?2", price.clone()).validate().is_err());
        assert!(
            Filter::new("price = ?1 AND quantity > ?", [Value::Integer(5), Value::Integer(0)])
                .validate()
                .is_ok()
        );
        assert!(Filter::new("price = ?0", price.clone()).validate().is_err());
        for named in ["price = :p", "price = @p", "price = $p"] {
            let err = Filter::new(named, price.clone()).validate().unwrap_err();
            assert_eq!(err.field(), Some("filter"), "input: {named}");
        }
    }

    #[test]
    fn test_sort_order_parse() {
        let order = SortOrder::parse("price DESC, name").unwrap();
        assert_eq!(
            order.terms(),
            &[(Column::Price, Direction::Desc), (Column::Name, Direction::Asc)]
        );
        assert_eq!(order.to_sql(), "price DESC, product_name ASC");
        assert_eq!(
            SortOrder::desc(Column::Price).then(Column::Id, Direction::Asc),
            SortOrder::parse("price desc, _id asc").unwrap()
        );
    }

    #[test]
    fn test_sort_order_rejects_unknown_input() {
        for bad in ["", "isbn", "price sideways", "price DESC; DROP TABLE books", "price,"] {
            let err = SortOrder::parse(bad).unwrap_err();
            assert_eq!(err.field(), Some("sortOrder"), "input: {bad}");
        }
    }
}
