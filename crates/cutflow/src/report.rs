//! Plain-text cut-flow tables.
//!
//! Rendering is a read-only projection of the counters: nothing here
//! touches filter state.

use crate::traits::Accounting;
use std::fmt;

/// A left-aligned ASCII table.
///
/// ```text
/// +--------+------+
/// | Filter | Pass |
/// +--------+------+
/// | Total  | 10   |
/// | cut1   | 7    |
/// +--------+------+
/// ```
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; missing cells render empty, extra cells are ignored.
    pub fn add_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.rows
            .push(row.into_iter().map(|cell| cell.to_string()).collect());
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

fn write_rule(f: &mut fmt::Formatter<'_>, widths: &[usize]) -> fmt::Result {
    for width in widths {
        write!(f, "+{}", "-".repeat(width + 2))?;
    }
    writeln!(f, "+")
}

fn write_cells(f: &mut fmt::Formatter<'_>, widths: &[usize], cells: &[String]) -> fmt::Result {
    for (i, &width) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        write!(f, "| {cell:<width$} ")?;
    }
    writeln!(f, "|")
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        write_rule(f, &widths)?;
        write_cells(f, &widths, &self.headers)?;
        write_rule(f, &widths)?;
        for row in &self.rows {
            write_cells(f, &widths, row)?;
        }
        for width in &widths {
            write!(f, "+{}", "-".repeat(width + 2))?;
        }
        write!(f, "+")
    }
}

/// Render the cut-flow of a sequence of stages.
///
/// One row per stage with its cumulative passing count, headed by the
/// entry total of the first stage, followed by a details table for each
/// stage carrying details.
pub fn cutflow_table<'a, F, I>(filters: I) -> String
where
    F: Accounting + 'a,
    I: IntoIterator<Item = &'a F>,
{
    let filters: Vec<&F> = filters.into_iter().collect();
    let Some(first) = filters.first() else {
        return "Empty FilterList".to_string();
    };

    let mut table = Table::new(["Filter", "Pass"]);
    table.add_row(["Total".to_string(), first.total().to_string()]);
    for filter in &filters {
        table.add_row([filter.name().to_string(), filter.passing().to_string()]);
    }
    let mut rendered = table.to_string();

    for filter in filters.iter().filter(|filter| !filter.details().is_empty()) {
        let mut details = Table::new(["Detail", "Value"]);
        for (key, value) in filter.details() {
            details.add_row([key.clone(), value.to_string()]);
        }
        rendered.push_str(&format!("\n{} Details\n{}", filter.name(), details));
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterState;

    #[test]
    fn test_table_layout() {
        let mut table = Table::new(["Filter", "Pass"]);
        table.add_row(["Total", "10"]);
        table.add_row(["trigger", "7"]);

        let expected = "\
+---------+------+
| Filter  | Pass |
+---------+------+
| Total   | 10   |
| trigger | 7    |
+---------+------+";
        assert_eq!(table.to_string(), expected);
    }

    #[test]
    fn test_cutflow_table_with_details() {
        let mut first = FilterState::new("trigger");
        first.total = 10;
        first.passing = 7;
        let mut second = FilterState::new("jets");
        second.total = 7;
        second.passing = 3;
        second.details.insert("2j".to_string(), 3.0);

        let rendered = cutflow_table(&[first, second]);
        assert!(rendered.contains("| Total   | 10   |"));
        assert!(rendered.contains("| jets    | 3    |"));
        assert!(rendered.contains("jets Details"));
        assert!(rendered.contains("| 2j     | 3     |"));
        assert!(!rendered.contains("trigger Details"));
    }

    #[test]
    fn test_empty_cutflow() {
        let empty: [FilterState; 0] = [];
        assert_eq!(cutflow_table(&empty), "Empty FilterList");
    }
}
