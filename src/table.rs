//! Plain-text table rendering with type-aware column alignment.
//!
//! A [`TableSpec`] carries an ordered list of columns and pre-stringified
//! rows; [`render`] turns it into aligned text. Numeric columns are
//! right-aligned, everything else is left-aligned. Absent source values must
//! already be replaced with [`NA`] by the caller before the spec is built.

/// Placeholder substituted for any figure absent from the source data.
pub const NA: &str = "N/A";

/// Indent prefixed to every rendered line.
const INDENT: &str = "  ";

/// One declared column: display name plus alignment class.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub numeric: bool,
}

impl Column {
    /// Left-aligned text column.
    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            numeric: false,
        }
    }

    /// Right-aligned numeric column.
    pub fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            numeric: true,
        }
    }
}

/// Ordered columns plus rows of cell text, one entry per declared column.
#[derive(Debug, Clone, Default)]
pub struct TableSpec {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl TableSpec {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends one row. Every row must carry a cell for every declared
    /// column; the builder fills missing source fields with [`NA`] first.
    pub fn push_row(&mut self, row: Vec<String>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "row arity must match declared columns"
        );
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

/// Renders the spec as aligned text, one `'\n'`-terminated line each for the
/// header, the separator and every row. An empty spec renders as nothing at
/// all; callers decide whether that is itself worth reporting.
pub fn render(spec: &TableSpec) -> String {
    if spec.rows.is_empty() {
        return String::new();
    }

    // Column width covers the header as well as the widest value.
    let widths: Vec<usize> = spec
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            spec.rows
                .iter()
                .map(|row| row[i].len())
                .max()
                .unwrap_or(0)
                .max(col.name.len())
        })
        .collect();

    let mut output = String::new();

    let header = spec
        .columns
        .iter()
        .zip(&widths)
        .map(|(col, &width)| format!("{:^width$}", col.name))
        .collect::<Vec<_>>()
        .join(" | ");
    output.push_str(INDENT);
    output.push_str(&header);
    output.push('\n');

    let separator = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join("-+-");
    output.push_str(INDENT);
    output.push_str(&separator);
    output.push('\n');

    for row in spec.rows() {
        let line = row
            .iter()
            .zip(spec.columns.iter().zip(&widths))
            .map(|(value, (col, &width))| {
                if col.numeric {
                    format!("{value:>width$}")
                } else {
                    format!("{value:<width$}")
                }
            })
            .collect::<Vec<_>>()
            .join(" | ");
        output.push_str(INDENT);
        output.push_str(&line);
        output.push('\n');
    }

    output
}
