//! CSV export of power series and run tables
//!
//! Plot-ready tables: one `timestamp,consumption` file per entity, and one
//! `run,<metric>...` table per image.

use crate::comparison::RunTable;
use crate::series::Series;

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// CSV formatter for a single entity's series
#[derive(Debug)]
pub struct CsvSeriesOutput<'a> {
    series: &'a Series,
}

impl<'a> CsvSeriesOutput<'a> {
    pub fn new(series: &'a Series) -> Self {
        Self { series }
    }

    fn header(&self) -> &'static str {
        "timestamp,consumption"
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(self.header());
        output.push('\n');

        for sample in &self.series.samples {
            output.push_str(&format!("{},{}\n", sample.timestamp, sample.value));
        }

        output
    }
}

/// CSV formatter for a flattened run × metric table
#[derive(Debug)]
pub struct CsvRunTableOutput<'a> {
    table: &'a RunTable,
}

impl<'a> CsvRunTableOutput<'a> {
    pub fn new(table: &'a RunTable) -> Self {
        Self { table }
    }

    fn header(&self) -> String {
        std::iter::once("run".to_string())
            .chain(self.table.columns.iter().map(|c| escape_field(c)))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn to_csv(&self) -> String {
        let mut output = self.header();
        output.push('\n');

        for (position, run) in self.table.runs.iter().enumerate() {
            output.push_str(&run.to_string());
            for value in self.table.row(position).unwrap_or_default() {
                output.push(',');
                output.push_str(&value.to_string());
            }
            output.push('\n');
        }

        output
    }
}
