use std::{fmt, time::Instant};

use botscope_core::BATTERY_WARNING_VOLTAGE;

use crate::{
    status::StatusEntry,
    store::{KeyValueStore, StoreKey},
};

const MISSING: &str = "-";

/// Plain-text table rendered with box-drawing characters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates a table with the provided column headers.
    #[must_use]
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

    /// Appends a row; missing cells render empty and extra cells are dropped.
    pub fn add_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells
            .into_iter()
            .take(self.headers.len())
            .map(Into::into)
            .collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Rows added so far.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn column_widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(column, header)| {
                self.rows
                    .iter()
                    .map(|row| row[column].chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

fn write_border(
    f: &mut fmt::Formatter<'_>,
    widths: &[usize],
    [left, middle, right]: [char; 3],
) -> fmt::Result {
    write!(f, "{left}")?;
    for (index, width) in widths.iter().enumerate() {
        if index > 0 {
            write!(f, "{middle}")?;
        }
        write!(f, "{}", "─".repeat(width + 2))?;
    }
    writeln!(f, "{right}")
}

fn write_cells(f: &mut fmt::Formatter<'_>, widths: &[usize], cells: &[String]) -> fmt::Result {
    write!(f, "│")?;
    for (cell, &width) in cells.iter().zip(widths) {
        write!(f, " {cell:<width$} │")?;
    }
    writeln!(f)
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.column_widths();
        write_border(f, &widths, ['┌', '┬', '┐'])?;
        write_cells(f, &widths, &self.headers)?;
        write_border(f, &widths, ['├', '┼', '┤'])?;
        for row in &self.rows {
            write_cells(f, &widths, row)?;
        }
        write_border(f, &widths, ['└', '┴', '┘'])
    }
}

/// Builds the live statistics table from the latest robot status.
///
/// A robot counts as online only while it is running a primitive and has
/// reported within the disconnect window.
#[must_use]
pub fn stats_table(latest: Option<&StatusEntry>, now: Instant) -> Table {
    let mut table = Table::new([
        "Robot ID",
        "Battery (V)",
        "Packet Loss (%)",
        "Status Loss (%)",
        "Status",
        "Lifetime (s)",
        "Battery",
    ]);

    match latest {
        Some(entry) => {
            let status = entry.status;
            let online = status.running_primitive && entry.is_fresh(now);
            let battery = if status.battery_voltage < BATTERY_WARNING_VOLTAGE {
                "LOW"
            } else {
                "OK"
            };
            table.add_row([
                status.robot_id.to_string(),
                format!("{:3.2}", status.battery_voltage),
                status.primitive_packet_loss_percentage.to_string(),
                format!("{:.1}", entry.status_loss_rate * 100.0),
                if online { "ONLINE" } else { "OFFLINE" }.to_owned(),
                status.epoch_timestamp_seconds.to_string(),
                battery.to_owned(),
            ]);
        }
        None => table.add_row([MISSING, MISSING, MISSING, MISSING, "OFFLINE", MISSING, MISSING]),
    }

    table
}

/// Builds the table listing every known key-value store entry.
///
/// Entries that are missing or cannot be read are shown as `-`.
#[must_use]
pub fn config_table<S>(store: &S) -> Table
where
    S: KeyValueStore + ?Sized,
{
    let mut table = Table::new(["Name", "Key", "Value"]);
    for key in StoreKey::ALL {
        let value = match store.get(key.key()) {
            Ok(Some(value)) => value,
            Ok(None) => MISSING.to_owned(),
            Err(error) => {
                tracing::debug!(key = key.key(), %error, "failed to read store value");
                MISSING.to_owned()
            }
        };
        table.add_row([key.label().to_owned(), key.key().to_owned(), value]);
    }
    table
}
