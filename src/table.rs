//! In-memory CSV table shared by the pipeline steps.
//!
//! Every artifact written by the pipeline is a flat CSV with a header row. The
//! steps only ever rename, drop, append and filter columns, so the table keeps
//! every field as text and leaves typing to the code that needs it.

use std::{
    collections::HashMap,
    fs::File,
    io::{Read, Write},
    path::Path,
};

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// column names, in file order
    pub headers: Vec<String>,
    /// one Vec of fields per data row, same width as `headers`
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table {
            headers,
            rows: Vec::new(),
        }
    }

    /// Reads a CSV with a header row. Short rows are padded with empty fields.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut table = Table::new(headers);
        let width = table.headers.len();

        for record in rdr.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(width, String::new());
            table.rows.push(row);
        }

        Ok(table)
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open CSV '{}'", path.display()))?;
        Table::from_reader(file).with_context(|| format!("Failed to parse '{}'", path.display()))
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;

        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV '{}'", path.display()))?;
        self.to_writer(file)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(rows, columns)`, printed the way the step diagnostics report sizes.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.headers.len())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn require_columns(&self, names: &[&str]) -> Result<Vec<usize>> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| !self.has_column(name))
            .collect();
        if !missing.is_empty() {
            bail!("CSV is missing required column(s): {}", missing.join(", "));
        }

        Ok(names.iter().filter_map(|name| self.column_index(name)).collect())
    }

    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Non-empty values of a column that parse as `f64`.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<f64>> {
        let values = self.column(name)?;
        Some(
            values
                .iter()
                .filter_map(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .collect(),
        )
    }

    /// Appends a column. Fails if `values` does not have one entry per row.
    pub fn add_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        self.check_length(name, &values)?;

        self.headers.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }

        Ok(())
    }

    /// Replaces a column in place, or appends it when absent.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        match self.column_index(name) {
            Some(idx) => {
                self.check_length(name, &values)?;
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
                Ok(())
            }
            None => self.add_column(name, values),
        }
    }

    fn check_length(&self, name: &str, values: &[String]) -> Result<()> {
        if values.len() != self.rows.len() {
            bail!(
                "Column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            );
        }

        Ok(())
    }

    pub fn rename_columns(&mut self, renames: &[(&str, &str)]) {
        for header in self.headers.iter_mut() {
            if let Some((_, to)) = renames.iter().find(|(from, _)| header == from) {
                *header = to.to_string();
            }
        }
    }

    /// Drops the named columns; names that are not present are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<bool> = self
            .headers
            .iter()
            .map(|h| !names.contains(&h.as_str()))
            .collect();

        let mut flags = keep.iter();
        self.headers.retain(|_| *flags.next().unwrap_or(&true));
        for row in self.rows.iter_mut() {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[String]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// Drops rows with an empty value in any of the named columns. Columns
    /// that do not exist are ignored. Returns the number of rows removed.
    pub fn drop_incomplete(&mut self, columns: &[&str]) -> usize {
        let indexes: Vec<usize> = columns
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();

        let before = self.rows.len();
        self.rows
            .retain(|row| indexes.iter().all(|&idx| !row[idx].trim().is_empty()));

        before - self.rows.len()
    }

    /// Keeps the first row for every distinct value of `column`.
    pub fn dedup_by(&mut self, column: &str) -> usize {
        let Some(idx) = self.column_index(column) else {
            return 0;
        };

        let before = self.rows.len();
        let mut seen = std::collections::HashSet::new();
        self.rows.retain(|row| seen.insert(row[idx].clone()));

        before - self.rows.len()
    }

    /// Appends the rows of `other`, aligning columns by name. Columns only
    /// present in `other` are added to the end with empty values for existing
    /// rows.
    pub fn append(&mut self, other: Table) {
        if self.headers.is_empty() && self.rows.is_empty() {
            *self = other;
            return;
        }

        for header in &other.headers {
            if !self.has_column(header) {
                self.headers.push(header.clone());
                for row in self.rows.iter_mut() {
                    row.push(String::new());
                }
            }
        }

        let positions: Vec<usize> = other
            .headers
            .iter()
            .filter_map(|h| self.column_index(h))
            .collect();
        let width = self.headers.len();

        for other_row in other.rows {
            let mut row = vec![String::new(); width];
            for (value, &idx) in other_row.into_iter().zip(&positions) {
                row[idx] = value;
            }
            self.rows.push(row);
        }
    }

    /// Non-empty values of a column with their counts, most frequent first.
    /// Ties keep the order in which values were first seen.
    pub fn value_counts(&self, column: &str) -> Vec<(String, usize)> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };

        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for row in &self.rows {
            let value = row[idx].trim();
            if value.is_empty() {
                continue;
            }
            let count = counts.entry(value.to_string()).or_insert_with(|| {
                order.push(value.to_string());
                0
            });
            *count += 1;
        }

        let mut result: Vec<(String, usize)> = order
            .into_iter()
            .map(|value| {
                let count = counts[&value];
                (value, count)
            })
            .collect();
        result.sort_by(|a, b| b.1.cmp(&a.1));

        result
    }

    /// Rough in-memory footprint of the field text, in bytes.
    pub fn approximate_size(&self) -> usize {
        let headers: usize = self.headers.iter().map(String::len).sum();
        let rows: usize = self
            .rows
            .iter()
            .flat_map(|row| row.iter())
            .map(String::len)
            .sum();

        headers + rows
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Table {
        let csv = "id,place,mag\nak1,\"3km N of Willow, Alaska\",1.2\nci2,Pacific-Antarctic Ridge,\nak3,\"Anchorage, Alaska\",2.5\n";
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn should_read_quoted_fields() {
        let t = sample();

        assert_eq!(t.headers, vec!["id", "place", "mag"]);
        assert_eq!(t.shape(), (3, 3));
        assert_eq!(t.rows[0][1], "3km N of Willow, Alaska");
    }

    #[test]
    fn should_drop_incomplete_rows() {
        let mut t = sample();
        let removed = t.drop_incomplete(&["id", "mag", "not_a_column"]);

        assert_eq!(removed, 1);
        assert_eq!(t.column("id").unwrap(), vec!["ak1", "ak3"]);
    }

    #[test]
    fn should_rename_and_drop_columns() {
        let mut t = sample();
        t.rename_columns(&[("id", "earthquake_id")]);
        t.drop_columns(&["place", "missing"]);

        assert_eq!(t.headers, vec!["earthquake_id", "mag"]);
        assert_eq!(t.rows[2], vec!["ak3", "2.5"]);
    }

    #[test]
    fn should_report_missing_columns() {
        let t = sample();
        let err = t.require_columns(&["latitude", "id", "longitude"]).unwrap_err();

        assert!(err.to_string().contains("latitude, longitude"));
    }

    #[test]
    fn should_append_with_column_union() {
        let mut t = Table::from_reader("id,mag\na,1\n".as_bytes()).unwrap();
        let other = Table::from_reader("id,depth,mag\nb,10,2\n".as_bytes()).unwrap();
        t.append(other);

        assert_eq!(t.headers, vec!["id", "mag", "depth"]);
        assert_eq!(t.rows[0], vec!["a", "1", ""]);
        assert_eq!(t.rows[1], vec!["b", "2", "10"]);
    }

    #[test]
    fn should_dedup_by_first_occurrence() {
        let mut t = Table::from_reader("id,mag\na,1\nb,2\na,3\n".as_bytes()).unwrap();

        assert_eq!(t.dedup_by("id"), 1);
        assert_eq!(t.column("mag").unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn should_count_values_most_frequent_first() {
        let t = Table::from_reader("state\nUtah\nAlaska\nAlaska\n\nUtah\nTexas\nAlaska\n".as_bytes())
            .unwrap();

        assert_eq!(
            t.value_counts("state"),
            vec![
                ("Alaska".to_string(), 3),
                ("Utah".to_string(), 2),
                ("Texas".to_string(), 1)
            ]
        );
    }

    #[test]
    fn should_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        let mut t = sample();
        t.add_column("county", vec!["Mat-Su".into(), "".into(), "Anchorage".into()])
            .unwrap();
        t.write_csv(&path).unwrap();

        let back = Table::read_csv(&path).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn should_reject_column_of_wrong_length() {
        let mut t = sample();

        let err = t.add_column("county", vec!["Mat-Su".into()]).unwrap_err();
        assert!(err.to_string().contains("'county' has 1 values for 3 rows"));
        assert!(t.set_column("mag", Vec::new()).is_err());
        assert_eq!(t.headers, sample().headers);
        assert_eq!(t.rows, sample().rows);
    }
}
