// table_utils.rs
use anyhow::{bail, Result as AnyhowResult};
use calamine::{open_workbook, Reader, Xls, Xlsx};
use csv::Writer;
use rayon::prelude::*;
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::io::Error as IoError;
use std::io::ErrorKind;

/// Represents a TableBuilder object. This struct holds a long-format observation table as
/// headers and string-typed rows, along with an internal error handler for constructor
/// failures.
#[derive(Debug)]
pub struct TableBuilder {
    headers: Vec<String>,
    data: Vec<Vec<String>>,
    error: Option<Box<dyn Error>>,
}

/// A borrowed view of one row, resolving cells by column name.
pub struct TableRow<'a> {
    headers: &'a [String],
    cells: &'a [String],
}

impl<'a> TableRow<'a> {
    /// Returns the cell under `column`, or an empty string if the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|idx| self.cells.get(idx))
            .map(|cell| cell.as_str())
            .unwrap_or("")
    }
}

/// Parses a cell as a numeric measurement.
///
/// Trims whitespace and removes thousands separators before parsing. Empty cells,
/// non-numeric cells, and non-finite parses are all "missing", never zero.
///
/// ```
/// use markettab::table_utils::parse_numeric;
///
/// assert_eq!(parse_numeric(" 1,250 "), Some(1250.0));
/// assert_eq!(parse_numeric("85.5"), Some(85.5));
/// assert_eq!(parse_numeric(""), None);
/// assert_eq!(parse_numeric("n/a"), None);
/// ```
pub fn parse_numeric(cell: &str) -> Option<f64> {
    let cleaned = cell.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    match cleaned.parse::<f64>() {
        Ok(num) if num.is_finite() => Some(num),
        _ => None,
    }
}

impl TableBuilder {
    /// Creates a new, empty `TableBuilder`.
    pub fn new() -> Self {
        TableBuilder {
            headers: Vec::new(),
            data: Vec::new(),
            error: None,
        }
    }

    /// Reads data from a CSV file at the specified `file_path` and returns a `TableBuilder`.
    ///
    /// If the file cannot be opened or parsed, the builder's internal error is set and
    /// `get_headers`/`get_data` return `None`.
    pub fn from_csv(file_path: &str) -> Self {
        let mut builder = TableBuilder::new();

        match File::open(file_path) {
            Ok(file) => {
                let mut rdr = csv::Reader::from_reader(file);

                if let Ok(hdrs) = rdr.headers() {
                    builder.headers = hdrs.iter().map(String::from).collect();
                }

                for result in rdr.records() {
                    match result {
                        Ok(record) => builder.data.push(record.iter().map(String::from).collect()),
                        Err(e) => {
                            builder.error = Some(Box::new(e));
                            break;
                        }
                    }
                }
            }
            Err(e) => builder.error = Some(Box::new(e)),
        }

        builder
    }

    /// Reads data from a sheet of an XLSX workbook at the specified `file_path` and returns
    /// a `TableBuilder`. The first row of the sheet becomes the header row.
    ///
    /// `identifier_type` is either `"SHEET_NAME"` or `"SHEET_ID"` (1-based index).
    pub fn from_xlsx(file_path: &str, sheet_identifier: &str, identifier_type: &str) -> Self {
        let mut builder = TableBuilder::new();

        match open_workbook::<Xlsx<_>, _>(file_path) {
            Ok(mut workbook) => {
                let sheet_names = workbook.sheet_names();
                let sheet_name_opt = match identifier_type {
                    "SHEET_NAME" => Some(sheet_identifier.to_string()),
                    "SHEET_ID" => {
                        if let Ok(index) = sheet_identifier.parse::<usize>() {
                            if index > 0 && index <= sheet_names.len() {
                                Some(sheet_names[index - 1].clone())
                            } else {
                                None
                            }
                        } else {
                            None
                        }
                    }
                    _ => None,
                };

                match sheet_name_opt {
                    Some(sheet_name) => match workbook.worksheet_range(&sheet_name) {
                        Ok(range) => {
                            for row in range.rows() {
                                let row_data: Vec<String> =
                                    row.iter().map(|cell| cell.to_string()).collect();
                                if builder.headers.is_empty() {
                                    builder.headers = row_data;
                                } else {
                                    builder.data.push(row_data);
                                }
                            }
                        }
                        Err(e) => {
                            let error = Box::new(e) as Box<dyn Error>;
                            builder.error = Some(error);
                        }
                    },
                    None => {
                        let error =
                            IoError::new(ErrorKind::InvalidInput, "Sheet identifier not found");
                        builder.error = Some(Box::new(error) as Box<dyn Error>);
                    }
                }
            }
            Err(e) => {
                let error = Box::new(e) as Box<dyn Error>;
                builder.error = Some(error);
            }
        }

        builder
    }

    /// Reads data from a sheet of a legacy XLS workbook at the specified `file_path` and
    /// returns a `TableBuilder`. Same identifier semantics as `from_xlsx`.
    pub fn from_xls(file_path: &str, sheet_identifier: &str, identifier_type: &str) -> Self {
        let mut builder = TableBuilder::new();

        match open_workbook::<Xls<_>, _>(file_path) {
            Ok(mut workbook) => {
                let sheet_names = workbook.sheet_names();
                let sheet_name_opt = match identifier_type {
                    "SHEET_NAME" => Some(sheet_identifier.to_string()),
                    "SHEET_ID" => {
                        if let Ok(index) = sheet_identifier.parse::<usize>() {
                            if index > 0 && index <= sheet_names.len() {
                                Some(sheet_names[index - 1].clone())
                            } else {
                                None
                            }
                        } else {
                            None
                        }
                    }
                    _ => None,
                };

                match sheet_name_opt {
                    Some(sheet_name) => match workbook.worksheet_range(&sheet_name) {
                        Ok(range) => {
                            for row in range.rows() {
                                let row_data: Vec<String> =
                                    row.iter().map(|cell| cell.to_string()).collect();
                                if builder.headers.is_empty() {
                                    builder.headers = row_data;
                                } else {
                                    builder.data.push(row_data);
                                }
                            }
                        }
                        Err(e) => {
                            let error = Box::new(e) as Box<dyn Error>;
                            builder.error = Some(error);
                        }
                    },
                    None => {
                        let error =
                            IoError::new(ErrorKind::InvalidInput, "Sheet identifier not found");
                        builder.error = Some(Box::new(error) as Box<dyn Error>);
                    }
                }
            }
            Err(e) => {
                let error = Box::new(e) as Box<dyn Error>;
                builder.error = Some(error);
            }
        }

        builder
    }

    /// Creates a `TableBuilder` instance from headers and data.
    ///
    /// ```
    /// use markettab::table_utils::TableBuilder;
    ///
    /// let headers = vec!["Produit".to_string(), "Value".to_string()];
    /// let data = vec![
    ///     vec!["Savon".to_string(), "100".to_string()],
    ///     vec!["Riz".to_string(), "250".to_string()],
    /// ];
    ///
    /// let builder = TableBuilder::from_raw_data(headers.clone(), data.clone());
    ///
    /// assert_eq!(builder.get_headers().unwrap(), &headers);
    /// assert_eq!(builder.get_data().unwrap(), &data);
    /// ```
    pub fn from_raw_data(headers: Vec<String>, data: Vec<Vec<String>>) -> Self {
        TableBuilder {
            headers,
            data,
            error: None,
        }
    }

    /// Creates a deep copy of the `TableBuilder`.
    pub fn from_copy(&self) -> Self {
        TableBuilder {
            headers: self.headers.clone(),
            data: self.data.clone(),
            error: None,
        }
    }

    /// Sets the header row.
    pub fn set_header(&mut self, header: Vec<&str>) -> &mut Self {
        self.headers = header.into_iter().map(String::from).collect();
        self
    }

    /// Appends a single row.
    pub fn add_row(&mut self, row: Vec<&str>) -> &mut Self {
        self.data.push(row.into_iter().map(String::from).collect());
        self
    }

    /// Appends multiple rows.
    pub fn add_rows(&mut self, rows: Vec<Vec<&str>>) -> &mut Self {
        for row in rows {
            self.add_row(row);
        }
        self
    }

    /// Returns the headers, or `None` if no header row has been set.
    pub fn get_headers(&self) -> Option<&[String]> {
        if self.headers.is_empty() {
            None
        } else {
            Some(&self.headers)
        }
    }

    /// Returns the data rows, or `None` if the table is empty.
    pub fn get_data(&self) -> Option<&Vec<Vec<String>>> {
        if self.data.is_empty() {
            None
        } else {
            Some(&self.data)
        }
    }

    /// Indicates whether the table holds any data rows.
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// Indicates whether a header row has been set.
    pub fn has_headers(&self) -> bool {
        !self.headers.is_empty()
    }

    /// Returns the constructor error, if any.
    pub fn get_error(&self) -> Option<&dyn Error> {
        self.error.as_deref()
    }

    /// Returns the index of the named column.
    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column_name)
    }

    /// Verifies that every named column is present, aborting with a descriptive error
    /// naming the first missing column otherwise.
    ///
    /// ```
    /// use markettab::table_utils::TableBuilder;
    ///
    /// let builder = TableBuilder::from_raw_data(
    ///     vec!["Produit".to_string(), "Value".to_string()],
    ///     vec![vec!["Savon".to_string(), "100".to_string()]],
    /// );
    ///
    /// assert!(builder.require_columns(&["Produit", "Value"]).is_ok());
    /// assert!(builder.require_columns(&["Produit", "Disag"]).is_err());
    /// ```
    pub fn require_columns(&self, column_names: &[&str]) -> AnyhowResult<()> {
        for col in column_names {
            if self.column_index(col).is_none() {
                bail!("required column '{}' is missing from the data", col);
            }
        }
        Ok(())
    }

    /// Trims white spaces at the beginning and end of all cells in all columns.
    pub fn trim_all(&mut self) -> &mut Self {
        for row in &mut self.data {
            for item in row.iter_mut() {
                *item = item.trim().to_string();
            }
        }

        self
    }

    /// Renames specified columns.
    pub fn rename_columns(&mut self, renames: Vec<(&str, &str)>) -> &mut Self {
        let rename_map: HashMap<&str, &str> = renames.into_iter().collect();

        self.headers = self
            .headers
            .iter()
            .map(|h| {
                let h_str = h.as_str();
                rename_map.get(h_str).unwrap_or(&h_str).to_string()
            })
            .collect();

        self
    }

    /// Retains only the specified columns, in the order given.
    pub fn retain_columns(&mut self, columns_to_retain: Vec<&str>) -> &mut Self {
        let header_map: HashMap<&str, usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let retained_data: Vec<Vec<String>> = self
            .data
            .iter()
            .map(|row| {
                columns_to_retain
                    .iter()
                    .filter_map(|&col| header_map.get(col).and_then(|&idx| row.get(idx).cloned()))
                    .collect()
            })
            .collect();

        self.headers = columns_to_retain
            .iter()
            .filter(|&&col| header_map.contains_key(col))
            .map(|&col| col.to_string())
            .collect();
        self.data = retained_data;

        self
    }

    /// Drops the specified columns.
    pub fn drop_columns(&mut self, columns: Vec<&str>) -> &mut Self {
        let drop_indices: Vec<usize> = columns
            .iter()
            .filter_map(|&col| self.headers.iter().position(|h| h == col))
            .collect();

        self.headers = self
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !drop_indices.contains(i))
            .map(|(_, h)| h.clone())
            .collect();

        self.data = self
            .data
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(i, _)| !drop_indices.contains(i))
                    .map(|(_, cell)| cell.clone())
                    .collect()
            })
            .collect();

        self
    }

    /// Replaces whole-cell occurrences of `from` with `to` in the specified columns.
    /// Pass `vec!["*"]` to apply to all columns.
    ///
    /// ```
    /// use markettab::table_utils::TableBuilder;
    ///
    /// let mut builder = TableBuilder::from_raw_data(
    ///     vec!["Filtre".to_string()],
    ///     vec![vec!["Toute l'evaluation".to_string()], vec!["Nord".to_string()]],
    /// );
    ///
    /// builder.relabel_cells(vec!["Filtre"], "Toute l'evaluation", "Tout le pays");
    ///
    /// assert_eq!(
    ///     builder.get_data().unwrap(),
    ///     &vec![vec!["Tout le pays".to_string()], vec!["Nord".to_string()]]
    /// );
    /// ```
    pub fn relabel_cells(&mut self, columns: Vec<&str>, from: &str, to: &str) -> &mut Self {
        let apply_to_all = columns.iter().any(|&col| col == "*");
        let column_indices: Vec<usize> = if apply_to_all {
            (0..self.headers.len()).collect()
        } else {
            columns
                .iter()
                .filter_map(|&col| self.headers.iter().position(|h| h == col))
                .collect()
        };

        for row in &mut self.data {
            for &index in &column_indices {
                if let Some(item) = row.get_mut(index) {
                    if item == from {
                        *item = to.to_string();
                    }
                }
            }
        }
        self
    }

    /// Retains rows whose trimmed cell equals every supplied `(column, value)` pair.
    /// Unknown columns match nothing.
    ///
    /// ```
    /// use markettab::table_utils::TableBuilder;
    ///
    /// let mut builder = TableBuilder::from_raw_data(
    ///     vec!["Sector".to_string(), "Produit".to_string()],
    ///     vec![
    ///         vec!["Alimentaire".to_string(), "Riz".to_string()],
    ///         vec!["WASH".to_string(), "Savon".to_string()],
    ///     ],
    /// );
    ///
    /// builder.where_eq(vec![("Sector", "WASH")]);
    ///
    /// assert_eq!(
    ///     builder.get_data().unwrap(),
    ///     &vec![vec!["WASH".to_string(), "Savon".to_string()]]
    /// );
    /// ```
    pub fn where_eq(&mut self, conditions: Vec<(&str, &str)>) -> &mut Self {
        let resolved: Vec<(Option<usize>, String)> = conditions
            .iter()
            .map(|(col, val)| {
                let idx = self.column_index(col);
                if idx.is_none() {
                    log::warn!("filter column '{}' not found in headers", col);
                }
                (idx, val.trim().to_string())
            })
            .collect();

        self.data.retain(|row| {
            resolved.iter().all(|(idx, expected)| match idx {
                Some(i) => row
                    .get(*i)
                    .map(|cell| cell.trim() == expected)
                    .unwrap_or(false),
                None => false,
            })
        });

        self
    }

    /// Drops rows whose cell under `column` is empty after trimming.
    pub fn drop_rows_where_empty(&mut self, column: &str) -> &mut Self {
        if let Some(idx) = self.column_index(column) {
            self.data
                .retain(|row| row.get(idx).map(|cell| !cell.trim().is_empty()).unwrap_or(false));
        }
        self
    }

    /// Appends a column holding the same value in every row.
    pub fn append_static_value_column(&mut self, value: &str, new_column_name: &str) -> &mut Self {
        self.headers.push(new_column_name.to_string());
        for row in &mut self.data {
            row.push(value.to_string());
        }
        self
    }

    /// Appends a column derived from the other cells of each row.
    ///
    /// ```
    /// use markettab::table_utils::TableBuilder;
    ///
    /// let mut builder = TableBuilder::from_raw_data(
    ///     vec!["question_variable_label".to_string()],
    ///     vec![
    ///         vec!["Prix du riz (usd)".to_string()],
    ///         vec!["Prix du savon".to_string()],
    ///     ],
    /// );
    ///
    /// builder.append_derived_column("currency", |row| {
    ///     if row.get("question_variable_label").to_lowercase().contains("usd") {
    ///         "USD".to_string()
    ///     } else {
    ///         "HTG".to_string()
    ///     }
    /// });
    ///
    /// assert_eq!(
    ///     builder.get_data().unwrap(),
    ///     &vec![
    ///         vec!["Prix du riz (usd)".to_string(), "USD".to_string()],
    ///         vec!["Prix du savon".to_string(), "HTG".to_string()],
    ///     ]
    /// );
    /// ```
    pub fn append_derived_column<F>(&mut self, new_column_name: &str, derive: F) -> &mut Self
    where
        F: Fn(&TableRow<'_>) -> String,
    {
        let headers_clone = self.headers.clone();

        let derived: Vec<String> = self
            .data
            .iter()
            .map(|row| {
                derive(&TableRow {
                    headers: &headers_clone,
                    cells: row,
                })
            })
            .collect();

        self.headers.push(new_column_name.to_string());
        for (row, value) in self.data.iter_mut().zip(derived) {
            row.push(value);
        }

        self
    }

    /// Reshapes the table from wide to long format: each row becomes one row per value
    /// column, keeping the `id_vars` columns and adding `variable_column`/`value_column`.
    ///
    /// ```
    /// use markettab::table_utils::TableBuilder;
    ///
    /// let mut builder = TableBuilder::from_raw_data(
    ///     vec!["zone".to_string(), "MEB_soap".to_string(), "MEB_total".to_string()],
    ///     vec![vec!["Nord".to_string(), "120".to_string(), "4500".to_string()]],
    /// );
    ///
    /// builder.melt(
    ///     vec!["zone"],
    ///     vec!["MEB_soap", "MEB_total"],
    ///     "Product",
    ///     "Value",
    /// );
    ///
    /// assert_eq!(
    ///     builder.get_headers().unwrap(),
    ///     &["zone".to_string(), "Product".to_string(), "Value".to_string()]
    /// );
    /// assert_eq!(
    ///     builder.get_data().unwrap(),
    ///     &vec![
    ///         vec!["Nord".to_string(), "MEB_soap".to_string(), "120".to_string()],
    ///         vec!["Nord".to_string(), "MEB_total".to_string(), "4500".to_string()],
    ///     ]
    /// );
    /// ```
    pub fn melt(
        &mut self,
        id_vars: Vec<&str>,
        value_vars: Vec<&str>,
        variable_column: &str,
        value_column: &str,
    ) -> &mut Self {
        let id_indices: Vec<usize> = id_vars
            .iter()
            .filter_map(|&col| self.column_index(col))
            .collect();
        let value_indices: Vec<(String, usize)> = value_vars
            .iter()
            .filter_map(|&col| self.column_index(col).map(|idx| (col.to_string(), idx)))
            .collect();

        let melted: Vec<Vec<String>> = self
            .data
            .par_iter()
            .flat_map(|row| {
                value_indices
                    .iter()
                    .map(|(var_name, var_idx)| {
                        let mut long_row: Vec<String> = id_indices
                            .iter()
                            .map(|&idx| row.get(idx).cloned().unwrap_or_default())
                            .collect();
                        long_row.push(var_name.clone());
                        long_row.push(row.get(*var_idx).cloned().unwrap_or_default());
                        long_row
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut new_headers: Vec<String> = id_indices
            .iter()
            .map(|&idx| self.headers[idx].clone())
            .collect();
        new_headers.push(variable_column.to_string());
        new_headers.push(value_column.to_string());

        self.headers = new_headers;
        self.data = melted;

        self
    }

    /// Appends another table's rows, aligning on the union of the two header sets and
    /// filling absent cells with the empty string.
    pub fn append_table(&mut self, other: &TableBuilder) -> &mut Self {
        if self.headers.is_empty() {
            self.headers = other.headers.clone();
            self.data = other.data.clone();
            return self;
        }

        let mut combined_headers = self.headers.clone();
        for h in &other.headers {
            if !combined_headers.contains(h) {
                combined_headers.push(h.clone());
            }
        }

        let realign = |headers: &[String], row: &[String]| -> Vec<String> {
            combined_headers
                .iter()
                .map(|col| {
                    headers
                        .iter()
                        .position(|h| h == col)
                        .and_then(|idx| row.get(idx).cloned())
                        .unwrap_or_default()
                })
                .collect()
        };

        let mut combined_data: Vec<Vec<String>> = self
            .data
            .iter()
            .map(|row| realign(&self.headers, row))
            .collect();
        combined_data.extend(other.data.iter().map(|row| realign(&other.headers, row)));

        self.headers = combined_headers;
        self.data = combined_data;

        self
    }

    /// Sorts rows by the supplied `(column, order)` pairs, where order is `"ASC"` or
    /// `"DESC"`. Cells that both parse as numbers compare numerically, otherwise as
    /// strings.
    pub fn cascade_sort(&mut self, orders: Vec<(String, String)>) -> &mut Self {
        let column_indices: HashMap<&str, usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        self.data.sort_by(|a, b| {
            let mut cmp = std::cmp::Ordering::Equal;
            for (column_name, order) in &orders {
                if let Some(&index) = column_indices.get(column_name.as_str()) {
                    let a_val = &a[index];
                    let b_val = &b[index];

                    cmp = if let (Ok(a_num), Ok(b_num)) =
                        (a_val.parse::<f64>(), b_val.parse::<f64>())
                    {
                        if order == "ASC" {
                            a_num
                                .partial_cmp(&b_num)
                                .unwrap_or(std::cmp::Ordering::Equal)
                        } else {
                            b_num
                                .partial_cmp(&a_num)
                                .unwrap_or(std::cmp::Ordering::Equal)
                        }
                    } else {
                        if order == "ASC" {
                            a_val.cmp(b_val)
                        } else {
                            b_val.cmp(a_val)
                        }
                    };

                    if cmp != std::cmp::Ordering::Equal {
                        break;
                    }
                }
            }
            cmp
        });

        self
    }

    /// Returns the distinct values of a column, in order of first appearance.
    pub fn get_unique(&self, column_name: &str) -> Vec<String> {
        let mut unique_values = Vec::new();

        if let Some(idx) = self.column_index(column_name) {
            for row in &self.data {
                if let Some(value) = row.get(idx) {
                    if !unique_values.contains(value) {
                        unique_values.push(value.clone());
                    }
                }
            }
        }

        unique_values
    }

    /// Returns the median of the numeric values in a column, ignoring missing cells.
    ///
    /// ```
    /// use markettab::table_utils::TableBuilder;
    ///
    /// let builder = TableBuilder::from_raw_data(
    ///     vec!["Value".to_string()],
    ///     vec![
    ///         vec!["100".to_string()],
    ///         vec!["300".to_string()],
    ///         vec!["".to_string()],
    ///         vec!["200".to_string()],
    ///     ],
    /// );
    ///
    /// assert_eq!(builder.get_median("Value"), Some(200.0));
    /// ```
    pub fn get_median(&self, column_name: &str) -> Option<f64> {
        let idx = self.column_index(column_name)?;

        let mut values = Vec::new();
        for row in &self.data {
            if let Some(cell) = row.get(idx) {
                if let Some(num) = parse_numeric(cell) {
                    values.push(num);
                }
            }
        }

        if values.is_empty() {
            return None;
        }

        values.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let mid = values.len() / 2;

        if values.len() % 2 == 0 {
            Some((values[mid - 1] + values[mid]) / 2.0)
        } else {
            Some(values[mid])
        }
    }

    /// Returns the mean of the numeric values in a column, ignoring missing cells.
    pub fn get_mean(&self, column_name: &str) -> Option<f64> {
        let idx = self.column_index(column_name)?;

        let mut sum = 0.0;
        let mut count = 0usize;
        for row in &self.data {
            if let Some(cell) = row.get(idx) {
                if let Some(num) = parse_numeric(cell) {
                    sum += num;
                    count += 1;
                }
            }
        }

        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    /// Saves the table as a CSV file at the specified path.
    pub fn save_as(&mut self, new_file_path: &str) -> Result<&mut Self, Box<dyn Error>> {
        let file = File::create(new_file_path)?;
        let mut wtr = Writer::from_writer(file);

        wtr.write_record(&self.headers)?;
        for row in &self.data {
            wtr.write_record(row)?;
        }
        wtr.flush()?;

        Ok(self)
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}
