//! A small column-oriented table mirroring the pandas frames the host
//! stores for MHC-II predictions and composite APL tables.

use crate::{
    error::{EngineError, Result},
    html,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    fn from_json(value: &Value) -> Result<Self> {
        Ok(match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => Cell::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Cell::Text(s.clone()),
            other => {
                return Err(EngineError::invalid(format!(
                    "nested value {other} cannot be a table cell"
                )));
            }
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Null => Some(f64::NAN),
            Cell::Number(v) => Some(*v),
            Cell::Bool(_) | Cell::Text(_) => None,
        }
    }

    /// Text written to CSV and HTML. Missing values become empty fields.
    pub fn render(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Bool(true) => "True".to_string(),
            Cell::Bool(false) => "False".to_string(),
            Cell::Number(v) if v.is_nan() => String::new(),
            Cell::Number(v) => v.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataTable {
    index_name: Option<String>,
    index: Vec<String>,
    columns: Vec<Column>,
}

impl DataTable {
    /// Parses the column (`{col: {row: v}}`), dict-of-lists (`{col: [v]}`)
    /// and records (`[{col: v}]`) layouts.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) if map.values().all(Value::is_object) => {
                Self::from_columns_orient(map)
            }
            Value::Object(map) if map.values().all(Value::is_array) => {
                Self::from_dict_of_lists(map)
            }
            Value::Array(rows) => Self::from_records(rows),
            _ => Err(EngineError::invalid(
                "table JSON must be column-oriented, a dict of lists, or a list of records",
            )),
        }
    }

    fn from_columns_orient(map: &Map<String, Value>) -> Result<Self> {
        let mut index: Vec<String> = vec![];
        let mut seen: HashSet<String> = HashSet::new();
        for column in map.values().filter_map(Value::as_object) {
            for key in column.keys() {
                if seen.insert(key.clone()) {
                    index.push(key.clone());
                }
            }
        }
        let mut columns = Vec::with_capacity(map.len());
        for (name, column) in map {
            let Some(column) = column.as_object() else {
                continue;
            };
            let cells = index
                .iter()
                .map(|key| column.get(key).map_or(Ok(Cell::Null), Cell::from_json))
                .collect::<Result<Vec<_>>>()?;
            columns.push(Column {
                name: name.clone(),
                cells,
            });
        }
        Ok(Self {
            index_name: None,
            index,
            columns,
        })
    }

    fn from_dict_of_lists(map: &Map<String, Value>) -> Result<Self> {
        let mut rows: Option<usize> = None;
        let mut columns = Vec::with_capacity(map.len());
        for (name, values) in map {
            let Some(values) = values.as_array() else {
                continue;
            };
            let expected = *rows.get_or_insert(values.len());
            if values.len() != expected {
                return Err(EngineError::LengthMismatch {
                    field: name.clone(),
                    expected,
                    found: values.len(),
                });
            }
            columns.push(Column {
                name: name.clone(),
                cells: values.iter().map(Cell::from_json).collect::<Result<_>>()?,
            });
        }
        Ok(Self {
            index_name: None,
            index: (0..rows.unwrap_or(0)).map(|i| i.to_string()).collect(),
            columns,
        })
    }

    fn from_records(rows: &[Value]) -> Result<Self> {
        let mut names: Vec<String> = vec![];
        for row in rows {
            let row = row
                .as_object()
                .ok_or_else(|| EngineError::invalid("table records must be JSON objects"))?;
            for key in row.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let cells = rows
                .iter()
                .filter_map(Value::as_object)
                .map(|row| row.get(&name).map_or(Ok(Cell::Null), Cell::from_json))
                .collect::<Result<Vec<_>>>()?;
            columns.push(Column { name, cells });
        }
        Ok(Self {
            index_name: None,
            index: (0..rows.len()).map(|i| i.to_string()).collect(),
            columns,
        })
    }

    /// Builds a positional table from numeric columns, padding shorter ones
    /// with NaN up to the longest.
    pub fn from_padded_columns(columns: Vec<(String, Vec<f64>)>) -> Self {
        let rows = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let columns = columns
            .into_iter()
            .map(|(name, values)| {
                let mut cells: Vec<Cell> = values.into_iter().map(Cell::Number).collect();
                cells.resize(rows, Cell::Number(f64::NAN));
                Column { name, cells }
            })
            .collect();
        Self {
            index_name: None,
            index: (0..rows).map(|i| i.to_string()).collect(),
            columns,
        }
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.index.len()
    }

    #[inline(always)]
    pub fn index(&self) -> &[String] {
        &self.index
    }

    #[inline(always)]
    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    #[inline(always)]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column values as floats; nulls become NaN.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        let column = self
            .column(name)
            .ok_or_else(|| EngineError::missing(name))?;
        column
            .cells
            .iter()
            .map(|cell| {
                cell.as_f64().ok_or_else(|| {
                    EngineError::invalid(format!(
                        "column '{name}' holds non-numeric value '{}'",
                        cell.render()
                    ))
                })
            })
            .collect()
    }

    /// Columns whose cells are all numbers or nulls, in table order.
    pub fn numeric_columns(&self) -> Vec<(&str, Vec<f64>)> {
        self.columns
            .iter()
            .filter_map(|column| {
                let values: Option<Vec<f64>> = column.cells.iter().map(Cell::as_f64).collect();
                values.map(|v| (column.name.as_str(), v))
            })
            .collect()
    }

    /// Moves column `name` into the index.
    pub fn set_index(mut self, name: &str) -> Result<Self> {
        let pos = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| EngineError::missing(name))?;
        let column = self.columns.remove(pos);
        self.index = column.cells.iter().map(Cell::render).collect();
        self.index_name = Some(column.name);
        Ok(self)
    }

    pub fn prefix_columns(mut self, prefix: &str) -> Self {
        for column in self.columns.iter_mut() {
            column.name = format!("{prefix}{}", column.name);
        }
        self
    }

    /// Inner join on the index. Rows keep the left table's order; a key that
    /// occurs several times on the right yields one row per match.
    pub fn inner_join(&self, right: &DataTable) -> DataTable {
        let mut right_rows: HashMap<&str, Vec<usize>> = HashMap::new();
        for (row, key) in right.index.iter().enumerate() {
            right_rows.entry(key.as_str()).or_default().push(row);
        }
        let mut pairs: Vec<(usize, usize)> = vec![];
        for (l, key) in self.index.iter().enumerate() {
            if let Some(matches) = right_rows.get(key.as_str()) {
                pairs.extend(matches.iter().map(|r| (l, *r)));
            }
        }
        let take = |columns: &[Column], pick: fn(&(usize, usize)) -> usize| {
            columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    cells: pairs.iter().map(|p| c.cells[pick(p)].clone()).collect(),
                })
                .collect::<Vec<_>>()
        };
        let mut columns = take(&self.columns, |p| p.0);
        columns.extend(take(&right.columns, |p| p.1));
        DataTable {
            index_name: self.index_name.clone(),
            index: pairs.iter().map(|(l, _)| self.index[*l].clone()).collect(),
            columns,
        }
    }

    pub fn push_column(&mut self, name: &str, cells: Vec<Cell>) -> Result<()> {
        if cells.len() != self.rows() {
            return Err(EngineError::LengthMismatch {
                field: name.to_string(),
                expected: self.rows(),
                found: cells.len(),
            });
        }
        self.columns.push(Column {
            name: name.to_string(),
            cells,
        });
        Ok(())
    }

    /// CSV with the index as first column and `\n` line endings.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(vec![]);
        let mut header = vec![self.index_name.clone().unwrap_or_default()];
        header.extend(self.columns.iter().map(|c| c.name.clone()));
        writer.write_record(&header)?;
        for (row, key) in self.index.iter().enumerate() {
            let mut record = vec![key.clone()];
            record.extend(self.columns.iter().map(|c| c.cells[row].render()));
            writer.write_record(&record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| EngineError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| EngineError::invalid(e.to_string()))
    }

    pub fn to_html(&self) -> String {
        let mut header = vec![self.index_name.clone().unwrap_or_default()];
        header.extend(self.columns.iter().map(|c| c.name.clone()));
        let rows: Vec<Vec<String>> = self
            .index
            .iter()
            .enumerate()
            .map(|(row, key)| {
                let mut cells = vec![key.clone()];
                cells.extend(self.columns.iter().map(|c| c.cells[row].render()));
                cells
            })
            .collect();
        html::table(&header, &rows)
    }
}
