//! Matrix files
//!
//! Two plain text layouts are supported: `csv`, one comma separated row
//! per line without a header, and `text`, one `i j v` cell per line with
//! 1-based indices where only non-zero cells are listed.
use crate::data::DenseMatrix;
use crate::errors::Id3Error;
use crate::utils::items_to_strings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum MatrixFormat {
    Csv,
    Text,
}

impl FromStr for MatrixFormat {
    type Err = Id3Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(MatrixFormat::Csv),
            "text" | "ijv" => Ok(MatrixFormat::Text),
            _ => Err(Id3Error::ParseString(
                s.to_string(),
                "MatrixFormat".to_string(),
                items_to_strings(vec!["csv", "text"]),
            )),
        }
    }
}

pub fn read_matrix<P: AsRef<Path>>(path: P, format: MatrixFormat) -> Result<DenseMatrix, Id3Error> {
    match format {
        MatrixFormat::Csv => read_csv(path),
        MatrixFormat::Text => read_text(path),
    }
}

pub fn write_matrix<P: AsRef<Path>>(path: P, matrix: &DenseMatrix, format: MatrixFormat) -> Result<(), Id3Error> {
    match format {
        MatrixFormat::Csv => write_csv(path, matrix),
        MatrixFormat::Text => write_text(path, matrix),
    }
}

fn parse_value(field: &str, line: usize) -> Result<f64, Id3Error> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|e| Id3Error::UnableToRead(format!("line {}: {:?} {}", line, field, e)))
}

pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<DenseMatrix, Id3Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())
        .map_err(|e| Id3Error::UnableToRead(e.to_string()))?;
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Id3Error::UnableToRead(e.to_string()))?;
        let row = record
            .iter()
            .map(|f| parse_value(f, i + 1))
            .collect::<Result<Vec<f64>, Id3Error>>()?;
        rows.push(row);
    }
    DenseMatrix::from_rows(&rows).map_err(|e| Id3Error::UnableToRead(e.to_string()))
}

pub fn write_csv<P: AsRef<Path>>(path: P, matrix: &DenseMatrix) -> Result<(), Id3Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path.as_ref())
        .map_err(|e| Id3Error::UnableToWrite(e.to_string()))?;
    for i in 0..matrix.rows() {
        let record: Vec<String> = matrix.row(i).iter().map(|v| v.to_string()).collect();
        writer
            .write_record(&record)
            .map_err(|e| Id3Error::UnableToWrite(e.to_string()))?;
    }
    writer.flush().map_err(|e| Id3Error::UnableToWrite(e.to_string()))
}

/// Read `i j v` cells, the shape is given by the largest indices.
pub fn read_text<P: AsRef<Path>>(path: P) -> Result<DenseMatrix, Id3Error> {
    let contents = fs::read_to_string(path.as_ref()).map_err(|e| Id3Error::UnableToRead(e.to_string()))?;
    let mut cells = Vec::new();
    let (mut rows, mut cols) = (0, 0);
    for (n, line) in contents.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != 3 {
            return Err(Id3Error::UnableToRead(format!(
                "line {}: expected `i j v`, found {:?}",
                n + 1,
                line
            )));
        }
        let i = fields[0]
            .parse::<usize>()
            .map_err(|e| Id3Error::UnableToRead(format!("line {}: {}", n + 1, e)))?;
        let j = fields[1]
            .parse::<usize>()
            .map_err(|e| Id3Error::UnableToRead(format!("line {}: {}", n + 1, e)))?;
        if i == 0 || j == 0 {
            return Err(Id3Error::UnableToRead(format!("line {}: indices are 1-based", n + 1)));
        }
        let v = parse_value(fields[2], n + 1)?;
        rows = rows.max(i);
        cols = cols.max(j);
        cells.push((i - 1, j - 1, v));
    }
    let mut m = DenseMatrix::zeros(rows, cols);
    for (i, j, v) in cells {
        m.set(i, j, v);
    }
    Ok(m)
}

/// Write the non-zero cells row by row. The last cell is always written
/// so the shape can be read back.
pub fn write_text<P: AsRef<Path>>(path: P, matrix: &DenseMatrix) -> Result<(), Id3Error> {
    let mut out = String::new();
    for i in 0..matrix.rows() {
        for j in 0..matrix.cols() {
            let v = matrix.get(i, j);
            let last = i + 1 == matrix.rows() && j + 1 == matrix.cols();
            if v != 0.0 || last {
                out.push_str(&format!("{} {} {}\n", i + 1, j + 1, v));
            }
        }
    }
    fs::write(path.as_ref(), out).map_err(|e| Id3Error::UnableToWrite(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::process;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(format!("id3tree-{}-{}", process::id(), name))
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("CSV".parse::<MatrixFormat>().unwrap(), MatrixFormat::Csv);
        assert_eq!("text".parse::<MatrixFormat>().unwrap(), MatrixFormat::Text);
        assert!(matches!(
            "binary".parse::<MatrixFormat>(),
            Err(Id3Error::ParseString(..))
        ));
    }

    #[test]
    fn test_csv_file() {
        let m = DenseMatrix::from_rows(&[[1., -1.5], [0., 3.]]).unwrap();
        let path = temp_path("m.csv");
        write_matrix(&path, &m, MatrixFormat::Csv).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "1,-1.5\n0,3\n");
        assert_eq!(read_matrix(&path, MatrixFormat::Csv).unwrap(), m);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_text_file_keeps_shape() {
        let m = DenseMatrix::from_rows(&[[1., 0., 0.], [0., -2., 0.]]).unwrap();
        let path = temp_path("m.txt");
        write_matrix(&path, &m, MatrixFormat::Text).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "1 1 1\n2 2 -2\n2 3 0\n");
        assert_eq!(read_matrix(&path, MatrixFormat::Text).unwrap(), m);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_errors() {
        let path = temp_path("bad.txt");
        fs::write(&path, "1 1\n").unwrap();
        assert!(matches!(read_text(&path), Err(Id3Error::UnableToRead(_))));
        fs::write(&path, "0 1 4\n").unwrap();
        assert!(read_text(&path).is_err());
        fs::write(&path, "1,a\n").unwrap();
        assert!(read_csv(&path).is_err());
        fs::remove_file(&path).unwrap();
        assert!(read_csv(temp_path("missing.csv")).is_err());
    }
}
