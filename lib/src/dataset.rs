use std::{fs::File, io::Read, path::Path};

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const INPUT_DIMENSION: usize = 3;
pub const OUTPUT_DIMENSION: usize = 2;

/// Columns of a data row fed to the network, in order.
pub const FEATURE_COLUMNS: [usize; INPUT_DIMENSION] = [0, 1, 4];
/// Columns of a data row the network learns to predict, in order.
pub const TARGET_COLUMNS: [usize; OUTPUT_DIMENSION] = [2, 3];
/// Narrowest row that still holds every feature and target column.
pub const MIN_COLUMNS: usize = 5;

pub type InputsVec = Vec<[f32; INPUT_DIMENSION]>;
pub type OutputsVec = Vec<[f32; OUTPUT_DIMENSION]>;

/// Feature and target rows, index-aligned and in file order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
  pub features: InputsVec,
  pub targets: OutputsVec,
}

impl Dataset {
  pub fn len(&self) -> usize {
    self.features.len()
  }

  pub fn is_empty(&self) -> bool {
    self.features.is_empty()
  }

  /// Splits off the trailing `validation_split` fraction without shuffling.
  ///
  /// The first `floor(n * (1 - validation_split))` rows train, the rest validate.
  /// A zero split returns an empty validation set.
  pub fn split(self, validation_split: f64) -> Result<(Dataset, Dataset)> {
    let rows = self.len();
    if validation_split == 0.0 {
      return Ok((self, Dataset::default()));
    }
    let splitting_point = split_point(rows, validation_split);
    if splitting_point == 0 || splitting_point == rows {
      return Err(Error::Split {
        rows,
        validation_split,
      });
    }

    let Dataset {
      mut features,
      mut targets,
    } = self;
    let validation = Dataset {
      features: features.split_off(splitting_point),
      targets: targets.split_off(splitting_point),
    };
    Ok((Dataset { features, targets }, validation))
  }
}

pub fn split_point(rows: usize, validation_split: f64) -> usize {
  (rows as f64 * (1.0 - validation_split)).floor() as usize
}

fn parse_field(record: &StringRecord, column: usize, line: u64) -> Result<f32> {
  let raw = record.get(column).unwrap_or_default();
  raw.parse::<f32>().map_err(|_| Error::Parse {
    line,
    column,
    value: raw.to_string(),
  })
}

/// Parses comma separated text with exactly one header row.
///
/// Every data row must be as wide as the header, the header must be at least
/// [`MIN_COLUMNS`] wide, and every field of a data row must be numeric.
pub fn parse_dataset<R: Read>(reader: R) -> Result<Dataset> {
  let mut reader = ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .trim(Trim::All)
    .from_reader(reader);

  let width = reader.headers()?.len();
  if width < MIN_COLUMNS {
    return Err(Error::Shape {
      line: 1,
      expected: MIN_COLUMNS,
      found: width,
    });
  }

  let mut dataset = Dataset::default();
  for record in reader.records() {
    let record = record?;
    let line = record.position().map(|p| p.line()).unwrap_or_default();
    if record.len() != width {
      return Err(Error::Shape {
        line,
        expected: width,
        found: record.len(),
      });
    }

    let mut row = Vec::with_capacity(width);
    for column in 0..width {
      row.push(parse_field(&record, column, line)?);
    }
    dataset.features.push(FEATURE_COLUMNS.map(|c| row[c]));
    dataset.targets.push(TARGET_COLUMNS.map(|c| row[c]));
  }

  if dataset.is_empty() {
    return Err(Error::Empty);
  }
  debug!(rows = dataset.len(), width, "parsed dataset");
  Ok(dataset)
}

#[tracing::instrument]
pub fn read_dataset(path: &Path) -> Result<Dataset> {
  let file = File::open(path).map_err(|e| Error::io(path, e))?;
  let dataset = parse_dataset(file)?;
  info!("Loaded {} rows from {:?}", dataset.len(), path);
  Ok(dataset)
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use proptest::prelude::*;

  use super::*;

  #[test]
  fn slices_feature_and_target_columns() {
    let ds = parse_dataset("a,b,c,d,e\n1,2,3,4,5\n2,3,4,5,6\n".as_bytes()).unwrap();
    assert_eq!(ds.features, vec![[1.0, 2.0, 5.0], [2.0, 3.0, 6.0]]);
    assert_eq!(ds.targets, vec![[3.0, 4.0], [4.0, 5.0]]);
  }

  #[test]
  fn extra_columns_are_ignored() {
    let ds = parse_dataset("a,b,c,d,e,f\n1,2,3,4,5,6\n".as_bytes()).unwrap();
    assert_eq!(ds.features, vec![[1.0, 2.0, 5.0]]);
    assert_eq!(ds.targets, vec![[3.0, 4.0]]);
  }

  #[test]
  fn whitespace_around_fields_is_trimmed() {
    let ds = parse_dataset("a, b, c, d, e\n 1 , 2,3,4 , 5.5\n".as_bytes()).unwrap();
    assert_eq!(ds.features, vec![[1.0, 2.0, 5.5]]);
  }

  #[test]
  fn non_numeric_field_fails() {
    let err = parse_dataset("a,b,c,d,e\n1,2,3,4,5\n1,x,3,4,5\n".as_bytes()).unwrap_err();
    match err {
      Error::Parse {
        line,
        column,
        value,
      } => {
        assert_eq!(line, 3);
        assert_eq!(column, 1);
        assert_eq!(value, "x");
      }
      other => panic!("unexpected error {other:?}"),
    }
  }

  #[test]
  fn non_numeric_unused_column_still_fails() {
    let err = parse_dataset("a,b,c,d,e,f\n1,2,3,4,5,nope\n".as_bytes()).unwrap_err();
    assert!(matches!(err, Error::Parse { column: 5, .. }));
  }

  #[test]
  fn empty_field_fails() {
    let err = parse_dataset("a,b,c,d,e\n1,,3,4,5\n".as_bytes()).unwrap_err();
    assert!(matches!(err, Error::Parse { column: 1, .. }));
  }

  #[test]
  fn wrong_width_row_fails() {
    let err = parse_dataset("a,b,c,d,e\n1,2,3,4,5\n1,2,3,4\n".as_bytes()).unwrap_err();
    assert!(matches!(
      err,
      Error::Shape {
        line: 3,
        expected: 5,
        found: 4
      }
    ));
  }

  #[test]
  fn narrow_header_fails() {
    let err = parse_dataset("a,b,c,d\n1,2,3,4\n".as_bytes()).unwrap_err();
    assert!(matches!(err, Error::Shape { expected: 5, found: 4, .. }));
  }

  #[test]
  fn header_only_is_empty() {
    let err = parse_dataset("a,b,c,d,e\n".as_bytes()).unwrap_err();
    assert!(matches!(err, Error::Empty));
  }

  #[test]
  fn empty_input_fails() {
    assert!(parse_dataset("".as_bytes()).is_err());
  }

  #[test]
  fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_dataset(&dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
  }

  #[test]
  fn reads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "a,b,c,d,e").unwrap();
    writeln!(file, "10,20,30,40,50").unwrap();
    let ds = read_dataset(file.path()).unwrap();
    assert_eq!(ds.len(), 1);
    assert_eq!(ds.features[0], [10.0, 20.0, 50.0]);
  }

  #[test]
  fn split_keeps_row_order() {
    let ds = Dataset {
      features: (0..10).map(|i| [i as f32; 3]).collect(),
      targets: (0..10).map(|i| [i as f32; 2]).collect(),
    };
    let (train, val) = ds.split(0.1).unwrap();
    assert_eq!(train.len(), 9);
    assert_eq!(val.features, vec![[9.0; 3]]);
    assert_eq!(train.targets[8], [8.0; 2]);
  }

  #[test]
  fn split_of_two_rows_leaves_one_each() {
    let ds = parse_dataset("a,b,c,d,e\n1,2,3,4,5\n2,3,4,5,6\n".as_bytes()).unwrap();
    let (train, val) = ds.split(0.1).unwrap();
    assert_eq!(train.features, vec![[1.0, 2.0, 5.0]]);
    assert_eq!(val.features, vec![[2.0, 3.0, 6.0]]);
  }

  #[test]
  fn split_of_single_row_fails() {
    let ds = parse_dataset("a,b,c,d,e\n1,2,3,4,5\n".as_bytes()).unwrap();
    assert!(matches!(ds.split(0.1), Err(Error::Split { rows: 1, .. })));
  }

  #[test]
  fn nan_fields_are_numbers() {
    let ds = parse_dataset("a,b,c,d,e\nNaN,2,3,4,5\n".as_bytes()).unwrap();
    assert!(ds.features[0][0].is_nan());
  }

  #[test]
  fn zero_split_keeps_everything_for_training() {
    let ds = parse_dataset("a,b,c,d,e\n1,2,3,4,5\n".as_bytes()).unwrap();
    let (train, val) = ds.split(0.0).unwrap();
    assert_eq!(train.len(), 1);
    assert!(val.is_empty());
  }

  proptest! {
    #[test]
    fn loaded_shapes_follow_row_count(
      rows in prop::collection::vec(prop::array::uniform5(-1e3f32..1e3), 1..40)
    ) {
      let mut text = String::from("a,b,c,d,e\n");
      for r in &rows {
        text.push_str(&format!("{},{},{},{},{}\n", r[0], r[1], r[2], r[3], r[4]));
      }
      let ds = parse_dataset(text.as_bytes()).unwrap();
      prop_assert_eq!(ds.features.len(), rows.len());
      prop_assert_eq!(ds.targets.len(), rows.len());
      for (i, r) in rows.iter().enumerate() {
        prop_assert_eq!(ds.features[i], [r[0], r[1], r[4]]);
        prop_assert_eq!(ds.targets[i], [r[2], r[3]]);
      }
    }

    #[test]
    fn split_partitions_all_rows(rows in 2usize..500, split in 0.01f64..0.99) {
      let ds = Dataset {
        features: vec![[0.0; 3]; rows],
        targets: vec![[0.0; 2]; rows],
      };
      match ds.split(split) {
        Ok((train, val)) => {
          prop_assert_eq!(train.len() + val.len(), rows);
          prop_assert_eq!(train.len(), split_point(rows, split));
        }
        Err(Error::Split { .. }) => {
          let p = split_point(rows, split);
          prop_assert!(p == 0 || p == rows);
        }
        Err(e) => prop_assert!(false, "unexpected {:?}", e),
      }
    }
  }
}
