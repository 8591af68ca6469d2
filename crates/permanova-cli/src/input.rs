//! Readers for tab-separated distance matrices and grouping tables.
//!
//! Distance matrix layout (the first header cell is ignored):
//!
//! ```text
//! 	s1	s2	s3
//! s1	0.0	1.5	2.0
//! s2	1.5	0.0	0.7
//! s3	2.0	0.7	0.0
//! ```
//!
//! Grouping table layout (the first header cell names the ID column, and
//! later lines starting with `#` are comments):
//!
//! ```text
//! #SampleID	Treatment	Site
//! s1	control	north
//! s2	fast	north
//! ```

use std::{
    fs::File,
    io::{self, BufReader},
    path::Path,
};

use anyhow::{Context as _, bail};
use permanova_stats::{DistanceMatrix, GroupingTable};

fn tsv_reader<R>(reader: R) -> csv::Reader<R>
where
    R: io::Read,
{
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, csv::Position::line)
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

/// Parses a tab-separated distance matrix.
pub fn read_distance_matrix<R>(reader: R) -> anyhow::Result<DistanceMatrix>
where
    R: io::Read,
{
    let mut records = tsv_reader(reader).into_records();

    let header = loop {
        match records.next() {
            Some(record) => {
                let record = record.context("Failed to read distance matrix header")?;
                if !is_blank(&record) {
                    break record;
                }
            }
            None => bail!("Distance matrix is empty"),
        }
    };
    let ids = header.iter().skip(1).map(str::to_owned).collect::<Vec<_>>();

    let mut rows = Vec::with_capacity(ids.len());
    for record in records {
        let record = record.context("Failed to read distance matrix row")?;
        if is_blank(&record) {
            continue;
        }
        let line = line_of(&record);
        let row_id = record.get(0).unwrap_or_default();
        let expected_id = ids.get(rows.len()).with_context(|| {
            format!("Line {line}: more rows than IDs in the header ({})", ids.len())
        })?;
        if row_id != expected_id.as_str() {
            bail!("Line {line}: row ID '{row_id}' does not match header ID '{expected_id}'");
        }
        let values = record
            .iter()
            .skip(1)
            .map(|value| {
                value.parse::<f64>().with_context(|| {
                    format!("Line {line}: invalid distance '{value}' in row '{row_id}'")
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        rows.push(values);
    }

    let dm = DistanceMatrix::from_rows(ids, rows).context("Invalid distance matrix")?;
    tracing::debug!(objects = dm.len(), "read distance matrix");
    Ok(dm)
}

/// Parses a tab-separated grouping table.
pub fn read_grouping_table<R>(reader: R) -> anyhow::Result<GroupingTable>
where
    R: io::Read,
{
    let mut records = tsv_reader(reader).into_records();

    let header = loop {
        match records.next() {
            Some(record) => {
                let record = record.context("Failed to read grouping table header")?;
                if !is_blank(&record) {
                    break record;
                }
            }
            None => bail!("Grouping table is empty"),
        }
    };
    let mut table = GroupingTable::new(header.iter().skip(1))
        .context("Invalid grouping table header")?;

    for record in records {
        let record = record.context("Failed to read grouping table row")?;
        if is_blank(&record) || record.get(0).is_some_and(|id| id.starts_with('#')) {
            continue;
        }
        let line = line_of(&record);
        let id = record.get(0).unwrap_or_default();
        table
            .push_row(id, record.iter().skip(1))
            .with_context(|| format!("Line {line}: invalid grouping table row"))?;
    }

    tracing::debug!(
        rows = table.num_rows(),
        columns = table.columns().len(),
        "read grouping table"
    );
    Ok(table)
}

fn open_file(file_kind: &str, path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;
    Ok(BufReader::new(file))
}

pub fn read_distance_matrix_file<P>(path: P) -> anyhow::Result<DistanceMatrix>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    read_distance_matrix(open_file("distance matrix", path)?)
        .with_context(|| format!("Failed to parse distance matrix file: {}", path.display()))
}

pub fn read_grouping_table_file<P>(path: P) -> anyhow::Result<GroupingTable>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    read_grouping_table(open_file("grouping table", path)?)
        .with_context(|| format!("Failed to parse grouping table file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_distance_matrix() {
        let text = "\ta\tb\tc\na\t0\t1.5\t2\nb\t1.5\t0\t0.25\nc\t2\t0.25\t0\n";
        let dm = read_distance_matrix(text.as_bytes()).unwrap();
        assert_eq!(dm.ids(), &["a", "b", "c"]);
        assert_eq!(dm.condensed_form(), vec![1.5, 2.0, 0.25]);
    }

    #[test]
    fn test_read_distance_matrix_skips_blank_lines() {
        let text = "\n\ta\tb\n\na\t0\t1\nb\t1\t0\n\n";
        let dm = read_distance_matrix(text.as_bytes()).unwrap();
        assert_eq!(dm.len(), 2);
    }

    #[test]
    fn test_read_distance_matrix_rejects_mismatched_row_id() {
        let text = "\ta\tb\nb\t0\t1\na\t1\t0\n";
        let err = read_distance_matrix(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("does not match"), "{err}");
    }

    #[test]
    fn test_read_distance_matrix_rejects_bad_number() {
        let text = "\ta\tb\na\t0\tfar\nb\t1\t0\n";
        let err = read_distance_matrix(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("invalid distance 'far'"), "{err}");
    }

    #[test]
    fn test_read_distance_matrix_rejects_asymmetric() {
        let text = "\ta\tb\na\t0\t1\nb\t2\t0\n";
        assert!(read_distance_matrix(text.as_bytes()).is_err());
    }

    #[test]
    fn test_read_distance_matrix_rejects_extra_rows() {
        let text = "\ta\na\t0\nb\t0\n";
        let err = read_distance_matrix(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("more rows"), "{err}");
    }

    #[test]
    fn test_read_grouping_table() {
        let text = "#SampleID\tTreatment\tSite\n\
                    # a comment line\n\
                    s2\tfast\tnorth\n\
                    s1\tcontrol\tsouth\n";
        let table = read_grouping_table(text.as_bytes()).unwrap();
        assert_eq!(table.columns(), &["Treatment", "Site"]);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.get("s1", "Treatment"), Some("control"));
        assert_eq!(table.get("s2", "Site"), Some("north"));
    }

    #[test]
    fn test_read_grouping_table_rejects_short_row() {
        let text = "id\tA\tB\ns1\tx\n";
        let err = read_grouping_table(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Line 2"), "{err}");
    }

    #[test]
    fn test_read_empty_inputs() {
        assert!(read_distance_matrix(&b""[..]).is_err());
        assert!(read_grouping_table(&b"\n\n"[..]).is_err());
    }
}
