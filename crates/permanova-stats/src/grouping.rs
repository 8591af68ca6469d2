//! Grouping inputs and the label-to-code mapping.
//!
//! A grouping assigns every object of a distance matrix to a category. It can
//! come either as a direct label vector aligned with the matrix order, or as a
//! [`GroupingTable`] indexed by object ID from which one column is selected.
//!
//! Labels are turned into contiguous integer codes by [`GroupCoding`], built
//! once per call and passed along by reference. Vector labels only need
//! [`Ord`]; table values are compared as text.

use std::collections::{BTreeMap, HashMap};

/// How objects are assigned to groups.
#[derive(Debug, Clone, Copy)]
pub enum Grouping<'a, L> {
    /// One label per object, in distance-matrix order.
    Vector(&'a [L]),
    /// A table indexed by object ID; a column must be selected separately.
    Table(&'a GroupingTable),
}

impl<'a, L> From<&'a [L]> for Grouping<'a, L> {
    fn from(labels: &'a [L]) -> Self {
        Self::Vector(labels)
    }
}

impl<'a, L> From<&'a Vec<L>> for Grouping<'a, L> {
    fn from(labels: &'a Vec<L>) -> Self {
        Self::Vector(labels)
    }
}

impl<'a> From<&'a GroupingTable> for Grouping<'a, String> {
    fn from(table: &'a GroupingTable) -> Self {
        Self::Table(table)
    }
}

/// A group label borrowed from the caller's grouping.
///
/// Direct vectors yield [`GroupLabel::Value`] and table columns yield
/// [`GroupLabel::Text`]; a single grouping never mixes the two, so ordering
/// compares like with like.
///
/// # Examples
///
/// ```
/// use permanova_stats::grouping::GroupLabel;
///
/// assert!(GroupLabel::Value(&1) < GroupLabel::Value(&2));
/// assert_eq!(GroupLabel::<u8>::Text("fast").as_text(), Some("fast"));
/// ```
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupLabel<'a, L> {
    Value(&'a L),
    Text(&'a str),
}

impl<L> Clone for GroupLabel<'_, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L> Copy for GroupLabel<'_, L> {}

impl<'a, L> GroupLabel<'a, L> {
    #[must_use]
    pub fn as_value(self) -> Option<&'a L> {
        match self {
            Self::Value(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(self) -> Option<&'a str> {
        match self {
            Self::Value(_) => None,
            Self::Text(text) => Some(text),
        }
    }
}

/// Errors raised while building a [`GroupingTable`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum GroupingTableError {
    #[display("row '{id}' has {len} values, expected {expected}")]
    RowLength {
        id: String,
        len: usize,
        expected: usize,
    },
    #[display("duplicate row ID '{id}'")]
    DuplicateId { id: String },
    #[display("duplicate column name '{name}'")]
    DuplicateColumn { name: String },
}

/// Categorical metadata indexed by object ID.
///
/// Rows may appear in any order and the table may contain IDs absent from the
/// distance matrix; only the IDs the matrix asks for are looked up.
///
/// # Examples
///
/// ```
/// use permanova_stats::grouping::GroupingTable;
///
/// let mut table = GroupingTable::new(["Treatment", "Site"]).unwrap();
/// table.push_row("s1", ["control", "north"]).unwrap();
/// table.push_row("s2", ["fast", "south"]).unwrap();
///
/// assert_eq!(table.get("s2", "Treatment"), Some("fast"));
/// assert_eq!(table.get("s3", "Treatment"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingTable {
    columns: Vec<String>,
    rows: Vec<(String, Vec<String>)>,
    row_index: HashMap<String, usize>,
}

impl GroupingTable {
    /// Creates an empty table with the given column names.
    pub fn new<I, S>(columns: I) -> Result<Self, GroupingTableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect::<Vec<String>>();
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(GroupingTableError::DuplicateColumn { name: name.clone() });
            }
        }
        Ok(Self {
            columns,
            ..Self::default()
        })
    }

    /// Appends a row. The number of values must match the number of columns.
    pub fn push_row<I, S>(&mut self, id: impl Into<String>, values: I) -> Result<(), GroupingTableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        let values = values.into_iter().map(Into::into).collect::<Vec<String>>();
        if values.len() != self.columns.len() {
            return Err(GroupingTableError::RowLength {
                id,
                len: values.len(),
                expected: self.columns.len(),
            });
        }
        if self.row_index.contains_key(&id) {
            return Err(GroupingTableError::DuplicateId { id });
        }
        self.row_index.insert(id.clone(), self.rows.len());
        self.rows.push((id, values));
        Ok(())
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns the value of `column` for row `id`.
    #[must_use]
    pub fn get(&self, id: &str, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.value_at(id, col)
    }

    pub(crate) fn value_at(&self, id: &str, col: usize) -> Option<&str> {
        let row = *self.row_index.get(id)?;
        Some(self.rows[row].1[col].as_str())
    }
}

/// Mapping between distinct group labels and contiguous codes `0..num_groups`.
///
/// Labels are ordered ascending, so code `i` is the `i`-th smallest label. The
/// mapping is only meaningful for the call that built it.
///
/// # Examples
///
/// ```
/// use permanova_stats::grouping::GroupCoding;
///
/// let (coding, codes) = GroupCoding::encode(&["b", "a", "b", "c"]);
/// assert_eq!(coding.labels(), &["a", "b", "c"]);
/// assert_eq!(codes, vec![1, 0, 1, 2]);
/// assert_eq!(coding.code_of(&"c"), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCoding<L> {
    labels: Vec<L>,
}

impl<L> GroupCoding<L>
where
    L: Ord + Clone,
{
    /// Encodes `labels`, returning the mapping and one code per label.
    pub fn encode<'a, I>(labels: I) -> (Self, Vec<usize>)
    where
        I: IntoIterator<Item = &'a L>,
        L: 'a,
    {
        let labels = labels.into_iter().collect::<Vec<&L>>();
        let mut index = labels
            .iter()
            .map(|&label| (label, 0))
            .collect::<BTreeMap<&L, usize>>();
        for (code, slot) in index.values_mut().enumerate() {
            *slot = code;
        }
        let codes = labels.iter().map(|label| index[label]).collect();
        let distinct = index.into_keys().cloned().collect();
        (Self { labels: distinct }, codes)
    }

    /// Returns the code assigned to `label`.
    #[must_use]
    pub fn code_of(&self, label: &L) -> Option<usize> {
        self.labels.binary_search(label).ok()
    }
}

impl<L> GroupCoding<L> {
    /// Distinct labels, indexed by code.
    #[must_use]
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Returns the label for `code`.
    #[must_use]
    pub fn label_of(&self, code: usize) -> Option<&L> {
        self.labels.get(code)
    }

    #[must_use]
    pub fn num_groups(&self) -> usize {
        self.labels.len()
    }
}

/// Counts objects per group code (`bincount`).
///
/// # Panics
///
/// Panics if any code is `>= num_groups`.
#[must_use]
pub fn group_sizes(codes: &[usize], num_groups: usize) -> Vec<usize> {
    let mut sizes = vec![0; num_groups];
    for &code in codes {
        sizes[code] += 1;
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_sorted_and_stable() {
        let labels = ["z", "x", "y", "x", "z"];
        let (coding, codes) = GroupCoding::encode(&labels);
        assert_eq!(coding.labels(), &["x", "y", "z"]);
        assert_eq!(codes, vec![2, 0, 1, 0, 2]);
        for (label, code) in labels.iter().zip(&codes) {
            assert_eq!(coding.label_of(*code), Some(label));
            assert_eq!(coding.code_of(label), Some(*code));
        }
    }

    #[test]
    fn test_encode_integers() {
        let (coding, codes) = GroupCoding::encode(&[10, -3, 10, 7]);
        assert_eq!(coding.num_groups(), 3);
        assert_eq!(codes, vec![2, 0, 2, 1]);
    }

    #[test]
    fn test_group_labels_borrow_without_clone() {
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
        struct Site(u8);

        let sites = [Site(2), Site(1), Site(2)];
        let labels = sites.iter().map(GroupLabel::Value).collect::<Vec<_>>();
        let (coding, codes) = GroupCoding::encode(&labels);
        assert_eq!(codes, vec![1, 0, 1]);
        assert_eq!(coding.label_of(0).and_then(|l| l.as_value()), Some(&Site(1)));
        assert_eq!(coding.label_of(1).and_then(|l| l.as_text()), None);
    }

    #[test]
    fn test_group_sizes_sum_to_len() {
        let codes = [0, 1, 1, 2, 2, 2];
        let sizes = group_sizes(&codes, 3);
        assert_eq!(sizes, vec![1, 2, 3]);
        assert_eq!(sizes.iter().sum::<usize>(), codes.len());
    }

    #[test]
    fn test_table_lookup() {
        let mut table = GroupingTable::new(["Group"]).unwrap();
        table.push_row("b", ["y"]).unwrap();
        table.push_row("a", ["x"]).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.get("a", "Group"), Some("x"));
        assert_eq!(table.get("a", "Missing"), None);
    }

    #[test]
    fn test_table_rejects_bad_rows() {
        let mut table = GroupingTable::new(["A", "B"]).unwrap();
        assert!(matches!(
            table.push_row("s1", ["only-one"]),
            Err(GroupingTableError::RowLength { len: 1, expected: 2, .. })
        ));
        table.push_row("s1", ["1", "2"]).unwrap();
        assert!(matches!(
            table.push_row("s1", ["3", "4"]),
            Err(GroupingTableError::DuplicateId { .. })
        ));
    }

    #[test]
    fn test_table_rejects_duplicate_columns() {
        assert!(matches!(
            GroupingTable::new(["A", "A"]),
            Err(GroupingTableError::DuplicateColumn { .. })
        ));
    }
}
