//! Conversion of a distance matrix and a grouping into canonical numeric inputs.

use crate::{
    PermanovaError,
    distance::{DistanceMatrix, TriangularIndices},
    grouping::{GroupCoding, GroupLabel, Grouping},
};

/// Canonical inputs shared by every evaluation of the test statistic.
#[derive(Debug, Clone)]
pub struct PreparedInput<'a, L> {
    /// Number of objects `N`.
    pub sample_size: usize,
    /// Number of distinct groups `a`.
    pub num_groups: usize,
    /// Group code per object, in distance-matrix order.
    pub grouping: Vec<usize>,
    /// Label of each group code, borrowed from the grouping.
    pub coding: GroupCoding<GroupLabel<'a, L>>,
    /// Upper-triangle indices, aligned with `distances`.
    pub tri_idxs: TriangularIndices,
    /// Condensed distances.
    pub distances: Vec<f64>,
}

/// Validates the grouping against the distance matrix and encodes it.
///
/// # Arguments
///
/// * `distance_matrix` - Distances between the `N` objects
/// * `grouping` - Direct label vector, or a table indexed by object ID
/// * `column` - Column to read from a table grouping. Must be `None` for a
///   direct vector and `Some` for a table.
///
/// # Errors
///
/// * [`PermanovaError::ColumnWithVector`] / [`PermanovaError::TableWithoutColumn`]
///   when `column` does not fit the grouping kind
/// * [`PermanovaError::MissingColumn`] when the table has no such column
/// * [`PermanovaError::MissingIds`] when the table lacks some matrix IDs
/// * [`PermanovaError::GroupingLengthMismatch`] when a vector has the wrong length
/// * [`PermanovaError::SingleGroup`] when every object has the same label
/// * [`PermanovaError::AllGroupsUnique`] when every object has its own label
///
/// # Examples
///
/// ```
/// use permanova_stats::{distance::DistanceMatrix, grouping::Grouping, preprocess::preprocess};
///
/// let dm = DistanceMatrix::from_rows(
///     ["a", "b", "c"],
///     [vec![0.0, 1.0, 4.0], vec![1.0, 0.0, 5.0], vec![4.0, 5.0, 0.0]],
/// )
/// .unwrap();
/// let input = preprocess(&dm, Grouping::Vector(&["x", "x", "y"]), None).unwrap();
///
/// assert_eq!(input.sample_size, 3);
/// assert_eq!(input.num_groups, 2);
/// assert_eq!(input.grouping, vec![0, 0, 1]);
/// assert_eq!(input.distances, vec![1.0, 4.0, 5.0]);
/// ```
pub fn preprocess<'a, L>(
    distance_matrix: &DistanceMatrix,
    grouping: Grouping<'a, L>,
    column: Option<&str>,
) -> Result<PreparedInput<'a, L>, PermanovaError>
where
    L: Ord,
{
    let sample_size = distance_matrix.len();

    let (coding, codes) = match (grouping, column) {
        (Grouping::Vector(_), Some(column)) => {
            return Err(PermanovaError::ColumnWithVector {
                column: column.to_owned(),
            });
        }
        (Grouping::Table(_), None) => return Err(PermanovaError::TableWithoutColumn),
        (Grouping::Vector(labels), None) => {
            if labels.len() != sample_size {
                return Err(PermanovaError::GroupingLengthMismatch {
                    grouping: labels.len(),
                    sample_size,
                });
            }
            let labels = labels.iter().map(GroupLabel::Value).collect::<Vec<_>>();
            GroupCoding::encode(&labels)
        }
        (Grouping::Table(table), Some(column)) => {
            let col = table
                .column_index(column)
                .ok_or_else(|| PermanovaError::MissingColumn {
                    column: column.to_owned(),
                })?;
            let mut missing = vec![];
            let mut labels = Vec::with_capacity(sample_size);
            for id in distance_matrix.ids() {
                match table.value_at(id, col) {
                    Some(value) => labels.push(GroupLabel::Text(value)),
                    None => missing.push(id.clone()),
                }
            }
            if !missing.is_empty() {
                return Err(PermanovaError::MissingIds { ids: missing });
            }
            GroupCoding::encode(&labels)
        }
    };

    let num_groups = coding.num_groups();
    if num_groups == 1 {
        return Err(PermanovaError::SingleGroup);
    }
    if num_groups == sample_size {
        return Err(PermanovaError::AllGroupsUnique);
    }

    tracing::debug!(sample_size, num_groups, "preprocessed PERMANOVA input");

    Ok(PreparedInput {
        sample_size,
        num_groups,
        grouping: codes,
        coding,
        tri_idxs: TriangularIndices::new(sample_size),
        distances: distance_matrix.condensed_form(),
    })
}
