// choice_utils.rs
use crate::pivot_utils::CycleId;
use crate::table_utils::TableBuilder;

/// Returns the sorted distinct non-empty values of a column, the options offered by
/// a selection control.
///
/// ```
/// use markettab::choice_utils::choices;
/// use markettab::table_utils::TableBuilder;
///
/// let table = TableBuilder::from_raw_data(
///     vec!["Sector".to_string()],
///     vec![
///         vec!["WASH".to_string()],
///         vec!["Alimentaire".to_string()],
///         vec!["WASH".to_string()],
///         vec!["".to_string()],
///     ],
/// );
///
/// assert_eq!(choices(&table, "Sector"), vec!["Alimentaire", "WASH"]);
/// ```
pub fn choices(table: &TableBuilder, column: &str) -> Vec<String> {
    let mut values: Vec<String> = table
        .get_unique(column)
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    values.sort();
    values.dedup();
    values
}

/// Returns the options of a downstream selection control given the upstream
/// selections. A pure function of the immutable dataset and the selections passed
/// in: cascading dropdowns carry no subscription state of their own.
///
/// ```
/// use markettab::choice_utils::dependent_choices;
/// use markettab::table_utils::TableBuilder;
///
/// let table = TableBuilder::from_raw_data(
///     vec!["Sector".to_string(), "Produit".to_string()],
///     vec![
///         vec!["Alimentaire".to_string(), "Riz".to_string()],
///         vec!["Alimentaire".to_string(), "Huile".to_string()],
///         vec!["WASH".to_string(), "Savon".to_string()],
///     ],
/// );
///
/// assert_eq!(
///     dependent_choices(&table, "Produit", &[("Sector", "Alimentaire")]),
///     vec!["Huile", "Riz"]
/// );
/// ```
pub fn dependent_choices(
    table: &TableBuilder,
    column: &str,
    upstream: &[(&str, &str)],
) -> Vec<String> {
    let mut narrowed = table.from_copy();
    narrowed.where_eq(upstream.to_vec());
    choices(&narrowed, column)
}

/// Returns the cycles present in the table, in period order.
pub fn cycle_choices(table: &TableBuilder, cycle_column: &str) -> Vec<CycleId> {
    let mut cycles: Vec<CycleId> = table
        .get_unique(cycle_column)
        .iter()
        .filter_map(|label| CycleId::parse(label))
        .collect();
    cycles.sort();
    cycles.dedup();
    cycles
}

/// Returns the lowest and highest cycle index present, which is the range of the
/// period slider. `None` when the table holds no parsable cycle labels.
pub fn cycle_bounds(table: &TableBuilder, cycle_column: &str) -> Option<(u32, u32)> {
    let cycles = cycle_choices(table, cycle_column);
    match (cycles.first(), cycles.last()) {
        (Some(first), Some(last)) => Some((first.index(), last.index())),
        _ => None,
    }
}
