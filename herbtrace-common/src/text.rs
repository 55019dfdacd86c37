//! Text normalization shared by storage and in-process matching

/// Unicode case folding used for case-insensitive matching
///
/// SQLite's `lower()` only folds ASCII, so stored filter columns and filter
/// needles are both folded here instead of in SQL.
pub fn fold_case(value: &str) -> String {
    value.to_lowercase()
}
