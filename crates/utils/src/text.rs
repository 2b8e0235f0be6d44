/// A trimmed, case-folded `?search=` term.
///
/// SQLite's `lower()` only folds ASCII, so matching happens here with Unicode
/// folding applied to both the term and the candidate fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm(String);

impl SearchTerm {
    /// `None` for a missing or blank term.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Self(s.to_lowercase()))
    }

    pub fn matches<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> bool {
        fields
            .into_iter()
            .any(|field| field.to_lowercase().contains(&self.0))
    }
}
