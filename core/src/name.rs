use std::borrow::Cow;
use std::collections::HashSet;

/// How table names are compared during one search.
///
/// Fixed by the schema metadata source. `Insensitive` folds ASCII case,
/// which matches how most engines treat unquoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaseSensitivity {
    Sensitive,
    #[default]
    Insensitive,
}

impl CaseSensitivity {
    /// Comparison key for a table name.
    pub fn fold<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match self {
            CaseSensitivity::Sensitive => Cow::Borrowed(name),
            CaseSensitivity::Insensitive if name.bytes().any(|b| b.is_ascii_uppercase()) => {
                Cow::Owned(name.to_ascii_lowercase())
            }
            CaseSensitivity::Insensitive => Cow::Borrowed(name),
        }
    }

    pub fn eq(&self, a: &str, b: &str) -> bool {
        match self {
            CaseSensitivity::Sensitive => a == b,
            CaseSensitivity::Insensitive => a.eq_ignore_ascii_case(b),
        }
    }
}

/// Insertion-ordered set of table names.
///
/// Keeps the first spelling seen for each name; later spellings that fold
/// to the same key are duplicates.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    names: Vec<String>,
    keys: HashSet<String>,
    case: CaseSensitivity,
}

impl TableSet {
    pub fn new(case: CaseSensitivity) -> Self {
        Self {
            names: Vec::new(),
            keys: HashSet::new(),
            case,
        }
    }

    /// Build a set from names, dropping repeats.
    pub fn from_names<I, S>(case: CaseSensitivity, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new(case);
        for name in names {
            set.insert(name.as_ref());
        }
        set
    }

    /// Add a name. Returns false if an equal name is already present.
    pub fn insert(&mut self, name: &str) -> bool {
        let key = self.case.fold(name).into_owned();
        if self.keys.insert(key) {
            self.names.push(name.to_string());
            true
        } else {
            false
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keys.contains(self.case.fold(name).as_ref())
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.names.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    pub fn into_vec(self) -> Vec<String> {
        self.names
    }
}

impl<'a> IntoIterator for &'a TableSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

impl IntoIterator for TableSet {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.into_iter()
    }
}

impl PartialEq for TableSet {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

impl Eq for TableSet {}
