//! Names a job has created in the engine workspace.

/// Ordered set of workspace names owned by one job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScratchSet {
    names: Vec<String>,
}

impl ScratchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a name. Returns false if it was already tracked.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Stop tracking a name that was already removed.
    pub fn forget(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|n| n != name);
        self.names.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
