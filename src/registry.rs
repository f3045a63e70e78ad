use crate::model::Formatter;
use std::sync::Arc;

/// Maps live formatters back to the ids they were declared under.
///
/// Lookups are by identity, not by value: two formatters with the same format
/// string are still different entries.
#[derive(Debug, Clone, Default)]
pub struct FormatterRegistry {
    entries: Vec<(String, Arc<Formatter>)>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, formatter: Arc<Formatter>) {
        self.entries.push((id.into(), formatter));
    }

    pub fn lookup_id(&self, formatter: &Formatter) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, f)| std::ptr::eq(Arc::as_ptr(f), formatter))
            .map(|(id, _)| id.as_str())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Formatter>> {
        self.entries.iter().find(|(k, _)| k == id).map(|(_, f)| f)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_by_identity() {
        let simple = Arc::new(Formatter::new(Some("%(message)s".into())));
        let lookalike = Formatter::new(Some("%(message)s".into()));

        let mut reg = FormatterRegistry::new();
        reg.register("simple", Arc::clone(&simple));

        assert_eq!(reg.lookup_id(&simple), Some("simple"));
        assert_eq!(
            reg.lookup_id(&lookalike),
            None,
            "an equal but unregistered formatter must not resolve"
        );
        assert!(reg.get("simple").is_some());
        assert_eq!(reg.len(), 1);
    }
}
