//! Ordered field extraction
//!
//! Each field is looked up by a list of independent strategies (structured
//! metadata first, then looser markup patterns). The first strategy that
//! yields a value wins and the remaining ones are never run.

/// Builder over one document that short-circuits on the first hit
pub struct FieldChain<'a, T> {
    doc: &'a str,
    value: Option<T>,
}

impl<'a, T> FieldChain<'a, T> {
    pub fn new(doc: &'a str) -> Self {
        Self { doc, value: None }
    }

    /// Use an already-known candidate (e.g. from JSON-LD)
    pub fn or_value(self, candidate: Option<T>) -> Self {
        match self.value {
            Some(_) => self,
            None => Self {
                doc: self.doc,
                value: candidate,
            },
        }
    }

    /// Run `strategy` against the document unless a value was already found
    pub fn or<F>(self, strategy: F) -> Self
    where
        F: FnOnce(&str) -> Option<T>,
    {
        match self.value {
            Some(_) => self,
            None => Self {
                doc: self.doc,
                value: strategy(self.doc),
            },
        }
    }

    pub fn get(self) -> Option<T> {
        self.value
    }
}

/// Non-empty vector or `None`, for list fields fed through a chain
pub fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}
