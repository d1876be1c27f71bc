use crate::xml::Element;

/// Read-only view over a `Representation` and its owning `AdaptationSet`,
/// implementing the DASH inheritance rule: anything not specified on the
/// representation is taken from the adaptation set.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub adaptation_set: &'a Element,
    pub representation: &'a Element,
}

impl<'a> Scope<'a> {
    pub fn new(adaptation_set: &'a Element, representation: &'a Element) -> Self {
        Self {
            adaptation_set,
            representation,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.representation
            .attr(name)
            .or_else(|| self.adaptation_set.attr(name))
    }

    pub fn child(&self, name: &str) -> Option<&'a Element> {
        self.representation
            .find(name)
            .or_else(|| self.adaptation_set.find(name))
    }

    /// Matches from both levels, representation-level entries first.
    pub fn children(&self, name: &str) -> Vec<&'a Element> {
        let mut matches = self.representation.find_all(name);
        matches.extend(self.adaptation_set.find_all(name));
        matches
    }
}
