use std::cmp::Reverse;
use std::sync::Arc;

use super::{Bounds, PreprocessedRule};
use crate::aspect::Aspects;
use crate::request::ClassificationRequest;
use crate::value::{Address, Bound, Ordinal, RangeSet, Shrunk};

/// What a matching classifier yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// Number of aspects the originating rule constrains
    pub matched_aspects: u32,
    pub name: Arc<str>,
}

/// A single remaining constraint of a classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Protocol(RangeSet<u8>),
    SrcPort(RangeSet<u16>),
    DstPort(RangeSet<u16>),
    SrcAddress(RangeSet<Address>),
    DstAddress(RangeSet<Address>),
}

impl Matcher {
    /// Test the request. A request without a value for the aspect never matches.
    #[inline]
    pub fn matches(&self, request: &ClassificationRequest) -> bool {
        match self {
            Matcher::Protocol(set) => request.protocol.is_some_and(|v| set.contains(v)),
            Matcher::SrcPort(set) => request.src_port.is_some_and(|v| set.contains(v)),
            Matcher::DstPort(set) => request.dst_port.is_some_and(|v| set.contains(v)),
            Matcher::SrcAddress(set) => request.src_address.is_some_and(|v| set.contains(v)),
            Matcher::DstAddress(set) => request.dst_address.is_some_and(|v| set.contains(v)),
        }
    }
}

/// Shrink one value against its bound and record the matcher it still needs.
///
/// Returns `None` if the value cannot be satisfied within the bound.
fn restrict<T: Ordinal>(
    value: Option<&RangeSet<T>>,
    bound: &Bound<T>,
    wrap: fn(RangeSet<T>) -> Matcher,
    matchers: &mut Vec<Matcher>,
) -> Option<()> {
    if let Some(value) = value {
        match value.shrink(bound) {
            Shrunk::Disjoint => return None,
            Shrunk::Covered => {}
            Shrunk::Partial(set) => matchers.push(wrap(set)),
        }
    }
    Some(())
}

/// A rule compiled for one leaf of the decision tree.
///
/// Constraints already guaranteed by the leaf's bounds are dropped, so a
/// classifier only carries the matchers its leaf still has to check.
#[derive(Debug, Clone)]
pub struct Classifier {
    matchers: Box<[Matcher]>,
    /// Aspects the originating rule constrains; a request must carry all of them
    required: Aspects,
    result: ClassificationResult,
    group_position: i32,
    position: i32,
    /// Index of the originating rule in provider order
    ordinal: usize,
}

impl Classifier {
    /// Compile `rule` for a leaf with the given bounds.
    ///
    /// Returns `None` if the rule can never match a request within `bounds`.
    pub fn of(rule: &PreprocessedRule, bounds: &Bounds, ordinal: usize) -> Option<Self> {
        let mut matchers = Vec::new();
        restrict(rule.protocol.as_ref(), &bounds.protocol, Matcher::Protocol, &mut matchers)?;
        restrict(rule.src_port.as_ref(), &bounds.src_port, Matcher::SrcPort, &mut matchers)?;
        restrict(rule.dst_port.as_ref(), &bounds.dst_port, Matcher::DstPort, &mut matchers)?;
        restrict(
            rule.src_address.as_ref(),
            &bounds.src_address,
            Matcher::SrcAddress,
            &mut matchers,
        )?;
        restrict(
            rule.dst_address.as_ref(),
            &bounds.dst_address,
            Matcher::DstAddress,
            &mut matchers,
        )?;

        let required = rule.aspects();
        Some(Self {
            matchers: matchers.into_boxed_slice(),
            required,
            result: ClassificationResult {
                matched_aspects: required.count(),
                name: Arc::clone(&rule.name),
            },
            group_position: rule.rule.group_position,
            position: rule.rule.position,
            ordinal,
        })
    }

    /// The result of this classifier if it matches the request.
    ///
    /// `missing` are the aspects the request carries no value for.
    #[inline]
    pub fn classify(
        &self,
        request: &ClassificationRequest,
        missing: Aspects,
    ) -> Option<&ClassificationResult> {
        if self.required.intersects(missing) {
            return None;
        }
        self.matchers
            .iter()
            .all(|m| m.matches(request))
            .then_some(&self.result)
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    pub fn result(&self) -> &ClassificationResult {
        &self.result
    }

    /// Evaluation order within a leaf.
    ///
    /// Lower positions first; among equal positions the rule constraining more
    /// aspects wins, then provider order.
    pub fn sort_key(&self) -> (i32, i32, Reverse<u32>, usize) {
        (
            self.group_position,
            self.position,
            Reverse(self.result.matched_aspects),
            self.ordinal,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Threshold;
    use crate::rule::Rule;

    fn preprocess(rule: Rule) -> PreprocessedRule {
        PreprocessedRule::of(rule).unwrap()
    }

    #[test]
    fn test_covered_constraint_drops_matcher() {
        let rule = preprocess(Rule::new("http").with_dst_port("80"));
        let (low, high) = Bounds::ANY.split(&Threshold::DstPort(80)).unwrap();
        let (_, exact) = low.split(&Threshold::DstPort(79)).unwrap();

        let classifier = Classifier::of(&rule, &exact, 0).unwrap();
        assert!(classifier.matchers().is_empty());

        let classifier = Classifier::of(&rule, &low, 0).unwrap();
        assert_eq!(classifier.matchers().len(), 1);

        assert!(Classifier::of(&rule, &high, 0).is_none());
    }

    #[test]
    fn test_missing_aspect_never_matches() {
        let rule = preprocess(Rule::new("http").with_dst_port("80"));
        let (low, _) = Bounds::ANY.split(&Threshold::DstPort(80)).unwrap();
        let (_, exact) = low.split(&Threshold::DstPort(79)).unwrap();
        let classifier = Classifier::of(&rule, &exact, 0).unwrap();

        let request = ClassificationRequest::new().with_dst_port(80);
        let result = classifier.classify(&request, request.missing_aspects());
        assert_eq!(result.map(|r| &*r.name), Some("http"));

        let request = ClassificationRequest::new().with_src_port(80);
        assert!(classifier
            .classify(&request, request.missing_aspects())
            .is_none());
    }

    #[test]
    fn test_unconstrained_rule_matches_anything() {
        let rule = preprocess(Rule::new("catch-all"));
        let classifier = Classifier::of(&rule, &Bounds::ANY, 3).unwrap();
        let request = ClassificationRequest::new();
        let result = classifier.classify(&request, request.missing_aspects()).unwrap();
        assert_eq!(result.matched_aspects, 0);
    }

    #[test]
    fn test_sort_key_prefers_more_specific_rule() {
        let broad = preprocess(Rule::new("HTTP").with_dst_port("80"));
        let narrow = preprocess(
            Rule::new("HTTP_CUSTOM")
                .with_dst_port("80")
                .with_dst_address("192.168.0.1"),
        );
        let a = Classifier::of(&broad, &Bounds::ANY, 0).unwrap();
        let b = Classifier::of(&narrow, &Bounds::ANY, 1).unwrap();
        assert!(b.sort_key() < a.sort_key());

        let later = preprocess(Rule::new("late").with_position(1).with_dst_port("1"));
        let c = Classifier::of(&later, &Bounds::ANY, 2).unwrap();
        assert!(a.sort_key() < c.sort_key());
    }

    #[test]
    fn test_matcher_address() {
        let rule = preprocess(Rule::new("lan").with_src_address("10.0.0.0/8"));
        let classifier = Classifier::of(&rule, &Bounds::ANY, 0).unwrap();
        let inside = ClassificationRequest::new().with_src_address("10.1.2.3".parse().unwrap());
        let outside = ClassificationRequest::new().with_src_address("11.0.0.0".parse().unwrap());
        assert!(classifier.classify(&inside, inside.missing_aspects()).is_some());
        assert!(classifier.classify(&outside, outside.missing_aspects()).is_none());
    }
}
