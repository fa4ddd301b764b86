//! Decision tree construction and lookup.

use std::fmt;

use log::debug;

use super::{Bounds, ClassificationResult, Classifier, PreprocessedRule, Threshold};
use crate::error::{Error, Result};
use crate::request::ClassificationRequest;
use crate::value::{Address, Bound, Ordinal, RangeSet};

/// Default number of rules a node may hold before it is split.
pub const DEFAULT_MAX_LEAF_SIZE: usize = 8;

/// Default depth at which nodes become leaves regardless of their size.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Limits applied while building a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeOptions {
    pub max_leaf_size: usize,
    pub max_depth: usize,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Construction statistics of a decision tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeInfo {
    /// Number of rules the tree was built from, reversed rules included
    pub rules: usize,
    pub leaves: usize,
    /// Number of inner (split) nodes
    pub nodes: usize,
    /// Rules copied into both children because they ignore the split aspect
    pub choices: usize,
    pub min_depth: usize,
    pub max_depth: usize,
    pub sum_depth: usize,
    /// Matcher checks left in a leaf, summed over its classifiers
    pub min_comparisons: usize,
    pub max_comparisons: usize,
    pub sum_comparisons: usize,
    pub min_leaf_size: usize,
    pub max_leaf_size: usize,
    pub sum_leaf_size: usize,
}

impl TreeInfo {
    fn record_leaf(&mut self, depth: usize, size: usize, comparisons: usize) {
        if self.leaves == 0 {
            self.min_depth = depth;
            self.min_leaf_size = size;
            self.min_comparisons = comparisons;
        } else {
            self.min_depth = self.min_depth.min(depth);
            self.min_leaf_size = self.min_leaf_size.min(size);
            self.min_comparisons = self.min_comparisons.min(comparisons);
        }
        self.leaves += 1;
        self.max_depth = self.max_depth.max(depth);
        self.sum_depth += depth;
        self.max_leaf_size = self.max_leaf_size.max(size);
        self.sum_leaf_size += size;
        self.max_comparisons = self.max_comparisons.max(comparisons);
        self.sum_comparisons += comparisons;
    }

    fn avg(sum: usize, count: usize) -> f64 {
        if count == 0 {
            0.0
        } else {
            sum as f64 / count as f64
        }
    }

    pub fn avg_depth(&self) -> f64 {
        Self::avg(self.sum_depth, self.leaves)
    }

    pub fn avg_comparisons(&self) -> f64 {
        Self::avg(self.sum_comparisons, self.leaves)
    }

    pub fn avg_leaf_size(&self) -> f64 {
        Self::avg(self.sum_leaf_size, self.leaves)
    }
}

impl fmt::Display for TreeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rules: {}", self.rules)?;
        writeln!(f, "leaves: {}", self.leaves)?;
        writeln!(f, "nodes: {}", self.nodes)?;
        writeln!(f, "choices: {}", self.choices)?;
        writeln!(
            f,
            "depth: min {} / avg {:.2} / max {}",
            self.min_depth,
            self.avg_depth(),
            self.max_depth
        )?;
        writeln!(
            f,
            "comparisons: min {} / avg {:.2} / max {}",
            self.min_comparisons,
            self.avg_comparisons(),
            self.max_comparisons
        )?;
        write!(
            f,
            "leaf size: min {} / avg {:.2} / max {}",
            self.min_leaf_size,
            self.avg_leaf_size(),
            self.max_leaf_size
        )
    }
}

#[derive(Debug)]
enum Node {
    Split {
        threshold: Threshold,
        low: Box<Node>,
        high: Box<Node>,
    },
    Leaf(Box<[Classifier]>),
}

/// An immutable decision tree over a rule set.
///
/// Inner nodes compare one request aspect against a threshold; leaves hold
/// classifiers in evaluation order. A tree is never mutated after
/// construction and can be shared freely between threads.
#[derive(Debug)]
pub struct Tree {
    root: Node,
    info: TreeInfo,
}

impl Tree {
    /// A tree that classifies nothing.
    pub fn empty() -> Self {
        let mut info = TreeInfo::default();
        info.record_leaf(0, 0, 0);
        Self {
            root: Node::Leaf(Box::new([])),
            info,
        }
    }

    /// Build a tree from preprocessed rules.
    ///
    /// The slice index of a rule is its provider order, used as the last
    /// tie-breaker between classifiers of equal position.
    pub fn build(rules: &[PreprocessedRule], options: TreeOptions) -> Result<Self> {
        let mut builder = Builder {
            rules,
            max_leaf_size: options.max_leaf_size.max(1),
            max_depth: options.max_depth,
            info: TreeInfo {
                rules: rules.len(),
                ..TreeInfo::default()
            },
        };
        let members: Vec<usize> = (0..rules.len()).collect();
        let root = builder.node(members, Bounds::ANY, 0)?;
        Ok(Self {
            root,
            info: builder.info,
        })
    }

    /// Classify a request, returning the first matching classifier's result.
    pub fn classify(&self, request: &ClassificationRequest) -> Option<&ClassificationResult> {
        let missing = request.missing_aspects();
        let mut node = &self.root;
        loop {
            match node {
                Node::Split {
                    threshold,
                    low,
                    high,
                } => {
                    // A request without the split aspect fails every rule
                    // constraining it, so either side is correct.
                    node = if threshold.is_low(request).unwrap_or(true) {
                        low
                    } else {
                        high
                    };
                }
                Node::Leaf(classifiers) => {
                    return classifiers
                        .iter()
                        .find_map(|c| c.classify(request, missing));
                }
            }
        }
    }

    pub fn info(&self) -> &TreeInfo {
        &self.info
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::empty()
    }
}

/// Per-aspect envelopes of the rules at a node, used to size candidate splits.
struct Profile<T> {
    unconstrained: usize,
    mins: Vec<T>,
    maxs: Vec<T>,
}

impl<T: Ordinal> Profile<T> {
    fn new<'a, I>(values: I, bound: &Bound<T>) -> Self
    where
        I: Iterator<Item = Option<&'a RangeSet<T>>>,
    {
        let mut profile = Self {
            unconstrained: 0,
            mins: Vec::new(),
            maxs: Vec::new(),
        };
        for value in values {
            match value {
                None => profile.unconstrained += 1,
                Some(set) => {
                    if let Some(envelope) = set.envelope_within(bound) {
                        profile.mins.push(envelope.begin());
                        profile.maxs.push(envelope.end());
                    }
                }
            }
        }
        profile.mins.sort_unstable();
        profile.maxs.sort_unstable();
        profile
    }

    /// Number of rules in the low and high child when splitting at `t`.
    fn sizes(&self, t: T) -> (usize, usize) {
        let low = self.mins.partition_point(|m| *m <= t);
        let high = self.maxs.len() - self.maxs.partition_point(|m| *m <= t);
        (self.unconstrained + low, self.unconstrained + high)
    }
}

struct Profiles {
    protocol: Profile<u8>,
    src_port: Profile<u16>,
    dst_port: Profile<u16>,
    src_address: Profile<Address>,
    dst_address: Profile<Address>,
}

impl Profiles {
    fn new(rules: &[PreprocessedRule], members: &[usize], bounds: &Bounds) -> Self {
        Self {
            protocol: Profile::new(
                members.iter().map(|&i| rules[i].protocol.as_ref()),
                &bounds.protocol,
            ),
            src_port: Profile::new(
                members.iter().map(|&i| rules[i].src_port.as_ref()),
                &bounds.src_port,
            ),
            dst_port: Profile::new(
                members.iter().map(|&i| rules[i].dst_port.as_ref()),
                &bounds.dst_port,
            ),
            src_address: Profile::new(
                members.iter().map(|&i| rules[i].src_address.as_ref()),
                &bounds.src_address,
            ),
            dst_address: Profile::new(
                members.iter().map(|&i| rules[i].dst_address.as_ref()),
                &bounds.dst_address,
            ),
        }
    }

    fn sizes(&self, threshold: &Threshold) -> (usize, usize) {
        match *threshold {
            Threshold::Protocol(t) => self.protocol.sizes(t),
            Threshold::SrcPort(t) => self.src_port.sizes(t),
            Threshold::DstPort(t) => self.dst_port.sizes(t),
            Threshold::SrcAddress(t) => self.src_address.sizes(t),
            Threshold::DstAddress(t) => self.dst_address.sizes(t),
        }
    }
}

struct Builder<'a> {
    rules: &'a [PreprocessedRule],
    max_leaf_size: usize,
    max_depth: usize,
    info: TreeInfo,
}

impl Builder<'_> {
    fn node(&mut self, members: Vec<usize>, bounds: Bounds, depth: usize) -> Result<Node> {
        if members.len() <= self.max_leaf_size || depth >= self.max_depth {
            return Ok(self.leaf(&members, &bounds, depth));
        }
        let Some(threshold) = self.choose_split(&members, &bounds) else {
            return Ok(self.leaf(&members, &bounds, depth));
        };
        let (low_bounds, high_bounds) = bounds.split(&threshold).ok_or_else(|| {
            Error::Construction(format!("threshold {} outside of node bounds", threshold))
        })?;

        let aspect = threshold.aspect();
        let mut low = Vec::with_capacity(members.len());
        let mut high = Vec::with_capacity(members.len());
        for &i in &members {
            let rule = &self.rules[i];
            if !rule.constrains(aspect) {
                self.info.choices += 1;
                low.push(i);
                high.push(i);
                continue;
            }
            if rule.overlaps(&low_bounds, aspect) {
                low.push(i);
            }
            if rule.overlaps(&high_bounds, aspect) {
                high.push(i);
            }
        }
        drop(members);

        self.info.nodes += 1;
        let low = self.node(low, low_bounds, depth + 1)?;
        let high = self.node(high, high_bounds, depth + 1)?;
        Ok(Node::Split {
            threshold,
            low: Box::new(low),
            high: Box::new(high),
        })
    }

    /// Pick the threshold minimizing the larger child.
    ///
    /// Returns `None` if no candidate leaves both children smaller than the
    /// node. Ties go to the smaller total, then to aspect order and value.
    fn choose_split(&self, members: &[usize], bounds: &Bounds) -> Option<Threshold> {
        let mut candidates: Vec<Threshold> = members
            .iter()
            .flat_map(|&i| self.rules[i].thresholds.iter().copied())
            .filter(|t| bounds.admits(t))
            .collect();
        candidates.sort_unstable();
        candidates.dedup();
        if candidates.is_empty() {
            return None;
        }

        let profiles = Profiles::new(self.rules, members, bounds);
        let n = members.len();
        let mut best: Option<((usize, usize), Threshold)> = None;
        for threshold in candidates {
            let (low, high) = profiles.sizes(&threshold);
            if low >= n || high >= n {
                continue;
            }
            let score = (low.max(high), low + high);
            if best.as_ref().map_or(true, |(s, _)| score < *s) {
                best = Some((score, threshold));
            }
        }
        best.map(|(_, threshold)| threshold)
    }

    fn leaf(&mut self, members: &[usize], bounds: &Bounds, depth: usize) -> Node {
        let mut classifiers: Vec<Classifier> = members
            .iter()
            .filter_map(|&i| Classifier::of(&self.rules[i], bounds, i))
            .collect();
        classifiers.sort_by_key(Classifier::sort_key);

        let comparisons = classifiers.iter().map(|c| c.matchers().len()).sum();
        self.info.record_leaf(depth, classifiers.len(), comparisons);
        if depth >= self.max_depth && members.len() > self.max_leaf_size {
            debug!(
                "leaf at depth {} holds {} rules, depth limit reached",
                depth,
                members.len()
            );
        }
        Node::Leaf(classifiers.into_boxed_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;

    fn build(rules: Vec<Rule>, max_leaf_size: usize) -> Tree {
        let rules: Vec<PreprocessedRule> = rules
            .into_iter()
            .map(|r| PreprocessedRule::of(r).unwrap())
            .collect();
        Tree::build(
            &rules,
            TreeOptions {
                max_leaf_size,
                ..TreeOptions::default()
            },
        )
        .unwrap()
    }

    fn classify(tree: &Tree, request: &ClassificationRequest) -> Option<String> {
        tree.classify(request).map(|r| r.name.to_string())
    }

    fn dst(port: u16) -> ClassificationRequest {
        ClassificationRequest::new().with_dst_port(port)
    }

    #[test]
    fn test_empty_tree() {
        let tree = Tree::empty();
        assert_eq!(classify(&tree, &dst(80)), None);
        assert_eq!(tree.info().leaves, 1);
        assert_eq!(tree.info().nodes, 0);

        let tree = build(Vec::new(), 8);
        assert_eq!(classify(&tree, &dst(80)), None);
        assert_eq!(tree.info().rules, 0);
    }

    #[test]
    fn test_small_rule_set_is_single_leaf() {
        let tree = build(
            vec![
                Rule::new("http").with_dst_port("80"),
                Rule::new("https").with_dst_port("443"),
            ],
            8,
        );
        assert_eq!(tree.info().nodes, 0);
        assert_eq!(classify(&tree, &dst(80)).as_deref(), Some("http"));
        assert_eq!(classify(&tree, &dst(443)).as_deref(), Some("https"));
        assert_eq!(classify(&tree, &dst(8080)), None);
    }

    #[test]
    fn test_split_keeps_results() {
        let rules: Vec<Rule> = (0..64)
            .map(|i| {
                Rule::new(format!("port-{}", i))
                    .with_dst_port((1000 + i * 10).to_string())
                    .with_position(i as i32)
            })
            .collect();
        let tree = build(rules, 1);
        assert!(tree.info().nodes > 0);
        assert!(tree.info().max_leaf_size <= 1);
        for i in 0..64u16 {
            assert_eq!(
                classify(&tree, &dst(1000 + i * 10)),
                Some(format!("port-{}", i))
            );
            assert_eq!(classify(&tree, &dst(1001 + i * 10)), None);
        }
    }

    #[test]
    fn test_leaf_classifiers_drop_covered_matchers() {
        let rules: Vec<Rule> = (0..16)
            .map(|i| Rule::new(format!("p{}", i)).with_dst_port(i.to_string()))
            .collect();
        let tree = build(rules, 1);
        // Port 0 ends up alone in the bound [0, 0].
        assert_eq!(tree.info().min_comparisons, 0);
        assert!(tree.info().max_comparisons <= 1);
        assert_eq!(classify(&tree, &dst(7)).as_deref(), Some("p7"));
        assert_eq!(classify(&tree, &ClassificationRequest::new()), None);
    }

    #[test]
    fn test_unconstrained_rules_are_choices() {
        let mut rules: Vec<Rule> = (0..10)
            .map(|i| {
                Rule::new(format!("p{}", i))
                    .with_dst_port((100 * (i + 1)).to_string())
                    .with_position(1)
            })
            .collect();
        rules.push(Rule::new("fallback").with_position(2));
        let tree = build(rules, 2);
        assert!(tree.info().choices > 0);
        assert_eq!(classify(&tree, &dst(300)).as_deref(), Some("p2"));
        assert_eq!(classify(&tree, &dst(301)).as_deref(), Some("fallback"));
        assert_eq!(
            classify(&tree, &ClassificationRequest::new()).as_deref(),
            Some("fallback")
        );
    }

    #[test]
    fn test_identical_rules_form_oversized_leaf() {
        let rules: Vec<Rule> = (0..20)
            .map(|i| Rule::new(format!("dup{}", i)).with_dst_port("80").with_position(i))
            .collect();
        let tree = build(rules, 4);
        assert_eq!(tree.info().leaves, 1);
        assert_eq!(tree.info().max_leaf_size, 20);
        assert_eq!(classify(&tree, &dst(80)).as_deref(), Some("dup0"));
    }

    #[test]
    fn test_missing_aspect_descends_low_and_fails_closed() {
        let rules: Vec<Rule> = (0..32)
            .map(|i| {
                Rule::new(format!("src{}", i))
                    .with_src_port((2000 + i).to_string())
                    .with_dst_port("80")
            })
            .collect();
        let tree = build(rules, 2);
        let request = ClassificationRequest::new().with_src_port(2005);
        assert_eq!(classify(&tree, &request), None);
        let request = request.with_dst_port(80);
        assert_eq!(classify(&tree, &request).as_deref(), Some("src5"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let rules: Vec<Rule> = (0..200)
            .map(|i| {
                Rule::new(format!("r{}", i))
                    .with_protocol(if i % 2 == 0 { "tcp" } else { "udp" })
                    .with_dst_address(format!("10.0.{}.0/24", i))
                    .with_dst_port((i % 7 + 1).to_string())
            })
            .collect();
        let a = build(rules.clone(), 4);
        let b = build(rules, 4);
        assert_eq!(a.info(), b.info());
    }

    #[test]
    fn test_tree_info_display() {
        let tree = build(vec![Rule::new("a").with_dst_port("1")], 8);
        let report = tree.info().to_string();
        assert!(report.contains("leaves: 1"));
        assert!(report.contains("leaf size: min 1 / avg 1.00 / max 1"));
    }
}
