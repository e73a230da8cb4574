use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::fmt;
use crate::matcher::anomaly::AnomalySummary;
use crate::matcher::summary::MatchSummary;

/// Match quality; lower is better. "No match" is expressed as `None`, never as a sentinel value.
pub type Score = f64;

/// One row of one input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowRef {
    pub table: usize,
    pub row: usize,
}

impl RowRef {
    pub fn new(table: usize, row: usize) -> Self {
        Self { table, row }
    }
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.row)
    }
}

/// A non-empty set of rows judged to be the same entity.
///
/// Members are kept sorted and deduplicated, so equality, hashing and
/// ordering all follow the canonical member order. Ordering two links
/// compares their first members first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RowLink {
    refs: Vec<RowRef>,
}

impl RowLink {
    /// Returns `None` for an empty member list.
    pub fn new(mut refs: Vec<RowRef>) -> Option<Self> {
        if refs.is_empty() {
            return None;
        }
        refs.sort_unstable();
        refs.dedup();
        Some(Self { refs })
    }

    pub fn singleton(r: RowRef) -> Self {
        Self { refs: vec![r] }
    }

    pub fn pair(a: RowRef, b: RowRef) -> Self {
        let mut refs = if a <= b { vec![a, b] } else { vec![b, a] };
        refs.dedup();
        Self { refs }
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    // A link always holds at least one member.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn first(&self) -> RowRef {
        self.refs[0]
    }

    pub fn refs(&self) -> &[RowRef] {
        &self.refs
    }

    pub fn contains(&self, r: &RowRef) -> bool {
        self.refs.binary_search(r).is_ok()
    }

    /// Members belonging to `table`, in row order.
    pub fn rows_in_table(&self, table: usize) -> impl Iterator<Item = usize> + '_ {
        self.refs.iter().filter(move |r| r.table == table).map(|r| r.row)
    }
}

impl fmt::Display for RowLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, r) in self.refs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", r)?;
        }
        write!(f, ")")
    }
}

/// Result of two-table matching.
///
/// Matched pairs carry `Some(score)`; singletons added for `require_all`
/// tables carry `None`. Iteration follows canonical link order.
#[derive(Debug, Clone, PartialEq)]
pub struct PairMatches {
    pub links: BTreeMap<RowLink, Option<Score>>,
    pub anomalies: AnomalySummary,
}

impl PairMatches {
    /// Number of links that pair two rows.
    pub fn pair_count(&self) -> usize {
        self.links.keys().filter(|l| l.len() == 2).count()
    }

    pub fn score(&self, link: &RowLink) -> Option<Score> {
        self.links.get(link).copied().flatten()
    }

    pub fn summary(&self, table_count: usize) -> MatchSummary {
        MatchSummary::from_links(table_count, self.links.keys())
    }
}

/// Result of N-table matching, links in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMatches {
    pub links: Vec<RowLink>,
    pub anomalies: AnomalySummary,
}

impl GroupMatches {
    pub fn summary(&self, table_count: usize) -> MatchSummary {
        MatchSummary::from_links(table_count, self.links.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Pairs(PairMatches),
    Groups(GroupMatches),
}

impl MatchResult {
    pub fn anomalies(&self) -> &AnomalySummary {
        match self {
            MatchResult::Pairs(p) => &p.anomalies,
            MatchResult::Groups(g) => &g.anomalies,
        }
    }

    /// Output links in canonical order, with the pair score where there is one.
    pub fn scored_links(&self) -> Vec<(&RowLink, Option<Score>)> {
        match self {
            MatchResult::Pairs(p) => p.links.iter().map(|(l, s)| (l, *s)).collect(),
            MatchResult::Groups(g) => g.links.iter().map(|l| (l, None)).collect(),
        }
    }

    pub fn summary(&self, table_count: usize) -> MatchSummary {
        match self {
            MatchResult::Pairs(p) => p.summary(table_count),
            MatchResult::Groups(g) => g.summary(table_count),
        }
    }
}

impl From<PairMatches> for MatchResult {
    fn from(p: PairMatches) -> Self {
        MatchResult::Pairs(p)
    }
}

impl From<GroupMatches> for MatchResult {
    fn from(g: GroupMatches) -> Self {
        MatchResult::Groups(g)
    }
}
