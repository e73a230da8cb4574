// src/matcher/summary.rs
use bit_vec::BitVec;
use crate::types::RowLink;

/// Which output links involve which tables.
///
/// `membership[t]` has one bit per output link, set when the link holds at
/// least one row of table `t`. This is the shape a join table needs to
/// flag, per input table, the output rows it contributed to.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSummary {
    /// Links with more than one member.
    pub match_count: usize,
    /// Output links in total, singletons included.
    pub link_count: usize,
    pub membership: Vec<BitVec>,
}

impl MatchSummary {
    pub fn from_links<'a, I>(table_count: usize, links: I) -> Self
    where
        I: IntoIterator<Item = &'a RowLink>,
    {
        let links: Vec<&RowLink> = links.into_iter().collect();
        let mut membership = vec![BitVec::from_elem(links.len(), false); table_count];
        let mut match_count = 0;
        for (i, link) in links.iter().enumerate() {
            if link.len() > 1 {
                match_count += 1;
            }
            for r in link.refs() {
                if let Some(bits) = membership.get_mut(r.table) {
                    bits.set(i, true);
                }
            }
        }
        Self {
            match_count,
            link_count: links.len(),
            membership,
        }
    }

    /// Number of output links each table takes part in.
    pub fn table_subset_sizes(&self) -> Vec<usize> {
        self.membership
            .iter()
            .map(|bits| bits.iter().filter(|b| *b).count())
            .collect()
    }

    /// Tables present in some but not all output links; only for these does
    /// a per-table subset carry information.
    pub fn partial_tables(&self) -> Vec<usize> {
        self.table_subset_sizes()
            .into_iter()
            .enumerate()
            .filter(|(_, n)| *n > 0 && *n < self.link_count)
            .map(|(t, _)| t)
            .collect()
    }
}
