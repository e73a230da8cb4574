// src/matcher/links.rs
use ahash::AHashMap;
use crate::error::{Error, Result};
use crate::types::{RowLink, RowRef};

/// Disjoint sets over every row of every table.
///
/// Rows are addressed by a dense id (`offset[table] + row`); `parent` and
/// `size` are plain vectors indexed by that id, with path halving on find
/// and union by size.
#[derive(Debug, Clone)]
pub struct LinkSet {
    offsets: Vec<usize>,
    parent: Vec<usize>,
    size: Vec<usize>,
    set_count: usize,
}

impl LinkSet {
    /// One singleton set per row; `row_counts[t]` is the row count of table `t`.
    pub fn new(row_counts: &[usize]) -> Result<Self> {
        let mut offsets = Vec::with_capacity(row_counts.len() + 1);
        let mut total: usize = 0;
        offsets.push(0);
        for &count in row_counts {
            total = total.checked_add(count).ok_or_else(|| {
                Error::ResourceExhaustion("total row count overflows".to_string())
            })?;
            offsets.push(total);
        }

        let mut parent = Vec::new();
        parent.try_reserve_exact(total)?;
        parent.extend(0..total);
        let mut size = Vec::new();
        size.try_reserve_exact(total)?;
        size.resize(total, 1);

        Ok(Self { offsets, parent, size, set_count: total })
    }

    /// Total number of rows covered.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn set_count(&self) -> usize {
        self.set_count
    }

    pub fn contains(&self, r: RowRef) -> bool {
        r.table + 1 < self.offsets.len()
            && r.row < self.offsets[r.table + 1] - self.offsets[r.table]
    }

    fn id(&self, r: RowRef) -> usize {
        debug_assert!(self.contains(r), "row {} outside link set", r);
        self.offsets[r.table] + r.row
    }

    fn row_ref(&self, id: usize) -> RowRef {
        let table = self.offsets.partition_point(|&o| o <= id) - 1;
        RowRef::new(table, id - self.offsets[table])
    }

    fn find_id(&mut self, mut id: usize) -> usize {
        while self.parent[id] != id {
            let grandparent = self.parent[self.parent[id]];
            self.parent[id] = grandparent;
            id = grandparent;
        }
        id
    }

    /// Representative of the set holding `r`.
    ///
    /// # Panics
    /// If `r` lies outside the tables the set was built for.
    pub fn find(&mut self, r: RowRef) -> RowRef {
        let id = self.id(r);
        let root = self.find_id(id);
        self.row_ref(root)
    }

    /// Merges the sets of `a` and `b`. Returns false if they were already one set.
    pub fn union(&mut self, a: RowRef, b: RowRef) -> bool {
        let ra = self.find_id(self.id(a));
        let rb = self.find_id(self.id(b));
        if ra == rb {
            return false;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] { (ra, rb) } else { (rb, ra) };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        self.set_count -= 1;
        true
    }

    pub fn same_set(&mut self, a: RowRef, b: RowRef) -> bool {
        let ra = self.find_id(self.id(a));
        let rb = self.find_id(self.id(b));
        ra == rb
    }

    /// Every set, ordered by its first member, members in canonical order.
    pub fn all_sets(&mut self) -> impl Iterator<Item = RowLink> {
        let mut slots: AHashMap<usize, usize> = AHashMap::with_capacity(self.set_count);
        let mut groups: Vec<Vec<RowRef>> = Vec::with_capacity(self.set_count);
        for id in 0..self.parent.len() {
            let root = self.find_id(id);
            let slot = *slots.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(self.row_ref(id));
        }
        // Ids ascend in canonical order, so every group is already sorted.
        groups.into_iter().filter_map(RowLink::new)
    }
}
