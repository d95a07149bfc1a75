//! Tiny generic marker traits shared by the stand store (`forest-stand`),
//! the selection engine (`forest-selection`), and the event tree
//! (`forest-tree`). Kept dependency-free beyond `forest-core` so that none of
//! the three crates that implement these traits need to depend on each other.
#![allow(dead_code)]

/// Types that support the evaluator's finalize-before-branch discipline
/// (spec §4.6 step 3, §9 "Deep-copy on branch fork").
///
/// `finalize` marks the implementor's backing storage read-only and returns a
/// shallow clone that shares that storage; any later mutation on either the
/// original or the clone must copy its own column first via
/// [`Finalizable::clone_if_shared`]'s effect (tracked by implementors, not by
/// this trait). The evaluator calls `finalize` on every node's payload before
/// fanning out to branches, so siblings start from identical, cheaply-shared
/// state.
pub trait Finalizable {
    /// Marks storage read-only and returns a shallow, storage-sharing clone.
    fn finalize(&mut self) -> Self;
    /// True once `finalize` has been called at least once.
    fn is_finalized(&self) -> bool;
}

/// A named, read-only view over a rectangular data block's columns, addressed
/// by variable name as strings flow in from a declarative selection set
/// (spec §4.1). Implemented by `forest-stand`'s reference-tree and stratum
/// stores; consumed generically by `forest-selection`'s binary search so that
/// neither crate depends on the other's concrete row type.
pub trait ColumnSource {
    /// Number of rows in the block.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Looks up a named numeric column. Returns `None` for unknown names,
    /// which the selection engine treats as an unbounded (`+∞`) cap per the
    /// Open Questions resolution in spec §9.
    fn column(&self, name: &str) -> Option<&[f64]>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Block {
        f: Vec<f64>,
        finalized: bool,
    }

    impl Finalizable for Block {
        fn finalize(&mut self) -> Self {
            self.finalized = true;
            Block {
                f: self.f.clone(),
                finalized: true,
            }
        }
        fn is_finalized(&self) -> bool {
            self.finalized
        }
    }

    impl ColumnSource for Block {
        fn len(&self) -> usize {
            self.f.len()
        }
        fn column(&self, name: &str) -> Option<&[f64]> {
            match name {
                "f" => Some(&self.f),
                _ => None,
            }
        }
    }

    #[test]
    fn finalize_shares_and_marks() {
        let mut b = Block { f: vec![1.0, 2.0], finalized: false };
        let clone = b.finalize();
        assert!(b.is_finalized());
        assert!(clone.is_finalized());
        assert_eq!(clone.column("f"), Some(&[1.0, 2.0][..]));
        assert_eq!(b.column("missing"), None);
    }
}
