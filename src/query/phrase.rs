//! Phrase matching over per-term position streams
//!
//! Term `i` of the phrase must occur at `p + i` for some start position `p`.
//! Subtracting the term index from each position ("adjusted" position) turns
//! this into: all terms' adjusted positions are equal.
//!
//! ```text
//!        hello world program
//! orig:      0     1       2
//! adj:       0     0       0
//! ```
//!
//! Every match is recorded as one column of a `PositionTable`: per term, the
//! absolute position and which occurrence (0-based) of the term it was. The
//! occurrence index later selects the offset pair to highlight.

use crate::index::iterator::PopIterator;
use crate::types::Position;

/// One matched occurrence of a term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionInfo {
    pub pos: Position,
    /// Index of this occurrence among the term's positions in the document
    pub term_appearance: u32,
}

impl PositionInfo {
    pub fn new(pos: Position, term_appearance: u32) -> Self {
        Self {
            pos,
            term_appearance,
        }
    }
}

/// Row per phrase term, column per phrase match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionTable {
    rows: Vec<Vec<PositionInfo>>,
}

impl PositionTable {
    pub fn new(n_rows: usize) -> Self {
        Self {
            rows: vec![Vec::new(); n_rows],
        }
    }

    pub fn append(&mut self, row: usize, pos: Position, term_appearance: u32) {
        self.rows[row].push(PositionInfo::new(pos, term_appearance));
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of phrase matches
    pub fn num_cols(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.num_cols() == 0
    }

    pub fn row(&self, row: usize) -> &[PositionInfo] {
        &self.rows[row]
    }

    pub fn rows(&self) -> &[Vec<PositionInfo>] {
        &self.rows
    }

    /// Start positions of every match (row 0)
    pub fn match_starts(&self) -> Vec<Position> {
        self.rows
            .first()
            .map(|row| row.iter().map(|info| info.pos).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct LastPopped {
    pos: i64,
    term_appearance: u32,
}

/// Finds all phrase matches in one document, given one position iterator
/// per phrase term (in phrase order).
pub struct PhraseQueryProcessor<T> {
    iterators: Vec<T>,
    last_popped: Vec<LastPopped>,
}

impl<T: PopIterator<Item = Position>> PhraseQueryProcessor<T> {
    pub fn new(iterators: Vec<T>) -> Self {
        let n = iterators.len();
        Self {
            iterators,
            last_popped: vec![LastPopped::default(); n],
        }
    }

    pub fn num_terms(&self) -> usize {
        self.iterators.len()
    }

    /// Consumes the position streams; an empty table means no match
    pub fn process(mut self) -> PositionTable {
        match self.iterators.len() {
            0 => PositionTable::new(0),
            2 => self.process_two_term(),
            _ => self.process_general(),
        }
    }

    /// Two-pointer merge; term 1 positions are compared shifted by one
    fn process_two_term(&mut self) -> PositionTable {
        let mut table = PositionTable::new(2);
        let (head, tail) = self.iterators.split_at_mut(1);
        let (it0, it1) = (&mut head[0], &mut tail[0]);

        // Sentinels that can never be equal to each other or to a real
        // adjusted position
        let mut pos0: i64 = -100;
        let mut pos1: i64 = -200;
        let mut apr0: i64 = -1;
        let mut apr1: i64 = -1;

        loop {
            if pos0 < pos1 {
                if it0.is_end() {
                    break;
                }
                pos0 = it0.pop() as i64;
                apr0 += 1;
            } else if pos0 > pos1 {
                if it1.is_end() {
                    break;
                }
                pos1 = it1.pop() as i64 - 1;
                apr1 += 1;
            } else {
                table.append(0, pos0 as Position, apr0 as u32);
                table.append(1, (pos1 + 1) as Position, apr1 as u32);

                if it0.is_end() || it1.is_end() {
                    break;
                }
                pos0 = it0.pop() as i64;
                apr0 += 1;
                pos1 = it1.pop() as i64 - 1;
                apr1 += 1;
            }
        }

        table
    }

    fn process_general(&mut self) -> PositionTable {
        let mut table = PositionTable::new(self.iterators.len());

        if !self.initialize_last_popped() {
            return table;
        }

        loop {
            let max_adjusted = self.find_max_adjusted_last_popped();
            if !self.move_popped_beyond(max_adjusted) {
                break;
            }

            if self.is_popped_match(max_adjusted) {
                self.append_position_col(&mut table);
                if !self.move_popped_beyond(max_adjusted + 1) {
                    break;
                }
            }
        }

        table
    }

    /// Pop the first position of every term; false if any stream is empty
    fn initialize_last_popped(&mut self) -> bool {
        for (it, last) in self.iterators.iter_mut().zip(self.last_popped.iter_mut()) {
            if it.is_end() {
                return false;
            }
            *last = LastPopped {
                pos: it.pop() as i64,
                term_appearance: 0,
            };
        }
        true
    }

    fn find_max_adjusted_last_popped(&self) -> i64 {
        self.last_popped
            .iter()
            .enumerate()
            .map(|(i, last)| last.pos - i as i64)
            .max()
            .unwrap_or(0)
    }

    /// Advance every term until its adjusted position reaches `max_adjusted`.
    /// False if some stream runs out first.
    fn move_popped_beyond(&mut self, max_adjusted: i64) -> bool {
        (0..self.iterators.len()).all(|i| self.move_term_beyond(i, max_adjusted))
    }

    fn move_term_beyond(&mut self, i: usize, max_adjusted: i64) -> bool {
        let it = &mut self.iterators[i];
        let last = &mut self.last_popped[i];
        let offset = i as i64;

        while !it.is_end() && last.pos - offset < max_adjusted {
            last.pos = it.pop() as i64;
            last.term_appearance += 1;
        }

        last.pos - offset >= max_adjusted
    }

    fn is_popped_match(&self, max_adjusted: i64) -> bool {
        self.last_popped
            .iter()
            .enumerate()
            .all(|(i, last)| last.pos - i as i64 == max_adjusted)
    }

    fn append_position_col(&self, table: &mut PositionTable) {
        for (i, last) in self.last_popped.iter().enumerate() {
            table.append(i, last.pos as Position, last.term_appearance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::iterator::{CompressedPositionIterator, VecPopIterator};
    use crate::index::posting::Posting;

    fn processor(lists: &[&[Position]]) -> PhraseQueryProcessor<VecPopIterator<Position>> {
        PhraseQueryProcessor::new(
            lists
                .iter()
                .map(|list| VecPopIterator::new(list.to_vec()))
                .collect(),
        )
    }

    fn starts(lists: &[&[Position]]) -> Vec<Position> {
        processor(lists).process().match_starts()
    }

    #[test]
    fn test_simple_match() {
        // 3, 4 is a match
        assert_eq!(starts(&[&[1, 3, 5], &[4]]), vec![3]);
    }

    #[test]
    fn test_step_by_step() {
        let mut qp = processor(&[&[1, 3, 5], &[4]]);
        assert!(qp.initialize_last_popped());
        assert_eq!(qp.find_max_adjusted_last_popped(), 3);

        assert!(qp.move_popped_beyond(1));
        assert_eq!(qp.find_max_adjusted_last_popped(), 3);

        // Stays where it is
        assert!(qp.move_popped_beyond(1));
        assert_eq!(qp.find_max_adjusted_last_popped(), 3);

        assert!(qp.move_popped_beyond(3));
        assert_eq!(qp.find_max_adjusted_last_popped(), 3);
        assert!(qp.is_popped_match(3));

        // No 6 in the second list
        assert!(!qp.move_popped_beyond(5));
    }

    #[test]
    fn test_empty_lists() {
        assert!(starts(&[&[], &[]]).is_empty());
        assert!(starts(&[&[10], &[]]).is_empty());
        assert!(starts(&[&[], &[1], &[2]]).is_empty());
    }

    #[test]
    fn test_no_matches() {
        assert!(starts(&[&[1, 8, 20], &[0, 7, 19]]).is_empty());
    }

    #[test]
    fn test_same_position_is_not_a_phrase() {
        assert!(starts(&[&[0], &[0]]).is_empty());
    }

    #[test]
    fn test_multiple_matches() {
        assert_eq!(
            starts(&[&[10, 20, 100, 1000], &[11, 21, 88, 101]]),
            vec![10, 20, 100]
        );
    }

    #[test]
    fn test_two_term_appearances() {
        let table = processor(&[&[10, 20, 100, 1000], &[11, 21, 88, 101]]).process();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_cols(), 3);
        assert_eq!(
            table.row(0),
            &[
                PositionInfo::new(10, 0),
                PositionInfo::new(20, 1),
                PositionInfo::new(100, 2)
            ]
        );
        assert_eq!(
            table.row(1),
            &[
                PositionInfo::new(11, 0),
                PositionInfo::new(21, 1),
                PositionInfo::new(101, 3)
            ]
        );
    }

    #[test]
    fn test_three_terms() {
        let table = processor(&[&[0, 5, 9], &[1, 6, 20], &[2, 3, 7]]).process();
        assert_eq!(table.match_starts(), vec![0, 5]);
        assert_eq!(table.row(2), &[PositionInfo::new(2, 0), PositionInfo::new(7, 2)]);

        assert!(starts(&[&[0], &[2], &[3]]).is_empty());
    }

    #[test]
    fn test_single_term_matches_every_position() {
        assert_eq!(starts(&[&[2, 4, 6]]), vec![2, 4, 6]);
    }

    #[test]
    fn test_general_agrees_with_two_term() {
        let a: &[Position] = &[1, 2, 3, 7, 8, 15, 16, 30];
        let b: &[Position] = &[2, 3, 4, 9, 16, 17, 31];

        let two = processor(&[a, b]).process();
        let general = processor(&[a, b]).process_general();
        assert_eq!(two, general);
        assert_eq!(two.match_starts(), vec![1, 2, 3, 8, 15, 16, 30]);
    }

    #[test]
    fn test_compressed_position_iterators() {
        let p0 = Posting::with_positions(0, 3, vec![], vec![1, 3, 5]).encode_positions();
        let p1 = Posting::with_positions(0, 1, vec![], vec![4]).encode_positions();

        let qp = PhraseQueryProcessor::new(vec![
            CompressedPositionIterator::new(p0.as_bytes(), 0, p0.len()),
            CompressedPositionIterator::new(p1.as_bytes(), 0, p1.len()),
        ]);
        assert_eq!(qp.process().match_starts(), vec![3]);
    }
}
