//! Document-at-a-time query processing
//!
//! One posting list iterator per query term, AND semantics. The merge is
//! specialized by term count:
//! - 1 term: straight iteration
//! - 2 terms: merge-join, the lagging side seeks with `skip_forward`
//! - N terms: find the max current doc id, seek every iterator to it, match
//!   when all land on it
//!
//! Matching documents are scored with BM25 and kept in a bounded min-heap of
//! size `k`.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::phrase::{PhraseQueryProcessor, PositionTable};
use super::result::ResultEntry;
use super::scoring::Bm25Similarity;
use crate::index::doc_lengths::DocLengthStore;
use crate::index::iterator::PostingListIterator;
use crate::types::DocId;
use crate::Result;

pub struct QueryProcessor<'a, 's> {
    iterators: Vec<PostingListIterator<'a>>,
    doc_lengths: &'s DocLengthStore,
    similarity: Bm25Similarity,
    idfs: Vec<f64>,
    k: usize,
    is_phrase: bool,
    heap: BinaryHeap<Reverse<ResultEntry<'a>>>,
}

impl<'a, 's> QueryProcessor<'a, 's> {
    /// `n_total_docs` is the corpus size used for idf
    pub fn new(
        iterators: Vec<PostingListIterator<'a>>,
        doc_lengths: &'s DocLengthStore,
        n_total_docs: usize,
        k: usize,
        is_phrase: bool,
    ) -> Self {
        let similarity = Bm25Similarity::new(doc_lengths.avg_length());
        let idfs = iterators
            .iter()
            .map(|it| similarity.idf(n_total_docs, it.size()))
            .collect();

        Self {
            iterators,
            doc_lengths,
            similarity,
            idfs,
            k,
            is_phrase,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
        }
    }

    /// Top-k entries, highest score first
    pub fn process(mut self) -> Result<Vec<ResultEntry<'a>>> {
        if self.k == 0 || self.iterators.is_empty() {
            return Ok(Vec::new());
        }

        log::debug!(
            "Processing {}-term query (k={}, phrase={})",
            self.iterators.len(),
            self.k,
            self.is_phrase
        );

        match self.iterators.len() {
            1 => self.process_single_term()?,
            2 => self.process_two_term()?,
            _ => self.process_multiple_terms()?,
        }

        Ok(self.sort_heap())
    }

    fn process_single_term(&mut self) -> Result<()> {
        while !self.iterators[0].is_end() {
            let doc_id = self.iterators[0].doc_id();
            self.rank_doc(doc_id, PositionTable::default())?;
            self.iterators[0].advance();
        }
        Ok(())
    }

    fn process_two_term(&mut self) -> Result<()> {
        while !self.iterators[0].is_end() && !self.iterators[1].is_end() {
            let doc0 = self.iterators[0].doc_id();
            let doc1 = self.iterators[1].doc_id();

            match doc0.cmp(&doc1) {
                Ordering::Greater => self.iterators[1].skip_forward(doc0),
                Ordering::Less => self.iterators[0].skip_forward(doc1),
                Ordering::Equal => {
                    self.handle_found_doc(doc0)?;
                    self.iterators[0].advance();
                    self.iterators[1].advance();
                }
            }
        }
        Ok(())
    }

    fn process_multiple_terms(&mut self) -> Result<()> {
        // Loop invariant: every match before the iterators has been handled
        while let Some(max_doc_id) = self.find_max() {
            if self.find_match(max_doc_id)? {
                break;
            }
        }
        Ok(())
    }

    /// Largest current doc id; `None` once any iterator is exhausted
    fn find_max(&self) -> Option<DocId> {
        let mut max_doc_id = 0;
        for it in &self.iterators {
            if it.is_end() {
                return None;
            }
            max_doc_id = max_doc_id.max(it.doc_id());
        }
        Some(max_doc_id)
    }

    /// Seek every iterator to `max_doc_id`. Returns true once an iterator is
    /// exhausted.
    fn find_match(&mut self, max_doc_id: DocId) -> Result<bool> {
        for it in self.iterators.iter_mut() {
            it.skip_forward(max_doc_id);
            if it.is_end() {
                return Ok(true);
            }
            if it.doc_id() != max_doc_id {
                return Ok(false);
            }
        }

        self.handle_found_doc(max_doc_id)?;
        for it in self.iterators.iter_mut() {
            it.advance();
        }
        Ok(false)
    }

    fn phrase_active(&self) -> bool {
        self.is_phrase && self.iterators.len() > 1
    }

    fn handle_found_doc(&mut self, doc_id: DocId) -> Result<()> {
        if self.phrase_active() {
            let position_table = self.find_phrase();
            if !position_table.is_empty() {
                self.rank_doc(doc_id, position_table)?;
            }
            Ok(())
        } else {
            self.rank_doc(doc_id, PositionTable::default())
        }
    }

    fn find_phrase(&self) -> PositionTable {
        let positions = self.iterators.iter().map(|it| it.position_begin()).collect();
        PhraseQueryProcessor::new(positions).process()
    }

    fn score_current(&self, doc_length: u32) -> f64 {
        self.iterators
            .iter()
            .zip(&self.idfs)
            .map(|(it, &idf)| self.similarity.score(idf, it.term_freq(), doc_length))
            .sum()
    }

    fn rank_doc(&mut self, doc_id: DocId, position_table: PositionTable) -> Result<()> {
        let doc_length = self.doc_lengths.length(doc_id)?;
        let score = self.score_current(doc_length);

        if self.heap.len() < self.k {
            self.insert_to_heap(doc_id, score, position_table);
        } else if self
            .heap
            .peek()
            .is_some_and(|Reverse(min)| score > min.score)
        {
            self.heap.pop();
            self.insert_to_heap(doc_id, score, position_table);
        }
        Ok(())
    }

    fn insert_to_heap(&mut self, doc_id: DocId, score: f64, position_table: PositionTable) {
        let offset_iters = self
            .iterators
            .iter()
            .map(|it| it.offset_pairs_begin())
            .collect();
        let entry = ResultEntry::new(
            doc_id,
            score,
            offset_iters,
            position_table,
            self.phrase_active(),
        );
        self.heap.push(Reverse(entry));
    }

    fn sort_heap(self) -> Vec<ResultEntry<'a>> {
        // Ascending by `Reverse`, i.e. descending by score
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(entry)| entry)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::analyzer::Analyzer;
    use crate::index::inverted_index::InvertedIndex;
    use crate::index::posting::Posting;
    use crate::index::posting_list::PostingList;
    use crate::types::OffsetPairs;
    use crate::SearchError;

    fn offsets() -> OffsetPairs {
        (0..3).map(|i| (i * 10, i * 10 + 4)).collect()
    }

    fn list_of(doc_ids: &[DocId], skip_span: usize) -> PostingList {
        let mut pl = PostingList::with_skip_span(skip_span);
        for &doc_id in doc_ids {
            pl.add_posting(&Posting::with_positions(doc_id, 3, offsets(), vec![0, 2, 4]))
                .unwrap();
        }
        pl
    }

    /// Five docs, lengths 50, 40, 30, 20, 10
    fn doc_lengths(n: u32) -> DocLengthStore {
        let mut store = DocLengthStore::new();
        for i in 0..n {
            store.add_length(i, (n - i) * 10).unwrap();
        }
        store
    }

    fn doc_ids(entries: &[ResultEntry<'_>]) -> Vec<DocId> {
        entries.iter().map(|e| e.doc_id).collect()
    }

    #[test]
    fn test_shorter_documents_rank_higher() {
        let lists: Vec<PostingList> = (0..3).map(|_| list_of(&[0, 1, 2, 3, 4], 100)).collect();
        let store = doc_lengths(5);

        let run = |n_lists: usize, k: usize| {
            let iters = lists[..n_lists].iter().map(PostingList::begin).collect();
            let result = QueryProcessor::new(iters, &store, 100, k, false)
                .process()
                .unwrap();
            doc_ids(&result)
        };

        assert_eq!(run(2, 5), vec![4, 3, 2, 1, 0]);
        assert_eq!(run(2, 2), vec![4, 3]);
        assert_eq!(run(1, 2), vec![4, 3]);
        assert_eq!(run(3, 2), vec![4, 3]);
        assert_eq!(run(3, 50), vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_scores_are_non_increasing() {
        let pl = list_of(&[0, 1, 2, 3, 4], 2);
        let store = doc_lengths(5);

        let result = QueryProcessor::new(vec![pl.begin()], &store, 5, 5, false)
            .process()
            .unwrap();
        assert_eq!(result.len(), 5);
        assert!(result.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_zero_results_requested() {
        let pl = list_of(&[0, 1], 100);
        let store = doc_lengths(2);

        let result = QueryProcessor::new(vec![pl.begin()], &store, 2, 0, false)
            .process()
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_intersection_with_skips() {
        let a: Vec<DocId> = (0..500).map(|i| i * 2).collect();
        let b: Vec<DocId> = (0..300).map(|i| i * 3).collect();
        let c: Vec<DocId> = (0..200).map(|i| i * 5).collect();
        let (pa, pb, pc) = (list_of(&a, 7), list_of(&b, 7), list_of(&c, 7));
        let store = doc_lengths(1000);

        let two = QueryProcessor::new(vec![pa.begin(), pb.begin()], &store, 1000, 1000, false)
            .process()
            .unwrap();
        let mut got = doc_ids(&two);
        got.sort_unstable();
        let expected: Vec<DocId> = (0..1000).filter(|d| d % 6 == 0 && *d < 898).collect();
        assert_eq!(got, expected);

        let three = QueryProcessor::new(
            vec![pa.begin(), pb.begin(), pc.begin()],
            &store,
            1000,
            1000,
            false,
        )
        .process()
        .unwrap();
        let mut got = doc_ids(&three);
        got.sort_unstable();
        let expected: Vec<DocId> = (0..1000).filter(|d| d % 30 == 0 && *d < 898).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_disjoint_lists() {
        let (pa, pb, pc) = (list_of(&[1, 3], 100), list_of(&[2, 4], 100), list_of(&[1, 2], 100));
        let store = doc_lengths(5);

        for iters in [vec![pa.begin(), pb.begin()], vec![pa.begin(), pb.begin(), pc.begin()]] {
            let result = QueryProcessor::new(iters, &store, 5, 10, false).process().unwrap();
            assert!(result.is_empty());
        }
    }

    #[test]
    fn test_phrase_filtering() {
        let analyzer = Analyzer::default();
        let bodies = ["hello world", "world hello", "hello big world", "say hello world again"];
        let mut index = InvertedIndex::new(2);
        let mut store = DocLengthStore::new();
        for (doc_id, body) in bodies.iter().enumerate() {
            let info = analyzer.analyze(body);
            index.add_document(doc_id as DocId, &info).unwrap();
            store.add_length(doc_id as DocId, info.length()).unwrap();
        }

        let run = |is_phrase: bool| {
            let iters = index.find_iterators(&["hello", "world"]).unwrap();
            let mut ids = doc_ids(
                &QueryProcessor::new(iters, &store, bodies.len(), 10, is_phrase)
                    .process()
                    .unwrap(),
            );
            ids.sort_unstable();
            ids
        };

        assert_eq!(run(false), vec![0, 1, 2, 3]);
        assert_eq!(run(true), vec![0, 3]);

        let iters = index.find_iterators(&["say", "hello", "world"]).unwrap();
        let result = QueryProcessor::new(iters, &store, bodies.len(), 10, true)
            .process()
            .unwrap();
        assert_eq!(doc_ids(&result), vec![3]);
        assert_eq!(
            result[0].offsets_for_highlighting().unwrap(),
            vec![vec![(0, 2)], vec![(4, 8)], vec![(10, 14)]]
        );
    }

    #[test]
    fn test_single_term_phrase_highlights_everything() {
        let pl = list_of(&[0], 100);
        let store = doc_lengths(1);

        let result = QueryProcessor::new(vec![pl.begin()], &store, 1, 1, true)
            .process()
            .unwrap();
        assert!(!result[0].is_phrase);
        assert_eq!(result[0].offsets_for_highlighting().unwrap(), vec![offsets()]);
    }

    #[test]
    fn test_missing_doc_length() {
        let pl = list_of(&[0, 9], 100);
        let store = doc_lengths(2);

        let err = QueryProcessor::new(vec![pl.begin()], &store, 2, 5, false).process();
        assert!(matches!(err, Err(SearchError::UnknownDocument(9))));
    }
}
