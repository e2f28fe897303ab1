//! Term -> posting list map
//!
//! Built by a single writer through `add_document`, then shared read-only by
//! queries. Posting lists are created lazily with the index's skip span.

use ahash::{AHashMap, AHashSet};

use super::iterator::PostingListIterator;
use super::posting::Posting;
use super::posting_list::PostingList;
use super::skip_index::DEFAULT_SKIP_SPAN;
use crate::types::{DocId, DocInfo, Term};
use crate::{Result, SearchError};

#[derive(Debug, Clone)]
pub struct InvertedIndex {
    postings: AHashMap<Term, PostingList>,
    skip_span: usize,
}

impl Default for InvertedIndex {
    fn default() -> Self {
        Self::new(DEFAULT_SKIP_SPAN)
    }
}

impl InvertedIndex {
    pub fn new(skip_span: usize) -> Self {
        assert!(skip_span > 0, "skip_span must be positive");
        Self {
            postings: AHashMap::new(),
            skip_span,
        }
    }

    /// Rebuild from already encoded posting lists (snapshot load)
    pub fn from_posting_lists(
        skip_span: usize,
        lists: impl IntoIterator<Item = (Term, PostingList)>,
    ) -> Self {
        let mut index = Self::new(skip_span);
        index.postings.extend(lists);
        index
    }

    pub fn skip_span(&self) -> usize {
        self.skip_span
    }

    /// Fold one document's tokens into the posting lists.
    ///
    /// Doc ids must be strictly increasing across calls.
    pub fn add_document(&mut self, doc_id: DocId, doc: &DocInfo) -> Result<()> {
        if doc.tokens.len() != doc.offset_pairs.len() || doc.tokens.len() != doc.positions.len() {
            return Err(SearchError::ConstructionInvariant(format!(
                "doc {} has {} tokens, {} offset rows and {} position rows",
                doc_id,
                doc.tokens.len(),
                doc.offset_pairs.len(),
                doc.positions.len()
            )));
        }

        // Validate every posting before touching any list, so a rejected
        // document leaves the index unchanged
        let mut seen = AHashSet::with_capacity(doc.tokens.len());
        let postings = doc
            .tokens
            .iter()
            .zip(&doc.offset_pairs)
            .zip(&doc.positions)
            .map(|((term, offsets), positions)| {
                let posting = Posting::with_positions(
                    doc_id,
                    offsets.len() as u32,
                    offsets.clone(),
                    positions.clone(),
                );
                posting.validate()?;
                if !seen.insert(term.as_str()) {
                    return Err(SearchError::ConstructionInvariant(format!(
                        "doc {} lists term {:?} twice",
                        doc_id, term
                    )));
                }
                if let Some(list) = self.postings.get(term).filter(|list| !list.is_empty()) {
                    if doc_id <= list.last_doc_id() {
                        return Err(SearchError::ConstructionInvariant(format!(
                            "doc id {} is not greater than last doc id {} of term {:?}",
                            doc_id,
                            list.last_doc_id(),
                            term
                        )));
                    }
                }
                Ok((term, posting))
            })
            .collect::<Result<Vec<_>>>()?;

        for (term, posting) in postings {
            let skip_span = self.skip_span;
            self.postings
                .entry(term.clone())
                .or_insert_with(|| PostingList::with_skip_span(skip_span))
                .add_posting(&posting)?;
        }

        Ok(())
    }

    pub fn get(&self, term: &str) -> Option<&PostingList> {
        self.postings.get(term)
    }

    /// One iterator per term, in query order. `None` if any term is absent,
    /// which makes an AND query unsatisfiable.
    pub fn find_iterators<S: AsRef<str>>(&self, terms: &[S]) -> Option<Vec<PostingListIterator<'_>>> {
        terms
            .iter()
            .map(|term| {
                self.postings
                    .get(term.as_ref())
                    .filter(|list| !list.is_empty())
                    .map(PostingList::begin)
            })
            .collect()
    }

    /// Document frequency per term, 0 for absent terms
    pub fn posting_list_sizes<S: AsRef<str>>(&self, terms: &[S]) -> Vec<usize> {
        terms
            .iter()
            .map(|term| self.postings.get(term.as_ref()).map_or(0, PostingList::len))
            .collect()
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Term, &PostingList)> {
        self.postings.iter()
    }

    /// Total encoded posting bytes across all terms
    pub fn byte_count(&self) -> usize {
        self.postings.values().map(PostingList::byte_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::analyzer::Analyzer;

    fn build(bodies: &[&str]) -> InvertedIndex {
        let analyzer = Analyzer::default();
        let mut index = InvertedIndex::new(2);
        for (doc_id, body) in bodies.iter().enumerate() {
            index
                .add_document(doc_id as DocId, &analyzer.analyze(body))
                .unwrap();
        }
        index
    }

    #[test]
    fn test_add_documents() {
        let index = build(&["hello world", "hello earth", "world world"]);

        assert_eq!(index.term_count(), 3);
        assert_eq!(index.posting_list_sizes(&["hello", "world", "earth", "mars"]), vec![2, 2, 1, 0]);

        let mut it = index.get("world").unwrap().begin();
        assert_eq!(it.doc_id(), 0);
        it.advance();
        assert_eq!(it.doc_id(), 2);
        assert_eq!(it.term_freq(), 2);
        let positions: Vec<u32> = it.position_begin().collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn test_find_iterators() {
        let index = build(&["hello world", "hello earth"]);

        let iters = index.find_iterators(&["earth", "hello"]).unwrap();
        assert_eq!(iters.len(), 2);
        assert_eq!(iters[0].doc_id(), 1);
        assert_eq!(iters[0].size(), 1);
        assert_eq!(iters[1].size(), 2);

        assert!(index.find_iterators(&["hello", "mars"]).is_none());
    }

    #[test]
    fn test_non_increasing_doc_id_rejected() {
        let analyzer = Analyzer::default();
        let mut index = InvertedIndex::default();
        index.add_document(5, &analyzer.analyze("a b")).unwrap();

        let err = index.add_document(5, &analyzer.analyze("a"));
        assert!(matches!(err, Err(SearchError::ConstructionInvariant(_))));
    }

    #[test]
    fn test_malformed_doc_info_rejected() {
        let mut index = InvertedIndex::default();
        let doc = DocInfo::new(vec!["a".into()], vec![], vec![vec![0]]);
        assert!(index.add_document(0, &doc).is_err());
        assert_eq!(index.term_count(), 0);

        let repeated = DocInfo::new(
            vec!["a".into(), "a".into()],
            vec![vec![(0, 0)], vec![(2, 2)]],
            vec![vec![0], vec![1]],
        );
        assert!(matches!(
            index.add_document(0, &repeated),
            Err(SearchError::ConstructionInvariant(_))
        ));
        assert_eq!(index.term_count(), 0);
    }

    #[test]
    fn test_unordered_occurrences_rejected() {
        let mut index = InvertedIndex::default();

        // Second term is bad; the first must not be indexed either
        let offsets = DocInfo::new(
            vec!["a".into(), "b".into()],
            vec![vec![(0, 0)], vec![(10, 12), (0, 1)]],
            vec![vec![0], vec![1, 2]],
        );
        assert!(matches!(
            index.add_document(0, &offsets),
            Err(SearchError::ConstructionInvariant(_))
        ));
        assert_eq!(index.term_count(), 0);

        let positions = DocInfo::new(
            vec!["a".into()],
            vec![vec![(0, 1), (3, 4)]],
            vec![vec![5, 2]],
        );
        assert!(matches!(
            index.add_document(0, &positions),
            Err(SearchError::ConstructionInvariant(_))
        ));
        assert_eq!(index.term_count(), 0);

        index.add_document(0, &Analyzer::default().analyze("a b")).unwrap();
        assert_eq!(index.term_count(), 2);
    }
}
