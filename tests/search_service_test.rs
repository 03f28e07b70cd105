//! Integration tests for SearchService over in-memory and on-disk corpora

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tipitaka_search::catalog::MemoryCatalog;
use tipitaka_search::index::posting::{Posting, PostingIterator, PostingList, TokenOccurrence};
use tipitaka_search::index::terms::{SliceTermsEnum, TermsEnum};
use tipitaka_search::index::{MemoryTermIndex, Token};
use tipitaka_search::prelude::*;

fn token(text: &str, position: u32) -> Token {
    Token {
        text: text.to_string(),
        position,
        start_offset: position as usize * 10,
        end_offset: position as usize * 10 + text.chars().count(),
    }
}

/// Three books, "dhamma" at positions 5 and 12 in the first and 2 in the second.
fn scenario_service() -> SearchService {
    let mut builder = MemoryTermIndex::builder("text");
    builder
        .add_token(1, token("dhamma", 5))
        .add_token(1, token("dhamma", 12))
        .add_token(1, token("vinaya", 7))
        .add_token(2, token("dhamma", 2))
        .add_token(3, token("sutta", 0));
    let catalog = MemoryCatalog::new(vec![
        CatalogEntry::new(1, "A").pitaka(Pitaka::Vinaya).layer(Layer::Mula),
        CatalogEntry::new(2, "B").pitaka(Pitaka::Sutta).layer(Layer::Mula),
        CatalogEntry::new(3, "C").pitaka(Pitaka::Sutta).layer(Layer::Tika),
    ])
    .unwrap();
    SearchService::new(
        Arc::new(builder.build()),
        Arc::new(catalog),
        SearchConfig::default(),
    )
}

#[test]
fn test_single_word_occurrence_counts() -> Result<()> {
    let service = scenario_service();
    let response = service.search(&SearchRequest::new("dhamma"), &CancellationToken::new())?;

    assert_eq!(response.total_combination_count, 1);
    let hit = &response.combinations[0];
    let counts: Vec<(usize, usize)> = hit
        .documents()
        .keys()
        .map(|&doc| (doc, hit.occurrence_count(doc)))
        .collect();
    assert_eq!(counts, vec![(0, 2), (1, 1)]);
    assert_eq!(response.total_document_count, 2);
    Ok(())
}

#[test]
fn test_context_distance_boundary() -> Result<()> {
    let service = scenario_service();
    let token = CancellationToken::new();

    // dhamma@5 and vinaya@7: within 2, outside 1
    let request = SearchRequest::new("dhamma vinaya").proximity_distance(2);
    let response = service.search(&request, &token)?;
    assert_eq!(response.total_occurrence_count, 1);
    assert_eq!(response.combinations[0].occurrence_count(0), 1);

    let request = SearchRequest::new("dhamma vinaya").proximity_distance(1);
    assert!(service.search(&request, &token)?.is_empty());

    // the same pair as a phrase needs exact adjacency
    let request = SearchRequest::new("dhamma vinaya").phrase(true);
    assert!(service.search(&request, &token)?.is_empty());
    Ok(())
}

#[test]
fn test_category_filter() -> Result<()> {
    let service = scenario_service();
    let token = CancellationToken::new();

    let request =
        SearchRequest::new("dhamma").filter(DocumentFilter::none().with_pitaka(Pitaka::Sutta));
    let response = service.search(&request, &token)?;
    assert_eq!(response.total_document_count, 1);
    assert_eq!(response.total_occurrence_count, 1);

    let request = SearchRequest::new("dhamma").filter(
        DocumentFilter::none()
            .with_pitaka(Pitaka::Sutta)
            .with_layer(Layer::Tika),
    );
    assert!(service.search(&request, &token)?.is_empty());
    Ok(())
}

#[test]
fn test_invalid_pattern_aborts_before_index() {
    let service = scenario_service();
    let request = SearchRequest::new("dhamma [vinaya").mode(SearchMode::Regex);
    let err = service.search(&request, &CancellationToken::new()).unwrap_err();
    assert!(matches!(err, SearchError::InvalidPattern { ref word, .. } if word == "[vinaya"));
}

#[test]
fn test_superseded_search_is_cancelled() -> Result<()> {
    let service = scenario_service();
    let session = SearchSession::new();

    let first = session.begin();
    let second = session.begin();

    let request = SearchRequest::new("d* v*").mode(SearchMode::Wildcard);
    let stale = service.search(&request, &first)?;
    assert!(stale.cancelled);
    assert!(stale.is_empty());

    let fresh = service.search(&request, &second)?;
    assert!(!fresh.cancelled);
    assert_eq!(fresh.keys(), vec!["dhamma, vinaya"]);
    Ok(())
}

#[test]
fn test_corpus_file_round_trip() -> Result<()> {
    let mut corpus_file = NamedTempFile::new()?;
    write!(
        corpus_file,
        r#"[
            {{ "id": 1, "name": "Dīghanikāya", "pitaka": "sutta", "layer": "mula",
               "markup": "<p>evaṃ me sutaṃ ekaṃ samayaṃ bhagavā</p>" }},
            {{ "id": 2, "name": "Sumaṅgalavilāsinī", "pitaka": "sutta", "layer": "atthakatha",
               "markup": "<p>evaṃ me sutan ti</p>" }},
            {{ "id": 3, "name": "Visuddhimagga", "other": true,
               "markup": "<p><b>sīle</b> patiṭṭhāya naro sapañño</p>" }}
        ]"#
    )?;
    let mut config_file = NamedTempFile::new()?;
    write!(config_file, r#"{{ "default_proximity_distance": 3 }}"#)?;

    let config = SearchConfig::from_file(config_file.path())?;
    let corpus = Corpus::from_file(&config.field, corpus_file.path())?;
    let service = SearchService::from_corpus(&corpus, config);
    let token = CancellationToken::new();

    let response = service.search(&SearchRequest::new("\u{201C}evaṃ me\u{201D}"), &token)?;
    assert!(response.is_phrase);
    assert_eq!(response.total_document_count, 2);

    let request = SearchRequest::new("sut*").mode(SearchMode::Wildcard).filter(
        DocumentFilter::none().with_layer(Layer::Atthakatha),
    );
    let response = service.search(&request, &token)?;
    assert_eq!(response.keys(), vec!["sutan"]);

    let request = SearchRequest::new("s*")
        .mode(SearchMode::Wildcard)
        .filter(DocumentFilter::none().with_other());
    let response = service.search(&request, &token)?;
    assert_eq!(response.keys(), vec!["sapañño", "sīle"]);
    Ok(())
}

/// Index with hand-built postings whose term enumeration can fail.
#[derive(Debug)]
struct FixedIndex {
    terms: Vec<(String, Arc<PostingList>)>,
    fail_terms: bool,
}

impl FixedIndex {
    fn new(lists: Vec<PostingList>, fail_terms: bool) -> Self {
        let mut terms: Vec<(String, Arc<PostingList>)> = lists
            .into_iter()
            .map(|list| (list.term.clone(), Arc::new(list)))
            .collect();
        terms.sort_by(|a, b| a.0.cmp(&b.0));
        FixedIndex { terms, fail_terms }
    }

    /// "ariya" and "sacca" with document 1 listed twice in a row, and
    /// "sacca" alone in document 2.
    fn repeating(fail_terms: bool) -> Self {
        let mut ariya = PostingList::new("ariya".to_string());
        let posting = Posting::with_occurrences(1, vec![TokenOccurrence::new(3, 0, 5)]);
        ariya.postings.push(posting.clone());
        ariya.postings.push(posting);

        let mut sacca = PostingList::new("sacca".to_string());
        let posting = Posting::with_occurrences(1, vec![TokenOccurrence::new(4, 6, 11)]);
        sacca.postings.push(posting.clone());
        sacca.postings.push(posting);
        sacca
            .postings
            .push(Posting::with_occurrences(2, vec![TokenOccurrence::new(0, 0, 5)]));

        FixedIndex::new(vec![ariya, sacca], fail_terms)
    }
}

impl TermIndex for FixedIndex {
    fn terms(&self, _field: &str) -> Result<Box<dyn TermsEnum + '_>> {
        if self.fail_terms {
            return Err(SearchError::index("term dictionary unreadable"));
        }
        Ok(Box::new(SliceTermsEnum::new(&self.terms)))
    }

    fn postings(&self, _field: &str, term: &str) -> Result<PostingIterator> {
        Ok(self
            .terms
            .iter()
            .find(|(t, _)| t == term)
            .map(|(_, list)| PostingIterator::new(list.clone()))
            .unwrap_or_else(|| PostingIterator::empty(term)))
    }
}

fn fixed_service(index: FixedIndex) -> SearchService {
    let catalog = MemoryCatalog::new(vec![
        CatalogEntry::new(1, "A").pitaka(Pitaka::Sutta).layer(Layer::Mula),
        CatalogEntry::new(2, "B").pitaka(Pitaka::Sutta).layer(Layer::Mula),
    ])
    .unwrap();
    SearchService::new(Arc::new(index), Arc::new(catalog), SearchConfig::default())
}

#[test]
fn test_repeated_document_ids_are_skipped() -> Result<()> {
    let service = fixed_service(FixedIndex::repeating(false));
    let token = CancellationToken::new();

    let response = service.search(&SearchRequest::new("sacca"), &token)?;
    assert_eq!(response.total_occurrence_count, 2);
    assert_eq!(response.total_document_count, 2);

    let request = SearchRequest::new("sac*").mode(SearchMode::Wildcard);
    let response = service.search(&request, &token)?;
    assert_eq!(response.keys(), vec!["sacca"]);
    Ok(())
}

#[test]
fn test_repeated_document_ids_in_multi_word_search() -> Result<()> {
    let service = fixed_service(FixedIndex::repeating(false));
    let token = CancellationToken::new();

    let response = service.search(&SearchRequest::new("ariya sacca").phrase(true), &token)?;
    assert_eq!(response.keys(), vec!["ariya sacca"]);
    assert_eq!(response.total_occurrence_count, 1);
    assert_eq!(response.total_document_count, 1);
    assert_eq!(response.combinations[0].occurrence_count(0), 1);

    let request = SearchRequest::new("sacca ariya").proximity_distance(2);
    let response = service.search(&request, &token)?;
    assert_eq!(response.keys(), vec!["sacca, ariya"]);
    assert_eq!(response.total_occurrence_count, 1);
    Ok(())
}

#[test]
fn test_index_failure_is_reported() {
    let service = fixed_service(FixedIndex::repeating(true));
    let request = SearchRequest::new("sac*").mode(SearchMode::Wildcard);
    let err = service.search(&request, &CancellationToken::new()).unwrap_err();
    assert!(matches!(err, SearchError::Index(_)));
    assert!(!err.is_cancelled());
}

#[test]
fn test_posting_without_positions_is_an_index_error() {
    let mut list = PostingList::new("sacca".to_string());
    list.postings.push(Posting {
        doc_id: 1,
        frequency: 3,
        occurrences: Vec::new(),
    });
    let service = fixed_service(FixedIndex::new(vec![list], false));

    let err = service
        .search(&SearchRequest::new("sacca"), &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, SearchError::Index(_)));
}

#[test]
fn test_bare_star_matches_any_word() -> Result<()> {
    let service = scenario_service();
    let request = SearchRequest::new("* vinaya")
        .mode(SearchMode::Wildcard)
        .proximity_distance(2);
    let response = service.search(&request, &CancellationToken::new())?;
    assert_eq!(response.keys(), vec!["dhamma, vinaya"]);
    Ok(())
}
