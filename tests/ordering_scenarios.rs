mod common;

use common::{
    loan_embedder, FailingOracle, FixedOracle, ARTICLE_ONE, ARTICLE_TWO, LOAN_COVER,
};
use page_sequencer::embedding::LexicalEmbedder;
use page_sequencer::oracle::OfflineOracle;
use page_sequencer::reconcile::{reconcile, OrderSource};
use page_sequencer::transition::TransitionMatrix;
use page_sequencer::{is_permutation, CandidateOrder, OrderingConfig, PageOrderingEngine, PageRecord};

fn loan_engine(oracle: Box<dyn page_sequencer::oracle::Oracle>) -> PageOrderingEngine {
    PageOrderingEngine::new(OrderingConfig::default(), Box::new(loan_embedder()), oracle)
}

#[test]
fn unavailable_oracle_falls_back_to_title_page_heuristic() {
    let pages = vec![
        PageRecord::new(1, ARTICLE_TWO),
        PageRecord::new(2, LOAN_COVER),
        PageRecord::new(3, ARTICLE_ONE),
    ];

    let result = loan_engine(Box::new(OfflineOracle)).determine_page_order(&pages);

    assert!(result.success);
    assert_eq!(result.page_order, vec![2, 3, 1]);
    assert_eq!(result.original_order, vec![1, 2, 3]);
    assert_eq!(result.reordered_indices, vec![Some(1), Some(2), Some(0)]);
    assert_eq!(result.source, OrderSource::Heuristic);
    assert!(result.reasoning.contains("Oracle query failed"));
    assert!(result.oracle_order.is_empty());

    assert_eq!(result.confidence_scores[0], 0.7);
    assert!((result.confidence_scores[1] - 0.8).abs() < 1e-5);
    assert!((result.confidence_scores[2] - 0.84).abs() < 1e-5);
}

#[test]
fn transport_error_is_absorbed() {
    let pages = vec![
        PageRecord::new(1, ARTICLE_TWO),
        PageRecord::new(2, LOAN_COVER),
        PageRecord::new(3, ARTICLE_ONE),
    ];
    let result = loan_engine(Box::new(FailingOracle)).determine_page_order(&pages);
    assert!(result.success);
    assert!(result.error.is_none());
    assert_eq!(result.page_order, vec![2, 3, 1]);
    assert!(result.reasoning.contains("503"));
}

#[test]
fn empty_pages_return_before_first_later_page() {
    let pages = vec![
        PageRecord::new(1, "first content page"),
        PageRecord::empty(2),
        PageRecord::new(3, "second content page"),
        PageRecord::empty(4),
        PageRecord::new(5, "third content page"),
    ];
    let engine = PageOrderingEngine::new(
        OrderingConfig::default(),
        Box::new(LexicalEmbedder::new(64)),
        FixedOracle::boxed(r#"{"order": [2, 0, 1], "reasoning": "last page is the cover"}"#),
    );

    let result = engine.determine_page_order(&pages);

    assert!(result.success);
    assert_eq!(result.page_order, vec![2, 4, 5, 1, 3]);
    let content: Vec<u32> = result
        .ordered_pages
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.page_number())
        .collect();
    assert_eq!(content, vec![5, 1, 3]);
    assert_eq!(result.reordered_indices, vec![None, None, Some(2), Some(0), Some(1)]);
    assert_eq!(&result.confidence_scores[..3], &[0.5, 0.5, 0.6]);
}

#[test]
fn empty_pages_keep_place_when_order_is_kept() {
    let pages = vec![
        PageRecord::new(1, "LOAN AGREEMENT between the parties"),
        PageRecord::empty(2),
        PageRecord::new(3, "closing remarks"),
        PageRecord::empty(4),
    ];
    let engine = PageOrderingEngine::new(
        OrderingConfig::default(),
        Box::new(LexicalEmbedder::new(64)),
        FixedOracle::boxed(r#"{"order": [0, 1]}"#),
    );
    let result = engine.determine_page_order(&pages);
    assert_eq!(result.page_order, vec![1, 2, 3, 4]);
    assert_eq!(result.source, OrderSource::Identity);
    assert!(!result.order_changed());
}

#[test]
fn identity_answer_is_second_guessed() {
    let pages = vec![
        PageRecord::new(1, ARTICLE_ONE),
        PageRecord::new(2, ARTICLE_TWO),
        PageRecord::new(3, LOAN_COVER),
    ];
    let result = loan_engine(FixedOracle::boxed(
        r#"{"order": [0, 1, 2], "reasoning": "already in order"}"#,
    ))
    .determine_page_order(&pages);

    assert!(result.success);
    assert_ne!(result.page_order, vec![1, 2, 3]);
    assert_eq!(result.page_order, vec![3, 1, 2]);
    assert_eq!(result.source, OrderSource::Heuristic);
    assert_eq!(result.oracle_order, vec![0, 1, 2]);
}

#[test]
fn duplicate_answer_still_yields_permutation() {
    let pages = vec![
        PageRecord::new(1, ARTICLE_ONE),
        PageRecord::new(2, ARTICLE_TWO),
        PageRecord::new(3, LOAN_COVER),
    ];
    let result = loan_engine(FixedOracle::boxed(r#"{"order": [0, 0, 1]}"#)).determine_page_order(&pages);

    assert!(result.success);
    assert_eq!(result.oracle_order, vec![0, 0, 1]);
    let indices: Vec<usize> = result.page_order.iter().map(|&n| n as usize - 1).collect();
    assert!(is_permutation(&indices, 3));
    assert!(result.reasoning.contains("unparseable"));
}

#[test]
fn reconciler_discards_duplicate_candidate_for_greedy_path() {
    let pages = vec![
        PageRecord::new(1, "body one"),
        PageRecord::new(2, "body two"),
        PageRecord::new(3, "cover"),
    ];
    let mut transitions = TransitionMatrix::zeros(3);
    transitions.set(2, 0, 0.9);
    transitions.set(0, 1, 0.7);

    let reconciled = reconcile(
        &pages,
        CandidateOrder::new(vec![0, 0, 1], "duplicated"),
        OrderSource::Oracle,
        &transitions,
        0.3,
    );

    assert_eq!(reconciled.indices, vec![2, 0, 1]);
    assert_eq!(reconciled.source, OrderSource::TransitionPath);
    assert_eq!(reconciled.pages.len(), 3);
}

#[test]
fn garbage_answer_uses_heuristic_order() {
    let pages = vec![
        PageRecord::new(1, ARTICLE_TWO),
        PageRecord::new(2, LOAN_COVER),
        PageRecord::new(3, ARTICLE_ONE),
    ];
    let result = loan_engine(FixedOracle::boxed("I am not sure, sorry.")).determine_page_order(&pages);
    assert_eq!(result.page_order, vec![2, 3, 1]);
    assert!(result.reasoning.contains("unparseable"));
    assert!(result.oracle_order.is_empty());
}

#[test]
fn fewer_than_two_content_pages_short_circuit() {
    let pages = vec![PageRecord::empty(1), PageRecord::new(2, "lonely page"), PageRecord::empty(3)];
    let result = loan_engine(FixedOracle::boxed(r#"{"order": [0]}"#)).determine_page_order(&pages);
    assert!(result.success);
    assert_eq!(result.page_order, vec![1, 2, 3]);
    assert_eq!(result.confidence_scores, vec![1.0, 1.0, 1.0]);
    assert_eq!(result.reasoning, "Not enough pages to reorder");
    assert_eq!(result.source, OrderSource::Insufficient);

    let nothing = loan_engine(Box::new(OfflineOracle)).determine_page_order(&[]);
    assert!(nothing.success);
    assert!(nothing.page_order.is_empty());
}

#[test]
fn short_embedding_response_fails_with_input_order() {
    struct ShortEmbedder;
    impl page_sequencer::embedding::Embedder for ShortEmbedder {
        fn embed(
            &self,
            _texts: &[&str],
        ) -> Result<Vec<Vec<f32>>, page_sequencer::embedding::EmbeddingError> {
            Ok(vec![vec![1.0]])
        }
    }

    let engine = PageOrderingEngine::new(
        OrderingConfig::default(),
        Box::new(ShortEmbedder),
        Box::new(OfflineOracle),
    );
    let pages = vec![
        PageRecord::new(1, "a"),
        PageRecord::empty(2),
        PageRecord::new(3, "b"),
    ];
    let result = engine.determine_page_order(&pages);
    assert!(!result.success);
    assert_eq!(result.page_order, vec![1, 2, 3]);
    assert_eq!(result.confidence_scores, vec![0.5, 0.5, 0.5]);
    assert!(result.error.unwrap().contains("returned 1 vectors for 2 texts"));
}
