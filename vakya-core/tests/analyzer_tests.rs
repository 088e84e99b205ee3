//! End-to-end orchestrator tests over stub engines.

mod common;

use common::*;
use vakya_common::{
    AgreementBand, AnalysisMode, AnalysisRequest, CacheTierId, Error, ResolutionStage,
    ReviewReason,
};
use vakya_core::engines::FailureReason;

#[tokio::test]
async fn repeated_analysis_is_idempotent_and_cached() {
    let analyzer = test_analyzer(unanimous_slots(&["rAma", "gam"]), None).await;

    let first = analyzer
        .analyze(AnalysisRequest::new("rAmo gacCati"))
        .await
        .unwrap();
    assert_eq!(first.cache_tier, CacheTierId::None);
    assert_eq!(first.selected, Some(0));
    assert!(first.confidence.overall >= 0.95);
    assert_eq!(first.confidence.band, AgreementBand::High);
    assert!(!first.needs_human_review);

    let second = analyzer
        .analyze(AnalysisRequest::new("rAmo gacCati"))
        .await
        .unwrap();
    assert_eq!(second.cache_tier, CacheTierId::Memory);
    assert_eq!(second.sentence_id, first.sentence_id);
    assert_eq!(second.forest, first.forest);
    assert_eq!(second.confidence, first.confidence);
}

#[tokio::test]
async fn script_variants_share_one_cache_entry() {
    let analyzer = test_analyzer(unanimous_slots(&["rAma", "gam"]), None).await;

    let iast_like = analyzer
        .analyze(AnalysisRequest::new("rAmo gacCati"))
        .await
        .unwrap();
    let devanagari = analyzer
        .analyze(AnalysisRequest::new("रामो गच्छति"))
        .await
        .unwrap();

    assert_eq!(devanagari.normalized_slp1, iast_like.normalized_slp1);
    assert_eq!(devanagari.sentence_id, iast_like.sentence_id);
    assert_eq!(devanagari.cache_tier, CacheTierId::Memory);
}

#[tokio::test]
async fn bypass_cache_recomputes() {
    let analyzer = test_analyzer(unanimous_slots(&["rAma", "gam"]), None).await;

    let first = analyzer
        .analyze(AnalysisRequest::new("rAmo gacCati"))
        .await
        .unwrap();
    let second = analyzer
        .analyze(AnalysisRequest::new("rAmo gacCati").bypassing_cache())
        .await
        .unwrap();
    assert_eq!(second.cache_tier, CacheTierId::None);
    assert_ne!(second.sentence_id, first.sentence_id);
}

#[tokio::test]
async fn production_mode_returns_single_selected_parse() {
    // Two engines agree, one dissents: a two-candidate forest
    let slots = vec![
        slot("grammar", 0.35, Ok(vec![parse_of(&["rAma", "gam"], 0.9)])),
        slot("morphology", 0.40, Ok(vec![parse_of(&["rAma", "gam"], 0.9)])),
        slot("lexicon", 0.25, Ok(vec![parse_of(&["rA", "ama", "gam"], 0.9)])),
    ];
    let analyzer = test_analyzer(slots, None).await;
    let result = analyzer
        .analyze(AnalysisRequest::new("rAmo gacCati"))
        .await
        .unwrap();

    if result.selected.is_some() {
        assert_eq!(result.forest.len(), 1);
        assert_eq!(result.selected, Some(0));
    }
    assert_eq!(result.mode, AnalysisMode::Production);
}

#[tokio::test]
async fn educational_mode_keeps_the_forest() {
    let slots = vec![
        slot("grammar", 0.35, Ok(vec![parse_of(&["rAma", "gam"], 0.9)])),
        slot("morphology", 0.40, Ok(vec![parse_of(&["rAma", "gam"], 0.9)])),
        slot("lexicon", 0.25, Ok(vec![parse_of(&["rA", "ama", "gam"], 0.9)])),
    ];
    let analyzer = test_analyzer(slots, None).await;
    let result = analyzer
        .analyze(AnalysisRequest::new("rAmo gacCati").with_mode(AnalysisMode::Educational))
        .await
        .unwrap();
    assert_eq!(result.forest.len(), 2);
}

#[tokio::test]
async fn disagreement_without_arbiter_escalates_to_human() {
    let slots = vec![
        slot("grammar", 0.5, Ok(vec![parse_of(&["Bavati"], 0.9)])),
        slot("lexicon", 0.5, Ok(vec![parse_of(&["Bava", "ti"], 0.9)])),
    ];
    let analyzer = test_analyzer(slots, None).await;
    let result = analyzer
        .analyze(AnalysisRequest::new("Bavati"))
        .await
        .unwrap();

    assert!(result.needs_human_review);
    assert_eq!(result.review_reason, Some(ReviewReason::NoQuorum));
    assert_eq!(result.selected, None);
    assert_eq!(result.forest.len(), 2);
    // Low band caps every unconfirmed candidate below the medium floor
    for candidate in &result.forest {
        assert!(candidate.confidence < 0.70);
    }
}

#[tokio::test]
async fn human_resolution_bumps_version_and_sticks() {
    let dir = test_dir();
    let db = dir.path().join("corpus.db");
    let slots = vec![
        slot("grammar", 0.5, Ok(vec![parse_of(&["Bavati"], 0.9)])),
        slot("lexicon", 0.5, Ok(vec![parse_of(&["Bava", "ti"], 0.9)])),
    ];
    let analyzer = test_analyzer(slots, Some(&db)).await;

    let pending = analyzer
        .analyze(AnalysisRequest::new("Bavati"))
        .await
        .unwrap();
    assert!(pending.needs_human_review);

    let resolved = analyzer.resolve(&pending.sentence_id, 1).await.unwrap();
    assert_eq!(resolved.version, 2);
    assert_eq!(resolved.selected, Some(1));
    assert_eq!(resolved.resolution.stage, ResolutionStage::Human);
    assert!(!resolved.needs_human_review);

    // Later lookups see the resolved version
    let cached = analyzer
        .analyze(AnalysisRequest::new("Bavati"))
        .await
        .unwrap();
    assert_eq!(cached.version, 2);
    assert_eq!(cached.selected, Some(1));

}

#[tokio::test]
async fn resolve_rejects_out_of_range_index() {
    let dir = test_dir();
    let db = dir.path().join("corpus.db");
    let slots = vec![
        slot("grammar", 0.5, Ok(vec![parse_of(&["a"], 0.6)])),
        slot("lexicon", 0.5, Ok(vec![parse_of(&["b"], 0.6)])),
    ];
    let analyzer = test_analyzer(slots, Some(&db)).await;
    let pending = analyzer.analyze(AnalysisRequest::new("ab")).await.unwrap();
    let err = analyzer.resolve(&pending.sentence_id, 99).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn resolve_unknown_sentence_is_not_found() {
    let dir = test_dir();
    let db = dir.path().join("corpus.db");
    let analyzer = test_analyzer(unanimous_slots(&["rAma"]), Some(&db)).await;
    let err = analyzer.resolve("no-such-sentence", 0).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn total_engine_failure_is_reported_not_cached() {
    let failing = vec![
        slot("grammar", 0.5, Err(FailureReason::Timeout)),
        slot("lexicon", 0.5, Err(FailureReason::Unreachable("refused".into()))),
    ];
    let analyzer = test_analyzer(failing, None).await;
    let err = analyzer
        .analyze(AnalysisRequest::new("rAmo gacCati"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AllEnginesFailed(_)));
}

#[tokio::test]
async fn partial_engine_failure_still_analyzes() {
    let slots = vec![
        slot("grammar", 0.35, Ok(vec![parse_of(&["rAma", "gam"], 0.9)])),
        slot("morphology", 0.40, Err(FailureReason::Timeout)),
        slot("lexicon", 0.25, Ok(vec![parse_of(&["rAma", "gam"], 0.9)])),
    ];
    let analyzer = test_analyzer(slots, None).await;
    let result = analyzer
        .analyze(AnalysisRequest::new("rAmo gacCati"))
        .await
        .unwrap();
    // Both responders agree: still a unanimous, auto-resolved analysis
    assert_eq!(result.confidence.band, AgreementBand::High);
    assert_eq!(result.selected, Some(0));
    assert_eq!(result.confidence.engine_agreement, 1.0);
}

#[tokio::test]
async fn empty_input_is_rejected() {
    let analyzer = test_analyzer(unanimous_slots(&["rAma"]), None).await;
    let err = analyzer
        .analyze(AnalysisRequest::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn engine_subset_is_honored() {
    let slots = vec![
        slot("grammar", 0.5, Ok(vec![parse_of(&["rAma"], 0.9)])),
        slot("lexicon", 0.5, Ok(vec![parse_of(&["rAman"], 0.9)])),
    ];
    let analyzer = test_analyzer(slots, None).await;
    let result = analyzer
        .analyze(
            AnalysisRequest::new("rAmaH").with_engines(vec!["grammar".to_string()]),
        )
        .await
        .unwrap();
    assert_eq!(result.forest.len(), 1);
    assert_eq!(result.forest[0].lemmas(), vec!["rAma"]);
}
