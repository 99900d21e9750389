//! Offline integration tests: real PDF extraction, scripted LLM replies.
//!
//! Every test here runs without a network or an LLM service. PDFs are built
//! in memory with lopdf, and the model is a [`MockLlm`].

use edgequake_pdf2quiz::{
    ErrorKind, MockLlm, MockReply, Pdf2QuizError, PipelineConfig, QuizWarning, SessionError,
    SessionState, TextSource, Workspace,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::sync::Arc;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// A minimal PDF with one line of Courier text per page.
fn pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 18.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn workspace(mock: Arc<MockLlm>) -> Workspace {
    let config = PipelineConfig::builder()
        .client(mock)
        .min_manual_text_chars(1)
        .question_count(5)
        .build()
        .unwrap();
    Workspace::new(config).unwrap()
}

fn block(n: usize, answer: &str) -> String {
    format!(
        "QUESTION: Question number {n}?\nA) alpha {n}\nB) beta {n}\nC) gamma {n}\nD) delta {n}\nANSWER: {answer}\n\n"
    )
}

const SUN_QUIZ: &str = "\
QUESTION: What is the sun?
A) A planet
B) A star
C) A moon
D) A comet
ANSWER: B
EXPLANATION: The text says the sun is a star.
";

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn valid_pdf_yields_text_in_page_order() {
    let mut ws = workspace(Arc::new(MockLlm::new(MockReply::text("unused"))));
    let text = ws
        .load_pdf("notes.pdf", pdf(&["Photosynthesis basics", "Chlorophyll absorbs light"]))
        .await
        .unwrap();

    assert_eq!(text.source(), TextSource::Pdf);
    assert_eq!(text.page_count(), 2);
    let body = text.as_str();
    let first = body.find("Photosynthesis").expect("page 1 text");
    let second = body.find("Chlorophyll").expect("page 2 text");
    assert!(first < second);
    assert_eq!(ws.document_name(), Some("notes.pdf"));
}

#[tokio::test]
async fn garbage_bytes_are_unreadable() {
    let mut ws = workspace(Arc::new(MockLlm::new(MockReply::text("unused"))));
    let err = ws
        .load_pdf("junk.pdf", b"definitely not a pdf".to_vec())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnreadableDocument);
    assert!(ws.document().is_none());
}

#[tokio::test]
async fn missing_file_is_reported_by_path() {
    let mut ws = workspace(Arc::new(MockLlm::new(MockReply::text("unused"))));
    let err = ws.load_path("/no/such/dir/lecture.pdf").await.unwrap_err();
    assert!(matches!(err, Pdf2QuizError::FileNotFound { .. }));
}

#[tokio::test]
async fn pdf_on_disk_loads_through_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lecture.pdf");
    std::fs::write(&path, pdf(&["Mitochondria produce energy"])).unwrap();

    let mut ws = workspace(Arc::new(MockLlm::new(MockReply::text("unused"))));
    let text = ws.load_path(path.to_str().unwrap()).await.unwrap();
    assert!(text.as_str().contains("Mitochondria"));
    assert_eq!(ws.document_name(), Some("lecture.pdf"));
}

// ── Summary ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn summary_from_pdf_text() {
    let mock = Arc::new(MockLlm::new(MockReply::text(
        "Here is a summary:\n\nPlants turn light into sugar.",
    )));
    let mut ws = workspace(mock.clone());
    ws.load_pdf("bio.pdf", pdf(&["Plants turn light into sugar"]))
        .await
        .unwrap();

    let summary = ws.generate_summary().await.unwrap();
    assert_eq!(summary.text, "Plants turn light into sugar.");
    assert!(!summary.source_truncated);
    assert!(mock.prompts()[0].contains("Plants turn light into sugar"));
}

#[tokio::test]
async fn summary_service_down_keeps_document() {
    let mut ws = workspace(Arc::new(MockLlm::new(MockReply::Unavailable)));
    ws.load_text("The sun is a star.").unwrap();
    let err = ws.generate_summary().await.unwrap_err();
    assert!(matches!(err, Pdf2QuizError::ServiceUnavailable { .. }));
    assert!(ws.document().is_some());
    assert!(ws.summary().is_none());
}

// ── Quiz and session ─────────────────────────────────────────────────────────

#[tokio::test]
async fn sun_quiz_scores_once() {
    let mut ws = workspace(Arc::new(MockLlm::new(MockReply::text(SUN_QUIZ))));
    ws.load_text("The sun is a star.").unwrap();

    let quiz = ws.generate_quiz_with(1).await.unwrap();
    assert_eq!(quiz.len(), 1);
    assert_eq!(quiz.questions()[0].correct_choice(), "A star");
    assert!(quiz.warning().is_none());

    ws.select_answer(0, "A star").unwrap();
    assert_eq!(ws.submit_quiz().unwrap(), 1);
    assert_eq!(ws.submit_quiz().unwrap(), 1);
    assert_eq!(ws.session().state(), SessionState::Submitted);

    let snap = ws.session().snapshot();
    assert_eq!(snap.score, 1);
    assert_eq!(snap.total, 1);
    assert!((snap.percentage - 100.0).abs() < f32::EPSILON);
    let results = snap.results.expect("results after submit");
    assert_eq!(
        results[0].explanation.as_deref(),
        Some("The text says the sun is a star.")
    );
}

#[tokio::test]
async fn answers_start_unset_and_freeze_after_submit() {
    let reply: String = (1..=5).map(|n| block(n, "A")).collect();
    let mut ws = workspace(Arc::new(MockLlm::new(MockReply::Text(reply))));
    ws.load_text("Greek letters appear in many formulas.").unwrap();
    ws.generate_quiz().await.unwrap();

    let snap = ws.session().snapshot();
    assert_eq!(snap.state, SessionState::Active);
    assert_eq!(snap.answers, vec![None; 5]);

    ws.select_answer(0, "A").unwrap();
    ws.select_answer(1, "beta 2").unwrap();
    assert_eq!(ws.submit_quiz().unwrap(), 1);
    assert_eq!(ws.select_answer(2, "A"), Err(SessionError::AlreadySubmitted));
}

#[tokio::test]
async fn duplicate_choices_are_dropped_with_warning() {
    let mut reply: String = (1..=5).map(|n| block(n, "C")).collect();
    reply.push_str("QUESTION: Broken?\nA) same\nB) same\nC) other\nD) more\nANSWER: C\n");
    let mut ws = workspace(Arc::new(MockLlm::new(MockReply::Text(reply))));
    ws.load_text("Greek letters appear in many formulas.").unwrap();

    let quiz = ws.generate_quiz().await.unwrap();
    assert_eq!(quiz.len(), 5);
    assert_eq!(
        quiz.warning(),
        Some(&QuizWarning::PartialQuiz {
            requested: 5,
            accepted: 5,
            rejected: 1
        })
    );
}

#[tokio::test]
async fn unparseable_reply_leaves_no_session() {
    let mut ws = workspace(Arc::new(MockLlm::new(MockReply::text(
        "Sorry, I can only write poems today.",
    ))));
    ws.load_text("Greek letters appear in many formulas.").unwrap();

    let err = ws.generate_quiz().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QuizParseFailure);
    assert_eq!(ws.session().state(), SessionState::Empty);
    assert_eq!(ws.submit_quiz(), Err(SessionError::NoQuiz));
}

#[tokio::test]
async fn service_unavailable_propagates_from_quiz() {
    let mut ws = workspace(Arc::new(MockLlm::new(MockReply::Unavailable)));
    ws.load_text("The sun is a star.").unwrap();
    let err = ws.generate_quiz().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
}

#[tokio::test]
async fn new_document_discards_quiz_and_summary() {
    let mock = Arc::new(MockLlm::with_sequence(vec![
        MockReply::text("A short summary."),
        MockReply::text(SUN_QUIZ),
    ]));
    let mut ws = workspace(mock);
    ws.load_text("The sun is a star.").unwrap();
    ws.generate_summary().await.unwrap();
    ws.generate_quiz_with(1).await.unwrap();

    ws.load_pdf("other.pdf", pdf(&["Something else entirely"]))
        .await
        .unwrap();
    assert!(ws.summary().is_none());
    assert_eq!(ws.session().state(), SessionState::Empty);
}

#[tokio::test]
async fn quiz_without_document_fails() {
    let mut ws = workspace(Arc::new(MockLlm::new(MockReply::text(SUN_QUIZ))));
    let err = ws.generate_quiz().await.unwrap_err();
    assert!(matches!(err, Pdf2QuizError::NoDocument));
}
