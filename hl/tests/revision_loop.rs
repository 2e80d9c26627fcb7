//! Integration tests for the revision loop
//!
//! Drive the public API end to end with a scripted gateway in place of a
//! real model.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hitloop::{
    AttemptVerdict, ConversationHistory, Gateway, GenerationError, PromptLoader, RevisionEngine, RevisionError,
    RevisionPolicy, Session, Turn, TurnState, Verdict, VerdictOutcome,
};

/// Replays scripted replies and records each call
struct StubGateway {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl StubGateway {
    fn new(replies: Vec<Result<String, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn replying(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    /// Questions of the history each call saw
    fn contexts(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().iter().map(|(_, h)| h.clone()).collect()
    }
}

#[async_trait]
impl Gateway for StubGateway {
    async fn generate(&self, prompt: &str, history: &ConversationHistory) -> Result<String, GenerationError> {
        let context = history.turns().iter().map(|t| t.question().to_string()).collect();
        self.calls.lock().unwrap().push((prompt.to_string(), context));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationError::EmptyResponse))
    }
}

fn engine_with(gateway: Arc<StubGateway>, policy: RevisionPolicy) -> RevisionEngine {
    let prompts = Arc::new(PromptLoader::embedded_only().expect("embedded prompts load"));
    RevisionEngine::new(gateway, prompts, policy)
}

fn session_with(gateway: Arc<StubGateway>) -> Session {
    Session::new(engine_with(gateway, RevisionPolicy::unbounded()))
}

const UNTYPED_ADD: &str = "Here is the function:\n\n```python\ndef add(a, b):\n    return a + b\n```\n";
const TYPED_ADD: &str =
    "With type hints:\n\n```python\ndef add(a: int, b: int) -> int:\n    return a + b\n```\n\nUsage:\n\n```bash\npython add.py\n```\n";

// =============================================================================
// Full Scenario
// =============================================================================

#[tokio::test]
async fn test_add_two_numbers_scenario() {
    let gateway = StubGateway::replying(&[UNTYPED_ADD, TYPED_ADD, "It returns 5."]);
    let mut session = session_with(gateway.clone());

    let mut turn = Turn::new("Write a function that adds two numbers").unwrap();
    let first = session.start_turn(&mut turn).await.unwrap();
    assert_eq!(first.extracted_code().len(), 1);
    assert!(!first.extracted_code()[0].text.contains("int"));

    let outcome = session
        .submit_verdict(&mut turn, Verdict::Reject("add type hints".to_string()))
        .await
        .unwrap();
    let VerdictOutcome::Revised(second) = outcome else {
        panic!("expected a revised attempt");
    };
    assert_eq!(second.number(), 2);
    let code = second.extracted_code();
    assert_eq!(code.len(), 2);
    assert_eq!(code[0].language_tag.as_deref(), Some("python"));
    assert!(code[0].text.contains("a: int"));
    assert_eq!(code[1].language_tag.as_deref(), Some("bash"));

    session.submit_verdict(&mut turn, Verdict::Approve).await.unwrap();
    assert_eq!(turn.state(), TurnState::Approved);
    assert_eq!(session.history().len(), 1);

    // The next question sees the approved turn as context
    let mut follow_up = Turn::new("What does add(2, 3) return?").unwrap();
    session.start_turn(&mut follow_up).await.unwrap();

    let contexts = gateway.contexts();
    assert!(contexts[0].is_empty());
    assert!(contexts[1].is_empty());
    assert_eq!(contexts[2], vec!["Write a function that adds two numbers".to_string()]);
}

// =============================================================================
// Attempt Invariants
// =============================================================================

#[tokio::test]
async fn test_rejected_count_matches_successful_rejections() {
    let gateway = StubGateway::replying(&["v1", "v2", "v3", "v4"]);
    let mut session = session_with(gateway);
    let mut turn = Turn::new("q").unwrap();

    session.start_turn(&mut turn).await.unwrap();
    for feedback in ["one", "two", "three"] {
        session
            .submit_verdict(&mut turn, Verdict::Reject(feedback.to_string()))
            .await
            .unwrap();
    }

    assert_eq!(turn.rejected_count(), 3);
    let non_rejected: Vec<_> = turn
        .attempts()
        .iter()
        .filter(|a| a.verdict() != AttemptVerdict::Rejected)
        .collect();
    assert_eq!(non_rejected.len(), 1);
    assert_eq!(non_rejected[0].number(), 4);
    assert!(turn.attempts()[..3].iter().all(|a| a.feedback_text().is_some()));
}

#[tokio::test]
async fn test_second_approve_leaves_history_untouched() {
    let gateway = StubGateway::replying(&["answer"]);
    let mut session = session_with(gateway);
    let mut turn = Turn::new("q").unwrap();

    session.start_turn(&mut turn).await.unwrap();
    session.submit_verdict(&mut turn, Verdict::Approve).await.unwrap();

    let err = session.submit_verdict(&mut turn, Verdict::Approve).await.unwrap_err();

    assert!(matches!(err, RevisionError::InvalidState { .. }));
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn test_failed_revision_keeps_turn_resubmittable() {
    let gateway = StubGateway::new(vec![
        Ok("v1".to_string()),
        Err(GenerationError::EmptyResponse),
        Ok("v2".to_string()),
    ]);
    let mut session = session_with(gateway);
    let mut turn = Turn::new("q").unwrap();
    session.start_turn(&mut turn).await.unwrap();

    let err = session
        .submit_verdict(&mut turn, Verdict::Reject("shorter".to_string()))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(turn.attempts().len(), 1);
    assert_eq!(turn.current_attempt().unwrap().raw_response(), "v1");

    session
        .submit_verdict(&mut turn, Verdict::Reject("shorter".to_string()))
        .await
        .unwrap();
    assert_eq!(turn.attempts().len(), 2);
    assert_eq!(turn.feedback(), vec!["shorter".to_string()]);
}

#[tokio::test]
async fn test_revision_cap() {
    let gateway = StubGateway::replying(&["v1", "v2", "v3"]);
    let engine = engine_with(gateway, RevisionPolicy::with_max_attempts(2));
    let mut history = ConversationHistory::new();
    let mut turn = Turn::new("q").unwrap();

    engine.start_turn(&history, &mut turn).await.unwrap();
    engine.reject(&history, &mut turn, "again").await.unwrap();
    let err = engine
        .submit_verdict(&mut history, &mut turn, Verdict::Reject("once more".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, RevisionError::MaxRevisionsExceeded { limit: 2 }));
    // still approvable
    engine.approve(&mut history, &mut turn).unwrap();
    assert_eq!(history.turns()[0].approved_response(), Some("v2"));
}

// =============================================================================
// Prompt Determinism
// =============================================================================

async fn run_scripted_turn() -> Vec<String> {
    let gateway = StubGateway::replying(&["v1", "v2", "v3"]);
    let mut session = session_with(gateway.clone());
    let mut turn = Turn::new("Write add()").unwrap();

    session.start_turn(&mut turn).await.unwrap();
    for feedback in ["add type hints", "add a docstring"] {
        session
            .submit_verdict(&mut turn, Verdict::Reject(feedback.to_string()))
            .await
            .unwrap();
    }
    gateway.prompts()
}

#[tokio::test]
async fn test_revision_prompt_is_reconstructible() {
    let first_run = run_scripted_turn().await;
    let second_run = run_scripted_turn().await;
    assert_eq!(first_run, second_run);

    let loader = PromptLoader::embedded_only().unwrap();
    let expected = loader
        .build_prompt(
            "Write add()",
            &["add type hints".to_string(), "add a docstring".to_string()],
        )
        .unwrap();
    assert_eq!(first_run[0], "Write add()");
    assert_eq!(first_run[2], expected);
}

#[tokio::test]
async fn test_clear_history_drops_context() {
    let gateway = StubGateway::replying(&["a1", "a2"]);
    let mut session = session_with(gateway.clone());

    let mut turn = Turn::new("q1").unwrap();
    session.start_turn(&mut turn).await.unwrap();
    session.submit_verdict(&mut turn, Verdict::Approve).await.unwrap();
    session.clear_history();

    let mut next = Turn::new("q2").unwrap();
    session.start_turn(&mut next).await.unwrap();

    assert!(session.history().is_empty());
    assert!(gateway.contexts()[1].is_empty());
}
