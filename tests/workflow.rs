//! Conversion workflow scenarios against a scripted backend.
//!
//! The fake [`ScriptedApi`] answers uploads from a queue and records every
//! request, so each test can check both what the user saw (toast, modal,
//! inline text, navigation) and what went over the wire.
//!
//! Run with:
//!   cargo test --test workflow

use async_trait::async_trait;
use sheet2deck::api::{ConversionApi, ConversionRequest, ConvertResponse};
use sheet2deck::notify::ToastLevel;
use sheet2deck::session::{AuthChange, AuthListener};
use sheet2deck::{
    ClientConfig, ConversionFailure, ConversionOptions, ConversionWorkflow, FileCandidate,
    Navigator, Notifications, Plan, Route, SessionStore, Sheet2DeckError, SubmitOutcome, Theme,
    UserSnapshot, WorkflowState,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Sent {
    token: String,
    file: String,
    title: String,
    theme: Theme,
    use_ai: bool,
}

#[derive(Default)]
struct ScriptedApi {
    responses: Mutex<VecDeque<Result<ConvertResponse, Sheet2DeckError>>>,
    me: Mutex<Option<Result<UserSnapshot, Sheet2DeckError>>>,
    delay: Option<Duration>,
    sent: Mutex<Vec<Sent>>,
    me_calls: Mutex<usize>,
}

impl ScriptedApi {
    fn new() -> Self {
        Self::default()
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn then(self, response: ConvertResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    fn then_transport_error(self) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(Sheet2DeckError::Transport {
                url: "http://localhost:8000/convert".into(),
                reason: "connection refused".into(),
            }));
        self
    }

    fn with_me(self, me: Result<UserSnapshot, Sheet2DeckError>) -> Self {
        *self.me.lock().unwrap() = Some(me);
        self
    }

    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversionApi for ScriptedApi {
    async fn convert(
        &self,
        token: &str,
        request: &ConversionRequest,
    ) -> Result<ConvertResponse, Sheet2DeckError> {
        self.sent.lock().unwrap().push(Sent {
            token: token.to_string(),
            file: request.file.name.clone(),
            title: request.title.clone(),
            theme: request.theme,
            use_ai: request.use_ai,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(deck(None)))
    }

    async fn current_user(&self, _token: &str) -> Result<UserSnapshot, Sheet2DeckError> {
        *self.me_calls.lock().unwrap() += 1;
        match self.me.lock().unwrap().take() {
            Some(me) => me,
            None => Err(Sheet2DeckError::Transport {
                url: "http://localhost:8000/auth/me".into(),
                reason: "not scripted".into(),
            }),
        }
    }
}

fn deck(warnings: Option<&str>) -> ConvertResponse {
    ConvertResponse {
        status: 200,
        detail: None,
        warnings_header: warnings.map(str::to_string),
        body: b"PK\x03\x04 fake pptx".to_vec(),
    }
}

fn error(status: u16, detail: &str) -> ConvertResponse {
    ConvertResponse {
        status,
        detail: Some(detail.to_string()),
        warnings_header: None,
        body: Vec::new(),
    }
}

fn free_user(used: u32) -> UserSnapshot {
    UserSnapshot {
        email: Some("ana@example.com".into()),
        plan: Plan::Free,
        conversions_this_month: used,
        ..Default::default()
    }
}

#[derive(Default)]
struct RecordingNavigator(Mutex<Vec<Route>>);

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.0.lock().unwrap().push(route);
    }
}

#[derive(Default)]
struct RecordingAuth(Mutex<Vec<AuthChange>>);

impl AuthListener for RecordingAuth {
    fn on_auth_changed(&self, change: AuthChange, _user: Option<&UserSnapshot>) {
        self.0.lock().unwrap().push(change);
    }
}

struct Harness {
    api: Arc<ScriptedApi>,
    navigator: Arc<RecordingNavigator>,
    auth: Arc<RecordingAuth>,
    workflow: ConversionWorkflow,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sheet2deck=debug")
        .with_test_writer()
        .try_init();
}

fn harness(api: ScriptedApi, logged_in: bool) -> Harness {
    init_tracing();
    let api = Arc::new(api);
    let session = SessionStore::in_memory();
    if logged_in {
        session.save_login("tok-123", &free_user(3)).unwrap();
    }
    let auth = Arc::new(RecordingAuth::default());
    session.subscribe(auth.clone());
    let navigator = Arc::new(RecordingNavigator::default());

    let config = ClientConfig::default();
    let notifications = Notifications::new(config.toast_timeout);
    let workflow = ConversionWorkflow::new(config, api.clone(), session, notifications)
        .with_navigator(navigator.clone());

    Harness {
        api,
        navigator,
        auth,
        workflow,
    }
}

fn csv(name: &str) -> FileCandidate {
    FileCandidate::from_bytes(name.to_string(), "region;ventes\nNord;120\nSud;95\n")
}

fn options(title: &str) -> ConversionOptions {
    ConversionOptions::new(title, Theme::Minimal)
}

// ── Success path ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn success_with_warnings_builds_named_artifact() {
    let h = harness(
        ScriptedApi::new()
            .then(deck(Some("Colonne vide ignorée | Ligne 12 incomplète")))
            .with_me(Ok(free_user(4))),
        true,
    );
    h.workflow.select_file(csv("ventes.csv")).unwrap();

    let outcome = h.workflow.submit(&options("Performance Q4 !!")).await;

    let SubmitOutcome::Succeeded(summary) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(summary.filename, "performance-q4.pptx");
    assert_eq!(
        summary.warnings,
        vec!["Colonne vide ignorée", "Ligne 12 incomplète"]
    );
    assert!(summary.path.exists());
    assert_eq!(std::fs::read(&summary.path).unwrap(), b"PK\x03\x04 fake pptx");

    let sent = h.api.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].token, "tok-123");
    assert_eq!(sent[0].file, "ventes.csv");
    assert_eq!(sent[0].title, "Performance Q4 !!");
    assert_eq!(sent[0].theme, Theme::Minimal);
    assert!(sent[0].use_ai);

    assert_eq!(h.workflow.state(), WorkflowState::Idle);
    assert!(h.workflow.pending_file().is_none());
    assert!(h.workflow.last_failure().is_none());
}

#[tokio::test]
async fn defaults_apply_for_blank_title_and_missing_theme() {
    let h = harness(ScriptedApi::new(), true);
    h.workflow.select_file(csv("data.tsv")).unwrap();

    let outcome = h.workflow.submit(&ConversionOptions::default()).await;
    assert!(outcome.is_success());

    let sent = h.api.sent();
    assert_eq!(sent[0].title, "Rapport - Présentation du jour");
    assert_eq!(sent[0].theme, Theme::Corporate);
}

#[tokio::test]
async fn save_artifact_copies_out_of_temp_storage() {
    let h = harness(ScriptedApi::new(), true);
    h.workflow.select_file(csv("ventes.csv")).unwrap();
    assert!(h.workflow.submit(&options("Bilan 2024")).await.is_success());

    let out = tempfile::tempdir().unwrap();
    let saved = h.workflow.save_artifact(out.path()).await.unwrap();
    assert_eq!(saved, out.path().join("bilan-2024.pptx"));

    h.workflow.release_artifact();
    assert!(h.workflow.artifact().is_none());
    assert!(saved.exists());
    assert!(h.workflow.save_artifact(out.path()).await.is_err());
}

#[tokio::test]
async fn only_one_artifact_is_live() {
    let h = harness(ScriptedApi::new(), true);

    h.workflow.select_file(csv("a.csv")).unwrap();
    let SubmitOutcome::Succeeded(first) = h.workflow.submit(&options("Premier")).await else {
        panic!("first submit should succeed");
    };
    assert!(first.path.exists());

    h.workflow.select_file(csv("b.csv")).unwrap();
    assert!(!first.path.exists(), "first artifact released on new selection");

    let SubmitOutcome::Succeeded(second) = h.workflow.submit(&options("Second")).await else {
        panic!("second submit should succeed");
    };
    assert!(second.path.exists());
    assert_eq!(h.workflow.artifact().unwrap().filename, "second.pptx");
}

// ── Usage refresh ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn free_plan_gets_remaining_quota_toast() {
    let h = harness(ScriptedApi::new().with_me(Ok(free_user(7))), true);
    h.workflow.select_file(csv("ventes.csv")).unwrap();
    assert!(h.workflow.submit(&options("Q4")).await.is_success());

    let toast = h.workflow.notifications().toast().expect("usage toast");
    assert_eq!(toast.level, ToastLevel::Info);
    assert!(!toast.persistent);
    assert!(toast.message.contains("3 conversion(s) left"), "{}", toast.message);
    assert!(toast.message.contains("7/10"), "{}", toast.message);

    assert_eq!(
        h.workflow.session().user().unwrap().conversions_this_month,
        7
    );

    tokio::time::sleep(Duration::from_secs(7)).await;
    assert!(h.workflow.notifications().toast().is_none());
}

#[tokio::test]
async fn pro_plan_gets_no_usage_toast() {
    let pro = UserSnapshot {
        plan: Plan::Pro,
        conversions_this_month: 42,
        ..Default::default()
    };
    let h = harness(ScriptedApi::new().with_me(Ok(pro)), true);
    h.workflow.select_file(csv("ventes.csv")).unwrap();
    assert!(h.workflow.submit(&options("Q4")).await.is_success());

    assert!(h.workflow.notifications().toast().is_none());
    assert_eq!(h.workflow.session().user().unwrap().plan, Plan::Pro);
}

#[tokio::test]
async fn refresh_failure_is_silent() {
    let h = harness(ScriptedApi::new(), true);
    h.workflow.select_file(csv("ventes.csv")).unwrap();

    let outcome = h.workflow.submit(&options("Q4")).await;
    assert!(outcome.is_success());
    assert_eq!(*h.api.me_calls.lock().unwrap(), 1);
    assert!(h.workflow.notifications().toast().is_none());
    assert!(h.workflow.inline_error().is_none());
    assert!(h.workflow.session().is_authenticated());
}

#[tokio::test]
async fn refresh_rejected_with_401_ends_session_quietly() {
    let h = harness(
        ScriptedApi::new().with_me(Err(Sheet2DeckError::Api {
            status: 401,
            detail: "Token expiré".into(),
        })),
        true,
    );
    h.workflow.select_file(csv("ventes.csv")).unwrap();

    let outcome = h.workflow.submit(&options("Q4")).await;
    assert!(outcome.is_success(), "the deck already arrived");
    assert!(h.workflow.artifact().is_some());

    assert!(!h.workflow.session().is_authenticated());
    assert!(h.workflow.session().user().is_none());
    assert_eq!(*h.auth.0.lock().unwrap(), vec![AuthChange::Expired]);
    assert!(h.workflow.notifications().toast().is_none());
    assert!(h.workflow.inline_error().is_none());
    assert!(h.navigator.0.lock().unwrap().is_empty());
}

// ── Classified failures ──────────────────────────────────────────────────────

#[tokio::test]
async fn quota_exhausted_opens_modal_only() {
    let h = harness(
        ScriptedApi::new().then(error(403, "5/5 conversions utilisées")),
        true,
    );
    h.workflow.select_file(csv("ventes.csv")).unwrap();

    let outcome = h.workflow.submit(&options("Q4")).await;
    assert_eq!(
        outcome.failure(),
        Some(&ConversionFailure::QuotaExhausted {
            message: "5/5 conversions utilisées".into(),
            used: Some(5),
            limit: Some(5),
        })
    );

    let modal = h.workflow.notifications().modal().expect("quota modal");
    assert_eq!((modal.used, modal.limit), (Some(5), Some(5)));
    assert!(h.workflow.notifications().toast().is_none());
    assert!(h.workflow.inline_error().is_none());
    assert_eq!(*h.api.me_calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn session_expiry_clears_session_and_navigates_to_login() {
    let h = harness(ScriptedApi::new().then(error(401, "Token invalide")), true);
    h.workflow.select_file(csv("ventes.csv")).unwrap();

    let outcome = h.workflow.submit(&options("Q4")).await;
    assert_eq!(outcome.failure(), Some(&ConversionFailure::SessionExpired));

    assert!(!h.workflow.session().is_authenticated());
    assert!(h.workflow.session().user().is_none());
    assert_eq!(*h.navigator.0.lock().unwrap(), vec![Route::Login]);
    assert_eq!(
        *h.auth.0.lock().unwrap(),
        vec![AuthChange::Expired],
        "listeners hear about the expiry"
    );
    assert!(h.workflow.notifications().toast().is_some());
}

#[tokio::test]
async fn row_limit_gets_persistent_toast() {
    let h = harness(
        ScriptedApi::new().then(error(403, "Votre fichier dépasse la limite du plan Free.")),
        true,
    );
    h.workflow.select_file(csv("ventes.csv")).unwrap();

    let outcome = h.workflow.submit(&options("Q4")).await;
    assert_eq!(
        outcome.failure().map(ConversionFailure::code),
        Some("row-limit-exceeded")
    );
    let toast = h.workflow.notifications().toast().unwrap();
    assert!(toast.persistent);
    assert_eq!(toast.message, "Votre fichier dépasse la limite du plan Free.");
    assert!(h.workflow.notifications().modal().is_none());
}

#[tokio::test]
async fn server_too_large_gets_persistent_toast() {
    let h = harness(
        ScriptedApi::new().then(error(413, "Fichier trop volumineux")),
        true,
    );
    h.workflow.select_file(csv("ventes.csv")).unwrap();

    let outcome = h.workflow.submit(&options("Q4")).await;
    assert_eq!(outcome.failure().map(ConversionFailure::code), Some("too-large"));
    assert!(h.workflow.notifications().toast().unwrap().persistent);
}

#[tokio::test]
async fn server_error_is_shown_inline() {
    let h = harness(
        ScriptedApi::new().then(error(500, "Erreur interne")),
        true,
    );
    h.workflow.select_file(csv("ventes.csv")).unwrap();

    let outcome = h.workflow.submit(&options("Q4")).await;
    assert_eq!(
        outcome.failure(),
        Some(&ConversionFailure::ServerError {
            status: 500,
            message: "Erreur interne".into()
        })
    );
    assert!(h.workflow.inline_error().unwrap().contains("Erreur interne"));
    assert!(h.workflow.notifications().toast().is_none());
    assert!(h.workflow.session().is_authenticated());
}

#[tokio::test]
async fn transport_failure_is_unknown() {
    let h = harness(ScriptedApi::new().then_transport_error(), true);
    h.workflow.select_file(csv("ventes.csv")).unwrap();

    let outcome = h.workflow.submit(&options("Q4")).await;
    let Some(ConversionFailure::Unknown { message }) = outcome.failure() else {
        panic!("expected unknown failure, got {outcome:?}");
    };
    assert!(message.contains("connection refused"));
    assert_eq!(h.workflow.state(), WorkflowState::Idle);
    assert!(h.workflow.notifications().toast().is_some());
}

// ── Guards ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_without_file_does_nothing() {
    let h = harness(ScriptedApi::new(), true);
    let outcome = h.workflow.submit(&options("Q4")).await;
    assert_eq!(outcome, SubmitOutcome::NoFile);
    assert!(h.api.sent().is_empty());
    assert_eq!(h.workflow.state(), WorkflowState::Idle);
    assert!(h.workflow.last_failure().is_none());
}

#[tokio::test]
async fn logged_out_submit_never_reaches_backend() {
    let h = harness(ScriptedApi::new(), false);
    h.workflow.select_file(csv("ventes.csv")).unwrap();

    let outcome = h.workflow.submit(&options("Q4")).await;
    assert_eq!(outcome.failure(), Some(&ConversionFailure::NotAuthenticated));
    assert!(h.api.sent().is_empty());
    assert!(h.workflow.inline_error().is_some());
    assert!(h.workflow.pending_file().is_some(), "file kept for a retry after login");
    assert!(h.navigator.0.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn second_submit_while_in_flight_is_refused() {
    let h = harness(ScriptedApi::slow(Duration::from_secs(5)), true);
    h.workflow.select_file(csv("a.csv")).unwrap();

    let first_options = options("Premier");
    let first = h.workflow.submit(&first_options);
    let second = async {
        tokio::task::yield_now().await;
        assert_eq!(h.workflow.state(), WorkflowState::Submitting);
        h.workflow.select_file(csv("b.csv")).unwrap();
        h.workflow.submit(&options("Second")).await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_success());
    assert_eq!(second, SubmitOutcome::Busy);
    assert_eq!(h.api.sent().len(), 1);
    assert_eq!(h.workflow.state(), WorkflowState::Idle);
}

#[tokio::test(start_paused = true)]
async fn submit_while_in_flight_is_busy_even_without_a_new_file() {
    let h = harness(ScriptedApi::slow(Duration::from_secs(5)), true);
    h.workflow.select_file(csv("a.csv")).unwrap();

    let first_options = options("Premier");
    let first = h.workflow.submit(&first_options);
    let second = async {
        tokio::task::yield_now().await;
        assert!(h.workflow.pending_file().is_none(), "upload took the pending file");
        h.workflow.submit(&options("Encore")).await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_success());
    assert_eq!(second, SubmitOutcome::Busy);
    assert_eq!(h.api.sent().len(), 1);
}

// ── Intake ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn oversized_excel_is_rejected_with_persistent_toast() {
    let h = harness(ScriptedApi::new(), true);
    h.workflow.select_file(csv("ventes.csv")).unwrap();

    let big = vec![0u8; 8 * 1024 * 1024 + 1];
    assert!(h
        .workflow
        .select_file(FileCandidate::from_bytes("budget.XLSX", big))
        .is_err());

    assert!(h.workflow.pending_file().is_none(), "previous pending file cleared");
    let toast = h.workflow.notifications().toast().unwrap();
    assert!(toast.persistent);
    assert_eq!(toast.level, ToastLevel::Error);
    assert_eq!(
        h.workflow.last_failure().map(|f| f.code()),
        Some("too-large")
    );

    assert_eq!(h.workflow.submit(&options("Q4")).await, SubmitOutcome::NoFile);
}

#[tokio::test]
async fn unsupported_extension_is_rejected_with_toast() {
    let h = harness(ScriptedApi::new(), true);
    assert!(h
        .workflow
        .select_file(FileCandidate::from_bytes("slides.pdf", "%PDF"))
        .is_err());

    let toast = h.workflow.notifications().toast().unwrap();
    assert!(!toast.persistent);
    assert_eq!(
        h.workflow.last_failure().map(|f| f.code()),
        Some("unsupported-format")
    );
}
