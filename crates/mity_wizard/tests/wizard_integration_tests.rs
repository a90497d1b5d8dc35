//! End-to-end wizard flows driven through a mock chat channel.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use mity_chat::{ChatSession, Endpoint, MockConnector, SessionEvent};
use mity_wizard::{
    AgentLauncher, CheckpointStore, CheckpointWriter, MemoryCheckpointStore, NewProject,
    PersistedStep, ProjectMode, ProjectRegistry, ResumeReconciler, SpecMethod, Step,
    WizardContext, WizardController, WizardError, WizardResult, WizardStatus, WizardStep,
};

#[derive(Default)]
struct RecordingApi {
    created: Mutex<Vec<NewProject>>,
    registered: Mutex<Vec<(String, String)>>,
    started: Mutex<Vec<(String, bool)>>,
}

#[async_trait]
impl ProjectRegistry for RecordingApi {
    async fn create_project(&self, project: &NewProject) -> WizardResult<()> {
        self.created.lock().push(project.clone());
        Ok(())
    }

    async fn register_existing(&self, name: &str, repo_url: &str) -> WizardResult<()> {
        self.registered
            .lock()
            .push((name.to_string(), repo_url.to_string()));
        Ok(())
    }
}

#[async_trait]
impl AgentLauncher for RecordingApi {
    async fn start_agent(&self, project: &str, yolo_mode: bool) -> WizardResult<()> {
        self.started.lock().push((project.to_string(), yolo_mode));
        Ok(())
    }
}

fn controller(
    ctx: WizardContext,
    api: &Arc<RecordingApi>,
    store: &MemoryCheckpointStore,
) -> WizardController {
    let writer = CheckpointWriter::spawn(Arc::new(store.clone()));
    WizardController::new(ctx, api.clone(), api.clone(), writer)
}

#[tokio::test]
async fn test_new_project_assisted_flow() {
    let api = Arc::new(RecordingApi::default());
    let store = MemoryCheckpointStore::new();
    let mut wizard = controller(WizardContext::fresh(), &api, &store);

    wizard.select_mode(ProjectMode::New).unwrap();
    wizard
        .submit_details("demo-app", "https://example.com/demo.git")
        .await
        .unwrap();
    assert_eq!(wizard.choose_method(SpecMethod::Assisted).await.unwrap(), Step::Chat);

    wizard.checkpoints().flush().await;
    let saved = store.get("demo-app").unwrap();
    assert_eq!(saved.step, PersistedStep::Known(WizardStep::Chat));
    assert_eq!(saved.spec_method, Some(SpecMethod::Assisted));
    assert_eq!(api.created.lock().len(), 1);
    assert_eq!(api.created.lock()[0].repo_url, "https://example.com/demo.git");

    let connector = MockConnector::new();
    let mut chat = ChatSession::new(
        "demo-app",
        Box::new(connector.clone()),
        Endpoint::new("http://127.0.0.1:8888"),
    );
    chat.open().await.unwrap();
    assert_eq!(
        connector.connected_targets(),
        vec!["ws://127.0.0.1:8888/api/spec/ws/demo-app".to_string()]
    );

    connector.push_frame(r#"{"type":"progress","message":"Drafting"}"#);
    connector.push_frame(r#"{"type":"complete","spec_path":"/x/spec.md"}"#);

    let spec_path = loop {
        match chat.next_event().await {
            SessionEvent::Completed { spec_path } => break spec_path,
            SessionEvent::Disconnected => panic!("channel closed before completion"),
            _ => {}
        }
    };
    assert_eq!(spec_path, "/x/spec.md");

    assert_eq!(wizard.on_chat_complete(&spec_path).await.unwrap(), Step::Complete);
    assert_eq!(*api.started.lock(), vec![("demo-app".to_string(), false)]);

    wizard.checkpoints().flush().await;
    assert!(store.get("demo-app").is_none());
}

#[tokio::test]
async fn test_resume_at_method_skips_registration() {
    let api = Arc::new(RecordingApi::default());
    let store = MemoryCheckpointStore::new();
    let persisted: WizardStatus =
        serde_json::from_str(r#"{"step":"method","spec_method":null,"started_at":"2026-03-01T10:00:00Z","chat_messages":[]}"#)
            .unwrap();
    store.save("demo-app", &persisted).await.unwrap();

    let ctx = ResumeReconciler::fetch(&store, "demo-app").await;
    assert_eq!(ctx.step, Step::Method);
    assert_eq!(ctx.spec_method, None);
    assert!(ctx.resuming);

    let mut wizard = controller(ctx, &api, &store);
    assert_eq!(wizard.choose_method(SpecMethod::Assisted).await.unwrap(), Step::Chat);
    assert!(api.created.lock().is_empty());

    wizard.checkpoints().flush().await;
    let saved = store.get("demo-app").unwrap();
    assert_eq!(saved.step, PersistedStep::Known(WizardStep::Chat));
    assert_eq!(saved.started_at, persisted.started_at);
}

#[tokio::test]
async fn test_checkpoint_round_trip_through_resume() {
    let api = Arc::new(RecordingApi::default());
    let store = MemoryCheckpointStore::new();
    let mut wizard = controller(WizardContext::fresh(), &api, &store);

    wizard.select_mode(ProjectMode::New).unwrap();
    wizard
        .submit_details("demo-app", "https://example.com/demo.git")
        .await
        .unwrap();
    wizard.choose_method(SpecMethod::Assisted).await.unwrap();
    wizard.checkpoints().flush().await;
    drop(wizard);

    let ctx = ResumeReconciler::fetch(&store, "demo-app").await;
    assert_eq!(ctx.step, Step::Chat);
    assert_eq!(ctx.spec_method, Some(SpecMethod::Assisted));
    assert_eq!(ctx.project_name.as_deref(), Some("demo-app"));
}

#[tokio::test]
async fn test_existing_repository_flow() {
    let api = Arc::new(RecordingApi::default());
    let store = MemoryCheckpointStore::new();
    let mut wizard = controller(WizardContext::fresh(), &api, &store);

    wizard.select_mode(ProjectMode::Existing).unwrap();
    assert!(matches!(
        wizard.submit_details("legacy", "ftp://example.com/legacy").await,
        Err(WizardError::Validation(_))
    ));
    assert_eq!(
        wizard
            .submit_details("legacy", "ssh://git@example.com/legacy.git")
            .await
            .unwrap(),
        Step::Complete
    );

    assert_eq!(
        *api.registered.lock(),
        vec![("legacy".to_string(), "ssh://git@example.com/legacy.git".to_string())]
    );
    wizard.checkpoints().flush().await;
    assert!(store.is_empty());
}
