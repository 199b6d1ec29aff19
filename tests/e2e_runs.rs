mod common;

use nl2hls::{
    AlgorithmInputs, Forge, PipelineKind, RecordStatus, RetryConfig, SqliteRunStore, Termination,
};
use tempfile::TempDir;

use common::{ADD_CODE, DESIGN_REFERENCE, ScriptedLlm, Tools, WRITE_CODE};

fn forge_with_store(dir: &TempDir, llm: ScriptedLlm, tools: &Tools) -> Forge {
    let store = SqliteRunStore::new(dir.path().join("runs.db")).expect("create store");
    Forge::builder()
        .provider(llm)
        .toolchain(tools.toolchain())
        .store(store)
        .build_dir(dir.path().join("build"))
        .pipeline(PipelineKind::Software)
        .retry(RetryConfig::new(0, 1))
        .build()
        .expect("build forge")
}

fn inputs() -> AlgorithmInputs {
    AlgorithmInputs::new("add two integers").with_top_function("add")
}

#[tokio::test]
async fn test_passing_run_is_recorded() {
    let dir = TempDir::new().expect("create temp dir");
    let tools = Tools::passing();
    let forge = forge_with_store(&dir, ScriptedLlm::happy_path(), &tools);

    let output = forge
        .run(inputs())
        .await
        .expect("start run")
        .output()
        .await
        .expect("run should finish");

    let record = forge.load_run(&output.run_id).await.expect("load run");
    assert_eq!(record.status, RecordStatus::Passed);
    assert_eq!(record.termination, Some(Termination::Quiescent));
    assert_eq!(record.rounds, output.report.rounds);
    assert_eq!(record.messages.len(), output.report.messages.len());
    assert_eq!(record.requirement, "add two integers");
    assert_eq!(record.pipeline, "software");
    assert!(record.error.is_none());
    assert!(record.spent > 0.0);
}

#[tokio::test]
async fn test_runs_are_listed_and_filtered() {
    let dir = TempDir::new().expect("create temp dir");
    let tools = Tools::passing();
    let forge = forge_with_store(&dir, ScriptedLlm::happy_path(), &tools);

    for _ in 0..2 {
        forge
            .run(inputs())
            .await
            .expect("start run")
            .output()
            .await
            .expect("run should finish");
    }

    let all = forge.runs(None).await.expect("list runs");
    assert_eq!(all.len(), 2);

    let passed = forge
        .runs(Some(RecordStatus::Passed))
        .await
        .expect("list passed runs");
    assert_eq!(passed.len(), 2);

    let failed = forge
        .runs(Some(RecordStatus::Failed))
        .await
        .expect("list failed runs");
    assert!(failed.is_empty());
}

#[tokio::test]
async fn test_run_loads_by_prefix() {
    let dir = TempDir::new().expect("create temp dir");
    let tools = Tools::passing();
    let forge = forge_with_store(&dir, ScriptedLlm::happy_path(), &tools);

    let output = forge
        .run(inputs())
        .await
        .expect("start run")
        .output()
        .await
        .expect("run should finish");

    let record = forge
        .load_run(&output.run_id[..8])
        .await
        .expect("load by prefix");
    assert_eq!(record.id, output.run_id);
}

#[tokio::test]
async fn test_export_is_valid_json_with_messages() {
    let dir = TempDir::new().expect("create temp dir");
    let tools = Tools::passing();
    let forge = forge_with_store(&dir, ScriptedLlm::happy_path(), &tools);

    let output = forge
        .run(inputs())
        .await
        .expect("start run")
        .output()
        .await
        .expect("run should finish");

    let json = forge.export_run(&output.run_id).await.expect("export run");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");

    assert_eq!(value["id"], output.run_id.as_str());
    assert_eq!(value["status"], "Passed");
    let messages = value["messages"].as_array().expect("messages array");
    assert_eq!(messages.len(), output.report.messages.len());
}

#[tokio::test]
async fn test_aborted_run_is_recorded_as_failed() {
    let dir = TempDir::new().expect("create temp dir");
    let tools = Tools::passing();
    // The test designer gets no reply, so round one aborts.
    let llm = ScriptedLlm::new()
        .on(WRITE_CODE, &[ADD_CODE])
        .on(DESIGN_REFERENCE, &["add(2, 3) = 5"]);
    let forge = forge_with_store(&dir, llm, &tools);

    let err = forge
        .run(inputs())
        .await
        .expect("start run")
        .output()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("WriteTestCase"), "got: {}", err);

    let runs = forge
        .runs(Some(RecordStatus::Failed))
        .await
        .expect("list failed runs");
    assert_eq!(runs.len(), 1);

    let record = forge.load_run(&runs[0].id).await.expect("load run");
    assert_eq!(record.termination, None);
    assert!(record.error.as_deref().unwrap_or_default().contains("WriteTestCase"));
    assert!(!record.messages.is_empty());
}

#[tokio::test]
async fn test_delete_run_removes_record() {
    let dir = TempDir::new().expect("create temp dir");
    let tools = Tools::passing();
    let forge = forge_with_store(&dir, ScriptedLlm::happy_path(), &tools);

    let output = forge
        .run(inputs())
        .await
        .expect("start run")
        .output()
        .await
        .expect("run should finish");

    forge.delete_run(&output.run_id).await.expect("delete run");
    assert!(forge.load_run(&output.run_id).await.is_err());
    assert!(forge.delete_run(&output.run_id).await.is_err());
}

#[tokio::test]
async fn test_run_queries_need_a_store() {
    let tools = Tools::passing();
    let forge = Forge::builder()
        .provider(ScriptedLlm::happy_path())
        .toolchain(tools.toolchain())
        .build()
        .expect("build forge");

    let err = forge.runs(None).await.unwrap_err();
    assert!(err.to_string().contains("no run store"));
}
