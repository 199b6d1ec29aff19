//! Tests against real model APIs. Run with `cargo test -- --ignored` and the
//! provider's API key set.

use nl2hls::{
    AlgorithmInputs, AnthropicProvider, Forge, LlmProvider, OpenAIProvider, PipelineKind,
};
use tempfile::TempDir;

fn has_gxx() -> bool {
    std::process::Command::new("g++")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[tokio::test]
#[ignore]
async fn test_anthropic_simple_response() {
    if std::env::var("ANTHROPIC_API_KEY").is_err() {
        return;
    }

    let provider = AnthropicProvider::sonnet().expect("create provider");
    let reply = provider
        .ask("respond with only the word HELLO")
        .await
        .expect("should get response");

    assert!(
        reply.to_uppercase().contains("HELLO"),
        "expected HELLO in response, got: {}",
        reply
    );
}

#[tokio::test]
#[ignore]
async fn test_openai_simple_response() {
    if std::env::var("OPENAI_API_KEY").is_err() {
        return;
    }

    let provider = OpenAIProvider::gpt4o().expect("create provider");
    let reply = provider
        .ask("respond with only the word HELLO")
        .await
        .expect("should get response");

    assert!(
        reply.to_uppercase().contains("HELLO"),
        "expected HELLO in response, got: {}",
        reply
    );
}

#[tokio::test]
#[ignore]
async fn test_software_pipeline_reaches_passing_code() {
    if std::env::var("ANTHROPIC_API_KEY").is_err() || !has_gxx() {
        return;
    }

    let dir = TempDir::new().expect("create temp dir");
    let forge = Forge::builder()
        .anthropic(None)
        .expect("create provider")
        .pipeline(PipelineKind::Software)
        .build_dir(dir.path().join("build"))
        .n_round(12)
        .investment(1.0)
        .build()
        .expect("build forge");

    let inputs = AlgorithmInputs::new(
        "Compute the dot product of two int arrays of length 8. \
         The top function is `int dot8(const int a[8], const int b[8])`.",
    )
    .with_top_function("dot8");

    let output = forge
        .run(inputs)
        .await
        .expect("start run")
        .output()
        .await
        .expect("run should not abort");

    assert!(
        output.report.passed,
        "expected a passing run, got {:?} after {} rounds",
        output.report.termination, output.report.rounds
    );
    assert!(dir.path().join("build").join("impl").join("impl.cpp").exists());
}
