#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Duration;

use nl2hls::{
    Compiler, ExecutableRunner, HlsProject, HlsTool, LlmProvider, ToolOutcome, Toolchain,
};

/// Prompt markers, one per templated action.
pub const WRITE_CODE: &str = "Translate the algorithm description";
pub const FIX_COMPILE: &str = "fails to compile";
pub const FIX_RUN: &str = "compiles but fails its tests";
pub const DESIGN_REFERENCE: &str = "representative test vectors";
pub const WRITE_TEST: &str = "Write C++ assertions";
pub const REPAIR_HLS: &str = "fully synthesizable";
pub const FIX_HLS: &str = "failed in the HLS flow";
pub const PREPROCESS: &str = "canonical, synthesis-friendly";
pub const LOOP_STRATEGY: &str = "Restructure the loops";
pub const CHOOSE_OPTS: &str = "These pragmas are available";
pub const APPLY_OPTS: &str = "Insert the pragmas";
pub const FIX_OPT: &str = "Synthesis of the optimized code below failed";

pub const ADD_CODE: &str = "```cpp\nint add(int a, int b) {\n    return a + b;\n}\n```";
pub const ADD_TEST: &str =
    "```cpp\nint add(int a, int b);\nint main() { return add(2, 3) == 5 ? 0 : 1; }\n```";

struct Rule {
    marker: String,
    replies: VecDeque<String>,
    last: String,
}

/// A mock LLM that answers by matching a marker in the prompt.
///
/// Each marker has a queue of replies; once the queue is drained the last
/// reply repeats. Prompts with no matching marker fail the call.
#[derive(Default)]
pub struct ScriptedLlm {
    rules: Mutex<Vec<Rule>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, marker: &str, replies: &[&str]) -> Self {
        let mut queue: VecDeque<String> = replies.iter().map(|r| r.to_string()).collect();
        let last = queue.back().cloned().unwrap_or_default();
        if queue.len() > 1 {
            queue.pop_back();
        } else {
            queue.clear();
        }
        let mut rules = self.rules.lock().unwrap();
        rules.retain(|r| r.marker != marker);
        rules.push(Rule {
            marker: marker.to_string(),
            replies: queue,
            last,
        });
        drop(rules);
        self
    }

    /// Replies for a full, trouble-free run of the `add` algorithm.
    pub fn happy_path() -> Self {
        Self::new()
            .on(WRITE_CODE, &[ADD_CODE])
            .on(FIX_COMPILE, &[ADD_CODE])
            .on(FIX_RUN, &[ADD_CODE])
            .on(DESIGN_REFERENCE, &["add(2, 3) = 5"])
            .on(WRITE_TEST, &[ADD_TEST])
            .on(REPAIR_HLS, &[ADD_CODE])
            .on(FIX_HLS, &[ADD_CODE])
            .on(PREPROCESS, &[ADD_CODE])
            .on(LOOP_STRATEGY, &[ADD_CODE])
            .on(CHOOSE_OPTS, &["null"])
            .on(APPLY_OPTS, &[ADD_CODE])
            .on(FIX_OPT, &[ADD_CODE])
    }

    /// Every prompt seen so far that contains `marker`.
    pub fn prompts_with(&self, marker: &str) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(marker))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn ask(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .iter_mut()
            .find(|r| prompt.contains(&r.marker))
            .ok_or_else(|| anyhow::anyhow!("ScriptedLlm: no reply scripted for this prompt"))?;
        Ok(rule.replies.pop_front().unwrap_or_else(|| rule.last.clone()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Provider handle that lets a test keep inspecting prompts after the
/// builder takes ownership.
pub struct SharedLlm(pub Arc<ScriptedLlm>);

#[async_trait]
impl LlmProvider for SharedLlm {
    async fn ask(&self, prompt: &str) -> Result<String> {
        self.0.ask(prompt).await
    }

    fn name(&self) -> &str {
        self.0.name()
    }
}

/// Outcome queue whose last entry repeats.
#[derive(Default)]
pub struct Outcomes {
    queue: Mutex<VecDeque<ToolOutcome>>,
    calls: Mutex<usize>,
}

impl Outcomes {
    pub fn new(outcomes: Vec<ToolOutcome>) -> Self {
        Self {
            queue: Mutex::new(outcomes.into()),
            calls: Mutex::new(0),
        }
    }

    pub fn always(outcome: ToolOutcome) -> Self {
        Self::new(vec![outcome])
    }

    fn next(&self) -> ToolOutcome {
        *self.calls.lock().unwrap() += 1;
        let mut queue = self.queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| ToolOutcome::success(""))
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

pub struct ScriptedCompiler(pub Arc<Outcomes>);

#[async_trait]
impl Compiler for ScriptedCompiler {
    async fn compile(&self, _sources: &[PathBuf], _output: &Path) -> Result<ToolOutcome> {
        Ok(self.0.next())
    }
}

pub struct ScriptedRunner(pub Arc<Outcomes>);

#[async_trait]
impl ExecutableRunner for ScriptedRunner {
    async fn run(&self, _exe: &Path, _cwd: &Path, _limit: Duration) -> Result<ToolOutcome> {
        Ok(self.0.next())
    }
}

/// A cosimulation request together with the testbench text it was given.
#[derive(Debug, Clone)]
pub struct CosimCall {
    pub project: HlsProject,
    pub testbench_text: Vec<String>,
}

/// HLS tool stub that records every project it is handed.
pub struct ScriptedHls {
    pub synth: Arc<Outcomes>,
    pub cosim: Arc<Outcomes>,
    pub synth_projects: Mutex<Vec<HlsProject>>,
    pub cosim_calls: Mutex<Vec<CosimCall>>,
}

impl ScriptedHls {
    /// Top function of every synthesis and cosimulation, in no particular order.
    pub fn tops(&self) -> Vec<String> {
        let synth = self.synth_projects.lock().unwrap();
        let cosim = self.cosim_calls.lock().unwrap();
        synth
            .iter()
            .chain(cosim.iter().map(|c| &c.project))
            .map(|p| p.top.clone())
            .collect()
    }

    pub fn cosim_calls(&self) -> Vec<CosimCall> {
        self.cosim_calls.lock().unwrap().clone()
    }

    pub fn synth_projects(&self) -> Vec<HlsProject> {
        self.synth_projects.lock().unwrap().clone()
    }
}

#[async_trait]
impl HlsTool for ScriptedHls {
    async fn synthesize(&self, project: &HlsProject) -> Result<ToolOutcome> {
        self.synth_projects.lock().unwrap().push(project.clone());
        Ok(self.synth.next())
    }

    async fn cosimulate(&self, project: &HlsProject) -> Result<ToolOutcome> {
        // Read now; later rounds may rewrite the files.
        let testbench_text = project
            .testbenches
            .iter()
            .map(|tb| std::fs::read_to_string(tb).unwrap_or_default())
            .collect();
        self.cosim_calls.lock().unwrap().push(CosimCall {
            project: project.clone(),
            testbench_text,
        });
        Ok(self.cosim.next())
    }
}

/// Scripted toolchain plus handles for inspecting call counts.
pub struct Tools {
    pub compile: Arc<Outcomes>,
    pub run: Arc<Outcomes>,
    pub hls: Arc<ScriptedHls>,
}

impl Tools {
    pub fn passing() -> Self {
        Self::new(
            Outcomes::always(ToolOutcome::success("")),
            Outcomes::always(ToolOutcome::success("all vectors match")),
            Outcomes::always(ToolOutcome::success("synthesis done")),
            Outcomes::always(ToolOutcome::success("cosim done")),
        )
    }

    pub fn new(compile: Outcomes, run: Outcomes, synth: Outcomes, cosim: Outcomes) -> Self {
        Self {
            compile: Arc::new(compile),
            run: Arc::new(run),
            hls: Arc::new(ScriptedHls {
                synth: Arc::new(synth),
                cosim: Arc::new(cosim),
                synth_projects: Mutex::new(Vec::new()),
                cosim_calls: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain::new(
            Arc::new(ScriptedCompiler(Arc::clone(&self.compile))),
            Arc::new(ScriptedRunner(Arc::clone(&self.run))),
            self.hls.clone(),
        )
    }
}

/// Whether a real `g++` is on PATH.
pub fn has_gxx() -> bool {
    std::process::Command::new("g++")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
