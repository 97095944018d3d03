//! Fail-fast batch walker.
//!
//! [`BatchWalker`] traverses a [`DirectoryTree`] depth-first in lexicographic
//! order. Every non-directory entry whose base name equals the plan's marker
//! becomes a [`Job`]; the job's invocations run through the
//! [`CommandRunner`] in the marker's directory, in plan order.
//!
//! The traversal is an explicit stack of pending entries rather than
//! recursion. After every listing and every job the walker checks for
//! failure and, on the first one, moves to [`WalkState::Aborted`] and
//! returns without touching any later entry.

use std::path::{Path, PathBuf};

use chrono::Utc;
use refarch_types::config::BatchConfig;
use refarch_types::error::{CommandError, WalkError};
use refarch_types::walk::{
    CaptureMode, DirectoryEntry, Invocation, Job, JobReport, MarkerFile, WalkReport, WalkState,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::runner::CommandRunner;
use crate::tree::DirectoryTree;

// ---------------------------------------------------------------------------
// Job plan
// ---------------------------------------------------------------------------

/// One subcommand of the external tool, run once per marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subcommand {
    pub name: String,
    /// Arguments appended after `-f <marker>`.
    pub extra_args: Vec<String>,
}

impl Subcommand {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.extra_args = args.iter().map(|a| a.to_string()).collect();
        self
    }
}

/// What to run for every marker found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan {
    pub tool: String,
    pub marker_file: String,
    pub subcommands: Vec<Subcommand>,
    pub capture: CaptureMode,
    pub failure_message: String,
}

impl JobPlan {
    /// `<tool> ensure -f <marker>` then `<tool> teardown -f <marker>`, streamed.
    pub fn run_all(config: &BatchConfig) -> Self {
        Self {
            tool: config.tool.clone(),
            marker_file: config.marker_file.clone(),
            subcommands: vec![Subcommand::new("ensure"), Subcommand::new("teardown")],
            capture: CaptureMode::Stream,
            failure_message: "error running valet workflow".to_string(),
        }
    }

    /// `<tool> gen-docs -f <marker> -o README.md`, buffered.
    pub fn gen_docs(config: &BatchConfig) -> Self {
        Self {
            tool: config.tool.clone(),
            marker_file: config.marker_file.clone(),
            subcommands: vec![Subcommand::new("gen-docs").with_args(&["-o", "README.md"])],
            capture: CaptureMode::Buffer,
            failure_message: "error generating docs".to_string(),
        }
    }

    /// Build the job for one marker.
    pub fn job_for(&self, marker: MarkerFile) -> Job {
        let working_dir = marker.containing_dir().to_path_buf();
        let marker_name = marker.file_name();
        let invocations = self
            .subcommands
            .iter()
            .map(|sub| {
                let mut args = vec![sub.name.clone(), "-f".to_string(), marker_name.clone()];
                args.extend(sub.extra_args.iter().cloned());
                Invocation {
                    program: self.tool.clone(),
                    args,
                    working_dir: working_dir.clone(),
                    capture: self.capture,
                    failure_message: self.failure_message.clone(),
                }
            })
            .collect();
        Job {
            id: Uuid::now_v7(),
            marker,
            invocations,
        }
    }
}

// ---------------------------------------------------------------------------
// BatchWalker
// ---------------------------------------------------------------------------

/// Walks a tree and runs one job per marker, stopping at the first failure.
pub struct BatchWalker<T: DirectoryTree, R: CommandRunner> {
    tree: T,
    runner: R,
    plan: JobPlan,
    state: WalkState,
}

impl<T: DirectoryTree, R: CommandRunner> BatchWalker<T, R> {
    pub fn new(tree: T, runner: R, plan: JobPlan) -> Self {
        Self {
            tree,
            runner,
            plan,
            state: WalkState::Idle,
        }
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Walk `root` and run every job, or stop at the first failure.
    pub async fn walk(&mut self, root: &Path) -> Result<WalkReport, WalkError> {
        self.transition(WalkState::Walking);

        let mut pending: Vec<DirectoryEntry> = Vec::new();
        let mut jobs = Vec::new();

        if let Err(err) = self.push_children(root, &mut pending).await {
            return Err(self.abort(err));
        }

        while let Some(entry) = pending.pop() {
            if entry.is_dir {
                if let Err(err) = self.push_children(&entry.path, &mut pending).await {
                    return Err(self.abort(err));
                }
                continue;
            }

            let Some(marker) = entry.as_marker(&self.plan.marker_file) else {
                continue;
            };

            let job = self.plan.job_for(marker);
            self.transition(WalkState::Invoking);
            match self.run_job(&job).await {
                Ok(report) => {
                    jobs.push(report);
                    self.transition(WalkState::Walking);
                }
                Err(source) => {
                    return Err(self.abort(WalkError::Job {
                        marker: job.marker.path,
                        source,
                    }));
                }
            }
        }

        self.transition(WalkState::Done);
        Ok(WalkReport {
            root: root.to_path_buf(),
            jobs,
        })
    }

    /// List `dir`, sort by base name, and push children so the smallest name
    /// is popped first.
    async fn push_children(
        &self,
        dir: &Path,
        pending: &mut Vec<DirectoryEntry>,
    ) -> Result<(), WalkError> {
        let mut children = self.tree.list(dir).await?;
        children.sort_by(|a, b| a.base_name.cmp(&b.base_name));
        pending.extend(children.into_iter().rev());
        Ok(())
    }

    async fn run_job(&self, job: &Job) -> Result<JobReport, CommandError> {
        let marker_path = job.marker.path.display().to_string();
        let span = tracing::info_span!("job", job_id = %job.id, marker = %marker_path);

        async {
            let started_at = Utc::now();
            let mut commands = Vec::with_capacity(job.invocations.len());
            for invocation in &job.invocations {
                let command = invocation.command_line();
                tracing::debug!(
                    command = %command,
                    dir = %invocation.working_dir.display(),
                    "running"
                );
                self.runner.run(invocation).await?;
                commands.push(command);
            }
            tracing::info!("Successfully processed {marker_path}");
            Ok::<_, CommandError>(JobReport {
                job_id: job.id,
                marker: job.marker.path.clone(),
                working_dir: working_dir_of(job),
                commands,
                started_at,
                finished_at: Utc::now(),
            })
        }
        .instrument(span)
        .await
    }

    fn abort(&mut self, err: WalkError) -> WalkError {
        self.transition(WalkState::Aborted);
        err
    }

    fn transition(&mut self, next: WalkState) {
        tracing::trace!(from = %self.state, to = %next, "walk state");
        if next.is_terminal() {
            tracing::debug!("walk finished: {next}");
        }
        self.state = next;
    }
}

fn working_dir_of(job: &Job) -> PathBuf {
    job.invocations
        .first()
        .map(|inv| inv.working_dir.clone())
        .unwrap_or_else(|| job.marker.containing_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use refarch_types::process::{ExitOutcome, SubprocessResult};

    use super::*;
    use crate::tree::MemoryTree;

    /// Records every invocation; fails the ones matching `fail_when`.
    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
        fail_when: Option<(PathBuf, String)>,
    }

    impl RecordingRunner {
        fn failing_at(dir: &str, subcommand: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_when: Some((PathBuf::from(dir), subcommand.to_string())),
            }
        }

        fn calls(&self) -> Vec<(PathBuf, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for RecordingRunner {
        async fn run(&self, invocation: &Invocation) -> Result<SubprocessResult, CommandError> {
            self.calls
                .lock()
                .unwrap()
                .push((invocation.working_dir.clone(), invocation.args.clone()));
            if let Some((dir, sub)) = &self.fail_when {
                if &invocation.working_dir == dir && &invocation.args[0] == sub {
                    return Err(CommandError::Failed {
                        message: invocation.failure_message.clone(),
                        exit_code: Some(1),
                        diagnostic: "boom".to_string(),
                    });
                }
            }
            Ok(SubprocessResult {
                exit: ExitOutcome::from_code(0),
                stdout_lines: Vec::new(),
                stderr: Vec::new(),
            })
        }
    }

    fn run_all_plan() -> JobPlan {
        JobPlan::run_all(&BatchConfig::default())
    }

    fn dirs_and_subcommands(calls: &[(PathBuf, Vec<String>)]) -> Vec<(String, String)> {
        calls
            .iter()
            .map(|(dir, args)| (dir.display().to_string(), args[0].clone()))
            .collect()
    }

    #[tokio::test]
    async fn tree_without_markers_runs_nothing() {
        let tree = MemoryTree::new("/w")
            .file("README.md")
            .file("a/values.yaml")
            .dir("b/c");
        let mut walker = BatchWalker::new(tree, RecordingRunner::default(), run_all_plan());

        let report = walker.walk(Path::new("/w")).await.unwrap();

        assert!(report.jobs.is_empty());
        assert!(walker.runner().calls().is_empty());
        assert_eq!(walker.state(), WalkState::Done);
    }

    #[tokio::test]
    async fn every_marker_runs_subcommands_in_order() {
        let tree = MemoryTree::new("/w")
            .file("b/workflow.yaml")
            .file("a/workflow.yaml")
            .file("a/nested/workflow.yaml");
        let mut walker = BatchWalker::new(tree, RecordingRunner::default(), run_all_plan());

        let report = walker.walk(Path::new("/w")).await.unwrap();

        assert_eq!(report.jobs.len(), 3);
        assert_eq!(
            dirs_and_subcommands(&walker.runner().calls()),
            vec![
                ("/w/a/nested".to_string(), "ensure".to_string()),
                ("/w/a/nested".to_string(), "teardown".to_string()),
                ("/w/a".to_string(), "ensure".to_string()),
                ("/w/a".to_string(), "teardown".to_string()),
                ("/w/b".to_string(), "ensure".to_string()),
                ("/w/b".to_string(), "teardown".to_string()),
            ]
        );
        assert_eq!(report.jobs[0].marker, PathBuf::from("/w/a/nested/workflow.yaml"));
        assert_eq!(
            report.jobs[0].commands,
            vec!["valet ensure -f workflow.yaml", "valet teardown -f workflow.yaml"]
        );
    }

    #[tokio::test]
    async fn siblings_are_visited_lexicographically() {
        // "b" sorts before "workflow.yaml", so b's subtree runs first even
        // though the marker sits directly in the root.
        let tree = MemoryTree::new("/w")
            .file("workflow.yaml")
            .file("z/workflow.yaml")
            .file("b/workflow.yaml");
        let mut walker = BatchWalker::new(tree, RecordingRunner::default(), run_all_plan());

        let report = walker.walk(Path::new("/w")).await.unwrap();

        let markers: Vec<_> = report.jobs.iter().map(|j| j.marker.clone()).collect();
        assert_eq!(
            markers,
            vec![
                PathBuf::from("/w/b/workflow.yaml"),
                PathBuf::from("/w/workflow.yaml"),
                PathBuf::from("/w/z/workflow.yaml"),
            ]
        );
    }

    #[tokio::test]
    async fn job_runs_in_marker_directory() {
        let tree = MemoryTree::new("/w").file("a/b/workflow.yaml");
        let mut walker = BatchWalker::new(tree, RecordingRunner::default(), run_all_plan());

        let report = walker.walk(Path::new("/w")).await.unwrap();

        assert_eq!(report.jobs[0].working_dir, PathBuf::from("/w/a/b"));
        for (dir, args) in walker.runner().calls() {
            assert_eq!(dir, PathBuf::from("/w/a/b"));
            assert_eq!(&args[1..], &["-f", "workflow.yaml"]);
        }
    }

    #[tokio::test]
    async fn directory_named_like_marker_is_descended_not_run() {
        let tree = MemoryTree::new("/w").file("workflow.yaml/notes.txt");
        let mut walker = BatchWalker::new(tree, RecordingRunner::default(), run_all_plan());

        let report = walker.walk(Path::new("/w")).await.unwrap();

        assert!(report.jobs.is_empty());
        assert!(walker.runner().calls().is_empty());
    }

    #[tokio::test]
    async fn first_failure_aborts_before_later_markers() {
        let tree = MemoryTree::new("/w")
            .file("a/workflow.yaml")
            .file("b/workflow.yaml")
            .file("c/workflow.yaml");
        let runner = RecordingRunner::failing_at("/w/b", "ensure");
        let mut walker = BatchWalker::new(tree, runner, run_all_plan());

        let err = walker.walk(Path::new("/w")).await.unwrap_err();

        assert_eq!(walker.state(), WalkState::Aborted);
        assert_eq!(err.marker(), Some(&PathBuf::from("/w/b/workflow.yaml")));
        match &err {
            WalkError::Job {
                source: CommandError::Failed { message, diagnostic, .. },
                ..
            } => {
                assert_eq!(message, "error running valet workflow");
                assert_eq!(diagnostic, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // b's teardown and all of c never ran.
        assert_eq!(
            dirs_and_subcommands(&walker.runner().calls()),
            vec![
                ("/w/a".to_string(), "ensure".to_string()),
                ("/w/a".to_string(), "teardown".to_string()),
                ("/w/b".to_string(), "ensure".to_string()),
            ]
        );
    }

    /// Formatted log output shared with a test subscriber.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[tokio::test]
    async fn each_completed_job_is_confirmed_once() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let tree = MemoryTree::new("/w")
            .file("a/workflow.yaml")
            .file("b/workflow.yaml")
            .file("c/workflow.yaml");
        let runner = RecordingRunner::failing_at("/w/c", "teardown");
        let mut walker = BatchWalker::new(tree, runner, run_all_plan());

        walker.walk(Path::new("/w")).await.unwrap_err();

        let output = logs.contents();
        assert_eq!(output.matches("Successfully processed /w/a/workflow.yaml").count(), 1);
        assert_eq!(output.matches("Successfully processed /w/b/workflow.yaml").count(), 1);
        // c failed its teardown, so it is never confirmed.
        assert!(!output.contains("Successfully processed /w/c/workflow.yaml"));
        assert_eq!(output.matches("Successfully processed").count(), 2);
    }

    #[tokio::test]
    async fn traversal_error_aborts_the_walk() {
        let tree = MemoryTree::new("/w")
            .file("a/workflow.yaml")
            .unreadable("b")
            .file("c/workflow.yaml");
        let mut walker = BatchWalker::new(tree, RecordingRunner::default(), run_all_plan());

        let err = walker.walk(Path::new("/w")).await.unwrap_err();

        assert!(matches!(err, WalkError::Read { ref path, .. } if path == Path::new("/w/b")));
        assert_eq!(walker.state(), WalkState::Aborted);
        assert_eq!(walker.runner().calls().len(), 2);
    }

    #[tokio::test]
    async fn unreadable_root_aborts_immediately() {
        let tree = MemoryTree::new("/w");
        let mut walker = BatchWalker::new(tree, RecordingRunner::default(), run_all_plan());

        assert!(walker.walk(Path::new("/elsewhere")).await.is_err());
        assert_eq!(walker.state(), WalkState::Aborted);
    }

    #[tokio::test]
    async fn gen_docs_plan_passes_output_flag() {
        let tree = MemoryTree::new("/w").file("docs/workflow.yaml");
        let plan = JobPlan::gen_docs(&BatchConfig::default());
        let mut walker = BatchWalker::new(tree, RecordingRunner::default(), plan);

        walker.walk(Path::new("/w")).await.unwrap();

        let calls = walker.runner().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].1,
            vec!["gen-docs", "-f", "workflow.yaml", "-o", "README.md"]
        );
    }

    #[test]
    fn custom_marker_and_tool_flow_into_invocations() {
        let config = BatchConfig {
            tool: "/opt/valet".to_string(),
            marker_file: "flow.yaml".to_string(),
        };
        let plan = JobPlan::run_all(&config);
        let job = plan.job_for(MarkerFile {
            path: PathBuf::from("x/flow.yaml"),
        });
        assert_eq!(job.invocations.len(), 2);
        assert_eq!(job.invocations[0].program, "/opt/valet");
        assert_eq!(job.invocations[0].args, vec!["ensure", "-f", "flow.yaml"]);
        assert_eq!(job.invocations[1].working_dir, PathBuf::from("x"));
        assert_eq!(job.invocations[1].capture, CaptureMode::Stream);
    }
}
