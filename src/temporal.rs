//! # Temporal Testing
//!
//! Temporal testing applies the *current* template to *historical* states of
//! a real project, so template changes can be reviewed against the projects
//! they will eventually update.
//!
//! Each [`Snapshot`] names a ref in the source project's history. A trial for
//! one snapshot:
//!
//! 1. clones the source project (full history) into a private temporary
//!    directory and checks out the snapshot's ref,
//! 2. copies the checkout to `<output>/<name>/original`,
//! 3. runs the [`TemplateEngine`] update in the clone,
//! 4. copies the result to `<output>/<name>/updated`,
//! 5. writes `<output>/<name>/diff.patch` and classifies the changes.
//!
//! Failures inside a trial never escape it: they are recorded in the trial's
//! [`TrialResult`] and the remaining snapshots still run. Trials can run in
//! parallel on a bounded worker pool; results always come back in the order
//! the snapshots were given.
//!
//! With a [`TrialProcess`] configured, each parallel trial runs in its own
//! worker process: the pool thread sends a [`TrialRequest`] as JSON on the
//! worker's stdin and reads the [`TrialResult`] back from its stdout. A
//! worker that crashes or prints garbage yields a failed result for its
//! snapshot only.

use std::any::Any;
use std::fs;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::defaults::{default_temp_root, ANSWERS_FILE_NAME, PATCH_FILE_NAME};
use crate::diff::{self, DiffResult};
use crate::error::{Error, Result};
use crate::filesystem::{copy_tree, remove_dir_all_force};
use crate::git;
use crate::template::{CopierCli, TemplateData, TemplateEngine};

/// A historical reference point to test the template against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique name; also the name of the snapshot's output directory.
    pub name: String,
    /// Tag, branch or commit to check out.
    pub r#ref: String,
    #[serde(default)]
    pub description: String,
    /// Data passed to the template engine for this snapshot only.
    #[serde(default)]
    pub template_data: TemplateData,
}

impl Snapshot {
    pub fn new(name: impl Into<String>, r#ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            r#ref: r#ref.into(),
            description: String::new(),
            template_data: TemplateData::new(),
        }
    }
}

/// Outcome of one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub snapshot_name: String,
    pub success: bool,
    pub has_differences: bool,
    pub diff_path: Option<PathBuf>,
    /// Set if and only if `success` is false.
    pub error: Option<String>,
    pub files_changed: Vec<String>,
    pub files_added: Vec<String>,
    pub files_removed: Vec<String>,
}

impl TrialResult {
    /// A successful trial described by its diff.
    pub fn from_diff(snapshot_name: &str, diff: DiffResult) -> Self {
        Self {
            snapshot_name: snapshot_name.to_string(),
            success: true,
            has_differences: diff.has_changes,
            diff_path: diff.patch_file,
            error: None,
            files_changed: diff.changed,
            files_added: diff.added,
            files_removed: diff.removed,
        }
    }

    /// A failed trial.
    pub fn failed(snapshot_name: &str, error: impl Into<String>) -> Self {
        Self {
            snapshot_name: snapshot_name.to_string(),
            success: false,
            has_differences: false,
            diff_path: None,
            error: Some(error.into()),
            files_changed: Vec::new(),
            files_added: Vec::new(),
            files_removed: Vec::new(),
        }
    }

    /// Number of files touched by the template.
    pub fn file_count(&self) -> usize {
        self.files_changed.len() + self.files_added.len() + self.files_removed.len()
    }
}

/// Private working directory of one trial.
///
/// The directory is removed when the guard is dropped unless it was created
/// with `keep` set, in which case it is left on disk and its path logged.
pub struct TrialWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
    keep: bool,
}

impl TrialWorkspace {
    /// Create `snapshot-<name>-XXXXXX` under `temp_root`.
    pub fn create(temp_root: &Path, snapshot_name: &str, keep: bool) -> Result<Self> {
        fs::create_dir_all(temp_root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("snapshot-{}-", snapshot_name))
            .tempdir_in(temp_root)?;
        let path = dir.path().to_path_buf();
        Ok(Self {
            dir: Some(dir),
            path,
            keep,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TrialWorkspace {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        let path = dir.keep();
        if self.keep {
            warn!("Keeping temporary directory: {}", path.display());
        } else if let Err(e) = remove_dir_all_force(&path) {
            warn!(
                "Failed to remove temporary directory {}: {}",
                path.display(),
                e
            );
        }
    }
}

/// Everything a worker process needs to run one trial with copier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRequest {
    pub template_path: PathBuf,
    pub source_project: PathBuf,
    pub output_dir: PathBuf,
    pub temp_root: PathBuf,
    pub keep_temp_dirs: bool,
    pub answers_file: String,
    pub snapshot: Snapshot,
}

impl TrialRequest {
    /// Run the trial in the current process. Never fails.
    pub fn run(&self) -> TrialResult {
        TemporalTester::new(&self.template_path, &self.source_project, &self.output_dir)
            .with_temp_root(&self.temp_root)
            .with_keep_temp_dirs(self.keep_temp_dirs)
            .with_answers_file(self.answers_file.as_str())
            .run_guarded(&self.snapshot)
    }
}

/// Command line of the worker process that runs one trial.
///
/// The worker reads a [`TrialRequest`] as JSON from stdin and must print
/// only the [`TrialResult`] JSON on stdout. Its stderr is passed through.
#[derive(Debug, Clone)]
pub struct TrialProcess {
    program: PathBuf,
    args: Vec<String>,
}

impl TrialProcess {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run `request` in a new worker and wait for its result.
    pub fn run(&self, request: &TrialRequest) -> Result<TrialResult> {
        let input = serde_json::to_vec(request)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::TrialProcess {
                message: format!("failed to start {}: {}", self.program.display(), e),
            })?;
        debug!(
            "Worker {} runs snapshot '{}'",
            child.id(),
            request.snapshot.name
        );

        // Dropping stdin closes the pipe
        let written = child
            .stdin
            .take()
            .map(|mut stdin| stdin.write_all(&input))
            .transpose();
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(Error::TrialProcess {
                message: format!("worker exited with {}", output.status),
            });
        }
        written?;

        serde_json::from_slice(&output.stdout).map_err(|e| Error::TrialProcess {
            message: format!("unreadable trial result: {}", e),
        })
    }
}

/// Runs trials for a set of snapshots.
pub struct TemporalTester {
    template_path: PathBuf,
    source_project: PathBuf,
    output_dir: PathBuf,
    keep_temp_dirs: bool,
    temp_root: PathBuf,
    answers_file: String,
    engine: Arc<dyn TemplateEngine>,
    trial_process: Option<TrialProcess>,
}

impl TemporalTester {
    /// Create a tester that updates projects with copier from `template_path`.
    pub fn new(
        template_path: impl Into<PathBuf>,
        source_project: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let template_path = template_path.into();
        Self {
            engine: Arc::new(CopierCli::new(template_path.clone())),
            template_path,
            source_project: source_project.into(),
            output_dir: output_dir.into(),
            keep_temp_dirs: false,
            temp_root: default_temp_root(),
            answers_file: ANSWERS_FILE_NAME.to_string(),
            trial_process: None,
        }
    }

    /// Leave each trial's temporary directory on disk for debugging.
    pub fn with_keep_temp_dirs(mut self, keep: bool) -> Self {
        self.keep_temp_dirs = keep;
        self
    }

    /// Allocate trial directories under `temp_root` instead of the system default.
    pub fn with_temp_root(mut self, temp_root: impl Into<PathBuf>) -> Self {
        self.temp_root = temp_root.into();
        self
    }

    /// Replace the template engine.
    pub fn with_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Answers file passed to the engine, relative to the project root.
    pub fn with_answers_file(mut self, answers_file: impl Into<String>) -> Self {
        self.answers_file = answers_file.into();
        self
    }

    /// Run parallel trials in worker processes.
    ///
    /// Workers always update with copier; [`with_engine`](Self::with_engine)
    /// only applies to trials run in this process.
    pub fn with_trial_process(mut self, process: TrialProcess) -> Self {
        self.trial_process = Some(process);
        self
    }

    /// The request a worker process needs to run `snapshot`.
    pub fn request(&self, snapshot: &Snapshot) -> TrialRequest {
        TrialRequest {
            template_path: self.template_path.clone(),
            source_project: self.source_project.clone(),
            output_dir: self.output_dir.clone(),
            temp_root: self.temp_root.clone(),
            keep_temp_dirs: self.keep_temp_dirs,
            answers_file: self.answers_file.clone(),
            snapshot: snapshot.clone(),
        }
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// Run one trial. Never fails; errors are captured in the result.
    pub fn run_snapshot(&self, snapshot: &Snapshot) -> TrialResult {
        info!("Testing snapshot '{}' at {}", snapshot.name, snapshot.r#ref);

        match self.try_run_snapshot(snapshot) {
            Ok(diff) => {
                let result = TrialResult::from_diff(&snapshot.name, diff);
                info!(
                    "Snapshot '{}' finished ({} file(s) differ)",
                    snapshot.name,
                    result.file_count()
                );
                result
            }
            Err(e) => {
                error!("Snapshot '{}' failed: {}", snapshot.name, e);
                TrialResult::failed(&snapshot.name, e.to_string())
            }
        }
    }

    fn try_run_snapshot(&self, snapshot: &Snapshot) -> Result<DiffResult> {
        // Results of an earlier run must not survive a failing one
        let snapshot_dir = self.output_dir.join(&snapshot.name);
        remove_dir_all_force(&snapshot_dir)?;

        let workspace =
            TrialWorkspace::create(&self.temp_root, &snapshot.name, self.keep_temp_dirs)?;
        let project_dir = workspace.path().join("project");

        debug!(
            "Cloning {} into {}",
            self.source_project.display(),
            project_dir.display()
        );
        git::clone_full(&self.source_project, &project_dir)?;
        git::checkout(&project_dir, &snapshot.r#ref)?;

        let original_dir = snapshot_dir.join("original");
        copy_tree(&project_dir, &original_dir)?;

        debug!("Applying template to {}", project_dir.display());
        self.engine
            .update(&project_dir, &self.answers_file, &snapshot.template_data)?;

        let updated_dir = snapshot_dir.join("updated");
        copy_tree(&project_dir, &updated_dir)?;

        diff::generate_diff(
            &original_dir,
            &updated_dir,
            &snapshot_dir.join(PATCH_FILE_NAME),
        )
    }

    /// Run every snapshot and return the results in input order.
    ///
    /// With `parallel` set, at most `max_workers` trials (default: the
    /// available parallelism) run at once, each in a worker process when a
    /// [`TrialProcess`] is configured.
    pub fn run_all(
        &self,
        snapshots: &[Snapshot],
        parallel: bool,
        max_workers: Option<usize>,
    ) -> Vec<TrialResult> {
        self.run_all_with_progress(snapshots, parallel, max_workers, &|_: &TrialResult| {})
    }

    /// Like [`run_all`](Self::run_all), calling `on_complete` as each trial finishes.
    pub fn run_all_with_progress(
        &self,
        snapshots: &[Snapshot],
        parallel: bool,
        max_workers: Option<usize>,
        on_complete: &(dyn Fn(&TrialResult) + Sync),
    ) -> Vec<TrialResult> {
        if snapshots.is_empty() {
            return Vec::new();
        }

        let workers = if parallel {
            max_workers.unwrap_or_else(default_workers).max(1)
        } else {
            1
        };
        info!(
            "Running {} temporal test(s) ({}, {} worker(s))",
            snapshots.len(),
            if parallel { "parallel" } else { "serial" },
            workers
        );

        if !parallel {
            return self.run_serial(snapshots, on_complete);
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ctt-trial-{}", i))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Could not start worker pool ({}), running serially", e);
                return self.run_serial(snapshots, on_complete);
            }
        };

        // Indexed collection keeps input order
        pool.install(|| {
            snapshots
                .par_iter()
                .map(|snapshot| {
                    let result = self.run_isolated(snapshot);
                    on_complete(&result);
                    result
                })
                .collect()
        })
    }

    fn run_isolated(&self, snapshot: &Snapshot) -> TrialResult {
        let Some(process) = &self.trial_process else {
            return self.run_guarded(snapshot);
        };
        process.run(&self.request(snapshot)).unwrap_or_else(|e| {
            error!("Snapshot '{}' failed: {}", snapshot.name, e);
            TrialResult::failed(&snapshot.name, e.to_string())
        })
    }

    fn run_serial(
        &self,
        snapshots: &[Snapshot],
        on_complete: &(dyn Fn(&TrialResult) + Sync),
    ) -> Vec<TrialResult> {
        snapshots
            .iter()
            .map(|snapshot| {
                let result = self.run_guarded(snapshot);
                on_complete(&result);
                result
            })
            .collect()
    }

    fn run_guarded(&self, snapshot: &Snapshot) -> TrialResult {
        panic::catch_unwind(AssertUnwindSafe(|| self.run_snapshot(snapshot))).unwrap_or_else(
            |payload| {
                let message = panic_message(payload.as_ref());
                error!("Snapshot '{}' panicked: {}", snapshot.name, message);
                TrialResult::failed(&snapshot.name, format!("trial panicked: {}", message))
            },
        )
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::test_support::two_tag_repo;
    use crate::template::CopyOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Counts calls and does nothing else.
    #[derive(Default)]
    struct CountingEngine {
        calls: AtomicUsize,
    }

    impl TemplateEngine for CountingEngine {
        fn update(&self, _: &Path, _: &str, _: &TemplateData) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn copy(&self, _: &Path, _: &Path, _: &TemplateData, _: &CopyOptions) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Appends a line to `file.txt` when the checkout has one.
    struct AppendEngine;

    impl TemplateEngine for AppendEngine {
        fn update(&self, project_dir: &Path, _: &str, data: &TemplateData) -> Result<()> {
            let file = project_dir.join("file.txt");
            if file.exists() {
                let mut content = fs::read_to_string(&file)?;
                content.push_str("templated\n");
                fs::write(&file, content)?;
            }
            if let Some(value) = data.get("extra") {
                fs::write(project_dir.join("extra.txt"), value.to_string())?;
            }
            Ok(())
        }

        fn copy(&self, _: &Path, _: &Path, _: &TemplateData, _: &CopyOptions) -> Result<()> {
            Ok(())
        }
    }

    struct PanicEngine;

    impl TemplateEngine for PanicEngine {
        fn update(&self, _: &Path, _: &str, _: &TemplateData) -> Result<()> {
            panic!("engine exploded");
        }

        fn copy(&self, _: &Path, _: &Path, _: &TemplateData, _: &CopyOptions) -> Result<()> {
            Ok(())
        }
    }

    struct Fixture {
        _temp: TempDir,
        source: PathBuf,
        output: PathBuf,
        temp_root: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        fs::create_dir_all(&source).unwrap();
        two_tag_repo(&source);
        Fixture {
            output: temp.path().join("output"),
            temp_root: temp.path().join("tmp"),
            source,
            _temp: temp,
        }
    }

    fn tester(fixture: &Fixture, engine: Arc<dyn TemplateEngine>) -> TemporalTester {
        TemporalTester::new("/unused/template", &fixture.source, &fixture.output)
            .with_temp_root(&fixture.temp_root)
            .with_engine(engine)
    }

    fn leftover_dirs(temp_root: &Path) -> Vec<PathBuf> {
        match fs::read_dir(temp_root) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_run_all_empty_invokes_nothing() {
        let engine = Arc::new(CountingEngine::default());
        let tester = TemporalTester::new("/t", "/nonexistent/source", "/nonexistent/out")
            .with_engine(engine.clone());

        assert!(tester.run_all(&[], false, None).is_empty());
        assert!(tester.run_all(&[], true, Some(4)).is_empty());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parallel_two_tags() {
        let fixture = fixture();
        let tester = tester(&fixture, Arc::new(AppendEngine));
        let snapshots = vec![Snapshot::new("v1", "v1.0"), Snapshot::new("v2", "v2.0")];

        let results = tester.run_all(&snapshots, true, Some(2));

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].snapshot_name, "v1");
        assert_eq!(results[1].snapshot_name, "v2");
        assert!(results.iter().all(|r| r.success), "{:?}", results);

        // file.txt only exists at v2.0
        assert!(!results[0].has_differences);
        assert!(results[0].diff_path.is_none());
        assert!(results[1].has_differences);
        assert_eq!(results[1].files_changed, vec!["file.txt"]);
        assert!(results[1].files_added.is_empty());

        let v2 = fixture.output.join("v2");
        assert_eq!(
            fs::read_to_string(v2.join("original/file.txt")).unwrap(),
            "version 2\n"
        );
        assert_eq!(
            fs::read_to_string(v2.join("updated/file.txt")).unwrap(),
            "version 2\ntemplated\n"
        );
        assert!(v2.join("diff.patch").is_file());
        assert!(!v2.join("original/.git").exists());
        assert!(!fixture.output.join("v1/original/file.txt").exists());
    }

    #[test]
    fn test_serial_preserves_order_and_template_data() {
        let fixture = fixture();
        let tester = tester(&fixture, Arc::new(AppendEngine));
        let mut with_data = Snapshot::new("data", "v1.0");
        with_data
            .template_data
            .insert("extra".to_string(), "hello".into());
        let snapshots = vec![Snapshot::new("b", "v2.0"), with_data];

        let results = tester.run_all(&snapshots, false, None);

        assert_eq!(results[0].snapshot_name, "b");
        assert_eq!(results[1].snapshot_name, "data");
        assert_eq!(results[1].files_added, vec!["extra.txt"]);
    }

    #[test]
    fn test_bad_ref_fails_without_affecting_siblings() {
        let fixture = fixture();
        let tester = tester(&fixture, Arc::new(AppendEngine));
        let snapshots = vec![
            Snapshot::new("missing", "v9.9.9"),
            Snapshot::new("good", "v2.0"),
        ];

        let results = tester.run_all(&snapshots, true, Some(2));

        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("v9.9.9"));
        assert!(!results[0].has_differences);
        assert!(results[1].success);
        assert!(results[1].error.is_none());
    }

    #[test]
    fn test_temp_dirs_removed_by_default() {
        let fixture = fixture();
        let tester = tester(&fixture, Arc::new(AppendEngine));

        let results = tester.run_all(
            &[Snapshot::new("ok", "v2.0"), Snapshot::new("bad", "nope")],
            false,
            None,
        );

        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(leftover_dirs(&fixture.temp_root).is_empty());
    }

    #[test]
    fn test_temp_dirs_kept_when_requested() {
        let fixture = fixture();
        let tester = tester(&fixture, Arc::new(AppendEngine)).with_keep_temp_dirs(true);

        let result = tester.run_snapshot(&Snapshot::new("kept", "v1.0"));
        assert!(result.success);

        let leftovers = leftover_dirs(&fixture.temp_root);
        assert_eq!(leftovers.len(), 1);
        let name = leftovers[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("snapshot-kept-"));
        assert!(leftovers[0].join("project/.git").exists());
    }

    #[test]
    fn test_stale_output_is_replaced() {
        let fixture = fixture();
        let stale = fixture.output.join("v1/original/stale.txt");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "old run").unwrap();

        let tester = tester(&fixture, Arc::new(AppendEngine));
        let result = tester.run_snapshot(&Snapshot::new("v1", "v1.0"));

        assert!(result.success);
        assert!(!stale.exists());
        assert!(fixture.output.join("v1/original/README.md").exists());
    }

    #[test]
    fn test_failed_rerun_clears_previous_results() {
        let fixture = fixture();
        let tester = tester(&fixture, Arc::new(AppendEngine));
        let snapshot_dir = fixture.output.join("rerun");

        let first = tester.run_snapshot(&Snapshot::new("rerun", "v2.0"));
        assert!(first.success);
        assert!(snapshot_dir.join("diff.patch").is_file());

        let second = tester.run_snapshot(&Snapshot::new("rerun", "nope"));
        assert!(!second.success);
        assert!(second.diff_path.is_none());
        assert!(!snapshot_dir.join("diff.patch").exists());
        assert!(!snapshot_dir.join("original").exists());
        assert!(!snapshot_dir.join("updated").exists());
    }

    #[test]
    fn test_panicking_trial_becomes_failure() {
        let fixture = fixture();
        let tester = tester(&fixture, Arc::new(PanicEngine));

        let results = tester.run_all(&[Snapshot::new("boom", "v1.0")], true, Some(1));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].snapshot_name, "boom");
        assert!(!results[0].success);
        assert!(results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("engine exploded"));
    }

    #[test]
    fn test_progress_callback_called_per_trial() {
        let fixture = fixture();
        let tester = tester(&fixture, Arc::new(AppendEngine));
        let seen = Mutex::new(Vec::new());

        tester.run_all_with_progress(
            &[Snapshot::new("a", "v1.0"), Snapshot::new("b", "v2.0")],
            true,
            None,
            &|result: &TrialResult| seen.lock().unwrap().push(result.snapshot_name.clone()),
        );

        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[cfg(unix)]
    fn worker(script: &str) -> TrialProcess {
        TrialProcess::new("sh").with_args(["-c", script])
    }

    #[cfg(unix)]
    #[test]
    fn test_crashing_worker_fails_only_its_trials() {
        let fixture = fixture();
        let tester = tester(&fixture, Arc::new(AppendEngine))
            .with_trial_process(worker("cat > /dev/null; kill -KILL $$"));

        let results = tester.run_all(
            &[Snapshot::new("v1", "v1.0"), Snapshot::new("v2", "v2.0")],
            true,
            Some(2),
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].snapshot_name, "v1");
        assert_eq!(results[1].snapshot_name, "v2");
        for result in &results {
            assert!(!result.success);
            assert!(result
                .error
                .as_deref()
                .unwrap()
                .contains("worker exited with"));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_worker_result_is_returned() {
        let fixture = fixture();
        let mut expected = TrialResult::failed("v1", "done elsewhere");
        expected.files_added = vec!["new.txt".to_string()];
        let json = serde_json::to_string(&expected).unwrap();
        let tester = tester(&fixture, Arc::new(PanicEngine)).with_trial_process(worker(
            &format!("cat > /dev/null; printf '%s' '{}'", json),
        ));

        let results = tester.run_all(&[Snapshot::new("v1", "v1.0")], true, None);

        assert_eq!(results, vec![expected]);
    }

    #[cfg(unix)]
    #[test]
    fn test_worker_receives_trial_request() {
        let fixture = fixture();
        let request_file = fixture.temp_root.with_file_name("request.json");
        let reply = serde_json::to_string(&TrialResult::failed("v2", "x")).unwrap();
        let process = TrialProcess::new("sh").with_args([
            "-c",
            "cat > \"$1\"; printf '%s' \"$2\"",
            "worker",
            request_file.to_str().unwrap(),
            reply.as_str(),
        ]);
        let mut snapshot = Snapshot::new("v2", "v2.0");
        snapshot.template_data.insert("extra".to_string(), "yes".into());
        let tester = tester(&fixture, Arc::new(AppendEngine))
            .with_answers_file(".answers.yml")
            .with_trial_process(process);

        tester.run_all(std::slice::from_ref(&snapshot), true, Some(1));

        let sent: TrialRequest =
            serde_json::from_str(&fs::read_to_string(&request_file).unwrap()).unwrap();
        assert_eq!(sent, tester.request(&snapshot));
        assert_eq!(sent.snapshot, snapshot);
        assert_eq!(sent.answers_file, ".answers.yml");
        assert_eq!(sent.temp_root, fixture.temp_root);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_worker_output_fails_trial() {
        let fixture = fixture();
        let tester = tester(&fixture, Arc::new(AppendEngine))
            .with_trial_process(worker("cat > /dev/null; echo not json"));

        let results = tester.run_all(&[Snapshot::new("v1", "v1.0")], true, None);

        assert!(!results[0].success);
        assert!(results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("unreadable trial result"));
    }

    #[test]
    fn test_missing_worker_program_fails_trial() {
        let fixture = fixture();
        let tester = tester(&fixture, Arc::new(AppendEngine))
            .with_trial_process(TrialProcess::new("/nonexistent/ctt-worker"));

        let results = tester.run_all(&[Snapshot::new("v1", "v1.0")], true, None);

        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("failed to start"));
    }

    #[cfg(unix)]
    #[test]
    fn test_serial_runs_ignore_worker_process() {
        let fixture = fixture();
        let tester = tester(&fixture, Arc::new(AppendEngine))
            .with_trial_process(worker("kill -KILL $$"));

        let results = tester.run_all(&[Snapshot::new("v2", "v2.0")], false, None);

        assert!(results[0].success, "{:?}", results);
        assert_eq!(results[0].files_changed, vec!["file.txt"]);
    }

    #[test]
    fn test_trial_request_run_captures_failure() {
        let fixture = fixture();
        let request = TrialRequest {
            template_path: PathBuf::from("/unused/template"),
            source_project: fixture.source.clone(),
            output_dir: fixture.output.clone(),
            temp_root: fixture.temp_root.clone(),
            keep_temp_dirs: false,
            answers_file: ANSWERS_FILE_NAME.to_string(),
            snapshot: Snapshot::new("missing", "v9.9.9"),
        };

        let result = request.run();

        assert_eq!(result.snapshot_name, "missing");
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("v9.9.9"));
        assert!(leftover_dirs(&fixture.temp_root).is_empty());
    }

    #[test]
    fn test_snapshot_deserializes_ref_field() {
        let snapshot: Snapshot = toml::from_str(
            "name = \"v1\"\nref = \"v1.0.0\"\ntemplate_data = { python_version = \"3.11\" }\n",
        )
        .unwrap();
        assert_eq!(snapshot.r#ref, "v1.0.0");
        assert_eq!(snapshot.description, "");
        assert_eq!(snapshot.template_data.len(), 1);
    }

    #[test]
    fn test_trial_result_serializes_field_names() {
        let json = serde_json::to_value(TrialResult::failed("v1", "boom")).unwrap();
        assert_eq!(json["snapshot_name"], "v1");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json["diff_path"].is_null());
        assert!(json["files_removed"].as_array().unwrap().is_empty());
    }
}
