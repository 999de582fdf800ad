use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn mdref_cmd(root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mdref"));
    cmd.arg(root).arg("--no-color").env_remove("RUST_LOG");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    Path::new("tests/fixtures").join(name)
}

fn run(root: &Path, args: &[&str]) -> Output {
    mdref_cmd(root).args(args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn json(root: &Path, args: &[&str]) -> serde_json::Value {
    let output = mdref_cmd(root).args(["--format", "json"]).args(args).output().unwrap();
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn vault_reports_broken_reference_with_location() {
    let output = run(&fixture("vault"), &[]);
    assert_eq!(output.status.code(), Some(2));

    let text = stdout(&output);
    assert!(text.contains("guide.md:2:1  error  broken reference 'ghost-page'"), "{text}");
    assert!(text.contains("    [[ghost-page]]\n    ^\n"), "{text}");
    assert!(text.contains("assets/orphan.png"));
    for hidden in ["not-a-link", "code-span", "nothing"] {
        assert!(!text.contains(hidden), "{hidden} should not be reported:\n{text}");
    }
}

#[test]
fn vault_json_report() {
    let report = json(&fixture("vault"), &[]);

    assert_eq!(report["summary"]["broken_references"], 1);
    assert_eq!(report["summary"]["total_documents"], 3);
    assert_eq!(report["summary"]["total_images"], 3);
    assert_eq!(report["broken"][0]["source"], "guide.md");
    assert_eq!(report["broken"][0]["target"], "ghost-page");
    assert_eq!(report["broken"][0]["line"], 2);
    assert_eq!(report["unused_images"], serde_json::json!(["assets/orphan.png"]));
    assert_eq!(
        report["unidirectional"],
        serde_json::json!([{ "source": "setup/install.md", "target": "guide.md" }])
    );
    assert_eq!(report["graph"]["incoming"]["index.md"], serde_json::json!(["guide.md", "setup/install.md"]));
}

#[test]
fn verbose_lists_one_way_links() {
    let text = stdout(&run(&fixture("vault"), &["-v"]));
    assert!(text.contains("Unidirectional links\n  setup/install.md -> guide.md\n"), "{text}");

    let quiet = stdout(&run(&fixture("vault"), &[]));
    assert!(!quiet.contains("Unidirectional links"));
}

#[test]
fn linked_pair_is_clean() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.md", "[[b]]");
    write(dir.path(), "b.md", "[[a]]");

    let output = run(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).starts_with("All references valid (2 documents, 0 images)"));
}

#[test]
fn unused_image_alone_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.md", "no references");
    write(dir.path(), "assets/lonely.png", "png");

    assert_eq!(run(dir.path(), &[]).status.code(), Some(1));
    assert_eq!(run(dir.path(), &["--no-unused"]).status.code(), Some(0));
}

#[test]
fn loose_images_count_links_as_usage() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.md", "[the chart](chart.svg)");
    write(dir.path(), "chart.svg", "<svg/>");

    assert_eq!(run(dir.path(), &[]).status.code(), Some(1));
    assert_eq!(run(dir.path(), &["--loose-images"]).status.code(), Some(0));
}

#[test]
fn fixing_a_broken_link_clears_it_on_the_next_run() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.md", "[[missing]]");
    assert_eq!(run(dir.path(), &[]).status.code(), Some(2));

    write(dir.path(), "missing.md", "[[a]]");
    assert_eq!(run(dir.path(), &[]).status.code(), Some(0));
}

#[test]
fn one_way_link_disappears_once_linked_back() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.md", "[[b]]");
    write(dir.path(), "b.md", "no links");
    let report = json(dir.path(), &[]);
    assert_eq!(report["unidirectional"], serde_json::json!([{ "source": "a.md", "target": "b.md" }]));

    write(dir.path(), "b.md", "[back](a.md)");
    let report = json(dir.path(), &[]);
    assert_eq!(report["unidirectional"], serde_json::json!([]));
}

#[test]
fn repeated_runs_produce_identical_output() {
    let first = run(&fixture("vault"), &["--format", "json"]);
    let second = run(&fixture("vault"), &["--format", "json"]);
    assert_eq!(first.stdout, second.stdout);
    assert_eq!(first.status.code(), second.status.code());
}

#[test]
fn ignore_flag_and_config_exclude_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.md", "[[b]]");
    write(dir.path(), "b.md", "[[a]]");
    write(dir.path(), "scratch/notes.md", "[[nowhere]]");
    write(dir.path(), "tmp.md", "[[also-nowhere]]");

    assert_eq!(run(dir.path(), &[]).status.code(), Some(2));
    assert_eq!(run(dir.path(), &["-i", "scratch/", "--ignore", "tmp.md"]).status.code(), Some(0));

    write(dir.path(), ".mdref.toml", "ignore = [\"scratch/\", \"tmp.md\"]\n");
    assert_eq!(run(dir.path(), &[]).status.code(), Some(0));
}

#[test]
fn links_into_ignored_files_are_broken() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), ".gitignore", "private/\n");
    write(dir.path(), "a.md", "[secret](private/plan.md)");
    write(dir.path(), "private/plan.md", "[[a]]");

    let report = json(dir.path(), &[]);
    assert_eq!(report["summary"]["broken_references"], 1);
    assert_eq!(report["summary"]["total_documents"], 1);
}

#[test]
fn missing_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&dir.path().join("absent"), &[]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("# Error: Root Not Found"));
}

#[test]
fn malformed_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.md", "");
    write(dir.path(), ".mdref.toml", "asset_dir = 5\n");

    let output = run(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid TOML"));
}

#[test]
fn invalid_ignore_override_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.md", "");

    let output = run(dir.path(), &["-i", "[unclosed"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid Ignore Pattern"));
}
