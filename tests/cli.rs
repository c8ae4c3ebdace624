// ABOUTME: End-to-end tests driving the stagecoach binary.
// ABOUTME: Uses assert_cmd with temp directories as the working tree.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn stagecoach(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stagecoach").unwrap();
    cmd.current_dir(dir);
    cmd
}

/// Settings file with all three environments configured and one project
/// named "web" whose source tree holds a single artifact.
fn seed_workspace(dir: &Path) {
    let source = dir.join("source");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("app.dll"), "binary").unwrap();
    for env in ["dev", "test", "prod"] {
        fs::create_dir_all(dir.join(env)).unwrap();
    }

    let settings = serde_json::json!({
        "development_base_path": dir.join("dev"),
        "test_base_path": dir.join("test"),
        "production_base_path": dir.join("prod"),
        "log_file": "stagecoach.log",
        "projects": [{
            "name": "web",
            "current_version": "1.2.0",
            "source_path": source,
        }],
    });
    fs::write(
        dir.join("stagecoach.json"),
        serde_json::to_string_pretty(&settings).unwrap(),
    )
    .unwrap();
}

mod init {
    use super::*;

    #[test]
    fn writes_a_template_settings_file() {
        let dir = TempDir::new().unwrap();
        stagecoach(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("stagecoach.json"));
        assert!(dir.path().join("stagecoach.json").is_file());
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        stagecoach(dir.path()).arg("init").assert().success();
        stagecoach(dir.path())
            .arg("init")
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
        stagecoach(dir.path())
            .args(["init", "--force"])
            .assert()
            .success();
    }
}

mod status {
    use super::*;

    #[test]
    fn lists_projects_with_environment_marks() {
        let dir = TempDir::new().unwrap();
        seed_workspace(dir.path());

        stagecoach(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("web 1.2.0"))
            .stdout(predicate::str::contains("development: -"));
    }

    #[test]
    fn unknown_project_is_an_error() {
        let dir = TempDir::new().unwrap();
        seed_workspace(dir.path());

        stagecoach(dir.path())
            .args(["status", "ghost"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no project named 'ghost'"));
    }
}

mod deploy {
    use super::*;

    #[test]
    fn stages_into_development_and_updates_status() {
        let dir = TempDir::new().unwrap();
        seed_workspace(dir.path());

        stagecoach(dir.path())
            .args(["deploy", "web", "development"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Deployed to development"));

        let folder = dir.path().join("dev/web_v1_2_0");
        assert_eq!(fs::read_to_string(folder.join("app.dll")).unwrap(), "binary");

        stagecoach(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("development: deployed"))
            .stdout(predicate::str::contains("test:        -"));
    }

    #[test]
    fn out_of_order_promotion_fails() {
        let dir = TempDir::new().unwrap();
        seed_workspace(dir.path());

        stagecoach(dir.path())
            .args(["deploy", "web", "production"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("promotion must go in order"));
        assert!(!dir.path().join("prod/web_v1_2_0").exists());
    }

    #[test]
    fn appends_to_the_event_log() {
        let dir = TempDir::new().unwrap();
        seed_workspace(dir.path());

        stagecoach(dir.path())
            .args(["deploy", "web", "development"])
            .assert()
            .success();

        let log = fs::read_to_string(dir.path().join("stagecoach.log")).unwrap();
        assert!(log.contains("[INFO]"));
        assert!(log.contains("deployed web_v1_2_0 to development"));
    }
}

mod build {
    use super::*;

    #[test]
    fn bumps_the_patch_component_by_default() {
        let dir = TempDir::new().unwrap();
        seed_workspace(dir.path());

        stagecoach(dir.path())
            .args(["build", "web"])
            .assert()
            .success()
            .stdout(predicate::str::contains("web 1.2.0 -> 1.2.1"));

        let saved = fs::read_to_string(dir.path().join("stagecoach.json")).unwrap();
        assert!(saved.contains("1.2.1"));
    }

    #[test]
    fn set_requires_a_dotted_numeric_version() {
        let dir = TempDir::new().unwrap();
        seed_workspace(dir.path());

        stagecoach(dir.path())
            .args(["build", "web", "--set", "banana"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid version"));
    }

    #[test]
    fn set_and_bump_are_mutually_exclusive() {
        let dir = TempDir::new().unwrap();
        seed_workspace(dir.path());

        stagecoach(dir.path())
            .args(["build", "web", "--set", "2.0.0", "--bump", "major"])
            .assert()
            .failure();
    }
}

mod remove {
    use super::*;

    #[test]
    fn removes_a_deployed_folder() {
        let dir = TempDir::new().unwrap();
        seed_workspace(dir.path());

        stagecoach(dir.path())
            .args(["deploy", "web", "development"])
            .assert()
            .success();
        stagecoach(dir.path())
            .args(["remove", "web", "development"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed"));
        assert!(!dir.path().join("dev/web_v1_2_0").exists());
    }

    #[test]
    fn reports_when_there_is_nothing_to_remove() {
        let dir = TempDir::new().unwrap();
        seed_workspace(dir.path());

        stagecoach(dir.path())
            .args(["remove", "web", "--all"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to remove"));
    }

    #[test]
    fn requires_an_environment_or_all() {
        let dir = TempDir::new().unwrap();
        seed_workspace(dir.path());

        stagecoach(dir.path())
            .args(["remove", "web"])
            .assert()
            .failure();
    }
}
