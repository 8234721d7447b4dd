//! Integration tests for the gitsnap binary.
//!
//! These tests exercise the full CLI in temporary directories. Nothing
//! here reaches the network: every `push` test fails before the first
//! request.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A gitsnap command isolated from the user's global configuration and
/// connector environment.
fn gitsnap(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("gitsnap").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("GITSNAP_CONFIG")
        .env_remove("REPLIT_CONNECTORS_HOSTNAME")
        .env_remove("REPL_IDENTITY")
        .env_remove("WEB_REPL_RENEWAL");
    cmd
}

fn init_repo(dir: &Path) {
    let repo = git2::Repository::init(dir).unwrap();
    std::fs::write(dir.join("index.html"), b"<html>").unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("index.html")).unwrap();
    index.write().unwrap();
}

#[test]
fn version_flag_works() {
    let home = TempDir::new().unwrap();
    gitsnap(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gitsnap"));
}

mod site {
    use super::*;

    #[test]
    fn robots_prints_default_document() {
        let home = TempDir::new().unwrap();
        gitsnap(home.path())
            .args(["--cwd"])
            .arg(home.path())
            .arg("robots")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("User-agent: *\nAllow: /\n\nDisallow: /admin/\n"))
            .stdout(predicate::str::contains(
                "Sitemap: https://www.perfectpany.com/sitemap.xml\n",
            ))
            .stdout(predicate::str::ends_with("User-agent: Bingbot\nAllow: /\nCrawl-delay: 0\n"));
    }

    #[test]
    fn sitemap_uses_given_date() {
        let home = TempDir::new().unwrap();
        gitsnap(home.path())
            .arg("--cwd")
            .arg(home.path())
            .args(["sitemap", "--date", "2024-03-09"])
            .assert()
            .success()
            .stdout(predicate::str::contains("<lastmod>2024-03-09</lastmod>"))
            .stdout(predicate::str::contains("</urlset>"));
    }

    #[test]
    fn repo_site_config_is_honored() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        init_repo(repo.path());
        std::fs::write(
            repo.path().join(".gitsnap.toml"),
            "[site]\nbase_url = \"https://example.org\"\ncrawlers = []\n",
        )
        .unwrap();

        gitsnap(home.path())
            .arg("--cwd")
            .arg(repo.path())
            .arg("robots")
            .assert()
            .success()
            .stdout(predicate::str::contains("Sitemap: https://example.org/sitemap.xml"))
            .stdout(predicate::str::contains("Googlebot").not());
    }

    #[test]
    fn invalid_site_config_fails() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        init_repo(repo.path());
        std::fs::write(repo.path().join(".gitsnap.toml"), "[site]\nunknown = 1\n").unwrap();

        gitsnap(home.path())
            .arg("--cwd")
            .arg(repo.path())
            .arg("robots")
            .assert()
            .failure()
            .stderr(predicate::str::starts_with("error:"));
    }
}

mod push {
    use super::*;

    #[test]
    fn outside_a_repository_fails() {
        let home = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        gitsnap(home.path())
            .arg("--cwd")
            .arg(elsewhere.path())
            .arg("push")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("error:"))
            .stderr(predicate::str::contains("not a git repository"));
    }

    #[test]
    fn push_is_the_default_command() {
        let home = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        gitsnap(home.path())
            .arg("--cwd")
            .arg(elsewhere.path())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("not a git repository"));
    }

    #[test]
    fn without_target_fails_before_auth() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        init_repo(repo.path());

        gitsnap(home.path())
            .arg("--cwd")
            .arg(repo.path())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("no target repository"));
    }

    #[test]
    fn without_connector_fails_at_auth_stage() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        init_repo(repo.path());
        git2::Repository::open(repo.path())
            .unwrap()
            .remote("origin", "git@github.com:octocat/site.git")
            .unwrap();

        gitsnap(home.path())
            .arg("--cwd")
            .arg(repo.path())
            .arg("push")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("auth stage failed"))
            .stderr(predicate::str::contains("REPLIT_CONNECTORS_HOSTNAME"));
    }

    fn write_publish_config(repo: &Path, workdir: &Path) {
        std::fs::write(
            repo.join(".gitsnap.toml"),
            format!(
                "[target]\nowner = \"octocat\"\nrepo = \"site\"\n\n[publish]\nworkdir = {:?}\n",
                workdir.display().to_string()
            ),
        )
        .unwrap();
    }

    #[test]
    fn workdir_below_work_tree_root_is_refused() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        init_repo(repo.path());
        std::fs::create_dir(repo.path().join("site")).unwrap();
        write_publish_config(repo.path(), Path::new("site"));

        gitsnap(home.path())
            .arg("--cwd")
            .arg(repo.path())
            .arg("push")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("not the root of a working tree"))
            .stderr(predicate::str::contains("auth stage").not());
    }

    #[test]
    fn workdir_naming_another_work_tree_is_used() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        init_repo(repo.path());
        init_repo(other.path());
        write_publish_config(repo.path(), other.path());

        gitsnap(home.path())
            .arg("--cwd")
            .arg(repo.path())
            .arg("push")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("auth stage failed"));
        assert!(other.path().join(".git/gitsnap/publish.lock").exists());
        assert!(!repo.path().join(".git/gitsnap").exists());
    }
}

mod completion {
    use super::*;

    #[test]
    fn bash_script_names_binary() {
        let home = TempDir::new().unwrap();
        gitsnap(home.path())
            .args(["completion", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("gitsnap"));
    }
}
