//! Integration tests for solc-buildpack

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn buildpack() -> Command {
        cargo_bin_cmd!("solc-buildpack")
    }

    #[test]
    fn help_displays() {
        buildpack()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cloud Native Buildpack"));
    }

    #[test]
    fn version_displays() {
        buildpack()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("solc-buildpack"));
    }

    #[test]
    fn detect_passes_with_solidity_sources() {
        let app = TempDir::new().unwrap();
        let platform = TempDir::new().unwrap();
        std::fs::write(app.path().join("Token.sol"), "pragma solidity ^0.8.0;").unwrap();
        let plan = platform.path().join("plan.toml");

        buildpack()
            .arg("detect")
            .arg(platform.path())
            .arg(&plan)
            .arg("--app")
            .arg(app.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("PASS"));

        let content = std::fs::read_to_string(&plan).unwrap();
        assert!(content.contains("[[provides]]"));
        assert!(content.contains("name = \"solc\""));
    }

    #[test]
    fn detect_fails_without_sources() {
        let app = TempDir::new().unwrap();
        let platform = TempDir::new().unwrap();
        let plan = platform.path().join("plan.toml");

        buildpack()
            .arg("detect")
            .arg(platform.path())
            .arg(&plan)
            .arg("--app")
            .arg(app.path())
            .assert()
            .code(100);

        assert!(!plan.exists());
    }

    #[test]
    fn build_without_descriptor_fails() {
        let buildpack_dir = TempDir::new().unwrap();
        let layers = TempDir::new().unwrap();
        let platform = TempDir::new().unwrap();

        buildpack()
            .arg("build")
            .arg(layers.path())
            .arg(platform.path())
            .arg(platform.path().join("plan.toml"))
            .env("CNB_BUILDPACK_DIR", buildpack_dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("buildpack.toml"));
    }

    #[test]
    fn build_with_unknown_version_fails_with_hint() {
        let buildpack_dir = TempDir::new().unwrap();
        let layers = TempDir::new().unwrap();
        let platform = TempDir::new().unwrap();
        std::fs::write(
            buildpack_dir.path().join("buildpack.toml"),
            r#"
api = "0.8"

[buildpack]
id = "amp-buildpacks/solc"
name = "AMP Buildpack for Solc"
version = "0.2.1"

[[metadata.dependencies]]
id = "node"
name = "Node.js"
version = "20.10.0"
uri = "https://nodejs.org/dist/v20.10.0/node-v20.10.0-linux-x64.tar.gz"
sha256 = "3fe4ad1b5b9e3bb1ab16aa4b1a5ffbdf20b43bc5c1b8a8e2b0a6d6c0bd6e3b5c"
stacks = ["*"]
strip-components = 1
"#,
        )
        .unwrap();
        std::fs::create_dir(platform.path().join("env")).unwrap();
        std::fs::write(platform.path().join("env/BP_NODE_VERSION"), "99.*").unwrap();

        buildpack()
            .arg("build")
            .arg(layers.path())
            .arg(platform.path())
            .arg(platform.path().join("plan.toml"))
            .arg("--buildpack-dir")
            .arg(buildpack_dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("No dependency found for node"))
            .stderr(predicate::str::contains("BP_NODE_VERSION"));

        assert!(!layers.path().join("solc.toml").exists());
    }
}
