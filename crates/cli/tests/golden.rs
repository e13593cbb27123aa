//! Golden tests for verifying JSON output format stability
//!
//! Every case here runs offline: missing local files, presigning and
//! argument errors never reach the network.
//!
//! Run with: `cargo test --features golden`

#![cfg(feature = "golden")]

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const ENDPOINT: &str = "http://127.0.0.1:9";

/// Isolated settings directory plus a credentials file
struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let creds = serde_json::json!({
            "access_key_id": "AKIAGOLDEN",
            "secret_access_key": "golden-secret",
            "endpoint_url": ENDPOINT,
        });
        std::fs::write(dir.path().join("creds.json"), creds.to_string()).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn credentials(&self) -> String {
        self.path().join("creds.json").display().to_string()
    }

    fn osn(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_osn"))
            .args(args)
            .env("OSN_CONFIG_DIR", self.path().join("config"))
            .env_remove("OSN_CREDENTIALS")
            .env_remove("OSN_ACCESS_KEY_ID")
            .env_remove("OSN_SECRET_ACCESS_KEY")
            .env_remove("OSN_ENDPOINT_URL")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute osn")
    }
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

fn stderr_json(output: &Output) -> serde_json::Value {
    let stderr = String::from_utf8_lossy(&output.stderr);
    serde_json::from_str(&stderr).expect("Error output should be valid JSON")
}

mod upload_tests {
    use super::*;

    #[test]
    fn test_upload_missing_file_json() {
        let env = TestEnv::new();
        let missing = env.path().join("cell_02.csv").display().to_string();
        let creds = env.credentials();

        let output = env.osn(&[
            "--credentials",
            &creds,
            "--json",
            "upload",
            &missing,
            "--bucket",
            "pv-data",
        ]);

        // Some items failed
        assert_eq!(output.status.code(), Some(1));

        let json = stdout_json(&output);
        assert_eq!(json["operation"], "upload");
        assert_eq!(json["bucket"], "pv-data");
        assert_eq!(json["cancelled"], false);
        assert_eq!(json["bytes_transferred"], 0);
        assert!(json["started_at"].is_string());
        assert!(json["finished_at"].is_string());

        insta::with_settings!({sort_maps => true}, {
            insta::assert_json_snapshot!(&json["items"], @r#"
            {
              "cell_02.csv": "missing"
            }
            "#);
            insta::assert_json_snapshot!(&json["summary"], @r#"
            {
              "client_error": 0,
              "error": 0,
              "missing": 1,
              "skipped": 0,
              "success": 0,
              "total": 1
            }
            "#);
        });
    }

    #[test]
    fn test_upload_glob_without_matches_json() {
        let env = TestEnv::new();
        let pattern = format!("{}/*.csv", env.path().display());
        let creds = env.credentials();

        let output = env.osn(&[
            "--credentials",
            &creds,
            "--json",
            "upload",
            &pattern,
            "--bucket",
            "pv-data",
        ]);

        assert!(output.status.success(), "Empty upload should succeed");
        let json = stdout_json(&output);
        assert_eq!(json["items"], serde_json::json!({}));
        assert_eq!(json["summary"]["total"], 0);
    }

    #[test]
    fn test_upload_zero_batch_size() {
        let env = TestEnv::new();
        let creds = env.credentials();

        let output = env.osn(&[
            "--credentials",
            &creds,
            "--json",
            "upload",
            "a.csv",
            "--bucket",
            "pv-data",
            "--batch-size",
            "0",
        ]);

        assert_eq!(output.status.code(), Some(2));
        let json = stderr_json(&output);
        assert!(json["error"].as_str().unwrap().contains("batch size"));
    }
}

mod credentials_tests {
    use super::*;

    #[test]
    fn test_malformed_credentials_file() {
        let env = TestEnv::new();
        let path = env.path().join("broken.json");
        std::fs::write(&path, "{\"access_key_id\": \"AK\"").unwrap();

        let output = env.osn(&[
            "--credentials",
            path.to_str().unwrap(),
            "--json",
            "ls",
            "--bucket",
            "pv-data",
        ]);

        assert_eq!(output.status.code(), Some(2), "Exit code should be 2 (USAGE)");
        let json = stderr_json(&output);
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .starts_with("Failed to load credentials")
        );
    }

    #[test]
    fn test_no_credentials_anywhere() {
        let env = TestEnv::new();
        let output = env.osn(&["--json", "ls"]);

        assert_eq!(output.status.code(), Some(2));
        let json = stderr_json(&output);
        assert!(json["error"].as_str().unwrap().contains("OSN_ACCESS_KEY_ID"));
    }

    #[test]
    fn test_secret_never_printed() {
        let env = TestEnv::new();
        let creds = env.credentials();
        let output = env.osn(&[
            "--credentials",
            &creds,
            "--debug",
            "--json",
            "share",
            "--bucket",
            "pv-data",
            "--key",
            "a.csv",
        ]);

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(!stderr.contains("golden-secret"));
        assert!(!stdout.contains("golden-secret"));
    }
}

mod settings_tests {
    use super::*;

    #[test]
    fn test_malformed_settings_file() {
        let env = TestEnv::new();
        let config_dir = env.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), "[sync]\nbatch_size = \"many\"\n")
            .unwrap();
        let creds = env.credentials();

        let output = env.osn(&["--credentials", &creds, "--json", "ls"]);
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_credentials_file_from_settings() {
        let env = TestEnv::new();
        let config_dir = env.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        let settings = format!("credentials_file = {:?}\n", env.credentials());
        std::fs::write(config_dir.join("config.toml"), settings).unwrap();

        let output = env.osn(&[
            "--json", "share", "--bucket", "pv-data", "--key", "a.csv",
        ]);

        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["expires_secs"], 3600);
    }
}

mod share_tests {
    use super::*;

    #[test]
    fn test_share_json() {
        let env = TestEnv::new();
        let creds = env.credentials();

        let output = env.osn(&[
            "--credentials",
            &creds,
            "--json",
            "share",
            "--bucket",
            "pv-data",
            "--key",
            "runs/cell_01.csv",
            "--expire",
            "10m",
        ]);

        assert!(output.status.success(), "Presigning needs no network");

        let mut json = stdout_json(&output);
        let url = json["url"].as_str().unwrap().to_string();
        assert!(url.starts_with(&format!("{ENDPOINT}/pv-data/runs/cell_01.csv?")));
        assert!(url.contains("X-Amz-Expires=600"));
        json.as_object_mut().unwrap().remove("url");

        insta::with_settings!({sort_maps => true}, {
            insta::assert_json_snapshot!(&json, @r#"
            {
              "bucket": "pv-data",
              "expires_in": "10 minute(s)",
              "expires_secs": 600,
              "key": "runs/cell_01.csv"
            }
            "#);
        });
    }

    #[test]
    fn test_share_expiration_too_long() {
        let env = TestEnv::new();
        let creds = env.credentials();

        let output = env.osn(&[
            "--credentials",
            &creds,
            "--json",
            "share",
            "--bucket",
            "pv-data",
            "--key",
            "a.csv",
            "--expire",
            "8d",
        ]);

        assert_eq!(output.status.code(), Some(2));
        let json = stderr_json(&output);
        assert!(json["error"].as_str().unwrap().contains("7 days"));
    }

    #[test]
    fn test_share_folder_key_rejected() {
        let env = TestEnv::new();
        let creds = env.credentials();

        let output = env.osn(&[
            "--credentials",
            &creds,
            "share",
            "--bucket",
            "pv-data",
            "--key",
            "runs/",
        ]);
        assert_eq!(output.status.code(), Some(2));
    }
}
