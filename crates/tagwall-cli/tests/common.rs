#![allow(dead_code)]
use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnv {
    _dir: TempDir,
    pub db: PathBuf,
    pub cfg: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = dir.path().join("config");
        std::fs::create_dir_all(&cfg).expect("cfg dir");
        let db = dir.path().join("tagwall.db");
        Self { _dir: dir, db, cfg }
    }

    pub fn bin(&self) -> Command {
        let mut cmd = Command::cargo_bin("tagwall").unwrap();
        cmd.env("XDG_CONFIG_HOME", &self.cfg);
        cmd.env("XDG_DATA_HOME", &self.cfg);
        cmd.env_remove("TAGWALL_LOG");
        cmd.arg("--db").arg(&self.db);
        cmd
    }

    pub fn stdout(&self, args: &[&str]) -> String {
        let out = self.bin().args(args).assert().success().get_output().stdout.clone();
        String::from_utf8(out).unwrap()
    }

    /// Write `settings.toml` under the config dir and return its path.
    pub fn write_settings(&self, body: &str) -> PathBuf {
        let dir = self.cfg.join("tagwall");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    pub fn write_listing(&self, rows: serde_json::Value) -> PathBuf {
        let path = self.cfg.join("listing.json");
        std::fs::write(&path, serde_json::to_string(&rows).unwrap()).unwrap();
        path
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
