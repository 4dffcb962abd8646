use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct ConformanceTest {
    pub name: String,
    pub description: String,
    pub cases: Vec<Case>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Case {
    pub name: String,
    pub input: String,
    pub output: String,
    /// Whether converting `output` again must give `output` back.
    #[serde(default = "yes")]
    pub idempotent: bool,
}

fn yes() -> bool {
    true
}

impl ConformanceTest {
    /// Load a test fixture from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let test: ConformanceTest = toml::from_str(&content)?;
        Ok(test)
    }

    /// Load all test fixtures from a directory, sorted by file name
    pub fn load_from_directory<P: AsRef<Path>>(
        dir: P,
    ) -> Result<Vec<Self>, Box<dyn std::error::Error>> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("toml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut tests = Vec::with_capacity(paths.len());
        for path in paths {
            let test = Self::load_from_file(&path)
                .map_err(|e| format!("failed to load {}: {}", path.display(), e))?;
            tests.push(test);
        }
        Ok(tests)
    }

    /// Every fixture under `tests/fixtures`.
    pub fn load_all() -> Result<Vec<Self>, Box<dyn std::error::Error>> {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");
        Self::load_from_directory(dir)
    }
}
