//! Build directory fixtures shared by the integration tests

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use sha1::Sha1;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

pub const INDEX_HTML: &str = "<html></html>";
pub const INDEX_SHA256: &str = "b633a587c652d02386c4f16f8c6f6aab7352d97f16367c3c40576214372dd628";
pub const INDEX_SHA1: &str = "941efb7368e46b27b937d34b07fc4d41da01b002";

/// Which of the default required entries to create
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub index: bool,
    pub manifest: bool,
    pub assets: bool,
}

impl Layout {
    pub const COMPLETE: Layout = Layout {
        index: true,
        manifest: true,
        assets: true,
    };

    pub const INDEX_ONLY: Layout = Layout {
        index: true,
        manifest: false,
        assets: false,
    };

    pub const EMPTY: Layout = Layout {
        index: false,
        manifest: false,
        assets: false,
    };
}

/// Create a build directory with the given layout
pub fn build_dir(layout: Layout) -> TempDir {
    let dir = TempDir::new().unwrap();
    populate(dir.path(), layout);
    dir
}

pub fn populate(dir: &Path, layout: Layout) {
    if layout.index {
        fs::write(dir.join("index.html"), INDEX_HTML).unwrap();
    }
    if layout.manifest {
        fs::write(
            dir.join("manifest.webmanifest"),
            r#"{"name":"demo","start_url":"/"}"#,
        )
        .unwrap();
    }
    if layout.assets {
        fs::create_dir(dir.join("assets")).unwrap();
        fs::write(dir.join("assets/app.3f9a.js"), "console.log(1)").unwrap();
    }
}

/// Names of all files and directories directly under `dir`, sorted
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}
