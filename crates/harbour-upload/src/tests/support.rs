//! Shared fixtures for the uploader suites.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use mockall::mock;
use tempfile::TempDir;

use crate::cases::Case;
use crate::client::{Archive, ArchiveClient, ArchiveItem, ClientError};
use crate::validate::CaseContents;

mock! {
    pub Client {}
    impl ArchiveClient for Client {
        fn archive_detail(&self, slug: &str) -> Result<Archive, ClientError>;
        fn create_archive_item(&self, archive: &Archive) -> Result<ArchiveItem, ClientError>;
        fn update_archive_item(
            &self,
            item: &ArchiveItem,
            contents: &CaseContents,
        ) -> Result<(), ClientError>;
    }
}

/// Builds a client on which every remote call is a test failure.
pub fn untouched_client() -> MockClient {
    let mut client = MockClient::new();
    client.expect_archive_detail().never();
    client.expect_create_archive_item().never();
    client.expect_update_archive_item().never();
    client
}

/// The archive every mocked lookup resolves to.
pub fn demo_archive() -> Archive {
    Archive {
        pk: String::from("a1"),
        api_url: String::from("https://grand-challenge.org/api/v1/archives/a1/"),
        title: String::from("Demo Challenge"),
        slug: String::from("demo-challenge"),
    }
}

/// Case files laid out under a temporary directory.
pub struct CaseFiles {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl CaseFiles {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp dir");
        Self { _temp: temp, root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Writes a case with one fundus file and an age, returning it.
    pub fn valid_case(&self, index: usize) -> Case {
        let case_root = self.root.join(format!("case{index}"));
        let fundus = case_root.join("images/color-fundus");
        fs::create_dir_all(&fundus).expect("create fundus dir");
        fs::write(fundus.join("fundus.mha"), b"image").expect("write fundus");
        let age = case_root.join("age-in-months.json");
        fs::write(&age, "36").expect("write age");
        Case::from_paths([("color-fundus-image", fundus), ("age-in-months", age)])
    }

    /// Writes a case whose fundus directory exists but is empty.
    pub fn case_with_empty_fundus(&self, index: usize) -> Case {
        let case_root = self.root.join(format!("case{index}"));
        let fundus = case_root.join("images/color-fundus");
        if fundus.exists() {
            fs::remove_dir_all(&fundus).expect("clear fundus dir");
        }
        fs::create_dir_all(&fundus).expect("create fundus dir");
        let age = case_root.join("age-in-months.json");
        fs::write(&age, "36").expect("write age");
        Case::from_paths([("color-fundus-image", fundus), ("age-in-months", age)])
    }
}
