//! Pre-flight validation of cases before anything is sent to the archive.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use harbour_sockets::marshal::{self, MarshalError};
use harbour_sockets::{Socket, SocketKind, UnknownSocketError};
use thiserror::Error;
use walkdir::WalkDir;

use crate::cases::{Case, SocketSet};

/// Reasons a single case fails validation.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// The case's slugs match none of the expected socket sets.
    #[error("case provides sockets {observed:?}, expected one of {expected:?}")]
    UnexpectedSocketSet {
        /// Slugs the case provides.
        observed: Vec<String>,
        /// Accepted socket sets.
        expected: Vec<Vec<String>>,
    },
    /// A referenced path does not exist.
    #[error("path '{path}' for socket '{slug}' does not exist")]
    MissingFile {
        /// Socket slug.
        slug: String,
        /// Missing path.
        path: Utf8PathBuf,
    },
    /// An image socket's path holds no files.
    #[error("no files found under '{path}' for image socket '{slug}'")]
    EmptyImageSet {
        /// Socket slug.
        slug: String,
        /// Searched path.
        path: Utf8PathBuf,
    },
    /// A JSON socket's file holds malformed content.
    #[error("failed to parse '{path}' for socket '{slug}': {source}")]
    ParseFailure {
        /// Socket slug.
        slug: String,
        /// Offending file.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },
    /// The slug is not part of the socket catalogue.
    #[error(transparent)]
    UnknownSocket(#[from] UnknownSocketError),
    /// A JSON socket's file could not be loaded.
    #[error(transparent)]
    Load(MarshalError),
    /// A path could not be read.
    #[error("failed to read '{path}': {source}")]
    Read {
        /// Location that failed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// A validated case that failed, with its position in the case table.
#[derive(Debug, Clone, Error)]
#[error("case {index} is invalid: {source}")]
pub struct InvalidCase {
    /// Zero-based position of the case.
    pub index: usize,
    /// Validation failure.
    #[source]
    pub source: ValidationError,
}

/// Materialised content of one socket.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketContent {
    /// Files backing an image socket, sorted.
    Files(Vec<Utf8PathBuf>),
    /// Parsed value of a JSON socket.
    Value(serde_json::Value),
}

/// Validated content of one case keyed by socket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseContents {
    sockets: BTreeMap<Socket, SocketContent>,
}

impl CaseContents {
    /// Content for `socket`, if the case provides it.
    #[must_use]
    pub fn get(&self, socket: Socket) -> Option<&SocketContent> {
        self.sockets.get(&socket)
    }

    /// Iterates over sockets in catalogue order.
    pub fn iter(&self) -> impl Iterator<Item = (Socket, &SocketContent)> {
        self.sockets.iter().map(|(socket, content)| (*socket, content))
    }

    /// Number of sockets in the case.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    /// Returns `true` when the case provides no sockets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }
}

impl FromIterator<(Socket, SocketContent)> for CaseContents {
    fn from_iter<I: IntoIterator<Item = (Socket, SocketContent)>>(iter: I) -> Self {
        Self {
            sockets: iter.into_iter().collect(),
        }
    }
}

/// Validates one case against the accepted socket sets.
///
/// The socket set is checked first, then the existence of every path, then
/// each socket is materialised by kind.
pub fn validate(case: &Case, expected: &[SocketSet]) -> Result<CaseContents, ValidationError> {
    let observed = case.socket_set();
    if !expected.contains(&observed) {
        return Err(ValidationError::UnexpectedSocketSet {
            observed: observed.into_iter().collect(),
            expected: expected
                .iter()
                .map(|set| set.iter().cloned().collect())
                .collect(),
        });
    }

    if let Some((slug, path)) = case.iter().find(|(_, path)| !path.exists()) {
        return Err(ValidationError::MissingFile {
            slug: slug.to_owned(),
            path: path.to_path_buf(),
        });
    }

    case.iter()
        .map(|(slug, path)| -> Result<(Socket, SocketContent), ValidationError> {
            let socket: Socket = slug.parse()?;
            materialise(socket, path).map(|content| (socket, content))
        })
        .collect()
}

/// Validates every case, stopping at the first invalid one.
pub fn validate_all(
    cases: &[Case],
    expected: &[SocketSet],
) -> Result<Vec<CaseContents>, InvalidCase> {
    cases
        .iter()
        .enumerate()
        .map(|(index, case)| {
            validate(case, expected).map_err(|source| InvalidCase { index, source })
        })
        .collect()
}

fn materialise(socket: Socket, path: &Utf8Path) -> Result<SocketContent, ValidationError> {
    match socket.kind() {
        SocketKind::Image => {
            let files = collect_files(path)?;
            if files.is_empty() {
                return Err(ValidationError::EmptyImageSet {
                    slug: socket.slug().to_owned(),
                    path: path.to_path_buf(),
                });
            }
            Ok(SocketContent::Files(files))
        }
        SocketKind::Json => match marshal::load_json(path) {
            Ok(value) => Ok(SocketContent::Value(value)),
            Err(MarshalError::ParseFailure { path, source }) => Err(ValidationError::ParseFailure {
                slug: socket.slug().to_owned(),
                path,
                source,
            }),
            Err(other) => Err(ValidationError::Load(other)),
        },
    }
}

/// Every regular file under `path`, sorted; a file path yields itself.
///
/// Symlinked directories are not descended, so a link cycle cannot repeat
/// files.
fn collect_files(path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ValidationError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(|error| walk_error(path, error))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(file) = Utf8PathBuf::from_path_buf(entry.into_path()) {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

fn walk_error(root: &Utf8Path, error: walkdir::Error) -> ValidationError {
    let path = error
        .path()
        .and_then(Utf8Path::from_path)
        .map_or_else(|| root.to_path_buf(), Utf8Path::to_path_buf);
    ValidationError::Read {
        path,
        source: Arc::new(io::Error::from(error)),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use crate::cases::default_expected_socket_sets;

    struct Fixture {
        _temp: TempDir,
        root: Utf8PathBuf,
    }

    impl Fixture {
        fn file(&self, relative: &str, content: &str) -> Utf8PathBuf {
            let path = self.root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create parent");
            }
            fs::write(&path, content).expect("write file");
            path
        }

        fn dir(&self, relative: &str) -> Utf8PathBuf {
            let path = self.root.join(relative);
            fs::create_dir_all(&path).expect("create dir");
            path
        }
    }

    #[fixture]
    fn fixture() -> Fixture {
        let temp = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp dir");
        Fixture { _temp: temp, root }
    }

    fn case(fundus: &Utf8Path, age: &Utf8Path) -> Case {
        Case::from_paths([
            ("color-fundus-image", fundus.to_path_buf()),
            ("age-in-months", age.to_path_buf()),
        ])
    }

    #[rstest]
    fn valid_case_materialises_every_socket(fixture: Fixture) {
        fixture.file("case0/fundus/b.mha", "b");
        fixture.file("case0/fundus/nested/a.tif", "a");
        let age = fixture.file("case0/age.json", "36");

        let contents = validate(
            &case(&fixture.root.join("case0/fundus"), &age),
            &default_expected_socket_sets(),
        )
        .expect("case should validate");

        assert_eq!(
            contents.get(Socket::ColorFundusImage),
            Some(&SocketContent::Files(vec![
                fixture.root.join("case0/fundus/b.mha"),
                fixture.root.join("case0/fundus/nested/a.tif"),
            ]))
        );
        assert_eq!(
            contents.get(Socket::AgeInMonths),
            Some(&SocketContent::Value(serde_json::json!(36)))
        );
    }

    #[rstest]
    fn single_file_image_path_yields_itself(fixture: Fixture) {
        let image = fixture.file("fundus.mha", "x");
        let age = fixture.file("age.json", "1");

        let contents = validate(&case(&image, &age), &default_expected_socket_sets())
            .expect("case should validate");

        assert_eq!(
            contents.get(Socket::ColorFundusImage),
            Some(&SocketContent::Files(vec![image]))
        );
    }

    #[cfg(unix)]
    #[rstest]
    fn symlinked_directories_are_not_descended(fixture: Fixture) {
        let fundus = fixture.dir("fundus");
        let image = fixture.file("fundus/a.mha", "a");
        std::os::unix::fs::symlink(&fundus, fundus.join("loop")).expect("create symlink loop");
        let age = fixture.file("age.json", "1");

        let contents = validate(&case(&fundus, &age), &default_expected_socket_sets())
            .expect("case should validate");

        assert_eq!(
            contents.get(Socket::ColorFundusImage),
            Some(&SocketContent::Files(vec![image]))
        );
    }

    #[rstest]
    fn partial_socket_set_is_rejected(fixture: Fixture) {
        let image = fixture.file("fundus.mha", "x");
        let only_fundus = Case::from_paths([("color-fundus-image", image)]);

        let error = validate(&only_fundus, &default_expected_socket_sets())
            .expect_err("set should be rejected");

        assert!(matches!(
            error,
            ValidationError::UnexpectedSocketSet { ref observed, .. } if observed == &["color-fundus-image"]
        ));
    }

    #[rstest]
    fn missing_path_is_reported(fixture: Fixture) {
        let age = fixture.file("age.json", "1");
        let absent = fixture.root.join("absent");

        let error = validate(&case(&absent, &age), &default_expected_socket_sets())
            .expect_err("path should be missing");

        assert!(matches!(
            error,
            ValidationError::MissingFile { ref slug, ref path }
                if slug == "color-fundus-image" && *path == absent
        ));
    }

    #[rstest]
    fn empty_image_directory_is_reported(fixture: Fixture) {
        let fundus = fixture.dir("fundus");
        fixture.dir("fundus/empty-child");
        let age = fixture.file("age.json", "1");

        let error = validate(&case(&fundus, &age), &default_expected_socket_sets())
            .expect_err("image set should be empty");

        assert!(matches!(error, ValidationError::EmptyImageSet { .. }));
    }

    #[rstest]
    fn malformed_json_is_reported(fixture: Fixture) {
        let image = fixture.file("fundus.mha", "x");
        let age = fixture.file("age.json", "{36");

        let error = validate(&case(&image, &age), &default_expected_socket_sets())
            .expect_err("json should not parse");

        assert!(matches!(
            error,
            ValidationError::ParseFailure { ref slug, .. } if slug == "age-in-months"
        ));
    }

    #[rstest]
    fn slug_outside_the_catalogue_is_unknown(fixture: Fixture) {
        let notes = fixture.file("notes.txt", "x");
        let expected = vec![SocketSet::from([String::from("clinical-notes")])];
        let unknown = Case::from_paths([("clinical-notes", notes)]);

        let error = validate(&unknown, &expected).expect_err("slug should be unknown");

        assert!(matches!(
            error,
            ValidationError::UnknownSocket(ref inner) if inner.slug() == "clinical-notes"
        ));
    }

    #[rstest]
    fn validate_all_reports_the_failing_index(fixture: Fixture) {
        let image = fixture.file("fundus.mha", "x");
        let age = fixture.file("age.json", "1");
        let empty = fixture.dir("empty");
        let cases = vec![case(&image, &age), case(&empty, &age), case(&image, &age)];

        let error = validate_all(&cases, &default_expected_socket_sets())
            .expect_err("second case should fail");

        assert_eq!(error.index, 1);
        assert!(matches!(error.source, ValidationError::EmptyImageSet { .. }));
    }

    #[rstest]
    fn validate_all_keeps_case_order(fixture: Fixture) {
        let first = fixture.file("one.mha", "1");
        let second = fixture.file("two.mha", "2");
        let age = fixture.file("age.json", "1");

        let contents = validate_all(
            &[case(&first, &age), case(&second, &age)],
            &default_expected_socket_sets(),
        )
        .expect("cases should validate");

        assert_eq!(
            contents[1].get(Socket::ColorFundusImage),
            Some(&SocketContent::Files(vec![second]))
        );
    }
}
