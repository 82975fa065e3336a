//! [`ArchiveClient`] backed by the Grand Challenge REST API.

use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::client::{Archive, ArchiveClient, ArchiveItem, ClientError};
use crate::validate::{CaseContents, SocketContent};

const HTTP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::http");

#[derive(Debug, Deserialize)]
struct Page<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct UserUpload {
    api_url: String,
}

/// Blocking HTTP client authenticating with a bearer token.
#[derive(Debug, Clone)]
pub struct GrandChallengeClient {
    base: Url,
    token: String,
    client: Client,
}

impl GrandChallengeClient {
    /// Builds a client rooted at `api_url`.
    ///
    /// The base URL is normalised to end in `/` so relative endpoints nest
    /// beneath it. An empty token is rejected.
    pub fn new(api_url: &str, token: &str) -> Result<Self, ClientError> {
        if token.trim().is_empty() {
            return Err(ClientError::MissingToken);
        }
        let mut base = Url::parse(api_url.trim()).map_err(|error| ClientError::InvalidUrl {
            url: api_url.to_owned(),
            message: error.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                url: api_url.to_owned(),
                message: String::from("URL cannot be used as a base"),
            });
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .build()
            .map_err(|source| http_error(base.as_str(), source))?;
        Ok(Self {
            base,
            token: token.trim().to_owned(),
            client,
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|error| ClientError::InvalidUrl {
                url: format!("{}{path}", self.base),
                message: error.to_string(),
            })
    }

    fn execute<T>(&self, endpoint: &Url, request: RequestBuilder) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        debug!(target: HTTP_TARGET, endpoint = %endpoint, "sending request");
        request
            .bearer_auth(&self.token)
            .send()
            .and_then(Response::error_for_status)
            .and_then(Response::json)
            .map_err(|source| http_error(endpoint.as_str(), source))
    }

    fn upload_file(&self, path: &Utf8Path) -> Result<UserUpload, ClientError> {
        let bytes = fs::read(path).map_err(|source| ClientError::File {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        let file_name = path.file_name().unwrap_or("upload").to_owned();
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        let endpoint = self.endpoint("uploads/")?;
        self.execute(&endpoint, self.client.post(endpoint.clone()).multipart(form))
    }

    fn attach_files(
        &self,
        item: &ArchiveItem,
        slug: &str,
        files: &[Utf8PathBuf],
    ) -> Result<(), ClientError> {
        let uploads = files
            .iter()
            .map(|file| self.upload_file(file).map(|upload| upload.api_url))
            .collect::<Result<Vec<_>, _>>()?;
        let endpoint = self.endpoint("cases/upload-sessions/")?;
        let body = upload_session_body(item, slug, &uploads);
        self.execute::<serde_json::Value>(&endpoint, self.client.post(endpoint.clone()).json(&body))
            .map(drop)
    }
}

fn create_item_body(archive: &Archive) -> serde_json::Value {
    json!({"archive": archive.api_url, "values": []})
}

fn upload_session_body(item: &ArchiveItem, slug: &str, uploads: &[String]) -> serde_json::Value {
    json!({
        "archive_item": item.pk,
        "interface": slug,
        "uploads": uploads,
    })
}

/// PATCH body carrying the case's JSON values; `None` when it has none.
fn item_values_body(contents: &CaseContents) -> Option<serde_json::Value> {
    let values: Vec<_> = contents
        .iter()
        .filter_map(|(socket, content)| match content {
            SocketContent::Value(value) => {
                Some(json!({"interface": socket.slug(), "value": value}))
            }
            SocketContent::Files(_) => None,
        })
        .collect();
    (!values.is_empty()).then(|| json!({ "values": values }))
}

fn http_error(endpoint: &str, source: reqwest::Error) -> ClientError {
    ClientError::Http {
        endpoint: endpoint.to_owned(),
        source: Arc::new(source),
    }
}

impl ArchiveClient for GrandChallengeClient {
    fn archive_detail(&self, slug: &str) -> Result<Archive, ClientError> {
        let endpoint = self.endpoint("archives/")?;
        let page: Page<Archive> = self.execute(
            &endpoint,
            self.client.get(endpoint.clone()).query(&[("slug", slug)]),
        )?;
        let count = page.results.len();
        let mut results = page.results.into_iter();
        match (results.next(), results.next()) {
            (Some(archive), None) => Ok(archive),
            _ => Err(ClientError::ArchiveLookup {
                slug: slug.to_owned(),
                count,
            }),
        }
    }

    fn create_archive_item(&self, archive: &Archive) -> Result<ArchiveItem, ClientError> {
        let endpoint = self.endpoint("archives/items/")?;
        let body = create_item_body(archive);
        self.execute(&endpoint, self.client.post(endpoint.clone()).json(&body))
    }

    fn update_archive_item(
        &self,
        item: &ArchiveItem,
        contents: &CaseContents,
    ) -> Result<(), ClientError> {
        for (socket, content) in contents.iter() {
            if let SocketContent::Files(files) = content {
                self.attach_files(item, socket.slug(), files)?;
            }
        }
        let Some(body) = item_values_body(contents) else {
            return Ok(());
        };
        let endpoint = self.endpoint(&format!("archives/items/{}/", item.pk))?;
        self.execute::<serde_json::Value>(
            &endpoint,
            self.client
                .patch(endpoint.clone())
                .json(&body),
        )
        .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbour_sockets::Socket;
    use rstest::rstest;

    fn item() -> ArchiveItem {
        ArchiveItem {
            pk: String::from("item-1"),
        }
    }

    #[rstest]
    fn new_items_reference_the_archive_with_no_values() {
        let archive = Archive {
            pk: String::from("a1"),
            api_url: String::from("https://grand-challenge.org/api/v1/archives/a1/"),
            title: String::from("Demo"),
            slug: String::from("demo"),
        };
        assert_eq!(
            create_item_body(&archive),
            json!({"archive": "https://grand-challenge.org/api/v1/archives/a1/", "values": []})
        );
    }

    #[rstest]
    fn upload_sessions_attach_uploads_to_the_item_socket() {
        let uploads = vec![String::from("https://grand-challenge.org/api/v1/uploads/u1/")];
        assert_eq!(
            upload_session_body(&item(), "color-fundus-image", &uploads),
            json!({
                "archive_item": "item-1",
                "interface": "color-fundus-image",
                "uploads": ["https://grand-challenge.org/api/v1/uploads/u1/"],
            })
        );
    }

    #[rstest]
    fn item_values_carry_only_json_sockets() {
        let contents: CaseContents = [
            (
                Socket::ColorFundusImage,
                SocketContent::Files(vec![Utf8PathBuf::from("fundus/a.mha")]),
            ),
            (Socket::AgeInMonths, SocketContent::Value(json!(36))),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            item_values_body(&contents),
            Some(json!({"values": [{"interface": "age-in-months", "value": 36}]}))
        );
    }

    #[rstest]
    fn file_only_cases_have_no_values_to_patch() {
        let contents: CaseContents = [(
            Socket::ColorFundusImage,
            SocketContent::Files(vec![Utf8PathBuf::from("fundus/a.mha")]),
        )]
        .into_iter()
        .collect();

        assert_eq!(item_values_body(&contents), None);
    }

    #[rstest]
    #[case("https://grand-challenge.org/api/v1/")]
    #[case("https://grand-challenge.org/api/v1")]
    #[case(" https://grand-challenge.org/api/v1/ ")]
    fn endpoints_nest_under_the_base_url(#[case] base: &str) {
        let client = GrandChallengeClient::new(base, "token").expect("client should build");
        assert_eq!(
            client
                .endpoint("archives/items/")
                .expect("endpoint should join")
                .as_str(),
            "https://grand-challenge.org/api/v1/archives/items/"
        );
        assert_eq!(
            client
                .endpoint("/uploads/")
                .expect("endpoint should join")
                .as_str(),
            "https://grand-challenge.org/api/v1/uploads/"
        );
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_tokens_are_rejected(#[case] token: &str) {
        assert!(matches!(
            GrandChallengeClient::new("https://grand-challenge.org/api/v1/", token),
            Err(ClientError::MissingToken)
        ));
    }

    #[rstest]
    #[case("not a url")]
    #[case("mailto:archive@example.com")]
    fn unusable_base_urls_are_rejected(#[case] url: &str) {
        assert!(matches!(
            GrandChallengeClient::new(url, "token"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }
}
