//! Client for the file-storage, sprite-catalog and asset endpoints.
//!
//! Every call is a form POST to one endpoint carrying an `action` field;
//! every reply is a `{success, data, message}` envelope. Envelope parsing and
//! form building are pure so they can be tested natively; only
//! [`StorageClient`] touches the network (via `gloo-net`).
//!
//! Paths are passed through as given. Keeping them inside the scene and
//! asset roots is the server's job.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use gloo_net::http::Request;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;
use web_sys::FormData;

use crate::doc::{FrameCatalog, Scene};
use crate::error::StorageError;

/// One request to the storage endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageAction {
    LoadScene { filename: String },
    SaveScene { filename: String, data: String },
    ListScenes { path: String },
    CheckFileExists { filename: String },
    CreateFolder { path: String, name: String },
    ScanSpriteRoot,
    GetSpriteDetails { name: String },
    ScanAssets { path: String },
}

impl StorageAction {
    /// Value of the `action` form field.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadScene { .. } => "load_scene",
            Self::SaveScene { .. } => "save_scene",
            Self::ListScenes { .. } => "list_scenes",
            Self::CheckFileExists { .. } => "check_file_exists",
            Self::CreateFolder { .. } => "create_folder",
            Self::ScanSpriteRoot => "scan_sprite_root",
            Self::GetSpriteDetails { .. } => "get_sprite_details",
            Self::ScanAssets { .. } => "scan_assets",
        }
    }

    /// Form fields in submission order, `action` first.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![("action", self.name())];
        match self {
            Self::LoadScene { filename } | Self::CheckFileExists { filename } => {
                fields.push(("filename", filename.as_str()));
            }
            Self::SaveScene { filename, data } => {
                fields.push(("filename", filename.as_str()));
                fields.push(("data", data.as_str()));
            }
            Self::ListScenes { path } | Self::ScanAssets { path } => fields.push(("path", path.as_str())),
            Self::CreateFolder { path, name } => {
                fields.push(("path", path.as_str()));
                fields.push(("name", name.as_str()));
            }
            Self::GetSpriteDetails { name } => fields.push(("name", name.as_str())),
            Self::ScanSpriteRoot => {}
        }
        fields
    }
}

// =============================================================
// Envelope
// =============================================================

/// The `{success, data, message}` reply envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: String,
}

impl<T> ApiResponse<T> {
    /// The payload of a successful reply, which may be absent.
    ///
    /// # Errors
    ///
    /// [`StorageError::Rejected`] with the server's message when `success` is false.
    pub fn into_result(self) -> Result<Option<T>, StorageError> {
        if self.success {
            return Ok(self.data);
        }
        let message = if self.message.is_empty() { "request failed".to_owned() } else { self.message };
        Err(StorageError::Rejected(message))
    }

    /// The payload of a successful reply that must carry data.
    ///
    /// # Errors
    ///
    /// As [`into_result`](Self::into_result), plus [`StorageError::MissingData`]
    /// when the payload is absent.
    pub fn into_data(self, action: &'static str) -> Result<T, StorageError> {
        self.into_result()?.ok_or(StorageError::MissingData(action))
    }
}

/// Decode a reply body.
///
/// # Errors
///
/// [`StorageError::Decode`] if the body is not a valid envelope for `T`.
pub fn parse_response<T: DeserializeOwned>(body: &str) -> Result<ApiResponse<T>, StorageError> {
    serde_json::from_str(body).map_err(|e| StorageError::Decode(e.to_string()))
}

/// A directory listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(default)]
    pub folders: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub current_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Scene listings come back either as a full [`Listing`] or as a bare
/// array of file names.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListingPayload {
    Listing(Listing),
    Names(Vec<String>),
}

impl ListingPayload {
    fn into_listing(self, path: &str) -> Listing {
        match self {
            Self::Listing(listing) => listing,
            Self::Names(files) => Listing { files, current_path: path.to_owned(), ..Listing::default() },
        }
    }
}

fn js_error(value: JsValue) -> StorageError {
    StorageError::Js(format!("{value:?}"))
}

fn transport_error(err: gloo_net::Error) -> StorageError {
    StorageError::Transport(err.to_string())
}

// =============================================================
// Client
// =============================================================

/// HTTP client bound to one storage endpoint.
#[derive(Debug, Clone)]
pub struct StorageClient {
    endpoint: String,
}

impl StorageClient {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }

    async fn post<T: DeserializeOwned>(&self, action: &StorageAction) -> Result<ApiResponse<T>, StorageError> {
        let form = FormData::new().map_err(js_error)?;
        for (key, value) in action.fields() {
            form.append_with_str(key, value).map_err(js_error)?;
        }
        log::debug!("storage: {}", action.name());
        let resp = Request::post(&self.endpoint)
            .body(form)
            .map_err(transport_error)?
            .send()
            .await
            .map_err(transport_error)?;
        let status = resp.status();
        if !(200..300).contains(&status) {
            return Err(StorageError::Status(status));
        }
        let body = resp.text().await.map_err(transport_error)?;
        parse_response(&body)
    }

    /// # Errors
    ///
    /// Transport, rejection or decode failures.
    pub async fn load_scene(&self, filename: &str) -> Result<Scene, StorageError> {
        let action = StorageAction::LoadScene { filename: filename.to_owned() };
        self.post(&action).await?.into_data(action.name())
    }

    /// Store `data` (serialized scene JSON). Returns the server's message.
    ///
    /// # Errors
    ///
    /// Transport, rejection or decode failures.
    pub async fn save_scene(&self, filename: &str, data: String) -> Result<String, StorageError> {
        let action = StorageAction::SaveScene { filename: filename.to_owned(), data };
        let resp: ApiResponse<serde_json::Value> = self.post(&action).await?;
        let message = resp.message.clone();
        resp.into_result()?;
        Ok(if message.is_empty() { "Scene saved.".to_owned() } else { message })
    }

    /// # Errors
    ///
    /// Transport, rejection or decode failures.
    pub async fn list_scenes(&self, path: &str) -> Result<Listing, StorageError> {
        let action = StorageAction::ListScenes { path: path.to_owned() };
        let payload: ListingPayload = self.post(&action).await?.into_data(action.name())?;
        Ok(payload.into_listing(path))
    }

    /// # Errors
    ///
    /// Transport, rejection or decode failures.
    pub async fn file_exists(&self, filename: &str) -> Result<bool, StorageError> {
        let action = StorageAction::CheckFileExists { filename: filename.to_owned() };
        let data: Option<serde_json::Value> = self.post(&action).await?.into_result()?;
        Ok(exists_flag(data.as_ref()))
    }

    /// # Errors
    ///
    /// Transport, rejection or decode failures.
    pub async fn create_folder(&self, path: &str, name: &str) -> Result<(), StorageError> {
        let action = StorageAction::CreateFolder { path: path.to_owned(), name: name.to_owned() };
        let resp: ApiResponse<serde_json::Value> = self.post(&action).await?;
        resp.into_result()?;
        Ok(())
    }

    /// Names of the available sprites.
    ///
    /// # Errors
    ///
    /// Transport, rejection or decode failures.
    pub async fn sprite_names(&self) -> Result<Vec<String>, StorageError> {
        let action = StorageAction::ScanSpriteRoot;
        let names: Option<Vec<String>> = self.post(&action).await?.into_result()?;
        Ok(names.unwrap_or_default())
    }

    /// Frame file names per animation of sprite `name`.
    ///
    /// # Errors
    ///
    /// Transport, rejection or decode failures.
    pub async fn sprite_catalog(&self, name: &str) -> Result<FrameCatalog, StorageError> {
        let action = StorageAction::GetSpriteDetails { name: name.to_owned() };
        self.post(&action).await?.into_data(action.name())
    }

    /// # Errors
    ///
    /// Transport, rejection or decode failures.
    pub async fn scan_assets(&self, path: &str) -> Result<Listing, StorageError> {
        let action = StorageAction::ScanAssets { path: path.to_owned() };
        self.post(&action).await?.into_data(action.name())
    }
}

/// Only a literal `true` payload means the file exists.
fn exists_flag(data: Option<&serde_json::Value>) -> bool {
    matches!(data, Some(serde_json::Value::Bool(true)))
}
