#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

fn envelope<T: DeserializeOwned>(value: &serde_json::Value) -> ApiResponse<T> {
    parse_response(&value.to_string()).unwrap()
}

// =============================================================
// Form fields
// =============================================================

#[test]
fn fields_start_with_action() {
    let action = StorageAction::SaveScene { filename: "level.json".into(), data: "{}".into() };
    assert_eq!(action.fields(), vec![("action", "save_scene"), ("filename", "level.json"), ("data", "{}")]);
}

#[test]
fn sprite_root_scan_has_no_extra_fields() {
    assert_eq!(StorageAction::ScanSpriteRoot.fields(), vec![("action", "scan_sprite_root")]);
}

#[test]
fn create_folder_sends_path_and_name() {
    let action = StorageAction::CreateFolder { path: "scenes".into(), name: "act1".into() };
    assert_eq!(action.fields(), vec![("action", "create_folder"), ("path", "scenes"), ("name", "act1")]);
}

// =============================================================
// Envelope
// =============================================================

#[test]
fn successful_envelope_yields_data() {
    let resp: ApiResponse<FrameCatalog> =
        envelope(&json!({ "success": true, "data": { "idle": ["0.png", "1.png"] }, "message": "" }));
    let catalog = resp.into_data("get_sprite_details").unwrap();
    assert_eq!(catalog["idle"], vec!["0.png", "1.png"]);
}

#[test]
fn rejected_envelope_carries_server_message() {
    let resp: ApiResponse<Scene> =
        envelope(&json!({ "success": false, "data": null, "message": "Scene file not found." }));
    assert_eq!(resp.into_data("load_scene"), Err(StorageError::Rejected("Scene file not found.".into())));
}

#[test]
fn rejected_envelope_without_message_gets_generic_text() {
    let resp: ApiResponse<Scene> = envelope(&json!({ "success": false }));
    assert_eq!(resp.into_result(), Err(StorageError::Rejected("request failed".into())));
}

#[test]
fn missing_data_is_an_error_only_when_required() {
    let resp: ApiResponse<Listing> = envelope(&json!({ "success": true, "data": null }));
    assert_eq!(resp.clone().into_result(), Ok(None));
    assert_eq!(resp.into_data("scan_assets"), Err(StorageError::MissingData("scan_assets")));
}

#[test]
fn malformed_body_is_a_decode_error() {
    let result: Result<ApiResponse<Scene>, _> = parse_response("<html>oops</html>");
    assert!(matches!(result, Err(StorageError::Decode(_))));
}

#[test]
fn loaded_scene_decodes_from_envelope() {
    let body = json!({
        "success": true,
        "data": {
            "meta": { "sceneName": "intro", "width": 640, "height": 480, "backgroundColor": "#000" },
            "objects": []
        }
    });
    let scene: Scene = envelope(&body).into_data("load_scene").unwrap();
    assert_eq!(scene.meta.scene_name, "intro");
    assert_eq!(scene.meta.width, 640.0);
}

// =============================================================
// Listings
// =============================================================

#[test]
fn asset_listing_decodes_camel_case() {
    let resp: ApiResponse<Listing> = envelope(&json!({
        "success": true,
        "data": { "folders": ["ui"], "files": ["a.png"], "currentPath": "assets/props", "parent": "assets" }
    }));
    let listing = resp.into_data("scan_assets").unwrap();
    assert_eq!(listing.folders, vec!["ui"]);
    assert_eq!(listing.current_path, "assets/props");
    assert_eq!(listing.parent.as_deref(), Some("assets"));
}

#[test]
fn bare_name_list_becomes_listing() {
    let resp: ApiResponse<ListingPayload> =
        envelope(&json!({ "success": true, "data": ["a.json", "b.json"] }));
    let listing = resp.into_data("list_scenes").unwrap().into_listing("scenes");
    assert_eq!(listing.files, vec!["a.json", "b.json"]);
    assert_eq!(listing.current_path, "scenes");
    assert!(listing.folders.is_empty());
    assert!(listing.parent.is_none());
}

#[test]
fn only_literal_true_means_exists() {
    assert!(exists_flag(Some(&json!(true))));
    assert!(!exists_flag(Some(&json!(false))));
    assert!(!exists_flag(Some(&json!("true"))));
    assert!(!exists_flag(None));
}
