#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::doc::FrameCatalog;

fn make_static(w: f64, h: f64) -> SceneObject {
    SceneObject::new_static("img", "img.png", Bounds::new(10.0, 20.0, w, h))
}

fn bounds_of(obj: &SceneObject) -> Bounds {
    obj.bounds().unwrap()
}

fn sprite_with_anim() -> SceneObject {
    let mut obj = SceneObject::new_sprite("hero", "knight", Bounds::new(0.0, 0.0, 32.0, 32.0));
    apply_sprite_edit(&mut obj, &SpriteEdit::CurrentAnim { anim: "walk".into() }).unwrap();
    obj
}

fn sequence_of(obj: &SceneObject) -> Vec<SequenceStep> {
    match &obj.kind {
        ObjectKind::SpriteAnim(s) => s.sequence.clone(),
        _ => Vec::new(),
    }
}

// =============================================================
// Views
// =============================================================

#[test]
fn view_follows_selection_cardinality() {
    let a = make_static(80.0, 60.0);
    let b = make_static(160.0, 120.0);
    let (aid, bid) = (a.id.clone(), b.id.clone());
    let scene = Scene { objects: vec![a, b], ..Scene::default() };
    let catalogs = SpriteCatalogs::default();
    let mut sel = Selection::default();

    assert_eq!(view(&scene, &sel, false, &catalogs, 10.0), PanelView::Empty);

    sel.select_scene();
    assert!(matches!(view(&scene, &sel, false, &catalogs, 10.0), PanelView::Scene(_)));

    sel.select_only(aid.clone());
    let PanelView::Object(obj) = view(&scene, &sel, true, &catalogs, 10.0) else {
        panic!("expected object view");
    };
    let t = obj.transform.unwrap();
    assert_eq!((t.width_pct, t.height_pct), (10.0, 10.0));
    assert!(obj.aspect_locked);

    sel.select_many([aid, bid]);
    assert_eq!(
        view(&scene, &sel, false, &catalogs, 10.0),
        PanelView::Multi { count: 2, avg_width_pct: 15.0, avg_height_pct: 15.0 }
    );
}

#[test]
fn stale_single_selection_shows_empty_view() {
    let mut sel = Selection::default();
    sel.select_only("gone".into());
    let v = view(&Scene::default(), &sel, false, &SpriteCatalogs::default(), 10.0);
    assert_eq!(v, PanelView::Empty);
}

#[test]
fn stale_ids_do_not_count_toward_multi_view() {
    let a = make_static(80.0, 60.0);
    let aid = a.id.clone();
    let scene = Scene { objects: vec![a], ..Scene::default() };
    let catalogs = SpriteCatalogs::default();
    let mut sel = Selection::default();

    sel.select_many([aid, "gone".to_owned()]);
    assert!(matches!(view(&scene, &sel, false, &catalogs, 10.0), PanelView::Object(_)));

    sel.select_many(["gone".to_owned(), "also-gone".to_owned()]);
    assert_eq!(view(&scene, &sel, false, &catalogs, 10.0), PanelView::Empty);
}

#[test]
fn folder_view_has_no_transform() {
    let folder = SceneObject::new_folder("F");
    let mut sel = Selection::default();
    sel.select_only(folder.id.clone());
    let scene = Scene { objects: vec![folder], ..Scene::default() };
    let PanelView::Object(v) = view(&scene, &sel, false, &SpriteCatalogs::default(), 10.0) else {
        panic!("expected object view");
    };
    assert!(v.transform.is_none());
    assert_eq!(v.kind, "folder");
}

#[test]
fn sprite_view_lists_catalog_animations() {
    let obj = sprite_with_anim();
    let mut sel = Selection::default();
    sel.select_only(obj.id.clone());
    let scene = Scene { objects: vec![obj], ..Scene::default() };
    let mut catalogs = SpriteCatalogs::default();
    catalogs.insert("knight", FrameCatalog::from([("walk".into(), vec!["0.png".into()]), ("idle".into(), vec![])]));
    let PanelView::Object(v) = view(&scene, &sel, false, &catalogs, 12.0) else {
        panic!("expected object view");
    };
    let sprite = v.sprite.unwrap();
    assert_eq!(sprite.animations, vec!["idle".to_string(), "walk".to_string()]);
    assert_eq!(sprite.settings.fps, 12.0);
}

#[test]
fn panel_view_serializes_with_view_tag() {
    let v = PanelView::Multi { count: 3, avg_width_pct: 1.5, avg_height_pct: 2.0 };
    let value = serde_json::to_value(&v).unwrap();
    assert_eq!(value, json!({ "view": "multi", "count": 3, "avgWidthPct": 1.5, "avgHeightPct": 2.0 }));
}

// =============================================================
// Object fields
// =============================================================

#[test]
fn object_field_deserializes_from_host_json() {
    let field: ObjectField = serde_json::from_value(json!({ "field": "zIndex", "value": 4 })).unwrap();
    assert_eq!(field, ObjectField::ZIndex(4));
    let field: ObjectField = serde_json::from_value(json!({ "field": "widthPct", "value": 12.5 })).unwrap();
    assert_eq!(field, ObjectField::WidthPct(12.5));
    assert!(ObjectField::Name("x".into()).affects_tree());
    assert!(!ObjectField::X(1.0).affects_tree());
}

#[test]
fn aspect_lock_uses_pre_edit_ratio() {
    let meta = SceneMeta::default();
    let mut obj = make_static(100.0, 50.0);
    apply_object_field(&mut obj, &ObjectField::Width(200.0), &meta, true).unwrap();
    assert_eq!(bounds_of(&obj), Bounds::new(10.0, 20.0, 200.0, 100.0));
    apply_object_field(&mut obj, &ObjectField::Height(50.0), &meta, true).unwrap();
    assert_eq!(bounds_of(&obj), Bounds::new(10.0, 20.0, 100.0, 50.0));
}

#[test]
fn unlocked_width_edit_leaves_height() {
    let meta = SceneMeta::default();
    let mut obj = make_static(100.0, 50.0);
    apply_object_field(&mut obj, &ObjectField::Width(30.0), &meta, false).unwrap();
    assert_eq!(bounds_of(&obj).height, 50.0);
}

#[test]
fn percentage_edit_resolves_against_scene() {
    let meta = SceneMeta::default();
    let mut obj = make_static(100.0, 50.0);
    apply_object_field(&mut obj, &ObjectField::WidthPct(25.0), &meta, false).unwrap();
    assert_eq!(bounds_of(&obj).width, 200.0);
    apply_object_field(&mut obj, &ObjectField::HeightPct(50.0), &meta, false).unwrap();
    assert_eq!(bounds_of(&obj).height, 300.0);
}

#[test]
fn invalid_values_are_rejected() {
    let meta = SceneMeta::default();
    let mut obj = make_static(100.0, 50.0);
    assert!(matches!(
        apply_object_field(&mut obj, &ObjectField::Width(0.0), &meta, false),
        Err(EditorError::InvalidValue { field: "width", .. })
    ));
    assert!(matches!(
        apply_object_field(&mut obj, &ObjectField::Name("  ".into()), &meta, false),
        Err(EditorError::InvalidValue { field: "name", .. })
    ));
    assert!(matches!(
        apply_object_field(&mut obj, &ObjectField::X(f64::NAN), &meta, false),
        Err(EditorError::InvalidValue { .. })
    ));
    assert_eq!(bounds_of(&obj), Bounds::new(10.0, 20.0, 100.0, 50.0));
}

#[test]
fn folders_reject_spatial_fields_but_take_common_ones() {
    let meta = SceneMeta::default();
    let mut folder = SceneObject::new_folder("F");
    assert!(matches!(
        apply_object_field(&mut folder, &ObjectField::X(5.0), &meta, false),
        Err(EditorError::UnsupportedKind { operation: "x", .. })
    ));
    assert!(matches!(
        apply_object_field(&mut folder, &ObjectField::Opacity(0.5), &meta, false),
        Err(EditorError::UnsupportedKind { .. })
    ));
    apply_object_field(&mut folder, &ObjectField::Locked(true), &meta, false).unwrap();
    apply_object_field(&mut folder, &ObjectField::Name(" Props ".into()), &meta, false).unwrap();
    assert!(folder.locked);
    assert_eq!(folder.name, "Props");
}

#[test]
fn opacity_is_clamped() {
    let meta = SceneMeta::default();
    let mut obj = make_static(10.0, 10.0);
    apply_object_field(&mut obj, &ObjectField::Opacity(1.7), &meta, false).unwrap();
    assert_eq!(obj.opacity(), 1.0);
}

#[test]
fn multi_pct_edit_skips_folders() {
    let a = make_static(10.0, 10.0);
    let f = SceneObject::new_folder("F");
    let ids = vec![a.id.clone(), f.id.clone()];
    let mut scene = Scene { objects: vec![a, f], ..Scene::default() };
    let changed = set_multi_size_pct(&mut scene, &ids, Axis::Height, 50.0).unwrap();
    assert_eq!(changed, 1);
    assert_eq!(scene.objects[0].bounds().unwrap().height, 300.0);
}

// =============================================================
// Fit to scene
// =============================================================

#[test]
fn fit_wide_object_fills_width_and_centers_vertically() {
    let meta = SceneMeta::default();
    let mut obj = make_static(400.0, 100.0);
    fit_to_scene(&mut obj, &meta).unwrap();
    assert_eq!(bounds_of(&obj), Bounds::new(0.0, 200.0, 800.0, 200.0));
}

#[test]
fn fit_tall_object_fills_height_and_centers_horizontally() {
    let meta = SceneMeta::default();
    let mut obj = make_static(100.0, 200.0);
    fit_to_scene(&mut obj, &meta).unwrap();
    assert_eq!(bounds_of(&obj), Bounds::new(250.0, 0.0, 300.0, 600.0));
}

#[test]
fn fit_rejects_folders() {
    let mut folder = SceneObject::new_folder("F");
    assert!(fit_to_scene(&mut folder, &SceneMeta::default()).is_err());
}

// =============================================================
// Scene fields
// =============================================================

#[test]
fn scene_fields_apply() {
    let mut meta = SceneMeta::default();
    apply_scene_field(&mut meta, &SceneField::Width(1024.4)).unwrap();
    apply_scene_field(&mut meta, &SceneField::GridSnap(false)).unwrap();
    apply_scene_field(&mut meta, &SceneField::BackgroundImage(Some(String::new()))).unwrap();
    apply_scene_field(&mut meta, &SceneField::BackgroundMode(BackgroundMode::Tile)).unwrap();
    assert_eq!(meta.width, 1024.0);
    assert!(!meta.grid.snap);
    assert!(meta.grid.enabled);
    assert!(meta.background_image.is_none());
    assert_eq!(meta.background_mode, BackgroundMode::Tile);
    assert!(SceneField::Height(1.0).resizes_canvas());
}

#[test]
fn scene_field_rejects_bad_grid() {
    let mut meta = SceneMeta::default();
    assert!(apply_scene_field(&mut meta, &SceneField::GridSize(0.0)).is_err());
    assert_eq!(meta.grid.size, 32.0);
    let field: SceneField = serde_json::from_value(json!({ "field": "gridSize", "value": 16 })).unwrap();
    assert_eq!(field, SceneField::GridSize(16.0));
}

// =============================================================
// Sprite edits
// =============================================================

#[test]
fn setting_edit_targets_current_anim() {
    let mut obj = sprite_with_anim();
    apply_sprite_edit(&mut obj, &SpriteEdit::Setting { name: "stepX".into(), value: 4.0 }).unwrap();
    let ObjectKind::SpriteAnim(sprite) = &obj.kind else { panic!("expected sprite") };
    assert_eq!(sprite.anim_settings["walk"].step_x, Some(4.0));
}

#[test]
fn unknown_setting_or_bad_fps_is_rejected() {
    let mut obj = sprite_with_anim();
    assert!(apply_sprite_edit(&mut obj, &SpriteEdit::Setting { name: "speed".into(), value: 1.0 }).is_err());
    assert!(apply_sprite_edit(&mut obj, &SpriteEdit::Setting { name: "fps".into(), value: 0.0 }).is_err());
}

#[test]
fn sequence_add_move_limit_remove() {
    let mut obj = sprite_with_anim();
    apply_sprite_edit(&mut obj, &SpriteEdit::AddStep { anim: "walk".into(), limit: 8 }).unwrap();
    apply_sprite_edit(&mut obj, &SpriteEdit::AddStep { anim: "idle".into(), limit: 0 }).unwrap();
    apply_sprite_edit(&mut obj, &SpriteEdit::MoveStep { from: 1, to: 0 }).unwrap();
    assert_eq!(sequence_of(&obj), vec![SequenceStep::new("idle", 0), SequenceStep::new("walk", 8)]);
    apply_sprite_edit(&mut obj, &SpriteEdit::SetStepLimit { index: 0, limit: 3 }).unwrap();
    apply_sprite_edit(&mut obj, &SpriteEdit::SetStepAnim { index: 1, anim: "run".into() }).unwrap();
    apply_sprite_edit(&mut obj, &SpriteEdit::RemoveStep { index: 1 }).unwrap();
    assert_eq!(sequence_of(&obj), vec![SequenceStep::new("idle", 3)]);
    assert!(apply_sprite_edit(&mut obj, &SpriteEdit::RemoveStep { index: 5 }).is_err());
}

#[test]
fn sprite_edit_json_shape() {
    let edit: SpriteEdit = serde_json::from_value(json!({ "edit": "setStepLimit", "index": 2, "limit": 6 })).unwrap();
    assert_eq!(edit, SpriteEdit::SetStepLimit { index: 2, limit: 6 });
}

#[test]
fn sprite_edits_reject_static_objects() {
    let mut obj = make_static(1.0, 1.0);
    assert!(matches!(
        apply_sprite_edit(&mut obj, &SpriteEdit::RemoveStep { index: 0 }),
        Err(EditorError::UnsupportedKind { .. })
    ));
}
