#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

fn make_static(name: &str, x: f64, y: f64) -> SceneObject {
    SceneObject::new_static(name, format!("assets/{name}.png"), Bounds::new(x, y, 64.0, 64.0))
}

fn scene_with(objects: Vec<SceneObject>) -> Scene {
    Scene { objects, ..Scene::default() }
}

// =============================================================
// Defaults
// =============================================================

#[test]
fn default_scene_matches_new_scene_shape() {
    let scene = Scene::default();
    assert_eq!(scene.meta.scene_name, "Unnamed");
    assert_eq!(scene.meta.width, 800.0);
    assert_eq!(scene.meta.height, 600.0);
    assert_eq!(scene.meta.background_color, "#333");
    assert_eq!(scene.meta.grid, GridSettings { enabled: true, size: 32.0, snap: true });
    assert!(scene.objects.is_empty());
}

#[test]
fn grid_snap_rounds_to_nearest_multiple() {
    let grid = GridSettings::default();
    assert_eq!(grid.snap_value(416.0), 416.0);
    assert_eq!(grid.snap_value(401.0), 416.0);
    assert_eq!(grid.snap_value(399.0), 384.0);
}

#[test]
fn grid_snap_with_zero_size_is_identity() {
    let grid = GridSettings { size: 0.0, ..GridSettings::default() };
    assert_eq!(grid.snap_value(13.7), 13.7);
}

// =============================================================
// Serde shape
// =============================================================

#[test]
fn static_object_serializes_flat_with_type_tag() {
    let obj = make_static("tree", 10.0, 20.0);
    let value = serde_json::to_value(&obj).unwrap();
    assert_eq!(value["type"], "static");
    assert_eq!(value["asset"], "assets/tree.png");
    assert_eq!(value["x"], 10.0);
    assert_eq!(value["zIndex"], 0);
    assert_eq!(value["parentId"], serde_json::Value::Null);
}

#[test]
fn folder_serializes_without_spatial_fields() {
    let folder = SceneObject::new_folder("Props");
    let value = serde_json::to_value(&folder).unwrap();
    assert_eq!(value["type"], "folder");
    assert!(value.get("x").is_none());
    assert!(value.get("width").is_none());
}

#[test]
fn sprite_object_deserializes_from_original_shape() {
    let raw = json!({
        "id": "obj_1",
        "name": "hero",
        "type": "sprite-anim",
        "parentId": null,
        "spriteName": "knight",
        "currentAnim": "walk",
        "animSettings": { "walk": { "fps": 12, "stepX": 4, "stepY": 0 } },
        "sequence": [ { "anim": "walk", "limit": "8" }, { "anim": "idle", "limit": 0 } ],
        "x": 100, "y": 50, "width": 32, "height": 48,
        "zIndex": 3, "visible": true, "locked": false
    });
    let obj: SceneObject = serde_json::from_value(raw).unwrap();
    let ObjectKind::SpriteAnim(sprite) = &obj.kind else {
        panic!("expected sprite-anim");
    };
    assert_eq!(sprite.sprite_name, "knight");
    assert_eq!(sprite.sequence, vec![SequenceStep::new("walk", 8), SequenceStep::new("idle", 0)]);
    assert_eq!(sprite.anim_settings["walk"].resolved(10.0), ResolvedAnimSettings { fps: 12.0, step_x: 4.0, step_y: 0.0 });
    assert_eq!(sprite.opacity, 1.0);
    assert_eq!(obj.bounds(), Some(Bounds::new(100.0, 50.0, 32.0, 48.0)));
}

#[test]
fn garbage_limit_deserializes_as_loop_forever() {
    let step: SequenceStep = serde_json::from_value(json!({ "anim": "idle", "limit": "soon" })).unwrap();
    assert_eq!(step.limit, 0);
    let step: SequenceStep = serde_json::from_value(json!({ "anim": "idle", "limit": -3 })).unwrap();
    assert_eq!(step.limit, 0);
    let step: SequenceStep = serde_json::from_value(json!({ "anim": "idle" })).unwrap();
    assert_eq!(step.limit, 0);
}

#[test]
fn missing_flags_default_to_visible_unlocked() {
    let raw = json!({ "id": "f", "name": "F", "type": "folder" });
    let obj: SceneObject = serde_json::from_value(raw).unwrap();
    assert!(obj.visible);
    assert!(!obj.locked);
    assert!(obj.parent_id.is_none());
}

#[test]
fn scene_roundtrip_is_structurally_equal() {
    let mut folder = SceneObject::new_folder("Group");
    folder.locked = true;
    let mut child = make_static("rock", 1.0, 2.0);
    child.parent_id = Some(folder.id.clone());
    let mut scene = scene_with(vec![folder, child]);
    scene.meta.background_mode = BackgroundMode::Tile;
    scene.library.sprites.insert("knight".into(), FrameCatalog::from([("idle".into(), vec!["0.png".into()])]));

    let text = serde_json::to_string(&scene).unwrap();
    let back: Scene = serde_json::from_str(&text).unwrap();
    assert_eq!(back, scene);
}

#[test]
fn background_mode_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&BackgroundMode::Tile).unwrap(), "\"tile\"");
}

// =============================================================
// AnimSettings
// =============================================================

#[test]
fn resolved_settings_fall_back_on_missing_or_bad_fps() {
    let settings = AnimSettings { fps: Some(0.0), step_x: None, step_y: Some(2.0) };
    assert_eq!(settings.resolved(10.0), ResolvedAnimSettings { fps: 10.0, step_x: 0.0, step_y: 2.0 });
    assert_eq!(AnimSettings::default().resolved(7.0).fps, 7.0);
}

#[test]
fn anim_setting_parses_known_names_only() {
    assert_eq!("fps".parse::<AnimSetting>(), Ok(AnimSetting::Fps));
    assert_eq!("stepX".parse::<AnimSetting>(), Ok(AnimSetting::StepX));
    assert_eq!("stepY".parse::<AnimSetting>(), Ok(AnimSetting::StepY));
    assert!("speed".parse::<AnimSetting>().is_err());
}

#[test]
fn anim_settings_set_writes_single_field() {
    let mut settings = AnimSettings::default();
    settings.set(AnimSetting::StepX, 10.0);
    assert_eq!(settings, AnimSettings { fps: None, step_x: Some(10.0), step_y: None });
}

// =============================================================
// Object helpers
// =============================================================

#[test]
fn folder_has_no_bounds_and_cannot_take_opacity() {
    let mut folder = SceneObject::new_folder("F");
    assert!(folder.bounds().is_none());
    assert!(folder.bounds_mut().is_none());
    assert!(!folder.set_opacity(0.5));
    assert!(!folder.is_interactive());
}

#[test]
fn set_opacity_clamps() {
    let mut obj = make_static("a", 0.0, 0.0);
    assert!(obj.set_opacity(3.0));
    assert_eq!(obj.opacity(), 1.0);
    obj.set_opacity(-1.0);
    assert_eq!(obj.opacity(), 0.0);
}

#[test]
fn locked_or_hidden_objects_are_not_interactive() {
    let mut obj = make_static("a", 0.0, 0.0);
    assert!(obj.is_interactive());
    obj.locked = true;
    assert!(!obj.is_interactive());
    obj.locked = false;
    obj.visible = false;
    assert!(!obj.is_interactive());
}

#[test]
fn new_ids_are_unique_and_prefixed() {
    let a = new_object_id("obj");
    let b = new_object_id("obj");
    assert!(a.starts_with("obj_"));
    assert_ne!(a, b);
}

// =============================================================
// Scene queries
// =============================================================

#[test]
fn unique_name_suffixes_on_collision() {
    let mut scene = scene_with(vec![make_static("foo", 0.0, 0.0)]);
    assert_eq!(scene.unique_name("bar"), "bar");
    assert_eq!(scene.unique_name("foo"), "foo_1");
    scene.objects.push(make_static("foo_1", 0.0, 0.0));
    assert_eq!(scene.unique_name("foo"), "foo_2");
}

#[test]
fn children_of_keeps_array_order() {
    let folder = SceneObject::new_folder("F");
    let mut b = make_static("b", 0.0, 0.0);
    let mut a = make_static("a", 0.0, 0.0);
    b.parent_id = Some(folder.id.clone());
    a.parent_id = Some(folder.id.clone());
    let fid = folder.id.clone();
    let scene = scene_with(vec![folder, b, a]);
    let names: Vec<&str> = scene.children_of(Some(&fid)).iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["b", "a"]);
    assert_eq!(scene.children_of(None).len(), 1);
}

#[test]
fn is_descendant_walks_parent_chain() {
    let outer = SceneObject::new_folder("outer");
    let mut inner = SceneObject::new_folder("inner");
    inner.parent_id = Some(outer.id.clone());
    let mut leaf = make_static("leaf", 0.0, 0.0);
    leaf.parent_id = Some(inner.id.clone());
    let (o, i, l) = (outer.id.clone(), inner.id.clone(), leaf.id.clone());
    let scene = scene_with(vec![outer, inner, leaf]);
    assert!(scene.is_descendant(&o, &l));
    assert!(scene.is_descendant(&i, &l));
    assert!(!scene.is_descendant(&l, &o));
    assert!(!scene.is_descendant(&o, &o));
}

#[test]
fn is_descendant_terminates_on_corrupt_cycle() {
    let mut a = SceneObject::new_folder("a");
    let mut b = SceneObject::new_folder("b");
    a.parent_id = Some(b.id.clone());
    b.parent_id = Some(a.id.clone());
    let scene = scene_with(vec![a, b]);
    assert!(!scene.is_descendant("missing", &scene.objects[0].id));
}

#[test]
fn draw_order_sorts_by_z_then_array_position() {
    let mut low = make_static("low", 0.0, 0.0);
    low.z_index = 1;
    let mut first_tie = make_static("first", 0.0, 0.0);
    first_tie.z_index = 5;
    let mut second_tie = make_static("second", 0.0, 0.0);
    second_tie.z_index = 5;
    let scene = scene_with(vec![first_tie, second_tie, low]);
    let names: Vec<&str> = scene.draw_order().iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["low", "first", "second"]);
}
