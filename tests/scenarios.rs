//! End-to-end editing scenarios driven through the public `EngineCore` API,
//! the same calls the browser surface makes.
#![allow(clippy::float_cmp)]

use std::collections::BTreeMap;

use scene_editor::camera::Point;
use scene_editor::config::EditorConfig;
use scene_editor::doc::{AnimSettings, Bounds, FrameCatalog, ObjectKind, Scene, SceneObject, SequenceStep};
use scene_editor::engine::{Action, EngineCore};
use scene_editor::error::{EditorError, TreeError};
use scene_editor::images::RasterImage;
use scene_editor::input::Modifiers;
use scene_editor::properties::{Commit, ObjectField};
use scene_editor::tree::DropZone;

fn editor() -> EngineCore {
    let mut core = EngineCore::new(EditorConfig::default());
    core.new_scene();
    core
}

fn open(scene: Scene) -> EngineCore {
    let mut core = EngineCore::new(EditorConfig::default());
    let ticket = core.begin_load("scenes/level.json");
    core.finish_load(&ticket, Ok(scene));
    core
}

fn drag(core: &mut EngineCore, from: Point, to: Point) {
    let mods = Modifiers::default();
    core.pointer_down(from, mods).unwrap();
    core.pointer_move(to).unwrap();
    core.pointer_up(to, mods);
}

fn selected(core: &EngineCore) -> String {
    core.selection.single().cloned().unwrap()
}

fn bounds(core: &EngineCore, id: &str) -> Bounds {
    core.object(id).and_then(SceneObject::bounds).unwrap()
}

// =============================================================
// History
// =============================================================

#[test]
fn undoing_every_edit_restores_the_original_scene() {
    let mut core = editor();
    let before = core.scene.clone();

    core.add_static_at("assets/rock.png", Bounds::new(100.0, 100.0, 64.0, 64.0)).unwrap();
    let rock = selected(&core);
    drag(&mut core, Point::new(120.0, 120.0), Point::new(220.0, 150.0));
    core.set_object_field(&ObjectField::Name("boulder".into()), Commit::Discrete).unwrap();
    core.duplicate_selected().unwrap();
    core.delete_selected().unwrap();
    assert_eq!(core.scene.objects.len(), 1);
    assert_eq!(core.object(&rock).map(|o| o.name.as_str()), Some("boulder"));

    for _ in 0..5 {
        core.undo().unwrap();
    }
    assert_eq!(core.scene, before);
    assert!(!core.history.can_undo());

    for _ in 0..5 {
        core.redo().unwrap();
    }
    assert_eq!(core.scene.objects.len(), 1);
    assert_eq!(core.object(&rock).map(|o| o.name.as_str()), Some("boulder"));
}

// =============================================================
// Naming
// =============================================================

#[test]
fn same_asset_twice_gets_distinct_names() {
    let mut core = editor();
    core.add_static_at("assets/props/foo.png", Bounds::new(0.0, 0.0, 10.0, 10.0)).unwrap();
    core.add_static_at("assets/props/foo.png", Bounds::new(20.0, 0.0, 10.0, 10.0)).unwrap();
    let names: Vec<_> = core.scene.objects.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["foo", "foo_1"]);
}

// =============================================================
// Pointer gestures
// =============================================================

#[test]
fn drag_on_snapping_grid_lands_on_next_multiple() {
    let mut core = editor();
    assert_eq!((core.scene.meta.width, core.scene.meta.height), (800.0, 600.0));
    assert_eq!(core.scene.meta.grid.size, 32.0);
    assert!(core.scene.meta.grid.snap);

    core.add_static_at("assets/box.png", Bounds::new(384.0, 268.0, 64.0, 64.0)).unwrap();
    let id = selected(&core);
    drag(&mut core, Point::new(400.0, 300.0), Point::new(432.0, 300.0));

    let b = bounds(&core, &id);
    assert_eq!(b.x, 416.0);
    assert_eq!(b.y, 268.0);
}

#[test]
fn resize_below_floor_keeps_last_valid_size() {
    let mut core = editor();
    core.scene.meta.grid.snap = false;
    core.add_static_at("assets/box.png", Bounds::new(100.0, 100.0, 100.0, 100.0)).unwrap();
    let id = selected(&core);
    let mods = Modifiers::default();

    core.pointer_down(Point::new(200.0, 200.0), mods).unwrap();
    core.pointer_move(Point::new(150.0, 160.0)).unwrap();
    assert_eq!(bounds(&core, &id), Bounds::new(100.0, 100.0, 50.0, 60.0));

    core.pointer_move(Point::new(102.0, 160.0)).unwrap();
    core.pointer_up(Point::new(102.0, 160.0), mods);
    assert_eq!(bounds(&core, &id), Bounds::new(100.0, 100.0, 50.0, 60.0));
}

#[test]
fn click_through_transparent_top_image_selects_bottom() {
    let mut core = editor();
    core.add_static_at("assets/ground.png", Bounds::new(0.0, 0.0, 100.0, 100.0)).unwrap();
    let ground = selected(&core);
    core.add_static_at("assets/glass.png", Bounds::new(0.0, 0.0, 100.0, 100.0)).unwrap();
    core.image_loaded("assets/ground.png", RasterImage::filled(100, 100, 255));
    core.image_loaded("assets/glass.png", RasterImage::filled(100, 100, 0));

    let at = Point::new(50.0, 50.0);
    core.pointer_down(at, Modifiers::default()).unwrap();
    core.pointer_up(at, Modifiers::default());
    assert_eq!(core.selection.single(), Some(&ground));
}

// =============================================================
// Hierarchy
// =============================================================

#[test]
fn folder_cannot_move_under_its_descendant() {
    let mut core = editor();
    core.add_folder("A").unwrap();
    let a = selected(&core);
    core.add_folder("B").unwrap();
    let b = selected(&core);
    assert_eq!(core.object(&b).and_then(|o| o.parent_id.clone()), Some(a.clone()));

    let before = core.scene.clone();
    let undo_depth = core.history.undo_len();
    let err = core.tree_drop(&a, &b, DropZone::Inside).unwrap_err();

    assert!(matches!(err, EditorError::Tree(TreeError::Cycle { .. })));
    assert_eq!(core.scene, before);
    assert_eq!(core.history.undo_len(), undo_depth);
}

// =============================================================
// Animation
// =============================================================

fn knight_scene() -> (Scene, String) {
    let mut hero = SceneObject::new_sprite("hero", "knight", Bounds::new(100.0, 50.0, 32.0, 32.0));
    if let ObjectKind::SpriteAnim(sprite) = &mut hero.kind {
        sprite.current_anim = "walk".into();
        sprite.sequence = vec![SequenceStep::new("walk", 4), SequenceStep::new("idle", 0)];
        sprite.anim_settings = BTreeMap::from([
            ("walk".to_owned(), AnimSettings { fps: Some(10.0), step_x: Some(10.0), step_y: Some(0.0) }),
            ("idle".to_owned(), AnimSettings { fps: Some(5.0), ..AnimSettings::default() }),
        ]);
    }
    let id = hero.id.clone();
    let mut scene = Scene { objects: vec![hero], ..Scene::default() };
    scene.library.sprites.insert(
        "knight".to_owned(),
        FrameCatalog::from([
            ("walk".to_owned(), vec!["w0.png".to_owned(), "w1.png".to_owned()]),
            ("idle".to_owned(), vec!["i0.png".to_owned()]),
        ]),
    );
    (scene, id)
}

#[test]
fn sequence_walks_then_idles_forever() {
    let (scene, id) = knight_scene();
    let mut core = open(scene);
    core.play();

    for _ in 0..4 {
        core.tick(0.1);
    }
    let hero = core.object(&id).cloned().unwrap();
    let pick = core.animator.frame_for(&hero, &core.sprites, &core.config.sprite_root, core.config.default_fps);
    assert_eq!(pick.map(|p| p.x), Some(140.0));
    assert_eq!(core.animator.current_step(&hero).map(|s| s.anim.as_str()), Some("idle"));

    for _ in 0..100 {
        core.tick(0.5);
    }
    assert_eq!(core.animator.current_step(&hero).map(|s| s.anim.as_str()), Some("idle"));
}

#[test]
fn paused_editor_does_not_advance() {
    let (scene, id) = knight_scene();
    let mut core = open(scene);
    for _ in 0..10 {
        core.tick(0.1);
    }
    let hero = core.object(&id).cloned().unwrap();
    assert_eq!(core.animator.current_step(&hero).map(|s| s.anim.as_str()), Some("walk"));
}

// =============================================================
// Persistence
// =============================================================

#[test]
fn saved_json_reopens_to_the_same_scene() {
    let (scene, _) = knight_scene();
    let mut core = open(scene);
    core.add_static_at("assets/tree.png", Bounds::new(10.0, 20.0, 30.0, 40.0)).unwrap();

    let json = core.prepare_save("scenes/forest.json").unwrap();
    let actions = core.finish_save("scenes/forest.json", Ok("Scene saved.".into()), false);
    assert!(actions.contains(&Action::TitleChanged { dirty: false }));
    assert_eq!(core.current_path(), Some("scenes/forest.json"));

    let parsed: Scene = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.meta.scene_name, "forest");
    let reopened = open(parsed);
    assert_eq!(reopened.scene, core.scene);
}
