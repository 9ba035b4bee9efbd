use std::fs;
use std::path::{Path, PathBuf};

use annotate_graph::{
    ConnectPick, ConnectionKind, Document, Error, Rect, Rgb, Selection,
};
use image::{Rgb as Pixel, RgbImage};
use serde_json::Value;

fn write_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(64, 48, Pixel([200, 200, 200]))
        .save(&path)
        .expect("write test image");
    path
}

fn annotated_document(dir: &Path) -> Document {
    let image = write_image(dir, "board.png");
    let mut doc = Document::default();
    doc.open_image(&image).expect("open image");

    let scene = &mut doc.scene;
    scene.add_node(Rect::new(0.0, 0.0, 60.0, 40.0), "panel").unwrap();
    scene.add_node(Rect::new(5.0, 5.0, 20.0, 20.0), "switch").unwrap();
    scene.add_node(Rect::new(30.0, 5.0, 50.0, 20.0), "lamp").unwrap();

    scene.pick_for_connection(1).unwrap();
    let ConnectPick::Pair { from, to } = scene.pick_for_connection(2).unwrap() else {
        panic!("expected a pair");
    };
    scene.style.kind = ConnectionKind::Dashed;
    scene.style.color = Rgb::new(0, 128, 0);
    scene.create_connection(from, to, Some("powers".into())).unwrap();
    doc
}

#[test]
fn save_writes_sidecar_next_to_image() {
    let dir = tempfile::tempdir().unwrap();
    let doc = annotated_document(dir.path());

    let path = doc.save_json().unwrap();
    assert_eq!(path, dir.path().join("board.json"));

    let v: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(v["file_name"], "board.png");
    assert_eq!(v["node_count"], 3);
    assert_eq!(v["connection_count"], 1);
    let roots = v["components"].as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["text"], "panel");
    assert_eq!(roots[0]["node"].as_array().unwrap().len(), 2);
    let conn = &v["connections"][0];
    assert_eq!(conn["type"], "dashed");
    assert_eq!(conn["color"], "#008000");
    assert_eq!(conn["direction"], true);
    assert_eq!(conn["text"], "powers");
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let doc = annotated_document(dir.path());
    let json_path = doc.save_json().unwrap();

    let mut reloaded = Document::default();
    let report = reloaded.load_json(&json_path).unwrap();
    assert_eq!(report.image, Some(dir.path().join("board.png")));
    assert_eq!(report.nodes, 3);
    assert_eq!(report.connections, 1);
    assert!(reloaded.image.is_some());

    assert_eq!(reloaded.scene.nodes, doc.scene.nodes);
    assert_eq!(reloaded.scene.connections, doc.scene.connections);
}

#[test]
fn existing_summary_survives_save() {
    let dir = tempfile::tempdir().unwrap();
    let doc = annotated_document(dir.path());
    let json_path = dir.path().join("board.json");
    fs::write(
        &json_path,
        r#"{ "summary": { "board": "rev B" }, "node_count": 0, "components": [] }"#,
    )
    .unwrap();

    doc.save_json().unwrap();
    let text = fs::read_to_string(&json_path).unwrap();
    let v: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(v["summary"]["board"], "rev B");
    assert_eq!(v["node_count"], 3);
    assert!(text.find("\"summary\"").unwrap() < text.find("\"file_name\"").unwrap());
}

#[test]
fn load_without_image_is_still_editable() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("orphan.json");
    fs::write(
        &json_path,
        r#"{
            "node": [
                { "id": "a01", "coords": [0, 0, 100, 100], "text": "outer", "node": [
                    { "id": "a02", "coords": [10, 10, 20, 20], "text": "inner", "node": [] }
                ] },
                { "id": "a03", "text": "floating", "node": [] }
            ],
            "connections": [
                { "from": "a01", "to": "a03", "text": null, "type": "line" }
            ]
        }"#,
    )
    .unwrap();

    let mut doc = Document::default();
    let report = doc.load_json(&json_path).unwrap();
    assert_eq!(report.image, None);
    assert!(doc.image.is_none());
    assert_eq!(doc.scene.nodes.len(), 3);
    assert_eq!(doc.scene.nodes[1].parent_id.as_deref(), Some("a01"));

    let conn = &doc.scene.connections[0];
    assert!(conn.direction);
    assert_eq!(conn.color, Rgb::BLACK);
    assert!(!conn.id.is_empty());

    // Placed node does not overlap the others.
    let placed = doc.scene.nodes[2].coords;
    assert!(placed.width() > 0.0);
    assert!(!placed.overlaps(&doc.scene.nodes[0].coords));

    doc.scene.select(Some(Selection::Node(0)));
    doc.scene.delete_selected().unwrap();
    assert!(doc.scene.connections.is_empty());

    assert!(matches!(doc.save_json(), Err(Error::NoImage)));
}

#[test]
fn geometry_overrides_json_nesting_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("nested.json");
    // "child" is nested under "far" but lies inside "near".
    fs::write(
        &json_path,
        r#"{ "components": [
            { "id": "far", "coords": [500, 500, 600, 600], "text": "far", "node": [
                { "id": "kid", "coords": [10, 10, 20, 20], "text": "child", "node": [] }
            ] },
            { "id": "near", "coords": [0, 0, 50, 50], "text": "near", "node": [] }
        ] }"#,
    )
    .unwrap();

    let mut doc = Document::default();
    doc.load_json(&json_path).unwrap();
    let kid = doc.scene.node_by_id("kid").unwrap();
    assert_eq!(kid.parent_id.as_deref(), Some("near"));
}

#[test]
fn opening_an_image_clears_the_scene() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = annotated_document(dir.path());
    let other = write_image(dir.path(), "other.bmp");

    doc.open_image(&other).unwrap();
    assert!(doc.scene.nodes.is_empty());
    assert!(doc.scene.connections.is_empty());
    assert_eq!(doc.image_path.as_deref(), Some(other.as_path()));
    assert_eq!(doc.json_path(), Some(dir.path().join("other.json")));
}

#[test]
fn open_missing_image_fails_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = annotated_document(dir.path());
    let err = doc.open_image(&dir.path().join("nope.png")).unwrap_err();
    assert!(matches!(err, Error::Image { .. }));
    assert_eq!(doc.scene.nodes.len(), 3);
}

#[test]
fn export_writes_annotated_png() {
    let dir = tempfile::tempdir().unwrap();
    let doc = annotated_document(dir.path());
    let out = doc.export_annotated().unwrap();
    assert_eq!(out, dir.path().join("board_annotated.png"));

    let img = image::open(&out).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (64, 48));
    // Top edge of the "panel" node.
    assert_eq!(img.get_pixel(30, 0).0, [255, 0, 0, 255]);
}
