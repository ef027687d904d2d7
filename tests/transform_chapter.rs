use predicates::prelude::*;
use serde_json::Value;

#[test]
fn transform_prints_chapter_json_with_sequential_ids() {
    let temp = tempfile::TempDir::new().expect("create tempdir");
    let input = temp.path().join("chapter.html");
    std::fs::write(
        &input,
        r#"<div id="c9"><h1>Untitled</h1><p><img data-src="https://cdn.x/book/img/42.png?token=abc" data-w="3" alt="fig"></p><img data-src="https://cdn.x/"></div>"#,
    )
    .expect("write chapter");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("scrollbook");
    let assert = cmd
        .args([
            "transform",
            "--input",
            input.to_str().expect("utf-8 path"),
            "--image-dir",
            "/books/demo/images",
            "--sequential-ids",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("heading has no id"));

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf-8 stdout");
    let chapter: Value = serde_json::from_str(&stdout).expect("parse chapter json");

    let heading_id = "00000000000000000000000000000001";
    let fragment = chapter["fragment"].as_str().expect("fragment");
    assert!(fragment.contains(&format!(
        r#"<h1><a href="TOC.html#{heading_id}-TOC" target="toc" id="{heading_id}">Untitled</a></h1>"#
    )));
    assert!(fragment.contains(r#"<img alt="fig" src="./images/42.png">"#), "{fragment}");

    assert_eq!(chapter["toc_entries"][0]["heading_id"], heading_id);
    assert_eq!(
        chapter["images"],
        serde_json::json!([{
            "url": "https://cdn.x/book/img/42.png",
            "dir": "/books/demo/images",
            "out": "42.png",
        }])
    );

    let kinds = chapter["anomalies"]
        .as_array()
        .expect("anomalies")
        .iter()
        .filter_map(|a| a["kind"].as_str())
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec!["image_without_filename", "missing_heading_id"]);
}

#[test]
fn transform_reports_missing_input() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("scrollbook");
    cmd.args(["transform", "--input", "/nonexistent/chapter.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("read chapter"));
}
