//! Comparison flow tests over synthesized screenshots
//!
//! These build capture/baseline pairs as real PNG files in a temp dir and
//! drive the store the way the runner does, without a browser.

use std::path::Path;

use image::{Rgba, RgbaImage};
use tempfile::TempDir;
use test_case::test_case;

use visreg_core::baseline::{BaselineStore, StoreConfig};
use visreg_core::compare::CompareOptions;
use visreg_core::error::CheckError;
use visreg_core::scenario::Scenario;

fn store_in(tmp: &TempDir) -> BaselineStore {
    BaselineStore::new(StoreConfig {
        baseline_dir: tmp.path().join("baselines"),
        capture_dir: tmp.path().join("captures"),
        diff_dir: tmp.path().join("diffs"),
    })
    .expect("create store dirs")
}

/// A 40x30 "page" with a colored header band and a body; tweaking
/// `changed_rows` repaints that many body rows to simulate a regression.
fn render_page(changed_rows: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(40, 30, Rgba([245, 245, 245, 255]));
    for y in 0..6 {
        for x in 0..40 {
            img.put_pixel(x, y, Rgba([30, 60, 120, 255]));
        }
    }
    for y in 30 - changed_rows..30 {
        for x in 0..40 {
            img.put_pixel(x, y, Rgba([200, 40, 40, 255]));
        }
    }
    img
}

fn write_page(path: &Path, changed_rows: u32) {
    render_page(changed_rows).save(path).expect("write png");
}

#[test]
fn unchanged_page_passes_at_default_tolerance() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);

    write_page(&store.baseline_path("leptos-home"), 0);
    write_page(&store.capture_path("leptos-home"), 0);

    let verified = store
        .verify("leptos-home", 0.01, CompareOptions::default())
        .expect("identical page should pass");
    assert_eq!(verified.diff_ratio, 0.0);
}

// 1200 pixels total; each changed row is 40 pixels = 1/30 of the page
#[test_case(1, 0.05, true ; "one row within five percent")]
#[test_case(1, 0.01, false ; "one row exceeds one percent")]
#[test_case(15, 0.25, false ; "half the body exceeds a quarter")]
fn regression_respects_tolerance(changed_rows: u32, tolerance: f64, should_pass: bool) {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);

    write_page(&store.baseline_path("react-dashboard"), 0);
    write_page(&store.capture_path("react-dashboard"), changed_rows);

    let result = store.verify("react-dashboard", tolerance, CompareOptions::default());
    if should_pass {
        let verified = result.expect("within tolerance");
        assert!(verified.diff_ratio <= tolerance);
    } else {
        match result.expect_err("beyond tolerance") {
            CheckError::ThresholdExceeded { diff_ratio, diff_image, .. } => {
                assert!(diff_ratio > tolerance);
                assert!(diff_image.exists(), "diff artifact must be retained");
            }
            other => panic!("expected ThresholdExceeded, got {other}"),
        }
    }
}

#[test]
fn failing_check_retains_capture_and_diff_but_not_a_new_baseline() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);

    write_page(&store.baseline_path("react-dashboard"), 0);
    write_page(&store.capture_path("react-dashboard"), 10);

    let baseline_bytes = std::fs::read(store.baseline_path("react-dashboard")).unwrap();
    let err = store
        .verify("react-dashboard", 0.01, CompareOptions::default())
        .unwrap_err();
    assert!(matches!(err, CheckError::ThresholdExceeded { .. }));

    assert!(store.capture_path("react-dashboard").exists());
    assert!(store.diff_path("react-dashboard").exists());
    assert_eq!(
        baseline_bytes,
        std::fs::read(store.baseline_path("react-dashboard")).unwrap(),
        "comparison must not touch the baseline"
    );
}

#[test]
fn first_run_without_baseline_fails_unless_promoted() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);

    write_page(&store.capture_path("solid-home"), 0);

    let err = store
        .verify("solid-home", 0.01, CompareOptions::default())
        .unwrap_err();
    assert!(matches!(err, CheckError::MissingBaseline(_)));

    // The explicit update path is the only way a baseline appears
    store.promote("solid-home").unwrap();
    assert!(store.verify("solid-home", 0.0, CompareOptions::default()).is_ok());
}

#[test]
fn resized_viewport_is_a_dimension_mismatch_not_a_diff() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);

    write_page(&store.baseline_path("leptos-home"), 0);
    // Same content, different dimensions: no partial comparison happens
    RgbaImage::from_pixel(40, 31, Rgba([245, 245, 245, 255]))
        .save(store.capture_path("leptos-home"))
        .unwrap();

    let err = store
        .verify("leptos-home", 1.0, CompareOptions::default())
        .unwrap_err();
    match err {
        CheckError::DimensionMismatch { capture_height, baseline_height, .. } => {
            assert_eq!(capture_height, 31);
            assert_eq!(baseline_height, 30);
        }
        other => panic!("expected DimensionMismatch, got {other}"),
    }
    assert!(
        !store.diff_path("leptos-home").exists(),
        "no diff artifact for a dimension mismatch"
    );
}

#[test]
fn promote_all_covers_every_capture() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);

    write_page(&store.capture_path("leptos-home"), 0);
    write_page(&store.capture_path("react-dashboard"), 0);

    let promoted = store.promote_all().unwrap();
    assert_eq!(promoted, vec!["leptos-home", "react-dashboard"]);
    assert!(store.has_baseline("leptos-home"));
    assert!(store.has_baseline("react-dashboard"));
}

#[test]
fn scenarios_load_from_nested_directories() {
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("react");
    std::fs::create_dir_all(&nested).unwrap();

    std::fs::write(
        tmp.path().join("leptos-home.yaml"),
        "app: leptos\nname: leptos-home\nurl: /\nready_selector: main\n",
    )
    .unwrap();
    std::fs::write(
        nested.join("react-dashboard.yml"),
        "app: react\nname: react-dashboard\nurl: /dashboard\nready_selector: '[data-testid=\"dashboard-main\"]'\n",
    )
    .unwrap();
    std::fs::write(tmp.path().join("notes.txt"), "not a scenario").unwrap();

    let scenarios = Scenario::load_all(tmp.path()).unwrap();
    let names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["leptos-home", "react-dashboard"]);
}

#[test]
fn invalid_scenario_in_directory_fails_loudly() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("bad.yaml"),
        "app: react\nname: bad\nurl: /\nready_selector: main\ntolerance: 2.0\n",
    )
    .unwrap();

    let err = Scenario::load_all(tmp.path()).unwrap_err();
    assert!(matches!(err, CheckError::InvalidScenario { .. }));
}
