// Unit tests for download capture mechanics and capability building

use super::*;
use pretty_assertions::assert_eq;

fn snapshot(dir: &Path) -> HashSet<OsString> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect()
}

#[test]
fn test_settled_new_file_ignores_preexisting() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("old.glb"), b"old").unwrap();
    let before = snapshot(dir.path());

    let mut sizes = HashMap::new();
    assert_eq!(
        settled_new_file(dir.path(), &before, &mut sizes).unwrap(),
        None
    );
}

#[test]
fn test_settled_new_file_requires_stable_size() {
    let dir = tempfile::tempdir().unwrap();
    let before = snapshot(dir.path());

    let path = dir.path().join("model.stl");
    std::fs::write(&path, b"solid").unwrap();

    let mut sizes = HashMap::new();
    // First observation records the size, second confirms it
    assert_eq!(
        settled_new_file(dir.path(), &before, &mut sizes).unwrap(),
        None
    );
    assert_eq!(
        settled_new_file(dir.path(), &before, &mut sizes).unwrap(),
        Some(path.clone())
    );

}

#[test]
fn test_settled_new_file_waits_out_growing_file() {
    let dir = tempfile::tempdir().unwrap();
    let before = snapshot(dir.path());
    let growing = dir.path().join("model.obj");

    let mut sizes = HashMap::new();
    std::fs::write(&growing, b"a").unwrap();
    assert_eq!(
        settled_new_file(dir.path(), &before, &mut sizes).unwrap(),
        None
    );

    // Size moved between ticks: still pending
    std::fs::write(&growing, b"ab").unwrap();
    assert_eq!(
        settled_new_file(dir.path(), &before, &mut sizes).unwrap(),
        None
    );

    // Size held steady: settled
    assert_eq!(
        settled_new_file(dir.path(), &before, &mut sizes).unwrap(),
        Some(growing)
    );
}

#[test]
fn test_settled_new_file_skips_partial_downloads() {
    let dir = tempfile::tempdir().unwrap();
    let before = snapshot(dir.path());

    std::fs::write(dir.path().join("model.glb.part"), b"half").unwrap();
    std::fs::write(dir.path().join("model.glb.crdownload"), b"half").unwrap();

    let mut sizes = HashMap::new();
    assert_eq!(
        settled_new_file(dir.path(), &before, &mut sizes).unwrap(),
        None
    );
    assert_eq!(
        settled_new_file(dir.path(), &before, &mut sizes).unwrap(),
        None
    );
}

#[test]
fn test_persist_download_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("capture.stl");
    let dest = dir.path().join("model.stl");

    std::fs::write(&dest, b"previous run").unwrap();
    std::fs::write(&src, b"fresh artifact").unwrap();

    persist_download(&src, &dest).unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"fresh artifact");
    assert!(!src.exists());
}

#[test]
fn test_firefox_capabilities_point_downloads_at_capture_dir() {
    let dir = tempfile::tempdir().unwrap();
    let caps = build_capabilities(&BrowserType::Firefox, true, dir.path());

    let opts = caps.get("moz:firefoxOptions").unwrap();
    let prefs = opts.get("prefs").unwrap();
    assert_eq!(
        prefs.get("browser.download.dir").unwrap().as_str().unwrap(),
        dir.path().display().to_string()
    );
    assert_eq!(
        prefs.get("browser.download.folderList").unwrap().as_i64(),
        Some(2)
    );
    let args = opts.get("args").unwrap().as_array().unwrap();
    assert!(args.iter().any(|a| a.as_str() == Some("--headless")));
}

#[test]
fn test_chrome_capabilities_headful_has_no_headless_arg() {
    let dir = tempfile::tempdir().unwrap();
    let caps = build_capabilities(&BrowserType::Chrome, false, dir.path());

    let opts = caps.get("goog:chromeOptions").unwrap();
    let args = opts.get("args").unwrap().as_array().unwrap();
    assert!(!args.iter().any(|a| a.as_str().unwrap().starts_with("--headless")));

    let prefs = opts.get("prefs").unwrap();
    assert_eq!(
        prefs
            .get("download.default_directory")
            .unwrap()
            .as_str()
            .unwrap(),
        dir.path().display().to_string()
    );
}

#[test]
fn test_browser_type_parsing() {
    use std::str::FromStr;
    assert_eq!(BrowserType::from_str("firefox").unwrap(), BrowserType::Firefox);
    assert_eq!(BrowserType::from_str("Chrome").unwrap(), BrowserType::Chrome);
    assert_eq!(BrowserType::from_str("chromium").unwrap(), BrowserType::Chrome);
    assert!(BrowserType::from_str("safari").is_err());

    assert_eq!(BrowserType::Firefox.driver_command(), "geckodriver");
    assert_eq!(BrowserType::Chrome.driver_command(), "chromedriver");
}
