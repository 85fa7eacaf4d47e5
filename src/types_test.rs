// Unit tests for types module

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_normalize_formats_dedupes_preserving_order() {
    let input = vec![
        "GLB".to_string(),
        "".to_string(),
        "glb".to_string(),
        "obj".to_string(),
    ];
    assert_eq!(normalize_formats(&input), vec!["glb", "obj"]);
}

#[test]
fn test_normalize_formats_trims_and_drops_blanks() {
    let input = vec![
        "  stl ".to_string(),
        "   ".to_string(),
        "\t".to_string(),
        "STL".to_string(),
        "obj".to_string(),
    ];
    assert_eq!(normalize_formats(&input), vec!["stl", "obj"]);
}

#[test]
fn test_parse_format_list() {
    let formats = parse_format_list("glb, OBJ,,stl");
    assert_eq!(normalize_formats(&formats), vec!["glb", "obj", "stl"]);
}

#[test]
fn test_request_rejects_missing_image() {
    let formats = vec!["glb".to_string()];
    let result = PipelineRequest::new("/no/such/image.png", "output", &formats, 20, true);
    assert!(result.is_err());
}

#[test]
fn test_request_rejects_zero_wait() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("imagen.png");
    std::fs::write(&image, b"png").unwrap();

    let formats = vec!["glb".to_string()];
    let result = PipelineRequest::new(&image, dir.path().join("out"), &formats, 0, true);
    assert!(result.is_err());
}

#[test]
fn test_request_defaults_formats_when_all_blank() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("imagen.png");
    std::fs::write(&image, b"png").unwrap();

    let request =
        PipelineRequest::new(&image, dir.path().join("out"), &[" ".to_string()], 20, true).unwrap();
    assert_eq!(request.formats, vec!["glb", "obj", "stl"]);
}

#[test]
fn test_request_normalizes_formats() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("imagen.png");
    std::fs::write(&image, b"png").unwrap();

    let formats = parse_format_list("STL,stl,ply");
    let request = PipelineRequest::new(&image, dir.path().join("out"), &formats, 5, false).unwrap();
    assert_eq!(request.formats, vec!["stl", "ply"]);
    assert!(!request.headless);
    assert_eq!(request.target_url.as_str(), DEFAULT_TARGET_URL);
}

#[test]
fn test_candidate_link_suffix_matching() {
    let link = CandidateLink {
        href: "https://cdn.example.com/assets/model.GLB".to_string(),
        text: "Download GLB".to_string(),
    };
    assert!(link.matches_format("glb"));
    assert!(link.matches_format("GLB"));
    assert!(!link.matches_format("obj"));

    let formats = vec!["obj".to_string(), "glb".to_string()];
    assert!(link.matches_any(&formats));
    assert!(!link.matches_any(&["stl".to_string()]));
}

#[test]
fn test_candidate_link_does_not_match_substring() {
    // "model.glbx" must not satisfy a "glb" preference
    let link = CandidateLink {
        href: "https://cdn.example.com/model.glbx".to_string(),
        text: String::new(),
    };
    assert!(!link.matches_format("glb"));
}

#[test]
fn test_outcome_from_downloads_keeps_attempt_order() {
    let results = vec![
        DownloadResult::ok("glb", Path::new("output/model.glb")),
        DownloadResult::failed("obj", Path::new("output/model.obj"), "click failed"),
        DownloadResult::ok("stl", Path::new("output/model.stl")),
    ];
    let outcome = PipelineOutcome::from_downloads(&results);
    assert!(!outcome.timed_out);
    assert_eq!(
        outcome.downloaded_paths,
        vec![
            PathBuf::from("output/model.glb"),
            PathBuf::from("output/model.stl")
        ]
    );
}

#[test]
fn test_deadline_elapsed_outcome() {
    let outcome = PipelineOutcome::deadline_elapsed();
    assert!(outcome.timed_out);
    assert!(outcome.downloaded_paths.is_empty());
}
