use std::fs;
use std::path::Path;
use std::sync::Arc;

use assetpipe::config::ConfigFile;
use assetpipe::errors::PipelineError;
use assetpipe::graph::TaskGraph;
use assetpipe::paths::PathConfig;
use assetpipe::pipeline::PipelineRunner;
use assetpipe::transform::TransformRegistry;
use tempfile::TempDir;

const CONFIG: &str = r#"
    [project]
    name = "site"
    version = "1.0.0"

    [paths]
    src = "src"
    dev = "dev"
    tmp = ".tmp"
    dist = "dist"

    [task.images]
    steps = [
        { clean = "dist" },
        { clean = "tmp" },
        { transform = "copy", input = { root = "src", dir = "images", glob = ["**/*.png"] }, output = { root = "tmp", dir = "images" } },
        { transform = "hash-rename", input = { root = "tmp", dir = "images", glob = ["**/*.png"] }, output = { root = "dist", dir = "images" }, options = { manifest = "images" } },
    ]

    [task.styles]
    requires_manifest = ["images"]
    steps = [
        { transform = "copy", input = { root = "src", dir = "css", glob = ["**/*.css"] }, output = { root = "tmp", dir = "css" } },
        { transform = "rewrite-refs", input = { root = "tmp", dir = "css", glob = ["**/*.css"] }, output = { root = "tmp", dir = "css" }, options = { manifest = "images" } },
        { transform = "hash-rename", input = { root = "tmp", dir = "css", glob = ["**/*.css"] }, output = { root = "dist", dir = "css" }, options = { manifest = "styles" } },
    ]

    [task.release]
    steps = [
        { task = "images" },
        { task = "styles" },
    ]
"#;

struct Project {
    _dir: TempDir,
    root: std::path::PathBuf,
    runner: Arc<PipelineRunner>,
}

fn project(logo_bytes: &[u8]) -> Project {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();

    fs::create_dir_all(root.join("src/images")).unwrap();
    fs::create_dir_all(root.join("src/css")).unwrap();
    fs::write(root.join("src/images/logo.png"), logo_bytes).unwrap();
    fs::write(
        root.join("src/css/app.css"),
        "body { background: url(images/logo.png); }\n",
    )
    .unwrap();

    let cfg: ConfigFile = toml::from_str(CONFIG).unwrap();
    assetpipe::config::validate_config(&cfg).unwrap();

    let paths = PathConfig::new(&root, &cfg.paths);
    let graph = TaskGraph::from_config(&cfg);
    let runner =
        PipelineRunner::new(paths, cfg.project.clone(), graph, TransformRegistry::builtin())
            .unwrap();

    Project {
        _dir: dir,
        root,
        runner: Arc::new(runner),
    }
}

/// Relative paths of all files under `dir`, sorted.
fn files_under(dir: &Path) -> Vec<String> {
    let mut found = Vec::new();
    if !dir.is_dir() {
        return found;
    }
    for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            let rel = entry
                .path()
                .strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            found.push(rel);
        }
    }
    found.sort();
    found
}

#[test]
fn images_stage_hashes_assets_and_persists_a_manifest() {
    let project = project(b"png-bytes-v1");
    project.runner.run("images").unwrap();

    let dist = files_under(&project.root.join("dist"));
    assert_eq!(dist.len(), 1);
    assert!(dist[0].starts_with("images/logo."));
    assert!(dist[0].ends_with(".png"));
    assert_ne!(dist[0], "images/logo.png");

    assert!(project.root.join(".tmp/.manifests/images.toml").is_file());
}

#[test]
fn hash_rename_is_deterministic_across_identical_trees() {
    let first = project(b"png-bytes-v1");
    let second = project(b"png-bytes-v1");
    first.runner.run("images").unwrap();
    second.runner.run("images").unwrap();

    assert_eq!(
        files_under(&first.root.join("dist")),
        files_under(&second.root.join("dist"))
    );
    assert_eq!(
        fs::read_to_string(first.root.join(".tmp/.manifests/images.toml")).unwrap(),
        fs::read_to_string(second.root.join(".tmp/.manifests/images.toml")).unwrap()
    );
}

#[test]
fn styles_stage_burns_hashed_references_before_hashing_itself() {
    let project = project(b"png-bytes-v1");
    project.runner.run("images").unwrap();
    project.runner.run("styles").unwrap();

    let dist = files_under(&project.root.join("dist"));
    let logo = dist.iter().find(|f| f.starts_with("images/")).unwrap();
    let css = dist.iter().find(|f| f.starts_with("css/")).unwrap();

    let css_text = fs::read_to_string(project.root.join("dist").join(css)).unwrap();
    let logo_name = logo.strip_prefix("images/").unwrap();
    assert!(
        css_text.contains(&format!("url(images/{logo_name})")),
        "stylesheet should reference the hashed image, got: {css_text}"
    );
}

#[test]
fn changing_an_image_changes_the_stylesheet_hash_too() {
    let first = project(b"png-bytes-v1");
    let second = project(b"png-bytes-v2");
    first.runner.run("release").unwrap();
    second.runner.run("release").unwrap();

    let css_of = |p: &Project| {
        files_under(&p.root.join("dist"))
            .into_iter()
            .find(|f| f.starts_with("css/"))
            .unwrap()
    };

    // Same stylesheet source, but the reference it carries differs, so the
    // content hash must differ.
    assert_ne!(css_of(&first), css_of(&second));
}

#[test]
fn running_styles_before_images_is_refused() {
    let project = project(b"png-bytes-v1");

    match project.runner.run("styles") {
        Err(PipelineError::OutOfOrderStage { task, manifest }) => {
            assert_eq!(task, "styles");
            assert_eq!(manifest, "images");
        }
        other => panic!("expected OutOfOrderStage, got {other:?}"),
    }
}

#[test]
fn composed_release_satisfies_manifest_gates_in_plan_order() {
    let project = project(b"png-bytes-v1");
    let report = project.runner.run("release").unwrap();
    assert_eq!(report.task, "release");

    let dist = files_under(&project.root.join("dist"));
    assert!(dist.iter().any(|f| f.starts_with("images/")));
    assert!(dist.iter().any(|f| f.starts_with("css/")));
}

#[test]
fn step_failure_names_the_input_and_leaves_dist_untouched() {
    let project = project(b"png-bytes-v1");
    project.runner.run("images").unwrap();

    // Not valid UTF-8: the reference-rewrite step fails on this file.
    fs::write(project.root.join("src/css/broken.css"), [0xff, 0xfe, 0x00, 0xda]).unwrap();

    let dist_before: Vec<String> = files_under(&project.root.join("dist"));

    match project.runner.run("styles") {
        Err(PipelineError::StepFailure {
            transform, input, ..
        }) => {
            assert_eq!(transform, "rewrite-refs");
            let input = input.expect("failing input should be named");
            assert!(input.to_string_lossy().ends_with("broken.css"));
        }
        other => panic!("expected StepFailure, got {other:?}"),
    }

    // The aborted run never reached the hash step, so dist still holds
    // exactly what the images stage produced.
    assert_eq!(files_under(&project.root.join("dist")), dist_before);
    assert!(!dist_before.iter().any(|f| f.ends_with(".css")));
}

#[test]
fn unknown_task_and_unknown_transform_are_typed_errors() {
    let project = project(b"png-bytes-v1");
    assert!(matches!(
        project.runner.run("deploy"),
        Err(PipelineError::UnknownTask(_))
    ));

    let cfg: ConfigFile = toml::from_str(
        r#"
        [paths]
        src = "src"
        dev = "dev"
        tmp = ".tmp"
        dist = "dist"

        [task.broken]
        steps = [
            { transform = "minify-style", input = { root = "src", glob = ["**/*.css"] }, output = { root = "tmp" } },
        ]
    "#,
    )
    .unwrap();
    let paths = PathConfig::new(Path::new("/nowhere"), &cfg.paths);
    let graph = TaskGraph::from_config(&cfg);
    match PipelineRunner::new(paths, cfg.project.clone(), graph, TransformRegistry::builtin()) {
        Err(PipelineError::UnknownTransform(name)) => assert_eq!(name, "minify-style"),
        other => panic!("expected UnknownTransform, got {other:?}"),
    }
}
