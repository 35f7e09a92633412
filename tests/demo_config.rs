use std::path::Path;

use assetpipe::config::load_and_validate;
use assetpipe::graph::{FlatStep, TaskGraph};
use assetpipe::paths::PathConfig;
use assetpipe::pipeline::PipelineRunner;
use assetpipe::transform::TransformRegistry;
use assetpipe::watch::build_watch_rules;

fn demo_path() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/Assetpipe.toml")
}

#[test]
fn demo_config_loads_and_assembles() {
    let cfg = load_and_validate(demo_path()).unwrap();

    let paths = PathConfig::new(Path::new("/project"), &cfg.paths);
    let graph = TaskGraph::from_config(&cfg);
    let runner =
        PipelineRunner::new(paths, cfg.project.clone(), graph, TransformRegistry::builtin())
            .unwrap();

    // Every stage resolves; the composed release covers all four.
    for stage in ["images", "styles", "scripts", "markup", "dev"] {
        runner.resolve(stage).unwrap();
    }

    let release = runner.resolve("release").unwrap();
    let stage_count = |name: &str| runner.resolve(name).unwrap().steps.len();
    assert_eq!(
        release.steps.len(),
        stage_count("images") + stage_count("styles") + stage_count("scripts")
            + stage_count("markup")
    );

    // Later stages gate on the manifests of earlier ones.
    let styles = runner.resolve("styles").unwrap();
    assert!(styles.requires.iter().any(|r| r.manifest == "images"));
    let markup = runner.resolve("markup").unwrap();
    assert!(markup.requires.iter().any(|r| r.manifest == "styles"));
    assert!(markup.requires.iter().any(|r| r.manifest == "scripts"));
}

#[test]
fn demo_release_stages_end_by_populating_dist() {
    let cfg = load_and_validate(demo_path()).unwrap();
    let graph = TaskGraph::from_config(&cfg);

    // In each of the first three stages, the only step that writes to dist
    // is the trailing hash-rename (vendored script copy excepted), so a
    // failure mid-stage can never leave dist half-updated.
    for stage in ["images", "styles"] {
        let plan = graph.resolve(stage).unwrap();
        let dist_steps: Vec<usize> = plan
            .steps
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match &s.step {
                FlatStep::Transform(t) if t.output.root == "dist" => Some(i),
                _ => None,
            })
            .collect();
        assert_eq!(dist_steps.len(), 1, "stage {stage}");
        assert_eq!(dist_steps[0], plan.steps.len() - 1, "stage {stage}");
    }
}

#[test]
fn demo_watch_rules_map_source_globs_to_dev_tasks() {
    let cfg = load_and_validate(demo_path()).unwrap();
    let rules = build_watch_rules(&cfg).unwrap();

    let rule_for = |path: &str| {
        rules
            .iter()
            .filter(|r| r.matches(path))
            .map(|r| r.task().to_string())
            .collect::<Vec<_>>()
    };

    assert_eq!(rule_for("sass/page/home.scss"), vec!["dev-styles"]);
    assert_eq!(rule_for("js/page/home.js"), vec!["dev-scripts"]);
    assert_eq!(rule_for("js/lib/jquery.js"), Vec::<String>::new());
    assert_eq!(rule_for("html/page/home.html"), vec!["dev-markup"]);
}
