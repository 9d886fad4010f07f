//! End-to-end tests for dumpsplit
//!
//! These drive the full two-phase pipeline over compressed dump fixtures
//! written into a temporary directory.

use dumpsplit::{
    config::{Config, OutputConfig},
    extract::{DumpLocation, Pipeline, PipelineError, RunProgress},
    output::outputs_from_config,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const PAGE_PROPS: &str = "-- MySQL dump 10.19\n\
    DROP TABLE IF EXISTS `page_props`;\n\
    INSERT INTO `page_props` VALUES (7,'wikibase_item','Q100',NULL),(7,'page_image_free','Paris.jpg',NULL),\
    (8,'other_prop','X',1.0),(12,'wikibase_item','Q12',NULL),(15,'wikibase_item','Q15',NULL);\n\
    INSERT INTO `page_props` VALUES (20,'displaytitle','Twenty',NULL),(21,'wikibase_item','Q21',NULL);\n";

fn page(id: u32, title: &str, text: &str) -> String {
    format!(
        "  <page>\n    <title>{title}</title>\n    <ns>0</ns>\n    <id>{id}</id>\n    <revision>\n      \
         <id>{rev}</id>\n      <contributor><username>Editor</username><id>99</id></contributor>\n      \
         <text bytes=\"{len}\" xml:space=\"preserve\">{text}</text>\n    </revision>\n  </page>\n",
        title = title,
        id = id,
        rev = id + 1000,
        len = text.len(),
        text = text
    )
}

fn pages_xml() -> String {
    let mut xml = String::from(
        "<mediawiki xmlns=\"http://www.mediawiki.org/xml/export-0.11/\" version=\"0.11\">\n\
         <siteinfo><sitename>Wikivoyage</sitename></siteinfo>\n",
    );
    xml.push_str(&page(7, "Paris", "{{pagebanner|Paris banner.jpg}}\n== See ==\n{{see|name=Louvre &amp; Tuileries}}"));
    xml.push_str(&page(8, "Nowhere", "World"));
    xml.push_str(&page(12, "Lyon", "Lyon <![CDATA[is <big>]]> nice"));
    xml.push_str(&page(15, "Nice", ""));
    xml.push_str(&page(30, "Unmapped", "ignored"));
    xml.push_str("</mediawiki>\n");
    xml
}

fn write_gzip(path: &Path, data: &str) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

fn write_bzip2(path: &Path, data: &str) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

struct Fixture {
    dir: TempDir,
    mappings: PathBuf,
    pages: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let mappings = dir.path().join("enwikivoyage-latest-page_props.sql.gz");
    let pages = dir.path().join("enwikivoyage-latest-pages-articles.xml.bz2");
    write_gzip(&mappings, PAGE_PROPS);
    write_bzip2(&pages, &pages_xml());
    Fixture { dir, mappings, pages }
}

fn config_for(fixture: &Fixture, outputs: Vec<OutputConfig>) -> Config {
    let mut config = Config::default();
    config.sources.mappings = DumpLocation::Path(fixture.mappings.clone());
    config.sources.pages = DumpLocation::Path(fixture.pages.clone());
    // Small reads exercise chunk boundaries in both phases
    config.sources.chunk_size = 64;
    config.pipeline.max_concurrent = 2;
    config.pipeline.quiet = true;
    config.outputs = outputs;
    config
}

async fn run(config: &Config) -> Result<dumpsplit::RunSummary, PipelineError> {
    let outputs = outputs_from_config(&config.outputs).await.unwrap();
    let pipeline = Pipeline::new(
        config.sources.clone(),
        config.pipeline.max_concurrent,
        Arc::new(RunProgress::hidden()),
    )?;
    pipeline.run(outputs).await
}

#[tokio::test]
async fn test_full_run_writes_mapped_articles() {
    let fixture = fixture();
    let out = fixture.dir.path().join("wikitext");
    let manifest = fixture.dir.path().join("manifest.csv");
    let config = config_for(
        &fixture,
        vec![
            OutputConfig::filesystem(&out),
            OutputConfig::Manifest {
                path: manifest.clone(),
                fail_on_error: false,
            },
        ],
    );
    config.validate().unwrap();

    let summary = run(&config).await.unwrap();

    assert_eq!(summary.mappings, 4);
    assert_eq!(summary.pages.pages, 5);
    assert_eq!(summary.pages.matched, 3);
    assert_eq!(summary.pages.unmapped, 2);
    assert_eq!(summary.progress.artifacts_dispatched, 3);
    assert_eq!(summary.skipped_writes, 0);

    let read = |name: &str| std::fs::read_to_string(out.join(name)).unwrap();
    assert_eq!(
        read("Q100.wiki.txt"),
        "{{pagebanner|Paris banner.jpg}}\n== See ==\n{{see|name=Louvre & Tuileries}}"
    );
    assert_eq!(read("Q12.wiki.txt"), "Lyon is <big> nice");
    assert_eq!(read("Q15.wiki.txt"), "");
    assert!(!out.join("Q21.wiki.txt").exists());

    let mut entries: Vec<String> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(entries, vec!["Q100.wiki.txt", "Q12.wiki.txt", "Q15.wiki.txt"]);

    let manifest = std::fs::read_to_string(manifest).unwrap();
    let mut rows: Vec<&str> = manifest.lines().skip(1).collect();
    rows.sort();
    assert_eq!(
        rows,
        vec![
            "\"Q100\",\"Paris\",\"7\"",
            "\"Q12\",\"Lyon\",\"12\"",
            "\"Q15\",\"Nice\",\"15\""
        ]
    );
}

#[tokio::test]
async fn test_rerun_produces_identical_artifacts() {
    let fixture = fixture();
    let first = fixture.dir.path().join("first");
    let second = fixture.dir.path().join("second");

    run(&config_for(&fixture, vec![OutputConfig::filesystem(&first)]))
        .await
        .unwrap();
    let mut config = config_for(&fixture, vec![OutputConfig::filesystem(&second)]);
    config.pipeline.max_concurrent = 0;
    run(&config).await.unwrap();

    for name in ["Q100.wiki.txt", "Q12.wiki.txt", "Q15.wiki.txt"] {
        assert_eq!(
            std::fs::read(first.join(name)).unwrap(),
            std::fs::read(second.join(name)).unwrap(),
            "{} differs between runs",
            name
        );
    }
}

#[tokio::test]
async fn test_corrupt_pages_dump_is_fatal() {
    let fixture = fixture();
    // bzip2 magic followed by garbage
    std::fs::write(&fixture.pages, b"BZh91AY&SY\x00\x01garbage").unwrap();
    let out = fixture.dir.path().join("out");

    let err = run(&config_for(&fixture, vec![OutputConfig::filesystem(&out)]))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Decode(_)), "unexpected {:?}", err);
    assert!(err.is_input_error());
}

#[tokio::test]
async fn test_missing_mappings_dump_is_fetch_error() {
    let fixture = fixture();
    let mut config = config_for(&fixture, vec![OutputConfig::filesystem(fixture.dir.path())]);
    config.sources.mappings = DumpLocation::Path(fixture.dir.path().join("absent.sql.gz"));

    let err = run(&config).await.unwrap_err();
    assert!(matches!(err, PipelineError::Fetch(_)), "unexpected {:?}", err);
}

#[tokio::test]
async fn test_fail_fast_output_aborts_run() {
    let fixture = fixture();
    let out = fixture.dir.path().join("out");
    let mut config = config_for(&fixture, vec![OutputConfig::filesystem(&out)]);
    config.set_fail_fast();

    let outputs = outputs_from_config(&config.outputs).await.unwrap();
    // Output directory vanishes after setup, so every write fails
    std::fs::remove_dir(&out).unwrap();

    let pipeline = Pipeline::new(config.sources.clone(), 1, Arc::new(RunProgress::hidden())).unwrap();
    let err = pipeline.run(outputs).await.unwrap_err();
    match err {
        PipelineError::WriteFailed(e) => assert!(e.artifact_name().is_some()),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_lenient_output_reports_skipped_writes() {
    let fixture = fixture();
    let out = fixture.dir.path().join("out");
    let config = config_for(&fixture, vec![OutputConfig::filesystem(&out)]);

    let outputs = outputs_from_config(&config.outputs).await.unwrap();
    std::fs::remove_dir(&out).unwrap();

    let pipeline = Pipeline::new(config.sources.clone(), 2, Arc::new(RunProgress::hidden())).unwrap();
    let summary = pipeline.run(outputs).await.unwrap();

    assert_eq!(summary.skipped_writes, 3);
    let mut failed = summary.outputs[0].failed_artifacts.clone();
    failed.sort();
    assert_eq!(failed, vec!["Q100.wiki.txt", "Q12.wiki.txt", "Q15.wiki.txt"]);
}
