//! Integration tests for fob-plugin-obfuscator
//!
//! These tests drive the plugin against in-memory bundles with a fake engine,
//! and once with the bundled OXC engine.

use fob_plugin_obfuscator::{
    BuildMode, BundleHost, ExcludeBehavior, FobObfuscatorPlugin, MatcherValue, ObfuscationResult,
    ObfuscatorOptions, ObfuscatorPluginOptions, OutputBundle, OutputEntry, SourceMapMode,
};
use regex::Regex;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Engine that reverses the code and reports a fixed source map when asked
fn reverse(_: &str, code: &str, options: &ObfuscatorOptions) -> anyhow::Result<ObfuscationResult> {
    let result = ObfuscationResult::new(code.chars().rev().collect::<String>());
    Ok(if options.source_map {
        result.with_source_map(r#"{"version":3,"mappings":""}"#)
    } else {
        result
    })
}

fn plugin(options: ObfuscatorPluginOptions) -> FobObfuscatorPlugin {
    FobObfuscatorPlugin::with_options_in(options, Path::new("/project"))
        .unwrap()
        .with_engine(reverse)
}

fn asset_source<'a>(bundle: &'a OutputBundle, name: &str) -> Option<&'a str> {
    match bundle.get(name)? {
        OutputEntry::Asset { source, .. } => Some(source),
        OutputEntry::Chunk { .. } => None,
    }
}

#[test]
fn test_included_chunk_is_replaced_by_asset() {
    let mut bundle = OutputBundle::new().with_chunk("src/app.js", "console.log(1)");

    let report = plugin(ObfuscatorPluginOptions::new())
        .process_bundle(&mut bundle, true)
        .unwrap()
        .expect("hook ran");

    assert_eq!(report.transformed, vec!["src/app.js"]);
    let source = asset_source(&bundle, "src/app.js").expect("emitted as asset");
    assert_ne!(source, "console.log(1)");
    assert_eq!(source, ")1(gol.elosnoc");
}

#[test]
fn test_excluded_file_stops_the_whole_pass() {
    let mut bundle = OutputBundle::new()
        .with_chunk("assets/first.js", "first")
        .with_chunk("node_modules/lib/index.js", "dep")
        .with_chunk("assets/later.js", "later")
        .with_chunk("assets/last.mjs", "last");

    let report = plugin(ObfuscatorPluginOptions::new())
        .process_bundle(&mut bundle, true)
        .unwrap()
        .unwrap();

    assert_eq!(report.transformed, vec!["assets/first.js"]);
    assert_eq!(report.aborted_at.as_deref(), Some("node_modules/lib/index.js"));
    assert!(report.unmatched.is_empty());

    assert_eq!(asset_source(&bundle, "assets/first.js"), Some("tsrif"));
    for (name, code) in [
        ("node_modules/lib/index.js", "dep"),
        ("assets/later.js", "later"),
        ("assets/last.mjs", "last"),
    ] {
        assert_eq!(
            bundle.get(name),
            Some(&OutputEntry::Chunk {
                code: code.to_string()
            }),
            "{name} must be untouched"
        );
    }
}

#[test]
fn test_skip_entry_keeps_processing() {
    let mut bundle = OutputBundle::new()
        .with_chunk("node_modules/lib/index.js", "dep")
        .with_chunk("assets/later.js", "later");

    let options = ObfuscatorPluginOptions::new().with_exclude_behavior(ExcludeBehavior::SkipEntry);
    let report = plugin(options)
        .process_bundle(&mut bundle, true)
        .unwrap()
        .unwrap();

    assert_eq!(report.excluded, vec!["node_modules/lib/index.js"]);
    assert_eq!(report.aborted_at, None);
    assert_eq!(report.transformed, vec!["assets/later.js"]);
    assert!(matches!(
        bundle.get("node_modules/lib/index.js"),
        Some(OutputEntry::Chunk { .. })
    ));
}

/// Log sink shared with a `tracing` fmt subscriber
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run one pass with `debugger` set and return everything logged at `info`
fn decision_logs(debugger: bool) -> String {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .finish();

    let mut bundle = OutputBundle::new()
        .with_chunk("src/app.js", "app")
        .with_asset("site.css", "body{}")
        .with_chunk("node_modules/lib/index.js", "dep");
    let plugin = plugin(ObfuscatorPluginOptions::new().with_debugger(debugger));

    tracing::subscriber::with_default(subscriber, || {
        plugin.process_bundle(&mut bundle, true).unwrap();
    });
    logs.contents()
}

#[test]
fn test_debugger_logs_each_decision() {
    let logs = decision_logs(true);
    assert!(logs.contains("[fob-obfuscator]::include matched src/app.js"), "{logs}");
    assert!(logs.contains("[fob-obfuscator]::not matched site.css"), "{logs}");
    assert!(logs.contains("[fob-obfuscator]::exclude node_modules/lib/index.js"), "{logs}");
}

#[test]
fn test_decisions_silent_without_debugger() {
    let logs = decision_logs(false);
    assert!(!logs.contains("[fob-obfuscator]::"), "{logs}");
}

#[test]
fn test_assets_and_unmatched_chunks_untouched() {
    let mut bundle = OutputBundle::new()
        .with_asset("assets/logo.js", "not really code")
        .with_asset("assets/site.css", "body{}")
        .with_chunk("assets/data.json", "{}");
    let before = bundle.clone();

    let report = plugin(ObfuscatorPluginOptions::new())
        .process_bundle(&mut bundle, true)
        .unwrap()
        .unwrap();

    assert_eq!(bundle, before);
    assert!(report.transformed.is_empty());
    assert_eq!(report.unmatched.len(), 3);
}

#[test]
fn test_default_matchers() {
    let plugin = FobObfuscatorPlugin::new();
    let t = plugin.transformer();

    assert!(t.include().matches("src/app.js"));
    assert!(!t.exclude().matches("src/app.js"));

    assert!(t.include().matches("node_modules/lib/index.js"));
    assert!(t.exclude().matches("node_modules/lib/index.js"));
}

#[test]
fn test_custom_matchers() {
    let options = ObfuscatorPluginOptions::new()
        .with_include(vec![
            MatcherValue::from("dist/**/*.js"),
            MatcherValue::Regex(Regex::new(r"^entry-").unwrap()),
        ])
        .with_exclude(MatcherValue::predicate(|name| name.contains("vendor")));

    let mut bundle = OutputBundle::new()
        .with_chunk("/project/dist/app/main.js", "main")
        .with_chunk("entry-home.js", "home")
        .with_chunk("/project/dist/vendor.js", "vendor")
        .with_chunk("/project/dist/after.js", "after");

    let report = plugin(options)
        .process_bundle(&mut bundle, true)
        .unwrap()
        .unwrap();

    assert_eq!(
        report.transformed,
        vec!["/project/dist/app/main.js", "entry-home.js"]
    );
    assert_eq!(report.aborted_at.as_deref(), Some("/project/dist/vendor.js"));
    assert!(matches!(
        bundle.get("/project/dist/after.js"),
        Some(OutputEntry::Chunk { .. })
    ));
}

#[test]
fn test_source_map_extraction_rules() {
    let run = |options: ObfuscatorOptions| {
        let mut bundle = OutputBundle::new().with_chunk("index.js", "abc");
        plugin(ObfuscatorPluginOptions::new().with_options(options))
            .process_bundle(&mut bundle, true)
            .unwrap();
        match bundle.get("index.js") {
            Some(OutputEntry::Asset { source_map, .. }) => source_map.clone(),
            other => panic!("expected asset, got {other:?}"),
        }
    };

    assert!(run(ObfuscatorOptions::new().with_source_map(true)).is_some());
    assert!(run(ObfuscatorOptions::new()
        .with_source_map(true)
        .with_source_map_mode(SourceMapMode::Inline))
    .is_none());
    assert!(run(ObfuscatorOptions::new()).is_none());
}

#[test]
fn test_apply_serve_skips_production_build() {
    let mut bundle = OutputBundle::new().with_chunk("src/app.js", "abc");
    let before = bundle.clone();

    let plugin = plugin(ObfuscatorPluginOptions::new().with_apply(BuildMode::Serve));
    assert!(plugin.process_bundle(&mut bundle, true).unwrap().is_none());
    assert_eq!(bundle, before);

    let pinned = plugin.with_mode(BuildMode::Serve);
    assert!(pinned.process_bundle(&mut bundle, true).unwrap().is_some());
    assert_ne!(bundle, before);
}

#[test]
fn test_engine_error_aborts_and_keeps_earlier_work() {
    let failing = |name: &str, code: &str, _: &ObfuscatorOptions| {
        if name == "b.js" {
            anyhow::bail!("Unexpected token in {name}");
        }
        Ok(ObfuscationResult::new(code.to_uppercase()))
    };
    let plugin = FobObfuscatorPlugin::new().with_engine(failing);

    let mut bundle = OutputBundle::new()
        .with_chunk("a.js", "a")
        .with_chunk("b.js", "b")
        .with_chunk("c.js", "c");

    let err = plugin.process_bundle(&mut bundle, true).unwrap_err();
    assert_eq!(err.to_string(), "Unexpected token in b.js");
    assert_eq!(asset_source(&bundle, "a.js"), Some("A"));
    assert!(matches!(bundle.get("b.js"), Some(OutputEntry::Chunk { .. })));
    assert!(matches!(bundle.get("c.js"), Some(OutputEntry::Chunk { .. })));
}

#[test]
fn test_emitted_assets_are_not_revisited() {
    let mut bundle = OutputBundle::new()
        .with_chunk("a.js", "ab")
        .with_chunk("b.js", "cd");

    plugin(ObfuscatorPluginOptions::new())
        .process_bundle(&mut bundle, true)
        .unwrap();

    assert_eq!(bundle.file_names(), vec!["a.js", "b.js"]);
    assert_eq!(asset_source(&bundle, "a.js"), Some("ba"));
    assert_eq!(asset_source(&bundle, "b.js"), Some("dc"));
}

#[test]
fn test_oxc_engine_through_plugin() {
    let source = "export function total(itemPrices) { let runningSum = 0; for (const singlePrice of itemPrices) { runningSum += singlePrice; } return runningSum; }\n";
    let mut bundle = OutputBundle::new().with_chunk("assets/index.js", source);

    FobObfuscatorPlugin::new()
        .process_bundle(&mut bundle, true)
        .unwrap();

    let code = asset_source(&bundle, "assets/index.js").unwrap();
    assert_ne!(code, source);
    assert!(code.contains("total"));
    assert!(!code.contains("runningSum"));
    assert!(!code.contains("itemPrices"));
}

#[test]
fn test_plugin_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("obfuscator.config.json");
    fs::write(
        &path,
        r#"{
            "include": { "regex": "\\.js$" },
            "exclude": ["**/legacy/**"],
            "options": { "compact": false, "sourceMap": true },
            "apply": "build",
            "excludeBehavior": "skip"
        }"#,
    )
    .unwrap();

    let plugin = FobObfuscatorPlugin::from_config_file(Some(&path))
        .unwrap()
        .with_engine(reverse);

    assert!(!plugin.transformer().options().compact);
    assert!(plugin.transformer().options().source_map);

    let mut bundle = OutputBundle::new().with_chunk("main.js", "xy");
    assert!(plugin.process_bundle(&mut bundle, false).unwrap().is_none());
    let report = plugin.process_bundle(&mut bundle, true).unwrap().unwrap();
    assert_eq!(report.transformed, vec!["main.js"]);
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.json");
    assert!(FobObfuscatorPlugin::from_config_file(Some(&missing)).is_err());
}
