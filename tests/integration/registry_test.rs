//! Registry loading, dispatch precedence and reload behavior.

use bot_dispatch::config::Config;
use bot_dispatch::{Dispatch, DispatchError, OrderRegistry};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const BOT_CONFIG: &str = r#"
[directive]
header = "!"
fuzzy_match = true
match_prompt = true

[[orders]]
name = "weather"
description = "Look up the weather"
param_usage = "<city>"
headers = ["weather", "__天气"]
regexps = ["\\w+"]
priority = 1

[[orders]]
name = "roll"
description = "Roll dice"
param_usage = "[count] <sides>"
headers = ["roll", "r"]
regexps = [["\\d+"], ["\\d+", "d\\d+"]]

[[orders]]
name = "echo"
headers = ["echo"]
regexps = [".+"]
stop = false

[[orders]]
name = "bad"
headers = ["bad"]
regexps = ["(unbalanced"]
"#;

fn load(toml: &str) -> (tempfile::TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    let config = Config::load_from_file(&path).unwrap();
    (dir, config)
}

fn invoked(command: &str, header: &str, arguments: &[&str]) -> Dispatch {
    Dispatch::Invoked {
        command: command.to_string(),
        header: header.to_string(),
        arguments: arguments.iter().map(|a| a.to_string()).collect(),
    }
}

#[test]
fn test_load_and_dispatch_from_file() {
    let (_dir, config) = load(BOT_CONFIG);
    let registry = OrderRegistry::new(&config);

    assert_eq!(registry.order_names(), vec!["weather", "roll", "echo"]);
    assert_eq!(registry.dispatch("!weather tokyo"), invoked("weather", "!weather", &["tokyo"]));
    assert_eq!(registry.dispatch("!roll 2 d6"), invoked("roll", "!roll", &["2", "d6"]));
    assert_eq!(registry.dispatch("!r 20"), invoked("roll", "!r", &["20"]));
    assert_eq!(registry.dispatch("!echo hi there"), invoked("echo", "!echo", &["hi there"]));
}

#[test]
fn test_malformed_order_is_rejected_not_fatal() {
    let (_dir, config) = load(BOT_CONFIG);
    let registry = OrderRegistry::new(&config);

    let disabled = registry.disabled();
    assert_eq!(disabled.len(), 1);
    assert_eq!(disabled[0].name, "bad");
    match &disabled[0].error {
        DispatchError::Compile { command, header, row, .. } => {
            assert_eq!(command, "bad");
            assert_eq!(header, "!bad");
            assert_eq!(*row, 0);
        }
        other => panic!("Expected compile error, got {other:?}"),
    }
    assert_eq!(registry.dispatch("!bad x"), Dispatch::Unrecognized);
}

#[test]
fn test_cjk_header_rescued_through_registry() {
    let (_dir, config) = load(BOT_CONFIG);
    let registry = OrderRegistry::new(&config);
    assert_eq!(registry.dispatch("东京天气"), invoked("weather", "天气", &["东京"]));
}

#[test]
fn test_bad_arguments_surface_usage() {
    let (_dir, config) = load(BOT_CONFIG);
    let registry = OrderRegistry::new(&config);

    match registry.dispatch("!roll lots") {
        Dispatch::BadArguments { command, header, remainder, usage } => {
            assert_eq!(command, "roll");
            assert_eq!(header, "!roll");
            assert_eq!(remainder, "lots");
            assert_eq!(usage, "Roll dice !roll|!r [count] <sides>");
        }
        other => panic!("Expected BadArguments, got {other:?}"),
    }
}

#[test]
fn test_help_text_lists_enabled_orders() {
    let (_dir, config) = load(BOT_CONFIG);
    let registry = OrderRegistry::new(&config);
    assert_eq!(
        registry.help_text(Some(1)),
        "Look up the weather !weather <city>\nRoll dice !roll [count] <sides>\n!echo"
    );
}

#[test]
fn test_toggle_flip_takes_effect_without_reload() {
    let (_dir, config) = load(BOT_CONFIG);
    let registry = OrderRegistry::new(&config);
    let compiled = registry.get("weather").unwrap();
    assert!(matches!(registry.dispatch("东京天气"), Dispatch::Invoked { .. }));

    let mut directive = registry.directive();
    directive.fuzzy_match = false;
    registry.set_directive(directive);
    assert_eq!(registry.dispatch("东京天气"), Dispatch::Unrecognized);
    assert!(Arc::ptr_eq(&compiled, &registry.get("weather").unwrap()));

    let mut directive = registry.directive();
    directive.fuzzy_match = true;
    registry.set_directive(directive);
    assert!(matches!(registry.dispatch("东京天气"), Dispatch::Invoked { .. }));
}

#[test]
fn test_concurrent_dispatch_with_block_on() {
    let (_dir, config) = load(BOT_CONFIG);
    let registry = OrderRegistry::new(&config);
    for input in ["!weather tokyo", "!roll", "东京天气", "!echo", "nothing here"] {
        let concurrent = tokio_test::block_on(registry.dispatch_concurrent(input)).unwrap();
        assert_eq!(concurrent, registry.dispatch(input), "input: {input}");
    }
}

#[test]
fn test_reload_is_atomic_for_readers() {
    let (_dir_a, alpha) = load(
        r#"
[directive]
header = "!"

[[orders]]
name = "alpha"
headers = ["ping"]
"#,
    );
    let (_dir_b, beta) = load(
        r##"
[directive]
header = "#"

[[orders]]
name = "beta"
headers = ["pong"]
"##,
    );

    let registry = OrderRegistry::new(&alpha);
    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..200 {
                registry.reload(if i % 2 == 0 { &beta } else { &alpha });
            }
            done.store(true, Ordering::SeqCst);
        });

        for _ in 0..2 {
            scope.spawn(|| {
                while !done.load(Ordering::SeqCst) {
                    match registry.dispatch("!ping") {
                        Dispatch::Invoked { command, header, .. } => {
                            assert_eq!(command, "alpha");
                            assert_eq!(header, "!ping");
                        }
                        Dispatch::Unrecognized => {}
                        other => panic!("Inconsistent snapshot: {other:?}"),
                    }
                    match registry.dispatch("#pong") {
                        Dispatch::Invoked { command, .. } => assert_eq!(command, "beta"),
                        Dispatch::Unrecognized => {}
                        other => panic!("Inconsistent snapshot: {other:?}"),
                    }
                }
            });
        }
    });
}
