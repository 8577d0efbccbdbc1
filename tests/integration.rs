use std::collections::BTreeMap;

use shpipe::commands::{
    RunOptions, Stderr, cat, count, decode, devnull, echo, echo_with, encode, join, run, run_with,
    split, splitlines,
};
use shpipe::filter::{Args, Kind, OperationRegistry, Outcome, Stage};
use shpipe::{PipelineError, TemplateError, Value, slurp, slurp_text, split_words};

const NONE: [&str; 0] = [];

fn words(template: &str, positional: &[Value]) -> Result<Vec<String>, TemplateError> {
    split_words(template, positional, &BTreeMap::new())
}

fn strs(items: &[&str]) -> Vec<Value> {
    items.iter().map(|s| Value::from(*s)).collect()
}

fn lines(filter: &shpipe::Filter) -> Vec<String> {
    filter
        .iter()
        .unwrap()
        .map(|v| String::from_utf8(v.unwrap().to_bytes()).unwrap())
        .collect()
}

macro_rules! words_test {
    ($name:ident, $template:expr, [$($arg:expr),*], [$($word:expr),*]) => {
        #[test]
        fn $name() {
            let positional: Vec<Value> = vec![$(Value::from($arg)),*];
            let expected: Vec<&str> = vec![$($word),*];
            assert_eq!(words($template, &positional).unwrap(), expected, "template: {}", $template);
        }
    };
}

macro_rules! template_error_test {
    ($name:ident, $template:expr, [$($arg:expr),*], $category:expr) => {
        #[test]
        fn $name() {
            let positional: Vec<Value> = vec![$(Value::from($arg)),*];
            let err = words($template, &positional).unwrap_err();
            assert_eq!(err.category(), $category, "template: {} error: {}", $template, err);
        }
    };
}

// ── Word splitting ──

words_test!(words_value_with_space, "git grep {}", ["hello world"], ["git", "grep", "hello world"]);
words_test!(words_auto_numbering, "{} {} {}", ["a", "b c", "d"], ["a", "b c", "d"]);
words_test!(words_manual_numbering, "{1} {0} {1}", ["a", "b"], ["b", "a", "b"]);
words_test!(words_collapse_spaces, "  ls    -l   {}  ", ["x"], ["ls", "-l", "x"]);
words_test!(words_join_within_word, "--out={}.txt", ["my file"], ["--out=my file.txt"]);
words_test!(words_empty_value_kept, "printf {}", [""], ["printf", ""]);
words_test!(words_escaped_braces, "awk {{print}}", [], ["awk", "{print}"]);
words_test!(words_shell_metachars_inert, "echo {}", ["$(rm -rf /); `x` | y"], ["echo", "$(rm -rf /); `x` | y"]);
words_test!(words_format_spec, "seq {:03d} {:>4}", [7, "ab"], ["seq", "007", "  ab"]);
words_test!(words_stringify, "echo {!s:>3}", [1], ["echo", "  1"]);
words_test!(words_empty_template, "", [], []);
words_test!(words_spread, "touch {!@}", [vec!["a", "b"]], ["touch", "a", "b"]);
words_test!(words_spread_empty_list, "ls {!@} -a", [Vec::<String>::new()], ["ls", "-a"]);

template_error_test!(err_mixed_numbering, "{} {0}", ["a"], "usage");
template_error_test!(err_mixed_numbering_reverse, "{0} {}", ["a"], "usage");
template_error_test!(err_missing_positional, "{} {}", ["a"], "usage");
template_error_test!(err_spread_not_word, "a {!@}c", [vec!["x"]], "usage");
template_error_test!(err_spread_prefixed, "a b{!@}", [vec!["x"]], "usage");
template_error_test!(err_spread_scalar, "a {!@}", ["x"], "usage");
template_error_test!(err_unmatched_open, "echo {", [], "syntax");
template_error_test!(err_unmatched_close, "echo }", [], "syntax");
template_error_test!(err_nested_field, "{:{}}", ["a", "b"], "syntax");
template_error_test!(err_unknown_conversion, "{!r}", ["a"], "syntax");
template_error_test!(err_bad_spec, "{:d}", ["a"], "format");

#[test]
fn named_and_chained_values() {
    let mut named = BTreeMap::new();
    named.insert(
        "cfg".to_string(),
        Value::Map(BTreeMap::from([(
            "dirs".to_string(),
            Value::from(vec!["/a b", "/c"]),
        )])),
    );
    assert_eq!(
        split_words("cp {cfg.dirs[0]} {cfg[dirs][1]}", &[], &named).unwrap(),
        vec!["cp", "/a b", "/c"]
    );
}

#[test]
fn syntax_and_usage_errors_are_distinct() {
    let syntax = words("echo {", &[]).unwrap_err();
    let usage = words("echo {0} {}", &strs(&["a"])).unwrap_err();
    assert!(matches!(syntax, TemplateError::Syntax { .. }));
    assert!(matches!(usage, TemplateError::Usage { .. }));
    assert_eq!(syntax.offset(), 5);
}

// ── Composition ──

#[test]
fn iter_into_stream_rejected_before_running() {
    let err = (splitlines() | run("touch /tmp/shpipe-never-created", NONE)).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::KindMismatch {
            left: Kind::Iter,
            right: Kind::Stream
        }
    ));
    assert!(!std::path::Path::new("/tmp/shpipe-never-created").exists());
}

#[test]
fn invoking_unsatisfied_input_fails() {
    assert!(matches!(
        splitlines().invoke().unwrap_err(),
        PipelineError::Unsatisfiable { .. }
    ));
    assert!(matches!(
        slurp(&decode()).unwrap_err(),
        PipelineError::Unsatisfiable { .. }
    ));
}

#[test]
fn long_pipeline() {
    let pipeline = (echo(["b\na\nc"])
        | run("sort", NONE)
        | run("tr {} {}", ["a-z", "A-Z"])
        | splitlines()
        | join(",")
        | decode()
        | encode())
    .unwrap();
    assert_eq!(slurp_text(&pipeline).unwrap(), "A,B,C");
}

#[test]
fn composition_is_reusable() {
    let pipeline = (echo(["x y"]) | split(false) | count()).unwrap();
    for _ in 0..2 {
        assert!(matches!(pipeline.invoke().unwrap(), Outcome::Value(Value::Int(2))));
    }
}

// ── Built-ins ──

#[test]
fn echo_slurp() {
    assert_eq!(slurp(&echo(["hello", "world"])).unwrap(), b"hello world");
}

#[test]
fn slurp_strips_every_trailing_newline() {
    assert_eq!(slurp(&echo_with(["Hello\n\n"], true)).unwrap(), b"Hello");
    assert_eq!(slurp(&echo_with(["Hello"], false)).unwrap(), b"Hello");
}

#[test]
fn decode_encode_round_trip() {
    let world = "\u{1F5FA}";
    let pipeline = (echo(["hello", world]) | decode() | encode()).unwrap();
    assert_eq!(slurp_text(&pipeline).unwrap(), format!("hello {world}"));
}

#[test]
fn splitlines_cases() {
    for (input, expected) in [
        ("1", vec!["1"]),
        ("1\n", vec!["1"]),
        ("1\n\n", vec!["1", ""]),
        ("\n1\n\n2\n", vec!["", "1", "", "2"]),
    ] {
        let pipeline = (echo_with([input], false) | splitlines()).unwrap();
        assert_eq!(lines(&pipeline), expected, "input: {input:?}");
    }
}

#[test]
fn devnull_standalone_and_piped() {
    devnull().invoke().unwrap();
    assert_eq!(slurp(&(echo(["x"]) | devnull()).unwrap()).unwrap(), b"");
}

#[test]
fn cat_reads_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shells");
    std::fs::write(&path, "/bin/sh\n/bin/bash\n").unwrap();
    assert_eq!(lines(&(cat([&path]) | splitlines()).unwrap()), ["/bin/sh", "/bin/bash"]);
}

// ── Run stages ──

#[test]
fn run_feeds_stdin() {
    let pipeline = (echo(["hello"]) | run("tr h H", NONE)).unwrap();
    assert_eq!(slurp(&pipeline).unwrap(), b"Hello");
}

#[test]
fn run_chain() {
    let pipeline = (run("printf {}", ["one\\ntwo\\nthree\\n"])
        | run("grep -m1 {}", ["t"])
        | run("tr {} {}", ["a-z", "A-Z"]))
    .unwrap();
    assert_eq!(slurp_text(&pipeline).unwrap(), "TWO");
}

#[test]
fn run_check_flag() {
    let err = slurp(&run("false", NONE)).unwrap_err();
    assert_eq!(err.exit_code(), Some(1));
    assert_eq!(err.category(), "process");

    let unchecked = run_with(
        "false",
        NONE,
        RunOptions {
            check: false,
            ..RunOptions::default()
        },
    );
    assert_eq!(slurp(&unchecked).unwrap(), b"");
}

#[test]
fn run_stderr_routes() {
    let script = ["echo a; echo ERR >&2; echo b"];
    let routed = |stderr| {
        let stage = run_with(
            "sh -c {}",
            script,
            RunOptions {
                stderr,
                ..RunOptions::default()
            },
        );
        lines(&(stage | splitlines()).unwrap())
    };
    assert_eq!(routed(Stderr::Inherit), ["a", "b"]);
    assert_eq!(routed(Stderr::Null), ["a", "b"]);
    assert_eq!(routed(Stderr::Stdout), ["a", "ERR", "b"]);
}

#[test]
fn run_large_input_does_not_deadlock() {
    let big = "x".repeat(1 << 20);
    let pipeline = (echo_with([big.as_str()], false) | run("wc -c", NONE)).unwrap();
    assert_eq!(slurp_text(&pipeline).unwrap().trim(), (1usize << 20).to_string());
}

// ── Registry ──

#[test]
fn registry_builds_from_stages() {
    let registry = OperationRegistry::builtin();
    let pipeline = registry
        .build([
            Stage::new("run").arg("printf {}").arg("c\\nb\\na\\n"),
            Stage::new("run").arg("sort"),
            Stage::new("splitlines"),
            Stage::new("count"),
        ])
        .unwrap();
    assert!(matches!(pipeline.invoke().unwrap(), Outcome::Value(Value::Int(3))));
}

#[test]
fn operation_by_name() {
    let filter = shpipe::operation("echo", Args::new().arg("hi").named("ln", false)).unwrap();
    assert_eq!(slurp(&filter).unwrap(), b"hi");
    assert!(matches!(
        shpipe::operation("nope", Args::new()).unwrap_err(),
        PipelineError::UnknownOperation(_)
    ));
}

#[test]
fn run_named_template_values() {
    let filter = shpipe::operation(
        "run",
        Args::new()
            .arg("echo {greeting} {}")
            .arg("world")
            .named("greeting", "hello there"),
    )
    .unwrap();
    assert_eq!(slurp(&filter).unwrap(), b"hello there world");
}
