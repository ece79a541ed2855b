//! End-to-end resolution across real source adapters.

use std::fs;

use flaglayer::parse::{args, env, file, object};
use flaglayer::{ErrorHandling, FlagError, FlagSet, Flaglayer, ParserOptions};
use serde::Serialize;
use tempfile::TempDir;

fn env_vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn app_flags() -> FlagSet {
    let mut fs = FlagSet::new("app", ErrorHandling::Continue);
    fs.string("foo", "", "foo value").unwrap();
    fs.bool("bar", false, "bar toggle").unwrap();
    fs
}

#[test]
fn argv_then_env() {
    let mut fs = app_flags();
    let foo = fs.lookup("foo").unwrap().value.clone();
    Flaglayer::builder()
        .parser(args::Parser::new(["-foo=hello"]))
        .parser(env::Parser::from_vars(env_vars(&[
            ("BAR", "true"),
            ("FOO", "world"),
        ])))
        .parse(&mut fs)
        .unwrap();
    assert_eq!(foo.borrow().to_string(), "hello");
    assert_eq!(fs.lookup("bar").unwrap().current(), "true");
}

#[test]
fn source_order_decides_precedence() {
    let run = |env_first: bool| {
        let mut fs = app_flags();
        let mut argv = args::Parser::new(["-foo", "from-args"]);
        let mut vars = env::Parser::from_vars(env_vars(&[("FOO", "from-env")]));
        let mut builder = if env_first {
            Flaglayer::builder().parser(&mut vars).parser(&mut argv)
        } else {
            Flaglayer::builder().parser(&mut argv).parser(&mut vars)
        };
        builder.parse(&mut fs).unwrap();
        fs.lookup("foo").unwrap().current()
    };
    assert_eq!(run(false), "from-args");
    assert_eq!(run(true), "from-env");
}

#[test]
fn config_file_named_by_a_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.yaml");
    fs::write(
        &path,
        "foo: from-file\nconfig: ignored.yaml\ndatabase:\n  url: pg://file\n  pool: 4\n",
    )
    .unwrap();

    let mut fs = app_flags();
    fs.string("config", "", "config `path`").unwrap();
    fs.string("database.url", "", "").unwrap();
    fs.uint("database.pool", 1, "").unwrap();

    let config_arg = format!("-config={}", path.display());
    Flaglayer::builder()
        .parser(args::Parser::new([config_arg.as_str(), "-bar"]))
        .parser(env::Parser::from_vars(env_vars(&[(
            "DATABASE__URL",
            "pg://env",
        )])))
        .parser_with(
            file::Parser::new(file::Lookup::flag("config"), file::Yaml),
            ParserOptions::new().stash_name("config").ignore_undefined(),
        )
        .parse(&mut fs)
        .unwrap();

    assert_eq!(fs.lookup("foo").unwrap().current(), "from-file");
    assert_eq!(fs.lookup("bar").unwrap().current(), "true");
    assert_eq!(fs.lookup("database.url").unwrap().current(), "pg://env");
    assert_eq!(fs.lookup("database.pool").unwrap().current(), "4");
    assert_eq!(fs.lookup("config").unwrap().current(), path.display().to_string());
}

#[test]
fn object_defaults_fill_the_rest() {
    #[derive(Serialize)]
    struct Fallback {
        foo: &'static str,
        bar: Option<bool>,
    }

    let mut fs = app_flags();
    Flaglayer::builder()
        .parser(env::Parser::from_vars(env_vars(&[("APP_BAR", "true")])).with_prefix("APP_"))
        .parser(
            object::Parser::new(&Fallback {
                foo: "fallback",
                bar: Some(false),
            })
            .unwrap(),
        )
        .parse(&mut fs)
        .unwrap();
    assert_eq!(fs.lookup("foo").unwrap().current(), "fallback");
    assert_eq!(fs.lookup("bar").unwrap().current(), "true");
}

#[test]
fn help_is_reported_and_listed() {
    #[derive(Clone, Default)]
    struct Sink(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);

    impl std::io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let mut fs = app_flags();
    let sink = Sink::default();
    let err = Flaglayer::builder()
        .parser(args::Parser::new(["-help"]))
        .parser(env::Parser::from_vars(Vec::new()).with_prefix("APP_"))
        .output(sink.clone())
        .parse(&mut fs)
        .unwrap_err();
    assert!(err.is_help());

    let printed = String::from_utf8(sink.0.borrow().clone()).unwrap();
    let expected = concat!(
        "Usage of app:\n",
        "  -bar, $APP_BAR\n",
        "    \tbool\n",
        "    \tbar toggle (default false)\n",
        "\n",
        "  -foo, $APP_FOO\n",
        "    \tstring\n",
        "    \tfoo value (default \"\")\n",
        "\n",
    );
    assert_eq!(printed, expected);
}

#[test]
fn errors_name_the_source_or_flag() {
    let mut fs = app_flags();
    let err = Flaglayer::builder()
        .parser(args::Parser::new(["-bar", "file.txt"]))
        .parse(&mut fs)
        .unwrap_err();
    assert!(matches!(err, FlagError::Syntax { source_name: "args", .. }));

    let mut fs = app_flags();
    let err = Flaglayer::builder()
        .parser(file::Parser::new(
            file::Lookup::Bytes(br#"{"bar": "maybe"}"#.to_vec()),
            file::Json,
        ))
        .parse(&mut fs)
        .unwrap_err();
    assert!(matches!(err, FlagError::InvalidValue { name, .. } if name == "bar"));
}
