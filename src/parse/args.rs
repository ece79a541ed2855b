//! Go `flag`-style argument parsing: `-name`, `--name`, `-name=value`,
//! `-name value`.
//!
//! Parsing stops at the first non-flag argument or after `--`; the rest is
//! available from [`Parser::non_flag_args`]. A boolean flag given without
//! `=value` is set to `true`, but only if the next argument is another flag
//! or there is none: `-debug file.txt` is rejected as ambiguous.

use crate::builder::{self, NameFn, Printer};
use crate::error::FlagError;
use crate::view::{FlagInfo, FlagSetView, is_help_name};

#[derive(Debug, Clone, Default)]
pub struct Parser {
    args: Vec<String>,
    pos: usize,
}

impl Parser {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            pos: 0,
        }
    }

    /// Arguments left after the last parsed flag.
    pub fn non_flag_args(&self) -> &[String] {
        &self.args[self.pos.min(self.args.len())..]
    }

    fn next(&mut self, view: &FlagSetView<'_>) -> Result<Option<(String, String)>, FlagError> {
        let Some(arg) = self.args.get(self.pos) else {
            return Ok(None);
        };
        if arg.len() < 2 || !arg.starts_with('-') {
            return Ok(None);
        }
        let arg = arg.clone();
        self.pos += 1;

        let body = match arg.strip_prefix("--") {
            Some("") => return Ok(None),
            Some(body) => body,
            None => &arg[1..],
        };
        if body.starts_with('-') || body.starts_with('=') {
            return Err(fail(format!("bad flag syntax: {arg}")));
        }

        let (name, mut value) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (body, None),
        };
        if value.is_none()
            && let Some(next) = self.args.get(self.pos)
            && !next.starts_with('-')
        {
            if is_bool(view, name) {
                return Err(fail(format!(
                    "ambiguous boolean flag -{name} value: can't guess whether {next:?} is \
                     the flag value or a non-flag argument (use -{name}={next} or -{name} -- {next})"
                )));
            }
            value = Some(next.clone());
            self.pos += 1;
        }
        if value.is_none() && is_bool(view, name) {
            value = Some("true".to_string());
        }
        let Some(value) = value else {
            return Err(fail(format!("flag needs an argument: -{name}")));
        };
        Ok(Some((name.to_string(), value)))
    }
}

fn fail(message: String) -> FlagError {
    FlagError::Syntax {
        source_name: "args",
        message,
    }
}

/// Undefined help names count as booleans so that `-help` needs no value.
fn is_bool(view: &FlagSetView<'_>, name: &str) -> bool {
    match view.lookup(name) {
        Some(flag) => flag.is_bool,
        None => is_help_name(name),
    }
}

impl builder::Parser for Parser {
    fn parse(&mut self, view: &mut FlagSetView<'_>) -> Result<(), FlagError> {
        self.pos = 0;
        while let Some((name, value)) = self.next(view)? {
            if view.lookup(&name).is_none() && is_help_name(&name) {
                return Err(FlagError::Help);
            }
            view.set(&name, &value)?;
        }
        Ok(())
    }

    fn printer(&self) -> Option<&dyn Printer> {
        Some(self)
    }
}

impl Printer for Parser {
    fn name(&self, _view: &FlagSetView<'_>) -> Result<NameFn<'_>, FlagError> {
        Ok(Box::new(|flag: &FlagInfo| vec![format!("-{}", flag.name)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Parser as _;
    use crate::fixtures::test::{flags_named, pairs, recording};
    use crate::flagset::FlagSet;

    fn run(fs: &mut FlagSet, args: &[&str]) -> Result<Parser, FlagError> {
        let mut parser = Parser::new(args.iter().copied());
        let mut view = FlagSetView::new(fs).with_ignore_undefined(true);
        parser.parse(&mut view)?;
        Ok(parser)
    }

    #[test]
    fn basic() {
        let mut fs = flags_named(&["foo", "bar"], &["a", "b", "c"]);
        let log = recording(&mut fs);
        let parser = run(
            &mut fs,
            &[
                "-a", "-b=true", "-c=false", "-foo", "value", "--bar", "value", "arg1", "arg2",
                "arg3",
            ],
        )
        .unwrap();
        assert_eq!(
            *log.borrow(),
            pairs(&[
                ("a", "true"),
                ("b", "true"),
                ("c", "false"),
                ("foo", "value"),
                ("bar", "value"),
            ])
        );
        assert_eq!(parser.non_flag_args(), ["arg1", "arg2", "arg3"]);
    }

    #[test]
    fn double_dash_terminates() {
        let mut fs = flags_named(&["param"], &[]);
        let log = recording(&mut fs);
        let parser = run(&mut fs, &["--param", "value", "--", "arg1", "-x"]).unwrap();
        assert_eq!(*log.borrow(), pairs(&[("param", "value")]));
        assert_eq!(parser.non_flag_args(), ["arg1", "-x"]);
    }

    #[test]
    fn missing_argument() {
        let mut fs = flags_named(&["param"], &[]);
        assert!(matches!(run(&mut fs, &["-param"]), Err(FlagError::Syntax { .. })));
        assert!(matches!(run(&mut fs, &["--param"]), Err(FlagError::Syntax { .. })));
        assert!(matches!(
            run(&mut fs, &["--param", "--other"]),
            Err(FlagError::Syntax { .. })
        ));
    }

    #[test]
    fn bool_followed_by_value_is_ambiguous() {
        let mut fs = flags_named(&[], &["debug"]);
        let err = run(&mut fs, &["-debug", "file.txt"]).unwrap_err();
        assert!(err.to_string().contains("ambiguous boolean flag -debug"));
    }

    #[test]
    fn bool_before_flag_or_at_end() {
        let mut fs = flags_named(&["foo"], &["debug", "quiet"]);
        run(&mut fs, &["-debug", "-foo", "x", "-quiet"]).unwrap();
        assert_eq!(fs.lookup("debug").unwrap().current(), "true");
        assert_eq!(fs.lookup("quiet").unwrap().current(), "true");
    }

    #[test]
    fn bad_syntax() {
        let mut fs = flags_named(&["foo"], &[]);
        assert!(matches!(run(&mut fs, &["---foo"]), Err(FlagError::Syntax { .. })));
        assert!(matches!(run(&mut fs, &["-=x"]), Err(FlagError::Syntax { .. })));
    }

    #[test]
    fn undefined_help_is_a_help_request() {
        let mut fs = flags_named(&["foo"], &[]);
        assert!(run(&mut fs, &["-help"]).unwrap_err().is_help());
        assert!(run(&mut fs, &["-h"]).unwrap_err().is_help());
    }

    #[test]
    fn defined_help_is_a_flag() {
        let mut fs = flags_named(&["help"], &[]);
        run(&mut fs, &["-help", "topic"]).unwrap();
        assert_eq!(fs.lookup("help").unwrap().current(), "topic");
    }

    #[test]
    fn first_non_flag_stops() {
        let mut fs = flags_named(&["foo"], &[]);
        let parser = run(&mut fs, &["cmd", "-foo", "x"]).unwrap();
        assert!(!fs.is_set("foo"));
        assert_eq!(parser.non_flag_args(), ["cmd", "-foo", "x"]);
    }

    #[test]
    fn names_are_single_dash() {
        let mut fs = flags_named(&["foo"], &[]);
        let parser = Parser::default();
        let view = FlagSetView::new(&mut fs);
        let name = parser.name(&view).unwrap();
        let info = view.lookup("foo").unwrap();
        assert_eq!(name(&info), ["-foo"]);
    }
}
