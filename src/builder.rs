//! Run an ordered list of sources against one registry.
//!
//! Each [`Parser`] gets its own level of a [`FlagSetView`], so a flag set by
//! an earlier parser is locked for the ones after it. Per-parser
//! [`ParserOptions`] add stash predicates, the undefined-name policy or
//! reset permission to that parser's level only; the builder's own options
//! apply to every level.
//!
//! A help request stops the pass and prints usage: the registry's custom
//! usage if it has one, otherwise a listing of every flag under the names
//! the [`Printer`] parsers report. The registry's [`ErrorHandling`] then
//! decides whether the error is returned, exits the process or panics.

use std::io::{self, Write};
use std::process;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::FlagError;
use crate::flagset::{ErrorHandling, FlagSet};
use crate::usage::{self, UnquoteUsageMode};
use crate::view::{FlagInfo, FlagSetView, Stash, stashed};

/// A source of flag values, consulted once per resolution pass.
///
/// Everything a parser writes goes through the [`FlagSetView`], which applies
/// precedence, the level's stash and the undefined-name policy.
pub trait Parser {
    fn parse(&mut self, view: &mut FlagSetView<'_>) -> Result<(), FlagError>;

    /// Listing capability. Parsers that can tell how a flag is spelled in
    /// their source return themselves here.
    fn printer(&self) -> Option<&dyn Printer> {
        None
    }
}

impl<P: Parser + ?Sized> Parser for &mut P {
    fn parse(&mut self, view: &mut FlagSetView<'_>) -> Result<(), FlagError> {
        (**self).parse(view)
    }

    fn printer(&self) -> Option<&dyn Printer> {
        (**self).printer()
    }
}

/// Display names of one flag in a parser's source, e.g. `-p`, `--port`.
pub type NameFn<'a> = Box<dyn Fn(&FlagInfo) -> Vec<String> + 'a>;

pub trait Printer {
    fn name(&self, view: &FlagSetView<'_>) -> Result<NameFn<'_>, FlagError>;
}

/// A [`Parser`] made of a closure.
pub struct ParserFn<F>(pub F);

impl<F> Parser for ParserFn<F>
where
    F: FnMut(&mut FlagSetView<'_>) -> Result<(), FlagError>,
{
    fn parse(&mut self, view: &mut FlagSetView<'_>) -> Result<(), FlagError> {
        (self.0)(view)
    }
}

/// Level settings for one parser. Every option only ever turns a behavior on;
/// options given to the [builder](FlaglayerBuilder) apply to all parsers on
/// top of their own.
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    stash: Vec<Stash>,
    ignore_undefined: bool,
    allow_reset_specified: bool,
}

impl ParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide the flag named `name` from the parser.
    pub fn stash_name(mut self, name: &str) -> Self {
        self.stash.push(Stash::name(name));
        self
    }

    pub fn stash_prefix(mut self, prefix: &str) -> Self {
        self.stash.push(Stash::prefix(prefix));
        self
    }

    pub fn stash_regex(mut self, re: Regex) -> Self {
        self.stash.push(Stash::Regex(re));
        self
    }

    pub fn stash_fn(mut self, f: impl Fn(&str) -> bool + 'static) -> Self {
        self.stash.push(Stash::func(f));
        self
    }

    /// Let the parser mention names that are not defined (or are stashed).
    pub fn ignore_undefined(mut self) -> Self {
        self.ignore_undefined = true;
        self
    }

    /// Let the parser overwrite flags specified by earlier parsers.
    pub fn allow_reset_specified(mut self) -> Self {
        self.allow_reset_specified = true;
        self
    }

    fn with_global(&self, global: &ParserOptions) -> ParserOptions {
        let mut stash = self.stash.clone();
        stash.extend(global.stash.iter().cloned());
        ParserOptions {
            stash,
            ignore_undefined: self.ignore_undefined || global.ignore_undefined,
            allow_reset_specified: self.allow_reset_specified || global.allow_reset_specified,
        }
    }
}

/// Entry point for building a resolution pass.
pub struct Flaglayer;

impl Flaglayer {
    pub fn builder<'p>() -> FlaglayerBuilder<'p> {
        FlaglayerBuilder::new()
    }
}

struct Entry<'p> {
    parser: Box<dyn Parser + 'p>,
    options: ParserOptions,
}

/// Ordered list of parsers plus the options of the pass.
///
/// Parsers run in registration order. A flag set by an earlier parser is
/// locked for the later ones: the first source that mentions a flag wins,
/// unless a later parser is allowed to reset specified flags.
///
/// ```ignore
/// Flaglayer::builder()
///     .parser(&mut args)
///     .parser_with(&mut file, ParserOptions::new().ignore_undefined())
///     .parser(&mut env)
///     .parse(&mut fs)?;
/// ```
pub struct FlaglayerBuilder<'p> {
    parsers: Vec<Entry<'p>>,
    global: ParserOptions,
    custom_usage: bool,
    unquote_usage_mode: UnquoteUsageMode,
    output: Option<Box<dyn Write + 'p>>,
}

impl<'p> FlaglayerBuilder<'p> {
    fn new() -> Self {
        Self {
            parsers: Vec::new(),
            global: ParserOptions::default(),
            custom_usage: false,
            unquote_usage_mode: UnquoteUsageMode::default(),
            output: None,
        }
    }

    pub fn parser(self, parser: impl Parser + 'p) -> Self {
        self.parser_with(parser, ParserOptions::default())
    }

    pub fn parser_with(mut self, parser: impl Parser + 'p, options: ParserOptions) -> Self {
        self.parsers.push(Entry {
            parser: Box::new(parser),
            options,
        });
        self
    }

    /// Hide `name` from every parser.
    pub fn stash_name(mut self, name: &str) -> Self {
        self.global = self.global.stash_name(name);
        self
    }

    pub fn stash_prefix(mut self, prefix: &str) -> Self {
        self.global = self.global.stash_prefix(prefix);
        self
    }

    pub fn stash_regex(mut self, re: Regex) -> Self {
        self.global = self.global.stash_regex(re);
        self
    }

    pub fn stash_fn(mut self, f: impl Fn(&str) -> bool + 'static) -> Self {
        self.global = self.global.stash_fn(f);
        self
    }

    /// Ignore undefined names in every parser.
    pub fn ignore_undefined(mut self) -> Self {
        self.global = self.global.ignore_undefined();
        self
    }

    pub fn allow_reset_specified(mut self) -> Self {
        self.global = self.global.allow_reset_specified();
        self
    }

    /// On help, print the generated listing even if the flag set has its own
    /// usage function.
    pub fn custom_usage(mut self) -> Self {
        self.custom_usage = true;
        self
    }

    pub fn unquote_usage_mode(mut self, mode: UnquoteUsageMode) -> Self {
        self.unquote_usage_mode = mode;
        self
    }

    /// Where help output and, under [`ErrorHandling::Exit`], error messages
    /// are written. Defaults to stderr.
    pub fn output(mut self, out: impl Write + 'p) -> Self {
        self.output = Some(Box::new(out));
        self
    }

    /// Run every parser in order against `fs`.
    ///
    /// The first error stops the pass. Values set before it are kept. What
    /// happens to the error depends on the flag set's [`ErrorHandling`]; on
    /// help the usage is printed first.
    pub fn parse(&mut self, fs: &mut FlagSet) -> Result<(), FlagError> {
        let Err(err) = self.run(fs) else {
            return Ok(());
        };
        if err.is_help()
            && let Err(e) = self.print_usage(fs)
        {
            warn!(error = %e, "failed to print usage");
        }
        match fs.error_handling() {
            ErrorHandling::Continue => Err(err),
            ErrorHandling::Exit => {
                if !err.is_help() {
                    let _ = writeln!(self.out(), "{err}");
                }
                process::exit(2);
            }
            ErrorHandling::Panic => panic!("{err}"),
        }
    }

    fn run(&mut self, fs: &mut FlagSet) -> Result<(), FlagError> {
        let mut view = FlagSetView::new(fs);
        for (level, entry) in self.parsers.iter_mut().enumerate() {
            let options = entry.options.with_global(&self.global);
            view.next_level();
            for stash in options.stash {
                view.stash(stash);
            }
            view.set_ignore_undefined(options.ignore_undefined);
            view.allow_reset_specified(options.allow_reset_specified);

            debug!(
                level,
                ignore_undefined = options.ignore_undefined,
                allow_reset_specified = options.allow_reset_specified,
                "parsing source"
            );
            entry.parser.parse(&mut view)?;
        }
        Ok(())
    }

    fn out(&mut self) -> Box<dyn Write + '_> {
        match self.output.as_mut() {
            Some(out) => Box::new(out),
            None => Box::new(io::stderr()),
        }
    }

    fn print_usage(&mut self, fs: &mut FlagSet) -> Result<(), FlagError> {
        if !self.custom_usage
            && let Some(usage) = fs.usage()
        {
            usage(fs);
            return Ok(());
        }
        let header = match fs.name() {
            "" => "Usage:\n".to_string(),
            name => format!("Usage of {name}:\n"),
        };
        let mut buf = header.into_bytes();
        self.print_defaults(fs, &mut buf)?;
        self.out().write_all(&buf).map_err(|source| FlagError::Io {
            path: "<usage output>".into(),
            source,
        })
    }

    /// Write the flag listing to `out`.
    ///
    /// Each flag is listed under the names every printer-capable parser gives
    /// it, in parser order, skipping parsers that stash the flag. When no
    /// parser can print names the bare flag name is used. When some can but
    /// none names a flag, the flag is left out.
    pub fn print_defaults(&self, fs: &mut FlagSet, out: &mut dyn Write) -> Result<(), FlagError> {
        let view = FlagSetView::new(fs);
        let mut printers = Vec::with_capacity(self.parsers.len());
        for entry in &self.parsers {
            let name_fn = match entry.parser.printer() {
                Some(printer) => Some(printer.name(&view)?),
                None => None,
            };
            printers.push((name_fn, entry.options.with_global(&self.global).stash));
        }
        let has_printer = printers.iter().any(|(f, _)| f.is_some());

        for flag in view.flags() {
            let mut names = Vec::new();
            for (name_fn, stash) in &printers {
                let Some(name_fn) = name_fn else { continue };
                if stashed(stash, &flag.name) {
                    continue;
                }
                names.extend(name_fn(&flag));
            }
            if names.is_empty() {
                if has_printer {
                    continue;
                }
                names.push(flag.name.clone());
            }
            usage::write_entry(out, &names, &flag, self.unquote_usage_mode).map_err(|source| {
                FlagError::Io {
                    path: "<usage output>".into(),
                    source,
                }
            })?;
        }
        Ok(())
    }
}
