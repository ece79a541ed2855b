//! # flaglayer demo application
//!
//! A sample CLI showing how the sources stack up. Not a real app; it exists to
//! demonstrate and manually verify precedence.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example flaglayer_demo
//! cargo run --example flaglayer_demo -- --set server.port=9999
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature              | How to exercise it                                                          |
//! |----------------------|-----------------------------------------------------------------------------|
//! | Compiled defaults    | `cargo run --example flaglayer_demo`                                        |
//! | `--set` overrides    | `cargo run --example flaglayer_demo -- --set display.color=red`             |
//! | Clap-parsed options  | `cargo run --example flaglayer_demo -- --verbose`                           |
//! | Env var override     | `FLAGLAYER_DEMO_SERVER__PORT=7000 cargo run --example flaglayer_demo`       |
//! | Config file by flag  | `cargo run --example flaglayer_demo -- --config demo.toml`                  |
//! | Nearest config file  | Create `flaglayer-demo.toml` in cwd or any parent, then run                 |
//! | Help listing         | `cargo run --example flaglayer_demo -- --set help=1`                        |

use clap::{CommandFactory, FromArgMatches, Parser};

use flaglayer::parse::cli::{Matches, SetArgs};
use flaglayer::parse::{env, file};
use flaglayer::{ErrorHandling, FlagSet, Flaglayer, ParserOptions};

/// flaglayer demo: prints the resolved flags.
#[derive(Parser, Debug)]
#[command(name = "flaglayer-demo")]
struct Cli {
    /// Enable verbose output.
    #[arg(long)]
    verbose: bool,

    /// Config file to read.
    #[arg(long)]
    config: Option<String>,

    #[command(flatten)]
    flags: SetArgs,
}

const RESET: &str = "\x1b[0m";

fn ansi_color_code(name: &str) -> &'static str {
    match name {
        "red" => "\x1b[31m",
        "green" => "\x1b[32m",
        "yellow" => "\x1b[33m",
        "blue" => "\x1b[34m",
        _ => RESET,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut fs = FlagSet::new("flaglayer-demo", ErrorHandling::Exit);
    let verbose = fs.bool("verbose", false, "print extra detail")?;
    fs.string("config", "", "config file `path`")?;
    let host = fs.string("server.host", "localhost", "server `host`")?;
    let port = fs.int("server.port", 8080, "port to listen on")?;
    let color = fs.string("display.color", "yellow", "output color")?;
    let tags = fs.list("tags", "free-form tags")?;

    let matches = Cli::command().get_matches();
    let mut cli = Cli::from_arg_matches(&matches)?;

    Flaglayer::builder()
        .parser(Matches::new(&matches))
        .parser(&mut cli.flags)
        .parser(env::Parser::new().with_prefix("FLAGLAYER_DEMO_"))
        .parser_with(
            file::Parser::new(
                file::Lookup::Multi(vec![
                    file::Lookup::flag("config"),
                    file::Lookup::ancestors(
                        "flaglayer-demo.toml",
                        file::Boundary::Marker(".git".into()),
                    ),
                ]),
                file::Toml,
            ),
            ParserOptions::new().stash_name("config"),
        )
        .parse(&mut fs)?;

    let code = ansi_color_code(color.borrow().value());
    if verbose.borrow().value() {
        println!("{code}[verbose] resolved flags{RESET}");
    }
    println!("{code}server{RESET}  {}:{}", host.borrow().value(), port.borrow().value());
    println!("{code}tags{RESET}    {}", tags.borrow().values().join(", "));
    Ok(())
}
