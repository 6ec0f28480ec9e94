//! Command line driver for the page decorator.

use decorate::{parse_args, run};
use env_logger::{Builder, Env};
use log::error;
use std::env;
use std::io::{Write as _, stdout};
use std::process::exit;

fn main() {
    let _log_init: Result<(), _> = Builder::from_env(Env::default().filter_or("RUST_LOG", "warn"))
        .is_test(false)
        .try_init();
    let options = match parse_args(env::args().skip(1)) {
        Ok(options) => options,
        Err(err) => {
            error!("{err}");
            exit(2);
        }
    };
    match run(&options) {
        Ok(html) => {
            let mut out = stdout().lock();
            if let Err(err) = writeln!(out, "{html}") {
                error!("failed to write output: {err}");
                exit(1);
            }
        }
        Err(err) => {
            error!("error: {err:#}");
            exit(1);
        }
    }
}
