//! `hvnet man`: man pages rendered by the build script.

use std::path::Path;

use crate::cli::ManArgs;
use crate::error::CliError;

macro_rules! page {
    ($name:literal) => {
        ($name, include_str!(concat!(env!("OUT_DIR"), "/man/", $name, ".1")))
    };
}

const PAGES: &[(&str, &str)] = &[
    page!("hvnet"),
    page!("hvnet-plan"),
    page!("hvnet-map"),
    page!("hvnet-config"),
    page!("hvnet-config-path"),
    page!("hvnet-config-show"),
    page!("hvnet-completions"),
    page!("hvnet-man"),
];

pub fn handle(args: &ManArgs) -> Result<(), CliError> {
    if let Some(dir) = &args.out_dir {
        return install(dir);
    }

    let name = args
        .command
        .as_deref()
        .map_or_else(|| "hvnet".to_owned(), |c| format!("hvnet-{}", c.replace(' ', "-")));
    let (_, page) = PAGES
        .iter()
        .find(|(n, _)| *n == name)
        .ok_or_else(|| CliError::Validation {
            field: "command".into(),
            reason: format!("no man page named {name}"),
        })?;
    print!("{page}");
    Ok(())
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> CliError {
    let path = path.display().to_string();
    move |source| CliError::Write { path, source }
}

fn install(dir: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(dir).map_err(write_error(dir))?;
    for (name, page) in PAGES {
        let path = dir.join(format!("{name}.1"));
        std::fs::write(&path, page).map_err(write_error(&path))?;
        tracing::info!(path = %path.display(), "wrote man page");
    }
    Ok(())
}
