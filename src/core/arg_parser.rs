// src/core/arg_parser.rs

use crate::constants::{CONF_PATH_ARG, WRITE_OUT_ARG};
use crate::core::aggregator::{ParamRegistry, RegistrationError};
use crate::core::conf_file::{self, ConfFileError};
use crate::models::{
    CoercionError, Nargs, Param, ParamAction, ParamType, ParamValue, ResolvedValues,
};
use clap::builder::{PossibleValue, PossibleValuesParser};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

lazy_static! {
    // Long flags are auto-generated from parameter names, so the names
    // must themselves be valid flag spellings.
    static ref FLAG_NAME_RE: Regex = Regex::new(r"^[a-z][a-z0-9_-]*$").unwrap();
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Cli(#[from] clap::Error),
    #[error(transparent)]
    ConfFile(#[from] ConfFileError),
    #[error("Config file '{path}' sets '{key}', which is not a registered parameter.")]
    UnknownConfKey { path: String, key: String },
    #[error(transparent)]
    Coercion(#[from] CoercionError),
}

/// The result of a parse: either the resolved value mapping, or a request
/// to serialize the effective configuration (the `-w` flag) instead of
/// running the program.
#[derive(Debug)]
pub enum ParseOutcome {
    Resolved(ResolvedValues),
    WriteRequested {
        /// `None` means standard output.
        target: Option<PathBuf>,
        values: ResolvedValues,
    },
}

/// The clap-backed realization of the argument-registration and parse
/// contracts.
///
/// Registered parameters become `--<name>` flags (plus `-<alias>` when one
/// is declared), grouped in the help output under the owning component's
/// heading. The parser reserves `-c/--conf` for the config-file path and
/// `-w` for the write-out request.
#[derive(Debug)]
pub struct CliParser {
    description: String,
    args: Vec<Arg>,
    params: Vec<Param>,
    heading: Option<&'static str>,
    longs: HashSet<String>,
    shorts: HashSet<char>,
}

impl CliParser {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            args: Vec::new(),
            params: Vec::new(),
            heading: None,
            // The reserved flags claim their spellings up front.
            longs: HashSet::from([CONF_PATH_ARG.to_string()]),
            shorts: HashSet::from(['c', 'w']),
        }
    }

    /// Parses the process command line.
    pub fn parse(self) -> Result<ParseOutcome, ParseError> {
        self.parse_from(std::env::args_os())
    }

    /// Parses an explicit argument vector (the first element is the
    /// program name). Resolution precedence for every registered
    /// parameter is command line, then config file, then declared default.
    pub fn parse_from<I, T>(self, argv: I) -> Result<ParseOutcome, ParseError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command().try_get_matches_from(argv)?;

        let conf = match matches.get_one::<String>(CONF_PATH_ARG) {
            Some(path) => Some((path.clone(), conf_file::read(Path::new(path))?)),
            None => None,
        };
        if let Some((path, table)) = &conf {
            for key in table.keys() {
                if !self.params.iter().any(|p| &p.name == key) {
                    return Err(ParseError::UnknownConfKey {
                        path: path.clone(),
                        key: key.clone(),
                    });
                }
            }
        }

        let mut values = ResolvedValues::new();
        for param in &self.params {
            let supplied_on_cli = matches!(
                matches.value_source(&param.name),
                Some(ValueSource::CommandLine)
            );

            let value = if supplied_on_cli {
                extract_cli_value(&matches, param)?
            } else if let Some(conf_value) = conf.as_ref().and_then(|(_, t)| t.get(&param.name)) {
                Some(effective_type(param).coerce_toml(&param.name, conf_value)?)
            } else {
                implicit_or_declared_default(param)
            };

            if let Some(value) = value {
                values.set(param.name.clone(), value);
            }
        }

        if matches!(
            matches.value_source(WRITE_OUT_ARG),
            Some(ValueSource::CommandLine)
        ) {
            let target = matches.get_one::<String>(WRITE_OUT_ARG).map(PathBuf::from);
            return Ok(ParseOutcome::WriteRequested { target, values });
        }

        Ok(ParseOutcome::Resolved(values))
    }

    /// Builds the clap command from the registered arguments.
    fn command(&self) -> Command {
        Command::new("conflux")
            .about(self.description.clone())
            .arg(
                Arg::new(CONF_PATH_ARG)
                    .short('c')
                    .long("conf")
                    .value_name("FILE")
                    .action(ArgAction::Set)
                    .help("Read configuration values from FILE."),
            )
            .arg(
                Arg::new(WRITE_OUT_ARG)
                    .short('w')
                    .value_name("filename")
                    .action(ArgAction::Set)
                    .num_args(0..=1)
                    .help("Write out the effective config file and exit (stdout if no filename)."),
            )
            .args(self.args.iter().cloned())
    }
}

impl ParamRegistry for CliParser {
    fn open_group(&mut self, component: &'static str) {
        self.heading = Some(component);
    }

    fn register(&mut self, param: &Param) -> Result<(), RegistrationError> {
        if !FLAG_NAME_RE.is_match(&param.name) {
            return Err(RegistrationError::InvalidName {
                name: param.name.clone(),
            });
        }
        if !self.longs.insert(param.name.clone()) {
            return Err(RegistrationError::DuplicateFlag {
                flag: format!("--{}", param.name),
            });
        }
        if let Some(alias) = param.alias {
            if !self.shorts.insert(alias) {
                return Err(RegistrationError::DuplicateFlag {
                    flag: format!("-{}", alias),
                });
            }
        }

        log::debug!(
            "Registering flag '--{}' under group '{}'.",
            param.name,
            self.heading.unwrap_or("-")
        );
        self.args.push(build_arg(param, self.heading));
        self.params.push(param.clone());
        Ok(())
    }
}

/// Translates a [`Param`] descriptor into a clap argument.
fn build_arg(param: &Param, heading: Option<&'static str>) -> Arg {
    let mut arg = Arg::new(param.name.clone()).long(param.name.clone());

    if let Some(alias) = param.alias {
        arg = arg.short(alias);
    }
    if let Some(heading) = heading {
        arg = arg.help_heading(heading);
    }

    // The declared default is shown in the help text; it is applied by the
    // parse step itself so that config-file values take precedence over it.
    let help = match (&param.help, &param.default) {
        (Some(text), Some(default)) => Some(format!("{} [default: {}]", text, default)),
        (Some(text), None) => Some(text.clone()),
        (None, Some(default)) => Some(format!("[default: {}]", default)),
        (None, None) => None,
    };
    if let Some(help) = help {
        arg = arg.help(help);
    }

    match param.action {
        ParamAction::StoreTrue => arg = arg.action(ArgAction::SetTrue),
        ParamAction::Count => arg = arg.action(ArgAction::Count),
        ParamAction::Store => {
            arg = arg.action(ArgAction::Set);
            if let Some(nargs) = param.nargs {
                arg = match nargs {
                    Nargs::Exact(n) => arg.num_args(n),
                    Nargs::ZeroOrMore => arg.num_args(0..),
                    Nargs::OneOrMore => arg.num_args(1..),
                };
            }
            if let Some(metavar) = &param.metavar {
                arg = arg.value_name(metavar.clone());
            }
            if !param.choices.is_empty() {
                arg = arg.value_parser(PossibleValuesParser::new(
                    param.choices.iter().map(|c| PossibleValue::new(c.clone())),
                ));
            }
        }
    }

    arg
}

/// The type a parameter's resolved value actually carries: presence and
/// counting flags resolve to Bool and Int regardless of the declared kind.
fn effective_type(param: &Param) -> ParamType {
    match param.action {
        ParamAction::StoreTrue => ParamType::Bool,
        ParamAction::Count => ParamType::Int,
        ParamAction::Store => param.kind,
    }
}

/// Pulls a command-line-supplied value out of the matches, coerced per the
/// declared type.
fn extract_cli_value(
    matches: &ArgMatches,
    param: &Param,
) -> Result<Option<ParamValue>, ParseError> {
    let value = match param.action {
        ParamAction::StoreTrue => Some(ParamValue::Bool(matches.get_flag(&param.name))),
        ParamAction::Count => Some(ParamValue::Int(i64::from(matches.get_count(&param.name)))),
        ParamAction::Store => {
            if param.nargs.is_some() {
                let items = matches
                    .get_many::<String>(&param.name)
                    .map(|raw| raw.cloned().collect())
                    .unwrap_or_default();
                Some(ParamValue::List(items))
            } else {
                match matches.get_one::<String>(&param.name) {
                    Some(raw) => Some(param.kind.coerce_str(&param.name, raw)?),
                    None => None,
                }
            }
        }
    };
    Ok(value)
}

/// The value a parameter resolves to when neither the command line nor
/// the config file supplies one. Presence and counting flags have
/// implicit zero defaults, matching their parser semantics.
fn implicit_or_declared_default(param: &Param) -> Option<ParamValue> {
    match (&param.default, param.action) {
        (Some(default), _) => Some(default.clone()),
        (None, ParamAction::StoreTrue) => Some(ParamValue::Bool(false)),
        (None, ParamAction::Count) => Some(ParamValue::Int(0)),
        (None, ParamAction::Store) => None,
    }
}

// MARK: --- UNIT TESTS ---
