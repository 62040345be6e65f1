/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Arg, ArgAction, Command, ValueHint, value_parser};

const ARGS_CONFIG_FILE: &str = "config-file";
const ARGS_VERBOSE: &str = "verbose";
const ARGS_TEST_CONFIG: &str = "test-config";

#[derive(Debug)]
pub struct ProcArgs {
    pub config_file: PathBuf,
    pub verbose_level: u8,
    pub test_config: bool,
}

pub fn parse_clap() -> anyhow::Result<ProcArgs> {
    let args = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new(ARGS_VERBOSE)
                .help("Show verbose output")
                .num_args(0)
                .action(ArgAction::Count)
                .short('v')
                .long(ARGS_VERBOSE),
        )
        .arg(
            Arg::new(ARGS_TEST_CONFIG)
                .help("Test the format of config file and exit")
                .action(ArgAction::SetTrue)
                .short('t')
                .long(ARGS_TEST_CONFIG),
        )
        .arg(
            Arg::new(ARGS_CONFIG_FILE)
                .help("Config file path")
                .num_args(1)
                .value_name("CONFIG FILE")
                .value_hint(ValueHint::FilePath)
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .short('c')
                .long(ARGS_CONFIG_FILE),
        )
        .get_matches();

    let mut proc_args = ProcArgs {
        config_file: PathBuf::new(),
        verbose_level: 0,
        test_config: false,
    };
    if let Some(verbose_level) = args.get_one::<u8>(ARGS_VERBOSE) {
        proc_args.verbose_level = *verbose_level;
    }
    if args.get_flag(ARGS_TEST_CONFIG) {
        proc_args.test_config = true;
    }
    match args.get_one::<PathBuf>(ARGS_CONFIG_FILE) {
        Some(config_file) => proc_args.config_file = config_file.to_path_buf(),
        None => return Err(anyhow!("no config file set")),
    }
    Ok(proc_args)
}
