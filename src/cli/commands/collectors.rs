use crate::collectors::{COLLECTOR_NAMES, default_enabled};
use clap::{Arg, ArgAction, Command};

pub fn add_collectors_args(mut cmd: Command) -> Command {
    for &name in COLLECTOR_NAMES {
        let enabled = default_enabled(name);

        // clap wants 'static ids; the set of collectors is fixed for the process
        let enable_flag: &'static str = Box::leak(format!("collector.{name}").into_boxed_str());
        let disable_flag: &'static str = Box::leak(format!("no-collector.{name}").into_boxed_str());

        let default_indicator = if enabled {
            " [default: enabled]"
        } else {
            " [default: disabled]"
        };

        cmd = cmd
            .arg(
                Arg::new(enable_flag)
                    .long(enable_flag)
                    .help(format!("Enable the {name} collector{default_indicator}"))
                    .action(ArgAction::SetTrue)
                    .default_value(if enabled { "true" } else { "false" }),
            )
            .arg(
                Arg::new(disable_flag)
                    .long(disable_flag)
                    .help(format!("Disable the {name} collector"))
                    .action(ArgAction::SetTrue)
                    .overrides_with(enable_flag),
            );
    }
    cmd
}
