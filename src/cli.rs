use anyhow::{Result, anyhow};
use pico_args::Arguments;
use std::{env, io, path::PathBuf};

use gesturectl::config::ConfigState;
use gesturectl::gestures::GestureEngine;
use gesturectl::input;
use gesturectl::runtime::{self, JsonLinesSink};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    // Flags-based help (-h/--help)
    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("devices") => {
            let devices = input::discover_multitouch();
            if devices.is_empty() {
                println!("no multitouch devices found (try `gesturectl doctor`)");
            }
            for d in devices {
                println!("{}\t{}", d.path, d.name);
            }
            Ok(())
        }

        Some("listen") => {
            let device: Option<String> = pargs.opt_value_from_str("--device")?;
            let cfg = ConfigState::load_or_install_default()?;
            let mut sink = JsonLinesSink::new(io::stdout().lock());
            runtime::run_listen(device.as_deref(), cfg, &mut sink)
        }

        Some("replay") => {
            let trace: PathBuf = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: gesturectl replay <trace.jsonl|->"))?;
            let cfg = ConfigState::load_or_install_default()?;
            let mut engine = GestureEngine::new(&cfg.profile.settings)?;
            let mut sink = JsonLinesSink::new(io::stdout().lock());
            if trace.as_os_str() == "-" {
                runtime::replay(&mut engine, io::stdin().lock(), &mut sink)?;
            } else {
                runtime::replay_file(&mut engine, &trace, &mut sink)?;
            }
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: gesturectl use <profile_name>"))?;
            let mut cfg = ConfigState::load_or_install_default()?;
            cfg.set_active(&name)?;
            println!("ok: active profile is now '{name}'");
            Ok(())
        }

        Some("list") => {
            let cfg = ConfigState::load_or_install_default()?;
            for name in cfg.list_profiles() {
                let mark = if name == cfg.active_name { '*' } else { ' ' };
                println!("{mark} {name}");
            }
            Ok(())
        }

        Some("doctor") => {
            let cfg = ConfigState::load_or_install_default()?;
            let report = cfg.doctor_report();
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!(
        r#"gesturectl — multi-touch gesture recognizer

USAGE:
  gesturectl help [command]          Show general or command-specific help
  gesturectl devices                 List multitouch input devices
  gesturectl listen [--device PATH]  Recognize gestures live, JSON lines on stdout
  gesturectl replay <TRACE>          Recognize gestures from a recorded trace
  gesturectl use <name>              Switch active profile
  gesturectl list                    List profiles
  gesturectl doctor                  Diagnose permissions/devices

TIPS:
  - Profiles: ~/.config/gesturectl/profiles
  - Active profile pointer: ~/.config/gesturectl/active
  - Log level: RUST_LOG=debug gesturectl listen
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "devices" => println!("usage: gesturectl devices\nLists detected multitouch devices."),
        "listen" => println!(
            "usage: gesturectl listen [--device PATH]\nReads the first multitouch device (or PATH) and prints one JSON event per line.\nSIGUSR1 resets contacts and recalibrates the input clock; profile edits reload live."
        ),
        "replay" => println!(
            "usage: gesturectl replay <TRACE>\nFeeds a JSON-lines trace (one array of samples per line, `-` for stdin)\nthrough the recognizer with the active profile."
        ),
        "use" => {
            println!("usage: gesturectl use <name>\nSwitches active profile to <name>.")
        }
        "list" => {
            println!("usage: gesturectl list\nLists available profiles; marks active with '*'.")
        }
        "doctor" => println!(
            "usage: gesturectl doctor\nChecks permissions and lists detected multitouch devices."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}
