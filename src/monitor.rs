//! Continuous system-monitor views: cpu, mem, disk, ps.
//!
//! Each view redraws a boxed table on a fixed interval and blocks until the
//! shared interrupt flag fires (Ctrl-C). The flag is cleared again on the way
//! out so the next statement starts clean. Despite accepting a trailing `&`
//! syntactically, these views always run in the foreground.

use crate::builtin::BuiltinCommand;
use crate::env::Environment;
use crate::executor::ExitCode;
use anyhow::Result;
use argh::FromArgs;
use std::io::Write;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use sysinfo::System;

const RESET: &str = "\x1b[0m";
const HEADER: &str = "\x1b[1;37m";
const LABEL: &str = "\x1b[1;36m";
const VALUE: &str = "\x1b[1;33m";
const CLEAR: &str = "\x1b[H\x1b[J";

const GIB: f64 = (1 << 30) as f64;

/// Drive one view: paint a frame immediately, then redraw every `interval`
/// until interrupted.
fn redraw_loop(
    env: &Environment,
    interval: Duration,
    label: &str,
    out: &mut dyn Write,
    mut frame: impl FnMut(&mut dyn Write) -> Result<()>,
) -> Result<ExitCode> {
    while !env.interrupted.load(Ordering::SeqCst) {
        write!(out, "{}", CLEAR)?;
        frame(out)?;
        writeln!(out, "\nPress Ctrl+C to exit.")?;
        out.flush()?;
        thread::sleep(interval);
    }
    env.interrupted.store(false, Ordering::SeqCst);
    writeln!(out, "\nexiting {} monitor", label)?;
    Ok(0)
}

/// First 20 characters of a process name. Truncating by characters keeps
/// multibyte names from splitting mid-character.
fn short_name(name: &str) -> String {
    name.chars().take(20).collect()
}

fn rule(out: &mut dyn Write, widths: &[usize]) -> Result<()> {
    let mut line = String::from("+");
    for w in widths {
        line.push_str(&"-".repeat(*w));
        line.push('+');
    }
    writeln!(out, "{}", line)?;
    Ok(())
}

#[derive(FromArgs)]
/// Continuously display per-core CPU usage.
pub struct Cpu {}

impl BuiltinCommand for Cpu {
    fn name() -> &'static str {
        "cpu"
    }

    fn run(self, out: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let mut sys = System::new();
        sys.refresh_cpu();
        redraw_loop(env, Duration::from_millis(500), "cpu", out, move |out| {
            sys.refresh_cpu();
            let widths = [12usize, 12];
            rule(out, &widths)?;
            writeln!(
                out,
                "|{HEADER}{:^12}{RESET}|{HEADER}{:^12}{RESET}|",
                "CPU Core", "Usage %"
            )?;
            rule(out, &widths)?;
            for (i, cpu) in sys.cpus().iter().enumerate() {
                writeln!(
                    out,
                    "|{LABEL}{:^12}{RESET}|{VALUE}{:^12}{RESET}|",
                    format!("Core {}", i),
                    format!("{:.1}%", cpu.cpu_usage())
                )?;
            }
            rule(out, &widths)?;
            Ok(())
        })
    }
}

#[derive(FromArgs)]
/// Continuously display RAM usage.
pub struct Mem {}

impl BuiltinCommand for Mem {
    fn name() -> &'static str {
        "mem"
    }

    fn run(self, out: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let mut sys = System::new();
        redraw_loop(env, Duration::from_secs(1), "memory", out, move |out| {
            sys.refresh_memory();
            let total = sys.total_memory() as f64;
            let used = sys.used_memory() as f64;
            let available = sys.available_memory() as f64;
            let percent = if total > 0.0 { used / total * 100.0 } else { 0.0 };

            let widths = [20usize, 15];
            rule(out, &widths)?;
            writeln!(
                out,
                "|{HEADER}{:^20}{RESET}|{HEADER}{:^15}{RESET}|",
                "Metric", "Value"
            )?;
            rule(out, &widths)?;
            for (metric, value) in [
                ("Total", format!("{:.2} GB", total / GIB)),
                ("Used", format!("{:.2} GB", used / GIB)),
                ("Available", format!("{:.2} GB", available / GIB)),
                ("Usage %", format!("{:.1}%", percent)),
            ] {
                writeln!(
                    out,
                    "|{LABEL}{:^20}{RESET}|{VALUE}{:^15}{RESET}|",
                    metric, value
                )?;
            }
            rule(out, &widths)?;
            Ok(())
        })
    }
}

#[derive(FromArgs)]
/// Continuously display disk usage per mounted filesystem.
pub struct Disk {}

impl BuiltinCommand for Disk {
    fn name() -> &'static str {
        "disk"
    }

    fn run(self, out: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        redraw_loop(env, Duration::from_secs(1), "disk", out, move |out| {
            let disks = sysinfo::Disks::new_with_refreshed_list();
            let widths = [20usize, 15, 15];
            rule(out, &widths)?;
            writeln!(
                out,
                "|{HEADER}{:^20}{RESET}|{HEADER}{:^15}{RESET}|{HEADER}{:^15}{RESET}|",
                "Device", "Used %", "Mount"
            )?;
            rule(out, &widths)?;
            for disk in disks.list() {
                let total = disk.total_space() as f64;
                if total <= 0.0 {
                    continue;
                }
                let used = total - disk.available_space() as f64;
                writeln!(
                    out,
                    "|{LABEL}{:^20}{RESET}|{VALUE}{:^15}{RESET}|{:^15}|",
                    disk.name().to_string_lossy(),
                    format!("{:.1}%", used / total * 100.0),
                    disk.mount_point().display().to_string()
                )?;
            }
            rule(out, &widths)?;
            Ok(())
        })
    }
}

#[derive(FromArgs)]
/// Continuously display the top CPU-consuming processes.
pub struct Ps {}

impl BuiltinCommand for Ps {
    fn name() -> &'static str {
        "ps"
    }

    fn run(self, out: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let mut sys = System::new();
        sys.refresh_processes();
        redraw_loop(env, Duration::from_secs(1), "process", out, move |out| {
            sys.refresh_processes();
            let mut procs: Vec<(u32, String, f32)> = sys
                .processes()
                .iter()
                .map(|(pid, p)| (pid.as_u32(), p.name().to_string(), p.cpu_usage()))
                .collect();
            procs.sort_by(|a, b| b.2.total_cmp(&a.2));
            procs.truncate(10);

            let widths = [8usize, 20, 8];
            rule(out, &widths)?;
            writeln!(
                out,
                "|{HEADER}{:^8}{RESET}|{HEADER}{:^20}{RESET}|{HEADER}{:^8}{RESET}|",
                "PID", "Process Name", "CPU %"
            )?;
            rule(out, &widths)?;
            for (pid, name, cpu) in &procs {
                let name = short_name(name);
                writeln!(
                    out,
                    "|{LABEL}{:^8}{RESET}|{:^20}|{VALUE}{:^8.1}{RESET}|",
                    pid, name, cpu
                )?;
            }
            rule(out, &widths)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interrupted_env() -> Environment {
        let env = Environment::new();
        env.interrupted.store(true, Ordering::SeqCst);
        env
    }

    #[test]
    fn monitors_return_once_interrupted_and_clear_the_flag() {
        let mut env = interrupted_env();
        let mut out = Vec::new();
        let code = Cpu {}.run(&mut out, &mut env).unwrap();
        assert_eq!(code, 0);
        assert!(!env.interrupted.load(Ordering::SeqCst));
        assert!(String::from_utf8(out).unwrap().contains("exiting cpu monitor"));
    }

    #[test]
    fn first_frame_is_painted_before_any_sleep() {
        let env = Environment::new();
        let flag = env.interrupted.clone();
        let mut frames = 0;
        let mut out = Vec::new();
        let code = redraw_loop(
            &env,
            Duration::from_millis(1),
            "test",
            &mut out,
            |out| {
                frames += 1;
                flag.store(true, Ordering::SeqCst);
                writeln!(out, "painted")?;
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(code, 0);
        assert_eq!(frames, 1);
        assert!(String::from_utf8(out).unwrap().contains("painted"));
    }

    #[test]
    fn process_names_shorten_on_character_boundaries() {
        // 21 bytes but exactly 20 characters; byte 20 sits inside the 'é'.
        assert_eq!(short_name("monitor-serveur-café"), "monitor-serveur-café");

        let long = "café-aux-données-processus";
        let short = short_name(long);
        assert_eq!(short.chars().count(), 20);
        assert!(long.starts_with(&short));

        assert_eq!(short_name("ps"), "ps");
    }

    #[test]
    fn every_view_honors_a_pre_raised_flag() {
        let mut env = interrupted_env();
        assert_eq!(Mem {}.run(&mut Vec::new(), &mut env).unwrap(), 0);
        env.interrupted.store(true, Ordering::SeqCst);
        assert_eq!(Disk {}.run(&mut Vec::new(), &mut env).unwrap(), 0);
        env.interrupted.store(true, Ordering::SeqCst);
        assert_eq!(Ps {}.run(&mut Vec::new(), &mut env).unwrap(), 0);
    }
}
