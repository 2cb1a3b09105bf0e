use super::{
    colorize_build, colorize_decision, colorize_publish, json_pretty, spin_fail, spin_ok, spinner,
    EXIT_SUCCESS,
};
use pkgbump_core::{CoreError, Engine, RunEnvironment, RunOptions, UpdateReport};
use pkgbump_registry::{PublishOutcome, SystemGit};
use pkgbump_toolchain::{format_missing, MakepkgToolchain};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct Flags {
    pub force: bool,
    pub dry_run: bool,
    pub skip_build: bool,
    pub interactive: bool,
    pub restore_on_failure: bool,
}

pub fn options(env: &RunEnvironment, flags: Flags) -> RunOptions {
    let defaults = RunOptions::for_environment(env);
    RunOptions {
        force: flags.force,
        dry_run: flags.dry_run,
        skip_build: flags.skip_build,
        unattended: defaults.unattended && !flags.interactive,
        restore_on_failure: flags.restore_on_failure,
    }
}

pub fn run(package_dir: &Path, flags: Flags, json: bool) -> Result<u8, CoreError> {
    let env = RunEnvironment::from_env();
    let options = options(&env, flags);
    let toolchain = MakepkgToolchain::with_programs(
        env.checksum_program.as_deref().unwrap_or("updpkgsums"),
        env.build_program.as_deref().unwrap_or("makepkg"),
    );
    let transport = SystemGit::new();
    let engine = Engine::new(env, &toolchain, &transport);

    let progress = (!json && console::Term::stderr().is_term())
        .then(|| spinner(&format!("checking {}", package_dir.display())));
    let plan = match engine.check(package_dir, &options) {
        Ok(plan) => {
            if let Some(pb) = &progress {
                spin_ok(pb, &format!("{}: {}", plan.package, plan.decision));
            }
            plan
        }
        Err(e) => {
            if let Some(pb) = &progress {
                spin_fail(pb, "check failed");
            }
            return Err(e);
        }
    };

    if plan.decision.needs_update() && !engine.env().skip_prereqs {
        let missing = toolchain.missing_prereqs(engine.env().publish.can_publish());
        if !missing.is_empty() {
            return Err(CoreError::Usage(format_missing(&missing)));
        }
    }

    let report = engine.apply(&plan, &options)?;

    if json {
        match json_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(msg) => tracing::warn!("{msg}"),
        }
    } else {
        print_report(&report);
    }
    Ok(EXIT_SUCCESS)
}

fn print_report(report: &UpdateReport) {
    let decision = colorize_decision(report.decision);
    if report.previous_version == report.new_version.as_str() {
        println!("{}: {} ({decision})", report.package, report.new_version);
    } else {
        println!(
            "{}: {} -> {} ({decision})",
            report.package, report.previous_version, report.new_version
        );
    }
    if !report.decision.needs_update() {
        return;
    }
    if report.revision_reset {
        println!("  revision reset to 1");
    }
    println!("  build:   {}", colorize_build(report.build));
    if let Some(publish) = &report.publish {
        println!(
            "  publish: {} ({})",
            colorize_publish(publish.outcome),
            publish.registry_url
        );
        if publish.outcome == PublishOutcome::ManualPublish {
            if let Some(text) = &publish.instructions {
                println!();
                println!("{text}");
            }
        }
    }
}
