#[macro_use]
extern crate slog;

extern crate nalgebra as na;
extern crate nalgebra_glm as glm;

use anyhow::Context;
use clap::clap_app;
use itertools::Itertools;
use meshwrap_rs::*;
use slog::Drain;

fn new_drain(level: slog::Level) -> slog::Fuse<slog::LevelFilter<slog::Fuse<slog_async::Async>>> {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    drain.filter_level(level).fuse()
}

fn parse_translate(arg: &str) -> anyhow::Result<glm::Vec3> {
    let (x, y, z) = arg
        .split(',')
        .map(|component| component.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("could not parse translation '{}'", arg))?
        .into_iter()
        .collect_tuple()
        .with_context(|| format!("translation '{}' needs three comma-separated components", arg))?;

    Ok(glm::vec3(x, y, z))
}

fn main() -> anyhow::Result<()> {
    let info_drain = new_drain(slog::Level::Info);
    let drain = slog_atomic::AtomicSwitch::new(info_drain);
    let ctrl = drain.ctrl();
    let log = slog::Logger::root(drain.fuse(), o!());

    let matches = clap_app!(meshwrap_rs =>
        (version: "0.1.0")
        (about: "Wraps a driven mesh onto a driver mesh surface")
        (@arg DRIVER: +required "Driver mesh (OBJ) whose surface drives the deformation")
        (@arg DRIVEN: +required "Driven mesh (OBJ) wrapped onto the driver")
        (@arg output: -o --output +takes_value +required "Output OBJ path for the deformed driven mesh")
        (@arg deformed: -d --("deformed-driver") +takes_value "Deformed driver mesh (OBJ) with the bind driver's topology")
        (@arg translate: -t --translate +takes_value "Rigid driver translation 'x,y,z' applied instead of a deformed driver mesh")
        (@arg linear: -l --linear "Blend positions barycentrically instead of transferring local frames")
        (@arg verbose: -v --verbose "Print debug information verbosely")
    )
    .get_matches();

    if matches.is_present("verbose") {
        ctrl.set(new_drain(slog::Level::Debug));
    }

    let driver_path = matches.value_of("DRIVER").unwrap();
    let driven_path = matches.value_of("DRIVEN").unwrap();
    let output_path = matches.value_of("output").unwrap();

    let driver = common::importer::load_obj(&log, driver_path)?;
    let driven = common::importer::load_obj(&log, driven_path)?;

    let transforms = wrap::WrapTransforms::default();
    let store = wrap::bind(&log, &driver, &driven.pos, None, &transforms)?;

    let current = if let Some(path) = matches.value_of("deformed") {
        let mesh = common::importer::load_obj(&log, path)?;
        if mesh.pos.len() != driver.pos.len() || mesh.indices != driver.indices {
            anyhow::bail!(
                "deformed driver {} does not share the bind driver's topology",
                path
            );
        }
        mesh
    } else if let Some(arg) = matches.value_of("translate") {
        let offset = parse_translate(arg)?;
        debug!(log, "translating driver by {:?}", offset);
        let mut mesh = driver.clone();
        for p in &mut mesh.pos {
            *p += offset;
        }
        mesh
    } else {
        driver.clone()
    };

    let mode = if matches.is_present("linear") {
        wrap::WrapMode::Linear
    } else {
        wrap::WrapMode::Frame
    };

    let mut deformed = driven.pos.clone();
    wrap::evaluate(
        &log,
        &current,
        &store,
        &driven.pos,
        &transforms,
        mode,
        &mut deformed,
    )?;

    common::importer::write_obj(output_path, &deformed, &driven.indices)?;
    info!(
        log,
        "wrote {} ({} vertices, {} bound)",
        output_path,
        deformed.len(),
        store.len()
    );

    Ok(())
}
