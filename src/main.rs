mod app;

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail};

use tiny_rasterizer::scene::shader::Shading;
use tiny_rasterizer::RenderConfig;

/// Value following the flag at position `i`.
fn flag_value(args: &[String], i: usize) -> anyhow::Result<&str> {
    return args
        .get(i + 1)
        .map(|value| value.as_str())
        .ok_or_else(|| anyhow!("{} expects a value", args[i]));
}

#[show_image::main]
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Default values.
    let mut mesh_path = PathBuf::from("assets/cube.obj");
    let mut config_path: Option<PathBuf> = None;
    let mut shading: Option<Shading> = None;
    let mut output: Option<PathBuf> = None;
    let mut depth = false;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-p" => { mesh_path = PathBuf::from(flag_value(&args, i)?); i += 1; }
            "-c" => { config_path = Some(PathBuf::from(flag_value(&args, i)?)); i += 1; }
            "-o" => { output = Some(PathBuf::from(flag_value(&args, i)?)); i += 1; }
            "-s" => {
                let name = flag_value(&args, i)?;
                shading = match Shading::from_name(name) {
                    Some(shading) => Some(shading),
                    None => bail!("unknown shading '{}', expected flat or smooth", name),
                };
                i += 1;
            }
            "--depth" => { depth = true; }
            other => log::warn!("Ignoring unknown argument {}", other),
        }
        i += 1;
    }

    let mut config = match &config_path {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    if let Some(shading) = shading {
        config.shading = shading;
    }

    let params = app::Params {
        config,
        mesh_path,
        output,
        depth,
    };

    if params.output.is_some() {
        app::render_to_file(params)?;
    } else {
        app::run(params)?;
    }

    return Ok(());
}
