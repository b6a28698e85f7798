//! softras command line: render scenes to image files or a window

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};

use softras::output::save_image;
use softras::world::SceneRegistry;
use softras::VERSION;

#[derive(Parser)]
#[command(name = "softras", version = VERSION, about = "CPU software rasterizer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a scene to a PNG or PPM file
    Render {
        /// Built-in scene name or path to a .ron scene file
        #[arg(short, long, default_value = "cube")]
        scene: String,
        /// Output image; the extension picks the format
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,
    },
    /// List the built-in scenes
    List,
    /// Open an interactive window
    #[cfg(feature = "viewer")]
    View {
        #[arg(short, long, default_value = "cube")]
        scene: String,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let registry = SceneRegistry::builtin();

    match run(cli.command, &registry) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, registry: &SceneRegistry) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::List => {
            for name in registry.names() {
                println!("{}", name);
            }
        }
        Command::Render { scene, output } => {
            let (desc, base_dir) = registry.resolve(&scene)?;
            let mut scene = desc.build(&base_dir)?;

            let start = Instant::now();
            let stats = scene.render();
            let elapsed = start.elapsed();
            log::info!(
                "Rendered {} triangles ({} culled) in {:.1} ms, {:.1} fps",
                stats.triangles,
                stats.culled,
                elapsed.as_secs_f64() * 1000.0,
                1.0 / elapsed.as_secs_f64().max(f64::EPSILON)
            );

            save_image(scene.framebuffer(), &output)?;
            log::info!("Wrote {}", output.display());
        }
        #[cfg(feature = "viewer")]
        Command::View { scene } => {
            let (desc, base_dir) = registry.resolve(&scene)?;
            let scene_obj = desc.build(&base_dir)?;
            softras::viewer::run(scene_obj, &format!("softras v{} - {}", VERSION, scene));
        }
    }
    Ok(())
}
