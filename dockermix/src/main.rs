use anyhow::{anyhow, Result};
use crossterm::{
    cursor,
    style::{self, Colorize, Styler},
    QueueableCommand,
};
use log::LevelFilter;
use std::{
    env, fs,
    io::{stdout, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use structopt::StructOpt;

use dockermix::{
    backends::DockerBackend,
    services::{ComposerFrontend, ContainerEngine},
    BaseImageBuilder, Environment, Journal, MixFileFrontend,
};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "dockermix",
    about = "Builds groups of containers from a dockermix.yml file, records them and tears them down."
)]
struct Opt {
    /// Container engine binary, e.g. docker or podman.
    #[structopt(long, env = "DOCKERMIX_ENGINE", default_value = "docker")]
    engine: String,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Builds and starts every container in a dockermix.yml file and saves
    /// the environment state.
    Build {
        #[structopt(short, long, parse(from_os_str))]
        /// Defaults to the nearest dockermix.yml in the current working
        /// directory or any of its parents.
        config: Option<PathBuf>,

        #[structopt(short, long, parse(from_os_str), default_value = "environment.yml")]
        state: PathBuf,
    },
    /// Tears down the containers recorded in a state file.
    Destroy {
        #[structopt(short, long, parse(from_os_str), default_value = "environment.yml")]
        state: PathBuf,

        #[structopt(long)]
        /// Keep the state file even if every container was torn down.
        keep_state: bool,
    },
    /// Prints a saved environment with the public ports currently assigned.
    Dump {
        #[structopt(short, long, parse(from_os_str), default_value = "environment.yml")]
        state: PathBuf,
    },
    /// Builds or removes base images from templates.
    Base {
        #[structopt(subcommand)]
        command: BaseCommand,
    },
}

#[derive(Debug, StructOpt)]
enum BaseCommand {
    /// Builds `<templates>/<name>.docker` and tags the image as `<name>`.
    Build {
        name: String,

        #[structopt(long, parse(from_os_str), default_value = "templates")]
        templates: PathBuf,
    },
    /// Removes the image tagged `<name>`.
    Destroy { name: String },
}

fn find_mix_file<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
    for path in path.as_ref().ancestors() {
        let mix_file_path = path.join("dockermix.yml");
        if mix_file_path.exists() {
            return Some(mix_file_path);
        }

        let mix_file_path = path.join("dockermix.yaml");
        if mix_file_path.exists() {
            return Some(mix_file_path);
        }
    }

    None
}

fn journal() -> Journal {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(LevelFilter::Info);

    if let Ok(filters) = env::var("LOG") {
        builder.parse_filters(&filters);
    }

    Journal::new(Arc::new(builder.build()))
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    let journal = journal();
    let engine: Arc<dyn ContainerEngine> = Arc::new(DockerBackend::new(opt.engine));

    let mut stdout = stdout();

    match opt.command {
        Command::Build { config, state } => {
            let config_path = match config {
                Some(config_path) => config_path,
                None => find_mix_file(env::current_dir()?).ok_or_else(|| {
                    anyhow!("Couldn't find a dockermix.yml file in the current working directory or any of its parents.")
                })?,
            };
            journal.info(format_args!("found config file {}", config_path.display()));

            let config = MixFileFrontend::new().config(&config_path)?;
            let mut environment = Environment::with_config(engine, journal, config);

            if let Err(err) = environment.build() {
                if !environment.is_empty() {
                    environment.save(&state)?;
                    print_info(
                        &mut stdout,
                        &format!(
                            "partially built environment saved to {}, run `dockermix destroy` to remove it.",
                            state.display()
                        ),
                    )?;
                }

                return Err(err.into());
            }

            environment.save(&state)?;

            let lines = environment
                .handles()
                .map(|handle| {
                    let container_id = handle
                        .container_id()
                        .map(|id| id.0.as_str())
                        .unwrap_or("-");
                    (format!("Started {} ({})", handle.name(), container_id), true)
                })
                .collect::<Vec<_>>();
            print_status(&mut stdout, &lines)?;
        }
        Command::Destroy { state, keep_state } => {
            let mut environment = Environment::new(engine, journal);
            environment.load_file(&state)?;

            let report = environment.destroy();

            let lines = environment
                .names()
                .map(|name| (format!("Destroyed {}", name), !report.has_failed(name)))
                .collect::<Vec<_>>();
            print_status(&mut stdout, &lines)?;

            if report.is_clean() {
                if !keep_state {
                    fs::remove_file(&state)?;
                }
            } else {
                print_info(
                    &mut stdout,
                    &format!(
                        "some containers were not fully removed, see the log. {} was kept.",
                        state.display()
                    ),
                )?;
            }
        }
        Command::Dump { state } => {
            let mut environment = Environment::new(engine, journal);
            environment.load_file(&state)?;

            let yaml = environment.dump()?.to_yaml()?;
            stdout.write_all(yaml.as_bytes())?;
            stdout.flush()?;
        }
        Command::Base { command } => match command {
            BaseCommand::Build { name, templates } => {
                let builder = BaseImageBuilder::from_templates(engine, journal, &templates, &name)?;
                let image_id = builder.build()?;
                print_status(
                    &mut stdout,
                    &[(format!("Built base image {} ({})", name, image_id), true)],
                )?;
            }
            BaseCommand::Destroy { name } => {
                let builder = BaseImageBuilder::new(engine, journal, name.as_str(), "");
                builder.destroy()?;
                print_status(&mut stdout, &[(format!("Removed base image {}", name), true)])?;
            }
        },
    }

    Ok(())
}

fn print_info(stdout: &mut impl Write, message: &str) -> Result<()> {
    stdout
        .queue(style::PrintStyledContent("INFO: ".cyan().bold()))?
        .queue(style::Print(message))?
        .queue(style::Print("\n"))?
        .flush()?;

    Ok(())
}

fn print_status(stdout: &mut impl Write, lines: &[(String, bool)]) -> Result<()> {
    let longest_line = lines.iter().map(|(line, _)| line.len()).max().unwrap_or(0);

    for (line, ok) in lines.iter() {
        stdout.queue(style::Print(line))?;

        let padding = longest_line - line.len() + 1;
        stdout
            .queue(cursor::MoveRight(padding as u16))?
            .queue(style::Print("... "))?;

        if *ok {
            stdout.queue(style::PrintStyledContent("done".green().bold()))?;
        } else {
            stdout.queue(style::PrintStyledContent("failed".red().bold()))?;
        }

        stdout.queue(style::Print("\n"))?;
    }

    stdout.flush()?;

    Ok(())
}
