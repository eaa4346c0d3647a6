//! A small blocking client for the `docker` command line.
//!
//! Every call runs one engine sub-command and waits for it to exit. Any
//! binary that accepts the same sub-commands (`podman` for instance) can be
//! used by passing its name to [`Client::new`].

use std::{
    io::Write,
    process::{Command, Stdio},
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to pass input to `{program} {args}`: {source}")]
    Input {
        program: String,
        args: String,
        source: std::io::Error,
    },

    #[error("`{program} {args}` failed ({status}): {stderr}")]
    Command {
        program: String,
        args: String,
        status: String,
        stderr: String,
    },

    #[error("`{program} {args}` returned unexpected output: {output:?}")]
    UnexpectedOutput {
        program: String,
        args: String,
        output: String,
    },
}

/// Arguments for `create`. The container is always created detached.
#[derive(Clone, Debug)]
pub struct CreateOptions<'a> {
    pub image: &'a str,
    pub command: &'a [String],
    pub ports: &'a [u16],
    pub hostname: &'a str,
}

impl<'a> CreateOptions<'a> {
    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "create".to_owned(),
            "--hostname".to_owned(),
            self.hostname.to_owned(),
        ];

        for port in self.ports {
            args.push("--publish".to_owned());
            args.push(port.to_string());
        }

        args.push(self.image.to_owned());
        args.extend(self.command.iter().cloned());
        args
    }
}

#[derive(Clone, Debug)]
pub struct Client {
    program: String,
}

impl Client {
    pub fn new<P: Into<String>>(program: P) -> Client {
        Client {
            program: program.into(),
        }
    }

    /// Builds an image from a Dockerfile passed on stdin, without a build
    /// context. Returns the image id printed by the engine.
    pub fn build(&self, dockerfile: &str) -> Result<String> {
        let args = strings(&["build", "--quiet", "-"]);
        let output = self.run(&args, Some(dockerfile))?;
        self.single_value(&args, output)
    }

    pub fn tag(&self, image: &str, tag: &str) -> Result<()> {
        self.run(&strings(&["tag", image, tag]), None)?;
        Ok(())
    }

    pub fn create(&self, options: &CreateOptions<'_>) -> Result<String> {
        let args = options.args();
        let output = self.run(&args, None)?;
        self.single_value(&args, output)
    }

    pub fn start(&self, container: &str) -> Result<()> {
        self.run(&strings(&["start", container]), None)?;
        Ok(())
    }

    pub fn stop(&self, container: &str) -> Result<()> {
        self.run(&strings(&["stop", container]), None)?;
        Ok(())
    }

    pub fn remove_container(&self, container: &str) -> Result<()> {
        self.run(&strings(&["rm", container]), None)?;
        Ok(())
    }

    /// Returns `false` if the engine knows no image by that reference.
    pub fn remove_image(&self, image: &str) -> Result<bool> {
        match self.run(&strings(&["rmi", image]), None) {
            Ok(_) => Ok(true),
            Err(Error::Command { ref stderr, .. }) if is_missing_image(stderr) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Returns the host port that `port/tcp` of `container` is published on.
    pub fn port(&self, container: &str, port: u16) -> Result<String> {
        let args = strings(&["port", container, &format!("{}/tcp", port)]);
        let output = self.run(&args, None)?;

        match parse_host_port(&output) {
            Some(host_port) => Ok(host_port),
            None => Err(Error::UnexpectedOutput {
                program: self.program.clone(),
                args: args.join(" "),
                output,
            }),
        }
    }

    fn run(&self, args: &[String], input: Option<&str>) -> Result<String> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = command.spawn().map_err(|source| Error::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // Checked after the exit status: a failing sub-command may close
        // stdin before reading it.
        let written = match (input, child.stdin.take()) {
            (Some(input), Some(mut stdin)) => stdin.write_all(input.as_bytes()),
            _ => Ok(()),
        };

        let output = child.wait_with_output().map_err(|source| Error::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(Error::Command {
                program: self.program.clone(),
                args: args.join(" "),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        written.map_err(|source| Error::Input {
            program: self.program.clone(),
            args: args.join(" "),
            source,
        })?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn single_value(&self, args: &[String], output: String) -> Result<String> {
        match output.lines().map(str::trim).filter(|l| !l.is_empty()).last() {
            Some(value) => Ok(value.to_owned()),
            None => Err(Error::UnexpectedOutput {
                program: self.program.clone(),
                args: args.join(" "),
                output,
            }),
        }
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| (*arg).to_owned()).collect()
}

/// docker says `No such image: <ref>`, podman says `<ref>: image not known`.
fn is_missing_image(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("no such image") || stderr.contains("image not known")
}

/// `docker port` prints one binding per line, e.g. `0.0.0.0:49153` and
/// `[::]:49153`. The first binding wins.
fn parse_host_port(output: &str) -> Option<String> {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (_, port) = line.rsplit_once(':')?;

    if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
        Some(port.to_owned())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_port_is_taken_from_first_binding() {
        let output = "0.0.0.0:49153\n[::]:49154\n";
        assert_eq!(parse_host_port(output).as_deref(), Some("49153"));
    }

    #[test]
    fn host_port_handles_ipv6_only_output() {
        assert_eq!(parse_host_port("[::]:8081\n").as_deref(), Some("8081"));
    }

    #[test]
    fn host_port_rejects_garbage() {
        assert_eq!(parse_host_port(""), None);
        assert_eq!(parse_host_port("no public port"), None);
        assert_eq!(parse_host_port("0.0.0.0:http"), None);
    }

    #[test]
    fn missing_images_are_recognised_for_both_engines() {
        assert!(is_missing_image(
            "Error response from daemon: No such image: web-4242:latest"
        ));
        assert!(is_missing_image("Error: web-4242: image not known"));
        assert!(!is_missing_image(
            "Error response from daemon: conflict: unable to remove repository reference \"web-4242\" (must force) - container 3f2a is using its referenced image"
        ));
    }

    #[test]
    fn create_arguments_publish_every_port_before_the_image() {
        let command = vec!["/bin/sh".to_owned(), "-c".to_owned(), "sleep 1".to_owned()];
        let options = CreateOptions {
            image: "sha256:abc",
            command: &command,
            ports: &[8080, 9090],
            hostname: "web-42",
        };

        assert_eq!(
            options.args(),
            vec![
                "create",
                "--hostname",
                "web-42",
                "--publish",
                "8080",
                "--publish",
                "9090",
                "sha256:abc",
                "/bin/sh",
                "-c",
                "sleep 1",
            ]
        );
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let client = Client::new("dockermix-no-such-engine");
        match client.start("abc") {
            Err(Error::Spawn { program, .. }) => assert_eq!(program, "dockermix-no-such-engine"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_a_command_error() {
        let client = Client::new("false");
        match client.build("FROM ubuntu\n") {
            Err(Error::Command { args, .. }) => assert_eq!(args, "build --quiet -"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
