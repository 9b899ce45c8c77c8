use crate::parse::LauncherConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

const DEV_SERVER_BIN: &str = "node_modules/.bin/webpack-dev-server";
const RENDERER_CONFIG: &str = "node_modules/electron-webpack/webpack.renderer.config.js";
const WINDOWS_RUNNER: &str = "node_modules/electron-webpack/vendor/runnerw.exe";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Fully resolved invocation of the dev server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub current_dir: PathBuf,
}




/*
    @@@
    @CommandSpec::dev_server();
    . Resolves the dev-server binary (config override or node_modules/.bin) against the project directory.
    . Passes --color and --config so the tool runs as if started from its own CLI.
    . On Windows, runs the binary through the helper runner so console output is proxied correctly.
    . Overlays the development environment and the configured env on top of the inherited one.
*/
impl CommandSpec {
    pub fn dev_server(project_dir: &Path, cfg: &LauncherConfig, platform: Platform) -> Self {
        let resolve = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                project_dir.join(p)
            }
        };

        let bin = match &cfg.tool.bin {
            Some(bin) => resolve(bin.as_path()),
            None if platform == Platform::Windows => project_dir.join(format!("{}.cmd", DEV_SERVER_BIN)),
            None => project_dir.join(DEV_SERVER_BIN),
        };
        let config_file = cfg
            .tool
            .config
            .as_deref()
            .map(&resolve)
            .unwrap_or_else(|| project_dir.join(RENDERER_CONFIG));

        let mut args = vec![
            String::from("--color"),
            String::from("--config"),
            config_file.display().to_string(),
        ];
        args.extend(cfg.tool.args.iter().cloned());

        let program = match platform {
            Platform::Windows => {
                args.insert(0, bin.display().to_string());
                cfg.tool
                    .windows_runner
                    .as_deref()
                    .map(&resolve)
                    .unwrap_or_else(|| project_dir.join(WINDOWS_RUNNER))
            }
            Platform::Unix => bin,
        };

        Self {
            program,
            args,
            env: common_env(&cfg.env),
            current_dir: project_dir.to_path_buf(),
        }
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .current_dir(&self.current_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Development variables, overridden by `extra`. Applied on top of the inherited environment.
pub fn common_env(extra: &HashMap<String, String>) -> HashMap<String, String> {
    let mut env = HashMap::from([
        (String::from("NODE_ENV"), String::from("development")),
        (String::from("DEBUG_COLORS"), String::from("true")),
    ]);
    env.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}
