//! Applying a step's commands on top of its composed inputs.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::engine::{CacheMount, CopyOptions, Engine, ExecSpec, FileSpec};
use super::paths::container_path;
use super::types::{LowerError, LowerOptions, StepEnv};
use crate::consts::{APP_DIR, DEFAULT_FILE_MODE};
use crate::plan::command::{CopyCommand, ExecCommand, FileCommand};
use crate::plan::{BuildPlan, Command, Step};

/// Secret name that stands for every secret declared on the plan.
pub const ALL_SECRETS: &str = "*";

/// Runs the commands of one step against an engine.
pub struct StepLowerer<'a, E: Engine> {
  engine: &'a mut E,
  plan: &'a BuildPlan,
  step: &'a Step,
  options: &'a LowerOptions,
  env: StepEnv,
}

impl<'a, E: Engine> StepLowerer<'a, E> {
  pub fn new(engine: &'a mut E, plan: &'a BuildPlan, step: &'a Step, options: &'a LowerOptions) -> Self {
    Self {
      engine,
      plan,
      step,
      options,
      env: StepEnv {
        variables: step.variables.clone(),
        paths: Vec::new(),
      },
    }
  }

  /// Apply every command in order, starting from `base`.
  ///
  /// Returns the final state and the environment the commands built up.
  pub fn apply(mut self, base: E::State) -> Result<(E::State, StepEnv), LowerError> {
    let mut state = base;
    for command in &self.step.commands {
      state = self.apply_command(state, command)?;
    }
    Ok((state, self.env))
  }

  fn apply_command(&mut self, state: E::State, command: &Command) -> Result<E::State, LowerError> {
    match command {
      Command::Exec(exec) => Ok(self.exec(&state, exec)),
      Command::Copy(copy) => Ok(self.copy(&state, copy)),
      Command::File(file) => self.write_file(&state, file),
      Command::Path(path) => {
        self.env.prepend_path(container_path(&path.path));
        Ok(state)
      }
      Command::Variable(variable) => {
        self.env.variables.insert(variable.name.clone(), variable.value.clone());
        Ok(state)
      }
    }
  }

  fn exec(&mut self, state: &E::State, exec: &ExecCommand) -> E::State {
    let spec = ExecSpec {
      args: vec!["sh".to_string(), "-c".to_string(), exec.cmd.clone()],
      cwd: APP_DIR.to_string(),
      env: self.env.to_env(&self.options.default_path),
      mounts: self.cache_mounts(),
      secrets: self.secrets(),
      label: exec.custom_name.clone().unwrap_or_else(|| exec.cmd.clone()),
    };
    debug!(step = %self.step.name, cmd = %exec.cmd, "exec");
    self.engine.exec(state, &spec)
  }

  fn copy(&mut self, state: &E::State, copy: &CopyCommand) -> E::State {
    let src = match &copy.image {
      Some(image) => self.engine.image(image, &self.options.platform),
      None => self.engine.local(),
    };
    let dest_path = container_path(&copy.dest);
    let options = CopyOptions::for_layer(&[]).with_label(format!("copy {}", copy.src));
    self.engine.copy(state, &src, &copy.src, &dest_path, &options)
  }

  fn write_file(&mut self, state: &E::State, file: &FileCommand) -> Result<E::State, LowerError> {
    let Some(contents) = self.step.assets.get(&file.name) else {
      return Err(LowerError::MissingAsset {
        step: self.step.name.clone(),
        asset: file.name.clone(),
      });
    };

    let path = container_path(&file.path);
    let spec = FileSpec {
      label: file.custom_name.clone().unwrap_or_else(|| format!("create {}", path)),
      path,
      contents: contents.clone(),
      mode: file.mode.unwrap_or(DEFAULT_FILE_MODE),
    };
    Ok(self.engine.write_file(state, &spec))
  }

  /// Mounts for the step's caches. Names the plan does not declare are skipped.
  fn cache_mounts(&self) -> Vec<CacheMount> {
    self
      .step
      .caches
      .iter()
      .filter_map(|name| match self.plan.caches.get(name) {
        Some(cache) => Some(CacheMount {
          id: name.clone(),
          target: container_path(&cache.directory),
          sharing: cache.kind,
        }),
        None => {
          warn!(step = %self.step.name, cache = %name, "step uses an undeclared cache");
          None
        }
      })
      .collect()
  }

  /// Secret names available to exec commands, with `*` expanded.
  fn secrets(&self) -> Vec<String> {
    let mut secrets = BTreeSet::new();
    for name in &self.step.secrets {
      if name == ALL_SECRETS {
        secrets.extend(self.plan.secrets.iter().cloned());
      } else {
        secrets.insert(name.clone());
      }
    }
    secrets.into_iter().collect()
  }
}
