use anyhow::Result;
use serde::Serialize;

use layerkit_lib::platform::BuildPlatform;

use crate::output::{OutputFormat, print_json, print_stat};

#[derive(Serialize)]
struct Info {
  version: &'static str,
  platform: BuildPlatform,
}

pub fn cmd_info(output: OutputFormat) -> Result<()> {
  let platform = BuildPlatform::host();

  if output.is_json() {
    return print_json(&Info {
      version: env!("CARGO_PKG_VERSION"),
      platform,
    });
  }

  println!("layerkit v{}", env!("CARGO_PKG_VERSION"));
  print_stat("Platform", &platform.to_string());
  print_stat("OS", platform.os.as_str());
  print_stat("Arch", platform.arch.as_str());
  if let Some(variant) = &platform.variant {
    print_stat("Variant", variant);
  }

  Ok(())
}
