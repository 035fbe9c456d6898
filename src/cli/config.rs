use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;

use super::context::CliContext;
use super::output::{print_structured, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    /// List where every value came from instead of the values
    #[arg(long)]
    pub provenance: bool,
}

pub fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let snapshot = ctx.load_policy()?;
    if args.provenance {
        let sources: BTreeMap<&str, String> = snapshot
            .provenance
            .values()
            .map(|entry| (entry.path.as_str(), format!("{:?}", entry.source).to_lowercase()))
            .collect();
        if !print_structured(ctx.output(), &sources)? {
            for (path, source) in &sources {
                println!("{path:<40} {source}");
            }
        }
        return Ok(());
    }

    let format = match ctx.output() {
        OutputFormat::Human => OutputFormat::Yaml,
        other => other,
    };
    if format == OutputFormat::Yaml {
        println!("# policy revision {}", snapshot.rev);
    }
    let mut value = serde_json::to_value(&snapshot)?;
    if let Some(map) = value.as_object_mut() {
        map.remove("provenance");
    }
    print_structured(format, &value)?;
    Ok(())
}
